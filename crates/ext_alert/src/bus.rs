//! Per-session publish/subscribe.
//!
//! Channels are keyed by `(SessionId, Topic)` so two sessions can never
//! observe each other's messages. Handlers are cloned out of the table
//! before they run, which lets a handler subscribe, emit, or tear down
//! channels (including its own) while it executes.

use crate::session::SessionId;
use serde_json::Value;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

/// Event names a session listens on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    // renderer -> host
    Log,
    Reposition,
    WillOpen,
    DidOpen,
    WillClose,
    DidClose,
    ReturnPromise,
    // native surface
    ReadyToShow,
    Focus,
    Blur,
    Close,
    Closed,
}

impl Topic {
    pub const ALL: [Topic; 12] = [
        Topic::Log,
        Topic::Reposition,
        Topic::WillOpen,
        Topic::DidOpen,
        Topic::WillClose,
        Topic::DidClose,
        Topic::ReturnPromise,
        Topic::ReadyToShow,
        Topic::Focus,
        Topic::Blur,
        Topic::Close,
        Topic::Closed,
    ];
}

/// A namespaced channel
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Channel {
    pub session: SessionId,
    pub topic: Topic,
}

impl Channel {
    pub fn new(session: &SessionId, topic: Topic) -> Self {
        Self {
            session: session.clone(),
            topic,
        }
    }
}

/// Handler invoked with the message payload; may return a synchronous reply.
pub type Handler = Rc<dyn Fn(&Value) -> Option<Value>>;

struct Listener {
    once: bool,
    handler: Handler,
}

#[derive(Default)]
pub struct ChannelBus {
    listeners: RefCell<HashMap<Channel, Vec<Listener>>>,
    emitted: Cell<u64>,
}

impl ChannelBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(&self, channel: Channel, handler: impl Fn(&Value) -> Option<Value> + 'static) {
        self.add(channel, false, Rc::new(handler));
    }

    /// Subscribe for a single delivery.
    pub fn once(&self, channel: Channel, handler: impl Fn(&Value) -> Option<Value> + 'static) {
        self.add(channel, true, Rc::new(handler));
    }

    fn add(&self, channel: Channel, once: bool, handler: Handler) {
        self.listeners
            .borrow_mut()
            .entry(channel)
            .or_default()
            .push(Listener { once, handler });
    }

    /// Deliver `payload` to every listener of `channel`.
    ///
    /// Returns the last reply produced, or `None` when nobody listened.
    pub fn emit(&self, channel: &Channel, payload: &Value) -> Option<Value> {
        let handlers: Vec<Handler> = {
            let mut listeners = self.listeners.borrow_mut();
            let Some(list) = listeners.get_mut(channel) else {
                tracing::trace!(session = %channel.session, topic = ?channel.topic, "no listeners");
                return None;
            };
            let handlers = list.iter().map(|l| l.handler.clone()).collect();
            list.retain(|l| !l.once);
            if list.is_empty() {
                listeners.remove(channel);
            }
            handlers
        };

        self.emitted.set(self.emitted.get() + 1);
        let mut reply = None;
        for handler in handlers {
            if let Some(value) = handler(payload) {
                reply = Some(value);
            }
        }
        reply
    }

    pub fn remove_all_listeners<I>(&self, channels: I)
    where
        I: IntoIterator<Item = Channel>,
    {
        let mut listeners = self.listeners.borrow_mut();
        for channel in channels {
            listeners.remove(&channel);
        }
    }

    /// Drop every channel belonging to `session`.
    pub fn remove_session(&self, session: &SessionId) {
        self.remove_all_listeners(Topic::ALL.into_iter().map(|topic| Channel::new(session, topic)));
    }

    pub fn listener_count(&self, channel: &Channel) -> usize {
        self.listeners
            .borrow()
            .get(channel)
            .map(|l| l.len())
            .unwrap_or(0)
    }

    pub fn has_session(&self, session: &SessionId) -> bool {
        self.listeners.borrow().keys().any(|c| &c.session == session)
    }

    /// Number of deliveries that reached at least one listener
    pub fn emitted(&self) -> u64 {
        self.emitted.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sid(s: &str) -> SessionId {
        SessionId::from(s)
    }

    #[test]
    fn test_once_delivers_a_single_time() {
        let bus = ChannelBus::new();
        let hits = Rc::new(Cell::new(0));
        let h = hits.clone();
        let channel = Channel::new(&sid("a"), Topic::DidOpen);
        bus.once(channel.clone(), move |_| {
            h.set(h.get() + 1);
            None
        });

        bus.emit(&channel, &json!({}));
        bus.emit(&channel, &json!({}));
        assert_eq!(hits.get(), 1);
        assert_eq!(bus.listener_count(&channel), 0);
    }

    #[test]
    fn test_sessions_do_not_cross_talk() {
        let bus = ChannelBus::new();
        let hits = Rc::new(Cell::new(0));
        let h = hits.clone();
        bus.on(Channel::new(&sid("a"), Topic::ReturnPromise), move |_| {
            h.set(h.get() + 1);
            None
        });

        assert_eq!(bus.emit(&Channel::new(&sid("b"), Topic::ReturnPromise), &json!({})), None);
        assert_eq!(hits.get(), 0);
    }

    #[test]
    fn test_reply_is_returned() {
        let bus = ChannelBus::new();
        let channel = Channel::new(&sid("a"), Topic::Reposition);
        bus.on(channel.clone(), |_| Some(json!("repositioned")));
        assert_eq!(bus.emit(&channel, &json!("show")), Some(json!("repositioned")));
        assert_eq!(bus.listener_count(&channel), 1);
    }

    #[test]
    fn test_handler_may_tear_down_its_own_session() {
        let bus = Rc::new(ChannelBus::new());
        let session = sid("a");
        let inner = bus.clone();
        let s = session.clone();
        bus.on(Channel::new(&session, Topic::Closed), move |_| {
            inner.remove_session(&s);
            None
        });
        bus.on(Channel::new(&session, Topic::Log), |_| None);

        bus.emit(&Channel::new(&session, Topic::Closed), &Value::Null);
        assert!(!bus.has_session(&session));
    }

    #[test]
    fn test_handler_may_emit_reentrantly() {
        let bus = Rc::new(ChannelBus::new());
        let session = sid("a");
        let order = Rc::new(RefCell::new(Vec::new()));

        let (inner, s, o) = (bus.clone(), session.clone(), order.clone());
        bus.once(Channel::new(&session, Topic::Close), move |_| {
            o.borrow_mut().push("close");
            inner.emit(&Channel::new(&s, Topic::Closed), &Value::Null);
            None
        });
        let o = order.clone();
        bus.once(Channel::new(&session, Topic::Closed), move |_| {
            o.borrow_mut().push("closed");
            None
        });

        bus.emit(&Channel::new(&session, Topic::Close), &Value::Null);
        assert_eq!(*order.borrow(), vec!["close", "closed"]);
        assert_eq!(bus.emitted(), 2);
    }
}
