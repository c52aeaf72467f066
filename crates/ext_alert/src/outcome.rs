//! The single result every fired dialog produces.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::oneshot;

/// Why a dialog went away without a confirmed value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DismissReason {
    Cancel,
    Close,
    Esc,
    Timer,
    /// A dialog with the same singleton id is already showing
    Showing,
}

impl DismissReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DismissReason::Cancel => "cancel",
            DismissReason::Close => "close",
            DismissReason::Esc => "esc",
            DismissReason::Timer => "timer",
            DismissReason::Showing => "showing",
        }
    }
}

/// Result delivered to the caller of `fire`.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Dismissed(DismissReason),
    /// Whatever the dialog library resolved with (`{isConfirmed, value, ...}`)
    Value(Value),
}

impl Outcome {
    /// Interpret a renderer result. Payloads carrying a known `dismiss`
    /// reason become [`Outcome::Dismissed`]; anything else is passed through.
    pub fn from_payload(payload: Value) -> Self {
        let reason = payload
            .get("dismiss")
            .cloned()
            .and_then(|d| serde_json::from_value::<DismissReason>(d).ok());
        match reason {
            Some(reason) => Outcome::Dismissed(reason),
            None => Outcome::Value(payload),
        }
    }

    pub fn is_dismissed(&self) -> bool {
        matches!(self, Outcome::Dismissed(_))
    }

    pub fn to_json(&self) -> Value {
        match self {
            Outcome::Dismissed(reason) => serde_json::json!({ "dismiss": reason.as_str() }),
            Outcome::Value(value) => value.clone(),
        }
    }
}

impl Serialize for Outcome {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

/// Awaitable side of a session's outcome.
///
/// Resolves exactly once. If the session is dropped without ever settling,
/// the receiver reports [`DismissReason::Close`].
#[derive(Debug)]
pub struct OutcomeReceiver {
    rx: oneshot::Receiver<Outcome>,
    settled: Option<Outcome>,
}

impl OutcomeReceiver {
    pub(crate) fn new(rx: oneshot::Receiver<Outcome>) -> Self {
        Self { rx, settled: None }
    }

    /// A receiver that is already settled with `outcome`.
    pub fn ready(outcome: Outcome) -> Self {
        let (tx, rx) = oneshot::channel();
        let _ = tx.send(outcome);
        Self::new(rx)
    }

    /// Non-blocking check, useful from inside an event loop.
    pub fn try_outcome(&mut self) -> Option<Outcome> {
        if let Some(outcome) = &self.settled {
            return Some(outcome.clone());
        }
        let outcome = match self.rx.try_recv() {
            Ok(outcome) => outcome,
            Err(oneshot::error::TryRecvError::Empty) => return None,
            Err(oneshot::error::TryRecvError::Closed) => Outcome::Dismissed(DismissReason::Close),
        };
        self.settled = Some(outcome.clone());
        Some(outcome)
    }
}

impl Future for OutcomeReceiver {
    type Output = Outcome;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        if let Some(outcome) = self.settled.clone() {
            return Poll::Ready(outcome);
        }
        match Pin::new(&mut self.rx).poll(cx) {
            Poll::Ready(result) => {
                let outcome = result.unwrap_or(Outcome::Dismissed(DismissReason::Close));
                self.settled = Some(outcome.clone());
                Poll::Ready(outcome)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_payload_dismissed() {
        let outcome = Outcome::from_payload(json!({"isDismissed": true, "dismiss": "esc"}));
        assert_eq!(outcome, Outcome::Dismissed(DismissReason::Esc));
    }

    #[test]
    fn test_from_payload_value() {
        let payload = json!({"isConfirmed": true, "value": "hello"});
        let outcome = Outcome::from_payload(payload.clone());
        assert_eq!(outcome, Outcome::Value(payload));
        assert!(!outcome.is_dismissed());
    }

    #[test]
    fn test_unknown_dismiss_is_passed_through() {
        let payload = json!({"dismiss": "backdrop"});
        assert_eq!(Outcome::from_payload(payload.clone()), Outcome::Value(payload));
    }

    #[test]
    fn test_outcome_json_shape() {
        let json = serde_json::to_value(Outcome::Dismissed(DismissReason::Showing)).unwrap();
        assert_eq!(json, json!({"dismiss": "showing"}));
    }

    #[test]
    fn test_ready_receiver() {
        let mut rx = OutcomeReceiver::ready(Outcome::Dismissed(DismissReason::Timer));
        assert_eq!(rx.try_outcome(), Some(Outcome::Dismissed(DismissReason::Timer)));
        // still answers after the first read
        assert_eq!(rx.try_outcome(), Some(Outcome::Dismissed(DismissReason::Timer)));
    }

    #[test]
    fn test_dropped_sender_reads_as_close() {
        let (tx, rx) = oneshot::channel::<Outcome>();
        let mut rx = OutcomeReceiver::new(rx);
        assert_eq!(rx.try_outcome(), None);
        drop(tx);
        assert_eq!(rx.try_outcome(), Some(Outcome::Dismissed(DismissReason::Close)));
    }

    #[tokio::test]
    async fn test_await_outcome() {
        let (tx, rx) = oneshot::channel();
        tx.send(Outcome::Value(json!({"value": 1}))).unwrap();
        let outcome = OutcomeReceiver::new(rx).await;
        assert_eq!(outcome, Outcome::Value(json!({"value": 1})));
    }
}
