//! Demo host: shows one alert and exits with its outcome.
//!
//! ```text
//! alert-host [--config manifest.toml] [--library sweetalert2.js] [--toast] [--frameless] [--title TEXT]
//! ```

use alert_host::{AlertDriver, AlertUserEvent, WryHost};
use anyhow::{Context, Result};
use ext_alert::{install_panic_hook, AlertSettings, DialogOptions, FireOptions};
use global_hotkey::{GlobalHotKeyEvent, HotKeyState};
use std::env;
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tao::event::Event;
use tao::event_loop::{ControlFlow, EventLoop, EventLoopBuilder};

/// Panic reports are picked up at this interval
const TICK: Duration = Duration::from_millis(50);

#[derive(Debug, Default)]
struct Args {
    config: Option<PathBuf>,
    library: Option<PathBuf>,
    toast: bool,
    frameless: bool,
    title: Option<String>,
}

fn parse_args() -> Result<Args> {
    let mut parsed = Args::default();
    let mut args = env::args().skip(1);
    while let Some(a) = args.next() {
        match a.as_str() {
            "--config" => {
                parsed.config = Some(PathBuf::from(
                    args.next().context("--config requires a path")?,
                ));
            }
            "--library" => {
                parsed.library = Some(PathBuf::from(
                    args.next().context("--library requires a path")?,
                ));
            }
            "--title" => {
                parsed.title = Some(args.next().context("--title requires a value")?);
            }
            "--toast" => parsed.toast = true,
            "--frameless" => parsed.frameless = true,
            other => tracing::warn!("Ignoring unknown argument: {}", other),
        }
    }
    Ok(parsed)
}

fn main() -> Result<()> {
    // Use ALERT_LOG env var for log level configuration, default to "info"
    use tracing_subscriber::EnvFilter;
    let filter = EnvFilter::try_from_env("ALERT_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    let args = parse_args()?;
    let mut settings = match &args.config {
        Some(path) => AlertSettings::load(path)
            .with_context(|| format!("loading settings from {}", path.display()))?,
        None => AlertSettings::default(),
    };
    if let Some(library) = args.library.clone() {
        settings.library_path = Some(library);
    }

    let mut panic_rx = install_panic_hook();

    let event_loop: EventLoop<AlertUserEvent> = EventLoopBuilder::with_user_event().build();
    let proxy = event_loop.create_proxy();

    let hotkey_proxy = Mutex::new(proxy.clone());
    GlobalHotKeyEvent::set_event_handler(Some(move |event: GlobalHotKeyEvent| {
        if matches!(event.state(), HotKeyState::Pressed) {
            if let Ok(proxy) = hotkey_proxy.lock() {
                let _ = proxy.send_event(AlertUserEvent::HotKey(event.id()));
            }
        }
    }));

    let host = Rc::new(WryHost::new());
    let runtime = ext_alert::AlertRuntime::new(host.clone(), settings)
        .context("starting alert runtime (pass --library or set alert.library_path)")?;
    let errors = runtime.uncaught_exception(false, None, true, true);
    let mut driver = AlertDriver::new(runtime.clone(), host, proxy);

    let title = args.title.clone().unwrap_or_else(|| "Save changes?".to_string());
    let options = DialogOptions::new()
        .title(title.clone())
        .text("Your edits will be lost otherwise.")
        .icon("question")
        .with("showCancelButton", true)
        .with("confirmButtonText", "Save");

    let mut outcome = if args.toast {
        runtime.fire_toast(options.with("timer", 3000), None, None)
    } else if args.frameless {
        runtime.alert().fire_frameless(options, FireOptions::default())
    } else {
        runtime
            .alert()
            .fire_with_frame(options, Some(&title), FireOptions::default())
    }
    .context("firing alert")?;

    tracing::info!("Alert fired, waiting for the user");

    event_loop.run(move |event, event_loop_target, control| {
        *control = ControlFlow::WaitUntil(Instant::now() + TICK);

        driver.handle_event(&event, event_loop_target);

        if let Event::MainEventsCleared = event {
            if errors.drain(&mut panic_rx) > 0 {
                driver.pump(event_loop_target);
            }
            if let Some(result) = outcome.try_outcome() {
                if driver.is_idle() {
                    tracing::info!(outcome = %result.to_json(), dismissed = result.is_dismissed(), "Alert settled");
                    println!("{}", result.to_json());
                    *control = ControlFlow::Exit;
                }
            }
        }
    });
}
