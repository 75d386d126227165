//! `watch` handler: run the status scheduler and print what it reports.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local};
use serde::Serialize;
use tokio::sync::broadcast::error::RecvError;

use questcast_bridge::Adb;
use questcast_core::{
    AppConnectionState, Controller, DetachedSession, Indicator, PollHealth, StatusEvent, StatusView,
    launch_detached,
};

use crate::cli::{GlobalOpts, OutputFormat, WatchArgs};
use crate::config::{Config, Toolset};
use crate::error::CliError;
use crate::output;

// ── Records ─────────────────────────────────────────────────────────

#[derive(Serialize)]
struct WatchLine<'a, T: Serialize> {
    at: DateTime<Local>,
    #[serde(flatten)]
    record: &'a T,
}

/// The status at startup, before any event arrives.
#[derive(Serialize)]
struct InitialStatus {
    event: &'static str,
    #[serde(flatten)]
    view: StatusView,
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    args: WatchArgs,
    tools: &Toolset,
    cfg: &Config,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let mut config = cfg.controller_config();
    if let Some(ms) = args.interval_ms {
        if !(500..=10_000).contains(&ms) {
            return Err(CliError::Validation {
                field: "--interval-ms".into(),
                reason: format!("must be between 500 and 10000, got {ms}"),
            });
        }
        config.refresh_interval = Duration::from_millis(ms);
    }

    let ctrl = Controller::new(Arc::clone(&tools.adb), config);
    ctrl.start().await;
    let result = watch_loop(&ctrl, &args, tools, cfg, global).await;
    ctrl.shutdown().await;
    result
}

async fn watch_loop(
    ctrl: &Controller<Adb>,
    args: &WatchArgs,
    tools: &Toolset,
    cfg: &Config,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let color = output::should_color(global.color);

    let state = ctrl.refresh().await?;
    let health = ctrl.health().borrow().clone();
    let mut events = ctrl.events();

    let initial = InitialStatus {
        event: "status",
        view: StatusView::new(&state, &health),
    };
    emit(global, &initial, || {
        format!(
            "{} {}",
            output::indicator_dot(initial.view.indicator, color),
            headline(&initial.view)
        )
    })?;
    let mut window = None;
    if args.cast {
        cast_if_ready(&mut window, &state, tools, cfg);
    }

    let mut printed = 1usize;
    loop {
        if args.limit.is_some_and(|limit| printed >= limit) {
            return Ok(());
        }

        let event = tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::debug!("interrupted");
                return Ok(());
            }
            received = events.recv() => match received {
                Ok(event) => event,
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "status events dropped");
                    continue;
                }
                Err(RecvError::Closed) => return Err(CliError::Scheduler),
            },
        };

        emit(global, &event, || event_line(&event, color))?;
        printed += 1;

        if args.cast {
            if let StatusEvent::StateChanged(ref transition) = event {
                let state = AppConnectionState::new(transition.to, transition.identity.clone());
                cast_if_ready(&mut window, &state, tools, cfg);
            }
        }
    }
}

// ── Rendering ───────────────────────────────────────────────────────

fn emit<T: Serialize>(
    global: &GlobalOpts,
    record: &T,
    human: impl FnOnce() -> String,
) -> Result<(), CliError> {
    let line = match global.output {
        OutputFormat::Table | OutputFormat::Plain => {
            format!("[{}] {}", Local::now().format("%H:%M:%S"), human())
        }
        // One record per line so the stream can be piped.
        OutputFormat::Json | OutputFormat::JsonCompact => serde_json::to_string(&WatchLine {
            at: Local::now(),
            record,
        })?,
        OutputFormat::Yaml => {
            let doc = serde_yaml::to_string(&WatchLine {
                at: Local::now(),
                record,
            })?;
            format!("---\n{}", doc.trim_end())
        }
    };
    output::print_output(&line, global.quiet);
    Ok(())
}

fn headline(view: &StatusView) -> String {
    match view.device {
        Some(ref device) => format!("{} ({device})", view.headline),
        None => view.headline.clone(),
    }
}

fn event_line(event: &StatusEvent, color: bool) -> String {
    let dot = |indicator| output::indicator_dot(indicator, color);
    match event {
        StatusEvent::StateChanged(transition) => {
            let state = AppConnectionState::new(transition.to, transition.identity.clone());
            let view = StatusView::new(&state, &PollHealth::Ok);
            format!("{} {}", dot(view.indicator), headline(&view))
        }
        StatusEvent::ToolMissing { tool, path } => format!(
            "{} {tool} was not found ({})",
            dot(Indicator::Red),
            path.display()
        ),
        StatusEvent::PollTimedOut { consecutive } => format!(
            "{} adb has not answered the last {consecutive} polls",
            dot(Indicator::Yellow)
        ),
        StatusEvent::UpgradePending { target } => format!(
            "{} Waiting for the headset to appear at {target}",
            dot(Indicator::Yellow)
        ),
        StatusEvent::UpgradeFailed { message } => format!(
            "{} Wireless connection failed: {message}",
            dot(Indicator::Red)
        ),
        StatusEvent::WirelessDisconnected => {
            format!("{} Wireless session closed", dot(Indicator::Yellow))
        }
    }
}

// ── Auto-cast ───────────────────────────────────────────────────────

/// Open a mirroring window when `state` is ready and no window from an
/// earlier launch is still open. Failures are logged and watching continues.
fn cast_if_ready(
    window: &mut Option<DetachedSession>,
    state: &AppConnectionState,
    tools: &Toolset,
    cfg: &Config,
) {
    if !state.state.is_ready() {
        return;
    }
    let Some(ref identity) = state.identity else {
        return;
    };
    if let Some(open) = window.as_ref().filter(|w| w.is_running()) {
        tracing::debug!(device = %open.target(), pid = ?open.pid(), "mirroring window still open");
        return;
    }
    match launch_detached(&tools.mirror, &cfg.mirror, identity) {
        Ok(session) => {
            tracing::info!(device = %identity, pid = ?session.pid(), "mirroring started");
            *window = Some(session);
        }
        Err(err) => tracing::warn!(device = %identity, error = %err, "could not start mirroring"),
    }
}
