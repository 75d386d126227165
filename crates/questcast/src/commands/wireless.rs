//! `wireless connect` / `wireless disconnect` handlers.
//!
//! Both run through the status scheduler so the handoff is confirmed by a
//! real poll rather than by the `adb connect` reply alone.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use questcast_bridge::Adb;
use questcast_core::{AppConnectionState, Controller, DeviceState, PollHealth, StatusView};

use crate::cli::{GlobalOpts, WirelessArgs, WirelessCommand};
use crate::config::{Config, Toolset};
use crate::error::CliError;
use crate::output;

use super::util;

#[derive(Serialize)]
struct DisconnectReport {
    disconnected: Vec<String>,
    state: AppConnectionState,
}

pub async fn handle(
    args: WirelessArgs,
    tools: &Toolset,
    cfg: &Config,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        WirelessCommand::Connect { wait_ms } => {
            let state = connect(tools, cfg, global, Duration::from_millis(wait_ms)).await?;
            let color = output::should_color(global.color);
            let view = StatusView::new(&state, &PollHealth::Ok);
            let out = output::render_single(
                global.output,
                &state,
                |_| super::status::detail(&view, color),
                |s| s.identity.as_ref().map(ToString::to_string).unwrap_or_default(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }
        WirelessCommand::Disconnect => {
            let report = disconnect(tools, cfg).await?;
            let out = output::render_single(
                global.output,
                &report,
                |r| {
                    format!(
                        "Closed {}; the headset is back in USB mode",
                        r.disconnected.join(", ")
                    )
                },
                |r| r.disconnected.join("\n"),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}

/// Hand the current USB connection over to Wi-Fi and wait until a poll
/// sees the headset at its new address. Returns the confirmed state.
///
/// A headset that is already connected wirelessly is returned as is.
pub async fn connect(
    tools: &Toolset,
    cfg: &Config,
    global: &GlobalOpts,
    wait: Duration,
) -> Result<AppConnectionState, CliError> {
    let ctrl = Controller::new(Arc::clone(&tools.adb), cfg.controller_config());
    ctrl.start().await;
    let result = hand_over(&ctrl, global, wait).await;
    ctrl.shutdown().await;
    result
}

async fn hand_over(
    ctrl: &Controller<Adb>,
    global: &GlobalOpts,
    wait: Duration,
) -> Result<AppConnectionState, CliError> {
    let state = ctrl.refresh().await?;
    util::ensure_tool_present(ctrl)?;
    if state.state == DeviceState::ReadyWireless {
        tracing::info!(device = ?state.identity, "already connected wirelessly");
        return Ok(state);
    }

    let outcome = ctrl.upgrade_wireless().await?;
    let target = outcome.target().clone();
    tracing::info!(%target, "wireless handoff requested");

    let bar = util::spinner(global, format!("Waiting for the headset at {target}"));
    let mut rx = ctrl.state();
    let seen = tokio::time::timeout(
        wait,
        rx.wait_for(|s| {
            s.state == DeviceState::ReadyWireless && s.identity.as_ref() == Some(&target)
        }),
    )
    .await
    .map(|found| found.map(|s| AppConnectionState::clone(&s)));
    bar.finish_and_clear();

    match seen {
        Ok(Ok(state)) => Ok(state),
        Ok(Err(_)) => Err(CliError::Scheduler),
        Err(_) => Err(CliError::UpgradeFailed {
            message: format!(
                "the headset did not appear at {target} within {}ms",
                wait.as_millis()
            ),
        }),
    }
}

async fn disconnect(tools: &Toolset, cfg: &Config) -> Result<DisconnectReport, CliError> {
    let ctrl = Controller::new(Arc::clone(&tools.adb), cfg.controller_config());
    ctrl.start().await;
    let result = async {
        let before = ctrl.refresh().await?;
        util::ensure_tool_present(&ctrl)?;
        let after = ctrl.disconnect_wireless().await?;
        Ok::<_, CliError>((before, after))
    }
    .await;
    ctrl.shutdown().await;
    let (before, after) = result?;

    let mut disconnected: Vec<String> = Vec::new();
    if before.state == DeviceState::ReadyWireless {
        disconnected.extend(before.identity.iter().map(ToString::to_string));
    }
    if let Some(ref pending) = before.wireless_upgrade_in_flight {
        let pending = pending.to_string();
        if !disconnected.contains(&pending) {
            disconnected.push(pending);
        }
    }
    Ok(DisconnectReport {
        disconnected,
        state: after,
    })
}
