//! `status` and `devices` handlers. Both run a single poll.

use std::sync::Arc;

use tabled::Tabled;

use questcast_core::{
    ConnectionSnapshot, ObservedDevice, PollFault, PollHealth, StatusView, WirelessAction, probe,
};

use crate::cli::GlobalOpts;
use crate::config::Toolset;
use crate::error::CliError;
use crate::output;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct DeviceRow {
    #[tabled(rename = "Address")]
    address: String,
    #[tabled(rename = "Transport")]
    transport: String,
    #[tabled(rename = "State")]
    state: &'static str,
}

impl From<&ObservedDevice> for DeviceRow {
    fn from(d: &ObservedDevice) -> Self {
        Self {
            address: d.identity.address(),
            transport: d.identity.transport().to_string(),
            state: authorization(d),
        }
    }
}

fn authorization(d: &ObservedDevice) -> &'static str {
    if d.authorized {
        "authorized"
    } else {
        "unauthorized"
    }
}

// ── Detail view ─────────────────────────────────────────────────────

pub fn detail(view: &StatusView, color: bool) -> String {
    let mut lines = vec![format!(
        "{} {}",
        output::indicator_dot(view.indicator, color),
        view.headline
    )];
    if let Some(ref device) = view.device {
        lines.push(format!("  Device:    {device}"));
    }
    let wireless = match view.wireless {
        WirelessAction::Disconnect => "connected (questcast wireless disconnect)",
        WirelessAction::Connect { enabled: true } => "available (questcast wireless connect)",
        WirelessAction::Connect { enabled: false } => "unavailable",
    };
    lines.push(format!("  Wireless:  {wireless}"));
    let cast = if view.can_cast {
        "ready (questcast cast)"
    } else {
        "unavailable"
    };
    lines.push(format!("  Cast:      {cast}"));
    if let Some(ref detail) = view.detail {
        lines.push(String::new());
        lines.push(detail.clone());
    }
    lines.join("\n")
}

/// Poll once. A listing timeout is reported as an error here, since a
/// one-shot command has no next tick to retry on.
async fn poll(tools: &Toolset) -> Result<(StatusView, ConnectionSnapshot), CliError> {
    let (state, snapshot) = probe(Arc::clone(&tools.adb)).await?;
    if let Some(PollFault::Timeout) = snapshot.fault {
        return Err(CliError::Timeout {
            command: "adb devices".into(),
            timeout_ms: u64::try_from(tools.adb.timeout().as_millis()).unwrap_or(u64::MAX),
        });
    }
    Ok((StatusView::new(&state, &PollHealth::Ok), snapshot))
}

// ── Handlers ────────────────────────────────────────────────────────

pub async fn handle_status(tools: &Toolset, global: &GlobalOpts) -> Result<(), CliError> {
    let (view, _) = poll(tools).await?;
    let color = output::should_color(global.color);
    let out = output::render_single(
        global.output,
        &view,
        |v| detail(v, color),
        |v| v.state.to_string(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}

pub async fn handle_devices(tools: &Toolset, global: &GlobalOpts) -> Result<(), CliError> {
    let (_, snapshot) = poll(tools).await?;
    let out = output::render_list(
        global.output,
        &snapshot.devices,
        |d| DeviceRow::from(d),
        |d| d.identity.address(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}

#[cfg(test)]
mod tests {
    use questcast_core::{AppConnectionState, DeviceIdentity, DeviceState};

    use super::*;

    #[test]
    fn detail_lists_device_and_actions() {
        let state = AppConnectionState::new(DeviceState::Ready, Some(DeviceIdentity::serial("S1")));
        let text = detail(&StatusView::new(&state, &PollHealth::Ok), false);
        assert!(text.starts_with("● Connected over USB"));
        assert!(text.contains("Device:    S1"));
        assert!(text.contains("questcast wireless connect"));
        assert!(text.contains("ready (questcast cast)"));
    }

    #[test]
    fn rows_show_transport_and_authorization() {
        let row = DeviceRow::from(&ObservedDevice::unauthorized(DeviceIdentity::host_port(
            "192.168.1.10",
            5555,
        )));
        assert_eq!(row.address, "192.168.1.10:5555");
        assert_eq!(row.transport, "tcp");
        assert_eq!(row.state, "unauthorized");
    }
}
