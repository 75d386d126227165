// ── Wireless handoff ──
//
// USB → TCP upgrade and its teardown. Both run on the scheduler task
// between ticks. The upgrade only records a pending target; the next poll
// that lists the target authorized confirms it (see `machine::next`).

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::bridge::DeviceBridge;
use crate::error::CoreError;
use crate::model::{AppConnectionState, DeviceIdentity, DeviceState};

/// What a successful upgrade request leaves behind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum UpgradeOutcome {
    /// Handshake done; waiting for a poll to list `target`.
    Pending { target: DeviceIdentity },
}

impl UpgradeOutcome {
    pub fn target(&self) -> &DeviceIdentity {
        match self {
            Self::Pending { target } => target,
        }
    }
}

/// Switch a USB-attached headset to a wireless session.
///
/// Requires `Ready` on a serial identity; any other state returns
/// [`CoreError::InvalidState`] without running the tool. Reads the
/// headset's Wi-Fi address, then tries each candidate port in order:
/// enable the TCP listener, connect to it. The first port that connects
/// wins.
///
/// On failure the caller keeps its own state untouched. The error carries
/// the last raw tool message.
pub async fn request_wireless_upgrade<B: DeviceBridge>(
    bridge: &B,
    state: &AppConnectionState,
    ports: &[u16],
) -> Result<(AppConnectionState, UpgradeOutcome), CoreError> {
    let serial = match (&state.state, &state.identity) {
        (DeviceState::Ready, Some(DeviceIdentity::Serial { serial })) => serial.as_str(),
        _ => {
            return Err(CoreError::InvalidState {
                operation: "connect wirelessly",
                state: state.state,
            });
        }
    };

    if ports.is_empty() {
        return Err(CoreError::Upgrade {
            message: "no wireless port configured".into(),
        });
    }

    let host = match bridge.wifi_address(serial).await {
        Ok(Some(ip)) => ip.to_string(),
        Ok(None) => {
            return Err(CoreError::Upgrade {
                message: "headset has no Wi-Fi address; join it to the same network as this computer"
                    .into(),
            });
        }
        Err(err) => return Err(upgrade_error(err)),
    };
    debug!(serial, host, ?ports, "starting wireless upgrade");

    let mut last_message = String::new();
    for &port in ports {
        match try_port(bridge, serial, &host, port).await {
            Ok(target) => {
                info!(serial, target = %target, "wireless connection established");
                let next = state.clone().with_in_flight(Some(target.clone()));
                return Ok((next, UpgradeOutcome::Pending { target }));
            }
            Err(err) if err.is_tool_not_found() => return Err(upgrade_error(err)),
            Err(err) => {
                warn!(serial, port, error = %err, "wireless port failed");
                last_message = raw_message(&err);
            }
        }
    }

    Err(CoreError::Upgrade {
        message: last_message,
    })
}

async fn try_port<B: DeviceBridge>(
    bridge: &B,
    serial: &str,
    host: &str,
    port: u16,
) -> Result<DeviceIdentity, questcast_bridge::Error> {
    let bound = bridge.enable_tcpip(serial, port).await?;
    bridge.connect(host, bound).await?;
    Ok(DeviceIdentity::host_port(host, bound))
}

/// Tear down a wireless session and put the headset back in USB mode.
///
/// Valid while `ReadyWireless` or while an upgrade is pending. The
/// `usb` step is best effort. Returns the state with the pending target
/// cleared; the next poll settles the rest.
pub async fn request_wireless_disconnect<B: DeviceBridge>(
    bridge: &B,
    state: &AppConnectionState,
) -> Result<AppConnectionState, CoreError> {
    let mut targets: Vec<&DeviceIdentity> = Vec::new();
    if state.state == DeviceState::ReadyWireless {
        targets.extend(state.identity.iter().filter(|id| id.is_tcp()));
    }
    if let Some(pending) = &state.wireless_upgrade_in_flight {
        if !targets.contains(&pending) {
            targets.push(pending);
        }
    }
    if targets.is_empty() {
        return Err(CoreError::InvalidState {
            operation: "disconnect wireless",
            state: state.state,
        });
    }

    for target in targets {
        let address = target.address();
        let message = bridge.disconnect(&address).await?;
        info!(address, message = message.trim(), "wireless session closed");
    }

    match bridge.usb(None).await {
        Ok(message) => debug!(message = message.trim(), "switched back to USB mode"),
        Err(err) if err.is_tool_not_found() => return Err(err.into()),
        Err(err) => warn!(error = %err, "could not switch back to USB mode"),
    }

    Ok(state.clone().with_in_flight(None))
}

fn raw_message(err: &questcast_bridge::Error) -> String {
    err.tool_output()
        .map_or_else(|| err.to_string(), |output| output.trim().to_owned())
}

fn upgrade_error(err: questcast_bridge::Error) -> CoreError {
    if err.is_tool_not_found() {
        return err.into();
    }
    CoreError::Upgrade {
        message: raw_message(&err),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::net::Ipv4Addr;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::testing::FakeBridge;

    fn ready_usb() -> AppConnectionState {
        AppConnectionState::new(DeviceState::Ready, Some(DeviceIdentity::serial("S1")))
    }

    fn rejected(output: &str) -> questcast_bridge::Error {
        questcast_bridge::Error::Rejected {
            command: "adb connect".into(),
            output: output.into(),
        }
    }

    #[tokio::test]
    async fn upgrade_records_pending_target() {
        let bridge = FakeBridge::default();
        bridge.set_wifi(Ipv4Addr::new(192, 168, 1, 10));
        bridge.push_tcpip(Ok(5555));

        let (next, outcome) = request_wireless_upgrade(&bridge, &ready_usb(), &[5555])
            .await
            .unwrap();

        let target = DeviceIdentity::host_port("192.168.1.10", 5555);
        assert_eq!(outcome, UpgradeOutcome::Pending {
            target: target.clone()
        });
        assert_eq!(next.state, DeviceState::Ready);
        assert_eq!(next.identity, Some(DeviceIdentity::serial("S1")));
        assert_eq!(next.wireless_upgrade_in_flight, Some(target));
        assert_eq!(bridge.calls(), vec![
            "wifi S1",
            "tcpip S1 5555",
            "connect 192.168.1.10:5555",
        ]);
    }

    #[tokio::test]
    async fn upgrade_outside_ready_runs_nothing() {
        let states = [
            AppConnectionState::absent(),
            AppConnectionState::new(DeviceState::Unauthorized, Some(DeviceIdentity::serial("S1"))),
            AppConnectionState::new(
                DeviceState::ReadyWireless,
                Some(DeviceIdentity::host_port("192.168.1.10", 5555)),
            ),
        ];
        for state in &states {
            let bridge = FakeBridge::default();
            let err = request_wireless_upgrade(&bridge, state, &[5555])
                .await
                .unwrap_err();
            assert!(matches!(err, CoreError::InvalidState { .. }), "{state:?}");
            assert!(bridge.calls().is_empty());
        }
    }

    #[tokio::test]
    async fn upgrade_uses_reported_port() {
        let bridge = FakeBridge::default();
        bridge.set_wifi(Ipv4Addr::new(10, 0, 0, 7));
        bridge.push_tcpip(Ok(5556));

        let (_, outcome) =
            tokio_test::assert_ok!(request_wireless_upgrade(&bridge, &ready_usb(), &[5555]).await);
        assert_eq!(outcome.target(), &DeviceIdentity::host_port("10.0.0.7", 5556));
    }

    #[tokio::test]
    async fn upgrade_falls_back_to_next_port() {
        let bridge = FakeBridge::default();
        bridge.set_wifi(Ipv4Addr::new(192, 168, 1, 10));
        bridge.push_connect(Err(rejected("failed to connect to 192.168.1.10:5555")));

        let (_, outcome) = request_wireless_upgrade(&bridge, &ready_usb(), &[5555, 5556])
            .await
            .unwrap();
        assert_eq!(
            outcome.target(),
            &DeviceIdentity::host_port("192.168.1.10", 5556)
        );
        assert_eq!(bridge.calls().len(), 5);
    }

    #[tokio::test]
    async fn upgrade_failure_carries_raw_message() {
        let bridge = FakeBridge::default();
        bridge.set_wifi(Ipv4Addr::new(192, 168, 1, 10));
        bridge.push_connect(Err(rejected(
            "cannot connect to 192.168.1.10:5555: Connection refused\n",
        )));

        let err = request_wireless_upgrade(&bridge, &ready_usb(), &[5555])
            .await
            .unwrap_err();
        match err {
            CoreError::Upgrade { message } => {
                assert_eq!(message, "cannot connect to 192.168.1.10:5555: Connection refused");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn upgrade_without_wifi_address_fails() {
        let bridge = FakeBridge::default();
        let err = request_wireless_upgrade(&bridge, &ready_usb(), &[5555])
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Upgrade { .. }));
        assert_eq!(bridge.calls(), vec!["wifi S1"]);
    }

    #[tokio::test]
    async fn missing_tool_short_circuits() {
        let bridge = FakeBridge::default();
        bridge.set_wifi(Ipv4Addr::new(192, 168, 1, 10));
        bridge.push_tcpip(Err(questcast_bridge::Error::ToolNotFound {
            tool: "adb".into(),
            path: "adb".into(),
        }));

        let err = request_wireless_upgrade(&bridge, &ready_usb(), &[5555, 5556])
            .await
            .unwrap_err();
        assert!(err.is_tool_not_found());
        assert_eq!(bridge.calls().len(), 2);
    }

    #[tokio::test]
    async fn disconnect_closes_session_and_returns_to_usb() {
        let bridge = FakeBridge::default();
        let state = AppConnectionState::new(
            DeviceState::ReadyWireless,
            Some(DeviceIdentity::host_port("192.168.1.10", 5555)),
        );
        let next = request_wireless_disconnect(&bridge, &state).await.unwrap();
        assert_eq!(next.wireless_upgrade_in_flight, None);
        assert_eq!(bridge.calls(), vec!["disconnect 192.168.1.10:5555", "usb -"]);
    }

    #[tokio::test]
    async fn disconnect_cancels_pending_upgrade() {
        let bridge = FakeBridge::default();
        let state = ready_usb().with_in_flight(Some(DeviceIdentity::host_port("192.168.1.10", 5555)));
        let next = request_wireless_disconnect(&bridge, &state).await.unwrap();
        assert_eq!(next, ready_usb());
        assert_eq!(bridge.calls(), vec!["disconnect 192.168.1.10:5555", "usb -"]);
    }

    #[tokio::test]
    async fn disconnect_over_usb_is_invalid() {
        let bridge = FakeBridge::default();
        let err = request_wireless_disconnect(&bridge, &ready_usb())
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidState { .. }));
        assert!(bridge.calls().is_empty());
    }
}
