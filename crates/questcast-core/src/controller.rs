// ── Status scheduler ──
//
// Owns the `AppConnectionState` for the life of the process. A single
// task polls on an interval, folds each snapshot through the state
// machine, and runs commands between ticks. Consumers observe through
// watch channels and a broadcast event stream.

use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{Mutex, broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::bridge::DeviceBridge;
use crate::command::{Command, CommandEnvelope, CommandResult};
use crate::config::ControllerConfig;
use crate::error::CoreError;
use crate::machine::{self, Transition};
use crate::model::{AppConnectionState, ConnectionSnapshot, DeviceIdentity, PollFault, PollHealth};
use crate::poller::Poller;
use crate::wireless::{self, UpgradeOutcome};

const COMMAND_CHANNEL_SIZE: usize = 16;
const EVENT_CHANNEL_SIZE: usize = 64;

// ── StatusEvent ──────────────────────────────────────────────────

/// Notable things that happened on the scheduler task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum StatusEvent {
    StateChanged(Transition),
    /// Emitted once per streak of polls that could not find the tool.
    ToolMissing { tool: String, path: PathBuf },
    /// Emitted when the timeout streak reaches the configured threshold.
    PollTimedOut { consecutive: u32 },
    UpgradePending { target: DeviceIdentity },
    UpgradeFailed { message: String },
    WirelessDisconnected,
}

// ── Controller ───────────────────────────────────────────────────

/// Handle to the status scheduler.
///
/// Cheaply cloneable. Does nothing until [`start()`](Self::start) spawns
/// the scheduler task.
pub struct Controller<B> {
    inner: Arc<ControllerInner<B>>,
}

impl<B> Clone for Controller<B> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct ControllerInner<B> {
    config: ControllerConfig,
    poller: Poller<B>,
    state: watch::Sender<AppConnectionState>,
    health: watch::Sender<PollHealth>,
    event_tx: broadcast::Sender<StatusEvent>,
    command_tx: mpsc::Sender<CommandEnvelope>,
    command_rx: Mutex<Option<mpsc::Receiver<CommandEnvelope>>>,
    cancel: CancellationToken,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl<B: DeviceBridge> Controller<B> {
    pub fn new(bridge: Arc<B>, config: ControllerConfig) -> Self {
        let (state, _) = watch::channel(AppConnectionState::absent());
        let (health, _) = watch::channel(PollHealth::Ok);
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_SIZE);
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CHANNEL_SIZE);

        Self {
            inner: Arc::new(ControllerInner {
                config,
                poller: Poller::new(bridge),
                state,
                health,
                event_tx,
                command_tx,
                command_rx: Mutex::new(Some(command_rx)),
                cancel: CancellationToken::new(),
                task_handles: Mutex::new(Vec::new()),
            }),
        }
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Spawn the scheduler task. The first poll runs immediately.
    /// Calling this again is a no-op.
    pub async fn start(&self) {
        let Some(rx) = self.inner.command_rx.lock().await.take() else {
            debug!("scheduler already started");
            return;
        };
        let scheduler = Scheduler {
            inner: Arc::clone(&self.inner),
            current: self.inner.state.borrow().clone(),
            timeouts: 0,
        };
        let cancel = self.inner.cancel.child_token();
        self.inner
            .task_handles
            .lock()
            .await
            .push(tokio::spawn(scheduler.run(rx, cancel)));
        info!(
            interval_ms = self.inner.config.refresh_interval.as_millis(),
            "status scheduler started"
        );
    }

    /// Stop the scheduler and wait for it to exit.
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();
        let mut handles = self.inner.task_handles.lock().await;
        for handle in handles.drain(..) {
            let _ = handle.await;
        }
        debug!("status scheduler stopped");
    }

    // ── Commands ─────────────────────────────────────────────────

    /// Queue a command for the scheduler task and await its result.
    pub async fn execute(&self, command: Command) -> Result<CommandResult, CoreError> {
        if self.inner.cancel.is_cancelled() {
            return Err(CoreError::Disconnected);
        }

        let (tx, rx) = oneshot::channel();
        self.inner
            .command_tx
            .send(CommandEnvelope {
                command,
                response_tx: tx,
            })
            .await
            .map_err(|_| CoreError::Disconnected)?;

        rx.await.map_err(|_| CoreError::Disconnected)?
    }

    pub async fn refresh(&self) -> Result<AppConnectionState, CoreError> {
        match self.execute(Command::Refresh).await? {
            CommandResult::State(state) => Ok(state),
            CommandResult::Upgrade(_) => Ok(self.current()),
        }
    }

    pub async fn upgrade_wireless(&self) -> Result<UpgradeOutcome, CoreError> {
        match self.execute(Command::UpgradeWireless).await? {
            CommandResult::Upgrade(outcome) => Ok(outcome),
            CommandResult::State(state) => Err(CoreError::InvalidState {
                operation: "connect wirelessly",
                state: state.state,
            }),
        }
    }

    pub async fn disconnect_wireless(&self) -> Result<AppConnectionState, CoreError> {
        match self.execute(Command::DisconnectWireless).await? {
            CommandResult::State(state) => Ok(state),
            CommandResult::Upgrade(_) => Ok(self.current()),
        }
    }

    // ── Observation ──────────────────────────────────────────────

    /// Subscribe to state changes.
    pub fn state(&self) -> watch::Receiver<AppConnectionState> {
        self.inner.state.subscribe()
    }

    pub fn current(&self) -> AppConnectionState {
        self.inner.state.borrow().clone()
    }

    pub fn health(&self) -> watch::Receiver<PollHealth> {
        self.inner.health.subscribe()
    }

    pub fn events(&self) -> broadcast::Receiver<StatusEvent> {
        self.inner.event_tx.subscribe()
    }
}

/// Poll once and fold the result into a cold `Absent` state.
///
/// For one-shot commands that want a status without running the
/// scheduler.
pub async fn probe<B: DeviceBridge>(
    bridge: Arc<B>,
) -> Result<(AppConnectionState, ConnectionSnapshot), CoreError> {
    let snapshot = Poller::new(bridge).poll().await?;
    let state = machine::next(&AppConnectionState::absent(), &snapshot);
    Ok((state, snapshot))
}

// ── Scheduler task ───────────────────────────────────────────────

/// State owned by the scheduler task. Nothing else writes `current`.
struct Scheduler<B> {
    inner: Arc<ControllerInner<B>>,
    current: AppConnectionState,
    timeouts: u32,
}

impl<B: DeviceBridge> Scheduler<B> {
    async fn run(mut self, mut rx: mpsc::Receiver<CommandEnvelope>, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(self.inner.config.refresh_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                envelope = rx.recv() => {
                    let Some(envelope) = envelope else { break };
                    let result = self.handle(envelope.command).await;
                    let _ = envelope.response_tx.send(result);
                }
                _ = interval.tick() => self.tick().await,
            }
        }
    }

    async fn tick(&mut self) {
        let snapshot = match self.inner.poller.poll().await {
            Ok(snapshot) => {
                self.record_poll(snapshot.fault.as_ref());
                snapshot
            }
            Err(CoreError::ToolNotFound { tool, path }) => {
                self.timeouts = 0;
                let already = self.inner.health.borrow().is_tool_missing();
                self.inner.health.send_replace(PollHealth::ToolMissing {
                    tool: tool.clone(),
                    path: path.clone(),
                });
                if !already {
                    warn!(tool, path = %path.display(), "device bridge tool not found");
                    self.emit(StatusEvent::ToolMissing { tool, path });
                }
                ConnectionSnapshot::empty()
            }
            Err(err) => {
                warn!(error = %err, "device poll failed");
                ConnectionSnapshot::empty()
            }
        };

        let next = machine::next(&self.current, &snapshot);
        self.apply(next);
    }

    /// Track the timeout streak. Other faults break the streak but say
    /// nothing about whether adb is healthy, so health is left as it was.
    fn record_poll(&mut self, fault: Option<&PollFault>) {
        match fault {
            Some(PollFault::Timeout) => self.record_timeout(),
            Some(other) => {
                self.timeouts = 0;
                debug!(fault = ?other, "device poll faulted; health unchanged");
            }
            None => {
                self.timeouts = 0;
                self.inner.health.send_if_modified(|health| {
                    if *health == PollHealth::Ok {
                        false
                    } else {
                        *health = PollHealth::Ok;
                        true
                    }
                });
            }
        }
    }

    fn record_timeout(&mut self) {
        let warn_after = self.inner.config.timeout_warn_after.max(1);
        self.timeouts = self.timeouts.saturating_add(1);
        if self.timeouts < warn_after {
            return;
        }
        self.inner.health.send_replace(PollHealth::TimingOut {
            consecutive: self.timeouts,
        });
        if self.timeouts == warn_after {
            warn!(consecutive = self.timeouts, "device bridge keeps timing out");
            self.emit(StatusEvent::PollTimedOut {
                consecutive: self.timeouts,
            });
        }
    }

    async fn handle(&mut self, command: Command) -> Result<CommandResult, CoreError> {
        debug!(?command, "running command");
        match command {
            Command::Refresh => {
                self.tick().await;
                Ok(CommandResult::State(self.current.clone()))
            }
            Command::UpgradeWireless => {
                let bridge = Arc::clone(self.inner.poller.bridge());
                let ports = &self.inner.config.wireless_ports;
                match wireless::request_wireless_upgrade(&*bridge, &self.current, ports).await {
                    Ok((next, outcome)) => {
                        self.apply(next);
                        self.emit(StatusEvent::UpgradePending {
                            target: outcome.target().clone(),
                        });
                        Ok(CommandResult::Upgrade(outcome))
                    }
                    Err(err) => {
                        if !matches!(err, CoreError::InvalidState { .. }) {
                            warn!(error = %err, "wireless upgrade failed");
                            self.emit(StatusEvent::UpgradeFailed {
                                message: err.to_string(),
                            });
                        }
                        Err(err)
                    }
                }
            }
            Command::DisconnectWireless => {
                let bridge = Arc::clone(self.inner.poller.bridge());
                let next = wireless::request_wireless_disconnect(&*bridge, &self.current).await?;
                self.apply(next);
                self.emit(StatusEvent::WirelessDisconnected);
                Ok(CommandResult::State(self.current.clone()))
            }
        }
    }

    fn apply(&mut self, next: AppConnectionState) {
        if next == self.current {
            return;
        }
        if let Some(transition) = machine::describe(&self.current, &next) {
            info!(
                from = %transition.from,
                to = %transition.to,
                device = transition.identity.as_ref().map(ToString::to_string),
                "connection state changed"
            );
            self.emit(StatusEvent::StateChanged(transition));
        }
        self.inner.state.send_replace(next.clone());
        self.current = next;
    }

    fn emit(&self, event: StatusEvent) {
        // No subscribers is fine.
        let _ = self.inner.event_tx.send(event);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::net::Ipv4Addr;
    use std::time::Duration;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::model::DeviceState;
    use crate::testing::FakeBridge;

    fn controller(bridge: &Arc<FakeBridge>) -> Controller<FakeBridge> {
        Controller::new(Arc::clone(bridge), ControllerConfig::default())
    }

    async fn next_event(events: &mut broadcast::Receiver<StatusEvent>) -> StatusEvent {
        tokio::time::timeout(Duration::from_secs(60), events.recv())
            .await
            .unwrap()
            .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn first_poll_runs_on_start() {
        let bridge = Arc::new(FakeBridge::with_listing("List of devices attached\nS1\tdevice\n"));
        let ctrl = controller(&bridge);
        let mut events = ctrl.events();
        ctrl.start().await;

        assert_eq!(
            next_event(&mut events).await,
            StatusEvent::StateChanged(Transition {
                from: DeviceState::Absent,
                to: DeviceState::Ready,
                identity: Some(DeviceIdentity::serial("S1")),
            })
        );
        assert_eq!(ctrl.current().state, DeviceState::Ready);
        ctrl.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn polls_on_interval() {
        let bridge = Arc::new(FakeBridge::with_listing(""));
        let ctrl = controller(&bridge);
        let mut state = ctrl.state();
        ctrl.start().await;

        bridge.set_listing("S1\tunauthorized\n");
        state
            .wait_for(|s| s.state == DeviceState::Unauthorized)
            .await
            .unwrap();

        bridge.set_listing("S1\tdevice\n");
        state.wait_for(|s| s.state == DeviceState::Ready).await.unwrap();
        assert!(bridge.calls().iter().filter(|c| *c == "devices").count() >= 2);
        ctrl.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn wireless_upgrade_is_confirmed_by_next_poll() {
        let bridge = Arc::new(FakeBridge::with_listing("S1\tdevice\n"));
        bridge.set_wifi(Ipv4Addr::new(192, 168, 1, 10));
        let ctrl = controller(&bridge);
        ctrl.start().await;
        assert_eq!(ctrl.refresh().await.unwrap().state, DeviceState::Ready);

        let mut events = ctrl.events();
        let outcome = ctrl.upgrade_wireless().await.unwrap();
        let target = DeviceIdentity::host_port("192.168.1.10", 5555);
        assert_eq!(outcome.target(), &target);
        assert_eq!(
            next_event(&mut events).await,
            StatusEvent::UpgradePending {
                target: target.clone()
            }
        );
        assert_eq!(ctrl.current().wireless_upgrade_in_flight, Some(target.clone()));

        bridge.set_listing("S1\tdevice\n192.168.1.10:5555\tdevice\n");
        let state = ctrl.refresh().await.unwrap();
        assert_eq!(
            state,
            AppConnectionState::new(DeviceState::ReadyWireless, Some(target))
        );
        ctrl.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn upgrade_while_absent_is_rejected() {
        let bridge = Arc::new(FakeBridge::with_listing(""));
        let ctrl = controller(&bridge);
        ctrl.start().await;
        ctrl.refresh().await.unwrap();

        let err = ctrl.upgrade_wireless().await.unwrap_err();
        assert!(matches!(err, CoreError::InvalidState { .. }));
        assert!(bridge.calls().iter().all(|c| c == "devices"));
        assert_eq!(ctrl.current(), AppConnectionState::absent());
        ctrl.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn failed_upgrade_leaves_state_alone() {
        let bridge = Arc::new(FakeBridge::with_listing("S1\tdevice\n"));
        bridge.set_wifi(Ipv4Addr::new(192, 168, 1, 10));
        bridge.push_connect(Err(questcast_bridge::Error::Rejected {
            command: "adb connect 192.168.1.10:5555".into(),
            output: "failed to connect to 192.168.1.10:5555".into(),
        }));
        let ctrl = controller(&bridge);
        ctrl.start().await;
        let before = ctrl.refresh().await.unwrap();

        let mut events = ctrl.events();
        let err = ctrl.upgrade_wireless().await.unwrap_err();
        assert!(matches!(err, CoreError::Upgrade { .. }));
        assert!(matches!(
            next_event(&mut events).await,
            StatusEvent::UpgradeFailed { .. }
        ));
        assert_eq!(ctrl.current(), before);
        ctrl.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_streak_is_reported_once() {
        let bridge = Arc::new(FakeBridge::with_listing("S1\tdevice\n"));
        for _ in 0..3 {
            bridge.push_listing_error(questcast_bridge::Error::Timeout {
                command: "adb devices".into(),
                timeout_ms: 4000,
            });
        }
        let ctrl = controller(&bridge);
        let mut events = ctrl.events();
        ctrl.start().await;

        assert_eq!(
            next_event(&mut events).await,
            StatusEvent::PollTimedOut { consecutive: 3 }
        );
        assert_eq!(
            *ctrl.health().borrow(),
            PollHealth::TimingOut { consecutive: 3 }
        );

        // The fourth poll succeeds and clears the streak.
        assert!(matches!(
            next_event(&mut events).await,
            StatusEvent::StateChanged(_)
        ));
        assert_eq!(*ctrl.health().borrow(), PollHealth::Ok);
        ctrl.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn exit_status_fault_keeps_timeout_health() {
        let bridge = Arc::new(FakeBridge::with_listing("S1\tdevice\n"));
        for _ in 0..3 {
            bridge.push_listing_error(questcast_bridge::Error::Timeout {
                command: "adb devices".into(),
                timeout_ms: 4000,
            });
        }
        bridge.push_listing_error(questcast_bridge::Error::ExitStatus {
            command: "adb devices".into(),
            status: Some(1),
            output: "error: protocol fault".into(),
        });
        let ctrl = controller(&bridge);
        let mut health = ctrl.health();
        ctrl.start().await;

        health
            .wait_for(|h| *h == PollHealth::TimingOut { consecutive: 3 })
            .await
            .unwrap();
        // Wait until the faulted fourth poll has been recorded.
        let mut state = ctrl.state();
        while bridge.calls().iter().filter(|c| *c == "devices").count() < 4 {
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        assert_eq!(
            *ctrl.health().borrow(),
            PollHealth::TimingOut { consecutive: 3 }
        );

        // The fifth poll succeeds and clears the streak.
        state.wait_for(|s| s.state == DeviceState::Ready).await.unwrap();
        assert_eq!(*ctrl.health().borrow(), PollHealth::Ok);
        ctrl.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn missing_tool_reported_once_per_streak() {
        let bridge = Arc::new(FakeBridge::with_listing(""));
        for _ in 0..2 {
            bridge.push_listing_error(questcast_bridge::Error::ToolNotFound {
                tool: "adb".into(),
                path: "/nonexistent/adb".into(),
            });
        }
        let ctrl = controller(&bridge);
        let mut events = ctrl.events();
        ctrl.start().await;

        assert_eq!(
            next_event(&mut events).await,
            StatusEvent::ToolMissing {
                tool: "adb".into(),
                path: "/nonexistent/adb".into(),
            }
        );
        assert!(ctrl.health().borrow().is_tool_missing());

        let mut health = ctrl.health();
        health.wait_for(|h| *h == PollHealth::Ok).await.unwrap();
        assert!(events.try_recv().is_err());
        ctrl.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn disconnect_returns_to_usb() {
        let bridge = Arc::new(FakeBridge::with_listing("192.168.1.10:5555\tdevice\n"));
        let ctrl = controller(&bridge);
        ctrl.start().await;
        assert_eq!(ctrl.refresh().await.unwrap().state, DeviceState::ReadyWireless);

        let mut events = ctrl.events();
        ctrl.disconnect_wireless().await.unwrap();
        assert_eq!(next_event(&mut events).await, StatusEvent::WirelessDisconnected);
        assert!(bridge.calls().contains(&"disconnect 192.168.1.10:5555".to_owned()));
        ctrl.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn commands_fail_after_shutdown() {
        let bridge = Arc::new(FakeBridge::default());
        let ctrl = controller(&bridge);
        ctrl.start().await;
        ctrl.shutdown().await;
        assert!(matches!(
            ctrl.refresh().await,
            Err(CoreError::Disconnected)
        ));
    }

    #[tokio::test]
    async fn probe_folds_from_absent() {
        let bridge = Arc::new(FakeBridge::with_listing("S1\tunauthorized\n"));
        let (state, snapshot) = probe(bridge).await.unwrap();
        assert_eq!(state.state, DeviceState::Unauthorized);
        assert_eq!(snapshot.len(), 1);
    }
}
