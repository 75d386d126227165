// ── Casting ──
//
// Picks the device to mirror and starts the mirroring window. The window
// runs detached; its exit is only logged, since closing it normally
// yields a non-zero status.

use questcast_bridge::{Mirror, MirrorOptions, MirrorSession};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::CoreError;
use crate::model::{AppConnectionState, DeviceIdentity, DeviceState};

/// Identity to mirror given the current state.
///
/// An explicit `target` always wins. Otherwise a ready state mirrors its
/// own identity, so a confirmed wireless session is preferred over the
/// cable it was upgraded from.
pub fn cast_target(
    state: &AppConnectionState,
    target: Option<&DeviceIdentity>,
) -> Result<DeviceIdentity, CoreError> {
    if let Some(target) = target {
        return Ok(target.clone());
    }
    match (state.state, &state.identity) {
        (DeviceState::Ready | DeviceState::ReadyWireless, Some(identity)) => Ok(identity.clone()),
        (DeviceState::Unauthorized, _) => Err(CoreError::Unauthorized),
        _ => Err(CoreError::NoDevice),
    }
}

/// Start mirroring `target`.
pub fn launch(
    mirror: &Mirror,
    options: &MirrorOptions,
    target: &DeviceIdentity,
) -> Result<MirrorSession, CoreError> {
    let address = target.address();
    debug!(command = %mirror.command_line(options, Some(&address)), "launching mirror");
    mirror
        .launch(options, Some(&address))
        .map_err(|err| match err {
            questcast_bridge::Error::ToolNotFound { tool, path } => {
                CoreError::ToolNotFound { tool, path }
            }
            other => CoreError::Mirror {
                message: other.to_string(),
            },
        })
}

/// A mirroring window handed to a background task.
#[derive(Debug)]
pub struct DetachedSession {
    target: DeviceIdentity,
    pid: Option<u32>,
    waiter: JoinHandle<()>,
}

impl DetachedSession {
    pub fn target(&self) -> &DeviceIdentity {
        &self.target
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// True until the window has closed.
    pub fn is_running(&self) -> bool {
        !self.waiter.is_finished()
    }
}

/// Start mirroring and hand the session to a background task that waits
/// for the window to close.
///
/// Must be called from within a Tokio runtime.
pub fn launch_detached(
    mirror: &Mirror,
    options: &MirrorOptions,
    target: &DeviceIdentity,
) -> Result<DetachedSession, CoreError> {
    let session = launch(mirror, options, target)?;
    let pid = session.pid();
    let waiter = tokio::spawn(async move {
        if let Err(err) = session.wait().await {
            warn!(error = %err, "lost track of mirroring window");
        }
    });
    Ok(DetachedSession {
        target: target.clone(),
        pid,
        waiter,
    })
}
