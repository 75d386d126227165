// ── Domain model ──
//
// Typed view of the device bridge's world. Nothing in here touches raw
// tool output; the poller converts text into these types.

pub mod identity;
pub mod snapshot;
pub mod state;

pub use identity::{DeviceIdentity, Transport};
pub use snapshot::{ConnectionSnapshot, ObservedDevice, PollFault};
pub use state::{AppConnectionState, DeviceState, PollHealth};
