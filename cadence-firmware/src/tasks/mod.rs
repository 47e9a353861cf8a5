//! Embassy async tasks
//!
//! Each task runs independently and communicates via channels/signals.

pub mod controller;
pub mod dmx;
pub mod estop;
pub mod status;
pub mod tick;

pub use controller::controller_task;
pub use dmx::dmx_task;
pub use estop::estop_task;
pub use status::status_task;
pub use tick::tick_task;
