//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Stop (net/listener.rs drives it):
//!     stop() → accept Shutdown triggered → accept loop exits, socket closed
//!            → connection Shutdown triggered → every live connection closes
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → binary calls stop()
//! ```
//!
//! # Design Decisions
//! - Ordered stop: stop accepting, cancel connections, report Stopped
//! - Stop waits a bounded time for connections to unwind

pub mod shutdown;
pub mod signals;

pub use shutdown::{Shutdown, ShutdownSignal};
pub use signals::wait_for_stop_signal;
