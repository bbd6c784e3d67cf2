//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (accept loop, one task per socket, start/stop)
//!     → connection.rs (live set, state machine, read → route → write → close)
//!
//! Connection States:
//!     Accepted → Reading → Parsed → Responding → Closed
//! ```
//!
//! # Design Decisions
//! - One request per connection, always `Connection: close`
//! - Every connection is tracked so stop() can cancel it
//! - Reads and writes are time-bounded; a stuck peer cannot pin a task

pub mod connection;
pub mod listener;

pub use connection::{ConnectionId, ConnectionOutcome, ConnectionState, ConnectionTracker};
pub use listener::{FrameGateway, GatewayError, ListenerState};
