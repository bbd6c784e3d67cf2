//! Latest-frame HTTP gateway library.
//!
//! One producer stores encoded snapshots into a single-slot [`FrameCache`];
//! any number of browsers fetch the newest one from a [`FrameGateway`].

pub mod config;
pub mod frame;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod routing;

pub use config::schema::GatewayConfig;
pub use frame::{Frame, FrameCache, ImageFormat};
pub use lifecycle::Shutdown;
pub use net::{FrameGateway, GatewayError, ListenerState};
