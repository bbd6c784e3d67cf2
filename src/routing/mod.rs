//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! ParsedRequest (path or Malformed)
//!     → matcher.rs (image route prefix)
//!     → router.rs  (image → FrameCache::load, else viewer page)
//!     → HttpResponse
//! ```
//!
//! # Design Decisions
//! - Routes fixed at startup, immutable at runtime
//! - Deterministic: same input and cache state always give the same response
//! - Malformed requests fall through to the viewer page, never an error

pub mod matcher;
pub mod router;

pub use router::{ResponseRouter, RouteKind};
