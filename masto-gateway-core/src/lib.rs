//! Core wire-shape types for masto-gateway.
//!
//! This crate provides the transport-independent pieces used by the
//! `masto-gateway` client crate.
//!
//! ## Modules
//!
//! - `error`: Error kinds and the classified API error
//! - `transform`: Recursive key case conversion for JSON payloads
//! - `flatten`: Bracket-notation flattening for form encoded bodies
//! - `version`: Remote version parsing and version gating
//! - `link`: `Link` response header parsing

mod error;
mod flatten;
mod link;
mod transform;
mod version;

pub use error::*;
pub use flatten::*;
pub use link::*;
pub use transform::*;
pub use version::*;
