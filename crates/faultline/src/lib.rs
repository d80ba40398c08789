//! Faultline - runtime fault interception and structured classification.
//!
//! Receives a host runtime's uncaught-exception, error-notification, and
//! process-termination signals, classifies each onto a closed five-level
//! severity taxonomy, attaches invocation or request identity, and forwards
//! one structured record per qualifying event to a pluggable sink.
//!
//! Hook registration and record transport live at the edges (see the
//! `faultline_gcp` crate); this crate is the classification and enrichment
//! core and never performs I/O of its own.

pub mod context;
pub mod handler;
pub mod kind;
pub mod severity;
pub mod signal;
pub mod sink;

pub use context::*;
pub use handler::*;
pub use kind::*;
pub use severity::*;
pub use signal::*;
pub use sink::*;
