//! Enrichment module
//!
//! Fills the size column of file-size rows with the remote byte length of
//! each file, using a bounded pool of lookup workers.
//!
//! # Overview
//!
//! - `SizeResolver` - one metadata lookup per URL, never fails outright
//! - `SizeSidecar` - worker pool fed by a bounded queue; finished rows are
//!   drained by the coordinator
//! - `HttpClient` resolves sizes with a HEAD request

mod sidecar;
mod types;

pub use sidecar::{SidecarStats, SizeSidecar};
pub use types::{
    DisabledResolver, SizeJob, SizeLookup, SizeResolver, DISABLED_REMARK, MISSING_LENGTH_REMARK,
};
