//! Record reconstruction module
//!
//! Turns the event stream into completed reporting-structure records.
//!
//! # Overview
//!
//! - `PathMatcher` - classifies an event path into a `StructuralTag`
//! - `ObjectReconstructor` - keeps the one open record and its open child
//!   items, and hands back each record when it closes
//! - `Record`, `FileRef`, `PlanRef` - the reconstructed model

mod matcher;
mod reconstructor;
mod types;

pub use matcher::PathMatcher;
pub use reconstructor::{ObjectReconstructor, ReconstructStats};
pub use types::{EntityField, FileField, FileRef, PlanField, PlanRef, Record, StructuralTag};
