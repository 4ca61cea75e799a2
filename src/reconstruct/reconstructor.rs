//! Object reconstructor
//!
//! State machine holding at most one open record, one open file item and one
//! open plan item. Malformed nesting is logged and counted, never fatal.

use super::types::{EntityField, FileRef, PlanRef, Record, StructuralTag};
use crate::error::{Error, Result};
use crate::event::{EventKind, ParseEvent};
use crate::types::Scalar;
use std::collections::HashSet;
use tracing::{debug, warn};

/// Distinct unknown paths remembered for diagnostics
const MAX_TRACKED_UNKNOWN_PATHS: usize = 64;

/// Counters kept by the reconstructor
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconstructStats {
    /// Records handed out
    pub records_completed: u64,
    /// Events that did not fit the open state
    pub structural_violations: u64,
    /// Scalar events at paths the matcher does not know
    pub unknown_fields: u64,
}

/// Rebuilds records from classified events
#[derive(Debug, Default)]
pub struct ObjectReconstructor {
    entity_name: String,
    entity_type: String,
    open_record: Option<Record>,
    open_file: Option<FileRef>,
    open_plan: Option<PlanRef>,
    stats: ReconstructStats,
    unknown_paths: HashSet<String>,
}

impl ObjectReconstructor {
    /// Create an idle reconstructor
    pub fn new() -> Self {
        Self::default()
    }

    /// Current counters
    pub fn stats(&self) -> ReconstructStats {
        self.stats
    }

    /// Apply one classified event; returns the record it completed, if any
    ///
    /// An event that does not fit the open state is counted and returned as
    /// `Error::StructuralViolation`; the reconstructor stays usable.
    pub fn apply(&mut self, tag: StructuralTag, event: ParseEvent) -> Result<Option<Record>> {
        let ParseEvent { path, kind, value } = event;
        match tag {
            StructuralTag::EntityScalar(field) => {
                let value = field_value(value);
                if let Some(record) = self.open_record.as_mut() {
                    record.set_entity(field, value.clone());
                }
                match field {
                    EntityField::Name => self.entity_name = value,
                    EntityField::Type => self.entity_type = value,
                }
            }
            StructuralTag::RecordStart => {
                let replaced = self.open_record.replace(Record::new(
                    self.entity_name.clone(),
                    self.entity_type.clone(),
                ));
                self.open_file = None;
                self.open_plan = None;
                if replaced.is_some() {
                    return Err(self.violation(
                        "record opened while another was open; discarding the open one",
                    ));
                }
            }
            StructuralTag::RecordEnd => return self.close_record().map(Some),
            StructuralTag::FileItemStart => {
                if self.open_record.is_none() {
                    return Err(self.violation(format!("file item at '{path}' outside a record")));
                }
                if self.open_file.replace(FileRef::default()).is_some() {
                    return Err(self.violation("file item opened while another was open"));
                }
            }
            StructuralTag::FileField(field) => match self.open_file.as_mut() {
                Some(file) => file.set(field, field_value(value)),
                None => {
                    return Err(
                        self.violation(format!("file field '{path}' without an open file item"))
                    )
                }
            },
            StructuralTag::FileItemEnd => {
                let Some(file) = self.open_file.take() else {
                    return Err(self.violation(format!(
                        "file item end at '{path}' without an open file item"
                    )));
                };
                // An open item implies an open record
                if let Some(record) = self.open_record.as_mut() {
                    record.in_network_files.push(file);
                }
            }
            StructuralTag::PlanItemStart => {
                if self.open_record.is_none() {
                    return Err(self.violation(format!("plan item at '{path}' outside a record")));
                }
                if self.open_plan.replace(PlanRef::default()).is_some() {
                    return Err(self.violation("plan item opened while another was open"));
                }
            }
            StructuralTag::PlanField(field) => match self.open_plan.as_mut() {
                Some(plan) => plan.set(field, field_value(value)),
                None => {
                    return Err(
                        self.violation(format!("plan field '{path}' without an open plan item"))
                    )
                }
            },
            StructuralTag::PlanItemEnd => {
                let Some(plan) = self.open_plan.take() else {
                    return Err(self.violation(format!(
                        "plan item end at '{path}' without an open plan item"
                    )));
                };
                if let Some(record) = self.open_record.as_mut() {
                    record.reporting_plans.push(plan);
                }
            }
            StructuralTag::Unrecognized => {
                if kind == EventKind::Scalar {
                    self.note_unknown(path);
                }
            }
        }
        Ok(None)
    }

    /// Drop any record left open when the stream ended
    pub fn finish(&mut self) -> Result<()> {
        self.open_file = None;
        self.open_plan = None;
        if self.open_record.take().is_some() {
            return Err(
                self.violation("document ended inside a record; the partial record was dropped")
            );
        }
        Ok(())
    }

    fn close_record(&mut self) -> Result<Record> {
        let Some(mut record) = self.open_record.take() else {
            return Err(self.violation("record end without an open record"));
        };
        // Dangling items are dropped but the record itself is still good
        if self.open_file.take().is_some() {
            let error = self.violation("record closed with a file item still open; item dropped");
            warn!("{error}");
        }
        if self.open_plan.take().is_some() {
            let error = self.violation("record closed with a plan item still open; item dropped");
            warn!("{error}");
        }

        self.stats.records_completed += 1;
        record.index = self.stats.records_completed;
        debug!(
            index = record.index,
            files = record.in_network_files.len(),
            plans = record.reporting_plans.len(),
            "Record completed"
        );
        Ok(record)
    }

    /// Count a violation and describe it
    fn violation(&mut self, message: impl Into<String>) -> Error {
        self.stats.structural_violations += 1;
        Error::violation(message)
    }

    fn note_unknown(&mut self, path: String) {
        self.stats.unknown_fields += 1;
        if self.unknown_paths.len() < MAX_TRACKED_UNKNOWN_PATHS && !self.unknown_paths.contains(&path)
        {
            debug!(path = %path, "Dropping unrecognized field");
            self.unknown_paths.insert(path);
        }
    }
}

fn field_value(value: Option<Scalar>) -> String {
    value.map(Scalar::into_field).unwrap_or_default()
}
