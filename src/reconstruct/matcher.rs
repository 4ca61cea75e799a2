//! Path matcher
//!
//! Classifies event paths against the table-of-contents layout. Array
//! positions always read `item`, so matching never depends on an index.

use super::types::{EntityField, FileField, PlanField, StructuralTag};
use crate::event::EventKind;

const RECORD_PATH: &str = "reporting_structure.item";
const FILE_ITEM_SUFFIX: &str = ".in_network_files.item";
const PLAN_ITEM_SUFFIX: &str = ".reporting_plans.item";

/// Structural path classifier
#[derive(Debug, Clone, Copy, Default)]
pub struct PathMatcher;

impl PathMatcher {
    /// Create a matcher
    pub fn new() -> Self {
        Self
    }

    /// Classify one event
    pub fn classify(&self, path: &str, kind: EventKind) -> StructuralTag {
        match kind {
            EventKind::StartMap => Self::classify_boundary(path, true),
            EventKind::EndMap => Self::classify_boundary(path, false),
            EventKind::Scalar => Self::classify_scalar(path),
            EventKind::StartArray | EventKind::EndArray => StructuralTag::Unrecognized,
        }
    }

    fn classify_boundary(path: &str, start: bool) -> StructuralTag {
        if path == RECORD_PATH {
            if start {
                StructuralTag::RecordStart
            } else {
                StructuralTag::RecordEnd
            }
        } else if path.ends_with(FILE_ITEM_SUFFIX) {
            if start {
                StructuralTag::FileItemStart
            } else {
                StructuralTag::FileItemEnd
            }
        } else if path.ends_with(PLAN_ITEM_SUFFIX) {
            if start {
                StructuralTag::PlanItemStart
            } else {
                StructuralTag::PlanItemEnd
            }
        } else {
            StructuralTag::Unrecognized
        }
    }

    fn classify_scalar(path: &str) -> StructuralTag {
        match path {
            "reporting_entity_name" => return StructuralTag::EntityScalar(EntityField::Name),
            "reporting_entity_type" => return StructuralTag::EntityScalar(EntityField::Type),
            _ => {}
        }

        let Some((parent, field)) = path.rsplit_once('.') else {
            return StructuralTag::Unrecognized;
        };

        if parent.ends_with(FILE_ITEM_SUFFIX) {
            match field {
                "location" => StructuralTag::FileField(FileField::Location),
                "description" => StructuralTag::FileField(FileField::Description),
                _ => StructuralTag::Unrecognized,
            }
        } else if parent.ends_with(PLAN_ITEM_SUFFIX) {
            match field {
                "plan_name" => StructuralTag::PlanField(PlanField::Name),
                "plan_id_type" => StructuralTag::PlanField(PlanField::IdType),
                "plan_id" => StructuralTag::PlanField(PlanField::Id),
                "plan_market_type" => StructuralTag::PlanField(PlanField::MarketType),
                _ => StructuralTag::Unrecognized,
            }
        } else {
            StructuralTag::Unrecognized
        }
    }
}
