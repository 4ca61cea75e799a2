//! Reconstruction types
//!
//! The in-flight model rebuilt from events and the structural tags that drive
//! the state machine.

use serde::Serialize;

/// Document-level entity fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityField {
    /// `reporting_entity_name`
    Name,
    /// `reporting_entity_type`
    Type,
}

/// Fields of an in-network file reference
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileField {
    /// `location`
    Location,
    /// `description`
    Description,
}

/// Fields of a reporting plan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanField {
    /// `plan_name`
    Name,
    /// `plan_id_type`
    IdType,
    /// `plan_id`
    Id,
    /// `plan_market_type`
    MarketType,
}

/// Structural meaning of one event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StructuralTag {
    EntityScalar(EntityField),
    RecordStart,
    RecordEnd,
    FileItemStart,
    FileItemEnd,
    FileField(FileField),
    PlanItemStart,
    PlanItemEnd,
    PlanField(PlanField),
    /// Anything else; dropped by the reconstructor
    Unrecognized,
}

/// Reference to one in-network file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FileRef {
    pub location: String,
    pub description: String,
}

impl FileRef {
    /// Set one field
    pub fn set(&mut self, field: FileField, value: String) {
        match field {
            FileField::Location => self.location = value,
            FileField::Description => self.description = value,
        }
    }
}

/// Reference to one reporting plan
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PlanRef {
    pub plan_name: String,
    pub plan_id_type: String,
    pub plan_id: String,
    pub plan_market_type: String,
}

/// Plan used for records that list no plans
static EMPTY_PLAN: PlanRef = PlanRef {
    plan_name: String::new(),
    plan_id_type: String::new(),
    plan_id: String::new(),
    plan_market_type: String::new(),
};

impl PlanRef {
    /// Set one field
    pub fn set(&mut self, field: PlanField, value: String) {
        match field {
            PlanField::Name => self.plan_name = value,
            PlanField::IdType => self.plan_id_type = value,
            PlanField::Id => self.plan_id = value,
            PlanField::MarketType => self.plan_market_type = value,
        }
    }
}

/// One reporting structure
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Record {
    /// 1-based position among completed records, assigned at close
    pub index: u64,
    pub entity_name: String,
    pub entity_type: String,
    pub in_network_files: Vec<FileRef>,
    pub reporting_plans: Vec<PlanRef>,
}

impl Record {
    /// Create an empty record for the given entity
    pub fn new(entity_name: impl Into<String>, entity_type: impl Into<String>) -> Self {
        Self {
            entity_name: entity_name.into(),
            entity_type: entity_type.into(),
            ..Self::default()
        }
    }

    /// Set a document-level entity field
    pub fn set_entity(&mut self, field: EntityField, value: String) {
        match field {
            EntityField::Name => self.entity_name = value,
            EntityField::Type => self.entity_type = value,
        }
    }

    /// Plans to pair with files: the listed plans, or one empty plan when
    /// none are listed
    pub fn plans_or_empty(&self) -> &[PlanRef] {
        if self.reporting_plans.is_empty() {
            std::slice::from_ref(&EMPTY_PLAN)
        } else {
            &self.reporting_plans
        }
    }
}
