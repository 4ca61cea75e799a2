//! Transform implementations
//!
//! One transform per output table.

use super::file_name::{classify_file, derive_file_name};
use super::types::{Enrichment, Row, TableSchema, Transform, TransformContext};
use crate::reconstruct::Record;

// ============================================================================
// ToC Metadata
// ============================================================================

/// One row per referenced file
pub static TOC_METADATA_SCHEMA: TableSchema = TableSchema {
    name: "toc_metadata",
    file_name: "toc_metadata.csv",
    columns: &[
        "carrier",
        "dh_re_id",
        "re_name",
        "toc_source_url",
        "batch",
        "toc_file_name",
        "toc_file_url",
        "toc_or_mrf_file",
        "mrf_file_plan_name",
        "reporting_structure_index",
        "remarks",
    ],
};

/// File listing with TOC/MRF classification
#[derive(Debug, Clone, Copy, Default)]
pub struct TocMetadata;

impl Transform for TocMetadata {
    fn schema(&self) -> &'static TableSchema {
        &TOC_METADATA_SCHEMA
    }

    fn transform(&self, record: &Record, context: &TransformContext) -> Vec<Row> {
        record
            .in_network_files
            .iter()
            .map(|file| {
                let file_name = derive_file_name(&file.location);
                let class = classify_file(&file_name);
                Row::new(
                    &TOC_METADATA_SCHEMA,
                    vec![
                        context.carrier.clone(),
                        String::new(),
                        record.entity_name.clone(),
                        context.source_url.clone(),
                        context.batch.clone(),
                        file_name,
                        file.location.clone(),
                        class.to_string(),
                        String::new(),
                        record.index.to_string(),
                        String::new(),
                    ],
                )
            })
            .collect()
    }
}

// ============================================================================
// ToC MRF Metadata
// ============================================================================

/// One row per file and plan pair
pub static TOC_MRF_METADATA_SCHEMA: TableSchema = TableSchema {
    name: "toc_mrf_metadata",
    file_name: "toc_mrf_metadata.csv",
    columns: &[
        "reporting_entity_name",
        "reporting_entity_type",
        "reporting_structure",
        "in_network_file_name",
        "in_network_file_location",
        "in_network_file_description",
        "allowed_amount_file_name",
        "allowed_amount_file_location",
        "allowed_amount_file_description",
        "plan_name",
        "plan_id_type",
        "plan_id",
        "plan_market_type",
        "toc_source_file_name",
        "parsed_date",
        "carrier",
        "batch",
    ],
};

/// Denormalized file x plan listing
#[derive(Debug, Clone, Copy, Default)]
pub struct TocMrfMetadata;

impl Transform for TocMrfMetadata {
    fn schema(&self) -> &'static TableSchema {
        &TOC_MRF_METADATA_SCHEMA
    }

    fn transform(&self, record: &Record, context: &TransformContext) -> Vec<Row> {
        let plans = record.plans_or_empty();
        let mut rows = Vec::with_capacity(plans.len() * record.in_network_files.len());

        for plan in plans {
            for file in &record.in_network_files {
                rows.push(Row::new(
                    &TOC_MRF_METADATA_SCHEMA,
                    vec![
                        record.entity_name.clone(),
                        record.entity_type.clone(),
                        "group".to_string(),
                        derive_file_name(&file.location),
                        file.location.clone(),
                        file.description.clone(),
                        String::new(),
                        String::new(),
                        String::new(),
                        plan.plan_name.clone(),
                        plan.plan_id_type.clone(),
                        plan.plan_id.clone(),
                        plan.plan_market_type.clone(),
                        context.source_file_name.clone(),
                        context.parsed_date.clone(),
                        context.carrier.clone(),
                        context.batch.clone(),
                    ],
                ));
            }
        }
        rows
    }
}

// ============================================================================
// ToC MRF Size
// ============================================================================

/// Column filled with the remote byte size
pub const SIZE_COLUMN: &str = "in_network_file_size";

/// Column carrying the lookup remark
pub const REMARKS_COLUMN: &str = "remarks";

/// One row per file, size filled by enrichment
pub static TOC_MRF_SIZE_SCHEMA: TableSchema = TableSchema {
    name: "toc_mrf_size",
    file_name: "toc_mrf_size_data.csv",
    columns: &[
        "in_network_file_name",
        SIZE_COLUMN,
        REMARKS_COLUMN,
        "carrier",
        "batch",
    ],
};

/// File sizes
#[derive(Debug, Clone, Copy, Default)]
pub struct TocMrfSize;

impl Transform for TocMrfSize {
    fn schema(&self) -> &'static TableSchema {
        &TOC_MRF_SIZE_SCHEMA
    }

    fn transform(&self, record: &Record, context: &TransformContext) -> Vec<Row> {
        record
            .in_network_files
            .iter()
            .map(|file| {
                Row::new(
                    &TOC_MRF_SIZE_SCHEMA,
                    vec![
                        derive_file_name(&file.location),
                        String::new(),
                        String::new(),
                        context.carrier.clone(),
                        context.batch.clone(),
                    ],
                )
            })
            .collect()
    }

    fn enrichment(&self) -> Enrichment {
        Enrichment::FileSize
    }
}

/// The three tables in output order
pub fn standard_transforms() -> Vec<Box<dyn Transform>> {
    vec![
        Box::new(TocMetadata),
        Box::new(TocMrfMetadata),
        Box::new(TocMrfSize),
    ]
}
