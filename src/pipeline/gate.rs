use super::error::{PipelineError, StructuralViolation};
use super::extract::ExtractionResult;
use super::thresholds::PolicyFlags;

/// Decides whether an extraction may proceed to statistics. Strict parsing
/// is checked first and does not depend on the ratio.
pub fn enforce_policy(
    extraction: &ExtractionResult,
    policy: &PolicyFlags,
) -> Result<(), PipelineError> {
    let unassigned = extraction.unassigned_items_count;

    if policy.strict_parsing && unassigned > 0 {
        return Err(PipelineError::StructuralViolation(
            StructuralViolation::StrictParsing {
                unassigned_count: unassigned,
            },
        ));
    }

    if extraction.unassigned_items_ratio > policy.max_unassigned_ratio {
        return Err(PipelineError::StructuralViolation(
            StructuralViolation::UnassignedRatio {
                ratio: extraction.unassigned_items_ratio,
                max_ratio: policy.max_unassigned_ratio,
            },
        ));
    }

    Ok(())
}
