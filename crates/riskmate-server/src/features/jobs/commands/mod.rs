pub mod archive;
pub mod create;
pub mod update;

pub use archive::{ArchiveJobError, ArchiveJobResponse};
pub use create::{CreateJobCommand, CreateJobError};
pub use update::{UpdateJobCommand, UpdateJobError};

use std::collections::HashSet;

use chrono::NaiveDate;
use thiserror::Error;

use super::types::Hazard;
use crate::features::shared::{validate_text, TextValidationError};

pub const MAX_TEXT_FIELD_LEN: usize = 200;
pub const MAX_DESCRIPTION_LEN: usize = 5000;
pub const MAX_HAZARD_CODE_LEN: usize = 32;
pub const MAX_HAZARDS_PER_JOB: usize = 50;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HazardValidationError {
    #[error("Hazard {index}: {source}")]
    Field {
        index: usize,
        #[source]
        source: TextValidationError,
    },

    #[error("Hazard code '{0}' is listed more than once")]
    DuplicateCode(String),

    #[error("A job can list at most {MAX_HAZARDS_PER_JOB} hazards")]
    TooMany,
}

/// Trim hazard fields in place and check them
pub(crate) fn normalize_hazards(hazards: &mut [Hazard]) -> Result<(), HazardValidationError> {
    if hazards.len() > MAX_HAZARDS_PER_JOB {
        return Err(HazardValidationError::TooMany);
    }

    let mut seen = HashSet::new();
    for (index, hazard) in hazards.iter_mut().enumerate() {
        hazard.code = hazard.code.trim().to_uppercase();
        hazard.name = hazard.name.trim().to_string();

        validate_text("hazard code", &hazard.code, MAX_HAZARD_CODE_LEN)
            .and_then(|_| validate_text("hazard name", &hazard.name, MAX_TEXT_FIELD_LEN))
            .map_err(|source| HazardValidationError::Field { index, source })?;

        if !seen.insert(hazard.code.clone()) {
            return Err(HazardValidationError::DuplicateCode(hazard.code.clone()));
        }
    }
    Ok(())
}

/// `true` unless both dates are set and the end precedes the start
pub(crate) fn date_range_is_valid(start: Option<NaiveDate>, end: Option<NaiveDate>) -> bool {
    match (start, end) {
        (Some(start), Some(end)) => end >= start,
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::jobs::types::HazardSeverity;

    fn hazard(code: &str) -> Hazard {
        Hazard {
            code: code.to_string(),
            name: "Working at height".to_string(),
            severity: HazardSeverity::High,
        }
    }

    #[test]
    fn test_hazard_codes_are_normalized() {
        let mut hazards = vec![hazard("  wah-01 ")];
        normalize_hazards(&mut hazards).unwrap();
        assert_eq!(hazards[0].code, "WAH-01");
    }

    #[test]
    fn test_duplicate_codes_rejected_after_normalization() {
        let mut hazards = vec![hazard("elec"), hazard("ELEC ")];
        assert_eq!(
            normalize_hazards(&mut hazards),
            Err(HazardValidationError::DuplicateCode("ELEC".to_string()))
        );
    }

    #[test]
    fn test_blank_hazard_name_rejected() {
        let mut hazards = vec![Hazard {
            name: " ".to_string(),
            ..hazard("FALL")
        }];
        assert!(matches!(
            normalize_hazards(&mut hazards),
            Err(HazardValidationError::Field { index: 0, .. })
        ));
    }

    #[test]
    fn test_too_many_hazards() {
        let mut hazards: Vec<Hazard> =
            (0..=MAX_HAZARDS_PER_JOB).map(|i| hazard(&format!("H{i}"))).collect();
        assert_eq!(normalize_hazards(&mut hazards), Err(HazardValidationError::TooMany));
    }

    #[test]
    fn test_date_range() {
        let d = |s: &str| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok();
        assert!(date_range_is_valid(d("2024-05-01"), d("2024-05-01")));
        assert!(date_range_is_valid(d("2024-05-01"), None));
        assert!(!date_range_is_valid(d("2024-05-02"), d("2024-05-01")));
    }
}
