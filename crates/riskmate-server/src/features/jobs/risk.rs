//! Job risk scoring
//!
//! Each hazard contributes a fixed weight by severity. The sum is capped at
//! 100 and bucketed into a level.

use serde::Serialize;

use super::types::{Hazard, HazardSeverity, RiskLevel};

pub const MAX_RISK_SCORE: i32 = 100;

pub fn severity_weight(severity: HazardSeverity) -> i32 {
    match severity {
        HazardSeverity::Critical => 25,
        HazardSeverity::High => 15,
        HazardSeverity::Medium => 8,
        HazardSeverity::Low => 3,
    }
}

pub fn level_for_score(score: i32) -> RiskLevel {
    match score {
        s if s >= 75 => RiskLevel::Critical,
        s if s >= 50 => RiskLevel::High,
        s if s >= 25 => RiskLevel::Medium,
        _ => RiskLevel::Low,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RiskAssessment {
    pub score: i32,
    pub level: RiskLevel,
}

pub fn assess(hazards: &[Hazard]) -> RiskAssessment {
    let score = hazards
        .iter()
        .map(|h| severity_weight(h.severity))
        .sum::<i32>()
        .min(MAX_RISK_SCORE);

    RiskAssessment {
        score,
        level: level_for_score(score),
    }
}
