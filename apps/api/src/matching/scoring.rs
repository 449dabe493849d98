//! Scoring Policy: fixed weighting of the four sub-scores into one percentage.
//!
//! Pure and deterministic: no I/O, no clock, no randomness. The weights are an
//! engine-wide setting (never per call) and must sum to 1.0.

use std::str::FromStr;

use thiserror::Error;

use crate::matching::models::ScoreBreakdown;

const SUM_TOLERANCE: f64 = 1e-6;

/// skills 40%, experience 30%, education 20%, overall fit 10%.
pub const DEFAULT_WEIGHTS: ScoringWeights = ScoringWeights {
    skills: 0.40,
    experience: 0.30,
    education: 0.20,
    fit: 0.10,
};

/// Only constructible through `new` or `FromStr`, so a value always sums to 1.0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoringWeights {
    skills: f64,
    experience: f64,
    education: f64,
    fit: f64,
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum WeightsError {
    #[error("weights must be finite and non-negative")]
    Negative,

    #[error("weights must sum to 1.0 (got {0})")]
    BadSum(f64),

    #[error("expected four comma-separated weights (skills,experience,education,fit): {0}")]
    Unparsable(String),
}

impl Default for ScoringWeights {
    fn default() -> Self {
        DEFAULT_WEIGHTS
    }
}

impl ScoringWeights {
    pub fn new(skills: f64, experience: f64, education: f64, fit: f64) -> Result<Self, WeightsError> {
        let weights = Self {
            skills,
            experience,
            education,
            fit,
        };
        if weights
            .as_array()
            .iter()
            .any(|w| !w.is_finite() || *w < 0.0)
        {
            return Err(WeightsError::Negative);
        }
        let sum = weights.sum();
        if (sum - 1.0).abs() > SUM_TOLERANCE {
            return Err(WeightsError::BadSum(sum));
        }
        Ok(weights)
    }

    pub fn skills(&self) -> f64 {
        self.skills
    }

    pub fn experience(&self) -> f64 {
        self.experience
    }

    pub fn education(&self) -> f64 {
        self.education
    }

    pub fn fit(&self) -> f64 {
        self.fit
    }

    pub fn sum(&self) -> f64 {
        self.as_array().iter().sum()
    }

    fn as_array(&self) -> [f64; 4] {
        [self.skills, self.experience, self.education, self.fit]
    }

    /// Weighted sum rounded to the nearest integer percentage.
    pub fn overall_score(&self, breakdown: &ScoreBreakdown) -> u8 {
        let raw = self.skills * breakdown.skills_match
            + self.experience * breakdown.experience_level
            + self.education * breakdown.education_relevance
            + self.fit * breakdown.overall_fit;
        raw.round().clamp(0.0, 100.0) as u8
    }
}

impl FromStr for ScoringWeights {
    type Err = WeightsError;

    /// Parses `"0.4,0.3,0.2,0.1"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts = s
            .split(',')
            .map(|part| part.trim().parse::<f64>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| WeightsError::Unparsable(s.to_string()))?;

        match parts.as_slice() {
            [skills, experience, education, fit] => Self::new(*skills, *experience, *education, *fit),
            _ => Err(WeightsError::Unparsable(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn overall_score(breakdown: &ScoreBreakdown) -> u8 {
        ScoringWeights::default().overall_score(breakdown)
    }

    fn breakdown(skills: f64, experience: f64, education: f64, fit: f64) -> ScoreBreakdown {
        ScoreBreakdown {
            skills_match: skills,
            experience_level: experience,
            education_relevance: education,
            overall_fit: fit,
        }
    }

    #[test]
    fn test_default_weights_sum_to_one() {
        assert!((DEFAULT_WEIGHTS.sum() - 1.0).abs() < SUM_TOLERANCE);
    }

    #[test]
    fn test_overall_score_matches_formula_across_grid() {
        let steps: [f64; 7] = [0.0, 12.5, 33.0, 50.0, 67.0, 89.9, 100.0];
        for &s in &steps {
            for &e in &steps {
                for &d in &steps {
                    for &f in &steps {
                        let expected = (0.4 * s + 0.3 * e + 0.2 * d + 0.1 * f).round() as u8;
                        assert_eq!(overall_score(&breakdown(s, e, d, f)), expected);
                    }
                }
            }
        }
    }

    #[test]
    fn test_overall_score_is_deterministic() {
        let b = breakdown(67.0, 80.0, 70.0, 75.0);
        let first = overall_score(&b);
        for _ in 0..100 {
            assert_eq!(overall_score(&b), first);
        }
        // 26.8 + 24 + 14 + 7.5 = 72.3
        assert_eq!(first, 72);
    }

    #[test]
    fn test_extremes() {
        assert_eq!(overall_score(&breakdown(0.0, 0.0, 0.0, 0.0)), 0);
        assert_eq!(overall_score(&breakdown(100.0, 100.0, 100.0, 100.0)), 100);
    }

    #[test]
    fn test_custom_weights_are_applied() {
        let weights = ScoringWeights::new(0.25, 0.25, 0.25, 0.25).unwrap();
        assert_eq!(weights.overall_score(&breakdown(100.0, 0.0, 100.0, 0.0)), 50);
    }

    #[test]
    fn test_weights_must_sum_to_one() {
        assert!(matches!(
            ScoringWeights::new(0.5, 0.3, 0.2, 0.1),
            Err(WeightsError::BadSum(_))
        ));
        assert_eq!(
            ScoringWeights::new(1.2, -0.2, 0.0, 0.0),
            Err(WeightsError::Negative)
        );
    }

    #[test]
    fn test_weights_parse_from_config_string() {
        let weights: ScoringWeights = "0.5, 0.2, 0.2, 0.1".parse().unwrap();
        assert_eq!(weights.skills(), 0.5);
        assert_eq!(weights.fit(), 0.1);
        assert!(matches!(
            "0.5,0.5".parse::<ScoringWeights>(),
            Err(WeightsError::Unparsable(_))
        ));
        assert!(matches!(
            "a,b,c,d".parse::<ScoringWeights>(),
            Err(WeightsError::Unparsable(_))
        ));
    }
}
