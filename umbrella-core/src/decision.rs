//! The umbrella rule.
//!
//! `need_umbrella = probability >= 30% || rainfall >= 0.2 mm`, both bounds
//! inclusive. Inputs are never clamped or validated: a `NaN` on either side
//! compares false and so falls through to "no umbrella".

use serde::{Deserialize, Serialize};

use crate::model::Recommendation;

/// Maximum precipitation probability, in percent, at which rain is likely.
pub const PROBABILITY_THRESHOLD_PERCENT: f64 = 30.0;

/// Daily rainfall, in millimetres, that counts as meaningful rain.
pub const RAINFALL_THRESHOLD_MM: f64 = 0.2;

/// Overridable decision thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    pub probability_percent: f64,
    pub rainfall_mm: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            probability_percent: PROBABILITY_THRESHOLD_PERCENT,
            rainfall_mm: RAINFALL_THRESHOLD_MM,
        }
    }
}

impl Thresholds {
    pub fn needs_umbrella(&self, probability_max_percent: f64, rainfall_sum_mm: f64) -> bool {
        probability_max_percent >= self.probability_percent || rainfall_sum_mm >= self.rainfall_mm
    }

    pub fn decide(&self, probability_max_percent: f64, rainfall_sum_mm: f64) -> Recommendation {
        if self.needs_umbrella(probability_max_percent, rainfall_sum_mm) {
            Recommendation {
                need_umbrella: true,
                emoji: "🌧️☂️".to_string(),
                title: "Carry an umbrella".to_string(),
                subtitle: "Rain is likely. Stay dry out there.".to_string(),
            }
        } else {
            Recommendation {
                need_umbrella: false,
                emoji: "🌤️".to_string(),
                title: "No umbrella needed".to_string(),
                subtitle: "Chances are low. You should be fine.".to_string(),
            }
        }
    }
}

/// Decide with the default thresholds.
pub fn decide(probability_max_percent: f64, rainfall_sum_mm: f64) -> Recommendation {
    Thresholds::default().decide(probability_max_percent, rainfall_sum_mm)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dry_day_needs_no_umbrella() {
        let rec = decide(0.0, 0.0);
        assert!(!rec.need_umbrella);
        assert_eq!(rec.title, "No umbrella needed");
        assert_eq!(rec.emoji, "🌤️");
    }

    #[test]
    fn boundaries_are_inclusive() {
        assert!(!decide(29.9, 0.19).need_umbrella);
        assert!(decide(30.0, 0.0).need_umbrella);
        assert!(decide(0.0, 0.2).need_umbrella);
    }

    #[test]
    fn high_probability_wins_regardless_of_rainfall() {
        for p in [30.0, 45.5, 99.0, 100.0, 250.0] {
            for r in [0.0, 0.1, 0.19, 5.0, f64::NAN] {
                assert!(decide(p, r).need_umbrella, "p={p} r={r}");
            }
        }
    }

    #[test]
    fn rainfall_wins_regardless_of_probability() {
        for r in [0.2, 0.5, 12.0] {
            for p in [-5.0, 0.0, 10.0, 29.9, f64::NAN] {
                assert!(decide(p, r).need_umbrella, "p={p} r={r}");
            }
        }
    }

    #[test]
    fn nan_inputs_fall_through_to_no_umbrella() {
        assert!(!decide(f64::NAN, f64::NAN).need_umbrella);
        assert!(!decide(f64::NAN, 0.0).need_umbrella);
    }

    #[test]
    fn overridden_thresholds_are_honoured() {
        let strict = Thresholds { probability_percent: 60.0, rainfall_mm: 1.0 };

        let rec = strict.decide(45.0, 0.5);
        assert!(!rec.need_umbrella);

        let rec = strict.decide(60.0, 0.0);
        assert!(rec.need_umbrella);
        assert_eq!(rec.subtitle, "Rain is likely. Stay dry out there.");
    }
}
