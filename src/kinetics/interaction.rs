//! Cross-species rate modulation.
//!
//! An interaction lets one species' local concentration scale another
//! species' trafficking rates: identity below the minimum threshold, a
//! linear ramp between the thresholds, and the configured maximum response
//! above them.

/// Which trafficking rate an interaction multiplier applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateKind {
    Exocytosis = 0,
    UnboundEndocytosis = 1,
    BoundEndocytosis = 2,
}

/// Rate modulation rule between a signal species and a target species
#[derive(Debug, Clone)]
pub struct ProteinInteraction {
    signal_species: usize,
    target_species: usize,
    min_conc: f64,
    max_conc: f64,
    max_responses: [f64; 3],
    valid: bool,
}

impl ProteinInteraction {
    /// Create an interaction with identity responses.
    ///
    /// A misconfigured threshold pair (min > max) marks the interaction
    /// invalid: it is logged once here and leaves every rate unchanged.
    pub fn new(signal_species: usize, target_species: usize, min_conc: f64, max_conc: f64) -> Self {
        let valid = min_conc <= max_conc;
        if !valid {
            log::warn!(
                "Invalid protein interaction: min threshold {} exceeds max {}; response rates will not change",
                min_conc,
                max_conc
            );
        }
        Self {
            signal_species,
            target_species,
            min_conc,
            max_conc,
            max_responses: [1.0; 3],
            valid,
        }
    }

    /// Set the multiplier applied at and above the maximum threshold
    pub fn set_max_response(&mut self, kind: RateKind, response: f64) {
        self.max_responses[kind as usize] = response;
    }

    pub fn signal_species(&self) -> usize {
        self.signal_species
    }

    pub fn target_species(&self) -> usize {
        self.target_species
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Apply the interaction to a baseline rate given the signal species'
    /// local concentration.
    pub fn modified_rate(&self, signal_conc: f64, baseline_rate: f64, kind: RateKind) -> f64 {
        if !self.valid || signal_conc < self.min_conc {
            return baseline_rate;
        }
        let max_response = self.max_responses[kind as usize];
        if signal_conc < self.max_conc && self.max_conc > self.min_conc {
            let ratio = (max_response - 1.0) / (self.max_conc - self.min_conc);
            let response = ratio * (signal_conc - self.min_conc) + 1.0;
            baseline_rate * response
        } else {
            baseline_rate * max_response
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn interaction() -> ProteinInteraction {
        let mut i = ProteinInteraction::new(0, 1, 2.0, 6.0);
        i.set_max_response(RateKind::Exocytosis, 3.0);
        i.set_max_response(RateKind::UnboundEndocytosis, 0.5);
        i
    }

    #[test]
    fn test_identity_below_min_threshold() {
        let i = interaction();
        assert_eq!(i.modified_rate(1.9, 10.0, RateKind::Exocytosis), 10.0);
    }

    #[test]
    fn test_linear_ramp_between_thresholds() {
        let i = interaction();
        // Midway between 2.0 and 6.0 the multiplier is halfway to 3.0
        let r = i.modified_rate(4.0, 10.0, RateKind::Exocytosis);
        assert!((r - 20.0).abs() < 1e-9, "got {}", r);
        // At the min threshold the multiplier is exactly 1.0
        let r = i.modified_rate(2.0, 10.0, RateKind::Exocytosis);
        assert!((r - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_clamped_above_max_threshold() {
        let i = interaction();
        assert!((i.modified_rate(6.0, 10.0, RateKind::Exocytosis) - 30.0).abs() < 1e-9);
        assert!((i.modified_rate(100.0, 10.0, RateKind::Exocytosis) - 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_rate_kinds_independent() {
        let i = interaction();
        let exo = i.modified_rate(100.0, 10.0, RateKind::Exocytosis);
        let endo = i.modified_rate(100.0, 10.0, RateKind::UnboundEndocytosis);
        let bound = i.modified_rate(100.0, 10.0, RateKind::BoundEndocytosis);
        assert!((exo - 30.0).abs() < 1e-9);
        assert!((endo - 5.0).abs() < 1e-9);
        // No response configured for bound endocytosis
        assert!((bound - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_inverted_thresholds_degrade_to_identity() {
        let mut i = ProteinInteraction::new(0, 1, 6.0, 2.0);
        i.set_max_response(RateKind::Exocytosis, 3.0);
        assert!(!i.is_valid());
        for conc in [0.0, 2.0, 4.0, 6.0, 100.0] {
            assert_eq!(i.modified_rate(conc, 10.0, RateKind::Exocytosis), 10.0);
        }
    }

    #[test]
    fn test_equal_thresholds_step_to_max() {
        let mut i = ProteinInteraction::new(0, 1, 3.0, 3.0);
        i.set_max_response(RateKind::Exocytosis, 2.0);
        assert!(i.is_valid());
        assert_eq!(i.modified_rate(2.9, 10.0, RateKind::Exocytosis), 10.0);
        assert!((i.modified_rate(3.0, 10.0, RateKind::Exocytosis) - 20.0).abs() < 1e-9);
    }
}
