use std::str::FromStr;

use crate::candidate::CandidateSet;
use crate::error::{Error, Result};
use crate::model::{Model, Updater};

/// PA variants for Passive Aggressive training.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaType {
    /// PA (no slack)
    Pa,
    /// PA-I (soft margin)
    PaI,
    /// PA-II (squared slack)
    PaII,
}

impl FromStr for PaType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "0" | "PA" => Ok(PaType::Pa),
            "1" | "PA-I" => Ok(PaType::PaI),
            "2" | "PA-II" => Ok(PaType::PaII),
            _ => Err(Error::invalid_parameter(format!("unknown PA type: {}", s))),
        }
    }
}

/// Passive Aggressive training parameters.
#[derive(Debug, Clone)]
pub struct PassiveAggressiveParams {
    pa_type: PaType,
    pa_c: f64,
    pa_error_sensitive: bool,
}

impl Default for PassiveAggressiveParams {
    fn default() -> Self {
        Self {
            pa_type: PaType::PaI,
            pa_c: 1.0,
            pa_error_sensitive: true,
        }
    }
}

impl PassiveAggressiveParams {
    pub fn pa_type(&self) -> PaType {
        self.pa_type
    }

    pub fn set_pa_type(&mut self, pa_type: PaType) {
        self.pa_type = pa_type;
    }

    pub fn pa_c(&self) -> f64 {
        self.pa_c
    }

    pub fn set_pa_c(&mut self, pa_c: f64) -> Result<()> {
        if pa_c <= 0.0 {
            return Err(Error::invalid_parameter("c must be positive"));
        }
        self.pa_c = pa_c;
        Ok(())
    }

    pub fn pa_error_sensitive(&self) -> bool {
        self.pa_error_sensitive
    }

    pub fn set_pa_error_sensitive(&mut self, enabled: bool) {
        self.pa_error_sensitive = enabled;
    }

    /// Step size for a margin violation of `cost` along a direction of
    /// squared norm `norm_sq`
    pub fn tau(&self, cost: f64, norm_sq: f64) -> f64 {
        match self.pa_type {
            PaType::Pa => cost / norm_sq,
            PaType::PaI => self.pa_c.min(cost / norm_sq),
            PaType::PaII => cost / (norm_sq + 0.5 / self.pa_c),
        }
    }
}

/// Passive Aggressive updater
///
/// Makes the smallest change to the weights that ranks the gold candidate
/// above the best-scoring one by a margin of one, or of the square root of
/// their loss difference when error-sensitive, with the step bounded as
/// selected by [`PaType`].
#[derive(Debug, Clone, Default)]
pub struct PassiveAggressiveUpdater {
    params: PassiveAggressiveParams,
}

impl PassiveAggressiveUpdater {
    pub fn new(params: PassiveAggressiveParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &PassiveAggressiveParams {
        &self.params
    }

    /// Set PA variant (builder pattern)
    pub fn with_pa_type(mut self, pa_type: PaType) -> Self {
        self.params.set_pa_type(pa_type);
        self
    }

    /// Set the aggressiveness parameter C (builder pattern)
    pub fn with_pa_c(mut self, pa_c: f64) -> Result<Self> {
        self.params.set_pa_c(pa_c)?;
        Ok(self)
    }

    /// Enable or disable error-sensitive margins (builder pattern)
    pub fn with_error_sensitive(mut self, enabled: bool) -> Self {
        self.params.set_pa_error_sensitive(enabled);
        self
    }
}

impl Updater for PassiveAggressiveUpdater {
    fn update(&self, model: &mut Model, example: &CandidateSet) {
        let (gold, best) = match (example.gold(), example.best()) {
            (Some(gold), Some(best)) => (gold, best),
            _ => return,
        };
        let gold_features = model.candidate_features(gold, true);
        let best_features = model.candidate_features(best, true);
        let delta = gold_features.difference(&best_features);
        let norm_sq = delta.norm_squared();
        if norm_sq <= 0.0 {
            return;
        }

        let err = best.score - gold.score;
        let cost = if self.params.pa_error_sensitive {
            err + (best.loss - gold.loss).max(0.0).sqrt()
        } else {
            err + 1.0
        };
        if cost <= 0.0 {
            return;
        }
        let mut tau = self.params.tau(cost, norm_sq);
        if model.use_weighted_loss() {
            tau *= gold.loss_weight;
        }
        model.update_weights(&delta, tau);
    }
}
