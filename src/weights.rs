use std::collections::HashMap;

use crate::feature_vector::FeatureVector;

/// Perceptron weights with lazy averaging
///
/// Averaging uses the summed-update trick: an update of `delta` at step
/// counter `c` adds `delta` to the raw weight and `c * delta` to the summed
/// weight, so that the average over `c` steps is `raw - summed / c` and can
/// be computed in one pass when needed.
#[derive(Debug, Clone, Default)]
pub struct Weights {
    raw: FeatureVector,
    summed: FeatureVector,
    averaged: FeatureVector,
    /// Whether `summed` holds the update history behind `raw`
    has_summed: bool,
}

impl Weights {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw weights when training, averaged weights otherwise
    pub fn view(&self, training: bool) -> &FeatureVector {
        if training {
            &self.raw
        } else {
            &self.averaged
        }
    }

    pub fn raw(&self) -> &FeatureVector {
        &self.raw
    }

    pub fn summed(&self) -> &FeatureVector {
        &self.summed
    }

    pub fn averaged(&self) -> &FeatureVector {
        &self.averaged
    }

    /// Add `scale * fv` to the weights at update counter `counter`
    pub fn add_scaled(&mut self, fv: &FeatureVector, scale: f64, counter: f64) {
        self.raw.add_scaled(fv, scale);
        self.summed.add_scaled(fv, scale * counter);
        self.has_summed = true;
    }

    /// Recompute the averaged weights over `counter` steps
    ///
    /// Weights loaded through [`set`](Weights::set) carry no update history
    /// and keep their stored averages until the next update.
    pub fn refresh_averaged(&mut self, counter: f64) {
        if !self.has_summed {
            return;
        }
        self.averaged.clear();
        if counter <= 0.0 {
            return;
        }
        let mut uids: Vec<u32> = self.raw.keys().chain(self.summed.keys()).copied().collect();
        uids.sort_unstable();
        uids.dedup();
        for uid in uids {
            let avg = self.raw.get(&uid) - self.summed.get(&uid) / counter;
            if avg != 0.0 {
                self.averaged.insert(uid, avg);
            }
        }
    }

    /// Replace all weights, as when loading a stored model
    pub fn set(&mut self, raw: FeatureVector, averaged: FeatureVector) {
        self.raw = raw;
        self.summed = FeatureVector::new();
        self.averaged = averaged;
        self.has_summed = false;
    }

    /// Number of features with a raw or averaged weight
    pub fn num_features(&self) -> usize {
        let mut uids: Vec<u32> = self.raw.keys().chain(self.averaged.keys()).copied().collect();
        uids.sort_unstable();
        uids.dedup();
        uids.len()
    }

    /// Renumber the non-zero features to the dense range `[0, n)`
    ///
    /// Features keep their relative order. Returns the map from old to new
    /// uids.
    pub fn compactify(&mut self) -> HashMap<u32, u32> {
        let mut uids: Vec<u32> = self
            .raw
            .iter()
            .chain(self.summed.iter())
            .chain(self.averaged.iter())
            .filter(|(_, w)| *w != 0.0)
            .map(|(&uid, _)| uid)
            .collect();
        uids.sort_unstable();
        uids.dedup();

        let old_to_new: HashMap<u32, u32> = uids
            .iter()
            .enumerate()
            .map(|(new, &old)| (old, new as u32))
            .collect();
        let renumber = |fv: &FeatureVector| -> FeatureVector {
            fv.iter()
                .filter(|(_, w)| *w != 0.0)
                .filter_map(|(uid, w)| old_to_new.get(uid).map(|&new| (new, w)))
                .collect()
        };
        self.raw = renumber(&self.raw);
        self.summed = renumber(&self.summed);
        self.averaged = renumber(&self.averaged);
        old_to_new
    }
}
