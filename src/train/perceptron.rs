use std::cmp::Ordering;

use crate::candidate::CandidateSet;
use crate::model::{Model, UpdatePredicate, Updater};

/// Update whenever the gold candidate ranks strictly above the best-scoring one
#[derive(Debug, Clone, Copy, Default)]
pub struct PerceptronUpdatePredicate;

impl UpdatePredicate for PerceptronUpdatePredicate {
    fn need_to_update(&self, model: &Model, example: &CandidateSet) -> bool {
        match (example.gold(), example.best()) {
            (Some(gold), Some(best)) => {
                model.gold_comparator().compare(model, gold, best) == Ordering::Greater
            }
            _ => false,
        }
    }
}

/// Move the weights towards the gold features and away from the best-scoring
/// candidate's features
///
/// The step is 1, or the loss-weighted loss difference between the two
/// candidates when the model trains with weighted loss.
#[derive(Debug, Clone, Copy, Default)]
pub struct PerceptronUpdater;

impl Updater for PerceptronUpdater {
    fn update(&self, model: &mut Model, example: &CandidateSet) {
        let (gold, best) = match (example.gold(), example.best()) {
            (Some(gold), Some(best)) => (gold, best),
            _ => return,
        };
        let step = if model.use_weighted_loss() {
            (best.loss - gold.loss) * gold.loss_weight
        } else {
            1.0
        };
        let gold_features = model.candidate_features(gold, true);
        let best_features = model.candidate_features(best, true);
        let delta = gold_features.difference(&best_features);
        model.update_weights(&delta, step);
    }
}
