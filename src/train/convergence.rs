use crate::error::{Error, Result};
use crate::model::{ConvergenceTest, Model};

/// Converges once the development loss stops improving
///
/// Training has converged when the last epoch made no training errors, or
/// when `max_epochs_in_decline` epochs have passed since the epoch with the
/// lowest development loss.
#[derive(Debug, Clone)]
pub struct LossPlateau {
    max_epochs_in_decline: usize,
}

impl Default for LossPlateau {
    fn default() -> Self {
        Self {
            max_epochs_in_decline: 5,
        }
    }
}

impl LossPlateau {
    pub fn new(max_epochs_in_decline: usize) -> Result<Self> {
        let mut test = Self::default();
        test.set_max_epochs_in_decline(max_epochs_in_decline)?;
        Ok(test)
    }

    pub fn max_epochs_in_decline(&self) -> usize {
        self.max_epochs_in_decline
    }

    pub fn set_max_epochs_in_decline(&mut self, max_epochs_in_decline: usize) -> Result<()> {
        if max_epochs_in_decline < 1 {
            return Err(Error::invalid_parameter(
                "max_epochs_in_decline must be at least 1",
            ));
        }
        self.max_epochs_in_decline = max_epochs_in_decline;
        Ok(())
    }
}

impl ConvergenceTest for LossPlateau {
    fn converged(&self, model: &Model) -> bool {
        if model.num_training_errors_per_epoch().last() == Some(&0) {
            return true;
        }
        let last_epoch = match model.loss_per_epoch().len().checked_sub(1) {
            Some(epoch) => epoch,
            None => return false,
        };
        match model.best_model_epoch() {
            Some(best) => last_epoch - best >= self.max_epochs_in_decline,
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candidate::{Candidate, CandidateSet};
    use crate::iterator::CollectionCandidateSetIterator;

    #[test]
    fn test_validation() {
        let err = LossPlateau::new(0).unwrap_err();
        assert_eq!(err.to_string(), "max_epochs_in_decline must be at least 1");
        assert_eq!(LossPlateau::new(3).unwrap().max_epochs_in_decline(), 3);
    }

    #[test]
    fn test_untrained_model_has_not_converged() {
        let model = Model::new("m");
        assert!(!LossPlateau::default().converged(&model));
    }

    #[test]
    fn test_stops_on_plateau() {
        // a single feature cannot separate these examples, so training keeps
        // making errors while the development loss never improves
        let set = |losses: [f64; 2]| -> CandidateSet {
            losses
                .iter()
                .map(|&loss| Candidate::new(loss).with_feature(0, 1.0))
                .collect()
        };
        let mut train = CollectionCandidateSetIterator::new(vec![set([1.0, 0.0])]);
        let mut dev = CollectionCandidateSetIterator::new(vec![set([1.0, 0.0])]);
        let mut model = Model::new("m").with_convergence_test(LossPlateau::new(2).unwrap());
        model.train(&mut train, &mut dev);
        assert_eq!(model.best_model_epoch(), Some(0));
        assert_eq!(model.loss_per_epoch().len(), 3);
    }
}
