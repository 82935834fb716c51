use std::cell::RefCell;
use std::time::{SystemTime, UNIX_EPOCH};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::candidate::CandidateSet;
use crate::comparator::extremal_index;
use crate::model::Model;

/// Scores a candidate set under a model and identifies its best and gold candidates
pub trait CandidateSetScorer {
    /// Score the candidates of `candidates` with `model` and set the best-scoring
    /// and gold indices. `training` selects raw (training) versus averaged
    /// (inference) scoring. An empty set is left untouched with no indices.
    fn score(&self, model: &mut Model, candidates: &mut CandidateSet, training: bool);
}

/// Scores every candidate
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultCandidateSetScorer;

impl CandidateSetScorer for DefaultCandidateSetScorer {
    fn score(&self, model: &mut Model, candidates: &mut CandidateSet, training: bool) {
        candidates.clear_indices();
        if candidates.is_empty() {
            return;
        }
        for candidate in candidates.iter_mut() {
            model.score_candidate(candidate, training);
        }

        let num_candidates = candidates.len();
        let score_comparator = model.score_comparator();
        let gold_comparator = model.gold_comparator();
        let best = extremal_index(
            model,
            score_comparator.as_ref(),
            candidates.candidates(),
            0..num_candidates,
        );
        let gold = extremal_index(
            model,
            gold_comparator.as_ref(),
            candidates.candidates(),
            0..num_candidates,
        );
        candidates.set_best_index(best);
        candidates.set_gold_index(gold);
    }
}

/// Scores only two candidates drawn at random and trains as if they were the
/// whole set
///
/// Indices are drawn from the discrete reciprocal-rank distribution, where
/// index `i` of `n` has probability `(1 / (i + 1)) / H(n)` and `H(n)` is the
/// `n`-th harmonic number. The second index is drawn from the same
/// distribution restricted to the indices other than the first, so the pair
/// is distinct whenever the set holds at least two candidates.
#[derive(Debug)]
pub struct RandomPairCandidateSetScorer {
    rng: RefCell<StdRng>,
}

impl RandomPairCandidateSetScorer {
    /// Create a scorer whose random source is seeded from the wall clock
    pub fn new() -> Self {
        let seed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0);
        Self::with_seed(seed)
    }

    /// Create a scorer with a fixed seed
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: RefCell::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// Draw an index in `[0, max)` from the reciprocal-rank distribution
    pub fn random_index(&self, max: usize) -> usize {
        self.sample(max, None)
    }

    fn sample(&self, max: usize, exclude: Option<usize>) -> usize {
        let weight = |i: usize| {
            if Some(i) == exclude {
                0.0
            } else {
                1.0 / (i + 1) as f64
            }
        };
        let total: f64 = (0..max).map(weight).sum();
        let mut target = self.rng.borrow_mut().gen::<f64>() * total;
        let mut last = 0;
        for i in 0..max {
            let w = weight(i);
            if w == 0.0 {
                continue;
            }
            last = i;
            if target < w {
                return i;
            }
            target -= w;
        }
        // floating point slack: fall back to the last eligible index
        last
    }

    /// Draw the pair of candidate indices to score
    pub fn random_pair(&self, num_candidates: usize) -> (usize, usize) {
        let first = self.sample(num_candidates, None);
        if num_candidates < 2 {
            return (first, first);
        }
        let second = self.sample(num_candidates, Some(first));
        (first, second)
    }
}

impl Default for RandomPairCandidateSetScorer {
    fn default() -> Self {
        Self::new()
    }
}

impl CandidateSetScorer for RandomPairCandidateSetScorer {
    fn score(&self, model: &mut Model, candidates: &mut CandidateSet, training: bool) {
        candidates.clear_indices();
        if candidates.is_empty() {
            return;
        }
        let (first, second) = self.random_pair(candidates.len());
        let pair = if first == second {
            vec![first]
        } else {
            vec![first, second]
        };
        for &i in &pair {
            if let Some(candidate) = candidates.get_mut(i) {
                model.score_candidate(candidate, training);
            }
        }

        let score_comparator = model.score_comparator();
        let gold_comparator = model.gold_comparator();
        let best = extremal_index(
            model,
            score_comparator.as_ref(),
            candidates.candidates(),
            pair.iter().copied(),
        );
        let gold = extremal_index(
            model,
            gold_comparator.as_ref(),
            candidates.candidates(),
            pair.iter().copied(),
        );
        candidates.set_best_index(best);
        candidates.set_gold_index(gold);
    }
}
