use std::cmp::Ordering;

use crate::candidate::Candidate;
use crate::model::Model;

/// A total preorder over candidates
///
/// `Greater` means `c1` is "better" than `c2` under the relation the
/// comparator implements. Implementations must be antisymmetric and
/// transitive for selection of extremal candidates to be meaningful.
pub trait Comparator {
    fn compare(&self, model: &Model, c1: &Candidate, c2: &Candidate) -> Ordering;
}

fn compare_scores(c1: &Candidate, c2: &Candidate) -> Ordering {
    let diff = c1.score - c2.score;
    if diff == 0.0 {
        Ordering::Equal
    } else if diff < 0.0 {
        Ordering::Less
    } else {
        Ordering::Greater
    }
}

/// Orders candidates by score alone
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultScoreComparator;

impl Comparator for DefaultScoreComparator {
    fn compare(&self, _model: &Model, c1: &Candidate, c2: &Candidate) -> Ordering {
        compare_scores(c1, c2)
    }
}

/// Orders candidates by loss, lower loss being greater, breaking ties by score
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultGoldComparator;

impl Comparator for DefaultGoldComparator {
    fn compare(&self, _model: &Model, c1: &Candidate, c2: &Candidate) -> Ordering {
        let loss_diff = c1.loss - c2.loss;
        if loss_diff < 0.0 {
            Ordering::Greater
        } else if loss_diff > 0.0 {
            Ordering::Less
        } else {
            compare_scores(c1, c2)
        }
    }
}

/// Index of the greatest candidate among `indices` under `comparator`
///
/// The first of several equal candidates wins.
pub(crate) fn extremal_index<I>(
    model: &Model,
    comparator: &dyn Comparator,
    candidates: &[Candidate],
    indices: I,
) -> Option<usize>
where
    I: IntoIterator<Item = usize>,
{
    let mut best: Option<usize> = None;
    for i in indices {
        let replace = match best {
            None => true,
            Some(b) => comparator.compare(model, &candidates[i], &candidates[b]) == Ordering::Greater,
        };
        if replace {
            best = Some(i);
        }
    }
    best
}
