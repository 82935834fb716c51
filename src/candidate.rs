use std::fmt;

use serde::{Deserialize, Serialize};

use crate::feature_vector::FeatureVector;

fn default_loss_weight() -> f64 {
    1.0
}

/// One scored hypothesis within a training or test example
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    /// Position of this candidate within its candidate set
    #[serde(default)]
    pub index: usize,
    /// Score under the current model, written during scoring
    #[serde(default)]
    pub score: f64,
    /// Score assigned by the upstream generator
    #[serde(default)]
    pub baseline_score: f64,
    /// Loss of this candidate relative to the reference
    pub loss: f64,
    /// Weight applied to the loss in loss-weighted training
    #[serde(default = "default_loss_weight")]
    pub loss_weight: f64,
    /// Number of words of the hypothesis
    #[serde(default)]
    pub num_words: usize,
    /// Raw hypothesis text
    #[serde(default)]
    pub raw_data: String,
    /// Numeric features keyed by feature uid
    #[serde(default)]
    pub features: FeatureVector<u32>,
    /// Symbolic features keyed by feature name
    #[serde(default)]
    pub symbolic_features: FeatureVector<String>,
}

impl Candidate {
    /// Create a candidate with the given loss and no features
    pub fn new(loss: f64) -> Self {
        Self {
            index: 0,
            score: 0.0,
            baseline_score: 0.0,
            loss,
            loss_weight: 1.0,
            num_words: 0,
            raw_data: String::new(),
            features: FeatureVector::new(),
            symbolic_features: FeatureVector::new(),
        }
    }

    /// Set the raw hypothesis text (builder pattern)
    pub fn with_raw_data<T: Into<String>>(mut self, raw_data: T) -> Self {
        self.raw_data = raw_data.into();
        self.num_words = self.raw_data.split_whitespace().count();
        self
    }

    /// Add a numeric feature (builder pattern)
    pub fn with_feature(mut self, uid: u32, value: f64) -> Self {
        self.features.increment(uid, value);
        self
    }

    /// Add a symbolic feature (builder pattern)
    pub fn with_symbolic_feature<T: Into<String>>(mut self, name: T, value: f64) -> Self {
        self.symbolic_features.increment(name.into(), value);
        self
    }

    /// Set the loss weight (builder pattern)
    pub fn with_loss_weight(mut self, loss_weight: f64) -> Self {
        self.loss_weight = loss_weight;
        self
    }
}

impl From<f64> for Candidate {
    fn from(loss: f64) -> Self {
        Candidate::new(loss)
    }
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Candidate(index={}, loss={}, score={}, features={}, symbolic_features={})",
            self.index,
            self.loss,
            self.score,
            self.features.len(),
            self.symbolic_features.len()
        )
    }
}

/// The set of candidates for one example
///
/// The best-scoring and gold indices are derived data: they are recomputed
/// every time the set is scored and are never serialized.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CandidateSet {
    /// Reference string for this example
    #[serde(default)]
    pub reference: String,
    /// Key identifying this example in its corpus
    #[serde(default)]
    pub training_key: String,
    /// Candidates in their original order
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(skip)]
    best_index: Option<usize>,
    #[serde(skip)]
    gold_index: Option<usize>,
}

impl CandidateSet {
    pub fn new<T: Into<String>>(reference: T) -> Self {
        Self {
            reference: reference.into(),
            ..Self::default()
        }
    }

    pub fn with_capacity(cap: usize) -> Self {
        Self {
            candidates: Vec::with_capacity(cap),
            ..Self::default()
        }
    }

    /// Append a candidate, fixing its index to its position in this set
    pub fn push(&mut self, mut candidate: Candidate) {
        candidate.index = self.candidates.len();
        self.candidates.push(candidate);
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Candidate> {
        self.candidates.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Candidate> {
        self.candidates.get_mut(index)
    }

    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Candidate> {
        self.candidates.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Candidate> {
        self.candidates.iter_mut()
    }

    /// Keep only the first `max_candidates` candidates
    pub fn truncate(&mut self, max_candidates: usize) {
        self.candidates.truncate(max_candidates);
        self.clear_indices();
    }

    /// Reset every candidate's index to its position in this set
    pub(crate) fn renumber(&mut self) {
        for (i, candidate) in self.candidates.iter_mut().enumerate() {
            candidate.index = i;
        }
    }

    /// Index of the best-scoring candidate under the current model
    pub fn best_index(&self) -> Option<usize> {
        self.best_index
    }

    /// Index of the gold candidate
    pub fn gold_index(&self) -> Option<usize> {
        self.gold_index
    }

    pub fn set_best_index(&mut self, index: Option<usize>) {
        self.best_index = index.filter(|&i| i < self.candidates.len());
    }

    pub fn set_gold_index(&mut self, index: Option<usize>) {
        self.gold_index = index.filter(|&i| i < self.candidates.len());
    }

    pub fn clear_indices(&mut self) {
        self.best_index = None;
        self.gold_index = None;
    }

    /// The best-scoring candidate, if the set has been scored
    pub fn best(&self) -> Option<&Candidate> {
        self.best_index.and_then(|i| self.candidates.get(i))
    }

    /// The gold candidate, if the set has been scored
    pub fn gold(&self) -> Option<&Candidate> {
        self.gold_index.and_then(|i| self.candidates.get(i))
    }
}

impl Extend<Candidate> for CandidateSet {
    fn extend<I: IntoIterator<Item = Candidate>>(&mut self, iter: I) {
        for candidate in iter {
            self.push(candidate);
        }
    }
}

impl FromIterator<Candidate> for CandidateSet {
    fn from_iter<I: IntoIterator<Item = Candidate>>(iter: I) -> Self {
        let mut set = CandidateSet::default();
        set.extend(iter);
        set
    }
}

impl fmt::Display for CandidateSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CandidateSet(reference=\"{}\", num_candidates={}",
            self.reference,
            self.candidates.len()
        )?;
        if let Some(best) = self.best_index {
            write!(f, ", best={}", best)?;
        }
        if let Some(gold) = self.gold_index {
            write!(f, ", gold={}", gold)?;
        }
        write!(f, ")")
    }
}
