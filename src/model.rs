use std::cmp::Ordering;
use std::fmt;
use std::rc::Rc;

use tracing::{debug, info};

use crate::candidate::{Candidate, CandidateSet};
use crate::comparator::{Comparator, DefaultGoldComparator, DefaultScoreComparator};
use crate::error::{Error, Result};
use crate::factory;
use crate::feature_vector::FeatureVector;
use crate::iterator::CandidateSetIterator;
use crate::kernel::KernelFunction;
use crate::scorer::{CandidateSetScorer, DefaultCandidateSetScorer};
use crate::symbols::Symbols;
use crate::time::Time;
use crate::train::convergence::LossPlateau;
use crate::train::perceptron::{PerceptronUpdatePredicate, PerceptronUpdater};
use crate::weights::Weights;

/// Decides whether a scored training example should trigger an update
pub trait UpdatePredicate {
    fn need_to_update(&self, model: &Model, example: &CandidateSet) -> bool;
}

/// Applies a learning rule to the model for a scored training example
pub trait Updater {
    fn update(&self, model: &mut Model, example: &CandidateSet);
}

/// Decides, between the epoch bounds, whether training has converged
pub trait ConvergenceTest {
    fn converged(&self, model: &Model) -> bool;
}

impl<F> ConvergenceTest for F
where
    F: Fn(&Model) -> bool,
{
    fn converged(&self, model: &Model) -> bool {
        self(model)
    }
}

/// Callback run at the end of every epoch, after evaluation
pub trait Hook {
    fn run(&mut self, model: &mut Model);
}

impl<F> Hook for F
where
    F: FnMut(&mut Model),
{
    fn run(&mut self, model: &mut Model) {
        self(model)
    }
}

/// A reranking model
///
/// The model owns its training clock, symbol table, weights and optional
/// kernel function, and delegates the pluggable parts of training to shared
/// policy objects: the score and gold comparators, the candidate set scorer,
/// the update predicate, the updater and the convergence test.
///
/// [`train`](Model::train) runs epochs until
/// [`need_to_keep_training`](Model::need_to_keep_training) says otherwise,
/// evaluating on a development iterator at the end of each epoch.
pub struct Model {
    name: String,
    time: Time,
    kernel_fn: Option<Box<dyn KernelFunction>>,
    symbols: Symbols,
    weights: Weights,
    score_comparator: Rc<dyn Comparator>,
    gold_comparator: Rc<dyn Comparator>,
    candidate_set_scorer: Rc<dyn CandidateSetScorer>,
    update_predicate: Rc<dyn UpdatePredicate>,
    updater: Rc<dyn Updater>,
    convergence_test: Rc<dyn ConvergenceTest>,
    end_of_epoch_hook: Option<Box<dyn Hook>>,
    /// Set whenever the hook slot is written
    hook_replaced: bool,
    loss_per_epoch: Vec<f64>,
    num_testing_errors_per_epoch: Vec<usize>,
    num_training_errors_per_epoch: Vec<usize>,
    /// Training errors in the current epoch
    epoch_training_errors: usize,
    num_training_errors: usize,
    num_updates: usize,
    best_model_epoch: Option<usize>,
    min_epochs: usize,
    max_epochs: usize,
    use_weighted_loss: bool,
}

impl fmt::Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model")
            .field("name", &self.name)
            .field("time", &self.time)
            .field("has_kernel_fn", &self.kernel_fn.is_some())
            .field("num_symbols", &self.symbols.len())
            .field("num_features", &self.weights.num_features())
            .field("min_epochs", &self.min_epochs)
            .field("max_epochs", &self.max_epochs)
            .field("use_weighted_loss", &self.use_weighted_loss)
            .field("num_updates", &self.num_updates)
            .field("best_model_epoch", &self.best_model_epoch)
            .finish()
    }
}

impl Model {
    /// Create a perceptron model with a local symbol table
    pub fn new<T: Into<String>>(name: T) -> Self {
        Self::with_symbols(name, Symbols::local())
    }

    /// Create a perceptron model using the given symbol table
    pub fn with_symbols<T: Into<String>>(name: T, symbols: Symbols) -> Self {
        Self {
            name: name.into(),
            time: Time::new(),
            kernel_fn: None,
            symbols,
            weights: Weights::new(),
            score_comparator: Rc::new(DefaultScoreComparator),
            gold_comparator: Rc::new(DefaultGoldComparator),
            candidate_set_scorer: Rc::new(DefaultCandidateSetScorer),
            update_predicate: Rc::new(PerceptronUpdatePredicate),
            updater: Rc::new(PerceptronUpdater),
            convergence_test: Rc::new(LossPlateau::default()),
            end_of_epoch_hook: None,
            hook_replaced: false,
            loss_per_epoch: Vec::new(),
            num_testing_errors_per_epoch: Vec::new(),
            num_training_errors_per_epoch: Vec::new(),
            epoch_training_errors: 0,
            num_training_errors: 0,
            num_updates: 0,
            best_model_epoch: None,
            min_epochs: 0,
            max_epochs: 0,
            use_weighted_loss: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn time(&self) -> &Time {
        &self.time
    }

    pub fn symbols(&self) -> &Symbols {
        &self.symbols
    }

    pub fn symbols_mut(&mut self) -> &mut Symbols {
        &mut self.symbols
    }

    /// Replace the symbol table, dropping the previous one
    pub fn set_symbols(&mut self, symbols: Symbols) {
        self.symbols = symbols;
    }

    pub fn weights(&self) -> &Weights {
        &self.weights
    }

    pub(crate) fn weights_mut(&mut self) -> &mut Weights {
        &mut self.weights
    }

    pub fn kernel_fn(&self) -> Option<&dyn KernelFunction> {
        self.kernel_fn.as_deref()
    }

    /// Replace the kernel function, dropping the previous one
    pub fn set_kernel_fn(&mut self, kernel_fn: Option<Box<dyn KernelFunction>>) {
        self.kernel_fn = kernel_fn;
    }

    /// Replace the end-of-epoch hook, dropping the previous one
    pub fn set_end_of_epoch_hook(&mut self, hook: Option<Box<dyn Hook>>) {
        self.end_of_epoch_hook = hook;
        self.hook_replaced = true;
    }

    pub fn score_comparator(&self) -> Rc<dyn Comparator> {
        Rc::clone(&self.score_comparator)
    }

    pub fn set_score_comparator(&mut self, comparator: Rc<dyn Comparator>) {
        self.score_comparator = comparator;
    }

    pub fn gold_comparator(&self) -> Rc<dyn Comparator> {
        Rc::clone(&self.gold_comparator)
    }

    pub fn set_gold_comparator(&mut self, comparator: Rc<dyn Comparator>) {
        self.gold_comparator = comparator;
    }

    pub fn candidate_set_scorer(&self) -> Rc<dyn CandidateSetScorer> {
        Rc::clone(&self.candidate_set_scorer)
    }

    pub fn set_candidate_set_scorer(&mut self, scorer: Rc<dyn CandidateSetScorer>) {
        self.candidate_set_scorer = scorer;
    }

    pub fn update_predicate(&self) -> Rc<dyn UpdatePredicate> {
        Rc::clone(&self.update_predicate)
    }

    pub fn set_update_predicate(&mut self, predicate: Rc<dyn UpdatePredicate>) {
        self.update_predicate = predicate;
    }

    pub fn updater(&self) -> Rc<dyn Updater> {
        Rc::clone(&self.updater)
    }

    pub fn set_updater(&mut self, updater: Rc<dyn Updater>) {
        self.updater = updater;
    }

    pub fn convergence_test(&self) -> Rc<dyn ConvergenceTest> {
        Rc::clone(&self.convergence_test)
    }

    pub fn set_convergence_test(&mut self, test: Rc<dyn ConvergenceTest>) {
        self.convergence_test = test;
    }

    /// Minimum number of epochs, `0` if unset
    pub fn min_epochs(&self) -> usize {
        self.min_epochs
    }

    pub fn set_min_epochs(&mut self, min_epochs: usize) -> Result<()> {
        if min_epochs > 0 && self.max_epochs > 0 && min_epochs > self.max_epochs {
            return Err(Error::invalid_parameter(
                "min_epochs must not exceed max_epochs",
            ));
        }
        self.min_epochs = min_epochs;
        Ok(())
    }

    /// Maximum number of epochs, `0` if unset
    pub fn max_epochs(&self) -> usize {
        self.max_epochs
    }

    pub fn set_max_epochs(&mut self, max_epochs: usize) -> Result<()> {
        if max_epochs > 0 && max_epochs < self.min_epochs {
            return Err(Error::invalid_parameter(
                "max_epochs must be at least min_epochs",
            ));
        }
        self.max_epochs = max_epochs;
        Ok(())
    }

    pub fn use_weighted_loss(&self) -> bool {
        self.use_weighted_loss
    }

    pub fn set_use_weighted_loss(&mut self, use_weighted_loss: bool) {
        self.use_weighted_loss = use_weighted_loss;
    }

    pub fn loss_per_epoch(&self) -> &[f64] {
        &self.loss_per_epoch
    }

    pub fn num_testing_errors_per_epoch(&self) -> &[usize] {
        &self.num_testing_errors_per_epoch
    }

    pub fn num_training_errors_per_epoch(&self) -> &[usize] {
        &self.num_training_errors_per_epoch
    }

    /// Total number of training errors over all epochs
    pub fn num_training_errors(&self) -> usize {
        self.num_training_errors
    }

    pub fn num_updates(&self) -> usize {
        self.num_updates
    }

    /// Epoch with the lowest development loss, the earliest on ties
    pub fn best_model_epoch(&self) -> Option<usize> {
        self.best_model_epoch
    }

    /// Number of epochs that have run to completion or are running
    fn epochs_started(&self) -> usize {
        (self.time.epoch() + 1).max(0) as usize
    }

    /// Set the minimum number of epochs (builder pattern)
    pub fn with_min_epochs(mut self, min_epochs: usize) -> Result<Self> {
        self.set_min_epochs(min_epochs)?;
        Ok(self)
    }

    /// Set the maximum number of epochs (builder pattern)
    pub fn with_max_epochs(mut self, max_epochs: usize) -> Result<Self> {
        self.set_max_epochs(max_epochs)?;
        Ok(self)
    }

    /// Enable or disable loss-weighted training (builder pattern)
    pub fn with_weighted_loss(mut self, use_weighted_loss: bool) -> Self {
        self.use_weighted_loss = use_weighted_loss;
        self
    }

    /// Set the kernel function (builder pattern)
    pub fn with_kernel_fn<K: KernelFunction + 'static>(mut self, kernel_fn: K) -> Self {
        self.kernel_fn = Some(Box::new(kernel_fn));
        self
    }

    /// Set the candidate set scorer (builder pattern)
    pub fn with_candidate_set_scorer<S: CandidateSetScorer + 'static>(mut self, scorer: S) -> Self {
        self.candidate_set_scorer = Rc::new(scorer);
        self
    }

    /// Set the updater (builder pattern)
    pub fn with_updater<U: Updater + 'static>(mut self, updater: U) -> Self {
        self.updater = Rc::new(updater);
        self
    }

    /// Set the convergence test (builder pattern)
    pub fn with_convergence_test<C: ConvergenceTest + 'static>(mut self, test: C) -> Self {
        self.convergence_test = Rc::new(test);
        self
    }

    /// Set a parameter from its string form
    ///
    /// Policy slots take a factory specification such as
    /// `RandomPairCandidateSetScorer(42)`.
    pub fn set(&mut self, name: &str, value: &str) -> Result<()> {
        match name {
            "min_epochs" => self.set_min_epochs(parse_value(name, value)?),
            "max_epochs" => self.set_max_epochs(parse_value(name, value)?),
            "use_weighted_loss" => {
                let enabled = match value {
                    "1" | "true" => true,
                    "0" | "false" => false,
                    _ => {
                        return Err(Error::invalid_parameter(format!(
                            "invalid value for {}: {}",
                            name, value
                        )))
                    }
                };
                self.use_weighted_loss = enabled;
                Ok(())
            }
            "score_comparator" => {
                self.score_comparator = factory::comparators().create(value)?;
                Ok(())
            }
            "gold_comparator" => {
                self.gold_comparator = factory::comparators().create(value)?;
                Ok(())
            }
            "candidate_set_scorer" => {
                self.candidate_set_scorer = factory::candidate_set_scorers().create(value)?;
                Ok(())
            }
            "update_predicate" => {
                self.update_predicate = factory::update_predicates().create(value)?;
                Ok(())
            }
            "updater" => {
                self.updater = factory::updaters().create(value)?;
                Ok(())
            }
            "convergence_test" => {
                self.convergence_test = factory::convergence_tests().create(value)?;
                Ok(())
            }
            _ => Err(Error::invalid_parameter(format!("unknown parameter: {}", name))),
        }
    }

    /// Get the string form of a scalar parameter
    pub fn get(&self, name: &str) -> Result<String> {
        match name {
            "min_epochs" => Ok(self.min_epochs.to_string()),
            "max_epochs" => Ok(self.max_epochs.to_string()),
            "use_weighted_loss" => Ok(if self.use_weighted_loss { "1" } else { "0" }.to_string()),
            _ => Err(Error::invalid_parameter(format!("unknown parameter: {}", name))),
        }
    }

    /// Train until the epoch bounds and convergence test say to stop
    ///
    /// Both iterators are drained and rewound once per epoch.
    pub fn train(
        &mut self,
        examples: &mut dyn CandidateSetIterator,
        development: &mut dyn CandidateSetIterator,
    ) {
        loop {
            self.new_epoch();
            self.train_one_epoch(examples);
            self.end_of_epoch(development);
            if !self.need_to_keep_training() {
                break;
            }
        }
        info!(
            model = %self.name,
            epochs = self.epochs_started(),
            best_model_epoch = ?self.best_model_epoch,
            "training finished"
        );
    }

    /// Advance the clock to a new epoch
    pub fn new_epoch(&mut self) {
        self.time.new_epoch();
        self.epoch_training_errors = 0;
        debug!(model = %self.name, epoch = self.time.epoch(), "starting epoch");
    }

    /// Train on every example of `examples`, then rewind it
    pub fn train_one_epoch(&mut self, examples: &mut dyn CandidateSetIterator) {
        while examples.has_next() {
            let example = match examples.next() {
                Some(example) => example,
                None => break,
            };
            self.time.tick();
            self.train_on_example(example);
        }
        examples.reset();
        self.num_training_errors_per_epoch.push(self.epoch_training_errors);
    }

    /// Score an example and update the model if the update predicate says so
    pub fn train_on_example(&mut self, example: &mut CandidateSet) {
        self.score_candidates(example, true);
        if self.need_to_update(example) {
            self.update(example);
            self.num_updates += 1;
            self.num_training_errors += 1;
            self.epoch_training_errors += 1;
        }
    }

    pub fn need_to_update(&self, example: &CandidateSet) -> bool {
        let predicate = Rc::clone(&self.update_predicate);
        predicate.need_to_update(self, example)
    }

    pub fn update(&mut self, example: &CandidateSet) {
        let updater = Rc::clone(&self.updater);
        updater.update(self, example);
    }

    /// Whether another epoch should run
    ///
    /// Epoch bounds count completed epochs; between them the convergence
    /// test decides.
    pub fn need_to_keep_training(&self) -> bool {
        let completed = self.epochs_started();
        if self.min_epochs > 0 && completed < self.min_epochs {
            return true;
        }
        if self.max_epochs > 0 && completed >= self.max_epochs {
            return false;
        }
        let test = Rc::clone(&self.convergence_test);
        !test.converged(self)
    }

    /// Mean loss of the best-scoring candidates of `development`
    ///
    /// Scoring uses the averaged weights. The iterator is rewound afterwards.
    pub fn evaluate(&mut self, development: &mut dyn CandidateSetIterator) -> f64 {
        self.evaluate_with_errors(development).0
    }

    fn evaluate_with_errors(&mut self, development: &mut dyn CandidateSetIterator) -> (f64, usize) {
        let counter = (self.time.absolute_index() + 2).max(1) as f64;
        self.weights.refresh_averaged(counter);

        let gold_comparator = Rc::clone(&self.gold_comparator);
        let mut total_loss = 0.0;
        let mut num_examples = 0usize;
        let mut num_errors = 0usize;
        while development.has_next() {
            let example = match development.next() {
                Some(example) => example,
                None => break,
            };
            self.score_candidates(example, false);
            if let (Some(best), Some(gold)) = (example.best(), example.gold()) {
                total_loss += if self.use_weighted_loss {
                    best.loss * best.loss_weight
                } else {
                    best.loss
                };
                if gold_comparator.compare(self, gold, best) == Ordering::Greater {
                    num_errors += 1;
                }
                num_examples += 1;
            }
        }
        development.reset();

        let loss = if num_examples == 0 {
            0.0
        } else {
            total_loss / num_examples as f64
        };
        (loss, num_errors)
    }

    /// Evaluate, record the epoch statistics and run the end-of-epoch hook
    pub fn end_of_epoch(&mut self, development: &mut dyn CandidateSetIterator) {
        let (loss, num_errors) = self.evaluate_with_errors(development);
        self.loss_per_epoch.push(loss);
        self.num_testing_errors_per_epoch.push(num_errors);

        let epoch = self.loss_per_epoch.len() - 1;
        let improved = match self.best_model_epoch {
            Some(best) => loss < self.loss_per_epoch[best],
            None => true,
        };
        if improved {
            self.best_model_epoch = Some(epoch);
        }

        info!(
            model = %self.name,
            epoch,
            loss,
            training_errors = self.epoch_training_errors,
            testing_errors = num_errors,
            updates = self.num_updates,
            seconds = self.time.seconds_since_last_epoch(),
            "end of epoch"
        );

        if let Some(mut hook) = self.end_of_epoch_hook.take() {
            self.hook_replaced = false;
            hook.run(self);
            // a hook that replaced or removed itself is dropped here
            if !self.hook_replaced {
                self.end_of_epoch_hook = Some(hook);
            }
        }
    }

    /// Score every candidate of `candidates` with the configured scorer
    pub fn score_candidates(&mut self, candidates: &mut CandidateSet, training: bool) {
        let scorer = Rc::clone(&self.candidate_set_scorer);
        scorer.score(self, candidates, training);
    }

    /// Compute, store and return the score of one candidate
    ///
    /// Training mode scores with the raw weights and assigns ids to unseen
    /// symbolic features; otherwise the averaged weights are used and unseen
    /// symbols are ignored.
    pub fn score_candidate(&mut self, candidate: &mut Candidate, training: bool) -> f64 {
        let features = self.candidate_features(candidate, training);
        let weights = self.weights.view(training);
        let score = match &self.kernel_fn {
            Some(kernel_fn) => kernel_fn.apply(weights, &features),
            None => weights.dot(&features),
        };
        candidate.score = score;
        score
    }

    /// Numeric and symbolic features of a candidate keyed by feature uid
    pub fn candidate_features(&mut self, candidate: &Candidate, training: bool) -> FeatureVector {
        let mut features = candidate.features.clone();
        for (symbol, value) in candidate.symbolic_features.iter() {
            if symbol.is_empty() {
                continue;
            }
            let uid = if training {
                Some(self.symbols.get_index(symbol))
            } else {
                self.symbols.index_of(symbol)
            };
            if let Some(uid) = uid {
                features.increment(uid, value);
            }
        }
        features
    }

    /// Add `scale * fv` to the weights at the current step
    pub fn update_weights(&mut self, fv: &FeatureVector, scale: f64) {
        let counter = (self.time.absolute_index() + 1).max(1) as f64;
        self.weights.add_scaled(fv, scale, counter);
    }

    /// Renumber feature uids to a dense range and update the symbol table
    pub fn compactify_feature_uids(&mut self) {
        let old_to_new = self.weights.compactify();
        let entries = self.symbols.entries();
        self.symbols.with_table(|table| {
            table.clear();
            for (symbol, old) in &entries {
                if let Some(&new) = old_to_new.get(old) {
                    table.set_index(symbol, new);
                }
            }
        });
        debug!(
            model = %self.name,
            num_features = old_to_new.len(),
            num_symbols = self.symbols.len(),
            "compactified feature uids"
        );
    }
}

fn parse_value<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::invalid_parameter(format!("invalid value for {}: {}", name, value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::iterator::CollectionCandidateSetIterator;
    use std::cell::Cell;

    fn example(losses_and_features: &[(f64, u32)]) -> CandidateSet {
        losses_and_features
            .iter()
            .map(|&(loss, uid)| Candidate::new(loss).with_feature(uid, 1.0))
            .collect()
    }

    fn data() -> CollectionCandidateSetIterator {
        CollectionCandidateSetIterator::new(vec![
            example(&[(1.0, 0), (0.0, 1)]),
            example(&[(0.0, 1), (1.0, 2)]),
        ])
    }

    #[test]
    fn test_runs_exactly_max_epochs() {
        let mut model = Model::new("m")
            .with_convergence_test(|_: &Model| false)
            .with_min_epochs(2)
            .unwrap()
            .with_max_epochs(5)
            .unwrap();
        model.train(&mut data(), &mut data());
        assert_eq!(model.time().epoch(), 4);
        assert_eq!(model.loss_per_epoch().len(), 5);
        assert_eq!(model.num_training_errors_per_epoch().len(), 5);
    }

    #[test]
    fn test_runs_at_least_min_epochs() {
        let mut model = Model::new("m")
            .with_convergence_test(|_: &Model| true)
            .with_min_epochs(2)
            .unwrap();
        model.train(&mut data(), &mut data());
        assert_eq!(model.loss_per_epoch().len(), 2);
    }

    fn never_converges() -> Model {
        Model::new("m").with_convergence_test(|_: &Model| false)
    }

    #[test]
    fn test_clock_ticks_per_example() {
        let mut model = never_converges().with_max_epochs(3).unwrap();
        model.train(&mut data(), &mut data());
        assert_eq!(model.time().epoch(), 2);
        assert_eq!(model.time().index(), 1);
        assert_eq!(model.time().absolute_index(), 5);
    }

    #[test]
    fn test_perceptron_learns_toy_problem() {
        let mut model = never_converges().with_max_epochs(4).unwrap();
        model.train(&mut data(), &mut data());
        // feature 1 always marks the gold candidate
        assert!(model.weights().raw().get(&1) > 0.0);
        assert_eq!(model.num_testing_errors_per_epoch().last(), Some(&0));
        assert_eq!(model.loss_per_epoch().last(), Some(&0.0));
        assert_eq!(model.best_model_epoch(), Some(0));
    }

    #[test]
    fn test_hook_runs_every_epoch() {
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        let mut model = never_converges().with_max_epochs(3).unwrap();
        model.set_end_of_epoch_hook(Some(Box::new(move |m: &mut Model| {
            counter.set(counter.get() + 1);
            assert_eq!(m.loss_per_epoch().len(), counter.get());
        })));
        model.train(&mut data(), &mut data());
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn test_hook_can_remove_itself() {
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        let mut model = never_converges().with_max_epochs(3).unwrap();
        model.set_end_of_epoch_hook(Some(Box::new(move |m: &mut Model| {
            counter.set(counter.get() + 1);
            m.set_end_of_epoch_hook(None);
        })));
        model.train(&mut data(), &mut data());
        assert_eq!(calls.get(), 1);
        assert_eq!(model.loss_per_epoch().len(), 3);
    }

    #[test]
    fn test_hook_can_replace_itself() {
        let calls = Rc::new(Cell::new(0));
        let first = Rc::clone(&calls);
        let mut model = never_converges().with_max_epochs(3).unwrap();
        model.set_end_of_epoch_hook(Some(Box::new(move |m: &mut Model| {
            first.set(first.get() + 1);
            let second = Rc::clone(&first);
            m.set_end_of_epoch_hook(Some(Box::new(move |_: &mut Model| {
                second.set(second.get() + 10);
            })));
        })));
        model.train(&mut data(), &mut data());
        // the first hook runs once, its replacement on the two later epochs
        assert_eq!(calls.get(), 21);
    }

    #[test]
    fn test_empty_development_set() {
        let mut model = Model::new("m");
        let mut dev = CollectionCandidateSetIterator::default();
        assert_eq!(model.evaluate(&mut dev), 0.0);
    }

    #[test]
    fn test_symbolic_features() {
        let mut model = Model::new("m");
        let mut candidate = Candidate::new(0.0)
            .with_symbolic_feature("w=a", 1.0)
            .with_symbolic_feature("", 5.0);
        let features = model.candidate_features(&candidate, false);
        assert!(features.is_empty());
        assert!(model.symbols().is_empty());

        let features = model.candidate_features(&candidate, true);
        let uid = model.symbols().index_of("w=a").unwrap();
        assert_eq!(features.get(&uid), 1.0);
        assert_eq!(features.len(), 1);

        model.update_weights(&features, 2.0);
        assert_eq!(model.score_candidate(&mut candidate, true), 2.0);
        assert_eq!(candidate.score, 2.0);
    }

    #[test]
    fn test_kernel_scoring() {
        let mut model = Model::new("m").with_kernel_fn(crate::kernel::PolynomialKernel::new(2, 1.0));
        model.update_weights(&vec![(0, 1.0)].into_iter().collect(), 1.0);
        let mut candidate = Candidate::new(0.0).with_feature(0, 2.0);
        assert_eq!(model.score_candidate(&mut candidate, true), 9.0);
    }

    #[test]
    fn test_string_parameters() {
        let mut model = Model::new("m");
        model.set("max_epochs", "10").unwrap();
        model.set("min_epochs", "3").unwrap();
        model.set("use_weighted_loss", "true").unwrap();
        assert_eq!(model.get("max_epochs").unwrap(), "10");
        assert_eq!(model.get("min_epochs").unwrap(), "3");
        assert_eq!(model.get("use_weighted_loss").unwrap(), "1");
        model
            .set("candidate_set_scorer", "RandomPairCandidateSetScorer(42)")
            .unwrap();
        model.set("updater", "PassiveAggressiveUpdater(PA-II, 0.5)").unwrap();

        let err = model.set("max_epochs", "2").unwrap_err();
        assert_eq!(err.to_string(), "max_epochs must be at least min_epochs");
        let err = model.set("max_epochs", "many").unwrap_err();
        assert_eq!(err.to_string(), "invalid value for max_epochs: many");
        let err = model.set("c2", "1.0").unwrap_err();
        assert_eq!(err.to_string(), "unknown parameter: c2");
        assert!(matches!(
            model.set("updater", "PerceptronUpdater(1)"),
            Err(Error::Config { .. })
        ));
    }

    #[test]
    fn test_compactify_feature_uids() {
        let mut model = Model::new("m");
        model.symbols_mut().set_index("a", 5);
        model.symbols_mut().set_index("b", 9);
        model.symbols_mut().set_index("unused", 2);
        model.update_weights(&vec![(5, 1.0), (9, -1.0)].into_iter().collect(), 1.0);
        model.compactify_feature_uids();
        assert_eq!(model.symbols().index_of("a"), Some(0));
        assert_eq!(model.symbols().index_of("b"), Some(1));
        assert_eq!(model.symbols().index_of("unused"), None);
        assert_eq!(model.weights().raw().get(&0), 1.0);
        assert_eq!(model.weights().raw().get(&1), -1.0);
    }
}
