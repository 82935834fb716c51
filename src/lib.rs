//! Discriminative reranking with online perceptron-family training
//!
//! A [`Model`] learns to score the candidates of each [`CandidateSet`] so
//! that the best-scoring candidate approximates the lowest-loss ("gold")
//! one. Training streams candidate sets from any [`CandidateSetIterator`],
//! typically a [`MultiFileCandidateSetIterator`] spanning several files, and
//! evaluates on a development iterator at the end of every epoch.
//!
//! # Examples
//!
//! ## Training
//!
//! ```no_run
//! use reranker::{Encoding, Model, ModelWriter, MultiFileCandidateSetIterator, MultiFileOptions};
//!
//! let options = MultiFileOptions {
//!     encoding: Encoding::COMPRESSED,
//!     ..MultiFileOptions::default()
//! };
//! let mut train = MultiFileCandidateSetIterator::new(
//!     vec!["train-0.gz".into(), "train-1.gz".into()],
//!     None,
//!     options.clone(),
//! );
//! let mut dev = MultiFileCandidateSetIterator::new(vec!["dev.gz".into()], None, options);
//!
//! let mut model = Model::new("reranker").with_max_epochs(20)?;
//! model.set("candidate_set_scorer", "RandomPairCandidateSetScorer(42)")?;
//! model.train(&mut train, &mut dev);
//! model.compactify_feature_uids();
//! ModelWriter::write("model.rrk", &model)?;
//! # Ok::<(), reranker::Error>(())
//! ```
//!
//! ## Scoring
//!
//! ```no_run
//! use reranker::{CandidateSetReader, Encoding, Model, ModelFile};
//!
//! let buf = std::fs::read("model.rrk")?;
//! let mut model = Model::from_model_file(&ModelFile::new(&buf)?)?;
//!
//! let mut reader = CandidateSetReader::default();
//! for mut set in reader.read_all("test.jsonl", Encoding::empty())? {
//!     model.score_candidates(&mut set, false);
//!     println!("{}", set.best().map(|c| c.raw_data.as_str()).unwrap_or(""));
//! }
//! # Ok::<(), reranker::Error>(())
//! ```

mod candidate;
mod comparator;
mod error;
pub mod factory;
mod feature_vector;
mod iterator;
mod kernel;
mod model;
mod model_file;
mod model_writer;
mod reader;
mod scorer;
mod symbols;
mod time;
pub mod train;
mod weights;
mod writer;

pub use self::candidate::{Candidate, CandidateSet};
pub use self::comparator::{Comparator, DefaultGoldComparator, DefaultScoreComparator};
pub use self::error::{Error, Result};
pub use self::feature_vector::FeatureVector;
pub use self::iterator::{
    CandidateSetIterator, CollectionCandidateSetIterator, FeatureExtractor,
    MultiFileCandidateSetIterator, MultiFileOptions,
};
pub use self::kernel::{DotProductKernel, KernelFunction, PolynomialKernel};
pub use self::model::{ConvergenceTest, Hook, Model, UpdatePredicate, Updater};
pub use self::model_file::ModelFile;
pub use self::model_writer::{ModelWriter, StoredFeature};
pub use self::reader::{CandidateSetReader, CandidateSetSource, Encoding};
pub use self::scorer::{CandidateSetScorer, DefaultCandidateSetScorer, RandomPairCandidateSetScorer};
pub use self::symbols::{SymbolTable, Symbols};
pub use self::time::Time;
pub use self::weights::Weights;
pub use self::writer::CandidateSetWriter;
