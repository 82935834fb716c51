//! Learning rules and convergence tests
//!
//! Each learning rule is a pair of an [`UpdatePredicate`] deciding when to
//! update and an [`Updater`] applying the update. They plug into
//! [`Model`](crate::Model) through its policy slots.
//!
//! [`UpdatePredicate`]: crate::model::UpdatePredicate
//! [`Updater`]: crate::model::Updater

pub mod convergence;
pub mod passive_aggressive;
pub mod perceptron;

pub use self::convergence::LossPlateau;
pub use self::passive_aggressive::{PaType, PassiveAggressiveParams, PassiveAggressiveUpdater};
pub use self::perceptron::{PerceptronUpdatePredicate, PerceptronUpdater};
