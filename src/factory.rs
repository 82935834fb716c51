//! Construction of policy objects from string specifications
//!
//! A specification is a type name optionally followed by a parenthesized
//! argument list, e.g. `RandomPairCandidateSetScorer(42)` or
//! `PassiveAggressiveUpdater(PA-I, 0.5, true)`. Arguments are separated by
//! commas and/or whitespace.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use crate::comparator::{Comparator, DefaultGoldComparator, DefaultScoreComparator};
use crate::error::{Error, Result};
use crate::model::{ConvergenceTest, UpdatePredicate, Updater};
use crate::scorer::{CandidateSetScorer, DefaultCandidateSetScorer, RandomPairCandidateSetScorer};
use crate::train::{
    LossPlateau, PaType, PassiveAggressiveParams, PassiveAggressiveUpdater,
    PerceptronUpdatePredicate, PerceptronUpdater,
};

/// Constructor taking the argument tokens of a specification
pub type Constructor<T> = fn(&[String]) -> Result<Rc<T>>;

/// Maps type names to constructors for one family of policy objects
pub struct Registry<T: ?Sized> {
    kind: &'static str,
    constructors: BTreeMap<String, Constructor<T>>,
}

impl<T: ?Sized> fmt::Debug for Registry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("kind", &self.kind)
            .field("names", &self.constructors.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl<T: ?Sized> Registry<T> {
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            constructors: BTreeMap::new(),
        }
    }

    /// Register a constructor, replacing any previous one for `name`
    pub fn register<N: Into<String>>(&mut self, name: N, constructor: Constructor<T>) {
        self.constructors.insert(name.into(), constructor);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.constructors.contains_key(name)
    }

    /// Registered type names in sorted order
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.constructors.keys().map(String::as_str)
    }

    /// Construct an object from its specification
    pub fn create(&self, spec: &str) -> Result<Rc<T>> {
        let (name, args) = parse_spec(spec)?;
        let constructor = self.constructors.get(&name).ok_or_else(|| {
            Error::config(
                self.kind,
                format!("unknown type \"{}\" in specification \"{}\"", name, spec),
            )
        })?;
        constructor(&args)
    }
}

/// Split a specification into its type name and argument tokens
pub fn parse_spec(spec: &str) -> Result<(String, Vec<String>)> {
    let spec = spec.trim();
    let (name, rest) = match spec.find('(') {
        Some(open) => {
            let close = spec
                .rfind(')')
                .filter(|&close| close > open && close == spec.len() - 1)
                .ok_or_else(|| {
                    Error::config("factory", format!("unbalanced parentheses in \"{}\"", spec))
                })?;
            (&spec[..open], &spec[open + 1..close])
        }
        None => (spec, ""),
    };
    let name = name.trim();
    if name.is_empty() || name.contains(char::is_whitespace) {
        return Err(Error::config(
            "factory",
            format!("invalid type name in \"{}\"", spec),
        ));
    }
    let args = rest
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect();
    Ok((name.to_string(), args))
}

/// Check that a specification has between `min` and `max` argument tokens
pub fn check_number_of_tokens(
    arg: &str,
    tokens: &[String],
    min: usize,
    max: usize,
    class_name: &str,
) -> Result<()> {
    let n = tokens.len();
    if n < min || n > max {
        let expected = if min == max {
            format!("{}", min)
        } else {
            format!("between {} and {}", min, max)
        };
        return Err(Error::config(
            class_name,
            format!(
                "wrong number of tokens in \"{}\": expected {}, got {}",
                arg, expected, n
            ),
        ));
    }
    Ok(())
}

fn parse_token<V: std::str::FromStr>(token: &str, class_name: &str) -> Result<V> {
    token
        .parse()
        .map_err(|_| Error::config(class_name, format!("invalid argument \"{}\"", token)))
}

fn parse_bool(token: &str, class_name: &str) -> Result<bool> {
    match token {
        "1" | "true" => Ok(true),
        "0" | "false" => Ok(false),
        _ => Err(Error::config(class_name, format!("invalid argument \"{}\"", token))),
    }
}

/// Registry of the built-in comparators
pub fn comparators() -> Registry<dyn Comparator> {
    let mut registry: Registry<dyn Comparator> = Registry::new("Comparator");
    registry.register("DefaultScoreComparator", |args| {
        check_number_of_tokens(&args.join(","), args, 0, 0, "DefaultScoreComparator")?;
        Ok(Rc::new(DefaultScoreComparator))
    });
    registry.register("DefaultGoldComparator", |args| {
        check_number_of_tokens(&args.join(","), args, 0, 0, "DefaultGoldComparator")?;
        Ok(Rc::new(DefaultGoldComparator))
    });
    registry
}

/// Registry of the built-in candidate set scorers
pub fn candidate_set_scorers() -> Registry<dyn CandidateSetScorer> {
    let mut registry: Registry<dyn CandidateSetScorer> = Registry::new("CandidateSetScorer");
    registry.register("DefaultCandidateSetScorer", |args| {
        check_number_of_tokens(&args.join(","), args, 0, 0, "DefaultCandidateSetScorer")?;
        Ok(Rc::new(DefaultCandidateSetScorer))
    });
    registry.register("RandomPairCandidateSetScorer", |args| {
        let class = "RandomPairCandidateSetScorer";
        check_number_of_tokens(&args.join(","), args, 0, 1, class)?;
        let scorer = match args.first() {
            Some(seed) => RandomPairCandidateSetScorer::with_seed(parse_token(seed, class)?),
            None => RandomPairCandidateSetScorer::new(),
        };
        Ok(Rc::new(scorer))
    });
    registry
}

/// Registry of the built-in update predicates
pub fn update_predicates() -> Registry<dyn UpdatePredicate> {
    let mut registry: Registry<dyn UpdatePredicate> = Registry::new("UpdatePredicate");
    registry.register("PerceptronUpdatePredicate", |args| {
        check_number_of_tokens(&args.join(","), args, 0, 0, "PerceptronUpdatePredicate")?;
        Ok(Rc::new(PerceptronUpdatePredicate))
    });
    registry
}

/// Registry of the built-in updaters
///
/// `PassiveAggressiveUpdater` takes up to three arguments: the PA type
/// (`PA`, `PA-I` or `PA-II`), the aggressiveness C and whether margins are
/// error-sensitive.
pub fn updaters() -> Registry<dyn Updater> {
    let mut registry: Registry<dyn Updater> = Registry::new("Updater");
    registry.register("PerceptronUpdater", |args| {
        check_number_of_tokens(&args.join(","), args, 0, 0, "PerceptronUpdater")?;
        Ok(Rc::new(PerceptronUpdater))
    });
    registry.register("PassiveAggressiveUpdater", |args| {
        let class = "PassiveAggressiveUpdater";
        check_number_of_tokens(&args.join(","), args, 0, 3, class)?;
        let mut params = PassiveAggressiveParams::default();
        if let Some(pa_type) = args.first() {
            let pa_type: PaType = pa_type
                .parse()
                .map_err(|e: Error| Error::config(class, e.to_string()))?;
            params.set_pa_type(pa_type);
        }
        if let Some(pa_c) = args.get(1) {
            params
                .set_pa_c(parse_token(pa_c, class)?)
                .map_err(|e| Error::config(class, e.to_string()))?;
        }
        if let Some(error_sensitive) = args.get(2) {
            params.set_pa_error_sensitive(parse_bool(error_sensitive, class)?);
        }
        Ok(Rc::new(PassiveAggressiveUpdater::new(params)))
    });
    registry
}

/// Registry of the built-in convergence tests
pub fn convergence_tests() -> Registry<dyn ConvergenceTest> {
    let mut registry: Registry<dyn ConvergenceTest> = Registry::new("ConvergenceTest");
    registry.register("LossPlateau", |args| {
        let class = "LossPlateau";
        check_number_of_tokens(&args.join(","), args, 0, 1, class)?;
        let test = match args.first() {
            Some(n) => LossPlateau::new(parse_token(n, class)?)
                .map_err(|e| Error::config(class, e.to_string()))?,
            None => LossPlateau::default(),
        };
        Ok(Rc::new(test))
    });
    registry
}
