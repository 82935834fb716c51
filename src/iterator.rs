use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::candidate::CandidateSet;
use crate::reader::{CandidateSetReader, CandidateSetSource, Encoding};

/// A restartable sequence of candidate sets
///
/// The reference returned by [`next`](CandidateSetIterator::next) is valid
/// until the following call to `next` or `reset`.
pub trait CandidateSetIterator {
    /// Whether another candidate set is available
    fn has_next(&self) -> bool;

    /// The next candidate set, or `None` once the sequence is exhausted
    fn next(&mut self) -> Option<&mut CandidateSet>;

    /// Rewind to the beginning of the sequence
    fn reset(&mut self);
}

/// Populates the features of freshly read candidate sets
pub trait FeatureExtractor {
    /// Extract features for every candidate of the set
    fn extract(&mut self, candidate_set: &mut CandidateSet);

    /// Return to the state for the start of the first source
    fn reset(&mut self);
}

/// Iterates over candidate sets held in memory
#[derive(Debug, Clone, Default)]
pub struct CollectionCandidateSetIterator {
    collection: Vec<CandidateSet>,
    position: usize,
}

impl CollectionCandidateSetIterator {
    pub fn new(collection: Vec<CandidateSet>) -> Self {
        Self {
            collection,
            position: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.collection.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collection.is_empty()
    }

    pub fn into_inner(self) -> Vec<CandidateSet> {
        self.collection
    }
}

impl From<Vec<CandidateSet>> for CollectionCandidateSetIterator {
    fn from(collection: Vec<CandidateSet>) -> Self {
        Self::new(collection)
    }
}

impl CandidateSetIterator for CollectionCandidateSetIterator {
    fn has_next(&self) -> bool {
        self.position < self.collection.len()
    }

    fn next(&mut self) -> Option<&mut CandidateSet> {
        let set = self.collection.get_mut(self.position)?;
        self.position += 1;
        Some(set)
    }

    fn reset(&mut self) {
        self.position = 0;
    }
}

/// Options for a [`MultiFileCandidateSetIterator`]
#[derive(Debug, Clone)]
pub struct MultiFileOptions {
    /// Maximum number of candidate sets read from each file
    pub max_examples: Option<usize>,
    /// Maximum number of candidates kept per candidate set
    pub max_candidates: Option<usize>,
    /// Number of sets read between progress messages
    pub reporting_interval: usize,
    pub verbosity: u8,
    pub encoding: Encoding,
}

impl Default for MultiFileOptions {
    fn default() -> Self {
        Self {
            max_examples: None,
            max_candidates: None,
            reporting_interval: 1000,
            verbosity: 0,
            encoding: Encoding::empty(),
        }
    }
}

/// Streams candidate sets from an ordered list of files
///
/// Exactly one candidate set is buffered ahead of the consumer while more
/// data exists, and at most one file is open at a time. A file that ends,
/// fails to open or holds a corrupt record is closed and iteration continues
/// with the next file; only the exhaustion of every file ends the sequence.
/// When a feature extractor is attached it runs on each set as the set is
/// buffered, so consumers only ever see featurized sets.
pub struct MultiFileCandidateSetIterator<S: CandidateSetSource = CandidateSetReader> {
    files: Vec<PathBuf>,
    extractor: Option<Box<dyn FeatureExtractor>>,
    encoding: Encoding,
    source: S,
    verbosity: u8,
    /// Index into `files` of the current file
    file_index: usize,
    file_open: bool,
    /// The buffered lookahead element
    next: Option<CandidateSet>,
    /// The element most recently handed out by `next`
    current: Option<CandidateSet>,
}

impl MultiFileCandidateSetIterator<CandidateSetReader> {
    /// Create an iterator over `files` read with a [`CandidateSetReader`]
    pub fn new(
        files: Vec<PathBuf>,
        extractor: Option<Box<dyn FeatureExtractor>>,
        options: MultiFileOptions,
    ) -> Self {
        let reader = CandidateSetReader::new(
            options.max_examples,
            options.max_candidates,
            options.reporting_interval,
        );
        Self::with_source(files, extractor, reader, options.verbosity, options.encoding)
    }
}

impl<S: CandidateSetSource> MultiFileCandidateSetIterator<S> {
    /// Create an iterator over `files` read with an arbitrary source
    pub fn with_source(
        files: Vec<PathBuf>,
        extractor: Option<Box<dyn FeatureExtractor>>,
        source: S,
        verbosity: u8,
        encoding: Encoding,
    ) -> Self {
        let mut iter = Self {
            files,
            extractor,
            encoding,
            source,
            verbosity,
            file_index: 0,
            file_open: false,
            next: None,
            current: None,
        };
        // keep the source quiet while priming the first element
        iter.source.set_verbosity(0);
        iter.reset();
        iter.source.set_verbosity(verbosity);
        iter
    }

    /// Path of the file currently open, if any
    pub fn curr_file(&self) -> Option<&Path> {
        if self.file_open {
            self.files.get(self.file_index).map(PathBuf::as_path)
        } else {
            None
        }
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    fn open_current(&mut self) {
        let path = match self.files.get(self.file_index) {
            Some(path) => path,
            None => return,
        };
        match self.source.open(path, self.encoding) {
            Ok(()) => self.file_open = true,
            Err(e) => {
                self.file_open = false;
                if self.verbosity >= 1 {
                    warn!(file = %path.display(), error = %e, "could not open candidate set file");
                }
            }
        }
    }

    fn close_current(&mut self) {
        if self.file_open {
            self.source.close();
            self.file_open = false;
        }
    }

    fn advance_file(&mut self) {
        if self.verbosity >= 1 && (!self.file_open || self.source.num_read() == 0) {
            warn!(
                "could not read any training examples from file \"{}\"",
                self.files[self.file_index].display()
            );
        }
        self.close_current();
        self.file_index += 1;
        self.open_current();
    }

    /// Fill the lookahead buffer, moving across files as they run out
    fn read_next(&mut self) {
        while self.file_index < self.files.len() && self.next.is_none() {
            let read = if self.file_open {
                self.source.read_next()
            } else {
                Ok(None)
            };
            match read {
                Ok(Some(set)) => self.next = Some(set),
                Ok(None) => self.advance_file(),
                Err(e) => {
                    if self.verbosity >= 2 {
                        debug!(file = %self.files[self.file_index].display(), error = %e, "invalid read");
                    }
                    self.advance_file();
                }
            }
        }
        if let (Some(extractor), Some(next)) = (self.extractor.as_mut(), self.next.as_mut()) {
            extractor.extract(next);
        }
    }
}

impl<S: CandidateSetSource> CandidateSetIterator for MultiFileCandidateSetIterator<S> {
    fn has_next(&self) -> bool {
        self.next.is_some()
    }

    fn next(&mut self) -> Option<&mut CandidateSet> {
        self.current = self.next.take();
        self.read_next();
        self.current.as_mut()
    }

    fn reset(&mut self) {
        self.close_current();
        self.file_index = 0;
        self.open_current();
        self.next = None;
        self.current = None;
        if let Some(extractor) = self.extractor.as_mut() {
            extractor.reset();
        }
        self.read_next();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candidate::Candidate;
    use std::collections::VecDeque;
    use std::io;

    /// In-memory source: each "file" name maps to a list of reads
    #[derive(Default)]
    struct FakeSource {
        contents: Vec<(PathBuf, Vec<io::Result<Option<CandidateSet>>>)>,
        queue: VecDeque<io::Result<Option<CandidateSet>>>,
        num_read: usize,
        opened: Vec<PathBuf>,
        open_count: usize,
    }

    fn set(reference: &str) -> CandidateSet {
        let mut set = CandidateSet::new(reference);
        set.push(Candidate::new(0.0));
        set
    }

    impl FakeSource {
        fn file(mut self, name: &str, sets: &[&str]) -> Self {
            let reads = sets.iter().map(|r| Ok(Some(set(r)))).collect();
            self.contents.push((PathBuf::from(name), reads));
            self
        }

        fn corrupt(mut self, name: &str) -> Self {
            let reads = vec![Err(io::Error::new(io::ErrorKind::InvalidData, "bad"))];
            self.contents.push((PathBuf::from(name), reads));
            self
        }
    }

    impl CandidateSetSource for FakeSource {
        fn open(&mut self, path: &Path, _encoding: Encoding) -> io::Result<()> {
            let reads = self
                .contents
                .iter()
                .find(|(p, _)| p == path)
                .map(|(_, reads)| reads)
                .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no such file"))?;
            self.queue = reads
                .iter()
                .map(|r| match r {
                    Ok(s) => Ok(s.clone()),
                    Err(e) => Err(io::Error::new(e.kind(), e.to_string())),
                })
                .collect();
            self.num_read = 0;
            self.open_count += 1;
            self.opened.push(path.to_path_buf());
            Ok(())
        }

        fn read_next(&mut self) -> io::Result<Option<CandidateSet>> {
            let read = self.queue.pop_front().unwrap_or(Ok(None));
            if let Ok(Some(_)) = read {
                self.num_read += 1;
            }
            read
        }

        fn close(&mut self) {
            self.open_count -= 1;
        }

        fn num_read(&self) -> usize {
            self.num_read
        }

        fn set_verbosity(&mut self, _verbosity: u8) {}
    }

    fn drain<I: CandidateSetIterator>(iter: &mut I) -> Vec<String> {
        let mut refs = Vec::new();
        while iter.has_next() {
            refs.push(iter.next().unwrap().reference.clone());
        }
        refs
    }

    #[test]
    fn test_collection_iterator() {
        let mut iter = CollectionCandidateSetIterator::new(vec![set("a"), set("b")]);
        assert_eq!(drain(&mut iter), vec!["a", "b"]);
        assert!(iter.next().is_none());
        iter.reset();
        assert_eq!(drain(&mut iter), vec!["a", "b"]);
    }

    #[test]
    fn test_spans_files_and_skips_invalid() {
        let source = FakeSource::default()
            .file("a", &["a1", "a2"])
            .corrupt("b")
            .file("c", &["c1"]);
        let files = vec!["a".into(), "b".into(), "c".into()];
        let mut iter = MultiFileCandidateSetIterator::with_source(files, None, source, 1, Encoding::empty());

        assert!(iter.has_next());
        assert_eq!(iter.next().unwrap().reference, "a1");
        assert_eq!(iter.next().unwrap().reference, "a2");
        assert!(iter.has_next());
        assert_eq!(iter.next().unwrap().reference, "c1");
        assert!(!iter.has_next());
        assert!(iter.next().is_none());
        assert_eq!(iter.source.open_count, 0);
    }

    #[test]
    fn test_missing_and_empty_files() {
        let source = FakeSource::default().file("empty", &[]).file("full", &["x"]);
        let files = vec!["missing".into(), "empty".into(), "full".into()];
        let mut iter = MultiFileCandidateSetIterator::with_source(files, None, source, 2, Encoding::empty());
        assert_eq!(drain(&mut iter), vec!["x"]);
    }

    #[test]
    fn test_no_files() {
        let mut iter = MultiFileCandidateSetIterator::with_source(
            Vec::new(),
            None,
            FakeSource::default(),
            0,
            Encoding::empty(),
        );
        assert!(!iter.has_next());
        assert!(iter.curr_file().is_none());
        iter.reset();
        assert!(!iter.has_next());
    }

    #[test]
    fn test_one_file_open_at_a_time() {
        let source = FakeSource::default().file("a", &["a1"]).file("b", &["b1"]);
        let files = vec!["a".into(), "b".into()];
        let mut iter = MultiFileCandidateSetIterator::with_source(files, None, source, 0, Encoding::empty());
        assert_eq!(iter.curr_file(), Some(Path::new("a")));
        iter.next();
        assert_eq!(iter.curr_file(), Some(Path::new("b")));
        assert_eq!(iter.source.open_count, 1);
        iter.next();
        assert_eq!(iter.curr_file(), None);
        assert_eq!(iter.source.open_count, 0);
    }

    struct CountingExtractor {
        extracted: usize,
        resets: usize,
    }

    impl FeatureExtractor for CountingExtractor {
        fn extract(&mut self, candidate_set: &mut CandidateSet) {
            self.extracted += 1;
            for candidate in candidate_set.iter_mut() {
                candidate.features.insert(0, self.extracted as f64);
            }
        }

        fn reset(&mut self) {
            self.extracted = 0;
            self.resets += 1;
        }
    }

    #[test]
    fn test_extractor_runs_before_sets_are_visible() {
        let source = FakeSource::default().file("a", &["a1", "a2"]);
        let extractor = CountingExtractor {
            extracted: 0,
            resets: 0,
        };
        let mut iter = MultiFileCandidateSetIterator::with_source(
            vec!["a".into()],
            Some(Box::new(extractor)),
            source,
            0,
            Encoding::empty(),
        );
        for round in 0..2 {
            let first = iter.next().unwrap();
            assert_eq!(first.get(0).unwrap().features.get(&0), 1.0, "round {}", round);
            let second = iter.next().unwrap();
            assert_eq!(second.get(0).unwrap().features.get(&0), 2.0);
            assert!(!iter.has_next());
            iter.reset();
        }
        assert_eq!(iter.source.opened.len(), 3);
    }
}
