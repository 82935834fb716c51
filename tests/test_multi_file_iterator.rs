use std::io::Write;
use std::path::PathBuf;

use reranker::{
    Candidate, CandidateSet, CandidateSetIterator, CandidateSetWriter, Encoding,
    FeatureExtractor, MultiFileCandidateSetIterator, MultiFileOptions,
};
use tempfile::TempDir;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Route the iterator's warnings to the test output, filtered by `RUST_LOG`
fn init_tracing() {
    let _ = tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with(tracing_subscriber::fmt::layer().with_test_writer())
        .try_init();
}

fn candidate_set(reference: &str, num_candidates: usize) -> CandidateSet {
    let mut set = CandidateSet::new(reference);
    for i in 0..num_candidates {
        set.push(Candidate::new(i as f64).with_raw_data(format!("{} hyp {}", reference, i)));
    }
    set
}

fn write_sets(dir: &TempDir, name: &str, refs: &[&str], encoding: Encoding) -> PathBuf {
    let path = dir.path().join(name);
    let sets: Vec<CandidateSet> = refs.iter().map(|r| candidate_set(r, 3)).collect();
    let mut writer = CandidateSetWriter::default();
    writer.write(&sets, &path, encoding).unwrap();
    path
}

fn write_garbage(dir: &TempDir, name: &str) -> PathBuf {
    let path = dir.path().join(name);
    let mut file = std::fs::File::create(&path).unwrap();
    writeln!(file, "this is not a candidate set").unwrap();
    path
}

fn drain<I: CandidateSetIterator>(iter: &mut I) -> Vec<String> {
    let mut refs = Vec::new();
    while iter.has_next() {
        refs.push(iter.next().unwrap().reference.clone());
    }
    refs
}

#[test]
fn test_skips_invalid_file_between_valid_files() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let files = vec![
        write_sets(&dir, "a.jsonl", &["a1", "a2"], Encoding::empty()),
        write_garbage(&dir, "b.jsonl"),
        write_sets(&dir, "c.jsonl", &["c1"], Encoding::empty()),
    ];
    let options = MultiFileOptions {
        verbosity: 1,
        ..MultiFileOptions::default()
    };
    let mut iter = MultiFileCandidateSetIterator::new(files, None, options);

    assert_eq!(iter.next().unwrap().reference, "a1");
    assert_eq!(iter.next().unwrap().reference, "a2");
    assert!(iter.has_next());
    assert_eq!(iter.next().unwrap().reference, "c1");
    assert!(!iter.has_next());
}

#[test]
fn test_reset_reproduces_sequence() {
    let dir = TempDir::new().unwrap();
    let files = vec![
        write_sets(&dir, "a.gz", &["a1", "a2", "a3"], Encoding::COMPRESSED),
        write_sets(&dir, "b.gz", &["b1"], Encoding::COMPRESSED),
    ];
    let options = MultiFileOptions {
        encoding: Encoding::COMPRESSED,
        ..MultiFileOptions::default()
    };
    let mut iter = MultiFileCandidateSetIterator::new(files, None, options);

    let first = drain(&mut iter);
    assert_eq!(first, vec!["a1", "a2", "a3", "b1"]);
    iter.reset();
    assert_eq!(drain(&mut iter), first);
    iter.reset();
    iter.reset();
    assert_eq!(drain(&mut iter), first);
}

#[test]
fn test_empty_and_missing_files_before_valid_file() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let empty = dir.path().join("empty.jsonl");
    std::fs::File::create(&empty).unwrap();
    let files = vec![
        dir.path().join("missing.jsonl"),
        empty,
        write_sets(&dir, "valid.jsonl", &["v1", "v2"], Encoding::BASE64),
    ];
    let options = MultiFileOptions {
        encoding: Encoding::BASE64,
        verbosity: 2,
        ..MultiFileOptions::default()
    };
    let mut iter = MultiFileCandidateSetIterator::new(files, None, options);
    assert!(iter.has_next());
    assert_eq!(iter.next().unwrap().reference, "v1");
    assert!(iter.has_next());
    assert_eq!(iter.next().unwrap().reference, "v2");
    assert!(!iter.has_next());
    assert!(iter.curr_file().is_none());
}

#[test]
fn test_caps_apply_per_file() {
    let dir = TempDir::new().unwrap();
    let files = vec![
        write_sets(&dir, "a.jsonl", &["a1", "a2", "a3"], Encoding::empty()),
        write_sets(&dir, "b.jsonl", &["b1", "b2", "b3"], Encoding::empty()),
    ];
    let options = MultiFileOptions {
        max_examples: Some(2),
        max_candidates: Some(1),
        reporting_interval: 1,
        ..MultiFileOptions::default()
    };
    let mut iter = MultiFileCandidateSetIterator::new(files, None, options);
    let mut refs = Vec::new();
    while iter.has_next() {
        let set = iter.next().unwrap();
        assert_eq!(set.len(), 1);
        refs.push(set.reference.clone());
    }
    assert_eq!(refs, vec!["a1", "a2", "b1", "b2"]);
}

/// Adds a feature counting the sets seen since the last reset
struct PositionFeature {
    position: u32,
}

impl FeatureExtractor for PositionFeature {
    fn extract(&mut self, candidate_set: &mut CandidateSet) {
        for candidate in candidate_set.iter_mut() {
            candidate.features.insert(self.position, 1.0);
        }
        self.position += 1;
    }

    fn reset(&mut self) {
        self.position = 0;
    }
}

#[test]
fn test_feature_extractor_sees_every_set() {
    let dir = TempDir::new().unwrap();
    let files = vec![
        write_sets(&dir, "a.jsonl", &["a1"], Encoding::empty()),
        write_sets(&dir, "b.jsonl", &["b1", "b2"], Encoding::empty()),
    ];
    let extractor = PositionFeature { position: 0 };
    let mut iter = MultiFileCandidateSetIterator::new(
        files,
        Some(Box::new(extractor)),
        MultiFileOptions::default(),
    );
    for _ in 0..2 {
        let mut position = 0;
        while iter.has_next() {
            let set = iter.next().unwrap();
            assert!(set.iter().all(|c| c.features.get(&position) == 1.0));
            position += 1;
        }
        assert_eq!(position, 3);
        iter.reset();
    }
}

#[test]
fn test_no_valid_files() {
    let dir = TempDir::new().unwrap();
    let files = vec![write_garbage(&dir, "x.jsonl"), dir.path().join("missing")];
    let mut iter = MultiFileCandidateSetIterator::new(files, None, MultiFileOptions::default());
    assert!(!iter.has_next());
    assert!(iter.next().is_none());
    iter.reset();
    assert!(!iter.has_next());
}
