use std::fmt;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;

use base64::{engine::general_purpose, Engine as _};
use bitflags::bitflags;
use bstr::ByteSlice;
use flate2::read::MultiGzDecoder;
use tracing::{debug, info, trace};

use crate::candidate::CandidateSet;

bitflags! {
    /// Encoding of a stream of serialized candidate sets
    #[derive(Default)]
    pub struct Encoding: u32 {
        /// The whole stream is gzip-compressed
        const COMPRESSED = 0x01;
        /// Every record is base64-encoded
        const BASE64 = 0x02;
    }
}

/// A source of serialized candidate sets
///
/// This is the seam between the streaming iterator and the record codec.
/// `read_next` returns `Ok(None)` at the end of the source and an error for
/// a record that cannot be decoded.
pub trait CandidateSetSource {
    /// Open a source, closing any source that is currently open
    fn open(&mut self, path: &Path, encoding: Encoding) -> io::Result<()>;

    /// Read the next candidate set from the open source
    fn read_next(&mut self) -> io::Result<Option<CandidateSet>>;

    /// Close the open source, if any
    fn close(&mut self);

    /// Number of candidate sets read from the current source
    fn num_read(&self) -> usize;

    fn set_verbosity(&mut self, verbosity: u8);
}

/// Reads candidate sets stored one per line as JSON records
///
/// Records may be individually base64-encoded and the stream as a whole may
/// be gzip-compressed. The path `-` denotes standard input.
pub struct CandidateSetReader {
    /// Maximum number of candidate sets to read from each source
    max_examples: Option<usize>,
    /// Maximum number of candidates to keep per candidate set
    max_candidates: Option<usize>,
    /// Number of sets between progress messages
    reporting_interval: usize,
    verbosity: u8,
    num_read: usize,
    interval_read: usize,
    filename: String,
    encoding: Encoding,
    input: Option<Box<dyn BufRead>>,
    line: Vec<u8>,
}

impl fmt::Debug for CandidateSetReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CandidateSetReader")
            .field("max_examples", &self.max_examples)
            .field("max_candidates", &self.max_candidates)
            .field("reporting_interval", &self.reporting_interval)
            .field("verbosity", &self.verbosity)
            .field("num_read", &self.num_read)
            .field("filename", &self.filename)
            .field("encoding", &self.encoding)
            .field("open", &self.input.is_some())
            .finish()
    }
}

impl CandidateSetReader {
    pub fn new(
        max_examples: Option<usize>,
        max_candidates: Option<usize>,
        reporting_interval: usize,
    ) -> Self {
        Self {
            max_examples,
            max_candidates,
            reporting_interval,
            verbosity: 0,
            num_read: 0,
            interval_read: 0,
            filename: String::new(),
            encoding: Encoding::empty(),
            input: None,
            line: Vec::new(),
        }
    }

    /// Whether a source is currently open
    pub fn is_open(&self) -> bool {
        self.input.is_some()
    }

    /// Read every candidate set from a single source
    pub fn read_all<P: AsRef<Path>>(
        &mut self,
        path: P,
        encoding: Encoding,
    ) -> io::Result<Vec<CandidateSet>> {
        self.open(path.as_ref(), encoding)?;
        let mut sets = Vec::new();
        let result = loop {
            match self.read_next() {
                Ok(Some(set)) => sets.push(set),
                Ok(None) => break Ok(sets),
                Err(e) => break Err(e),
            }
        };
        self.close();
        result
    }

    fn decode(record: &[u8], encoding: Encoding) -> io::Result<CandidateSet> {
        let decoded = if encoding.contains(Encoding::BASE64) {
            let bytes = general_purpose::STANDARD
                .decode(record)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
            serde_json::from_slice(&bytes)
        } else {
            serde_json::from_slice(record)
        };
        decoded.map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }
}

impl Default for CandidateSetReader {
    fn default() -> Self {
        Self::new(None, None, 1000)
    }
}

impl CandidateSetSource for CandidateSetReader {
    fn open(&mut self, path: &Path, encoding: Encoding) -> io::Result<()> {
        self.close();
        let raw: Box<dyn Read> = if path == Path::new("-") {
            Box::new(io::stdin())
        } else {
            Box::new(File::open(path)?)
        };
        let input: Box<dyn BufRead> = if encoding.contains(Encoding::COMPRESSED) {
            Box::new(BufReader::new(MultiGzDecoder::new(raw)))
        } else {
            Box::new(BufReader::new(raw))
        };
        if self.verbosity >= 1 {
            info!(file = %path.display(), "CandidateSetReader: reading from file");
        }
        self.input = Some(input);
        self.filename = path.display().to_string();
        self.encoding = encoding;
        self.num_read = 0;
        self.interval_read = 0;
        Ok(())
    }

    fn read_next(&mut self) -> io::Result<Option<CandidateSet>> {
        if let Some(max) = self.max_examples {
            if self.num_read >= max {
                return Ok(None);
            }
        }
        let input = match self.input.as_mut() {
            Some(input) => input,
            None => return Ok(None),
        };

        let mut set = loop {
            self.line.clear();
            if input.read_until(b'\n', &mut self.line)? == 0 {
                return Ok(None);
            }
            let record = self.line.trim();
            if record.is_empty() {
                continue;
            }
            if self.verbosity >= 3 {
                trace!(record = %record.as_bstr(), "CandidateSetReader: raw record");
            }
            break Self::decode(record, self.encoding)?;
        };

        set.renumber();
        if let Some(max) = self.max_candidates {
            if set.len() > max {
                set.truncate(max);
            }
        }

        self.num_read += 1;
        self.interval_read += 1;
        if self.verbosity >= 2 {
            debug!("CandidateSetReader: read {}", set);
        }
        if self.reporting_interval > 0 && self.interval_read == self.reporting_interval {
            if self.verbosity >= 1 {
                info!(
                    file = %self.filename,
                    "CandidateSetReader: read {} candidate sets",
                    self.num_read
                );
            }
            self.interval_read = 0;
        }
        Ok(Some(set))
    }

    fn close(&mut self) {
        if self.input.take().is_some() && self.verbosity >= 2 {
            debug!(
                file = %self.filename,
                "CandidateSetReader: closing after {} candidate sets",
                self.num_read
            );
        }
    }

    fn num_read(&self) -> usize {
        self.num_read
    }

    fn set_verbosity(&mut self, verbosity: u8) {
        self.verbosity = verbosity;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_lines(lines: &[&str]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        for line in lines {
            writeln!(file, "{}", line).unwrap();
        }
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_read_plain_records() {
        let file = write_lines(&[
            r#"{"reference": "a", "candidates": [{"loss": 1.0}, {"loss": 0.0}]}"#,
            "",
            r#"{"reference": "b", "candidates": [{"loss": 0.5}]}"#,
        ]);
        let mut reader = CandidateSetReader::default();
        let sets = reader.read_all(file.path(), Encoding::empty()).unwrap();
        assert_eq!(sets.len(), 2);
        assert_eq!(sets[0].reference, "a");
        assert_eq!(sets[0].get(1).unwrap().index, 1);
        assert!(!reader.is_open());
    }

    #[test]
    fn test_caps() {
        let file = write_lines(&[
            r#"{"candidates": [{"loss": 1.0}, {"loss": 0.0}, {"loss": 2.0}]}"#,
            r#"{"candidates": [{"loss": 0.5}]}"#,
            r#"{"candidates": [{"loss": 0.5}]}"#,
        ]);
        let mut reader = CandidateSetReader::new(Some(2), Some(2), 1);
        reader.open(file.path(), Encoding::empty()).unwrap();
        let first = reader.read_next().unwrap().unwrap();
        assert_eq!(first.len(), 2);
        assert!(reader.read_next().unwrap().is_some());
        assert!(reader.read_next().unwrap().is_none());
        assert_eq!(reader.num_read(), 2);
    }

    #[test]
    fn test_corrupt_record_is_an_error() {
        let file = write_lines(&["not json"]);
        let mut reader = CandidateSetReader::default();
        reader.open(file.path(), Encoding::empty()).unwrap();
        let err = reader.read_next().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn test_unopened_reader_is_exhausted() {
        let mut reader = CandidateSetReader::default();
        assert!(reader.read_next().unwrap().is_none());
        assert!(reader
            .open(Path::new("/nonexistent/reranker/source"), Encoding::empty())
            .is_err());
        assert!(!reader.is_open());
    }
}
