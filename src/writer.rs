use std::fmt;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use base64::{engine::general_purpose, Engine as _};
use flate2::write::GzEncoder;
use flate2::Compression;
use tracing::{debug, info, trace};

use crate::candidate::CandidateSet;
use crate::reader::Encoding;

enum Sink {
    Plain(Box<dyn Write>),
    Compressed(GzEncoder<BufWriter<File>>),
}

impl Sink {
    fn writer(&mut self) -> &mut dyn Write {
        match self {
            Sink::Plain(w) => &mut **w,
            Sink::Compressed(w) => w as &mut dyn Write,
        }
    }

    fn finish(self) -> io::Result<()> {
        match self {
            Sink::Plain(mut w) => w.flush(),
            Sink::Compressed(w) => w.finish()?.flush(),
        }
    }
}

/// Writes candidate sets in the format read by [`CandidateSetReader`]
///
/// The path `-` denotes standard output, which is never compressed.
///
/// [`CandidateSetReader`]: crate::reader::CandidateSetReader
pub struct CandidateSetWriter {
    sink: Option<Sink>,
    encoding: Encoding,
    max_num_to_write: Option<usize>,
    num_written: usize,
    interval_written: usize,
    reporting_interval: usize,
    verbosity: u8,
}

impl fmt::Debug for CandidateSetWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CandidateSetWriter")
            .field("open", &self.sink.is_some())
            .field("encoding", &self.encoding)
            .field("max_num_to_write", &self.max_num_to_write)
            .field("num_written", &self.num_written)
            .field("reporting_interval", &self.reporting_interval)
            .field("verbosity", &self.verbosity)
            .finish()
    }
}

impl CandidateSetWriter {
    pub fn new(reporting_interval: usize) -> Self {
        Self {
            sink: None,
            encoding: Encoding::empty(),
            max_num_to_write: None,
            num_written: 0,
            interval_written: 0,
            reporting_interval,
            verbosity: 0,
        }
    }

    pub fn set_verbosity(&mut self, verbosity: u8) {
        self.verbosity = verbosity;
    }

    /// Stop writing after this many candidate sets
    pub fn set_max_num_to_write(&mut self, max_num_to_write: Option<usize>) {
        self.max_num_to_write = max_num_to_write;
    }

    pub fn num_written(&self) -> usize {
        self.num_written
    }

    /// Open a destination, finishing any destination that is currently open
    pub fn open<P: AsRef<Path>>(&mut self, path: P, encoding: Encoding) -> io::Result<()> {
        self.close()?;
        let path = path.as_ref();
        let to_stdout = path == Path::new("-");
        let mut encoding = encoding;
        if to_stdout {
            encoding.remove(Encoding::COMPRESSED);
        }
        if self.verbosity >= 1 {
            info!(file = %path.display(), "CandidateSetWriter: writing to file");
        }
        let sink = if to_stdout {
            Sink::Plain(Box::new(BufWriter::new(io::stdout())))
        } else if encoding.contains(Encoding::COMPRESSED) {
            Sink::Compressed(GzEncoder::new(
                BufWriter::new(File::create(path)?),
                Compression::default(),
            ))
        } else {
            Sink::Plain(Box::new(BufWriter::new(File::create(path)?)))
        };
        self.sink = Some(sink);
        self.encoding = encoding;
        Ok(())
    }

    /// Write one candidate set
    ///
    /// Returns `Ok(false)` without writing when the maximum number of sets
    /// has already been written.
    pub fn write_next(&mut self, candidate_set: &CandidateSet) -> io::Result<bool> {
        if self.max_num_to_write == Some(self.num_written) {
            return Ok(false);
        }
        let sink = self
            .sink
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "writer is not open"))?;

        let json = serde_json::to_vec(candidate_set)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        let record = if self.encoding.contains(Encoding::BASE64) {
            general_purpose::STANDARD.encode(&json).into_bytes()
        } else {
            json
        };
        let w = sink.writer();
        w.write_all(&record)?;
        w.write_all(b"\n")?;

        if self.verbosity >= 3 {
            trace!(record = %String::from_utf8_lossy(&record), "CandidateSetWriter: wrote record");
        }
        if self.verbosity >= 2 {
            debug!("CandidateSetWriter: candidate set {}", candidate_set);
        }

        self.num_written += 1;
        self.interval_written += 1;
        if self.reporting_interval > 0 && self.interval_written == self.reporting_interval {
            if self.verbosity >= 1 {
                info!("CandidateSetWriter: wrote {} candidate sets", self.num_written);
            }
            self.interval_written = 0;
        }
        Ok(true)
    }

    /// Write all candidate sets to a file, then close it
    pub fn write<P: AsRef<Path>>(
        &mut self,
        examples: &[CandidateSet],
        path: P,
        encoding: Encoding,
    ) -> io::Result<()> {
        self.open(path, encoding)?;
        for candidate_set in examples {
            if !self.write_next(candidate_set)? {
                break;
            }
        }
        self.close()
    }

    /// Flush and close the destination, finishing a compressed stream
    pub fn close(&mut self) -> io::Result<()> {
        match self.sink.take() {
            Some(sink) => sink.finish(),
            None => Ok(()),
        }
    }

    /// Reset the counters
    pub fn reset(&mut self) {
        self.num_written = 0;
        self.interval_written = 0;
    }
}

impl Default for CandidateSetWriter {
    fn default() -> Self {
        Self::new(1000)
    }
}
