use std::fs::File;
use std::io::{self, Seek, SeekFrom, Write};
use std::path::Path;

use cqdb::CQDBWriter;

use crate::model::Model;
use crate::model_file::{FEATURE_SIZE, MAGIC, MODEL_TYPE, VERSION};

/// A feature as stored in a model file
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StoredFeature {
    pub uid: u32,
    pub weight: f64,
    pub averaged_weight: f64,
}

fn to_u32(value: u64, what: &str) -> io::Result<u32> {
    u32::try_from(value).map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("{} exceeds u32::MAX", what),
        )
    })
}

/// Write a model to file
///
/// The file holds a header, the features with a non-zero raw or averaged
/// weight, the symbol table and the model name. It is read back with
/// [`ModelFile`](crate::ModelFile).
pub struct ModelWriter;

impl ModelWriter {
    pub fn write<P: AsRef<Path>>(filename: P, model: &Model) -> io::Result<()> {
        let mut file = File::create(filename.as_ref())?;
        Self::write_to(&mut file, model)?;
        file.sync_all()
    }

    /// Write a model to any seekable sink
    pub fn write_to<W: Write + Seek>(file: &mut W, model: &Model) -> io::Result<()> {
        let features = Self::collect_features(model);
        let mut symbols = model.symbols().entries();
        symbols.sort_by_key(|&(_, id)| id);

        let start = file.stream_position()?;
        // placeholder header, rewritten once the offsets are known
        Self::write_header(file, &Header::default())?;

        let mut header = Header {
            num_features: to_u32(features.len() as u64, "number of features")?,
            num_symbols: to_u32(symbols.len() as u64, "number of symbols")?,
            ..Header::default()
        };

        header.off_features = to_u32(file.stream_position()? - start, "feature offset")?;
        Self::write_features(file, &features)?;

        header.off_symbol_ids = to_u32(file.stream_position()? - start, "symbol offset")?;
        Self::write_symbol_ids(file, &symbols)?;

        if !symbols.is_empty() {
            header.off_symbols = to_u32(file.stream_position()? - start, "symbol offset")?;
            Self::write_cqdb(file, &symbols)?;
            Self::align_to_u32(file, start)?;
        }

        header.off_name = to_u32(file.stream_position()? - start, "name offset")?;
        Self::write_name(file, model.name())?;

        let end = file.stream_position()?;
        header.size = to_u32(end - start, "file size")?;
        file.seek(SeekFrom::Start(start))?;
        Self::write_header(file, &header)?;
        file.seek(SeekFrom::Start(end))?;
        file.flush()
    }

    /// Features with a non-zero weight, in ascending uid order
    fn collect_features(model: &Model) -> Vec<StoredFeature> {
        let weights = model.weights();
        let mut uids: Vec<u32> = weights
            .raw()
            .keys()
            .chain(weights.averaged().keys())
            .copied()
            .collect();
        uids.sort_unstable();
        uids.dedup();
        uids.into_iter()
            .map(|uid| StoredFeature {
                uid,
                weight: weights.raw().get(&uid),
                averaged_weight: weights.averaged().get(&uid),
            })
            .filter(|f| f.weight != 0.0 || f.averaged_weight != 0.0)
            .collect()
    }

    fn align_to_u32<W: Write + Seek>(file: &mut W, start: u64) -> io::Result<()> {
        let mut pos = file.stream_position()? - start;
        while pos % 4 != 0 {
            file.write_all(&[0])?;
            pos += 1;
        }
        Ok(())
    }

    fn write_header<W: Write>(file: &mut W, header: &Header) -> io::Result<()> {
        file.write_all(MAGIC)?;
        file.write_all(&header.size.to_le_bytes())?;
        file.write_all(MODEL_TYPE)?;
        file.write_all(&VERSION.to_le_bytes())?;
        file.write_all(&header.num_features.to_le_bytes())?;
        file.write_all(&header.num_symbols.to_le_bytes())?;
        file.write_all(&header.off_features.to_le_bytes())?;
        file.write_all(&header.off_symbol_ids.to_le_bytes())?;
        file.write_all(&header.off_symbols.to_le_bytes())?;
        file.write_all(&header.off_name.to_le_bytes())?;
        Ok(())
    }

    fn write_features<W: Write>(file: &mut W, features: &[StoredFeature]) -> io::Result<()> {
        file.write_all(b"FEAT")?;
        let num_features = to_u32(features.len() as u64, "number of features")?;
        let chunk_size = to_u32(
            12 + num_features as u64 * FEATURE_SIZE as u64,
            "feature chunk size",
        )?;
        file.write_all(&chunk_size.to_le_bytes())?;
        file.write_all(&num_features.to_le_bytes())?;
        for feature in features {
            file.write_all(&feature.uid.to_le_bytes())?;
            file.write_all(&feature.weight.to_le_bytes())?;
            file.write_all(&feature.averaged_weight.to_le_bytes())?;
        }
        Ok(())
    }

    fn write_symbol_ids<W: Write>(file: &mut W, symbols: &[(String, u32)]) -> io::Result<()> {
        file.write_all(b"SYMI")?;
        let num_symbols = to_u32(symbols.len() as u64, "number of symbols")?;
        let chunk_size = to_u32(12 + num_symbols as u64 * 4, "symbol chunk size")?;
        file.write_all(&chunk_size.to_le_bytes())?;
        file.write_all(&num_symbols.to_le_bytes())?;
        for (_, id) in symbols {
            file.write_all(&id.to_le_bytes())?;
        }
        Ok(())
    }

    fn write_cqdb<W: Write + Seek>(file: &mut W, symbols: &[(String, u32)]) -> io::Result<()> {
        let mut writer = CQDBWriter::new(file)?;
        for (symbol, id) in symbols {
            writer.put(symbol.as_str(), *id)?;
        }
        // the database is written out when the writer is dropped
        Ok(())
    }

    fn write_name<W: Write>(file: &mut W, name: &str) -> io::Result<()> {
        file.write_all(b"NAME")?;
        let len = to_u32(name.len() as u64, "model name length")?;
        let chunk_size = to_u32(12 + len as u64, "name chunk size")?;
        file.write_all(&chunk_size.to_le_bytes())?;
        file.write_all(&len.to_le_bytes())?;
        file.write_all(name.as_bytes())?;
        Ok(())
    }
}

#[derive(Debug, Default)]
struct Header {
    size: u32,
    num_features: u32,
    num_symbols: u32,
    off_features: u32,
    off_symbol_ids: u32,
    off_symbols: u32,
    off_name: u32,
}
