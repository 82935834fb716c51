use std::{
    fmt,
    io::{self, Write},
};

use bstr::ByteSlice;
use cqdb::CQDB;

use crate::error::{Error, Result};
use crate::feature_vector::FeatureVector;
use crate::model::Model;
use crate::model_writer::StoredFeature;
use crate::symbols::{SymbolTable, Symbols};

pub(crate) const MAGIC: &[u8; 4] = b"lRRK";
pub(crate) const MODEL_TYPE: &[u8; 4] = b"PRCP";
pub(crate) const VERSION: u32 = 100;
pub(crate) const HEADER_SIZE: usize = 40;
pub(crate) const FEATURE_SIZE: usize = 20;
const CHUNK_SIZE: usize = 12;

#[inline]
fn unpack_u32(buf: &[u8]) -> io::Result<u32> {
    if buf.len() < 4 {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "not enough data for unpacking u32",
        ));
    }
    Ok(u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]))
}

#[inline]
fn unpack_f64(buf: &[u8]) -> io::Result<f64> {
    if buf.len() < 8 {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "not enough data for unpacking f64",
        ));
    }
    Ok(f64::from_le_bytes([
        buf[0], buf[1], buf[2], buf[3], buf[4], buf[5], buf[6], buf[7],
    ]))
}

#[derive(Debug, Clone)]
struct Header {
    magic: [u8; 4],
    size: u32,
    r#type: [u8; 4],
    version: u32,
    num_features: u32,
    num_symbols: u32,
    off_features: u32,
    off_symbol_ids: u32,
    off_symbols: u32,
    off_name: u32,
}

/// A model file in memory
///
/// Written by [`ModelWriter`](crate::ModelWriter). Turn it back into a
/// trainable model with [`Model::from_model_file`].
#[derive(Clone)]
pub struct ModelFile<'a> {
    buffer: &'a [u8],
    header: Header,
    symbols: Option<CQDB<'a>>,
}

impl<'a> fmt::Debug for ModelFile<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelFile")
            .field("header", &self.header)
            .field("symbols", &self.symbols)
            .finish()
    }
}

impl<'a> ModelFile<'a> {
    pub fn new(buf: &'a [u8]) -> Result<Self> {
        if buf.len() < HEADER_SIZE {
            return Err(Error::InvalidModel("file too short".to_string()));
        }
        let mut magic = [0u8; 4];
        magic.copy_from_slice(&buf[0..4]);
        if &magic != MAGIC {
            return Err(Error::InvalidModel("magic mismatch".to_string()));
        }
        let mut r#type = [0u8; 4];
        r#type.copy_from_slice(&buf[8..12]);
        let mut index = 4;
        let size = unpack_u32(&buf[index..])?;
        index += 8;
        let version = unpack_u32(&buf[index..])?;
        index += 4;
        let num_features = unpack_u32(&buf[index..])?;
        index += 4;
        let num_symbols = unpack_u32(&buf[index..])?;
        index += 4;
        let off_features = unpack_u32(&buf[index..])?;
        index += 4;
        let off_symbol_ids = unpack_u32(&buf[index..])?;
        index += 4;
        let off_symbols = unpack_u32(&buf[index..])?;
        index += 4;
        let off_name = unpack_u32(&buf[index..])?;
        let header = Header {
            magic,
            size,
            r#type,
            version,
            num_features,
            num_symbols,
            off_features,
            off_symbol_ids,
            off_symbols,
            off_name,
        };

        if version != VERSION {
            return Err(Error::InvalidModel(format!("unsupported version {}", version)));
        }
        if size as usize > buf.len() {
            return Err(Error::InvalidModel("truncated file".to_string()));
        }
        let buf = &buf[..size as usize];
        let chunks = [
            (off_features, b"FEAT"),
            (off_symbol_ids, b"SYMI"),
            (off_name, b"NAME"),
        ];
        for (offset, tag) in chunks {
            let offset = offset as usize;
            if offset + CHUNK_SIZE > buf.len() || &buf[offset..offset + 4] != tag {
                return Err(Error::InvalidModel(format!(
                    "missing {} chunk",
                    String::from_utf8_lossy(tag)
                )));
            }
        }
        let features_end = off_features as usize + CHUNK_SIZE + FEATURE_SIZE * num_features as usize;
        let symbol_ids_end = off_symbol_ids as usize + CHUNK_SIZE + 4 * num_symbols as usize;
        if features_end > buf.len() || symbol_ids_end > buf.len() {
            return Err(Error::InvalidModel("truncated chunk".to_string()));
        }

        let symbols = if off_symbols == 0 {
            None
        } else {
            let start = off_symbols as usize;
            if start >= buf.len() {
                return Err(Error::InvalidModel("symbol offset out of range".to_string()));
            }
            Some(CQDB::new(&buf[start..])?)
        };
        Ok(Self {
            buffer: buf,
            header,
            symbols,
        })
    }

    /// Number of stored features
    pub fn num_features(&self) -> u32 {
        self.header.num_features
    }

    /// Number of stored symbols
    pub fn num_symbols(&self) -> u32 {
        self.header.num_symbols
    }

    /// Name of the stored model
    pub fn name(&self) -> Result<&'a str> {
        let index = self.header.off_name as usize + 8;
        let len = unpack_u32(&self.buffer[index..])? as usize;
        let start = index + 4;
        self.buffer
            .get(start..start + len)
            .and_then(|name| name.to_str().ok())
            .ok_or_else(|| Error::InvalidModel("invalid model name".to_string()))
    }

    /// The `i`-th stored feature
    pub fn feature(&self, i: u32) -> io::Result<StoredFeature> {
        let mut index = self.header.off_features as usize + CHUNK_SIZE;
        index += FEATURE_SIZE * i as usize;
        let uid = unpack_u32(&self.buffer[index..])?;
        index += 4;
        let weight = unpack_f64(&self.buffer[index..])?;
        index += 8;
        let averaged_weight = unpack_f64(&self.buffer[index..])?;
        Ok(StoredFeature {
            uid,
            weight,
            averaged_weight,
        })
    }

    /// Id of the `i`-th stored symbol, in ascending id order
    pub fn symbol_id(&self, i: u32) -> io::Result<u32> {
        let index = self.header.off_symbol_ids as usize + CHUNK_SIZE + 4 * i as usize;
        unpack_u32(&self.buffer[index..])
    }

    /// Convert a symbol id to its symbol string
    pub fn to_symbol(&self, id: u32) -> Option<&str> {
        self.symbols
            .as_ref()?
            .to_str(id)
            .and_then(|s| s.to_str().ok())
    }

    /// Convert a symbol string to its id
    pub fn to_symbol_id(&self, symbol: &str) -> Option<u32> {
        self.symbols.as_ref()?.to_id(symbol)
    }

    /// Print the model in human-readable format
    pub fn dump<W: Write>(&self, w: &mut W) -> io::Result<()> {
        writeln!(w, "FILEHEADER = {{")?;
        let header = &self.header;
        writeln!(w, "  magic: {}", header.magic.as_bstr())?;
        writeln!(w, "  size: {}", header.size)?;
        writeln!(w, "  type: {}", header.r#type.as_bstr())?;
        writeln!(w, "  version: {}", header.version)?;
        writeln!(w, "  num_features: {}", header.num_features)?;
        writeln!(w, "  num_symbols: {}", header.num_symbols)?;
        writeln!(w, "  off_features: {:#X}", header.off_features)?;
        writeln!(w, "  off_symbol_ids: {:#X}", header.off_symbol_ids)?;
        writeln!(w, "  off_symbols: {:#X}", header.off_symbols)?;
        writeln!(w, "  off_name: {:#X}", header.off_name)?;
        writeln!(w, "}}\n")?;
        writeln!(
            w,
            "NAME = {}\n",
            self.name().map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?
        )?;
        writeln!(w, "SYMBOLS = {{")?;
        for i in 0..header.num_symbols {
            let id = self.symbol_id(i)?;
            writeln!(w, "  {:>5}: {}", id, self.to_symbol(id).unwrap_or(""))?;
        }
        writeln!(w, "}}\n")?;
        writeln!(w, "FEATURES = {{")?;
        for i in 0..header.num_features {
            let feature = self.feature(i)?;
            match self.to_symbol(feature.uid) {
                Some(symbol) => writeln!(
                    w,
                    "  {:>5} ({}): {:.6} (averaged {:.6})",
                    feature.uid, symbol, feature.weight, feature.averaged_weight
                )?,
                None => writeln!(
                    w,
                    "  {:>5}: {:.6} (averaged {:.6})",
                    feature.uid, feature.weight, feature.averaged_weight
                )?,
            }
        }
        writeln!(w, "}}\n")?;
        Ok(())
    }
}

impl Model {
    /// Restore a model from a model file
    ///
    /// The model gets a fresh local symbol table and default policies.
    pub fn from_model_file(file: &ModelFile<'_>) -> Result<Model> {
        let mut table = SymbolTable::new();
        for i in 0..file.num_symbols() {
            let id = file.symbol_id(i)?;
            let symbol = file
                .to_symbol(id)
                .ok_or_else(|| Error::InvalidModel(format!("no symbol for id {}", id)))?;
            table.set_index(symbol, id);
        }

        let mut raw = FeatureVector::new();
        let mut averaged = FeatureVector::new();
        for i in 0..file.num_features() {
            let feature = file.feature(i)?;
            if feature.weight != 0.0 {
                raw.insert(feature.uid, feature.weight);
            }
            if feature.averaged_weight != 0.0 {
                averaged.insert(feature.uid, feature.averaged_weight);
            }
        }

        let mut model = Model::with_symbols(file.name()?, Symbols::from(table));
        model.weights_mut().set(raw, averaged);
        Ok(model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model_writer::ModelWriter;
    use std::io::Cursor;

    fn trained_model() -> Model {
        let mut model = Model::new("toy");
        model.symbols_mut().set_index("w=a", 0);
        model.symbols_mut().set_index("w=b", 1);
        let mut fv = model.candidate_features(
            &crate::Candidate::new(0.0)
                .with_symbolic_feature("w=a", 1.0)
                .with_symbolic_feature("w=b", -1.0),
            true,
        );
        fv.insert(100, 0.5);
        model.update_weights(&fv, 2.0);
        model
    }

    fn write(model: &Model) -> Vec<u8> {
        let mut cursor = Cursor::new(Vec::new());
        ModelWriter::write_to(&mut cursor, model).unwrap();
        cursor.into_inner()
    }

    #[test]
    fn test_model_file_header() {
        let buf = write(&trained_model());
        let file = ModelFile::new(&buf).unwrap();
        assert_eq!(file.num_features(), 3);
        assert_eq!(file.num_symbols(), 2);
        assert_eq!(file.name().unwrap(), "toy");
        assert_eq!(file.to_symbol_id("w=b"), Some(1));
        assert_eq!(file.to_symbol(0), Some("w=a"));
        let _debug = format!("{:?}", file);
    }

    #[test]
    fn test_invalid_model() {
        assert!(ModelFile::new(b"").is_err());

        let mut buf = write(&trained_model());
        buf[0] = b'L';
        assert!(matches!(ModelFile::new(&buf), Err(Error::InvalidModel(_))));

        let buf = write(&trained_model());
        assert!(ModelFile::new(&buf[..HEADER_SIZE + 4]).is_err());
    }

    #[test]
    fn test_model_without_symbols() {
        let mut model = Model::new("numeric");
        model.update_weights(&vec![(3, 1.5)].into_iter().collect(), 1.0);
        let buf = write(&model);
        let file = ModelFile::new(&buf).unwrap();
        assert_eq!(file.num_symbols(), 0);
        assert_eq!(file.to_symbol(3), None);
        let restored = Model::from_model_file(&file).unwrap();
        assert_eq!(restored.weights().raw().get(&3), 1.5);
    }

    #[test]
    fn test_model_dump() {
        let buf = write(&trained_model());
        let file = ModelFile::new(&buf).unwrap();
        let mut out = Vec::new();
        file.dump(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("FILEHEADER = {\n  magic: lRRK\n"));
        assert!(text.contains("NAME = toy"));
        assert!(text.contains("      0: w=a"));
        assert!(text.contains("    100: 1.000000 (averaged 0.000000)"));
    }
}
