//! On-disk form of an [`InvertedIndex`].
//!
//! Two encodings share one versioned envelope:
//!
//! - binary: `b"DSIX"`, format version as little-endian `u32`, then the
//!   bincode payload (fixed-width integers, trailing bytes rejected);
//! - JSON: `{"format": "docsearch-index", "version": N, "index": {...}}`,
//!   pretty-printed so rebuilt artifacts diff cleanly.
//!
//! Both store only terms, postings, documents and tokenizer settings. Terms
//! are sorted and postings are ordered by document, so the same corpus always
//! serializes to the same bytes.

use crate::error::IndexFormatError;
use crate::index::{IndexParts, InvertedIndex};
use bincode::Options;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const MAGIC: &[u8; 4] = b"DSIX";
pub const FORMAT_VERSION: u32 = 1;
pub const JSON_FORMAT_TAG: &str = "docsearch-index";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Encoding {
    #[default]
    Binary,
    Json,
}

impl FromStr for Encoding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "binary" | "bin" => Ok(Self::Binary),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown encoding {other:?} (expected binary or json)")),
        }
    }
}

/// Informational sidecar written next to the index.
#[derive(Debug, Serialize, Deserialize)]
pub struct MetaFile {
    pub num_docs: u32,
    pub num_terms: u32,
    pub created_at: String,
    pub version: u32,
    pub encoding: Encoding,
}

#[derive(Debug, Clone)]
pub struct IndexPaths {
    pub root: PathBuf,
}

impl IndexPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }
    pub fn index_file(&self, encoding: Encoding) -> PathBuf {
        match encoding {
            Encoding::Binary => self.root.join("index.bin"),
            Encoding::Json => self.root.join("index.json"),
        }
    }
    fn meta(&self) -> PathBuf { self.root.join("meta.json") }
}

#[derive(Serialize)]
struct JsonEnvelope<'a, T> {
    format: &'a str,
    version: u32,
    index: T,
}

#[derive(Deserialize)]
struct JsonHeader {
    format: String,
    version: u32,
}

#[derive(Deserialize)]
struct JsonBody {
    index: IndexParts,
}

fn bincode_options() -> impl Options {
    bincode::DefaultOptions::new().with_fixint_encoding().with_little_endian()
}

pub fn serialize(index: &InvertedIndex, encoding: Encoding) -> Result<Vec<u8>, IndexFormatError> {
    let parts = index.as_parts();
    match encoding {
        Encoding::Binary => {
            let payload = bincode_options().serialize(&parts).map_err(|e| IndexFormatError::Corrupt(e.to_string()))?;
            let mut out = Vec::with_capacity(8 + payload.len());
            out.extend_from_slice(MAGIC);
            out.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
            out.extend_from_slice(&payload);
            Ok(out)
        }
        Encoding::Json => {
            let envelope = JsonEnvelope { format: JSON_FORMAT_TAG, version: FORMAT_VERSION, index: parts };
            let mut out = serde_json::to_vec_pretty(&envelope).map_err(|e| IndexFormatError::Corrupt(e.to_string()))?;
            out.push(b'\n');
            Ok(out)
        }
    }
}

/// Decode either encoding. The index is validated before it is returned.
pub fn deserialize(bytes: &[u8]) -> Result<InvertedIndex, IndexFormatError> {
    let parts = match sniff(bytes)? {
        Encoding::Binary => {
            let version = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
            check_version(version)?;
            let payload = &bytes[8..];
            bincode_options()
                .with_limit(payload.len() as u64)
                .deserialize::<IndexParts>(payload)
                .map_err(|e| IndexFormatError::Corrupt(e.to_string()))?
        }
        Encoding::Json => {
            let header: JsonHeader = serde_json::from_slice(bytes).map_err(|e| IndexFormatError::Corrupt(e.to_string()))?;
            if header.format != JSON_FORMAT_TAG {
                return Err(IndexFormatError::BadMagic);
            }
            check_version(header.version)?;
            let body: JsonBody = serde_json::from_slice(bytes).map_err(|e| IndexFormatError::Corrupt(e.to_string()))?;
            body.index
        }
    };
    InvertedIndex::from_parts(parts)
}

fn sniff(bytes: &[u8]) -> Result<Encoding, IndexFormatError> {
    if bytes.len() >= 8 && &bytes[..4] == MAGIC {
        return Ok(Encoding::Binary);
    }
    match bytes.iter().find(|b| !b.is_ascii_whitespace()) {
        Some(b'{') => Ok(Encoding::Json),
        _ => Err(IndexFormatError::BadMagic),
    }
}

fn check_version(found: u32) -> Result<(), IndexFormatError> {
    if found != FORMAT_VERSION {
        return Err(IndexFormatError::UnsupportedVersion { found, expected: FORMAT_VERSION });
    }
    Ok(())
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> IndexFormatError + '_ {
    move |source| IndexFormatError::Io { path: path.to_path_buf(), source }
}

/// Write to a sibling temp file, then rename into place, so readers see
/// either the old file or the complete new one.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), IndexFormatError> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).map_err(io_err(dir))?;
    }
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, bytes).map_err(io_err(&tmp))?;
    fs::rename(&tmp, path).map_err(io_err(path))
}

/// Persist `index` under `paths` and return the file written.
pub fn save_index(paths: &IndexPaths, index: &InvertedIndex, encoding: Encoding) -> Result<PathBuf, IndexFormatError> {
    let path = paths.index_file(encoding);
    write_atomic(&path, &serialize(index, encoding)?)?;
    // Only one encoding may be live in a directory.
    let other = paths.index_file(match encoding {
        Encoding::Binary => Encoding::Json,
        Encoding::Json => Encoding::Binary,
    });
    if other.exists() {
        fs::remove_file(&other).map_err(io_err(&other))?;
    }
    tracing::info!(path = %path.display(), ?encoding, num_docs = index.num_docs(), "index saved");
    Ok(path)
}

pub fn load_index(paths: &IndexPaths) -> Result<InvertedIndex, IndexFormatError> {
    let path = [Encoding::Binary, Encoding::Json]
        .into_iter()
        .map(|e| paths.index_file(e))
        .find(|p| p.is_file())
        .ok_or_else(|| IndexFormatError::Missing(paths.root.clone()))?;
    let bytes = fs::read(&path).map_err(io_err(&path))?;
    let index = deserialize(&bytes)?;
    tracing::info!(path = %path.display(), num_docs = index.num_docs(), num_terms = index.num_terms(), "index loaded");
    Ok(index)
}

pub fn save_meta(paths: &IndexPaths, meta: &MetaFile) -> Result<(), IndexFormatError> {
    let json = serde_json::to_string_pretty(meta).map_err(|e| IndexFormatError::Corrupt(e.to_string()))?;
    write_atomic(&paths.meta(), json.as_bytes())
}

pub fn load_meta(paths: &IndexPaths) -> Result<MetaFile, IndexFormatError> {
    let path = paths.meta();
    let raw = fs::read_to_string(&path).map_err(io_err(&path))?;
    serde_json::from_str(&raw).map_err(|e| IndexFormatError::Corrupt(e.to_string()))
}
