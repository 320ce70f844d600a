// 📂 Record Source - JSON file → Vec<Transaction>
// Thin I/O layer: read, decode, hand the records to the query layer.

use crate::transaction::Transaction;
use log::{debug, info};
use sha2::{Digest, Sha256};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};
use thiserror::Error;

// ============================================================================
// ERRORS
// ============================================================================

/// LoadError - why the record set could not be produced
///
/// Callers must be able to tell "no qualifying records" apart from
/// "could not read the records", so every query surfaces this instead of
/// falling back to an empty result.
#[derive(Debug, Error)]
pub enum LoadError {
    /// File missing, or the byte stream could not be read
    #[error("transactions source unavailable at {origin}: {source}")]
    SourceUnavailable {
        origin: String,
        #[source]
        source: io::Error,
    },

    /// Content is not a JSON array of transaction objects
    #[error("malformed transaction record in {origin}: {source}")]
    MalformedRecord {
        origin: String,
        #[source]
        source: serde_json::Error,
    },
}

impl LoadError {
    /// Short machine-friendly kind, used in API error payloads
    pub fn kind(&self) -> &'static str {
        match self {
            LoadError::SourceUnavailable { .. } => "SourceUnavailable",
            LoadError::MalformedRecord { .. } => "MalformedRecord",
        }
    }
}

// ============================================================================
// SOURCE TRAIT
// ============================================================================

/// RecordSource - supplies the full, ordered record set on every call
pub trait RecordSource: Send + Sync {
    /// Load every transaction, in source order
    fn load(&self) -> Result<Vec<Transaction>, LoadError>;

    /// Human-readable description for logs and reports
    fn describe(&self) -> String;

    /// SHA-256 of the raw source bytes, for sources that have any
    fn digest(&self) -> Result<Option<String>, LoadError> {
        Ok(None)
    }
}

impl<S: RecordSource + ?Sized> RecordSource for Box<S> {
    fn load(&self) -> Result<Vec<Transaction>, LoadError> {
        (**self).load()
    }

    fn describe(&self) -> String {
        (**self).describe()
    }

    fn digest(&self) -> Result<Option<String>, LoadError> {
        (**self).digest()
    }
}

// ============================================================================
// DECODING
// ============================================================================

/// Decode a JSON array of transactions from a string
pub fn parse_transactions(json: &str) -> Result<Vec<Transaction>, LoadError> {
    parse_transactions_slice(json.as_bytes(), "<inline>")
}

/// Decode a JSON array of transactions from raw bytes
pub fn parse_transactions_slice(bytes: &[u8], origin: &str) -> Result<Vec<Transaction>, LoadError> {
    serde_json::from_slice(bytes).map_err(|source| LoadError::MalformedRecord {
        origin: origin.to_string(),
        source,
    })
}

/// Decode a JSON array of transactions from any byte stream
///
/// A stream that fails to read is `SourceUnavailable`; only content that
/// was read but does not decode is `MalformedRecord`.
pub fn parse_transactions_reader<R: Read>(reader: R, origin: &str) -> Result<Vec<Transaction>, LoadError> {
    serde_json::from_reader(reader).map_err(|source| {
        if source.is_io() {
            LoadError::SourceUnavailable {
                origin: origin.to_string(),
                source: io::Error::from(source),
            }
        } else {
            LoadError::MalformedRecord {
                origin: origin.to_string(),
                source,
            }
        }
    })
}

// ============================================================================
// DIGESTS
// ============================================================================

/// SHA-256 of raw source bytes, lowercase hex
pub fn source_digest(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// SHA-256 fingerprint of a decoded record set (order-sensitive)
///
/// Every field is length-prefixed or fixed-width, so no choice of names
/// can make two different record sets hash alike.
/// Two loads of the same file produce the same digest.
pub fn records_digest(records: &[Transaction]) -> String {
    let mut hasher = Sha256::new();
    hasher.update((records.len() as u64).to_le_bytes());
    for tx in records {
        hasher.update(tx.mtn.to_le_bytes());
        hasher.update(tx.amount.to_bits().to_le_bytes());
        update_str(&mut hasher, &tx.sender_full_name);
        hasher.update(tx.sender_age.to_le_bytes());
        update_str(&mut hasher, &tx.beneficiary_full_name);
        hasher.update(tx.beneficiary_age.to_le_bytes());
        match tx.issue_id {
            Some(id) => {
                hasher.update([1u8]);
                hasher.update(id.to_le_bytes());
            }
            None => hasher.update([0u8]),
        }
        hasher.update([u8::from(tx.issue_solved)]);
        match &tx.issue_message {
            Some(message) => {
                hasher.update([1u8]);
                update_str(&mut hasher, message);
            }
            None => hasher.update([0u8]),
        }
    }
    format!("{:x}", hasher.finalize())
}

fn update_str(hasher: &mut Sha256, value: &str) {
    hasher.update((value.len() as u64).to_le_bytes());
    hasher.update(value.as_bytes());
}

// ============================================================================
// JSON FILE SOURCE
// ============================================================================

/// JsonFileSource - re-reads and re-parses the file on every load
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        JsonFileSource {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_bytes(&self) -> Result<Vec<u8>, LoadError> {
        debug!("Reading transactions from {:?}", self.path);

        fs::read(&self.path).map_err(|source| LoadError::SourceUnavailable {
            origin: self.path.display().to_string(),
            source,
        })
    }
}

impl RecordSource for JsonFileSource {
    fn load(&self) -> Result<Vec<Transaction>, LoadError> {
        let bytes = self.read_bytes()?;

        let transactions = parse_transactions_slice(&bytes, &self.path.display().to_string())?;
        info!("Loaded {} transactions from {:?}", transactions.len(), self.path);

        Ok(transactions)
    }

    fn describe(&self) -> String {
        format!("json:{}", self.path.display())
    }

    /// Re-reads the file; matches what the next `load` would see
    fn digest(&self) -> Result<Option<String>, LoadError> {
        Ok(Some(source_digest(&self.read_bytes()?)))
    }
}

// ============================================================================
// IN-MEMORY SOURCE
// ============================================================================

/// InMemorySource - records already decoded (embedding, tests)
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    records: Vec<Transaction>,
}

impl InMemorySource {
    pub fn new(records: Vec<Transaction>) -> Self {
        InMemorySource { records }
    }
}

impl RecordSource for InMemorySource {
    fn load(&self) -> Result<Vec<Transaction>, LoadError> {
        Ok(self.records.clone())
    }

    fn describe(&self) -> String {
        format!("memory:{} records", self.records.len())
    }
}

// ============================================================================
// CACHED SOURCE
// ============================================================================

/// CachedSource - loads the inner source once, then serves the same records
///
/// The cached set is read-only once populated. Failed loads are not cached.
/// Call `invalidate()` to force the next load back to the inner source.
pub struct CachedSource<S: RecordSource> {
    inner: S,
    cache: RwLock<Option<Vec<Transaction>>>,
}

impl<S: RecordSource> CachedSource<S> {
    pub fn new(inner: S) -> Self {
        CachedSource {
            inner,
            cache: RwLock::new(None),
        }
    }

    /// Drop the cached records
    pub fn invalidate(&self) {
        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        if cache.take().is_some() {
            debug!("Cache invalidated for {}", self.inner.describe());
        }
    }

    pub fn is_populated(&self) -> bool {
        self.cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

impl<S: RecordSource> RecordSource for CachedSource<S> {
    fn load(&self) -> Result<Vec<Transaction>, LoadError> {
        if let Some(records) = self
            .cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
        {
            return Ok(records.clone());
        }

        let records = self.inner.load()?;

        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        // Another caller may have filled it while we were loading; first one wins
        let cached = cache.get_or_insert(records);
        Ok(cached.clone())
    }

    fn describe(&self) -> String {
        format!("cached({})", self.inner.describe())
    }

    fn digest(&self) -> Result<Option<String>, LoadError> {
        self.inner.digest()
    }
}
