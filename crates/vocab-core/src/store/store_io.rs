use std::fs::{self, File};
use std::path::Path;

use memmap2::Mmap;
use serde::{Deserialize, Serialize};

use crate::ngram_context::WordInfo;

use super::{DictionaryStore, Header, NgramEntry, StoreError, UnigramEntry};

const MAGIC: &[u8; 4] = b"VCDX";
const VERSION: u8 = 1;
/// magic + version + reserved(3) + header_len + body_len + crc32 = 20
const HEADER_SIZE: usize = 4 + 1 + 3 + 4 + 4 + 4;

/// Flat serialization format for bincode.
#[derive(Serialize, Deserialize)]
struct StoreBody {
    unigrams: Vec<UnigramRecord>,
    ngrams: Vec<NgramRecord>,
}

#[derive(Serialize, Deserialize)]
struct UnigramRecord {
    word: String,
    entry: UnigramEntry,
}

#[derive(Serialize, Deserialize)]
struct NgramRecord {
    context: Vec<WordInfo>,
    word: String,
    entry: NgramEntry,
}

fn section_len(len: usize, name: &'static str) -> Result<u32, StoreError> {
    len.try_into().map_err(|_| StoreError::TooLarge(name))
}

impl DictionaryStore {
    /// Serialize to bytes (VCDX format). Output is deterministic: records are
    /// sorted by key.
    pub fn to_bytes(&self) -> Result<Vec<u8>, StoreError> {
        let header = bincode::serialize(&self.header).map_err(StoreError::Serialize)?;
        let body = bincode::serialize(&self.to_body()).map_err(StoreError::Serialize)?;

        let header_len = section_len(header.len(), "header")?;
        let body_len = section_len(body.len(), "body")?;
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&header);
        hasher.update(&body);
        let crc = hasher.finalize();

        let mut buf = Vec::with_capacity(HEADER_SIZE + header.len() + body.len());
        buf.extend_from_slice(MAGIC);
        buf.push(VERSION);
        buf.extend_from_slice(&[0u8; 3]); // reserved
        buf.extend_from_slice(&header_len.to_le_bytes());
        buf.extend_from_slice(&body_len.to_le_bytes());
        buf.extend_from_slice(&crc.to_le_bytes());
        buf.extend_from_slice(&header);
        buf.extend_from_slice(&body);
        Ok(buf)
    }

    /// Deserialize from bytes (VCDX format).
    pub fn from_bytes(data: &[u8]) -> Result<Self, StoreError> {
        if data.len() < 5 {
            return Err(StoreError::InvalidHeader);
        }
        if &data[..4] != MAGIC {
            return Err(StoreError::InvalidMagic);
        }
        if data[4] != VERSION {
            return Err(StoreError::UnsupportedVersion(data[4]));
        }
        if data.len() < HEADER_SIZE {
            return Err(StoreError::InvalidHeader);
        }

        let header_len = read_u32(data, 8) as usize;
        let body_len = read_u32(data, 12) as usize;
        let expected_crc = read_u32(data, 16);

        let header_start = HEADER_SIZE;
        let body_start = header_start + header_len;
        let end = body_start + body_len;
        if data.len() < end {
            return Err(StoreError::InvalidHeader);
        }

        let actual_crc = crc32fast::hash(&data[header_start..end]);
        if actual_crc != expected_crc {
            return Err(StoreError::ChecksumMismatch {
                expected: expected_crc,
                actual: actual_crc,
            });
        }

        let header: Header = bincode::deserialize(&data[header_start..body_start])
            .map_err(StoreError::Deserialize)?;
        let body: StoreBody =
            bincode::deserialize(&data[body_start..end]).map_err(StoreError::Deserialize)?;

        Ok(Self::from_body(header, body))
    }

    /// Open a store file. The mapping is dropped once the contents are
    /// decoded; a missing file surfaces as `StoreError::Io` with
    /// `NotFound` (see `StoreError::is_not_found`).
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let file = File::open(path)?;
        // SAFETY: The file is opened read-only and the mapping is immutable.
        // Only the owning dictionary writes this path, and it replaces the
        // file by rename instead of writing in place.
        let mmap = unsafe { Mmap::map(&file)? };
        Self::from_bytes(&mmap)
    }

    /// Atomic write: write to .tmp then rename.
    pub fn save(&self, path: &Path) -> Result<(), StoreError> {
        let bytes = self.to_bytes()?;
        let tmp = path.with_extension("tmp");
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&tmp, &bytes)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }

    fn to_body(&self) -> StoreBody {
        let mut unigrams: Vec<UnigramRecord> = self
            .unigrams
            .iter()
            .map(|(word, entry)| UnigramRecord {
                word: word.clone(),
                entry: *entry,
            })
            .collect();
        unigrams.sort_by(|a, b| a.word.cmp(&b.word));

        let mut ngrams = Vec::new();
        for (context, inner) in &self.ngrams {
            for (word, entry) in inner {
                ngrams.push(NgramRecord {
                    context: context.clone(),
                    word: word.clone(),
                    entry: *entry,
                });
            }
        }
        ngrams.sort_by(|a, b| a.context.cmp(&b.context).then_with(|| a.word.cmp(&b.word)));

        StoreBody { unigrams, ngrams }
    }

    fn from_body(header: Header, body: StoreBody) -> Self {
        let mut store = Self::new(header);
        for rec in body.unigrams {
            store.insert_unigram(&rec.word, rec.entry);
        }
        for rec in body.ngrams {
            store.insert_ngram(&rec.context, &rec.word, rec.entry);
        }
        store
    }
}

fn read_u32(data: &[u8], pos: usize) -> u32 {
    u32::from_le_bytes([data[pos], data[pos + 1], data[pos + 2], data[pos + 3]])
}
