//! src/domain/file.rs
//!
//! Content-addressed chunk storage: `File` and `FileStore`. Grounded in
//! `original_source/types/gossipers.go`'s `File` struct, `AddFile`,
//! `AddStubFile`, `Reconstruct`, and `ReplyDataRequest`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::error::Result;

pub const CHUNK_SIZE: usize = 8192;
pub const HASH_SIZE: usize = 32;

/// A file known to this node, either fully uploaded locally or in the
/// process of being downloaded from a peer.
#[derive(Debug, Clone)]
pub struct File {
    pub name: String,
    pub size: i64,
    pub meta_hash: [u8; HASH_SIZE],
    pub meta_file: Option<Vec<u8>>,
    pub chunks: HashMap<[u8; HASH_SIZE], Option<Vec<u8>>>,
    pub num_chunks: u32,
    /// `-1` before the metafile is known; otherwise chunks received so far.
    pub status: i64,
}

impl File {
    /// Number of 32-byte hash slices stored in the metafile.
    pub fn chunk_hashes(&self) -> Vec<[u8; HASH_SIZE]> {
        let Some(meta) = &self.meta_file else {
            return Vec::new();
        };
        meta.chunks_exact(HASH_SIZE)
            .map(|slice| slice.try_into().unwrap())
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.status >= 0 && self.status as u32 == self.num_chunks && self.num_chunks > 0
    }
}

/// Owns every `File` this node knows about, keyed by hex(metaHash).
#[derive(Debug, Default)]
pub struct FileStore {
    files: HashMap<String, File>,
    shared_dir: PathBuf,
    downloads_dir: PathBuf,
}

pub enum Lookup<'a> {
    MetaFile(&'a [u8]),
    Chunk(&'a [u8]),
    Unknown,
}

impl FileStore {
    pub fn new(shared_dir: impl Into<PathBuf>, downloads_dir: impl Into<PathBuf>) -> Self {
        Self {
            files: HashMap::new(),
            shared_dir: shared_dir.into(),
            downloads_dir: downloads_dir.into(),
        }
    }

    /// Reads `<shared_dir>/<name>`, splits into fixed-size chunks, hashes
    /// each with SHA-256, concatenates the hashes into the metafile, and
    /// hashes that into the metaHash. The resulting `File` is immediately
    /// complete.
    pub fn upload_local(&mut self, name: &str) -> Result<[u8; HASH_SIZE]> {
        let path = self.shared_dir.join(name);
        let bytes = std::fs::read(&path)?;

        let mut chunks: HashMap<[u8; HASH_SIZE], Option<Vec<u8>>> = HashMap::new();
        let mut meta_file = Vec::with_capacity(HASH_SIZE * (bytes.len() / CHUNK_SIZE + 1));
        for chunk in bytes.chunks(CHUNK_SIZE) {
            let hash: [u8; HASH_SIZE] = Sha256::digest(chunk).into();
            meta_file.extend_from_slice(&hash);
            chunks.insert(hash, Some(chunk.to_vec()));
        }
        let meta_hash: [u8; HASH_SIZE] = Sha256::digest(&meta_file).into();
        let num_chunks = chunks.len() as u32;

        let file = File {
            name: name.to_string(),
            size: bytes.len() as i64,
            meta_hash,
            meta_file: Some(meta_file),
            chunks,
            num_chunks,
            status: num_chunks as i64,
        };
        self.files.insert(hex::encode(meta_hash), file);
        Ok(meta_hash)
    }

    /// Creates a stub `File` for a download in progress: metafile unknown,
    /// no chunks yet.
    pub fn add_stub(&mut self, name: &str, meta_hash: [u8; HASH_SIZE]) {
        self.files.insert(
            hex::encode(meta_hash),
            File {
                name: name.to_string(),
                size: -1,
                meta_hash,
                meta_file: None,
                chunks: HashMap::new(),
                num_chunks: 0,
                status: -1,
            },
        );
    }

    pub fn get(&self, meta_hash_hex: &str) -> Option<&File> {
        self.files.get(meta_hash_hex)
    }

    pub fn get_mut(&mut self, meta_hash_hex: &str) -> Option<&mut File> {
        self.files.get_mut(meta_hash_hex)
    }

    /// Answers a `DataRequest`: if `hash` names a known file, the metafile
    /// is the payload; otherwise scan for a chunk with that hash.
    pub fn lookup(&self, hash: &[u8; HASH_SIZE]) -> Lookup<'_> {
        let hex_hash = hex::encode(hash);
        if let Some(file) = self.files.get(&hex_hash) {
            if let Some(meta) = &file.meta_file {
                return Lookup::MetaFile(meta);
            }
        }
        for file in self.files.values() {
            if let Some(Some(chunk)) = file.chunks.get(hash) {
                return Lookup::Chunk(chunk);
            }
        }
        Lookup::Unknown
    }

    /// Finds the file with an empty stub for `hash`, if any — used when a
    /// chunk reply arrives and we need to know which in-flight download it
    /// belongs to.
    pub fn find_file_awaiting_chunk(&self, hash: &[u8; HASH_SIZE]) -> Option<String> {
        self.files
            .iter()
            .find(|(_, f)| matches!(f.chunks.get(hash), Some(None)))
            .map(|(key, _)| key.clone())
    }

    /// Writes every chunk of a complete file to `<downloads_dir>/<name>`,
    /// in metafile order.
    pub fn reconstruct(&self, meta_hash_hex: &str) -> Result<PathBuf> {
        let file = self
            .files
            .get(meta_hash_hex)
            .expect("reconstruct called on unknown file");
        std::fs::create_dir_all(&self.downloads_dir)?;
        let out_path = self.downloads_dir.join(&file.name);
        let mut bytes = Vec::new();
        for hash in file.chunk_hashes() {
            if let Some(Some(chunk)) = file.chunks.get(&hash) {
                bytes.extend_from_slice(chunk);
            }
        }
        std::fs::write(&out_path, &bytes)?;
        Ok(out_path)
    }

    pub fn downloads_dir(&self) -> &Path {
        &self.downloads_dir
    }

    pub fn snapshot(&self) -> Vec<(String, String)> {
        self.files
            .iter()
            .map(|(hash, f)| (f.name.clone(), hash.clone()))
            .collect()
    }
}
