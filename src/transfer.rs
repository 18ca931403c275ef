//! src/transfer.rs
//!
//! `TransferEngine`: the request/reply state machine driving a file
//! download, spec.md §4.8. Grounded in
//! `examples/original_source/types/gossipers.go`'s `SendDataRequest` /
//! `ProcessDataReply`. Coordinates with `FileStore` (which owns the actual
//! bytes) but keeps its own map of in-flight requests so the retry timer
//! owned by the event loop has something to resend.

use std::collections::HashMap;
use std::path::PathBuf;

use sha2::{Digest, Sha256};

use crate::domain::{DataRequest, FileStore, HASH_SIZE, INITIAL_HOP_LIMIT};
use crate::observe;

struct InFlight {
    destination: String,
    hash: [u8; HASH_SIZE],
}

/// Tracks, by hex(hash), the requests awaiting a reply so a 5-second retry
/// timer can resend exactly the same request (spec.md §4.8, §5).
#[derive(Default)]
pub struct TransferEngine {
    in_flight: HashMap<String, InFlight>,
}

/// What the event loop should do after feeding a `DataReply` through
/// `process_reply`.
pub enum ReplyOutcome {
    /// `SHA-256(data) != hashValue`; the reply is dropped and the retry
    /// timer (if any) is left armed.
    InvalidChecksum,
    /// No in-progress download is waiting on this hash; dropped.
    UnknownTransfer,
    /// The metafile or a chunk arrived; send this request for the next
    /// piece and (re)arm a retry timer keyed by its hash.
    NextRequest(DataRequest),
    /// The final chunk arrived and the file was reconstructed to disk.
    Reconstructed { path: PathBuf, file_name: String },
}

impl TransferEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `hash` as in-flight (requested from `destination`) and
    /// returns the `DataRequest` to send. Used both to start a new
    /// download and to request the next chunk of one in progress.
    pub fn start(&mut self, self_name: &str, hash: [u8; HASH_SIZE], destination: String) -> DataRequest {
        let hash_hex = hex::encode(hash);
        self.in_flight.insert(
            hash_hex,
            InFlight {
                destination: destination.clone(),
                hash,
            },
        );
        DataRequest {
            origin: self_name.to_string(),
            destination,
            hop_limit: INITIAL_HOP_LIMIT,
            hash_value: hash,
        }
    }

    /// Rebuilds the exact same request for a fired retry timer.
    pub fn retry(&self, hash_hex: &str, self_name: &str) -> Option<DataRequest> {
        self.in_flight.get(hash_hex).map(|f| DataRequest {
            origin: self_name.to_string(),
            destination: f.destination.clone(),
            hop_limit: INITIAL_HOP_LIMIT,
            hash_value: f.hash,
        })
    }

    pub fn is_in_flight(&self, hash_hex: &str) -> bool {
        self.in_flight.contains_key(hash_hex)
    }

    /// Processes a `DataReply`, mutating `files` as needed, per spec.md
    /// §4.8: verify integrity, cancel the retry timer for this hash, then
    /// either advance a metafile download into its first chunk request,
    /// advance a chunk download into the next chunk request, or
    /// reconstruct the completed file.
    pub fn process_reply(
        &mut self,
        files: &mut FileStore,
        self_name: &str,
        origin: &str,
        hash_value: [u8; HASH_SIZE],
        data: &[u8],
    ) -> ReplyOutcome {
        let computed: [u8; HASH_SIZE] = Sha256::digest(data).into();
        if computed != hash_value {
            return ReplyOutcome::InvalidChecksum;
        }

        let hash_hex = hex::encode(hash_value);
        self.in_flight.remove(&hash_hex);

        let is_metafile_reply = matches!(files.get(&hash_hex), Some(f) if f.status == -1);
        if is_metafile_reply {
            return self.apply_metafile_reply(files, self_name, origin, &hash_hex, data);
        }

        let Some(key) = files.find_file_awaiting_chunk(&hash_value) else {
            return ReplyOutcome::UnknownTransfer;
        };
        self.apply_chunk_reply(files, self_name, origin, &key, hash_value, data)
    }

    fn apply_metafile_reply(
        &mut self,
        files: &mut FileStore,
        self_name: &str,
        origin: &str,
        hash_hex: &str,
        data: &[u8],
    ) -> ReplyOutcome {
        let file_name = files.get(hash_hex).unwrap().name.clone();
        let num_chunks = (data.len() / HASH_SIZE) as u32;
        {
            let file = files.get_mut(hash_hex).unwrap();
            file.meta_file = Some(data.to_vec());
            file.num_chunks = num_chunks;
            for chunk in data.chunks_exact(HASH_SIZE) {
                let hash: [u8; HASH_SIZE] = chunk.try_into().unwrap();
                file.chunks.entry(hash).or_insert(None);
            }
            file.status = 0;
        }
        observe::downloading_metafile(&file_name, origin);

        let first_hash: [u8; HASH_SIZE] = data[0..HASH_SIZE].try_into().unwrap();
        ReplyOutcome::NextRequest(self.start(self_name, first_hash, origin.to_string()))
    }

    fn apply_chunk_reply(
        &mut self,
        files: &mut FileStore,
        self_name: &str,
        origin: &str,
        key: &str,
        hash_value: [u8; HASH_SIZE],
        data: &[u8],
    ) -> ReplyOutcome {
        let (file_name, status, num_chunks, next_hash) = {
            let file = files.get_mut(key).unwrap();
            file.chunks.insert(hash_value, Some(data.to_vec()));
            file.status += 1;
            let next_hash = if (file.status as u32) < file.num_chunks {
                let offset = file.status as usize * HASH_SIZE;
                let meta = file.meta_file.as_ref().unwrap();
                Some(<[u8; HASH_SIZE]>::try_from(&meta[offset..offset + HASH_SIZE]).unwrap())
            } else {
                None
            };
            (file.name.clone(), file.status, file.num_chunks, next_hash)
        };

        observe::downloading_chunk(&file_name, status, origin);

        if status as u32 == num_chunks {
            match files.reconstruct(key) {
                Ok(path) => {
                    observe::reconstructed(&file_name);
                    ReplyOutcome::Reconstructed { path, file_name }
                }
                Err(e) => {
                    tracing::error!(error = %e, file = %file_name, "failed to reconstruct downloaded file");
                    ReplyOutcome::UnknownTransfer
                }
            }
        } else {
            let hash = next_hash.expect("non-terminal chunk reply always has a next hash");
            ReplyOutcome::NextRequest(self.start(self_name, hash, origin.to_string()))
        }
    }
}
