//! Fingerprint index contract
//!
//! The index is the only shared mutable resource in the system: a persistent
//! mapping from hash token to every `(song_id, anchor_time)` pair seen during
//! ingestion, plus a song catalog for result enrichment. The matching
//! algorithm is agnostic to the backing store; backends live in
//! `storage_backend`.

use crate::error::EngineError;
use crate::hashing::HashRecord;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

/// Unique song identifier, assigned once at ingestion and never reused.
pub type SongId = i32;

/// One stored index row under a hash token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Posting {
    pub song_id: SongId,
    pub anchor_time: i32,
}

/// Catalog entry resolved from a song id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SongMeta {
    pub display_name: String,
    pub source_path: String,
}

/// Persistent hash-token index.
///
/// Lookup results carry no ordering guarantee, and duplicate rows across
/// repeated `put` calls are acceptable (scoring tolerates duplicate votes).
/// Backends must allow concurrent readers alongside writers; all methods take
/// `&self`.
#[async_trait]
pub trait FingerprintIndex: Send + Sync {
    /// Allocate a song id and record its catalog entry.
    async fn register_song(&self, name: &str, path: &str) -> Result<SongId, EngineError>;

    /// Durable bulk insert of a song's hash records. Idempotent only at
    /// full-song granularity; partial re-ingestion is the caller's problem.
    async fn put(&self, song_id: SongId, records: &[HashRecord]) -> Result<(), EngineError>;

    /// Exact-match retrieval of every row stored under `token`.
    async fn lookup(&self, token: u64) -> Result<Vec<Posting>, EngineError>;

    /// Batched lookup. Backends with a cheaper bulk path override this.
    async fn lookup_many(&self, tokens: &[u64]) -> Result<Vec<(u64, Posting)>, EngineError> {
        let mut out = Vec::new();
        for &token in tokens {
            for posting in self.lookup(token).await? {
                out.push((token, posting));
            }
        }
        Ok(out)
    }

    /// Resolve a song id to its catalog entry.
    async fn resolve_song(&self, song_id: SongId) -> Result<Option<SongMeta>, EngineError>;
}

#[derive(Default)]
struct MemoryInner {
    buckets: HashMap<u64, Vec<Posting>>,
    songs: BTreeMap<SongId, SongMeta>,
    next_song_id: SongId,
}

/// In-process index: a `RwLock`-guarded hash map.
///
/// Serves as the working set of the filesystem backend and as the index of
/// choice in tests; everything lives in one lock, so readers proceed
/// concurrently and writers take the lock exclusively.
pub struct MemoryIndex {
    inner: RwLock<MemoryInner>,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MemoryInner {
                next_song_id: 1,
                ..MemoryInner::default()
            }),
        }
    }

    /// Number of distinct hash tokens currently indexed.
    pub fn num_tokens(&self) -> usize {
        self.inner.read().expect("index lock poisoned").buckets.len()
    }
}

impl Default for MemoryIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FingerprintIndex for MemoryIndex {
    async fn register_song(&self, name: &str, path: &str) -> Result<SongId, EngineError> {
        let mut inner = self.inner.write().expect("index lock poisoned");
        let song_id = inner.next_song_id;
        inner.next_song_id += 1;
        inner.songs.insert(
            song_id,
            SongMeta {
                display_name: name.to_string(),
                source_path: path.to_string(),
            },
        );
        Ok(song_id)
    }

    async fn put(&self, song_id: SongId, records: &[HashRecord]) -> Result<(), EngineError> {
        let mut inner = self.inner.write().expect("index lock poisoned");
        for r in records {
            inner.buckets.entry(r.token).or_default().push(Posting {
                song_id,
                anchor_time: r.anchor_time,
            });
        }
        Ok(())
    }

    async fn lookup(&self, token: u64) -> Result<Vec<Posting>, EngineError> {
        let inner = self.inner.read().expect("index lock poisoned");
        Ok(inner.buckets.get(&token).cloned().unwrap_or_default())
    }

    async fn resolve_song(&self, song_id: SongId) -> Result<Option<SongMeta>, EngineError> {
        let inner = self.inner.read().expect("index lock poisoned");
        Ok(inner.songs.get(&song_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn register_assigns_increasing_ids() {
        let index = MemoryIndex::new();
        let a = index.register_song("a", "/a.wav").await.unwrap();
        let b = index.register_song("b", "/b.wav").await.unwrap();
        assert!(b > a);
    }

    #[tokio::test]
    async fn put_then_lookup_roundtrip() {
        let index = MemoryIndex::new();
        let song_id = index.register_song("song", "/song.wav").await.unwrap();
        let records = vec![
            HashRecord {
                token: 42,
                anchor_time: 3,
            },
            HashRecord {
                token: 42,
                anchor_time: 9,
            },
            HashRecord {
                token: 7,
                anchor_time: 1,
            },
        ];
        index.put(song_id, &records).await.unwrap();

        let postings = index.lookup(42).await.unwrap();
        assert_eq!(postings.len(), 2);
        assert!(postings.iter().all(|p| p.song_id == song_id));
        assert!(index.lookup(999).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn resolve_unknown_song_is_none() {
        let index = MemoryIndex::new();
        assert_eq!(index.resolve_song(5).await.unwrap(), None);
    }

    #[tokio::test]
    async fn lookup_many_default_covers_all_tokens() {
        let index = MemoryIndex::new();
        let song_id = index.register_song("song", "/song.wav").await.unwrap();
        index
            .put(
                song_id,
                &[
                    HashRecord {
                        token: 1,
                        anchor_time: 0,
                    },
                    HashRecord {
                        token: 2,
                        anchor_time: 5,
                    },
                ],
            )
            .await
            .unwrap();

        let rows = index.lookup_many(&[1, 2, 3]).await.unwrap();
        assert_eq!(rows.len(), 2);
    }
}
