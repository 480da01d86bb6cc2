//! Persistent index backends
//!
//! Two implementations of the [`FingerprintIndex`] contract: a directory of
//! JSON files with an in-memory working set, and a PostgreSQL database
//! (delegating to `constel-db`). Which one runs is chosen by `config.toml`.

use crate::error::EngineError;
use crate::hashing::HashRecord;
use crate::index::{FingerprintIndex, Posting, SongId, SongMeta};
use crate::storage_config::{PostgresqlConfig, StorageBackendKind, StorageConfig};
use async_trait::async_trait;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

/// Open the index backend named by the storage configuration.
pub async fn open_index(config: &StorageConfig) -> Result<Box<dyn FingerprintIndex>, EngineError> {
    match config.backend {
        StorageBackendKind::Filesystem => {
            let index = FilesystemIndex::open(Path::new(&config.filesystem.base_directory))?;
            Ok(Box::new(index))
        }
        StorageBackendKind::Postgresql => {
            let index = PostgresIndex::connect(&config.postgresql).await?;
            Ok(Box::new(index))
        }
    }
}

/// Song catalog persisted as `catalog.json` in the index directory.
///
/// `next_song_id` only moves forward, so ids of deleted songs are never
/// handed out again.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Catalog {
    next_song_id: SongId,
    songs: BTreeMap<SongId, SongMeta>,
}

impl Default for Catalog {
    fn default() -> Self {
        Self {
            next_song_id: 1,
            songs: BTreeMap::new(),
        }
    }
}

/// Filesystem-backed index.
///
/// Layout: `catalog.json` plus one `<song_id>.json` hash-record file per
/// song. The whole token map is loaded into memory on open and kept in sync
/// on `put`; lookups never touch the disk. Unreadable song files are skipped
/// with a warning so one corrupt file cannot take the index down.
pub struct FilesystemIndex {
    base_dir: PathBuf,
    catalog: RwLock<Catalog>,
    buckets: RwLock<HashMap<u64, Vec<Posting>>>,
}

impl FilesystemIndex {
    const CATALOG_FILE: &'static str = "catalog.json";

    /// Open (or create) an index directory.
    pub fn open(base_dir: &Path) -> Result<Self, EngineError> {
        std::fs::create_dir_all(base_dir).map_err(|e| index_err(e.into()))?;

        let catalog_path = base_dir.join(Self::CATALOG_FILE);
        let catalog: Catalog = if catalog_path.exists() {
            let content = std::fs::read_to_string(&catalog_path).map_err(|e| index_err(e.into()))?;
            serde_json::from_str(&content).map_err(|e| index_err(e.into()))?
        } else {
            Catalog::default()
        };

        // Load all song record files in parallel; skip the unreadable ones.
        let loaded: Vec<(SongId, Vec<HashRecord>)> = catalog
            .songs
            .keys()
            .collect::<Vec<_>>()
            .par_iter()
            .filter_map(|&&song_id| {
                let path = base_dir.join(format!("{}.json", song_id));
                match Self::load_records(&path) {
                    Ok(records) => Some((song_id, records)),
                    Err(e) => {
                        log::warn!("skipping song {} ({}): {}", song_id, path.display(), e);
                        None
                    }
                }
            })
            .collect();

        let mut buckets: HashMap<u64, Vec<Posting>> = HashMap::new();
        for (song_id, records) in loaded {
            for r in records {
                buckets.entry(r.token).or_default().push(Posting {
                    song_id,
                    anchor_time: r.anchor_time,
                });
            }
        }

        log::info!(
            "opened filesystem index at {} ({} songs, {} distinct tokens)",
            base_dir.display(),
            catalog.songs.len(),
            buckets.len()
        );

        Ok(Self {
            base_dir: base_dir.to_path_buf(),
            catalog: RwLock::new(catalog),
            buckets: RwLock::new(buckets),
        })
    }

    fn load_records(path: &Path) -> anyhow::Result<Vec<HashRecord>> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    fn persist_catalog(&self, catalog: &Catalog) -> Result<(), EngineError> {
        let json = serde_json::to_string_pretty(catalog).map_err(|e| index_err(e.into()))?;
        std::fs::write(self.base_dir.join(Self::CATALOG_FILE), json)
            .map_err(|e| index_err(e.into()))
    }
}

#[async_trait]
impl FingerprintIndex for FilesystemIndex {
    async fn register_song(&self, name: &str, path: &str) -> Result<SongId, EngineError> {
        let mut catalog = self.catalog.write().expect("catalog lock poisoned");
        let song_id = catalog.next_song_id;
        catalog.next_song_id += 1;
        catalog.songs.insert(
            song_id,
            SongMeta {
                display_name: name.to_string(),
                source_path: path.to_string(),
            },
        );
        self.persist_catalog(&catalog)?;
        Ok(song_id)
    }

    async fn put(&self, song_id: SongId, records: &[HashRecord]) -> Result<(), EngineError> {
        // Durable write first, then the in-memory working set.
        let json = serde_json::to_string(records).map_err(|e| index_err(e.into()))?;
        std::fs::write(self.base_dir.join(format!("{}.json", song_id)), json)
            .map_err(|e| index_err(e.into()))?;

        let mut buckets = self.buckets.write().expect("bucket lock poisoned");
        for r in records {
            buckets.entry(r.token).or_default().push(Posting {
                song_id,
                anchor_time: r.anchor_time,
            });
        }
        Ok(())
    }

    async fn lookup(&self, token: u64) -> Result<Vec<Posting>, EngineError> {
        let buckets = self.buckets.read().expect("bucket lock poisoned");
        Ok(buckets.get(&token).cloned().unwrap_or_default())
    }

    async fn resolve_song(&self, song_id: SongId) -> Result<Option<SongMeta>, EngineError> {
        let catalog = self.catalog.read().expect("catalog lock poisoned");
        Ok(catalog.songs.get(&song_id).cloned())
    }
}

/// PostgreSQL-backed index.
pub struct PostgresIndex {
    pool: deadpool_postgres::Pool,
}

impl PostgresIndex {
    /// Connect to the database, verify the connection and make sure the
    /// schema exists.
    pub async fn connect(config: &PostgresqlConfig) -> Result<Self, EngineError> {
        let pool = constel_db::create_pool(
            &config.host,
            config.port,
            &config.database,
            &config.user,
            &config.password,
            config.max_connections,
        )
        .map_err(index_err)?;

        constel_db::test_connection(&pool).await.map_err(index_err)?;
        constel_db::ensure_schema(&pool).await.map_err(index_err)?;

        Ok(Self { pool })
    }
}

#[async_trait]
impl FingerprintIndex for PostgresIndex {
    async fn register_song(&self, name: &str, path: &str) -> Result<SongId, EngineError> {
        let new_song = constel_db::NewSong {
            name: name.to_string(),
            path: path.to_string(),
        };
        constel_db::insert_song(&self.pool, &new_song)
            .await
            .map_err(index_err)
    }

    async fn put(&self, song_id: SongId, records: &[HashRecord]) -> Result<(), EngineError> {
        let rows: Vec<constel_db::NewFingerprintRow> = records
            .iter()
            .map(|r| constel_db::NewFingerprintRow {
                song_id,
                // Tokens are bit-cast so they fit a signed BIGINT column.
                hash: r.token as i64,
                anchor_time: r.anchor_time,
            })
            .collect();

        constel_db::insert_fingerprints_batch(&self.pool, &rows)
            .await
            .map_err(index_err)
    }

    async fn lookup(&self, token: u64) -> Result<Vec<Posting>, EngineError> {
        let rows = constel_db::get_fingerprints_by_hash(&self.pool, token as i64)
            .await
            .map_err(index_err)?;
        Ok(rows
            .into_iter()
            .map(|r| Posting {
                song_id: r.song_id,
                anchor_time: r.anchor_time,
            })
            .collect())
    }

    async fn lookup_many(&self, tokens: &[u64]) -> Result<Vec<(u64, Posting)>, EngineError> {
        let hashes: Vec<i64> = tokens.iter().map(|&t| t as i64).collect();
        let rows = constel_db::get_fingerprints_by_hashes(&self.pool, &hashes)
            .await
            .map_err(index_err)?;
        Ok(rows
            .into_iter()
            .map(|r| {
                (
                    r.hash as u64,
                    Posting {
                        song_id: r.song_id,
                        anchor_time: r.anchor_time,
                    },
                )
            })
            .collect())
    }

    async fn resolve_song(&self, song_id: SongId) -> Result<Option<SongMeta>, EngineError> {
        let song = constel_db::get_song_by_id(&self.pool, song_id)
            .await
            .map_err(index_err)?;
        Ok(song.map(|s| SongMeta {
            display_name: s.name,
            source_path: s.path,
        }))
    }
}

fn index_err(source: anyhow::Error) -> EngineError {
    EngineError::IndexUnavailable(source.into())
}
