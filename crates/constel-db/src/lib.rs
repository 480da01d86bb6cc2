//! Constel database layer
//!
//! PostgreSQL storage for the song catalog and the hash-token index. Hash
//! tokens are bit-cast `u64 -> i64` so they fit a `BIGINT` column; the cast
//! is lossless and reversed on the way out.

pub mod connection;
pub mod models;
pub mod operations;

pub use connection::{create_pool, test_connection, DbPool};
pub use models::{FingerprintRow, NewFingerprintRow, NewSong, Song};
pub use operations::{
    delete_song, ensure_schema, get_all_songs, get_fingerprints_by_hash,
    get_fingerprints_by_hashes, get_song_by_id, insert_fingerprints_batch, insert_song,
};
