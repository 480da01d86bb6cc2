use serde::{Deserialize, Serialize};

/// A reference recording registered in the catalog. Created once at
/// ingestion, immutable afterwards; ids come from a sequence that is never
/// reset, so a deleted song's id is not handed out again.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Song {
    pub id: i32,
    pub name: String,
    pub path: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Input structure for registering a song
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSong {
    pub name: String,
    pub path: String,
}

/// A stored hash record row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FingerprintRow {
    pub hash: i64,
    pub song_id: i32,
    pub anchor_time: i32,
}

/// Input structure for bulk-inserting hash records
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewFingerprintRow {
    pub song_id: i32,
    pub hash: i64,
    pub anchor_time: i32,
}
