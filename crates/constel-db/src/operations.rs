use anyhow::{Context, Result};
use deadpool_postgres::Pool;

use crate::models::*;

/// Create the schema if it does not exist yet. The B-tree index on `hash`
/// is what keeps per-token lookup better than a full scan.
pub async fn ensure_schema(pool: &Pool) -> Result<()> {
    let client = pool.get().await?;

    client
        .batch_execute(
            "CREATE TABLE IF NOT EXISTS songs (
                 id SERIAL PRIMARY KEY,
                 name TEXT NOT NULL,
                 path TEXT NOT NULL,
                 created_at TIMESTAMPTZ NOT NULL DEFAULT now()
             );
             CREATE TABLE IF NOT EXISTS fingerprints (
                 hash BIGINT NOT NULL,
                 song_id INTEGER NOT NULL REFERENCES songs(id),
                 anchor_time INTEGER NOT NULL
             );
             CREATE INDEX IF NOT EXISTS idx_fingerprints_hash ON fingerprints(hash);",
        )
        .await
        .context("Failed to ensure schema")?;

    log::debug!("schema ensured (songs, fingerprints, idx_fingerprints_hash)");
    Ok(())
}

/// Register a song and return its assigned id
pub async fn insert_song(pool: &Pool, song: &NewSong) -> Result<i32> {
    let client = pool.get().await?;

    let row = client
        .query_one(
            "INSERT INTO songs (name, path) VALUES ($1, $2) RETURNING id",
            &[&song.name, &song.path],
        )
        .await
        .context("Failed to insert song")?;

    Ok(row.get(0))
}

/// Batch insert hash records using JSONB expansion
pub async fn insert_fingerprints_batch(pool: &Pool, rows: &[NewFingerprintRow]) -> Result<()> {
    if rows.is_empty() {
        return Ok(());
    }

    let client = pool.get().await?;

    let json_array = serde_json::to_value(rows).context("Failed to serialize hash records")?;

    client
        .execute(
            "INSERT INTO fingerprints (song_id, hash, anchor_time)
             SELECT
                 (fp->>'song_id')::INTEGER,
                 (fp->>'hash')::BIGINT,
                 (fp->>'anchor_time')::INTEGER
             FROM jsonb_array_elements($1::jsonb) AS fp",
            &[&json_array],
        )
        .await
        .context("Failed to batch insert hash records")?;

    Ok(())
}

/// Get every stored record under one hash token
pub async fn get_fingerprints_by_hash(pool: &Pool, hash: i64) -> Result<Vec<FingerprintRow>> {
    let client = pool.get().await?;

    let rows = client
        .query(
            "SELECT hash, song_id, anchor_time FROM fingerprints WHERE hash = $1",
            &[&hash],
        )
        .await
        .context("Failed to get fingerprints by hash")?;

    Ok(rows
        .iter()
        .map(|r| FingerprintRow {
            hash: r.get(0),
            song_id: r.get(1),
            anchor_time: r.get(2),
        })
        .collect())
}

/// Get every stored record under any of the given hash tokens
pub async fn get_fingerprints_by_hashes(pool: &Pool, hashes: &[i64]) -> Result<Vec<FingerprintRow>> {
    if hashes.is_empty() {
        return Ok(Vec::new());
    }

    let client = pool.get().await?;

    let rows = client
        .query(
            "SELECT hash, song_id, anchor_time FROM fingerprints WHERE hash = ANY($1)",
            &[&hashes],
        )
        .await
        .context("Failed to get fingerprints by hashes")?;

    Ok(rows
        .iter()
        .map(|r| FingerprintRow {
            hash: r.get(0),
            song_id: r.get(1),
            anchor_time: r.get(2),
        })
        .collect())
}

/// Get a song by id
pub async fn get_song_by_id(pool: &Pool, id: i32) -> Result<Option<Song>> {
    let client = pool.get().await?;

    let row = client
        .query_opt(
            "SELECT id, name, path, created_at FROM songs WHERE id = $1",
            &[&id],
        )
        .await
        .context("Failed to get song")?;

    Ok(row.map(|r| Song {
        id: r.get(0),
        name: r.get(1),
        path: r.get(2),
        created_at: r.get(3),
    }))
}

/// List the whole song catalog
pub async fn get_all_songs(pool: &Pool) -> Result<Vec<Song>> {
    let client = pool.get().await?;

    let rows = client
        .query("SELECT id, name, path, created_at FROM songs ORDER BY id", &[])
        .await
        .context("Failed to list songs")?;

    Ok(rows
        .iter()
        .map(|r| Song {
            id: r.get(0),
            name: r.get(1),
            path: r.get(2),
            created_at: r.get(3),
        })
        .collect())
}

/// Delete a song and its hash records. The id sequence is left untouched so
/// the id is never reused for a later song.
pub async fn delete_song(pool: &Pool, id: i32) -> Result<()> {
    let client = pool.get().await?;

    client
        .execute("DELETE FROM fingerprints WHERE song_id = $1", &[&id])
        .await
        .context("Failed to delete song fingerprints")?;
    client
        .execute("DELETE FROM songs WHERE id = $1", &[&id])
        .await
        .context("Failed to delete song")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::create_pool;

    async fn test_pool() -> Pool {
        create_pool("localhost", 5432, "constel", "constel", "constel", 5).unwrap()
    }

    #[tokio::test]
    #[ignore] // Requires PostgreSQL to be running
    async fn song_roundtrip() {
        let pool = test_pool().await;
        ensure_schema(&pool).await.unwrap();

        let id = insert_song(
            &pool,
            &NewSong {
                name: "test song".to_string(),
                path: "/music/test.wav".to_string(),
            },
        )
        .await
        .unwrap();

        let song = get_song_by_id(&pool, id).await.unwrap().unwrap();
        assert_eq!(song.name, "test song");

        delete_song(&pool, id).await.unwrap();
        assert!(get_song_by_id(&pool, id).await.unwrap().is_none());
    }

    #[tokio::test]
    #[ignore] // Requires PostgreSQL to be running
    async fn fingerprint_batch_roundtrip() {
        let pool = test_pool().await;
        ensure_schema(&pool).await.unwrap();

        let id = insert_song(
            &pool,
            &NewSong {
                name: "batch song".to_string(),
                path: "/music/batch.wav".to_string(),
            },
        )
        .await
        .unwrap();

        let rows: Vec<NewFingerprintRow> = (0..100)
            .map(|i| NewFingerprintRow {
                song_id: id,
                hash: -7_000_000_000 + i,
                anchor_time: i as i32,
            })
            .collect();
        insert_fingerprints_batch(&pool, &rows).await.unwrap();

        let found = get_fingerprints_by_hash(&pool, -7_000_000_000).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].song_id, id);

        let many = get_fingerprints_by_hashes(&pool, &[-7_000_000_000, -6_999_999_999])
            .await
            .unwrap();
        assert_eq!(many.len(), 2);

        delete_song(&pool, id).await.unwrap();
    }
}
