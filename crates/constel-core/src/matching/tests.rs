//! Tests for the offset-alignment matcher

use super::*;
use crate::index::MemoryIndex;

fn record(token: u64, anchor_time: i32) -> HashRecord {
    HashRecord { token, anchor_time }
}

async fn seeded_index(songs: &[(&str, &[HashRecord])]) -> (MemoryIndex, Vec<SongId>) {
    let index = MemoryIndex::new();
    let mut ids = Vec::new();
    for (name, records) in songs {
        let id = index
            .register_song(name, &format!("/music/{}.wav", name))
            .await
            .unwrap();
        index.put(id, records).await.unwrap();
        ids.push(id);
    }
    (index, ids)
}

#[tokio::test]
async fn identical_query_scores_full_overlap_at_zero_offset() {
    let records: Vec<HashRecord> = (0..50).map(|i| record(1000 + i, i as i32 * 4)).collect();
    let (index, ids) = seeded_index(&[("ref", &records)]).await;

    let results = MatchEngine::new().rank(&index, &records).await.unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].song_id, ids[0]);
    assert_eq!(results[0].score, 50);
    assert_eq!(results[0].best_offset, 0);
}

#[tokio::test]
async fn shifted_query_reports_the_shift() {
    let stored: Vec<HashRecord> = (0..50).map(|i| record(2000 + i, i as i32 * 4)).collect();
    let (index, ids) = seeded_index(&[("ref", &stored)]).await;

    // Query anchors sit 120 bins earlier than the stored ones, as if the
    // first 120 bins of the reference were cut off the clip.
    let query: Vec<HashRecord> = stored
        .iter()
        .map(|r| record(r.token, r.anchor_time - 120))
        .collect();

    let results = MatchEngine::new().rank(&index, &query).await.unwrap();
    assert_eq!(results[0].song_id, ids[0]);
    assert_eq!(results[0].best_offset, 120);
    assert_eq!(results[0].score, 50);
}

#[tokio::test]
async fn scattered_collisions_lose_to_aligned_votes() {
    // "good" shares 30 aligned hashes with the query; "noise" shares 40
    // hashes but at scattered offsets, so its histogram peak stays low.
    let aligned: Vec<HashRecord> = (0..30).map(|i| record(10 + i, i as i32 * 3)).collect();
    let scattered: Vec<HashRecord> = (0..40)
        .map(|i| record(10 + (i % 30), (i as i32 * 17) % 400))
        .collect();
    let (index, ids) = seeded_index(&[("good", &aligned), ("noise", &scattered)]).await;

    let results = MatchEngine::new().rank(&index, &aligned).await.unwrap();

    assert_eq!(results[0].song_id, ids[0]);
    assert_eq!(results[0].score, 30);
    assert_eq!(results[0].best_offset, 0);
    assert!(results.len() == 2);
    assert!(results[1].score < results[0].score);
}

#[tokio::test]
async fn no_token_overlap_yields_empty_list() {
    let stored: Vec<HashRecord> = (0..20).map(|i| record(i, i as i32)).collect();
    let (index, _) = seeded_index(&[("ref", &stored)]).await;

    let query: Vec<HashRecord> = (0..20).map(|i| record(10_000 + i, i as i32)).collect();
    let results = MatchEngine::new().rank(&index, &query).await.unwrap();
    assert!(results.is_empty());
}

#[tokio::test]
async fn empty_index_yields_empty_list() {
    let index = MemoryIndex::new();
    let query = vec![record(1, 0), record(2, 4)];
    let results = MatchEngine::new().rank(&index, &query).await.unwrap();
    assert!(results.is_empty());
}

#[tokio::test]
async fn ranking_is_non_increasing() {
    let strong: Vec<HashRecord> = (0..40).map(|i| record(100 + i, i as i32 * 2)).collect();
    let medium: Vec<HashRecord> = (0..25).map(|i| record(100 + i, i as i32 * 2)).collect();
    let weak: Vec<HashRecord> = (0..5).map(|i| record(100 + i, i as i32 * 2)).collect();
    let (index, _) = seeded_index(&[("strong", &strong), ("medium", &medium), ("weak", &weak)]).await;

    let results = MatchEngine::new().rank(&index, &strong).await.unwrap();
    assert_eq!(results.len(), 3);
    for pair in results.windows(2) {
        assert!(pair[0].score >= pair[1].score);
    }
    assert_eq!(results[0].score, 40);
}

#[tokio::test]
async fn duplicate_postings_only_inflate_magnitude() {
    let records: Vec<HashRecord> = (0..10).map(|i| record(500 + i, i as i32)).collect();
    let index = MemoryIndex::new();
    let id = index.register_song("dup", "/music/dup.wav").await.unwrap();
    index.put(id, &records).await.unwrap();
    index.put(id, &records).await.unwrap(); // repeated ingestion

    let results = MatchEngine::new().rank(&index, &records).await.unwrap();
    assert_eq!(results[0].song_id, id);
    assert_eq!(results[0].best_offset, 0);
    assert_eq!(results[0].score, 20);
}
