//! Result store round trips against an on-disk database.

use chrono::{TimeZone, Utc};
use rstest::{fixture, rstest};
use tempfile::TempDir;
use tumor_cam::{NewResult, ResultStore};

#[fixture]
fn db_dir() -> TempDir {
    TempDir::new().unwrap_or_else(|e| panic!("create temp dir: {e}"))
}

fn result(prediction: &str, confidence: f64) -> NewResult {
    NewResult {
        heatmap_image: prediction.as_bytes().to_vec(),
        prediction: prediction.into(),
        confidence,
    }
}

#[rstest]
fn list_returns_newest_first(db_dir: TempDir) {
    let store = ResultStore::open(db_dir.path().join("results.sqlite3"))
        .unwrap_or_else(|e| panic!("open store: {e}"));
    let older = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).single().unwrap_or_else(|| panic!("valid date"));
    let newer = Utc.with_ymd_and_hms(2024, 3, 2, 9, 0, 0).single().unwrap_or_else(|| panic!("valid date"));
    let first = store
        .insert_at(&result("Glioma Tumor", 0.9), older)
        .unwrap_or_else(|e| panic!("insert: {e}"));
    let second = store
        .insert_at(&result("No Tumor", 0.6), newer)
        .unwrap_or_else(|e| panic!("insert: {e}"));

    let rows = store.list().unwrap_or_else(|e| panic!("list: {e}"));
    let ids: Vec<i64> = rows.iter().map(|row| row.id).collect();
    assert_eq!(ids, vec![second, first]);
    assert_eq!(rows[0].timestamp, newer);
    assert_eq!(rows[0].prediction, "No Tumor");
    assert_eq!(rows[1].heatmap_image, b"Glioma Tumor".to_vec());
    assert!((rows[1].confidence - 0.9).abs() < 1e-9);
}

#[rstest]
fn rows_survive_reopening(db_dir: TempDir) {
    let path = db_dir.path().join("results.sqlite3");
    {
        let store = ResultStore::open(&path).unwrap_or_else(|e| panic!("open store: {e}"));
        store
            .insert(&result("Pituitary Tumor", 0.8))
            .unwrap_or_else(|e| panic!("insert: {e}"));
    }
    let reopened = ResultStore::open(&path).unwrap_or_else(|e| panic!("reopen store: {e}"));
    let rows = reopened.list().unwrap_or_else(|e| panic!("list: {e}"));
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].prediction, "Pituitary Tumor");
}

#[rstest]
fn delete_removes_only_requested_ids() {
    let store = ResultStore::open_in_memory().unwrap_or_else(|e| panic!("open store: {e}"));
    let ids: Vec<i64> = ["Glioma Tumor", "Meningioma Tumor", "No Tumor"]
        .into_iter()
        .map(|label| {
            store
                .insert(&result(label, 0.5))
                .unwrap_or_else(|e| panic!("insert: {e}"))
        })
        .collect();

    let removed = store
        .delete(&[ids[0], ids[2], 999])
        .unwrap_or_else(|e| panic!("delete: {e}"));
    assert_eq!(removed, 2);
    let remaining: Vec<i64> = store
        .list()
        .unwrap_or_else(|e| panic!("list: {e}"))
        .into_iter()
        .map(|row| row.id)
        .collect();
    assert_eq!(remaining, vec![ids[1]]);
}
