use chrono::{TimeZone, Utc};
use healthstat_scraper::pipeline::storage::versioned::backup_path;
use healthstat_scraper::pipeline::storage::{SaveOutcome, VersionedStore};
use healthstat_scraper::ScraperError;
use std::fs;
use tempfile::tempdir;

#[test]
fn first_save_writes_exact_bytes() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("sources").join("data_qc.csv");
    let payload = b"date,cases_qc\n2020-04-01,4611\n";

    let outcome = VersionedStore::new().save(&path, payload).unwrap();

    assert_eq!(outcome, SaveOutcome::Created);
    assert_eq!(fs::read(&path).unwrap(), payload);
    assert_eq!(fs::read_dir(path.parent().unwrap()).unwrap().count(), 1);
}

#[test]
fn shrinking_payload_is_rejected_and_file_kept() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("data_mtl.html");
    let store = VersionedStore::new();
    let original = b"<html><table>full page</table></html>";
    store.save(&path, original).unwrap();

    let err = store.save(&path, b"<html></html>").unwrap_err();

    match err {
        ScraperError::StaleOrSuspiciousWrite {
            existing,
            candidate,
            ..
        } => {
            assert_eq!(existing, original.len() as u64);
            assert_eq!(candidate, 13);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(fs::read(&path).unwrap(), original);
    // no backup was taken for a rejected write
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
}

#[test]
fn growing_payload_backs_up_previous_version() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("data_qc.csv");
    let store = VersionedStore::new();
    store.save(&path, b"a,b\n1,2\n").unwrap();

    let now = Utc.with_ymd_and_hms(2020, 4, 20, 12, 0, 0).unwrap();
    let outcome = store.save_at(&path, b"a,b\n1,2\n3,4\n", now).unwrap();

    let expected_backup = dir.path().join("data_qc-2020-04-20T12:00:00.000000.csv");
    assert_eq!(
        outcome,
        SaveOutcome::Replaced {
            backup: expected_backup.clone()
        }
    );
    assert_eq!(backup_path(&path, now), expected_backup);
    assert_eq!(fs::read(&expected_backup).unwrap(), b"a,b\n1,2\n");
    assert_eq!(fs::read(&path).unwrap(), b"a,b\n1,2\n3,4\n");
}

#[test]
fn equal_size_is_accepted() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("mtl_gender.csv");
    let store = VersionedStore::new();
    store.save(&path, b"Homme,10\n").unwrap();

    let now = Utc.with_ymd_and_hms(2020, 4, 21, 0, 0, 0).unwrap();
    store.save_at(&path, b"Femme,11\n", now).unwrap();

    assert_eq!(fs::read(&path).unwrap(), b"Femme,11\n");
}

#[test]
fn backups_are_never_rewritten_by_later_saves() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("data_mtl.html");
    let store = VersionedStore::new();
    store.save(&path, b"v1").unwrap();

    let t1 = Utc.with_ymd_and_hms(2020, 4, 20, 12, 0, 0).unwrap();
    let t2 = Utc.with_ymd_and_hms(2020, 4, 21, 12, 0, 0).unwrap();
    store.save_at(&path, b"v2-longer", t1).unwrap();
    store.save_at(&path, b"v3-even-longer", t2).unwrap();

    assert_eq!(fs::read(backup_path(&path, t1)).unwrap(), b"v1");
    assert_eq!(fs::read(backup_path(&path, t2)).unwrap(), b"v2-longer");
    assert_eq!(fs::read(&path).unwrap(), b"v3-even-longer");
    // live file plus two backups, no temporary files left behind
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 3);
}
