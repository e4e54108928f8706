#![allow(missing_docs)]

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use taskboard_store_fs::{FileStorage, KeyValueStore, StoreError};
use tempfile::TempDir;

#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
struct Profile {
    name: String,
    role: String,
}

fn profile() -> Profile {
    Profile {
        name: "Owner User".into(),
        role: "owner".into(),
    }
}

#[test]
fn values_survive_reopening() -> Result<()> {
    let dir = TempDir::new()?;
    {
        let storage = FileStorage::open(dir.path())?;
        storage.set_json("currentUser", &profile())?;
    }

    let reopened = FileStorage::open(dir.path())?;
    let loaded: Option<Profile> = reopened.get_json("currentUser")?;
    assert_eq!(loaded, Some(profile()));
    assert!(dir.path().join("currentUser.json").exists());
    Ok(())
}

#[test]
fn missing_keys_read_as_none() -> Result<()> {
    let dir = TempDir::new()?;
    let storage = FileStorage::open(dir.path())?;
    assert_eq!(storage.get("authToken")?, None);
    storage.remove("authToken")?;
    Ok(())
}

#[test]
fn remove_deletes_the_file_and_cache_entry() -> Result<()> {
    let dir = TempDir::new()?;
    let storage = FileStorage::open(dir.path())?;
    storage.set("authToken", "\"token\"")?;
    assert_eq!(storage.get("authToken")?.as_deref(), Some("\"token\""));

    storage.remove("authToken")?;
    assert_eq!(storage.get("authToken")?, None);
    assert!(!dir.path().join("authToken.json").exists());
    Ok(())
}

#[test]
fn open_creates_nested_directories() -> Result<()> {
    let dir = TempDir::new()?;
    let nested = dir.path().join("a").join("b");
    let storage = FileStorage::open(&nested)?;
    storage.set("mockTasks", "[]")?;
    assert_eq!(storage.root(), nested.as_path());
    assert_eq!(fs::read_to_string(nested.join("mockTasks.json"))?, "[]");
    Ok(())
}

#[test]
fn corrupt_documents_report_decode_errors() -> Result<()> {
    let dir = TempDir::new()?;
    fs::write(dir.path().join("currentUser.json"), "{\"name\": 3")?;
    let storage = FileStorage::open(dir.path())?;

    let Err(err) = storage.get_json::<Profile>("currentUser") else {
        panic!("truncated JSON must not decode");
    };
    assert!(matches!(err, StoreError::Decode { ref key, .. } if key == "currentUser"));
    Ok(())
}

#[test]
fn traversal_keys_are_rejected() -> Result<()> {
    let dir = TempDir::new()?;
    let storage = FileStorage::open(dir.path())?;
    let Err(err) = storage.set("../escape", "1") else {
        panic!("path traversal must be rejected");
    };
    assert!(matches!(err, StoreError::InvalidKey(_)));
    Ok(())
}

#[test]
fn failed_write_leaves_no_staging_file() -> Result<()> {
    let dir = TempDir::new()?;
    let storage = FileStorage::open(dir.path())?;
    // A directory in the way makes the final rename fail.
    fs::create_dir(dir.path().join("mockTasks.json"))?;

    let Err(err) = storage.set("mockTasks", "[]") else {
        panic!("rename onto a directory must fail");
    };
    assert!(matches!(err, StoreError::Io(_)));
    assert!(!dir.path().join("mockTasks.json.tmp").exists());
    assert_eq!(storage.get("mockTasks").ok().flatten(), None);
    Ok(())
}
