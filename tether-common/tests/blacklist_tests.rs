// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Tests for the blacklist and the workspace settings document.

use std::fs;

use serde_json::json;
use tempfile::TempDir;
use tether_common::settings::{SettingsDocument, BLACKLIST_KEY};
use tether_common::{Blacklist, ConnectDefaults, RetryPolicy, SettingsError};

fn read_json(dir: &TempDir) -> serde_json::Value {
    let text = fs::read_to_string(SettingsDocument::workspace_path(dir.path())).unwrap();
    serde_json::from_str(&text).unwrap()
}

// =============================================================================
// In-memory behaviour
// =============================================================================

#[test]
fn test_in_memory_contains() {
    let blacklist = Blacklist::in_memory(["usb@/20A0/41D5/01/SN1"]);
    assert!(blacklist.contains("usb@/20A0/41D5/01/SN1"));
    assert!(!blacklist.contains("usb@/20A0/41D5/01/SN2"));
}

#[test]
fn test_membership_is_exact_text() {
    // Equivalent addresses written differently are distinct entries.
    let blacklist = Blacklist::in_memory(["usb@/20a0/41d5/1/SN1"]);
    assert!(!blacklist.contains("usb@/20A0/41D5/01/SN1"));
}

#[test]
fn test_add_ignores_duplicates() {
    let mut blacklist = Blacklist::in_memory(Vec::<String>::new());
    assert!(blacklist.add("serial@/dev/ttyS0").unwrap());
    assert!(!blacklist.add("serial@/dev/ttyS0").unwrap());
    assert_eq!(blacklist.len(), 1);
}

#[test]
fn test_in_memory_drops_duplicates() {
    let blacklist = Blacklist::in_memory(["a", "b", "a"]);
    assert_eq!(blacklist.snapshot(), vec!["a", "b"]);
}

#[test]
fn test_snapshot_keeps_insertion_order() {
    let mut blacklist = Blacklist::in_memory(["b"]);
    blacklist.add("a").unwrap();
    blacklist.add("c").unwrap();
    assert_eq!(blacklist.snapshot(), vec!["b", "a", "c"]);
}

// =============================================================================
// Persistence
// =============================================================================

#[test]
fn test_missing_settings_file_is_empty() {
    let dir = TempDir::new().unwrap();
    let store = SettingsDocument::for_workspace(dir.path()).unwrap();
    let blacklist = Blacklist::load(store).unwrap();
    assert!(blacklist.is_empty());
}

#[test]
fn test_add_persists_under_blacklist_key() {
    let dir = TempDir::new().unwrap();
    let store = SettingsDocument::for_workspace(dir.path()).unwrap();
    let mut blacklist = Blacklist::load(store).unwrap();

    blacklist.add("serial@/dev/ttyS0").unwrap();
    blacklist.add("usb@/20A0/41D5/01/SN1").unwrap();

    assert_eq!(
        read_json(&dir)[BLACKLIST_KEY],
        json!(["serial@/dev/ttyS0", "usb@/20A0/41D5/01/SN1"])
    );

    let reloaded =
        Blacklist::load(SettingsDocument::for_workspace(dir.path()).unwrap()).unwrap();
    assert!(reloaded.contains("serial@/dev/ttyS0"));
    assert!(reloaded.contains("usb@/20A0/41D5/01/SN1"));
}

#[test]
fn test_rewrite_preserves_unknown_keys() {
    let dir = TempDir::new().unwrap();
    let path = SettingsDocument::workspace_path(dir.path());
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, r#"{"sdk": "4.3", "blacklist": ["serial@COM1"]}"#).unwrap();

    let mut blacklist = Blacklist::load(SettingsDocument::open(&path).unwrap()).unwrap();
    blacklist.add("serial@COM2").unwrap();

    let doc = read_json(&dir);
    assert_eq!(doc["sdk"], json!("4.3"));
    assert_eq!(doc["blacklist"], json!(["serial@COM1", "serial@COM2"]));
}

#[test]
fn test_clear_saves_empty_list() {
    let dir = TempDir::new().unwrap();
    let mut blacklist =
        Blacklist::load(SettingsDocument::for_workspace(dir.path()).unwrap()).unwrap();
    blacklist.add("serial@COM1").unwrap();

    blacklist.clear().unwrap();

    assert!(blacklist.is_empty());
    assert_eq!(read_json(&dir)[BLACKLIST_KEY], json!([]));
}

#[test]
fn test_replace_with_shorter_list() {
    let dir = TempDir::new().unwrap();
    let mut blacklist =
        Blacklist::load(SettingsDocument::for_workspace(dir.path()).unwrap()).unwrap();
    blacklist.add("a").unwrap();
    blacklist.add("b").unwrap();

    blacklist.replace(["b"]).unwrap();

    assert_eq!(blacklist.snapshot(), vec!["b"]);
    assert_eq!(read_json(&dir)[BLACKLIST_KEY], json!(["b"]));
}

#[test]
fn test_failed_save_leaves_list_unchanged() {
    let dir = TempDir::new().unwrap();
    let store = SettingsDocument::for_workspace(dir.path()).unwrap();
    let mut blacklist = Blacklist::load(store).unwrap();
    blacklist.add("serial@/dev/ttyS0").unwrap();

    // A plain file where the settings directory should be.
    fs::remove_dir_all(dir.path().join(".tether")).unwrap();
    fs::write(dir.path().join(".tether"), "").unwrap();

    assert!(matches!(
        blacklist.add("serial@/dev/ttyS1"),
        Err(SettingsError::Io { .. })
    ));
    assert!(!blacklist.contains("serial@/dev/ttyS1"));
    assert!(blacklist.replace(["x"]).is_err());
    assert_eq!(blacklist.snapshot(), vec!["serial@/dev/ttyS0"]);
}

#[test]
fn test_malformed_settings_is_an_error() {
    let dir = TempDir::new().unwrap();
    let path = SettingsDocument::workspace_path(dir.path());
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, "{ not json").unwrap();

    assert!(matches!(
        SettingsDocument::open(&path),
        Err(SettingsError::Parse { .. })
    ));
}

#[test]
fn test_non_object_settings_is_an_error() {
    let dir = TempDir::new().unwrap();
    let path = SettingsDocument::workspace_path(dir.path());
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, "[1, 2]").unwrap();

    assert!(matches!(
        SettingsDocument::open(&path),
        Err(SettingsError::NotAnObject { .. })
    ));
}

#[test]
fn test_wrong_blacklist_type_is_an_error() {
    let dir = TempDir::new().unwrap();
    let path = SettingsDocument::workspace_path(dir.path());
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, r#"{"blacklist": "serial@COM1"}"#).unwrap();

    let store = SettingsDocument::open(&path).unwrap();
    assert!(matches!(
        Blacklist::load(store),
        Err(SettingsError::Value { .. })
    ));
}

// =============================================================================
// Connect defaults
// =============================================================================

#[test]
fn test_connect_defaults_when_absent() {
    let dir = TempDir::new().unwrap();
    let store = SettingsDocument::for_workspace(dir.path()).unwrap();
    let defaults = store.connect_defaults().unwrap();
    assert_eq!(defaults, ConnectDefaults::default());
    assert_eq!(defaults.policy(), RetryPolicy::default());
}

#[test]
fn test_connect_defaults_partial_override() {
    let dir = TempDir::new().unwrap();
    let path = SettingsDocument::workspace_path(dir.path());
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, r#"{"connect": {"retries": 3}}"#).unwrap();

    let defaults = SettingsDocument::open(&path)
        .unwrap()
        .connect_defaults()
        .unwrap();
    assert_eq!(defaults.retries, 3);
    assert_eq!(defaults.delay_ms, ConnectDefaults::default().delay_ms);
    assert!(!defaults.allow_legacy_protocol);
}
