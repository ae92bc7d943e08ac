use std::{fs, path::Path};

use serde_json::json;
use tempfile::TempDir;
use trainpixels_app::{core::Error, Command};
use trainpixels_storage::{load_definitions, CommandInbox, SETTINGS_FILE, TRACKS_DIR, UTILS_DIR};

fn write_json(dir: &Path, name: &str, value: &serde_json::Value) {
    let path = dir.join(name);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, serde_json::to_string_pretty(value).unwrap()).unwrap();
}

fn write_layout(dir: &Path) {
    write_json(
        dir,
        &format!("{UTILS_DIR}/arrow_26.json"),
        &json!({
            "id": "arrow_26",
            "name": "Arrow 26",
            "enabled_on_init": false,
            "is_random": false,
            "utils": [{"led": 26, "color": "white"}]
        }),
    );
    write_json(
        dir,
        &format!("{UTILS_DIR}/station.json"),
        &json!({
            "id": "station",
            "name": "Station",
            "enabled_on_init": true,
            "is_random": true,
            "utils": [{"led": 3, "color": "yellow"}, {"led": 4, "color": "yellow"}]
        }),
    );
    write_json(
        dir,
        &format!("{TRACKS_DIR}/b_outer.json"),
        &json!({
            "id": "outer",
            "name": "Outer loop",
            "track_path": [0, 1, [2, ["station"]], 3],
            "speed": 2.0,
            "loop": false
        }),
    );
    write_json(
        dir,
        &format!("{TRACKS_DIR}/a_arrow.json"),
        &json!({
            "id": "arrow",
            "name": "Arrow",
            "track_path": [[34, ["arrow_26"]], 35, [36, "arrow_26"]],
            "speed": 1.0
        }),
    );
}

fn config_dir() -> TempDir {
    let _ = env_logger::try_init();
    let dir = tempfile::tempdir().unwrap();
    write_layout(dir.path());
    dir
}

#[test]
fn test_load_definitions() {
    let dir = config_dir();
    let definitions = load_definitions(dir.path()).unwrap();

    // Tracks are numbered in the file name order.
    assert_eq!(definitions.track_by_number(1).unwrap().id.0, "arrow");
    assert_eq!(definitions.track_by_number(2).unwrap().id.0, "outer");
    assert!(definitions.track("arrow").unwrap().looping);
    assert!(!definitions.track("outer").unwrap().looping);
    assert_eq!(definitions.utilities().len(), 2);
    assert_eq!(definitions.utility("station").unwrap().leds.len(), 2);
    // Settings are optional.
    assert_eq!(definitions.settings().track_pixel_length, 41);
}

#[test]
fn test_load_settings() {
    let dir = config_dir();
    write_json(
        dir.path(),
        SETTINGS_FILE,
        &json!({
            "brightness": 0.5,
            "random_util_trigger_chance": 0.25,
            "track_speed_modifier": 2.0
        }),
    );

    let definitions = load_definitions(dir.path()).unwrap();
    let settings = definitions.settings();
    assert!((settings.brightness - 0.5).abs() < f32::EPSILON);
    assert!((settings.random_util_trigger_chance - 0.25).abs() < f64::EPSILON);
    assert_eq!(settings.status_util_led, 42);
}

#[test]
fn test_malformed_document_names_the_file() {
    let dir = config_dir();
    fs::write(dir.path().join(TRACKS_DIR).join("broken.json"), "{ \"id\": ").unwrap();

    let err = load_definitions(dir.path()).unwrap_err();
    assert!(err.is_config());
    match err {
        Error::Json { origin, .. } => assert!(origin.ends_with("broken.json"), "{origin}"),
        other => panic!("Unexpected error {other:?}"),
    }
}

#[test]
fn test_unknown_utility_reference() {
    let dir = config_dir();
    fs::remove_file(dir.path().join(UTILS_DIR).join("station.json")).unwrap();

    assert_eq!(
        load_definitions(dir.path()).unwrap_err(),
        Error::UnknownUtility {
            track: "outer".to_owned(),
            utility: "station".to_owned(),
        }
    );
}

#[test]
fn test_empty_directory() {
    let dir = tempfile::tempdir().unwrap();
    assert_eq!(load_definitions(dir.path()).unwrap_err(), Error::NoTracks);

    write_layout(dir.path());
    fs::remove_dir_all(dir.path().join(UTILS_DIR)).unwrap();
    assert_eq!(load_definitions(dir.path()).unwrap_err(), Error::NoUtilities);
}

#[test]
fn test_non_json_files_are_ignored() {
    let dir = config_dir();
    fs::write(dir.path().join(TRACKS_DIR).join("README.md"), "# Tracks").unwrap();

    let definitions = load_definitions(dir.path()).unwrap();
    assert_eq!(definitions.tracks().len(), 2);
}

#[test]
fn test_inbox_handshake() {
    let dir = tempfile::tempdir().unwrap();
    let inbox = CommandInbox::new(dir.path().join("inbox"));

    assert_eq!(inbox.poll().unwrap(), None);

    inbox.send("2").unwrap();
    assert!(inbox.is_pending());
    assert!(inbox.dir().join(CommandInbox::INPUT_FILE).is_file());

    // The previous command has not been consumed yet.
    assert!(matches!(inbox.send("3"), Err(Error::InboxBusy(_))));

    assert_eq!(inbox.poll().unwrap(), Some(Command::SelectNumber(2)));
    assert!(!inbox.is_pending());
    assert!(!inbox.dir().join(CommandInbox::INPUT_FILE).exists());
    assert_eq!(inbox.poll().unwrap(), None);

    inbox.send("*").unwrap();
    assert_eq!(inbox.poll().unwrap(), Some(Command::Stop));
}

#[test]
fn test_inbox_ignores_input_without_lock() {
    let dir = tempfile::tempdir().unwrap();
    let inbox = CommandInbox::new(dir.path());

    fs::write(dir.path().join(CommandInbox::INPUT_FILE), "1").unwrap();
    assert_eq!(inbox.poll().unwrap(), None);

    fs::write(dir.path().join(CommandInbox::LOCK_FILE), "").unwrap();
    assert_eq!(inbox.poll().unwrap(), Some(Command::SelectNumber(1)));
}

#[test]
fn test_inbox_empty_input() {
    let dir = tempfile::tempdir().unwrap();
    let inbox = CommandInbox::new(dir.path());

    inbox.send("  \n").unwrap();
    assert_eq!(inbox.poll().unwrap(), None);
    assert!(!inbox.is_pending());
}
