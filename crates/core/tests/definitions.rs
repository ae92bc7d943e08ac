use trainpixels_core::{Definitions, Error, PathStep, Settings, Track, Utility, RGB8};

const SETTINGS: &str = r#"{
    "track_pixel_length": 41,
    "util_pixel_length": 43,
    "status_util_led": 42,
    "brightness": 0.3,
    "track_speed_modifier": 1.5,
    "random_util_trigger_chance": 0.01,
    "color_table": {
        "off": [0, 0, 0, 0.0],
        "white": [255, 255, 255, 1.0],
        "dim_white": [255, 255, 255, 0.5],
        "green": [0, 255, 0, 1.0],
        "yellow": [255, 255, 0, 1.0],
        "red": [255, 0, 0, 1.0]
    }
}"#;

fn utility(id: &str, led: usize, color: &str) -> Utility {
    let json = format!(
        r#"{{
            "id": "{id}",
            "name": "{id}",
            "enabled_on_init": false,
            "is_random": false,
            "utils": [{{"led": {led}, "color": "{color}"}}]
        }}"#
    );
    Utility::from_json(format!("{id}.json"), &json).unwrap()
}

#[test]
fn test_layout_documents() {
    let settings = Settings::from_json("settings.json", SETTINGS).unwrap();
    let track = Track::from_json(
        "main.json",
        r#"{
            "id": "main",
            "name": "Main line",
            "track_path": [
                [34, ["track_arrow_26"]], 35, [36, "track_arrow_26_off"], 37, 38
            ],
            "speed": 2.0
        }"#,
    )
    .unwrap();
    assert_eq!(track.trigger_count(), 2);
    assert_eq!(track.positions().collect::<Vec<_>>(), vec![34, 35, 36, 37, 38]);

    let definitions = Definitions::new(
        settings,
        vec![track],
        vec![
            utility("track_arrow_26", 26, "white"),
            // The `_off` variant is just another utility with its own colors.
            utility("track_arrow_26_off", 26, "off"),
        ],
    )
    .unwrap();

    let main = definitions.track("main").unwrap();
    assert_eq!(
        main.path[2],
        PathStep::AdvanceAndTrigger(36, vec!["track_arrow_26_off".into()])
    );
    assert_eq!(
        definitions.settings().track_delay(main.speed).unwrap().as_millis(),
        333
    );
    assert_eq!(
        definitions.palette().resolve("dim_white").unwrap(),
        RGB8::new(127, 127, 127)
    );
}

#[test]
fn test_custom_color_table_requires_off() {
    let mut settings = Settings::from_json("settings.json", SETTINGS).unwrap();
    settings.color_table.remove("off");

    let err = Definitions::new(
        settings,
        vec![Track::new("main", "Main", vec![PathStep::Advance(0)], 1.0)],
        vec![utility("lamp", 1, "white")],
    )
    .unwrap_err();
    assert!(matches!(err, Error::UnknownColor { name, .. } if name == "off"));
}

#[test]
fn test_status_colors_come_from_the_table() {
    let mut settings = Settings::from_json("settings.json", SETTINGS).unwrap();
    settings.color_table.remove("yellow");

    let err = Definitions::new(
        settings,
        vec![Track::new("main", "Main", vec![PathStep::Advance(0)], 1.0)],
        vec![utility("lamp", 1, "white")],
    )
    .unwrap_err();
    assert_eq!(
        err,
        Error::UnknownColor {
            name: "yellow".to_owned(),
            owner: "status_colors.warn".to_owned(),
        }
    );
}

#[test]
fn test_missing_required_field() {
    let err = Track::from_json(
        "main.json",
        r#"{"id": "main", "name": "Main", "speed": 1.0}"#,
    )
    .unwrap_err();
    assert!(matches!(err, Error::Json { origin, .. } if origin == "main.json"));

    let err = Utility::from_json("lamp.json", r#"{"id": "lamp", "utils": []}"#).unwrap_err();
    assert!(err.is_config());
}
