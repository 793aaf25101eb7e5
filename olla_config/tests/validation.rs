use std::fs;

use olla_config::{load_file, load_toml};
use rstest::rstest;
use tempfile::tempdir;

const VALID: &str = r#"
[pins]
valves = [9, 8, 7, 6]
sensors = [5, 4, 3, 2]
led = 25

[sensing]
interval_ms = 100
samples_empty = 200
samples_full = 20
threshold_empty = 0.1
threshold_full = 0.9

[schedule]
shift_hours = 8.0
window_length_hours = 2.0

[fill]
overfill_time_s = [30, 30, 30, 30]
max_fill_time_s = [600, 600, 600, 600]

[controller]
tick_ms = 10

[indicator]
fault_blink_s = 30
on_ms = 100
off_ms = 2000

[logging]
level = "info"
rotation = "daily"
fault_log = "faults.log"
"#;

#[test]
fn accepts_full_config() {
    let cfg = load_toml(VALID).expect("parse TOML");
    cfg.validate().expect("valid config should pass");
    assert_eq!(cfg.reservoir_count(), 4);
    assert_eq!(cfg.pins.led, Some(25));
}

#[rstest]
#[case("samples_full = 20", "samples_full = 1", "samples_full must be >= 2")]
#[case("samples_empty = 200", "samples_empty = 0", "samples_empty must be >= 2")]
#[case("interval_ms = 100", "interval_ms = 0", "interval_ms must be >= 1")]
#[case("threshold_empty = 0.1", "threshold_empty = 0.95", "threshold_empty must be <")]
#[case("threshold_full = 0.9", "threshold_full = 1.5", "threshold_full must be in")]
#[case("shift_hours = 8.0", "shift_hours = 24.0", "shift_hours must be in")]
#[case("window_length_hours = 2.0", "window_length_hours = -1.0", "window_length_hours must be >= 0")]
#[case("sensors = [5, 4, 3, 2]", "sensors = [5, 4, 3]", "pins.sensors has 3 entries")]
#[case("sensors = [5, 4, 3, 2]", "sensors = [5, 4, 3, 9]", "pin 9 is assigned more than once")]
#[case("led = 25", "led = 2", "pin 2 is assigned more than once")]
#[case("overfill_time_s = [30, 30, 30, 30]", "overfill_time_s = [30]", "overfill_time_s has 1 entries")]
#[case("max_fill_time_s = [600, 600, 600, 600]", "max_fill_time_s = [600, 0, 600, 600]", "max_fill_time_s[1] must be >= 1")]
#[case("tick_ms = 10", "tick_ms = 0", "tick_ms must be >= 1")]
#[case("rotation = \"daily\"", "rotation = \"weekly\"", "logging.rotation must be one of")]
#[case("off_ms = 2000", "off_ms = 0", "indicator.on_ms and indicator.off_ms")]
fn rejects_invalid_values(#[case] from: &str, #[case] to: &str, #[case] needle: &str) {
    let text = VALID.replace(from, to);
    assert_ne!(text, VALID, "replacement {from:?} did not apply");
    let cfg = load_toml(&text).expect("parse TOML");
    let err = cfg.validate().expect_err("should be rejected");
    assert!(
        format!("{err}").contains(needle),
        "error {err} does not mention {needle:?}"
    );
}

#[test]
fn window_past_midnight_is_rejected_explicitly() {
    let text = VALID
        .replace("shift_hours = 8.0", "shift_hours = 22.0")
        .replace("window_length_hours = 2.0", "window_length_hours = 4.0");
    let cfg = load_toml(&text).expect("parse TOML");
    let err = cfg.validate().expect_err("wraparound is not supported");
    assert!(format!("{err}").contains("do not wrap past midnight"));
}

#[test]
fn zero_length_window_is_valid() {
    let text = VALID.replace("window_length_hours = 2.0", "window_length_hours = 0.0");
    let cfg = load_toml(&text).expect("parse TOML");
    cfg.validate().expect("zero-length window disables watering but is valid");
}

#[test]
fn missing_required_section_fails_to_parse() {
    let text = VALID.replace("[fill]", "[fill_times]");
    assert!(load_toml(&text).is_err());
}

#[test]
fn load_file_reads_and_validates() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("olla.toml");
    fs::write(&path, VALID).unwrap();
    let cfg = load_file(&path).expect("load");
    assert_eq!(cfg.logging.fault_log, "faults.log");

    fs::write(&path, VALID.replace("tick_ms = 10", "tick_ms = 0")).unwrap();
    assert!(load_file(&path).is_err());

    let missing = dir.path().join("nope.toml");
    let err = load_file(&missing).expect_err("missing file");
    assert!(format!("{err}").contains("read config"));
}

#[test]
fn sensing_overrides_apply_to_one_reservoir() {
    let text = format!(
        "{VALID}\n[[sensing.reservoir]]\nindex = 2\nsamples_empty = 50\nthreshold_empty = 0.2\n"
    );
    let cfg = load_toml(&text).expect("parse TOML");
    cfg.validate().expect("override is valid");

    let third = cfg.sensing.for_reservoir(2);
    assert_eq!(third.samples_empty, 50);
    assert!((third.threshold_empty - 0.2).abs() < f32::EPSILON);
    assert_eq!(third.samples_full, 20);
    assert_eq!(third.interval_ms, 100);

    let first = cfg.sensing.for_reservoir(0);
    assert_eq!(first.samples_empty, 200);
}

#[rstest]
#[case("index = 4", "index 4 is out of range")]
#[case("index = 1\nsamples_full = 1", "sensing.reservoir[1].samples_full must be >= 2")]
#[case("index = 0\nthreshold_full = 0.05", "sensing.reservoir[0].threshold_empty must be <")]
fn rejects_invalid_sensing_overrides(#[case] table: &str, #[case] needle: &str) {
    let text = format!("{VALID}\n[[sensing.reservoir]]\n{table}\n");
    let cfg = load_toml(&text).expect("parse TOML");
    let err = cfg.validate().expect_err("should be rejected");
    assert!(format!("{err}").contains(needle), "error {err} does not mention {needle:?}");
}

#[test]
fn duplicate_sensing_override_is_rejected() {
    let text = format!(
        "{VALID}\n[[sensing.reservoir]]\nindex = 1\n\n[[sensing.reservoir]]\nindex = 1\n"
    );
    let err = load_toml(&text).unwrap().validate().expect_err("duplicate");
    assert!(format!("{err}").contains("listed more than once"));
}

#[test]
fn unknown_override_key_fails_to_parse() {
    let text = format!("{VALID}\n[[sensing.reservoir]]\nindex = 1\ninterval_ms = 5\n");
    assert!(load_toml(&text).is_err());
}
