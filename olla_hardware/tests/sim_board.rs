use std::time::Duration;

use olla_hardware::SimBoard;
use olla_hardware::error::HwError;
use olla_traits::{DigitalInput, DigitalOutput};
use rstest::rstest;

#[rstest]
#[case::first_sensor(5, "read failed on pin 5")]
#[case::second_sensor(6, "read failed on pin 6")]
fn failing_read_names_its_pin(#[case] pin: u8, #[case] needle: &str) {
    let mut board = SimBoard::new().with_reservoir(5, 17, Duration::ZERO);
    board.fail_reads(pin, true);
    let err = board.read(pin).expect_err("injected failure");
    assert!(matches!(err.downcast_ref::<HwError>(), Some(HwError::ReadFailed(p)) if *p == pin));
    assert!(err.to_string().to_lowercase().contains(needle), "{err}");

    // Other pins are unaffected.
    let other = if pin == 5 { 6 } else { 5 };
    assert!(board.read(other).is_ok());
}

#[rstest]
#[case::open(true)]
#[case::close(false)]
fn failing_write_leaves_level_unchanged(#[case] level: bool) {
    let mut board = SimBoard::new();
    board.write(17, !level).unwrap();
    let before = board.write_count();

    board.fail_writes(17, true);
    let err = board.write(17, level).expect_err("injected failure");
    assert!(matches!(err.downcast_ref::<HwError>(), Some(HwError::WriteFailed(17))));
    assert_eq!(board.output(17), !level);
    assert_eq!(board.write_count(), before);

    board.fail_writes(17, false);
    board.write(17, level).unwrap();
    assert_eq!(board.output(17), level);
}

#[rstest]
#[case::never_opened(Duration::ZERO, false)]
#[case::opened_past_fill(Duration::from_millis(60), true)]
fn reservoir_reads_full_after_fill_time(#[case] open_for: Duration, #[case] full: bool) {
    let mut board = SimBoard::new().with_reservoir(5, 17, Duration::from_millis(40));
    if !open_for.is_zero() {
        board.write(17, true).unwrap();
        std::thread::sleep(open_for);
        board.write(17, false).unwrap();
    }
    assert_eq!(board.read(5).unwrap(), full);
}
