use olla_core::error::BuildError;
use olla_core::{ChannelCfg, ControllerBuilder, ControllerCfg, LevelCfg};
use olla_hardware::SimBoard;
use rstest::rstest;

fn one_channel() -> ControllerCfg {
    ControllerCfg {
        channels: vec![ChannelCfg {
            sensor_pin: 5,
            valve_pin: 9,
            level: LevelCfg::default(),
            overfill_ms: 5_000,
            max_fill_ms: 60_000,
        }],
        ..ControllerCfg::default()
    }
}

fn build_err(cfg: Option<ControllerCfg>) -> eyre::Report {
    let b = ControllerBuilder::new()
        .with_inputs(SimBoard::new())
        .with_outputs(SimBoard::new());
    let b = match cfg {
        Some(c) => b.with_config(c),
        None => b,
    };
    b.build().expect_err("build should fail")
}

#[rstest]
fn missing_config_yields_typed_build_error() {
    let err = build_err(None);
    match err.downcast_ref::<BuildError>() {
        Some(BuildError::MissingConfig) => {}
        other => panic!("expected MissingConfig, got: {other:?}"),
    }
}

#[rstest]
fn empty_channel_list_is_rejected() {
    let err = build_err(Some(ControllerCfg::default()));
    assert!(matches!(
        err.downcast_ref::<BuildError>(),
        Some(BuildError::NoChannels)
    ));
}

#[rstest]
#[case::zero_tick(|c: &mut ControllerCfg| c.tick_ms = 0, "tick_ms")]
#[case::zero_interval(|c: &mut ControllerCfg| c.channels[0].level.interval_ms = 0, "interval_ms")]
#[case::short_window(|c: &mut ControllerCfg| c.channels[0].level.samples_full = 1, "sample windows")]
#[case::threshold_range(|c: &mut ControllerCfg| c.channels[0].level.threshold_full = 1.5, "[0, 1]")]
#[case::threshold_order(|c: &mut ControllerCfg| c.channels[0].level.threshold_empty = 0.95, "threshold_empty")]
#[case::zero_max_fill(|c: &mut ControllerCfg| c.channels[0].max_fill_ms = 0, "max_fill_ms")]
#[case::shared_pin(|c: &mut ControllerCfg| c.channels[0].valve_pin = 5, "distinct")]
#[case::nan_schedule(|c: &mut ControllerCfg| c.schedule.shift_hours = f64::NAN, "finite")]
fn invalid_configs_are_rejected(#[case] tweak: fn(&mut ControllerCfg), #[case] needle: &str) {
    let mut cfg = one_channel();
    tweak(&mut cfg);
    let err = build_err(Some(cfg));
    match err.downcast_ref::<BuildError>() {
        Some(BuildError::InvalidConfig(msg)) => {
            assert!(msg.contains(needle), "{msg:?} should mention {needle:?}");
        }
        other => panic!("expected InvalidConfig, got: {other:?}"),
    }
}

#[rstest]
fn valid_config_builds() {
    let ctl = ControllerBuilder::new()
        .with_inputs(SimBoard::new())
        .with_outputs(SimBoard::new())
        .with_config(one_channel())
        .build()
        .expect("valid config");
    assert_eq!(ctl.channels().len(), 1);
    assert_eq!(ctl.warm_up_duration().as_secs(), 20);
}
