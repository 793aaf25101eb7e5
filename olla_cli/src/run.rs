//! `run` and `self-check` commands.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use eyre::Result;
use olla_core::{
    BlinkIndicator, BlinkPattern, ControllerBuilder, ControllerCfg, ControllerContext,
    FaultIndicator, FileFaultLog, NoIndicator, SyncedWallClock, SystemWallClock,
};
use olla_traits::{Clock, MonotonicClock};
use serde_json::json;

use crate::board;

/// Build the controller from config and run it until `shutdown` is raised
/// or `for_secs` elapses.
pub fn run_controller(
    cfg: &olla_config::Config,
    shutdown: &AtomicBool,
    for_secs: Option<u64>,
    skip_warmup: bool,
    json: bool,
) -> Result<()> {
    let board = board::open(cfg)?;
    let clock: Arc<dyn Clock + Send + Sync> = Arc::new(MonotonicClock::new());

    let indicator: Box<dyn FaultIndicator + Send> = match board.led {
        Some((pin, out)) => Box::new(BlinkIndicator::spawn(
            out,
            pin,
            BlinkPattern::from(&cfg.indicator),
        )),
        None => Box::new(NoIndicator),
    };

    let builder = ControllerBuilder::new()
        .with_inputs(board.inputs)
        .with_outputs(board.outputs)
        .with_config(ControllerCfg::from(cfg))
        .with_clock(clock.clone())
        .with_fault_sink(FileFaultLog::new(&cfg.logging.fault_log))
        .with_indicator(indicator);
    let builder = match cfg.clock.start_at {
        Some(start) => {
            tracing::info!(%start, "wall clock set from config");
            builder.with_wall_clock(SyncedWallClock::new(clock, start))
        }
        None => builder.with_wall_clock(SystemWallClock),
    };
    let mut ctl = builder.build()?;

    if !skip_warmup {
        ctl.warm_up(shutdown);
    }
    let summary = ctl.run(shutdown, for_secs.map(Duration::from_secs));

    if json {
        println!(
            "{}",
            json!({
                "ticks": summary.ticks,
                "runs_completed": summary.runs_completed,
                "faults": summary.faults,
                "elapsed_s": summary.elapsed.as_secs_f64(),
            })
        );
    } else {
        println!(
            "stopped after {:.1}s: {} tick(s), {} run(s) completed, {} fault(s)",
            summary.elapsed.as_secs_f64(),
            summary.ticks,
            summary.runs_completed,
            summary.faults
        );
    }
    Ok(())
}

/// Open every pin, read each sensor once and drive every valve off.
pub fn self_check(cfg: &olla_config::Config, json: bool) -> Result<()> {
    let board = board::open(cfg)?;
    let backend = board.backend;
    let n = cfg.reservoir_count();
    let mut ctx = ControllerContext::new(board.inputs, board.outputs, n);

    let mut sensors = Vec::with_capacity(n);
    for (i, (&s, &v)) in cfg.pins.sensors.iter().zip(&cfg.pins.valves).enumerate() {
        ctx.write_valve(i, v, false)?;
        let raw = ctx.read_sensor(i, s)?;
        let wet = raw != cfg.pins.sensor_active_low;
        tracing::debug!(channel = i, pin = s, raw, wet, "sensor");
        sensors.push((i, s, v, wet));
    }

    if json {
        let channels: Vec<_> = sensors
            .iter()
            .map(|&(i, s, v, wet)| json!({"channel": i, "sensor_pin": s, "valve_pin": v, "wet": wet}))
            .collect();
        println!(
            "{}",
            json!({
                "status": "ok",
                "backend": backend,
                "reservoirs": n,
                "channels": channels,
                "valves_off": true,
            })
        );
    } else {
        println!("self-check ok ({backend}): {n} reservoir(s), all valves off");
        for (i, s, v, wet) in sensors {
            println!(
                "  channel {i}: sensor pin {s} {}, valve pin {v}",
                if wet { "wet" } else { "dry" }
            );
        }
    }
    Ok(())
}
