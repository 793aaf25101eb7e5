//! `wiring-test`: open each valve in turn so pipework and relays can be
//! checked by eye, with the LED lit while any float switch reads wet.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use eyre::Result;
use olla_core::ControllerContext;
use olla_traits::{DigitalInput, DigitalOutput};

use crate::board;

/// Owns the pin banks for the duration of the test and drives every valve
/// and the LED low when dropped, including while unwinding.
struct Bench<I: DigitalInput, O: DigitalOutput> {
    ctx: ControllerContext<I, O>,
    valves: Vec<u8>,
    led: Option<(u8, Box<dyn DigitalOutput + Send>)>,
}

impl<I: DigitalInput, O: DigitalOutput> Bench<I, O> {
    fn set_led(&mut self, on: bool) {
        if let Some((pin, out)) = self.led.as_mut()
            && let Err(e) = out.write(*pin, on)
        {
            tracing::warn!(pin = *pin, on, error = %e, "LED write failed");
        }
    }
}

impl<I: DigitalInput, O: DigitalOutput> Drop for Bench<I, O> {
    fn drop(&mut self) {
        for (i, &pin) in self.valves.iter().enumerate() {
            if let Err(e) = self.ctx.write_valve(i, pin, false) {
                tracing::error!(channel = i, error = %e, "failed to close valve");
            }
        }
        self.set_led(false);
        tracing::info!("bench released; all valves off");
    }
}

pub fn wiring_test(
    cfg: &olla_config::Config,
    shutdown: &AtomicBool,
    cycles: u32,
    step_ms: u64,
) -> Result<()> {
    let board = board::open(cfg)?;
    let n = cfg.reservoir_count();
    let mut bench = Bench {
        ctx: ControllerContext::new(board.inputs, board.outputs, n),
        valves: cfg.pins.valves.clone(),
        led: board.led,
    };
    rotate(&mut bench, cfg, shutdown, cycles, Duration::from_millis(step_ms))?;
    drop(bench);
    println!("wiring test done; all valves off");
    Ok(())
}

fn rotate<I: DigitalInput, O: DigitalOutput>(
    bench: &mut Bench<I, O>,
    cfg: &olla_config::Config,
    shutdown: &AtomicBool,
    cycles: u32,
    step: Duration,
) -> Result<()> {
    let n = bench.valves.len();
    for cycle in 0..cycles {
        for active in 0..n {
            if shutdown.load(Ordering::Relaxed) {
                tracing::info!("wiring test interrupted");
                return Ok(());
            }
            // Close before opening so two valves are never open together.
            for i in (0..n).filter(|&i| i != active) {
                bench.ctx.drive_valve(i, bench.valves[i], false)?;
            }
            bench.ctx.drive_valve(active, bench.valves[active], true)?;

            let mut wet = Vec::with_capacity(n);
            for (i, &pin) in cfg.pins.sensors.iter().enumerate() {
                wet.push(bench.ctx.read_sensor(i, pin)? != cfg.pins.sensor_active_low);
            }
            bench.set_led(wet.iter().any(|&w| w));
            let levels: Vec<u8> = wet.iter().map(|&w| u8::from(w)).collect();
            println!(
                "cycle {cycle} valve {active} (pin {}) open; sensors {levels:?}",
                bench.valves[active]
            );
            std::thread::sleep(step);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use olla_hardware::SimBoard;

    #[test]
    fn bench_closes_valves_when_unwinding() {
        let board = SimBoard::new();
        let watch = board.clone();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let mut bench = Bench {
                ctx: ControllerContext::new(board.clone(), board.clone(), 2),
                valves: vec![17, 27],
                led: Some((25, Box::new(board.clone()) as Box<dyn DigitalOutput + Send>)),
            };
            bench.ctx.drive_valve(1, 27, true).unwrap();
            bench.set_led(true);
            assert_eq!(watch.outputs_high(), vec![25, 27]);
            panic!("stdout closed");
        }));
        assert!(result.is_err());
        assert!(watch.outputs_high().is_empty());
    }
}
