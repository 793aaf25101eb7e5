//! `olla` command-line entry point.

mod board;
mod cli;
mod error_fmt;
mod logging;
mod run;
mod wiring;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use eyre::{Result, WrapErr};
use olla_core::{BlinkIndicator, BlinkPattern, FaultIndicator, NoIndicator, OllaError};

use crate::cli::{Cli, Commands, JSON_MODE};
use crate::error_fmt::{exit_code_for_error, format_error_json, humanize};

fn main() {
    let _ = color_eyre::install();
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);

    let code = match real_main(&cli) {
        Ok(()) => 0,
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "olla failed");
            if JSON_MODE.get().copied().unwrap_or(false) {
                eprintln!("{}", format_error_json(&e));
            } else {
                eprintln!("{}", humanize(&e));
            }
            exit_code_for_error(&e)
        }
    };
    std::process::exit(code);
}

fn real_main(cli: &Cli) -> Result<()> {
    let cfg = match olla_config::load_file(&cli.config) {
        Ok(cfg) => cfg,
        Err(e) => {
            // Console-only logging so the failure is visible.
            let _ = logging::init(cli, None);
            return config_failure(cli, &e);
        }
    };
    logging::init(cli, Some(&cfg.logging))?;
    tracing::info!(
        config = %cli.config.display(),
        reservoirs = cfg.reservoir_count(),
        "config loaded"
    );

    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let flag = shutdown.clone();
        ctrlc::set_handler(move || {
            flag.store(true, Ordering::SeqCst);
        })
        .wrap_err("install signal handler")?;
    }

    match &cli.cmd {
        Commands::Run {
            for_secs,
            skip_warmup,
        } => run::run_controller(&cfg, &shutdown, *for_secs, *skip_warmup, cli.json),
        Commands::SelfCheck => run::self_check(&cfg, cli.json),
        Commands::WiringTest { cycles, step_ms } => {
            wiring::wiring_test(&cfg, &shutdown, *cycles, *step_ms)
        }
    }
}

/// No safe default exists for a broken config: either exit with code 2, or
/// report and blink the fault LED until power-cycled.
fn config_failure(cli: &Cli, e: &eyre::Report) -> Result<()> {
    let err = eyre::Report::new(OllaError::Config(format!("{e:#}")));
    if cli.exit_on_config_error {
        return Err(err);
    }
    tracing::error!(error = %format!("{e:#}"), "configuration error; blinking fault LED until restart");
    eprintln!("{}", humanize(&err));

    let pin = board::led_pin_hint(&cli.config);
    let out = pin.and_then(board::open_led);
    let indicator: Box<dyn FaultIndicator> = match (pin, out) {
        (Some(pin), Some(out)) => Box::new(BlinkIndicator::spawn(out, pin, BlinkPattern::default())),
        _ => Box::new(NoIndicator),
    };
    indicator.arm(true);
    Ok(())
}
