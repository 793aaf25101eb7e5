#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Parsing and validation may reject input but must never panic.
    let Ok(cfg) = olla_config::load_toml(data) else {
        return;
    };
    if cfg.validate().is_ok() {
        // A validated config always converts to a runtime config with one
        // channel per reservoir.
        let rt = olla_core::ControllerCfg::from(&cfg);
        assert_eq!(rt.channels.len(), cfg.reservoir_count());
    }
});
