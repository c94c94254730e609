#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Parse errors and validation errors are both fine; panics are not.
    if let Ok(cfg) = runout_config::load_toml(data) {
        let _ = cfg.validate();
        for i in 0..cfg.monitor.extruder_count.min(16) {
            let _ = cfg.sensor(i);
        }
    }
});
