#![no_main]
use libfuzzer_sys::fuzz_target;
use std::io::Write;

fuzz_target!(|data: &[u8]| {
    // The loader reads from a path, so round-trip through a scratch file.
    let path = std::env::temp_dir().join(format!("runout-fuzz-{}.csv", std::process::id()));
    let Ok(mut f) = std::fs::File::create(&path) else {
        return;
    };
    if f.write_all(data).is_err() {
        return;
    }
    drop(f);
    if let Ok(rows) = runout_config::load_trace_csv(&path) {
        assert!(rows.windows(2).all(|w| w[0].tick <= w[1].tick));
    }
});
