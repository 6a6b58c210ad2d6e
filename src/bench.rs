use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::time::Duration;

use parking_lot::{const_mutex, Mutex};

static BENCH_FILE: Mutex<Option<File>> = const_mutex(None);

pub fn init(path: &Path) -> std::io::Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)?;

    writeln!(
        file,
        "block_number,transaction_count,delta_count,fetch_ms,compute_ms,write_ms"
    )?;
    *BENCH_FILE.lock() = Some(file);

    Ok(())
}

/// Timings of one successfully processed block.
#[derive(Debug, Clone, Copy, Default)]
pub struct BlockTimings {
    pub fetch: Duration,
    pub compute: Duration,
    pub write: Duration,
}

pub fn record(block_number: u64, transaction_count: usize, delta_count: usize, timings: BlockTimings) {
    let mut guard = BENCH_FILE.lock();
    if let Some(f) = guard.as_mut() {
        let _ = writeln!(
            f,
            "{},{},{},{},{},{}",
            block_number,
            transaction_count,
            delta_count,
            timings.fetch.as_millis(),
            timings.compute.as_millis(),
            timings.write.as_millis()
        );
        let _ = f.flush();
    }
}
