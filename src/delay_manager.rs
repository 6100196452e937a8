use std::thread;
use std::time::Duration;
use log::debug;
use rand::Rng;

/// Sleep a random duration inside the given bounds. Jitter keeps request
/// timing from forming a detectable pattern.
pub fn random_delay_ms(min_ms: u64, max_ms: u64) {
    if max_ms == 0 {
        return;
    }
    let mut rng = rand::thread_rng();
    let delay_ms = rng.gen_range(min_ms..=max_ms.max(min_ms));
    debug!("Waiting {} ms before next request...", delay_ms);
    thread::sleep(Duration::from_millis(delay_ms));
}

pub fn fixed_delay_ms(ms: u64) {
    if ms == 0 {
        return;
    }
    debug!("Pacing for {} ms...", ms);
    thread::sleep(Duration::from_millis(ms));
}
