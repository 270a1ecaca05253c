use std::thread;
use std::time::{Duration, Instant};


/// Polls `cond` until it holds, failing the test after a few seconds.
fn wait_until<F: FnMut() -> bool>(what: &str, mut cond: F) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !cond() {
        if Instant::now() > deadline {
            panic!("timed out waiting for {}", what);
        }
        thread::sleep(Duration::from_millis(2));
    }
}
