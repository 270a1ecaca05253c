use std::error::Error;
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use clap::Parser;
use log::{info, warn};
use serde_derive::{Deserialize, Serialize};
use signal_hook::consts::{SIGINT, SIGTERM};

use mailslot::{CancelToken, MailslotConfig, MailslotError, SlotRegistry};

const END_MARKER: &str = " 🐓 🏰 🥕 ";

#[derive(clap::Parser)]
#[clap()]
struct Opts {
    #[clap(short = 'c', long = "config", default_value = "mailslot-bench.toml")]
    config: String,
    #[clap(short = 's', long = "slot", default_value = "0")]
    slot: usize,
    #[clap(short = 'n', long = "messages", default_value = "1000000")]
    messages: usize,
    #[clap(long = "writers", default_value = "1")]
    writers: usize,
    #[clap(long = "readers", default_value = "1")]
    readers: usize,
}

#[derive(Default, Debug, Serialize, Deserialize)]
struct BenchConfig {
    mailslot: MailslotConfig,
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let opts: Opts = Opts::parse();
    let cfg: BenchConfig = confy::load_path(&opts.config)?;
    cfg.mailslot.slots.validate()?;
    info!("{:?}", &cfg.mailslot);

    let registry = Arc::new(SlotRegistry::with_config(&cfg.mailslot)?);
    registry.slot(opts.slot)?;

    let cancel = CancelToken::new();
    cancel.cancel_on_signals(&[SIGINT, SIGTERM])?;

    run(registry, &opts, &cancel)
}

#[inline]
fn copy(message: &str, buff: &mut [u8]) -> usize {
    buff[0..message.len()].clone_from_slice(message.as_bytes());
    message.len()
}

fn run(registry: Arc<SlotRegistry>, opts: &Opts, cancel: &CancelToken) -> Result<(), Box<dyn Error>> {
    let start = Instant::now();
    let writers = opts.writers.max(1);
    let readers = opts.readers.max(1);
    let per_writer = opts.messages / writers;

    let writer_threads: Vec<_> = (0..writers)
        .map(|w| {
            let registry = Arc::clone(&registry);
            let cancel = cancel.clone();
            let slot_id = opts.slot;
            thread::spawn(move || -> Result<usize, MailslotError> {
                let slot = registry.slot(slot_id)?;
                let buff = &mut [0u8; mailslot::ABSOLUTE_MAX_SEGMENT_SIZE];
                let mut called = 0usize;
                while called < per_writer {
                    let length = copy(&format!("{}-{}", w, called), buff);
                    match slot.write_cancellable(&buff[0..length], &cancel) {
                        Ok(_) => {}
                        // Non-blocking slots push the retry back onto the caller.
                        Err(MailslotError::WouldBlock) => {
                            thread::yield_now();
                            continue;
                        }
                        Err(e) => return Err(e),
                    }
                    called += 1;
                    if w == 0 && called % 100_000 == 0 {
                        eprint!("\rTotal {} ops written by writer 0", called);
                    }
                }
                Ok(called)
            })
        })
        .collect();

    let reader_threads: Vec<_> = (0..readers)
        .map(|_| {
            let registry = Arc::clone(&registry);
            let cancel = cancel.clone();
            let slot_id = opts.slot;
            thread::spawn(move || -> Result<usize, MailslotError> {
                let slot = registry.slot(slot_id)?;
                let buff = &mut [0u8; mailslot::ABSOLUTE_MAX_SEGMENT_SIZE];
                let mut called = 0usize;
                loop {
                    let length = match slot.read_into(buff, &cancel) {
                        Ok(length) => length,
                        Err(MailslotError::WouldBlock) => {
                            thread::yield_now();
                            continue;
                        }
                        Err(e) => return Err(e),
                    };
                    if &buff[0..length] == END_MARKER.as_bytes() {
                        return Ok(called);
                    }
                    called += 1;
                }
            })
        })
        .collect();

    let mut written = 0usize;
    for handle in writer_threads {
        match handle.join().map_err(|_| "writer thread panicked")? {
            Ok(n) => written += n,
            Err(MailslotError::Cancelled) => warn!("writer cancelled"),
            Err(e) => return Err(e.into()),
        }
    }

    let slot = registry.slot(opts.slot)?;
    let mut markers = 0;
    while markers < readers {
        match slot.write_cancellable(END_MARKER.as_bytes(), cancel) {
            Ok(_) => markers += 1,
            Err(MailslotError::WouldBlock) => thread::yield_now(),
            Err(e) => {
                warn!("end marker not delivered: {}", e);
                break;
            }
        }
    }

    let mut read = 0usize;
    for handle in reader_threads {
        match handle.join().map_err(|_| "reader thread panicked")? {
            Ok(n) => read += n,
            Err(MailslotError::Cancelled) => warn!("reader cancelled"),
            Err(e) => return Err(e.into()),
        }
    }

    let duration = start.elapsed();
    let iops = ((read as f64) / (duration.as_millis().max(1) as f64)) * 1_000f64;
    println!(
        "\n{:#?}K messages/s ({} written, {} read, {} writers, {} readers). Total time: {:#?}",
        (iops / 1000f64) as u64,
        written,
        read,
        writers,
        readers,
        duration
    );
    Ok(())
}
