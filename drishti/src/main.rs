//! Drishti - object estimation daemon
//!
//! ## Threads
//!
//! - **main**: accepts inbound producer connections (frame notifications,
//!   detection sets) and spawns one `tcp-receiver` thread per connection
//! - **pipeline**: runs every estimation cycle, woken by inbound messages or
//!   the range-array poll tick
//! - **tcp-publisher**: broadcasts published objects to subscribers

use clap::Parser;
use crossbeam_channel::{Receiver, select};
use drishti::acquisition::ShmDirectory;
use drishti::config::AppConfig;
use drishti::error::{Error, Result};
use drishti::pipeline::Pipeline;
use drishti::publish::ObjectSink;
use drishti::streaming::{BusMessage, TcpPublisher, TcpReceiver, create_serializer};
use std::net::TcpListener;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

/// Inbound messages buffered between receivers and the pipeline
const INBOUND_QUEUE_DEPTH: usize = 256;

/// Object estimation daemon for camera and ranging-array sensors
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "/etc/drishti.toml")]
    config: String,

    /// Log every published object (overrides the config file)
    #[arg(short, long)]
    debug: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = AppConfig::from_file(&args.config)?;
    config.debug |= args.debug;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(config.log_filter()))
        .init();

    log::info!("Drishti v{} starting...", env!("CARGO_PKG_VERSION"));
    log::info!("Using config: {}", args.config);

    let running = Arc::new(AtomicBool::new(true));
    let r = Arc::clone(&running);
    ctrlc::set_handler(move || {
        log::info!("Received shutdown signal");
        r.store(false, Ordering::Relaxed);
    })
    .map_err(|e| Error::Other(format!("Error setting Ctrl-C handler: {}", e)))?;

    let serializer = create_serializer(config.network.wire_format);
    log::info!("Wire format: {:?}", config.network.wire_format);

    let publisher = Arc::new(TcpPublisher::new(&config.network.outbound_address, serializer)?);

    let shm = Arc::new(ShmDirectory::new(&config.camera.shm_dir));
    log::info!("Frame segments under {}", shm.root().display());
    let mut pipeline = Pipeline::from_config(&config, shm, Arc::clone(&publisher))?;
    pipeline.set_up()?;

    let poll_interval = config
        .range_array
        .as_ref()
        .map(|r| Duration::from_millis(r.poll_interval_ms.max(1)));

    let (tx, rx) = crossbeam_channel::bounded::<BusMessage>(INBOUND_QUEUE_DEPTH);

    let pipeline_running = Arc::clone(&running);
    let pipeline_handle = thread::Builder::new()
        .name("pipeline".to_string())
        .spawn(move || run_pipeline(pipeline, rx, poll_interval, pipeline_running))
        .map_err(|e| Error::Other(format!("Failed to spawn pipeline thread: {}", e)))?;

    let bind_addr = &config.network.inbound_address;
    let listener = TcpListener::bind(bind_addr)
        .map_err(|e| Error::Other(format!("Failed to bind to {}: {}", bind_addr, e)))?;
    if let Err(e) = listener.set_nonblocking(true) {
        log::warn!("Failed to set nonblocking mode: {}", e);
    }

    log::info!("Accepting producers on {}", bind_addr);
    log::info!("Drishti running. Press Ctrl-C to stop.");

    while running.load(Ordering::Relaxed) {
        match listener.accept() {
            Ok((stream, addr)) => {
                if let Err(e) = stream.set_nonblocking(false) {
                    log::error!("Failed to set socket to blocking mode: {}", e);
                    continue;
                }
                log::info!("Producer connected: {}", addr);

                let mut receiver = TcpReceiver::new(serializer, tx.clone(), Arc::clone(&running));
                let spawned = thread::Builder::new()
                    .name("tcp-receiver".to_string())
                    .spawn(move || {
                        if let Err(e) = receiver.run(stream) {
                            log::error!("TCP receiver error: {}", e);
                        }
                        log::info!("Producer disconnected: {}", addr);
                    });
                if let Err(e) = spawned {
                    log::error!("Failed to spawn receiver for {}: {}", addr, e);
                }
            }
            Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                thread::sleep(Duration::from_millis(10));
            }
            Err(e) => {
                log::error!("Accept error: {}", e);
            }
        }
    }

    log::info!("Shutting down...");
    drop(tx);
    if pipeline_handle.join().is_err() {
        log::error!("Pipeline thread panicked");
    }
    publisher.stop();

    log::info!("Drishti stopped ({} objects dropped by publisher)", publisher.dropped());
    Ok(())
}

/// Pipeline thread: one cycle per inbound message or poll tick
fn run_pipeline<S: ObjectSink>(
    mut pipeline: Pipeline<S>,
    inbound: Receiver<BusMessage>,
    poll_interval: Option<Duration>,
    running: Arc<AtomicBool>,
) {
    let ticker = match poll_interval {
        Some(interval) => crossbeam_channel::tick(interval),
        None => crossbeam_channel::never(),
    };

    while running.load(Ordering::Relaxed) {
        select! {
            recv(inbound) -> message => {
                match message {
                    Ok(message) => {
                        pipeline.handle(message);
                    }
                    Err(_) => break,
                }
            }
            recv(ticker) -> _ => {
                pipeline.poll_ranges();
            }
            // Timeout to allow checking the running flag
            default(Duration::from_millis(100)) => {}
        }
    }

    pipeline.tear_down();
}
