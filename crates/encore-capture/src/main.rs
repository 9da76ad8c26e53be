mod hook;
mod keymap;

use std::io::Read;
use std::path::PathBuf;

use clap::Parser;
use encore_core::store::EventStore;
use tracing::Level;

/// Capture worker: subscribes to the system-wide input hook and appends
/// every observed event to the session log. Spawned by the controller with
/// a piped stdin; EOF on that pipe is the shutdown request.
#[derive(Parser)]
#[command(name = "encore-capture", version)]
struct Args {
    /// Path of the session's JSONL event log.
    output: PathBuf,
}

fn main() -> anyhow::Result<()> {
    // Stderr only — stdin belongs to the shutdown protocol and stdout stays
    // quiet so the controller never has to drain it.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(Level::INFO)
        .compact()
        .init();

    let args = Args::parse();
    let store = EventStore::new(&args.output);
    tracing::info!(output = %store.path().display(), "capture worker starting");

    hook::run(store)
}

/// Block until the controller closes our stdin.
pub(crate) fn wait_for_shutdown_request() {
    let mut stdin = std::io::stdin();
    let mut buf = [0u8; 64];
    loop {
        match stdin.read(&mut buf) {
            Ok(0) | Err(_) => break,
            Ok(_) => {} // nothing meaningful arrives on stdin; keep draining
        }
    }
    tracing::info!("shutdown request received (stdin closed)");
}
