//! # Tally Station Entry Point
//!
//! ```bash
//! tally-station                          # default config location
//! tally-station --config ./station.toml  # explicit config file
//! RUST_LOG=tally_sync=trace tally-station
//! ```

use std::path::PathBuf;

#[tokio::main]
async fn main() {
    if let Err(e) = tally_station::run(config_path()).await {
        eprintln!("tally-station: {e}");
        std::process::exit(e.exit_code());
    }
}

fn config_path() -> Option<PathBuf> {
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--config" {
            return args.next().map(PathBuf::from);
        }
    }
    None
}
