// autopatch/src/logger.rs
//! Logger initialization for the CLI.
//!
//! `--quiet` silences everything, `--debug` forces debug-level output, and
//! otherwise `RUST_LOG` is honored with an informational default.

use log::LevelFilter;

pub fn init(quiet: bool, debug: bool) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));

    if quiet {
        builder.filter_level(LevelFilter::Off);
    } else if debug {
        builder.filter_level(LevelFilter::Debug);
    }

    builder.format_timestamp(None);
    // Ignore double-initialization so tests can call this freely.
    let _ = builder.try_init();
}
