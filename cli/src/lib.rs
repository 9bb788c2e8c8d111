//! Command line surface of codescope.

mod codebase_cmd;
mod settings;

pub use codebase_cmd::Cli;
pub use codebase_cmd::Command;
pub use settings::SETTINGS_FILE_NAME;
pub use settings::Settings;

use log::LevelFilter;

/// Installs `env_logger` on stderr: `RUST_LOG` wins, else `info`, and
/// `verbose` forces `debug`.
pub fn init_logging(verbose: bool) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if verbose {
        builder.filter_level(LevelFilter::Debug);
    }
    builder.format_timestamp(None).format_target(false);
    let _ = builder.try_init();
}
