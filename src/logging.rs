use std::io;

use tracing_subscriber::EnvFilter;

/// Environment variable that overrides every other log setting
pub const LOG_ENV: &str = "GOREV_TREE_LOG";

/// Filter directive for a `-v` count, falling back to the config file's
/// `[logging] level` and then to warnings only.
pub fn directive(verbosity: u8, config_level: Option<&str>) -> String {
    match verbosity {
        0 => config_level.unwrap_or("warn").to_string(),
        1 => "gorev_tree=info".to_string(),
        2 => "gorev_tree=debug".to_string(),
        _ => "gorev_tree=trace".to_string(),
    }
}

/// Install the global subscriber. Logs go to stderr so stdout carries only
/// the rendered tree or JSON.
pub fn init(verbosity: u8, config_level: Option<&str>) {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(directive(verbosity, config_level)));

    // A second init (tests, embedding) keeps the first subscriber
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(verbosity > 1)
        .with_writer(io::stderr)
        .try_init();
}
