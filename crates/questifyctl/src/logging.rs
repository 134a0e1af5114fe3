//! Logging setup for questifyctl
//!
//! Filter priority:
//! 1. $QUESTIFY_LOG (any tracing-subscriber EnvFilter directive)
//! 2. -v / -vv on the command line
//! 3. [logging] level from the config file
//!
//! Logs go to stderr so stdout stays clean for --json output.

use tracing_subscriber::EnvFilter;

/// Environment variable holding a filter directive
pub const LOG_ENV: &str = "QUESTIFY_LOG";

/// Pick the filter directive for this invocation
pub fn filter_directive(env_value: Option<&str>, verbose: u8, configured: &str) -> String {
    if let Some(directive) = env_value.filter(|v| !v.trim().is_empty()) {
        return directive.to_string();
    }
    match verbose {
        0 => configured.to_string(),
        1 => "info".to_string(),
        _ => "debug".to_string(),
    }
}

/// Install the global subscriber. Safe to call more than once.
pub fn init(verbose: u8, configured: &str) {
    let env_value = std::env::var(LOG_ENV).ok();
    let directive = filter_directive(env_value.as_deref(), verbose, configured);
    let filter = EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new("warn"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
