//! Tracing subscriber setup

use tracing_subscriber::EnvFilter;

/// Crate target used when a bare level is given
const CRATE_TARGET: &str = "holdtalk";

/// Pick the filter directive: `--log-level`, then `RUST_LOG`, then the config value
pub fn filter_directive(flag: Option<&str>, env: Option<&str>, config: &str) -> String {
    let chosen = flag
        .filter(|s| !s.trim().is_empty())
        .or_else(|| env.filter(|s| !s.trim().is_empty()))
        .unwrap_or(config);
    scoped(chosen.trim())
}

/// A bare level ("debug") applies to this crate only; full directives pass through
fn scoped(directive: &str) -> String {
    if directive.is_empty() {
        return format!("{}=info", CRATE_TARGET);
    }
    if directive.contains('=') || directive.contains(',') {
        directive.to_string()
    } else {
        format!("{}={}", CRATE_TARGET, directive)
    }
}

/// Install the stderr fmt subscriber. Safe to call more than once.
pub fn init_logging(flag: Option<&str>, config_level: &str) {
    let env = std::env::var("RUST_LOG").ok();
    let directive = filter_directive(flag, env.as_deref(), config_level);
    let filter = EnvFilter::try_new(&directive)
        .unwrap_or_else(|_| EnvFilter::new(format!("{}=info", CRATE_TARGET)));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
