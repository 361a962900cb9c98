// Logging - tracing-subscriber on stderr so the report on stdout stays clean

use tracing_subscriber::EnvFilter;

/// Crates that are chatty at info/debug
const NOISY: &[(&str, &str)] = &[
    ("sqlx", "warn"),
    ("hyper", "warn"),
    ("reqwest", "warn"),
    ("h2", "warn"),
    ("rustls", "warn"),
];

/// `-v` → info, `-vv` → debug, `-vvv` → trace
pub fn level_for(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Filter from RUST_LOG when set, otherwise from the verbosity flag
pub fn build_env_filter(verbosity: u8) -> anyhow::Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }

    let mut directives = vec![level_for(verbosity).to_string()];
    for (target, level) in NOISY {
        directives.push(format!("{}={}", target, level));
    }

    let filter_str = directives.join(",");
    EnvFilter::try_new(&filter_str)
        .map_err(|e| anyhow::anyhow!("Invalid tracing filter '{}': {}", filter_str, e))
}

pub fn init(verbosity: u8) -> anyhow::Result<()> {
    let filter = build_env_filter(verbosity)?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))
}
