use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Install a global tracing subscriber for applications embedding the
/// plugin system.
///
/// The level comes from `RUST_LOG`, defaulting to `info`. Lifecycle
/// transitions log at `info`, list I/O at `debug`, ignored errors at `warn`
/// and escalated errors at `error`.
pub fn init() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let fmt_layer = fmt::layer()
        .with_target(true)
        .with_level(true)
        .compact();

    let filter_layer = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("info"))?;

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_is_safe_to_repeat() {
        let _ = init();
        assert!(init().is_err());
        tracing::info!("logging initialized");
    }
}
