use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const CRATE_TARGET: &str = "contextual_reminders";

/// Installs the global subscriber for hosts that do not bring their own.
///
/// `CTXREMINDERS_LOG` (or `RUST_LOG`) overrides `level` when set.
pub fn init_tracing(level: Option<&str>, log_json: bool) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let level = level.unwrap_or("info");

    let filter = EnvFilter::try_from_env("CTXREMINDERS_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| {
            EnvFilter::new(if level.contains('=') {
                level.to_string()
            } else {
                format!("{}={}", CRATE_TARGET, level)
            })
        });

    let registry = tracing_subscriber::registry().with(filter);

    if log_json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr).with_ansi(false))
            .try_init()?;
    } else {
        registry
            .with(fmt::layer().compact().with_writer(std::io::stderr))
            .try_init()?;
    }

    Ok(())
}
