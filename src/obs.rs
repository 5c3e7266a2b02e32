use crate::error::PnlError;

/// Environment variable that overrides the configured log filter.
pub const LOG_ENV: &str = "FILL_PNL_LOG";

/// Installs the global subscriber. Logs go to stderr so stdout carries only
/// the report.
pub fn init_tracing(log_level: &str, log_format: &str) -> Result<(), PnlError> {
    let filter = std::env::var(LOG_ENV).unwrap_or_else(|_| log_level.to_string());
    let env_filter = tracing_subscriber::EnvFilter::try_new(filter)
        .map_err(|err| PnlError::Config(format!("invalid log filter: {err}")))?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr);

    match log_format.trim().to_lowercase().as_str() {
        "json" => builder.json().init(),
        "text" => builder.init(),
        other => {
            return Err(PnlError::Config(format!(
                "unsupported log format: {other} (expected text or json)"
            )))
        }
    }
    Ok(())
}
