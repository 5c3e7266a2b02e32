use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::engine::CostAttribution;
use crate::error::PnlError;
use crate::report::OutputFormat;

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub pnl: PnlConfig,
    pub output: OutputConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PnlConfig {
    pub cost_attribution: CostAttribution,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    pub format: OutputFormat,
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            format: "text".to_string(),
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config, PnlError> {
    let contents = fs::read_to_string(path).map_err(|err| {
        PnlError::Config(format!("failed to read config {}: {}", path.display(), err))
    })?;
    toml::from_str(&contents)
        .map_err(|err| PnlError::Config(format!("failed to parse TOML {}: {}", path.display(), err)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_full_config() {
        let config: Config = toml::from_str(
            r#"
[pnl]
cost_attribution = "opening_only"

[output]
format = "json"

[logging]
level = "debug"
format = "json"
"#,
        )
        .expect("config should parse");
        assert_eq!(config.pnl.cost_attribution, CostAttribution::OpeningOnly);
        assert_eq!(config.output.format, OutputFormat::Json);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, "json");
    }

    #[test]
    fn empty_config_uses_defaults() {
        let config: Config = toml::from_str("").expect("empty config should parse");
        assert_eq!(config.pnl.cost_attribution, CostAttribution::RoundTrip);
        assert_eq!(config.output.format, OutputFormat::Text);
        assert_eq!(config.logging.level, "warn");
    }

    #[test]
    fn unknown_policy_is_rejected() {
        let parsed = toml::from_str::<Config>("[pnl]\ncost_attribution = \"both\"\n");
        assert!(parsed.is_err());
    }

    #[test]
    fn load_config_missing_file_returns_error() {
        let path = Path::new("/tmp/fill-pnl-missing-config.toml");
        let err = load_config(path).expect_err("expected load to fail");
        assert!(err.to_string().contains("failed to read config"));
    }
}
