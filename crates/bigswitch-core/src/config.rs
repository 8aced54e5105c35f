//! big-switch.toml configuration parser.

use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use std::str::FromStr;

use cron::Schedule;
use serde::Deserialize;

use crate::error::{ConfigError, ConfigResult};

pub const DEFAULT_POLLING_INTERVAL: Duration = Duration::from_secs(30);
pub const DEFAULT_ALERT_DURATION: Duration = Duration::from_secs(45);
pub const DEFAULT_FAILURE_COOLDOWN: Duration = Duration::from_secs(5);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_COLOR: u32 = 0x0000ff;
/// Upper bound for every configured duration.
pub const MAX_DURATION: Duration = Duration::from_secs(7 * 24 * 60 * 60);

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Cron expression at which the daemon shuts down so its supervisor
    /// restarts it. Unset disables the kill switch.
    pub restart_cron: Option<String>,
    pub release_manager: ReleaseManagerConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub services: Vec<ServiceConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReleaseManagerConfig {
    pub url: String,
    pub token: String,
    #[serde(default)]
    pub caller: String,
    pub timeout: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PipelineConfig {
    pub alert_duration: Option<String>,
    pub failure_cooldown: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub namespace: Option<String>,
    pub polling_interval: Option<String>,
    pub warmup: Option<String>,
    pub color: Option<u32>,
}

impl Config {
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        content.parse()
    }

    /// Check everything the daemon relies on before any task is spawned.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.release_manager.url.trim().is_empty() {
            return Err(ConfigError::Missing("release_manager.url"));
        }
        if self.release_manager.token.trim().is_empty() {
            return Err(ConfigError::Missing("release_manager.token"));
        }
        self.release_manager.request_timeout()?;
        self.restart_schedule()?;

        if self.pipeline.alert_duration()?.is_zero() {
            return Err(ConfigError::Duration {
                field: "pipeline.alert_duration".to_string(),
                value: self.pipeline.alert_duration.clone().unwrap_or_default(),
            });
        }
        self.pipeline.failure_cooldown()?;

        if self.services.is_empty() {
            return Err(ConfigError::Missing("services"));
        }

        let mut seen = HashSet::new();
        for (index, service) in self.services.iter().enumerate() {
            if service.name.trim().is_empty() {
                return Err(ConfigError::Service {
                    index,
                    reason: "name must be specified".to_string(),
                });
            }
            if !seen.insert(service.name.as_str()) {
                return Err(ConfigError::Service {
                    index,
                    reason: format!("duplicate service {:?}", service.name),
                });
            }
            if service.polling_interval()?.is_zero() {
                return Err(ConfigError::Service {
                    index,
                    reason: "polling_interval must be positive".to_string(),
                });
            }
            service.warmup()?;
        }
        Ok(())
    }

    /// The parsed kill-switch schedule, if one is configured.
    pub fn restart_schedule(&self) -> ConfigResult<Option<Schedule>> {
        match self.restart_cron.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(expr) => parse_cron(expr).map(Some),
        }
    }

    /// LED colour for a service, falling back to blue for unknown services.
    pub fn color_for(&self, service: &str) -> u32 {
        self.services
            .iter()
            .find(|s| s.name == service)
            .and_then(|s| s.color)
            .unwrap_or(DEFAULT_COLOR)
    }
}

impl std::str::FromStr for Config {
    type Err = ConfigError;

    fn from_str(s: &str) -> ConfigResult<Self> {
        let config: Config = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }
}

impl ReleaseManagerConfig {
    pub fn request_timeout(&self) -> ConfigResult<Duration> {
        duration_or(
            "release_manager.timeout",
            self.timeout.as_deref(),
            DEFAULT_REQUEST_TIMEOUT,
        )
    }
}

impl PipelineConfig {
    pub fn alert_duration(&self) -> ConfigResult<Duration> {
        duration_or(
            "pipeline.alert_duration",
            self.alert_duration.as_deref(),
            DEFAULT_ALERT_DURATION,
        )
    }

    pub fn failure_cooldown(&self) -> ConfigResult<Duration> {
        duration_or(
            "pipeline.failure_cooldown",
            self.failure_cooldown.as_deref(),
            DEFAULT_FAILURE_COOLDOWN,
        )
    }
}

impl ServiceConfig {
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref().filter(|ns| !ns.is_empty())
    }

    pub fn polling_interval(&self) -> ConfigResult<Duration> {
        duration_or(
            &format!("services.{}.polling_interval", self.name),
            self.polling_interval.as_deref(),
            DEFAULT_POLLING_INTERVAL,
        )
    }

    pub fn warmup(&self) -> ConfigResult<Duration> {
        duration_or(
            &format!("services.{}.warmup", self.name),
            self.warmup.as_deref(),
            Duration::ZERO,
        )
    }
}

fn duration_or(field: &str, value: Option<&str>, default: Duration) -> ConfigResult<Duration> {
    match value {
        None => Ok(default),
        Some(v) => parse_duration(v)
            .filter(|d| *d <= MAX_DURATION)
            .ok_or_else(|| ConfigError::Duration {
                field: field.to_string(),
                value: v.to_string(),
            }),
    }
}

/// Parse a cron expression. Five-field expressions (minute first) run at
/// second zero; six and seven-field expressions carry their own seconds.
pub fn parse_cron(expr: &str) -> ConfigResult<Schedule> {
    let expr = expr.trim();
    let normalized = if expr.split_whitespace().count() == 5 {
        format!("0 {expr}")
    } else {
        expr.to_string()
    };
    Schedule::from_str(&normalized).map_err(|e| ConfigError::Cron {
        value: expr.to_string(),
        reason: e.to_string(),
    })
}

/// Parse a duration string like "5s", "500ms", "1m". Bare numbers are seconds.
/// Values that overflow yield `None`.
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    if let Some(ms) = s.strip_suffix("ms") {
        ms.parse::<u64>().ok().map(Duration::from_millis)
    } else if let Some(secs) = s.strip_suffix('s') {
        secs.parse::<u64>().ok().map(Duration::from_secs)
    } else if let Some(mins) = s.strip_suffix('m') {
        mins.parse::<u64>()
            .ok()
            .and_then(|m| m.checked_mul(60))
            .map(Duration::from_secs)
    } else {
        s.parse::<u64>().ok().map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = r#"
[release_manager]
url = "http://release-manager.local"
token = "secret"
caller = "deployer@example.com"

[pipeline]
alert_duration = "30s"
failure_cooldown = "2s"

[[services]]
name = "payments"
namespace = "prod"
polling_interval = "10s"
color = 0x00ff00

[[services]]
name = "ledger"
"#;

    fn minimal(services: &str) -> String {
        format!(
            "[release_manager]\nurl = \"http://rm\"\ntoken = \"t\"\n{services}"
        )
    }

    #[test]
    fn parse_full() {
        let config: Config = FULL.parse().unwrap();
        assert_eq!(config.release_manager.caller, "deployer@example.com");
        assert_eq!(config.pipeline.alert_duration().unwrap(), Duration::from_secs(30));
        assert_eq!(config.pipeline.failure_cooldown().unwrap(), Duration::from_secs(2));
        assert_eq!(config.services.len(), 2);
        assert_eq!(config.services[0].namespace(), Some("prod"));
        assert_eq!(config.services[0].polling_interval().unwrap(), Duration::from_secs(10));
        assert_eq!(config.color_for("payments"), 0x00ff00);
    }

    #[test]
    fn defaults_apply() {
        let config: Config = minimal("[[services]]\nname = \"svc\"\n").parse().unwrap();
        let svc = &config.services[0];
        assert_eq!(svc.polling_interval().unwrap(), DEFAULT_POLLING_INTERVAL);
        assert_eq!(svc.warmup().unwrap(), Duration::ZERO);
        assert_eq!(svc.namespace(), None);
        assert_eq!(config.pipeline.alert_duration().unwrap(), DEFAULT_ALERT_DURATION);
        assert_eq!(config.pipeline.failure_cooldown().unwrap(), DEFAULT_FAILURE_COOLDOWN);
        assert_eq!(config.release_manager.request_timeout().unwrap(), DEFAULT_REQUEST_TIMEOUT);
        assert_eq!(config.color_for("svc"), DEFAULT_COLOR);
        assert_eq!(config.color_for("unknown"), DEFAULT_COLOR);
    }

    #[test]
    fn missing_token_rejected() {
        let err = "[release_manager]\nurl = \"http://rm\"\ntoken = \"\"\n[[services]]\nname = \"a\"\n"
            .parse::<Config>()
            .unwrap_err();
        assert!(matches!(err, ConfigError::Missing("release_manager.token")));
    }

    #[test]
    fn no_services_rejected() {
        let err = minimal("").parse::<Config>().unwrap_err();
        assert!(matches!(err, ConfigError::Missing("services")));
    }

    #[test]
    fn empty_service_name_rejected() {
        let err = minimal("[[services]]\nname = \"\"\n").parse::<Config>().unwrap_err();
        assert!(matches!(err, ConfigError::Service { index: 0, .. }));
    }

    #[test]
    fn duplicate_service_rejected() {
        let err = minimal("[[services]]\nname = \"a\"\n[[services]]\nname = \"a\"\n")
            .parse::<Config>()
            .unwrap_err();
        assert!(matches!(err, ConfigError::Service { index: 1, .. }));
    }

    #[test]
    fn zero_polling_interval_rejected() {
        let err = minimal("[[services]]\nname = \"a\"\npolling_interval = \"0s\"\n")
            .parse::<Config>()
            .unwrap_err();
        assert!(matches!(err, ConfigError::Service { index: 0, .. }));
    }

    #[test]
    fn bad_duration_rejected() {
        let err = minimal("[[services]]\nname = \"a\"\nwarmup = \"soon\"\n")
            .parse::<Config>()
            .unwrap_err();
        assert!(matches!(err, ConfigError::Duration { .. }));
    }

    #[test]
    fn from_file_reads_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big-switch.toml");
        std::fs::write(&path, FULL).unwrap();
        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.services[1].name, "ledger");

        let missing = Config::from_file(&dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(missing, ConfigError::Read(_)));
    }

    #[test]
    fn parse_duration_values() {
        assert_eq!(parse_duration("5s"), Some(Duration::from_secs(5)));
        assert_eq!(parse_duration("500ms"), Some(Duration::from_millis(500)));
        assert_eq!(parse_duration("2m"), Some(Duration::from_secs(120)));
        assert_eq!(parse_duration("10"), Some(Duration::from_secs(10)));
        assert_eq!(parse_duration("later"), None);
        assert_eq!(parse_duration("400000000000000000m"), None);
    }

    #[test]
    fn restart_cron_is_optional() {
        let config: Config = minimal("[[services]]\nname = \"a\"\n").parse().unwrap();
        assert!(config.restart_schedule().unwrap().is_none());

        let blank = format!("restart_cron = \"  \"\n{}", minimal("[[services]]\nname = \"a\"\n"));
        let config: Config = blank.parse().unwrap();
        assert!(config.restart_schedule().unwrap().is_none());
    }

    #[test]
    fn restart_cron_accepts_five_and_six_fields() {
        let five = format!("restart_cron = \"0 4 * * *\"\n{}", minimal("[[services]]\nname = \"a\"\n"));
        let config: Config = five.parse().unwrap();
        assert!(config.restart_schedule().unwrap().is_some());

        assert!(parse_cron("30 0 4 * * *").is_ok());
        assert!(parse_cron("@daily").is_ok());
    }

    #[test]
    fn bad_restart_cron_rejected_at_load() {
        let bad = format!("restart_cron = \"every night\"\n{}", minimal("[[services]]\nname = \"a\"\n"));
        let err = bad.parse::<Config>().unwrap_err();
        assert!(matches!(err, ConfigError::Cron { ref value, .. } if value == "every night"));

        assert!(matches!(parse_cron("61 4 * * *"), Err(ConfigError::Cron { .. })));
    }

    #[test]
    fn oversized_durations_rejected() {
        let err = minimal("[[services]]\nname = \"a\"\npolling_interval = \"18446744073709551615s\"\n")
            .parse::<Config>()
            .unwrap_err();
        assert!(matches!(err, ConfigError::Duration { ref field, .. } if field == "services.a.polling_interval"));

        let err = minimal("[pipeline]\nalert_duration = \"400000000000000000m\"\n[[services]]\nname = \"a\"\n")
            .parse::<Config>()
            .unwrap_err();
        assert!(matches!(err, ConfigError::Duration { .. }));

        let err = minimal("[[services]]\nname = \"a\"\nwarmup = \"8000000s\"\n")
            .parse::<Config>()
            .unwrap_err();
        assert!(matches!(err, ConfigError::Duration { .. }));

        let ok = minimal("[[services]]\nname = \"a\"\npolling_interval = \"604800s\"\n")
            .parse::<Config>()
            .unwrap();
        assert_eq!(ok.services[0].polling_interval().unwrap(), MAX_DURATION);
    }
}
