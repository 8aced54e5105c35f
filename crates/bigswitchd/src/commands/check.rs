//! `bigswitchd check-config` — validate a config file without contacting anything.

use std::path::Path;

use anyhow::Result;

use bigswitch_core::Config;

pub fn run(path: &Path) -> Result<()> {
    let config = super::load_config(path)?;
    for line in summarize(&config)? {
        println!("{line}");
    }
    Ok(())
}

fn summarize(config: &Config) -> Result<Vec<String>> {
    let mut lines = vec![
        format!("release manager  {}", config.release_manager.url),
        format!("caller           {}", config.release_manager.caller),
        format!("request timeout  {:?}", config.release_manager.request_timeout()?),
        format!("alert duration   {:?}", config.pipeline.alert_duration()?),
        format!("failure cooldown {:?}", config.pipeline.failure_cooldown()?),
    ];
    for service in &config.services {
        lines.push(format!(
            "service {:<16} namespace={} every {:?} warmup {:?} color #{:06x}",
            service.name,
            service.namespace().unwrap_or("-"),
            service.polling_interval()?,
            service.warmup()?,
            config.color_for(&service.name),
        ));
    }
    Ok(lines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const VALID: &str = r#"
[release_manager]
url = "http://release-manager.local/api"
token = "arst"
caller = "me@local.com"

[pipeline]
alert_duration = "30s"

[[services]]
name = "payments"
namespace = "prod"
polling_interval = "10s"
color = 0x00ff00

[[services]]
name = "ledger"
"#;

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn valid_config_passes() {
        let file = write_config(VALID);
        run(file.path()).unwrap();
    }

    #[test]
    fn summary_lists_services_with_defaults() {
        let config: Config = VALID.parse().unwrap();
        let lines = summarize(&config).unwrap();

        assert!(lines.contains(&"alert duration   30s".to_string()));
        assert!(lines.contains(&"failure cooldown 5s".to_string()));
        assert!(lines.iter().any(|l| l.starts_with("service payments")
            && l.contains("namespace=prod")
            && l.contains("every 10s")
            && l.ends_with("color #00ff00")));
        assert!(lines.iter().any(|l| l.starts_with("service ledger")
            && l.contains("namespace=-")
            && l.contains("every 30s")
            && l.ends_with("color #0000ff")));
    }

    #[test]
    fn missing_token_is_reported_with_path() {
        let file = write_config(&VALID.replace(r#"token = "arst""#, r#"token = """#));
        let err = run(file.path()).unwrap_err();

        let msg = format!("{err:#}");
        assert!(msg.contains(&file.path().display().to_string()));
        assert!(msg.contains("release_manager.token"));
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(run(&dir.path().join("nope.toml")).is_err());
    }
}
