use anyhow::{Context, Result};
use serde::Deserialize;

use crate::interview::TimingPolicy;
use crate::upload::RetryPolicy;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub interview: TimingPolicy,
    #[serde(default)]
    pub upload: RetryPolicy,
}

#[derive(Debug, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Deserialize)]
pub struct StorageConfig {
    /// Directory uploaded recordings are written to
    pub recordings_path: String,
    /// Base URL under which stored recordings are served
    pub public_base_url: String,
}

impl Config {
    /// Load `path` (any format the `config` crate understands, extension
    /// optional), then apply `INTERVIEW__SECTION__KEY` environment overrides
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix("INTERVIEW").separator("__"))
            .build()
            .with_context(|| format!("Failed to read config from {}", path))?;

        settings
            .try_deserialize()
            .context("Invalid configuration")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loads_toml_with_policy_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("service.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            r#"
[service]
name = "interview-recorder"

[service.http]
bind = "127.0.0.1"
port = 8080

[storage]
recordings_path = "/tmp/recordings"
public_base_url = "http://localhost:8080/blobs"

[interview]
max_answer_secs = 120

[interview.countdown]
mode = "fixed"
seconds = 10
"#
        )
        .unwrap();

        let cfg = Config::load(path.to_str().unwrap()).unwrap();
        assert_eq!(cfg.service.http.port, 8080);
        assert_eq!(cfg.interview.max_answer_secs, 120);
        assert_eq!(cfg.interview.seconds_per_question, 300);
        assert_eq!(cfg.interview.countdown.countdown_for("anything"), 10);
        assert_eq!(cfg.upload.max_attempts, 3);
    }
}
