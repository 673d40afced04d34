//! Configuration types for the Mimic server.
//!
//! Everything has a default, so the server runs without a config file. A YAML
//! file can be supplied and individual values overridden from the command line.

mod listen;
mod stream;

use std::path::Path;

use serde::{Deserialize, Serialize};

pub use listen::ListenConfig;
pub use stream::{StreamConfig, MAX_DELAY_MS};

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct Config {
    #[serde(default)]
    pub listen: ListenConfig,
    /// Enables request logging and the session state endpoint
    #[serde(default)]
    pub debug: bool,
    #[serde(default)]
    pub stream: StreamConfig,
    /// Replaces the built-in default model list when non-empty
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub models: Vec<String>,
}

/// Values supplied on the command line or through the environment.
/// `None` keeps whatever the file (or the default) says.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub debug: Option<bool>,
    pub stream_delay_ms: Option<u64>,
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, anyhow::Error> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    pub fn from_yaml(contents: &str) -> Result<Self, anyhow::Error> {
        let config: Config = serde_yaml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply command-line overrides, then re-validate
    pub fn with_overrides(mut self, overrides: ConfigOverrides) -> Result<Self, anyhow::Error> {
        if let Some(host) = overrides.host {
            self.listen.host = host;
        }
        if let Some(port) = overrides.port {
            self.listen.port = port;
        }
        if let Some(debug) = overrides.debug {
            self.debug = debug;
        }
        if let Some(delay_ms) = overrides.stream_delay_ms {
            self.stream.delay_ms = delay_ms;
        }
        self.validate()?;
        Ok(self)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.listen.port == 0 {
            anyhow::bail!("listen.port must be between 1 and 65535");
        }

        if self.listen.host.trim().is_empty() {
            anyhow::bail!("listen.host must not be empty");
        }

        if self.stream.delay_ms > MAX_DELAY_MS {
            anyhow::bail!(
                "stream.delay_ms must be at most {} (got {})",
                MAX_DELAY_MS,
                self.stream.delay_ms
            );
        }

        if let Some(blank) = self.models.iter().position(|m| m.trim().is_empty()) {
            anyhow::bail!("models[{}] must not be empty", blank);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.listen.host, "0.0.0.0");
        assert_eq!(config.listen.port, 8080);
        assert!(!config.debug);
        assert_eq!(config.stream.delay_ms, 10);
        assert!(config.models.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_full_yaml() {
        let yaml = r#"
listen:
  host: 127.0.0.1
  port: 9000
debug: true
stream:
  delay_ms: 0
models:
  - local-model
  - gpt-4
"#;
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.listen.port, 9000);
        assert_eq!(config.listen.host, "127.0.0.1");
        assert!(config.debug);
        assert_eq!(config.stream.delay_ms, 0);
        assert_eq!(config.models, vec!["local-model", "gpt-4"]);
        assert_eq!(
            config.listen.socket_addr().unwrap().to_string(),
            "127.0.0.1:9000"
        );
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config = Config::from_yaml("debug: true\n").unwrap();
        assert_eq!(config.listen, ListenConfig::default());
        assert_eq!(config.stream, StreamConfig::default());
    }

    #[test]
    fn test_rejects_port_zero() {
        let err = Config::from_yaml("listen:\n  port: 0\n").unwrap_err();
        assert!(err.to_string().contains("listen.port"));
    }

    #[test]
    fn test_rejects_excessive_delay() {
        let err = Config::from_yaml("stream:\n  delay_ms: 60000\n").unwrap_err();
        assert!(err.to_string().contains("stream.delay_ms"));
    }

    #[test]
    fn test_rejects_blank_model() {
        let err = Config::from_yaml("models: ['gpt-4', '  ']\n").unwrap_err();
        assert!(err.to_string().contains("models[1]"));
    }

    #[test]
    fn test_overrides_win_over_file() {
        let config = Config::from_yaml("listen:\n  port: 9000\n")
            .unwrap()
            .with_overrides(ConfigOverrides {
                port: Some(7000),
                debug: Some(true),
                stream_delay_ms: Some(25),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(config.listen.port, 7000);
        assert_eq!(config.listen.host, "0.0.0.0");
        assert!(config.debug);
        assert_eq!(config.stream.delay(), std::time::Duration::from_millis(25));
    }

    #[test]
    fn test_overrides_are_validated() {
        let result = Config::default().with_overrides(ConfigOverrides {
            port: Some(0),
            ..Default::default()
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "listen:\n  port: 8181").unwrap();
        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.listen.port, 8181);
    }

    #[test]
    fn test_from_missing_file() {
        assert!(Config::from_file("/nonexistent/mimic.yaml").is_err());
    }

    #[test]
    fn test_ipv6_listen_address() {
        let listen = ListenConfig {
            host: "::1".to_string(),
            port: 8080,
        };
        assert_eq!(listen.socket_addr().unwrap().to_string(), "[::1]:8080");
    }
}
