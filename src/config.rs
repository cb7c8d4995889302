use anyhow::{Context, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use validator::Validate;

pub const CONFIG_FILE: &str = "config/default.toml";
pub const ENV_PREFIX: &str = "CPU_STRESS__";

#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate)]
pub struct Config {
    #[validate(nested)]
    pub server: ServerConfig,
    #[validate(nested)]
    pub workers: WorkersConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct ServerConfig {
    pub host: String,
    #[validate(range(min = 1))]
    pub port: u16,
    /// Public base URL advertised in the API documentation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_url: Option<String>,
    pub enable_cors: bool,
    #[validate(range(min = 1024))]
    pub body_limit_bytes: usize,
    #[validate(range(min = 1))]
    pub listen_backlog: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            server_url: None,
            enable_cors: false,
            body_limit_bytes: 1024 * 1024,
            listen_backlog: 1024,
        }
    }
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid listen address {}:{}", self.host, self.port))
    }

    pub fn public_url(&self) -> String {
        self.server_url
            .clone()
            .unwrap_or_else(|| format!("http://localhost:{}", self.port))
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct WorkersConfig {
    /// Number of worker processes; the logical CPU count when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 1, max = 1024))]
    pub count: Option<usize>,
    /// Run worker processes under a supervisor. When false a single worker is
    /// served from the current process.
    pub supervise: bool,
}

impl Default for WorkersConfig {
    fn default() -> Self {
        Self {
            count: None,
            supervise: true,
        }
    }
}

impl WorkersConfig {
    pub fn resolved_count(&self) -> usize {
        self.count.unwrap_or_else(crate::cpu::logical_cpus)
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let cfg: Config = Self::figment()
            .extract()
            .context("failed to read configuration")?;
        cfg.validate().context("invalid configuration")?;
        Ok(cfg)
    }

    pub fn figment() -> Figment {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(CONFIG_FILE))
            .merge(plain_env())
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }
}

/// `PORT` and `SERVER_URL` are honoured without the prefix, as most hosting
/// platforms inject them that way.
fn plain_env() -> Env {
    Env::raw().filter_map(|key| {
        if key.as_str().eq_ignore_ascii_case("port") {
            Some("server.port".into())
        } else if key.as_str().eq_ignore_ascii_case("server_url") {
            Some("server.server_url".into())
        } else {
            None
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn test_defaults() {
        Jail::expect_with(|jail| {
            jail.clear_env();
            let cfg = Config::load().expect("defaults load");
            assert_eq!(cfg.server.port, 3000);
            assert_eq!(cfg.server.host, "0.0.0.0");
            assert_eq!(cfg.server.public_url(), "http://localhost:3000");
            assert!(cfg.workers.supervise);
            assert!(cfg.workers.count.is_none());
            Ok(())
        });
    }

    #[test]
    fn test_plain_port_and_server_url() {
        Jail::expect_with(|jail| {
            jail.clear_env();
            jail.set_env("PORT", "8081");
            jail.set_env("SERVER_URL", "https://cpu.example.com");
            let cfg = Config::load().expect("env load");
            assert_eq!(cfg.server.port, 8081);
            assert_eq!(cfg.server.public_url(), "https://cpu.example.com");
            Ok(())
        });
    }

    #[test]
    fn test_public_url_follows_port() {
        Jail::expect_with(|jail| {
            jail.clear_env();
            jail.set_env("PORT", "4000");
            let cfg = Config::load().expect("env load");
            assert_eq!(cfg.server.public_url(), "http://localhost:4000");
            Ok(())
        });
    }

    #[test]
    fn test_toml_then_prefixed_env() {
        Jail::expect_with(|jail| {
            jail.clear_env();
            jail.create_dir("config")?;
            jail.create_file(
                CONFIG_FILE,
                r#"
                [server]
                port = 5000
                enable_cors = true

                [workers]
                count = 2
                "#,
            )?;
            jail.set_env("CPU_STRESS__WORKERS__COUNT", "3");
            let cfg = Config::load().expect("layered load");
            assert_eq!(cfg.server.port, 5000);
            assert!(cfg.server.enable_cors);
            assert_eq!(cfg.workers.count, Some(3));
            assert_eq!(cfg.workers.resolved_count(), 3);
            Ok(())
        });
    }

    #[test]
    fn test_rejects_zero_workers() {
        Jail::expect_with(|jail| {
            jail.clear_env();
            jail.set_env("CPU_STRESS__WORKERS__COUNT", "0");
            assert!(Config::load().is_err());
            Ok(())
        });
    }

    #[test]
    fn test_socket_addr() {
        let server = ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 3100,
            ..ServerConfig::default()
        };
        assert_eq!(server.socket_addr().unwrap().port(), 3100);

        let bad = ServerConfig {
            host: "not a host".to_string(),
            ..ServerConfig::default()
        };
        assert!(bad.socket_addr().is_err());
    }

    #[test]
    fn test_resolved_count_defaults_to_cpus() {
        let workers = WorkersConfig::default();
        assert_eq!(workers.resolved_count(), crate::cpu::logical_cpus());
    }
}
