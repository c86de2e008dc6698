use std::path::Path;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::models::SolverConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub solver: SolverConfig,
    pub logging: LoggingConfig,
    pub monitoring: MonitoringConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_enabled: bool,
    pub request_timeout_seconds: u64,
    /// Back-end label reported by the health endpoint (spec §6 environment
    /// contract: `SOLVER_TYPE` selects it; unknown values fall back to the
    /// default). The solver itself is always HiGHS via `good_lp` — this is
    /// a reporting label only, not a runtime back-end switch.
    pub solver_label: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub json_format: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    pub prometheus_enabled: bool,
    pub prometheus_endpoint: String,
    pub health_check_enabled: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8000,
                cors_enabled: true,
                request_timeout_seconds: 30,
                solver_label: "ortools".to_string(),
            },
            solver: SolverConfig::default(),
            logging: LoggingConfig {
                level: "info".to_string(),
                json_format: false,
            },
            monitoring: MonitoringConfig {
                prometheus_enabled: true,
                prometheus_endpoint: "/metrics".to_string(),
                health_check_enabled: true,
            },
        }
    }
}

impl AppConfig {
    /// Load configuration from file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config_str = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&config_str)?;
        Ok(config)
    }

    /// Load configuration from environment variables, falling back to
    /// defaults (which mirror the source's `OptimizationConfig` defaults,
    /// spec §3).
    pub fn from_env() -> Result<Self> {
        let mut config = AppConfig::default();

        if let Ok(host) = std::env::var("SERVER_HOST") {
            config.server.host = host;
        }
        if let Ok(port) = std::env::var("SERVER_PORT") {
            config.server.port = port.parse()?;
        }
        if let Ok(solver_type) = std::env::var("SOLVER_TYPE") {
            config.server.solver_label = match solver_type.as_str() {
                "ortools" | "gurobi" => solver_type,
                _ => config.server.solver_label,
            };
        }

        if let Ok(level) = std::env::var("LOG_LEVEL") {
            config.logging.level = level;
        }

        if let Ok(v) = std::env::var("TIME_HORIZON_MINUTES") {
            config.solver.time_horizon_minutes = v.parse()?;
        }
        if let Ok(v) = std::env::var("MAX_SOLVE_TIME_SECONDS") {
            config.solver.max_solve_time_seconds = v.parse()?;
        }
        if let Ok(v) = std::env::var("DELAY_WEIGHT") {
            config.solver.delay_weight = v.parse()?;
        }
        if let Ok(v) = std::env::var("CONFLICT_WEIGHT") {
            config.solver.conflict_weight = v.parse()?;
        }
        if let Ok(v) = std::env::var("PRIORITY_MULTIPLIER") {
            config.solver.priority_multiplier = v.parse()?;
        }
        if let Ok(v) = std::env::var("HEADWAY_BUFFER_MINUTES") {
            config.solver.headway_buffer_minutes = v.parse()?;
        }

        Ok(config)
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let config_str = toml::to_string_pretty(self)?;
        std::fs::write(path, config_str)?;
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(anyhow::anyhow!("Server port cannot be 0"));
        }
        if self.solver.time_horizon_minutes == 0 {
            return Err(anyhow::anyhow!("time horizon must be greater than 0"));
        }
        if self.solver.max_solve_time_seconds == 0 {
            return Err(anyhow::anyhow!("max solve time must be greater than 0"));
        }
        Ok(())
    }

    /// Get server bind address
    pub fn server_bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.solver.time_horizon_minutes, 240);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_serialization() {
        let config = AppConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        let deserialized: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(config.server.port, deserialized.server.port);
    }

    #[test]
    fn test_config_file_operations() {
        let config = AppConfig::default();
        let temp_file = NamedTempFile::new().unwrap();

        config.save_to_file(temp_file.path()).unwrap();
        let loaded_config = AppConfig::from_file(temp_file.path()).unwrap();

        assert_eq!(config.server.port, loaded_config.server.port);
        assert_eq!(
            config.solver.time_horizon_minutes,
            loaded_config.solver.time_horizon_minutes
        );
    }

    #[test]
    fn test_rejects_zero_port() {
        let mut config = AppConfig::default();
        config.server.port = 0;
        assert!(config.validate().is_err());
    }
}
