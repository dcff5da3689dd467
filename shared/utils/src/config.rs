use ::config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub converter: ConverterConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Root directory for uploaded templates; relative paths in the data
    /// model resolve against this.
    pub upload_dir: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConverterConfig {
    /// Headless office binary probed once at startup.
    pub office_binary: String,
    pub timeout_seconds: u64,
    /// Unicode-capable font families tried in order before falling back.
    pub unicode_fonts: Vec<String>,
    pub fallback_font: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
    pub file_path: Option<String>,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        let config = Config::builder()
            // Start with default values
            .add_source(File::with_name("config/default").required(false))
            // Add environment-specific config
            .add_source(
                File::with_name(&format!(
                    "config/{}",
                    env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into())
                ))
                .required(false),
            )
            // Add local config (gitignored)
            .add_source(File::with_name("config/local").required(false))
            // Add environment variables with FORMFLOW prefix
            .add_source(Environment::with_prefix("FORMFLOW").separator("__"));

        config.build()?.try_deserialize()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8081,
                max_upload_bytes: 16 * 1024 * 1024, // 16MB
            },
            storage: StorageConfig {
                upload_dir: "storage/uploads".to_string(),
            },
            converter: ConverterConfig {
                office_binary: "soffice".to_string(),
                timeout_seconds: 60,
                unicode_fonts: vec![
                    "Arial Unicode MS".to_string(),
                    "Noto Sans".to_string(),
                    "DejaVu Sans".to_string(),
                    "Segoe UI Symbol".to_string(),
                ],
                fallback_font: "DejaVu Sans".to_string(),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "text".to_string(),
                file_path: None,
            },
        }
    }
}
