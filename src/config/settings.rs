use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::env;

const DEEPSEEK_BASE_URL: &str = "https://api.deepseek.com/v1";
const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AppSettings {
    pub app: AppConfig,
    pub server: ServerConfig,
    pub provider: ProviderConfig,
    pub admin: AdminConfig,
    pub rate_limit: RateLimitConfig,
    pub usage_log: UsageLogConfig,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AppConfig {
    pub name: String,
    pub environment: String,
}

impl AppConfig {
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Display name of the upstream completion provider ("DeepSeek" or "OpenAI").
    pub name: String,
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AdminConfig {
    pub password: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub window_ms: u64,
    pub max_requests: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UsageLogConfig {
    pub path: String,
}

impl AppSettings {
    pub fn from_env() -> Result<Self, AppError> {
        // App config
        let app_name = env::var("APP_NAME").unwrap_or_else(|_| "ai-quote-api".to_string());
        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

        // Server config
        let server_host = env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let server_port = env::var("SERVER_PORT")
            .unwrap_or_else(|_| "3001".to_string())
            .parse::<u16>()
            .map_err(|_| {
                AppError::Configuration("SERVER_PORT must be a valid port number".to_string())
            })?;

        // CORS origins
        let cors_origins = env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "*".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .collect();

        // Completion provider: DeepSeek takes precedence when both keys are set
        let (provider_name, api_key, default_base_url, default_model) =
            match env::var("DEEPSEEK_API_KEY") {
                Ok(key) => ("DeepSeek", key, DEEPSEEK_BASE_URL, "deepseek-chat"),
                Err(_) => {
                    let key = env::var("OPENAI_API_KEY").map_err(|_| {
                        AppError::Configuration(
                            "either DEEPSEEK_API_KEY or OPENAI_API_KEY must be set".to_string(),
                        )
                    })?;
                    ("OpenAI", key, OPENAI_BASE_URL, "gpt-4")
                }
            };

        let provider_base_url =
            env::var("PROVIDER_BASE_URL").unwrap_or_else(|_| default_base_url.to_string());
        let provider_model =
            env::var("PROVIDER_MODEL").unwrap_or_else(|_| default_model.to_string());

        let provider_timeout_secs = env::var("PROVIDER_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".to_string())
            .parse::<u64>()
            .map_err(|_| {
                AppError::Configuration("PROVIDER_TIMEOUT_SECS must be a valid number".to_string())
            })?;

        // Admin password, compared after trimming on both sides
        let admin_password = env::var("ADMIN_PASSWORD")
            .unwrap_or_else(|_| "admin123".to_string())
            .trim()
            .to_string();

        // Rate limiting
        let rate_limit_window_ms = env::var("RATE_LIMIT_WINDOW_MS")
            .unwrap_or_else(|_| "60000".to_string())
            .parse::<u64>()
            .map_err(|_| {
                AppError::Configuration("RATE_LIMIT_WINDOW_MS must be a valid number".to_string())
            })?;

        let rate_limit_max_requests = env::var("RATE_LIMIT_MAX_REQUESTS")
            .unwrap_or_else(|_| "5".to_string())
            .parse::<u64>()
            .map_err(|_| {
                AppError::Configuration(
                    "RATE_LIMIT_MAX_REQUESTS must be a valid number".to_string(),
                )
            })?;

        // Usage log file
        let usage_log_path =
            env::var("USAGE_LOG_PATH").unwrap_or_else(|_| "logs/api-usage.json".to_string());

        Ok(Self {
            app: AppConfig {
                name: app_name,
                environment,
            },
            server: ServerConfig {
                host: server_host,
                port: server_port,
                cors_origins,
            },
            provider: ProviderConfig {
                name: provider_name.to_string(),
                api_key,
                base_url: provider_base_url,
                model: provider_model,
                timeout_secs: provider_timeout_secs,
            },
            admin: AdminConfig {
                password: admin_password,
            },
            rate_limit: RateLimitConfig {
                window_ms: rate_limit_window_ms,
                max_requests: rate_limit_max_requests,
            },
            usage_log: UsageLogConfig {
                path: usage_log_path,
            },
        })
    }
}
