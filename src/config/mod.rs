use serde::Deserialize;
use std::env;
use std::str::FromStr;

// Root configuration, one section per concern
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub session: SessionConfig,
    pub features: FeatureFlags,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub environment: String,
    pub rust_log: String,
    pub log_format: LogFormat,
    pub cors_allow_origin: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub pool_size: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    pub cookie_name: String,
    pub ttl_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeatureFlags {
    // Enables the /dev routes: privilege escalation, user wipe, direct login
    pub development_mode: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            app: AppConfig {
                host: "0.0.0.0".to_string(),
                port: 8000,
                environment: "development".to_string(),
                rust_log: "event_calendar=debug,tower_http=debug".to_string(),
                log_format: LogFormat::Pretty,
                cors_allow_origin: None,
            },
            database: DatabaseConfig {
                url: "postgres://localhost/event_calendar".to_string(),
                pool_size: 10,
            },
            redis: RedisConfig {
                url: "redis://127.0.0.1:6379".to_string(),
            },
            session: SessionConfig {
                cookie_name: "session".to_string(),
                ttl_seconds: 60 * 60 * 24 * 7,
            },
            features: FeatureFlags {
                development_mode: false,
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Config::default();
        Config {
            app: AppConfig {
                host: env::var("APP_HOST").unwrap_or(defaults.app.host),
                port: parse_var("PORT", defaults.app.port),
                environment: env::var("ENVIRONMENT").unwrap_or(defaults.app.environment),
                rust_log: env::var("RUST_LOG").unwrap_or(defaults.app.rust_log),
                log_format: parse_var("LOG_FORMAT", defaults.app.log_format),
                cors_allow_origin: env::var("CORS_ALLOW_ORIGIN").ok(),
            },
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
                pool_size: parse_var("DB_POOL_SIZE", defaults.database.pool_size),
            },
            redis: RedisConfig {
                url: env::var("REDIS_URL").unwrap_or(defaults.redis.url),
            },
            session: SessionConfig {
                cookie_name: env::var("SESSION_COOKIE").unwrap_or(defaults.session.cookie_name),
                ttl_seconds: parse_var("SESSION_TTL_SECONDS", defaults.session.ttl_seconds),
            },
            features: FeatureFlags {
                development_mode: parse_var(
                    "DEVELOPMENT_MODE",
                    defaults.features.development_mode,
                ),
            },
        }
    }

    pub fn is_development(&self) -> bool {
        self.features.development_mode
    }
}

fn parse_var<T>(name: &str, default: T) -> T
where
    T: FromStr,
    T::Err: std::fmt::Debug,
{
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .unwrap_or_else(|e| panic!("{} has an invalid value: {:?}", name, e)),
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_format_parses_case_insensitively() {
        assert_eq!("JSON".parse::<LogFormat>(), Ok(LogFormat::Json));
        assert_eq!("text".parse::<LogFormat>(), Ok(LogFormat::Pretty));
        assert!("xml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn defaults_keep_dev_routes_off() {
        let config = Config::default();
        assert!(!config.is_development());
        assert_eq!(config.session.cookie_name, "session");
    }
}
