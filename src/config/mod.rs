use std::env;
use std::time::Duration;

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Config {
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub redis_url: Option<String>,
    pub rate_limit_window_secs: u64,
    pub rate_limit_requests: u32,
    pub server_host: String,
    pub server_port: u16,
    pub api_base_uri: Option<String>,
    pub persistence_timeout_ms: u64,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();

        Config {
            database_url: optional("DATABASE_URL"),
            database_max_connections: parse_or("DATABASE_MAX_CONNECTIONS", 10),
            redis_url: optional("REDIS_URL"),
            rate_limit_window_secs: parse_or("RATE_LIMIT_WINDOW", 60),
            rate_limit_requests: parse_or("RATE_LIMIT_REQUESTS", 100),
            server_host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            server_port: parse_or("SERVER_PORT", 4000),
            api_base_uri: optional("API_BASE_URI")
                .map(|uri| uri.trim_end_matches('/').to_string())
                .filter(|uri| !uri.is_empty()),
            persistence_timeout_ms: parse_or("PERSISTENCE_TIMEOUT_MS", 5000),
        }
    }

    pub fn rate_limit_window(&self) -> Duration {
        Duration::from_secs(self.rate_limit_window_secs)
    }

    pub fn persistence_timeout(&self) -> Duration {
        Duration::from_millis(self.persistence_timeout_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: None,
            database_max_connections: 10,
            redis_url: None,
            rate_limit_window_secs: 60,
            rate_limit_requests: 100,
            server_host: "0.0.0.0".into(),
            server_port: 4000,
            api_base_uri: None,
            persistence_timeout_ms: 5000,
        }
    }
}

/// 客户端（地图会话）侧使用的外部服务地址
#[derive(Debug, Clone, serde::Deserialize)]
pub struct ClientConfig {
    pub cluster_url: String,
    pub cluster_timeout_ms: u64,
    pub group_api_url: String,
    pub geocoder_url: String,
    pub geocoder_user_agent: String,
    pub request_timeout_ms: u64,
}

impl ClientConfig {
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();

        ClientConfig {
            cluster_url: env::var("CLUSTER_URL")
                .unwrap_or_else(|_| "http://127.0.0.1:5000/cluster-group".into()),
            cluster_timeout_ms: parse_or("CLUSTER_TIMEOUT_MS", 10_000),
            group_api_url: env::var("GROUP_API_URL")
                .unwrap_or_else(|_| "http://127.0.0.1:4000".into()),
            geocoder_url: env::var("GEOCODER_URL")
                .unwrap_or_else(|_| "https://nominatim.openstreetmap.org".into()),
            geocoder_user_agent: env::var("GEOCODER_USER_AGENT")
                .unwrap_or_else(|_| "groupsplit".into()),
            request_timeout_ms: parse_or("REQUEST_TIMEOUT_MS", 10_000),
        }
    }

    pub fn cluster_timeout(&self) -> Duration {
        Duration::from_millis(self.cluster_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

fn optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}
