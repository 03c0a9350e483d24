use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerConfig,
    pub jwt: JwtConfig,
    #[serde(default)]
    pub redis: RedisConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub websocket: WebSocketConfig,
    #[serde(default)]
    pub hub: HubConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Origins allowed to open a WebSocket or make CORS requests.
    /// `"*"` allows any origin; an empty list refuses every browser origin.
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: Option<String>,
    pub audience: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    /// When false, publishes are delivered straight into the local hub
    #[serde(default = "default_redis_enabled")]
    pub enabled: bool,
    #[serde(default = "default_redis_url")]
    pub url: String,
    /// Pattern the bus bridge subscribes to; channel names are user ids
    #[serde(default = "default_redis_pattern")]
    pub pattern: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiConfig {
    pub key: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebSocketConfig {
    /// Time allowed to write a frame to the peer
    #[serde(default = "default_write_timeout")]
    pub write_timeout_secs: u64,
    /// Time allowed between pongs from the peer
    #[serde(default = "default_read_timeout")]
    pub read_timeout_secs: u64,
    /// Maximum inbound frame size in bytes
    #[serde(default = "default_max_message_size")]
    pub max_message_size: usize,
    /// Capacity of each connection's outbound queue
    #[serde(default = "default_send_buffer")]
    pub send_buffer: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HubConfig {
    #[serde(default = "default_max_connections_per_user")]
    pub max_connections_per_user: usize,
    /// Capacity of the hub's delivery event channel
    #[serde(default = "default_delivery_buffer")]
    pub delivery_buffer: usize,
    /// How long the bus bridge waits for delivery capacity before dropping
    #[serde(default = "default_delivery_timeout_ms")]
    pub delivery_timeout_ms: u64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    12346
}

fn default_redis_enabled() -> bool {
    true
}

fn default_redis_url() -> String {
    "redis://localhost:6379".to_string()
}

fn default_redis_pattern() -> String {
    "*".to_string()
}

fn default_write_timeout() -> u64 {
    10
}

fn default_read_timeout() -> u64 {
    60
}

fn default_max_message_size() -> usize {
    512
}

fn default_send_buffer() -> usize {
    256
}

fn default_max_connections_per_user() -> usize {
    crate::hub::DEFAULT_MAX_CONNECTIONS_PER_USER
}

fn default_delivery_buffer() -> usize {
    crate::hub::DEFAULT_DELIVERY_BUFFER_SIZE
}

fn default_delivery_timeout_ms() -> u64 {
    100
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        // Load .env file if exists
        let _ = dotenvy::dotenv();

        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let builder = Config::builder()
            .set_default("server.host", default_host())?
            .set_default("server.port", default_port() as i64)?
            .set_default("redis.enabled", default_redis_enabled())?
            .set_default("redis.url", default_redis_url())?
            .set_default("redis.pattern", default_redis_pattern())?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // SERVER_HOST, SERVER_PORT, JWT_SECRET, REDIS_URL, etc.
            .add_source(
                Environment::default()
                    .separator("_")
                    .try_parsing(true)
                    .list_separator(","),
            );

        builder.build()?.try_deserialize()
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl WebSocketConfig {
    pub fn write_timeout(&self) -> Duration {
        Duration::from_secs(self.write_timeout_secs)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }

    /// Ping period, kept shorter than the read timeout so a live peer's pong
    /// always lands before the deadline
    pub fn ping_interval(&self) -> Duration {
        self.read_timeout() * 9 / 10
    }
}

impl HubConfig {
    pub fn delivery_timeout(&self) -> Duration {
        Duration::from_millis(self.delivery_timeout_ms)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: vec![],
        }
    }
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            enabled: default_redis_enabled(),
            url: default_redis_url(),
            pattern: default_redis_pattern(),
        }
    }
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        Self {
            write_timeout_secs: default_write_timeout(),
            read_timeout_secs: default_read_timeout(),
            max_message_size: default_max_message_size(),
            send_buffer: default_send_buffer(),
        }
    }
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            max_connections_per_user: default_max_connections_per_user(),
            delivery_buffer: default_delivery_buffer(),
            delivery_timeout_ms: default_delivery_timeout_ms(),
        }
    }
}
