mod settings;

pub use settings::{
    ApiConfig, HubConfig, JwtConfig, RedisConfig, ServerConfig, Settings, WebSocketConfig,
};
