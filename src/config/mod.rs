mod settings;

pub use settings::{
    AdminConfig, DatabaseConfig, JwtConfig, MonnifyConfig, ServerConfig, Settings, WebSocketConfig,
};
