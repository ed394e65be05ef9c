use super::RequestsLoggingLevel;

/// Username and password accepted by HTTP basic authentication.
#[derive(Clone, Debug, PartialEq)]
pub struct BasicCredentials {
    pub username: String,
    pub password: String,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub requests_logging_level: RequestsLoggingLevel,
    pub host: String,
    pub port: u16,
    /// When set, every song and admin route requires these credentials.
    pub credentials: Option<BasicCredentials>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            requests_logging_level: RequestsLoggingLevel::Path,
            host: "127.0.0.1".to_string(),
            port: 5000,
            credentials: None,
        }
    }
}
