//! Relay configuration

use std::path::PathBuf;

/// Runtime configuration for the relay server
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Address to bind
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Origin allowed to call the HTTP API ("*" disables the restriction)
    pub allowed_origin: String,
    /// Snapshot directory (None keeps snapshots in memory only)
    pub data_dir: Option<PathBuf>,
}

impl RelayConfig {
    /// Bind address string
    #[must_use]
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3001,
            allowed_origin: "http://localhost:3000".to_string(),
            data_dir: Some(PathBuf::from(".data/canvases")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_addr() {
        let config = RelayConfig::default();
        assert_eq!(config.addr(), "127.0.0.1:3001");
    }
}
