use std::net::SocketAddr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen_addr: SocketAddr,
    /// Devices silent for longer than this are flagged `stale` in the queue
    /// status view. Nothing else reads it.
    pub device_stale_after_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([127, 0, 0, 1], 8000)),
            device_stale_after_ms: 30_000,
        }
    }
}

impl ServerConfig {
    pub fn new(listen_addr: SocketAddr) -> Self {
        Self {
            listen_addr,
            ..Default::default()
        }
    }

    pub fn with_device_stale_after_ms(mut self, ms: u64) -> Self {
        self.device_stale_after_ms = ms;
        self
    }

    pub fn device_stale_after(&self) -> Duration {
        Duration::from_millis(self.device_stale_after_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_config_default() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.listen_addr.to_string(), "127.0.0.1:8000");
        assert_eq!(cfg.device_stale_after_ms, 30_000);
        assert_eq!(cfg.device_stale_after(), Duration::from_secs(30));
    }

    #[test]
    fn server_config_new() {
        let addr: SocketAddr = "0.0.0.0:9000".parse().unwrap();
        let cfg = ServerConfig::new(addr);
        assert_eq!(cfg.listen_addr, addr);
        assert_eq!(cfg.device_stale_after_ms, 30_000);
    }

    #[test]
    fn server_config_with_stale_threshold() {
        let cfg = ServerConfig::default().with_device_stale_after_ms(500);
        assert_eq!(cfg.device_stale_after(), Duration::from_millis(500));
    }
}
