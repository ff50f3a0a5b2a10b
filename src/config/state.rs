// Application state module
// Shared read-only state handed to every connection

use super::types::Config;
use crate::error::ProxyError;
use crate::upstream::UpstreamClient;

/// Application state
pub struct AppState {
    pub config: Config,
    pub upstream: UpstreamClient,
}

impl AppState {
    pub fn new(config: &Config) -> Result<Self, ProxyError> {
        let upstream = UpstreamClient::new(&config.upstream)?;

        Ok(Self {
            config: config.clone(),
            upstream,
        })
    }

    pub const fn access_log_enabled(&self) -> bool {
        self.config.logging.access_log
    }
}
