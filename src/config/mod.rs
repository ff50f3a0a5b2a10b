// Configuration module entry point
// Layered configuration: defaults, optional TOML file, environment overrides

mod state;
mod types;

use config::Map;
use std::net::SocketAddr;

// Re-export public types
pub use state::AppState;
pub use types::{Config, HttpConfig, UpstreamConfig};

/// Upstream template used when neither the config file nor `BASE_API_TEMPLATE` provide one
pub const DEFAULT_TEMPLATE: &str = "https://api.daznfeeds.com/livestream/OutletID_PASTE/?_fmt=json&_rt=b&_fld=oaId,cmId,dc,mta,ac,heETN,heR,drm,cc,rid,desc,oid,al,sst,set,wmk,lnk.urn:perform:mfl:fixture,lmt&_als=l&_ord=sst&_ordSrt=asc&_pgSz=1000";

/// Env var naming the config file (without extension)
const CONFIG_PATH_VAR: &str = "PROXY_CONFIG";

/// Bare environment variables and the keys they override
const ENV_OVERRIDES: [(&str, &str); 5] = [
    ("PORT", "server.port"),
    ("BASE_API_TEMPLATE", "upstream.template"),
    ("UPSTREAM_REFERER", "upstream.referer"),
    ("UPSTREAM_USER_AGENT", "upstream.user_agent"),
    ("STRIP_CLIENT_ORIGIN", "upstream.strip_client_origin"),
];

impl Config {
    /// Load configuration from the process environment
    /// Config file is `$PROXY_CONFIG` or "config" (extension detected by the `config` crate)
    pub fn load() -> Result<Self, config::ConfigError> {
        let env: Map<String, String> = std::env::vars().collect();
        let path = env
            .get(CONFIG_PATH_VAR)
            .cloned()
            .unwrap_or_else(|| "config".to_string());
        Self::load_with(&path, &env)
    }

    /// Load configuration from specified file path (without extension) and env snapshot
    pub fn load_with(config_path: &str, env: &Map<String, String>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder()
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(
                config::Environment::with_prefix("PROXY")
                    .prefix_separator("_")
                    .separator("__")
                    .source(Some(env.clone())),
            )
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8000)?
            .set_default("logging.level", "info")?
            .set_default("logging.access_log", true)?
            .set_default("performance.keep_alive_timeout", 75)?
            .set_default("performance.read_timeout", 0)?
            .set_default("performance.write_timeout", 0)?
            .set_default("performance.shutdown_grace_secs", 10)?
            .set_default("http.enable_cors", true)?
            .set_default("http.cors_allowed_methods", "GET, OPTIONS")?
            .set_default("http.cors_allowed_headers", "Content-Type, Accept, Origin, User-Agent")?
            .set_default("upstream.template", DEFAULT_TEMPLATE)?
            .set_default("upstream.placeholder", "OutletID_PASTE")?
            .set_default("upstream.default_user_agent", "Livestream-Proxy/1.0")?
            .set_default("upstream.default_accept", "application/json")?
            .set_default("upstream.default_content_type", "application/json")?
            .set_default("upstream.forward_client_ip", false)?;

        // Empty values behave as unset, matching `process.env.X || default`
        for (var, key) in ENV_OVERRIDES {
            let value = env.get(var).filter(|v| !v.trim().is_empty()).cloned();
            builder = builder.set_override_option(key, value)?;
        }

        builder.build()?.try_deserialize()
    }

    pub fn get_socket_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| format!("Invalid address: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn env_of(pairs: &[(&str, &str)]) -> Map<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let cfg = Config::load_with("does-not-exist", &Map::new()).unwrap();
        assert_eq!(cfg.server.port, 8000);
        assert_eq!(cfg.server.host, "0.0.0.0");
        assert_eq!(cfg.upstream.template, DEFAULT_TEMPLATE);
        assert_eq!(cfg.upstream.placeholder, "OutletID_PASTE");
        assert_eq!(cfg.upstream.default_user_agent, "Livestream-Proxy/1.0");
        assert!(cfg.upstream.referer.is_none());
        assert!(cfg.upstream.timeout_secs.is_none());
        assert!(!cfg.upstream.strip_client_origin);
        assert!(!cfg.upstream.forward_client_ip);
        assert!(cfg.http.enable_cors);
        assert!(cfg.health.enabled);
    }

    #[test]
    fn test_bare_env_overrides() {
        let env = env_of(&[
            ("PORT", "9123"),
            ("BASE_API_TEMPLATE", "http://example.test/feed/OutletID_PASTE"),
            ("UPSTREAM_REFERER", "https://ref.example/"),
            ("UPSTREAM_USER_AGENT", "Custom/2.0"),
            ("STRIP_CLIENT_ORIGIN", "true"),
        ]);
        let cfg = Config::load_with("does-not-exist", &env).unwrap();
        assert_eq!(cfg.server.port, 9123);
        assert_eq!(cfg.upstream.template, "http://example.test/feed/OutletID_PASTE");
        assert_eq!(cfg.upstream.referer.as_deref(), Some("https://ref.example/"));
        assert_eq!(cfg.upstream.user_agent.as_deref(), Some("Custom/2.0"));
        assert!(cfg.upstream.strip_client_origin);
    }

    #[test]
    fn test_empty_env_value_is_ignored() {
        let env = env_of(&[("BASE_API_TEMPLATE", ""), ("UPSTREAM_REFERER", "  ")]);
        let cfg = Config::load_with("does-not-exist", &env).unwrap();
        assert_eq!(cfg.upstream.template, DEFAULT_TEMPLATE);
        assert!(cfg.upstream.referer.is_none());
    }

    #[test]
    fn test_prefixed_env_nested_key() {
        let env = env_of(&[
            ("PROXY_LOGGING__ACCESS_LOG", "false"),
            ("PROXY_UPSTREAM__TIMEOUT_SECS", "5"),
        ]);
        let cfg = Config::load_with("does-not-exist", &env).unwrap();
        assert!(!cfg.logging.access_log);
        assert_eq!(cfg.upstream.timeout_secs, Some(5));
    }

    #[test]
    fn test_file_source_and_env_precedence() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("proxy.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "[server]\nport = 7001\n\n[upstream]\nreferer = \"https://file.example/\"").unwrap();

        let base = path.with_extension("");
        let base = base.to_str().unwrap();

        let cfg = Config::load_with(base, &Map::new()).unwrap();
        assert_eq!(cfg.server.port, 7001);
        assert_eq!(cfg.upstream.referer.as_deref(), Some("https://file.example/"));

        let cfg = Config::load_with(base, &env_of(&[("PORT", "7002")])).unwrap();
        assert_eq!(cfg.server.port, 7002);
    }

    #[test]
    fn test_socket_addr() {
        let mut cfg = Config::load_with("does-not-exist", &Map::new()).unwrap();
        cfg.server.host = "127.0.0.1".to_string();
        assert_eq!(cfg.get_socket_addr().unwrap().port(), 8000);
        cfg.server.host = "not a host".to_string();
        assert!(cfg.get_socket_addr().is_err());
    }
}
