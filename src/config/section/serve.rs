//! `[serve]` section configuration.
//!
//! Contains HTTP server and static asset settings.
//!
//! # Example
//!
//! ```toml
//! [serve]
//! interface = "127.0.0.1"     # Network interface (127.0.0.1 = localhost only)
//! port = 3000                 # HTTP port number
//! workers = 4                 # Request handler threads
//! public_dir = "public"       # Static asset root
//! max_age = 31536000          # Cache-Control max-age for static assets (seconds)
//! etag = true                 # Send ETag for static assets
//! last_modified = true        # Send Last-Modified for static assets
//! ```
//!
//! Use `interface = "0.0.0.0"` to make the server accessible from LAN.

use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::config::{ConfigDiagnostics, FieldPath};

/// One year, the conventional "immutable asset" lifetime.
pub const ONE_YEAR_SECS: u32 = 31_536_000;

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServeConfig {
    /// Network interface to bind.
    /// - `127.0.0.1` (default): localhost only
    /// - `0.0.0.0`: all interfaces (LAN accessible)
    pub interface: IpAddr,

    /// HTTP port number.
    pub port: u16,

    /// Number of request handler threads.
    pub workers: usize,

    /// Directory served as static assets before API routing.
    pub public_dir: PathBuf,

    /// `Cache-Control: max-age` for static assets, in seconds.
    pub max_age: u32,

    /// Send a content-hash `ETag` and honor `If-None-Match`.
    pub etag: bool,

    /// Send `Last-Modified` from the file mtime.
    pub last_modified: bool,
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            interface: IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)),
            port: 3000,
            workers: 4,
            public_dir: PathBuf::from("public"),
            max_age: ONE_YEAR_SECS,
            etag: true,
            last_modified: true,
        }
    }
}

impl ServeConfig {
    pub const WORKERS: FieldPath = FieldPath::new("serve.workers");

    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        if self.workers == 0 {
            diag.error_with_hint(
                Self::WORKERS,
                "at least one request worker is required",
                "remove the field to use the default of 4",
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

    use crate::config::{ConfigDiagnostics, test_parse_config};

    #[test]
    fn test_serve_config() {
        let config =
            test_parse_config("[serve]\ninterface = \"0.0.0.0\"\nport = 8080\nworkers = 2");

        assert_eq!(
            config.serve.interface,
            IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0))
        );
        assert_eq!(config.serve.port, 8080);
        assert_eq!(config.serve.workers, 2);
    }

    #[test]
    fn test_serve_config_defaults() {
        let config = test_parse_config("");

        assert_eq!(
            config.serve.interface,
            IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))
        );
        assert_eq!(config.serve.port, 3000);
        assert_eq!(config.serve.max_age, super::ONE_YEAR_SECS);
        assert!(config.serve.etag);
        assert!(config.serve.last_modified);
    }

    #[test]
    fn test_serve_config_ipv6() {
        let config = test_parse_config("[serve]\ninterface = \"::1\"");
        assert_eq!(
            config.serve.interface,
            IpAddr::V6(Ipv6Addr::new(0, 0, 0, 0, 0, 0, 0, 1))
        );
    }

    #[test]
    fn test_zero_workers_rejected() {
        let config = test_parse_config("[serve]\nworkers = 0");
        let mut diag = ConfigDiagnostics::new();
        config.serve.validate(&mut diag);
        assert_eq!(diag.len(), 1);
        assert_eq!(diag.errors()[0].field.as_str(), "serve.workers");
    }
}
