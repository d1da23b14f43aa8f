//! Server lifecycle management.

use std::fs;
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use tempfile::TempDir;
use tiny_http::Server;

use crate::config::UploadConfig;
use crate::debug;

/// Bind to exactly the configured interface and port.
pub fn bind(interface: IpAddr, port: u16) -> Result<(Server, SocketAddr)> {
    let addr = SocketAddr::new(interface, port);
    let server = Server::http(addr).map_err(|e| anyhow!("Failed to bind {addr}: {e}"))?;
    let bound = server.server_addr().to_ip().unwrap_or(addr);
    Ok((server, bound))
}

/// Directory multipart uploads are spooled to.
///
/// A private directory is removed when the value drops, after the
/// request loop has finished.
#[derive(Debug)]
pub enum SpoolDir {
    Configured(PathBuf),
    Private(TempDir),
    Memory,
}

impl SpoolDir {
    pub fn prepare(upload: &UploadConfig) -> Result<Self> {
        if !upload.use_temp_files {
            return Ok(Self::Memory);
        }

        let spool = match &upload.temp_dir {
            Some(dir) => {
                fs::create_dir_all(dir)
                    .with_context(|| format!("Failed to create upload dir {}", dir.display()))?;
                Self::Configured(dir.clone())
            }
            None => Self::Private(
                tempfile::Builder::new()
                    .prefix("h5p-relay-uploads-")
                    .tempdir()
                    .context("Failed to create private upload dir")?,
            ),
        };
        if let Some(path) = spool.path() {
            debug!("upload"; "spooling to {}", path.display());
        }
        Ok(spool)
    }

    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Configured(dir) => Some(dir),
            Self::Private(dir) => Some(dir.path()),
            Self::Memory => None,
        }
    }
}
