//! Bearer token lifecycle
//!
//! One token per gateway lifetime: 32 random bytes, hex-encoded, written
//! to a per-user file before the listener accepts connections. Each start
//! overwrites the file, so a bridge holding a stale token fails
//! authentication until it rereads it. Dropping the token removes the
//! file.

use std::fs;
use std::path::{Path, PathBuf};

use rand::RngCore;
use tracing::{info, warn};

use crate::error::{Error, Result};

/// The gateway's bearer token and its on-disk file, owned together
#[derive(Debug)]
pub struct AuthToken {
    value: String,
    path: PathBuf,
}

impl AuthToken {
    /// Generate a fresh token and persist it, overwriting any previous
    /// file, with owner-only permissions.
    pub fn generate(path: &Path) -> Result<Self> {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        let value: String = bytes.iter().map(|b| format!("{b:02x}")).collect();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, &value).map_err(|e| Error::Token {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
        }

        info!("Auth token written to {}", path.display());
        Ok(Self {
            value,
            path: path.to_path_buf(),
        })
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for AuthToken {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("Failed to remove token file {}: {}", self.path.display(), e);
            }
        }
    }
}
