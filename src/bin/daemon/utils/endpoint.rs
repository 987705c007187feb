//! Endpoint preparation for bound sockets.
//!
//! `ipc://` endpoints live on the filesystem: the parent directory must exist,
//! a socket file left behind by a crashed process must be removed before
//! binding, and the fresh socket gets group-only permissions.

use paas::config::ipc_path;
use paas::Result;
use std::fs;
use tracing::{debug, warn};

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

/// Makes an endpoint ready to be bound
///
/// # Arguments
/// * `endpoint` - Endpoint about to be bound; non-ipc endpoints are left alone
pub fn prepare_bind(endpoint: &str) -> Result<()> {
    let Some(path) = ipc_path(endpoint) else {
        return Ok(());
    };

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    // Remove existing socket if present
    if path.exists() {
        debug!("Removing stale socket {}", path.display());
        fs::remove_file(path)?;
    }
    Ok(())
}

/// Sets rw-rw---- on a freshly bound ipc socket (Unix only)
pub fn restrict_permissions(endpoint: &str) {
    #[cfg(unix)]
    if let Some(path) = ipc_path(endpoint) {
        match fs::metadata(path) {
            Ok(metadata) => {
                let mut perms = metadata.permissions();
                perms.set_mode(0o660);
                if let Err(e) = fs::set_permissions(path, perms) {
                    warn!("Could not set permissions on {}: {}", path.display(), e);
                }
            }
            Err(e) => warn!("Could not stat {}: {}", path.display(), e),
        }
    }
    #[cfg(not(unix))]
    let _ = endpoint;
}

/// Removes the socket file of a bound ipc endpoint on shutdown
pub fn cleanup(endpoint: &str) {
    if let Some(path) = ipc_path(endpoint) {
        let _ = fs::remove_file(path);
    }
}
