//! Host key loading and first-boot generation

use std::fs;
use std::path::Path;

use rand::rngs::OsRng;
use russh::keys::ssh_key;
use russh::keys::ssh_key::private::{KeypairData, RsaKeypair};
use russh::keys::ssh_key::LineEnding;
use russh::keys::{load_secret_key, PrivateKey};
use thiserror::Error;
use tracing::info;

/// Key size for generated host keys.
pub const HOST_KEY_BITS: usize = 4096;

#[derive(Debug, Error)]
pub enum HostKeyError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("host key error: {0}")]
    Key(#[from] russh::keys::Error),

    #[error("host key generation failed: {0}")]
    Generate(#[from] ssh_key::Error),
}

/// Load the host key at `path`, generating and persisting a fresh
/// 4096-bit RSA key on first boot.
pub fn load_or_generate(path: &Path) -> Result<PrivateKey, HostKeyError> {
    if path.exists() {
        info!(path = %path.display(), "loading host key");
        return Ok(load_secret_key(path, None)?);
    }

    info!(path = %path.display(), bits = HOST_KEY_BITS, "generating RSA host key");
    generate(path, HOST_KEY_BITS)
}

fn generate(path: &Path, bits: usize) -> Result<PrivateKey, HostKeyError> {
    let keypair = RsaKeypair::random(&mut OsRng, bits)?;
    let key = PrivateKey::new(KeypairData::Rsa(keypair), "skyhook host key")?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, key.to_openssh(LineEnding::LF)?.as_bytes())?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
    }

    Ok(key)
}
