//! Infrastructure implementation of the `KeyStore` port.
//!
//! RSA keys are generated with the `rsa` crate and encoded with `ssh-key`.
//! The private half is written as unencrypted PKCS#8 PEM with owner-read
//! permissions from the moment the file exists.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rsa::RsaPrivateKey;
use rsa::pkcs8::{EncodePrivateKey, LineEnding};
use ssh_key::public::KeyData;
use ssh_key::{HashAlg, PublicKey};

use crate::application::ports::KeyStore;
use crate::domain::{KeyMaterial, SessionError};

/// Mode of the private key file: owner read, nothing else.
pub const PRIVATE_KEY_MODE: u32 = 0o400;

/// Keypair store rooted at a single directory.
pub struct LocalKeyStore {
    dir: PathBuf,
    bits: usize,
}

impl LocalKeyStore {
    #[must_use]
    pub fn new(dir: PathBuf, bits: usize) -> Self {
        Self { dir, bits }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl KeyStore for LocalKeyStore {
    fn paths(&self, name: &str) -> KeyMaterial {
        KeyMaterial::at(&self.dir, name)
    }

    async fn generate(&self, name: &str) -> Result<KeyMaterial> {
        let mut key = self.paths(name);
        let bits = self.bits;
        let paths = key.clone();
        let name = name.to_string();
        let fingerprint = tokio::task::spawn_blocking(move || generate_blocking(&paths, &name, bits))
            .await
            .map_err(|e| anyhow::anyhow!("key generation task panicked: {e}"))??;
        tracing::info!(
            private = %key.private_key_path.display(),
            %fingerprint,
            "keypair written"
        );
        key.fingerprint = fingerprint;
        Ok(key)
    }

    async fn read_public_key(&self, key: &KeyMaterial) -> Result<String> {
        let path = &key.public_key_path;
        tokio::fs::read_to_string(path)
            .await
            .map_err(|e| SessionError::io(path, e).into())
    }

    async fn remove(&self, key: &KeyMaterial) -> Result<()> {
        for path in [&key.private_key_path, &key.public_key_path] {
            match tokio::fs::remove_file(path).await {
                Ok(()) => tracing::debug!(path = %path.display(), "removed"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    tracing::debug!(path = %path.display(), "already gone");
                }
                Err(e) => return Err(SessionError::io(path, e).into()),
            }
        }
        Ok(())
    }
}

/// Generate, encode and write both halves. Returns the SHA-256 fingerprint.
fn generate_blocking(key: &KeyMaterial, name: &str, bits: usize) -> Result<String> {
    let private = RsaPrivateKey::new(&mut rand::rngs::OsRng, bits)
        .map_err(|e| SessionError::Crypto(e.to_string()))?;
    let pem = private
        .to_pkcs8_pem(LineEnding::LF)
        .map_err(|e| SessionError::Crypto(e.to_string()))?;
    let rsa_public = ssh_key::public::RsaPublicKey::try_from(&private.to_public_key())
        .map_err(|e| SessionError::Crypto(e.to_string()))?;
    let public = PublicKey::new(KeyData::Rsa(rsa_public), name);
    let openssh = public
        .to_openssh()
        .map_err(|e| SessionError::Crypto(e.to_string()))?;

    write_private_key(&key.private_key_path, pem.as_bytes())?;
    if let Err(e) = write_new(&key.public_key_path, format!("{openssh}\n").as_bytes(), None) {
        // Never leave a private key without its public half.
        let _ = std::fs::remove_file(&key.private_key_path);
        return Err(e.into());
    }
    Ok(public.fingerprint(HashAlg::Sha256).to_string())
}

fn write_private_key(path: &Path, pem: &[u8]) -> Result<(), SessionError> {
    write_new(path, pem, Some(PRIVATE_KEY_MODE))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Err(e) =
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(PRIVATE_KEY_MODE))
        {
            let _ = std::fs::remove_file(path);
            return Err(SessionError::io(path, e));
        }
    }
    Ok(())
}

/// Write `contents` to a file that must not exist yet.
///
/// A file this call created is removed again if writing fails.
fn write_new(path: &Path, contents: &[u8], mode: Option<u32>) -> Result<(), SessionError> {
    let mut options = std::fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    if let Some(mode) = mode {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(mode);
    }
    #[cfg(not(unix))]
    let _ = mode;

    let mut file = options.open(path).map_err(|e| SessionError::io(path, e))?;
    if let Err(e) = file.write_all(contents).and_then(|()| file.sync_all()) {
        drop(file);
        let _ = std::fs::remove_file(path);
        return Err(SessionError::io(path, e));
    }
    Ok(())
}
