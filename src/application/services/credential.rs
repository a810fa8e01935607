//! Application service: transient keypair and its uploaded credential.
//!
//! Imports only from `crate::domain` and `crate::application`.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};

use crate::application::ports::{KeyStore, ProgressReporter, RemoteProvider};
use crate::application::services::teardown::TeardownStack;
use crate::domain::{CredentialRequest, KeyMaterial, provider, ssh};

/// Register removal of the keypair's files, then generate it.
///
/// The removal is registered first: generation runs on a blocking thread
/// that keeps writing even if this future is dropped. A generation that
/// fails has already rolled back its own files, so the removal is disarmed
/// and anything else found under that name is left alone.
///
/// # Errors
///
/// Returns an error if key generation or writing fails.
pub async fn generate<'a>(
    keys: &'a impl KeyStore,
    name: &str,
    stack: &mut TeardownStack<'a>,
    reporter: &impl ProgressReporter,
) -> Result<KeyMaterial> {
    reporter.step(&format!("generating keypair {name}..."));
    let registered = keys.paths(name);
    let armed = Arc::new(AtomicBool::new(true));
    let still_armed = Arc::clone(&armed);
    stack.push(format!("removing key files for {name}"), move || async move {
        if still_armed.load(Ordering::SeqCst) {
            keys.remove(&registered).await
        } else {
            Ok(())
        }
    });
    let key = match keys.generate(name).await {
        Ok(key) => key,
        Err(e) => {
            armed.store(false, Ordering::SeqCst);
            return Err(e.context(format!("generating keypair {name}")));
        }
    };
    reporter.success(&format!("keypair {name} generated ({})", key.fingerprint));
    Ok(key)
}

/// Upload the public key and register its deletion under the acknowledged id.
///
/// Returns the acknowledged id. The deletion is registered before anything
/// else can fail, so a failed [`confirm`] never leaves the key on the account.
///
/// # Errors
///
/// Returns an error if the public key cannot be read or is malformed, or
/// if the provider rejects the upload.
pub async fn register<'a>(
    provider: &'a impl RemoteProvider,
    keys: &impl KeyStore,
    key: &KeyMaterial,
    stack: &mut TeardownStack<'a>,
    reporter: &impl ProgressReporter,
) -> Result<String> {
    reporter.step(&format!("uploading ssh key {}...", key.name));
    let public_key = keys.read_public_key(key).await?;
    ssh::validate_public_key(&public_key)?;
    let request = CredentialRequest {
        name: key.name.clone(),
        public_key: public_key.trim().to_string(),
    };
    let ack = provider
        .create_credential(&request)
        .await
        .with_context(|| format!("uploading ssh key {}", key.name))?;
    tracing::info!(name = %key.name, id = %ack, "ssh key acknowledged");

    let id = ack.clone();
    stack.push(format!("deleting ssh key {} ({ack})", key.name), move || async move {
        provider.destroy_credential(&id).await
    });
    Ok(ack)
}

/// Confirm the upload by listing keys and selecting the one named `key.name`.
///
/// Returns that entry's id, which always equals `ack`.
///
/// # Errors
///
/// Returns a [`crate::domain::ProviderError`] if the key is not listed or is
/// listed under a different id.
pub async fn confirm(
    provider: &impl RemoteProvider,
    key: &mut KeyMaterial,
    ack: &str,
    reporter: &impl ProgressReporter,
) -> Result<String> {
    let listed = provider
        .list_credentials()
        .await
        .context("listing ssh keys")?;
    let id = provider::select_credential_id(&listed, &key.name, ack)?;
    key.remote_id = Some(id.clone());
    reporter.success(&format!("ssh key {} uploaded (id {id})", key.name));
    Ok(id)
}
