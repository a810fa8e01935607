//! Provider-neutral request and record types, plus the selection rules used
//! to confirm that a created resource really exists.
//!
//! Pure functions only: no I/O and no async.

use crate::domain::error::ProviderError;
use crate::domain::session::InstanceHandle;

// ── Requests ─────────────────────────────────────────────────────────────────

/// Fields sent when registering a public key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialRequest {
    pub name: String,
    pub public_key: String,
}

/// Fields sent when creating a droplet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceRequest {
    pub name: String,
    pub region: String,
    pub image: String,
    pub size: String,
    pub credential_id: String,
    pub backups_enabled: bool,
}

// ── Records ──────────────────────────────────────────────────────────────────

/// A public key as listed by the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteCredential {
    pub id: String,
    pub name: String,
}

/// Provider-reported droplet status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstanceStatus {
    New,
    Active,
    Off,
    Archive,
    Other(String),
}

impl InstanceStatus {
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw {
            "new" => Self::New,
            "active" => Self::Active,
            "off" => Self::Off,
            "archive" => Self::Archive,
            other => Self::Other(other.to_string()),
        }
    }
}

/// A droplet as listed by the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteInstance {
    pub id: String,
    pub name: String,
    pub status: InstanceStatus,
    /// Public IPv4 addresses, in provider order.
    pub ipv4: Vec<String>,
}

// ── Selection ────────────────────────────────────────────────────────────────

/// Picks the identifier of the credential called `name`.
///
/// When the create call already returned an identifier, the entry carrying it
/// wins over any other key with the same name; a name-only match must then
/// carry the same identifier.
///
/// # Errors
///
/// [`ProviderError::NotFound`] when no entry has that name,
/// [`ProviderError::IdMismatch`] when the only listed entries with that name
/// carry a different identifier.
pub fn select_credential_id(
    listed: &[RemoteCredential],
    name: &str,
    acknowledged: &str,
) -> Result<String, ProviderError> {
    let entry = pick(listed, name, acknowledged).ok_or_else(|| ProviderError::NotFound {
        kind: "ssh key",
        name: name.to_string(),
    })?;
    check_ack("ssh key", name, acknowledged, &entry.id)?;
    Ok(entry.id.clone())
}

/// Finds the droplet called `name`, preferring the one whose identifier is
/// `acknowledged`.
#[must_use]
pub fn find_instance<'a>(
    listed: &'a [RemoteInstance],
    name: &str,
    acknowledged: &str,
) -> Option<&'a RemoteInstance> {
    pick(listed, name, acknowledged)
}

trait Listed {
    fn id(&self) -> &str;
    fn name(&self) -> &str;
}

impl Listed for RemoteCredential {
    fn id(&self) -> &str {
        &self.id
    }
    fn name(&self) -> &str {
        &self.name
    }
}

impl Listed for RemoteInstance {
    fn id(&self) -> &str {
        &self.id
    }
    fn name(&self) -> &str {
        &self.name
    }
}

/// Exact `(name, acknowledged id)` match first, then the first entry with
/// that name. Stale resources may share a name with the one just created.
fn pick<'a, T: Listed>(listed: &'a [T], name: &str, acknowledged: &str) -> Option<&'a T> {
    let exact = (!acknowledged.is_empty())
        .then(|| {
            listed
                .iter()
                .find(|e| e.id() == acknowledged && e.name() == name)
        })
        .flatten();
    exact.or_else(|| listed.iter().find(|e| e.name() == name))
}

/// Builds a handle from a listed droplet once it is usable: active and with
/// at least one IPv4 address. The first address is used.
///
/// Returns `Ok(None)` while the droplet is still coming up.
///
/// # Errors
///
/// [`ProviderError::IdMismatch`] when the listed identifier differs from the
/// acknowledged one.
pub fn ready_handle(
    instance: &RemoteInstance,
    acknowledged: &str,
) -> Result<Option<InstanceHandle>, ProviderError> {
    check_ack("droplet", &instance.name, acknowledged, &instance.id)?;
    if instance.status != InstanceStatus::Active {
        return Ok(None);
    }
    Ok(instance.ipv4.first().map(|address| InstanceHandle {
        name: instance.name.clone(),
        remote_id: instance.id.clone(),
        address: address.clone(),
    }))
}

fn check_ack(
    kind: &'static str,
    name: &str,
    acknowledged: &str,
    listed: &str,
) -> Result<(), ProviderError> {
    if acknowledged.is_empty() || acknowledged == listed {
        return Ok(());
    }
    Err(ProviderError::IdMismatch {
        kind,
        name: name.to_string(),
        acknowledged: acknowledged.to_string(),
        listed: listed.to_string(),
    })
}
