//! SSH command-line construction and output parsing.
//!
//! Pure functions only. The process boundary lives in `crate::infra`.

use std::path::Path;

use anyhow::Result;

/// Program used for the tunnel.
pub const SSH_PROGRAM: &str = "ssh";

/// Validates that `key` is an OpenSSH RSA public key line with key material.
///
/// # Errors
///
/// Returns an error if the key does not start with `ssh-rsa `, has no key
/// material, or contains characters that do not belong in a key line.
pub fn validate_public_key(key: &str) -> Result<()> {
    let material = key
        .trim()
        .strip_prefix("ssh-rsa ")
        .ok_or_else(|| anyhow::anyhow!("public key must be an ssh-rsa key"))?;
    anyhow::ensure!(!material.trim().is_empty(), "public key has no key material");
    anyhow::ensure!(
        key.trim()
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || " +/=@._-".contains(c)),
        "public key contains invalid characters"
    );
    Ok(())
}

/// Argument vector for the SOCKS tunnel, program first.
///
/// `detach` adds `-f` so ssh backgrounds itself after authenticating.
#[must_use]
pub fn tunnel_command_line(
    private_key: &Path,
    user: &str,
    address: &str,
    local_port: u16,
    detach: bool,
) -> Vec<String> {
    let mut args = vec![
        SSH_PROGRAM.to_string(),
        "-o".to_string(),
        "IdentitiesOnly=yes".to_string(),
        "-o".to_string(),
        "StrictHostKeyChecking=no".to_string(),
        "-o".to_string(),
        "BatchMode=yes".to_string(),
        "-o".to_string(),
        "ExitOnForwardFailure=yes".to_string(),
        "-i".to_string(),
        private_key.to_string_lossy().into_owned(),
        "-N".to_string(),
        "-C".to_string(),
    ];
    if detach {
        args.push("-f".to_string());
    }
    args.extend([
        "-D".to_string(),
        local_port.to_string(),
        format!("{user}@{address}"),
    ]);
    args
}

/// `pgrep -f` pattern matching exactly the given command line.
///
/// `pgrep` treats its pattern as a POSIX extended regex, so ERE
/// metacharacters are escaped and the whole line is anchored.
#[must_use]
pub fn pgrep_pattern(command_line: &[String]) -> String {
    let line = command_line.join(" ");
    let mut pattern = String::with_capacity(line.len() + 2);
    pattern.push('^');
    for c in line.chars() {
        if ".[]()*+?{}|^$\\".contains(c) {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('$');
    pattern
}

/// Parses one PID per line, ignoring blanks and anything non-numeric.
#[must_use]
pub fn parse_pids(stdout: &str) -> Vec<u32> {
    stdout
        .lines()
        .filter_map(|l| l.trim().parse::<u32>().ok())
        .filter(|&pid| pid > 1)
        .collect()
}
