//! Host key checks for the SSH connector.
//!
//! The decision logic is kept apart from russh so every policy can be
//! tested without a live server.

use crate::domain::model::HostKeyPolicy;
use std::path::PathBuf;

/// What known_hosts says about the presented key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KnownHostState {
    Match,
    Unknown,
    Changed { line: usize },
    Unreadable(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostKeyDecision {
    Accept,
    /// Accept and append the key to known_hosts.
    AcceptAndLearn,
    Reject(String),
}

impl HostKeyDecision {
    pub fn is_accepted(&self) -> bool {
        !matches!(self, HostKeyDecision::Reject(_))
    }
}

/// Strips an optional `SHA256:` prefix and base64 padding.
pub fn normalize_fingerprint(fingerprint: &str) -> String {
    let trimmed = fingerprint.trim();
    let body = match trimmed.get(..7) {
        Some(prefix) if prefix.eq_ignore_ascii_case("sha256:") => &trimmed[7..],
        _ => trimmed,
    };
    body.trim_end_matches('=').to_string()
}

pub fn default_known_hosts_path() -> Option<PathBuf> {
    std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".ssh").join("known_hosts"))
}

pub fn decide(policy: &HostKeyPolicy, fingerprint: &str, known: KnownHostState) -> HostKeyDecision {
    match policy {
        HostKeyPolicy::AcceptAny => HostKeyDecision::Accept,
        HostKeyPolicy::Pinned { fingerprint: pinned } => {
            if normalize_fingerprint(pinned) == normalize_fingerprint(fingerprint) {
                HostKeyDecision::Accept
            } else {
                HostKeyDecision::Reject(format!(
                    "host key SHA256:{} does not match the pinned fingerprint",
                    normalize_fingerprint(fingerprint)
                ))
            }
        }
        HostKeyPolicy::Verify => match known {
            KnownHostState::Match => HostKeyDecision::Accept,
            KnownHostState::Unknown => HostKeyDecision::Reject(format!(
                "host key SHA256:{} is not in known_hosts",
                normalize_fingerprint(fingerprint)
            )),
            KnownHostState::Changed { line } => HostKeyDecision::Reject(format!(
                "host key changed (known_hosts line {})",
                line
            )),
            KnownHostState::Unreadable(reason) => {
                HostKeyDecision::Reject(format!("cannot read known_hosts: {}", reason))
            }
        },
        HostKeyPolicy::TrustFirstUse => match known {
            KnownHostState::Match => HostKeyDecision::Accept,
            KnownHostState::Unknown => HostKeyDecision::AcceptAndLearn,
            KnownHostState::Changed { line } => HostKeyDecision::Reject(format!(
                "host key changed (known_hosts line {})",
                line
            )),
            // A missing file means nothing has been learned yet.
            KnownHostState::Unreadable(_) => HostKeyDecision::AcceptAndLearn,
        },
    }
}
