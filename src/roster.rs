//! Host list loading
//!
//! The host list is a line-oriented text file:
//!
//! ```text
//! # comment
//! 10.0.0.1 router
//! 10.0.0.2 server-b
//! ```
//!
//! Blank lines and lines starting with `#` are ignored. A line registers a
//! host when it has exactly two whitespace-separated tokens and the first one
//! is an IPv4 or IPv6 literal. Anything else is skipped with a warning and its
//! line number is kept in [`Roster::skipped`].

use crate::error::{Error, Result};
use std::fs;
use std::net::IpAddr;
use std::path::Path;
use tracing::{debug, warn};

/// A monitored host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Host {
    /// Address handed to the prober (IPv4/IPv6 literal)
    pub address: String,
    /// Display label
    pub label: String,
}

impl Host {
    pub fn new(address: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            label: label.into(),
        }
    }
}

impl std::fmt::Display for Host {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.address, self.label)
    }
}

/// Ordered set of hosts keyed by address
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Roster {
    hosts: Vec<Host>,
    /// 1-based numbers of lines that were skipped as malformed
    skipped: Vec<usize>,
}

impl Roster {
    /// Load the roster from a file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| Error::HostListRead {
            path: path.to_path_buf(),
            source: e,
        })?;

        let roster = Self::parse(&content);
        debug!(path = %path.display(), hosts = roster.len(), "Host list loaded");
        Ok(roster)
    }

    /// Parse host list text
    pub fn parse(content: &str) -> Self {
        let mut roster = Self::default();

        for (idx, raw) in content.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let parts: Vec<&str> = line.split_whitespace().collect();
            match parts.as_slice() {
                [address, label] if address.parse::<IpAddr>().is_ok() => {
                    roster.insert(Host::new(*address, *label))
                }
                [address, _] => {
                    warn!(
                        line = idx + 1,
                        address = *address,
                        content = line,
                        "Skipping host list line, address is not an IP literal"
                    );
                    roster.skipped.push(idx + 1);
                }
                _ => {
                    warn!(
                        line = idx + 1,
                        tokens = parts.len(),
                        content = line,
                        "Skipping malformed host list line (expected '<address> <label>')"
                    );
                    roster.skipped.push(idx + 1);
                }
            }
        }

        roster
    }

    /// Register a host
    ///
    /// A duplicate address overwrites the earlier label but keeps its position.
    pub fn insert(&mut self, host: Host) {
        if let Some(existing) = self.hosts.iter_mut().find(|h| h.address == host.address) {
            warn!(
                address = %host.address,
                old_label = %existing.label,
                new_label = %host.label,
                "Duplicate host address, keeping the later label"
            );
            existing.label = host.label;
        } else {
            self.hosts.push(host);
        }
    }

    /// Iterate hosts in registration order
    pub fn iter(&self) -> impl Iterator<Item = &Host> {
        self.hosts.iter()
    }

    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }

    /// Line numbers skipped while parsing
    pub fn skipped(&self) -> &[usize] {
        &self.skipped
    }
}

impl IntoIterator for Roster {
    type Item = Host;
    type IntoIter = std::vec::IntoIter<Host>;

    fn into_iter(self) -> Self::IntoIter {
        self.hosts.into_iter()
    }
}

#[cfg(test)]
impl Roster {
    /// Look up a host's label by address
    pub fn label(&self, address: &str) -> Option<&str> {
        self.hosts
            .iter()
            .find(|h| h.address == address)
            .map(|h| h.label.as_str())
    }
}
