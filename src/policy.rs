//! Security policy store
//!
//! Holds the allow-lists and limits every request is checked against.
//! Built once at startup and shared read-only behind an `Arc`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Literal that switches an allow-list to unrestricted mode
pub const ALLOW_ALL: &str = "all";

/// Default allowed commands
pub const DEFAULT_ALLOWED_COMMANDS: &str = "ls,cat,pwd";

/// Default allowed flags
pub const DEFAULT_ALLOWED_FLAGS: &str = "-l,-a,--help";

/// Default maximum raw command length (characters)
pub const DEFAULT_MAX_COMMAND_LENGTH: usize = 1024;

/// Default command timeout (seconds)
pub const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 30;

/// Allow-list that is either an explicit set or a wildcard
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllowList {
    /// Only the enumerated entries are permitted
    Restricted(BTreeSet<String>),
    /// Everything is permitted
    Unrestricted,
}

impl AllowList {
    /// Build a restricted list from entries
    pub fn restricted<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        AllowList::Restricted(entries.into_iter().map(Into::into).collect())
    }

    /// Parse a comma-separated list, or the literal `all` (case-insensitive).
    ///
    /// Entries are trimmed and empty entries dropped.
    pub fn parse(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case(ALLOW_ALL) {
            return AllowList::Unrestricted;
        }

        AllowList::Restricted(
            raw.split(',')
                .map(str::trim)
                .filter(|entry| !entry.is_empty())
                .map(String::from)
                .collect(),
        )
    }

    /// Exact-match membership test
    pub fn permits(&self, entry: &str) -> bool {
        match self {
            AllowList::Restricted(set) => set.contains(entry),
            AllowList::Unrestricted => true,
        }
    }

    pub fn is_unrestricted(&self) -> bool {
        matches!(self, AllowList::Unrestricted)
    }

    /// Entries in sorted order (empty when unrestricted)
    pub fn entries(&self) -> Vec<&str> {
        match self {
            AllowList::Restricted(set) => set.iter().map(String::as_str).collect(),
            AllowList::Unrestricted => Vec::new(),
        }
    }

    /// Human readable listing, `all_label` used for the wildcard
    pub fn describe(&self, all_label: &str) -> String {
        match self {
            AllowList::Restricted(_) => self.entries().join(", "),
            AllowList::Unrestricted => all_label.to_string(),
        }
    }
}

/// Immutable security configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityPolicy {
    pub allowed_commands: AllowList,
    pub allowed_flags: AllowList,
    pub max_command_length: usize,
    pub command_timeout: Duration,
}

impl Default for SecurityPolicy {
    fn default() -> Self {
        Self {
            allowed_commands: AllowList::parse(DEFAULT_ALLOWED_COMMANDS),
            allowed_flags: AllowList::parse(DEFAULT_ALLOWED_FLAGS),
            max_command_length: DEFAULT_MAX_COMMAND_LENGTH,
            command_timeout: Duration::from_secs(DEFAULT_COMMAND_TIMEOUT_SECS),
        }
    }
}

impl SecurityPolicy {
    /// Create policy from explicit allow-lists
    pub fn new(allowed_commands: AllowList, allowed_flags: AllowList) -> Self {
        Self {
            allowed_commands,
            allowed_flags,
            ..Default::default()
        }
    }

    /// Set maximum command length
    pub fn with_max_command_length(mut self, max: usize) -> Self {
        self.max_command_length = max;
        self
    }

    /// Set command timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    pub fn allow_all_commands(&self) -> bool {
        self.allowed_commands.is_unrestricted()
    }

    pub fn allow_all_flags(&self) -> bool {
        self.allowed_flags.is_unrestricted()
    }
}

/// Read-only snapshot of the active policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicySummary {
    pub working_directory: PathBuf,
    pub allowed_commands: AllowList,
    pub allowed_flags: AllowList,
    pub max_command_length: usize,
    pub command_timeout_secs: u64,
}

impl PolicySummary {
    pub fn new(policy: &SecurityPolicy, working_directory: PathBuf) -> Self {
        Self {
            working_directory,
            allowed_commands: policy.allowed_commands.clone(),
            allowed_flags: policy.allowed_flags.clone(),
            max_command_length: policy.max_command_length,
            command_timeout_secs: policy.command_timeout.as_secs(),
        }
    }
}

impl fmt::Display for PolicySummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Security Configuration:")?;
        writeln!(f, "==================")?;
        writeln!(f, "Working Directory: {}", self.working_directory.display())?;
        writeln!(f)?;
        writeln!(f, "Allowed Commands:")?;
        writeln!(f, "----------------")?;
        writeln!(f, "{}", self.allowed_commands.describe("All commands allowed"))?;
        writeln!(f)?;
        writeln!(f, "Allowed Flags:")?;
        writeln!(f, "-------------")?;
        writeln!(f, "{}", self.allowed_flags.describe("All flags allowed"))?;
        writeln!(f)?;
        writeln!(f, "Security Limits:")?;
        writeln!(f, "---------------")?;
        writeln!(f, "Max Command Length: {} characters", self.max_command_length)?;
        writeln!(f, "Command Timeout: {} seconds", self.command_timeout_secs)
    }
}
