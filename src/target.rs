//! Resolved workload identity and its sanity checks.
//!
//! The resolver produces a [`ResolvedTarget`] from descriptor files, which
//! are not trusted input. Only a [`ValidatedTarget`] can reach the power
//! dispatcher, and the only way to build one is [`ResolvedTarget::validate`].

use std::fmt;

/// Descriptor directory name for QEMU virtual machines.
pub const KIND_QEMU: &str = "qemu-server";

/// Descriptor directory name for LXC containers.
pub const KIND_LXC: &str = "lxc";

/// Maximum accepted workload name length, in characters.
pub const MAX_NAME_LEN: usize = 255;

/// Workload identity as read from a descriptor file. Fields may be empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedTarget {
    /// Numeric workload id (descriptor file stem).
    pub id: String,
    /// Descriptor directory basename.
    pub kind: String,
    /// Value of the `name:` or `hostname:` line.
    pub name: String,
}

/// Kind of workload managed by the hypervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkloadKind {
    /// QEMU virtual machine, controlled with `qm`.
    Qemu,
    /// LXC container, controlled with `pct`.
    Lxc,
}

impl WorkloadKind {
    /// Parse a descriptor directory name. Matching is exact.
    pub fn from_dir_name(name: &str) -> Option<Self> {
        match name {
            KIND_QEMU => Some(Self::Qemu),
            KIND_LXC => Some(Self::Lxc),
            _ => None,
        }
    }

    /// Descriptor directory name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Qemu => KIND_QEMU,
            Self::Lxc => KIND_LXC,
        }
    }

    /// Control program for this kind.
    pub const fn program(self) -> &'static str {
        match self {
            Self::Qemu => "qm",
            Self::Lxc => "pct",
        }
    }

    /// Label used in log lines.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Qemu => "VM",
            Self::Lxc => "LXC",
        }
    }
}

impl fmt::Display for WorkloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A workload identity that passed every sanity check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedTarget {
    id: String,
    kind: WorkloadKind,
    name: String,
}

impl ValidatedTarget {
    /// Numeric workload id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Workload kind.
    pub fn kind(&self) -> WorkloadKind {
        self.kind
    }

    /// Workload name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Field-specific rejection of a resolved target.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TargetError {
    /// No descriptor matched the MAC address.
    #[error("could not find VM/LXC")]
    MissingId,
    /// The workload kind could not be determined.
    #[error("could not determine if VM or LXC")]
    MissingKind,
    /// The descriptor had no name.
    #[error("could not find VM/LXC name")]
    MissingName,
    /// The id is not purely decimal digits.
    #[error("invalid VM ID ({0})")]
    InvalidId(String),
    /// The kind is not `qemu-server` or `lxc`.
    #[error("invalid VM Type ({0})")]
    InvalidKind(String),
    /// The name contains characters other than letters, digits, `-`, `.`.
    #[error("invalid VM Name ({0})")]
    InvalidName(String),
    /// The name exceeds [`MAX_NAME_LEN`] characters.
    #[error("invalid VM Name: {length} characters exceeds the 255 character limit")]
    NameTooLong {
        /// Observed length in characters.
        length: usize,
    },
}

impl ResolvedTarget {
    /// Sanity-check every field and promote to a [`ValidatedTarget`].
    ///
    /// Emptiness is checked for all three fields before any format check.
    ///
    /// # Errors
    ///
    /// Returns the first [`TargetError`] found.
    pub fn validate(self) -> Result<ValidatedTarget, TargetError> {
        if self.id.is_empty() {
            return Err(TargetError::MissingId);
        }
        if self.kind.is_empty() {
            return Err(TargetError::MissingKind);
        }
        if self.name.is_empty() {
            return Err(TargetError::MissingName);
        }

        if !self.id.chars().all(|c| c.is_ascii_digit()) {
            return Err(TargetError::InvalidId(self.id));
        }

        let kind = WorkloadKind::from_dir_name(&self.kind)
            .ok_or_else(|| TargetError::InvalidKind(self.kind.clone()))?;

        let length = self.name.chars().count();
        if length > MAX_NAME_LEN {
            return Err(TargetError::NameTooLong { length });
        }
        if !self
            .name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.')
        {
            return Err(TargetError::InvalidName(self.name));
        }

        Ok(ValidatedTarget {
            id: self.id,
            kind,
            name: self.name,
        })
    }
}
