// Copyright 2026 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Bootloader capabilities needed to plan load chains.
//!
//! Concrete bootloaders live elsewhere. A bootloader exposes each
//! optional capability as a facet; callers check for the facet and
//! fail if it is missing.

use camino::Utf8PathBuf;
use serde::Serialize;
use std::fmt::{self, Display, Formatter};

/// Error reported by a bootloader while answering a query.
#[derive(Debug, thiserror::Error)]
pub enum BootloaderError {
    /// Failed to read bootloader state from disk.
    #[error("failed to read {path}")]
    Io {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The requested recovery system does not exist.
    #[error("recovery system {0:?} not found")]
    RecoverySystemNotFound(String),

    /// Bootloader state on disk is not in the expected format.
    #[error("malformed bootloader state: {0}")]
    Malformed(String),
}

/// Which bootloader a boot stage belongs to.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub enum Role {
    /// The bootloader in the seed partition, which always runs first.
    #[serde(rename = "recovery")]
    Recovery,

    /// The bootloader in the boot partition, chained from the recovery
    /// bootloader when booting in run mode.
    #[serde(rename = "run-mode")]
    RunMode,
}

impl Display for Role {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Self::Recovery => write!(f, "recovery"),
            Self::RunMode => write!(f, "run-mode"),
        }
    }
}

pub trait Bootloader {
    /// Name of the bootloader, for example `grub`. This is also the
    /// name of the bootloader's directory in the boot assets cache.
    fn name(&self) -> &str;

    /// Get the trusted assets facet, if supported.
    fn as_trusted_assets(&self) -> Option<&dyn TrustedAssetsBootloader> {
        None
    }

    /// Get the recovery-aware facet, if supported.
    fn as_recovery_aware(&self) -> Option<&dyn RecoveryAwareBootloader> {
        None
    }
}

/// A bootloader whose binaries are measured and whose hashes are
/// tracked in the modeenv.
#[cfg_attr(test, mockall::automock)]
pub trait TrustedAssetsBootloader {
    /// Paths of the binaries this bootloader measures, in load order.
    fn trusted_assets(&self) -> Result<Vec<Utf8PathBuf>, BootloaderError>;
}

/// A bootloader that can boot recovery systems.
#[cfg_attr(test, mockall::automock)]
pub trait RecoveryAwareBootloader {
    /// Read the value of `key` from the environment of the recovery
    /// system labelled `system_label`.
    ///
    /// An unset key is returned as an empty string.
    fn recovery_system_env(&self, system_label: &str, key: &str)
        -> Result<String, BootloaderError>;
}


#[cfg(test)]
mod tests {
    use super::testing::FakeBootloader;
    use super::*;

    #[test]
    fn test_facets() {
        let plain = FakeBootloader::plain("mock");
        assert_eq!(plain.name(), "mock");
        assert!(plain.as_trusted_assets().is_none());
        assert!(plain.as_recovery_aware().is_none());

        let grub = FakeBootloader::with_trusted_assets("grub", &["/EFI/boot/grubx64.efi"])
            .recovery_system("20200825", "/snaps/pc-kernel_1.snap");
        assert_eq!(
            grub.as_trusted_assets().unwrap().trusted_assets().unwrap(),
            [Utf8PathBuf::from("/EFI/boot/grubx64.efi")]
        );
        let recovery = grub.as_recovery_aware().unwrap();
        assert_eq!(
            recovery
                .recovery_system_env("20200825", "snapd_recovery_kernel")
                .unwrap(),
            "/snaps/pc-kernel_1.snap"
        );
        assert!(matches!(
            recovery.recovery_system_env("0", "snapd_recovery_kernel"),
            Err(BootloaderError::RecoverySystemNotFound(label)) if label == "0"
        ));
    }

    #[test]
    fn test_role_display() {
        assert_eq!(Role::Recovery.to_string(), "recovery");
        assert_eq!(Role::RunMode.to_string(), "run-mode");
    }
}
