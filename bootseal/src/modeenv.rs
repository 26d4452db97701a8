// Copyright 2026 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! The boot-state record.
//!
//! The record is loaded by the caller before sealing and is never
//! modified here. Every hash list and the kernel list must have one
//! or two entries: one entry means the component is stable, two
//! entries mean an update from the first to the second is in flight
//! and both must remain bootable until it is confirmed. Lengths are
//! checked where the lists are consumed, see
//! [`cached_asset_pathnames`] and [`run_mode_kernels`].
//!
//! [`cached_asset_pathnames`]: crate::assets::cached_asset_pathnames
//! [`run_mode_kernels`]: crate::load_chain::run_mode_kernels

use std::collections::BTreeMap;

/// Map from a trusted asset's base name (for example `grubx64.efi`) to
/// its content-hash history.
pub type BootAssetsMap = BTreeMap<String, Vec<String>>;

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Modeenv {
    /// Label of the recovery system the device was installed from, or
    /// is booted into. Empty if unknown.
    pub recovery_system: String,

    /// Kernel snap file names, `[current]` or `[current, next]`.
    pub current_kernels: Vec<String>,

    /// Trusted assets of the run-mode bootloader.
    pub current_trusted_boot_assets: BootAssetsMap,

    /// Trusted assets of the recovery bootloader.
    pub current_trusted_recovery_boot_assets: BootAssetsMap,
}

impl Modeenv {
    /// Whether any component recorded here is in the middle of an
    /// update.
    #[must_use]
    pub fn is_transitioning(&self) -> bool {
        self.current_kernels.len() > 1
            || self
                .current_trusted_boot_assets
                .values()
                .chain(self.current_trusted_recovery_boot_assets.values())
                .any(|hashes| hashes.len() > 1)
    }
}


#[cfg(test)]
mod tests {
    use super::testing::assets;
    use super::*;

    #[test]
    fn test_is_transitioning() {
        let stable = Modeenv {
            recovery_system: "20200825".to_owned(),
            current_kernels: vec!["pc-kernel_500.snap".to_owned()],
            current_trusted_boot_assets: assets(&[("grubx64.efi", &["run-grub-hash-1"])]),
            current_trusted_recovery_boot_assets: assets(&[
                ("bootx64.efi", &["shim-hash-1"]),
                ("grubx64.efi", &["grub-hash-1"]),
            ]),
        };
        assert!(!stable.is_transitioning());

        let mut kernel_update = stable.clone();
        kernel_update
            .current_kernels
            .push("pc-kernel_501.snap".to_owned());
        assert!(kernel_update.is_transitioning());

        let mut recovery_update = stable.clone();
        recovery_update.current_trusted_recovery_boot_assets =
            assets(&[("grubx64.efi", &["grub-hash-1", "grub-hash-2"])]);
        assert!(recovery_update.is_transitioning());

        let mut run_update = stable;
        run_update.current_trusted_boot_assets =
            assets(&[("grubx64.efi", &["run-grub-hash-1", "run-grub-hash-2"])]);
        assert!(run_update.is_transitioning());
    }
}
