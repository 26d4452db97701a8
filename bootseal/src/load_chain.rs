// Copyright 2026 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! EFI load chains.
//!
//! A load chain is the ordered list of binaries the firmware and the
//! bootloaders measure before the OS starts. For each boot mode, the
//! modeenv is expanded into two parallel sequences: `before` uses the
//! current version of every component, `after` uses the next version
//! of every component that is being updated. If nothing is being
//! updated the two sequences are identical and only one chain is
//! produced.
//!
//! Recover mode:
//!
//! ```text
//! shim -> recovery grub -> recovery system kernel
//! ```
//!
//! Run mode:
//!
//! ```text
//! shim -> recovery grub -> run-mode grub -> run-mode kernel
//! ```
//!
//! Chains mixing old and new versions of different components are not
//! produced. See `DESIGN.md` for the reasoning.

use crate::assets::{cached_asset_pathnames, trusted_asset_names};
use crate::bootloader::{Bootloader, BootloaderError, Role};
use crate::dirs::{clean_join, Dirs};
use crate::modeenv::{BootAssetsMap, Modeenv};
use camino::{Utf8Path, Utf8PathBuf};
use log::{debug, info};

/// Recovery system environment key naming the recovery kernel.
const RECOVERY_KERNEL_ENV_KEY: &str = "snapd_recovery_kernel";

#[derive(Debug, thiserror::Error)]
pub enum LoadChainError {
    /// A trusted asset reported by the bootloader has no entry in the
    /// modeenv.
    #[error("cannot find asset {asset} of bootloader {bootloader} in modeenv")]
    AssetNotFound { bootloader: String, asset: String },

    /// A trusted asset has a hash list that is not one or two entries
    /// long.
    #[error(
        "invalid number of hashes ({count}) for asset {asset} of bootloader {bootloader} in modeenv"
    )]
    InvalidHashCount {
        bootloader: String,
        asset: String,
        count: usize,
    },

    /// The kernel list is not one or two entries long.
    #[error("invalid number of kernels ({0}) in modeenv")]
    InvalidKernelCount(usize),

    /// The bootloader does not expose its trusted assets.
    #[error("bootloader {0} doesn't support trusted assets")]
    UnsupportedBootloader(String),

    /// The bootloader failed to list its trusted assets.
    #[error("cannot get the trusted assets of bootloader {bootloader}")]
    TrustedAssetsUnavailable {
        bootloader: String,
        #[source]
        source: BootloaderError,
    },

    /// The modeenv does not name a recovery system.
    #[error("recovery system is not defined in modeenv")]
    RecoverySystemUndefined,

    /// The kernel of the recovery system could not be determined.
    #[error("cannot determine kernel for recovery system {label:?}")]
    RecoveryKernelUnresolvable {
        label: String,
        #[source]
        source: RecoveryKernelError,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum RecoveryKernelError {
    /// The bootloader cannot read recovery system environments.
    #[error("bootloader {0} is not recovery aware")]
    NotRecoveryAware(String),

    /// The recovery system environment does not name a kernel.
    #[error("kernel is not set in the recovery system environment")]
    Unset,

    /// Failed to read the recovery system environment.
    #[error("failed to read the recovery system environment")]
    Env(#[source] BootloaderError),
}

/// One measured binary in a load chain.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BootStage {
    /// Path of the binary. This identifies what is measured.
    pub path: Utf8PathBuf,

    /// Bootloader the stage belongs to.
    pub role: Role,

    /// File name of the kernel snap, for kernel stages only.
    pub snap: Option<String>,
}

impl BootStage {
    fn asset(path: Utf8PathBuf, role: Role) -> Self {
        Self {
            path,
            role,
            snap: None,
        }
    }

    fn kernel(path: Utf8PathBuf, role: Role, snap: &str) -> Self {
        Self {
            path,
            role,
            snap: Some(snap.to_owned()),
        }
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct LoadChain(Vec<BootStage>);

impl LoadChain {
    pub fn stages(&self) -> &[BootStage] {
        &self.0
    }

    /// Paths of all stages, in load order.
    pub fn paths(&self) -> impl Iterator<Item = &Utf8Path> {
        self.0.iter().map(|stage| stage.path.as_path())
    }
}

impl From<Vec<BootStage>> for LoadChain {
    fn from(stages: Vec<BootStage>) -> Self {
        Self(stages)
    }
}

/// Parallel before/after sequences, always of equal length.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct LoadSequences {
    pub before: Vec<BootStage>,
    pub after: Vec<BootStage>,
}

impl LoadSequences {
    fn push(&mut self, before: BootStage, after: BootStage) {
        self.before.push(before);
        self.after.push(after);
    }

    fn append(&mut self, other: LoadSequences) {
        self.before.extend(other.before);
        self.after.extend(other.after);
    }

    /// Collapse into the final chain set, see [`dedup_sequences`].
    pub fn into_chains(self) -> Vec<LoadChain> {
        dedup_sequences(self.before, self.after)
    }
}

/// Turn a before/after pair into a chain set.
///
/// If the sequences are identical a single chain is returned,
/// otherwise the `before` chain followed by the `after` chain.
pub fn dedup_sequences(before: Vec<BootStage>, after: Vec<BootStage>) -> Vec<LoadChain> {
    if before == after {
        vec![LoadChain(before)]
    } else {
        vec![LoadChain(before), LoadChain(after)]
    }
}

/// Build the load sequences of the trusted assets of `bootloader`, one
/// stage per asset in the order the bootloader loads them.
pub fn load_sequences_for_bootloader(
    dirs: &Dirs,
    bootloader: &dyn Bootloader,
    role: Role,
    assets: &BootAssetsMap,
) -> Result<LoadSequences, LoadChainError> {
    let names = trusted_asset_names(bootloader)?;

    let mut sequences = LoadSequences::default();
    for name in &names {
        let (before, after) = cached_asset_pathnames(dirs, bootloader.name(), name, assets)?;
        sequences.push(BootStage::asset(before, role), BootStage::asset(after, role));
    }

    Ok(sequences)
}

/// Get the kernel stage of the recovery system named in the modeenv.
///
/// The recovery bootloader records the kernel of each recovery system
/// as a path relative to the seed. The path is normalized when joined
/// onto the seed directory.
pub fn recover_mode_kernel(
    dirs: &Dirs,
    bootloader: &dyn Bootloader,
    modeenv: &Modeenv,
) -> Result<BootStage, LoadChainError> {
    let label = modeenv.recovery_system.as_str();
    if label.is_empty() {
        return Err(LoadChainError::RecoverySystemUndefined);
    }
    let unresolvable = |source: RecoveryKernelError| LoadChainError::RecoveryKernelUnresolvable {
        label: label.to_owned(),
        source,
    };

    let recovery = bootloader.as_recovery_aware().ok_or_else(|| {
        unresolvable(RecoveryKernelError::NotRecoveryAware(
            bootloader.name().to_owned(),
        ))
    })?;

    let kernel = recovery
        .recovery_system_env(label, RECOVERY_KERNEL_ENV_KEY)
        .map_err(|err| unresolvable(RecoveryKernelError::Env(err)))?;
    let relative = kernel.trim_start_matches('/');
    if relative.is_empty() {
        return Err(unresolvable(RecoveryKernelError::Unset));
    }

    let path = clean_join(dirs.snap_seed_dir(), relative);
    let snap = Utf8Path::new(relative)
        .file_name()
        .unwrap_or(relative)
        .to_owned();
    Ok(BootStage::kernel(path, Role::Recovery, &snap))
}

/// Get the current and next run-mode kernel stages.
///
/// With a single kernel in the modeenv both stages are the same.
pub fn run_mode_kernels(
    dirs: &Dirs,
    modeenv: &Modeenv,
) -> Result<(BootStage, BootStage), LoadChainError> {
    let kernel_stage = |snap: &str| {
        BootStage::kernel(clean_join(dirs.snap_blob_dir(), snap), Role::RunMode, snap)
    };

    match modeenv.current_kernels.as_slice() {
        [current] => {
            let current = kernel_stage(current);
            Ok((current.clone(), current))
        }
        [current, next] => Ok((kernel_stage(current), kernel_stage(next))),
        kernels => Err(LoadChainError::InvalidKernelCount(kernels.len())),
    }
}

/// Build the load chains for booting into the recovery system.
///
/// Recovery systems are not updated in place, so the kernel stage is
/// the same in both sequences; only the recovery bootloader assets can
/// differ.
pub fn recover_mode_load_chains(
    dirs: &Dirs,
    recovery_bootloader: &dyn Bootloader,
    modeenv: &Modeenv,
) -> Result<Vec<LoadChain>, LoadChainError> {
    info!(
        "building recover mode load chains for recovery system {:?}",
        modeenv.recovery_system
    );

    let mut sequences = load_sequences_for_bootloader(
        dirs,
        recovery_bootloader,
        Role::Recovery,
        &modeenv.current_trusted_recovery_boot_assets,
    )?;

    let kernel = recover_mode_kernel(dirs, recovery_bootloader, modeenv)?;
    sequences.push(kernel.clone(), kernel);

    let chains = sequences.into_chains();
    debug!("recover mode load chains: {chains:?}");
    Ok(chains)
}

/// Build the load chains for booting the installed system.
///
/// The recovery bootloader always runs first and chains to the run-mode
/// bootloader, which loads the kernel.
pub fn run_mode_load_chains(
    dirs: &Dirs,
    recovery_bootloader: &dyn Bootloader,
    bootloader: &dyn Bootloader,
    modeenv: &Modeenv,
) -> Result<Vec<LoadChain>, LoadChainError> {
    info!("building run mode load chains");

    let mut sequences = load_sequences_for_bootloader(
        dirs,
        recovery_bootloader,
        Role::Recovery,
        &modeenv.current_trusted_recovery_boot_assets,
    )?;
    sequences.append(load_sequences_for_bootloader(
        dirs,
        bootloader,
        Role::RunMode,
        &modeenv.current_trusted_boot_assets,
    )?);

    let (current, next) = run_mode_kernels(dirs, modeenv)?;
    sequences.push(current, next);

    let chains = sequences.into_chains();
    debug!("run mode load chains: {chains:?}");
    Ok(chains)
}
