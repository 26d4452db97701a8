// Copyright 2026 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Assemble the sealing parameters and seal the key.

use crate::bootloader::Bootloader;
use crate::cmdline::{CommandLineComposer, CommandLineError, CommandLineKind};
use crate::dirs::Dirs;
use crate::fde_helper::FdeHelperError;
use crate::load_chain::{
    recover_mode_load_chains, run_mode_load_chains, LoadChain, LoadChainError,
};
use crate::modeenv::Modeenv;
use camino::Utf8PathBuf;
use log::info;
use serde::Serialize;
use std::fmt::{self, Debug, Formatter};

/// Length in bytes of a disk-encryption key.
pub const ENCRYPTION_KEY_SIZE: usize = 64;

/// Disk-encryption key.
///
/// The `Debug` impl does not print the key material.
#[derive(Clone, Eq, PartialEq)]
pub struct EncryptionKey([u8; ENCRYPTION_KEY_SIZE]);

impl EncryptionKey {
    pub fn as_bytes(&self) -> &[u8; ENCRYPTION_KEY_SIZE] {
        &self.0
    }
}

impl From<[u8; ENCRYPTION_KEY_SIZE]> for EncryptionKey {
    fn from(bytes: [u8; ENCRYPTION_KEY_SIZE]) -> Self {
        Self(bytes)
    }
}

impl Debug for EncryptionKey {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str("EncryptionKey(..)")
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelGrade {
    Dangerous,
    Signed,
    Secured,
}

/// Identity of the device model the key is sealed for.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Model {
    pub series: String,
    pub brand_id: String,
    pub model: String,
    pub grade: ModelGrade,
    pub sign_key_id: String,
    pub display_name: String,
}

/// Boot policy of one model.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SealKeyModelParams {
    pub model: Model,

    /// `[candidate, recovery]`.
    pub kernel_cmdlines: Vec<String>,

    /// Run mode chains, then recover mode chains.
    pub efi_load_chains: Vec<LoadChain>,
}

/// Everything the sealing primitive needs besides the key.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SealKeyParams {
    pub model_params: Vec<SealKeyModelParams>,

    /// Where the sealed key object is written.
    pub key_file: Utf8PathBuf,

    /// Where the data needed to update the policy later is written.
    pub tpm_policy_update_data_file: Utf8PathBuf,

    /// Where the TPM lockout authorization value is written.
    pub tpm_lockout_auth_file: Utf8PathBuf,
}

#[derive(Debug, thiserror::Error)]
pub enum SealerError {
    /// The FDE helper rejected the request.
    #[error("FDE helper failed")]
    FdeHelper(#[from] FdeHelperError),

    /// Failure reported by any other sealing backend.
    #[error("{0}")]
    Other(String),
}

/// The sealing primitive.
#[cfg_attr(test, mockall::automock)]
pub trait KeySealer {
    /// Seal `key` to the boot policy described by `params` and write
    /// the outputs to the files named in `params`.
    fn seal_key(&self, key: &EncryptionKey, params: SealKeyParams) -> Result<(), SealerError>;
}

#[derive(Debug, thiserror::Error)]
pub enum SealError {
    #[error("cannot build recover mode load sequences")]
    RecoverModeChains(#[source] LoadChainError),

    #[error("cannot build run mode load sequences")]
    RunModeChains(#[source] LoadChainError),

    #[error("cannot obtain {kind}")]
    CommandLineCompositionFailed {
        kind: CommandLineKind,
        #[source]
        source: CommandLineError,
    },

    #[error("cannot seal the encryption key")]
    SealingPrimitiveFailed(#[source] SealerError),
}

/// Seals keys at install time, using the collaborators it was
/// constructed with.
pub struct KeySealing<'a> {
    pub dirs: &'a Dirs,

    /// Bootloader in the seed partition.
    pub recovery_bootloader: &'a dyn Bootloader,

    /// Bootloader in the boot partition.
    pub bootloader: &'a dyn Bootloader,

    pub cmdline: &'a dyn CommandLineComposer,
    pub sealer: &'a dyn KeySealer,
}

impl KeySealing<'_> {
    /// Build the sealing parameters for `model` and the boot state in
    /// `modeenv`, without sealing anything.
    pub fn seal_key_params(
        &self,
        model: &Model,
        modeenv: &Modeenv,
    ) -> Result<SealKeyParams, SealError> {
        if modeenv.is_transitioning() {
            info!("boot state is transitioning, sealing to old and new chains");
        }

        let recover_chains = recover_mode_load_chains(self.dirs, self.recovery_bootloader, modeenv)
            .map_err(SealError::RecoverModeChains)?;
        let run_chains = run_mode_load_chains(
            self.dirs,
            self.recovery_bootloader,
            self.bootloader,
            modeenv,
        )
        .map_err(SealError::RunModeChains)?;

        let candidate = self.cmdline.candidate_command_line(model).map_err(|source| {
            SealError::CommandLineCompositionFailed {
                kind: CommandLineKind::Candidate,
                source,
            }
        })?;
        let recovery = self
            .cmdline
            .recovery_command_line(model, &modeenv.recovery_system)
            .map_err(|source| SealError::CommandLineCompositionFailed {
                kind: CommandLineKind::Recovery {
                    system_label: modeenv.recovery_system.clone(),
                },
                source,
            })?;

        let mut efi_load_chains = run_chains;
        efi_load_chains.extend(recover_chains);

        Ok(SealKeyParams {
            model_params: vec![SealKeyModelParams {
                model: model.clone(),
                kernel_cmdlines: vec![candidate, recovery],
                efi_load_chains,
            }],
            key_file: self.dirs.sealed_key_file(),
            tpm_policy_update_data_file: self.dirs.policy_update_data_file(),
            tpm_lockout_auth_file: self.dirs.lockout_auth_file(),
        })
    }

    /// Seal `key` so that it can only be unsealed by booting one of
    /// the run mode or recover mode chains of the boot state in
    /// `modeenv`.
    pub fn seal_key_to_modeenv(
        &self,
        key: &EncryptionKey,
        model: &Model,
        modeenv: &Modeenv,
    ) -> Result<(), SealError> {
        let params = self.seal_key_params(model, modeenv)?;
        info!(
            "sealing key for model {}/{} to {} load chains",
            model.brand_id,
            model.model,
            params
                .model_params
                .iter()
                .map(|p| p.efi_load_chains.len())
                .sum::<usize>()
        );

        self.sealer
            .seal_key(key, params)
            .map_err(SealError::SealingPrimitiveFailed)?;
        info!("key sealed");
        Ok(())
    }
}
