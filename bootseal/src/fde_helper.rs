// Copyright 2026 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Sealing through an external FDE helper.
//!
//! Some gadgets ship an `fde-helper` executable that owns the sealing
//! of the disk-encryption key. The helper takes its request as JSON on
//! stdin. Load chains are sent as linked lists: each stage holds the
//! stage loaded after it in `next`.

use crate::bootloader::Role;
use crate::dirs::Dirs;
use crate::load_chain::LoadChain;
use crate::seal::{EncryptionKey, KeySealer, ModelGrade, SealKeyParams, SealerError};
use camino::{Utf8Path, Utf8PathBuf};
use log::{debug, info};
use serde::Serialize;
use std::io::{self, Write};
use std::process::{Command, ExitStatus, Stdio};

const HELPER_NAME: &str = "fde-helper";

#[derive(Debug, thiserror::Error)]
pub enum FdeHelperError {
    /// Failed to encode the request.
    #[error("failed to encode the request for {0}")]
    Encode(&'static str, #[source] serde_json::Error),

    /// Failed to run the helper or to talk to it.
    #[error("failed to run {program}")]
    Io {
        program: Utf8PathBuf,
        #[source]
        source: io::Error,
    },

    /// The helper exited with an error.
    #[error("{program} {arg} failed ({status}): {output}")]
    Failed {
        program: Utf8PathBuf,
        arg: &'static str,
        status: ExitStatus,
        /// Stdout followed by stderr of the helper, trimmed.
        output: String,
    },
}

#[derive(Debug, Serialize)]
struct LoadChainNode<'a> {
    path: &'a Utf8Path,
    #[serde(skip_serializing_if = "Option::is_none")]
    snap: Option<&'a str>,
    role: Role,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    next: Vec<LoadChainNode<'a>>,
}

impl<'a> LoadChainNode<'a> {
    /// Convert a flat chain into its first node. Returns `None` for an
    /// empty chain.
    fn from_chain(chain: &'a LoadChain) -> Option<Self> {
        chain.stages().iter().rev().fold(None, |next, stage| {
            Some(Self {
                path: &stage.path,
                snap: stage.snap.as_deref(),
                role: stage.role,
                next: next.into_iter().collect(),
            })
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "kebab-case")]
struct ModelParams<'a> {
    series: &'a str,
    brand_id: &'a str,
    model: &'a str,
    grade: ModelGrade,
    sign_key_id: &'a str,
    load_chains: Vec<LoadChainNode<'a>>,
    kernel_cmdlines: &'a [String],
}

fn model_params(params: &SealKeyParams) -> Vec<ModelParams<'_>> {
    params
        .model_params
        .iter()
        .map(|p| ModelParams {
            series: &p.model.series,
            brand_id: &p.model.brand_id,
            model: &p.model.model,
            grade: p.model.grade,
            sign_key_id: &p.model.sign_key_id,
            load_chains: p
                .efi_load_chains
                .iter()
                .filter_map(LoadChainNode::from_chain)
                .collect(),
            kernel_cmdlines: &p.kernel_cmdlines,
        })
        .collect()
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "kebab-case")]
struct InitialProvisionParams<'a> {
    key: String,
    model_params: Vec<ModelParams<'a>>,
}

impl<'a> InitialProvisionParams<'a> {
    fn new(key: &EncryptionKey, params: &'a SealKeyParams) -> Self {
        Self {
            key: hex::encode(key.as_bytes()),
            model_params: model_params(params),
        }
    }
}

/// Request to reseal an already provisioned key. The helper holds the
/// key, so only the new boot policy is sent.
#[derive(Debug, Serialize)]
#[serde(rename_all = "kebab-case")]
struct UpdateParams<'a> {
    model_params: Vec<ModelParams<'a>>,
}

/// The `fde-helper` executable shipped in a gadget.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FdeHelper {
    program: Utf8PathBuf,
}

impl FdeHelper {
    /// Helper found in the root of the gadget directory.
    pub fn new(gadget_dir: &Utf8Path) -> Self {
        Self {
            program: gadget_dir.join(HELPER_NAME),
        }
    }

    /// Helper copied to the boot partition of the installed system.
    pub fn installed(dirs: &Dirs) -> Self {
        Self {
            program: dirs.ubuntu_boot_dir().join(HELPER_NAME),
        }
    }

    pub fn program(&self) -> &Utf8Path {
        &self.program
    }

    /// Ask the helper whether this device supports encryption. An
    /// error means it does not, or that the helper could not be run.
    pub fn supported(&self) -> Result<(), FdeHelperError> {
        self.run("--supported", None)?;
        info!("FDE helper supported");
        Ok(())
    }

    /// Initialize the helper's sealing backend and seal `key` to the
    /// boot policy in `params`.
    ///
    /// The helper decides where the sealed key is stored, so the
    /// output file locations in `params` are not sent.
    pub fn initial_provision(
        &self,
        key: &EncryptionKey,
        params: &SealKeyParams,
    ) -> Result<(), FdeHelperError> {
        const ARG: &str = "--initial-provision";

        let request = serde_json::to_vec(&InitialProvisionParams::new(key, params))
            .map_err(|err| FdeHelperError::Encode(ARG, err))?;
        self.run(ARG, Some(request.as_slice()))
    }

    /// Reseal the provisioned key to the boot policy in `params`.
    pub fn update(&self, params: &SealKeyParams) -> Result<(), FdeHelperError> {
        const ARG: &str = "--update";

        let request = serde_json::to_vec(&UpdateParams {
            model_params: model_params(params),
        })
        .map_err(|err| FdeHelperError::Encode(ARG, err))?;
        self.run(ARG, Some(request.as_slice()))?;
        info!("FDE helper resealed the key");
        Ok(())
    }

    /// Run the helper with a single argument, optionally writing
    /// `stdin` to it.
    fn run(&self, arg: &'static str, stdin: Option<&[u8]>) -> Result<(), FdeHelperError> {
        let io_err = |source: io::Error| FdeHelperError::Io {
            program: self.program.clone(),
            source,
        };

        debug!("running {} {arg}", self.program);
        let mut child = Command::new(&self.program)
            .arg(arg)
            .stdin(if stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(io_err)?;

        // The helper may fill its output pipes before it has read all of
        // its input, so input is written while the output is drained.
        let output = std::thread::scope(|scope| {
            let writer = match (stdin, child.stdin.take()) {
                (Some(data), Some(mut pipe)) => Some(scope.spawn(move || {
                    // The pipe is closed when dropped, signalling end of
                    // input. A helper may exit without reading its input;
                    // its exit status decides the result.
                    match pipe.write_all(data) {
                        Err(err) if err.kind() != io::ErrorKind::BrokenPipe => Err(err),
                        _ => Ok(()),
                    }
                })),
                _ => None,
            };
            let output = child.wait_with_output();
            let written = match writer {
                Some(writer) => writer
                    .join()
                    .unwrap_or_else(|payload| std::panic::resume_unwind(payload)),
                None => Ok(()),
            };
            written.and(output)
        })
        .map_err(io_err)?;

        if output.status.success() {
            return Ok(());
        }

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));
        Err(FdeHelperError::Failed {
            program: self.program.clone(),
            arg,
            status: output.status,
            output: combined.trim().to_owned(),
        })
    }
}

impl KeySealer for FdeHelper {
    fn seal_key(&self, key: &EncryptionKey, params: SealKeyParams) -> Result<(), SealerError> {
        self.initial_provision(key, &params)?;
        Ok(())
    }
}
