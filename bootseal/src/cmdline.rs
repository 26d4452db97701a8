// Copyright 2026 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Kernel command lines the key is sealed to.
//!
//! The key is sealed to the command line of the installed system and
//! to that of the recovery system, so that a modified command line
//! cannot unseal it.

use crate::seal::Model;
use std::fmt::{self, Display, Formatter};

/// Error reported by a [`CommandLineComposer`].
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct CommandLineError(pub String);

/// Which of the two sealed kernel command lines is being composed.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum CommandLineKind {
    /// Command line of the system being installed, in run mode.
    Candidate,

    /// Command line of a recovery system, in recover mode.
    Recovery { system_label: String },
}

impl Display for CommandLineKind {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Self::Candidate => write!(f, "candidate kernel command line"),
            Self::Recovery { system_label } => write!(
                f,
                "recovery kernel command line for recovery system {system_label:?}"
            ),
        }
    }
}

/// Produces the kernel command lines the key is sealed to.
///
/// The composition rules (gadget-provided arguments, snapd mode
/// arguments) are owned by the implementation.
#[cfg_attr(test, mockall::automock)]
pub trait CommandLineComposer {
    /// Command line for booting the system being installed in run mode.
    fn candidate_command_line(&self, model: &Model) -> Result<String, CommandLineError>;

    /// Command line for booting the recovery system `system_label`.
    fn recovery_command_line(
        &self,
        model: &Model,
        system_label: &str,
    ) -> Result<String, CommandLineError>;
}
