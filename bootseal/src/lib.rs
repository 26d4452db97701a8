// Copyright 2026 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Planning layer for sealing a disk-encryption key to measured boot.
//!
//! A device measures every stage of its boot (shim, bootloader,
//! kernel) into the TPM before the OS starts. A key sealed to those
//! measurements can only be unsealed if the device boots exactly one
//! of the load chains the key was sealed to. During an update, the
//! old and new versions of a component must both stay bootable until
//! the update is confirmed, so the key has to be sealed to both.
//!
//! This crate takes the boot-state record ([`Modeenv`]), expands it
//! into the set of load chains for run mode and recover mode, and
//! assembles the parameters handed to the sealing primitive:
//!
//! 1. [`assets`] maps an asset's hash history to cached file paths.
//! 2. [`load_chain`] builds the before/after sequences for each
//!    bootloader and each boot mode, and collapses them when nothing
//!    is transitioning.
//! 3. [`seal`] combines the chains with the kernel command lines and
//!    the output file locations, then calls the sealer once.
//!
//! Bootloaders, the command-line composer and the sealer itself are
//! collaborators consumed through traits.

#![deny(clippy::cast_lossless)]
#![deny(clippy::cast_possible_truncation)]
#![deny(clippy::cast_possible_wrap)]
#![deny(clippy::cast_precision_loss)]
#![deny(clippy::cast_sign_loss)]
#![deny(clippy::ptr_as_ptr)]

pub mod assets;
pub mod bootloader;
pub mod cmdline;
pub mod dirs;
pub mod fde_helper;
pub mod load_chain;
pub mod modeenv;
pub mod seal;

pub use bootloader::{Bootloader, RecoveryAwareBootloader, Role, TrustedAssetsBootloader};
pub use cmdline::CommandLineComposer;
pub use dirs::Dirs;
pub use fde_helper::FdeHelper;
pub use load_chain::{BootStage, LoadChain, LoadChainError};
pub use modeenv::{BootAssetsMap, Modeenv};
pub use seal::{EncryptionKey, KeySealer, KeySealing, Model, ModelGrade, SealError, SealKeyParams};
