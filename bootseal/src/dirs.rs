// Copyright 2026 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Well-known directories used when planning and sealing.
//!
//! All locations are derived from a root directory, which is `/` on a
//! device and a temporary directory in tests. Individual locations can
//! be overridden from a TOML config file.

use camino::{Utf8Component, Utf8Path, Utf8PathBuf};
use fs_err as fs;
use serde::Deserialize;

/// Name of the sealed key file in [`Dirs::encryption_key_dir`].
const SEALED_KEY_FILE_NAME: &str = "ubuntu-data.sealed-key";

/// Name of the policy update data file in
/// [`Dirs::install_host_fde_data_dir`].
const POLICY_UPDATE_DATA_FILE_NAME: &str = "policy-update-data";

/// Name of the lockout authorization file in
/// [`Dirs::install_host_fde_data_dir`].
const LOCKOUT_AUTH_FILE_NAME: &str = "tpm-lockout-auth";

#[derive(Debug, thiserror::Error)]
pub enum DirsError {
    /// Failed to read the config file.
    #[error("failed to read dirs config")]
    Read(#[source] std::io::Error),

    /// The config file is not valid.
    #[error("invalid dirs config")]
    Parse(#[source] toml::de::Error),

    /// A configured path is relative.
    #[error("{key} must be an absolute path: {path}")]
    RelativePath {
        /// Config key holding the path.
        key: &'static str,
        path: Utf8PathBuf,
    },
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Dirs {
    snap_boot_assets_dir: Utf8PathBuf,
    snap_blob_dir: Utf8PathBuf,
    snap_seed_dir: Utf8PathBuf,
    encryption_key_dir: Utf8PathBuf,
    install_host_fde_data_dir: Utf8PathBuf,
    ubuntu_boot_dir: Utf8PathBuf,
}

/// On-disk form of [`Dirs`]. Only `root_dir` is required; any other
/// key replaces the location derived from it.
#[derive(Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
struct DirsConfig {
    root_dir: Utf8PathBuf,
    snap_boot_assets_dir: Option<Utf8PathBuf>,
    snap_blob_dir: Option<Utf8PathBuf>,
    snap_seed_dir: Option<Utf8PathBuf>,
    encryption_key_dir: Option<Utf8PathBuf>,
    install_host_fde_data_dir: Option<Utf8PathBuf>,
    ubuntu_boot_dir: Option<Utf8PathBuf>,
}

impl Default for Dirs {
    fn default() -> Self {
        Self::new("/")
    }
}

impl Dirs {
    /// Get the standard layout under `root`.
    pub fn new<P: AsRef<Utf8Path>>(root: P) -> Self {
        let root = root.as_ref();
        let snapd = root.join("var/lib/snapd");
        Self {
            snap_boot_assets_dir: snapd.join("boot-assets"),
            snap_blob_dir: snapd.join("snaps"),
            snap_seed_dir: snapd.join("seed"),
            encryption_key_dir: root.join("run/mnt/ubuntu-seed/device/fde"),
            install_host_fde_data_dir: root
                .join("run/mnt/ubuntu-data/system-data/var/lib/snapd/device/fde"),
            ubuntu_boot_dir: root.join("run/mnt/ubuntu-boot"),
        }
    }

    /// Load the layout from a TOML config file.
    pub fn load(path: &Utf8Path) -> Result<Self, DirsError> {
        let src = fs::read_to_string(path).map_err(DirsError::Read)?;
        Self::parse(&src)
    }

    fn parse(src: &str) -> Result<Self, DirsError> {
        let config: DirsConfig = toml::de::from_str(src).map_err(DirsError::Parse)?;

        let mut dirs = Self::new(require_absolute("root_dir", config.root_dir)?);
        let overrides = [
            (
                "snap_boot_assets_dir",
                config.snap_boot_assets_dir,
                &mut dirs.snap_boot_assets_dir,
            ),
            ("snap_blob_dir", config.snap_blob_dir, &mut dirs.snap_blob_dir),
            ("snap_seed_dir", config.snap_seed_dir, &mut dirs.snap_seed_dir),
            (
                "encryption_key_dir",
                config.encryption_key_dir,
                &mut dirs.encryption_key_dir,
            ),
            (
                "install_host_fde_data_dir",
                config.install_host_fde_data_dir,
                &mut dirs.install_host_fde_data_dir,
            ),
            (
                "ubuntu_boot_dir",
                config.ubuntu_boot_dir,
                &mut dirs.ubuntu_boot_dir,
            ),
        ];
        for (key, value, field) in overrides {
            if let Some(value) = value {
                *field = require_absolute(key, value)?;
            }
        }

        Ok(dirs)
    }

    /// Cache of trusted boot assets, one subdirectory per bootloader.
    pub fn snap_boot_assets_dir(&self) -> &Utf8Path {
        &self.snap_boot_assets_dir
    }

    /// Directory holding the installed snap blobs, including kernels.
    pub fn snap_blob_dir(&self) -> &Utf8Path {
        &self.snap_blob_dir
    }

    /// Root of the seed, which contains the recovery systems.
    pub fn snap_seed_dir(&self) -> &Utf8Path {
        &self.snap_seed_dir
    }

    pub fn encryption_key_dir(&self) -> &Utf8Path {
        &self.encryption_key_dir
    }

    pub fn install_host_fde_data_dir(&self) -> &Utf8Path {
        &self.install_host_fde_data_dir
    }

    /// Mount point of the boot partition of the installed system.
    pub fn ubuntu_boot_dir(&self) -> &Utf8Path {
        &self.ubuntu_boot_dir
    }

    /// Output path of the sealed key.
    pub fn sealed_key_file(&self) -> Utf8PathBuf {
        self.encryption_key_dir.join(SEALED_KEY_FILE_NAME)
    }

    /// Output path of the data needed to update the TPM policy later.
    pub fn policy_update_data_file(&self) -> Utf8PathBuf {
        self.install_host_fde_data_dir
            .join(POLICY_UPDATE_DATA_FILE_NAME)
    }

    /// Output path of the TPM lockout authorization value.
    pub fn lockout_auth_file(&self) -> Utf8PathBuf {
        self.install_host_fde_data_dir.join(LOCKOUT_AUTH_FILE_NAME)
    }
}

/// Join `path` onto `base` and normalize the result lexically:
/// repeated separators and `.` components are dropped and `..` removes
/// the preceding component. A leading `/` in `path` is ignored.
///
/// `base` must already be normalized.
pub(crate) fn clean_join(base: &Utf8Path, path: &str) -> Utf8PathBuf {
    let mut joined = base.to_path_buf();
    for component in Utf8Path::new(path).components() {
        match component {
            Utf8Component::Normal(name) => joined.push(name),
            Utf8Component::ParentDir => {
                joined.pop();
            }
            Utf8Component::CurDir | Utf8Component::RootDir | Utf8Component::Prefix(_) => {}
        }
    }
    joined
}

fn require_absolute(key: &'static str, path: Utf8PathBuf) -> Result<Utf8PathBuf, DirsError> {
    if path.is_absolute() {
        Ok(path)
    } else {
        Err(DirsError::RelativePath { key, path })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_layout() {
        let dirs = Dirs::default();
        assert_eq!(
            dirs.snap_boot_assets_dir().as_str(),
            "/var/lib/snapd/boot-assets"
        );
        assert_eq!(dirs.snap_blob_dir().as_str(), "/var/lib/snapd/snaps");
        assert_eq!(dirs.snap_seed_dir().as_str(), "/var/lib/snapd/seed");
        assert_eq!(dirs.ubuntu_boot_dir().as_str(), "/run/mnt/ubuntu-boot");
        assert_eq!(
            dirs.sealed_key_file().as_str(),
            "/run/mnt/ubuntu-seed/device/fde/ubuntu-data.sealed-key"
        );
        assert_eq!(
            dirs.policy_update_data_file().as_str(),
            "/run/mnt/ubuntu-data/system-data/var/lib/snapd/device/fde/policy-update-data"
        );
        assert_eq!(
            dirs.lockout_auth_file().as_str(),
            "/run/mnt/ubuntu-data/system-data/var/lib/snapd/device/fde/tpm-lockout-auth"
        );
    }

    #[test]
    fn test_relocated_root() {
        let dirs = Dirs::new("/tmp/root");
        assert_eq!(dirs.snap_blob_dir().as_str(), "/tmp/root/var/lib/snapd/snaps");
        assert_eq!(
            dirs.sealed_key_file().as_str(),
            "/tmp/root/run/mnt/ubuntu-seed/device/fde/ubuntu-data.sealed-key"
        );
    }

    #[test]
    fn test_clean_join() {
        let base = Utf8Path::new("/var/lib/snapd/seed");
        for (path, expected) in [
            ("snaps/pc-kernel_1.snap", "/var/lib/snapd/seed/snaps/pc-kernel_1.snap"),
            ("/snaps/pc-kernel_1.snap", "/var/lib/snapd/seed/snaps/pc-kernel_1.snap"),
            ("/snaps//pc-kernel_1.snap", "/var/lib/snapd/seed/snaps/pc-kernel_1.snap"),
            ("snaps/./pc-kernel_1.snap/", "/var/lib/snapd/seed/snaps/pc-kernel_1.snap"),
            ("snaps/../pc-kernel_1.snap", "/var/lib/snapd/seed/pc-kernel_1.snap"),
            ("../../../../..", "/"),
            ("", "/var/lib/snapd/seed"),
        ] {
            assert_eq!(clean_join(base, path).as_str(), expected, "{path}");
        }
    }

    #[test]
    fn test_parse() {
        // Root only.
        assert_eq!(Dirs::parse("root_dir = \"/\"").unwrap(), Dirs::default());

        // Overrides replace the derived location.
        let dirs = Dirs::parse(
            "root_dir = \"/\"
             snap_seed_dir = \"/run/mnt/ubuntu-seed\"",
        )
        .unwrap();
        assert_eq!(dirs.snap_seed_dir().as_str(), "/run/mnt/ubuntu-seed");
        assert_eq!(dirs.snap_blob_dir().as_str(), "/var/lib/snapd/snaps");

        // Missing root is invalid.
        assert!(matches!(
            Dirs::parse("snap_blob_dir = \"/snaps\""),
            Err(DirsError::Parse(_))
        ));

        // Unknown key is invalid.
        assert!(matches!(
            Dirs::parse("root_dir = \"/\"\nunknown_key = true"),
            Err(DirsError::Parse(_))
        ));

        // Relative paths are invalid.
        assert!(matches!(
            Dirs::parse("root_dir = \"relative\""),
            Err(DirsError::RelativePath {
                key: "root_dir",
                ..
            })
        ));
        assert!(matches!(
            Dirs::parse("root_dir = \"/\"\nsnap_blob_dir = \"snaps\""),
            Err(DirsError::RelativePath {
                key: "snap_blob_dir",
                ..
            })
        ));
    }

    #[test]
    fn test_load() {
        let tmp_dir = TempDir::new().unwrap();
        let tmp_dir = Utf8Path::from_path(tmp_dir.path()).unwrap();
        let path = tmp_dir.join("dirs.toml");

        assert!(matches!(Dirs::load(&path), Err(DirsError::Read(_))));

        fs::write(&path, format!("root_dir = \"{tmp_dir}\"\n")).unwrap();
        assert_eq!(Dirs::load(&path).unwrap(), Dirs::new(tmp_dir));
    }
}
