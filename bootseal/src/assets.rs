// Copyright 2026 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Trusted boot asset lookup.
//!
//! Each trusted asset is cached on disk once per content hash, under
//! `<boot-assets>/<bootloader>/<asset>-<hash>`. The modeenv records one
//! hash for a stable asset, or the old and new hashes while an update
//! of the asset is in flight.

use crate::bootloader::Bootloader;
use crate::dirs::{clean_join, Dirs};
use crate::load_chain::LoadChainError;
use crate::modeenv::BootAssetsMap;
use camino::Utf8PathBuf;
use log::debug;

/// Get the cached paths of the current and next instances of the
/// trusted asset `name`.
///
/// For a stable asset both paths are the same.
pub fn cached_asset_pathnames(
    dirs: &Dirs,
    bootloader_name: &str,
    name: &str,
    assets: &BootAssetsMap,
) -> Result<(Utf8PathBuf, Utf8PathBuf), LoadChainError> {
    let cache_entry = |hash: &str| {
        clean_join(
            dirs.snap_boot_assets_dir(),
            &format!("{bootloader_name}/{name}-{hash}"),
        )
    };

    let hashes = assets
        .get(name)
        .ok_or_else(|| LoadChainError::AssetNotFound {
            bootloader: bootloader_name.to_owned(),
            asset: name.to_owned(),
        })?;

    match hashes.as_slice() {
        [hash] => {
            let current = cache_entry(hash);
            Ok((current.clone(), current))
        }
        [current, next] => Ok((cache_entry(current), cache_entry(next))),
        _ => Err(LoadChainError::InvalidHashCount {
            bootloader: bootloader_name.to_owned(),
            asset: name.to_owned(),
            count: hashes.len(),
        }),
    }
}

/// Get the base names of the binaries `bootloader` measures, in load
/// order. These are the keys used for the assets in the modeenv.
pub fn trusted_asset_names(bootloader: &dyn Bootloader) -> Result<Vec<String>, LoadChainError> {
    let trusted = bootloader
        .as_trusted_assets()
        .ok_or_else(|| LoadChainError::UnsupportedBootloader(bootloader.name().to_owned()))?;

    let paths = trusted
        .trusted_assets()
        .map_err(|source| LoadChainError::TrustedAssetsUnavailable {
            bootloader: bootloader.name().to_owned(),
            source,
        })?;
    debug!("{} trusted assets: {paths:?}", bootloader.name());

    Ok(paths
        .iter()
        .map(|path| path.file_name().unwrap_or(path.as_str()).to_owned())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bootloader::testing::FakeBootloader;
    use crate::bootloader::{BootloaderError, MockTrustedAssetsBootloader};

    fn assets_map() -> BootAssetsMap {
        [
            ("foo", vec!["foo-hash-1"]),
            ("bar", vec!["bar-hash-1", "bar-hash-2"]),
            ("baz", vec!["baz-hash-1", "baz-hash-2", "baz-hash-3"]),
            ("quux", vec![]),
        ]
        .into_iter()
        .map(|(name, hashes)| {
            (
                name.to_owned(),
                hashes.into_iter().map(str::to_owned).collect(),
            )
        })
        .collect()
    }

    #[test]
    fn test_cached_asset_pathnames() {
        let dirs = Dirs::default();
        let assets = assets_map();

        // One hash: both paths are the same.
        let (current, next) = cached_asset_pathnames(&dirs, "bootloader", "foo", &assets).unwrap();
        assert_eq!(
            current.as_str(),
            "/var/lib/snapd/boot-assets/bootloader/foo-foo-hash-1"
        );
        assert_eq!(current, next);

        // Two hashes: old then new.
        let (current, next) = cached_asset_pathnames(&dirs, "bootloader", "bar", &assets).unwrap();
        assert_eq!(
            current.as_str(),
            "/var/lib/snapd/boot-assets/bootloader/bar-bar-hash-1"
        );
        assert_eq!(
            next.as_str(),
            "/var/lib/snapd/boot-assets/bootloader/bar-bar-hash-2"
        );

        // Too many hashes.
        let err = cached_asset_pathnames(&dirs, "bootloader", "baz", &assets).unwrap_err();
        assert!(matches!(
            err,
            LoadChainError::InvalidHashCount { ref asset, count: 3, .. } if asset == "baz"
        ));
        assert_eq!(
            err.to_string(),
            "invalid number of hashes (3) for asset baz of bootloader bootloader in modeenv"
        );

        // No hashes.
        assert!(matches!(
            cached_asset_pathnames(&dirs, "bootloader", "quux", &assets),
            Err(LoadChainError::InvalidHashCount { count: 0, .. })
        ));

        // Not in the map.
        let err = cached_asset_pathnames(&dirs, "bootloader", "quuux", &assets).unwrap_err();
        assert!(matches!(
            err,
            LoadChainError::AssetNotFound { ref asset, ref bootloader }
                if asset == "quuux" && bootloader == "bootloader"
        ));
        assert_eq!(
            err.to_string(),
            "cannot find asset quuux of bootloader bootloader in modeenv"
        );
    }

    #[test]
    fn test_cached_asset_pathnames_relocated_root() {
        let dirs = Dirs::new("/tmp/root");
        let (current, _) = cached_asset_pathnames(&dirs, "grub", "foo", &assets_map()).unwrap();
        assert_eq!(
            current.as_str(),
            "/tmp/root/var/lib/snapd/boot-assets/grub/foo-foo-hash-1"
        );
    }

    #[test]
    fn test_cached_asset_pathnames_normalized() {
        let (current, _) =
            cached_asset_pathnames(&Dirs::default(), "efi//grub/", "foo", &assets_map()).unwrap();
        assert_eq!(
            current.as_str(),
            "/var/lib/snapd/boot-assets/efi/grub/foo-foo-hash-1"
        );
    }

    #[test]
    fn test_trusted_asset_names() {
        let bootloader = FakeBootloader::with_trusted_assets(
            "mock",
            &[
                "/path/name/to/trusted-asset-1",
                "/path/name/to/trusted-asset-2",
            ],
        );
        assert_eq!(
            trusted_asset_names(&bootloader).unwrap(),
            ["trusted-asset-1", "trusted-asset-2"]
        );

        // No trusted assets is valid.
        let bootloader = FakeBootloader::with_trusted_assets("mock", &[]);
        assert!(trusted_asset_names(&bootloader).unwrap().is_empty());

        // A bootloader that doesn't manage boot assets.
        let bootloader = FakeBootloader::plain("mock");
        let err = trusted_asset_names(&bootloader).unwrap_err();
        assert!(matches!(err, LoadChainError::UnsupportedBootloader(ref name) if name == "mock"));
        assert_eq!(
            err.to_string(),
            "bootloader mock doesn't support trusted assets"
        );
    }

    #[test]
    fn test_trusted_asset_names_query_failure() {
        let mut mock = MockTrustedAssetsBootloader::new();
        mock.expect_trusted_assets()
            .times(1)
            .returning(|| Err(BootloaderError::Malformed("bad grub.cfg".to_owned())));
        let bootloader = FakeBootloader {
            name: "grub",
            trusted_assets: Some(mock),
            recovery_aware: None,
        };

        assert!(matches!(
            trusted_asset_names(&bootloader),
            Err(LoadChainError::TrustedAssetsUnavailable {
                ref bootloader,
                source: BootloaderError::Malformed(_),
            }) if bootloader == "grub"
        ));
    }
}
