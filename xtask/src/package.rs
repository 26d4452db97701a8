// Copyright 2026 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

/// Packages in the root workspace.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Package {
    Bootseal,
    Xtask,
}

impl Package {
    /// Get all packages.
    pub fn all() -> [Package; 2] {
        use Package::*;
        [Bootseal, Xtask]
    }

    /// Get the package's crate name.
    pub fn name(&self) -> &'static str {
        use Package::*;
        match self {
            Bootseal => "bootseal",
            Xtask => "xtask",
        }
    }
}
