// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Fedora. */

use {
    crate::{
        distro::devel_config,
        driverkit::DriverKitConfig,
        error::Result,
        fetch::HttpFetcher,
        repo::{mirrors_package_tree, Distro, Mirror, PackageTree},
        rpm::RpmMirror,
    },
    async_trait::async_trait,
    std::collections::BTreeSet,
};

/// Don't bother testing ancient versions.
fn modern_releases(version: &str) -> bool {
    match version.trim_end_matches('/').parse::<u32>() {
        Ok(v) => v >= 32,
        Err(_) => false,
    }
}

pub struct Fedora {
    mirrors: Vec<Box<dyn Mirror>>,
}

impl Fedora {
    pub fn new(arch: &str) -> Self {
        let mirrors: Vec<Box<dyn Mirror>> = vec![
            Box::new(RpmMirror::with_filter(
                "https://mirrors.kernel.org/fedora/releases/",
                format!("Everything/{}/os/", arch),
                modern_releases,
            )),
            Box::new(RpmMirror::with_filter(
                "https://mirrors.kernel.org/fedora/updates/",
                format!("Everything/{}/", arch),
                modern_releases,
            )),
        ];

        Self { mirrors }
    }
}

#[async_trait]
impl Distro for Fedora {
    async fn package_tree(&self, fetcher: &HttpFetcher, filter: &str) -> Result<PackageTree> {
        mirrors_package_tree(fetcher, &self.mirrors, filter).await
    }

    fn to_driverkit(&self, release: &str, deps: &BTreeSet<String>) -> Vec<DriverKitConfig> {
        devel_config(release, "fedora", deps, "devel")
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn release_filter_skips_ancient_and_non_numeric() {
        assert!(modern_releases("36/"));
        assert!(modern_releases("32/"));
        assert!(!modern_releases("31/"));
        assert!(!modern_releases("test/"));
    }
}
