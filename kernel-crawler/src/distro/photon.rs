// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! VMware Photon OS. */

use {
    crate::{
        driverkit::DriverKitConfig,
        error::Result,
        fetch::HttpFetcher,
        repo::{merge_tree, Distro, PackageTree, Repository},
        rpm::RpmRepository,
    },
    async_trait::async_trait,
    std::collections::BTreeSet,
};

// Kernel flavors named `esx` lack CONFIG_TRACEPOINTS and cannot host
// drivers; PAM variants are not kernels at all.
const KERNEL_QUERY: &str = "((name = 'linux' OR name LIKE 'linux-%devel%') \
     AND name NOT LIKE '%esx%' AND name NOT LIKE '%PAM%')";

const VERSIONS: &[(&str, &str)] = &[
    ("3.0", ""),
    ("3.0", "_release"),
    ("3.0", "_updates"),
    ("4.0", ""),
    ("4.0", "_release"),
    ("4.0", "_updates"),
    ("5.0", ""),
    ("5.0", "_release"),
    ("5.0", "_updates"),
];

pub struct PhotonOs {
    arch: String,
}

impl PhotonOs {
    pub fn new(arch: &str) -> Self {
        Self {
            arch: arch.to_string(),
        }
    }

    fn repos(&self) -> Vec<RpmRepository> {
        VERSIONS
            .iter()
            .map(|(version, repo_tag)| {
                RpmRepository::with_kernel_query(
                    format!(
                        "https://packages.vmware.com/photon/{v}/photon{r}_{v}_{a}/",
                        v = version,
                        r = repo_tag,
                        a = self.arch
                    ),
                    KERNEL_QUERY,
                )
            })
            .collect()
    }
}

#[async_trait]
impl Distro for PhotonOs {
    async fn package_tree(&self, fetcher: &HttpFetcher, filter: &str) -> Result<PackageTree> {
        let mut tree = PackageTree::new();

        for repo in self.repos() {
            match repo.package_tree(fetcher, filter).await {
                Ok(sub) => merge_tree(&mut tree, sub),
                Err(err) => log::warn!("{}: skipping repository: {}", repo, err),
            }
        }

        Ok(tree)
    }

    fn to_driverkit(&self, release: &str, deps: &BTreeSet<String>) -> Vec<DriverKitConfig> {
        // Photon kernel packages carry a `.<arch>` suffix that `uname -r`
        // does not report; strip it from the release key.
        let release = release
            .strip_suffix(&format!(".{}", self.arch))
            .unwrap_or(release);

        deps.iter()
            .find(|dep| dep.contains("-devel"))
            .and_then(|dep| DriverKitConfig::with_headers(release, "photon", vec![dep.clone()]))
            .into_iter()
            .collect()
    }
}
