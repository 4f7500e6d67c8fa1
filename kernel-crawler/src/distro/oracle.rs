// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Oracle Linux.

Oracle publishes a fixed repository layout on `yum.oracle.com`, so there is
no directory enumeration: the repositories are listed statically, including
the Unbreakable Enterprise Kernel channels.
*/

use {
    crate::{
        distro::devel_config,
        driverkit::DriverKitConfig,
        error::Result,
        fetch::HttpFetcher,
        repo::{merge_tree, Distro, PackageTree, Repository},
        rpm::RpmRepository,
    },
    async_trait::async_trait,
    std::collections::BTreeSet,
};

const REPO_PATHS: &[&str] = &[
    // Oracle 6
    "repo/OracleLinux/OL6/latest/",
    "repo/OracleLinux/OL6/MODRHCK/",
    "repo/OracleLinux/OL6/UEKR4/",
    "repo/OracleLinux/OL6/UEKR3/latest/",
    "repo/OracleLinux/OL6/UEK/latest/",
    // Oracle 7
    "repo/OracleLinux/OL7/latest/",
    "repo/OracleLinux/OL7/MODRHCK/",
    "repo/OracleLinux/OL7/UEKR6/",
    "repo/OracleLinux/OL7/UEKR5/",
    "repo/OracleLinux/OL7/UEKR4/",
    "repo/OracleLinux/OL7/UEKR3/",
    // Oracle 8
    "repo/OracleLinux/OL8/baseos/latest/",
    "repo/OracleLinux/OL8/UEKR6/",
    "repo/OracleLinux/OL8/appstream/",
    // Oracle 9
    "repo/OracleLinux/OL9/baseos/latest/",
    "repo/OracleLinux/OL9/UEKR7/",
    "repo/OracleLinux/OL9/appstream/",
];

pub struct Oracle {
    arch: String,
}

impl Oracle {
    pub fn new(arch: &str) -> Self {
        Self {
            arch: arch.to_string(),
        }
    }

    fn repos(&self) -> Vec<RpmRepository> {
        // UEK kernels exist alongside the stock ones; restrict to the
        // requested arch since the repos mix both
        let kernel_query = format!(
            "(name IN ('kernel', 'kernel-devel', 'kernel-uek', 'kernel-uek-devel') \
             AND arch = '{}')",
            self.arch
        );

        REPO_PATHS
            .iter()
            .map(|path| {
                RpmRepository::with_kernel_query(
                    format!("http://yum.oracle.com/{}{}/", path, self.arch),
                    kernel_query.clone(),
                )
            })
            .collect()
    }
}

#[async_trait]
impl Distro for Oracle {
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
        devel_config(release, "ol", deps, "devel")
    }
}
