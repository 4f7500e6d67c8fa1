// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! openSUSE. */

use {
    crate::{
        distro::devel_config,
        driverkit::DriverKitConfig,
        error::Result,
        fetch::HttpFetcher,
        repo::{mirrors_package_tree, Distro, Mirror, PackageTree},
        rpm::suse::SuseRpmMirror,
    },
    async_trait::async_trait,
    std::collections::BTreeSet,
};

fn kernel_project_filter(dist: &str) -> bool {
    !dist.starts_with("linux-next")
        && (dist.starts_with("openSUSE")
            || dist.starts_with("./openSUSE")
            || dist.starts_with("HEAD")
            || dist.starts_with("stable"))
}

fn tumbleweed_filter(dist: &str) -> bool {
    dist.starts_with("tumbleweed")
}

pub struct OpenSuse {
    mirrors: Vec<Box<dyn Mirror>>,
}

impl OpenSuse {
    pub fn new(arch: &str) -> Self {
        let mut mirrors: Vec<Box<dyn Mirror>> = vec![
            // leap
            Box::new(SuseRpmMirror::new(
                "https://mirrors.edge.kernel.org/opensuse/distribution/leap/",
                "repo/oss/",
                arch,
            )),
            Box::new(SuseRpmMirror::new(
                "https://mirrors.edge.kernel.org/opensuse/distribution/leap/",
                "repo/oss/suse/",
                arch,
            )),
            // the rest
            Box::new(SuseRpmMirror::new(
                "https://mirrors.edge.kernel.org/opensuse/distribution/",
                "repo/oss/",
                arch,
            )),
            Box::new(SuseRpmMirror::new(
                "https://mirrors.edge.kernel.org/opensuse/distribution/",
                "repo/oss/suse/",
                arch,
            )),
            // opensuse site: tumbleweed
            Box::new(SuseRpmMirror::with_filter(
                "http://download.opensuse.org/",
                "repo/oss/",
                arch,
                tumbleweed_filter,
            )),
            // opensuse site: leaps
            Box::new(SuseRpmMirror::new(
                "http://download.opensuse.org/distribution/leap/",
                "repo/oss/",
                arch,
            )),
        ];

        // the Kernel:/ project tree stores non-x86 builds under ports
        if arch == "x86_64" {
            mirrors.push(Box::new(SuseRpmMirror::with_filter(
                "https://download.opensuse.org/repositories/Kernel:/",
                "Submit/standard/",
                arch,
                kernel_project_filter,
            )));
            mirrors.push(Box::new(SuseRpmMirror::with_filter(
                "https://download.opensuse.org/repositories/Kernel:/",
                "standard/",
                arch,
                kernel_project_filter,
            )));
        } else {
            mirrors.push(Box::new(SuseRpmMirror::with_filter(
                "https://download.opensuse.org/repositories/Kernel:/",
                "Submit/ports/",
                arch,
                kernel_project_filter,
            )));
            mirrors.push(Box::new(SuseRpmMirror::with_filter(
                "https://download.opensuse.org/repositories/Kernel:/",
                "ports/",
                arch,
                kernel_project_filter,
            )));
        }

        Self { mirrors }
    }
}

#[async_trait]
impl Distro for OpenSuse {
    async fn package_tree(&self, fetcher: &HttpFetcher, filter: &str) -> Result<PackageTree> {
        mirrors_package_tree(fetcher, &self.mirrors, filter).await
    }

    fn to_driverkit(&self, release: &str, deps: &BTreeSet<String>) -> Vec<DriverKitConfig> {
        devel_config(release, "opensuse", deps, "devel")
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn kernel_project_filter_selects_branches() {
        assert!(kernel_project_filter("openSUSE-15.4/"));
        assert!(kernel_project_filter("HEAD/"));
        assert!(kernel_project_filter("stable/"));
        assert!(!kernel_project_filter("linux-next/"));
        assert!(!kernel_project_filter("Submit/"));
    }
}
