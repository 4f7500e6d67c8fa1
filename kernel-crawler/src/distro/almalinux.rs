// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! AlmaLinux. */

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

fn v8_only(ver: &str) -> bool {
    ver.starts_with('8')
}

fn v9_only(ver: &str) -> bool {
    ver.starts_with('9')
}

pub struct AlmaLinux {
    mirrors: Vec<Box<dyn Mirror>>,
}

impl AlmaLinux {
    pub fn new(arch: &str) -> Self {
        let baseos = format!("BaseOS/{}/os/", arch);
        let appstream = format!("AppStream/{}/os/", arch);

        let mirrors: Vec<Box<dyn Mirror>> = vec![
            Box::new(RpmMirror::with_filter(
                "http://repo.almalinux.org/almalinux/",
                baseos.clone(),
                v8_only,
            )),
            Box::new(RpmMirror::with_filter(
                "http://repo.almalinux.org/almalinux/",
                appstream.clone(),
                v8_only,
            )),
            Box::new(RpmMirror::with_filter(
                "http://repo.almalinux.org/almalinux/",
                baseos,
                v9_only,
            )),
            Box::new(RpmMirror::with_filter(
                "http://repo.almalinux.org/almalinux/",
                appstream,
                v9_only,
            )),
        ];

        Self { mirrors }
    }
}

#[async_trait]
impl Distro for AlmaLinux {
    async fn package_tree(&self, fetcher: &HttpFetcher, filter: &str) -> Result<PackageTree> {
        mirrors_package_tree(fetcher, &self.mirrors, filter).await
    }

    fn to_driverkit(&self, release: &str, deps: &BTreeSet<String>) -> Vec<DriverKitConfig> {
        devel_config(release, "almalinux", deps, "devel")
    }
}
