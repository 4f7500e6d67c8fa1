// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! CentOS. */

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

fn v7_only(ver: &str) -> bool {
    ver.starts_with('7')
}

fn v8_only(ver: &str) -> bool {
    ver.starts_with('8')
}

fn v9_only(ver: &str) -> bool {
    ver.starts_with('9')
}

fn v6_or_v7(ver: &str) -> bool {
    ver.starts_with('6') || ver.starts_with('7')
}

pub struct Centos {
    mirrors: Vec<Box<dyn Mirror>>,
}

impl Centos {
    pub fn new(arch: &str) -> Self {
        let os = format!("os/{}/", arch);
        let updates = format!("updates/{}/", arch);
        let baseos = format!("BaseOS/{}/os/", arch);
        let appstream = format!("AppStream/{}/os/", arch);

        let mirrors: Vec<Box<dyn Mirror>> = vec![
            Box::new(RpmMirror::with_filter(
                "http://mirror.centos.org/centos/",
                os.clone(),
                v7_only,
            )),
            Box::new(RpmMirror::with_filter(
                "http://mirror.centos.org/centos/",
                updates.clone(),
                v7_only,
            )),
            // CentOS 8 is end-of-life on the main mirror; the vault keeps it
            Box::new(RpmMirror::with_filter(
                "http://vault.centos.org/centos/",
                os.clone(),
                v6_or_v7,
            )),
            Box::new(RpmMirror::with_filter(
                "http://vault.centos.org/centos/",
                updates.clone(),
                v6_or_v7,
            )),
            Box::new(RpmMirror::with_filter(
                "http://vault.centos.org/centos/",
                baseos.clone(),
                v8_only,
            )),
            Box::new(RpmMirror::with_filter(
                "http://archive.kernel.org/centos/",
                os,
                v6_or_v7,
            )),
            Box::new(RpmMirror::with_filter(
                "http://archive.kernel.org/centos/",
                updates,
                v6_or_v7,
            )),
            Box::new(RpmMirror::with_filter(
                "http://archive.kernel.org/centos/",
                baseos.clone(),
                v8_only,
            )),
            // CentOS Stream ships kernel-devel from AppStream, not BaseOS
            Box::new(RpmMirror::with_filter(
                "http://mirror.stream.centos.org/",
                baseos,
                v9_only,
            )),
            Box::new(RpmMirror::with_filter(
                "http://mirror.stream.centos.org/",
                appstream,
                v9_only,
            )),
        ];

        Self { mirrors }
    }
}

#[async_trait]
impl Distro for Centos {
    async fn package_tree(&self, fetcher: &HttpFetcher, filter: &str) -> Result<PackageTree> {
        mirrors_package_tree(fetcher, &self.mirrors, filter).await
    }

    fn to_driverkit(&self, release: &str, deps: &BTreeSet<String>) -> Vec<DriverKitConfig> {
        devel_config(release, "centos", deps, "devel")
    }
}

#[cfg(test)]
mod test {
    use {super::*, crate::repo::Distro as _};

    #[test]
    fn conversion_picks_the_devel_artifact() {
        let centos = Centos::new("x86_64");
        let deps: BTreeSet<String> = [
            "http://mirror/centos/7/os/x86_64/Packages/kernel-3.10.0-1127.el7.x86_64.rpm"
                .to_string(),
            "http://mirror/centos/7/os/x86_64/Packages/kernel-devel-3.10.0-1127.el7.x86_64.rpm"
                .to_string(),
        ]
        .into();

        let configs = centos.to_driverkit("3.10.0-1127.el7.x86_64", &deps);
        assert_eq!(configs.len(), 1);
        assert_eq!(configs[0].kernelrelease, "3.10.0-1127.el7.x86_64");
        assert_eq!(configs[0].target, "centos");
        assert_eq!(configs[0].kernelversion, "1");
        assert_eq!(
            configs[0].headers.as_deref().unwrap(),
            ["http://mirror/centos/7/os/x86_64/Packages/kernel-devel-3.10.0-1127.el7.x86_64.rpm"
                .to_string()]
        );
    }
}
