// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Alibaba Cloud Linux. */

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

fn v2_only(ver: &str) -> bool {
    ver.starts_with('2')
}

fn v3_only(ver: &str) -> bool {
    ver.starts_with('3')
}

fn aliyun_mirrors(arch: &str, filter: fn(&str) -> bool) -> Vec<Box<dyn Mirror>> {
    ["os", "updates", "plus"]
        .into_iter()
        .map(|section| {
            Box::new(RpmMirror::with_filter(
                "http://mirrors.aliyun.com/alinux/",
                format!("{}/{}/", section, arch),
                filter,
            )) as Box<dyn Mirror>
        })
        .collect()
}

pub struct AliyunLinux2 {
    mirrors: Vec<Box<dyn Mirror>>,
}

impl AliyunLinux2 {
    pub fn new(arch: &str) -> Self {
        Self {
            mirrors: aliyun_mirrors(arch, v2_only),
        }
    }
}

#[async_trait]
impl Distro for AliyunLinux2 {
    async fn package_tree(&self, fetcher: &HttpFetcher, filter: &str) -> Result<PackageTree> {
        mirrors_package_tree(fetcher, &self.mirrors, filter).await
    }

    fn to_driverkit(&self, release: &str, deps: &BTreeSet<String>) -> Vec<DriverKitConfig> {
        devel_config(release, "alinux", deps, "devel")
    }
}

pub struct AliyunLinux3 {
    mirrors: Vec<Box<dyn Mirror>>,
}

impl AliyunLinux3 {
    pub fn new(arch: &str) -> Self {
        Self {
            mirrors: aliyun_mirrors(arch, v3_only),
        }
    }
}

#[async_trait]
impl Distro for AliyunLinux3 {
    async fn package_tree(&self, fetcher: &HttpFetcher, filter: &str) -> Result<PackageTree> {
        mirrors_package_tree(fetcher, &self.mirrors, filter).await
    }

    fn to_driverkit(&self, release: &str, deps: &BTreeSet<String>) -> Vec<DriverKitConfig> {
        devel_config(release, "alinux", deps, "devel")
    }
}
