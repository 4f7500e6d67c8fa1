// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Amazon Linux.

Amazon mirrors are reached through one level of indirection: each release
path holds a `mirror.list` file whose first line is the actual repository
base URL (with a `$basearch` placeholder on Amazon Linux 1).
*/

use {
    crate::{
        distro::devel_config,
        driverkit::DriverKitConfig,
        error::Result,
        fetch::HttpFetcher,
        repo::{mirrors_package_tree, Distro, Mirror, PackageTree, Repository},
        rpm::RpmRepository,
    },
    async_trait::async_trait,
    std::collections::BTreeSet,
};

/// Repository discovery through `mirror.list` pointers.
struct MirrorListMirror {
    root: String,
    paths: Vec<String>,
    basearch: String,
}

impl MirrorListMirror {
    fn new(root: impl Into<String>, paths: Vec<String>, basearch: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            paths,
            basearch: basearch.into(),
        }
    }
}

#[async_trait]
impl Mirror for MirrorListMirror {
    async fn list_repos(&self, fetcher: &HttpFetcher) -> Result<Vec<Box<dyn Repository>>> {
        let mut urls = BTreeSet::new();

        for path in &self.paths {
            let pointer = format!("{}{}/mirror.list", self.root, path);
            let Some(body) = fetcher.fetch_text(&pointer).await? else {
                log::debug!("{}: no mirror list", pointer);
                continue;
            };

            if let Some(first) = body.lines().next() {
                let url = first.trim().replace("$basearch", &self.basearch);
                // some releases carry a trailing slash, some don't
                urls.insert(format!("{}/", url.trim_end_matches('/')));
            }
        }

        Ok(urls
            .into_iter()
            .map(|url| Box::new(RpmRepository::new(url)) as Box<dyn Repository>)
            .collect())
    }
}

macro_rules! amazon_distro {
    ($name:ident, $target:literal) => {
        pub struct $name {
            mirrors: Vec<Box<dyn Mirror>>,
        }

        #[async_trait]
        impl Distro for $name {
            async fn package_tree(
                &self,
                fetcher: &HttpFetcher,
                filter: &str,
            ) -> Result<PackageTree> {
                mirrors_package_tree(fetcher, &self.mirrors, filter).await
            }

            fn to_driverkit(
                &self,
                release: &str,
                deps: &BTreeSet<String>,
            ) -> Vec<DriverKitConfig> {
                devel_config(release, $target, deps, "devel")
            }
        }
    };
}

amazon_distro!(AmazonLinux1, "amazonlinux");
amazon_distro!(AmazonLinux2, "amazonlinux2");
amazon_distro!(AmazonLinux2022, "amazonlinux2022");
amazon_distro!(AmazonLinux2023, "amazonlinux2023");

impl AmazonLinux1 {
    pub fn new(arch: &str) -> Self {
        let paths = [
            "latest/updates",
            "latest/main",
            "2017.03/updates",
            "2017.03/main",
            "2017.09/updates",
            "2017.09/main",
            "2018.03/updates",
            "2018.03/main",
        ]
        .into_iter()
        .map(String::from)
        .collect();

        Self {
            mirrors: vec![Box::new(MirrorListMirror::new(
                "http://repo.us-east-1.amazonaws.com/",
                paths,
                arch,
            ))],
        }
    }
}

impl AmazonLinux2 {
    pub fn new(arch: &str) -> Self {
        let paths = [
            "core/2.0",
            "core/latest",
            "extras/kernel-ng/latest",
            "extras/kernel-5.4/latest",
            "extras/kernel-5.10/latest",
            "extras/kernel-5.15/latest",
        ]
        .into_iter()
        .map(|path| format!("{}/{}", path, arch))
        .collect();

        Self {
            mirrors: vec![Box::new(MirrorListMirror::new(
                "http://amazonlinux.us-east-1.amazonaws.com/2/",
                paths,
                arch,
            ))],
        }
    }
}

impl AmazonLinux2022 {
    pub fn new(arch: &str) -> Self {
        let paths = ["latest", "2022.0.20220202", "2022.0.20220315"]
            .into_iter()
            .map(|path| format!("{}/{}", path, arch))
            .collect();

        Self {
            mirrors: vec![Box::new(MirrorListMirror::new(
                "https://al2022-repos-us-east-1-9761ab97.s3.dualstack.us-east-1.amazonaws.com/core/mirrors/",
                paths,
                arch,
            ))],
        }
    }
}

impl AmazonLinux2023 {
    pub fn new(arch: &str) -> Self {
        let paths = ["latest"]
            .into_iter()
            .map(|path| format!("{}/{}", path, arch))
            .collect();

        Self {
            mirrors: vec![Box::new(MirrorListMirror::new(
                "https://cdn.amazonlinux.com/al2023/core/mirrors/",
                paths,
                arch,
            ))],
        }
    }
}
