// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Ubuntu.

Ubuntu encodes the kernel *flavor* in the pool path of its packages
(`.../l/linux-oracle/...`, `.../l/linux-aws-5.19/...`, plain `l/linux/` for
generic). One release therefore fans out into one descriptor per flavor,
each with its own `ubuntu-<flavor>` target.
*/

use {
    crate::{
        deb::{deb_arch, DebMirror},
        driverkit::DriverKitConfig,
        error::Result,
        fetch::HttpFetcher,
        repo::{mirrors_package_tree, Distro, Mirror, PackageTree},
    },
    async_trait::async_trait,
    indexmap::IndexMap,
    once_cell::sync::Lazy,
    regex::Regex,
    std::collections::BTreeSet,
};

static POOL_FLAVOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bl/linux(-[a-z0-9.-]+)?/").expect("static pattern"));

pub struct Ubuntu {
    mirrors: Vec<Box<dyn Mirror>>,
}

impl Ubuntu {
    pub fn new(arch: &str) -> Self {
        let arch = deb_arch(arch);

        let mirrors: Vec<Box<dyn Mirror>> = vec![
            Box::new(DebMirror::new("http://mirrors.edge.kernel.org/ubuntu/", arch)),
            Box::new(DebMirror::new("http://security.ubuntu.com/ubuntu/", arch)),
            Box::new(DebMirror::new("http://ports.ubuntu.com/ubuntu-ports/", arch)),
        ];

        Self { mirrors }
    }
}

#[async_trait]
impl Distro for Ubuntu {
    async fn package_tree(&self, fetcher: &HttpFetcher, filter: &str) -> Result<PackageTree> {
        mirrors_package_tree(fetcher, &self.mirrors, filter).await
    }

    fn to_driverkit(&self, release: &str, deps: &BTreeSet<String>) -> Vec<DriverKitConfig> {
        let Some((krel, kver)) = release.split_once('/') else {
            return vec![];
        };

        // target → (kernelrelease, headers), keyed on first sighting
        let mut flavors: IndexMap<String, (String, Vec<String>)> = IndexMap::new();

        for dep in deps {
            if !dep.contains("headers") {
                continue;
            }

            let Some(caps) = POOL_FLAVOR.captures(dep) else {
                continue;
            };

            // "-oracle", "-aws-5.19", or nothing for generic
            let fragment = caps.get(1).map(|m| m.as_str()).unwrap_or("");
            let flavor_full = fragment.trim_start_matches('-');
            let flavor = if flavor_full.is_empty() {
                "generic"
            } else {
                // versioned flavors (aws-5.19) truncate at the first dash
                flavor_full.split('-').next().unwrap_or(flavor_full)
            };

            let target = format!("ubuntu-{}", flavor);
            let entry = flavors
                .entry(target)
                .or_insert_with(|| (format!("{}{}", krel, fragment), vec![]));
            entry.1.push(dep.clone());
        }

        flavors
            .into_iter()
            .filter_map(|(target, (release, headers))| {
                DriverKitConfig::with_headers_and_version(release, target, kver, headers)
            })
            .collect()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn deps(urls: &[&str]) -> BTreeSet<String> {
        urls.iter().map(|url| url.to_string()).collect()
    }

    #[test]
    fn flavors_split_into_disjoint_targets() {
        let ubuntu = Ubuntu::new("x86_64");
        let deps = deps(&[
            "http://mirror/ubuntu/pool/main/l/linux/linux-headers-5.19.0-40-generic_5.19.0-40.41_amd64.deb",
            "http://mirror/ubuntu/pool/main/l/linux/linux-headers-5.19.0-40_5.19.0-40.41_all.deb",
            "http://mirror/ubuntu/pool/main/l/linux-aws-5.19/linux-headers-5.19.0-1022-aws_5.19.0-1022.23_amd64.deb",
            "http://mirror/ubuntu/pool/main/l/linux/linux-modules-5.19.0-40-generic_5.19.0-40.41_amd64.deb",
        ]);

        let mut configs = ubuntu.to_driverkit("5.19.0-40/41", &deps);
        configs.sort_by(|a, b| a.target.cmp(&b.target));

        assert_eq!(configs.len(), 2);

        assert_eq!(configs[0].target, "ubuntu-aws");
        assert_eq!(configs[0].kernelrelease, "5.19.0-40-aws-5.19");
        assert_eq!(configs[0].kernelversion, "41");

        assert_eq!(configs[1].target, "ubuntu-generic");
        assert_eq!(configs[1].kernelrelease, "5.19.0-40");
        assert_eq!(configs[1].headers.as_ref().unwrap().len(), 2);

        let aws: BTreeSet<_> = configs[0].headers.as_ref().unwrap().iter().collect();
        let generic: BTreeSet<_> = configs[1].headers.as_ref().unwrap().iter().collect();
        assert!(aws.is_disjoint(&generic));
    }

    #[test]
    fn non_headers_urls_are_ignored() {
        let ubuntu = Ubuntu::new("x86_64");
        let deps = deps(&[
            "http://mirror/ubuntu/pool/main/l/linux/linux-modules-5.19.0-40-generic_amd64.deb",
        ]);

        assert!(ubuntu.to_driverkit("5.19.0-40/41", &deps).is_empty());
    }

    #[test]
    fn release_without_update_part_is_skipped() {
        let ubuntu = Ubuntu::new("x86_64");
        assert!(ubuntu.to_driverkit("5.19.0-40", &BTreeSet::new()).is_empty());
    }
}
