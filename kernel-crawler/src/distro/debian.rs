// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Debian.

Two Debian quirks live here. Dependency resolution must span repositories,
because the `linux-kbuild` package sits in a different repository than the
kernels that need it; the adapter therefore merges the raw package tables
of every repository before building the tree. And one release covers up to
four kernel variants (plain, rt, cloud, rpi), each emitted as its own
descriptor.
*/

use {
    crate::{
        deb::{deb_arch, packages::PackageDb, resolve, DebMirror},
        driverkit::DriverKitConfig,
        error::Result,
        fetch::HttpFetcher,
        repo::{Distro, PackageTree},
    },
    async_trait::async_trait,
    std::collections::BTreeSet,
};

fn dist_filter(dist: &str) -> bool {
    !dist.contains("stable") && !dist.contains("testing") && !dist.starts_with("Debian")
}

pub struct Debian {
    mirrors: Vec<DebMirror>,
    arch: String,
}

impl Debian {
    pub fn new(arch: &str) -> Self {
        let arch = deb_arch(arch);

        Self {
            mirrors: vec![
                DebMirror::with_filter("http://mirrors.edge.kernel.org/debian/", arch, dist_filter),
                DebMirror::with_filter("http://security.debian.org/", arch, dist_filter),
            ],
            arch: arch.to_string(),
        }
    }
}

#[async_trait]
impl Distro for Debian {
    async fn package_tree(&self, fetcher: &HttpFetcher, filter: &str) -> Result<PackageTree> {
        let mut all_packages = PackageDb::new();
        let mut all_candidates = vec![];

        for mirror in &self.mirrors {
            for repo in mirror.deb_repos(fetcher).await? {
                let db = match repo.raw_package_db(fetcher).await {
                    Ok(db) => db,
                    Err(err) => {
                        log::warn!("{}: skipping repository: {}", repo, err);
                        continue;
                    }
                };

                all_candidates.extend(resolve::candidate_packages(&db, filter));
                all_packages.extend(db);
            }
        }

        Ok(resolve::build_package_tree(&all_packages, &all_candidates))
    }

    fn to_driverkit(&self, release: &str, deps: &BTreeSet<String>) -> Vec<DriverKitConfig> {
        let (krel, kver) = match release.split_once('/') {
            Some((krel, kver)) => (krel, kver.to_string()),
            None => (release, crate::driverkit::DEFAULT_KERNEL_VERSION.to_string()),
        };

        let mut kbuild = None;
        let mut plain = vec![];
        let mut rt = vec![];
        let mut cloud = vec![];
        let mut rpi = vec![];

        for dep in deps {
            if dep.contains("kbuild") {
                kbuild = Some(dep.clone());
            } else if dep.contains("-rt") {
                rt.push(dep.clone());
            } else if dep.contains("-cloud") {
                cloud.push(dep.clone());
            } else if dep.contains("-rpi") {
                rpi.push(dep.clone());
            } else {
                plain.push(dep.clone());
            }
        }

        let variants = [
            (format!("{}-{}", krel, self.arch), plain),
            (format!("{}-rt-{}", krel, self.arch), rt),
            (format!("{}-cloud-{}", krel, self.arch), cloud),
            (format!("{}-rpi-{}", krel, self.arch), rpi),
        ];

        variants
            .into_iter()
            .filter(|(_, headers)| !headers.is_empty())
            .filter_map(|(variant_release, mut headers)| {
                if let Some(kbuild) = &kbuild {
                    headers.push(kbuild.clone());
                }
                // a buildable kernel needs at least headers, common headers
                // and kbuild
                if headers.len() < 3 {
                    return None;
                }

                DriverKitConfig::with_headers_and_version(
                    variant_release,
                    "debian",
                    kver.clone(),
                    headers,
                )
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
    fn four_variants_fan_out_and_share_kbuild() {
        let debian = Debian::new("x86_64");
        let deps = deps(&[
            "http://mirror/debian/pool/main/l/linux/linux-headers-5.16.0-1-amd64_5.16.7-2_amd64.deb",
            "http://mirror/debian/pool/main/l/linux/linux-headers-5.16.0-1-common_5.16.7-2_all.deb",
            "http://mirror/debian/pool/main/l/linux/linux-headers-5.16.0-1-rt-amd64_5.16.7-2_amd64.deb",
            "http://mirror/debian/pool/main/l/linux/linux-headers-5.16.0-1-common-rt_5.16.7-2_all.deb",
            "http://mirror/debian/pool/main/l/linux/linux-headers-5.16.0-1-cloud-amd64_5.16.7-2_amd64.deb",
            "http://mirror/debian/pool/main/l/linux/linux-headers-5.16.0-1-common-cloud_5.16.7-2_all.deb",
            "http://mirror/debian/pool/main/l/linux/linux-headers-5.16.0-1-rpi_5.16.7-2_arm64.deb",
            "http://mirror/debian/pool/main/l/linux/linux-headers-5.16.0-1-common-rpi_5.16.7-2_all.deb",
            "http://mirror/debian/pool/main/l/linux/linux-kbuild-5.16_5.16.7-2_amd64.deb",
        ]);

        let configs = debian.to_driverkit("5.16.7-2", &deps);
        assert_eq!(configs.len(), 4);

        let releases: BTreeSet<_> = configs
            .iter()
            .map(|config| config.kernelrelease.as_str())
            .collect();
        assert_eq!(
            releases,
            [
                "5.16.7-2-amd64",
                "5.16.7-2-rt-amd64",
                "5.16.7-2-cloud-amd64",
                "5.16.7-2-rpi-amd64",
            ]
            .into()
        );

        for config in &configs {
            assert_eq!(config.target, "debian");
            assert!(config
                .headers
                .as_ref()
                .unwrap()
                .iter()
                .any(|url| url.contains("linux-kbuild-5.16")));
        }
    }

    #[test]
    fn incomplete_variants_are_dropped() {
        let debian = Debian::new("x86_64");
        // rt has only one headers package: too few artifacts to build
        let deps = deps(&[
            "http://mirror/debian/pool/main/l/linux/linux-headers-5.16.0-1-rt-amd64_5.16.7-2_amd64.deb",
            "http://mirror/debian/pool/main/l/linux/linux-kbuild-5.16_5.16.7-2_amd64.deb",
        ]);

        assert!(debian.to_driverkit("5.16.7-2", &deps).is_empty());
    }

    #[test]
    fn normalized_release_splits_into_version() {
        let debian = Debian::new("x86_64");
        let deps = deps(&[
            "http://mirror/debian/pool/main/l/linux/linux-headers-5.10.0-8-amd64_5.10.46-4_amd64.deb",
            "http://mirror/debian/pool/main/l/linux/linux-headers-5.10.0-8-common_5.10.46-4_all.deb",
            "http://mirror/debian/pool/main/l/linux/linux-kbuild-5.10_5.10.46-4_amd64.deb",
        ]);

        let configs = debian.to_driverkit("5.10.46-4/2~bpo10+1", &deps);
        assert_eq!(configs.len(), 1);
        assert_eq!(configs[0].kernelrelease, "5.10.46-4-amd64");
        assert_eq!(configs[0].kernelversion, "2~bpo10+1");
    }
}
