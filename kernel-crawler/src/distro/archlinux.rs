// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Arch Linux.

The Arch archive keeps one flat directory listing per headers package
(stable, hardened, lts, zen); every non-signature entry in it is a package
version.
*/

use {
    crate::{
        driverkit::DriverKitConfig,
        error::Result,
        fetch::HttpFetcher,
        listing::anchor_links,
        repo::{merge_tree, Distro, PackageTree, Repository},
    },
    async_trait::async_trait,
    once_cell::sync::Lazy,
    regex::Regex,
    std::{collections::BTreeSet, fmt},
};

const ARCHIVE_URLS: &[&str] = &[
    "https://archive.archlinux.org/packages/l/linux-headers/",
    "https://archive.archlinux.org/packages/l/linux-hardened-headers/",
    "https://archive.archlinux.org/packages/l/linux-lts-headers/",
    "https://archive.archlinux.org/packages/l/linux-zen-headers/",
];

static HEADERS_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"linux.*headers-").expect("static pattern"));

static PACKAGE_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\.pkg\.tar.*").expect("static pattern"));

pub struct ArchLinuxRepository {
    base_url: String,
}

impl ArchLinuxRepository {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }

    /// `linux-lts-headers-5.15.12-1-x86_64.pkg.tar.zst` → `5.15.12-1-x86_64`.
    fn parse_kernel_release(&self, package: &str) -> String {
        let trimmed = HEADERS_PREFIX.replace(package, "");
        PACKAGE_SUFFIX.replace(&trimmed, "").into_owned()
    }
}

impl fmt::Display for ArchLinuxRepository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.base_url)
    }
}

#[async_trait]
impl Repository for ArchLinuxRepository {
    async fn package_tree(&self, fetcher: &HttpFetcher, _filter: &str) -> Result<PackageTree> {
        let Some(body) = fetcher.fetch_text(&self.base_url).await? else {
            return Ok(PackageTree::new());
        };

        let mut tree = PackageTree::new();
        for package in anchor_links(&body) {
            if package.ends_with(".sig") || package == "../" || package.starts_with('?') {
                continue;
            }

            let release = self.parse_kernel_release(&package);
            tree.entry(release)
                .or_default()
                .insert(format!("{}{}", self.base_url, package));
        }

        Ok(tree)
    }
}

pub struct ArchLinux;

impl ArchLinux {
    pub fn new(_arch: &str) -> Self {
        Self
    }
}

#[async_trait]
impl Distro for ArchLinux {
    async fn package_tree(&self, fetcher: &HttpFetcher, filter: &str) -> Result<PackageTree> {
        let mut tree = PackageTree::new();

        for url in ARCHIVE_URLS {
            let repo = ArchLinuxRepository::new(*url);
            match repo.package_tree(fetcher, filter).await {
                Ok(sub) => merge_tree(&mut tree, sub),
                Err(err) => log::warn!("{}: skipping repository: {}", repo, err),
            }
        }

        Ok(tree)
    }

    fn to_driverkit(&self, release: &str, deps: &BTreeSet<String>) -> Vec<DriverKitConfig> {
        deps.iter()
            .next()
            .and_then(|dep| DriverKitConfig::with_headers(release, "arch", vec![dep.clone()]))
            .into_iter()
            .collect()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn release_parsing_strips_headers_prefix_and_package_suffix() {
        let repo = ArchLinuxRepository::new("https://archive.archlinux.org/packages/l/linux-headers/");

        assert_eq!(
            repo.parse_kernel_release("linux-headers-5.16.3.arch1-1-x86_64.pkg.tar.zst"),
            "5.16.3.arch1-1-x86_64"
        );
        assert_eq!(
            repo.parse_kernel_release("linux-lts-headers-5.15.12-1-x86_64.pkg.tar.xz"),
            "5.15.12-1-x86_64"
        );
    }
}
