// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Debian-style repository family.

A Debian archive hangs repositories off `dists/<name>/<component>/
binary-<arch>/`. [DebMirror] discovers the distributions from the archive's
`dists/` listing and their components from each `Release` file;
[DebRepository] parses one component's `Packages` index and resolves the
kernel dependency closure within it.

Debian proper needs the closure resolved across repositories (the
`linux-kbuild` package lives in a different one than the kernels); the
Debian distro adapter therefore combines the raw package tables itself via
[DebRepository::raw_package_db].
*/

pub mod packages;
pub mod resolve;

use {
    crate::{
        deb::packages::PackageDb,
        error::Result,
        fetch::HttpFetcher,
        listing::directory_links,
        repo::{Mirror, PackageTree, Repository},
    },
    async_trait::async_trait,
    std::{collections::BTreeMap, fmt},
};

/// Translate a crawler architecture to the Debian package architecture.
pub fn deb_arch(arch: &str) -> &str {
    match arch {
        "x86_64" => "amd64",
        "aarch64" => "arm64",
        other => other,
    }
}

/// A single `binary-<arch>` package index.
pub struct DebRepository {
    repo_base: String,
    repo_name: String,
}

impl DebRepository {
    /// `repo_base` is the archive root; `repo_name` the index directory
    /// relative to it, ending in `binary-<arch>/`.
    pub fn new(repo_base: impl Into<String>, repo_name: impl Into<String>) -> Self {
        Self {
            repo_base: repo_base.into(),
            repo_name: repo_name.into(),
        }
    }

    /// Fetch and parse this repository's `Packages` index.
    ///
    /// `Packages.xz` is preferred, `Packages.gz` the fallback; an absent
    /// index yields an empty table.
    pub async fn raw_package_db(&self, fetcher: &HttpFetcher) -> Result<PackageDb> {
        let urls = vec![
            format!("{}{}Packages.xz", self.repo_base, self.repo_name),
            format!("{}{}Packages.gz", self.repo_base, self.repo_name),
        ];

        match fetcher.fetch_first(&urls).await? {
            Some(data) => packages::scan_packages(&String::from_utf8_lossy(&data), &self.repo_base),
            None => Ok(PackageDb::new()),
        }
    }
}

impl fmt::Display for DebRepository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.repo_base, self.repo_name)
    }
}

#[async_trait]
impl Repository for DebRepository {
    async fn package_tree(&self, fetcher: &HttpFetcher, filter: &str) -> Result<PackageTree> {
        let db = self.raw_package_db(fetcher).await?;
        let candidates = resolve::candidate_packages(&db, filter);

        Ok(resolve::build_package_tree(&db, &candidates))
    }
}

/// A Debian-style archive mirror.
pub struct DebMirror {
    base_url: String,
    arch: String,
    filter: fn(&str) -> bool,
}

impl DebMirror {
    pub fn new(base_url: impl Into<String>, arch: impl Into<String>) -> Self {
        Self::with_filter(base_url, arch, crate::rpm::all_dists)
    }

    pub fn with_filter(
        base_url: impl Into<String>,
        arch: impl Into<String>,
        filter: fn(&str) -> bool,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            arch: arch.into(),
            filter,
        }
    }

    /// Repositories under one `dists/<name>/` subtree.
    ///
    /// The subtree's `Release` file names its components; only main-like
    /// components are kept, and the duplicated `updates/updates/` path of
    /// the security archive is collapsed.
    async fn scan_repo(&self, fetcher: &HttpFetcher, dist: &str) -> Result<Vec<DebRepository>> {
        let Some(release) = fetcher
            .fetch_text(&format!("{}{}Release", self.base_url, dist))
            .await?
        else {
            return Ok(vec![]);
        };

        let mut components = vec![];
        for line in release.lines() {
            if let Some(rest) = line.strip_prefix("Components: ") {
                for component in rest.split_whitespace() {
                    if matches!(component, "main" | "updates" | "updates/main") {
                        let component = if dist.ends_with("updates/") {
                            component.trim_start_matches("updates/")
                        } else {
                            component
                        };
                        components.push(component.to_string());
                    }
                }
                break;
            }
        }
        components.sort();
        components.dedup();

        Ok(components
            .into_iter()
            .map(|component| {
                DebRepository::new(
                    self.base_url.clone(),
                    format!("{}{}/binary-{}/", dist, component, self.arch),
                )
            })
            .collect())
    }

    /// Enumerate repositories of this mirror as concrete values.
    pub async fn deb_repos(&self, fetcher: &HttpFetcher) -> Result<Vec<DebRepository>> {
        let dists_url = format!("{}dists/", self.base_url);
        let Some(body) = fetcher.fetch_text(&dists_url).await? else {
            log::debug!("{}: no distribution listing", dists_url);
            return Ok(vec![]);
        };

        // keyed by URL for deduplication and deterministic order
        let mut repos: BTreeMap<String, DebRepository> = BTreeMap::new();

        for dist in directory_links(&body)
            .into_iter()
            .filter(|dist| (self.filter)(dist))
        {
            for subtree in [format!("dists/{}", dist), format!("dists/{}updates/", dist)] {
                match self.scan_repo(fetcher, &subtree).await {
                    Ok(found) => {
                        for repo in found {
                            repos.insert(repo.to_string(), repo);
                        }
                    }
                    Err(err) => log::debug!("{}: {}", subtree, err),
                }
            }
        }

        Ok(repos.into_values().collect())
    }
}

impl fmt::Display for DebMirror {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.base_url)
    }
}

#[async_trait]
impl Mirror for DebMirror {
    async fn list_repos(&self, fetcher: &HttpFetcher) -> Result<Vec<Box<dyn Repository>>> {
        Ok(self
            .deb_repos(fetcher)
            .await?
            .into_iter()
            .map(|repo| Box::new(repo) as Box<dyn Repository>)
            .collect())
    }
}
