// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Discovery interfaces shared by all distribution adapters.

Three layers, leaves first: a [Repository] is a single resolvable package
index at one base URL; a [Mirror] is an HTTP server that contains
repositories and knows how to enumerate them; a [Distro] owns a set of
mirrors (or a source tree, or a container image) and converts discovered
releases into [DriverKitConfig] descriptors.

Adapters are values holding their configuration and implementing these
traits; there is no deeper hierarchy.
*/

use {
    crate::{driverkit::DriverKitConfig, error::Result, fetch::HttpFetcher},
    async_trait::async_trait,
    indexmap::IndexMap,
    std::{collections::BTreeSet, fmt::Display},
};

/// Artifact URL sets keyed by kernel release, in discovery order.
pub type PackageTree = IndexMap<String, BTreeSet<String>>;

/// Merge `from` into `into`, unioning URL sets of shared releases.
pub fn merge_tree(into: &mut PackageTree, from: PackageTree) {
    for (release, urls) in from {
        into.entry(release).or_default().extend(urls);
    }
}

/// A single resolvable package index at one base URL.
#[async_trait]
pub trait Repository: Display + Send + Sync {
    /// Map kernel releases to the artifact URLs needed to build against
    /// them, optionally narrowed by a version filter.
    async fn package_tree(&self, fetcher: &HttpFetcher, filter: &str) -> Result<PackageTree>;
}

/// An HTTP server containing package repositories.
#[async_trait]
pub trait Mirror: Send + Sync {
    /// Enumerate the repositories this mirror currently serves.
    async fn list_repos(&self, fetcher: &HttpFetcher) -> Result<Vec<Box<dyn Repository>>>;
}

/// Walk every repository of every mirror, merging their package trees.
///
/// A repository that fails to resolve contributes nothing; the failure is
/// logged and the remaining repositories proceed.
pub async fn mirrors_package_tree(
    fetcher: &HttpFetcher,
    mirrors: &[Box<dyn Mirror>],
    filter: &str,
) -> Result<PackageTree> {
    let mut tree = PackageTree::new();

    for mirror in mirrors {
        let repos = match mirror.list_repos(fetcher).await {
            Ok(repos) => repos,
            Err(err) => {
                log::warn!("skipping mirror: {}", err);
                continue;
            }
        };

        for repo in repos {
            match repo.package_tree(fetcher, filter).await {
                Ok(sub) => merge_tree(&mut tree, sub),
                Err(err) => log::warn!("{}: skipping repository: {}", repo, err),
            }
        }
    }

    Ok(tree)
}

/// A top-level per-distribution adapter.
#[async_trait]
pub trait Distro: Send + Sync {
    /// Kernel releases and their artifact URLs for this distribution.
    ///
    /// Source-tree distributions have no artifact URLs and leave this
    /// empty; they override [Self::crawl] instead.
    async fn package_tree(&self, fetcher: &HttpFetcher, filter: &str) -> Result<PackageTree> {
        let _ = (fetcher, filter);
        Ok(PackageTree::new())
    }

    /// Convert one discovered release into build descriptors.
    ///
    /// An empty result drops the release from the output. Most adapters
    /// emit a single descriptor; flavored distributions (Ubuntu, Debian)
    /// fan one release out into several.
    fn to_driverkit(&self, release: &str, deps: &BTreeSet<String>) -> Vec<DriverKitConfig> {
        let _ = (release, deps);
        vec![]
    }

    /// Full crawl: discover releases and convert them.
    async fn crawl(&self, fetcher: &HttpFetcher, filter: &str) -> Result<Vec<DriverKitConfig>> {
        let tree = self.package_tree(fetcher, filter).await?;

        Ok(tree
            .iter()
            .flat_map(|(release, deps)| self.to_driverkit(release, deps))
            .collect())
    }
}

/// A distribution probed through a running container image.
#[async_trait]
pub trait ContainerDistro: Send + Sync {
    /// Kernel releases reported by the image's package manager.
    async fn kernel_versions(&self) -> Result<BTreeSet<String>>;

    /// Convert one probed release into a build descriptor.
    fn to_driverkit(&self, release: &str) -> DriverKitConfig;
}
