// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! RPM repository family.

An RPM repository is defined by a base URL with a `repodata/repomd.xml`
manifest underneath. [RpmRepository] resolves the manifest to the
`primary_db` SQLite index and runs the kernel package closure against it;
[RpmMirror] enumerates repositories from an HTML directory listing.

The SUSE variants, which publish only the XML `primary` index, live in
[suse].
*/

pub mod primary_db;
pub mod repomd;
pub mod suse;

use {
    crate::{
        error::Result,
        fetch::HttpFetcher,
        listing::directory_links,
        repo::{Mirror, PackageTree, Repository},
        rpm::repomd::RepoMd,
    },
    async_trait::async_trait,
    std::{borrow::Cow, fmt, io::Write},
};

/// Accept-all repository filter.
pub fn all_dists(_dist: &str) -> bool {
    true
}

/// A single RPM repository.
pub struct RpmRepository {
    base_url: String,
    kernel_query: Cow<'static, str>,
}

impl RpmRepository {
    /// Construct an instance with the default kernel package predicate.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_kernel_query(base_url, primary_db::DEFAULT_KERNEL_QUERY)
    }

    /// Construct an instance with a distribution-specific kernel package
    /// predicate (a SQL expression over the `packages` table).
    pub fn with_kernel_query(
        base_url: impl Into<String>,
        kernel_query: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            kernel_query: kernel_query.into(),
        }
    }

    async fn repodb_url(&self, fetcher: &HttpFetcher) -> Result<Option<String>> {
        let url = format!("{}repodata/repomd.xml", self.base_url);
        let Some(body) = fetcher.fetch_text(&url).await? else {
            return Ok(None);
        };

        let repomd = RepoMd::from_xml(&body)?;

        Ok(repomd
            .location_href("primary_db")
            .map(|href| format!("{}{}", self.base_url, href)))
    }
}

impl fmt::Display for RpmRepository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.base_url)
    }
}

#[async_trait]
impl Repository for RpmRepository {
    async fn package_tree(&self, fetcher: &HttpFetcher, filter: &str) -> Result<PackageTree> {
        let Some(db_url) = self.repodb_url(fetcher).await? else {
            return Ok(PackageTree::new());
        };
        let Some(db) = fetcher.fetch(&db_url).await? else {
            return Ok(PackageTree::new());
        };

        let kernel_query = self.kernel_query.to_string();
        let filter = filter.to_string();

        let rows = tokio::task::spawn_blocking(move || {
            let mut tf = tempfile::NamedTempFile::new()?;
            tf.write_all(&db)?;
            tf.flush()?;

            primary_db::kernel_closure(tf.path(), &kernel_query, &filter)
        })
        .await??;

        let mut tree = PackageTree::new();
        for (release, href) in rows {
            tree.entry(release)
                .or_default()
                .insert(format!("{}{}", self.base_url, href));
        }

        Ok(tree)
    }
}

pub(crate) async fn enumerate_dists(
    fetcher: &HttpFetcher,
    base_url: &str,
    filter: fn(&str) -> bool,
) -> Result<Vec<String>> {
    let Some(body) = fetcher.fetch_text(base_url).await? else {
        log::debug!("{}: no directory listing", base_url);
        return Ok(vec![]);
    };

    let mut dists: Vec<String> = directory_links(&body)
        .into_iter()
        .filter(|dist| filter(dist))
        .collect();
    dists.sort();
    dists.dedup();

    Ok(dists)
}

/// An HTTP mirror of versioned RPM repositories.
///
/// The mirror's front page lists one directory per distribution version;
/// each combined with `variant` yields a candidate repository base, kept if
/// it actually responds.
pub struct RpmMirror {
    base_url: String,
    variant: String,
    filter: fn(&str) -> bool,
}

impl RpmMirror {
    pub fn new(base_url: impl Into<String>, variant: impl Into<String>) -> Self {
        Self::with_filter(base_url, variant, all_dists)
    }

    pub fn with_filter(
        base_url: impl Into<String>,
        variant: impl Into<String>,
        filter: fn(&str) -> bool,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            variant: variant.into(),
            filter,
        }
    }

    fn dist_url(&self, dist: &str) -> String {
        format!("{}{}{}", self.base_url, dist, self.variant)
    }
}

impl fmt::Display for RpmMirror {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.base_url)
    }
}

#[async_trait]
impl Mirror for RpmMirror {
    async fn list_repos(&self, fetcher: &HttpFetcher) -> Result<Vec<Box<dyn Repository>>> {
        let mut repos: Vec<Box<dyn Repository>> = vec![];

        for dist in enumerate_dists(fetcher, &self.base_url, self.filter).await? {
            let url = self.dist_url(&dist);
            if fetcher.probe(&url).await {
                repos.push(Box::new(RpmRepository::new(url)));
            } else {
                log::debug!("{}: does not respond, skipped", self.dist_url(&dist));
            }
        }

        Ok(repos)
    }
}
