// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! SUSE RPM repository variants.

SUSE repositories publish their package listing as the XML `primary` index
rather than a `primary_db` SQLite database. Rather than deserializing the
(very large) XML into a document, the listing is scanned with a regex for
the one `kernel-default-devel` package location; the matching
`kernel-devel` noarch companion URL is synthesized from it.
*/

use {
    crate::{
        error::Result,
        fetch::HttpFetcher,
        repo::{Mirror, PackageTree, Repository},
        rpm::{enumerate_dists, repomd::RepoMd},
    },
    async_trait::async_trait,
    regex::Regex,
    std::fmt,
};

const KERNEL_DEVEL_PREFIX: &str = "kernel-default-devel-";

/// A SUSE repository bound to one architecture.
pub struct SuseRpmRepository {
    base_url: String,
    arch: String,
}

impl SuseRpmRepository {
    pub fn new(base_url: impl Into<String>, arch: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            arch: arch.into(),
        }
    }

    async fn primary_url(&self, fetcher: &HttpFetcher) -> Result<Option<String>> {
        let url = format!("{}repodata/repomd.xml", self.base_url);
        let Some(body) = fetcher.fetch_text(&url).await? else {
            return Ok(None);
        };

        let repomd = RepoMd::from_xml(&body)?;

        Ok(repomd
            .location_href("primary")
            .map(|href| format!("{}{}", self.base_url, href)))
    }

    /// `x86_64/kernel-default-devel-5.14.21-150400.22.1.x86_64.rpm`
    /// → `5.14.21-150400.22.1.x86_64`.
    fn parse_kernel_release(&self, kernel_devel_pkg: &str) -> String {
        kernel_devel_pkg
            .replace(&format!("{}/{}", self.arch, KERNEL_DEVEL_PREFIX), "")
            .replace(".rpm", "")
    }

    /// The noarch `kernel-devel` companion for a release.
    ///
    /// SUSE pairs the arch-specific `kernel-default-devel` package with a
    /// noarch `kernel-devel` package; compilation needs both.
    fn noarch_kernel_devel_url(&self, kernel_release: &str) -> String {
        format!(
            "{}noarch/kernel-devel-{}.rpm",
            self.base_url, kernel_release
        )
        .replace(&self.arch, "noarch")
    }
}

impl fmt::Display for SuseRpmRepository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.base_url)
    }
}

#[async_trait]
impl Repository for SuseRpmRepository {
    async fn package_tree(&self, fetcher: &HttpFetcher, _filter: &str) -> Result<PackageTree> {
        let Some(primary_url) = self.primary_url(fetcher).await? else {
            return Ok(PackageTree::new());
        };
        let Some(listing) = fetcher.fetch_text(&primary_url).await? else {
            return Ok(PackageTree::new());
        };

        // regex scan keeps the multi-megabyte listing out of a DOM
        let pattern = Regex::new(&format!(
            r#"href="({}/{}.*?rpm)""#,
            regex::escape(&self.arch),
            KERNEL_DEVEL_PREFIX
        ))
        .expect("static pattern");

        let Some(pkg) = pattern
            .captures(&listing)
            .map(|caps| caps[1].to_string())
        else {
            return Ok(PackageTree::new());
        };

        let release = self.parse_kernel_release(&pkg);

        let mut tree = PackageTree::new();
        let urls = tree.entry(release.clone()).or_default();
        urls.insert(format!("{}{}", self.base_url, pkg));
        urls.insert(self.noarch_kernel_devel_url(&release));

        Ok(tree)
    }
}

/// A SUSE mirror, enumerating [SuseRpmRepository] values.
pub struct SuseRpmMirror {
    base_url: String,
    variant: String,
    arch: String,
    filter: fn(&str) -> bool,
}

impl SuseRpmMirror {
    pub fn new(
        base_url: impl Into<String>,
        variant: impl Into<String>,
        arch: impl Into<String>,
    ) -> Self {
        Self::with_filter(base_url, variant, arch, crate::rpm::all_dists)
    }

    pub fn with_filter(
        base_url: impl Into<String>,
        variant: impl Into<String>,
        arch: impl Into<String>,
        filter: fn(&str) -> bool,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            variant: variant.into(),
            arch: arch.into(),
            filter,
        }
    }

    fn dist_url(&self, dist: &str) -> String {
        format!("{}{}{}", self.base_url, dist, self.variant)
    }
}

impl fmt::Display for SuseRpmMirror {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.base_url)
    }
}

#[async_trait]
impl Mirror for SuseRpmMirror {
    async fn list_repos(&self, fetcher: &HttpFetcher) -> Result<Vec<Box<dyn Repository>>> {
        let mut repos: Vec<Box<dyn Repository>> = vec![];

        for dist in enumerate_dists(fetcher, &self.base_url, self.filter).await? {
            let url = self.dist_url(&dist);
            if fetcher.probe(&url).await {
                repos.push(Box::new(SuseRpmRepository::new(url, self.arch.clone())));
            }
        }

        Ok(repos)
    }
}

#[cfg(test)]
mod test {
    use {
        super::*,
        crate::fetch::FetchConfig,
        wiremock::{
            matchers::{method, path},
            Mock, MockServer, ResponseTemplate,
        },
    };

    #[test]
    fn release_parsing_strips_prefix_and_extension() {
        let repo = SuseRpmRepository::new("http://mirror/leap/15.4/repo/oss/", "x86_64");
        assert_eq!(
            repo.parse_kernel_release(
                "x86_64/kernel-default-devel-5.14.21-150400.22.1.x86_64.rpm"
            ),
            "5.14.21-150400.22.1.x86_64"
        );
    }

    #[test]
    fn noarch_url_replaces_arch() {
        let repo = SuseRpmRepository::new("http://mirror/leap/15.4/repo/oss/", "x86_64");
        assert_eq!(
            repo.noarch_kernel_devel_url("5.14.21-150400.22.1.x86_64"),
            "http://mirror/leap/15.4/repo/oss/noarch/kernel-devel-5.14.21-150400.22.1.noarch.rpm"
        );
    }

    #[tokio::test]
    async fn package_tree_pairs_devel_and_noarch() {
        let server = MockServer::start().await;

        let repomd = r#"<repomd xmlns="http://linux.duke.edu/metadata/repo">
            <data type="primary"><location href="repodata/primary.xml"/></data>
        </repomd>"#;
        let primary = r#"<metadata>
            <package type="rpm"><name>kernel-default-devel</name>
            <location href="x86_64/kernel-default-devel-5.14.21-150400.22.1.x86_64.rpm"/>
            </package>
        </metadata>"#;

        Mock::given(method("GET"))
            .and(path("/repo/repodata/repomd.xml"))
            .respond_with(ResponseTemplate::new(200).set_body_string(repomd))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/repo/repodata/primary.xml"))
            .respond_with(ResponseTemplate::new(200).set_body_string(primary))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new(FetchConfig::default()).unwrap();
        let repo = SuseRpmRepository::new(format!("{}/repo/", server.uri()), "x86_64");

        let tree = repo.package_tree(&fetcher, "").await.unwrap();
        assert_eq!(tree.len(), 1);

        let urls = &tree["5.14.21-150400.22.1.x86_64"];
        assert_eq!(urls.len(), 2);
        assert!(urls
            .iter()
            .any(|u| u.ends_with("x86_64/kernel-default-devel-5.14.21-150400.22.1.x86_64.rpm")));
        assert!(urls
            .iter()
            .any(|u| u.ends_with("noarch/kernel-devel-5.14.21-150400.22.1.noarch.rpm")));
    }
}
