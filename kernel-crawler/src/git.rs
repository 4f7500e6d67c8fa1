// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Git-sourced working trees.

Appliance-style distributions (Minikube, BottleRocket, Talos) publish their
kernel configuration in a git repository rather than a package mirror. The
[GitSource] wrapper clones a repository into a temporary directory, selects
the release tags worth crawling, and offers the working-tree helpers the
extraction recipes share.

All operations here are blocking; async callers wrap the whole per-distro
walk in `spawn_blocking`.
*/

use {
    crate::error::{CrawlError, Result},
    base64::{engine::general_purpose::STANDARD as BASE64, Engine as _},
    git2::build::CheckoutBuilder,
    once_cell::sync::Lazy,
    regex::Regex,
    semver::Version,
    std::path::{Path, PathBuf},
    tempfile::TempDir,
    walkdir::WalkDir,
};

static RELEASE_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^refs/tags/v(0|[1-9]\d*)\.(0|[1-9]\d*)\.(0|[1-9]\d*)$").expect("static pattern")
});

/// A cloned git repository in a temporary working tree.
pub struct GitSource {
    repo: git2::Repository,
    workdir: TempDir,
}

impl GitSource {
    /// Clone `https://github.com/<org>/<name>.git` into a fresh temp dir.
    pub fn clone(org: &str, name: &str) -> Result<Self> {
        let url = format!("https://github.com/{}/{}.git", org, name);
        let workdir = TempDir::with_prefix(format!("{}-", name))?;

        log::info!("cloning {}", url);

        let mut callbacks = git2::RemoteCallbacks::new();
        let repo_name = name.to_string();
        let mut last_decile = 0;
        callbacks.transfer_progress(move |stats| {
            let total = stats.total_objects();
            if total > 0 {
                let decile = stats.received_objects() * 10 / total;
                if decile > last_decile {
                    last_decile = decile;
                    log::debug!(
                        "cloning {}: {}/{} objects",
                        repo_name,
                        stats.received_objects(),
                        total
                    );
                }
            }
            true
        });

        let mut fetch_options = git2::FetchOptions::new();
        fetch_options.remote_callbacks(callbacks);

        let repo = git2::build::RepoBuilder::new()
            .fetch_options(fetch_options)
            .clone(&url, workdir.path())?;

        Ok(Self { repo, workdir })
    }

    pub fn workdir(&self) -> &Path {
        self.workdir.path()
    }

    /// Release versions worth crawling.
    ///
    /// Strict `vX.Y.Z` tags only. The cutoff is the third most recent `.0`
    /// release: every tag at least that old stays, which keeps the last
    /// three minor series along with their patch releases.
    pub fn versions(&self) -> Result<Vec<Version>> {
        let mut all = vec![];

        for name in self.repo.references()?.names() {
            let name = name?;
            if RELEASE_TAG.is_match(name) {
                if let Ok(version) = Version::parse(name.trim_start_matches("refs/tags/v")) {
                    all.push(version);
                }
            }
        }

        Ok(select_versions(all))
    }

    fn checkout_ref(&self, refname: &str) -> Result<()> {
        let object = self.repo.revparse_single(refname)?;
        self.repo
            .checkout_tree(&object, Some(CheckoutBuilder::new().force()))?;
        self.repo.set_head(refname)?;

        Ok(())
    }

    /// Check out a release tag.
    pub fn checkout_version(&self, version: &Version) -> Result<()> {
        self.checkout_ref(&format!("refs/tags/v{}", version))
    }

    /// Check out an arbitrary commit.
    ///
    /// Implemented by minting an ephemeral `v<hash>` tag for the object
    /// first; only tag checkouts are supported here.
    pub fn checkout_commit(&self, hash: &str) -> Result<()> {
        let tag_name = format!("v{}", hash);
        let refname = format!("refs/tags/{}", tag_name);

        if self.repo.find_reference(&refname).is_err() {
            // revparse also resolves abbreviated hashes
            let object = self.repo.revparse_single(hash)?;
            self.repo.tag_lightweight(&tag_name, &object, false)?;
        }

        self.checkout_ref(&refname)
    }

    /// Locate a file by name anywhere in the working tree.
    pub fn find_file(&self, file_name: &str) -> Option<PathBuf> {
        WalkDir::new(self.workdir.path())
            .into_iter()
            .filter_entry(|entry| entry.file_name() != ".git")
            .filter_map(|entry| entry.ok())
            .find(|entry| entry.file_type().is_file() && entry.file_name() == file_name)
            .map(|entry| entry.into_path())
    }

    /// First `key<sep>value` line of the named file, with quotes stripped.
    ///
    /// `None` when the file or the key is missing.
    pub fn extract_value(&self, file_name: &str, key: &str, sep: char) -> Result<Option<String>> {
        let Some(path) = self.find_file(file_name) else {
            return Ok(None);
        };

        let text = std::fs::read_to_string(&path)
            .map_err(|e| CrawlError::IoPath(path.display().to_string(), e))?;

        for line in text.lines() {
            if let Some(rest) = line.trim_start().strip_prefix(key) {
                if let Some(value) = rest.strip_prefix(sep) {
                    return Ok(Some(value.trim().trim_matches('"').trim().to_string()));
                }
            }
        }

        Ok(None)
    }

    /// Base64 of the named file's content.
    pub fn base64_file(&self, file_name: &str) -> Result<Option<String>> {
        let Some(path) = self.find_file(file_name) else {
            return Ok(None);
        };

        let data = std::fs::read(&path)
            .map_err(|e| CrawlError::IoPath(path.display().to_string(), e))?;

        Ok(Some(BASE64.encode(data)))
    }
}

/// The cutoff rule behind [GitSource::versions], testable without a clone.
pub(crate) fn select_versions(mut all: Vec<Version>) -> Vec<Version> {
    all.sort();

    let zeroes: Vec<&Version> = all.iter().filter(|v| v.patch == 0).collect();
    let Some(oldest) = zeroes.get(zeroes.len().saturating_sub(3)) else {
        return vec![];
    };
    let oldest = (*oldest).clone();

    all.into_iter().filter(|v| *v >= oldest).collect()
}
