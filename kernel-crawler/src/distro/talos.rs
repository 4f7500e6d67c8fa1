// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Talos Linux.

Talos splits its build across two repositories: the main `siderolabs/talos`
tree pins the package sources, while `siderolabs/pkgs` carries the kernel
`Pkgfile` and config. For every talos release the pinned pkgs revision is
read from `pkg/machinery/gendata/data/pkgs` and checked out in the side
repository before extraction.
*/

use {
    crate::{
        deb::deb_arch,
        driverkit::DriverKitConfig,
        error::{CrawlError, Result},
        fetch::HttpFetcher,
        git::GitSource,
        repo::Distro,
    },
    async_trait::async_trait,
};

const PKGS_PIN_PATH: &str = "pkg/machinery/gendata/data/pkgs";

pub struct Talos {
    arch: String,
}

impl Talos {
    pub fn new(arch: &str) -> Self {
        Self {
            arch: deb_arch(arch).to_string(),
        }
    }
}

/// How a talos release pins the pkgs repository.
#[derive(Debug, Eq, PartialEq)]
enum PkgsPin {
    /// A released pkgs tag (`v1.5.0`).
    Tag(String),
    /// A commit hash from a `git describe` style pin
    /// (`v1.5.0-12-g1a2b3c4` or a bare hash).
    Commit(String),
}

fn parse_pkgs_pin(content: &str) -> Option<PkgsPin> {
    let pin = content.trim();
    if pin.is_empty() {
        return None;
    }

    if let Some((_, hash)) = pin.rsplit_once("-g") {
        return Some(PkgsPin::Commit(hash.to_string()));
    }

    if pin.starts_with('v') {
        return Some(PkgsPin::Tag(pin.trim_start_matches('v').to_string()));
    }

    Some(PkgsPin::Commit(pin.to_string()))
}

fn crawl_blocking(arch: &str) -> Result<Vec<DriverKitConfig>> {
    let talos = GitSource::clone("siderolabs", "talos")?;
    let pkgs = GitSource::clone("siderolabs", "pkgs")?;

    let mut configs = vec![];

    for version in talos.versions()? {
        talos.checkout_version(&version)?;

        let pin_path = talos.workdir().join(PKGS_PIN_PATH);
        let pin = match std::fs::read_to_string(&pin_path) {
            Ok(content) => content,
            Err(err) => {
                log::debug!("talos v{}: no pkgs pin ({})", version, err);
                continue;
            }
        };

        let Some(pin) = parse_pkgs_pin(&pin) else {
            continue;
        };

        let checkout = match &pin {
            PkgsPin::Commit(hash) => pkgs.checkout_commit(hash),
            PkgsPin::Tag(tag) => match semver::Version::parse(tag) {
                Ok(tag) => pkgs.checkout_version(&tag),
                Err(err) => Err(CrawlError::MalformedIndex(format!(
                    "bad pkgs tag {}: {}",
                    tag, err
                ))),
            },
        };
        if let Err(err) = checkout {
            log::debug!("talos v{}: cannot check out pkgs pin {:?}: {}", version, pin, err);
            continue;
        }

        let Some(release) = pkgs.extract_value("Pkgfile", "linux_version", ':')? else {
            log::debug!("talos v{}: no linux_version in Pkgfile", version);
            continue;
        };
        let Some(config_data) = pkgs.base64_file(&format!("config-{}", arch))? else {
            log::debug!("talos v{}: no kernel config for {}", version, arch);
            continue;
        };

        configs.push(DriverKitConfig::with_config_data(
            release,
            "talos",
            format!("1_{}", version),
            config_data,
        ));
    }

    Ok(configs)
}

#[async_trait]
impl Distro for Talos {
    async fn crawl(&self, _fetcher: &HttpFetcher, _filter: &str) -> Result<Vec<DriverKitConfig>> {
        let arch = self.arch.clone();

        tokio::task::spawn_blocking(move || crawl_blocking(&arch)).await?
    }
}
