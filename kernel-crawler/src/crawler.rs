// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! The crawl dispatcher.

Knows every registered distribution, instantiates the requested adapters
and aggregates their descriptors into one output mapping. A failure inside
one distribution is logged and never aborts the others: a flaky mirror
should cost its own entry, not the whole run.
*/

use {
    crate::{
        distro::{
            aliyunlinux::{AliyunLinux2, AliyunLinux3},
            almalinux::AlmaLinux,
            amazonlinux::{AmazonLinux1, AmazonLinux2, AmazonLinux2022, AmazonLinux2023},
            archlinux::ArchLinux,
            bottlerocket::BottleRocket,
            centos::Centos,
            debian::Debian,
            fedora::Fedora,
            flatcar::Flatcar,
            minikube::Minikube,
            opensuse::OpenSuse,
            oracle::Oracle,
            photon::PhotonOs,
            redhat::RedhatContainer,
            rockylinux::RockyLinux,
            talos::Talos,
            ubuntu::Ubuntu,
        },
        driverkit::DriverKitConfig,
        error::{CrawlError, Result},
        fetch::HttpFetcher,
        repo::{ContainerDistro, Distro},
    },
    indexmap::IndexMap,
};

/// How a registered distribution is instantiated.
pub enum Adapter {
    /// Mirror- or source-tree-based: built from an architecture.
    Mirrors(fn(&str) -> Box<dyn Distro>),
    /// Probed through container images.
    Container(fn(&str) -> Box<dyn ContainerDistro>),
}

/// Every known distribution, in registration (and output) order.
pub fn registry() -> Vec<(&'static str, Adapter)> {
    vec![
        ("AliyunLinux2", Adapter::Mirrors(|arch| Box::new(AliyunLinux2::new(arch)))),
        ("AliyunLinux3", Adapter::Mirrors(|arch| Box::new(AliyunLinux3::new(arch)))),
        ("AlmaLinux", Adapter::Mirrors(|arch| Box::new(AlmaLinux::new(arch)))),
        ("AmazonLinux", Adapter::Mirrors(|arch| Box::new(AmazonLinux1::new(arch)))),
        ("AmazonLinux2", Adapter::Mirrors(|arch| Box::new(AmazonLinux2::new(arch)))),
        ("AmazonLinux2022", Adapter::Mirrors(|arch| Box::new(AmazonLinux2022::new(arch)))),
        ("AmazonLinux2023", Adapter::Mirrors(|arch| Box::new(AmazonLinux2023::new(arch)))),
        ("ArchLinux", Adapter::Mirrors(|arch| Box::new(ArchLinux::new(arch)))),
        ("BottleRocket", Adapter::Mirrors(|arch| Box::new(BottleRocket::new(arch)))),
        ("CentOS", Adapter::Mirrors(|arch| Box::new(Centos::new(arch)))),
        ("Debian", Adapter::Mirrors(|arch| Box::new(Debian::new(arch)))),
        ("Fedora", Adapter::Mirrors(|arch| Box::new(Fedora::new(arch)))),
        ("Flatcar", Adapter::Mirrors(|arch| Box::new(Flatcar::new(arch)))),
        ("Minikube", Adapter::Mirrors(|arch| Box::new(Minikube::new(arch)))),
        ("OpenSUSE", Adapter::Mirrors(|arch| Box::new(OpenSuse::new(arch)))),
        ("OracleLinux", Adapter::Mirrors(|arch| Box::new(Oracle::new(arch)))),
        ("PhotonOS", Adapter::Mirrors(|arch| Box::new(PhotonOs::new(arch)))),
        ("Redhat", Adapter::Container(|image| Box::new(RedhatContainer::new(image)))),
        ("RockyLinux", Adapter::Mirrors(|arch| Box::new(RockyLinux::new(arch)))),
        ("Talos", Adapter::Mirrors(|arch| Box::new(Talos::new(arch)))),
        ("Ubuntu", Adapter::Mirrors(|arch| Box::new(Ubuntu::new(arch)))),
    ]
}

/// The registered distribution names.
pub fn distro_names() -> Vec<&'static str> {
    registry().into_iter().map(|(name, _)| name).collect()
}

/// The registered spelling of a case-insensitively matched name.
pub fn canonical_name(distro: &str) -> Option<&'static str> {
    registry()
        .into_iter()
        .map(|(name, _)| name)
        .find(|name| name.eq_ignore_ascii_case(distro))
}

/// Whether the named distribution is probed through container images.
pub fn requires_image(distro: &str) -> bool {
    registry()
        .iter()
        .any(|(name, adapter)| {
            name.eq_ignore_ascii_case(distro) && matches!(adapter, Adapter::Container(_))
        })
}

async fn crawl_container_distro(
    build: fn(&str) -> Box<dyn ContainerDistro>,
    images: &[String],
) -> Vec<DriverKitConfig> {
    // images are merged right-wins, keyed by release
    let mut merged: IndexMap<String, DriverKitConfig> = IndexMap::new();

    for image in images {
        let distro = build(image);
        match distro.kernel_versions().await {
            Ok(releases) => {
                for release in releases {
                    let config = distro.to_driverkit(&release);
                    merged.insert(release, config);
                }
            }
            Err(err) => log::warn!("[{}] probe failed: {}", image, err),
        }
    }

    merged.into_values().collect()
}

/// Crawl the selected distribution (or all of them) and aggregate the
/// build descriptors per distribution name.
///
/// `distro` is matched case-insensitively; `"*"` selects everything.
/// Container-probed distributions are skipped under the wildcard when no
/// image was supplied, but selecting one explicitly without an image is an
/// argument error.
pub async fn crawl_kernels(
    fetcher: &HttpFetcher,
    distro: &str,
    version: &str,
    arch: &str,
    images: &[String],
) -> Result<IndexMap<String, Vec<DriverKitConfig>>> {
    let mut output = IndexMap::new();
    let wildcard = distro == "*";
    let mut matched = false;

    for (name, adapter) in registry() {
        if !wildcard && !name.eq_ignore_ascii_case(distro) {
            continue;
        }
        matched = true;

        let configs = match adapter {
            Adapter::Mirrors(build) => {
                let adapter = build(arch);
                match adapter.crawl(fetcher, version).await {
                    Ok(configs) => configs,
                    Err(err) => {
                        log::warn!("{}: crawl failed: {}", name, err);
                        continue;
                    }
                }
            }
            Adapter::Container(build) => {
                if images.is_empty() {
                    if wildcard {
                        log::debug!("{}: no image supplied, skipped", name);
                        continue;
                    }
                    return Err(CrawlError::MissingImage(name));
                }
                crawl_container_distro(build, images).await
            }
        };

        if !configs.is_empty() {
            output.insert(name.to_string(), configs);
        }
    }

    if !matched {
        return Err(CrawlError::UnknownDistro(distro.to_string()));
    }

    Ok(output)
}
