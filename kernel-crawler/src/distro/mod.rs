// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Per-distribution adapters.

One module per distribution, mirroring how the mirrors are actually laid
out. Most RPM distributions differ only in their mirror list and in how
they pick the headers artifact out of a release's URL set.
*/

pub mod aliyunlinux;
pub mod almalinux;
pub mod amazonlinux;
pub mod archlinux;
pub mod bottlerocket;
pub mod centos;
pub mod debian;
pub mod fedora;
pub mod flatcar;
pub mod minikube;
pub mod opensuse;
pub mod oracle;
pub mod photon;
pub mod redhat;
pub mod rockylinux;
pub mod talos;
pub mod ubuntu;

use {crate::driverkit::DriverKitConfig, std::collections::BTreeSet};

/// The single-headers conversion shared by the RPM distributions: the first
/// URL containing `needle` becomes the one headers artifact.
pub(crate) fn devel_config(
    release: &str,
    target: &str,
    deps: &BTreeSet<String>,
    needle: &str,
) -> Vec<DriverKitConfig> {
    deps.iter()
        .find(|dep| dep.contains(needle))
        .and_then(|dep| DriverKitConfig::with_headers(release, target, vec![dep.clone()]))
        .into_iter()
        .collect()
}
