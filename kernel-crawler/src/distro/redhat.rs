// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Red Hat Enterprise Linux.

RHEL mirrors are closed, so discovery asks a subscribed container image's
package manager instead. The emitted descriptors intentionally carry no
headers: the downstream builder re-resolves packages from the same image.
*/

use {
    crate::{
        container::Container,
        driverkit::DriverKitConfig,
        error::Result,
        repo::ContainerDistro,
    },
    async_trait::async_trait,
    once_cell::sync::Lazy,
    regex::Regex,
    std::collections::BTreeSet,
};

static KERNEL_DEVEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"kernel-devel-0:(.*)").expect("static pattern"));

pub struct RedhatContainer {
    container: Container,
}

impl RedhatContainer {
    pub fn new(image: &str) -> Self {
        Self {
            container: Container::new(image),
        }
    }

    /// Kernel releases in `repoquery` output lines.
    fn parse_releases(lines: &[String]) -> BTreeSet<String> {
        lines
            .iter()
            .filter_map(|line| KERNEL_DEVEL.captures(line))
            .map(|caps| caps[1].trim().to_string())
            .filter(|release| !release.is_empty())
            .collect()
    }
}

#[async_trait]
impl ContainerDistro for RedhatContainer {
    async fn kernel_versions(&self) -> Result<BTreeSet<String>> {
        let output = self
            .container
            .run_cmd(&["repoquery", "--show-duplicates", "kernel-devel"])
            .await?;

        Ok(Self::parse_releases(&output))
    }

    fn to_driverkit(&self, release: &str) -> DriverKitConfig {
        DriverKitConfig::bare(release, "redhat")
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn repoquery_output_parsing() {
        let lines = vec![
            "Updating Subscription Management repositories.".to_string(),
            "kernel-devel-0:4.18.0-80.el8.x86_64".to_string(),
            "kernel-devel-0:4.18.0-147.el8.x86_64".to_string(),
            "some unrelated noise".to_string(),
        ];

        let releases = RedhatContainer::parse_releases(&lines);
        assert_eq!(
            releases,
            ["4.18.0-80.el8.x86_64", "4.18.0-147.el8.x86_64"]
                .into_iter()
                .map(String::from)
                .collect()
        );
    }

    #[test]
    fn bare_descriptor_has_no_artifacts() {
        let distro = RedhatContainer::new("registry.redhat.io/ubi8/ubi:latest");
        let config = distro.to_driverkit("4.18.0-80.el8.x86_64");

        assert_eq!(config.target, "redhat");
        assert!(config.headers.is_none());
        assert!(config.kernelconfigdata.is_none());
    }
}
