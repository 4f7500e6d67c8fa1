// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Minikube.

Minikube builds its ISO kernel with Buildroot; the kernel release and the
defconfig both live in the minikube repository. Two different minikube
releases can ship the same kernel release built from different defconfigs,
so the minikube tag rides along in `kernelversion` (`1_<tag>`).
*/

use {
    crate::{
        driverkit::DriverKitConfig,
        error::Result,
        fetch::HttpFetcher,
        git::GitSource,
        repo::Distro,
    },
    async_trait::async_trait,
    semver::Version,
};

pub struct Minikube {
    arch: String,
}

impl Minikube {
    pub fn new(arch: &str) -> Self {
        Self {
            arch: arch.to_string(),
        }
    }
}

/// aarch64 support (and arch-suffixed defconfig names) arrived in 1.26.0.
fn defconfig_names(version: &Version, arch: &str) -> (String, String) {
    if *version >= Version::new(1, 26, 0) {
        (
            format!("minikube_{}_defconfig", arch),
            format!("linux_{}_defconfig", arch),
        )
    } else {
        ("minikube_defconfig".to_string(), "linux_defconfig".to_string())
    }
}

fn crawl_blocking(arch: &str) -> Result<Vec<DriverKitConfig>> {
    let source = GitSource::clone("kubernetes", "minikube")?;
    let mut configs = vec![];

    for version in source.versions()? {
        if arch == "aarch64" && version < Version::new(1, 26, 0) {
            continue;
        }

        source.checkout_version(&version)?;

        let (minikube_defconfig, linux_defconfig) = defconfig_names(&version, arch);

        let Some(release) = source.extract_value(
            &minikube_defconfig,
            "BR2_LINUX_KERNEL_CUSTOM_VERSION_VALUE",
            '=',
        )?
        else {
            log::debug!("minikube v{}: no kernel release in defconfig", version);
            continue;
        };
        let Some(config_data) = source.base64_file(&linux_defconfig)? else {
            log::debug!("minikube v{}: no linux defconfig", version);
            continue;
        };

        configs.push(DriverKitConfig::with_config_data(
            release,
            "minikube",
            format!("1_{}", version),
            config_data,
        ));
    }

    Ok(configs)
}

#[async_trait]
impl Distro for Minikube {
    async fn crawl(&self, _fetcher: &HttpFetcher, _filter: &str) -> Result<Vec<DriverKitConfig>> {
        let arch = self.arch.clone();

        tokio::task::spawn_blocking(move || crawl_blocking(&arch)).await?
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn defconfig_names_switch_at_1_26() {
        let (minikube, linux) = defconfig_names(&Version::new(1, 25, 2), "x86_64");
        assert_eq!(minikube, "minikube_defconfig");
        assert_eq!(linux, "linux_defconfig");

        let (minikube, linux) = defconfig_names(&Version::new(1, 26, 0), "aarch64");
        assert_eq!(minikube, "minikube_aarch64_defconfig");
        assert_eq!(linux, "linux_aarch64_defconfig");
    }
}
