// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Build descriptors for the downstream driver builder. */

use serde::Serialize;

/// Default `kernelversion` for kernels identified by release alone.
pub const DEFAULT_KERNEL_VERSION: &str = "1";

/// A normalized kernel build descriptor.
///
/// Exactly one of `headers` and `kernelconfigdata` is populated for mirror-
/// and source-tree-discovered kernels. Container-probed kernels carry
/// neither: the builder re-resolves headers from the live image.
#[derive(Clone, Debug, Serialize)]
pub struct DriverKitConfig {
    pub kernelversion: String,
    pub kernelrelease: String,
    pub target: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headers: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kernelconfigdata: Option<String>,
}

impl DriverKitConfig {
    /// Descriptor pointing at downloadable header artifacts.
    ///
    /// `None` when `headers` is empty: a config without any headers must not
    /// be emitted.
    pub fn with_headers(
        release: impl Into<String>,
        target: impl Into<String>,
        headers: Vec<String>,
    ) -> Option<Self> {
        if headers.is_empty() {
            return None;
        }

        Some(Self {
            kernelversion: DEFAULT_KERNEL_VERSION.to_string(),
            kernelrelease: release.into(),
            target: target.into(),
            headers: Some(headers),
            kernelconfigdata: None,
        })
    }

    /// Like [Self::with_headers] with an explicit `kernelversion`.
    pub fn with_headers_and_version(
        release: impl Into<String>,
        target: impl Into<String>,
        version: impl Into<String>,
        headers: Vec<String>,
    ) -> Option<Self> {
        let mut config = Self::with_headers(release, target, headers)?;
        config.kernelversion = version.into();

        Some(config)
    }

    /// Descriptor carrying an inline base64 kernel configuration.
    pub fn with_config_data(
        release: impl Into<String>,
        target: impl Into<String>,
        version: impl Into<String>,
        config_data: impl Into<String>,
    ) -> Self {
        Self {
            kernelversion: version.into(),
            kernelrelease: release.into(),
            target: target.into(),
            headers: None,
            kernelconfigdata: Some(config_data.into()),
        }
    }

    /// Descriptor naming a kernel without artifacts.
    ///
    /// Used for container-probed distributions, where the builder resolves
    /// packages from the image itself.
    pub fn bare(release: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            kernelversion: DEFAULT_KERNEL_VERSION.to_string(),
            kernelrelease: release.into(),
            target: target.into(),
            headers: None,
            kernelconfigdata: None,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn empty_headers_are_rejected() {
        assert!(DriverKitConfig::with_headers("5.4.0-86/97", "ubuntu-generic", vec![]).is_none());
    }

    #[test]
    fn optional_fields_are_omitted() {
        let config = DriverKitConfig::bare("4.18.0-80.el8.x86_64", "redhat");
        let json = serde_json::to_value(&config).unwrap();

        assert_eq!(json["kernelversion"], "1");
        assert!(json.get("headers").is_none());
        assert!(json.get("kernelconfigdata").is_none());
    }

    #[test]
    fn headers_serialize_in_order() {
        let config = DriverKitConfig::with_headers(
            "3.10.0-1127.el7.x86_64",
            "centos",
            vec!["http://mirror/kernel-devel.rpm".to_string()],
        )
        .unwrap();
        let json = serde_json::to_string(&config).unwrap();

        assert!(json.contains("\"kernelrelease\":\"3.10.0-1127.el7.x86_64\""));
        assert!(json.contains("kernel-devel.rpm"));
    }
}
