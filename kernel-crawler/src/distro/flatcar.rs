// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Flatcar Container Linux.

Flatcar publishes one directory per release under each channel, with the
kernel configuration available as a plain text blob inside it. No packages
are involved: each release yields an inline config descriptor.
*/

use {
    crate::{
        deb::deb_arch,
        driverkit::DriverKitConfig,
        error::Result,
        fetch::HttpFetcher,
        listing::anchor_links,
        repo::Distro,
    },
    async_trait::async_trait,
    base64::{engine::general_purpose::STANDARD as BASE64, Engine as _},
    indexmap::IndexMap,
};

const CHANNELS: &[&str] = &["stable", "beta", "alpha"];

const KERNEL_CONFIG_BLOB: &str = "flatcar_production_image_kernel_config.txt";

pub struct Flatcar {
    channel_urls: Vec<String>,
}

impl Flatcar {
    pub fn new(arch: &str) -> Self {
        let arch = deb_arch(arch);

        Self {
            channel_urls: CHANNELS
                .iter()
                .map(|channel| format!("https://{}.release.flatcar-linux.net/{}-usr/", channel, arch))
                .collect(),
        }
    }

    fn release_dirs(body: &str) -> Vec<String> {
        anchor_links(body)
            .into_iter()
            .filter(|dist| {
                dist.ends_with('/')
                    && dist.starts_with("./")
                    && !dist.contains("current")
                    && !dist.contains('-')
            })
            .map(|dist| dist.trim_start_matches("./").trim_end_matches('/').to_string())
            .collect()
    }
}

#[async_trait]
impl Distro for Flatcar {
    async fn crawl(&self, fetcher: &HttpFetcher, filter: &str) -> Result<Vec<DriverKitConfig>> {
        // keyed by release so a version on several channels emits once
        let mut configs: IndexMap<String, DriverKitConfig> = IndexMap::new();

        for channel_url in &self.channel_urls {
            let Some(body) = fetcher.fetch_text(channel_url).await? else {
                log::debug!("{}: no release listing", channel_url);
                continue;
            };

            for release in Self::release_dirs(&body) {
                if !release.contains(filter) {
                    continue;
                }

                let blob_url = format!("{}{}/{}", channel_url, release, KERNEL_CONFIG_BLOB);
                let Some(config) = fetcher.fetch(&blob_url).await? else {
                    log::debug!("{}: no kernel config blob", blob_url);
                    continue;
                };

                configs.insert(
                    release.clone(),
                    DriverKitConfig::with_config_data(
                        release.clone(),
                        "flatcar",
                        format!("1_{}", release),
                        BASE64.encode(config),
                    ),
                );
            }
        }

        Ok(configs.into_values().collect())
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
    fn release_dirs_skip_current_and_dev_builds() {
        let body = r#"
            <a href="../">up</a>
            <a href="./3510.2.1/">3510.2.1</a>
            <a href="./3602.0.0/">3602.0.0</a>
            <a href="./current/">current</a>
            <a href="./3510.2.1-rc1/">rc</a>
            <a href="other/">other</a>
        "#;

        assert_eq!(Flatcar::release_dirs(body), vec!["3510.2.1", "3602.0.0"]);
    }

    #[tokio::test]
    async fn crawl_emits_config_blobs() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/amd64-usr/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(r#"<a href="./3510.2.1/">3510.2.1</a>"#),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/amd64-usr/3510.2.1/flatcar_production_image_kernel_config.txt"))
            .respond_with(ResponseTemplate::new(200).set_body_string("CONFIG_BPF=y\n"))
            .mount(&server)
            .await;

        let flatcar = Flatcar {
            channel_urls: vec![format!("{}/amd64-usr/", server.uri())],
        };

        let fetcher = HttpFetcher::new(FetchConfig::default()).unwrap();
        let configs = flatcar.crawl(&fetcher, "").await.unwrap();

        assert_eq!(configs.len(), 1);
        assert_eq!(configs[0].kernelrelease, "3510.2.1");
        assert_eq!(configs[0].kernelversion, "1_3510.2.1");
        assert_eq!(configs[0].target, "flatcar");
        assert_eq!(
            configs[0].kernelconfigdata.as_deref().unwrap(),
            BASE64.encode("CONFIG_BPF=y\n")
        );
        assert!(configs[0].headers.is_none());
    }
}
