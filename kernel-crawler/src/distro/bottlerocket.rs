// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! BottleRocket.

BottleRocket does not ship a kernel config of its own: each of its kernel
packages starts from the Amazon Linux 2 kernel (the `Source0:` RPM of the
package spec) and patches the AL2 config with a common
`config-bottlerocket` fragment plus one fragment per flavor (aws, metal,
vmware, ...). Reproducing a buildable config therefore means downloading
the AL2 source RPM, pulling `config-<arch>` out of its payload and
replaying the fragments on top.
*/

use {
    crate::{
        download::download_to_file,
        driverkit::DriverKitConfig,
        error::{CrawlError, Result},
        fetch::HttpFetcher,
        git::GitSource,
        repo::Distro,
    },
    async_trait::async_trait,
    base64::{engine::general_purpose::STANDARD as BASE64, Engine as _},
    std::{
        io::{Cursor, Read},
        path::Path,
    },
};

const SUPPORTED_KERNELS: &[&str] = &["5.10", "5.15"];

const COMMON_PATCH: &str = "config-bottlerocket";

pub struct BottleRocket {
    arch: String,
}

impl BottleRocket {
    pub fn new(arch: &str) -> Self {
        Self {
            arch: arch.to_string(),
        }
    }
}

/// Everything the git tree knows about one (tag, kernel) pair.
struct KernelSpec {
    tag: semver::Version,
    release: String,
    source_rpm_url: String,
    common_patch: String,
    /// `(flavor, fragment)` pairs from `config-bottlerocket-<flavor>` files.
    flavor_patches: Vec<(String, String)>,
}

fn read_patches(spec_dir: &Path) -> Result<(String, Vec<(String, String)>)> {
    let common_path = spec_dir.join(COMMON_PATCH);
    let common = std::fs::read_to_string(&common_path)
        .map_err(|e| CrawlError::IoPath(common_path.display().to_string(), e))?;

    let mut flavors = vec![];
    for entry in std::fs::read_dir(spec_dir)
        .map_err(|e| CrawlError::IoPath(spec_dir.display().to_string(), e))?
    {
        let entry = entry.map_err(|e| CrawlError::IoPath(spec_dir.display().to_string(), e))?;
        let name = entry.file_name().to_string_lossy().into_owned();

        if let Some(flavor) = name.strip_prefix(&format!("{}-", COMMON_PATCH)) {
            let text = std::fs::read_to_string(entry.path())
                .map_err(|e| CrawlError::IoPath(entry.path().display().to_string(), e))?;
            flavors.push((flavor.to_string(), text));
        }
    }
    flavors.sort_by(|a, b| a.0.cmp(&b.0));

    Ok((common, flavors))
}

/// Walk the bottlerocket tree and gather the kernel specs per release tag.
fn gather_specs() -> Result<Vec<KernelSpec>> {
    let source = GitSource::clone("bottlerocket-os", "bottlerocket")?;
    let mut specs = vec![];

    for tag in source.versions()? {
        source.checkout_version(&tag)?;

        for kver in SUPPORTED_KERNELS {
            let spec_name = format!("kernel-{}.spec", kver);
            let Some(spec_path) = source.find_file(&spec_name) else {
                continue;
            };

            let Some(release) = source.extract_value(&spec_name, "Version", ':')? else {
                log::debug!("bottlerocket v{}: no Version in {}", tag, spec_name);
                continue;
            };
            let Some(source_rpm_url) = source.extract_value(&spec_name, "Source0", ':')? else {
                log::debug!("bottlerocket v{}: no Source0 in {}", tag, spec_name);
                continue;
            };

            let spec_dir = spec_path
                .parent()
                .ok_or_else(|| CrawlError::TreeFileNotFound(spec_name.clone()))?;
            let (common_patch, flavor_patches) = read_patches(spec_dir)?;

            specs.push(KernelSpec {
                tag: tag.clone(),
                release,
                source_rpm_url,
                common_patch,
                flavor_patches,
            });
        }
    }

    Ok(specs)
}

/// Apply a bottlerocket config fragment on top of a kernel config.
///
/// `KEY=n` comments the option out; any other `KEY=value` replaces the
/// existing `KEY=...` line (or a `# KEY is not set` line), else appends.
fn apply_config_patch(base: &str, patch: &str) -> String {
    let mut lines: Vec<String> = base.lines().map(|line| line.to_string()).collect();

    for patch_line in patch.lines() {
        let patch_line = patch_line.trim();
        if patch_line.is_empty() || patch_line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = patch_line.split_once('=') else {
            continue;
        };

        let set_line = format!("{}=", key);
        let unset_line = format!("# {} is not set", key);
        let replacement = if value == "n" {
            unset_line.clone()
        } else {
            patch_line.to_string()
        };

        let existing = lines
            .iter()
            .position(|line| line.starts_with(&set_line) || line.trim() == unset_line);

        match existing {
            Some(idx) => lines[idx] = replacement,
            None => lines.push(replacement),
        }
    }

    let mut merged = lines.join("\n");
    merged.push('\n');
    merged
}

/// Pull a kernel config file out of an RPM payload.
///
/// The payload is a compressed cpio archive; the compression is sniffed
/// from its magic bytes.
fn extract_config_from_rpm(path: &Path, arch: &str) -> Result<Option<String>> {
    let package = rpm::Package::open(path).map_err(|e| CrawlError::Rpm(e.to_string()))?;
    let payload = package.content;
    let magic: Vec<u8> = payload.iter().take(4).copied().collect();

    let reader: Box<dyn Read> = match magic.as_slice() {
        [0xfd, 0x37, 0x7a, 0x58] => Box::new(xz2::read::XzDecoder::new(Cursor::new(payload))),
        [0x1f, 0x8b, ..] => Box::new(flate2::read::GzDecoder::new(Cursor::new(payload))),
        [0x28, 0xb5, 0x2f, 0xfd] => Box::new(
            zstd::stream::read::Decoder::new(Cursor::new(payload))
                .map_err(|e| CrawlError::Rpm(format!("zstd payload: {}", e)))?,
        ),
        _ => Box::new(Cursor::new(payload)),
    };

    let mut archive = cpio_archive::reader(reader)?;
    while let Some(header) = archive.read_next()? {
        let name = header.name().trim_start_matches("./");
        let base = name.rsplit('/').next().unwrap_or(name);

        if base.starts_with("config") && base.ends_with(arch) {
            let mut data = vec![];
            archive.read_to_end(&mut data)?;
            return Ok(Some(String::from_utf8_lossy(&data).into_owned()));
        }
    }

    Ok(None)
}

#[async_trait]
impl Distro for BottleRocket {
    async fn crawl(&self, fetcher: &HttpFetcher, _filter: &str) -> Result<Vec<DriverKitConfig>> {
        let specs = tokio::task::spawn_blocking(gather_specs).await??;

        let download_dir = tempfile::tempdir()?;
        let mut configs = vec![];

        for spec in specs {
            let rpm_name = spec
                .source_rpm_url
                .rsplit('/')
                .next()
                .unwrap_or("kernel.src.rpm")
                .to_string();
            let rpm_path = download_dir.path().join(&rpm_name);

            // the same source RPM recurs across tags; download_to_file is
            // idempotent so it is fetched once
            if let Err(err) =
                download_to_file(fetcher.config(), &spec.source_rpm_url, &rpm_path).await
            {
                log::warn!(
                    "bottlerocket v{}: cannot download {}: {}",
                    spec.tag,
                    spec.source_rpm_url,
                    err
                );
                continue;
            }

            let arch = self.arch.clone();
            let base_config = tokio::task::spawn_blocking(move || {
                extract_config_from_rpm(&rpm_path, &arch)
            })
            .await??;

            let Some(base_config) = base_config else {
                log::warn!(
                    "bottlerocket v{}: no kernel config for {} in {}",
                    spec.tag,
                    self.arch,
                    rpm_name
                );
                continue;
            };

            let common = apply_config_patch(&base_config, &spec.common_patch);

            if spec.flavor_patches.is_empty() {
                configs.push(DriverKitConfig::with_config_data(
                    spec.release.clone(),
                    "bottlerocket",
                    format!("1_{}", spec.tag),
                    BASE64.encode(&common),
                ));
                continue;
            }

            for (flavor, patch) in &spec.flavor_patches {
                let merged = apply_config_patch(&common, patch);
                configs.push(DriverKitConfig::with_config_data(
                    spec.release.clone(),
                    "bottlerocket",
                    format!("1_{}-{}", spec.tag, flavor),
                    BASE64.encode(&merged),
                ));
            }
        }

        Ok(configs)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const BASE: &str = "CONFIG_BPF=y\nCONFIG_DEBUG_INFO=y\n# CONFIG_EXPERT is not set\n";

    #[test]
    fn patch_replaces_values() {
        let merged = apply_config_patch(BASE, "CONFIG_DEBUG_INFO=m\n");
        assert!(merged.contains("CONFIG_DEBUG_INFO=m"));
        assert!(!merged.contains("CONFIG_DEBUG_INFO=y"));
    }

    #[test]
    fn patch_comments_out_disabled_options() {
        let merged = apply_config_patch(BASE, "CONFIG_DEBUG_INFO=n\n");
        assert!(merged.contains("# CONFIG_DEBUG_INFO is not set"));
        assert!(!merged.contains("CONFIG_DEBUG_INFO=y"));
    }

    #[test]
    fn patch_enables_previously_unset_options() {
        let merged = apply_config_patch(BASE, "CONFIG_EXPERT=y\n");
        assert!(merged.contains("CONFIG_EXPERT=y"));
        assert!(!merged.contains("# CONFIG_EXPERT is not set"));
    }

    #[test]
    fn patch_appends_new_options() {
        let merged = apply_config_patch(BASE, "CONFIG_BOTTLEROCKET=y\n");
        assert!(merged.ends_with("CONFIG_BOTTLEROCKET=y\n"));
    }

    #[test]
    fn patch_ignores_comments_and_blanks() {
        let merged = apply_config_patch(BASE, "# comment\n\nCONFIG_BPF=y\n");
        assert_eq!(merged.matches("CONFIG_BPF=y").count(), 1);
    }
}
