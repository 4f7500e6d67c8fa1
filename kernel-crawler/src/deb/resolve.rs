// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Kernel package selection and dependency closure.

Resolution is restricted to kernel-looking packages throughout. That keeps
the closure small and, more importantly, sidesteps the cycles in the general
dependency graph (libc6 and libgcc1 depend on each other).
*/

use {
    crate::{
        deb::packages::PackageDb,
        error::{CrawlError, Result},
        repo::PackageTree,
    },
    once_cell::sync::Lazy,
    regex::Regex,
    std::collections::{BTreeSet, HashMap},
};

static KERNEL_PACKAGE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^linux-.*?-[0-9]\.[0-9]+\.[0-9]+").expect("static pattern"));

static RELEASE_UPDATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([0-9]+\.[0-9]+\.[0-9]+-[0-9]+)\.(.+)$").expect("static pattern"));

/// Whether a package (or dependency) name belongs to the kernel set.
pub fn is_kernel_package(name: &str) -> bool {
    (KERNEL_PACKAGE.is_match(name)
        && !name.ends_with("-dbg")
        && !name.contains("modules-extra")
        && !name.contains("linux-source")
        && !name.contains("tools"))
        || name.contains("linux-kbuild")
}

/// Candidate kernel package names within one snapshot.
///
/// Every `linux-headers-*` package is paired with its companion package:
/// `linux-modules-<suffix>`, else `linux-image-<suffix>`, else
/// `linux-image-<suffix>-unsigned`. A headers package without a companion
/// is skipped. A non-empty `filter` narrows the candidates: exact package
/// name first, then the modules/headers pair, then the image/headers pair,
/// then any candidate containing the filter as a substring.
pub fn candidate_packages(db: &PackageDb, filter: &str) -> Vec<String> {
    let mut candidates = vec![];

    let mut names: Vec<&String> = db.keys().collect();
    names.sort();

    for name in names {
        let Some(release) = name.strip_prefix("linux-headers-") else {
            continue;
        };

        let companion = [
            format!("linux-modules-{}", release),
            format!("linux-image-{}", release),
            format!("linux-image-{}-unsigned", release),
        ]
        .into_iter()
        .find(|candidate| db.contains_key(candidate));

        if let Some(companion) = companion {
            candidates.push(name.clone());
            candidates.push(companion);
        }
    }

    if filter.is_empty() {
        return candidates;
    }

    if db.contains_key(filter) {
        return vec![filter.to_string()];
    }

    let candidates: BTreeSet<String> = candidates.into_iter().collect();
    let modules = format!("linux-modules-{}", filter);
    let headers = format!("linux-headers-{}", filter);
    let image = format!("linux-image-{}", filter);

    if candidates.contains(&modules) && candidates.contains(&headers) {
        return vec![modules, headers];
    }
    if candidates.contains(&image) && candidates.contains(&headers) {
        return vec![image, headers];
    }

    candidates
        .into_iter()
        .filter(|name| name.contains(filter))
        .collect()
}

/// Transitive kernel-package dependencies of `pkg_name`, itself included.
///
/// Alternative dependencies (`a | b`) take the first branch. The walk is an
/// iterative worklist with an explicit visited set; closure results are
/// memoized across calls through `memo`. A referenced dependency missing
/// from `db` is an [CrawlError::IncompletePackageList].
pub fn transitive_dependencies(
    db: &PackageDb,
    pkg_name: &str,
    memo: &mut HashMap<String, BTreeSet<String>>,
) -> Result<BTreeSet<String>> {
    if let Some(hit) = memo.get(pkg_name) {
        return Ok(hit.clone());
    }

    let mut closure = BTreeSet::new();
    let mut work = vec![pkg_name.to_string()];

    while let Some(name) = work.pop() {
        if closure.contains(&name) {
            continue;
        }

        if let Some(hit) = memo.get(&name) {
            closure.extend(hit.iter().cloned());
            continue;
        }

        let record = db
            .get(&name)
            .ok_or_else(|| CrawlError::IncompletePackageList(name.clone()))?;
        closure.insert(name);

        for dep in record.depends.iter().filter(|dep| is_kernel_package(dep)) {
            // first whitespace token: strips version constraints and takes
            // the first branch of alternatives
            let Some(dep) = dep.split_whitespace().next() else {
                continue;
            };

            if !closure.contains(dep) {
                work.push(dep.to_string());
            }
        }
    }

    memo.insert(pkg_name.to_string(), closure.clone());

    Ok(closure)
}

/// Artifact URLs of the kernel dependency closure of `pkg`.
fn package_dependency_urls(
    db: &PackageDb,
    pkg: &str,
    memo: &mut HashMap<String, BTreeSet<String>>,
) -> Result<BTreeSet<String>> {
    if !is_kernel_package(pkg) {
        return Ok(BTreeSet::new());
    }

    let mut urls = BTreeSet::new();
    for dep in transitive_dependencies(db, pkg, memo)?
        .iter()
        .filter(|dep| is_kernel_package(dep))
    {
        let record = db
            .get(dep)
            .ok_or_else(|| CrawlError::IncompletePackageList(dep.clone()))?;
        urls.insert(record.url.clone());
    }

    Ok(urls)
}

/// Re-emit a `X.Y.Z-N.suffix` Debian version as `X.Y.Z-N/suffix`.
///
/// The slash separates the kernel release from the update number for
/// downstream consumers; it is the only place a `/` can appear in a release
/// key.
pub fn normalize_release(version: &str) -> String {
    match RELEASE_UPDATE.captures(version) {
        Some(caps) => format!("{}/{}", &caps[1], &caps[2]),
        None => version.to_string(),
    }
}

/// Resolve candidate packages into a release-keyed URL tree.
///
/// Releases whose closure references packages outside `db` are dropped
/// (logged at debug level); releases whose URL set carries no
/// `linux-headers` artifact are dropped as useless for building.
pub fn build_package_tree(db: &PackageDb, candidates: &[String]) -> PackageTree {
    let mut memo = HashMap::new();
    let mut tree = PackageTree::new();

    for pkg in candidates {
        let Some(record) = db.get(pkg) else {
            log::debug!("{}: not in package table, skipped", pkg);
            continue;
        };
        let release = normalize_release(&record.version);

        match package_dependency_urls(db, pkg, &mut memo) {
            Ok(urls) => {
                tree.entry(release).or_default().extend(urls);
            }
            Err(err) => {
                log::debug!("dropping release {}: {}", release, err);
            }
        }
    }

    tree.retain(|_, urls| urls.iter().any(|url| url.contains("linux-headers")));

    tree
}

#[cfg(test)]
mod test {
    use {super::*, crate::deb::packages::scan_packages, indoc::indoc};

    #[test]
    fn kernel_package_predicate() {
        assert!(is_kernel_package("linux-headers-5.4.0-86-generic"));
        assert!(is_kernel_package("linux-image-5.10.0-8-amd64"));
        assert!(is_kernel_package("linux-kbuild-5.16"));

        assert!(!is_kernel_package("linux-headers-5.4.0-86-generic-dbg"));
        assert!(!is_kernel_package("linux-modules-extra-5.4.0-86-generic"));
        assert!(!is_kernel_package("linux-source-5.4.0"));
        assert!(!is_kernel_package("linux-tools-5.4.0-86"));
        assert!(!is_kernel_package("libc6"));
    }

    #[test]
    fn release_normalization() {
        assert_eq!(normalize_release("5.4.0-86.97"), "5.4.0-86/97");
        assert_eq!(normalize_release("5.10.0-8.2~bpo10+1"), "5.10.0-8/2~bpo10+1");
        // no update component: unchanged, and never contains a slash
        assert_eq!(normalize_release("5.15.0"), "5.15.0");
        assert_eq!(normalize_release("4.19.249"), "4.19.249");
    }

    fn fixture_db() -> PackageDb {
        let text = indoc! {"
            Package: linux-headers-5.4.0-86-generic
            Version: 5.4.0-86.97
            Depends: linux-headers-5.4.0-86, linux-kbuild-5.4 | linux-kbuild-5.5, libc6 (>= 2.14)
            Filename: pool/main/l/linux/linux-headers-5.4.0-86-generic_5.4.0-86.97_amd64.deb

            Package: linux-headers-5.4.0-86
            Version: 5.4.0-86.97
            Filename: pool/main/l/linux/linux-headers-5.4.0-86_5.4.0-86.97_all.deb

            Package: linux-kbuild-5.4
            Version: 5.4.0-86.97
            Filename: pool/main/l/linux/linux-kbuild-5.4_5.4.0-86.97_amd64.deb

            Package: linux-modules-5.4.0-86-generic
            Version: 5.4.0-86.97
            Depends: linux-headers-5.4.0-86-generic
            Filename: pool/main/l/linux/linux-modules-5.4.0-86-generic_5.4.0-86.97_amd64.deb
        "};

        scan_packages(text, "http://mirror/ubuntu/").unwrap()
    }

    #[test]
    fn candidates_pair_headers_with_companion() {
        let db = fixture_db();
        let candidates = candidate_packages(&db, "");

        assert!(candidates.contains(&"linux-headers-5.4.0-86-generic".to_string()));
        assert!(candidates.contains(&"linux-modules-5.4.0-86-generic".to_string()));
        // the flavorless headers package has no companion
        assert!(!candidates.contains(&"linux-headers-5.4.0-86".to_string()));
    }

    #[test]
    fn filter_prefers_exact_pairs() {
        let db = fixture_db();
        let candidates = candidate_packages(&db, "5.4.0-86-generic");
        assert_eq!(
            candidates,
            vec![
                "linux-modules-5.4.0-86-generic".to_string(),
                "linux-headers-5.4.0-86-generic".to_string(),
            ]
        );
    }

    #[test]
    fn filter_falls_back_to_substring() {
        let db = fixture_db();
        let candidates = candidate_packages(&db, "5.4.0");
        assert_eq!(candidates.len(), 2);
        assert!(candidates.iter().all(|name| name.contains("5.4.0")));
    }

    #[test]
    fn closure_takes_first_alternative_and_skips_non_kernel() {
        let db = fixture_db();
        let mut memo = HashMap::new();

        let closure =
            transitive_dependencies(&db, "linux-headers-5.4.0-86-generic", &mut memo).unwrap();

        assert!(closure.contains("linux-headers-5.4.0-86"));
        assert!(closure.contains("linux-kbuild-5.4"));
        assert!(!closure.iter().any(|name| name.starts_with("libc6")));
    }

    #[test]
    fn tree_carries_full_closure() {
        let db = fixture_db();
        let candidates = candidate_packages(&db, "");
        let tree = build_package_tree(&db, &candidates);

        assert_eq!(tree.len(), 1);
        let urls = &tree["5.4.0-86/97"];
        assert_eq!(urls.len(), 4);
        assert!(urls.iter().any(|url| url.contains("linux-kbuild-5.4")));
    }

    #[test]
    fn missing_dependency_drops_release_only() {
        let text = indoc! {"
            Package: linux-headers-5.8.0-1-generic
            Version: 5.8.0-1.2
            Depends: linux-headers-5.8.0-1
            Filename: pool/main/l/linux/linux-headers-5.8.0-1-generic_5.8.0-1.2_amd64.deb

            Package: linux-modules-5.8.0-1-generic
            Version: 5.8.0-1.2
            Filename: pool/main/l/linux/linux-modules-5.8.0-1-generic_5.8.0-1.2_amd64.deb

            Package: linux-headers-5.9.0-1-generic
            Version: 5.9.0-1.3
            Filename: pool/main/l/linux/linux-headers-5.9.0-1-generic_5.9.0-1.3_amd64.deb

            Package: linux-modules-5.9.0-1-generic
            Version: 5.9.0-1.3
            Filename: pool/main/l/linux/linux-modules-5.9.0-1-generic_5.9.0-1.3_amd64.deb
        "};
        let db = scan_packages(text, "http://mirror/debian/").unwrap();

        let candidates = candidate_packages(&db, "");
        let tree = build_package_tree(&db, &candidates);

        // 5.8 references linux-headers-5.8.0-1 which is not in the table
        assert!(!tree.contains_key("5.8.0-1/2"));
        assert!(tree.contains_key("5.9.0-1/3"));
    }

    #[test]
    fn headerless_releases_are_pruned() {
        let text = indoc! {"
            Package: linux-headers-5.9.0-1-generic
            Version: 5.9.0-1.3
            Filename: pool/main/l/linux/linux-headers-5.9.0-1-generic_5.9.0-1.3_amd64.deb

            Package: linux-modules-5.9.0-1-generic
            Version: 5.9.0-1.3
            Filename: pool/main/l/linux/linux-modules-5.9.0-1-generic_5.9.0-1.3_amd64.deb

            Package: linux-image-6.0.0-2-cloud
            Version: 6.0.0-2.1
            Filename: pool/main/l/linux/linux-image-6.0.0-2-cloud_6.0.0-2.1_amd64.deb
        "};
        let db = scan_packages(text, "http://mirror/debian/").unwrap();

        let tree = build_package_tree(
            &db,
            &["linux-image-6.0.0-2-cloud".to_string()],
        );
        assert!(tree.is_empty());
    }
}
