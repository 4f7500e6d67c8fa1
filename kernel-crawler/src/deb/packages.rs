// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! `Packages` index parsing.

A `Packages` file is a concatenation of RFC822-style stanzas separated by
blank lines. Only single-line fields matter for kernel discovery, so
indented continuation lines are dropped wholesale.
*/

use {
    crate::error::{CrawlError, Result},
    std::collections::{BTreeSet, HashMap},
};

/// One binary package stanza, reduced to the fields kernel discovery needs.
#[derive(Clone, Debug, Default)]
pub struct PackageRecord {
    pub version: String,
    pub depends: BTreeSet<String>,
    pub filename: String,
    /// Absolute artifact URL (`repo_base` + `Filename`).
    pub url: String,
}

/// Package records keyed by name.
///
/// Package names are unique within one repository snapshot.
pub type PackageDb = HashMap<String, PackageRecord>;

fn finish_stanza(
    fields: &mut HashMap<String, String>,
    repo_base: &str,
    db: &mut PackageDb,
) -> Result<()> {
    if fields.is_empty() {
        return Ok(());
    }

    let take = |fields: &mut HashMap<String, String>, key: &str| -> Result<String> {
        fields
            .remove(key)
            .ok_or_else(|| CrawlError::MalformedIndex(format!("stanza without {} field", key)))
    };

    let name = take(fields, "Package")?;
    let version = take(fields, "Version")?;
    let filename = take(fields, "Filename")?;
    let depends = fields
        .remove("Depends")
        .map(|value| value.split(", ").map(|dep| dep.to_string()).collect())
        .unwrap_or_default();

    let url = format!("{}{}", repo_base, filename);
    db.insert(
        name,
        PackageRecord {
            version,
            depends,
            filename,
            url,
        },
    );

    fields.clear();
    Ok(())
}

/// Parse a `Packages` file into per-package records.
///
/// A line without the `key: value` shape makes the whole index malformed;
/// the caller drops the repository.
pub fn scan_packages(text: &str, repo_base: &str) -> Result<PackageDb> {
    let mut db = PackageDb::new();
    let mut fields: HashMap<String, String> = HashMap::new();

    for line in text.lines() {
        let line = line.trim_end();

        if line.is_empty() {
            finish_stanza(&mut fields, repo_base, &mut db)?;
            continue;
        }

        // continuation of a multiline value
        if line.starts_with(' ') {
            continue;
        }

        let (key, value) = line
            .split_once(": ")
            .ok_or_else(|| CrawlError::MalformedIndex(format!("unparseable line: {}", line)))?;

        fields.insert(key.to_string(), value.to_string());
    }

    finish_stanza(&mut fields, repo_base, &mut db)?;

    Ok(db)
}

#[cfg(test)]
mod test {
    use {super::*, indoc::indoc};

    const PACKAGES: &str = indoc! {"
        Package: linux-headers-5.4.0-86-generic
        Architecture: amd64
        Version: 5.4.0-86.97
        Depends: linux-headers-5.4.0-86, libc6 (>= 2.14), libssl1.1 (>= 1.1.0)
        Description: Linux kernel headers for version 5.4.0 on 64 bit x86 SMP
         This package provides kernel header files for version 5.4.0, for sites
         that want the latest kernel headers.
        Filename: pool/main/l/linux/linux-headers-5.4.0-86-generic_5.4.0-86.97_amd64.deb

        Package: linux-headers-5.4.0-86
        Version: 5.4.0-86.97
        Filename: pool/main/l/linux/linux-headers-5.4.0-86_5.4.0-86.97_all.deb
    "};

    #[test]
    fn parses_stanzas_and_builds_urls() {
        let db = scan_packages(PACKAGES, "http://mirror/ubuntu/").unwrap();
        assert_eq!(db.len(), 2);

        let headers = &db["linux-headers-5.4.0-86-generic"];
        assert_eq!(headers.version, "5.4.0-86.97");
        assert_eq!(
            headers.url,
            "http://mirror/ubuntu/pool/main/l/linux/linux-headers-5.4.0-86-generic_5.4.0-86.97_amd64.deb"
        );
    }

    #[test]
    fn splits_depends_on_comma_space() {
        let db = scan_packages(PACKAGES, "http://mirror/ubuntu/").unwrap();
        let depends = &db["linux-headers-5.4.0-86-generic"].depends;

        assert!(depends.contains("linux-headers-5.4.0-86"));
        assert!(depends.contains("libc6 (>= 2.14)"));
        assert_eq!(depends.len(), 3);
    }

    #[test]
    fn continuation_lines_are_dropped() {
        let db = scan_packages(PACKAGES, "http://mirror/ubuntu/").unwrap();
        // the description continuation never becomes a field
        assert!(db["linux-headers-5.4.0-86"].depends.is_empty());
    }

    #[test]
    fn missing_terminal_blank_line_is_fine() {
        let db = scan_packages(
            "Package: a\nVersion: 1\nFilename: pool/a_1.deb",
            "http://mirror/",
        )
        .unwrap();
        assert_eq!(db["a"].url, "http://mirror/pool/a_1.deb");
    }

    #[test]
    fn unparseable_line_is_malformed() {
        let res = scan_packages("Package: a\ngarbage-line\n", "http://mirror/");
        assert!(matches!(res, Err(CrawlError::MalformedIndex(_))));
    }
}
