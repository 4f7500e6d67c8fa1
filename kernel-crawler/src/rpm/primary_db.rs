// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! `primary_db` SQLite index queries.

The `primary_db` index packs the package table plus `provides`/`requires`
capability tables into one SQLite database. Kernel selection and the
transitive dependency walk happen in a single recursive query so only the
matching rows ever leave the database.
*/

use {
    crate::error::Result,
    rusqlite::Connection,
    std::path::Path,
};

/// Default kernel package selection predicate.
pub const DEFAULT_KERNEL_QUERY: &str =
    "name IN ('kernel', 'kernel-devel', 'kernel-ml', 'kernel-ml-devel')";

fn closure_query(kernel_query: &str, filtered: bool) -> String {
    let mut base = format!(
        "SELECT version || '-' || release || '.' || arch, pkgkey FROM packages WHERE {}",
        kernel_query
    );

    if filtered {
        // match either 5.6.6 (version) or 5.6.6-300.fc32 (version-release)
        base.push_str(r#" AND (version = ?1 OR version || '-' || "release" = ?1)"#);
    }

    format!(
        r#"WITH RECURSIVE transitive_deps(version, pkgkey) AS (
    {}
    UNION
    SELECT transitive_deps.version, provides.pkgkey
        FROM provides
        INNER JOIN requires USING (name, flags, epoch, version, "release")
        INNER JOIN transitive_deps ON requires.pkgkey = transitive_deps.pkgkey
) SELECT transitive_deps.version, location_href
    FROM packages INNER JOIN transitive_deps USING (pkgkey)"#,
        base
    )
}

/// `(release, location_href)` rows for the kernel package closure.
///
/// `kernel_query` is the SQL predicate selecting the distribution's kernel
/// package set; `filter` optionally narrows to one version or
/// version-release. Rows are streamed off the cursor rather than
/// materialized by SQLite.
pub fn kernel_closure(
    db_path: &Path,
    kernel_query: &str,
    filter: &str,
) -> Result<Vec<(String, String)>> {
    let conn = Connection::open(db_path)?;
    let query = closure_query(kernel_query, !filter.is_empty());

    let mut stmt = conn.prepare(&query)?;

    let mut out = vec![];
    if filter.is_empty() {
        let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
        for row in rows {
            out.push(row?);
        }
    } else {
        let rows = stmt.query_map([filter], |row| Ok((row.get(0)?, row.get(1)?)))?;
        for row in rows {
            out.push(row?);
        }
    }

    Ok(out)
}

#[cfg(test)]
mod test {
    use super::*;

    /// Minimal primary_db layout: one kernel-devel package whose
    /// capabilities pull in a second package.
    fn fixture_db(path: &Path) {
        let conn = Connection::open(path).unwrap();
        conn.execute_batch(
            r#"
            CREATE TABLE packages (
                pkgkey INTEGER PRIMARY KEY,
                name TEXT,
                version TEXT,
                release TEXT,
                epoch TEXT,
                arch TEXT,
                location_href TEXT
            );
            CREATE TABLE provides (
                name TEXT, flags TEXT, epoch TEXT, version TEXT, release TEXT, pkgkey INTEGER
            );
            CREATE TABLE requires (
                name TEXT, flags TEXT, epoch TEXT, version TEXT, release TEXT, pkgkey INTEGER
            );

            INSERT INTO packages VALUES
                (1, 'kernel-devel', '3.10.0', '1127.el7', '0', 'x86_64',
                 'Packages/kernel-devel-3.10.0-1127.el7.x86_64.rpm'),
                (2, 'kernel-headers-extra', '3.10.0', '1127.el7', '0', 'x86_64',
                 'Packages/kernel-headers-extra-3.10.0-1127.el7.x86_64.rpm'),
                (3, 'bash', '4.2.46', '34.el7', '0', 'x86_64',
                 'Packages/bash-4.2.46-34.el7.x86_64.rpm'),
                (4, 'kernel-devel', '3.10.0', '1160.el7', '0', 'x86_64',
                 'Packages/kernel-devel-3.10.0-1160.el7.x86_64.rpm');

            INSERT INTO requires VALUES
                ('kernel-extra', 'EQ', '0', '3.10.0', '1127.el7', 1);
            INSERT INTO provides VALUES
                ('kernel-extra', 'EQ', '0', '3.10.0', '1127.el7', 2);
            "#,
        )
        .unwrap();
    }

    #[test]
    fn closure_includes_transitive_dependency() {
        let tf = tempfile::NamedTempFile::new().unwrap();
        fixture_db(tf.path());

        let rows = kernel_closure(tf.path(), DEFAULT_KERNEL_QUERY, "").unwrap();

        let release = "3.10.0-1127.el7.x86_64";
        let hrefs: Vec<&str> = rows
            .iter()
            .filter(|(r, _)| r == release)
            .map(|(_, href)| href.as_str())
            .collect();

        assert!(hrefs.contains(&"Packages/kernel-devel-3.10.0-1127.el7.x86_64.rpm"));
        assert!(hrefs.contains(&"Packages/kernel-headers-extra-3.10.0-1127.el7.x86_64.rpm"));
        assert!(!rows.iter().any(|(_, href)| href.contains("bash")));
    }

    #[test]
    fn version_filter_narrows_releases() {
        let tf = tempfile::NamedTempFile::new().unwrap();
        fixture_db(tf.path());

        let rows = kernel_closure(tf.path(), DEFAULT_KERNEL_QUERY, "3.10.0-1160.el7").unwrap();
        assert!(rows.iter().all(|(r, _)| r == "3.10.0-1160.el7.x86_64"));
        assert_eq!(rows.len(), 1);

        let rows = kernel_closure(tf.path(), DEFAULT_KERNEL_QUERY, "3.10.0").unwrap();
        assert_eq!(rows.len(), 3);
    }

    #[test]
    fn arch_restriction_in_kernel_query() {
        let tf = tempfile::NamedTempFile::new().unwrap();
        let conn = Connection::open(tf.path()).unwrap();
        conn.execute_batch(
            r#"
            CREATE TABLE packages (
                pkgkey INTEGER PRIMARY KEY, name TEXT, version TEXT, release TEXT,
                epoch TEXT, arch TEXT, location_href TEXT
            );
            CREATE TABLE provides (
                name TEXT, flags TEXT, epoch TEXT, version TEXT, release TEXT, pkgkey INTEGER
            );
            CREATE TABLE requires (
                name TEXT, flags TEXT, epoch TEXT, version TEXT, release TEXT, pkgkey INTEGER
            );
            INSERT INTO packages VALUES
                (1, 'kernel-uek-devel', '5.4.17', '2102.el8uek', '0', 'x86_64',
                 'kernel-uek-devel-5.4.17-2102.el8uek.x86_64.rpm'),
                (2, 'kernel-uek-devel', '5.4.17', '2102.el8uek', '0', 'aarch64',
                 'kernel-uek-devel-5.4.17-2102.el8uek.aarch64.rpm');
            "#,
        )
        .unwrap();
        drop(conn);

        let query = "(name IN ('kernel', 'kernel-devel', 'kernel-uek', 'kernel-uek-devel') \
                     AND arch = 'x86_64')";
        let rows = kernel_closure(tf.path(), query, "").unwrap();

        assert_eq!(rows.len(), 1);
        assert!(rows[0].0.ends_with(".x86_64"));
    }
}
