// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! `repomd.xml` file format.

The repository manifest under `repodata/` names the index files that
constitute an RPM repository. Only the entry type and location matter here;
checksums and sizes are not consumed.
*/

use {
    crate::error::Result,
    serde::Deserialize,
};

/// A `repomd.xml` file.
#[derive(Clone, Debug, Deserialize)]
pub struct RepoMd {
    /// Describes the data files constituting this repository.
    #[serde(default)]
    pub data: Vec<RepoMdData>,
}

impl RepoMd {
    /// Construct an instance by parsing XML from a string.
    pub fn from_xml(s: &str) -> Result<Self> {
        Ok(serde_xml_rs::from_str(s)?)
    }

    /// Repository-relative path of the index with the given data type.
    ///
    /// Most repositories publish a `primary_db` SQLite index; SUSE
    /// publishes only the `primary` XML variant.
    pub fn location_href(&self, data_type: &str) -> Option<&str> {
        self.data
            .iter()
            .find(|entry| entry.data_type == data_type)
            .map(|entry| entry.location.href.as_str())
    }
}

/// A `<data>` element in a `repomd.xml` file.
#[derive(Clone, Debug, Deserialize)]
pub struct RepoMdData {
    /// The type of data.
    #[serde(rename = "type")]
    pub data_type: String,
    /// Where the file is located.
    pub location: Location,
}

/// The location of a `<data>` element.
#[derive(Clone, Debug, Deserialize)]
pub struct Location {
    pub href: String,
}
