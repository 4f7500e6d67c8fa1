// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Error handling. */

use thiserror::Error;

/// Error type for this crate.
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("URL parse error: {0:?}")]
    UrlParse(#[from] url::ParseError),

    #[error("HTTP error: {0:?}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected HTTP status {status} for {url}")]
    HttpStatus {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("I/O error on {0}: {1:?}")]
    IoPath(String, std::io::Error),

    #[error("I/O error: {0:?}")]
    Io(#[from] std::io::Error),

    #[error("XML error: {0:?}")]
    Xml(#[from] serde_xml_rs::Error),

    #[error("package database error: {0:?}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("malformed package index: {0}")]
    MalformedIndex(String),

    #[error("incomplete package list: {0} not in package list")]
    IncompletePackageList(String),

    #[error("empty URL list")]
    EmptyUrlList,

    #[error("git error: {0:?}")]
    Git(#[from] git2::Error),

    #[error("docker error: {0:?}")]
    Docker(#[from] bollard::errors::Error),

    #[error("RPM package error: {0}")]
    Rpm(String),

    #[error("cpio archive error: {0:?}")]
    Cpio(#[from] cpio_archive::Error),

    #[error("JSON error: {0:?}")]
    Json(#[from] serde_json::Error),

    #[error("blocking task failed: {0:?}")]
    Task(#[from] tokio::task::JoinError),

    #[error("unknown distribution: {0}")]
    UnknownDistro(String),

    #[error("distribution {0} requires at least one container image")]
    MissingImage(&'static str),

    #[error("file not found in working tree: {0}")]
    TreeFileNotFound(String),
}

/// Result type for this crate.
pub type Result<T> = std::result::Result<T, CrawlError>;
