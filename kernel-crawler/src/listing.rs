// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! HTML directory-listing parsing.

Mirror front pages are plain HTML indexes. The parsing here is deliberately
lenient: anything with an `href` counts, and callers filter the links down to
what looks like a sub-directory.
*/

use {
    once_cell::sync::Lazy,
    scraper::{Html, Selector},
};

static ANCHOR: Lazy<Selector> = Lazy::new(|| Selector::parse("a[href]").expect("static selector"));

/// Every `href` attribute of every anchor in the document, in order.
pub fn anchor_links(body: &str) -> Vec<String> {
    let doc = Html::parse_document(body);

    doc.select(&ANCHOR)
        .filter_map(|el| el.value().attr("href"))
        .map(|href| href.to_string())
        .collect()
}

/// Links that look like sub-directory entries of a listing.
///
/// Keeps hrefs with a trailing slash that are relative: not the parent link,
/// not absolute paths or URLs, not sort-order query links.
pub fn directory_links(body: &str) -> Vec<String> {
    anchor_links(body)
        .into_iter()
        .filter(|href| {
            href.ends_with('/')
                && href.as_str() != "../"
                && !href.starts_with('/')
                && !href.starts_with('?')
                && !href.starts_with("http")
        })
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;

    const LISTING: &str = r#"
        <html><body><pre>
        <a href="../">Parent Directory</a>
        <a href="?C=N;O=D">Name</a>
        <a href="7.9.2009/">7.9.2009/</a>
        <a href="8-stream/">8-stream/</a>
        <a href="/absolute/">absolute</a>
        <a href="http://mirror.example.com/">offsite</a>
        <a href="readme.txt">readme.txt</a>
        </pre></body></html>
    "#;

    #[test]
    fn keeps_relative_directories_only() {
        assert_eq!(directory_links(LISTING), vec!["7.9.2009/", "8-stream/"]);
    }

    #[test]
    fn anchor_links_keeps_everything() {
        let links = anchor_links(LISTING);
        assert!(links.contains(&"../".to_string()));
        assert!(links.contains(&"readme.txt".to_string()));
        assert_eq!(links.len(), 7);
    }

    #[test]
    fn tolerates_malformed_markup() {
        let links = directory_links("<a href='x/'>x<p><a href=\"y/\">");
        assert_eq!(links, vec!["x/", "y/"]);
    }
}
