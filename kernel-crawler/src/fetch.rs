// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Uniform HTTP fetching with transparent decompression.

Every index and artifact probe in this crate goes through [HttpFetcher]. The
fetcher models HTTP 404 as *absent* (`Ok(None)`) rather than an error, since
a missing index merely means a mirror has nothing to offer; any other
non-success status is an error. Payloads are decompressed transparently based
on the URL suffix.
*/

use {
    crate::error::{CrawlError, Result},
    async_compression::futures::bufread::{BzDecoder, GzipDecoder, XzDecoder, ZstdDecoder},
    futures::{AsyncBufRead, AsyncRead, AsyncReadExt, TryStreamExt},
    reqwest::{Client, ClientBuilder, StatusCode, Url},
    std::{net::IpAddr, pin::Pin, time::Duration},
};

/// Default HTTP user agent.
///
/// Some mirrors answer HTTP 406 to requests without a user agent; the
/// fabricated value below is accepted everywhere.
pub const USER_AGENT: &str = "dummy";

/// Default per-request connect and read timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Default retry count for transient network failures.
pub const DEFAULT_RETRIES: u32 = 3;

/// Address family restriction for outgoing connections.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum AddressFamily {
    /// Resolve and connect over both IPv4 and IPv6.
    #[default]
    DualStack,
    /// Bind the client to the IPv4 wildcard address, disabling IPv6.
    Ipv4Only,
}

/// HTTP fetch and download configuration.
#[derive(Clone, Debug)]
pub struct FetchConfig {
    pub user_agent: String,
    pub timeout: Duration,
    pub retries: u32,
    pub address_family: AddressFamily,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: USER_AGENT.to_string(),
            timeout: DEFAULT_TIMEOUT,
            retries: DEFAULT_RETRIES,
            address_family: AddressFamily::DualStack,
        }
    }
}

/// Compression format, inferred from a URL suffix.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Compression {
    None,
    Gzip,
    Xz,
    Bzip2,
    Zstd,
}

impl Compression {
    /// Infer the compression format from the final path component of a URL.
    pub fn from_url_suffix(url: &str) -> Self {
        match url {
            _ if url.ends_with(".gz") => Self::Gzip,
            _ if url.ends_with(".xz") => Self::Xz,
            _ if url.ends_with(".bz2") => Self::Bzip2,
            _ if url.ends_with(".zst") => Self::Zstd,
            _ => Self::None,
        }
    }
}

/// Wrap a reader with transparent decompression.
pub fn read_decompressed<'a>(
    stream: impl AsyncBufRead + Send + 'a,
    compression: Compression,
) -> Pin<Box<dyn AsyncRead + Send + 'a>> {
    match compression {
        Compression::None => Box::pin(stream),
        Compression::Gzip => Box::pin(GzipDecoder::new(stream)),
        Compression::Xz => Box::pin(XzDecoder::new(stream)),
        Compression::Bzip2 => Box::pin(BzDecoder::new(stream)),
        Compression::Zstd => Box::pin(ZstdDecoder::new(stream)),
    }
}

/// Whether an error is worth retrying.
pub(crate) fn is_transient(err: &CrawlError) -> bool {
    match err {
        CrawlError::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
        _ => false,
    }
}

pub(crate) fn build_client(config: &FetchConfig) -> Result<Client> {
    let mut builder = ClientBuilder::new()
        .user_agent(config.user_agent.clone())
        .connect_timeout(config.timeout)
        .timeout(config.timeout);

    if config.address_family == AddressFamily::Ipv4Only {
        builder = builder.local_address(IpAddr::from([0, 0, 0, 0]));
    }

    Ok(builder.build()?)
}

/// HTTP client bound to a [FetchConfig].
#[derive(Clone, Debug)]
pub struct HttpFetcher {
    client: Client,
    config: FetchConfig,
}

impl HttpFetcher {
    /// Construct an instance from a configuration.
    pub fn new(config: FetchConfig) -> Result<Self> {
        let client = build_client(&config)?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// GET a URL, returning its (decompressed) body.
    ///
    /// `Ok(None)` on HTTP 404. Transient network failures are retried up to
    /// the configured count; any other non-success status is an error.
    pub async fn fetch(&self, url: &str) -> Result<Option<Vec<u8>>> {
        self.fetch_with_headers(url, &[]).await
    }

    /// Like [Self::fetch], with additional request headers.
    pub async fn fetch_with_headers(
        &self,
        url: &str,
        extra_headers: &[(&str, &str)],
    ) -> Result<Option<Vec<u8>>> {
        let url = Url::parse(url)?;

        let mut attempt = 0;
        loop {
            match self.fetch_once(&url, extra_headers).await {
                Err(err) if is_transient(&err) && attempt < self.config.retries => {
                    attempt += 1;
                    log::debug!(
                        "{}: transient error ({}), retry {}/{}",
                        url,
                        err,
                        attempt,
                        self.config.retries
                    );
                }
                other => return other,
            }
        }
    }

    async fn fetch_once(&self, url: &Url, extra_headers: &[(&str, &str)]) -> Result<Option<Vec<u8>>> {
        let mut request = self.client.get(url.clone());
        for (name, value) in extra_headers {
            request = request.header(*name, *value);
        }

        let res = request.send().await?;

        if res.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        if !res.status().is_success() {
            return Err(CrawlError::HttpStatus {
                url: url.to_string(),
                status: res.status(),
            });
        }

        let compression = Compression::from_url_suffix(url.path());
        let stream = res
            .bytes_stream()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, format!("{:?}", e)))
            .into_async_read();

        let mut reader = read_decompressed(futures::io::BufReader::new(stream), compression);

        let mut data = vec![];
        reader
            .read_to_end(&mut data)
            .await
            .map_err(|e| CrawlError::IoPath(url.to_string(), e))?;

        Ok(Some(data))
    }

    /// Like [Self::fetch], but decodes the body as (lossy) UTF-8.
    pub async fn fetch_text(&self, url: &str) -> Result<Option<String>> {
        Ok(self
            .fetch(url)
            .await?
            .map(|data| String::from_utf8_lossy(&data).into_owned()))
    }

    /// Try URLs in order, returning the first non-absent body.
    ///
    /// If every URL is absent, the result is absent. If every URL errors,
    /// the last error is returned.
    pub async fn fetch_first(&self, urls: &[String]) -> Result<Option<Vec<u8>>> {
        if urls.is_empty() {
            return Err(CrawlError::EmptyUrlList);
        }

        let mut last_err = None;
        let mut any_absent = false;

        for url in urls {
            match self.fetch(url).await {
                Ok(Some(data)) => return Ok(Some(data)),
                Ok(None) => any_absent = true,
                Err(err) => {
                    log::debug!("{}: {}", url, err);
                    last_err = Some(err);
                }
            }
        }

        match last_err {
            Some(err) if !any_absent => Err(err),
            _ => Ok(None),
        }
    }

    /// Whether a URL answers a successful GET.
    ///
    /// Network errors and non-success statuses both read as "no".
    pub async fn probe(&self, url: &str) -> bool {
        match Url::parse(url) {
            Ok(url) => match self.client.get(url).send().await {
                Ok(res) => res.status().is_success(),
                Err(_) => false,
            },
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod test {
    use {
        super::*,
        std::io::Write,
        wiremock::{
            matchers::{header, method, path},
            Mock, MockServer, ResponseTemplate,
        },
    };

    fn fetcher() -> HttpFetcher {
        HttpFetcher::new(FetchConfig::default()).unwrap()
    }

    fn gzip(data: &[u8]) -> Vec<u8> {
        let mut encoder =
            flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    #[tokio::test]
    async fn absent_on_404() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let res = fetcher()
            .fetch(&format!("{}/missing", server.uri()))
            .await
            .unwrap();
        assert!(res.is_none());
    }

    #[tokio::test]
    async fn error_on_500() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let res = fetcher().fetch(&format!("{}/boom", server.uri())).await;
        assert!(matches!(
            res,
            Err(CrawlError::HttpStatus { status, .. }) if status.as_u16() == 500
        ));
    }

    #[tokio::test]
    async fn sends_user_agent() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(header("user-agent", "dummy"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"ok".to_vec()))
            .mount(&server)
            .await;

        let res = fetcher()
            .fetch(&format!("{}/agent", server.uri()))
            .await
            .unwrap();
        assert_eq!(res, Some(b"ok".to_vec()));
    }

    #[tokio::test]
    async fn decompresses_gz_suffix() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/Packages.gz"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(gzip(b"Package: linux\n")))
            .mount(&server)
            .await;

        let res = fetcher()
            .fetch(&format!("{}/Packages.gz", server.uri()))
            .await
            .unwrap();
        assert_eq!(res, Some(b"Package: linux\n".to_vec()));
    }

    #[tokio::test]
    async fn fetch_first_skips_absent() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/Packages.xz"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/Packages.gz"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(gzip(b"stanza")))
            .mount(&server)
            .await;

        let urls = vec![
            format!("{}/Packages.xz", server.uri()),
            format!("{}/Packages.gz", server.uri()),
        ];
        let res = fetcher().fetch_first(&urls).await.unwrap();
        assert_eq!(res, Some(b"stanza".to_vec()));
    }

    #[tokio::test]
    async fn fetch_first_all_absent() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let urls = vec![
            format!("{}/a", server.uri()),
            format!("{}/b", server.uri()),
        ];
        assert!(fetcher().fetch_first(&urls).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn transient_timeouts_are_retried_then_surfaced() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_delay(std::time::Duration::from_secs(5))
                    .set_body_bytes(b"slow".to_vec()),
            )
            .expect(3)
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new(FetchConfig {
            timeout: Duration::from_millis(200),
            retries: 2,
            ..FetchConfig::default()
        })
        .unwrap();

        let res = fetcher.fetch(&format!("{}/slow", server.uri())).await;
        assert!(matches!(res, Err(CrawlError::Http(_))));
    }

    #[tokio::test]
    async fn probe_distinguishes_statuses() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/present/"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/absent/"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let fetcher = fetcher();
        assert!(fetcher.probe(&format!("{}/present/", server.uri())).await);
        assert!(!fetcher.probe(&format!("{}/absent/", server.uri())).await);
    }
}
