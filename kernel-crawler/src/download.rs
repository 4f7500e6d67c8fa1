// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Artifact downloading.

Bulk artifact retrieval for downstream builders. Downloads are resumable:
partial content accumulates in a `<name>.part` file which is atomically
renamed once complete, so a completed download is never observed half
written and an interrupted one resumes on the next run.
*/

use {
    crate::{
        error::{CrawlError, Result},
        fetch::{build_client, is_transient, FetchConfig},
    },
    futures::StreamExt,
    reqwest::{header, Client, StatusCode},
    std::path::{Path, PathBuf},
    tokio::{fs, io::AsyncWriteExt},
};

fn part_path(dest: &Path) -> Result<PathBuf> {
    let name = dest
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| CrawlError::MalformedIndex(format!("bad download path: {:?}", dest)))?;

    Ok(dest.with_file_name(format!("{}.part", name)))
}

/// Download `url` to `dest`, resuming any partial previous attempt.
///
/// A no-op if `dest` already exists. Transient network failures are retried
/// up to the configured count.
pub async fn download_to_file(config: &FetchConfig, url: &str, dest: &Path) -> Result<()> {
    if fs::metadata(dest).await.is_ok() {
        log::debug!("{}: already downloaded", dest.display());
        return Ok(());
    }

    let client = build_client(config)?;
    let part = part_path(dest)?;

    let mut attempt = 0;
    loop {
        match fetch_range(&client, url, &part).await {
            Ok(()) => break,
            Err(err) if is_transient(&err) && attempt < config.retries => {
                attempt += 1;
                log::debug!(
                    "{}: transient error ({}), retry {}/{}",
                    url,
                    err,
                    attempt,
                    config.retries
                );
            }
            Err(err) => return Err(err),
        }
    }

    fs::rename(&part, dest)
        .await
        .map_err(|e| CrawlError::IoPath(dest.display().to_string(), e))?;

    Ok(())
}

/// One ranged GET against the `.part` file.
///
/// 206 appends to the existing partial content, 200 restarts it from
/// scratch, and 416 means the partial file already holds the entire body.
async fn fetch_range(client: &Client, url: &str, part: &Path) -> Result<()> {
    let offset = match fs::metadata(part).await {
        Ok(meta) => meta.len(),
        Err(_) => 0,
    };

    let res = client
        .get(url)
        .header(header::RANGE, format!("bytes={}-", offset))
        .send()
        .await?;

    let mut file = match res.status() {
        StatusCode::RANGE_NOT_SATISFIABLE => return Ok(()),
        StatusCode::PARTIAL_CONTENT => fs::OpenOptions::new()
            .append(true)
            .create(true)
            .open(part)
            .await
            .map_err(|e| CrawlError::IoPath(part.display().to_string(), e))?,
        StatusCode::OK => fs::File::create(part)
            .await
            .map_err(|e| CrawlError::IoPath(part.display().to_string(), e))?,
        status => {
            return Err(CrawlError::HttpStatus {
                url: url.to_string(),
                status,
            })
        }
    };

    let mut stream = res.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk)
            .await
            .map_err(|e| CrawlError::IoPath(part.display().to_string(), e))?;
    }

    file.flush()
        .await
        .map_err(|e| CrawlError::IoPath(part.display().to_string(), e))?;

    Ok(())
}

/// Download every URL into `dir` using a bounded worker pool.
///
/// Each URL is written to its basename under `dir`; URLs are independent and
/// a failure of one does not stop the others. The first error (if any) is
/// reported once the pool drains.
pub async fn download_all(
    config: &FetchConfig,
    urls: &[String],
    dir: &Path,
    jobs: usize,
) -> Result<()> {
    fs::create_dir_all(dir)
        .await
        .map_err(|e| CrawlError::IoPath(dir.display().to_string(), e))?;

    let results: Vec<Result<()>> = futures::stream::iter(urls.iter().map(|url| {
        let config = config.clone();
        async move {
            let name = url.rsplit('/').next().unwrap_or(url.as_str());
            download_to_file(&config, url, &dir.join(name)).await
        }
    }))
    .buffer_unordered(jobs.max(1))
    .collect()
    .await;

    let mut first_err = None;
    for result in results {
        if let Err(err) = result {
            log::warn!("download failed: {}", err);
            if first_err.is_none() {
                first_err = Some(err);
            }
        }
    }

    match first_err {
        Some(err) => Err(err),
        None => Ok(()),
    }
}
