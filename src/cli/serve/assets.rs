//! Static asset responses with cache headers.

use std::fs::{self, File};
use std::io::{self, BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use anyhow::{Context, Result};
use tiny_http::{Header, Method, Request, Response, StatusCode};

use super::response::make_header;
use crate::config::ServeConfig;
use crate::utils::date::DateTimeUtc;

/// Respond with a static file.
pub fn respond_asset(request: Request, path: &Path, serve: &ServeConfig) -> Result<()> {
    let metadata =
        fs::metadata(path).with_context(|| format!("Failed to stat {}", path.display()))?;
    let file_size = metadata.len();

    let etag = if serve.etag {
        Some(file_etag(path).with_context(|| format!("Failed to hash {}", path.display()))?)
    } else {
        None
    };

    let mut headers = vec![
        make_header("Content-Type", crate::utils::mime::from_path(path))?,
        make_header("Cache-Control", &format!("public, max-age={}", serve.max_age))?,
        make_header("Accept-Ranges", "bytes")?,
    ];
    if let Some(etag) = &etag {
        headers.push(make_header("ETag", etag)?);
    }
    if serve.last_modified
        && let Ok(modified) = metadata.modified()
    {
        let date = DateTimeUtc::from_system_time(modified).to_rfc2822();
        headers.push(make_header("Last-Modified", &date)?);
    }

    if let Some(etag) = &etag
        && header_value(&request, "If-None-Match").is_some_and(|value| etag_matches(&value, etag))
    {
        return respond_empty(request, 304, headers);
    }

    if request.method() == &Method::Head {
        return respond_empty(request, 200, headers);
    }

    // Range requests let the player seek in video and audio
    if file_size > 0
        && let Some(range) = header_value(&request, "Range")
    {
        return respond_range(request, path, file_size, &range, headers);
    }

    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let mut response = Response::from_file(file);
    for header in headers {
        response.add_header(header);
    }
    request.respond(response)?;
    Ok(())
}

fn respond_empty(request: Request, status: u16, headers: Vec<Header>) -> Result<()> {
    let mut response = Response::empty(StatusCode(status));
    for header in headers {
        response.add_header(header);
    }
    request.respond(response)?;
    Ok(())
}

/// Handle Range request for media files.
fn respond_range(
    request: Request,
    path: &Path,
    file_size: u64,
    range: &str,
    mut headers: Vec<Header>,
) -> Result<()> {
    let range = range.strip_prefix("bytes=").unwrap_or(range);
    let (start, end) = parse_range(range, file_size);

    if start > end {
        headers.push(make_header("Content-Range", &format!("bytes */{file_size}"))?);
        return respond_empty(request, 416, headers);
    }

    let length = end - start + 1;

    // Stream the requested range
    let mut file = File::open(path)?;
    file.seek(SeekFrom::Start(start))?;
    let reader = file.take(length);

    headers.push(make_header(
        "Content-Range",
        &format!("bytes {start}-{end}/{file_size}"),
    )?);
    let response = Response::new(
        StatusCode(206),
        headers,
        reader,
        usize::try_from(length).ok(),
        None,
    );
    request.respond(response)?;
    Ok(())
}

/// Parse Range header value "start-end" into inclusive (start, end) bytes.
///
/// `file_size` must be non-zero.
fn parse_range(range: &str, file_size: u64) -> (u64, u64) {
    let last = file_size - 1;
    let range = range.split(',').next().unwrap_or_default().trim();

    match range.split_once('-') {
        // "0-499" - specific range
        Some((s, e)) if !s.trim().is_empty() && !e.trim().is_empty() => {
            let start: u64 = s.trim().parse().unwrap_or(0);
            let end: u64 = e.trim().parse().unwrap_or(last);
            (start, end.min(last))
        }
        // "500-" - from start to end
        Some((s, _)) if !s.trim().is_empty() => (s.trim().parse().unwrap_or(0), last),
        // "-500" - last 500 bytes
        Some((_, e)) if !e.trim().is_empty() => {
            let suffix: u64 = e.trim().parse().unwrap_or(0);
            (file_size.saturating_sub(suffix), last)
        }
        _ => (0, last),
    }
}

fn header_value(request: &Request, name: &'static str) -> Option<String> {
    request
        .headers()
        .iter()
        .find(|h| h.field.equiv(name))
        .map(|h| h.value.to_string())
}

/// Strong ETag from the blake3 hash of the file contents.
fn file_etag(path: &Path) -> io::Result<String> {
    let mut reader = BufReader::with_capacity(64 * 1024, File::open(path)?);
    let mut hasher = blake3::Hasher::new();
    let mut buffer = [0u8; 64 * 1024];

    loop {
        match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => {
                hasher.update(&buffer[..n]);
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }

    Ok(format!("\"{}\"", hex::encode(&hasher.finalize().as_bytes()[..16])))
}

/// `If-None-Match` check: `*` or any listed tag (weak prefix ignored).
fn etag_matches(header: &str, etag: &str) -> bool {
    header.split(',').map(str::trim).any(|candidate| {
        candidate == "*" || candidate.strip_prefix("W/").unwrap_or(candidate) == etag
    })
}
