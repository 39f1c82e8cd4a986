//! Downloaded-resource naming and persistence.
//!
//! Name selection:
//! 1. `Content-Disposition` filename (`filename*=` percent-decoded first)
//! 2. Last path segment of the address, percent-decoded
//! 3. `download`
//!
//! A name without extension gets one from magic-byte sniffing, else from the
//! response `Content-Type`; if neither is known the name stays bare. Existing
//! files are never overwritten: `name.ext`, `name-1.ext`, `name-2.ext`, ...

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use reqwest::header::{CONTENT_DISPOSITION, HeaderMap};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};
use url::Url;

use crate::source::{FetchError, FetchResponse};

/// Name used when neither the response nor the address yields one.
const FALLBACK_NAME: &str = "download";

/// Writes a fetched resource under `dir` and returns the path written.
///
/// # Errors
///
/// Returns [`FetchError::Io`] if the directory cannot be created or the file
/// cannot be written.
pub(crate) async fn save(
    response: &FetchResponse,
    address: &str,
    dir: &Path,
) -> Result<PathBuf, FetchError> {
    fs::create_dir_all(dir)
        .await
        .map_err(|e| FetchError::io(dir, e))?;

    let mut name = filename_for(&response.headers, address);
    if Path::new(&name).extension().is_none() {
        if let Some(ext) = infer_extension(&response.body, response.content_type()) {
            name = format!("{name}.{ext}");
        }
    }

    let (mut file, path) = create_unique(dir, &name)
        .await
        .map_err(|e| FetchError::io(dir.join(&name), e))?;
    file.write_all(&response.body)
        .await
        .map_err(|e| FetchError::io(&path, e))?;
    file.flush().await.map_err(|e| FetchError::io(&path, e))?;

    info!(path = %path.display(), bytes = response.body.len(), "resource saved");
    Ok(path)
}

/// Picks the base filename for a download.
#[must_use]
pub fn filename_for(headers: &HeaderMap, address: &str) -> String {
    headers
        .get(CONTENT_DISPOSITION)
        .and_then(|v| v.to_str().ok())
        .and_then(content_disposition_filename)
        .and_then(|name| sanitize_filename(&name))
        .or_else(|| filename_from_address(address))
        .unwrap_or_else(|| FALLBACK_NAME.to_string())
}

/// Extracts the filename parameter of a `Content-Disposition` value.
///
/// Handles:
/// - `attachment; filename="example.pdf"`
/// - `attachment; filename=example.pdf`
/// - `attachment; filename*=UTF-8''na%C3%AFve.pdf` (RFC 5987), preferred when present
#[must_use]
pub fn content_disposition_filename(header: &str) -> Option<String> {
    let params: Vec<(String, &str)> = header
        .split(';')
        .skip(1)
        .filter_map(|param| {
            let (key, value) = param.split_once('=')?;
            Some((key.trim().to_ascii_lowercase(), value.trim()))
        })
        .collect();

    let extended = params
        .iter()
        .find(|(key, _)| key == "filename*")
        .and_then(|(_, value)| {
            let encoded = value.split_once("''").map_or(*value, |(_, rest)| rest);
            urlencoding::decode(encoded.trim_matches('"'))
                .ok()
                .map(std::borrow::Cow::into_owned)
        })
        .filter(|name| !name.is_empty());
    if extended.is_some() {
        return extended;
    }

    params
        .iter()
        .find(|(key, _)| key == "filename")
        .map(|(_, value)| value.trim_matches('"').to_string())
        .filter(|name| !name.is_empty())
}

/// Last non-empty path segment of `address`, percent-decoded and sanitized.
#[must_use]
pub fn filename_from_address(address: &str) -> Option<String> {
    let url = Url::parse(address).ok()?;
    let last = url.path_segments()?.rfind(|s| !s.is_empty())?;
    let decoded = urlencoding::decode(last).ok()?;
    sanitize_filename(&decoded)
}

/// Reduces a candidate name to a safe single path component.
///
/// Directory parts are dropped and characters invalid on common
/// filesystems become `_`. Returns `None` for empty, `.` or `..`.
#[must_use]
pub fn sanitize_filename(name: &str) -> Option<String> {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name).trim();
    let sanitized: String = base
        .chars()
        .map(|c| match c {
            ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    match sanitized.as_str() {
        "" | "." | ".." => None,
        _ => Some(sanitized),
    }
}

/// Extension (without dot) from magic bytes, else from `content_type`.
#[must_use]
pub fn infer_extension(bytes: &[u8], content_type: Option<&str>) -> Option<&'static str> {
    infer::get(bytes)
        .map(|kind| kind.extension())
        .or_else(|| content_type.and_then(extension_from_content_type))
}

fn extension_from_content_type(content_type: &str) -> Option<&'static str> {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    Some(match mime.as_str() {
        "text/html" => "html",
        "text/plain" => "txt",
        "text/csv" => "csv",
        "application/json" => "json",
        "application/xml" | "text/xml" => "xml",
        "application/pdf" => "pdf",
        "image/jpeg" => "jpg",
        "image/png" => "png",
        "image/gif" => "gif",
        "image/webp" => "webp",
        "image/svg+xml" => "svg",
        "application/zip" => "zip",
        "application/gzip" => "gz",
        "text/css" => "css",
        "text/javascript" | "application/javascript" => "js",
        "video/mp4" => "mp4",
        "audio/mpeg" => "mp3",
        _ => return None,
    })
}

/// Creates a file that did not exist before, suffixing the stem on collision.
async fn create_unique(dir: &Path, name: &str) -> std::io::Result<(File, PathBuf)> {
    let as_path = Path::new(name);
    let stem = as_path
        .file_stem()
        .map_or_else(|| name.to_string(), |s| s.to_string_lossy().into_owned());
    let ext = as_path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    for attempt in 0usize.. {
        let candidate = if attempt == 0 {
            dir.join(name)
        } else {
            dir.join(format!("{stem}-{attempt}{ext}"))
        };
        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&candidate)
            .await
        {
            Ok(file) => return Ok((file, candidate)),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                debug!(path = %candidate.display(), "name taken, trying next suffix");
            }
            Err(e) => return Err(e),
        }
    }
    Err(std::io::Error::new(
        ErrorKind::AlreadyExists,
        "no free file name left",
    ))
}
