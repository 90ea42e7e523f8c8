#![forbid(unsafe_code)]

//! Minimal HTTP/1.1 plumbing for the read-only API: one request per
//! connection, headers only, JSON out.

use sha2::Digest as _;
use std::fmt::Write as _;
use std::io::{Read, Write};

const MAX_HEADER_BYTES: usize = 8192;

#[derive(Debug)]
pub(crate) struct HttpRequest {
    pub(crate) method: String,
    pub(crate) target: String,
    pub(crate) if_none_match: Option<String>,
}

pub(crate) fn read_request(stream: &mut impl Read) -> std::io::Result<Option<HttpRequest>> {
    let mut buf = [0u8; 4096];
    let mut data = Vec::<u8>::new();
    loop {
        let read = match stream.read(&mut buf) {
            Ok(read) => read,
            Err(err)
                if matches!(
                    err.kind(),
                    std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
                ) =>
            {
                break;
            }
            Err(err) => return Err(err),
        };
        if read == 0 {
            break;
        }
        data.extend_from_slice(&buf[..read]);
        if data.windows(4).any(|w| w == b"\r\n\r\n") || data.len() > MAX_HEADER_BYTES {
            break;
        }
    }
    if data.is_empty() {
        return Ok(None);
    }

    let header_end = data
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .unwrap_or(data.len());
    let header_text = String::from_utf8_lossy(&data[..header_end]);
    let mut lines = header_text.split("\r\n");
    let Some(request_line) = lines.next() else {
        return Ok(None);
    };
    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or("").to_string();
    let target = parts.next().unwrap_or("/").to_string();

    let mut if_none_match = None;
    for line in lines {
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        if name.trim().eq_ignore_ascii_case("if-none-match") {
            if_none_match = Some(value.trim().to_string());
        }
    }

    Ok(Some(HttpRequest {
        method,
        target,
        if_none_match,
    }))
}

pub(crate) fn normalize_path(raw: &str) -> String {
    let raw = raw.trim();
    let raw = raw.split('?').next().unwrap_or(raw);
    let raw = raw.trim().trim_end_matches('/');
    if raw.is_empty() {
        return "/".to_string();
    }
    if raw.len() > 256 || raw.contains("..") || raw.contains('\\') {
        return "/".to_string();
    }
    raw.to_string()
}

const MAX_QUERY_VALUE: usize = 256;

/// Form-decodes one query component (`+` is a space, `%XX` a byte).
/// Malformed escapes and non-UTF-8 results yield `None`.
fn form_decode(raw: &str) -> Option<String> {
    let mut bytes = Vec::with_capacity(raw.len());
    let mut rest = raw.as_bytes();
    while let Some((&first, tail)) = rest.split_first() {
        rest = tail;
        match first {
            b'+' => bytes.push(b' '),
            b'%' => {
                let escape = rest.get(..2).filter(|hex| hex.iter().all(u8::is_ascii_hexdigit))?;
                let escape = std::str::from_utf8(escape).ok()?;
                bytes.push(u8::from_str_radix(escape, 16).ok()?);
                rest = &rest[2..];
            }
            other => bytes.push(other),
        }
    }
    String::from_utf8(bytes).ok()
}

/// Decoded value of the first `key=` pair in the request target. Missing,
/// blank, oversized or undecodable values all read as absent.
pub(crate) fn query_param(target: &str, key: &str) -> Option<String> {
    let (_, query) = target.split_once('?')?;
    let raw = query
        .split('&')
        .filter_map(|pair| pair.split_once('=').or(Some((pair, ""))))
        .find(|(name, _)| name.trim() == key)
        .map(|(_, value)| value.trim())?;
    if raw.is_empty() || raw.len() > MAX_QUERY_VALUE {
        return None;
    }
    form_decode(raw).filter(|value| !value.trim().is_empty())
}

/// Strong validator over the exact response bytes.
pub(crate) fn etag(body: &[u8]) -> String {
    let digest = sha2::Sha256::digest(body);
    let mut out = String::with_capacity(66);
    out.push('"');
    for b in digest {
        let _ = write!(&mut out, "{:02x}", b);
    }
    out.push('"');
    out
}

pub(crate) fn write_response(
    stream: &mut impl Write,
    status: &str,
    content_type: &str,
    body: &[u8],
    etag: Option<&str>,
    head_only: bool,
) -> std::io::Result<()> {
    let mut headers = String::new();
    headers.push_str("HTTP/1.1 ");
    headers.push_str(status);
    headers.push_str("\r\n");
    headers.push_str("Content-Type: ");
    headers.push_str(content_type);
    headers.push_str("\r\n");
    headers.push_str("Cache-Control: no-cache\r\n");
    headers.push_str("X-Content-Type-Options: nosniff\r\n");
    headers.push_str("Access-Control-Allow-Origin: *\r\n");
    if let Some(etag) = etag {
        headers.push_str("ETag: ");
        headers.push_str(etag);
        headers.push_str("\r\n");
    }
    headers.push_str("Connection: close\r\n");
    headers.push_str("Content-Length: ");
    headers.push_str(&body.len().to_string());
    headers.push_str("\r\n\r\n");

    stream.write_all(headers.as_bytes())?;
    if !head_only {
        stream.write_all(body)?;
    }
    stream.flush()
}
