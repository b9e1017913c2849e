//! Minimal `multipart/form-data` decoder.
//!
//! Used by the event adapter, whose payload arrives as a raw body plus a
//! `Content-Type` header rather than through an HTTP framework. The grammar
//! handled is the subset browsers and HTTP clients actually send:
//!
//! ```text
//! [preamble]
//! --BOUNDARY CRLF
//! Header: value CRLF
//! ... CRLF
//! CRLF
//! body bytes
//! CRLF --BOUNDARY CRLF
//! ...
//! CRLF --BOUNDARY-- [epilogue]
//! ```
//!
//! Bare LF line endings are accepted wherever CRLF is expected. Part bodies
//! are returned as borrowed slices; `Content-Transfer-Encoding` is not
//! interpreted (form-data parts are sent as raw binary).

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MultipartError {
    #[error("Content-Type has no boundary parameter")]
    MissingBoundary,
    #[error("no opening boundary found")]
    NoOpeningBoundary,
    #[error("malformed boundary line")]
    MalformedBoundaryLine,
    #[error("body ended before the closing boundary")]
    UnexpectedEnd,
    #[error("malformed part header: {0}")]
    MalformedHeader(String),
}

/// One part of a multipart body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Part<'a> {
    headers: Vec<(String, String)>,
    body: &'a [u8],
}

impl<'a> Part<'a> {
    /// Case-insensitive header lookup; first occurrence wins.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn disposition(&self) -> Option<ContentDisposition> {
        self.header("content-disposition")
            .map(ContentDisposition::parse)
    }

    pub fn body(&self) -> &'a [u8] {
        self.body
    }
}

/// Parsed `Content-Disposition` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentDisposition {
    /// Lowercased disposition type, e.g. `form-data`.
    pub kind: String,
    pub name: Option<String>,
    pub filename: Option<String>,
}

impl ContentDisposition {
    pub fn parse(value: &str) -> Self {
        let (kind, params) = split_header_value(value);
        let mut name = None;
        let mut filename = None;
        for (key, val) in params {
            match key.as_str() {
                "name" => name = Some(val),
                "filename" => filename = Some(val),
                _ => {}
            }
        }
        Self {
            kind: kind.to_ascii_lowercase(),
            name,
            filename,
        }
    }

    pub fn is_form_data(&self) -> bool {
        self.kind == "form-data"
    }
}

/// Extract the `boundary` parameter from a `multipart/*` content type.
pub fn boundary(content_type: &str) -> Result<String, MultipartError> {
    let (_, params) = split_header_value(content_type);
    params
        .into_iter()
        .find(|(key, _)| key == "boundary")
        .map(|(_, value)| value)
        .filter(|value| !value.is_empty())
        .ok_or(MultipartError::MissingBoundary)
}

/// Parse a multipart body framed by the given `Content-Type` header.
pub fn parse_form<'a>(content_type: &str, body: &'a [u8]) -> Result<Vec<Part<'a>>, MultipartError> {
    let boundary = boundary(content_type)?;
    parse(body, &boundary)
}

/// Split a multipart body into parts.
pub fn parse<'a>(body: &'a [u8], boundary: &str) -> Result<Vec<Part<'a>>, MultipartError> {
    let delimiter = format!("--{boundary}").into_bytes();
    let mut line_delimiter = Vec::with_capacity(delimiter.len() + 1);
    line_delimiter.push(b'\n');
    line_delimiter.extend_from_slice(&delimiter);

    // The opening delimiter starts the body or a line after the preamble.
    let mut pos = if body.starts_with(&delimiter) {
        0
    } else {
        find(body, &line_delimiter, 0)
            .map(|i| i + 1)
            .ok_or(MultipartError::NoOpeningBoundary)?
    };

    let mut parts = Vec::new();
    loop {
        let after = pos + delimiter.len();
        if body[after..].starts_with(b"--") {
            return Ok(parts);
        }
        let start = skip_line_end(body, after)?;

        // Searching from the LF that ended the delimiter line catches an
        // immediately following delimiter (an empty part).
        let next = find(body, &line_delimiter, start - 1).ok_or(MultipartError::UnexpectedEnd)?;
        let mut end = next.max(start);
        if end > start && body[end - 1] == b'\r' {
            end -= 1;
        }
        parts.push(parse_part(&body[start..end])?);
        pos = next + 1;
    }
}

fn parse_part(raw: &[u8]) -> Result<Part<'_>, MultipartError> {
    if let Some(body) = raw.strip_prefix(b"\r\n").or_else(|| raw.strip_prefix(b"\n")) {
        return Ok(Part {
            headers: Vec::new(),
            body,
        });
    }

    let crlf = find(raw, b"\r\n\r\n", 0).map(|i| (i, 4));
    let lf = find(raw, b"\n\n", 0).map(|i| (i, 2));
    let (split, sep_len) = match (crlf, lf) {
        (Some(a), Some(b)) => {
            if a.0 <= b.0 {
                a
            } else {
                b
            }
        }
        (a, b) => a.or(b).ok_or_else(|| {
            MultipartError::MalformedHeader("missing blank line after part headers".to_string())
        })?,
    };

    let headers = parse_headers(&String::from_utf8_lossy(&raw[..split]))?;
    Ok(Part {
        headers,
        body: &raw[split + sep_len..],
    })
}

fn parse_headers(block: &str) -> Result<Vec<(String, String)>, MultipartError> {
    let mut headers: Vec<(String, String)> = Vec::new();
    for line in block.split('\n') {
        let line = line.strip_suffix('\r').unwrap_or(line);
        if line.is_empty() {
            continue;
        }
        // Folded continuation of the previous header
        if line.starts_with([' ', '\t']) {
            match headers.last_mut() {
                Some((_, value)) => {
                    value.push(' ');
                    value.push_str(line.trim());
                    continue;
                }
                None => return Err(MultipartError::MalformedHeader(line.to_string())),
            }
        }
        let (name, value) = line
            .split_once(':')
            .ok_or_else(|| MultipartError::MalformedHeader(line.to_string()))?;
        headers.push((name.trim().to_string(), value.trim().to_string()));
    }
    Ok(headers)
}

/// Skip optional transport padding and one line ending after a delimiter.
fn skip_line_end(body: &[u8], mut i: usize) -> Result<usize, MultipartError> {
    while i < body.len() && matches!(body[i], b' ' | b'\t') {
        i += 1;
    }
    let rest = &body[i..];
    if rest.starts_with(b"\r\n") {
        Ok(i + 2)
    } else if rest.starts_with(b"\n") {
        Ok(i + 1)
    } else if rest.is_empty() || rest == b"\r" {
        Err(MultipartError::UnexpectedEnd)
    } else {
        Err(MultipartError::MalformedBoundaryLine)
    }
}

/// Split `type; key=value; key="quoted value"` into the leading token and
/// lowercased-key parameters. Semicolons inside quotes do not split.
fn split_header_value(value: &str) -> (String, Vec<(String, String)>) {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut escaped = false;
    for c in value.chars() {
        if escaped {
            current.push(c);
            escaped = false;
            continue;
        }
        match c {
            '\\' if in_quotes => {
                current.push(c);
                escaped = true;
            }
            '"' => {
                in_quotes = !in_quotes;
                current.push(c);
            }
            ';' if !in_quotes => segments.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    segments.push(current);

    let mut iter = segments.into_iter();
    let kind = iter.next().unwrap_or_default().trim().to_string();
    let params = iter
        .filter_map(|segment| {
            let (key, val) = segment.split_once('=')?;
            Some((key.trim().to_ascii_lowercase(), unquote(val.trim())))
        })
        .collect();
    (kind, params)
}

fn unquote(value: &str) -> String {
    let Some(inner) = value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
    else {
        return value.to_string();
    };
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
}

fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if from > haystack.len() || needle.is_empty() {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|i| i + from)
}
