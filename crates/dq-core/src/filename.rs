//! Destination filename derivation.
//!
//! Preference order: `Content-Disposition` filename from the server, then the
//! last path segment of the URL. Either way the result is sanitized for the
//! local filesystem. Returns `None` when neither source yields anything
//! usable; the fetcher then falls back to a generated name.

/// Pick a safe local filename for `key`, given an optional raw
/// `Content-Disposition` header value.
pub fn derive(key: &str, content_disposition: Option<&str>) -> Option<String> {
    let candidate = content_disposition
        .and_then(from_content_disposition)
        .or_else(|| from_url_path(key))?;
    let name = sanitize(&candidate);
    if name.is_empty() || name == "." || name == ".." {
        None
    } else {
        Some(name)
    }
}

/// Extract `filename=` from a Content-Disposition header value. Handles
/// quoted and bare-token forms.
pub fn from_content_disposition(value: &str) -> Option<String> {
    for param in value.split(';') {
        let param = param.trim();
        let Some((name, v)) = param.split_once('=') else {
            continue;
        };
        if !name.trim().eq_ignore_ascii_case("filename") {
            continue;
        }
        let v = v.trim();
        let unquoted = v
            .strip_prefix('"')
            .and_then(|s| s.strip_suffix('"'))
            .unwrap_or(v);
        // Keep only the basename; servers occasionally send paths.
        let base = unquoted.rsplit(['/', '\\']).next().unwrap_or(unquoted);
        if !base.is_empty() {
            return Some(base.to_string());
        }
    }
    None
}

/// Last non-empty path segment of the URL, if any.
pub fn from_url_path(key: &str) -> Option<String> {
    let parsed = url::Url::parse(key).ok()?;
    let segment = parsed.path().split('/').filter(|s| !s.is_empty()).last()?;
    Some(segment.to_string())
}

/// Replace path separators and control characters, trim leading/trailing
/// dots and whitespace, and cap at 255 bytes (NAME_MAX).
fn sanitize(name: &str) -> String {
    const NAME_MAX: usize = 255;

    let cleaned: String = name
        .chars()
        .map(|c| {
            if c == '/' || c == '\\' || c == '\0' || c.is_control() {
                '_'
            } else {
                c
            }
        })
        .collect();
    let trimmed = cleaned.trim_matches(|c: char| c.is_whitespace() || c == '.');

    if trimmed.len() > NAME_MAX {
        let mut take = NAME_MAX;
        while take > 0 && !trimmed.is_char_boundary(take) {
            take -= 1;
        }
        trimmed[..take].to_string()
    } else {
        trimmed.to_string()
    }
}
