//! `multipart/form-data` text fields
//!
//! Browsers send `FormData` bodies as multipart. Only the small text forms the
//! API accepts go through here, so the whole body is already in memory.

use std::collections::HashMap;

use crate::types::HortaError;

/// Boundary parameter of a `multipart/form-data` content type
pub fn multipart_boundary(content_type: &str) -> Option<&str> {
    let mut params = content_type.split(';');
    let mime = params.next()?.trim();
    if !mime.eq_ignore_ascii_case("multipart/form-data") {
        return None;
    }

    params.find_map(|param| {
        let (key, value) = param.split_once('=')?;
        if !key.trim().eq_ignore_ascii_case("boundary") {
            return None;
        }
        let value = value.trim().trim_matches('"');
        (!value.is_empty()).then_some(value)
    })
}

/// Named text parts of a multipart body; file parts are skipped
pub fn multipart_fields(
    body: &[u8],
    boundary: &str,
) -> Result<HashMap<String, String>, HortaError> {
    let body = std::str::from_utf8(body)
        .map_err(|_| HortaError::BadRequest("Form body is not valid UTF-8".to_string()))?;
    let delimiter = format!("--{}", boundary);

    let mut parts = body.split(delimiter.as_str());
    // Preamble before the first delimiter
    parts.next();

    let mut fields = HashMap::new();
    let mut closed = false;
    for part in parts {
        if part.starts_with("--") {
            closed = true;
            break;
        }

        let part = part.strip_prefix("\r\n").unwrap_or(part);
        let (headers, value) = part
            .split_once("\r\n\r\n")
            .ok_or_else(|| HortaError::BadRequest("Malformed multipart part".to_string()))?;

        let Some(disposition) = headers.lines().find_map(|line| {
            let (name, value) = line.split_once(':')?;
            name.trim()
                .eq_ignore_ascii_case("content-disposition")
                .then_some(value)
        }) else {
            continue;
        };

        if disposition_param(disposition, "filename").is_some() {
            continue;
        }
        if let Some(name) = disposition_param(disposition, "name") {
            let value = value.strip_suffix("\r\n").unwrap_or(value);
            fields.insert(name.to_string(), value.to_string());
        }
    }

    if !closed {
        return Err(HortaError::BadRequest(
            "Multipart body is missing its closing boundary".to_string(),
        ));
    }
    Ok(fields)
}

/// `key="value"` parameter of a Content-Disposition header value
fn disposition_param<'a>(disposition: &'a str, key: &str) -> Option<&'a str> {
    disposition.split(';').skip(1).find_map(|param| {
        let (k, v) = param.split_once('=')?;
        k.trim()
            .eq_ignore_ascii_case(key)
            .then(|| v.trim().trim_matches('"'))
    })
}
