//! HTTP Headers Utility
//!
//! Small helpers for reading and writing headers by string name, used by
//! serializers and interceptors that don't hold typed `HeaderName`s.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

/// A header name or value could not be encoded.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidHeader {
    #[error("invalid header name '{name}': {reason}")]
    Name { name: String, reason: String },

    #[error("invalid value for header '{name}': {reason}")]
    Value { name: String, reason: String },
}

/// Validate a header name and value given as strings.
pub fn parse_header(name: &str, value: &str) -> Result<(HeaderName, HeaderValue), InvalidHeader> {
    let header_name =
        HeaderName::from_bytes(name.as_bytes()).map_err(|e| InvalidHeader::Name {
            name: name.to_string(),
            reason: e.to_string(),
        })?;
    let header_value = HeaderValue::from_str(value).map_err(|e| InvalidHeader::Value {
        name: name.to_string(),
        reason: e.to_string(),
    })?;
    Ok((header_name, header_value))
}

/// Insert (replacing) a header given string name and value.
pub fn insert_header(
    headers: &mut HeaderMap,
    name: &str,
    value: &str,
) -> Result<(), InvalidHeader> {
    let (header_name, header_value) = parse_header(name, value)?;
    headers.insert(header_name, header_value);
    Ok(())
}

/// Read a header as UTF-8 text; `None` when absent or not valid text.
pub fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_read_back() {
        let mut headers = HeaderMap::new();
        insert_header(&mut headers, "otherProperty", "1").unwrap();
        // Header names are case-insensitive
        assert_eq!(header_str(&headers, "otherproperty"), Some("1"));
    }

    #[test]
    fn rejects_invalid_name_and_value() {
        let mut headers = HeaderMap::new();
        assert!(matches!(
            insert_header(&mut headers, "bad header", "v"),
            Err(InvalidHeader::Name { .. })
        ));
        assert!(matches!(
            insert_header(&mut headers, "x-ok", "line\nbreak"),
            Err(InvalidHeader::Value { .. })
        ));
    }
}
