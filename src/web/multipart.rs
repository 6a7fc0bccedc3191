//! Minimal `multipart/form-data` parsing for the upload form

/// A file part of a multipart body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePart {
    /// Client-supplied file name (may be empty)
    pub file_name: String,
    /// Raw file contents
    pub bytes: Vec<u8>,
}

/// Returns the index of the first occurrence of `needle` in `haystack`.
#[must_use]
pub fn find_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() {
        return Some(0);
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Splits `haystack` on every occurrence of `needle`, returning the pieces
/// between occurrences (excluding the needle itself).
#[must_use]
pub fn split_on<'a>(haystack: &'a [u8], needle: &[u8]) -> Vec<&'a [u8]> {
    let mut result = Vec::new();
    let mut rest = haystack;
    loop {
        match find_subsequence(rest, needle) {
            Some(pos) if !needle.is_empty() => {
                let (head, tail) = rest.split_at(pos);
                result.push(head);
                rest = tail.get(needle.len()..).unwrap_or(&[]);
            },
            _ => {
                result.push(rest);
                break;
            },
        }
    }
    result
}

/// Extracts the boundary token from a Content-Type header value like
/// `multipart/form-data; boundary=----WebKitFormBoundaryXXX`.
#[must_use]
pub fn extract_boundary(content_type: &str) -> Option<String> {
    content_type
        .split(';')
        .map(str::trim)
        .find_map(|s| s.strip_prefix("boundary="))
        .map(|b| b.trim_matches('"').to_owned())
        .filter(|b| !b.is_empty())
}

/// Header section and payload of every part
fn parts<'a>(body: &'a [u8], boundary: &str) -> Vec<(String, &'a [u8])> {
    let delimiter = format!("--{}", boundary);
    let sep = b"\r\n\r\n";

    split_on(body, delimiter.as_bytes())
        .into_iter()
        .filter_map(|part| {
            let sep_pos = find_subsequence(part, sep)?;
            let (headers, rest) = part.split_at(sep_pos);
            let raw = rest.get(sep.len()..)?;
            let data = raw.strip_suffix(b"\r\n").unwrap_or(raw);
            Some((String::from_utf8_lossy(headers).into_owned(), data))
        })
        .collect()
}

/// Parses a quoted `key="..."` attribute from a Content-Disposition header.
fn disposition_attr(headers: &str, key: &str) -> Option<String> {
    let pattern = format!("{}=\"", key);
    let mut search = headers;
    loop {
        let pos = search.find(&pattern)?;
        // `name=` must not match the tail of `filename=`
        let preceded_by_word = search
            .get(..pos)
            .and_then(|before| before.chars().last())
            .is_some_and(char::is_alphanumeric);
        let rest = search.get(pos + pattern.len()..)?;
        if !preceded_by_word {
            let end = rest.find('"')?;
            return rest.get(..end).map(str::to_owned);
        }
        search = rest;
    }
}

/// Extracts the named file part from a multipart/form-data body.
#[must_use]
pub fn extract_file(body: &[u8], boundary: &str, field_name: &str) -> Option<FilePart> {
    parts(body, boundary).into_iter().find_map(|(headers, data)| {
        let file_name = disposition_attr(&headers, "filename")?;
        (disposition_attr(&headers, "name").as_deref() == Some(field_name)).then(|| FilePart {
            file_name,
            bytes: data.to_vec(),
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(boundary: &str) -> Vec<u8> {
        let mut body = Vec::new();
        body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
        body.extend_from_slice(b"Content-Disposition: form-data; name=\"style\"\r\n\r\nukiyoe\r\n");
        body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
        body.extend_from_slice(
            b"Content-Disposition: form-data; name=\"image\"; filename=\"harbor.jpg\"\r\n",
        );
        body.extend_from_slice(b"Content-Type: image/jpeg\r\n\r\n");
        body.extend_from_slice(&[0xFF, 0xD8, 0x0D, 0x0A, 0xFF, 0xD9]);
        body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());
        body
    }

    #[test]
    fn test_extract_boundary() {
        assert_eq!(
            extract_boundary("multipart/form-data; boundary=----WebKitFormBoundaryX1"),
            Some("----WebKitFormBoundaryX1".to_string())
        );
        assert_eq!(
            extract_boundary("multipart/form-data; boundary=\"quoted\""),
            Some("quoted".to_string())
        );
        assert_eq!(extract_boundary("multipart/form-data"), None);
    }

    #[test]
    fn test_extract_file_keeps_binary_payload() {
        let boundary = "XyZ";
        let part = extract_file(&body(boundary), boundary, "image").unwrap();
        assert_eq!(part.file_name, "harbor.jpg");
        assert_eq!(part.bytes, vec![0xFF, 0xD8, 0x0D, 0x0A, 0xFF, 0xD9]);
        assert!(extract_file(&body(boundary), boundary, "other").is_none());
        assert!(extract_file(&body(boundary), boundary, "style").is_none());
    }

    #[test]
    fn test_split_on() {
        assert_eq!(split_on(b"a--b--c", b"--"), vec![&b"a"[..], &b"b"[..], &b"c"[..]]);
        assert_eq!(split_on(b"abc", b"--"), vec![&b"abc"[..]]);
    }
}
