//! Cookie-file authentication for the dashboard session.
//!
//! Sessions are established out of band (the operator runs the corporate
//! SSO helper); we only read the resulting Netscape-format cookie file and
//! attach its cookies to dashboard requests.

use std::fs;
use std::path::Path;

use super::IngestError;

/// One cookie parsed from the Netscape cookie file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieEntry {
    pub domain: String,
    pub path: String,
    pub secure: bool,
    pub name: String,
    pub value: String,
}

/// Parse the tab-separated Netscape cookie format.
///
/// Lines starting with `#` are comments, except the `#HttpOnly_` prefix,
/// which marks an http-only cookie and carries the domain after the
/// underscore. Short or malformed rows are skipped.
pub fn parse_cookie_file(contents: &str) -> Vec<CookieEntry> {
    contents.lines().filter_map(parse_cookie_line).collect()
}

fn parse_cookie_line(line: &str) -> Option<CookieEntry> {
    if line.trim().is_empty() {
        return None;
    }
    if line.starts_with('#') && !line.starts_with("#HttpOnly_") {
        return None;
    }

    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() < 7 {
        return None;
    }

    let domain = fields[0]
        .strip_prefix("#HttpOnly_")
        .unwrap_or(fields[0])
        .to_string();

    Some(CookieEntry {
        domain,
        path: fields[2].to_string(),
        secure: fields[3].contains("TRUE"),
        name: fields[5].to_string(),
        value: fields[6].to_string(),
    })
}

/// Build the `Cookie` request header value from parsed entries.
pub fn cookie_header(entries: &[CookieEntry]) -> Option<String> {
    if entries.is_empty() {
        return None;
    }
    Some(
        entries
            .iter()
            .map(|cookie| format!("{}={}", cookie.name, cookie.value))
            .collect::<Vec<_>>()
            .join("; "),
    )
}

/// Read the cookie file and produce the header value for requests.
pub fn load_cookie_header(path: &Path) -> Result<String, IngestError> {
    let contents =
        fs::read_to_string(path).map_err(|source| IngestError::CookieFile {
            path: path.to_path_buf(),
            source,
        })?;
    let entries = parse_cookie_file(&contents);
    cookie_header(&entries).ok_or_else(|| IngestError::NoCookies {
        path: path.to_path_buf(),
    })
}
