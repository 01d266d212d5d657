//! `Link:` header parsing for paged list endpoints.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::LoadError;

static LINK_ENTRY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<([^>]*)>\s*;\s*rel="([^"]+)""#).expect("link entry pattern is valid")
});

/// Previous/next page targets (path + query only).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Links {
    pub prev: Option<String>,
    pub next: Option<String>,
}

/// Parses one or more `Link` header values.
///
/// Entries look like `<http://host/api/announcements?page=2>; rel="next"` and are
/// separated by commas. Only `prev` and `next` are recognised. A recognised entry
/// whose URL has no path is an application error.
///
/// ```
/// use courseload::api::parse_link_header;
///
/// let links = parse_link_header(
///     r#"<http://t/api/announcements?page=1>; rel="prev", <http://t/api/announcements?page=3>; rel="next""#,
/// ).unwrap();
/// assert_eq!(links.prev.as_deref(), Some("/api/announcements?page=1"));
/// assert_eq!(links.next.as_deref(), Some("/api/announcements?page=3"));
/// ```
pub fn parse_link_header(value: &str) -> Result<Links, LoadError> {
    let mut links = Links::default();
    for caps in LINK_ENTRY.captures_iter(value) {
        let (url, rel) = (&caps[1], caps[2].to_ascii_lowercase());
        let slot = match rel.as_str() {
            "prev" => &mut links.prev,
            "next" => &mut links.next,
            _ => continue,
        };
        *slot = Some(path_and_query(url)?);
    }
    Ok(links)
}

fn path_and_query(url: &str) -> Result<String, LoadError> {
    let rest = match url.find("://") {
        Some(i) => {
            let after = &url[i + 3..];
            match after.find('/') {
                Some(p) => &after[p..],
                None => "",
            }
        }
        None => url,
    };
    if !rest.starts_with('/') {
        return Err(LoadError::application(format!(
            "invalid URL in Link header: {url:?}"
        )));
    }
    Ok(rest.to_string())
}
