use crate::error::{Result, ScanError};
use url::Url;

pub const RISE_HOST: &str = "rise.articulate.com";
pub const SHARE_MARKER: &str = "/share/";
pub const LESSON_FRAGMENT_PREFIX: &str = "#/lessons/";

/// Decides which links point at another Rise course.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoursePattern {
    host: String,
    path_marker: String,
}

impl CoursePattern {
    pub fn new(host: impl Into<String>, path_marker: impl Into<String>) -> Self {
        Self {
            host: host.into().to_lowercase(),
            path_marker: path_marker.into(),
        }
    }

    pub fn matches(&self, url: &Url) -> bool {
        let Some(host) = url.host_str() else {
            return false;
        };
        let host_matches = host == self.host || host.ends_with(&format!(".{}", self.host));
        host_matches && url.path().contains(&self.path_marker)
    }
}

impl Default for CoursePattern {
    fn default() -> Self {
        Self::new(RISE_HOST, SHARE_MARKER)
    }
}

/// Parse a root course URL. Only absolute http(s) URLs are accepted.
pub fn parse_course_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw.trim()).map_err(|e| ScanError::InvalidUrl(format!("{}: {}", raw, e)))?;
    if !is_http(&url) {
        return Err(ScanError::InvalidUrl(format!(
            "{}: URL must start with http:// or https://",
            raw
        )));
    }
    Ok(url)
}

pub fn is_http(url: &Url) -> bool {
    matches!(url.scheme(), "http" | "https")
}

/// Visited-set key: scheme, host, port and path with query, fragment and a
/// trailing slash removed.
pub fn course_key(url: &Url) -> String {
    let mut key = url.clone();
    key.set_query(None);
    key.set_fragment(None);

    let trimmed = key.path().trim_end_matches('/').to_string();
    if !trimmed.is_empty() {
        key.set_path(&trimmed);
    }
    key.to_string()
}

/// `<course>#/lessons/<id>`
pub fn lesson_url(course: &Url, lesson_id: &str) -> Url {
    let mut url = course.clone();
    url.set_query(None);
    url.set_fragment(Some(&format!("/lessons/{}", lesson_id)));
    url
}

/// Whether `target` only differs from `current` by its fragment, i.e. Rise can
/// route to it without reloading the document.
pub fn same_document(current: &str, target: &Url) -> bool {
    match Url::parse(current) {
        Ok(mut current) => {
            let mut target = target.clone();
            current.set_fragment(None);
            target.set_fragment(None);
            current == target
        }
        Err(_) => false,
    }
}
