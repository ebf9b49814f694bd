use serde::{Deserialize, Serialize};

/// Lesson title used when a page carries no lesson header.
pub const UNKNOWN_LESSON: &str = "Unknown Lesson";

/// One external link found on a course page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkRecord {
    pub url: String,
    /// Page the link was found on (a lesson URL, or the course URL itself).
    pub source: String,
    /// Normalized key of the course owning `source`.
    pub course: String,
    pub lesson: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link_text: Option<String>,
    pub depth: usize,
}

impl LinkRecord {
    /// `<url> is in '<lesson>'`, the one-line label used in reports.
    pub fn display(&self) -> String {
        format!("{} is in '{}'", self.url, self.lesson)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisitedCourse {
    pub url: String,
    pub depth: usize,
    pub lessons: usize,
}

/// A page whose render failed; its links (and, for a course, its subtree) are missing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageFailure {
    pub url: String,
    pub depth: usize,
    pub error: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CrawlReport {
    pub root: String,
    pub links: Vec<LinkRecord>,
    pub visited: Vec<VisitedCourse>,
    pub failures: Vec<PageFailure>,
}

impl CrawlReport {
    pub fn new(root: String) -> Self {
        Self {
            root,
            ..Self::default()
        }
    }

    /// Distinct link URLs in first-discovery order.
    pub fn unique_urls(&self) -> Vec<String> {
        let mut seen = std::collections::HashSet::new();
        self.links
            .iter()
            .filter(|record| seen.insert(record.url.as_str()))
            .map(|record| record.url.clone())
            .collect()
    }

    pub fn is_visited(&self, key: &str) -> bool {
        self.visited.iter().any(|course| course.url == key)
    }
}
