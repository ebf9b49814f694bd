use crate::course::{CoursePattern, LESSON_FRAGMENT_PREFIX, course_key, is_http, lesson_url};
use crate::error::{Result, ScanError};
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use tracing::debug;
use url::Url;

const ANCHOR_SELECTOR: &str = "a[href]";
const LESSON_NAV_SELECTOR: &str = r#"a[data-link="lesson-link-item"]"#;
const LESSON_TITLE_SELECTOR: &str = "h1.lesson-header__title";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedLink {
    pub url: String,
    pub text: Option<String>,
}

/// Links found on one rendered page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageLinks {
    pub title: Option<String>,
    pub external: Vec<ExtractedLink>,
    pub courses: Vec<Url>,
}

/// An entry of a course's lesson sidebar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lesson {
    pub id: String,
    pub title: String,
    pub url: Url,
}

pub struct LinkExtractor {
    pattern: CoursePattern,
    anchors: Selector,
    lesson_nav: Selector,
    lesson_title: Selector,
}

impl LinkExtractor {
    pub fn new(pattern: CoursePattern) -> Result<Self> {
        Ok(Self {
            pattern,
            anchors: selector(ANCHOR_SELECTOR)?,
            lesson_nav: selector(LESSON_NAV_SELECTOR)?,
            lesson_title: selector(LESSON_TITLE_SELECTOR)?,
        })
    }

    /// Classify every absolute http(s) anchor on the page as a linked course or
    /// an external link. Relative links are ignored.
    pub fn extract(&self, html: &str) -> PageLinks {
        let document = Html::parse_document(html);
        let mut page = PageLinks {
            title: document
                .select(&self.lesson_title)
                .next()
                .map(element_text)
                .filter(|t| !t.is_empty()),
            ..PageLinks::default()
        };

        let mut seen_external = HashSet::new();
        let mut seen_courses = HashSet::new();

        for element in document.select(&self.anchors) {
            let Some(href) = element.value().attr("href") else {
                continue;
            };
            let Some(url) = absolute_http_url(href) else {
                continue;
            };

            if self.pattern.matches(&url) {
                if seen_courses.insert(course_key(&url)) {
                    debug!("Found linked course: {}", url);
                    page.courses.push(url);
                }
            } else if seen_external.insert(url.to_string()) {
                let text = element_text(element);
                page.external.push(ExtractedLink {
                    url: url.to_string(),
                    text: (!text.is_empty()).then_some(text),
                });
            }
        }

        page
    }

    /// Lessons listed in the course sidebar, in sidebar order.
    pub fn lessons(&self, html: &str, course: &Url) -> Vec<Lesson> {
        let document = Html::parse_document(html);
        let mut seen = HashSet::new();
        let mut lessons = Vec::new();

        for element in document.select(&self.lesson_nav) {
            let Some(id) = element
                .value()
                .attr("href")
                .and_then(|href| href.strip_prefix(LESSON_FRAGMENT_PREFIX))
                .filter(|id| !id.is_empty())
            else {
                continue;
            };
            if !seen.insert(id.to_string()) {
                continue;
            }

            // Sidebar entries append progress text after the title on new lines.
            let raw: String = element.text().collect();
            let title = raw
                .lines()
                .map(str::trim)
                .find(|line| !line.is_empty())
                .unwrap_or(id)
                .to_string();

            lessons.push(Lesson {
                id: id.to_string(),
                title,
                url: lesson_url(course, id),
            });
        }

        lessons
    }
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| ScanError::Selector(format!("{}: {}", css, e)))
}

fn absolute_http_url(href: &str) -> Option<Url> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }
    Url::parse(href).ok().filter(is_http)
}

fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}
