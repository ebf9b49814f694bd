use crate::course::{CoursePattern, course_key, parse_course_url};
use crate::error::Result;
use crate::extract::{LinkExtractor, PageLinks};
use crate::renderer::{PageKind, PageRenderer};
use crate::result::{CrawlReport, LinkRecord, PageFailure, UNKNOWN_LESSON, VisitedCourse};
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use tracing::{debug, info, warn};
use url::Url;

/// Progress notifications emitted while crawling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CrawlEvent {
    CourseStarted { url: String, depth: usize },
    LessonsFound { url: String, depth: usize, count: usize },
    LessonStarted { depth: usize, index: usize, total: usize, title: String },
    LinkedCoursesFound { url: String, depth: usize, count: usize },
    PageFailed { url: String, depth: usize, error: String },
}

pub type ProgressCallback = Arc<dyn Fn(CrawlEvent) + Send + Sync>;

pub const DEFAULT_MAX_DEPTH: usize = 2;

pub struct Crawler {
    extractor: LinkExtractor,
    max_depth: usize,
    progress_callback: Option<ProgressCallback>,
}

/// Outcome of visiting one course: its links, the courses it points at, and
/// any lesson pages that failed.
struct CoursePage {
    links: Vec<LinkRecord>,
    courses: Vec<Url>,
    lessons: usize,
    failures: Vec<PageFailure>,
}

impl Crawler {
    pub fn new() -> Result<Self> {
        Self::with_pattern(CoursePattern::default())
    }

    pub fn with_pattern(pattern: CoursePattern) -> Result<Self> {
        Ok(Self {
            extractor: LinkExtractor::new(pattern)?,
            max_depth: DEFAULT_MAX_DEPTH,
            progress_callback: None,
        })
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    /// Breadth-first crawl from `root`. Courses are visited at most once and
    /// never deeper than `max_depth`. A page that fails to render is recorded
    /// in the report and skipped; only an unusable root URL is an error.
    pub async fn crawl<R: PageRenderer>(&self, renderer: &mut R, root: &str) -> Result<CrawlReport> {
        let root_url = parse_course_url(root)?;
        info!("Starting crawl of {} (max depth {})", root_url, self.max_depth);

        let mut report = CrawlReport::new(course_key(&root_url));
        let mut visited: HashSet<String> = HashSet::new();
        let mut queue: VecDeque<(Url, usize)> = VecDeque::new();
        queue.push_back((root_url, 0));

        while let Some((url, depth)) = queue.pop_front() {
            let key = course_key(&url);
            if !visited.insert(key.clone()) {
                debug!("Already visited {}", key);
                continue;
            }

            self.emit(CrawlEvent::CourseStarted {
                url: key.clone(),
                depth,
            });

            let page = match self.scan_course(renderer, &url, &key, depth).await {
                Ok(page) => page,
                Err(e) => {
                    warn!("Skipping course {}: {}", key, e);
                    self.emit(CrawlEvent::PageFailed {
                        url: key.clone(),
                        depth,
                        error: e.to_string(),
                    });
                    report.visited.push(VisitedCourse {
                        url: key.clone(),
                        depth,
                        lessons: 0,
                    });
                    report.failures.push(PageFailure {
                        url: key,
                        depth,
                        error: e.to_string(),
                    });
                    continue;
                }
            };

            report.visited.push(VisitedCourse {
                url: key.clone(),
                depth,
                lessons: page.lessons,
            });
            report.failures.extend(page.failures);
            report.links.extend(page.links);

            if depth + 1 > self.max_depth {
                continue;
            }

            let pending: Vec<Url> = page
                .courses
                .into_iter()
                .filter(|course| !visited.contains(&course_key(course)))
                .collect();
            if !pending.is_empty() {
                self.emit(CrawlEvent::LinkedCoursesFound {
                    url: key,
                    depth,
                    count: pending.len(),
                });
            }
            for course in pending {
                debug!("Queuing {} at depth {}", course, depth + 1);
                queue.push_back((course, depth + 1));
            }
        }

        info!(
            "Crawl complete. Visited {} courses, found {} links",
            report.visited.len(),
            report.links.len()
        );
        Ok(report)
    }

    async fn scan_course<R: PageRenderer>(
        &self,
        renderer: &mut R,
        url: &Url,
        key: &str,
        depth: usize,
    ) -> Result<CoursePage> {
        let html = renderer.render(url, PageKind::Course).await?;
        let lessons = self.extractor.lessons(&html, url);

        self.emit(CrawlEvent::LessonsFound {
            url: key.to_string(),
            depth,
            count: lessons.len(),
        });

        let mut course = CoursePage {
            links: Vec::new(),
            courses: Vec::new(),
            lessons: lessons.len(),
            failures: Vec::new(),
        };
        let mut seen_courses = HashSet::new();

        if lessons.is_empty() {
            // Single-page course: the shell itself carries the content.
            let page = self.extractor.extract(&html);
            self.collect(&mut course, &mut seen_courses, page, url.as_str(), key, depth);
            return Ok(course);
        }

        let total = lessons.len();
        for (index, lesson) in lessons.into_iter().enumerate() {
            self.emit(CrawlEvent::LessonStarted {
                depth,
                index: index + 1,
                total,
                title: lesson.title.clone(),
            });

            match renderer.render(&lesson.url, PageKind::Lesson).await {
                Ok(lesson_html) => {
                    let page = self.extractor.extract(&lesson_html);
                    self.collect(
                        &mut course,
                        &mut seen_courses,
                        page,
                        lesson.url.as_str(),
                        key,
                        depth,
                    );
                }
                Err(e) => {
                    warn!("Skipping lesson {}: {}", lesson.url, e);
                    self.emit(CrawlEvent::PageFailed {
                        url: lesson.url.to_string(),
                        depth,
                        error: e.to_string(),
                    });
                    course.failures.push(PageFailure {
                        url: lesson.url.to_string(),
                        depth,
                        error: e.to_string(),
                    });
                }
            }
        }

        Ok(course)
    }

    fn collect(
        &self,
        course: &mut CoursePage,
        seen_courses: &mut HashSet<String>,
        page: PageLinks,
        source: &str,
        key: &str,
        depth: usize,
    ) {
        let lesson = page.title.unwrap_or_else(|| UNKNOWN_LESSON.to_string());

        for link in page.external {
            course.links.push(LinkRecord {
                url: link.url,
                source: source.to_string(),
                course: key.to_string(),
                lesson: lesson.clone(),
                link_text: link.text,
                depth,
            });
        }

        for linked in page.courses {
            let linked_key = course_key(&linked);
            if linked_key != key && seen_courses.insert(linked_key) {
                course.courses.push(linked);
            }
        }
    }

    fn emit(&self, event: CrawlEvent) {
        if let Some(ref callback) = self.progress_callback {
            callback(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ScanError;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Serves canned HTML keyed by URL and records every render.
    #[derive(Default)]
    struct StaticRenderer {
        pages: HashMap<String, String>,
        rendered: Vec<String>,
    }

    impl StaticRenderer {
        fn page(mut self, url: &str, html: impl Into<String>) -> Self {
            self.pages.insert(url.to_string(), html.into());
            self
        }

        fn render_count(&self, url: &str) -> usize {
            self.rendered.iter().filter(|u| u.as_str() == url).count()
        }
    }

    impl PageRenderer for StaticRenderer {
        async fn render(&mut self, url: &Url, _kind: PageKind) -> Result<String> {
            self.rendered.push(url.to_string());
            self.pages
                .get(url.as_str())
                .cloned()
                .ok_or_else(|| ScanError::page_load(url.as_str(), "not found"))
        }
    }

    const A: &str = "https://rise.articulate.com/share/aaa";
    const B: &str = "https://rise.articulate.com/share/bbb";
    const C: &str = "https://rise.articulate.com/share/ccc";

    fn links(urls: &[&str]) -> String {
        urls.iter()
            .map(|u| format!(r#"<a href="{u}">link</a>"#))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn crawler(max_depth: usize) -> Crawler {
        Crawler::new().unwrap().with_max_depth(max_depth)
    }

    #[tokio::test]
    async fn test_single_course_depth_zero() {
        let mut renderer = StaticRenderer::default().page(
            A,
            links(&["https://example.com/one", "https://example.com/two"]),
        );

        let report = crawler(0).crawl(&mut renderer, A).await.unwrap();

        assert_eq!(report.links.len(), 2);
        assert_eq!(report.visited.len(), 1);
        assert!(report.failures.is_empty());
        assert!(report.links.iter().all(|l| l.depth == 0 && l.source == A));
        assert!(report.links.iter().all(|l| l.lesson == UNKNOWN_LESSON));
    }

    #[tokio::test]
    async fn test_depth_limit_stops_before_third_level() {
        let mut renderer = StaticRenderer::default()
            .page(A, links(&["https://example.com/root", B]))
            .page(B, links(&["https://example.com/sub", C]))
            .page(C, links(&["https://example.com/deep"]));

        let report = crawler(1).crawl(&mut renderer, A).await.unwrap();

        assert_eq!(renderer.render_count(C), 0);
        assert!(!report.is_visited(C));
        let urls: Vec<&str> = report.links.iter().map(|l| l.url.as_str()).collect();
        assert_eq!(urls, vec!["https://example.com/root", "https://example.com/sub"]);
        assert!(report.links.iter().all(|l| l.depth <= 1));
        assert!(report.visited.iter().all(|c| c.depth <= 1));
    }

    #[tokio::test]
    async fn test_circular_courses_visited_once() {
        let mut renderer = StaticRenderer::default()
            .page(A, links(&[B, "https://example.com/a"]))
            .page(B, links(&[A, "https://example.com/b"]));

        let report = crawler(5).crawl(&mut renderer, A).await.unwrap();

        assert_eq!(renderer.render_count(A), 1);
        assert_eq!(renderer.render_count(B), 1);
        assert_eq!(report.visited.len(), 2);
        assert_eq!(report.links.len(), 2);
    }

    #[tokio::test]
    async fn test_visited_keys_ignore_fragment_and_query() {
        let b_lesson = format!("{B}#/lessons/intro");
        let b_query = format!("{B}?ref=a");
        let mut renderer = StaticRenderer::default()
            .page(A, links(&[&b_lesson, &b_query]))
            .page(&b_lesson, links(&["https://example.com/b"]));

        let report = crawler(2).crawl(&mut renderer, A).await.unwrap();

        assert_eq!(report.visited.len(), 2);
        assert_eq!(renderer.rendered.len(), 2);
        let keys: HashSet<&str> = report.visited.iter().map(|c| c.url.as_str()).collect();
        assert_eq!(keys.len(), report.visited.len());
    }

    #[tokio::test]
    async fn test_breadth_first_order() {
        let mut renderer = StaticRenderer::default()
            .page(A, links(&[B, C]))
            .page(B, links(&["https://rise.articulate.com/share/ddd"]))
            .page(C, "")
            .page("https://rise.articulate.com/share/ddd", "");

        let report = crawler(2).crawl(&mut renderer, A).await.unwrap();

        let order: Vec<(&str, usize)> = report
            .visited
            .iter()
            .map(|c| (c.url.as_str(), c.depth))
            .collect();
        assert_eq!(
            order,
            vec![
                (A, 0),
                (B, 1),
                (C, 1),
                ("https://rise.articulate.com/share/ddd", 2)
            ]
        );
    }

    #[tokio::test]
    async fn test_failed_course_is_skipped_and_crawl_continues() {
        let mut renderer = StaticRenderer::default()
            .page(A, links(&[B, C, "https://example.com/a"]))
            .page(C, links(&["https://example.com/c"]));

        let report = crawler(1).crawl(&mut renderer, A).await.unwrap();

        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].url, B);
        assert_eq!(report.failures[0].depth, 1);
        assert_eq!(report.links.len(), 2);
        assert_eq!(report.visited.len(), 3);
    }

    #[tokio::test]
    async fn test_root_failure_is_not_fatal() {
        let mut renderer = StaticRenderer::default();
        let report = crawler(2).crawl(&mut renderer, A).await.unwrap();
        assert!(report.links.is_empty());
        assert_eq!(report.failures.len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_root_is_rejected() {
        let mut renderer = StaticRenderer::default();
        let err = crawler(2).crawl(&mut renderer, "not a url").await.unwrap_err();
        assert!(matches!(err, ScanError::InvalidUrl(_)));
        assert!(renderer.rendered.is_empty());
    }

    #[tokio::test]
    async fn test_lessons_are_rendered_in_sidebar_order() {
        let sidebar = r##"
            <a data-link="lesson-link-item" href="#/lessons/l1">Lesson One</a>
            <a data-link="lesson-link-item" href="#/lessons/l2">Lesson Two</a>
            <a data-link="lesson-link-item" href="#/lessons/l3">Lesson Three</a>"##;
        let l1 = format!("{A}#/lessons/l1");
        let l2 = format!("{A}#/lessons/l2");
        let l3 = format!("{A}#/lessons/l3");
        let mut renderer = StaticRenderer::default()
            .page(A, sidebar)
            .page(
                &l1,
                format!(
                    r#"<h1 class="lesson-header__title">Welcome</h1>{}"#,
                    links(&["https://example.com/1", B])
                ),
            )
            .page(&l3, links(&["https://example.com/3"]))
            .page(B, "");

        let events = Arc::new(Mutex::new(Vec::new()));
        let events_clone = events.clone();
        let crawler = crawler(1).with_progress_callback(Arc::new(move |event: CrawlEvent| {
            events_clone.lock().unwrap().push(event);
        }));

        let report = crawler.crawl(&mut renderer, A).await.unwrap();

        assert_eq!(
            renderer.rendered,
            vec![A.to_string(), l1.clone(), l2.clone(), l3.clone(), B.to_string()]
        );
        assert_eq!(report.visited[0].lessons, 3);
        assert_eq!(report.links.len(), 2);
        assert_eq!(report.links[0].lesson, "Welcome");
        assert_eq!(report.links[0].source, l1);
        // No lesson header on the page, even though the sidebar names it.
        assert_eq!(report.links[1].lesson, UNKNOWN_LESSON);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].url, l2);

        let events = events.lock().unwrap();
        assert!(events.contains(&CrawlEvent::LessonsFound {
            url: A.to_string(),
            depth: 0,
            count: 3
        }));
        assert!(events.contains(&CrawlEvent::LessonStarted {
            depth: 0,
            index: 2,
            total: 3,
            title: "Lesson Two".to_string()
        }));
    }

    #[tokio::test]
    async fn test_same_link_on_two_pages_kept_per_page() {
        let mut renderer = StaticRenderer::default()
            .page(A, links(&["https://example.com/shared", B]))
            .page(B, links(&["https://example.com/shared"]));

        let report = crawler(1).crawl(&mut renderer, A).await.unwrap();

        assert_eq!(report.links.len(), 2);
        assert_eq!(report.unique_urls(), vec!["https://example.com/shared".to_string()]);
    }
}
