pub mod course;
pub mod crawler;
pub mod error;
pub mod extract;
pub mod renderer;
pub mod result;

pub use course::CoursePattern;
pub use crawler::{CrawlEvent, Crawler, ProgressCallback};
pub use error::ScanError;
pub use extract::LinkExtractor;
pub use renderer::{ChromeRenderer, PageKind, PageRenderer, RendererConfig};
pub use result::{CrawlReport, LinkRecord, PageFailure, VisitedCourse};
