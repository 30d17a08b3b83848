//! Web content services for the financial assistant
//!
//! - [`Scraper`]: readable text from a URL, falling back to a headless
//!   render service for script-heavy pages
//! - [`HackerNewsClient`]: feed stories with a post-fetch [`StoryFilter`]
//! - [`RelevanceScorer`]: LLM relevance of content to a topic

pub mod error;
pub mod hackernews;
pub mod html;
pub mod relevance;
pub mod scraper;

pub use error::{ContentError, Result};
pub use hackernews::{Feed, HackerNewsClient, Story, StoryFilter};
pub use html::{Extracted, HtmlExtractor};
pub use relevance::{RankedStory, Relevance, RelevanceScorer};
pub use scraper::{FetchMethod, HtmlSource, ScrapedPage, Scraper, ScraperConfig, validate_url};
