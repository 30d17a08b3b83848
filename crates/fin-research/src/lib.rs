//! Research report generation
//!
//! Reports are produced by a small state graph of LLM and search steps:
//! the planner searches the web and outlines sections, every section that
//! needs research runs its own query/search/write/grade loop (sections run
//! concurrently), and the introduction and conclusion are written last from
//! the researched material.

pub mod config;
pub mod context;
pub mod error;
pub mod graph;
pub mod models;
pub mod prompts;
pub mod report;
pub mod search;
pub mod stages;

pub use config::{DEFAULT_REPORT_STRUCTURE, ReportConfig};
pub use error::{ResearchError, Result};
pub use graph::{Graph, GraphBuilder, Node};
pub use models::{Feedback, Grade, Report, ReportState, Section, SectionState};
pub use report::ReportRunner;
pub use search::{SearchClient, SearchResult, TavilyClient, format_sources};
