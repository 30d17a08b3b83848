//! Report generation settings

use crate::{ResearchError, Result};

/// Outline used when a request does not bring its own
pub const DEFAULT_REPORT_STRUCTURE: &str = "Use this structure to create a report on the user-provided topic:

1. Introduction (no research needed)
   - Brief overview of the topic area

2. Main Body Sections:
   - Each section should focus on a sub-topic of the user-provided topic
   - Cover the business, financial and market angles that matter to an investor

3. Conclusion (no research needed)
   - Aim for 1 structural element (either a list or table) that distills the main body sections
   - Provide a concise summary of the report";

#[derive(Debug, Clone)]
pub struct ReportConfig {
    pub report_structure: String,
    /// Search queries generated per planning or research step
    pub number_of_queries: usize,
    /// Write/grade iterations per research section
    pub max_search_depth: usize,
    pub max_results_per_query: usize,
    /// Sections researched or written at the same time
    pub concurrency: usize,
    pub max_chars_per_source: usize,
    pub model: String,
    pub max_tokens: usize,
    pub temperature: f32,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            report_structure: DEFAULT_REPORT_STRUCTURE.to_string(),
            number_of_queries: 2,
            max_search_depth: 2,
            max_results_per_query: 3,
            concurrency: 4,
            max_chars_per_source: 1_000,
            model: "claude-sonnet-4-5".to_string(),
            max_tokens: 4096,
            temperature: 0.0,
        }
    }
}

impl ReportConfig {
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("number_of_queries", self.number_of_queries),
            ("max_search_depth", self.max_search_depth),
            ("max_results_per_query", self.max_results_per_query),
            ("concurrency", self.concurrency),
            ("max_tokens", self.max_tokens),
        ] {
            if value == 0 {
                return Err(ResearchError::Configuration(format!("{name} must be at least 1")));
            }
        }
        if self.report_structure.trim().is_empty() {
            return Err(ResearchError::Configuration("report_structure is empty".to_string()));
        }
        Ok(())
    }
}
