//! Report and section state

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub name: String,
    pub description: String,
    /// Whether the section needs web research
    #[serde(default)]
    pub research: bool,
    #[serde(default)]
    pub content: String,
}

/// Planner reply
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct SectionPlan {
    #[serde(default)]
    pub sections: Vec<Section>,
}

/// Query generator reply
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Queries {
    #[serde(default)]
    pub queries: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Grade {
    Pass,
    Fail,
}

/// Grader reply for a written section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feedback {
    pub grade: Grade,
    #[serde(default)]
    pub follow_up_queries: Vec<String>,
}

/// State threaded through the report graph
#[derive(Debug, Clone, Default)]
pub struct ReportState {
    pub topic: String,
    pub report_structure: String,
    /// Sections in plan order
    pub sections: Vec<Section>,
    /// Researched sections formatted for the final writers
    pub gathered: String,
    pub report: String,
}

impl ReportState {
    pub fn new(topic: impl Into<String>, report_structure: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            report_structure: report_structure.into(),
            ..Self::default()
        }
    }
}

/// State of one section's research loop
#[derive(Debug, Clone)]
pub struct SectionState {
    pub topic: String,
    pub section: Section,
    pub queries: Vec<String>,
    pub sources: String,
    pub iterations: usize,
    pub feedback: Option<Feedback>,
}

impl SectionState {
    pub fn new(topic: impl Into<String>, section: Section) -> Self {
        Self {
            topic: topic.into(),
            section,
            queries: Vec::new(),
            sources: String::new(),
            iterations: 0,
            feedback: None,
        }
    }

    pub fn passed(&self) -> bool {
        self.feedback.as_ref().is_some_and(|f| f.grade == Grade::Pass)
    }
}

/// Finished report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub topic: String,
    pub sections: Vec<Section>,
    pub markdown: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_section_plan_defaults() {
        let plan: SectionPlan = serde_json::from_value(json!({
            "sections": [{"name": "Intro", "description": "Overview"}]
        }))
        .unwrap();
        assert!(!plan.sections[0].research);
        assert!(plan.sections[0].content.is_empty());
    }

    #[test]
    fn test_feedback_grade() {
        let feedback: Feedback = serde_json::from_value(json!({"grade": "fail", "follow_up_queries": ["q"]})).unwrap();
        let mut state = SectionState::new("topic", Section {
            name: "A".into(),
            description: "B".into(),
            research: true,
            content: String::new(),
        });
        assert!(!state.passed());
        state.feedback = Some(feedback);
        assert!(!state.passed());
        state.feedback = Some(Feedback { grade: Grade::Pass, follow_up_queries: vec![] });
        assert!(state.passed());
    }
}
