//! Report generation entry point

use crate::config::ReportConfig;
use crate::context::ResearchContext;
use crate::graph::Graph;
use crate::models::{Report, ReportState};
use crate::search::SearchClient;
use crate::stages::{
    CompileReport, GatherSections, PlanReport, ResearchSections, WriteFinalSections, section_graph,
};
use crate::{ResearchError, Result};
use fin_llm::LLMProvider;
use fin_prompt::PromptRegistry;
use std::sync::Arc;
use tracing::{info, instrument};

/// Builds and runs the report graph
///
/// plan -> research sections -> gather -> write final sections -> compile
pub struct ReportRunner {
    ctx: Arc<ResearchContext>,
    graph: Graph<ReportState>,
}

impl ReportRunner {
    pub fn new(llm: Arc<dyn LLMProvider>, search: Arc<dyn SearchClient>, config: ReportConfig) -> Result<Self> {
        config.validate()?;

        let prompts = PromptRegistry::new();
        crate::prompts::register(&prompts)?;
        let ctx = Arc::new(ResearchContext {
            llm,
            search,
            prompts,
            config,
        });

        let graph = Graph::builder("report")
            .node(PlanReport { ctx: Arc::clone(&ctx) })
            .node(ResearchSections {
                ctx: Arc::clone(&ctx),
                section_graph: Arc::new(section_graph(&ctx)?),
            })
            .node(GatherSections)
            .node(WriteFinalSections { ctx: Arc::clone(&ctx) })
            .node(CompileReport)
            .build()?;

        Ok(Self { ctx, graph })
    }

    pub fn config(&self) -> &ReportConfig {
        &self.ctx.config
    }

    pub fn stages(&self) -> Vec<&str> {
        self.graph.node_names()
    }

    /// Generate a report; `report_structure` overrides the configured outline
    #[instrument(skip(self, report_structure))]
    pub async fn run(&self, topic: &str, report_structure: Option<&str>) -> Result<Report> {
        let topic = topic.trim();
        if topic.is_empty() {
            return Err(ResearchError::EmptyTopic);
        }
        let structure = report_structure
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(&self.ctx.config.report_structure);

        let state = self.graph.execute(ReportState::new(topic, structure)).await?;
        info!(sections = state.sections.len(), chars = state.report.len(), "Report compiled");

        Ok(Report {
            topic: state.topic,
            sections: state.sections,
            markdown: state.report,
        })
    }
}
