//! Report graph nodes

use crate::context::ResearchContext;
use crate::graph::{Graph, Node};
use crate::models::{Feedback, Queries, ReportState, Section, SectionPlan, SectionState};
use crate::prompts;
use crate::{ResearchError, Result};
use async_trait::async_trait;
use futures::stream::{self, StreamExt, TryStreamExt};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info};

fn clean_queries(queries: Vec<String>, limit: usize) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for query in queries {
        let query = query.trim().to_string();
        if !query.is_empty() && !out.contains(&query) {
            out.push(query);
        }
    }
    out.truncate(limit);
    out
}

/// Plan queries, search them and ask for the section outline
pub struct PlanReport {
    pub ctx: Arc<ResearchContext>,
}

#[async_trait]
impl Node<ReportState> for PlanReport {
    fn name(&self) -> &str {
        "plan_report"
    }

    async fn run(&self, mut state: ReportState) -> Result<ReportState> {
        let ctx = &self.ctx;
        let system = ctx.prompts.render(
            prompts::PLAN_QUERIES,
            &json!({
                "topic": state.topic,
                "report_structure": state.report_structure,
                "number_of_queries": ctx.config.number_of_queries,
            }),
        )?;
        let queries: Queries = ctx.complete_json(system, prompts::PLAN_QUERIES_USER).await?;
        let queries = clean_queries(queries.queries, ctx.config.number_of_queries);
        let sources = ctx.search_all(&queries).await?;

        let system = ctx.prompts.render(
            prompts::PLAN_SECTIONS,
            &json!({
                "topic": state.topic,
                "report_structure": state.report_structure,
                "sources": sources,
            }),
        )?;
        let plan: SectionPlan = ctx.complete_json(system, prompts::PLAN_SECTIONS_USER).await?;

        state.sections = plan
            .sections
            .into_iter()
            .filter(|s| !s.name.trim().is_empty())
            .map(|s| Section {
                content: String::new(),
                ..s
            })
            .collect();
        if state.sections.is_empty() {
            return Err(ResearchError::NoSections);
        }

        info!(
            sections = state.sections.len(),
            research = state.sections.iter().filter(|s| s.research).count(),
            "Report planned"
        );
        Ok(state)
    }
}

/// Queries for the section: grader follow-ups when present, otherwise fresh
pub struct GenerateQueries {
    pub ctx: Arc<ResearchContext>,
}

#[async_trait]
impl Node<SectionState> for GenerateQueries {
    fn name(&self) -> &str {
        "generate_queries"
    }

    async fn run(&self, mut state: SectionState) -> Result<SectionState> {
        let limit = self.ctx.config.number_of_queries;
        let follow_up = state
            .feedback
            .take()
            .map(|f| clean_queries(f.follow_up_queries, limit))
            .unwrap_or_default();

        state.queries = if follow_up.is_empty() {
            let system = self.ctx.prompts.render(
                prompts::SECTION_QUERIES,
                &json!({
                    "topic": state.topic,
                    "section_name": state.section.name,
                    "section_description": state.section.description,
                    "number_of_queries": limit,
                }),
            )?;
            let queries: Queries = self.ctx.complete_json(system, prompts::SECTION_QUERIES_USER).await?;
            clean_queries(queries.queries, limit)
        } else {
            follow_up
        };

        debug!(section = %state.section.name, queries = ?state.queries, "Section queries");
        Ok(state)
    }
}

pub struct SearchWeb {
    pub ctx: Arc<ResearchContext>,
}

#[async_trait]
impl Node<SectionState> for SearchWeb {
    fn name(&self) -> &str {
        "search_web"
    }

    async fn run(&self, mut state: SectionState) -> Result<SectionState> {
        state.sources = self.ctx.search_all(&state.queries).await?;
        Ok(state)
    }
}

/// Write (or revise) the section from the latest sources
pub struct WriteSection {
    pub ctx: Arc<ResearchContext>,
}

#[async_trait]
impl Node<SectionState> for WriteSection {
    fn name(&self) -> &str {
        "write_section"
    }

    async fn run(&self, mut state: SectionState) -> Result<SectionState> {
        let system = self.ctx.prompts.render(
            prompts::WRITE_SECTION,
            &json!({
                "topic": state.topic,
                "section_name": state.section.name,
                "section_description": state.section.description,
                "sources": state.sources,
                "existing_content": state.section.content,
            }),
        )?;
        state.section.content = self.ctx.complete_text(system, prompts::WRITE_SECTION_USER).await?;
        state.iterations += 1;
        Ok(state)
    }
}

pub struct GradeSection {
    pub ctx: Arc<ResearchContext>,
}

#[async_trait]
impl Node<SectionState> for GradeSection {
    fn name(&self) -> &str {
        "grade_section"
    }

    async fn run(&self, mut state: SectionState) -> Result<SectionState> {
        let system = self.ctx.prompts.render(
            prompts::GRADE_SECTION,
            &json!({
                "topic": state.topic,
                "section_name": state.section.name,
                "section_description": state.section.description,
                "content": state.section.content,
                "number_of_queries": self.ctx.config.number_of_queries,
            }),
        )?;
        let feedback: Feedback = self.ctx.complete_json(system, prompts::GRADE_SECTION_USER).await?;
        debug!(
            section = %state.section.name,
            iteration = state.iterations,
            grade = ?feedback.grade,
            "Section graded"
        );
        state.feedback = Some(feedback);
        Ok(state)
    }
}

/// Query, search, write and grade until the grade passes
pub fn section_graph(ctx: &Arc<ResearchContext>) -> Result<Graph<SectionState>> {
    let body = Graph::builder("section_iteration")
        .node(GenerateQueries { ctx: Arc::clone(ctx) })
        .node(SearchWeb { ctx: Arc::clone(ctx) })
        .node(WriteSection { ctx: Arc::clone(ctx) })
        .node(GradeSection { ctx: Arc::clone(ctx) })
        .build()?;

    Graph::builder("section")
        .repeat_until(body, SectionState::passed, ctx.config.max_search_depth)
        .build()
}

/// Research every `research` section in parallel
pub struct ResearchSections {
    pub ctx: Arc<ResearchContext>,
    pub section_graph: Arc<Graph<SectionState>>,
}

#[async_trait]
impl Node<ReportState> for ResearchSections {
    fn name(&self) -> &str {
        "research_sections"
    }

    async fn run(&self, mut state: ReportState) -> Result<ReportState> {
        let topic = state.topic.clone();
        let pending: Vec<(usize, Section)> = state
            .sections
            .iter()
            .enumerate()
            .filter(|(_, s)| s.research)
            .map(|(i, s)| (i, s.clone()))
            .collect();

        let done: Vec<(usize, SectionState)> = stream::iter(pending)
            .map(|(index, section)| {
                let graph = Arc::clone(&self.section_graph);
                let initial = SectionState::new(topic.clone(), section);
                async move { graph.execute(initial).await.map(|s| (index, s)) }
            })
            .buffer_unordered(self.ctx.config.concurrency)
            .try_collect()
            .await?;

        for (index, section_state) in done {
            debug!(
                section = %section_state.section.name,
                iterations = section_state.iterations,
                passed = section_state.passed(),
                "Section researched"
            );
            state.sections[index] = section_state.section;
        }
        Ok(state)
    }
}

/// Researched sections as context for the final writers
pub struct GatherSections;

#[async_trait]
impl Node<ReportState> for GatherSections {
    fn name(&self) -> &str {
        "gather_sections"
    }

    async fn run(&self, mut state: ReportState) -> Result<ReportState> {
        state.gathered = state
            .sections
            .iter()
            .filter(|s| s.research && !s.content.is_empty())
            .map(|s| {
                format!(
                    "{sep}\nSection: {name}\n{sep}\nDescription:\n{description}\nContent:\n{content}\n",
                    sep = "=".repeat(40),
                    name = s.name,
                    description = s.description,
                    content = s.content,
                )
            })
            .collect::<Vec<_>>()
            .join("\n");
        Ok(state)
    }
}

/// Write the non-research sections from the gathered context
pub struct WriteFinalSections {
    pub ctx: Arc<ResearchContext>,
}

#[async_trait]
impl Node<ReportState> for WriteFinalSections {
    fn name(&self) -> &str {
        "write_final_sections"
    }

    async fn run(&self, mut state: ReportState) -> Result<ReportState> {
        let pending: Vec<(usize, String, String)> = state
            .sections
            .iter()
            .enumerate()
            .filter(|(_, s)| !s.research)
            .map(|(index, s)| (index, s.name.clone(), s.description.clone()))
            .collect();
        let topic: Arc<str> = Arc::from(state.topic.as_str());
        let gathered: Arc<str> = Arc::from(state.gathered.as_str());

        let written: Vec<(usize, String)> = stream::iter(pending)
            .map(|(index, name, description)| {
                let ctx = Arc::clone(&self.ctx);
                let topic = Arc::clone(&topic);
                let gathered = Arc::clone(&gathered);
                async move {
                    let system = ctx.prompts.render(
                        prompts::FINAL_SECTION,
                        &json!({
                            "topic": &*topic,
                            "section_name": name,
                            "section_description": description,
                            "context": &*gathered,
                        }),
                    )?;
                    let content = ctx.complete_text(system, prompts::FINAL_SECTION_USER).await?;
                    Ok::<_, ResearchError>((index, content))
                }
            })
            .buffer_unordered(self.ctx.config.concurrency)
            .try_collect()
            .await?;

        for (index, content) in written {
            state.sections[index].content = content;
        }
        Ok(state)
    }
}

/// Join sections in plan order into one Markdown document
pub struct CompileReport;

#[async_trait]
impl Node<ReportState> for CompileReport {
    fn name(&self) -> &str {
        "compile_report"
    }

    async fn run(&self, mut state: ReportState) -> Result<ReportState> {
        let mut report = format!("# {}\n", state.topic);
        for section in &state.sections {
            report.push_str(&format!("\n## {}\n\n{}\n", section.name, section.content.trim()));
        }
        state.report = report;
        Ok(state)
    }
}
