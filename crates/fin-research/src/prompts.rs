//! Prompt templates for report generation

use fin_prompt::{JinjaTemplate, PromptRegistry, Result};

pub const PLAN_QUERIES: &str = "research.plan_queries";
pub const PLAN_SECTIONS: &str = "research.plan_sections";
pub const SECTION_QUERIES: &str = "research.section_queries";
pub const WRITE_SECTION: &str = "research.write_section";
pub const GRADE_SECTION: &str = "research.grade_section";
pub const FINAL_SECTION: &str = "research.final_section";

/// Short user turn paired with each system prompt
pub const PLAN_QUERIES_USER: &str =
    "Generate search queries that will help with planning the sections of the report.";
pub const PLAN_SECTIONS_USER: &str = "Generate the sections of the report. Reply with JSON only.";
pub const SECTION_QUERIES_USER: &str = "Generate search queries on the provided topic.";
pub const WRITE_SECTION_USER: &str = "Write the report section based on the provided sources.";
pub const GRADE_SECTION_USER: &str =
    "Grade the report section and suggest follow-up queries for missing information.";
pub const FINAL_SECTION_USER: &str = "Write the report section based on the provided context.";

const PLAN_QUERIES_TEMPLATE: &str = r#"You are an expert financial writer helping to plan a report.

<Report topic>
{{ topic }}
</Report topic>

<Report organization>
{{ report_structure }}
</Report organization>

Generate {{ number_of_queries }} web search queries that will help gather
information for planning the report sections. The queries should relate to
the topic and help satisfy the report organization, and be specific enough
to find recent, high-quality sources.

Reply with JSON only: {"queries": ["...", "..."]}"#;

const PLAN_SECTIONS_TEMPLATE: &str = r#"You are an expert financial writer planning a report.

<Report topic>
{{ topic }}
</Report topic>

<Report organization>
{{ report_structure }}
</Report organization>

<Context>
{{ sources }}
</Context>

Produce the list of report sections. Each section has:
- "name": name of the section
- "description": brief overview of the main topics it covers
- "research": whether web research is needed for it (introduction and
  conclusion do not need research)

Keep sections focused and avoid overlap between them.

Reply with JSON only:
{"sections": [{"name": "...", "description": "...", "research": true}]}"#;

const SECTION_QUERIES_TEMPLATE: &str = r#"You are an expert financial writer crafting targeted web search queries
for one section of a report on {{ topic }}.

<Section topic>
{{ section_name }}: {{ section_description }}
</Section topic>

Generate {{ number_of_queries }} search queries that together cover the
section topic comprehensively: specific facts, recent data, expert views.

Reply with JSON only: {"queries": ["...", "..."]}"#;

const WRITE_SECTION_TEMPLATE: &str = r####"You are an expert financial writer writing one section of a report on {{ topic }}.

<Section>
{{ section_name }}: {{ section_description }}
</Section>
{% if existing_content %}
<Existing section content>
{{ existing_content }}
</Existing section content>
Improve the existing content with the new sources.
{% endif %}
<Sources>
{{ sources }}
</Sources>

Guidelines:
- 150-300 words, plain and precise language
- Start with the single most important insight in bold
- Cite concrete figures where the sources give them
- End with a "### Sources" list of the URLs you used
- Do not repeat the section name as a heading

Reply with the section text in Markdown only."####;

const GRADE_SECTION_TEMPLATE: &str = r#"Review a report section on {{ topic }}.

<Section topic>
{{ section_name }}: {{ section_description }}
</Section topic>

<Section content>
{{ content }}
</Section content>

Grade whether the content adequately addresses the section topic. If it
does not, generate {{ number_of_queries }} follow-up search queries that
would gather the missing information.

Reply with JSON only:
{"grade": "pass" | "fail", "follow_up_queries": ["..."]}"#;

const FINAL_SECTION_TEMPLATE: &str = r#"You are an expert financial writer synthesizing one section of a report on {{ topic }}
from the researched sections.

<Section>
{{ section_name }}: {{ section_description }}
</Section>

<Researched sections>
{{ context }}
</Researched sections>

For an introduction: 50-100 words, no structural elements, motivate the
report. For a conclusion: 100-150 words, include at most one table or list
that distills the report, end with concrete next steps or implications.
Do not repeat the section name as a heading and do not list sources.

Reply with the section text in Markdown only."#;

/// Register the report templates
pub fn register(registry: &PromptRegistry) -> Result<()> {
    for (name, source) in [
        (PLAN_QUERIES, PLAN_QUERIES_TEMPLATE),
        (PLAN_SECTIONS, PLAN_SECTIONS_TEMPLATE),
        (SECTION_QUERIES, SECTION_QUERIES_TEMPLATE),
        (WRITE_SECTION, WRITE_SECTION_TEMPLATE),
        (GRADE_SECTION, GRADE_SECTION_TEMPLATE),
        (FINAL_SECTION, FINAL_SECTION_TEMPLATE),
    ] {
        registry.register(JinjaTemplate::new(name, source)?);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_write_section_existing_content_block() {
        let registry = PromptRegistry::new();
        register(&registry).unwrap();

        let vars = |existing: &str| {
            json!({
                "topic": "NVIDIA",
                "section_name": "Margins",
                "section_description": "Gross margin trend",
                "sources": "Source: x",
                "existing_content": existing,
            })
        };
        let fresh = registry.render(WRITE_SECTION, &vars("")).unwrap();
        assert!(!fresh.contains("Existing section content"));
        assert!(fresh.contains("End with a \"### Sources\" list"));
        assert!(fresh.trim_end().ends_with("Markdown only."));

        let revised = registry.render(WRITE_SECTION, &vars("draft text")).unwrap();
        assert!(revised.contains("draft text"));
    }

    #[test]
    fn test_missing_variable_fails() {
        let registry = PromptRegistry::new();
        register(&registry).unwrap();
        assert!(registry.render(PLAN_QUERIES, &json!({"topic": "x"})).is_err());
    }
}
