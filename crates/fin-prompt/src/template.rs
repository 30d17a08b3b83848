//! Prompt template trait and the MiniJinja-backed implementation

use crate::{PromptError, Result};
use minijinja::{Environment, UndefinedBehavior};

/// A named, renderable prompt
///
/// Variables are passed as `serde_json::Value` to keep the trait
/// dyn-compatible.
pub trait PromptTemplate: Send + Sync {
    /// Template name/identifier
    fn name(&self) -> &str;

    /// Render the template with variables
    fn render(&self, vars: &serde_json::Value) -> Result<String>;

    /// Raw template source
    fn source(&self) -> &str;
}

/// A prompt template backed by MiniJinja
///
/// Standard Jinja2 syntax applies: `{{ var }}`, filters such as
/// `{{ name | upper }}`, `{% if %}` and `{% for %}` blocks. A `json` filter
/// pretty-prints structured values for embedding in prompts.
pub struct JinjaTemplate {
    name: String,
    source: String,
}

impl JinjaTemplate {
    /// Create a template, validating its syntax immediately
    pub fn new(name: impl Into<String>, source: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let source = source.into();

        environment()
            .template_from_str(&source)
            .map_err(|e| PromptError::TemplateParseFailed {
                name: name.clone(),
                detail: e.to_string(),
            })?;

        Ok(Self { name, source })
    }
}

fn environment() -> Environment<'static> {
    let mut env = Environment::new();
    env.set_undefined_behavior(UndefinedBehavior::Strict);
    env.add_filter("json", |value: minijinja::Value| {
        serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string())
    });
    env
}

impl PromptTemplate for JinjaTemplate {
    fn name(&self) -> &str {
        &self.name
    }

    fn render(&self, vars: &serde_json::Value) -> Result<String> {
        let env = environment();
        let context = minijinja::Value::from_serialize(vars);

        env.render_str(&self.source, context)
            .map_err(|e| PromptError::RenderError {
                name: self.name.clone(),
                detail: e.to_string(),
            })
    }

    fn source(&self) -> &str {
        &self.source
    }
}

impl std::fmt::Debug for JinjaTemplate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JinjaTemplate")
            .field("name", &self.name)
            .field("len", &self.source.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_render_variables_and_filters() {
        let template = JinjaTemplate::new("t", "{{ symbol | upper }} on {{ date }}").unwrap();
        let out = template
            .render(&json!({ "symbol": "msft", "date": "2024-05-01" }))
            .unwrap();
        assert_eq!(out, "MSFT on 2024-05-01");
    }

    #[test]
    fn test_loops_and_conditionals() {
        let template = JinjaTemplate::new(
            "sections",
            "{% for s in sections %}{% if s.research %}* {% endif %}{{ s.name }}\n{% endfor %}",
        )
        .unwrap();
        let out = template
            .render(&json!({ "sections": [
                {"name": "Intro", "research": false},
                {"name": "Market", "research": true}
            ]}))
            .unwrap();
        assert_eq!(out, "Intro\n* Market\n");
    }

    #[test]
    fn test_json_filter() {
        let template = JinjaTemplate::new("j", "{{ data | json }}").unwrap();
        let out = template.render(&json!({ "data": {"a": 1} })).unwrap();
        assert!(out.contains("\"a\": 1"));
    }

    #[test]
    fn test_parse_error_is_reported_early() {
        let result = JinjaTemplate::new("broken", "{% if x %}never closed");
        assert!(matches!(result, Err(PromptError::TemplateParseFailed { .. })));
    }

    #[test]
    fn test_undefined_variable_is_error() {
        let template = JinjaTemplate::new("t", "Hello {{ missing }}").unwrap();
        let result = template.render(&json!({}));
        assert!(matches!(result, Err(PromptError::RenderError { .. })));
    }
}
