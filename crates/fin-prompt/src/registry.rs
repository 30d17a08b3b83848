//! Shared registry of named prompt templates

use crate::{PromptError, PromptTemplate, Result};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Thread-safe store of templates keyed by name
///
/// Registering a template under an existing name replaces it.
#[derive(Clone, Default)]
pub struct PromptRegistry {
    templates: Arc<RwLock<HashMap<String, Arc<dyn PromptTemplate>>>>,
}

impl PromptRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a template
    pub fn register<T: PromptTemplate + 'static>(&self, template: T) {
        let name = template.name().to_string();
        if let Ok(mut templates) = self.templates.write() {
            templates.insert(name, Arc::new(template));
        }
    }

    /// Get a template by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn PromptTemplate>> {
        self.templates.read().ok()?.get(name).cloned()
    }

    /// Check if a template exists
    pub fn contains(&self, name: &str) -> bool {
        self.templates
            .read()
            .map(|t| t.contains_key(name))
            .unwrap_or(false)
    }

    /// Render a registered template
    pub fn render(&self, name: &str, vars: &serde_json::Value) -> Result<String> {
        let template = self
            .get(name)
            .ok_or_else(|| PromptError::TemplateNotRegistered(name.to_string()))?;
        template.render(vars)
    }

    /// Names of all registered templates, sorted
    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .templates
            .read()
            .map(|t| t.keys().cloned().collect())
            .unwrap_or_default();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.templates.read().map(|t| t.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for PromptRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PromptRegistry")
            .field("templates", &self.list())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::JinjaTemplate;
    use serde_json::json;

    #[test]
    fn test_register_and_render() {
        let registry = PromptRegistry::new();
        registry.register(JinjaTemplate::new("a", "A={{ x }}").unwrap());
        registry.register(JinjaTemplate::new("b", "B").unwrap());

        assert_eq!(registry.len(), 2);
        assert!(registry.contains("a"));
        assert_eq!(registry.list(), vec!["a".to_string(), "b".to_string()]);
        assert_eq!(registry.render("a", &json!({"x": 5})).unwrap(), "A=5");
    }

    #[test]
    fn test_missing_template() {
        let registry = PromptRegistry::new();
        assert!(registry.is_empty());
        let result = registry.render("nope", &json!({}));
        assert!(matches!(result, Err(PromptError::TemplateNotRegistered(n)) if n == "nope"));
    }

    #[test]
    fn test_replace_existing() {
        let registry = PromptRegistry::new();
        registry.register(JinjaTemplate::new("a", "old").unwrap());
        registry.register(JinjaTemplate::new("a", "new").unwrap());
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.render("a", &json!({})).unwrap(), "new");
    }

    #[test]
    fn test_clones_share_storage() {
        let registry = PromptRegistry::new();
        let clone = registry.clone();
        clone.register(JinjaTemplate::new("shared", "x").unwrap());
        assert!(registry.contains("shared"));
    }
}
