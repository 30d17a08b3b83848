//! Prompt template management
//!
//! Every LLM call in the workspace renders its system and user prompts from
//! named Jinja2 templates held in a [`PromptRegistry`]. Templates are parsed
//! when they are created and rendered with strict undefined-variable
//! handling, so a missing input is an error instead of an empty string in
//! front of a model.
//!
//! ```
//! use fin_prompt::{JinjaTemplate, PromptRegistry};
//! use serde_json::json;
//!
//! let registry = PromptRegistry::new();
//! registry.register(JinjaTemplate::new("greet", "Analyze {{ symbol | upper }}").unwrap());
//!
//! let prompt = registry.render("greet", &json!({ "symbol": "aapl" })).unwrap();
//! assert_eq!(prompt, "Analyze AAPL");
//! ```

mod error;
mod registry;
mod template;

pub use error::{PromptError, Result};
pub use registry::PromptRegistry;
pub use template::{JinjaTemplate, PromptTemplate};
