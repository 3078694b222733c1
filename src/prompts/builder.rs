//! Layered prompt builder.
//!
//! Prompts are assembled from a stack of plain-text fragments. Each layer is
//! trimmed and appended in order; empty layers are skipped so optional
//! fragments cost nothing. Layers are joined with a blank line.
//!
//! Variable substitution uses `{{key}}` syntax and is applied once at
//! [`build()`](PromptBuilder::build) time, after all layers are joined.
//! Substitution is a single left-to-right pass: substituted values are never
//! rescanned, so user content containing `{{...}}` is inserted verbatim.

use std::collections::HashMap;

pub const SEPARATOR: &str = "\n\n";

/// Fluent builder that assembles a layered prompt from text fragments.
///
/// ```rust
/// use s2_assistant::prompts::PromptBuilder;
///
/// let prompt = PromptBuilder::new()
///     .layer("You are a helpful assistant.")
///     .layer("Summarize: {{items}}")
///     .var("items", "item 1\nitem 2")
///     .build();
/// assert!(prompt.ends_with("item 1\nitem 2"));
/// ```
#[derive(Debug, Default, Clone)]
pub struct PromptBuilder {
    parts: Vec<String>,
    vars: HashMap<String, String>,
}

impl PromptBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a text fragment. Leading/trailing whitespace is dropped and an
    /// empty fragment is skipped.
    pub fn layer(mut self, text: impl AsRef<str>) -> Self {
        let trimmed = text.as_ref().trim();
        if !trimmed.is_empty() {
            self.parts.push(trimmed.to_string());
        } else {
            tracing::trace!("prompt: empty layer skipped");
        }
        self
    }

    /// Register `{{key}}` → `value` substitution pairs applied at build time.
    pub fn with_vars<'a, I>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        for (k, v) in vars {
            self.vars.insert(k.to_string(), v.to_string());
        }
        self
    }

    /// Register a single variable.  Convenience wrapper around [`with_vars`](Self::with_vars).
    pub fn var(mut self, key: &str, value: impl Into<String>) -> Self {
        self.vars.insert(key.to_string(), value.into());
        self
    }

    /// Assemble all layers, join with blank lines, and apply variable substitution.
    pub fn build(self) -> String {
        let joined = self.parts.join(SEPARATOR);
        render(&joined, &self.vars)
    }
}

/// Replace every `{{key}}` in `template` whose key is present in `vars`.
/// Unknown placeholders are left untouched.
pub fn render(template: &str, vars: &HashMap<String, String>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after_open = &rest[start + 2..];
        match after_open.find("}}") {
            Some(end) => {
                let key = &after_open[..end];
                match vars.get(key) {
                    Some(value) => out.push_str(value),
                    None => {
                        out.push_str("{{");
                        out.push_str(key);
                        out.push_str("}}");
                    }
                }
                rest = &after_open[end + 2..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}
