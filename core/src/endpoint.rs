//! Entry point URL rendering from a `{placeholder}` template.
//!
//! # Design
//! The template is scanned once, left to right. A `{name}` token whose name is
//! made of ASCII alphanumerics, `_` or `-` is a placeholder and is replaced by
//! its literal value; substituted values are never scanned again. Any brace
//! that does not open such a token is copied through verbatim.
//!
//! A placeholder the template references but nobody has set is a hard
//! `ApiError::Configuration`, so a half-configured client never sends a
//! request to a URL containing `{host}`.
//!
//! Every mutation bumps `generation()`. Owners of URL-bound resources compare
//! the generation they were built at against the current one instead of being
//! notified.

use std::collections::BTreeMap;

use crate::error::ApiError;

#[derive(Debug, Clone, Default)]
pub struct EntryPointBuilder {
    template: String,
    placeholders: BTreeMap<String, String>,
    generation: u64,
    rendered: Option<String>,
}

impl EntryPointBuilder {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            ..Self::default()
        }
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn placeholder(&self, name: &str) -> Option<&str> {
        self.placeholders.get(name).map(String::as_str)
    }

    /// Counter bumped by every mutation of the template or placeholders.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn set_template(&mut self, template: impl Into<String>) {
        self.template = template.into();
        self.invalidate();
    }

    pub fn set_placeholder(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.placeholders.insert(name.into(), value.into());
        self.invalidate();
    }

    pub fn remove_placeholder(&mut self, name: &str) -> Option<String> {
        let removed = self.placeholders.remove(name);
        if removed.is_some() {
            self.invalidate();
        }
        removed
    }

    /// Render the URL, reusing the cached result until the next mutation.
    pub fn render(&mut self) -> Result<&str, ApiError> {
        if self.rendered.is_none() {
            let url = render_template(&self.template, &self.placeholders)?;
            self.rendered = Some(url);
        }
        Ok(self.rendered.as_deref().unwrap_or_default())
    }

    fn invalidate(&mut self) {
        self.generation += 1;
        self.rendered = None;
    }
}

fn render_template(
    template: &str,
    placeholders: &BTreeMap<String, String>,
) -> Result<String, ApiError> {
    let mut url = String::with_capacity(template.len());
    let mut missing: Vec<&str> = Vec::new();
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        url.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        match after.find('}') {
            Some(close) if is_placeholder_name(&after[..close]) => {
                let name = &after[..close];
                match placeholders.get(name) {
                    Some(value) => url.push_str(value),
                    None if !missing.contains(&name) => missing.push(name),
                    None => {}
                }
                rest = &after[close + 1..];
            }
            _ => {
                url.push('{');
                rest = after;
            }
        }
    }
    url.push_str(rest);

    if !missing.is_empty() {
        return Err(ApiError::Configuration(format!(
            "unresolved entry point placeholders: {}",
            missing.join(", ")
        )));
    }
    if url.is_empty() {
        return Err(ApiError::Configuration(
            "entry point template is empty".to_string(),
        ));
    }
    Ok(url)
}

fn is_placeholder_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}
