use tracing::warn;

use crate::models::{CreatePromptRequest, Prompt};

/// Marks a variable slot in template content.
pub const PLACEHOLDER: &str = "$$";

/// Template content split around its placeholders.
///
/// `"Hello $$, how are $$"` has the static parts `["Hello ", ", how are ", ""]`
/// and two variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateContent {
    parts: Vec<String>,
}

impl TemplateContent {
    pub fn parse(content: &str) -> Self {
        Self {
            parts: content.split(PLACEHOLDER).map(str::to_string).collect(),
        }
    }

    pub fn parts(&self) -> &[String] {
        &self.parts
    }

    pub fn variable_count(&self) -> usize {
        self.parts.len() - 1
    }

    /// One empty value per variable.
    pub fn blank_values(&self) -> Vec<String> {
        vec![String::new(); self.variable_count()]
    }

    /// Interleave `values` into the static parts. Missing values render empty;
    /// extras are ignored.
    pub fn render<S: AsRef<str>>(&self, values: &[S]) -> String {
        let mut out = String::new();
        for (i, part) in self.parts.iter().enumerate() {
            out.push_str(part);
            if i < self.variable_count() {
                if let Some(value) = values.get(i) {
                    out.push_str(value.as_ref());
                }
            }
        }
        out
    }

    /// Values of a saved prompt, padded or truncated to this content's slots.
    pub fn load_values(&self, prompt: &Prompt) -> Vec<String> {
        let expected = self.variable_count();
        if prompt.variables.len() != expected {
            warn!(
                "Prompt {} has {} variables but the template has {} placeholders",
                prompt.id,
                prompt.variables.len(),
                expected
            );
        }
        let mut values = prompt.variables.clone();
        values.resize(expected, String::new());
        values
    }

    /// Payload to save `values` as a prompt of one template version.
    pub fn prompt_request(
        &self,
        template_id: &str,
        version_id: i64,
        owner_id: &str,
        values: &[String],
    ) -> CreatePromptRequest {
        let mut variables = values.to_vec();
        variables.resize(self.variable_count(), String::new());
        CreatePromptRequest {
            template_id: template_id.to_string(),
            version_id,
            owner_id: owner_id.to_string(),
            variables,
        }
    }
}
