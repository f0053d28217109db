//! Prompt templates for Referat.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Collection of all prompt templates.
///
/// Templates may reference variables as `{{name}}`; see the render methods
/// for the variables each template receives.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Prompts {
    /// Prompt sent together with an uploaded audio slice.
    pub transcription: String,
    /// Prompt for summarizing one slice transcript.
    pub slice_summary: String,
    /// Prompt for reducing all slice summaries into the final document.
    pub final_summary: String,
}

impl Default for Prompts {
    fn default() -> Self {
        Self {
            transcription: "Generate a transcript of the speech.".to_string(),

            slice_summary: r#"Generate a concise summary of the following text, covering:
1. An overview of the main content
2. The key points (3-5)
3. Important decisions or conclusions, if any

Text:
---
{{transcript}}
---

Summary:"#
                .to_string(),

            final_summary: r#"Based on the following segment summaries, produce one complete, structured final summary.

Requirements:
1. Open with an overview of the overall subject
2. Merge the key points across segments, removing duplicates
3. Call out important decisions, conclusions, and action items
4. Preserve logical order and coherence
5. Use clear headings and structure

Segment summaries:
---
{{summaries}}
---

Final summary:"#
                .to_string(),
        }
    }
}

impl Prompts {
    /// Substitute `{{name}}` placeholders in a template.
    pub fn render(template: &str, vars: &HashMap<String, String>) -> String {
        let mut result = template.to_string();
        for (key, value) in vars {
            result = result.replace(&format!("{{{{{}}}}}", key), value);
        }
        result
    }

    /// Render the slice-summary prompt for a transcript.
    pub fn slice_summary_prompt(&self, transcript: &str) -> String {
        let mut vars = HashMap::new();
        vars.insert("transcript".to_string(), transcript.to_string());
        Self::render(&self.slice_summary, &vars)
    }

    /// Render the final-summary prompt over the joined slice summaries.
    pub fn final_summary_prompt(&self, summaries: &str) -> String {
        let mut vars = HashMap::new();
        vars.insert("summaries".to_string(), summaries.to_string());
        Self::render(&self.final_summary, &vars)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slice_summary_substitution() {
        let prompts = Prompts::default();
        let rendered = prompts.slice_summary_prompt("hello world");

        assert!(rendered.contains("hello world"));
        assert!(!rendered.contains("{{transcript}}"));
    }

    #[test]
    fn test_final_summary_substitution() {
        let prompts = Prompts::default();
        let rendered = prompts.final_summary_prompt("a\n\nb");

        assert!(rendered.contains("a\n\nb"));
        assert!(!rendered.contains("{{summaries}}"));
    }
}
