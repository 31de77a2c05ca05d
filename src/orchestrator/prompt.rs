use crate::context::ContextEntry;
use regex::Regex;

/// Build the text sent to every backend.
///
/// Layout: optional persona, blank line, then one `"{speaker}: {text}"` line
/// per context entry followed by the new input.
pub fn compose_prompt(persona: Option<&str>, context: &[ContextEntry], user_text: &str) -> String {
    let mut lines: Vec<String> = context.iter().map(ContextEntry::render).collect();
    lines.push(user_text.to_string());
    let body = lines.join("\n");

    match persona.map(str::trim).filter(|p| !p.is_empty()) {
        Some(persona) => format!("{}\n\n{}", persona, body),
        None => body,
    }
}

/// Removes role labels that providers echo at the start of a reply
/// (`"Assistant: ..."`, `"AI: ..."`, the bot's own name).
#[derive(Debug, Clone)]
pub struct LabelStripper {
    pattern: Option<Regex>,
}

impl LabelStripper {
    /// Labels are matched case-insensitively, with or without a trailing colon
    /// in the configured string.
    pub fn new<I, S>(labels: I) -> Result<Self, regex::Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let alternatives: Vec<String> = labels
            .into_iter()
            .map(|label| label.as_ref().trim().trim_end_matches(':').trim().to_string())
            .filter(|label| !label.is_empty())
            .map(|label| regex::escape(&label))
            .collect();

        if alternatives.is_empty() {
            return Ok(Self { pattern: None });
        }

        let pattern = Regex::new(&format!(r"(?i)^\s*(?:{})\s*:\s*", alternatives.join("|")))?;
        Ok(Self {
            pattern: Some(pattern),
        })
    }

    pub fn strip<'a>(&self, text: &'a str) -> &'a str {
        let mut rest = text.trim();
        if let Some(pattern) = &self.pattern {
            while let Some(found) = pattern.find(rest) {
                rest = rest[found.end()..].trim_start();
            }
        }
        rest.trim_end()
    }

    /// Stripped text, or `None` when nothing usable is left.
    pub fn clean(&self, text: &str) -> Option<String> {
        let stripped = self.strip(text);
        if stripped.is_empty() {
            None
        } else {
            Some(stripped.to_string())
        }
    }
}
