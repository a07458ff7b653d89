//! Normalization of raw process output into caller-safe text.
//!
//! Diagnostics go through an ordered table of rules. Substitutions rewrite the
//! text and let later rules run; the first replacing or extracting rule that
//! matches decides the final message.

use regex::Regex;

use crate::constants::{CORRUPTED_OUTPUT_MSG, TIMEOUT_MSG};

const BOM: char = '\u{feff}';

#[derive(Clone, Debug)]
enum Action {
    /// Rewrite every match and continue with the next rule.
    Substitute(String),
    /// Replace the whole message and stop.
    Replace(&'static str),
    /// Keep only the matched phrase and stop.
    Extract,
}

#[derive(Clone, Debug)]
struct Rule {
    name: &'static str,
    pattern: Regex,
    action: Action,
}

#[derive(Clone, Debug)]
pub struct Sanitizer {
    rules: Vec<Rule>,
}

impl Sanitizer {
    /// `source_extension` is the extension of staged sources; any path ending
    /// in it is reported as `main.<ext>`.
    pub fn new(source_extension: &str) -> Result<Self, regex::Error> {
        let rules = vec![
            Rule {
                name: "source-path",
                pattern: Regex::new(&format!(
                    r#"[^\s"']*\.{}\b"#,
                    regex::escape(source_extension)
                ))?,
                action: Action::Substitute(format!("main.{}", source_extension)),
            },
            Rule {
                name: "timeout",
                // `Killed` only counts in the shell's `<pid> Killed` job report.
                pattern: Regex::new(r"\bTerminated\b|\b\d+\s+Killed\b")?,
                action: Action::Replace(TIMEOUT_MSG),
            },
            Rule {
                name: "corrupted-stream",
                pattern: Regex::new(r"(?i)read past the end of the (input )?stream|dumped core")?,
                action: Action::Replace(CORRUPTED_OUTPUT_MSG),
            },
            Rule {
                name: "access-denied",
                pattern: Regex::new(r#"Access to the path ["'].*?["'] is denied\."#)?,
                action: Action::Extract,
            },
        ];

        Ok(Sanitizer { rules })
    }

    /// Normalizes captured stdout.
    pub fn clean_result(&self, text: &str) -> Option<String> {
        normalize(text)
    }

    /// Normalizes diagnostic text, hiding sandbox paths and mapping known
    /// failure signatures to stable messages.
    pub fn clean_error(&self, text: &str) -> Option<String> {
        let mut value = normalize(text)?;

        for rule in &self.rules {
            match &rule.action {
                Action::Substitute(replacement) => {
                    value = rule
                        .pattern
                        .replace_all(&value, replacement.as_str())
                        .into_owned();
                }
                Action::Replace(message) if rule.pattern.is_match(&value) => {
                    tracing::debug!("Diagnostic matched rule {}", rule.name);
                    return Some(message.to_string());
                }
                Action::Extract => {
                    if let Some(found) = rule.pattern.find(&value) {
                        tracing::debug!("Diagnostic matched rule {}", rule.name);
                        return Some(found.as_str().to_string());
                    }
                }
                Action::Replace(_) => {}
            }
        }

        Some(value)
    }
}

fn normalize(text: &str) -> Option<String> {
    let text = text.strip_prefix(BOM).unwrap_or(text);
    if text.trim().is_empty() {
        return None;
    }

    let value = text.replace('\r', "");
    Some(value.trim_end_matches('\n').to_string())
}
