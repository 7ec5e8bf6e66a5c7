//! User-defined detections and their compiled form.

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

use super::DetectionError;
use crate::events::EventKind;

/// How a custom detection matches a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectionType {
    /// `pattern` is a regular expression; the template may use `{0}`, `{1}`, ...
    Regex,
    /// `pattern` is a plain substring; the template is used verbatim.
    Keyword,
}

/// A user-defined detection as stored and exchanged over HTTP.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomDetection {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type")]
    pub detection_type: DetectionType,
    pub pattern: String,
    pub event_type: EventKind,
    pub message: String,
}

#[derive(Debug, Clone)]
enum Matcher {
    Regex(Regex),
    Keyword(String),
}

/// A compiled custom detection, ready for the classification loop.
#[derive(Debug, Clone)]
pub struct CustomPattern {
    matcher: Matcher,
    kind: EventKind,
    template: String,
}

impl CustomPattern {
    /// Compile a detection. Fails only for a malformed regex.
    pub fn compile(detection: &CustomDetection) -> Result<Self, DetectionError> {
        let matcher = match detection.detection_type {
            DetectionType::Regex => Matcher::Regex(Regex::new(&detection.pattern).map_err(
                |e| DetectionError::InvalidPattern {
                    pattern: detection.pattern.clone(),
                    reason: e.to_string(),
                },
            )?),
            DetectionType::Keyword => Matcher::Keyword(detection.pattern.clone()),
        };
        Ok(Self {
            matcher,
            kind: detection.event_type.clone(),
            template: detection.message.clone(),
        })
    }

    pub const fn kind(&self) -> &EventKind {
        &self.kind
    }

    /// Rendered message if `line` matches, `None` otherwise.
    pub fn apply(&self, line: &str) -> Option<String> {
        match &self.matcher {
            Matcher::Regex(regex) => regex
                .captures(line)
                .map(|caps| format_message(&self.template, &caps)),
            Matcher::Keyword(keyword) => line
                .contains(keyword.as_str())
                .then(|| self.template.clone()),
        }
    }
}

/// Substitute `{0}` (whole match) and `{1..}` (capture groups) into `template`.
///
/// Groups that did not participate in the match substitute as empty text.
/// Placeholders beyond the last group are left untouched.
pub fn format_message(template: &str, captures: &Captures<'_>) -> String {
    let mut message = template.to_string();
    for i in 0..captures.len() {
        let value = captures.get(i).map_or("", |m| m.as_str());
        message = message.replace(&format!("{{{i}}}"), value);
    }
    message
}
