// created = "2026-10-17"
// modified = "2026-10-17"
// driver = "Isaac Clayton"

//! Teacher replies and the artifacts parsed out of them.

use serde::Deserialize;
use serde::Serialize;

/// One raw reply from a teacher replica.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeacherReply {
    /// The model or service that answered.
    pub model: String,
    /// The reply body, expected but not guaranteed to be artifact JSON.
    pub content: String,
}

/// A tool invocation reported by a teacher.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub tool: String,
    #[serde(default)]
    pub args: Vec<String>,
}

/// A structured reasoning artifact.
///
/// Missing fields default to empty. A missing score is filled in from
/// configuration when the artifact is compiled.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Artifact {
    pub reasoning: Vec<String>,
    pub constraints: Vec<String>,
    pub answer: String,
    pub score: Option<f64>,
    pub tool_calls: Vec<ToolCall>,
}

/// The result of parsing a teacher reply.
#[derive(Clone, Debug, PartialEq)]
pub enum ParsedArtifact {
    /// The reply held an artifact object.
    Structured(Artifact),
    /// The reply could not be parsed; the raw text stands in as the only
    /// reasoning step and as the answer.
    Fallback { raw_text: String },
}

impl ParsedArtifact {
    /// Parse reply content.
    ///
    /// Content is tried as JSON first, then the span from the first `{` to
    /// the last `}` is tried, which covers replies wrapped in prose or code
    /// fences. Anything else is a fallback.
    pub fn parse(content: &str) -> ParsedArtifact {
        if let Some(artifact) = parse_object(content.trim()) {
            return ParsedArtifact::Structured(artifact);
        }
        if let (Some(start), Some(end)) = (content.find('{'), content.rfind('}')) {
            if start < end {
                if let Some(artifact) = parse_object(&content[start..=end]) {
                    return ParsedArtifact::Structured(artifact);
                }
            }
        }
        tracing::debug!(len = content.len(), "reply is not an artifact, using fallback");
        return ParsedArtifact::Fallback {
            raw_text: content.to_string(),
        };
    }

    pub fn is_fallback(&self) -> bool {
        return matches!(self, ParsedArtifact::Fallback { .. });
    }

    /// View this artifact as structured, resolving the fallback case with
    /// `fallback_score` for a missing or fallback score.
    pub fn resolve(&self, fallback_score: f64) -> Artifact {
        return match self {
            ParsedArtifact::Structured(artifact) => Artifact {
                score: Some(artifact.score.unwrap_or(fallback_score)),
                ..artifact.clone()
            },
            ParsedArtifact::Fallback { raw_text } => Artifact {
                reasoning: vec![raw_text.clone()],
                constraints: Vec::new(),
                answer: raw_text.clone(),
                score: Some(fallback_score),
                tool_calls: Vec::new(),
            },
        };
    }
}

impl From<Artifact> for ParsedArtifact {
    fn from(artifact: Artifact) -> Self {
        return ParsedArtifact::Structured(artifact);
    }
}

fn parse_object(text: &str) -> Option<Artifact> {
    // Only objects count; a bare string or number is not an artifact.
    if !text.starts_with('{') {
        return None;
    }
    return serde_json::from_str(text).ok();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_artifact() {
        let parsed = ParsedArtifact::parse(
            r#"{"reasoning": ["a", "b"], "constraints": ["c"], "answer": "d", "score": 0.7,
                "tool_calls": [{"tool": "search", "args": ["sky"]}]}"#,
        );
        let ParsedArtifact::Structured(artifact) = parsed else {
            panic!("expected structured artifact");
        };
        assert_eq!(artifact.reasoning, vec!["a", "b"]);
        assert_eq!(artifact.constraints, vec!["c"]);
        assert_eq!(artifact.answer, "d");
        assert_eq!(artifact.score, Some(0.7));
        assert_eq!(artifact.tool_calls[0].tool, "search");
        assert_eq!(artifact.tool_calls[0].args, vec!["sky"]);
    }

    #[test]
    fn missing_fields_default() {
        let parsed = ParsedArtifact::parse(r#"{"answer": "x"}"#);
        let artifact = parsed.resolve(0.1);
        assert!(artifact.reasoning.is_empty());
        assert_eq!(artifact.answer, "x");
        assert_eq!(artifact.score, Some(0.1));
    }

    #[test]
    fn fenced_json_is_structured() {
        let parsed = ParsedArtifact::parse("```json\n{\"answer\": \"fenced\", \"score\": 0.5}\n```");
        assert!(!parsed.is_fallback());
        assert_eq!(parsed.resolve(0.1).answer, "fenced");
    }

    #[test]
    fn plain_text_falls_back() {
        let parsed = ParsedArtifact::parse("the sky is blue");
        assert_eq!(
            parsed,
            ParsedArtifact::Fallback {
                raw_text: "the sky is blue".to_string()
            }
        );
        let artifact = parsed.resolve(0.1);
        assert_eq!(artifact.reasoning, vec!["the sky is blue"]);
        assert_eq!(artifact.answer, "the sky is blue");
        assert_eq!(artifact.score, Some(0.1));
    }

    #[test]
    fn malformed_json_falls_back() {
        assert!(ParsedArtifact::parse(r#"{"reasoning": "#).is_fallback());
        assert!(ParsedArtifact::parse(r#"{"reasoning": "not a list"}"#).is_fallback());
        assert!(ParsedArtifact::parse("42").is_fallback());
        assert!(ParsedArtifact::parse("").is_fallback());
    }
}
