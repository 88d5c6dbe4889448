//! JSON extraction from model responses
//!
//! Models wrap JSON in markdown fences or surrounding prose despite
//! instructions. Extraction strategy, in order: the whole trimmed content,
//! a ```json fenced block, any fenced block, then the first valid JSON
//! value found in the text.

use serde::de::DeserializeOwned;

use crate::domain::LlmError;

pub struct ResponseParser;

impl ResponseParser {
    /// Parse a typed value out of a model response.
    pub fn parse_json<T: DeserializeOwned>(content: &str) -> Result<T, LlmError> {
        let trimmed = content.trim();
        if let Ok(parsed) = serde_json::from_str::<T>(trimmed) {
            return Ok(parsed);
        }

        if let Some(block) = Self::extract_fenced_block(trimmed, Some("json")) {
            if let Ok(parsed) = serde_json::from_str::<T>(&block) {
                return Ok(parsed);
            }
        }

        if let Some(block) = Self::extract_fenced_block(trimmed, None) {
            if let Ok(parsed) = serde_json::from_str::<T>(&block) {
                return Ok(parsed);
            }
        }

        if let Some(value) = Self::extract_first_json_value(trimmed) {
            if let Ok(parsed) = serde_json::from_str::<T>(&value) {
                return Ok(parsed);
            }
        }

        Err(LlmError::InvalidResponse(
            "Failed to extract valid JSON from LLM response".to_string(),
        ))
    }

    /// First valid JSON object or array embedded in free text.
    pub fn extract_first_json_value(content: &str) -> Option<String> {
        for (idx, ch) in content.char_indices() {
            if ch == '{' || ch == '[' {
                let candidate = &content[idx..];
                let mut stream =
                    serde_json::Deserializer::from_str(candidate).into_iter::<serde_json::Value>();
                if let Some(Ok(_)) = stream.next() {
                    let end = stream.byte_offset();
                    if end > 0 && end <= candidate.len() {
                        return Some(candidate[..end].to_string());
                    }
                }
            }
        }
        None
    }

    fn extract_fenced_block(content: &str, language: Option<&str>) -> Option<String> {
        let fence = "```";
        let mut search = content;

        loop {
            let start = search.find(fence)?;
            let after_start = &search[start + fence.len()..];

            let (lang_tag, rest) = match after_start.find('\n') {
                Some(line_end) => (after_start[..line_end].trim(), &after_start[line_end + 1..]),
                None => return None,
            };

            if let Some(expected) = language {
                if !lang_tag.eq_ignore_ascii_case(expected) {
                    search = after_start;
                    continue;
                }
            }

            let end = rest.find(fence)?;
            return Some(rest[..end].trim().to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(serde::Deserialize, Debug, PartialEq)]
    struct Payload {
        key: String,
    }

    #[test]
    fn test_parse_direct_json() {
        let parsed: Payload = ResponseParser::parse_json(r#"{ "key": "value" }"#).unwrap();
        assert_eq!(parsed.key, "value");
    }

    #[test]
    fn test_parse_fenced_json() {
        let content = "Here is the result:\n```json\n{ \"key\": \"fenced\" }\n```\nDone.";
        let parsed: Payload = ResponseParser::parse_json(content).unwrap();
        assert_eq!(parsed.key, "fenced");
    }

    #[test]
    fn test_parse_unlabelled_fence() {
        let content = "```\n{ \"key\": \"plain\" }\n```";
        let parsed: Payload = ResponseParser::parse_json(content).unwrap();
        assert_eq!(parsed.key, "plain");
    }

    #[test]
    fn test_parse_embedded_json() {
        let content = "The answer is { \"key\": \"embedded\" } as requested.";
        let parsed: Payload = ResponseParser::parse_json(content).unwrap();
        assert_eq!(parsed.key, "embedded");
    }

    #[test]
    fn test_garbage_is_rejected() {
        let result: Result<Payload, _> = ResponseParser::parse_json("no json here at all");
        assert!(result.is_err());
    }
}
