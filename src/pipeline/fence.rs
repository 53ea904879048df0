//! Code fence unwrapping for model output.
//!
//! Models often wrap JSON answers in a Markdown block tagged `json`. This step
//! only removes that wrapper; it never looks inside, so a bad payload is the
//! parser's failure, not this module's. It is not a Markdown parser: only a
//! leading `` ```json `` opener and a trailing `` ``` `` closer are handled.

const JSON_FENCE_OPEN: &str = "```json";
const FENCE_CLOSE: &str = "```";

/// Strip a leading JSON fence opener and a trailing fence closer, if present.
///
/// Surrounding whitespace is trimmed first so a newline before the opener or
/// after the closer does not hide it. Each marker is stripped independently.
pub fn unwrap_code_fence(text: &str) -> &str {
    let mut body = text.trim();
    if let Some(rest) = body.strip_prefix(JSON_FENCE_OPEN) {
        body = rest.trim();
    }
    if let Some(rest) = body.strip_suffix(FENCE_CLOSE) {
        body = rest.trim();
    }
    body
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unwraps_fenced_json() {
        assert_eq!(unwrap_code_fence("```json\n{\"a\": 1}\n```"), "{\"a\": 1}");
    }

    #[test]
    fn plain_text_is_untouched() {
        assert_eq!(unwrap_code_fence("{\"a\": 1}"), "{\"a\": 1}");
    }

    #[test]
    fn trailing_newline_after_closer() {
        assert_eq!(unwrap_code_fence("```json\n{}\n```\n"), "{}");
    }

    #[test]
    fn leading_whitespace_before_opener() {
        assert_eq!(unwrap_code_fence("\n```json\n{}\n```"), "{}");
        assert_eq!(unwrap_code_fence("  \n```json {} ```  \n"), "{}");
        assert_eq!(unwrap_code_fence("\t```JSON {}"), "```JSON {}");
    }

    #[test]
    fn opener_without_closer() {
        assert_eq!(unwrap_code_fence("```json\n{\"presence\": \"yes\","), "{\"presence\": \"yes\",");
    }

    #[test]
    fn closer_without_opener() {
        assert_eq!(unwrap_code_fence("{}\n```"), "{}");
    }

    #[test]
    fn untagged_opener_is_not_stripped() {
        assert_eq!(unwrap_code_fence("```\n{}\n```"), "```\n{}");
    }

    #[test]
    fn uppercase_tag_is_not_stripped() {
        assert_eq!(unwrap_code_fence("```JSON\n{}\n```"), "```JSON\n{}");
    }

    #[test]
    fn inner_fences_are_left_alone() {
        let text = "```json\n{\"rationale\": \"see ``` marks\"}\n```";
        assert_eq!(unwrap_code_fence(text), "{\"rationale\": \"see ``` marks\"}");
    }

    #[test]
    fn bare_markers_collapse_to_empty() {
        assert_eq!(unwrap_code_fence("```json```"), "");
        assert_eq!(unwrap_code_fence("```json"), "");
        assert_eq!(unwrap_code_fence(""), "");
    }

    #[test]
    fn unwrapping_is_idempotent_on_payload() {
        let once = unwrap_code_fence("```json\n{\"x\": [1, 2]}\n```");
        assert_eq!(unwrap_code_fence(once), once);
    }
}
