//! Extraction of the structured report block from an assistant reply.
//!
//! The assistant is prompted to finish intake by emitting the sentinel
//! followed by a JSON object. This module only parses; the session decides
//! what to do with the result.

use serde::{Deserialize, Serialize};
use urban_core::{ReportDraft, DEFAULT_ISSUE_TYPE, FINAL_REPORT_SENTINEL};

use crate::error::ChatError;

/// Report fields collected by the assistant.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalReport {
    pub name: String,
    #[serde(rename = "issueType")]
    pub issue_type: String,
    pub location: String,
    pub description: String,
}

impl FinalReport {
    /// Convert into a draft ready for the report store.
    pub fn into_draft(self) -> ReportDraft {
        let issue_type = if self.issue_type.trim().is_empty() {
            DEFAULT_ISSUE_TYPE.to_string()
        } else {
            self.issue_type
        };
        ReportDraft {
            reporter: self.name,
            issue_type,
            location: self.location,
            description: self.description,
            photo_url: None,
        }
    }
}

/// Look for a final report in `reply`.
///
/// Returns `Ok(None)` when the sentinel is absent. When it is present, the
/// first `{` through the last `}` after it must parse as a [`FinalReport`];
/// code fences or stray whitespace around the object are tolerated.
pub fn extract_final_report(reply: &str) -> Result<Option<FinalReport>, ChatError> {
    let Some(pos) = reply.find(FINAL_REPORT_SENTINEL) else {
        return Ok(None);
    };
    let rest = &reply[pos + FINAL_REPORT_SENTINEL.len()..];

    let (start, end) = match (rest.find('{'), rest.rfind('}')) {
        (Some(start), Some(end)) if start < end => (start, end),
        _ => {
            return Err(ChatError::MalformedReport(
                "no JSON object after sentinel".to_string(),
            ))
        }
    };

    serde_json::from_str(&rest[start..=end])
        .map(Some)
        .map_err(|e| ChatError::MalformedReport(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const BLOCK: &str = r##"#FINAL_REPORT
{"name": "Asha", "issueType": "Pothole", "location": "5th and Main", "description": "Deep pothole in the left lane"}"##;

    #[test]
    fn test_plain_reply_has_no_report() {
        assert_eq!(extract_final_report("Where exactly is it?").unwrap(), None);
        assert_eq!(extract_final_report("").unwrap(), None);
    }

    #[test]
    fn test_extracts_report() {
        let report = extract_final_report(BLOCK).unwrap().unwrap();
        assert_eq!(report.name, "Asha");
        assert_eq!(report.issue_type, "Pothole");
        assert_eq!(report.location, "5th and Main");
        assert_eq!(report.description, "Deep pothole in the left lane");
    }

    #[test]
    fn test_tolerates_code_fence() {
        let reply = "#FINAL_REPORT\n```json\n{\"name\":\"A\",\"issueType\":\"Streetlight\",\"location\":\"Park Rd\",\"description\":\"Out\"}\n```";
        let report = extract_final_report(reply).unwrap().unwrap();
        assert_eq!(report.issue_type, "Streetlight");
    }

    #[test]
    fn test_sentinel_without_object_is_malformed() {
        let err = extract_final_report("#FINAL_REPORT coming soon").unwrap_err();
        assert!(matches!(err, ChatError::MalformedReport(_)));
    }

    #[test]
    fn test_missing_field_is_malformed() {
        let reply = r#"#FINAL_REPORT {"name": "A", "issueType": "Pothole"}"#;
        let err = extract_final_report(reply).unwrap_err();
        assert!(err.to_string().contains("location"));
    }

    #[test]
    fn test_into_draft() {
        let draft = extract_final_report(BLOCK).unwrap().unwrap().into_draft();
        assert_eq!(draft.reporter, "Asha");
        assert_eq!(draft.issue_type, "Pothole");
        assert_eq!(draft.photo_url, None);
    }

    #[test]
    fn test_blank_issue_type_defaults() {
        let report = FinalReport {
            name: "A".to_string(),
            issue_type: " ".to_string(),
            location: "L".to_string(),
            description: "D".to_string(),
        };
        assert_eq!(report.into_draft().issue_type, DEFAULT_ISSUE_TYPE);
    }
}
