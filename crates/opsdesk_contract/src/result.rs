use serde::{Deserialize, Serialize};

use crate::record::FileRecord;

pub const ACKNOWLEDGE_REJECTED: &str = "File not found or already acknowledged";
pub const TRANSFER_REJECTED: &str = "File not ready for transfer";

/// Outcome of a mutating ops call. Callers must check `success` before
/// touching local state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OperationResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<FileRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl OperationResult {
    pub fn ok(file: FileRecord) -> Self {
        Self {
            success: true,
            file: Some(file),
            error: None,
        }
    }

    /// Success with no payload, as returned for empty response bodies.
    pub fn ok_empty() -> Self {
        Self {
            success: true,
            file: None,
            error: None,
        }
    }

    pub fn rejected(error: impl Into<String>) -> Self {
        Self {
            success: false,
            file: None,
            error: Some(error.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{OperationResult, TRANSFER_REJECTED};
    use serde_json::json;

    #[test]
    fn rejection_serializes_without_file() {
        let value = serde_json::to_value(OperationResult::rejected(TRANSFER_REJECTED))
            .expect("encode");
        assert_eq!(
            value,
            json!({ "success": false, "error": "File not ready for transfer" })
        );
    }

    #[test]
    fn bare_success_flag_decodes() {
        let decoded: OperationResult =
            serde_json::from_value(json!({ "success": true })).expect("decode");
        assert_eq!(decoded, OperationResult::ok_empty());
    }
}
