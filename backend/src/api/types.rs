//! REST API payloads.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::transform::pipeline::IngestReport;

/// Response sent after a CSV upload has been loaded.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    /// Unique job identifier
    pub job_id: String,

    /// "committed" or "warning" (committed, but cells or columns degraded to NULL)
    pub status: String,

    pub rows_read: usize,
    pub rows_committed: usize,
    pub malformed_cells: usize,
    pub missing_columns: Vec<String>,
    pub columns: Vec<String>,
}

impl From<IngestReport> for UploadResponse {
    fn from(report: IngestReport) -> Self {
        let status = if report.malformed_cells > 0 || !report.missing_columns.is_empty() {
            "warning"
        } else {
            "committed"
        };

        Self {
            job_id: Uuid::new_v4().to_string(),
            status: status.to_string(),
            rows_read: report.rows_read,
            rows_committed: report.committed,
            malformed_cells: report.malformed_cells,
            missing_columns: report.missing_columns,
            columns: report.headers,
        }
    }
}

/// Error body shared by every endpoint.
pub fn error_response(message: &str) -> Value {
    json!({
        "status": "error",
        "error": message,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_report_is_committed() {
        let response = UploadResponse::from(IngestReport {
            headers: vec!["Date".into()],
            rows_read: 3,
            committed: 3,
            ..Default::default()
        });

        assert_eq!(response.status, "committed");
        assert_eq!(response.rows_committed, 3);
        assert!(Uuid::parse_str(&response.job_id).is_ok());
    }

    #[test]
    fn test_degraded_report_is_warning() {
        let response = UploadResponse::from(IngestReport {
            malformed_cells: 2,
            rows_read: 1,
            committed: 1,
            ..Default::default()
        });
        assert_eq!(response.status, "warning");

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["malformedCells"], 2);
    }

    #[test]
    fn test_error_response_shape() {
        let body = error_response("Row 4 failed");
        assert_eq!(body["status"], "error");
        assert_eq!(body["error"], "Row 4 failed");
    }
}
