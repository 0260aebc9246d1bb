//! Wire types shared between the server and its clients.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod accounting {
    use super::*;

    /// Response body after queuing an export.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct ExportCreated {
        pub id: i32,
    }

    /// One export job as seen over the API.
    ///
    /// `content` is the rendered SIE text (UTF-8); the detail endpoint
    /// includes it once the export completes, the list endpoint leaves it
    /// out. The cp437-encoded file lives on its own endpoint.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct ExportView {
        pub id: i32,
        pub status: String,
        pub aggregation: String,
        pub start_date: DateTime<Utc>,
        pub end_date: DateTime<Utc>,
        pub signer_member_id: i32,
        pub created_at: DateTime<Utc>,
        pub completed_at: Option<DateTime<Utc>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub content: Option<String>,
    }

    /// Response body for listing exports.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct ExportsResponse {
        pub exports: Vec<ExportView>,
    }
}
