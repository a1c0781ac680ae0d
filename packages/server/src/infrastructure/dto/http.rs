//! HTTP API response DTOs.

use serde::{Deserialize, Serialize};

/// One entry in the stream discovery list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamSummaryDto {
    pub id: String,
    pub display_name: String,
    pub is_live: bool,
    pub viewer_count: usize,
    pub created_at: String,
}

/// Detailed view of one stream
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamDetailDto {
    pub id: String,
    pub display_name: String,
    pub is_live: bool,
    pub viewer_count: usize,
    pub total_viewers: u64,
    pub peak_viewers: usize,
    pub message_count: u64,
    pub created_at: String,
}
