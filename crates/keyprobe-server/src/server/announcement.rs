//! Announcement banner read from a text file on every request

use axum::{extract::State, Json};
use std::io::ErrorKind;
use std::path::Path;
use std::sync::Arc;
use tracing::warn;

use super::messages::AnnouncementResponse;
use crate::AppState;

/// Read the banner. A missing or blank file means no announcement.
pub async fn read_announcement(path: &Path) -> AnnouncementResponse {
    match tokio::fs::read_to_string(path).await {
        Ok(content) => {
            let content = content.trim().to_string();
            AnnouncementResponse {
                has_announcement: !content.is_empty(),
                content,
            }
        }
        Err(e) if e.kind() == ErrorKind::NotFound => AnnouncementResponse {
            has_announcement: false,
            content: String::new(),
        },
        Err(e) => {
            warn!("Failed to read announcement {}: {}", path.display(), e);
            AnnouncementResponse {
                has_announcement: false,
                content: "failed to read announcement".to_string(),
            }
        }
    }
}

pub async fn get_announcement(State(state): State<Arc<AppState>>) -> Json<AnnouncementResponse> {
    Json(read_announcement(&state.config.announcement_file).await)
}
