use chrono::{DateTime, Utc};
use garde::Validate;
use kernel::model::{
    id::{BookId, ReadingStatusId, UserId},
    reading_status::{ReadingStatus, ReadingStatusKind},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadingStatusKindName {
    WantToRead,
    Reading,
    Paused,
    Completed,
}

impl From<ReadingStatusKind> for ReadingStatusKindName {
    fn from(value: ReadingStatusKind) -> Self {
        match value {
            ReadingStatusKind::WantToRead => Self::WantToRead,
            ReadingStatusKind::Reading => Self::Reading,
            ReadingStatusKind::Paused => Self::Paused,
            ReadingStatusKind::Completed => Self::Completed,
        }
    }
}

impl From<ReadingStatusKindName> for ReadingStatusKind {
    fn from(value: ReadingStatusKindName) -> Self {
        match value {
            ReadingStatusKindName::WantToRead => Self::WantToRead,
            ReadingStatusKindName::Reading => Self::Reading,
            ReadingStatusKindName::Paused => Self::Paused,
            ReadingStatusKindName::Completed => Self::Completed,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateReadingStatusRequest {
    #[garde(skip)]
    pub status: ReadingStatusKindName,
    #[garde(inner(range(min = 0, max = 100)))]
    pub progress: Option<i32>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadingStatusesResponse {
    pub items: Vec<ReadingStatusResponse>,
}

impl From<Vec<ReadingStatus>> for ReadingStatusesResponse {
    fn from(value: Vec<ReadingStatus>) -> Self {
        Self {
            items: value.into_iter().map(ReadingStatusResponse::from).collect(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadingStatusResponse {
    pub reading_status_id: ReadingStatusId,
    pub user_id: UserId,
    pub book_id: BookId,
    pub title: String,
    pub status: ReadingStatusKindName,
    pub progress: i32,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<ReadingStatus> for ReadingStatusResponse {
    fn from(value: ReadingStatus) -> Self {
        let ReadingStatus {
            reading_status_id,
            user_id,
            book,
            status,
            progress,
            started_at,
            completed_at,
        } = value;
        Self {
            reading_status_id,
            user_id,
            book_id: book.book_id,
            title: book.title,
            status: status.into(),
            progress,
            started_at,
            completed_at,
        }
    }
}
