use kernel::model::{
    id::{BookId, ReadingStatusId, UserId},
    reading_status::{ReadingStatus, ReadingStatusBook, ReadingStatusKind},
};
use shared::error::AppError;
use sqlx::types::chrono::{DateTime, Utc};
use std::str::FromStr;

#[derive(sqlx::FromRow)]
pub struct ReadingStatusRow {
    pub reading_status_id: ReadingStatusId,
    pub user_id: UserId,
    pub book_id: BookId,
    pub title: String,
    pub status: String,
    pub progress: i32,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl TryFrom<ReadingStatusRow> for ReadingStatus {
    type Error = AppError;

    fn try_from(value: ReadingStatusRow) -> Result<Self, Self::Error> {
        let ReadingStatusRow {
            reading_status_id,
            user_id,
            book_id,
            title,
            status,
            progress,
            started_at,
            completed_at,
        } = value;
        Ok(ReadingStatus {
            reading_status_id,
            user_id,
            book: ReadingStatusBook { book_id, title },
            status: ReadingStatusKind::from_str(&status)
                .map_err(|e| AppError::ConversionEntityError(e.to_string()))?,
            progress,
            started_at,
            completed_at,
        })
    }
}
