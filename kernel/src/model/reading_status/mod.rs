use chrono::{DateTime, Utc};
use strum::{Display, EnumString};

use crate::model::id::{BookId, ReadingStatusId, UserId};

pub mod event;

// ユーザーと蔵書の個人的な読書関係。(user, book) の組につき 1 行
#[derive(Debug)]
pub struct ReadingStatus {
    pub reading_status_id: ReadingStatusId,
    pub user_id: UserId,
    pub book: ReadingStatusBook,
    pub status: ReadingStatusKind,
    pub progress: i32,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug)]
pub struct ReadingStatusBook {
    pub book_id: BookId,
    pub title: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum ReadingStatusKind {
    WantToRead,
    Reading,
    Paused,
    Completed,
}
