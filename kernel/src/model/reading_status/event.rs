use derive_new::new;

use crate::model::{
    id::{BookId, UserId},
    reading_status::ReadingStatusKind,
};

// 読書ステータスの作成・更新イベント。
// 行が存在しなければ作成、存在すれば更新する（upsert）
#[derive(new)]
pub struct UpsertReadingStatus {
    pub user_id: UserId,
    pub book_id: BookId,
    pub status: ReadingStatusKind,
    pub progress: Option<i32>,
}

#[derive(new)]
pub struct DeleteReadingStatus {
    pub user_id: UserId,
    pub book_id: BookId,
}
