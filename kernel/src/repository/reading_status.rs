use async_trait::async_trait;
use shared::error::AppResult;

use crate::model::{
    id::{BookId, UserId},
    reading_status::{
        event::{DeleteReadingStatus, UpsertReadingStatus},
        ReadingStatus,
    },
};

#[mockall::automock]
#[async_trait]
pub trait ReadingStatusRepository: Send + Sync {
    // (ユーザー, 蔵書) の組に対する読書ステータスを取得する
    async fn find_by_user_and_book(
        &self,
        user_id: UserId,
        book_id: BookId,
    ) -> AppResult<Option<ReadingStatus>>;
    // ユーザーの読書ステータス一覧を取得する
    async fn find_by_user_id(&self, user_id: UserId) -> AppResult<Vec<ReadingStatus>>;
    // 行が無ければ作成、あれば更新する
    async fn upsert(&self, event: UpsertReadingStatus) -> AppResult<ReadingStatus>;
    async fn delete(&self, event: DeleteReadingStatus) -> AppResult<()>;
}
