use async_trait::async_trait;
use shared::error::AppResult;

use crate::model::{
    book::{
        event::{CreateBook, DeleteBook, UpdateBook},
        Book,
    },
    id::BookId,
};

#[mockall::automock]
#[async_trait]
pub trait BookRepository: Send + Sync {
    async fn create(&self, event: CreateBook) -> AppResult<BookId>;
    async fn find_all(&self) -> AppResult<Vec<Book>>;
    async fn find_by_id(&self, book_id: BookId) -> AppResult<Option<Book>>;
    async fn update(&self, event: UpdateBook) -> AppResult<()>;
    // 蔵書の完全削除。貸出 → 読書ステータス → 蔵書本体の順に
    // 同一トランザクション内で削除する。いずれかが失敗した場合は
    // 蔵書の削除自体を行わない
    async fn delete(&self, event: DeleteBook) -> AppResult<()>;
}
