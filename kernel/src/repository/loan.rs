use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shared::error::AppResult;

use crate::model::{
    id::{BookId, LoanId, UserId},
    loan::{
        event::{CreateLoan, MarkNotified, UpdateReturned},
        Loan,
    },
};

#[mockall::automock]
#[async_trait]
pub trait LoanRepository: Send + Sync {
    // 貸出操作
    async fn create(&self, event: CreateLoan) -> AppResult<LoanId>;
    // 返却操作。returned_at を設定する。notified には触れない
    async fn update_returned(&self, event: UpdateReturned) -> AppResult<()>;
    // 延滞通知の送信済みマーク（notified = false の行への条件付き更新）。
    // 行を更新できた場合にのみ true を返す
    async fn mark_notified(&self, event: MarkNotified) -> AppResult<bool>;
    // 貸出 ID から貸出情報を取得する
    async fn find_by_id(&self, loan_id: LoanId) -> AppResult<Loan>;
    // すべての未返却の貸出情報を取得する
    async fn find_open_all(&self) -> AppResult<Vec<Loan>>;
    // ユーザー ID に紐づく未返却の貸出情報を取得する
    async fn find_open_by_user_id(&self, user_id: UserId) -> AppResult<Vec<Loan>>;
    // 延滞中（未返却かつ due_at < now）の貸出情報を取得する
    async fn find_overdue(&self, now: DateTime<Utc>) -> AppResult<Vec<Loan>>;
    // 延滞中かつ未通知の貸出情報を取得する。延滞スイープが使用する
    async fn find_overdue_unnotified(&self, now: DateTime<Utc>) -> AppResult<Vec<Loan>>;
    // 蔵書の貸出履歴（返却済みも含む）
    async fn find_history_by_book_id(&self, book_id: BookId) -> AppResult<Vec<Loan>>;
}
