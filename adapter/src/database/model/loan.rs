use kernel::model::{
    book::LoanBook,
    id::{BookId, LoanId, UserId},
    loan::Loan,
    user::LoanUser,
};
use sqlx::types::chrono::{DateTime, Utc};

// 貸出一覧・貸出履歴を取得する際に使う型。
// returned_at が NULL の行は未返却、値のある行は返却済みを表す
#[derive(sqlx::FromRow)]
pub struct LoanRow {
    pub loan_id: LoanId,
    pub book_id: BookId,
    pub title: String,
    pub user_id: UserId,
    pub user_name: String,
    pub email: String,
    pub borrowed_at: DateTime<Utc>,
    pub due_at: DateTime<Utc>,
    pub returned_at: Option<DateTime<Utc>>,
    pub notified: bool,
    pub notified_at: Option<DateTime<Utc>>,
}

impl From<LoanRow> for Loan {
    fn from(value: LoanRow) -> Self {
        let LoanRow {
            loan_id,
            book_id,
            title,
            user_id,
            user_name,
            email,
            borrowed_at,
            due_at,
            returned_at,
            notified,
            notified_at,
        } = value;
        Loan {
            loan_id,
            book: LoanBook { book_id, title },
            borrower: LoanUser {
                user_id,
                user_name,
                email,
            },
            borrowed_at,
            due_at,
            returned_at,
            notified,
            notified_at,
        }
    }
}

// 貸出作成時の事前チェックに使う型。
// 蔵書の総数と現在貸出中の件数を 1 クエリで取得する
#[derive(sqlx::FromRow)]
pub struct BookAvailabilityRow {
    pub book_id: BookId,
    pub quantity: i32,
    pub open_loans: i64,
}
