use chrono::{DateTime, Utc};
use derive_new::new;

use crate::model::id::{BookId, LoanId, UserId};

#[derive(new)]
pub struct CreateLoan {
    pub book_id: BookId,
    pub borrowed_by: UserId,
    pub borrowed_at: DateTime<Utc>,
    pub due_at: DateTime<Utc>,
}

#[derive(new)]
pub struct UpdateReturned {
    pub loan_id: LoanId,
    pub returned_by: UserId,
    pub returned_at: DateTime<Utc>,
}

// 延滞通知の送信済みマーク。notified = false の行にだけ適用される
// 条件付き更新（compare-and-set）として実装する
#[derive(new)]
pub struct MarkNotified {
    pub loan_id: LoanId,
    pub notified_at: DateTime<Utc>,
}
