use chrono::{DateTime, Utc};

use crate::model::{book::LoanBook, id::LoanId, user::LoanUser};

pub mod event;

// 貸出 1 件を表す型。
// returned_at が None の間は「未返却（open）」であり、
// 「延滞（overdue）」かどうかは保存せず、参照時に due_at と現在時刻の
// 比較で導出する。保存される派生状態は notified フラグのみ
#[derive(Debug)]
pub struct Loan {
    pub loan_id: LoanId,
    pub book: LoanBook,
    pub borrower: LoanUser,
    pub borrowed_at: DateTime<Utc>,
    pub due_at: DateTime<Utc>,
    pub returned_at: Option<DateTime<Utc>>,
    // 延滞通知を送信済みかどうか。false → true にのみ遷移する
    pub notified: bool,
    pub notified_at: Option<DateTime<Utc>>,
}

impl Loan {
    pub fn is_open(&self) -> bool {
        self.returned_at.is_none()
    }

    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.is_open() && self.due_at < now
    }

    // 延滞日数。延滞していない場合は 0 を返す
    pub fn days_overdue(&self, now: DateTime<Utc>) -> i64 {
        if self.is_overdue(now) {
            (now - self.due_at).num_days()
        } else {
            0
        }
    }
}
