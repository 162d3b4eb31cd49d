use chrono::{DateTime, Utc};
use kernel::model::{
    book::LoanBook,
    id::{BookId, LoanId, UserId},
    loan::Loan,
    user::LoanUser,
};
use serde::Serialize;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoansResponse {
    pub items: Vec<LoanResponse>,
}

impl From<Vec<Loan>> for LoansResponse {
    fn from(value: Vec<Loan>) -> Self {
        Self {
            items: value.into_iter().map(LoanResponse::from).collect(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanResponse {
    pub loan_id: LoanId,
    pub book: LoanBookResponse,
    pub borrower: LoanUserResponse,
    pub borrowed_at: DateTime<Utc>,
    pub due_at: DateTime<Utc>,
    pub returned_at: Option<DateTime<Utc>>,
    pub notified: bool,
    pub notified_at: Option<DateTime<Utc>>,
}

impl From<Loan> for LoanResponse {
    fn from(value: Loan) -> Self {
        let Loan {
            loan_id,
            book,
            borrower,
            borrowed_at,
            due_at,
            returned_at,
            notified,
            notified_at,
        } = value;
        Self {
            loan_id,
            book: book.into(),
            borrower: borrower.into(),
            borrowed_at,
            due_at,
            returned_at,
            notified,
            notified_at,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanBookResponse {
    pub book_id: BookId,
    pub title: String,
}

impl From<LoanBook> for LoanBookResponse {
    fn from(value: LoanBook) -> Self {
        let LoanBook { book_id, title } = value;
        Self { book_id, title }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanUserResponse {
    pub user_id: UserId,
    pub user_name: String,
    pub email: String,
}

impl From<LoanUser> for LoanUserResponse {
    fn from(value: LoanUser) -> Self {
        let LoanUser {
            user_id,
            user_name,
            email,
        } = value;
        Self {
            user_id,
            user_name,
            email,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverdueLoansResponse {
    pub items: Vec<OverdueLoanResponse>,
}

// 延滞一覧用のレスポンス。
// days_overdue は保存された値ではなく、参照時点の now から導出する
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverdueLoanResponse {
    pub loan_id: LoanId,
    pub book_id: BookId,
    pub title: String,
    pub user_id: UserId,
    pub user_name: String,
    pub email: String,
    pub due_at: DateTime<Utc>,
    pub days_overdue: i64,
    pub notified: bool,
}

impl OverdueLoansResponse {
    pub fn from_loans(loans: Vec<Loan>, now: DateTime<Utc>) -> Self {
        Self {
            items: loans
                .into_iter()
                .map(|loan| OverdueLoanResponse {
                    days_overdue: loan.days_overdue(now),
                    loan_id: loan.loan_id,
                    book_id: loan.book.book_id,
                    title: loan.book.title,
                    user_id: loan.borrower.user_id,
                    user_name: loan.borrower.user_name,
                    email: loan.borrower.email,
                    due_at: loan.due_at,
                    notified: loan.notified,
                })
                .collect(),
        }
    }
}
