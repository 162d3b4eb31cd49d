use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use kernel::model::{
    id::{BookId, LoanId},
    loan::event::{CreateLoan, UpdateReturned},
};
use registry::AppRegistry;
use shared::error::{AppError, AppResult};

use crate::{
    extractor::AuthorizedUser,
    model::loan::{LoanResponse, LoansResponse, OverdueLoansResponse},
};

// 貸出を作成する。返却期限は貸出時点 + 設定の貸出期間
pub async fn borrow_book(
    user: AuthorizedUser,
    Path(book_id): Path<BookId>,
    State(registry): State<AppRegistry>,
) -> Result<impl IntoResponse, AppError> {
    let borrowed_at = Utc::now();
    let due_at =
        borrowed_at + chrono::Duration::days(registry.app_config().loan.loan_period_days);

    let create_loan = CreateLoan::new(book_id, user.id(), borrowed_at, due_at);
    let loan_id = registry.loan_repository().create(create_loan).await?;

    let loan = registry.loan_repository().find_by_id(loan_id).await?;
    Ok((StatusCode::CREATED, Json(LoanResponse::from(loan))))
}

pub async fn return_book(
    user: AuthorizedUser,
    Path((book_id, loan_id)): Path<(BookId, LoanId)>,
    State(registry): State<AppRegistry>,
) -> AppResult<Json<LoanResponse>> {
    // パス上の蔵書と貸出の組が一致していることを確認する
    let loan = registry.loan_repository().find_by_id(loan_id).await?;
    if loan.book.book_id != book_id {
        return Err(AppError::EntityNotFound(
            "指定された蔵書に対する貸出が見つかりません".into(),
        ));
    }

    let update_returned = UpdateReturned::new(loan_id, user.id(), Utc::now());
    registry
        .loan_repository()
        .update_returned(update_returned)
        .await?;

    let returned = registry.loan_repository().find_by_id(loan_id).await?;
    Ok(Json(LoanResponse::from(returned)))
}

pub async fn show_loan_list(
    _user: AuthorizedUser,
    State(registry): State<AppRegistry>,
) -> AppResult<Json<LoansResponse>> {
    registry
        .loan_repository()
        .find_open_all()
        .await
        .map(LoansResponse::from)
        .map(Json)
}

// 延滞一覧。days_overdue は参照時点で導出する
pub async fn show_overdue_list(
    _user: AuthorizedUser,
    State(registry): State<AppRegistry>,
) -> AppResult<Json<OverdueLoansResponse>> {
    let now = Utc::now();
    registry
        .loan_repository()
        .find_overdue(now)
        .await
        .map(|loans| OverdueLoansResponse::from_loans(loans, now))
        .map(Json)
}

pub async fn show_my_loans(
    user: AuthorizedUser,
    State(registry): State<AppRegistry>,
) -> AppResult<Json<LoansResponse>> {
    registry
        .loan_repository()
        .find_open_by_user_id(user.id())
        .await
        .map(LoansResponse::from)
        .map(Json)
}

pub async fn loan_history(
    _user: AuthorizedUser,
    Path(book_id): Path<BookId>,
    State(registry): State<AppRegistry>,
) -> AppResult<Json<LoansResponse>> {
    registry
        .loan_repository()
        .find_history_by_book_id(book_id)
        .await
        .map(LoansResponse::from)
        .map(Json)
}
