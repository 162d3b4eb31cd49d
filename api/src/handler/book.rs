use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use garde::Validate;
use kernel::model::{book::event::DeleteBook, id::BookId};
use registry::AppRegistry;
use shared::error::{AppError, AppResult};

use crate::{
    extractor::AuthorizedUser,
    model::book::{
        BookResponse, BooksResponse, CreateBookRequest, UpdateBookRequest, UpdateBookRequestWithId,
    },
};

pub async fn register_book(
    user: AuthorizedUser,
    State(registry): State<AppRegistry>,
    Json(req): Json<CreateBookRequest>,
) -> Result<impl IntoResponse, AppError> {
    if !user.is_admin() {
        return Err(AppError::ForbiddenOperation);
    }
    req.validate(&())?;

    let book_id = registry.book_repository().create(req.into()).await?;
    let book = registry
        .book_repository()
        .find_by_id(book_id)
        .await?
        .ok_or_else(|| AppError::EntityNotFound("登録した蔵書が見つかりません".into()))?;
    Ok((StatusCode::CREATED, Json(BookResponse::from(book))))
}

pub async fn show_book_list(
    _user: AuthorizedUser,
    State(registry): State<AppRegistry>,
) -> AppResult<Json<BooksResponse>> {
    registry
        .book_repository()
        .find_all()
        .await
        .map(BooksResponse::from)
        .map(Json)
}

pub async fn show_book(
    _user: AuthorizedUser,
    Path(book_id): Path<BookId>,
    State(registry): State<AppRegistry>,
) -> AppResult<Json<BookResponse>> {
    registry
        .book_repository()
        .find_by_id(book_id)
        .await?
        .map(BookResponse::from)
        .map(Json)
        .ok_or_else(|| AppError::EntityNotFound("指定された蔵書が見つかりません".into()))
}

pub async fn update_book(
    user: AuthorizedUser,
    Path(book_id): Path<BookId>,
    State(registry): State<AppRegistry>,
    Json(req): Json<UpdateBookRequest>,
) -> AppResult<StatusCode> {
    if !user.is_admin() {
        return Err(AppError::ForbiddenOperation);
    }
    req.validate(&())?;

    let update_book = UpdateBookRequestWithId::new(book_id, req);
    registry.book_repository().update(update_book.into()).await?;
    Ok(StatusCode::OK)
}

// 蔵書の完全削除。紐づく貸出履歴・読書ステータスも同時に消える
pub async fn delete_book(
    user: AuthorizedUser,
    Path(book_id): Path<BookId>,
    State(registry): State<AppRegistry>,
) -> AppResult<StatusCode> {
    if !user.is_admin() {
        return Err(AppError::ForbiddenOperation);
    }

    registry
        .book_repository()
        .delete(DeleteBook::new(book_id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
