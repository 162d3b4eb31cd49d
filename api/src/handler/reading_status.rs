use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use garde::Validate;
use kernel::model::{
    id::BookId,
    reading_status::event::{DeleteReadingStatus, UpsertReadingStatus},
};
use registry::AppRegistry;
use shared::error::{AppError, AppResult};

use crate::{
    extractor::AuthorizedUser,
    model::reading_status::{
        ReadingStatusResponse, ReadingStatusesResponse, UpdateReadingStatusRequest,
    },
};

pub async fn show_reading_status(
    user: AuthorizedUser,
    Path(book_id): Path<BookId>,
    State(registry): State<AppRegistry>,
) -> AppResult<Json<ReadingStatusResponse>> {
    registry
        .reading_status_repository()
        .find_by_user_and_book(user.id(), book_id)
        .await?
        .map(ReadingStatusResponse::from)
        .map(Json)
        .ok_or_else(|| AppError::EntityNotFound("読書ステータスが見つかりません".into()))
}

pub async fn show_my_reading_statuses(
    user: AuthorizedUser,
    State(registry): State<AppRegistry>,
) -> AppResult<Json<ReadingStatusesResponse>> {
    registry
        .reading_status_repository()
        .find_by_user_id(user.id())
        .await
        .map(ReadingStatusesResponse::from)
        .map(Json)
}

// 読書ステータスの作成と更新を兼ねる
pub async fn update_reading_status(
    user: AuthorizedUser,
    Path(book_id): Path<BookId>,
    State(registry): State<AppRegistry>,
    Json(req): Json<UpdateReadingStatusRequest>,
) -> AppResult<Json<ReadingStatusResponse>> {
    req.validate(&())?;

    let event = UpsertReadingStatus::new(user.id(), book_id, req.status.into(), req.progress);
    registry
        .reading_status_repository()
        .upsert(event)
        .await
        .map(ReadingStatusResponse::from)
        .map(Json)
}

pub async fn delete_reading_status(
    user: AuthorizedUser,
    Path(book_id): Path<BookId>,
    State(registry): State<AppRegistry>,
) -> AppResult<StatusCode> {
    registry
        .reading_status_repository()
        .delete(DeleteReadingStatus::new(user.id(), book_id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
