use async_trait::async_trait;
use chrono::Utc;
use derive_new::new;

use kernel::model::id::{BookId, ReadingStatusId, UserId};
use kernel::model::reading_status::{
    event::{DeleteReadingStatus, UpsertReadingStatus},
    ReadingStatus, ReadingStatusKind,
};
use kernel::repository::reading_status::ReadingStatusRepository;
use shared::error::{AppError, AppResult};

use crate::database::{model::reading_status::ReadingStatusRow, ConnectionPool};

const READING_STATUS_COLUMNS: &str = r#"
    rs.reading_status_id,
    rs.user_id,
    rs.book_id,
    b.title,
    rs.status,
    rs.progress,
    rs.started_at,
    rs.completed_at
    FROM reading_statuses AS rs
    INNER JOIN books AS b ON rs.book_id = b.book_id
"#;

#[derive(new)]
pub struct ReadingStatusRepositoryImpl {
    db: ConnectionPool,
}

#[async_trait]
impl ReadingStatusRepository for ReadingStatusRepositoryImpl {
    async fn find_by_user_and_book(
        &self,
        user_id: UserId,
        book_id: BookId,
    ) -> AppResult<Option<ReadingStatus>> {
        let row: Option<ReadingStatusRow> = sqlx::query_as(&format!(
            "SELECT {READING_STATUS_COLUMNS} WHERE rs.user_id = $1 AND rs.book_id = $2"
        ))
        .bind(user_id)
        .bind(book_id)
        .fetch_optional(self.db.inner_ref())
        .await
        .map_err(AppError::SpecificOperationError)?;

        row.map(ReadingStatus::try_from).transpose()
    }

    async fn find_by_user_id(&self, user_id: UserId) -> AppResult<Vec<ReadingStatus>> {
        let rows: Vec<ReadingStatusRow> = sqlx::query_as(&format!(
            "SELECT {READING_STATUS_COLUMNS} WHERE rs.user_id = $1 ORDER BY rs.updated_at DESC"
        ))
        .bind(user_id)
        .fetch_all(self.db.inner_ref())
        .await
        .map_err(AppError::SpecificOperationError)?;

        rows.into_iter().map(ReadingStatus::try_from).collect()
    }

    // 行が無ければ作成、あれば更新する。
    // - 初めて reading に遷移したときに started_at を刻む
    // - completed に遷移したときは completed_at を刻み、progress を 100 に揃える
    async fn upsert(&self, event: UpsertReadingStatus) -> AppResult<ReadingStatus> {
        let mut tx = self.db.begin().await?;

        // 蔵書の存在確認
        let book: Option<(BookId,)> =
            sqlx::query_as("SELECT book_id FROM books WHERE book_id = $1")
                .bind(event.book_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(AppError::SpecificOperationError)?;
        if book.is_none() {
            return Err(AppError::EntityNotFound(format!(
                "蔵書（{}）が見つかりませんでした。",
                event.book_id
            )));
        }

        let now = Utc::now();
        let progress = match event.status {
            ReadingStatusKind::Completed => 100,
            _ => event.progress.unwrap_or(0).clamp(0, 100),
        };
        let started_at = matches!(event.status, ReadingStatusKind::Reading).then_some(now);
        let completed_at = matches!(event.status, ReadingStatusKind::Completed).then_some(now);

        let res = sqlx::query(
            r#"
            INSERT INTO reading_statuses
            (reading_status_id, user_id, book_id, status, progress, started_at, completed_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (user_id, book_id) DO UPDATE
            SET
                status = EXCLUDED.status,
                progress = EXCLUDED.progress,
                started_at = COALESCE(reading_statuses.started_at, EXCLUDED.started_at),
                completed_at = EXCLUDED.completed_at
            "#,
        )
        .bind(ReadingStatusId::new())
        .bind(event.user_id)
        .bind(event.book_id)
        .bind(event.status.to_string())
        .bind(progress)
        .bind(started_at)
        .bind(completed_at)
        .execute(&mut *tx)
        .await
        .map_err(AppError::SpecificOperationError)?;

        if res.rows_affected() < 1 {
            return Err(AppError::NoRowsAffectedError(
                "No reading status record has been upserted".into(),
            ));
        }

        tx.commit().await.map_err(AppError::TransactionError)?;

        self.find_by_user_and_book(event.user_id, event.book_id)
            .await?
            .ok_or_else(|| {
                AppError::EntityNotFound("reading status not found after upsert".into())
            })
    }

    async fn delete(&self, event: DeleteReadingStatus) -> AppResult<()> {
        let res = sqlx::query(
            r#"
            DELETE FROM reading_statuses
            WHERE user_id = $1 AND book_id = $2
            "#,
        )
        .bind(event.user_id)
        .bind(event.book_id)
        .execute(self.db.inner_ref())
        .await
        .map_err(AppError::SpecificOperationError)?;

        if res.rows_affected() < 1 {
            return Err(AppError::EntityNotFound(
                "specified reading status not found".into(),
            ));
        }

        Ok(())
    }
}
