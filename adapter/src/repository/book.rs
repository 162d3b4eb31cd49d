use async_trait::async_trait;
use derive_new::new;

use kernel::model::book::{
    event::{CreateBook, DeleteBook, UpdateBook},
    Book,
};
use kernel::model::id::BookId;
use kernel::repository::book::BookRepository;
use shared::error::{AppError, AppResult};

use crate::database::{model::book::BookRow, ConnectionPool};

#[derive(new)]
pub struct BookRepositoryImpl {
    db: ConnectionPool,
}

#[async_trait]
impl BookRepository for BookRepositoryImpl {
    async fn create(&self, event: CreateBook) -> AppResult<BookId> {
        let book_id = BookId::new();
        sqlx::query(
            r#"
            INSERT INTO books (book_id, title, author, genre, description, quantity)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(book_id)
        .bind(event.title)
        .bind(event.author)
        .bind(event.genre)
        .bind(event.description)
        .bind(event.quantity)
        .execute(self.db.inner_ref())
        .await
        .map_err(AppError::SpecificOperationError)?;

        Ok(book_id)
    }

    async fn find_all(&self) -> AppResult<Vec<Book>> {
        let rows: Vec<BookRow> = sqlx::query_as(
            r#"
            SELECT
                book_id,
                title,
                author,
                genre,
                description,
                quantity
            FROM books
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(self.db.inner_ref())
        .await
        .map_err(AppError::SpecificOperationError)?;

        Ok(rows.into_iter().map(Book::from).collect())
    }

    async fn find_by_id(&self, book_id: BookId) -> AppResult<Option<Book>> {
        let row: Option<BookRow> = sqlx::query_as(
            r#"
            SELECT
                book_id,
                title,
                author,
                genre,
                description,
                quantity
            FROM books
            WHERE book_id = $1
            "#,
        )
        .bind(book_id)
        .fetch_optional(self.db.inner_ref())
        .await
        .map_err(AppError::SpecificOperationError)?;

        Ok(row.map(Book::from))
    }

    async fn update(&self, event: UpdateBook) -> AppResult<()> {
        let res = sqlx::query(
            r#"
            UPDATE books
            SET
                title = COALESCE($2, title),
                author = COALESCE($3, author),
                genre = COALESCE($4, genre),
                description = COALESCE($5, description),
                quantity = COALESCE($6, quantity)
            WHERE book_id = $1
            "#,
        )
        .bind(event.book_id)
        .bind(event.title)
        .bind(event.author)
        .bind(event.genre)
        .bind(event.description)
        .bind(event.quantity)
        .execute(self.db.inner_ref())
        .await
        .map_err(AppError::SpecificOperationError)?;

        if res.rows_affected() < 1 {
            return Err(AppError::EntityNotFound(
                "specified book not found".into(),
            ));
        }

        Ok(())
    }

    // 蔵書の完全削除を行う。
    // この蔵書を参照している貸出・読書ステータスを残すと
    // 参照先のない孤児レコードになるため、
    // 貸出 → 読書ステータス → 蔵書本体の順に削除する。
    // 全体を 1 つのトランザクションで囲んでおり、
    // 途中のステップが失敗した場合は蔵書の削除自体が行われない
    async fn delete(&self, event: DeleteBook) -> AppResult<()> {
        let mut tx = self.db.begin().await?;

        sqlx::query("DELETE FROM loans WHERE book_id = $1")
            .bind(event.book_id)
            .execute(&mut *tx)
            .await
            .map_err(AppError::SpecificOperationError)?;

        sqlx::query("DELETE FROM reading_statuses WHERE book_id = $1")
            .bind(event.book_id)
            .execute(&mut *tx)
            .await
            .map_err(AppError::SpecificOperationError)?;

        let res = sqlx::query("DELETE FROM books WHERE book_id = $1")
            .bind(event.book_id)
            .execute(&mut *tx)
            .await
            .map_err(AppError::SpecificOperationError)?;

        if res.rows_affected() < 1 {
            return Err(AppError::EntityNotFound(format!(
                "蔵書（{}）が見つかりませんでした。",
                event.book_id
            )));
        }

        tx.commit().await.map_err(AppError::TransactionError)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use kernel::model::id::UserId;
    use kernel::model::loan::event::CreateLoan;
    use kernel::repository::loan::LoanRepository;

    use crate::repository::loan::LoanRepositoryImpl;

    async fn fixture_user(pool: &sqlx::PgPool, name: &str) -> anyhow::Result<UserId> {
        let user_id = UserId::new();
        sqlx::query(
            r#"
            INSERT INTO users (user_id, user_name, email, password_hash, role, account_verified)
            VALUES ($1, $2, $3, 'dummy-hash', 'User', TRUE)
            "#,
        )
        .bind(user_id)
        .bind(name)
        .bind(format!("{name}@example.com"))
        .execute(pool)
        .await?;
        Ok(user_id)
    }

    #[sqlx::test(migrations = "../migrations")]
    async fn test_register_book(pool: sqlx::PgPool) -> anyhow::Result<()> {
        let repo = BookRepositoryImpl::new(ConnectionPool::new(pool));

        let book_id = repo
            .create(CreateBook::new(
                "Test Title".into(),
                "Test Author".into(),
                "Test Genre".into(),
                "Test Description".into(),
                3,
            ))
            .await?;

        let all = repo.find_all().await?;
        assert_eq!(all.len(), 1);

        let book = repo.find_by_id(book_id).await?;
        assert!(book.is_some());

        let Book {
            book_id: id,
            title,
            author,
            genre,
            description,
            quantity,
        } = book.unwrap();
        assert_eq!(id, book_id);
        assert_eq!(title, "Test Title");
        assert_eq!(author, "Test Author");
        assert_eq!(genre, "Test Genre");
        assert_eq!(description, "Test Description");
        assert_eq!(quantity, 3);

        Ok(())
    }

    #[sqlx::test(migrations = "../migrations")]
    async fn test_delete_book_cascades(pool: sqlx::PgPool) -> anyhow::Result<()> {
        let book_repo = BookRepositoryImpl::new(ConnectionPool::new(pool.clone()));
        let loan_repo = LoanRepositoryImpl::new(ConnectionPool::new(pool.clone()));

        let user_id = fixture_user(&pool, "alice").await?;
        let book_id = book_repo
            .create(CreateBook::new(
                "Test Title".into(),
                "Test Author".into(),
                "Test Genre".into(),
                "Test Description".into(),
                1,
            ))
            .await?;

        let now = Utc::now();
        loan_repo
            .create(CreateLoan::new(book_id, user_id, now, now + Duration::days(14)))
            .await?;
        sqlx::query(
            r#"
            INSERT INTO reading_statuses (reading_status_id, user_id, book_id, status, progress)
            VALUES (gen_random_uuid(), $1, $2, 'reading', 50)
            "#,
        )
        .bind(user_id)
        .bind(book_id)
        .execute(&pool)
        .await?;

        book_repo.delete(DeleteBook::new(book_id)).await?;

        assert!(book_repo.find_by_id(book_id).await?.is_none());
        assert!(loan_repo.find_history_by_book_id(book_id).await?.is_empty());
        let (statuses,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM reading_statuses WHERE book_id = $1")
                .bind(book_id)
                .fetch_one(&pool)
                .await?;
        assert_eq!(statuses, 0);

        Ok(())
    }

    #[sqlx::test(migrations = "../migrations")]
    async fn test_delete_unknown_book_fails(pool: sqlx::PgPool) -> anyhow::Result<()> {
        let repo = BookRepositoryImpl::new(ConnectionPool::new(pool));

        let res = repo.delete(DeleteBook::new(BookId::new())).await;
        assert!(matches!(res, Err(AppError::EntityNotFound(_))));

        Ok(())
    }
}
