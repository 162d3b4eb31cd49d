use async_trait::async_trait;
use chrono::{DateTime, Utc};
use derive_new::new;

use kernel::model::id::{BookId, LoanId, UserId};
use kernel::model::loan::{
    event::{CreateLoan, MarkNotified, UpdateReturned},
    Loan,
};
use kernel::repository::loan::LoanRepository;
use shared::error::{AppError, AppResult};

use crate::database::{
    model::loan::{BookAvailabilityRow, LoanRow},
    set_transaction_serializable, ConnectionPool,
};

// 貸出一覧系のクエリで共通して使う SELECT 句
const LOAN_COLUMNS: &str = r#"
    l.loan_id,
    l.book_id,
    b.title,
    l.user_id,
    u.user_name,
    u.email,
    l.borrowed_at,
    l.due_at,
    l.returned_at,
    l.notified,
    l.notified_at
    FROM loans AS l
    INNER JOIN books AS b ON l.book_id = b.book_id
    INNER JOIN users AS u ON l.user_id = u.user_id
"#;

#[derive(new)]
pub struct LoanRepositoryImpl {
    db: ConnectionPool,
}

#[async_trait]
impl LoanRepository for LoanRepositoryImpl {
    // 貸出操作を行う
    async fn create(&self, event: CreateLoan) -> AppResult<LoanId> {
        let mut tx = self.db.begin().await?;

        // トランザクション分離レベルを SERIALIZABLE に設定する
        set_transaction_serializable(&mut tx).await?;

        // 事前のチェックとして、以下を調べる。
        // - 指定の蔵書 ID をもつ蔵書が存在するか
        // - 存在した場合、貸出可能な在庫が残っているか
        // - 同じユーザーによる同じ蔵書の未返却の貸出が存在しないか
        //
        // 上記のすべてが Yes だった場合、このブロック以降の処理に進む
        {
            //
            // ① 蔵書の存在確認 ＋ 在庫チェック
            //
            let availability: Option<BookAvailabilityRow> = sqlx::query_as(
                r#"
                SELECT
                    b.book_id,
                    b.quantity,
                    COUNT(l.loan_id) FILTER (WHERE l.returned_at IS NULL) AS open_loans
                FROM books AS b
                LEFT JOIN loans AS l ON l.book_id = b.book_id
                WHERE b.book_id = $1
                GROUP BY b.book_id, b.quantity
                "#,
            )
            .bind(event.book_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(AppError::SpecificOperationError)?;

            let book = match availability {
                None => {
                    return Err(AppError::EntityNotFound(format!(
                        "蔵書（{}）が見つかりませんでした。",
                        event.book_id
                    )))
                }
                Some(b) => b,
            };

            if book.open_loans >= book.quantity as i64 {
                return Err(AppError::NoAvailableCopiesError(format!(
                    "蔵書（{}）は現在すべて貸出中です。",
                    event.book_id
                )));
            }

            //
            // ② 同じ (ユーザー, 蔵書) の組に未返却の貸出が無いか確認
            //
            let open_loan: Option<(LoanId,)> = sqlx::query_as(
                r#"
                SELECT loan_id
                FROM loans
                WHERE user_id = $1 AND book_id = $2 AND returned_at IS NULL
                LIMIT 1
                "#,
            )
            .bind(event.borrowed_by)
            .bind(event.book_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(AppError::SpecificOperationError)?;

            if open_loan.is_some() {
                return Err(AppError::DuplicateLoanError(format!(
                    "蔵書（{}）はこのユーザーがすでに借りています。",
                    event.book_id
                )));
            }
        }

        // 貸出処理を行う、すなわち loans テーブルにレコードを追加する
        let loan_id = LoanId::new();
        let res = sqlx::query(
            r#"
            INSERT INTO loans
            (loan_id, book_id, user_id, borrowed_at, due_at, notified)
            VALUES ($1, $2, $3, $4, $5, FALSE)
            "#,
        )
        .bind(loan_id)
        .bind(event.book_id)
        .bind(event.borrowed_by)
        .bind(event.borrowed_at)
        .bind(event.due_at)
        .execute(&mut *tx)
        .await
        .map_err(AppError::SpecificOperationError)?;

        if res.rows_affected() < 1 {
            return Err(AppError::NoRowsAffectedError(
                "No loan record has been created".into(),
            ));
        }

        tx.commit().await.map_err(AppError::TransactionError)?;

        Ok(loan_id)
    }

    // 返却操作を行う
    async fn update_returned(&self, event: UpdateReturned) -> AppResult<()> {
        let mut tx = self.db.begin().await?;

        // トランザクション分離レベルを SERIALIZABLE に設定する
        set_transaction_serializable(&mut tx).await?;

        // 返却操作時は事前のチェックとして、以下を調べる。
        // - 指定の貸出 ID をもつ貸出が存在するか
        // - 存在した場合、
        // - まだ返却されていないか
        // - かつ、借りたユーザーが指定のユーザーと同じか
        {
            let loan: Option<(UserId, Option<DateTime<Utc>>)> = sqlx::query_as(
                r#"
                SELECT user_id, returned_at
                FROM loans
                WHERE loan_id = $1
                "#,
            )
            .bind(event.loan_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(AppError::SpecificOperationError)?;

            let Some((borrowed_by, returned_at)) = loan else {
                return Err(AppError::EntityNotFound(format!(
                    "貸出（{}）が見つかりませんでした。",
                    event.loan_id
                )));
            };

            if returned_at.is_some() {
                return Err(AppError::AlreadyReturnedError(format!(
                    "貸出（{}）はすでに返却済みです。",
                    event.loan_id
                )));
            }

            if borrowed_by != event.returned_by {
                return Err(AppError::ForbiddenOperation);
            }
        }

        // returned_at を設定する。一度設定された returned_at は
        // 以後変更されないよう、WHERE 句でも未返却であることを確認する
        let res = sqlx::query(
            r#"
            UPDATE loans
            SET returned_at = $2
            WHERE loan_id = $1 AND returned_at IS NULL
            "#,
        )
        .bind(event.loan_id)
        .bind(event.returned_at)
        .execute(&mut *tx)
        .await
        .map_err(AppError::SpecificOperationError)?;

        if res.rows_affected() < 1 {
            return Err(AppError::NoRowsAffectedError(
                "No loan record has been returned".into(),
            ));
        }

        tx.commit().await.map_err(AppError::TransactionError)?;

        Ok(())
    }

    // 延滞通知の送信済みマークを行う。
    // notified = false の行にだけ効く条件付き更新なので、
    // 並行する返却操作や別のスイープと競合しても 2 回マークされることはない
    async fn mark_notified(&self, event: MarkNotified) -> AppResult<bool> {
        let res = sqlx::query(
            r#"
            UPDATE loans
            SET notified = TRUE, notified_at = $2
            WHERE loan_id = $1 AND notified = FALSE AND returned_at IS NULL
            "#,
        )
        .bind(event.loan_id)
        .bind(event.notified_at)
        .execute(self.db.inner_ref())
        .await
        .map_err(AppError::SpecificOperationError)?;

        Ok(res.rows_affected() > 0)
    }

    async fn find_by_id(&self, loan_id: LoanId) -> AppResult<Loan> {
        let row: LoanRow = sqlx::query_as(&format!(
            "SELECT {LOAN_COLUMNS} WHERE l.loan_id = $1"
        ))
        .bind(loan_id)
        .fetch_optional(self.db.inner_ref())
        .await
        .map_err(AppError::SpecificOperationError)?
        .ok_or_else(|| {
            AppError::EntityNotFound(format!("貸出（{}）が見つかりませんでした。", loan_id))
        })?;

        Ok(Loan::from(row))
    }

    // すべての未返却の貸出情報を取得する
    async fn find_open_all(&self) -> AppResult<Vec<Loan>> {
        // loans テーブルの未返却レコードを全件抽出する
        // books・users テーブルと INNER JOIN し、蔵書と借り手の情報も一緒に抽出する
        // 出力するレコードは、貸出日の古い順に並べる
        let rows: Vec<LoanRow> = sqlx::query_as(&format!(
            "SELECT {LOAN_COLUMNS} WHERE l.returned_at IS NULL ORDER BY l.borrowed_at ASC"
        ))
        .fetch_all(self.db.inner_ref())
        .await
        .map_err(AppError::SpecificOperationError)?;

        Ok(rows.into_iter().map(Loan::from).collect())
    }

    // ユーザー ID に紐づく未返却の貸出情報を取得する
    async fn find_open_by_user_id(&self, user_id: UserId) -> AppResult<Vec<Loan>> {
        let rows: Vec<LoanRow> = sqlx::query_as(&format!(
            "SELECT {LOAN_COLUMNS} WHERE l.returned_at IS NULL AND l.user_id = $1 ORDER BY l.borrowed_at ASC"
        ))
        .bind(user_id)
        .fetch_all(self.db.inner_ref())
        .await
        .map_err(AppError::SpecificOperationError)?;

        Ok(rows.into_iter().map(Loan::from).collect())
    }

    // 延滞中の貸出情報を取得する。
    // 「延滞」は保存された状態ではなく、参照時に due_at < now で導出する
    async fn find_overdue(&self, now: DateTime<Utc>) -> AppResult<Vec<Loan>> {
        let rows: Vec<LoanRow> = sqlx::query_as(&format!(
            "SELECT {LOAN_COLUMNS} WHERE l.returned_at IS NULL AND l.due_at < $1 ORDER BY l.due_at ASC"
        ))
        .bind(now)
        .fetch_all(self.db.inner_ref())
        .await
        .map_err(AppError::SpecificOperationError)?;

        Ok(rows.into_iter().map(Loan::from).collect())
    }

    // 延滞中かつ未通知の貸出情報を取得する
    async fn find_overdue_unnotified(&self, now: DateTime<Utc>) -> AppResult<Vec<Loan>> {
        let rows: Vec<LoanRow> = sqlx::query_as(&format!(
            "SELECT {LOAN_COLUMNS} WHERE l.returned_at IS NULL AND l.due_at < $1 AND l.notified = FALSE ORDER BY l.due_at ASC"
        ))
        .bind(now)
        .fetch_all(self.db.inner_ref())
        .await
        .map_err(AppError::SpecificOperationError)?;

        Ok(rows.into_iter().map(Loan::from).collect())
    }

    // 蔵書の貸出履歴（返却済みも含む）を取得する
    async fn find_history_by_book_id(&self, book_id: BookId) -> AppResult<Vec<Loan>> {
        let rows: Vec<LoanRow> = sqlx::query_as(&format!(
            "SELECT {LOAN_COLUMNS} WHERE l.book_id = $1 ORDER BY l.borrowed_at DESC"
        ))
        .bind(book_id)
        .fetch_all(self.db.inner_ref())
        .await
        .map_err(AppError::SpecificOperationError)?;

        Ok(rows.into_iter().map(Loan::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    // TIMESTAMP(3) カラムとの往復でミリ秒精度に丸められるため、
    // 比較用の現在時刻もミリ秒に丸めておく
    fn now_ms() -> DateTime<Utc> {
        DateTime::from_timestamp_millis(Utc::now().timestamp_millis()).unwrap()
    }

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

    async fn fixture_book(
        pool: &sqlx::PgPool,
        title: &str,
        quantity: i32,
    ) -> anyhow::Result<BookId> {
        let book_id = BookId::new();
        sqlx::query(
            r#"
            INSERT INTO books (book_id, title, author, genre, description, quantity)
            VALUES ($1, $2, 'Test Author', 'Test Genre', 'Test Description', $3)
            "#,
        )
        .bind(book_id)
        .bind(title)
        .bind(quantity)
        .execute(pool)
        .await?;
        Ok(book_id)
    }

    #[sqlx::test(migrations = "../migrations")]
    async fn test_borrow_and_return(pool: sqlx::PgPool) -> anyhow::Result<()> {
        let repo = LoanRepositoryImpl::new(ConnectionPool::new(pool.clone()));
        let user_id = fixture_user(&pool, "alice").await?;
        let book_id = fixture_book(&pool, "Test Title", 3).await?;

        let now = now_ms();
        let loan_id = repo
            .create(CreateLoan::new(book_id, user_id, now, now + Duration::days(14)))
            .await?;

        let loan = repo.find_by_id(loan_id).await?;
        assert!(loan.is_open());
        assert!(!loan.notified);
        assert_eq!(loan.due_at, now + Duration::days(14));

        repo.update_returned(UpdateReturned::new(loan_id, user_id, now + Duration::days(1)))
            .await?;

        let loan = repo.find_by_id(loan_id).await?;
        assert!(!loan.is_open());
        assert_eq!(loan.returned_at, Some(now + Duration::days(1)));
        // 返却操作は notified に触れない
        assert!(!loan.notified);

        Ok(())
    }

    #[sqlx::test(migrations = "../migrations")]
    async fn test_duplicate_open_loan_is_rejected(pool: sqlx::PgPool) -> anyhow::Result<()> {
        let repo = LoanRepositoryImpl::new(ConnectionPool::new(pool.clone()));
        let user_id = fixture_user(&pool, "alice").await?;
        let book_id = fixture_book(&pool, "Test Title", 3).await?;

        let now = now_ms();
        repo.create(CreateLoan::new(book_id, user_id, now, now + Duration::days(14)))
            .await?;

        let res = repo
            .create(CreateLoan::new(book_id, user_id, now, now + Duration::days(14)))
            .await;
        assert!(matches!(res, Err(AppError::DuplicateLoanError(_))));

        // ストアは変化していない
        assert_eq!(repo.find_open_all().await?.len(), 1);

        // 返却後は同じ組で再び借りられる
        let loans = repo.find_open_by_user_id(user_id).await?;
        repo.update_returned(UpdateReturned::new(loans[0].loan_id, user_id, now_ms()))
            .await?;
        repo.create(CreateLoan::new(book_id, user_id, now, now + Duration::days(14)))
            .await?;

        Ok(())
    }

    #[sqlx::test(migrations = "../migrations")]
    async fn test_no_available_copies(pool: sqlx::PgPool) -> anyhow::Result<()> {
        let repo = LoanRepositoryImpl::new(ConnectionPool::new(pool.clone()));
        let alice = fixture_user(&pool, "alice").await?;
        let bob = fixture_user(&pool, "bob").await?;
        let book_id = fixture_book(&pool, "Test Title", 1).await?;

        let now = now_ms();
        repo.create(CreateLoan::new(book_id, alice, now, now + Duration::days(14)))
            .await?;

        let res = repo
            .create(CreateLoan::new(book_id, bob, now, now + Duration::days(14)))
            .await;
        assert!(matches!(res, Err(AppError::NoAvailableCopiesError(_))));

        Ok(())
    }

    #[sqlx::test(migrations = "../migrations")]
    async fn test_return_twice_fails(pool: sqlx::PgPool) -> anyhow::Result<()> {
        let repo = LoanRepositoryImpl::new(ConnectionPool::new(pool.clone()));
        let user_id = fixture_user(&pool, "alice").await?;
        let book_id = fixture_book(&pool, "Test Title", 1).await?;

        let now = now_ms();
        let loan_id = repo
            .create(CreateLoan::new(book_id, user_id, now, now + Duration::days(14)))
            .await?;

        let first_returned_at = now + Duration::days(1);
        repo.update_returned(UpdateReturned::new(loan_id, user_id, first_returned_at))
            .await?;

        let res = repo
            .update_returned(UpdateReturned::new(loan_id, user_id, now + Duration::days(2)))
            .await;
        assert!(matches!(res, Err(AppError::AlreadyReturnedError(_))));

        // 一度設定された returned_at は変更されない
        let loan = repo.find_by_id(loan_id).await?;
        assert_eq!(loan.returned_at, Some(first_returned_at));

        Ok(())
    }

    #[sqlx::test(migrations = "../migrations")]
    async fn test_return_unknown_loan_fails(pool: sqlx::PgPool) -> anyhow::Result<()> {
        let repo = LoanRepositoryImpl::new(ConnectionPool::new(pool.clone()));
        let user_id = fixture_user(&pool, "alice").await?;

        let res = repo
            .update_returned(UpdateReturned::new(LoanId::new(), user_id, now_ms()))
            .await;
        assert!(matches!(res, Err(AppError::EntityNotFound(_))));

        Ok(())
    }

    #[sqlx::test(migrations = "../migrations")]
    async fn test_overdue_selection_boundaries(pool: sqlx::PgPool) -> anyhow::Result<()> {
        let repo = LoanRepositoryImpl::new(ConnectionPool::new(pool.clone()));
        let alice = fixture_user(&pool, "alice").await?;
        let bob = fixture_user(&pool, "bob").await?;
        let overdue_book = fixture_book(&pool, "Overdue Book", 1).await?;
        let future_book = fixture_book(&pool, "Future Book", 1).await?;

        // T0 に借りて 14 日の貸出期間、現在は T0 + 15 日
        let t0 = now_ms() - Duration::days(15);
        let overdue_id = repo
            .create(CreateLoan::new(overdue_book, alice, t0, t0 + Duration::days(14)))
            .await?;

        // 期限が未来の貸出は抽出されない
        let now = now_ms();
        repo.create(CreateLoan::new(future_book, bob, now, now + Duration::days(14)))
            .await?;

        let targets = repo.find_overdue_unnotified(now).await?;
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].loan_id, overdue_id);
        assert_eq!(targets[0].days_overdue(now), 1);

        // 通知済みにすると抽出されなくなる
        assert!(repo.mark_notified(MarkNotified::new(overdue_id, now)).await?);
        assert!(repo.find_overdue_unnotified(now).await?.is_empty());

        // 延滞一覧（通知状態と無関係）には残る
        assert_eq!(repo.find_overdue(now).await?.len(), 1);

        Ok(())
    }

    #[sqlx::test(migrations = "../migrations")]
    async fn test_mark_notified_is_conditional(pool: sqlx::PgPool) -> anyhow::Result<()> {
        let repo = LoanRepositoryImpl::new(ConnectionPool::new(pool.clone()));
        let user_id = fixture_user(&pool, "alice").await?;
        let book_id = fixture_book(&pool, "Test Title", 1).await?;

        let t0 = now_ms() - Duration::days(15);
        let loan_id = repo
            .create(CreateLoan::new(book_id, user_id, t0, t0 + Duration::days(14)))
            .await?;

        let now = now_ms();
        // 1 回目のマークは成功し、2 回目は何も更新しない
        assert!(repo.mark_notified(MarkNotified::new(loan_id, now)).await?);
        assert!(!repo.mark_notified(MarkNotified::new(loan_id, now)).await?);

        let loan = repo.find_by_id(loan_id).await?;
        assert!(loan.notified);
        assert_eq!(loan.notified_at, Some(now));

        Ok(())
    }

    #[sqlx::test(migrations = "../migrations")]
    async fn test_mark_notified_skips_returned_loan(pool: sqlx::PgPool) -> anyhow::Result<()> {
        let repo = LoanRepositoryImpl::new(ConnectionPool::new(pool.clone()));
        let user_id = fixture_user(&pool, "alice").await?;
        let book_id = fixture_book(&pool, "Test Title", 1).await?;

        let t0 = now_ms() - Duration::days(15);
        let loan_id = repo
            .create(CreateLoan::new(book_id, user_id, t0, t0 + Duration::days(14)))
            .await?;

        // スイープの抽出と送信の間に返却された場合を想定。
        // 条件付き更新は空振りし、閉じた貸出が書き換わることはない
        repo.update_returned(UpdateReturned::new(loan_id, user_id, now_ms()))
            .await?;
        assert!(!repo.mark_notified(MarkNotified::new(loan_id, now_ms())).await?);

        let loan = repo.find_by_id(loan_id).await?;
        assert!(!loan.notified);
        assert!(loan.notified_at.is_none());

        Ok(())
    }

    #[sqlx::test(migrations = "../migrations")]
    async fn test_loan_history_by_book(pool: sqlx::PgPool) -> anyhow::Result<()> {
        let repo = LoanRepositoryImpl::new(ConnectionPool::new(pool.clone()));
        let user_id = fixture_user(&pool, "alice").await?;
        let book_id = fixture_book(&pool, "Test Title", 1).await?;

        let now = now_ms();
        let first = repo
            .create(CreateLoan::new(book_id, user_id, now - Duration::days(30), now - Duration::days(16)))
            .await?;
        repo.update_returned(UpdateReturned::new(first, user_id, now - Duration::days(20)))
            .await?;
        repo.create(CreateLoan::new(book_id, user_id, now, now + Duration::days(14)))
            .await?;

        let history = repo.find_history_by_book_id(book_id).await?;
        assert_eq!(history.len(), 2);
        // 新しい貸出が先頭に来る
        assert!(history[0].is_open());
        assert_eq!(history[1].loan_id, first);

        Ok(())
    }
}
