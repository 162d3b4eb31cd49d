use async_trait::async_trait;
use derive_new::new;

use kernel::model::id::UserId;
use kernel::model::user::{event::DeleteUnverifiedAccounts, User};
use kernel::repository::user::UserRepository;
use shared::error::{AppError, AppResult};

use crate::database::{model::user::UserRow, ConnectionPool};

#[derive(new)]
pub struct UserRepositoryImpl {
    db: ConnectionPool,
}

#[async_trait]
impl UserRepository for UserRepositoryImpl {
    async fn find_current_user(&self, user_id: UserId) -> AppResult<Option<User>> {
        let row: Option<UserRow> = sqlx::query_as(
            r#"
            SELECT user_id, user_name, email, role, account_verified, created_at
            FROM users
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(self.db.inner_ref())
        .await
        .map_err(AppError::SpecificOperationError)?;

        row.map(User::try_from).transpose()
    }

    // 未認証のまま保持期間を過ぎたアカウントを一括削除する。
    // 削除は自然に冪等なので、途中で失敗しても次回のスイープが
    // 残りを削除するだけでよい。
    // 貸出や読書ステータスから参照されているアカウントは外部キー制約で
    // 削除できないため対象から除外する。1 件の削除不能なアカウントが
    // 文全体を失敗させて他の削除まで道連れにすることを防ぐ
    async fn delete_unverified_accounts(
        &self,
        event: DeleteUnverifiedAccounts,
    ) -> AppResult<u64> {
        let res = sqlx::query(
            r#"
            DELETE FROM users AS u
            WHERE u.account_verified = FALSE
              AND u.created_at < $1
              AND NOT EXISTS (SELECT 1 FROM loans AS l WHERE l.user_id = u.user_id)
              AND NOT EXISTS (
                  SELECT 1 FROM reading_statuses AS rs WHERE rs.user_id = u.user_id
              )
            "#,
        )
        .bind(event.cutoff)
        .execute(self.db.inner_ref())
        .await
        .map_err(AppError::SpecificOperationError)?;

        Ok(res.rows_affected())
    }
}
