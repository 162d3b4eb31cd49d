use std::sync::Arc;

use async_trait::async_trait;
use derive_new::new;

use kernel::model::auth::{event::CreateToken, AccessToken};
use kernel::model::id::UserId;
use kernel::repository::auth::AuthRepository;
use shared::error::{AppError, AppResult};

use crate::{
    database::{
        model::auth::{AuthorizationKey, AuthorizedUserId},
        ConnectionPool,
    },
    redis::RedisClient,
};

#[derive(new)]
pub struct AuthRepositoryImpl {
    db: ConnectionPool,
    kv: Arc<RedisClient>,
    ttl: u64,
}

#[async_trait]
impl AuthRepository for AuthRepositoryImpl {
    async fn fetch_user_id_from_token(
        &self,
        access_token: &AccessToken,
    ) -> AppResult<Option<UserId>> {
        let key: AuthorizationKey = access_token.into();
        self.kv
            .get(&key)
            .await
            .map(|x| x.map(AuthorizedUserId::into_inner))
    }

    // メール認証が完了していないアカウントはログインできない。
    // 未認証のままのアカウントはいずれアカウント整理スイープが削除する
    async fn verify_user(&self, email: &str, password: &str) -> AppResult<UserId> {
        let row: Option<(UserId, String, bool)> = sqlx::query_as(
            r#"
            SELECT user_id, password_hash, account_verified
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(self.db.inner_ref())
        .await
        .map_err(AppError::SpecificOperationError)?;

        let Some((user_id, password_hash, account_verified)) = row else {
            return Err(AppError::UnauthenticatedError);
        };

        let valid = bcrypt::verify(password, &password_hash)?;
        if !valid || !account_verified {
            return Err(AppError::UnauthenticatedError);
        }

        Ok(user_id)
    }

    async fn create_token(&self, event: CreateToken) -> AppResult<AccessToken> {
        let (key, value) = crate::database::model::auth::from(event);
        self.kv.set_ex(&key, &value, self.ttl).await?;
        Ok(key.into())
    }

    async fn delete_token(&self, access_token: &AccessToken) -> AppResult<()> {
        let key: AuthorizationKey = access_token.into();
        self.kv.delete(&key).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::config::RedisConfig;

    // verify_user は Redis に触れないため、接続しないクライアントで足りる
    fn repo(pool: sqlx::PgPool) -> AuthRepositoryImpl {
        let redis_config = RedisConfig {
            host: "localhost".into(),
            port: 6379,
        };
        AuthRepositoryImpl::new(
            ConnectionPool::new(pool),
            Arc::new(RedisClient::new(&redis_config).unwrap()),
            60,
        )
    }

    async fn fixture_user(
        pool: &sqlx::PgPool,
        name: &str,
        password: &str,
        verified: bool,
    ) -> anyhow::Result<()> {
        let password_hash = bcrypt::hash(password, 4)?;
        sqlx::query(
            r#"
            INSERT INTO users (user_id, user_name, email, password_hash, role, account_verified)
            VALUES (gen_random_uuid(), $1, $2, $3, 'User', $4)
            "#,
        )
        .bind(name)
        .bind(format!("{name}@example.com"))
        .bind(password_hash)
        .bind(verified)
        .execute(pool)
        .await?;
        Ok(())
    }

    #[sqlx::test(migrations = "../migrations")]
    async fn test_verify_user_rejects_unverified_account(
        pool: sqlx::PgPool,
    ) -> anyhow::Result<()> {
        let repo = repo(pool.clone());
        fixture_user(&pool, "alice", "passw0rd", true).await?;
        fixture_user(&pool, "bob", "passw0rd", false).await?;

        // 認証済みアカウントは正しいパスワードでログインできる
        assert!(repo.verify_user("alice@example.com", "passw0rd").await.is_ok());

        // 未認証アカウントはパスワードが正しくてもログインできない。
        // ログインできてしまうと貸出を作成でき、アカウント整理スイープの
        // 削除対象から外れなくなる
        let res = repo.verify_user("bob@example.com", "passw0rd").await;
        assert!(matches!(res, Err(AppError::UnauthenticatedError)));

        // パスワード誤りも同じエラーになる
        let res = repo.verify_user("alice@example.com", "wrong").await;
        assert!(matches!(res, Err(AppError::UnauthenticatedError)));

        Ok(())
    }
}
