use async_trait::async_trait;
use shared::error::AppResult;

use crate::model::{
    id::UserId,
    user::{event::DeleteUnverifiedAccounts, User},
};

#[mockall::automock]
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_current_user(&self, user_id: UserId) -> AppResult<Option<User>>;
    // 未認証のまま保持期間を過ぎたアカウントを一括削除し、
    // 削除した件数を返す。アカウント整理スイープが使用する
    async fn delete_unverified_accounts(&self, event: DeleteUnverifiedAccounts)
        -> AppResult<u64>;
}
