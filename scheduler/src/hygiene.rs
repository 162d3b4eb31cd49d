use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use kernel::model::user::event::DeleteUnverifiedAccounts;
use kernel::repository::user::UserRepository;
use shared::error::AppResult;

use crate::task::{SweepJob, SweepSummary};

// アカウント整理スイープ。
// メール認証が完了しないまま保持期間を過ぎたアカウントを一括削除する。
// 貸出スイープと違って 1 件ごとの状態遷移は無く、削除は自然に冪等なので
// 失敗してもログを残して次の tick でやり直すだけでよい
pub struct UnverifiedAccountSweep {
    users: Arc<dyn UserRepository>,
    retention: Duration,
}

impl UnverifiedAccountSweep {
    pub fn new(users: Arc<dyn UserRepository>, retention_days: i64) -> Self {
        Self {
            users,
            retention: Duration::days(retention_days),
        }
    }
}

#[async_trait]
impl SweepJob for UnverifiedAccountSweep {
    fn name(&self) -> &'static str {
        "account_hygiene_sweep"
    }

    async fn run_once(&self, now: DateTime<Utc>) -> AppResult<SweepSummary> {
        let cutoff = now - self.retention;
        let deleted = self
            .users
            .delete_unverified_accounts(DeleteUnverifiedAccounts::new(cutoff))
            .await?;

        if deleted > 0 {
            tracing::info!(deleted, "removed stale unverified accounts");
        }

        Ok(SweepSummary {
            selected: deleted as usize,
            succeeded: deleted as usize,
            failed: 0,
        })
    }
}
