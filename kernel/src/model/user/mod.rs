use chrono::{DateTime, Utc};

use crate::model::{id::UserId, role::Role};

pub mod event;

#[derive(Debug, PartialEq, Eq)]
pub struct User {
    pub user_id: UserId,
    pub user_name: String,
    pub email: String,
    pub role: Role,
    // メール認証が完了しているか。未認証のままのアカウントは
    // アカウント整理スイープの削除対象になる
    pub account_verified: bool,
    pub created_at: DateTime<Utc>,
}

// 貸出情報に含める借り手の情報
#[derive(Debug)]
pub struct LoanUser {
    pub user_id: UserId,
    pub user_name: String,
    pub email: String,
}
