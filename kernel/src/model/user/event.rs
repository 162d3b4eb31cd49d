use chrono::{DateTime, Utc};
use derive_new::new;

// アカウント整理スイープが使う削除条件。
// cutoff より前に作成され、かつ未認証のままのアカウントが対象
#[derive(Debug, new)]
pub struct DeleteUnverifiedAccounts {
    pub cutoff: DateTime<Utc>,
}
