use async_trait::async_trait;
use derive_new::new;
use shared::error::AppResult;

// 外部の通知送信基盤に渡すメッセージ。
// 輸送手段（メール・プッシュ通知など）には関知しない
#[derive(Debug, Clone, new)]
pub struct Notification {
    pub recipient: String,
    pub subject: String,
    pub body: String,
}

// 通知ゲートウェイは失敗しうるブラックボックスとして扱う。
// 送信失敗は AppError::DeliveryError として返り、呼び出し側
// （延滞スイープ）が次回の実行でリトライする
#[mockall::automock]
#[async_trait]
pub trait NotificationGateway: Send + Sync {
    async fn send(&self, notification: Notification) -> AppResult<()>;
}
