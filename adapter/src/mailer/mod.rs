use async_trait::async_trait;
use reqwest::Client;
use shared::{
    config::MailerConfig,
    error::{AppError, AppResult},
};

use kernel::notifier::{Notification, NotificationGateway};

// メール送信 API に HTTP で通知を依頼するゲートウェイ実装。
// リクエストには必ずタイムアウトを設定し、タイムアウトも送信失敗として扱う。
// スイープを止めないことが最優先であり、失敗した通知は次回の実行で再送される
pub struct HttpNotificationGateway {
    client: Client,
    endpoint: String,
    api_token: String,
    from_address: String,
}

impl HttpNotificationGateway {
    pub fn new(config: &MailerConfig) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| AppError::DeliveryError(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_token: config.api_token.clone(),
            from_address: config.from_address.clone(),
        })
    }
}

#[async_trait]
impl NotificationGateway for HttpNotificationGateway {
    async fn send(&self, notification: Notification) -> AppResult<()> {
        let res = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_token)
            .json(&serde_json::json!({
                "from": self.from_address,
                "to": notification.recipient,
                "subject": notification.subject,
                "text": notification.body,
            }))
            .send()
            .await
            .map_err(|e| AppError::DeliveryError(e.to_string()))?;

        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(AppError::DeliveryError(format!(
                "mail API returned {status}: {body}"
            )));
        }

        Ok(())
    }
}
