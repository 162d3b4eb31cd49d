use anyhow::Result;

pub struct AppConfig {
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub auth: AuthConfig,
    pub loan: LoanConfig,
    pub scheduler: SchedulerConfig,
    pub mailer: MailerConfig,
}

impl AppConfig {
    pub fn new() -> Result<AppConfig> {
        let database = DatabaseConfig {
            host: std::env::var("DATABASE_HOST")?,
            port: std::env::var("DATABASE_PORT")?.parse()?,
            username: std::env::var("DATABASE_USERNAME")?,
            password: std::env::var("DATABASE_PASSWORD")?,
            database: std::env::var("DATABASE_NAME")?,
        };
        let redis = RedisConfig {
            host: std::env::var("REDIS_HOST")?,
            port: std::env::var("REDIS_PORT")?.parse()?,
        };
        let auth = AuthConfig {
            ttl: env_or("AUTH_TOKEN_TTL", 86400)?,
        };
        let loan = LoanConfig {
            loan_period_days: env_or("LOAN_PERIOD_DAYS", 14)?,
        };
        let scheduler = SchedulerConfig {
            overdue_sweep_interval_seconds: env_or("OVERDUE_SWEEP_INTERVAL_SECONDS", 1800)?,
            hygiene_sweep_interval_seconds: env_or("HYGIENE_SWEEP_INTERVAL_SECONDS", 300)?,
            account_retention_days: env_or("ACCOUNT_RETENTION_DAYS", 5)?,
        };
        let mailer = MailerConfig {
            endpoint: std::env::var("MAILER_ENDPOINT")?,
            api_token: std::env::var("MAILER_API_TOKEN")?,
            from_address: std::env::var("MAILER_FROM_ADDRESS")?,
            timeout_seconds: env_or("MAILER_TIMEOUT_SECONDS", 10)?,
        };
        Ok(AppConfig {
            database,
            redis,
            auth,
            loan,
            scheduler,
            mailer,
        })
    }
}

// 任意の環境変数を読み、未設定ならデフォルト値を使う
fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(v) => Ok(v.parse()?),
        Err(_) => Ok(default),
    }
}

pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub database: String,
}

pub struct RedisConfig {
    pub host: String,
    pub port: u16,
}

pub struct AuthConfig {
    pub ttl: u64,
}

// 貸出期間の設定。業務上の定数はすべて外部から与える
pub struct LoanConfig {
    pub loan_period_days: i64,
}

pub struct SchedulerConfig {
    pub overdue_sweep_interval_seconds: u64,
    pub hygiene_sweep_interval_seconds: u64,
    pub account_retention_days: i64,
}

pub struct MailerConfig {
    pub endpoint: String,
    pub api_token: String,
    pub from_address: String,
    pub timeout_seconds: u64,
}
