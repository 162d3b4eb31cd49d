use std::sync::Arc;

use adapter::database::ConnectionPool;
use adapter::mailer::HttpNotificationGateway;
use adapter::redis::RedisClient;
use adapter::repository::auth::AuthRepositoryImpl;
use adapter::repository::book::BookRepositoryImpl;
use adapter::repository::health::HealthCheckRepositoryImpl;
use adapter::repository::loan::LoanRepositoryImpl;
use adapter::repository::reading_status::ReadingStatusRepositoryImpl;
use adapter::repository::user::UserRepositoryImpl;
use kernel::notifier::NotificationGateway;
use kernel::repository::auth::AuthRepository;
use kernel::repository::book::BookRepository;
use kernel::repository::health::HealthCheckRepository;
use kernel::repository::loan::LoanRepository;
use kernel::repository::reading_status::ReadingStatusRepository;
use kernel::repository::user::UserRepository;
use shared::config::AppConfig;
use shared::error::AppResult;

#[derive(Clone)]
pub struct AppRegistry {
    app_config: Arc<AppConfig>,
    health_check_repository: Arc<dyn HealthCheckRepository>,
    book_repository: Arc<dyn BookRepository>,
    loan_repository: Arc<dyn LoanRepository>,
    reading_status_repository: Arc<dyn ReadingStatusRepository>,
    user_repository: Arc<dyn UserRepository>,
    auth_repository: Arc<dyn AuthRepository>,
    notification_gateway: Arc<dyn NotificationGateway>,
}

impl AppRegistry {
    pub fn new(
        pool: ConnectionPool,
        redis_client: Arc<RedisClient>,
        app_config: AppConfig,
    ) -> AppResult<Self> {
        let health_check_repository = Arc::new(HealthCheckRepositoryImpl::new(pool.clone()));
        let book_repository = Arc::new(BookRepositoryImpl::new(pool.clone()));
        let loan_repository = Arc::new(LoanRepositoryImpl::new(pool.clone()));
        let reading_status_repository =
            Arc::new(ReadingStatusRepositoryImpl::new(pool.clone()));
        let user_repository = Arc::new(UserRepositoryImpl::new(pool.clone()));
        let auth_repository = Arc::new(AuthRepositoryImpl::new(
            pool.clone(),
            redis_client.clone(),
            app_config.auth.ttl,
        ));
        let notification_gateway = Arc::new(HttpNotificationGateway::new(&app_config.mailer)?);
        Ok(Self {
            app_config: Arc::new(app_config),
            health_check_repository,
            book_repository,
            loan_repository,
            reading_status_repository,
            user_repository,
            auth_repository,
            notification_gateway,
        })
    }

    pub fn app_config(&self) -> Arc<AppConfig> {
        self.app_config.clone()
    }

    pub fn health_check_repository(&self) -> Arc<dyn HealthCheckRepository> {
        self.health_check_repository.clone()
    }

    pub fn book_repository(&self) -> Arc<dyn BookRepository> {
        self.book_repository.clone()
    }

    pub fn loan_repository(&self) -> Arc<dyn LoanRepository> {
        self.loan_repository.clone()
    }

    pub fn reading_status_repository(&self) -> Arc<dyn ReadingStatusRepository> {
        self.reading_status_repository.clone()
    }

    pub fn user_repository(&self) -> Arc<dyn UserRepository> {
        self.user_repository.clone()
    }

    pub fn auth_repository(&self) -> Arc<dyn AuthRepository> {
        self.auth_repository.clone()
    }

    pub fn notification_gateway(&self) -> Arc<dyn NotificationGateway> {
        self.notification_gateway.clone()
    }
}
