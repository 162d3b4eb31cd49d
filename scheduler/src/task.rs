use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shared::error::AppResult;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

// 1 回のスイープの結果。ログ出力とテストのために件数を持ち回る
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SweepSummary {
    pub selected: usize,
    pub succeeded: usize,
    pub failed: usize,
}

// 定期実行される処理の本体。
// run_once はスイープ 1 回分であり、スケジューラ本体の状態には依存しない。
// Err を返してもループは止まらず、次の tick で再実行される
#[async_trait]
pub trait SweepJob: Send + Sync {
    fn name(&self) -> &'static str;

    async fn run_once(&self, now: DateTime<Utc>) -> AppResult<SweepSummary>;
}

// 固定間隔で SweepJob を実行するタスク。
// グローバルなタイマー変数は持たず、start で tokio タスクを生成し、
// 返された TaskHandle の stop で終了させる。
// 実行中に tick が経過した場合、その tick はスキップされる
// （同じ種類のスイープが重なって走ることはない）
pub struct PeriodicTask {
    interval: Duration,
    job: Arc<dyn SweepJob>,
}

impl PeriodicTask {
    pub fn new(interval: Duration, job: Arc<dyn SweepJob>) -> Self {
        Self { interval, job }
    }

    pub fn start(self) -> TaskHandle {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            // 実行が interval より長引いた場合、溜まった tick をまとめて
            // 消化せず、次の間隔まで待つ
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let now = Utc::now();
                        match self.job.run_once(now).await {
                            Ok(summary) => {
                                tracing::info!(
                                    task = self.job.name(),
                                    selected = summary.selected,
                                    succeeded = summary.succeeded,
                                    failed = summary.failed,
                                    "sweep finished"
                                );
                            }
                            // スイープ全体の失敗もここで握りつぶし、
                            // 次の tick で再実行する
                            Err(e) => {
                                tracing::error!(
                                    task = self.job.name(),
                                    error.cause_chain = ?e,
                                    error.message = %e,
                                    "sweep failed"
                                );
                            }
                        }
                    }
                    _ = shutdown_rx.changed() => {
                        tracing::info!(task = self.job.name(), "sweep task stopped");
                        break;
                    }
                }
            }
        });

        TaskHandle {
            shutdown: shutdown_tx,
            handle,
        }
    }
}

pub struct TaskHandle {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl TaskHandle {
    // 実行中のスイープが終わるのを待ってからタスクを終了させる
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        let _ = self.handle.await;
    }
}
