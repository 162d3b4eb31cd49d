use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use derive_new::new;

use kernel::model::loan::{event::MarkNotified, Loan};
use kernel::notifier::{Notification, NotificationGateway};
use kernel::repository::loan::LoanRepository;
use shared::error::AppResult;

use crate::task::{SweepJob, SweepSummary};

// 延滞スイープ。
// 「未返却・期限切れ・未通知」の貸出を抽出し、1 件ずつ通知を送って
// 送信に成功したものだけ通知済みにマークする。
//
// - 1 件の失敗は他の貸出の処理を妨げない（次の tick でリトライされる）
// - マークは notified = false への条件付き更新なので、同じ貸出に
//   通知が 2 回マークされることはない
// - 送信成功後のマーク失敗は送信失敗と同じ扱いにする。延滞の通知を
//   取りこぼすよりは再送するほう（at-least-once）を選んでいる
#[derive(new)]
pub struct OverdueSweep {
    loans: Arc<dyn LoanRepository>,
    notifier: Arc<dyn NotificationGateway>,
}

impl OverdueSweep {
    async fn notify_one(&self, loan: &Loan, now: DateTime<Utc>) -> AppResult<()> {
        self.notifier.send(build_notification(loan)).await?;

        let marked = self
            .loans
            .mark_notified(MarkNotified::new(loan.loan_id, now))
            .await?;

        // 抽出から送信までの間に返却された、または並行するスイープが
        // 先にマークしていた場合。通知自体は 1 回しか飛んでいないため
        // 許容されるずれとして扱い、エラーにはしない
        if !marked {
            tracing::info!(
                loan_id = %loan.loan_id,
                "loan was already marked or returned; notification mark skipped"
            );
        }

        Ok(())
    }
}

#[async_trait]
impl SweepJob for OverdueSweep {
    fn name(&self) -> &'static str {
        "overdue_sweep"
    }

    async fn run_once(&self, now: DateTime<Utc>) -> AppResult<SweepSummary> {
        let targets = self.loans.find_overdue_unnotified(now).await?;

        let mut summary = SweepSummary {
            selected: targets.len(),
            ..Default::default()
        };

        for loan in &targets {
            match self.notify_one(loan, now).await {
                Ok(()) => summary.succeeded += 1,
                Err(e) => {
                    summary.failed += 1;
                    tracing::warn!(
                        loan_id = %loan.loan_id,
                        recipient = %loan.borrower.email,
                        error.message = %e,
                        "failed to notify borrower; will retry on next sweep"
                    );
                }
            }
        }

        Ok(summary)
    }
}

fn build_notification(loan: &Loan) -> Notification {
    Notification::new(
        loan.borrower.email.clone(),
        "Book Return Reminder - Overdue".into(),
        format!(
            "Hello {},\n\n\
             This is a reminder that the book \"{}\" you borrowed is overdue for return.\n\n\
             Due Date: {}\n\n\
             Please return the book as soon as possible.\n\n\
             Thank you!",
            loan.borrower.user_name,
            loan.book.title,
            loan.due_at.format("%Y-%m-%d"),
        ),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use kernel::model::book::LoanBook;
    use kernel::model::id::{BookId, LoanId, UserId};
    use kernel::model::user::LoanUser;
    use kernel::notifier::MockNotificationGateway;
    use kernel::repository::loan::MockLoanRepository;
    use shared::error::AppError;

    fn overdue_loan(name: &str, now: DateTime<Utc>) -> Loan {
        Loan {
            loan_id: LoanId::new(),
            book: LoanBook {
                book_id: BookId::new(),
                title: "Test Title".into(),
            },
            borrower: LoanUser {
                user_id: UserId::new(),
                user_name: name.into(),
                email: format!("{name}@example.com"),
            },
            borrowed_at: now - Duration::days(15),
            due_at: now - Duration::days(1),
            returned_at: None,
            notified: false,
            notified_at: None,
        }
    }

    #[tokio::test]
    async fn notifies_and_marks_each_overdue_loan() {
        let now = Utc::now();

        let mut loans = MockLoanRepository::new();
        loans
            .expect_find_overdue_unnotified()
            .times(1)
            .returning(move |_| Ok(vec![overdue_loan("alice", now)]));
        loans
            .expect_mark_notified()
            .withf(move |event| event.notified_at == now)
            .times(1)
            .returning(|_| Ok(true));

        let mut notifier = MockNotificationGateway::new();
        notifier
            .expect_send()
            .withf(|n| {
                n.recipient == "alice@example.com"
                    && n.subject == "Book Return Reminder - Overdue"
                    && n.body.contains("Hello alice")
            })
            .times(1)
            .returning(|_| Ok(()));

        let sweep = OverdueSweep::new(Arc::new(loans), Arc::new(notifier));
        let summary = sweep.run_once(now).await.unwrap();

        assert_eq!(
            summary,
            SweepSummary {
                selected: 1,
                succeeded: 1,
                failed: 0
            }
        );
    }

    #[tokio::test]
    async fn second_run_sends_nothing_when_store_unchanged() {
        let now = Utc::now();

        let mut loans = MockLoanRepository::new();
        let mut seq = mockall::Sequence::new();
        // 1 回目はマーク済みになったので、2 回目の抽出は空になる
        loans
            .expect_find_overdue_unnotified()
            .times(1)
            .in_sequence(&mut seq)
            .returning(move |_| Ok(vec![overdue_loan("alice", now)]));
        loans
            .expect_find_overdue_unnotified()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(vec![]));
        loans.expect_mark_notified().times(1).returning(|_| Ok(true));

        let mut notifier = MockNotificationGateway::new();
        // 2 回走らせても送信は 1 回だけ
        notifier.expect_send().times(1).returning(|_| Ok(()));

        let sweep = OverdueSweep::new(Arc::new(loans), Arc::new(notifier));
        let first = sweep.run_once(now).await.unwrap();
        let second = sweep.run_once(now).await.unwrap();

        assert_eq!(first.succeeded, 1);
        assert_eq!(second, SweepSummary::default());
    }

    #[tokio::test]
    async fn one_delivery_failure_does_not_abort_the_batch() {
        let now = Utc::now();

        let mut loans = MockLoanRepository::new();
        loans.expect_find_overdue_unnotified().returning(move |_| {
            Ok(vec![overdue_loan("alice", now), overdue_loan("bob", now)])
        });
        // 送信に失敗した alice の貸出はマークされない
        loans
            .expect_mark_notified()
            .times(1)
            .returning(|_| Ok(true));

        let mut notifier = MockNotificationGateway::new();
        notifier
            .expect_send()
            .withf(|n| n.recipient == "alice@example.com")
            .times(1)
            .returning(|_| Err(AppError::DeliveryError("SMTP timeout".into())));
        notifier
            .expect_send()
            .withf(|n| n.recipient == "bob@example.com")
            .times(1)
            .returning(|_| Ok(()));

        let sweep = OverdueSweep::new(Arc::new(loans), Arc::new(notifier));
        let summary = sweep.run_once(now).await.unwrap();

        assert_eq!(
            summary,
            SweepSummary {
                selected: 2,
                succeeded: 1,
                failed: 1
            }
        );
    }

    #[tokio::test]
    async fn mark_failure_counts_as_retryable_failure() {
        let now = Utc::now();

        let mut loans = MockLoanRepository::new();
        loans
            .expect_find_overdue_unnotified()
            .returning(move |_| Ok(vec![overdue_loan("alice", now)]));
        // 送信には成功したがマークの永続化に失敗した場合。
        // 送信失敗と同じ扱いで次回リトライに回る
        loans.expect_mark_notified().times(1).returning(|_| {
            Err(AppError::NoRowsAffectedError("connection lost".into()))
        });

        let mut notifier = MockNotificationGateway::new();
        notifier.expect_send().times(1).returning(|_| Ok(()));

        let sweep = OverdueSweep::new(Arc::new(loans), Arc::new(notifier));
        let summary = sweep.run_once(now).await.unwrap();

        assert_eq!(summary.failed, 1);
    }

    #[tokio::test]
    async fn returned_between_selection_and_dispatch_is_tolerated() {
        let now = Utc::now();

        let mut loans = MockLoanRepository::new();
        loans
            .expect_find_overdue_unnotified()
            .returning(move |_| Ok(vec![overdue_loan("alice", now)]));
        // 抽出後に返却された貸出。条件付き更新は空振りするがエラーではない
        loans.expect_mark_notified().times(1).returning(|_| Ok(false));

        let mut notifier = MockNotificationGateway::new();
        notifier.expect_send().times(1).returning(|_| Ok(()));

        let sweep = OverdueSweep::new(Arc::new(loans), Arc::new(notifier));
        let summary = sweep.run_once(now).await.unwrap();

        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.failed, 0);
    }
}
