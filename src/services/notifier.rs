use async_trait::async_trait;
use std::sync::Arc;
use tracing::{error, info};

/// Outbound notification collaborator. Delivery (email, push) lives outside
/// this service; callers never wait on it.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn program_completed(&self, user_id: &str, program_id: &str) -> anyhow::Result<()>;
}

/// Default notifier: records the event in the log.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn program_completed(&self, user_id: &str, program_id: &str) -> anyhow::Result<()> {
        info!(
            target: "notifications",
            user_id = %user_id,
            program_id = %program_id,
            "🏁 Program completed"
        );
        Ok(())
    }
}

/// Fire-and-forget dispatch of a completion notice.
pub fn notify_program_completed(notifier: Arc<dyn Notifier>, user_id: String, program_id: String) {
    tokio::spawn(async move {
        if let Err(e) = notifier.program_completed(&user_id, &program_id).await {
            error!(
                "Failed to send completion notice for user {} program {}: {}",
                user_id, program_id, e
            );
        }
    });
}
