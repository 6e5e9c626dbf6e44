use std::sync::Arc;

use async_trait::async_trait;

use crate::models::user::User;

/// Delivery failure of a follow notification.
#[derive(Debug)]
pub struct NotifyError(pub String);

impl std::fmt::Display for NotifyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "notification failed: {}", self.0)
    }
}

impl std::error::Error for NotifyError {}

/// Tells a user that someone started following them.
#[async_trait]
pub trait FollowNotifier: Send + Sync {
    async fn notify_follow(&self, follower: &User, followed: &User) -> Result<(), NotifyError>;
}

/// Writes the notification to the log instead of sending mail.
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

#[async_trait]
impl FollowNotifier for LogNotifier {
    async fn notify_follow(&self, follower: &User, followed: &User) -> Result<(), NotifyError> {
        tracing::info!(
            to = %followed.email,
            "[microblog] {} is now following you!",
            follower.nickname
        );
        Ok(())
    }
}

/// Fire-and-forget: runs the notifier in the background and only logs failures.
pub fn spawn_follow_notification(notifier: Arc<dyn FollowNotifier>, follower: User, followed: User) {
    tokio::spawn(async move {
        if let Err(e) = notifier.notify_follow(&follower, &followed).await {
            tracing::warn!(
                follower = %follower.nickname,
                followed = %followed.nickname,
                "Failed to deliver follow notification: {}",
                e
            );
        }
    });
}
