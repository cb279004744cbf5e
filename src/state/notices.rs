//! Transient notices shown to the user, pruned once their time-to-live elapses.

use std::time::Duration;

use tokio::time::Instant;

/// A transient, dismissable message surfaced to the user (e.g. a failed remote mirror).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    /// Identifier used to dismiss the notice.
    pub id: u64,
    /// Text shown to the user.
    pub message: String,
    /// When the notice was raised.
    pub raised_at: Instant,
}

/// Holds notices until they are dismissed or their time-to-live elapses.
#[derive(Debug)]
pub struct NoticeBoard {
    ttl: Duration,
    next_id: u64,
    notices: Vec<Notice>,
}

impl NoticeBoard {
    /// Create an empty board whose notices expire after `ttl`.
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            next_id: 1,
            notices: Vec::new(),
        }
    }

    /// Raise a notice and return its id.
    pub fn push(&mut self, message: impl Into<String>) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.notices.push(Notice {
            id,
            message: message.into(),
            raised_at: Instant::now(),
        });
        id
    }

    /// Remove a notice before it expires. Returns whether it was still present.
    pub fn dismiss(&mut self, id: u64) -> bool {
        let before = self.notices.len();
        self.notices.retain(|notice| notice.id != id);
        before != self.notices.len()
    }

    /// Notices that have not expired yet, oldest first. Expired ones are pruned.
    pub fn active(&mut self) -> Vec<Notice> {
        let ttl = self.ttl;
        self.notices
            .retain(|notice| notice.raised_at.elapsed() < ttl);
        self.notices.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn notices_expire_after_ttl() {
        let mut board = NoticeBoard::new(Duration::from_secs(3));
        board.push("failed to record kills");
        tokio::time::advance(Duration::from_secs(2)).await;
        board.push("failed to record digs");
        assert_eq!(board.active().len(), 2);

        tokio::time::advance(Duration::from_secs(2)).await;
        let active = board.active();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].message, "failed to record digs");
    }

    #[tokio::test]
    async fn dismiss_removes_only_once() {
        let mut board = NoticeBoard::new(Duration::from_secs(3));
        let id = board.push("offline");
        assert!(board.dismiss(id));
        assert!(!board.dismiss(id));
        assert!(board.active().is_empty());
    }
}
