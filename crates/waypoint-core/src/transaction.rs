//! Navigation transaction state machine
//!
//! ```text
//! Pending
//!   ↓ guards continue     ↓ guard aborts   ↓ error / superseded
//! Committed               Aborted          Failed
//!
//! Pending → Redirected → Pending (redirect_count + 1)
//! ```

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use waypoint_location::NavigationTarget;

use crate::error::RouterError;
use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Committed,
    Aborted,
    Redirected,
    Failed,
}

impl TransactionStatus {
    pub fn can_transition_to(&self, target: TransactionStatus) -> bool {
        use TransactionStatus::*;
        match (self, target) {
            (Pending, Committed | Aborted | Redirected | Failed) => true,
            // A redirect restarts the pipeline, or gives up past the limit
            (Redirected, Pending | Failed) => true,
            _ => false,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TransactionStatus::Committed | TransactionStatus::Aborted | TransactionStatus::Failed
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Committed => "committed",
            TransactionStatus::Aborted => "aborted",
            TransactionStatus::Redirected => "redirected",
            TransactionStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TransactionStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(TransactionStatus::Pending),
            "committed" => Ok(TransactionStatus::Committed),
            "aborted" => Ok(TransactionStatus::Aborted),
            "redirected" => Ok(TransactionStatus::Redirected),
            "failed" => Ok(TransactionStatus::Failed),
            _ => Err(format!("Unknown transaction status: {}", s)),
        }
    }
}

/// How the navigation reaches the history backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationKind {
    Push,
    Replace,
    /// The backend already moved; nothing to write
    Pop { delta: i32 },
}

#[derive(Debug, Clone)]
pub struct NavigationTransaction {
    pub sequence: u64,
    pub kind: NavigationKind,
    pub target: NavigationTarget,
    pub status: TransactionStatus,
    pub redirect_count: u32,
    pub started_at: DateTime<Utc>,
}

impl NavigationTransaction {
    pub fn new(sequence: u64, kind: NavigationKind, target: NavigationTarget) -> Self {
        Self {
            sequence,
            kind,
            target,
            status: TransactionStatus::Pending,
            redirect_count: 0,
            started_at: Utc::now(),
        }
    }

    pub fn transition(&mut self, status: TransactionStatus) -> Result<()> {
        if !self.status.can_transition_to(status) {
            return Err(RouterError::InvalidTransition {
                from: self.status,
                to: status,
            });
        }
        self.status = status;
        Ok(())
    }

    /// Restart towards `target` as a replace.
    pub fn redirect(&mut self, target: NavigationTarget, max_redirects: u32) -> Result<()> {
        self.transition(TransactionStatus::Redirected)?;
        self.redirect_count += 1;
        if self.redirect_count > max_redirects {
            self.transition(TransactionStatus::Failed)?;
            return Err(RouterError::TooManyRedirects {
                count: self.redirect_count,
            });
        }

        self.kind = NavigationKind::Replace;
        self.target = target;
        self.transition(TransactionStatus::Pending)
    }

    pub fn elapsed_ms(&self) -> i64 {
        (Utc::now() - self.started_at).num_milliseconds()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_transitions() {
        assert!(TransactionStatus::Pending.can_transition_to(TransactionStatus::Committed));
        assert!(TransactionStatus::Pending.can_transition_to(TransactionStatus::Aborted));
        assert!(TransactionStatus::Pending.can_transition_to(TransactionStatus::Redirected));
        assert!(TransactionStatus::Redirected.can_transition_to(TransactionStatus::Pending));
    }

    #[test]
    fn test_invalid_transitions() {
        assert!(!TransactionStatus::Committed.can_transition_to(TransactionStatus::Pending));
        assert!(!TransactionStatus::Aborted.can_transition_to(TransactionStatus::Committed));
        assert!(!TransactionStatus::Redirected.can_transition_to(TransactionStatus::Committed));

        let mut tx = NavigationTransaction::new(1, NavigationKind::Push, "/a".into());
        tx.transition(TransactionStatus::Committed).unwrap();
        assert!(tx.status.is_terminal());
        assert!(matches!(
            tx.transition(TransactionStatus::Aborted),
            Err(RouterError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn test_redirect_switches_to_replace() {
        let mut tx = NavigationTransaction::new(1, NavigationKind::Push, "/admin".into());
        tx.redirect("/login".into(), 10).unwrap();
        assert_eq!(tx.kind, NavigationKind::Replace);
        assert_eq!(tx.status, TransactionStatus::Pending);
        assert_eq!(tx.redirect_count, 1);
        assert_eq!(tx.target.path.as_deref(), Some("/login"));
    }

    #[test]
    fn test_redirect_limit() {
        let mut tx = NavigationTransaction::new(1, NavigationKind::Push, "/a".into());
        for _ in 0..2 {
            tx.redirect("/b".into(), 2).unwrap();
        }
        assert!(matches!(
            tx.redirect("/c".into(), 2),
            Err(RouterError::TooManyRedirects { count: 3 })
        ));
        assert_eq!(tx.status, TransactionStatus::Failed);
    }

    #[test]
    fn test_status_round_trip() {
        for status in [
            TransactionStatus::Pending,
            TransactionStatus::Committed,
            TransactionStatus::Aborted,
            TransactionStatus::Redirected,
            TransactionStatus::Failed,
        ] {
            assert_eq!(status.as_str().parse::<TransactionStatus>(), Ok(status));
        }
    }
}
