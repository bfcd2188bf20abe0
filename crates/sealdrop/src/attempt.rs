//! Decryption attempts: their state machine and abort signal.
//!
//! ```text
//! Idle -> Fetching -> Parsing -> Unwrapping -> Decrypting -> Verifying -> Delivered
//!                 \_____________________________/
//!                      (remote strategy)
//! ```
//!
//! Any non-terminal state may move to `Failed`. `Delivered` and `Failed` are
//! terminal; a retry is a new attempt.

use std::fmt;
use std::future::Future;

use tokio::sync::watch;
use tracing::debug;

use sealdrop_core::PackageId;

use crate::error::{ErrorKind, Result, SealdropError};

/// Where an attempt is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttemptState {
    Idle,
    Fetching,
    Parsing,
    Unwrapping,
    Decrypting,
    Verifying,
    Delivered,
    Failed(ErrorKind),
}

impl AttemptState {
    pub fn is_terminal(self) -> bool {
        matches!(self, AttemptState::Delivered | AttemptState::Failed(_))
    }

    /// Whether `next` is a legal successor of `self`.
    pub fn can_transition_to(self, next: AttemptState) -> bool {
        use AttemptState::*;
        match (self, next) {
            (s, Failed(_)) => !s.is_terminal(),
            (Idle, Fetching)
            | (Fetching, Parsing)
            | (Fetching, Decrypting)
            | (Parsing, Unwrapping)
            | (Unwrapping, Decrypting)
            | (Decrypting, Verifying)
            | (Verifying, Delivered) => true,
            _ => false,
        }
    }
}

impl fmt::Display for AttemptState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttemptState::Failed(kind) => write!(f, "failed({kind:?})"),
            other => write!(f, "{}", format!("{other:?}").to_lowercase()),
        }
    }
}

/// One attempt at recovering one package.
pub(crate) struct Attempt {
    id: u64,
    package_id: PackageId,
    state: watch::Sender<AttemptState>,
    abort: watch::Sender<bool>,
}

impl Attempt {
    pub(crate) fn new(id: u64, package_id: PackageId) -> Self {
        let (state, _) = watch::channel(AttemptState::Idle);
        let (abort, _) = watch::channel(false);
        Self {
            id,
            package_id,
            state,
            abort,
        }
    }

    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    pub(crate) fn state(&self) -> AttemptState {
        *self.state.borrow()
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<AttemptState> {
        self.state.subscribe()
    }

    /// Move to `next` if the transition is legal. Returns whether it moved.
    pub(crate) fn advance(&self, next: AttemptState) -> bool {
        let mut moved = false;
        self.state.send_if_modified(|state| {
            if state.can_transition_to(next) {
                *state = next;
                moved = true;
            }
            moved
        });
        if moved {
            debug!(package_id = %self.package_id, attempt = self.id, state = %next, "attempt state");
        }
        moved
    }

    pub(crate) fn abort(&self) {
        self.abort.send_replace(true);
    }

    pub(crate) fn signal(&self) -> AbortSignal {
        AbortSignal {
            rx: self.abort.subscribe(),
        }
    }
}

/// Receiving end of an attempt's abort flag.
pub(crate) struct AbortSignal {
    rx: watch::Receiver<bool>,
}

impl AbortSignal {
    pub(crate) fn is_aborted(&self) -> bool {
        *self.rx.borrow()
    }

    /// Fail fast if the attempt was aborted.
    pub(crate) fn check(&self) -> Result<()> {
        if self.is_aborted() {
            Err(SealdropError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Resolves once the attempt is aborted. Never resolves otherwise.
    async fn aborted(&mut self) {
        if self.rx.wait_for(|aborted| *aborted).await.is_err() {
            std::future::pending::<()>().await;
        }
    }

    /// Run `fut` unless the attempt is aborted first.
    pub(crate) async fn race<F, T>(&mut self, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        self.check()?;
        tokio::select! {
            biased;
            _ = self.aborted() => Err(SealdropError::Cancelled),
            out = fut => out,
        }
    }
}
