//! Scoped ownership of a session.

use std::ops::{Deref, DerefMut};

use tracing::{info, warn};

use crate::{Result, ToolSession};

/// Owns a session until it is explicitly closed.
///
/// Async teardown cannot run in `Drop`, so the owner must call
/// [`SessionGuard::close`] on every exit path. A guard dropped while still
/// open only logs; the transport's own drop handling is the last resort.
pub struct SessionGuard<S: ToolSession> {
    session: S,
    closed: bool,
}

impl<S: ToolSession> SessionGuard<S> {
    pub fn new(session: S) -> Self {
        Self {
            session,
            closed: false,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Close the underlying session. Safe to call more than once.
    pub async fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.session.close().await?;
        info!("session guard released");
        Ok(())
    }

    /// Close the session and hand back `result`, preferring its error over
    /// a teardown error.
    pub async fn close_with<T, E>(&mut self, result: std::result::Result<T, E>) -> std::result::Result<T, E>
    where
        E: From<crate::Error>,
    {
        let closed = self.close().await;
        let value = result?;
        closed?;
        Ok(value)
    }
}

impl<S: ToolSession> Deref for SessionGuard<S> {
    type Target = S;

    fn deref(&self) -> &S {
        &self.session
    }
}

impl<S: ToolSession> DerefMut for SessionGuard<S> {
    fn deref_mut(&mut self) -> &mut S {
        &mut self.session
    }
}

impl<S: ToolSession> Drop for SessionGuard<S> {
    fn drop(&mut self) {
        if !self.closed {
            warn!("session guard dropped without close");
        }
    }
}
