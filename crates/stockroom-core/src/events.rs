//! Session lifecycle events for the embedding application.
//!
//! The request pipeline cannot know what "go back to the login screen" means
//! for its host - a GUI navigates, the CLI prints a notice, a daemon might
//! re-run a login flow. It emits [`SessionEvent::Invalidated`] and leaves the
//! reaction to whoever subscribed.

use tokio::sync::broadcast;

/// Buffered events per subscriber; invalidation is rare so a small buffer
/// is plenty.
const EVENT_CHANNEL_CAPACITY: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// The session could not be renewed. All state tied to it is invalid and
    /// the user must sign in again.
    Invalidated,
}

#[derive(Debug, Clone)]
pub struct SessionEvents {
    tx: broadcast::Sender<SessionEvent>,
}

impl SessionEvents {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.tx.subscribe()
    }

    /// A send error only means nobody is subscribed
    pub(crate) fn emit(&self, event: SessionEvent) {
        let _ = self.tx.send(event);
    }
}

impl Default for SessionEvents {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscribers_receive_events() {
        let events = SessionEvents::new();
        let mut first = events.subscribe();
        let mut second = events.subscribe();

        events.emit(SessionEvent::Invalidated);

        assert_eq!(first.recv().await.unwrap(), SessionEvent::Invalidated);
        assert_eq!(second.recv().await.unwrap(), SessionEvent::Invalidated);
    }

    #[test]
    fn test_emit_without_subscribers_is_fine() {
        SessionEvents::new().emit(SessionEvent::Invalidated);
    }
}
