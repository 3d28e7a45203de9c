use tokio::sync::broadcast;

use crate::dto::push::TimerPush;

/// Per-session fan-out hub carrying protocol pushes to every viewer socket.
pub struct TimerHub {
    sender: broadcast::Sender<TimerPush>,
}

impl TimerHub {
    /// Construct a new hub backed by a Tokio broadcast channel with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _receiver) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Register a new subscriber that will receive subsequent pushes.
    pub fn subscribe(&self) -> broadcast::Receiver<TimerPush> {
        self.sender.subscribe()
    }

    /// Send a push to all current subscribers, ignoring delivery errors.
    ///
    /// A session with zero viewers is normal; the authority keeps running, and
    /// the next subscriber bootstraps from its snapshot.
    pub fn broadcast(&self, push: TimerPush) {
        let _ = self.sender.send(push);
    }

    /// Number of currently subscribed viewers.
    pub fn viewer_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_receive_broadcasts() {
        let hub = TimerHub::new(8);
        let mut first = hub.subscribe();
        let mut second = hub.subscribe();
        assert_eq!(hub.viewer_count(), 2);

        hub.broadcast(TimerPush::TimerStopped);
        assert_eq!(first.recv().await.unwrap(), TimerPush::TimerStopped);
        assert_eq!(second.recv().await.unwrap(), TimerPush::TimerStopped);
    }

    #[test]
    fn broadcast_without_subscribers_is_not_an_error() {
        let hub = TimerHub::new(8);
        assert_eq!(hub.viewer_count(), 0);
        hub.broadcast(TimerPush::TimerExpired);
    }
}
