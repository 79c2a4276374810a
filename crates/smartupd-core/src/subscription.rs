//! Registration handles
//!
//! Everything the integration registers (polling task, daily trigger, options
//! listener, service handler) hands back a `Subscription`. Releasing it, or
//! dropping it, revokes the registration exactly once.

use tokio::task::JoinHandle;
use tracing::debug;

type Revoke = Box<dyn FnOnce() + Send>;

/// Handle to one active registration
pub struct Subscription {
    name: &'static str,
    revoke: Option<Revoke>,
}

impl Subscription {
    /// Wrap a revoke callback
    pub fn new(name: &'static str, revoke: impl FnOnce() + Send + 'static) -> Self {
        Self {
            name,
            revoke: Some(Box::new(revoke)),
        }
    }

    /// Subscription that aborts a background task when released
    #[must_use]
    pub fn from_task(name: &'static str, handle: JoinHandle<()>) -> Self {
        Self::new(name, move || handle.abort())
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.revoke.is_some()
    }

    /// Revoke the registration now
    pub fn release(mut self) {
        self.revoke_now();
    }

    fn revoke_now(&mut self) {
        if let Some(revoke) = self.revoke.take() {
            debug!(subscription = self.name, "releasing");
            revoke();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.revoke_now();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("name", &self.name)
            .field("active", &self.is_active())
            .finish()
    }
}

/// Set of registrations released together on unload
#[derive(Debug, Default)]
pub struct Subscriptions {
    items: Vec<Subscription>,
}

impl Subscriptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, subscription: Subscription) {
        self.items.push(subscription);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.items.iter().map(Subscription::name).collect()
    }

    /// Release everything, most recent registration first
    pub fn release_all(&mut self) {
        while let Some(subscription) = self.items.pop() {
            subscription.release();
        }
    }
}

impl Drop for Subscriptions {
    fn drop(&mut self) {
        self.release_all();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[test]
    fn test_release_runs_once() {
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        let sub = Subscription::new("test", move || {
            c.fetch_add(1, Ordering::SeqCst);
        });
        assert!(sub.is_active());
        sub.release();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_drop_releases() {
        let count = Arc::new(AtomicUsize::new(0));
        {
            let c = count.clone();
            let _sub = Subscription::new("test", move || {
                c.fetch_add(1, Ordering::SeqCst);
            });
        }
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_release_all_in_reverse_order() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let mut subs = Subscriptions::new();
        for name in ["service", "options_listener", "trigger"] {
            let o = order.clone();
            subs.push(Subscription::new(name, move || o.lock().unwrap().push(name)));
        }
        assert_eq!(subs.len(), 3);

        subs.release_all();

        assert!(subs.is_empty());
        assert_eq!(
            *order.lock().unwrap(),
            vec!["trigger", "options_listener", "service"]
        );
    }

    #[tokio::test]
    async fn test_task_subscription_aborts_task() {
        let handle = tokio::spawn(async {
            tokio::time::sleep(std::time::Duration::from_secs(3600)).await;
        });
        let abort = handle.abort_handle();
        let sub = Subscription::from_task("poll", handle);

        sub.release();
        tokio::task::yield_now().await;
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        assert!(abort.is_finished());
    }
}
