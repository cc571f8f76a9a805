//! Listener registries.
//!
//! A [`Listeners`] set hands out a [`Subscription`] per registered callback;
//! dropping the subscription unregisters it.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;

/// Callback invoked with each published value.
pub type Listener<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct Registry<T: ?Sized> {
    next_id: u64,
    listeners: Vec<(u64, Listener<T>)>,
}

/// Set of listeners for values of type `T`.
pub struct Listeners<T: ?Sized> {
    inner: Arc<Mutex<Registry<T>>>,
}

impl<T: ?Sized> Clone for Listeners<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: ?Sized> Default for Listeners<T> {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Registry {
                next_id: 0,
                listeners: Vec::new(),
            })),
        }
    }
}

impl<T: ?Sized + 'static> Listeners<T> {
    /// Create an empty listener set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener. It stays registered until the returned
    /// subscription is dropped.
    pub fn add(&self, listener: Listener<T>) -> Subscription {
        let mut registry = self.inner.lock();
        let id = registry.next_id;
        registry.next_id += 1;
        registry.listeners.push((id, listener));
        drop(registry);

        let weak: Weak<Mutex<Registry<T>>> = Arc::downgrade(&self.inner);
        Subscription {
            remove: Some(Box::new(move || {
                if let Some(registry) = weak.upgrade() {
                    registry.lock().listeners.retain(|(i, _)| *i != id);
                }
            })),
        }
    }

    /// Invoke every listener with `value`.
    ///
    /// Listeners run outside the registry lock, so they may subscribe or
    /// unsubscribe from within the callback.
    pub fn notify(&self, value: &T) {
        let snapshot: Vec<Listener<T>> = self
            .inner
            .lock()
            .listeners
            .iter()
            .map(|(_, l)| Arc::clone(l))
            .collect();
        for listener in snapshot {
            listener(value);
        }
    }

    /// Number of registered listeners.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().listeners.len()
    }

    /// Whether no listener is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Handle for a registered listener. Dropping it unregisters the listener.
#[must_use = "dropping the subscription unregisters the listener"]
pub struct Subscription {
    remove: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    /// Unregister the listener now.
    pub fn unsubscribe(mut self) {
        self.run();
    }

    fn run(&mut self) {
        if let Some(remove) = self.remove.take() {
            remove();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.run();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.remove.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting(listeners: &Listeners<u32>) -> (Subscription, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let subscription = listeners.add(Arc::new(move |_: &u32| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        (subscription, calls)
    }

    #[test]
    fn drop_unregisters() {
        let listeners = Listeners::new();
        let (subscription, calls) = counting(&listeners);

        listeners.notify(&1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        drop(subscription);
        assert!(listeners.is_empty());
        listeners.notify(&2);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn unsubscribe_only_removes_its_listener() {
        let listeners = Listeners::new();
        let (first, first_calls) = counting(&listeners);
        let (_second, second_calls) = counting(&listeners);

        first.unsubscribe();
        listeners.notify(&7);

        assert_eq!(first_calls.load(Ordering::SeqCst), 0);
        assert_eq!(second_calls.load(Ordering::SeqCst), 1);
        assert_eq!(listeners.len(), 1);
    }

    #[test]
    fn listener_may_subscribe_during_notify() {
        let listeners: Listeners<u32> = Listeners::new();
        let inner = listeners.clone();
        let added = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let keep = Arc::clone(&added);

        let _subscription = listeners.add(Arc::new(move |_: &u32| {
            keep.lock().push(inner.add(Arc::new(|_: &u32| {})));
        }));
        listeners.notify(&0);

        assert_eq!(listeners.len(), 2);
    }

    #[test]
    fn subscription_outliving_registry_is_harmless() {
        let listeners: Listeners<u32> = Listeners::new();
        let subscription = listeners.add(Arc::new(|_: &u32| {}));
        drop(listeners);
        drop(subscription);
    }
}
