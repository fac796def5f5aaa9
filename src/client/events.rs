/// Handle returned by [`EventBinder::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener<T> = Box<dyn FnMut(&T) + Send>;

/// Observer registry for one kind of state change.
pub struct EventBinder<T> {
    next_id: u64,
    listeners: Vec<(SubscriptionId, Listener<T>)>,
}

impl<T> Default for EventBinder<T> {
    fn default() -> Self {
        Self {
            next_id: 0,
            listeners: Vec::new(),
        }
    }
}

impl<T> EventBinder<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&T) + Send + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Returns false if `id` was not subscribed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(sid, _)| *sid != id);
        self.listeners.len() != before
    }

    /// Calls every listener in subscription order.
    pub fn dispatch(&mut self, value: &T) {
        for (_, listener) in &mut self.listeners {
            listener(value);
        }
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    #[test]
    fn subscribe_dispatch_unsubscribe() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut binder = EventBinder::<u32>::new();

        let a = {
            let seen = seen.clone();
            binder.subscribe(move |v| seen.lock().unwrap().push(("a", *v)))
        };
        let _b = {
            let seen = seen.clone();
            binder.subscribe(move |v| seen.lock().unwrap().push(("b", *v)))
        };

        binder.dispatch(&1);
        assert!(binder.unsubscribe(a));
        assert!(!binder.unsubscribe(a));
        binder.dispatch(&2);

        assert_eq!(*seen.lock().unwrap(), vec![("a", 1), ("b", 1), ("b", 2)]);
        assert_eq!(binder.len(), 1);
    }
}
