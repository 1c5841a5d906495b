//! Notification handler registry
//!
//! Maps characteristic locators to registered handlers and fans received
//! values out to them. The registry deliberately survives disconnects so
//! that a reconnect can re-subscribe every characteristic that still has
//! handlers.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::BoxFuture;
use tracing::debug;

use bluefin_core::{CharacteristicLocator, SubscriptionId};

/// Async callback invoked with each received value
pub type NotificationHandler = Arc<dyn Fn(Vec<u8>) -> BoxFuture<'static, ()> + Send + Sync>;

struct HandlerSlot {
    id: SubscriptionId,
    handler: NotificationHandler,
}

// ----------------------------------------------------------------------------
// Registry
// ----------------------------------------------------------------------------

/// Handlers per characteristic, in registration order
#[derive(Default)]
pub(crate) struct NotificationRegistry {
    handlers: HashMap<CharacteristicLocator, Vec<HandlerSlot>>,
}

impl NotificationRegistry {
    /// Register a handler under the given fresh subscription id
    pub(crate) fn insert(
        &mut self,
        locator: CharacteristicLocator,
        id: SubscriptionId,
        handler: NotificationHandler,
    ) {
        self.handlers
            .entry(locator)
            .or_default()
            .push(HandlerSlot { id, handler });
    }

    /// Remove a handler. Returns `true` when it was the last handler for the
    /// locator (the wire subscription can be torn down). Removing an unknown
    /// id is a no-op returning `false`.
    pub(crate) fn remove(&mut self, locator: CharacteristicLocator, id: SubscriptionId) -> bool {
        let Some(slots) = self.handlers.get_mut(&locator) else {
            debug!(%locator, %id, "deregister for unknown characteristic ignored");
            return false;
        };
        let before = slots.len();
        slots.retain(|slot| slot.id != id);
        if slots.len() == before {
            debug!(%locator, %id, "deregister for unknown subscription ignored");
            return false;
        }
        if slots.is_empty() {
            self.handlers.remove(&locator);
            return true;
        }
        false
    }

    /// Whether any handler is registered for the locator
    pub(crate) fn has_handlers(&self, locator: CharacteristicLocator) -> bool {
        self.handlers.contains_key(&locator)
    }

    /// Deliver a value to every handler, sequentially in registration order.
    ///
    /// A slow handler delays the ones after it; offload long-running work.
    pub(crate) async fn fan_out(&self, locator: CharacteristicLocator, value: Vec<u8>) {
        let handlers: Vec<NotificationHandler> = match self.handlers.get(&locator) {
            Some(slots) => slots.iter().map(|slot| slot.handler.clone()).collect(),
            None => return,
        };
        for handler in handlers {
            handler(value.clone()).await;
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use uuid::Uuid;

    fn locator() -> CharacteristicLocator {
        CharacteristicLocator::new(Uuid::from_u128(7), Uuid::from_u128(8))
    }

    fn recording_handler(log: Arc<Mutex<Vec<(u8, Vec<u8>)>>>, tag: u8) -> NotificationHandler {
        Arc::new(move |value| {
            let log = log.clone();
            Box::pin(async move {
                if let Ok(mut entries) = log.lock() {
                    entries.push((tag, value));
                }
            })
        })
    }

    #[tokio::test]
    async fn fan_out_runs_handlers_in_registration_order() {
        let mut registry = NotificationRegistry::default();
        let log = Arc::new(Mutex::new(Vec::new()));
        let c = locator();

        registry.insert(c, SubscriptionId::fresh(), recording_handler(log.clone(), 1));
        registry.insert(c, SubscriptionId::fresh(), recording_handler(log.clone(), 2));
        registry.insert(c, SubscriptionId::fresh(), recording_handler(log.clone(), 3));

        registry.fan_out(c, b"x".to_vec()).await;

        let entries = log.lock().unwrap().clone();
        assert_eq!(
            entries,
            vec![
                (1, b"x".to_vec()),
                (2, b"x".to_vec()),
                (3, b"x".to_vec()),
            ]
        );
    }

    #[tokio::test]
    async fn remove_reports_last_handler_and_is_idempotent() {
        let mut registry = NotificationRegistry::default();
        let log = Arc::new(Mutex::new(Vec::new()));
        let c = locator();

        let first = SubscriptionId::fresh();
        let second = SubscriptionId::fresh();
        registry.insert(c, first, recording_handler(log.clone(), 1));
        registry.insert(c, second, recording_handler(log.clone(), 2));

        assert!(!registry.remove(c, first));
        assert!(registry.remove(c, second));
        assert!(!registry.has_handlers(c));

        // Second removal of the same subscription is a no-op.
        assert!(!registry.remove(c, second));
    }

    #[tokio::test]
    async fn fan_out_without_handlers_is_a_no_op() {
        let registry = NotificationRegistry::default();
        registry.fan_out(locator(), b"ignored".to_vec()).await;
    }
}
