// Catalog event handling
// Listeners registered on the engine are notified after saves, deletes, mass
// updates and collection loads, in registration order.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use strata_common::{EntityId, StoreId};
use tokio::sync::{RwLock, broadcast};
use tracing::{debug, info};

/// Type of catalog event
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CatalogEventType {
    EntitySaved,
    EntityDeleted,
    MassUpdated,
    /// A collection query returned at least one entity
    CollectionLoaded,
}

impl std::fmt::Display for CatalogEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CatalogEventType::EntitySaved => write!(f, "ENTITY_SAVED"),
            CatalogEventType::EntityDeleted => write!(f, "ENTITY_DELETED"),
            CatalogEventType::MassUpdated => write!(f, "MASS_UPDATED"),
            CatalogEventType::CollectionLoaded => write!(f, "COLLECTION_LOADED"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct CatalogEvent {
    pub event_type: CatalogEventType,
    pub entity_ids: Vec<EntityId>,
    pub store_id: StoreId,
    /// Attribute codes written, for saves and mass updates
    pub attributes: Vec<String>,
    pub timestamp: i64,
}

impl CatalogEvent {
    fn new(event_type: CatalogEventType, entity_ids: Vec<EntityId>, store_id: StoreId) -> Self {
        Self {
            event_type,
            entity_ids,
            store_id,
            attributes: Vec::new(),
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }

    pub fn entity_saved(entity_id: EntityId, store_id: StoreId, attributes: Vec<String>) -> Self {
        Self {
            attributes,
            ..Self::new(CatalogEventType::EntitySaved, vec![entity_id], store_id)
        }
    }

    pub fn entity_deleted(entity_id: EntityId) -> Self {
        Self::new(CatalogEventType::EntityDeleted, vec![entity_id], 0)
    }

    pub fn mass_updated(entity_ids: Vec<EntityId>, store_id: StoreId, attributes: Vec<String>) -> Self {
        Self {
            attributes,
            ..Self::new(CatalogEventType::MassUpdated, entity_ids, store_id)
        }
    }

    pub fn collection_loaded(entity_ids: Vec<EntityId>, store_id: StoreId) -> Self {
        Self::new(CatalogEventType::CollectionLoaded, entity_ids, store_id)
    }
}

/// Trait for handling catalog events
#[async_trait]
pub trait CatalogEventListener: Send + Sync {
    async fn on_catalog_event(&self, event: &CatalogEvent);
}

/// Catalog event publisher
/// Broadcasts events to subscribers and calls registered listeners in order
pub struct CatalogEventPublisher {
    broadcast_tx: broadcast::Sender<CatalogEvent>,
    listeners: Arc<RwLock<Vec<Arc<dyn CatalogEventListener>>>>,
}

impl Default for CatalogEventPublisher {
    fn default() -> Self {
        Self::new(256)
    }
}

impl CatalogEventPublisher {
    pub fn new(queue_size: usize) -> Self {
        let (broadcast_tx, _) = broadcast::channel(queue_size.max(1));
        Self {
            broadcast_tx,
            listeners: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub async fn register_listener(&self, listener: Arc<dyn CatalogEventListener>) {
        let mut listeners = self.listeners.write().await;
        listeners.push(listener);
        debug!("Registered catalog listener, total: {}", listeners.len());
    }

    pub async fn publish(&self, event: CatalogEvent) {
        debug!(
            "Publishing catalog event: {} for {} entities",
            event.event_type,
            event.entity_ids.len()
        );

        // Broadcast to subscribers
        let _ = self.broadcast_tx.send(event.clone());

        let listeners = self.listeners.read().await;
        for listener in listeners.iter() {
            listener.on_catalog_event(&event).await;
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CatalogEvent> {
        self.broadcast_tx.subscribe()
    }
}

/// A simple logging listener for debugging
pub struct LoggingCatalogEventListener;

#[async_trait]
impl CatalogEventListener for LoggingCatalogEventListener {
    async fn on_catalog_event(&self, event: &CatalogEvent) {
        info!(
            "[CatalogEvent] {} store={} entities={:?} attributes={:?}",
            event.event_type, event.store_id, event.entity_ids, event.attributes
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct Recorder {
        name: &'static str,
        seen: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl CatalogEventListener for Recorder {
        async fn on_catalog_event(&self, event: &CatalogEvent) {
            self.seen
                .lock()
                .unwrap()
                .push(format!("{}:{}", self.name, event.event_type));
        }
    }

    #[tokio::test]
    async fn test_listeners_called_in_registration_order() {
        let publisher = CatalogEventPublisher::default();
        let seen = Arc::new(Mutex::new(Vec::new()));
        for name in ["first", "second"] {
            publisher
                .register_listener(Arc::new(Recorder {
                    name,
                    seen: seen.clone(),
                }))
                .await;
        }
        let mut rx = publisher.subscribe();

        publisher.publish(CatalogEvent::entity_deleted(42)).await;

        assert_eq!(
            *seen.lock().unwrap(),
            vec!["first:ENTITY_DELETED", "second:ENTITY_DELETED"]
        );
        let received = rx.recv().await.unwrap();
        assert_eq!(received.entity_ids, vec![42]);
    }
}
