use crate::entity::EntityId;
use crate::record::Record;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Last record sent per tracked aircraft.
///
/// The poll loop is the only writer. Every `set` replaces one entry under the
/// write lock, so readers see either the previous record or the new one.
#[derive(Clone, Default)]
pub struct DedupStore {
  last: Arc<RwLock<HashMap<EntityId, Record>>>,
}

impl DedupStore {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn get(&self, entity: &EntityId) -> Option<Record> {
    self.last.read().get(entity).cloned()
  }

  pub fn set(&self, entity: EntityId, record: Record) {
    self.last.write().insert(entity, record);
  }

  /// Copy the whole map out so the lock is not held while rendering.
  pub fn snapshot(&self) -> HashMap<EntityId, Record> {
    self.last.read().clone()
  }

  pub fn is_empty(&self) -> bool {
    self.last.read().is_empty()
  }
}

/// BotRuntime is the memory storage shared by the poll loop and the command
/// handlers.
#[derive(Clone)]
pub struct BotRuntime {
  pub store: DedupStore,
  entities: Arc<Vec<EntityId>>,
  username: Arc<String>,
  shutdown_sig: Arc<broadcast::Sender<u8>>,
}

impl BotRuntime {
  /// Create a new runtime with the bot username and the aircraft being tracked.
  pub fn new(username: String, entities: Vec<EntityId>) -> Self {
    let (tx, _) = broadcast::channel(5);

    Self {
      store: DedupStore::new(),
      entities: Arc::new(entities),
      username: Arc::new(username),
      shutdown_sig: Arc::new(tx),
    }
  }

  pub fn username(&self) -> &str {
    &self.username
  }

  pub fn entities(&self) -> &[EntityId] {
    &self.entities
  }

  /// Subscribe a signal to know if the BotRuntime get shutdown
  pub fn subscribe_shut_sig(&self) -> broadcast::Receiver<u8> {
    self.shutdown_sig.subscribe()
  }

  pub fn shutdown(&self) {
    // no receiver means the poll loop is already gone
    if self.shutdown_sig.send(1).is_err() {
      tracing::debug!("shutdown signal had no receiver");
    }
  }
}
