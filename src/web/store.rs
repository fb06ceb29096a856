//! In-memory session store with a size cap and expired-record sweeping.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::Mutex;
use tower_sessions_core::session::{Id, Record};
use tower_sessions_core::session_store::{self, ExpiredDeletion, SessionStore};
use tracing::debug;

/// Keeps at most `capacity` sessions. When full, expired records go first,
/// then whichever live record is closest to expiring.
#[derive(Clone, Debug)]
pub(crate) struct BoundedStore {
    records: Arc<Mutex<HashMap<Id, Record>>>,
    capacity: usize,
}

impl BoundedStore {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            records: Arc::new(Mutex::new(HashMap::new())),
            capacity: capacity.max(1),
        }
    }

    #[cfg(test)]
    pub(crate) async fn len(&self) -> usize {
        self.records.lock().await.len()
    }
}

fn is_active(record: &Record, now: OffsetDateTime) -> bool {
    record.expiry_date > now
}

fn remove_expired(records: &mut HashMap<Id, Record>) -> usize {
    let now = OffsetDateTime::now_utc();
    let before = records.len();
    records.retain(|_, record| is_active(record, now));
    before - records.len()
}

/// Frees a slot for `incoming` if it's new and the store is full.
fn make_room(records: &mut HashMap<Id, Record>, incoming: &Id, capacity: usize) {
    if records.contains_key(incoming) || records.len() < capacity {
        return;
    }
    let removed = remove_expired(records);
    if removed > 0 {
        debug!("Dropped {} expired sessions to make room", removed);
    }
    while records.len() >= capacity {
        let oldest = records
            .values()
            .min_by_key(|record| record.expiry_date)
            .map(|record| record.id);
        match oldest {
            Some(id) => {
                debug!("Session store full, evicting the least recently active session");
                records.remove(&id);
            }
            None => break,
        }
    }
}

#[async_trait]
impl SessionStore for BoundedStore {
    async fn create(&self, record: &mut Record) -> session_store::Result<()> {
        let mut records = self.records.lock().await;
        while records.contains_key(&record.id) {
            record.id = Id::default();
        }
        make_room(&mut records, &record.id, self.capacity);
        records.insert(record.id, record.clone());
        Ok(())
    }

    async fn save(&self, record: &Record) -> session_store::Result<()> {
        let mut records = self.records.lock().await;
        make_room(&mut records, &record.id, self.capacity);
        records.insert(record.id, record.clone());
        Ok(())
    }

    async fn load(&self, session_id: &Id) -> session_store::Result<Option<Record>> {
        let now = OffsetDateTime::now_utc();
        Ok(self
            .records
            .lock()
            .await
            .get(session_id)
            .filter(|record| is_active(record, now))
            .cloned())
    }

    async fn delete(&self, session_id: &Id) -> session_store::Result<()> {
        self.records.lock().await.remove(session_id);
        Ok(())
    }
}

#[async_trait]
impl ExpiredDeletion for BoundedStore {
    async fn delete_expired(&self) -> session_store::Result<()> {
        let mut records = self.records.lock().await;
        let removed = remove_expired(&mut records);
        if removed > 0 {
            debug!(
                "Swept {} expired sessions, {} remain",
                removed,
                records.len()
            );
        }
        Ok(())
    }
}
