use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, MutexGuard, RwLock};

use crate::domain::leave::{LeaveRequest, LeaveRequestId};

pub type RecordHandle = Arc<RecordSlot>;

/// One stored request.
///
/// Writers serialize on `gate` for their whole check-then-act span, oracle calls included.
/// The record lock is only held long enough to copy or replace the record, so readers never
/// wait on a writer's oracle call.
pub struct RecordSlot {
    employee_id: String,
    gate: Mutex<()>,
    record: Mutex<LeaveRequest>,
}

/// Exclusive write access to one slot, held until dropped.
pub struct SlotWriter<'a> {
    slot: &'a RecordSlot,
    _gate: MutexGuard<'a, ()>,
}

impl RecordSlot {
    fn new(record: LeaveRequest) -> Self {
        Self {
            employee_id: record.employee_id.clone(),
            gate: Mutex::new(()),
            record: Mutex::new(record),
        }
    }

    /// Fixed at append time; commits never change it.
    pub fn employee_id(&self) -> &str {
        &self.employee_id
    }

    pub async fn snapshot(&self) -> LeaveRequest {
        self.record.lock().await.clone()
    }

    pub async fn writer(&self) -> SlotWriter<'_> {
        SlotWriter { slot: self, _gate: self.gate.lock().await }
    }
}

impl SlotWriter<'_> {
    pub async fn current(&self) -> LeaveRequest {
        self.slot.snapshot().await
    }

    pub async fn commit(&self, record: LeaveRequest) {
        *self.slot.record.lock().await = record;
    }
}

/// Process-scoped, insertion-ordered leave request store.
///
/// Ids are assigned under the write lock, so sequence order and insertion order agree.
#[derive(Default)]
pub struct LeaveStore {
    state: RwLock<StoreState>,
}

#[derive(Default)]
struct StoreState {
    last_sequence: u64,
    order: Vec<RecordHandle>,
    index: HashMap<LeaveRequestId, RecordHandle>,
}

impl LeaveStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates the next id, builds the record with it and appends it.
    pub async fn append_with<F>(&self, build: F) -> LeaveRequest
    where
        F: FnOnce(LeaveRequestId) -> LeaveRequest,
    {
        let mut state = self.state.write().await;
        state.last_sequence += 1;
        let id = LeaveRequestId::from_sequence(state.last_sequence);

        let mut record = build(id.clone());
        record.id = id.clone();
        let snapshot = record.clone();

        let handle = Arc::new(RecordSlot::new(record));
        state.order.push(Arc::clone(&handle));
        state.index.insert(id, handle);

        snapshot
    }

    pub async fn handle(&self, id: &LeaveRequestId) -> Option<RecordHandle> {
        let state = self.state.read().await;
        state.index.get(id).cloned()
    }

    pub async fn find_by_id(&self, id: &LeaveRequestId) -> Option<LeaveRequest> {
        let handle = self.handle(id).await?;
        Some(handle.snapshot().await)
    }

    pub async fn all(&self) -> Vec<LeaveRequest> {
        self.snapshot_where(|_| true).await
    }

    pub async fn all_for_employee(&self, employee_id: &str) -> Vec<LeaveRequest> {
        self.snapshot_where(|slot| slot.employee_id() == employee_id).await
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.order.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    async fn snapshot_where<P>(&self, predicate: P) -> Vec<LeaveRequest>
    where
        P: Fn(&RecordSlot) -> bool,
    {
        let handles: Vec<RecordHandle> = self.state.read().await.order.clone();

        let mut records = Vec::with_capacity(handles.len());
        for handle in &handles {
            if predicate(handle) {
                records.push(handle.snapshot().await);
            }
        }
        records
    }
}
