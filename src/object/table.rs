/*!
 * Object Table
 * Generation-checked table of live native objects
 */

use super::cell::ObjectCell;
use crate::core::data_structures::{SlotMap, SlotMiss};
use crate::core::errors::{LifecycleError, LifecycleResult};
use crate::core::types::ObjectId;
use crate::monitoring::LifecycleStats;
use parking_lot::RwLock;
use std::sync::Arc;

pub(crate) struct ObjectTable {
    cells: RwLock<SlotMap<ObjectId, Arc<ObjectCell>>>,
    stats: Arc<LifecycleStats>,
}

impl ObjectTable {
    pub(crate) fn new(stats: Arc<LifecycleStats>) -> Self {
        Self {
            cells: RwLock::new(SlotMap::new()),
            stats,
        }
    }

    pub(crate) fn alloc(&self) -> ObjectId {
        let stats = self.stats.clone();
        let id = self
            .cells
            .write()
            .insert_with(|id| Arc::new(ObjectCell::new(id, stats)));
        self.stats.record_object_allocated();
        id
    }

    /// Resolve an id; a released id is `AlreadyFinalized`
    pub(crate) fn get(&self, id: ObjectId) -> LifecycleResult<Arc<ObjectCell>> {
        match self.cells.read().get(id) {
            Ok(cell) => Ok(cell.clone()),
            Err(SlotMiss::Released) => Err(LifecycleError::AlreadyFinalized(id)),
            Err(SlotMiss::Unknown) => Err(LifecycleError::InvalidHandle(id)),
        }
    }

    /// Deallocate the table slot; in-flight guards keep the cell alive
    pub(crate) fn remove(&self, id: ObjectId) -> Option<Arc<ObjectCell>> {
        let removed = self.cells.write().remove(id).ok();
        if removed.is_some() {
            self.stats.record_object_released();
        }
        removed
    }

    pub(crate) fn len(&self) -> usize {
        self.cells.read().len()
    }
}
