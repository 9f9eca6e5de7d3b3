/*!
 * Arena Nodes
 * One arena in the pool tree
 */

use super::cleanup::{CleanupEntry, CleanupFn, CleanupToken};
use crate::core::types::ArenaId;
use bumpalo::Bump;
use parking_lot::{Mutex, ReentrantMutex};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

/// What an arena scopes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArenaKind {
    /// Plain child scope requested by a resource module
    Scope,
    /// Arena owned by exactly one native object
    Object,
}

#[derive(Clone, Copy)]
pub(crate) struct ChildLink {
    pub(crate) id: ArenaId,
    pub(crate) kind: ArenaKind,
}

pub(crate) struct NodeState {
    pub(crate) alive: bool,
    pub(crate) children: Vec<ChildLink>,
    pub(crate) cleanups: Vec<CleanupEntry>,
    next_token: u64,
    pub(crate) scratch: Bump,
}

impl NodeState {
    pub(crate) fn push_cleanup(&mut self, run: CleanupFn) -> CleanupToken {
        let token = CleanupToken(self.next_token);
        self.next_token += 1;
        self.cleanups.push(CleanupEntry { token, run });
        token
    }

    pub(crate) fn remove_cleanup(&mut self, token: CleanupToken) -> bool {
        match self.cleanups.iter().position(|entry| entry.token == token) {
            Some(position) => {
                self.cleanups.remove(position);
                true
            }
            None => false,
        }
    }

    /// Children in teardown order: scopes before object arenas, newest first
    pub(crate) fn teardown_order(&self) -> Vec<ArenaId> {
        let scopes = self
            .children
            .iter()
            .rev()
            .filter(|child| child.kind == ArenaKind::Scope);
        let objects = self
            .children
            .iter()
            .rev()
            .filter(|child| child.kind == ArenaKind::Object);
        scopes.chain(objects).map(|child| child.id).collect()
    }
}

pub(crate) struct PoolNode {
    pub(crate) id: ArenaId,
    pub(crate) parent: Option<Weak<PoolNode>>,
    pub(crate) depth: u32,
    pub(crate) kind: ArenaKind,
    /// Dedicated ancestry lock; the root always carries one
    pub(crate) mutex: Option<Arc<ReentrantMutex<()>>>,
    closing: AtomicBool,
    pub(crate) state: Mutex<NodeState>,
}

impl PoolNode {
    pub(crate) fn new(
        id: ArenaId,
        parent: Option<&Arc<PoolNode>>,
        kind: ArenaKind,
        exclusive: bool,
        scratch_capacity: usize,
    ) -> Self {
        Self {
            id,
            parent: parent.map(Arc::downgrade),
            depth: parent.map_or(0, |p| p.depth + 1),
            kind,
            mutex: exclusive.then(|| Arc::new(ReentrantMutex::new(()))),
            closing: AtomicBool::new(false),
            state: Mutex::new(NodeState {
                alive: true,
                children: Vec::new(),
                cleanups: Vec::new(),
                next_token: 0,
                scratch: Bump::with_capacity(scratch_capacity),
            }),
        }
    }

    #[inline]
    pub(crate) fn is_closing(&self) -> bool {
        self.closing.load(Ordering::Acquire)
    }

    pub(crate) fn mark_closing(&self) {
        self.closing.store(true, Ordering::Release);
    }

    pub(crate) fn is_alive(&self) -> bool {
        self.state.lock().alive
    }

    pub(crate) fn parent(&self) -> Option<Arc<PoolNode>> {
        self.parent.as_ref().and_then(Weak::upgrade)
    }
}
