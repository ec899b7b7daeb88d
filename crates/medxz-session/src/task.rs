//! Task bookkeeping for latest-only async results.
//!
//! Session checks are latest-only: every new trigger takes a fresh `TaskId`
//! from `TaskSeq`, and a completion is applied only while its id is still the
//! active one. Submits (login/logout) are counted rather than superseded, so
//! every caller gets its own answer.

use tokio_util::sync::CancellationToken;

/// Opaque id for matching async results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId(pub u64);

/// Monotonic id generator.
#[derive(Debug, Default)]
pub struct TaskSeq {
    next: u64,
}

impl TaskSeq {
    pub fn next_id(&mut self) -> TaskId {
        let id = TaskId(self.next);
        self.next = self.next.wrapping_add(1);
        id
    }
}

/// Lifecycle of a latest-only task (mutated only by the reducer).
#[derive(Debug, Default, Clone)]
pub struct TaskState {
    pub active: Option<TaskId>,
    pub cancel: Option<CancellationToken>,
    /// Set once the task got past its delay and issued the remote call.
    pub started: bool,
}

impl TaskState {
    pub fn is_running(&self) -> bool {
        self.active.is_some()
    }

    pub fn is_active(&self, id: TaskId) -> bool {
        self.active == Some(id)
    }

    /// Replaces the active task, returning the previous cancel token.
    ///
    /// `started` carries over: a superseded call that is already on the wire
    /// still counts as running until the replacement finishes.
    pub fn begin(&mut self, id: TaskId, cancel: CancellationToken) -> Option<CancellationToken> {
        self.active = Some(id);
        self.cancel.replace(cancel)
    }

    pub fn mark_started(&mut self, id: TaskId) -> bool {
        let ok = self.is_active(id);
        if ok {
            self.started = true;
        }
        ok
    }

    pub fn finish_if_active(&mut self, id: TaskId) -> bool {
        let ok = self.is_active(id);
        if ok {
            self.clear();
        }
        ok
    }

    /// Forgets the active task, returning its cancel token.
    pub fn take(&mut self) -> Option<CancellationToken> {
        let cancel = self.cancel.take();
        self.clear();
        cancel
    }

    fn clear(&mut self) {
        self.active = None;
        self.cancel = None;
        self.started = false;
    }
}

/// In-flight submit counters.
#[derive(Debug, Default, Clone, Copy)]
pub struct SubmitCounts {
    pub login: usize,
    pub logout: usize,
}

impl SubmitCounts {
    pub fn any(&self) -> bool {
        self.login > 0 || self.logout > 0
    }
}

#[derive(Debug, Default, Clone)]
pub struct Tasks {
    pub session_check: TaskState,
    pub submits: SubmitCounts,
}
