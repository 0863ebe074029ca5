//! Run table: runner states, suspension and wakeup bookkeeping.
//!
//! Every runner of a network run owns one slot in a [`RunTable`]. A runner
//! that cannot make progress calls [`RunnerHandle::suspend`] while holding the
//! lock of the connection it is blocked on, hands the returned [`Waiter`] to
//! that connection and awaits it. Wakers flip the slot back to `Active` only
//! when the waiter's epoch still matches, so a registration left behind by an
//! earlier wait can never wake the runner out of a later one.
//!
//! The table also answers the deadlock question for its network and, for a
//! nested network, forwards "blocked externally" to the runner of the subnet
//! that owns it.

use crate::error::{Result, RivuletError};
use crate::types::RunnerId;
use parking_lot::Mutex;
use std::fmt;
use std::sync::{Arc, Weak};
use tokio::sync::Notify;
use tracing::trace;

/// Scheduling state of a runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunnerState {
    /// Registered but not yet polled.
    NotStarted,
    /// Running or runnable.
    Active,
    /// Between activations, waiting for actionable input.
    Dormant,
    /// Waiting for a packet on an empty connection.
    SuspRecv,
    /// Waiting for room in a full connection.
    SuspSend,
    /// Waiting for any member of an input collection.
    SuspFipe,
    /// Awaiting slow external work; exempt from deadlock detection.
    LongWait,
    /// Finished normally or by termination.
    Terminated,
    /// Finished with an error.
    Error,
}

impl RunnerState {
    /// Get the diagnostic name of the state.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotStarted => "NOT_STARTED",
            Self::Active => "ACTIVE",
            Self::Dormant => "DORMANT",
            Self::SuspRecv => "SUSP_RECV",
            Self::SuspSend => "SUSP_SEND",
            Self::SuspFipe => "SUSP_FIPE",
            Self::LongWait => "LONG_WAIT",
            Self::Terminated => "TERMINATED",
            Self::Error => "ERROR",
        }
    }

    /// Check if the runner is parked waiting for another runner.
    pub fn is_suspended(&self) -> bool {
        matches!(
            self,
            Self::Dormant | Self::SuspRecv | Self::SuspSend | Self::SuspFipe
        )
    }

    /// Check if the runner can still make progress on its own.
    pub fn is_live(&self) -> bool {
        matches!(self, Self::NotStarted | Self::Active | Self::LongWait)
    }

    /// Check if the runner has exited.
    pub fn is_finished(&self) -> bool {
        matches!(self, Self::Terminated | Self::Error)
    }
}

impl fmt::Display for RunnerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Diagnostic snapshot of one suspended runner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockedRunner {
    /// Full component name.
    pub component: String,
    /// The suspended state.
    pub state: RunnerState,
    /// The connection or port the runner waits on, if known.
    pub blocked_on: Option<String>,
}

impl fmt::Display for BlockedRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.blocked_on {
            Some(on) => write!(f, "{} ({} on {})", self.component, self.state, on),
            None => write!(f, "{} ({})", self.component, self.state),
        }
    }
}

/// Overall status of a run table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunStatus {
    /// At least one runner can make progress.
    Running,
    /// Every runner has exited.
    Finished,
    /// Every unfinished runner is suspended and at least one waits on a
    /// connection of an enclosing network.
    BlockedExternally,
    /// Every unfinished runner is suspended on this network's connections.
    Deadlocked(Vec<BlockedRunner>),
}

#[derive(Debug)]
struct Slot {
    name: String,
    state: RunnerState,
    epoch: u64,
    blocked_on: Option<String>,
    external: bool,
    notify: Arc<Notify>,
}

#[derive(Debug, Default)]
struct TableState {
    slots: Vec<Slot>,
    terminating: bool,
    children: Vec<Weak<RunTable>>,
    proxy_epoch: Option<u64>,
}

impl TableState {
    fn status(&self) -> RunStatus {
        let mut unfinished = false;
        let mut external = false;
        for slot in &self.slots {
            if slot.state.is_finished() {
                continue;
            }
            if slot.state.is_live() {
                return RunStatus::Running;
            }
            unfinished = true;
            external |= slot.external;
        }

        if !unfinished {
            RunStatus::Finished
        } else if external {
            RunStatus::BlockedExternally
        } else {
            RunStatus::Deadlocked(self.blocked())
        }
    }

    fn blocked(&self) -> Vec<BlockedRunner> {
        self.slots
            .iter()
            .filter(|slot| slot.state.is_suspended())
            .map(|slot| BlockedRunner {
                component: slot.name.clone(),
                state: slot.state,
                blocked_on: slot.blocked_on.clone(),
            })
            .collect()
    }

    fn external_block(&self) -> Option<(RunnerState, String)> {
        self.slots
            .iter()
            .find(|slot| slot.external && slot.state.is_suspended())
            .map(|slot| {
                let on = slot.blocked_on.clone().unwrap_or_else(|| slot.name.clone());
                (slot.state, on)
            })
    }
}

/// Runner slots of one network run.
#[derive(Debug)]
pub struct RunTable {
    name: String,
    state: Mutex<TableState>,
    monitor: Notify,
    parent: Option<RunnerHandle>,
}

impl RunTable {
    /// Create a top-level table.
    pub fn new(name: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            state: Mutex::new(TableState::default()),
            monitor: Notify::new(),
            parent: None,
        })
    }

    /// Create a table for a network nested inside the runner `parent`.
    ///
    /// The table is registered as a child of the parent's table so that
    /// terminating the parent reaches it. A table created under a parent that
    /// is already terminating starts out terminating.
    pub fn nested(name: impl Into<String>, parent: &RunnerHandle) -> Arc<Self> {
        let table = Arc::new(Self {
            name: name.into(),
            state: Mutex::new(TableState::default()),
            monitor: Notify::new(),
            parent: Some(parent.clone()),
        });

        let terminating = {
            let mut parent_state = parent.table.state.lock();
            parent_state.children.retain(|child| child.strong_count() > 0);
            parent_state.children.push(Arc::downgrade(&table));
            parent_state.terminating
        };
        if terminating {
            table.state.lock().terminating = true;
        }
        table
    }

    /// Get the network name this table belongs to.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Add a slot for a runner.
    pub fn register(self: &Arc<Self>, name: impl Into<String>) -> RunnerHandle {
        let mut state = self.state.lock();
        let id = RunnerId::new(state.slots.len());
        state.slots.push(Slot {
            name: name.into(),
            state: RunnerState::NotStarted,
            epoch: 0,
            blocked_on: None,
            external: false,
            notify: Arc::new(Notify::new()),
        });
        RunnerHandle {
            table: Arc::clone(self),
            id,
        }
    }

    /// Number of registered runners.
    pub fn len(&self) -> usize {
        self.state.lock().slots.len()
    }

    /// Check if no runner is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Compute the current status.
    pub fn status(&self) -> RunStatus {
        self.state.lock().status()
    }

    /// Get the state of one runner.
    pub fn state_of(&self, id: RunnerId) -> Option<RunnerState> {
        self.state.lock().slots.get(id.index()).map(|slot| slot.state)
    }

    /// Snapshot of every runner's name and state.
    pub fn snapshot(&self) -> Vec<(String, RunnerState)> {
        self.state
            .lock()
            .slots
            .iter()
            .map(|slot| (slot.name.clone(), slot.state))
            .collect()
    }

    /// Wait until any runner changes state.
    ///
    /// A change that happens before this is awaited is not lost.
    pub async fn changed(&self) {
        self.monitor.notified().await;
    }

    /// Check if termination was requested.
    pub fn is_terminating(&self) -> bool {
        self.state.lock().terminating
    }

    /// Request termination of every runner, nested tables included.
    ///
    /// Suspended runners wake with [`RivuletError::Terminated`].
    pub fn terminate(&self) {
        let children: Vec<Arc<RunTable>> = {
            let mut state = self.state.lock();
            if state.terminating {
                return;
            }
            state.terminating = true;
            for slot in &state.slots {
                slot.notify.notify_one();
            }
            state.children.iter().filter_map(Weak::upgrade).collect()
        };
        trace!(network = %self.name, children = children.len(), "run table terminating");
        self.monitor.notify_one();
        for child in children {
            child.terminate();
        }
    }

    fn evaluate(&self) {
        self.monitor.notify_one();
        let Some(parent) = &self.parent else {
            return;
        };

        let mut state = self.state.lock();
        match state.status() {
            RunStatus::BlockedExternally => {
                if state.proxy_epoch.is_none() {
                    if let Some((runner_state, on)) = state.external_block() {
                        state.proxy_epoch = parent.mark_blocked(runner_state, on);
                    }
                }
            }
            _ => {
                if let Some(epoch) = state.proxy_epoch.take() {
                    parent.unmark_blocked(epoch);
                }
            }
        }
    }
}

/// A runner's handle on its slot.
#[derive(Debug, Clone)]
pub struct RunnerHandle {
    table: Arc<RunTable>,
    id: RunnerId,
}

impl RunnerHandle {
    /// Get the runner ID.
    pub fn id(&self) -> RunnerId {
        self.id
    }

    /// Get the table this runner belongs to.
    pub fn table(&self) -> &Arc<RunTable> {
        &self.table
    }

    /// Get the current state.
    pub fn state(&self) -> RunnerState {
        self.table.state.lock().slots[self.id.index()].state
    }

    /// Check if termination was requested.
    pub fn is_terminating(&self) -> bool {
        self.table.is_terminating()
    }

    /// Set a non-suspended state (`Active`, `LongWait`, `Terminated`, `Error`).
    pub fn set_state(&self, new_state: RunnerState) {
        {
            let mut state = self.table.state.lock();
            let slot = &mut state.slots[self.id.index()];
            slot.state = new_state;
            slot.epoch += 1;
            slot.blocked_on = None;
            slot.external = false;
        }
        self.table.evaluate();
    }

    /// Return to `Active` after a suspension that turned out unnecessary.
    ///
    /// Outstanding waiters become stale.
    pub fn resume(&self) {
        self.set_state(RunnerState::Active);
    }

    /// Park this runner in a suspended state.
    ///
    /// Call this while holding the lock of whatever the runner waits on,
    /// register the returned waiter there, release the lock and then await
    /// [`Waiter::wait`].
    pub fn suspend(
        &self,
        suspended: RunnerState,
        blocked_on: impl Into<String>,
        external: bool,
    ) -> Result<Waiter> {
        let epoch = {
            let mut state = self.table.state.lock();
            if state.terminating {
                return Err(RivuletError::Terminated);
            }
            let slot = &mut state.slots[self.id.index()];
            slot.epoch += 1;
            slot.state = suspended;
            slot.blocked_on = Some(blocked_on.into());
            slot.external = external;
            slot.epoch
        };
        self.table.evaluate();
        Ok(Waiter {
            table: Arc::clone(&self.table),
            id: self.id,
            epoch,
        })
    }

    fn mark_blocked(&self, suspended: RunnerState, on: String) -> Option<u64> {
        let epoch = {
            let mut state = self.table.state.lock();
            if state.terminating {
                return None;
            }
            let slot = &mut state.slots[self.id.index()];
            if slot.state != RunnerState::Active {
                return None;
            }
            slot.epoch += 1;
            slot.state = suspended;
            slot.blocked_on = Some(on);
            slot.external = false;
            slot.epoch
        };
        self.table.evaluate();
        Some(epoch)
    }

    fn unmark_blocked(&self, epoch: u64) {
        {
            let mut state = self.table.state.lock();
            let slot = &mut state.slots[self.id.index()];
            if slot.epoch != epoch || !slot.state.is_suspended() {
                return;
            }
            slot.epoch += 1;
            slot.state = RunnerState::Active;
            slot.blocked_on = None;
        }
        self.table.evaluate();
    }
}

/// A registration that can wake one specific suspension of a runner.
#[derive(Debug, Clone)]
pub struct Waiter {
    table: Arc<RunTable>,
    id: RunnerId,
    epoch: u64,
}

impl Waiter {
    /// Get the runner this waiter belongs to.
    pub fn runner(&self) -> RunnerId {
        self.id
    }

    /// Check if the suspension this waiter was issued for is still in effect.
    pub fn is_current(&self) -> bool {
        let state = self.table.state.lock();
        let slot = &state.slots[self.id.index()];
        slot.epoch == self.epoch && slot.state.is_suspended()
    }

    /// Wake the runner if this waiter is still current.
    ///
    /// Returns false for stale registrations.
    pub fn wake(&self) -> bool {
        {
            let mut state = self.table.state.lock();
            let slot = &mut state.slots[self.id.index()];
            if slot.epoch != self.epoch || !slot.state.is_suspended() {
                return false;
            }
            slot.state = RunnerState::Active;
            slot.blocked_on = None;
            slot.external = false;
            slot.notify.notify_one();
        }
        self.table.evaluate();
        true
    }

    /// Wait until woken or terminated.
    pub async fn wait(&self) -> Result<()> {
        loop {
            let notify = {
                let state = self.table.state.lock();
                if state.terminating {
                    return Err(RivuletError::Terminated);
                }
                let slot = &state.slots[self.id.index()];
                if slot.epoch != self.epoch || !slot.state.is_suspended() {
                    return Ok(());
                }
                Arc::clone(&slot.notify)
            };
            notify.notified().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_table_is_finished() {
        let table = RunTable::new("main");
        assert_eq!(table.status(), RunStatus::Finished);
        let runner = table.register("A");
        assert_eq!(table.status(), RunStatus::Running);
        runner.set_state(RunnerState::Terminated);
        assert_eq!(table.status(), RunStatus::Finished);
    }

    #[test]
    fn all_suspended_is_deadlock() {
        let table = RunTable::new("main");
        let a = table.register("A");
        let b = table.register("B");
        let _wa = a.suspend(RunnerState::SuspSend, "A.OUT -> B.IN", false).unwrap();
        assert_eq!(table.status(), RunStatus::Running);
        let _wb = b.suspend(RunnerState::SuspRecv, "C.OUT -> B.DATA", false).unwrap();

        match table.status() {
            RunStatus::Deadlocked(blocked) => {
                assert_eq!(blocked.len(), 2);
                assert_eq!(blocked[0].component, "A");
                assert_eq!(blocked[0].state, RunnerState::SuspSend);
                assert_eq!(blocked[1].blocked_on.as_deref(), Some("C.OUT -> B.DATA"));
            }
            other => panic!("expected deadlock, got {:?}", other),
        }
    }

    #[test]
    fn long_wait_is_exempt() {
        let table = RunTable::new("main");
        let a = table.register("A");
        a.set_state(RunnerState::LongWait);
        assert_eq!(table.status(), RunStatus::Running);
    }

    #[test]
    fn stale_waiter_does_not_wake() {
        let table = RunTable::new("main");
        let a = table.register("A");
        let first = a.suspend(RunnerState::SuspRecv, "x", false).unwrap();
        a.resume();
        let second = a.suspend(RunnerState::SuspRecv, "y", false).unwrap();

        assert!(!first.is_current());
        assert!(!first.wake());
        assert_eq!(a.state(), RunnerState::SuspRecv);
        assert!(second.wake());
        assert_eq!(a.state(), RunnerState::Active);
    }

    #[tokio::test]
    async fn wake_before_wait_is_not_lost() {
        let table = RunTable::new("main");
        let a = table.register("A");
        let waiter = a.suspend(RunnerState::SuspRecv, "x", false).unwrap();
        assert!(waiter.wake());
        waiter.wait().await.unwrap();
    }

    #[tokio::test]
    async fn terminate_reaches_nested_tables() {
        let outer = RunTable::new("outer");
        let subnet = outer.register("Sub");
        let inner = RunTable::nested("outer.Sub", &subnet);
        let a = inner.register("Sub.A");
        let waiter = a.suspend(RunnerState::SuspRecv, "x", false).unwrap();

        outer.terminate();
        assert!(inner.is_terminating());
        assert!(matches!(waiter.wait().await, Err(RivuletError::Terminated)));
        assert!(a.suspend(RunnerState::SuspRecv, "x", false).is_err());

        let late = RunTable::nested("outer.Sub", &subnet);
        assert!(late.is_terminating());
    }

    #[test]
    fn blocked_externally_marks_parent() {
        let outer = RunTable::new("outer");
        let subnet = outer.register("Sub");
        subnet.set_state(RunnerState::Active);
        let inner = RunTable::nested("outer.Sub", &subnet);
        let adapter = inner.register("Sub._in_IN");

        let waiter = adapter
            .suspend(RunnerState::SuspRecv, "Gen.OUT -> Sub.IN", true)
            .unwrap();
        assert_eq!(inner.status(), RunStatus::BlockedExternally);
        assert_eq!(subnet.state(), RunnerState::SuspRecv);

        match outer.status() {
            RunStatus::Deadlocked(blocked) => {
                assert_eq!(blocked[0].blocked_on.as_deref(), Some("Gen.OUT -> Sub.IN"));
            }
            other => panic!("expected deadlock, got {:?}", other),
        }

        assert!(waiter.wake());
        assert_eq!(subnet.state(), RunnerState::Active);
        assert_eq!(outer.status(), RunStatus::Running);
    }
}
