//! The async pipe: §5's mechanism for letting instruction-closure
//! discovery (spawned coroutines registering new entities) settle before
//! the scheduler renders the next frame.
//!
//! The source runs on a single JS microtask queue with a process-wide
//! mutation counter and spins `await`ing until it stabilizes. Here the
//! microtask queue is a real executor
//! ([`futures::executor::LocalPool`]), scoped per [`crate::player::Player`]
//! rather than process-wide (see DESIGN.md for that Open Question
//! resolution), and the counter is still kept explicitly so the drain
//! loop can detect stability the same way the source does, rather than
//! relying on `run_until_stalled` alone (which only tells us "no task is
//! currently ready", not "no *new* structural mutation happened").

use std::cell::Cell;
use std::rc::Rc;

use futures::executor::{LocalPool, LocalSpawner};
use futures::task::LocalSpawnExt;

use crate::error::{EngineError, EngineResult};

/// Shared structural-mutation counter plus the executor instructions are
/// spawned onto. One instance per [`crate::player::Player`].
pub struct AsyncPipe {
    pool: std::cell::RefCell<LocalPool>,
    spawner: LocalSpawner,
    counter: Rc<Cell<u64>>,
    max_iterations: u32,
    /// Sticky error slot. [`EntityNode::display_frame`](crate::entity::EntityNode)
    /// has no way to return a `Result` (every concrete entity, including a
    /// nested [`crate::player_entity::PlayerEntityNode`], shares that
    /// signature), yet a `PlayerEntityNode` must itself drive a full
    /// `Timeline::move_to` on its wrapped timeline, which can fail with
    /// [`EngineError::AsyncPipeExhausted`]. That failure is recorded here
    /// and picked up by the outermost `move_to` call once control returns
    /// to it, instead of being silently dropped at the trait boundary.
    sticky_error: Cell<Option<EngineError>>,
}

/// A cheaply-cloneable handle to the counter, threaded down into every
/// [`crate::entity::EntityCore`]-bearing type so structural mutations can
/// bump it.
#[derive(Clone)]
pub struct PipeCounter(Rc<Cell<u64>>);

impl PipeCounter {
    pub fn bump(&self) {
        self.0.set(self.0.get().wrapping_add(1));
        // Periodic truncation: nothing actually depends on the absolute
        // value, only on equality between consecutive reads, so wrapping
        // add already bounds growth; an explicit reset keeps the value
        // small for readability in debug traces.
        if self.0.get() > 1_000_000_000 {
            self.0.set(0);
        }
    }

}

impl AsyncPipe {
    pub fn new(max_iterations: u32) -> Self {
        let pool = LocalPool::new();
        let spawner = pool.spawner();
        AsyncPipe {
            pool: std::cell::RefCell::new(pool),
            spawner,
            counter: Rc::new(Cell::new(0)),
            max_iterations,
            sticky_error: Cell::new(None),
        }
    }

    /// Record a fatal error raised below an infallible [`EntityNode`](
    /// crate::entity::EntityNode) boundary, so the outermost `move_to` can
    /// notice and propagate it once control returns.
    pub fn mark_error(&self, err: EngineError) {
        self.sticky_error.set(Some(err));
    }

    /// Take and clear any sticky error recorded by [`Self::mark_error`].
    pub fn take_error(&self) -> Option<EngineError> {
        self.sticky_error.take()
    }

    pub fn counter_handle(&self) -> PipeCounter {
        PipeCounter(Rc::clone(&self.counter))
    }

    /// Bump the structural-mutation counter directly, for callers already
    /// holding an `Rc<AsyncPipe>` (most of the entity tree) rather than a
    /// separate [`PipeCounter`] handle.
    pub fn bump(&self) {
        self.counter.set(self.counter.get().wrapping_add(1));
    }

    pub fn spawner(&self) -> LocalSpawner {
        self.spawner.clone()
    }

    pub fn spawn(&self, fut: impl std::future::Future<Output = ()> + 'static) {
        // A spawn failure only happens if the pool itself was dropped,
        // which cannot happen while `self` is alive.
        let _ = self.spawner.spawn_local(fut);
    }

    /// §5 `exhaustAsyncPipe`: run the pool until two consecutive readings
    /// of the mutation counter are identical, with at least two
    /// iterations elapsed, bounded by `max_iterations`.
    pub fn exhaust(&self) -> EngineResult<()> {
        let mut last = self.counter.get();
        let mut stable_rounds = 0u32;
        let mut iterations = 0u32;
        loop {
            self.pool.borrow_mut().run_until_stalled();
            let now = self.counter.get();
            if now == last {
                stable_rounds += 1;
            } else {
                stable_rounds = 0;
            }
            last = now;
            iterations += 1;

            if stable_rounds >= 2 {
                return Ok(());
            }
            if iterations >= self.max_iterations {
                return Err(EngineError::AsyncPipeExhausted(iterations));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exhaust_settles_immediately_with_no_pending_work() {
        let pipe = AsyncPipe::new(100);
        assert!(pipe.exhaust().is_ok());
    }

    #[test]
    fn exhaust_drains_a_chain_of_spawned_tasks() {
        let pipe = AsyncPipe::new(100);
        let counter = pipe.counter_handle();
        let spawner = pipe.spawner();
        let depth = Rc::new(Cell::new(0));

        fn spawn_chain(spawner: LocalSpawner, counter: PipeCounter, depth: Rc<Cell<u32>>, n: u32) {
            if n == 0 {
                return;
            }
            let spawner_clone = spawner.clone();
            let _ = spawner.spawn_local(async move {
                counter.bump();
                depth.set(depth.get() + 1);
                spawn_chain(spawner_clone, counter.clone(), depth.clone(), n - 1);
            });
        }
        spawn_chain(spawner, counter, Rc::clone(&depth), 5);
        assert!(pipe.exhaust().is_ok());
        assert_eq!(depth.get(), 5);
    }

    #[test]
    fn exhaust_bails_out_past_max_iterations() {
        let pipe = AsyncPipe::new(3);
        let counter = pipe.counter_handle();
        let spawner = pipe.spawner();
        // Spawn a task that keeps bumping the counter and respawning
        // itself forever: the counter never stabilizes.
        fn respawn_forever(spawner: LocalSpawner, counter: PipeCounter) {
            let spawner_clone = spawner.clone();
            let _ = spawner.spawn_local(async move {
                counter.bump();
                respawn_forever(spawner_clone, counter.clone());
            });
        }
        respawn_forever(spawner, counter);
        assert!(matches!(
            pipe.exhaust(),
            Err(EngineError::AsyncPipeExhausted(_))
        ));
    }
}
