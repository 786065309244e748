//! A pure time-filler leaf entity: occupies a span of the timeline
//! without touching any target. Used for `delay()` DSL calls and for the
//! implicit gap a sequence leaves between consecutive steps.

use crate::entity::{check_done_and_release, init, CheckOutcome, EntityCore, EntityNode};

pub struct Delay {
    core: EntityCore,
}

impl Delay {
    pub fn new(duration_ms: i64) -> Self {
        Delay {
            core: EntityCore::new("delay", 0, 0, duration_ms.max(0)),
        }
    }

    pub fn init_at(&mut self, start_time: i64) {
        init(&mut self.core, start_time);
    }
}

impl EntityNode for Delay {
    fn core(&self) -> &EntityCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut EntityCore {
        &mut self.core
    }

    fn display_frame(&mut self, time: i64, _target_time: i64, forward: bool) -> CheckOutcome {
        check_done_and_release(&mut self.core, time, forward)
    }
}
