use cascade_core::bits::Bits;

use crate::engine::{Core, SimIo, VId};
use crate::state::{get_scalar, scalar, EngineState, Input};

/// A clock that toggles once per time step.
#[derive(Debug)]
pub struct SwClock {
    out: VId,
    val: bool,
    pending: bool,
}

impl SwClock {
    pub fn new(out: VId) -> Self {
        Self {
            out,
            val: false,
            pending: true,
        }
    }

    pub fn out(&self) -> VId {
        self.out
    }
}

impl Core for SwClock {
    fn get_state(&self) -> EngineState {
        scalar("val", Bits::from_bool(self.val))
    }

    fn set_state(&mut self, state: &EngineState) {
        if let Some(v) = get_scalar(state, "val") {
            self.val = v.to_bool();
        }
    }

    fn get_input(&self) -> Input {
        Input::new()
    }

    fn set_input(&mut self, _input: &Input) {}

    fn read(&mut self, _vid: VId, _value: &Bits) {}

    fn evaluate(&mut self, io: &mut SimIo) {
        io.write(self.out, Bits::from_bool(self.val));
    }

    fn there_are_updates(&self) -> bool {
        self.pending
    }

    fn update(&mut self, io: &mut SimIo) {
        self.pending = false;
        self.val = !self.val;
        io.write(self.out, Bits::from_bool(self.val));
    }

    fn done_step(&mut self) {
        self.pending = true;
    }

    fn is_clock(&self) -> bool {
        true
    }
}
