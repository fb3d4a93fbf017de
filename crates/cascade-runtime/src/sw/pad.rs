use cascade_core::bits::Bits;

use crate::board::Signal;
use crate::engine::{Core, SimIo, VId};
use crate::state::{get_scalar, scalar, EngineState, Input};

/// An input device (pad buttons or the reset button) backed by a shared
/// board signal. The signal is latched once per time step.
#[derive(Debug)]
pub struct SwPad {
    signal: Signal,
    out: VId,
    val: Bits,
    pending: bool,
}

impl SwPad {
    pub fn new(signal: Signal, out: VId, width: usize) -> Self {
        Self {
            signal,
            out,
            val: Bits::new(width),
            pending: false,
        }
    }
}

impl Core for SwPad {
    fn get_state(&self) -> EngineState {
        scalar("val", self.val.clone())
    }

    fn set_state(&mut self, state: &EngineState) {
        if let Some(v) = get_scalar(state, "val") {
            self.val.assign(v);
        }
    }

    fn get_input(&self) -> Input {
        Input::new()
    }

    fn set_input(&mut self, _input: &Input) {}

    fn read(&mut self, _vid: VId, _value: &Bits) {}

    fn evaluate(&mut self, io: &mut SimIo) {
        io.write(self.out, self.val.clone());
    }

    fn there_are_updates(&self) -> bool {
        self.pending
    }

    fn update(&mut self, io: &mut SimIo) {
        self.pending = false;
        io.write(self.out, self.val.clone());
    }

    fn done_step(&mut self) {
        let latched = self.signal.get().resized(self.val.width());
        if latched != self.val {
            self.val = latched;
            self.pending = true;
        }
    }
}
