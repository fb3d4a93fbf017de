use cascade_core::bits::Bits;

use crate::board::Signal;
use crate::engine::{Core, SimIo, VId};
use crate::state::{get_scalar, scalar, EngineState, Input};

/// An output device that publishes its input to a shared board signal.
#[derive(Debug)]
pub struct SwLed {
    signal: Signal,
    input: VId,
    val: Bits,
}

impl SwLed {
    pub fn new(signal: Signal, input: VId, width: usize) -> Self {
        let val = Bits::new(width);
        signal.set(val.clone());
        Self { signal, input, val }
    }
}

impl Core for SwLed {
    fn get_state(&self) -> EngineState {
        scalar("val", self.val.clone())
    }

    fn set_state(&mut self, state: &EngineState) {
        if let Some(v) = get_scalar(state, "val") {
            self.val.assign(v);
            self.signal.set(self.val.clone());
        }
    }

    fn get_input(&self) -> Input {
        Input::from([(self.input, self.val.clone())])
    }

    fn set_input(&mut self, input: &Input) {
        if let Some(v) = input.get(&self.input) {
            self.read(self.input, &v.clone());
        }
    }

    fn read(&mut self, vid: VId, value: &Bits) {
        if vid == self.input {
            self.val.assign(value);
            self.signal.set(self.val.clone());
        }
    }

    fn evaluate(&mut self, _io: &mut SimIo) {}

    fn there_are_updates(&self) -> bool {
        false
    }

    fn update(&mut self, _io: &mut SimIo) {}
}
