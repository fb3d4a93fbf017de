//! Values shared between the software board components and controllers.

use std::sync::{Arc, Mutex, PoisonError};

use cascade_core::bits::Bits;

/// One shared board signal.
#[derive(Debug, Clone, Default)]
pub struct Signal(Arc<Mutex<Bits>>);

impl Signal {
    pub fn get(&self) -> Bits {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn set(&self, value: Bits) {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner) = value;
    }
}

/// Pad buttons, the reset button and the led bank of the `sw` march.
///
/// Pad and reset are written by controllers and latched by their engines once
/// per time step; the led engine publishes its input here.
#[derive(Debug, Clone, Default)]
pub struct Board {
    pub pad: Signal,
    pub reset: Signal,
    pub led: Signal,
}

impl Board {
    pub fn new() -> Self {
        Self::default()
    }
}
