//! Software engines: the user-logic interpreter and models of the standard
//! library components.

mod clock;
mod fifo;
mod led;
mod logic;
mod memory;
mod pad;

pub use clock::SwClock;
pub use fifo::{FifoPorts, SwFifo};
pub use led::SwLed;
pub use logic::SwLogic;
pub use memory::{MemoryPorts, SwMemory};
pub use pad::SwPad;

use std::path::Path;

use cascade_core::bits::Bits;

/// Parse whitespace-separated hex words, each resized to `width`. Unreadable
/// files and malformed words end the list.
pub(crate) fn read_hex_words(path: &Path, width: usize) -> Vec<Bits> {
    let Ok(text) = std::fs::read_to_string(path) else {
        tracing::warn!(path = %path.display(), "unable to read data file");
        return Vec::new();
    };
    text.split_whitespace()
        .map_while(|w| Bits::parse_radix(w, 16).ok())
        .map(|b| b.resized(width))
        .collect()
}

/// Format words as hex, eight per line.
pub(crate) fn format_hex_words(words: &[Bits]) -> String {
    let mut out = String::new();
    for (i, w) in words.iter().enumerate() {
        out.push_str(&w.to_string_radix(16));
        out.push(if (i + 1) % 8 == 0 { '\n' } else { ' ' });
    }
    out
}
