use std::collections::VecDeque;

use cascade_core::bits::Bits;
use tracing::debug;

use super::read_hex_words;
use crate::engine::{Core, SimIo, VId};
use crate::state::{get_scalar, EngineState, Input};

/// Data-plane ids of the fifo ports. Unconnected outputs are `None`.
#[derive(Debug, Clone, Default)]
pub struct FifoPorts {
    pub clock: Option<VId>,
    pub rreq: Option<VId>,
    pub rdata: Option<VId>,
    pub wreq: Option<VId>,
    pub wdata: Option<VId>,
    pub empty: Option<VId>,
    pub full: Option<VId>,
}

/// Words from a data file, replayed `repeats` more times once exhausted.
#[derive(Debug, Default)]
struct Source {
    words: Vec<Bits>,
    cursor: usize,
    repeats: usize,
}

impl Source {
    fn is_empty(&self) -> bool {
        self.cursor >= self.words.len() && (self.repeats == 0 || self.words.is_empty())
    }

    fn next(&mut self) -> Option<Bits> {
        if self.words.is_empty() {
            return None;
        }
        if self.cursor >= self.words.len() {
            if self.repeats == 0 {
                return None;
            }
            self.repeats -= 1;
            self.cursor = 0;
        }
        self.cursor += 1;
        Some(self.words[self.cursor - 1].clone())
    }
}

/// A bounded queue. Requests are sampled on the rising clock edge; `rdata`
/// holds the most recently popped word.
#[derive(Debug)]
pub struct SwFifo {
    ports: FifoPorts,
    depth: usize,
    queue: VecDeque<Bits>,
    source: Source,
    rdata: Bits,
    clock: bool,
    posedge: bool,
    rreq: bool,
    wreq: bool,
    wdata: Bits,
    push: Option<Bits>,
    pop: bool,
    dirty: bool,
}

impl SwFifo {
    pub fn new(ports: FifoPorts, depth: usize, byte_size: usize) -> Self {
        Self {
            ports,
            depth: depth.max(1),
            queue: VecDeque::new(),
            source: Source::default(),
            rdata: Bits::new(byte_size),
            clock: false,
            posedge: false,
            rreq: false,
            wreq: false,
            wdata: Bits::new(byte_size),
            push: None,
            pop: false,
            dirty: false,
        }
    }

    /// Fill the fifo from a hex file, replaying it `count` times in total.
    pub fn with_file(mut self, file: &std::path::Path, count: usize) -> Self {
        let words = read_hex_words(file, self.wdata.width());
        debug!(path = %file.display(), words = words.len(), count, "loaded fifo data");
        self.source = Source {
            words,
            cursor: 0,
            repeats: count.saturating_sub(1),
        };
        self.refill();
        self
    }

    fn is_full(&self) -> bool {
        self.queue.len() >= self.depth
    }

    fn refill(&mut self) {
        while !self.is_full() {
            match self.source.next() {
                Some(w) => self.queue.push_back(w),
                None => break,
            }
        }
    }
}

impl Core for SwFifo {
    fn get_state(&self) -> EngineState {
        EngineState::from([
            ("queue".to_string(), self.queue.iter().cloned().collect()),
            ("rdata".to_string(), vec![self.rdata.clone()]),
            (
                "cursor".to_string(),
                vec![Bits::from_u64(64, self.source.cursor as u64)],
            ),
            (
                "repeats".to_string(),
                vec![Bits::from_u64(64, self.source.repeats as u64)],
            ),
        ])
    }

    fn set_state(&mut self, state: &EngineState) {
        if let Some(words) = state.get("queue") {
            self.queue = words
                .iter()
                .take(self.depth)
                .map(|w| w.resized(self.wdata.width()))
                .collect();
        }
        if let Some(v) = get_scalar(state, "rdata") {
            self.rdata.assign(v);
        }
        if let Some(v) = get_scalar(state, "cursor") {
            self.source.cursor = v.to_usize();
        }
        if let Some(v) = get_scalar(state, "repeats") {
            self.source.repeats = v.to_usize();
        }
    }

    fn get_input(&self) -> Input {
        [
            (self.ports.clock, Bits::from_bool(self.clock)),
            (self.ports.rreq, Bits::from_bool(self.rreq)),
            (self.ports.wreq, Bits::from_bool(self.wreq)),
            (self.ports.wdata, self.wdata.clone()),
        ]
        .into_iter()
        .filter_map(|(vid, v)| vid.map(|vid| (vid, v)))
        .collect()
    }

    fn set_input(&mut self, input: &Input) {
        for (&vid, value) in input {
            self.read(vid, value);
        }
        self.posedge = false;
    }

    fn read(&mut self, vid: VId, value: &Bits) {
        let id = Some(vid);
        if id == self.ports.clock {
            let old = self.clock;
            self.clock = value.to_bool();
            self.posedge |= !old && self.clock;
        } else if id == self.ports.rreq {
            self.rreq = value.to_bool();
        } else if id == self.ports.wreq {
            self.wreq = value.to_bool();
        } else if id == self.ports.wdata {
            self.wdata.assign(value);
        } else {
            return;
        }
        self.dirty = true;
    }

    fn there_are_reads(&self) -> bool {
        self.dirty
    }

    fn evaluate(&mut self, io: &mut SimIo) {
        self.dirty = false;
        if self.posedge {
            self.posedge = false;
            self.pop = self.rreq;
            self.push = self.wreq.then(|| self.wdata.clone());
        }
        if let Some(vid) = self.ports.rdata {
            io.write(vid, self.rdata.clone());
        }
        if let Some(vid) = self.ports.empty {
            io.write(vid, Bits::from_bool(self.queue.is_empty() && self.source.is_empty()));
        }
        if let Some(vid) = self.ports.full {
            io.write(vid, Bits::from_bool(self.is_full() || !self.source.is_empty()));
        }
    }

    fn there_are_updates(&self) -> bool {
        self.pop || self.push.is_some()
    }

    fn update(&mut self, io: &mut SimIo) {
        if std::mem::take(&mut self.pop) {
            if let Some(w) = self.queue.pop_front() {
                self.rdata = w;
            }
        }
        self.refill();
        if let Some(w) = self.push.take() {
            if !self.is_full() {
                self.queue.push_back(w);
            }
        }
        self.evaluate(io);
    }
}
