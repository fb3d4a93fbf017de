use std::path::PathBuf;

use cascade_core::bits::Bits;
use tracing::{debug, warn};

use super::{format_hex_words, read_hex_words};
use crate::engine::{Core, SimIo, VId};
use crate::state::{EngineState, Input};

/// Data-plane ids of the memory ports. Unconnected outputs are `None`.
#[derive(Debug, Clone, Default)]
pub struct MemoryPorts {
    pub clock: Option<VId>,
    pub wen: Option<VId>,
    pub raddr1: Option<VId>,
    pub rdata1: Option<VId>,
    pub raddr2: Option<VId>,
    pub rdata2: Option<VId>,
    pub waddr: Option<VId>,
    pub wdata: Option<VId>,
}

/// A memory with two asynchronous read ports and one write port that commits
/// on the rising clock edge.
#[derive(Debug)]
pub struct SwMemory {
    ports: MemoryPorts,
    file: Option<PathBuf>,
    mem: Vec<Bits>,
    clock: bool,
    posedge: bool,
    wen: bool,
    raddr1: usize,
    raddr2: usize,
    waddr: usize,
    wdata: Bits,
    pending: Option<(usize, Bits)>,
    dirty: bool,
}

impl SwMemory {
    pub fn new(ports: MemoryPorts, addr_size: usize, byte_size: usize) -> Self {
        Self {
            ports,
            file: None,
            mem: vec![Bits::new(byte_size); 1 << addr_size],
            clock: false,
            posedge: false,
            wen: false,
            raddr1: 0,
            raddr2: 0,
            waddr: 0,
            wdata: Bits::new(byte_size),
            pending: None,
            dirty: false,
        }
    }

    /// Load initial contents from a hex file; the file is rewritten with the
    /// final contents when the simulation ends.
    pub fn with_file(mut self, file: PathBuf) -> Self {
        let words = read_hex_words(&file, self.wdata.width());
        debug!(path = %file.display(), words = words.len(), "loaded memory image");
        for (slot, word) in self.mem.iter_mut().zip(words) {
            *slot = word;
        }
        self.file = Some(file);
        self
    }

    fn addr(&self, value: &Bits) -> usize {
        value.to_usize() % self.mem.len()
    }

    fn input_values(&self) -> [(Option<VId>, Bits); 6] {
        [
            (self.ports.clock, Bits::from_bool(self.clock)),
            (self.ports.wen, Bits::from_bool(self.wen)),
            (self.ports.raddr1, Bits::from_u64(64, self.raddr1 as u64)),
            (self.ports.raddr2, Bits::from_u64(64, self.raddr2 as u64)),
            (self.ports.waddr, Bits::from_u64(64, self.waddr as u64)),
            (self.ports.wdata, self.wdata.clone()),
        ]
    }
}

impl Core for SwMemory {
    fn get_state(&self) -> EngineState {
        EngineState::from([("mem".to_string(), self.mem.clone())])
    }

    fn set_state(&mut self, state: &EngineState) {
        if let Some(words) = state.get("mem") {
            for (slot, word) in self.mem.iter_mut().zip(words) {
                slot.assign(word);
            }
        }
    }

    fn get_input(&self) -> Input {
        self.input_values()
            .into_iter()
            .filter_map(|(vid, v)| vid.map(|vid| (vid, v)))
            .collect()
    }

    fn set_input(&mut self, input: &Input) {
        for (&vid, value) in input {
            self.read(vid, value);
        }
        // Restored inputs never count as a clock edge.
        self.posedge = false;
    }

    fn read(&mut self, vid: VId, value: &Bits) {
        let id = Some(vid);
        if id == self.ports.clock {
            let old = self.clock;
            self.clock = value.to_bool();
            self.posedge |= !old && self.clock;
        } else if id == self.ports.wen {
            self.wen = value.to_bool();
        } else if id == self.ports.raddr1 {
            self.raddr1 = self.addr(value);
        } else if id == self.ports.raddr2 {
            self.raddr2 = self.addr(value);
        } else if id == self.ports.waddr {
            self.waddr = self.addr(value);
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
            if self.wen {
                self.pending = Some((self.waddr, self.wdata.clone()));
            }
        }
        if let Some(vid) = self.ports.rdata1 {
            io.write(vid, self.mem[self.raddr1].clone());
        }
        if let Some(vid) = self.ports.rdata2 {
            io.write(vid, self.mem[self.raddr2].clone());
        }
    }

    fn there_are_updates(&self) -> bool {
        self.pending.is_some()
    }

    fn update(&mut self, io: &mut SimIo) {
        if let Some((addr, value)) = self.pending.take() {
            self.mem[addr] = value;
        }
        self.evaluate(io);
    }

    fn done_simulation(&mut self) {
        let Some(file) = &self.file else {
            return;
        };
        if let Err(e) = std::fs::write(file, format_hex_words(&self.mem)) {
            warn!(path = %file.display(), error = %e, "unable to write memory image");
        }
    }
}
