//! Turns an elaborated design into software engines.

use std::collections::HashMap;
use std::path::PathBuf;

use cascade_util::fs::IncludePath;
use cascade_verilog::ir::{Design, Direction, StdInstance};
use miette::Diagnostic;
use thiserror::Error;
use tracing::debug;

use crate::board::Board;
use crate::data_plane::DataPlane;
use crate::engine::{Core, VId};
use crate::sw::{FifoPorts, MemoryPorts, SwClock, SwFifo, SwLed, SwLogic, SwMemory, SwPad};

/// Largest supported memory address width.
pub const MAX_ADDR_SIZE: u64 = 24;

#[derive(Debug, Error, Diagnostic)]
pub enum CompileError {
    #[error("standard component `{instance}` has no `{port}` port")]
    #[diagnostic(code(cascade::compile::port))]
    MissingPort { instance: String, port: String },

    #[error("memory `{instance}` has ADDR_SIZE {size}; at most {MAX_ADDR_SIZE} is supported")]
    #[diagnostic(code(cascade::compile::memory))]
    MemoryTooLarge { instance: String, size: u64 },

    #[error("no software engine for `{kind}` component `{instance}`")]
    #[diagnostic(code(cascade::compile::unsupported))]
    Unsupported { instance: String, kind: String },
}

/// Builds software engines, allocating data-plane ids for every standard
/// component port it meets.
#[derive(Debug, Clone)]
pub struct SwCompiler {
    board: Board,
    include: IncludePath,
}

impl SwCompiler {
    pub fn new(board: Board, include: IncludePath) -> Self {
        Self { board, include }
    }

    fn port_vid(
        design: &Design,
        inst: &StdInstance,
        port: &str,
        dp: &mut DataPlane,
    ) -> Option<VId> {
        inst.port(port).map(|p| dp.vid(&design.var(p.var).name))
    }

    fn required(
        design: &Design,
        inst: &StdInstance,
        port: &str,
        dp: &mut DataPlane,
    ) -> Result<(VId, usize), CompileError> {
        let p = inst.port(port).ok_or_else(|| CompileError::MissingPort {
            instance: inst.name.clone(),
            port: port.to_string(),
        })?;
        Ok((dp.vid(&design.var(p.var).name), design.var(p.var).width))
    }

    fn data_file(&self, name: &str) -> PathBuf {
        self.include
            .resolve(name, None)
            .unwrap_or_else(|| PathBuf::from(name))
    }

    /// Engine for one standard component instance.
    pub fn compile_std(
        &self,
        design: &Design,
        inst: &StdInstance,
        dp: &mut DataPlane,
    ) -> Result<Box<dyn Core>, CompileError> {
        debug!(instance = %inst.name, kind = %inst.kind, "compiling standard component");
        let engine: Box<dyn Core> = match inst.kind.as_str() {
            "clock" => {
                let (out, _) = Self::required(design, inst, "val", dp)?;
                Box::new(SwClock::new(out))
            }
            "pad" => {
                let (out, width) = Self::required(design, inst, "val", dp)?;
                Box::new(SwPad::new(self.board.pad.clone(), out, width))
            }
            "reset" => {
                let (out, width) = Self::required(design, inst, "val", dp)?;
                Box::new(SwPad::new(self.board.reset.clone(), out, width))
            }
            "led" => {
                let (input, width) = Self::required(design, inst, "val", dp)?;
                Box::new(SwLed::new(self.board.led.clone(), input, width))
            }
            "memory" => {
                let addr_size = inst.param("ADDR_SIZE").unwrap_or(4);
                if addr_size > MAX_ADDR_SIZE {
                    return Err(CompileError::MemoryTooLarge {
                        instance: inst.name.clone(),
                        size: addr_size,
                    });
                }
                let byte_size = inst.param("BYTE_SIZE").unwrap_or(8) as usize;
                let mut vid = |port: &str| Self::port_vid(design, inst, port, dp);
                let ports = MemoryPorts {
                    clock: vid("clock"),
                    wen: vid("wen"),
                    raddr1: vid("raddr1"),
                    rdata1: vid("rdata1"),
                    raddr2: vid("raddr2"),
                    rdata2: vid("rdata2"),
                    waddr: vid("waddr"),
                    wdata: vid("wdata"),
                };
                let mem = SwMemory::new(ports, addr_size as usize, byte_size.max(1));
                match inst.attr_str("file") {
                    Some(file) => Box::new(mem.with_file(self.data_file(file))),
                    None => Box::new(mem),
                }
            }
            "fifo" => {
                let depth = inst.param("DEPTH").unwrap_or(8) as usize;
                let byte_size = inst.param("BYTE_SIZE").unwrap_or(8) as usize;
                let mut vid = |port: &str| Self::port_vid(design, inst, port, dp);
                let ports = FifoPorts {
                    clock: vid("clock"),
                    rreq: vid("rreq"),
                    rdata: vid("rdata"),
                    wreq: vid("wreq"),
                    wdata: vid("wdata"),
                    empty: vid("empty"),
                    full: vid("full"),
                };
                let fifo = SwFifo::new(ports, depth, byte_size.max(1));
                match inst.attr_str("file") {
                    Some(file) => {
                        let count = inst.attr_u64("count").unwrap_or(1) as usize;
                        Box::new(fifo.with_file(&self.data_file(file), count))
                    }
                    None => Box::new(fifo),
                }
            }
            _ => {
                return Err(CompileError::Unsupported {
                    instance: inst.name.clone(),
                    kind: inst.kind.clone(),
                })
            }
        };
        Ok(engine)
    }

    /// The interpreter for all user logic. Initial blocks from root items
    /// before `first_origin` have already run and are left out.
    pub fn compile_logic(&self, design: &Design, first_origin: usize, dp: &mut DataPlane) -> SwLogic {
        let mut reads = HashMap::new();
        let mut writes = Vec::new();
        for inst in &design.std_instances {
            for port in &inst.ports {
                let vid = dp.vid(&design.var(port.var).name);
                match port.dir {
                    Direction::Output => {
                        reads.insert(vid, port.var);
                    }
                    Direction::Input | Direction::Inout => writes.push((port.var, vid)),
                }
            }
        }
        debug!(
            processes = design.processes.len(),
            reads = reads.len(),
            writes = writes.len(),
            first_origin,
            "compiling user logic"
        );
        SwLogic::new(design, first_origin, reads, writes)
    }
}
