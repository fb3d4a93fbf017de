//! March targets: named Verilog preludes evaluated before any user input.
//!
//! Every march declares the standard library and instantiates a set of
//! standard components in the root module. Standard declarations carry a
//! `__std` attribute naming the component kind; the elaborator uses it to keep
//! those instances out of the flattened user logic.

use std::fmt;
use std::str::FromStr;

use cascade_util::errors::CascadeError;

/// Declarations of the standard library components.
pub const STDLIB: &str = r#"(*__std = "clock"*)
module Clock(
  output wire val
);
endmodule

(*__std = "pad"*)
module Pad#(
  parameter WIDTH = 4
)(
  output wire[WIDTH-1:0] val
);
endmodule

(*__std = "led"*)
module Led#(
  parameter WIDTH = 8
)(
  input wire[WIDTH-1:0] val
);
endmodule

(*__std = "reset"*)
module Reset(
  output wire val
);
endmodule

(*__std = "memory"*)
module Memory#(
  parameter ADDR_SIZE = 4,
  parameter BYTE_SIZE = 8
)(
  input wire clock,
  input wire wen,
  input wire[ADDR_SIZE-1:0] raddr1,
  output wire[BYTE_SIZE-1:0] rdata1,
  input wire[ADDR_SIZE-1:0] raddr2,
  output wire[BYTE_SIZE-1:0] rdata2,
  input wire[ADDR_SIZE-1:0] waddr,
  input wire[BYTE_SIZE-1:0] wdata
);
endmodule

(*__std = "fifo"*)
module Fifo#(
  parameter DEPTH = 8,
  parameter BYTE_SIZE = 8
)(
  input wire clock,
  input wire rreq,
  output wire[BYTE_SIZE-1:0] rdata,
  input wire wreq,
  input wire[BYTE_SIZE-1:0] wdata,
  output wire empty,
  output wire full
);
endmodule
"#;

/// A named target configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum March {
    /// The standard library and a clock.
    Minimal,
    /// `Minimal` plus a 4-bit pad, an 8-bit led bank and a reset button.
    Sw,
}

impl March {
    pub const ALL: [March; 2] = [March::Minimal, March::Sw];

    pub fn name(&self) -> &'static str {
        match self {
            March::Minimal => "minimal",
            March::Sw => "sw",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            March::Minimal => "standard library and a software clock",
            March::Sw => "software clock, 4-bit pad, 8-bit leds and a reset button",
        }
    }

    /// Root-module items instantiated by this march.
    pub fn instances(&self) -> &'static str {
        match self {
            March::Minimal => "Clock clock();\n",
            March::Sw => "Clock clock();\nPad#(4) pad();\nLed#(8) led();\nReset reset();\n",
        }
    }

    /// Full prelude: standard library declarations followed by instances.
    pub fn source(&self) -> String {
        format!("{STDLIB}\n{}", self.instances())
    }

    /// Pseudo-path used when reporting errors inside the prelude.
    pub fn path(&self) -> String {
        format!("<march/{}.v>", self.name())
    }
}

impl fmt::Display for March {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for March {
    type Err = CascadeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        March::ALL
            .iter()
            .copied()
            .find(|m| m.name() == s)
            .ok_or_else(|| CascadeError::Generic {
                message: format!(
                    "Unrecognized march option {s}! Expected one of: {}",
                    March::ALL.map(|m| m.name()).join(", ")
                ),
            })
    }
}
