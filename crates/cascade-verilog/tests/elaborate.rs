use cascade_core::march::March;
use cascade_verilog::ast::{Direction, Edge, SourceElement};
use cascade_verilog::ir::{Design, ProcessKind, Stmt, Trigger, VarKind};
use cascade_verilog::{elaborate, parse, Program, SourceFile};

fn load(program: &mut Program, text: &str) {
    for elem in parse(&SourceFile::new("<test>", text)).unwrap() {
        match elem {
            SourceElement::Module(m) => program.declare(m).unwrap(),
            SourceElement::Item(i) => program.eval(i).unwrap(),
            SourceElement::Include { .. } => panic!("unexpected include"),
        };
    }
}

fn design(march: March, text: &str) -> Design {
    let mut program = Program::new();
    load(&mut program, &march.source());
    load(&mut program, text);
    elaborate(&program).unwrap()
}

#[test]
fn test_march_instances() {
    let d = design(March::Sw, "");
    let names: Vec<_> = d.std_instances.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["clock", "pad", "led", "reset"]);

    let led = &d.std_instances[2];
    assert_eq!(led.kind, "led");
    assert_eq!(led.param("WIDTH"), Some(8));
    let port = led.port("val").unwrap();
    assert_eq!(port.dir, Direction::Input);
    assert_eq!(d.var(port.var).name, "led.val");
    assert_eq!(d.var(port.var).width, 8);

    let pad = d.var(d.var_id("pad.val").unwrap());
    assert_eq!(pad.width, 4);
    assert_eq!(pad.std_port, Some(Direction::Output));
    assert!(d.processes.is_empty());
}

#[test]
fn test_flattened_user_module() {
    let d = design(
        March::Minimal,
        "module Counter#(parameter W = 4)(input wire clk, output reg [W-1:0] q);
           always @(posedge clk) q <= q + 1;
         endmodule
         Counter#(.W(8)) c(.clk(clock.val));",
    );
    let q = d.var(d.var_id("c.q").unwrap());
    assert_eq!(q.width, 8);
    assert_eq!(q.kind, VarKind::Variable);
    let clk = d.var_id("c.clk").unwrap();
    assert_eq!(d.var(clk).kind, VarKind::Net);

    // The port connection and the always block both come from root item 1.
    assert_eq!(d.processes.len(), 2);
    assert!(d.processes.iter().all(|p| p.origin == 1));
    let always = d
        .processes
        .iter()
        .find_map(|p| match &p.kind {
            ProcessKind::Always { trigger, .. } => Some(trigger),
            _ => None,
        })
        .unwrap();
    match always {
        Trigger::Events(events) => assert_eq!(events, &vec![(Edge::Pos, clk)]),
        other => panic!("unexpected trigger {other:?}"),
    }
}

#[test]
fn test_output_connection_drives_parent() {
    let d = design(
        March::Minimal,
        "module Not(input wire a, output wire b); assign b = ~a; endmodule
         reg x = 0;
         wire y;
         Not n(.a(x), .b(y));",
    );
    let y = d.var_id("y").unwrap();
    let drives_y = d.processes.iter().any(|p| match &p.kind {
        ProcessKind::Assign { lhs, .. } => {
            let mut writes = Vec::new();
            lhs.writes(&mut writes);
            writes == vec![y]
        }
        _ => false,
    });
    assert!(drives_y);
}

#[test]
fn test_initializers() {
    let d = design(March::Minimal, "reg [3:0] r = 5; wire [3:0] w = r;");
    let kinds: Vec<_> = d
        .processes
        .iter()
        .map(|p| match &p.kind {
            ProcessKind::Initial {
                body: Stmt::Blocking(..),
            } => "initial",
            ProcessKind::Assign { .. } => "assign",
            _ => "other",
        })
        .collect();
    assert_eq!(kinds, vec!["initial", "assign"]);
}

#[test]
fn test_params_shape_declarations() {
    let d = design(
        March::Minimal,
        "localparam N = 3; reg [N:0] x; reg [7:0] mem[0:N]; integer i;",
    );
    assert_eq!(d.var(d.var_id("x").unwrap()).width, 4);
    let mem = d.var(d.var_id("mem").unwrap());
    assert_eq!(mem.width, 8);
    assert_eq!(mem.len(), 4);
    assert_eq!(mem.element(&[2]), Some(2));
    assert_eq!(mem.element(&[4]), None);
    let i = d.var(d.var_id("i").unwrap());
    assert_eq!(i.width, 32);
    assert!(i.signed);
}

#[test]
fn test_star_trigger_reads_body() {
    let d = design(
        March::Minimal,
        "reg a = 0; reg b = 0; reg c; always @(*) c = a & b;",
    );
    let a = d.var_id("a").unwrap();
    let b = d.var_id("b").unwrap();
    let trigger = d
        .processes
        .iter()
        .find_map(|p| match &p.kind {
            ProcessKind::Always { trigger, .. } => Some(trigger.clone()),
            _ => None,
        })
        .unwrap();
    match trigger {
        Trigger::Star(vars) => assert_eq!(vars, vec![a, b]),
        other => panic!("unexpected trigger {other:?}"),
    }
}

#[test]
fn test_nested_hierarchy_names() {
    let d = design(
        March::Minimal,
        "module Leaf(input wire i); reg r; endmodule
         module Mid(input wire i); Leaf l(.i(i)); endmodule
         Mid m(.i(clock.val));",
    );
    assert!(d.var_id("m.l.r").is_some());
    assert!(d.var_id("m.l.i").is_some());
    assert!(d.var_id("m.i").is_some());
}

#[test]
fn test_std_component_inside_user_module() {
    let d = design(
        March::Minimal,
        "module Top(input wire clk); (*file = \"mem.hex\"*) Memory#(2, 16) ram(.clock(clk)); endmodule
         Top t(.clk(clock.val));",
    );
    let ram = d.std_instances.iter().find(|s| s.kind == "memory").unwrap();
    assert_eq!(ram.name, "t.ram");
    assert_eq!(ram.param("ADDR_SIZE"), Some(2));
    assert_eq!(ram.param("BYTE_SIZE"), Some(16));
    assert_eq!(ram.attr_str("file"), Some("mem.hex"));
    assert_eq!(d.var(ram.port("rdata1").unwrap().var).width, 16);
}

fn elab_error(text: &str) -> String {
    let mut program = Program::new();
    load(&mut program, &March::Minimal.source());
    load(&mut program, text);
    elaborate(&program).unwrap_err().to_string()
}

#[test]
fn test_oversized_widths_are_rejected() {
    let err = elab_error("reg [1048576:0] r;");
    assert!(err.contains("exceeds the limit"), "got: {err}");

    let err = elab_error("wire [7:0] w = {2000000{8'hff}};");
    assert!(err.contains("replication is wider"), "got: {err}");

    let err = elab_error("reg [7:0] x; wire [7:0] w = x[0 +: 2000000];");
    assert!(err.contains("select width exceeds"), "got: {err}");

    let err = elab_error("reg [7:0] mem [0:67108863];");
    assert!(err.contains("bits of storage"), "got: {err}");

    let d = design(March::Minimal, "reg [1048575:0] wide; reg [7:0] mem [0:1023];");
    assert_eq!(d.var(d.var_id("wide").unwrap()).width, 1 << 20);
}
