use cascade_core::march::{March, STDLIB};

#[test]
fn test_parse_known_marches() {
    assert_eq!("minimal".parse::<March>().unwrap(), March::Minimal);
    assert_eq!("sw".parse::<March>().unwrap(), March::Sw);
}

#[test]
fn test_parse_unknown_march_lists_options() {
    let err = "de10".parse::<March>().unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("Unrecognized march option de10"), "got: {msg}");
    assert!(msg.contains("minimal, sw"), "got: {msg}");
}

#[test]
fn test_minimal_instantiates_only_clock() {
    let src = March::Minimal.source();
    assert!(src.starts_with(STDLIB));
    assert!(src.contains("Clock clock();"));
    assert!(!src.contains("Led#(8) led();"));
}

#[test]
fn test_sw_instantiates_peripherals() {
    let inst = March::Sw.instances();
    for item in ["Clock clock();", "Pad#(4) pad();", "Led#(8) led();", "Reset reset();"] {
        assert!(inst.contains(item), "missing {item}");
    }
}

#[test]
fn test_stdlib_marks_every_component() {
    for kind in ["clock", "pad", "led", "reset", "memory", "fifo"] {
        assert!(
            STDLIB.contains(&format!("(*__std = \"{kind}\"*)")),
            "missing {kind}"
        );
    }
}

#[test]
fn test_display_and_path() {
    assert_eq!(March::Sw.to_string(), "sw");
    assert_eq!(March::Minimal.path(), "<march/minimal.v>");
}
