use std::collections::BTreeMap;

use cascade_core::bits::Bits;
use cascade_runtime::board::Signal;
use cascade_runtime::engine::{Core, SimIo, Task, VId};
use cascade_runtime::sw::{FifoPorts, MemoryPorts, SwClock, SwFifo, SwLed, SwMemory, SwPad};

/// Last value written to each id.
fn writes(io: &mut SimIo) -> BTreeMap<VId, u64> {
    io.take_writes()
        .into_iter()
        .map(|(vid, v)| (vid, v.to_u64()))
        .collect()
}

fn tick(core: &mut dyn Core, clock: VId) {
    core.read(clock, &Bits::from_bool(false));
    core.read(clock, &Bits::from_bool(true));
}

#[test]
fn test_clock_toggles_once_per_step() {
    let mut clock = SwClock::new(7);
    let mut io = SimIo::new(0);
    clock.evaluate(&mut io);
    assert_eq!(writes(&mut io), BTreeMap::from([(7, 0)]));

    assert!(clock.conditional_update(&mut io));
    assert_eq!(writes(&mut io), BTreeMap::from([(7, 1)]));
    assert!(!clock.there_are_updates());

    clock.done_step();
    assert!(clock.there_are_updates());
    clock.update(&mut io);
    assert_eq!(writes(&mut io), BTreeMap::from([(7, 0)]));
    assert!(clock.is_clock());
}

#[test]
fn test_pad_latches_at_end_of_step() {
    let signal = Signal::default();
    let mut pad = SwPad::new(signal.clone(), 2, 4);
    signal.set(Bits::from_u64(4, 9));
    assert!(!pad.there_are_updates());

    pad.done_step();
    assert!(pad.there_are_updates());
    let mut io = SimIo::new(0);
    pad.update(&mut io);
    assert_eq!(writes(&mut io), BTreeMap::from([(2, 9)]));

    pad.done_step();
    assert!(!pad.there_are_updates());
}

#[test]
fn test_led_publishes_input() {
    let signal = Signal::default();
    let mut led = SwLed::new(signal.clone(), 3, 8);
    led.read(3, &Bits::from_u64(8, 0x5a));
    assert_eq!(signal.get().to_u64(), 0x5a);
    led.read(4, &Bits::from_u64(8, 1));
    assert_eq!(signal.get().to_u64(), 0x5a);
    assert_eq!(led.get_input()[&3].to_u64(), 0x5a);
}

#[test]
fn test_memory_write_on_posedge() {
    let ports = MemoryPorts {
        clock: Some(0),
        wen: Some(1),
        raddr1: Some(2),
        rdata1: Some(3),
        waddr: Some(4),
        wdata: Some(5),
        ..MemoryPorts::default()
    };
    let mut mem = SwMemory::new(ports, 2, 8);
    let mut io = SimIo::new(0);

    mem.read(1, &Bits::from_bool(true));
    mem.read(4, &Bits::from_u64(2, 1));
    mem.read(5, &Bits::from_u64(8, 0x33));
    mem.read(2, &Bits::from_u64(2, 1));
    mem.evaluate(&mut io);
    assert_eq!(writes(&mut io), BTreeMap::from([(3, 0)]));
    assert!(!mem.there_are_updates());

    tick(&mut mem, 0);
    assert!(mem.there_are_reads());
    mem.evaluate(&mut io);
    assert!(mem.there_are_updates());
    mem.update(&mut io);
    assert_eq!(writes(&mut io)[&3], 0x33);
    assert_eq!(mem.get_state()["mem"][1].to_u64(), 0x33);
}

#[test]
fn test_memory_restored_input_is_not_an_edge() {
    let ports = MemoryPorts {
        clock: Some(0),
        wen: Some(1),
        ..MemoryPorts::default()
    };
    let mut mem = SwMemory::new(ports, 1, 8);
    let input = BTreeMap::from([(0, Bits::from_bool(true)), (1, Bits::from_bool(true))]);
    mem.set_input(&input);
    let mut io = SimIo::new(0);
    mem.evaluate(&mut io);
    assert!(!mem.there_are_updates());
}

fn fifo_ports() -> FifoPorts {
    FifoPorts {
        clock: Some(0),
        rreq: Some(1),
        rdata: Some(2),
        wreq: Some(3),
        wdata: Some(4),
        empty: Some(5),
        full: Some(6),
    }
}

fn cycle(fifo: &mut SwFifo, io: &mut SimIo) -> BTreeMap<VId, u64> {
    tick(fifo, 0);
    fifo.evaluate(io);
    fifo.conditional_update(io);
    writes(io)
}

#[test]
fn test_fifo_push_and_pop() {
    let mut fifo = SwFifo::new(fifo_ports(), 2, 8);
    let mut io = SimIo::new(0);
    fifo.evaluate(&mut io);
    let out = writes(&mut io);
    assert_eq!((out[&5], out[&6]), (1, 0));

    fifo.read(3, &Bits::from_bool(true));
    fifo.read(4, &Bits::from_u64(8, 0x11));
    cycle(&mut fifo, &mut io);
    fifo.read(4, &Bits::from_u64(8, 0x22));
    let out = cycle(&mut fifo, &mut io);
    assert_eq!((out[&5], out[&6]), (0, 1));

    // Full: a third push is dropped.
    fifo.read(4, &Bits::from_u64(8, 0x33));
    cycle(&mut fifo, &mut io);

    fifo.read(3, &Bits::from_bool(false));
    fifo.read(1, &Bits::from_bool(true));
    let out = cycle(&mut fifo, &mut io);
    assert_eq!(out[&2], 0x11);
    let out = cycle(&mut fifo, &mut io);
    assert_eq!(out[&2], 0x22);
    assert_eq!(out[&5], 1);
}

#[test]
fn test_fifo_replays_file() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("words.hex");
    std::fs::write(&file, "a b").unwrap();
    let mut fifo = SwFifo::new(fifo_ports(), 4, 8).with_file(&file, 2);
    let mut io = SimIo::new(0);

    fifo.read(1, &Bits::from_bool(true));
    let mut popped = Vec::new();
    for _ in 0..5 {
        popped.push(cycle(&mut fifo, &mut io)[&2]);
    }
    assert_eq!(popped, vec![0xa, 0xb, 0xa, 0xb, 0xb]);
    fifo.evaluate(&mut io);
    assert_eq!(writes(&mut io)[&5], 1);
}

#[test]
fn test_fifo_state_round_trip() {
    let mut fifo = SwFifo::new(fifo_ports(), 4, 8);
    let mut io = SimIo::new(0);
    fifo.read(3, &Bits::from_bool(true));
    fifo.read(4, &Bits::from_u64(8, 7));
    cycle(&mut fifo, &mut io);

    let mut copy = SwFifo::new(fifo_ports(), 4, 8);
    copy.set_state(&fifo.get_state());
    copy.read(1, &Bits::from_bool(true));
    assert_eq!(cycle(&mut copy, &mut io)[&2], 7);
}

#[test]
fn test_default_open_loop_stops_on_tasks() {
    struct Countdown {
        left: u32,
        edges: u32,
        clock: bool,
        tasks: bool,
    }

    impl Core for Countdown {
        fn get_state(&self) -> cascade_runtime::state::EngineState {
            Default::default()
        }
        fn set_state(&mut self, _state: &cascade_runtime::state::EngineState) {}
        fn get_input(&self) -> cascade_runtime::state::Input {
            Default::default()
        }
        fn set_input(&mut self, _input: &cascade_runtime::state::Input) {}
        fn read(&mut self, _vid: VId, value: &Bits) {
            let rising = !self.clock && value.to_bool();
            self.clock = value.to_bool();
            if rising {
                self.edges += 1;
            }
        }
        fn evaluate(&mut self, io: &mut SimIo) {
            self.tasks = false;
            if self.clock && self.left > 0 {
                self.left -= 1;
                if self.left == 0 {
                    io.task(Task::Finish(0));
                    self.tasks = true;
                }
            }
        }
        fn there_are_updates(&self) -> bool {
            false
        }
        fn update(&mut self, _io: &mut SimIo) {}
        fn there_were_tasks(&self) -> bool {
            self.tasks
        }
    }

    let mut core = Countdown {
        left: 3,
        edges: 0,
        clock: false,
        tasks: false,
    };
    let mut io = SimIo::new(10);
    let run = core.open_loop(0, false, 100, &mut io);
    assert_eq!(run, 5);
    assert_eq!(core.edges, 3);
    assert_eq!(io.time, 15);
    assert_eq!(io.take_tasks(), vec![Task::Finish(0)]);
}
