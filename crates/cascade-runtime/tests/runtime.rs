use cascade_core::bits::Bits;
use cascade_core::march::March;
use cascade_runtime::{format_frequency, RecordingView, Runtime, RuntimeHandle, RuntimeOptions};
use tokio::sync::oneshot::error::TryRecvError;

fn runtime(options: RuntimeOptions) -> (Runtime, RuntimeHandle, RecordingView) {
    let view = RecordingView::new();
    let rt = Runtime::new(options, Box::new(view.clone()));
    let handle = rt.handle();
    (rt, handle, view)
}

/// Evaluate `text` and run until the program finishes.
fn simulate(options: RuntimeOptions, text: &str) -> (RecordingView, i32) {
    let (rt, handle, view) = runtime(options);
    let mut reply = handle.eval("test.v", text);
    let status = rt.run();
    assert_eq!(reply.try_recv(), Ok(true), "errors: {:?}", view.errors());
    (view, status)
}

fn reference_only() -> RuntimeOptions {
    RuntimeOptions {
        open_loop_target: 0,
        ..RuntimeOptions::default()
    }
}

#[test]
fn test_display_and_finish() {
    let (view, status) = simulate(
        RuntimeOptions::default(),
        "initial begin $display(\"hello %0d\", 4'd9); $write(\"a\"); $write(\"b\\n\"); $finish; end",
    );
    assert_eq!(view.text(), "hello 9\nab\n");
    assert_eq!(status, 0);
}

#[test]
fn test_clocked_counter_open_loop() {
    let program = "reg [7:0] count = 0;
        always @(posedge clock.val) begin
          count <= count + 1;
          if (count == 4) begin
            $display(\"count=%0d\", count);
            $finish;
          end
        end";
    let (view, _) = simulate(RuntimeOptions::default(), program);
    assert_eq!(view.text(), "count=4\n");
}

#[test]
fn test_clocked_counter_reference_scheduler() {
    let program = "reg [7:0] count = 0;
        always @(posedge clock.val) begin
          count <= count + 1;
          if (count == 10) begin
            $display(\"count=%0d\", count);
            $finish;
          end
        end";
    let (view, _) = simulate(reference_only(), program);
    assert_eq!(view.text(), "count=10\n");
}

#[test]
fn test_open_loop_reports_task_time_like_reference() {
    let program = "reg [7:0] count = 0;
        always @(posedge clock.val) begin
          count <= count + 1;
          if (count == 3) $display(\"tick\");
          if (count == 6) begin $display(\"done\"); $finish; end
        end";
    let (open, _) = simulate(RuntimeOptions::default(), program);
    let (reference, _) = simulate(reference_only(), program);
    assert_eq!(open.text(), "tick\ndone\n");
    assert_eq!(open.print_times(), reference.print_times());
}

#[test]
fn test_nonblocking_swap() {
    let program = "reg [3:0] a = 1;
        reg [3:0] b = 2;
        always @(posedge clock.val) begin a <= b; b <= a; end
        reg [1:0] n = 0;
        always @(posedge clock.val) begin
          n <= n + 1;
          if (n == 1) begin $display(\"%0d %0d\", a, b); $finish; end
        end";
    let (view, _) = simulate(reference_only(), program);
    assert_eq!(view.text(), "2 1\n");
}

#[test]
fn test_module_hierarchy_and_continuous_assign() {
    let program = "module Add#(parameter W = 4)(input wire [W-1:0] x, output wire [W-1:0] y);
          assign y = x + 3;
        endmodule
        reg [7:0] src = 5;
        wire [7:0] dst;
        Add#(.W(8)) add(.x(src), .y(dst));
        always @(posedge clock.val) begin $display(\"%0d\", dst); $finish; end";
    let (view, _) = simulate(reference_only(), program);
    assert_eq!(view.text(), "8\n");
}

#[test]
fn test_loops_case_and_arrays() {
    let program = "reg [7:0] mem [0:3];
        integer i;
        reg [7:0] sum = 0;
        initial begin
          for (i = 0; i < 4; i = i + 1) mem[i] = i * 2;
          for (i = 0; i < 4; i = i + 1) sum = sum + mem[i];
          case (sum)
            12: $display(\"twelve\");
            default: $display(\"other %0d\", sum);
          endcase
          $finish;
        end";
    let (view, _) = simulate(RuntimeOptions::default(), program);
    assert_eq!(view.text(), "twelve\n");
}

#[test]
fn test_indexed_select_with_extreme_index() {
    let program = "reg [7:0] x = 8'hff;
        reg [63:0] i = 64'hffffffffffffffff;
        reg signed [63:0] j = 64'sh8000000000000000;
        initial begin
          x[i +: 4] = 4'd0;
          x[j -: 2] = 2'd0;
          $display(\"%0d %0d %0d %0d\", x[i +: 4], x[j -: 4], x[i], x);
          $finish;
        end";
    let (view, _) = simulate(RuntimeOptions::default(), program);
    assert_eq!(view.text(), "0 0 0 255\n");
}

#[test]
fn test_finish_with_statistics() {
    let (view, _) = simulate(RuntimeOptions::default(), "initial $finish(1);");
    let text = view.text();
    assert!(text.starts_with("Simulation Time: "), "{text}");
    assert!(text.contains("\nWall Clock Time: "));
    assert!(text.contains("\nClock Frequency: "));
}

#[test]
fn test_fatal_sets_failure_status() {
    let (view, status) = simulate(RuntimeOptions::default(), "initial $fatal(1, \"boom %0d\", 3);");
    assert_eq!(view.errors(), vec!["boom 3".to_string()]);
    assert_eq!(status, 1);
}

#[test]
fn test_parse_error_is_reported() {
    let (rt, handle, view) = runtime(RuntimeOptions::default());
    let mut bad = handle.eval("bad.v", "wire [3:0 x;");
    let mut good = handle.eval("good.v", "initial $finish;");
    rt.run();
    assert_eq!(bad.try_recv(), Ok(false));
    assert_eq!(good.try_recv(), Ok(true));
    let errors = view.errors();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].starts_with("*** Parse Error:\n  > bad.v:1:"), "{}", errors[0]);
}

#[test]
fn test_typechecker_error_is_reported() {
    let (rt, handle, view) = runtime(RuntimeOptions::default());
    let mut bad = handle.eval("t.v", "assign y = 1;");
    handle.finish(0);
    rt.run();
    assert_eq!(bad.try_recv(), Ok(false));
    let errors = view.errors();
    assert!(errors[0].starts_with("*** Typechecker Error:\n  > t.v:1:"));
    assert!(errors[0].contains("undeclared identifier `y`"));
}

#[test]
fn test_warnings_can_be_disabled() {
    let options = RuntimeOptions {
        disable_warnings: true,
        ..RuntimeOptions::default()
    };
    let (view, _) = simulate(options, "reg __hidden; initial $finish;");
    assert!(view.warnings().is_empty());

    let (view, _) = simulate(RuntimeOptions::default(), "reg __hidden; initial $finish;");
    assert_eq!(view.warnings().len(), 1);
    assert!(view.warnings()[0].starts_with("*** Typechecker Warning:"));
}

#[test]
fn test_interrupts_fizzle_after_finish() {
    let (rt, handle, _view) = runtime(RuntimeOptions::default());
    let _ = handle.eval("a.v", "initial $finish;");
    rt.run();
    assert!(handle.is_stopped());
    let mut late = handle.eval("b.v", "wire x;");
    assert_eq!(late.try_recv(), Ok(false));
}

#[test]
fn test_pending_evals_fizzle_when_finished() {
    let (rt, handle, _view) = runtime(RuntimeOptions::default());
    handle.finish(0);
    let mut late = handle.eval("b.v", "wire x;");
    rt.run();
    assert_eq!(late.try_recv(), Ok(false));
}

#[test]
fn test_ctrl_d() {
    let (rt, handle, view) = runtime(RuntimeOptions::default());
    handle.ctrl_d();
    assert_eq!(rt.run(), 0);
    assert_eq!(view.errors(), vec!["*** User Interrupt:\n  > Caught Ctrl-D.".to_string()]);
}

#[test]
fn test_items_join_running_program() {
    let (rt, handle, view) = runtime(reference_only());
    let mut first = handle.eval("a.v", "reg [7:0] x = 3;");
    let mut second = handle.eval(
        "b.v",
        "always @(posedge clock.val) begin $display(\"x=%0d\", x); $finish; end",
    );
    rt.run();
    assert_eq!(first.try_recv(), Ok(true));
    assert_eq!(second.try_recv(), Ok(true));
    assert_eq!(view.text(), "x=3\n");
    assert_eq!(view.items(), 3);
}

#[test]
fn test_memory_component() {
    let program = "reg [3:0] wa = 3;
        reg [7:0] wd = 42;
        reg we = 1;
        reg [3:0] ra = 3;
        wire [7:0] rd;
        Memory mem(.clock(clock.val), .wen(we), .waddr(wa), .wdata(wd), .raddr1(ra), .rdata1(rd));
        reg [2:0] n = 0;
        always @(posedge clock.val) begin
          n <= n + 1;
          if (n == 3) begin $display(\"%0d\", rd); $finish; end
        end";
    let (view, _) = simulate(RuntimeOptions::default(), program);
    assert_eq!(view.text(), "42\n");
}

#[test]
fn test_new_memory_waits_for_a_rising_edge() {
    let program = "reg wen = 1;
        reg [7:0] wd = 8'h55;
        wire [7:0] r1;
        Memory mem(.clock(clock.val), .wen(wen), .raddr1(4'd0), .rdata1(r1), .waddr(4'd0), .wdata(wd));
        always @(posedge clock.val) begin $display(\"%h\", r1); $finish; end";
    let (view, _) = simulate(RuntimeOptions::default(), program);
    assert_eq!(view.text(), "0\n");
}

#[test]
fn test_new_fifo_waits_for_a_rising_edge() {
    let program = "reg wreq = 1;
        reg rreq = 0;
        reg [7:0] wd = 7;
        wire e;
        Fifo f(.clock(clock.val), .rreq(rreq), .wreq(wreq), .wdata(wd), .empty(e));
        always @(posedge clock.val) begin $display(\"%0d\", e); $finish; end";
    let (view, _) = simulate(RuntimeOptions::default(), program);
    assert_eq!(view.text(), "1\n");
}

#[test]
fn test_memory_file_is_loaded_and_written_back() {
    let dir = tempfile::tempdir().unwrap();
    let image = dir.path().join("mem.hex");
    std::fs::write(&image, "5 6 7 8").unwrap();
    let program = format!(
        "reg [1:0] ra = 2;
        wire [7:0] rd;
        reg we = 1;
        (*file = \"{}\"*) Memory#(.ADDR_SIZE(2)) mem(.clock(clock.val), .wen(we), .waddr(2'd0), .wdata(8'hab), .raddr1(ra), .rdata1(rd));
        reg [1:0] n = 0;
        always @(posedge clock.val) begin
          n <= n + 1;
          if (n == 2) begin $display(\"%0d\", rd); $finish; end
        end",
        image.display()
    );
    let (view, _) = simulate(RuntimeOptions::default(), &program);
    assert_eq!(view.text(), "7\n");
    let words: Vec<String> = std::fs::read_to_string(&image)
        .unwrap()
        .split_whitespace()
        .map(str::to_string)
        .collect();
    assert_eq!(words, vec!["ab", "6", "7", "8"]);
}

#[test]
fn test_sw_march_board() {
    let options = RuntimeOptions {
        march: March::Sw,
        ..RuntimeOptions::default()
    };
    let (rt, handle, _view) = runtime(options);
    handle.board().pad.set(Bits::from_u64(4, 5));
    let mut reply = handle.eval(
        "board.v",
        "assign led.val = pad.val + 1;
         reg [3:0] n = 0;
         always @(posedge clock.val) begin n <= n + 1; if (n == 3) $finish; end",
    );
    rt.run();
    assert_eq!(reply.try_recv(), Ok(true));
    assert_eq!(handle.board().led.get().to_u64(), 6);
}

#[test]
fn test_save_and_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");
    let path = path.display();

    let (_, status) = simulate(
        RuntimeOptions::default(),
        &format!("reg [7:0] x = 0; initial begin x = 42; $save(\"{path}\"); $finish; end"),
    );
    assert_eq!(status, 0);
    let saved = std::fs::read_to_string(dir.path().join("state.json")).unwrap();
    assert!(saved.contains("\"Root\""));
    assert!(saved.contains("\"x\""));

    let (view, _) = simulate(
        reference_only(),
        &format!(
            "reg [7:0] x = 0;
             initial $restart(\"{path}\");
             reg [1:0] n = 0;
             always @(posedge clock.val) begin
               n <= n + 1;
               if (n == 2) begin $display(\"x=%0d\", x); $finish; end
             end"
        ),
    );
    assert_eq!(view.text(), "x=42\n");
}

#[test]
fn test_restart_from_missing_file() {
    let (view, _) = simulate(
        RuntimeOptions::default(),
        "initial begin $restart(\"/nonexistent/state.json\"); $finish; end",
    );
    assert!(view.errors()[0].starts_with("*** Runtime Error:\n  > unable to access save file"));
}

#[test]
fn test_retarget_keeps_state() {
    let program = "reg [7:0] x = 0;
        reg [2:0] n = 0;
        initial begin x = 9; $retarget(\"sw\"); end
        always @(posedge clock.val) begin
          n <= n + 1;
          if (n == 3) begin $display(\"x=%0d\", x); $finish; end
        end";
    let (view, _) = simulate(reference_only(), program);
    assert_eq!(view.text(), "x=9\n");
    assert!(view.errors().is_empty());
}

#[test]
fn test_include_resolution() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir(dir.path().join("lib")).unwrap();
    std::fs::write(dir.path().join("lib/value.v"), "reg [3:0] v = 7;\n").unwrap();
    let main = dir.path().join("main.v");
    std::fs::write(
        &main,
        "`include \"lib/value.v\"\ninitial begin $display(\"v=%0d\", v); $finish; end\n",
    )
    .unwrap();

    let (rt, handle, view) = runtime(RuntimeOptions::default());
    let mut reply = handle.eval_file(&main);
    rt.run();
    assert_eq!(reply.try_recv(), Ok(true), "{:?}", view.errors());
    assert_eq!(view.text(), "v=7\n");
}

#[test]
fn test_missing_include_fails() {
    let (rt, handle, view) = runtime(RuntimeOptions::default());
    let mut reply = handle.eval("m.v", "`include \"nowhere.v\"");
    handle.finish(0);
    rt.run();
    assert_eq!(reply.try_recv(), Ok(false));
    assert!(view.errors()[0].contains("unable to locate file nowhere.v"));
}

#[test]
fn test_reply_is_pending_until_serviced() {
    let (_rt, handle, _view) = runtime(RuntimeOptions::default());
    let mut reply = handle.eval("a.v", "wire x;");
    assert_eq!(reply.try_recv(), Err(TryRecvError::Empty));
}

#[test]
fn test_format_frequency() {
    assert_eq!(format_frequency(12), "12 Hz");
    assert_eq!(format_frequency(1000), "1000 Hz");
    assert_eq!(format_frequency(25_000), "25 KHz");
    assert_eq!(format_frequency(3_500_000), "3 MHz");
}

#[tokio::test]
async fn test_spawned_runtime() {
    let (rt, handle, view) = runtime(RuntimeOptions::default());
    let join = rt.spawn();
    let ok = handle
        .eval("s.v", "initial begin $display(\"spawned\"); $finish; end")
        .await
        .unwrap();
    assert!(ok);
    assert_eq!(join.await.unwrap(), 0);
    assert_eq!(view.text(), "spawned\n");
}
