//! Interactive read-eval loop.

use std::io::{BufRead, BufReader, Stdin};
use std::thread;

use cascade_runtime::RuntimeHandle;
use cascade_verilog::{parse, SourceFile};
use console::Term;
use tracing::{debug, trace};

const PROMPT: &str = ">>> ";

/// Reads lines until they form complete source elements, then hands them to
/// the runtime. End of input is reported to the runtime as Ctrl-D.
pub struct TermController<R> {
    handle: RuntimeHandle,
    input: R,
    prompt: Option<Term>,
    count: usize,
}

impl TermController<BufReader<Stdin>> {
    /// A controller on stdin that prompts only when stdout is a terminal.
    pub fn stdio(handle: RuntimeHandle) -> Self {
        let term = Term::stdout();
        let prompt = term.is_term().then_some(term);
        Self {
            handle,
            input: BufReader::new(std::io::stdin()),
            prompt,
            count: 0,
        }
    }
}

impl<R: BufRead> TermController<R> {
    /// A controller reading from `input` without a prompt.
    pub fn new(handle: RuntimeHandle, input: R) -> Self {
        Self {
            handle,
            input,
            prompt: None,
            count: 0,
        }
    }

    fn show_prompt(&self) {
        if let Some(term) = &self.prompt {
            let _ = term.write_str(PROMPT);
            let _ = term.flush();
        }
    }

    /// Runs until the input ends or the runtime stops. Blocks on every eval,
    /// so this must not run on an async worker thread.
    pub fn run(mut self) {
        let mut buffer = String::new();
        let mut line = String::new();
        while !self.handle.is_stopped() {
            if buffer.is_empty() {
                self.show_prompt();
            }
            line.clear();
            match self.input.read_line(&mut line) {
                Ok(0) | Err(_) => {
                    debug!("end of interactive input");
                    self.handle.ctrl_d();
                    return;
                }
                Ok(_) => {}
            }
            if buffer.is_empty() && line.trim().is_empty() {
                continue;
            }
            buffer.push_str(&line);

            let pending = SourceFile::new("<repl>", buffer.as_str());
            if matches!(parse(&pending), Err(e) if e.is_incomplete()) {
                trace!("waiting for more input");
                continue;
            }

            self.count += 1;
            let name = format!("<repl:{}>", self.count);
            let reply = self.handle.eval(name, std::mem::take(&mut buffer));
            let _ = reply.blocking_recv();
        }
    }
}

impl<R: BufRead + Send + 'static> TermController<R> {
    /// Runs the loop on its own thread. The thread may stay parked on a read
    /// after the runtime finishes; callers should not join it.
    pub fn spawn(self) -> thread::JoinHandle<()> {
        thread::spawn(move || self.run())
    }
}
