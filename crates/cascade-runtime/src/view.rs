//! Output sinks for runtime messages.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use cascade_verilog::ast::{ModuleDecl, ModuleItem};

/// Receives everything the runtime reports. Every call carries the logical
/// time at which it happened.
pub trait View: Send {
    fn startup(&mut self, _time: u64) {}
    fn shutdown(&mut self, _time: u64) {}

    /// Program output, printed verbatim.
    fn print(&mut self, time: u64, text: &str);

    fn info(&mut self, time: u64, text: &str);
    fn warn(&mut self, time: u64, text: &str);
    fn error(&mut self, time: u64, text: &str);

    /// A module declaration was accepted.
    fn eval_decl(&mut self, _time: u64, _decl: &ModuleDecl) {}

    /// A root item was accepted.
    fn eval_item(&mut self, _time: u64, _item: &ModuleItem) {}
}

#[derive(Debug, Default)]
struct Recording {
    text: String,
    print_times: Vec<u64>,
    infos: Vec<String>,
    warnings: Vec<String>,
    errors: Vec<String>,
    decls: Vec<String>,
    items: usize,
}

/// A view that keeps everything in memory. Clones share the same buffers, so
/// a test can hand one clone to the runtime and inspect another.
#[derive(Debug, Clone, Default)]
pub struct RecordingView {
    inner: Arc<Mutex<Recording>>,
}

impl RecordingView {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Recording> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Everything printed by the program.
    pub fn text(&self) -> String {
        self.lock().text.clone()
    }

    /// Simulation time of each print, in order.
    pub fn print_times(&self) -> Vec<u64> {
        self.lock().print_times.clone()
    }

    pub fn infos(&self) -> Vec<String> {
        self.lock().infos.clone()
    }

    pub fn warnings(&self) -> Vec<String> {
        self.lock().warnings.clone()
    }

    pub fn errors(&self) -> Vec<String> {
        self.lock().errors.clone()
    }

    /// Names of accepted module declarations, in order.
    pub fn decls(&self) -> Vec<String> {
        self.lock().decls.clone()
    }

    /// Number of accepted root items.
    pub fn items(&self) -> usize {
        self.lock().items
    }
}

impl View for RecordingView {
    fn print(&mut self, time: u64, text: &str) {
        let mut rec = self.lock();
        rec.text.push_str(text);
        rec.print_times.push(time);
    }

    fn info(&mut self, _time: u64, text: &str) {
        self.lock().infos.push(text.to_string());
    }

    fn warn(&mut self, _time: u64, text: &str) {
        self.lock().warnings.push(text.to_string());
    }

    fn error(&mut self, _time: u64, text: &str) {
        self.lock().errors.push(text.to_string());
    }

    fn eval_decl(&mut self, _time: u64, decl: &ModuleDecl) {
        self.lock().decls.push(decl.name.name.clone());
    }

    fn eval_item(&mut self, _time: u64, _item: &ModuleItem) {
        self.lock().items += 1;
    }
}
