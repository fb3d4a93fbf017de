//! A view that writes to the terminal.

use std::io::Write;

use cascade_runtime::View;
use cascade_verilog::ast::{ModuleDecl, ModuleItem};
use console::Style;
use tracing::trace;

/// Program output goes to `out`; diagnostics go to `err`, styled red, yellow
/// or cyan by severity.
pub struct TermView {
    out: Box<dyn Write + Send>,
    err: Box<dyn Write + Send>,
    color: bool,
}

impl TermView {
    /// Write to stdout and stderr.
    pub fn stdio(color: bool) -> Self {
        Self::with_writers(Box::new(std::io::stdout()), Box::new(std::io::stderr()), color)
    }

    pub fn with_writers(
        out: Box<dyn Write + Send>,
        err: Box<dyn Write + Send>,
        color: bool,
    ) -> Self {
        Self { out, err, color }
    }

    fn message(&mut self, style: Style, text: &str) {
        let style = style.force_styling(self.color);
        let _ = writeln!(self.err, "{}", style.apply_to(text));
        let _ = self.err.flush();
    }
}

impl View for TermView {
    fn print(&mut self, _time: u64, text: &str) {
        let _ = self.out.write_all(text.as_bytes());
        let _ = self.out.flush();
    }

    fn info(&mut self, _time: u64, text: &str) {
        self.message(Style::new().cyan(), text);
    }

    fn warn(&mut self, _time: u64, text: &str) {
        self.message(Style::new().yellow(), text);
    }

    fn error(&mut self, _time: u64, text: &str) {
        self.message(Style::new().red(), text);
    }

    fn eval_decl(&mut self, time: u64, decl: &ModuleDecl) {
        trace!(time, module = %decl.name.name, "module declared");
    }

    fn eval_item(&mut self, time: u64, _item: &ModuleItem) {
        trace!(time, "item evaluated");
    }

    fn shutdown(&mut self, _time: u64) {
        let _ = self.out.flush();
        let _ = self.err.flush();
    }
}
