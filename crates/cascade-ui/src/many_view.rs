use cascade_runtime::View;
use cascade_verilog::ast::{ModuleDecl, ModuleItem};

/// Forwards every call to each attached view, in attach order.
#[derive(Default)]
pub struct ManyView {
    views: Vec<Box<dyn View>>,
}

impl ManyView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attach(&mut self, view: Box<dyn View>) {
        self.views.push(view);
    }

    pub fn with(mut self, view: Box<dyn View>) -> Self {
        self.attach(view);
        self
    }

    pub fn len(&self) -> usize {
        self.views.len()
    }

    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }
}

impl View for ManyView {
    fn startup(&mut self, time: u64) {
        self.views.iter_mut().for_each(|v| v.startup(time));
    }

    fn shutdown(&mut self, time: u64) {
        self.views.iter_mut().for_each(|v| v.shutdown(time));
    }

    fn print(&mut self, time: u64, text: &str) {
        self.views.iter_mut().for_each(|v| v.print(time, text));
    }

    fn info(&mut self, time: u64, text: &str) {
        self.views.iter_mut().for_each(|v| v.info(time, text));
    }

    fn warn(&mut self, time: u64, text: &str) {
        self.views.iter_mut().for_each(|v| v.warn(time, text));
    }

    fn error(&mut self, time: u64, text: &str) {
        self.views.iter_mut().for_each(|v| v.error(time, text));
    }

    fn eval_decl(&mut self, time: u64, decl: &ModuleDecl) {
        self.views.iter_mut().for_each(|v| v.eval_decl(time, decl));
    }

    fn eval_item(&mut self, time: u64, item: &ModuleItem) {
        self.views.iter_mut().for_each(|v| v.eval_item(time, item));
    }
}
