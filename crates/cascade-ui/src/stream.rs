//! Batch evaluation of a file or string.

use std::path::PathBuf;

use cascade_runtime::{EvalSource, RuntimeHandle};
use tracing::debug;

/// Evaluates one source and waits until the runtime has serviced it.
pub struct StreamController {
    handle: RuntimeHandle,
    source: EvalSource,
    abort_on_failure: bool,
}

impl StreamController {
    pub fn file(handle: RuntimeHandle, path: impl Into<PathBuf>) -> Self {
        Self {
            handle,
            source: EvalSource::File(path.into()),
            abort_on_failure: false,
        }
    }

    pub fn text(handle: RuntimeHandle, name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            handle,
            source: EvalSource::Text {
                name: name.into(),
                text: text.into(),
            },
            abort_on_failure: false,
        }
    }

    /// Stop the simulation with a failure status if evaluation fails.
    pub fn abort_on_failure(mut self, abort: bool) -> Self {
        self.abort_on_failure = abort;
        self
    }

    /// Returns `true` when every element was accepted. A runtime that stops
    /// before servicing the request counts as a failure.
    pub async fn run(self) -> bool {
        let rx = match self.source {
            EvalSource::File(path) => self.handle.eval_file(path),
            EvalSource::Text { name, text } => self.handle.eval(name, text),
        };
        let ok = rx.await.unwrap_or(false);
        debug!(ok, "stream evaluated");
        if !ok && self.abort_on_failure {
            self.handle.abort();
        }
        ok
    }
}
