use std::io::Write;
use std::sync::{Arc, Mutex};

use cascade_runtime::{RecordingView, View};
use cascade_ui::{ManyView, TermView};

#[derive(Clone, Default)]
struct SharedBuf(Arc<Mutex<Vec<u8>>>);

impl SharedBuf {
    fn contents(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[test]
fn test_term_view_routes_output() {
    let out = SharedBuf::default();
    let err = SharedBuf::default();
    let mut view = TermView::with_writers(Box::new(out.clone()), Box::new(err.clone()), false);

    view.print(0, "a");
    view.print(0, "b\n");
    view.warn(1, "careful");
    view.error(2, "*** Parse Error:\n  > x.v:1:1: oops");
    view.shutdown(3);

    assert_eq!(out.contents(), "ab\n");
    assert_eq!(err.contents(), "careful\n*** Parse Error:\n  > x.v:1:1: oops\n");
}

#[test]
fn test_term_view_colors_when_forced() {
    let out = SharedBuf::default();
    let err = SharedBuf::default();
    let mut view = TermView::with_writers(Box::new(out.clone()), Box::new(err.clone()), true);
    view.error(0, "bad");
    let text = err.contents();
    assert!(text.contains("bad"));
    assert!(text.contains('\u{1b}'));
    assert!(out.contents().is_empty());
}

#[test]
fn test_many_view_fans_out() {
    let first = RecordingView::new();
    let second = RecordingView::new();
    let mut many = ManyView::new()
        .with(Box::new(first.clone()))
        .with(Box::new(second.clone()));
    assert_eq!(many.len(), 2);

    many.print(0, "hi\n");
    many.info(0, "note");
    many.error(0, "bad");

    for view in [first, second] {
        assert_eq!(view.text(), "hi\n");
        assert_eq!(view.infos(), vec!["note".to_string()]);
        assert_eq!(view.errors(), vec!["bad".to_string()]);
    }
}

#[test]
fn test_empty_many_view() {
    let mut many = ManyView::new();
    assert!(many.is_empty());
    many.print(0, "dropped");
}
