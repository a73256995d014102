use crate::command::Completion;
use crate::protocol::{DeviceState, PowerState, ProtocolError, StreamMessage, decode_stream_message};
use tracing::error;

pub const LOG_CLEARED_PLACEHOLDER: &str = "Log cleared.\n";

/// All calls happen on the UI thread.
pub trait PanelView {
    fn set_power(&self, power: PowerState);

    fn brightness_focused(&self) -> bool;
    fn set_brightness(&self, brightness: u8);

    fn color_focused(&self) -> bool;
    fn set_color(&self, hex: &str);

    fn log_text(&self) -> String;
    fn set_log_text(&self, text: &str);
    fn scroll_log_to_end(&self);

    fn set_user_count(&self, count: &str);
}

pub fn apply_state<V: PanelView + ?Sized>(view: &V, state: &DeviceState) {
    view.set_power(state.state);

    if !view.brightness_focused() {
        view.set_brightness(state.brightness);
    }

    if !view.color_focused() {
        view.set_color(&state.color);
    }
}

pub fn append_log<V: PanelView + ?Sized>(view: &V, line: &str) {
    let mut text = view.log_text();
    text.push_str(line);
    text.push('\n');
    view.set_log_text(&text);
    view.scroll_log_to_end();
}

pub fn apply_stream_message<V: PanelView + ?Sized>(view: &V, message: &StreamMessage) {
    match message {
        StreamMessage::State(state) => apply_state(view, state),
        StreamMessage::Log(line) => append_log(view, line),
    }
}

/// A malformed state payload is logged and leaves the view untouched.
pub fn handle_stream_data<V: PanelView + ?Sized>(view: &V, data: &str) -> Result<(), ProtocolError> {
    let message = decode_stream_message(data)
        .inspect_err(|err| error!(%err, "discarding malformed state message"))?;
    apply_stream_message(view, &message);
    Ok(())
}

pub fn apply_completion<V: PanelView + ?Sized>(view: &V, completion: Completion) {
    match completion {
        Completion::LogCleared => view.set_log_text(LOG_CLEARED_PLACEHOLDER),
        Completion::FullLog(text) => {
            view.set_log_text(&text);
            view.scroll_log_to_end();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};
    use std::io;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct CapturedLog(Arc<Mutex<Vec<u8>>>);

    impl CapturedLog {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().expect("log lock")).into_owned()
        }
    }

    impl io::Write for CapturedLog {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().expect("log lock").extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[derive(Debug, Clone, Default, PartialEq, Eq)]
    struct Snapshot {
        power: Option<PowerState>,
        slider: Option<u8>,
        readout: Option<String>,
        color: Option<String>,
        log: String,
        user_count: Option<String>,
    }

    #[derive(Default)]
    struct FakeView {
        snapshot: RefCell<Snapshot>,
        brightness_focused: Cell<bool>,
        color_focused: Cell<bool>,
        scrolls: Cell<usize>,
        writes: Cell<usize>,
    }

    impl FakeView {
        fn snapshot(&self) -> Snapshot {
            self.snapshot.borrow().clone()
        }

        fn touch(&self) {
            self.writes.set(self.writes.get() + 1);
        }
    }

    impl PanelView for FakeView {
        fn set_power(&self, power: PowerState) {
            self.touch();
            self.snapshot.borrow_mut().power = Some(power);
        }

        fn brightness_focused(&self) -> bool {
            self.brightness_focused.get()
        }

        fn set_brightness(&self, brightness: u8) {
            self.touch();
            let mut snapshot = self.snapshot.borrow_mut();
            snapshot.slider = Some(brightness);
            snapshot.readout = Some(brightness.to_string());
        }

        fn color_focused(&self) -> bool {
            self.color_focused.get()
        }

        fn set_color(&self, hex: &str) {
            self.touch();
            self.snapshot.borrow_mut().color = Some(hex.to_string());
        }

        fn log_text(&self) -> String {
            self.snapshot.borrow().log.clone()
        }

        fn set_log_text(&self, text: &str) {
            self.touch();
            self.snapshot.borrow_mut().log = text.to_string();
        }

        fn scroll_log_to_end(&self) {
            self.scrolls.set(self.scrolls.get() + 1);
        }

        fn set_user_count(&self, count: &str) {
            self.touch();
            self.snapshot.borrow_mut().user_count = Some(count.to_string());
        }
    }

    fn state(power: PowerState, brightness: u8, color: &str) -> DeviceState {
        DeviceState {
            state: power,
            brightness,
            color: color.to_string(),
        }
    }

    #[test]
    fn state_message_updates_every_control() {
        let view = FakeView::default();

        handle_stream_data(
            &view,
            r##"STATE|{"state":"on","brightness":50,"color":"#ff0000"}"##,
        )
        .expect("state applies");

        let snapshot = view.snapshot();
        assert_eq!(snapshot.power, Some(PowerState::On));
        assert!(snapshot.power.is_some_and(PowerState::is_on));
        assert_eq!(snapshot.slider, Some(50));
        assert_eq!(snapshot.readout.as_deref(), Some("50"));
        assert_eq!(snapshot.color.as_deref(), Some("#ff0000"));
        assert_eq!(snapshot.log, "");
    }

    #[test]
    fn power_indicator_switches_exclusively() {
        let view = FakeView::default();

        apply_state(&view, &state(PowerState::On, 10, "#000000"));
        assert_eq!(view.snapshot().power, Some(PowerState::On));

        apply_state(&view, &state(PowerState::Off, 10, "#000000"));
        assert_eq!(view.snapshot().power, Some(PowerState::Off));
    }

    #[test]
    fn applying_same_state_twice_is_idempotent() {
        let view = FakeView::default();
        let pushed = state(PowerState::Off, 20, "#00ff00");

        apply_state(&view, &pushed);
        let first = view.snapshot();
        apply_state(&view, &pushed);

        assert_eq!(view.snapshot(), first);
    }

    #[test]
    fn focused_controls_are_not_overwritten() {
        let view = FakeView::default();
        apply_state(&view, &state(PowerState::On, 10, "#111111"));

        view.brightness_focused.set(true);
        view.color_focused.set(true);
        apply_state(&view, &state(PowerState::Off, 90, "#222222"));

        let snapshot = view.snapshot();
        assert_eq!(snapshot.power, Some(PowerState::Off));
        assert_eq!(snapshot.slider, Some(10));
        assert_eq!(snapshot.readout.as_deref(), Some("10"));
        assert_eq!(snapshot.color.as_deref(), Some("#111111"));

        view.brightness_focused.set(false);
        apply_state(&view, &state(PowerState::Off, 90, "#222222"));
        assert_eq!(view.snapshot().slider, Some(90));
        assert_eq!(view.snapshot().color.as_deref(), Some("#111111"));
    }

    #[test]
    fn malformed_state_mutates_nothing() {
        let view = FakeView::default();

        let result = handle_stream_data(&view, "STATE|not-json");

        assert!(result.is_err());
        assert_eq!(view.writes.get(), 0);
        assert_eq!(view.scrolls.get(), 0);
        assert_eq!(view.snapshot(), Snapshot::default());
    }

    #[test]
    fn malformed_state_is_reported() {
        let view = FakeView::default();
        let log = CapturedLog::default();
        let writer = log.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();

        let result = tracing::subscriber::with_default(subscriber, || {
            handle_stream_data(
                &view,
                r##"STATE|{"state":"on","brightness":"bright","color":"#ff0000"}"##,
            )
        });

        assert!(result.is_err());
        assert_eq!(view.writes.get(), 0);
        let output = log.contents();
        assert!(output.contains("ERROR"), "{output}");
        assert!(output.contains("discarding malformed state message"), "{output}");
    }

    #[test]
    fn plain_message_is_appended_and_scrolled() {
        let view = FakeView::default();

        handle_stream_data(&view, "hello world").expect("log applies");
        handle_stream_data(&view, "[12:00:01] > second").expect("log applies");

        assert_eq!(view.snapshot().log, "hello world\n[12:00:01] > second\n");
        assert_eq!(view.scrolls.get(), 2);
        assert_eq!(view.snapshot().power, None);
    }

    #[test]
    fn log_cleared_replaces_contents_with_placeholder() {
        let view = FakeView::default();
        append_log(&view, "old line");

        apply_completion(&view, Completion::LogCleared);

        assert_eq!(view.snapshot().log, LOG_CLEARED_PLACEHOLDER);
    }

    #[test]
    fn full_log_replaces_contents_and_scrolls() {
        let view = FakeView::default();
        append_log(&view, "partial");

        apply_completion(&view, Completion::FullLog("a\nb\n".to_string()));

        assert_eq!(view.snapshot().log, "a\nb\n");
        assert_eq!(view.scrolls.get(), 2);
    }
}
