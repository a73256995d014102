use std::io::{self, BufRead};
use std::ops::ControlFlow;
use std::time::Duration;

pub const DEFAULT_EVENT: &str = "message";
const BYTE_ORDER_MARK: char = '\u{feff}';

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    pub event: Option<String>,
    pub data: String,
    pub id: Option<String>,
}

impl SseEvent {
    pub fn is_message(&self) -> bool {
        self.event.as_deref().is_none_or(|name| name == DEFAULT_EVENT)
    }
}

/// The last event id survives reconnects; everything else resets per event.
#[derive(Debug, Default)]
pub struct SseDecoder {
    event: Option<String>,
    data: String,
    last_event_id: String,
    retry: Option<Duration>,
}

impl SseDecoder {
    pub fn push_line(&mut self, line: &str) -> Option<SseEvent> {
        if line.is_empty() {
            return self.dispatch();
        }

        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };

        match field {
            "event" => self.event = Some(value.to_string()),
            "data" => {
                self.data.push_str(value);
                self.data.push('\n');
            }
            "id" if !value.contains('\0') => self.last_event_id = value.to_string(),
            "retry" if !value.is_empty() && value.bytes().all(|byte| byte.is_ascii_digit()) => {
                if let Ok(millis) = value.parse::<u64>() {
                    self.retry = Some(Duration::from_millis(millis));
                }
            }
            _ => {}
        }

        None
    }

    pub fn last_event_id(&self) -> Option<&str> {
        Some(self.last_event_id.as_str()).filter(|id| !id.is_empty())
    }

    pub fn take_retry(&mut self) -> Option<Duration> {
        self.retry.take()
    }

    pub fn reset_pending(&mut self) {
        self.event = None;
        self.data.clear();
    }

    fn dispatch(&mut self) -> Option<SseEvent> {
        let event = self.event.take();

        if self.data.is_empty() {
            return None;
        }

        let mut data = std::mem::take(&mut self.data);
        data.pop();

        Some(SseEvent {
            event,
            data,
            id: self.last_event_id().map(str::to_string),
        })
    }
}

/// Invalid UTF-8 is replaced rather than treated as a read failure.
pub fn read_events<R, F>(
    reader: &mut R,
    decoder: &mut SseDecoder,
    mut on_event: F,
) -> io::Result<ControlFlow<()>>
where
    R: BufRead + ?Sized,
    F: FnMut(SseEvent) -> ControlFlow<()>,
{
    let mut buf = Vec::new();
    let mut first_line = true;

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            return Ok(ControlFlow::Continue(()));
        }

        let line = String::from_utf8_lossy(&buf);
        let mut trimmed = line.strip_suffix('\n').unwrap_or(&line);
        trimmed = trimmed.strip_suffix('\r').unwrap_or(trimmed);
        if first_line {
            trimmed = trimmed.strip_prefix(BYTE_ORDER_MARK).unwrap_or(trimmed);
            first_line = false;
        }

        if let Some(event) = decoder.push_line(trimmed) {
            if on_event(event).is_break() {
                return Ok(ControlFlow::Break(()));
            }
        }
    }
}
