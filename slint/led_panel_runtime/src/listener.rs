use crate::sse::{self, SseDecoder};
use crate::transport::{STREAM_PATH, Transport};
use std::ops::ControlFlow;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerState {
    Connecting,
    Open,
    Receiving,
}

pub struct StreamListener<T: ?Sized> {
    transport: Arc<T>,
    reconnect_delay: Duration,
    state: ListenerState,
    decoder: SseDecoder,
}

impl<T> StreamListener<T>
where
    T: Transport + ?Sized,
{
    pub fn new(transport: Arc<T>, reconnect_delay: Duration) -> Self {
        Self {
            transport,
            reconnect_delay,
            state: ListenerState::Connecting,
            decoder: SseDecoder::default(),
        }
    }

    pub fn state(&self) -> ListenerState {
        self.state
    }

    pub fn reconnect_delay(&self) -> Duration {
        self.reconnect_delay
    }

    pub fn run<F>(&mut self, mut deliver: F)
    where
        F: FnMut(String) -> ControlFlow<()>,
    {
        loop {
            if self.connect_once(&mut deliver).is_break() {
                debug!("stream listener stopped");
                return;
            }

            debug!(
                delay_ms = self.reconnect_delay.as_millis() as u64,
                "push stream closed; reconnecting"
            );
            thread::sleep(self.reconnect_delay);
        }
    }

    /// Breaks only when the sink asks to stop.
    pub fn connect_once<F>(&mut self, deliver: &mut F) -> ControlFlow<()>
    where
        F: FnMut(String) -> ControlFlow<()>,
    {
        let Self {
            transport,
            reconnect_delay,
            state,
            decoder,
        } = self;

        transition(state, ListenerState::Connecting);

        let mut reader = match transport.open_stream(STREAM_PATH, decoder.last_event_id()) {
            Ok(reader) => reader,
            Err(err) => {
                warn!(%err, "failed to open push stream");
                return ControlFlow::Continue(());
            }
        };

        transition(state, ListenerState::Open);
        info!("push stream connected");

        let read_result = sse::read_events(&mut reader, decoder, |event| {
            transition(state, ListenerState::Receiving);

            if !event.is_message() {
                debug!(event = ?event.event, "ignoring named push event");
                return ControlFlow::Continue(());
            }

            deliver(event.data)
        });

        decoder.reset_pending();
        if let Some(retry) = decoder.take_retry() {
            debug!(retry_ms = retry.as_millis() as u64, "server changed reconnect delay");
            *reconnect_delay = retry;
        }

        match read_result {
            Ok(ControlFlow::Break(())) => ControlFlow::Break(()),
            Ok(ControlFlow::Continue(())) => {
                debug!("push stream ended");
                ControlFlow::Continue(())
            }
            Err(err) => {
                warn!(%err, "push stream read failed");
                ControlFlow::Continue(())
            }
        }
    }
}

fn transition(state: &mut ListenerState, next: ListenerState) {
    if *state != next {
        debug!(from = ?state, to = ?next, "stream listener state");
        *state = next;
    }
}
