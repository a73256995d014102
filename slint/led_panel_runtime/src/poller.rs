use crate::transport::{Transport, TransportError, USER_COUNT_PATH};
use std::ops::ControlFlow;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::error;

pub fn fetch_user_count<T>(transport: &T) -> Result<String, TransportError>
where
    T: Transport + ?Sized,
{
    let reply = transport.get(USER_COUNT_PATH, None)?;

    if !reply.is_success() {
        return Err(TransportError::Status {
            path: USER_COUNT_PATH.to_string(),
            status: reply.status,
        });
    }

    Ok(reply.body.trim().to_string())
}

pub struct UserCountPoller<T: ?Sized> {
    transport: Arc<T>,
    interval: Duration,
}

impl<T> UserCountPoller<T>
where
    T: Transport + ?Sized,
{
    pub fn new(transport: Arc<T>, interval: Duration) -> Self {
        Self {
            transport,
            interval,
        }
    }

    /// Polls immediately, then once per interval, until `deliver` breaks.
    /// Failed polls are logged and never delivered.
    pub fn run<F>(&self, mut deliver: F)
    where
        F: FnMut(String) -> ControlFlow<()>,
    {
        while self.poll_once(&mut deliver).is_continue() {
            thread::sleep(self.interval);
        }
    }

    pub fn poll_once<F>(&self, deliver: &mut F) -> ControlFlow<()>
    where
        F: FnMut(String) -> ControlFlow<()>,
    {
        match fetch_user_count(self.transport.as_ref()) {
            Ok(count) => deliver(count),
            Err(err) => {
                error!(%err, "user count poll failed");
                ControlFlow::Continue(())
            }
        }
    }
}
