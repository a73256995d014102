use crate::color::Rgb;
use crate::protocol::PowerState;
use crate::transport::{CLEAR_LOG_PATH, COMMAND_PATH, FULL_LOG_PATH, Transport};
use serde::Serialize;
use std::sync::mpsc::Receiver;
use tracing::{debug, warn};

/// Partial change request for the device. Only the set parameters go on
/// the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Command {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<PowerState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brightness: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub r: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub g: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub b: Option<u8>,
}

impl Command {
    pub fn power(state: PowerState) -> Self {
        Self {
            state: Some(state),
            ..Self::default()
        }
    }

    pub fn brightness(brightness: u8) -> Self {
        Self {
            brightness: Some(brightness),
            ..Self::default()
        }
    }

    pub fn color(rgb: Rgb) -> Self {
        Self {
            r: Some(rgb.r),
            g: Some(rgb.g),
            b: Some(rgb.b),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn to_query(&self) -> Result<String, serde_qs::Error> {
        serde_qs::to_string(self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    Command(Command),
    ClearLog,
    FetchFullLog,
}

/// Result of an outbound request that the view has to reflect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    LogCleared,
    FullLog(String),
}

pub fn dispatch_loop<T, F>(rx: Receiver<Outbound>, transport: &T, mut on_complete: F)
where
    T: Transport + ?Sized,
    F: FnMut(Completion),
{
    for outbound in rx {
        if let Some(completion) = dispatch(transport, outbound) {
            on_complete(completion);
        }
    }

    debug!("outbound queue closed");
}

pub fn dispatch<T>(transport: &T, outbound: Outbound) -> Option<Completion>
where
    T: Transport + ?Sized,
{
    match outbound {
        Outbound::Command(command) => {
            send_command(transport, &command);
            None
        }
        Outbound::ClearLog => match transport.get(CLEAR_LOG_PATH, None) {
            Ok(_) => Some(Completion::LogCleared),
            Err(err) => {
                debug!(%err, "clear log request dropped");
                None
            }
        },
        Outbound::FetchFullLog => match transport.get(FULL_LOG_PATH, None) {
            Ok(reply) if reply.is_success() => Some(Completion::FullLog(reply.body)),
            Ok(reply) => {
                debug!(status = reply.status, "full log request rejected");
                None
            }
            Err(err) => {
                debug!(%err, "full log request dropped");
                None
            }
        },
    }
}

fn send_command<T>(transport: &T, command: &Command)
where
    T: Transport + ?Sized,
{
    if command.is_empty() {
        return;
    }

    let query = match command.to_query() {
        Ok(query) => query,
        Err(err) => {
            warn!(%err, ?command, "failed to encode command");
            return;
        }
    };

    if let Err(err) = transport.get(COMMAND_PATH, Some(&query)) {
        debug!(%err, %query, "command dropped");
    }
}
