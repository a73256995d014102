use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Wire prefix the server puts in front of serialized device state.
pub const STATE_PREFIX: &str = "STATE|";
pub const MAX_BRIGHTNESS: u8 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PowerState {
    On,
    Off,
}

impl PowerState {
    pub fn is_on(self) -> bool {
        matches!(self, PowerState::On)
    }
}

/// Display mirror of the device configuration owned by the server.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DeviceState {
    pub state: PowerState,
    #[serde(deserialize_with = "deserialize_brightness")]
    pub brightness: u8,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamMessage {
    State(DeviceState),
    Log(String),
}

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("invalid state payload: {0}")]
    InvalidState(#[from] serde_json::Error),
}

/// Classifies one push message. Only a literal `STATE|` prefix selects the
/// state branch; everything else is a log line kept verbatim.
pub fn decode_stream_message(data: &str) -> Result<StreamMessage, ProtocolError> {
    match data.strip_prefix(STATE_PREFIX) {
        Some(payload) => {
            let state = serde_json::from_str::<DeviceState>(payload)?;
            Ok(StreamMessage::State(state))
        }
        None => Ok(StreamMessage::Log(data.to_string())),
    }
}

// The server echoes query values back unparsed, so brightness shows up
// as a JSON number (integer or float) or as a numeric string.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawBrightness {
    Number(f64),
    Text(String),
}

fn deserialize_brightness<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let value = match RawBrightness::deserialize(deserializer)? {
        RawBrightness::Number(value) => value,
        RawBrightness::Text(raw) => raw
            .trim()
            .parse::<f64>()
            .map_err(|_| de::Error::custom(format!("brightness is not a number: {raw:?}")))?,
    };

    if !value.is_finite() {
        return Err(de::Error::custom(format!("brightness is not finite: {value}")));
    }

    Ok(value.round().clamp(0.0, f64::from(MAX_BRIGHTNESS)) as u8)
}
