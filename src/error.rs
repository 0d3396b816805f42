use crate::transport::TransportError;
use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
pub enum BridgeError {
    #[error("Unsupported device type {device_type} on platform {platform}")]
    UnsupportedDevice {
        device_type: String,
        platform: String,
    },

    #[error("Device control failed for {device}: {source}")]
    CommunicationFailure {
        device: String,
        #[source]
        source: TransportError,
    },

    #[error("No device with id {0}")]
    UnknownDevice(String),

    #[error("Command not supported by {device}: {command}")]
    UnsupportedCommand { device: String, command: String },

    #[error("Device schema lookup failed: {0}")]
    Schema(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    IoError(#[from] std::io::Error),

    #[error(transparent)]
    SerdeJsonError(#[from] serde_json::Error),
}

impl BridgeError {
    /// True when the error means a physical command may not have been applied.
    pub fn is_communication_failure(&self) -> bool {
        matches!(self, Self::CommunicationFailure { .. })
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;
