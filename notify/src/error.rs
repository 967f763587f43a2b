use async_channel::{RecvError, SendError, TrySendError};
use std::time::Duration;
use thiserror::Error;

#[derive(Clone, Debug, Error)]
pub enum Error {
    #[error("Error: {0}")]
    General(String),

    #[error("channel receive error")]
    ChannelRecvError,

    #[error("channel send error")]
    ChannelSendError,

    #[error("object already stopped")]
    AlreadyStoppedError,

    #[error("no event matching {0} arrived within {1:?}")]
    WaitTimeout(String, Duration),
}

impl<T> From<SendError<T>> for Error {
    fn from(_: SendError<T>) -> Self {
        Error::ChannelSendError
    }
}

impl<T> From<TrySendError<T>> for Error {
    fn from(_: TrySendError<T>) -> Self {
        Error::ChannelSendError
    }
}

impl From<RecvError> for Error {
    fn from(_: RecvError) -> Self {
        Error::ChannelRecvError
    }
}

pub type Result<T> = std::result::Result<T, Error>;
