use std::fmt::{self, Display};
use twilight_http::response::DeserializeBodyError;
use twilight_validate::message::MessageValidationError;

#[derive(Debug)]
pub enum Error {
    /// The outgoing message failed client-side validation.
    Invalid(MessageValidationError),
    /// The request never made it through, or Discord rejected it.
    Http(twilight_http::Error),
    /// Discord replied with a body we could not deserialize.
    Body(DeserializeBodyError),
}

impl From<MessageValidationError> for Error {
    fn from(err: MessageValidationError) -> Self {
        Self::Invalid(err)
    }
}

impl From<twilight_http::Error> for Error {
    fn from(err: twilight_http::Error) -> Self {
        Self::Http(err)
    }
}

impl From<DeserializeBodyError> for Error {
    fn from(err: DeserializeBodyError) -> Self {
        Self::Body(err)
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Invalid(err) => write!(f, "invalid message: {err}"),
            Self::Http(err) => write!(f, "request failed: {err}"),
            Self::Body(err) => write!(f, "unexpected response body: {err}"),
        }
    }
}

pub type Result<T> = core::result::Result<T, Error>;
