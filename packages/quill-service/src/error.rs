pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid request: {message}")]
	InvalidRequest { message: String },
	#[error("Not found: {message}")]
	NotFound { message: String },
	#[error("Provider error: {message}")]
	Provider { message: String },
	#[error("Storage error: {message}")]
	Storage { message: String },
}
impl From<quill_providers::Error> for Error {
	fn from(err: quill_providers::Error) -> Self {
		Self::Provider { message: err.to_string() }
	}
}
impl From<quill_storage::Error> for Error {
	fn from(err: quill_storage::Error) -> Self {
		match err {
			quill_storage::Error::NotFound(message) => Self::NotFound { message },
			quill_storage::Error::InvalidArgument(message) => Self::InvalidRequest { message },
			other => Self::Storage { message: other.to_string() },
		}
	}
}
