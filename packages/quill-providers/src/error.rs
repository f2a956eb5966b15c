use reqwest::StatusCode;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Provider is rate limited: {message}")]
	RateLimited { message: String },
	#[error("Provider is unavailable: {message}")]
	Unavailable { message: String },
	#[error("Provider timed out: {message}")]
	Timeout { message: String },
	#[error("Malformed provider response: {message}")]
	MalformedResponse { message: String, raw: String },
	#[error("{message}")]
	InvalidResponse { message: String },
	#[error("{message}")]
	InvalidConfig { message: String },
	#[error(transparent)]
	Http(reqwest::Error),
	#[error(transparent)]
	SerdeJson(#[from] serde_json::Error),
	#[error(transparent)]
	InvalidHeaderName(#[from] reqwest::header::InvalidHeaderName),
	#[error(transparent)]
	InvalidHeaderValue(#[from] reqwest::header::InvalidHeaderValue),
}
impl Error {
	/// Errors that justify switching to a degraded path for the current request.
	pub fn is_degradable(&self) -> bool {
		matches!(self, Self::RateLimited { .. } | Self::Unavailable { .. } | Self::Timeout { .. })
	}

	pub fn kind(&self) -> &'static str {
		match self {
			Self::RateLimited { .. } => "rate_limited",
			Self::Unavailable { .. } => "unavailable",
			Self::Timeout { .. } => "timeout",
			Self::MalformedResponse { .. } => "malformed_response",
			Self::InvalidResponse { .. } => "invalid_response",
			Self::InvalidConfig { .. } => "invalid_config",
			Self::Http(_) => "http",
			Self::SerdeJson(_) => "serde_json",
			Self::InvalidHeaderName(_) | Self::InvalidHeaderValue(_) => "invalid_header",
		}
	}

	pub(crate) fn from_status(status: StatusCode, body: &str) -> Option<Self> {
		let message = format!("HTTP {status}: {}", body.chars().take(200).collect::<String>());

		if status == StatusCode::TOO_MANY_REQUESTS {
			return Some(Self::RateLimited { message });
		}
		if status.is_server_error() {
			return Some(Self::Unavailable { message });
		}
		if status.is_client_error() {
			return Some(Self::InvalidResponse { message });
		}

		None
	}
}
impl From<reqwest::Error> for Error {
	fn from(err: reqwest::Error) -> Self {
		if err.is_timeout() {
			return Self::Timeout { message: err.to_string() };
		}
		if err.is_connect() {
			return Self::Unavailable { message: err.to_string() };
		}
		if let Some(status) = err.status()
			&& let Some(mapped) = Self::from_status(status, "")
		{
			return mapped;
		}

		Self::Http(err)
	}
}
