//! Typed request descriptions submitted to [`crate::ApiClient`].

// crates.io
use serde_json::Value;
// self
use crate::{
	_prelude::*,
	config::ServiceKind,
	http::Method,
};

/// How request parameters are placed on the wire.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ParameterEncoding {
	/// JSON body with `Content-Type: application/json`.
	#[default]
	Json,
	/// Query-string encoding with bracketed array keys. Not implemented by the backend contract.
	Url,
	/// Query-string encoding without array brackets. Not implemented by the backend contract.
	UrlNoBrackets,
}

/// Category a request is tracked under while in flight.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TaskKind {
	/// Regular request/response exchange.
	#[default]
	Data,
	/// Upload of a request body.
	Upload,
	/// Download of a response body.
	Download,
}
impl TaskKind {
	/// Every category, in the order the registry stops them.
	pub const ALL: [TaskKind; 3] = [TaskKind::Data, TaskKind::Download, TaskKind::Upload];

	/// Returns a stable label suitable for log fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			TaskKind::Data => "data",
			TaskKind::Upload => "upload",
			TaskKind::Download => "download",
		}
	}
}
impl Display for TaskKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Parameters captured from a caller-supplied [`Serialize`] value.
///
/// Serialization happens when the request is built; a failure is kept and reported as an
/// encoding error once the request is executed.
#[derive(Clone, Debug, PartialEq)]
pub struct Parameters(std::result::Result<Value, String>);
impl Parameters {
	/// Captures `value` as JSON.
	pub fn from_serialize<P>(value: &P) -> Self
	where
		P: ?Sized + Serialize,
	{
		Self(serde_json::to_value(value).map_err(|e| e.to_string()))
	}

	/// Returns the captured JSON value, or the serialization failure.
	pub fn value(&self) -> std::result::Result<&Value, &str> {
		self.0.as_ref().map_err(String::as_str)
	}
}

/// An immutable description of one backend call.
#[derive(Clone, Debug)]
pub struct ApiRequest {
	/// HTTP method.
	pub method: Method,
	/// Target service.
	pub service: ServiceKind,
	/// Path appended to the service base, starting with `/`.
	pub path: String,
	/// Optional parameters.
	pub parameters: Option<Parameters>,
	/// Parameter encoding.
	pub encoding: ParameterEncoding,
	/// Caller header overrides as `(name, value)` pairs, validated when the request is prepared.
	pub headers: Vec<(String, String)>,
	/// Category the request is tracked under while in flight.
	pub task: TaskKind,
}
impl ApiRequest {
	/// Creates a request against the main API.
	pub fn new(method: Method, path: impl Into<String>) -> Self {
		Self {
			method,
			service: ServiceKind::Api,
			path: path.into(),
			parameters: None,
			encoding: ParameterEncoding::Json,
			headers: Vec::new(),
			task: TaskKind::Data,
		}
	}

	/// `GET` shorthand.
	pub fn get(path: impl Into<String>) -> Self {
		Self::new(Method::GET, path)
	}

	/// `POST` shorthand.
	pub fn post(path: impl Into<String>) -> Self {
		Self::new(Method::POST, path)
	}

	/// Targets another registered service.
	pub fn service(mut self, service: ServiceKind) -> Self {
		self.service = service;

		self
	}

	/// Attaches parameters, captured as JSON immediately.
	pub fn parameters<P>(mut self, parameters: &P) -> Self
	where
		P: ?Sized + Serialize,
	{
		self.parameters = Some(Parameters::from_serialize(parameters));

		self
	}

	/// Overrides the parameter encoding.
	pub fn encoding(mut self, encoding: ParameterEncoding) -> Self {
		self.encoding = encoding;

		self
	}

	/// Adds a header override; a later value for the same name wins.
	pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.headers.push((name.into(), value.into()));

		self
	}

	/// Overrides the in-flight task category.
	pub fn task(mut self, task: TaskKind) -> Self {
		self.task = task;

		self
	}
}
