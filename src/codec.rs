//! JSON helpers shared by the executor and classifier, plus the backend's date format.

// self
use crate::_prelude::*;

/// Serializes `value` as a JSON body.
pub fn encode_json(value: &serde_json::Value) -> std::result::Result<Vec<u8>, String> {
	serde_json::to_vec(value).map_err(|e| e.to_string())
}

/// Decodes `bytes` into `T`, reporting the failing field path on error.
pub fn decode_json<T>(bytes: &[u8]) -> std::result::Result<T, String>
where
	T: DeserializeOwned,
{
	let mut deserializer = serde_json::Deserializer::from_slice(bytes);
	let value = serde_path_to_error::deserialize(&mut deserializer).map_err(|e| e.to_string())?;

	deserializer.end().map_err(|e| e.to_string())?;

	Ok(value)
}

/// ISO-8601 timestamps with millisecond fractions, e.g. `2023-10-25T12:30:45.120Z`.
///
/// Use with `#[serde(with = "bearer_pipeline::codec::iso8601")]`. Serialization always emits UTC
/// with three fractional digits; deserialization accepts any RFC 3339 offset and precision.
pub mod iso8601 {
	// crates.io
	use serde::{Deserializer, Serializer, de::Error as _, ser::Error as _};
	use time::{
		UtcOffset, format_description::well_known::Rfc3339, macros::format_description,
	};
	// self
	use super::*;

	const FORMAT: &[time::format_description::BorrowedFormatItem<'static>] = format_description!(
		"[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:3]Z"
	);

	/// Formats `value` in UTC with millisecond precision.
	pub fn format(value: &OffsetDateTime) -> std::result::Result<String, time::error::Format> {
		value.to_offset(UtcOffset::UTC).format(FORMAT)
	}

	/// Serializes an [`OffsetDateTime`].
	pub fn serialize<S>(
		value: &OffsetDateTime,
		serializer: S,
	) -> std::result::Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_str(&format(value).map_err(S::Error::custom)?)
	}

	/// Deserializes an [`OffsetDateTime`].
	pub fn deserialize<'de, D>(deserializer: D) -> std::result::Result<OffsetDateTime, D::Error>
	where
		D: Deserializer<'de>,
	{
		let raw = String::deserialize(deserializer)?;

		OffsetDateTime::parse(&raw, &Rfc3339).map_err(D::Error::custom)
	}

	/// Same format for optional fields; `null` and missing values map to `None`.
	pub mod option {
		// crates.io
		use serde::{Deserializer, Serializer};
		// self
		use super::*;

		/// Serializes an optional [`OffsetDateTime`].
		pub fn serialize<S>(
			value: &Option<OffsetDateTime>,
			serializer: S,
		) -> std::result::Result<S::Ok, S::Error>
		where
			S: Serializer,
		{
			match value {
				Some(value) => super::serialize(value, serializer),
				None => serializer.serialize_none(),
			}
		}

		/// Deserializes an optional [`OffsetDateTime`].
		pub fn deserialize<'de, D>(
			deserializer: D,
		) -> std::result::Result<Option<OffsetDateTime>, D::Error>
		where
			D: Deserializer<'de>,
		{
			Option::<String>::deserialize(deserializer)?
				.map(|raw| OffsetDateTime::parse(&raw, &Rfc3339).map_err(serde::de::Error::custom))
				.transpose()
		}
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros::datetime;
	// self
	use super::*;

	#[derive(Debug, PartialEq, Serialize, Deserialize)]
	struct Holding {
		symbol: String,
		#[serde(with = "iso8601")]
		updated_at: OffsetDateTime,
		#[serde(default, with = "iso8601::option")]
		closed_at: Option<OffsetDateTime>,
	}

	#[test]
	fn dates_use_fractional_seconds_in_utc() {
		let holding = Holding {
			symbol: "BTC".into(),
			updated_at: datetime!(2023-10-25 14:30:45.12 +02:00),
			closed_at: None,
		};
		let payload = serde_json::to_string(&holding).expect("Holding should serialize.");

		assert_eq!(
			payload,
			r#"{"symbol":"BTC","updated_at":"2023-10-25T12:30:45.120Z","closed_at":null}"#
		);

		let decoded: Holding = decode_json(payload.as_bytes()).expect("Holding should decode.");

		assert_eq!(decoded, holding);
	}

	#[test]
	fn missing_optional_date_decodes_to_none() {
		let decoded: Holding =
			decode_json(br#"{"symbol":"ETH","updated_at":"2024-01-02T03:04:05.678+01:00"}"#)
				.expect("Holding without closed_at should decode.");

		assert_eq!(decoded.updated_at, datetime!(2024-01-02 02:04:05.678 UTC));
		assert_eq!(decoded.closed_at, None);
	}

	#[test]
	fn decode_errors_name_the_failing_field() {
		let err = decode_json::<Holding>(br#"{"symbol":7,"updated_at":"2024-01-02T03:04:05Z"}"#)
			.expect_err("A numeric symbol should fail to decode.");

		assert!(err.starts_with("symbol:"), "unexpected decode error: {err}");
		assert!(decode_json::<Holding>(b"{} trailing").is_err());
	}
}
