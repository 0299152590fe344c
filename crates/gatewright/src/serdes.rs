//! Serde conventions shared by every API-facing type: camelCase fields, unknown fields
//! rejected, durations as Go-style strings.

/// User-facing types that both serialize and deserialize.
macro_rules! schema {
	($item:item) => {
		#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
		#[serde(rename_all = "camelCase", deny_unknown_fields)]
		$item
	};
}

/// Input-only types.
macro_rules! schema_de {
	($item:item) => {
		#[derive(Debug, Clone, serde::Deserialize)]
		#[serde(rename_all = "camelCase", deny_unknown_fields)]
		$item
	};
}

/// Output-only types (wire configuration and other derived artifacts).
macro_rules! schema_ser {
	($item:item) => {
		#[derive(Debug, Clone, serde::Serialize)]
		#[serde(rename_all = "camelCase")]
		$item
	};
}

pub(crate) use schema;
pub(crate) use schema_de;
pub(crate) use schema_ser;

pub mod serde_dur {
	use std::time::Duration;

	use serde::{Deserialize, Deserializer, Serializer};

	pub fn serialize<S: Serializer>(d: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.serialize_str(&gatewright_core::durfmt::format(*d))
	}

	pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
		let s = String::deserialize(deserializer)?;
		gatewright_core::durfmt::parse(&s).map_err(serde::de::Error::custom)
	}
}

pub mod serde_dur_option {
	use std::time::Duration;

	use serde::{Deserialize, Deserializer, Serializer};

	pub fn serialize<S: Serializer>(
		d: &Option<Duration>,
		serializer: S,
	) -> Result<S::Ok, S::Error> {
		match d {
			Some(d) => serializer.serialize_str(&gatewright_core::durfmt::format(*d)),
			None => serializer.serialize_none(),
		}
	}

	pub fn deserialize<'de, D: Deserializer<'de>>(
		deserializer: D,
	) -> Result<Option<Duration>, D::Error> {
		let s = Option::<String>::deserialize(deserializer)?;
		s.map(|s| gatewright_core::durfmt::parse(&s).map_err(serde::de::Error::custom))
			.transpose()
	}
}

pub fn ser_display<T: std::fmt::Display, S: serde::Serializer>(
	t: &T,
	serializer: S,
) -> Result<S::Ok, S::Error> {
	serializer.collect_str(t)
}

pub fn de_parse<'de, T, D>(deserializer: D) -> Result<T, D::Error>
where
	T: std::str::FromStr,
	T::Err: std::fmt::Display,
	D: serde::Deserializer<'de>,
{
	let s = <std::borrow::Cow<'de, str> as serde::Deserialize>::deserialize(deserializer)?;
	s.parse::<T>().map_err(serde::de::Error::custom)
}

#[cfg(test)]
mod tests {
	use std::time::Duration;

	use crate::*;

	#[apply(schema!)]
	struct Sample {
		#[serde(with = "serde_dur")]
		interval: Duration,
		#[serde(default, with = "serde_dur_option")]
		timeout: Option<Duration>,
	}

	#[test]
	fn test_duration_round_trip() {
		let s: Sample = serde_json::from_str(r#"{"interval":"5m","timeout":"250ms"}"#).unwrap();
		assert_eq!(s.interval, Duration::from_secs(300));
		assert_eq!(s.timeout, Some(Duration::from_millis(250)));
		let out = serde_json::to_string(&s).unwrap();
		assert_eq!(out, r#"{"interval":"5m0s","timeout":"250ms"}"#);
	}

	#[test]
	fn test_unknown_fields_rejected() {
		let err = serde_json::from_str::<Sample>(r#"{"interval":"5m","bogus":1}"#);
		assert!(err.is_err());
	}
}
