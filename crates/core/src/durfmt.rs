//! Go-style duration strings ("250ms", "5m", "1h30m"). The policy API expresses every
//! duration in this format, so parse/format must round-trip through it.

use std::time::Duration;

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum Error {
	#[error("parse error: {}", err_str(.0))]
	ParseError(go_parse_duration::Error),
}

fn err_str(e: &go_parse_duration::Error) -> &str {
	match e {
		go_parse_duration::Error::ParseError(s) => s,
	}
}

pub fn parse(string: &str) -> Result<Duration, Error> {
	let d = go_parse_duration::parse_duration(string).map_err(Error::ParseError)?;
	if d < 0 {
		return Err(Error::ParseError(go_parse_duration::Error::ParseError(
			"negative durations are not allowed".to_string(),
		)));
	}
	Ok(Duration::from_nanos(d as u64))
}

pub fn format(d: Duration) -> String {
	durationfmt::to_string(d)
}
