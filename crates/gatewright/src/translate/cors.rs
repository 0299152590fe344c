//! CORS translation. Header names and methods are validated here so the proxy never
//! sees a value it cannot parse; a `*` entry keeps its wildcard meaning.

use std::str::FromStr;

use crate::translate::PolicyError;
use crate::types::api::CorsSpec;
use crate::types::wire::CorsConfig;
use crate::*;

pub fn translate(spec: &CorsSpec) -> (Option<CorsConfig>, Vec<PolicyError>) {
	let mut errors = Vec::new();

	let allow_headers = valid_headers(&spec.allow_headers, "allowHeaders", &mut errors);
	let expose_headers = valid_headers(&spec.expose_headers, "exposeHeaders", &mut errors);
	let allow_methods = spec
		.allow_methods
		.iter()
		.filter(|m| {
			if m.as_str() == "*" || http::Method::from_str(m).is_ok() {
				true
			} else {
				errors.push(PolicyError::Validation(format!("cors: invalid method {m}")));
				false
			}
		})
		.cloned()
		.collect_vec();

	(
		Some(CorsConfig {
			allow_credentials: spec.allow_credentials,
			allow_headers,
			allow_methods,
			allow_origins: spec.allow_origins.clone(),
			expose_headers,
			max_age: spec.max_age.map(|d| d.as_secs()),
		}),
		errors,
	)
}

fn valid_headers(headers: &[Strng], field: &str, errors: &mut Vec<PolicyError>) -> Vec<Strng> {
	headers
		.iter()
		.filter(|h| {
			if h.as_str() == "*" || http::HeaderName::from_str(h).is_ok() {
				true
			} else {
				errors.push(PolicyError::Validation(format!("cors: invalid {field} entry {h}")));
				false
			}
		})
		.cloned()
		.collect()
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::types::api::*;

	#[test]
	fn test_passthrough_with_max_age_in_seconds() {
		let spec = CorsSpec {
			allow_credentials: true,
			allow_headers: vec![strng::new("x-custom")],
			allow_methods: vec![strng::new("GET"), strng::new("POST")],
			allow_origins: vec![strng::new("https://example.com")],
			expose_headers: vec![strng::new("*")],
			max_age: Some(Duration::from_secs(600)),
		};
		let (cfg, errors) = translate(&spec);
		assert!(errors.is_empty());
		let cfg = cfg.unwrap();
		assert!(cfg.allow_credentials);
		assert_eq!(cfg.max_age, Some(600));
		assert_eq!(cfg.expose_headers, vec![strng::new("*")]);
	}

	#[test]
	fn test_invalid_entries_dropped_and_reported() {
		let spec = CorsSpec {
			allow_headers: vec![strng::new("x ok not")],
			allow_methods: vec![strng::new("FETCH IT")],
			..Default::default()
		};
		let (cfg, errors) = translate(&spec);
		assert_eq!(errors.len(), 2);
		let cfg = cfg.unwrap();
		assert!(cfg.allow_headers.is_empty());
		assert!(cfg.allow_methods.is_empty());
	}
}
