//! Retry and timeout translation.

use crate::translate::PolicyError;
use crate::types::api::RetrySpec;
use crate::types::wire::RetryConfig;
use crate::*;

/// The proxy stores the attempt count as a u8; anything larger is clamped.
const MAX_ATTEMPTS: u32 = u8::MAX as u32;

pub fn translate(spec: &RetrySpec) -> (Option<RetryConfig>, Vec<PolicyError>) {
	let mut errors = Vec::new();

	let mut codes = Vec::new();
	for &code in &spec.codes {
		match http::StatusCode::from_u16(code) {
			Ok(_) => codes.push(code),
			Err(_) => errors.push(PolicyError::Validation(format!(
				"retry: invalid status code {code}"
			))),
		}
	}

	let attempts = match spec.attempts {
		None => 1,
		Some(0) => {
			errors.push(PolicyError::Validation(
				"retry: attempts must be at least 1".to_string(),
			));
			return (None, errors);
		},
		Some(a) => a.min(MAX_ATTEMPTS) as u8,
	};

	(
		Some(RetryConfig {
			codes,
			attempts,
			backoff: spec.backoff,
		}),
		errors,
	)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_translate_basic() {
		let spec = RetrySpec {
			codes: vec![502, 503],
			attempts: Some(3),
			backoff: Some(Duration::from_millis(250)),
		};
		let (cfg, errors) = translate(&spec);
		assert!(errors.is_empty());
		let cfg = cfg.unwrap();
		assert_eq!(cfg.codes, vec![502, 503]);
		assert_eq!(cfg.attempts, 3);
		assert_eq!(cfg.backoff, Some(Duration::from_millis(250)));
	}

	#[test]
	fn test_attempts_clamped_to_u8() {
		let spec = RetrySpec {
			codes: vec![],
			attempts: Some(1000),
			backoff: None,
		};
		let (cfg, errors) = translate(&spec);
		assert!(errors.is_empty());
		assert_eq!(cfg.unwrap().attempts, 255);
	}

	#[test]
	fn test_invalid_code_reported() {
		let spec = RetrySpec {
			codes: vec![999, 503],
			attempts: None,
			backoff: None,
		};
		let (cfg, errors) = translate(&spec);
		assert_eq!(errors.len(), 1);
		assert_eq!(cfg.unwrap().codes, vec![503]);
	}
}
