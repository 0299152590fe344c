//! CSRF protection: the proxy validates request origins against the destination
//! origin plus the configured additional origins.

use crate::translate::PolicyError;
use crate::types::api::CsrfSpec;
use crate::types::wire::CsrfConfig;
use crate::*;

pub fn translate(spec: &CsrfSpec) -> (Option<CsrfConfig>, Vec<PolicyError>) {
	let mut errors = Vec::new();
	let additional_origins = spec
		.additional_origins
		.iter()
		.filter(|o| {
			if valid_origin(o) {
				true
			} else {
				errors.push(PolicyError::Validation(format!(
					"csrf: invalid origin {o}; expected <scheme>://<host>(:<port>)"
				)));
				false
			}
		})
		.cloned()
		.collect_vec();

	(Some(CsrfConfig { additional_origins }), errors)
}

fn valid_origin(origin: &str) -> bool {
	let Ok(uri) = origin.parse::<http::Uri>() else {
		return false;
	};
	// An origin is scheme + authority and nothing else.
	uri.scheme().is_some() && uri.authority().is_some() && (uri.path() == "" || uri.path() == "/")
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_valid_origins_pass() {
		let spec = CsrfSpec {
			additional_origins: vec![
				strng::new("https://app.example.com"),
				strng::new("http://localhost:8080"),
			],
		};
		let (cfg, errors) = translate(&spec);
		assert!(errors.is_empty());
		assert_eq!(cfg.unwrap().additional_origins.len(), 2);
	}

	#[test]
	fn test_origin_with_path_rejected() {
		let spec = CsrfSpec {
			additional_origins: vec![strng::new("https://app.example.com/login")],
		};
		let (cfg, errors) = translate(&spec);
		assert_eq!(errors.len(), 1);
		assert!(cfg.unwrap().additional_origins.is_empty());
	}
}
