//! Header modifiers and hostname rewrite. Modifier entries are validated so the proxy
//! never receives an unparseable header name or value.

use std::str::FromStr;

use crate::translate::PolicyError;
use crate::types::api::*;
use crate::*;

pub fn translate_modifiers(
	spec: &HeaderModifiersSpec,
) -> (Option<HeaderModifierSpec>, Option<HeaderModifierSpec>, Vec<PolicyError>) {
	let mut errors = Vec::new();
	let request = spec
		.request
		.as_ref()
		.map(|m| validate_modifier(m, "request", &mut errors));
	let response = spec
		.response
		.as_ref()
		.map(|m| validate_modifier(m, "response", &mut errors));
	(request, response, errors)
}

fn validate_modifier(
	m: &HeaderModifierSpec,
	direction: &str,
	errors: &mut Vec<PolicyError>,
) -> HeaderModifierSpec {
	HeaderModifierSpec {
		add: valid_entries(&m.add, direction, errors),
		set: valid_entries(&m.set, direction, errors),
		remove: m
			.remove
			.iter()
			.filter(|name| {
				if http::HeaderName::from_str(name).is_ok() {
					true
				} else {
					errors.push(PolicyError::Validation(format!(
						"{direction} header modifier: invalid header name {name}"
					)));
					false
				}
			})
			.cloned()
			.collect(),
	}
}

fn valid_entries(
	entries: &[HeaderValueSpec],
	direction: &str,
	errors: &mut Vec<PolicyError>,
) -> Vec<HeaderValueSpec> {
	entries
		.iter()
		.filter(|e| {
			if http::HeaderName::from_str(&e.name).is_err() {
				errors.push(PolicyError::Validation(format!(
					"{direction} header modifier: invalid header name {}",
					e.name
				)));
				return false;
			}
			if http::HeaderValue::from_str(&e.value).is_err() {
				errors.push(PolicyError::Validation(format!(
					"{direction} header modifier: invalid value for header {}",
					e.name
				)));
				return false;
			}
			true
		})
		.cloned()
		.collect()
}
