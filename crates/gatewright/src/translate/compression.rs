//! Compression and decompression toggles. The listener-level gzip filters are only
//! materialized once a route in the chain opts in, and start disabled so they have no
//! effect elsewhere.

use crate::types::api::CompressionSpec;

/// What one route wants from the chain's compression filters. `Some(true)` enables the
/// filter for the route (and requires it in the chain); `Some(false)` is an explicit
/// per-route disable, e.g. to override an inherited enable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompressionNeeds {
	pub compressor: Option<bool>,
	pub decompressor: Option<bool>,
}

pub fn translate(spec: &CompressionSpec) -> CompressionNeeds {
	CompressionNeeds {
		// Configured means on unless explicitly disabled.
		compressor: spec.response_compression.as_ref().map(|t| t.disable.is_none()),
		decompressor: spec.request_decompression.as_ref().map(|t| t.disable.is_none()),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::types::api::*;

	#[test]
	fn test_unset_sections_request_nothing() {
		let needs = translate(&CompressionSpec::default());
		assert_eq!(needs, CompressionNeeds::default());
	}

	#[test]
	fn test_configured_defaults_to_enabled() {
		let spec = CompressionSpec {
			response_compression: Some(ToggleSpec { disable: None }),
			request_decompression: None,
		};
		let needs = translate(&spec);
		assert_eq!(needs.compressor, Some(true));
		assert_eq!(needs.decompressor, None);
	}

	#[test]
	fn test_disable_present_means_off() {
		let spec = CompressionSpec {
			response_compression: Some(ToggleSpec {
				disable: Some(Disabled {}),
			}),
			request_decompression: Some(ToggleSpec { disable: None }),
		};
		let needs = translate(&spec);
		assert_eq!(needs.compressor, Some(false));
		assert_eq!(needs.decompressor, Some(true));
	}
}
