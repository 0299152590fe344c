//! URL rewriting. A prefix replacement is compiled into an anchored regex against the
//! rule's matched prefix; an explicit pattern/substitution passes through after
//! validation. Application is first-writer-wins across rewrite sources.

use crate::merge::MergeMode;
use crate::translate::PolicyError;
use crate::types::api::UrlRewriteSpec;
use crate::types::wire::{RewriteConfig, RouteUnitConfig};
use crate::*;

pub fn translate(
	spec: &UrlRewriteSpec,
	path_prefix: Option<&str>,
) -> Result<RewriteConfig, PolicyError> {
	match spec {
		UrlRewriteSpec::PrefixReplace(replacement) => {
			let Some(prefix) = path_prefix else {
				return Err(PolicyError::Validation(
					"prefix replacement requires a path prefix match on the rule".to_string(),
				));
			};
			Ok(RewriteConfig::Regex {
				pattern: format!("^{prefix}/*"),
				substitution: replacement.to_string(),
			})
		},
		UrlRewriteSpec::Pattern {
			pattern,
			substitution,
		} => {
			regex::Regex::new(pattern)
				.map_err(|e| PolicyError::Validation(format!("invalid rewrite pattern: {e}")))?;
			Ok(RewriteConfig::Regex {
				pattern: pattern.clone(),
				substitution: substitution.clone(),
			})
		},
	}
}

/// Set the route's rewrite. A rewrite already placed by an earlier stage stays,
/// regardless of merge mode, unless the mode is overridable and the incoming value is
/// itself a prefix-style replacement.
pub fn apply(out: &mut RouteUnitConfig, rewrite: RewriteConfig, mode: MergeMode) {
	match &out.rewrite {
		None => out.rewrite = Some(rewrite),
		Some(existing) => {
			if mode == MergeMode::Overridable && rewrite.is_prefix_style() {
				out.rewrite = Some(rewrite);
			} else {
				debug!("route already has a rewrite ({existing:?}); skipping rewrite application");
			}
		},
	}
}

#[cfg(test)]
#[path = "url_rewrite_tests.rs"]
mod tests;
