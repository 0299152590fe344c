//! Field-level policy merging. Fragments fold left-to-right in the order the index
//! produced them (ascending specificity, then weight): for each field independently,
//! the last fragment that set it wins. There is no deep merge; a field's effective
//! value always comes from exactly one fragment.

use crate::types::api::*;
use crate::types::ir::*;
use crate::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeMode {
	/// Values the caller pre-populated (route builtins, implicit defaults) are kept;
	/// fragments only fill fields that are still unset.
	Augmented,
	/// Fragments override pre-populated values too.
	Overridable,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergeResult<T> {
	pub policy: T,
	/// Which fragment won each field, keyed by field name. Used to resolve references
	/// in the winning policy's namespace and surfaced for diagnostics.
	pub origins: MergeOrigins,
}

impl<T> MergeResult<T> {
	/// Namespace to resolve a field's references in: the winning fragment's namespace,
	/// or the unit's own namespace when the field came from the caller's base.
	pub fn origin_namespace<'a>(&'a self, field: &str, fallback: &'a str) -> &'a str {
		match self.origins.get(field) {
			Some(origin) => origin.split_once('/').map(|(ns, _)| ns).unwrap_or(fallback),
			None => fallback,
		}
	}
}

macro_rules! impl_fragment_merge {
	($eff:ty, $spec:ty, [$($field:ident),+ $(,)?]) => {
		impl $eff {
			fn apply_fragment(&mut self, src: &$spec, origins: &mut MergeOrigins, from: &Strng) {
				$(
					if src.$field.is_some() {
						self.$field = src.$field.clone();
						origins.insert(stringify!($field), from.clone());
					}
				)+
			}

			fn keep_base(&mut self, base: &Self, origins: &mut MergeOrigins) {
				$(
					if base.$field.is_some() {
						self.$field = base.$field.clone();
						origins.remove(stringify!($field));
					}
				)+
			}
		}
	};
}

impl_fragment_merge!(EffectiveTrafficPolicy, TrafficSpec, [
	transformation,
	ext_proc,
	ext_auth,
	rate_limit,
	cors,
	csrf,
	header_modifiers,
	hostname_rewrite,
	url_rewrite,
	compression,
	timeouts,
	retry,
	authorization,
	jwt_authentication,
	basic_authentication,
	api_key_authentication,
	direct_response,
]);

impl_fragment_merge!(EffectiveFrontendPolicy, FrontendSpec, [http, tls, tcp, access_log]);

impl_fragment_merge!(EffectiveBackendPolicy, BackendSpec, [http, tcp, tls, auth]);

macro_rules! impl_merge_fn {
	($name:ident, $eff:ty, $spec:ty, $section:ident) => {
		/// Merge the given fragments (ordered ascending by specificity/weight) over
		/// `base`. PreRouting and PostRouting fragments must never be passed to one
		/// call together; the engine folds each phase independently.
		pub fn $name(
			base: &$eff,
			fragments: &[AttachedFragment],
			mode: MergeMode,
		) -> MergeResult<$eff> {
			let mut origins = MergeOrigins::new();
			let mut policy = match mode {
				MergeMode::Overridable => base.clone(),
				MergeMode::Augmented => <$eff>::default(),
			};
			for f in fragments {
				let Some(src) = f.policy.spec.$section.as_ref() else {
					continue;
				};
				policy.apply_fragment(src, &mut origins, &f.name());
			}
			if mode == MergeMode::Augmented {
				policy.keep_base(base, &mut origins);
			}
			MergeResult { policy, origins }
		}
	};
}

impl_merge_fn!(merge_traffic, EffectiveTrafficPolicy, TrafficSpec, traffic);
impl_merge_fn!(merge_frontend, EffectiveFrontendPolicy, FrontendSpec, frontend);
impl_merge_fn!(merge_backend, EffectiveBackendPolicy, BackendSpec, backend);

#[cfg(test)]
#[path = "merge_tests.rs"]
mod tests;
