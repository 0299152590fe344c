//! Frontend (inbound-connection) translation: listener transport tunables and access
//! logging for one filter chain.

use crate::translate::PolicyError;
use crate::types::ir::EffectiveFrontendPolicy;
use crate::types::wire::{AccessLogConfig, ListenerSettings};
use crate::*;

pub fn translate(
	policy: &EffectiveFrontendPolicy,
) -> (Option<ListenerSettings>, Option<AccessLogConfig>, Vec<PolicyError>) {
	let mut errors = Vec::new();

	let mut settings = ListenerSettings::default();
	let mut any = false;
	if let Some(http) = &policy.http {
		settings.idle_timeout = http.idle_timeout;
		settings.max_concurrent_streams = http.max_concurrent_streams;
		settings.per_connection_buffer_limit_bytes = http.per_connection_buffer_limit_bytes;
		any = true;
	}
	if let Some(tls) = &policy.tls {
		settings.tls_handshake_timeout = tls.handshake_timeout;
		settings.alpn = tls.alpn.clone();
		any = true;
	}
	if let Some(tcp) = &policy.tcp {
		settings.keepalive = tcp.keepalive.clone();
		any = true;
	}

	let access_log = policy.access_log.as_ref().map(|log| {
		if let Some(filter) = &log.filter
			&& filter.trim().is_empty()
		{
			errors.push(PolicyError::Validation(
				"access log filter expression is empty".to_string(),
			));
		}
		let attributes = log.attributes.clone().unwrap_or_default();
		AccessLogConfig {
			filter: log.filter.clone().filter(|f| !f.trim().is_empty()),
			remove: attributes.remove,
			add: attributes.add,
		}
	});

	(any.then_some(settings), access_log, errors)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::types::api::*;

	#[test]
	fn test_empty_policy_produces_nothing() {
		let (settings, log, errors) = translate(&EffectiveFrontendPolicy::default());
		assert!(settings.is_none());
		assert!(log.is_none());
		assert!(errors.is_empty());
	}

	#[test]
	fn test_tunables_carry_through() {
		let policy = EffectiveFrontendPolicy {
			http: Some(FrontendHttpSpec {
				idle_timeout: Some(Duration::from_secs(600)),
				max_concurrent_streams: Some(128),
				per_connection_buffer_limit_bytes: None,
			}),
			tcp: Some(FrontendTcpSpec {
				keepalive: Some(KeepaliveSpec {
					time: Some(Duration::from_secs(180)),
					interval: Some(Duration::from_secs(180)),
					retries: Some(9),
				}),
			}),
			..Default::default()
		};
		let (settings, _, errors) = translate(&policy);
		assert!(errors.is_empty());
		let settings = settings.unwrap();
		assert_eq!(settings.idle_timeout, Some(Duration::from_secs(600)));
		assert_eq!(settings.max_concurrent_streams, Some(128));
		assert_eq!(settings.keepalive.unwrap().retries, Some(9));
	}

	#[test]
	fn test_access_log_attributes() {
		let policy = EffectiveFrontendPolicy {
			access_log: Some(AccessLogSpec {
				filter: Some(strng::new("response.code >= 400")),
				attributes: Some(AttributesSpec {
					remove: vec![strng::new("http.method")],
					add: vec![AttributeAdd {
						name: strng::new("tenant"),
						expression: strng::new("request.headers['x-tenant']"),
					}],
				}),
			}),
			..Default::default()
		};
		let (_, log, errors) = translate(&policy);
		assert!(errors.is_empty());
		let log = log.unwrap();
		assert_eq!(log.filter, Some(strng::new("response.code >= 400")));
		assert_eq!(log.remove.len(), 1);
		assert_eq!(log.add.len(), 1);
	}
}
