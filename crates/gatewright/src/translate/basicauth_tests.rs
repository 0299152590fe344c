use super::*;
use crate::snapshot::Snapshot;
use crate::types::api::*;
use crate::*;

const SHA_USER1: &str = "user1:{SHA}NWoZK3kTsExUV00Ywo1G5jlUKKs=";

#[test]
fn test_filter_accepts_sha_entry() {
	let (valid, invalid) = filter_sha_users(SHA_USER1);
	assert_eq!(valid, vec![SHA_USER1.to_string()]);
	assert!(invalid.is_empty());
}

#[test]
fn test_filter_rejects_md5_keeps_sha() {
	let data = "alice:$apr1$ivPt0D4C$DmRhnewfHRSrb3DQC.WHC.\nuser2:{SHA}NWoZK3kTsExUV00Ywo1G5jlUKKs=";
	let (valid, invalid) = filter_sha_users(data);
	assert_eq!(valid, vec!["user2:{SHA}NWoZK3kTsExUV00Ywo1G5jlUKKs=".to_string()]);
	assert_eq!(invalid, vec!["alice".to_string()]);
}

#[test]
fn test_filter_duplicate_keeps_first_and_reports() {
	let data = "user:{SHA}AAAAAAAAAAAAAAAAAAAAAAAAAAA=\nuser:{SHA}BBBBBBBBBBBBBBBBBBBBBBBBBBB=";
	let (valid, invalid) = filter_sha_users(data);
	assert_eq!(valid, vec!["user:{SHA}AAAAAAAAAAAAAAAAAAAAAAAAAAA=".to_string()]);
	assert_eq!(invalid, vec!["user".to_string()]);
}

#[test]
fn test_filter_skips_blanks_and_comments() {
	let data = format!("\n# a comment\n   \n{SHA_USER1}\n");
	let (valid, invalid) = filter_sha_users(&data);
	assert_eq!(valid.len(), 1);
	assert!(invalid.is_empty());
}

#[test]
fn test_filter_second_colon_invalidates() {
	let data = "user1:{SHA}NWoZK3kTsExUV00Ywo1G5jl:KKs=";
	let (valid, invalid) = filter_sha_users(data);
	assert!(valid.is_empty());
	assert_eq!(invalid, vec!["user1".to_string()]);
}

#[test]
fn test_filter_missing_colon_reports_whole_line() {
	let (valid, invalid) = filter_sha_users("justausername");
	assert!(valid.is_empty());
	assert_eq!(invalid, vec!["justausername".to_string()]);
}

#[test]
fn test_filter_wrong_hash_length_rejected() {
	let (valid, invalid) = filter_sha_users("u:{SHA}tooshort=");
	assert!(valid.is_empty());
	assert_eq!(invalid, vec!["u".to_string()]);
}

fn secret_snapshot(htpasswd: &str) -> Snapshot {
	let mut snap = Snapshot::default();
	snap.insert_secret(Secret {
		metadata: ObjectMeta {
			name: strng::new("credentials"),
			namespace: strng::new("default"),
			..Default::default()
		},
		data: [(strng::new(".htpasswd"), htpasswd.to_string())]
			.into_iter()
			.collect(),
	});
	snap
}

#[test]
fn test_translate_inline_users() {
	let spec = BasicAuthenticationSpec {
		mode: AuthenticationMode::Strict,
		realm: Some("Restricted".to_string()),
		users: vec![SHA_USER1.to_string()],
		secret_ref: None,
	};
	let (cfg, errors) = translate(&spec, "default", &Snapshot::default());
	assert!(errors.is_empty(), "{errors:?}");
	let cfg = cfg.unwrap();
	assert_eq!(cfg.users, SHA_USER1);
	assert_eq!(cfg.realm.as_deref(), Some("Restricted"));
}

#[test]
fn test_translate_from_secret() {
	let snap = secret_snapshot(SHA_USER1);
	let spec = BasicAuthenticationSpec {
		mode: AuthenticationMode::Optional,
		realm: None,
		users: vec![],
		secret_ref: Some(SecretRef {
			name: strng::new("credentials"),
			namespace: None,
			key: None,
		}),
	};
	let (cfg, errors) = translate(&spec, "default", &snap);
	assert!(errors.is_empty(), "{errors:?}");
	assert_eq!(cfg.unwrap().users, SHA_USER1);
}

#[test]
fn test_translate_dropped_users_are_conflict() {
	let spec = BasicAuthenticationSpec {
		mode: AuthenticationMode::Strict,
		realm: None,
		users: vec![
			SHA_USER1.to_string(),
			"alice:$apr1$legacy$hash".to_string(),
		],
		secret_ref: None,
	};
	let (cfg, errors) = translate(&spec, "default", &Snapshot::default());
	assert!(cfg.is_some());
	assert_eq!(errors.len(), 1);
	assert!(matches!(errors[0], PolicyError::Conflict(_)));
	assert!(errors[0].to_string().contains("alice"));
}

#[test]
fn test_translate_no_valid_users_is_error() {
	let spec = BasicAuthenticationSpec {
		mode: AuthenticationMode::Strict,
		realm: None,
		users: vec!["alice:$apr1$legacy$hash".to_string()],
		secret_ref: None,
	};
	let (cfg, errors) = translate(&spec, "default", &Snapshot::default());
	assert!(cfg.is_none());
	assert!(matches!(errors[0], PolicyError::Validation(_)));
}

#[test]
fn test_translate_missing_secret_is_reference_error() {
	let spec = BasicAuthenticationSpec {
		mode: AuthenticationMode::Strict,
		realm: None,
		users: vec![],
		secret_ref: Some(SecretRef {
			name: strng::new("absent"),
			namespace: None,
			key: None,
		}),
	};
	let (cfg, errors) = translate(&spec, "default", &Snapshot::default());
	assert!(cfg.is_none());
	assert!(errors[0].retryable());
}

#[test]
fn test_translate_users_and_secret_is_error() {
	let snap = secret_snapshot(SHA_USER1);
	let spec = BasicAuthenticationSpec {
		mode: AuthenticationMode::Strict,
		realm: None,
		users: vec![SHA_USER1.to_string()],
		secret_ref: Some(SecretRef {
			name: strng::new("credentials"),
			namespace: None,
			key: None,
		}),
	};
	let (cfg, errors) = translate(&spec, "default", &snap);
	assert!(cfg.is_none());
	assert!(errors[0].to_string().contains("one of"));
}
