use jsonwebtoken::jwk::{
	AlgorithmParameters, EllipticCurve, Jwk, JwkSet, KeyAlgorithm, PublicKeyUse, RSAKeyParameters,
};
use serde_json::json;

use super::*;

const RSA_SPKI: &str = "-----BEGIN PUBLIC KEY-----
MIIBIjANBgkqhkiG9w0BAQEFAAOCAQ8AMIIBCgKCAQEAlx2WTWPbx8EbTCI1GTlI
WZUO+jMQaQuTmcFrZK34AZ830IOilrmTtU5mkeQbsoJJ1kk9ufixUmMil8U/d8dT
Tzfa+FXlBthtnHzTAYWZxVR9zfbBGHEolmuH2vgfuVumwguFG0ezN+ZIQrKdsxqK
xINXsri39q9yyG1uhCbPhNVDi1ydAlYmKzreTzpjXDCs2ShOphdJZU+qoX01qJga
arjEkxxJ5juSft/o3o1N5atXIKhnsbfHJQupuzBnNqyhqx52hBuVDXMX1rcwKJ6S
U6NPaZWBkaNq3C07pZyK+OM4L5Owd6g/s2ExPnq7Y17/Tr7pFhNu5UXS2LdDVy3R
uQIDAQAB
-----END PUBLIC KEY-----";

const RSA_PKCS1: &str = "-----BEGIN RSA PUBLIC KEY-----
MIIBCgKCAQEAlx2WTWPbx8EbTCI1GTlIWZUO+jMQaQuTmcFrZK34AZ830IOilrmT
tU5mkeQbsoJJ1kk9ufixUmMil8U/d8dTTzfa+FXlBthtnHzTAYWZxVR9zfbBGHEo
lmuH2vgfuVumwguFG0ezN+ZIQrKdsxqKxINXsri39q9yyG1uhCbPhNVDi1ydAlYm
KzreTzpjXDCs2ShOphdJZU+qoX01qJgaarjEkxxJ5juSft/o3o1N5atXIKhnsbfH
JQupuzBnNqyhqx52hBuVDXMX1rcwKJ6SU6NPaZWBkaNq3C07pZyK+OM4L5Owd6g/
s2ExPnq7Y17/Tr7pFhNu5UXS2LdDVy3RuQIDAQAB
-----END RSA PUBLIC KEY-----";

const EC_SPKI: &str = "-----BEGIN PUBLIC KEY-----
MFkwEwYHKoZIzj0CAQYIKoZIzj0DAQcDQgAEtlDsnxxhT2soiHRD6WYDHlL2+N02
OQbHdXLOQ7cHTLpN7TZdAGjmhmjG4yNIxyPGbK3bPnSWZufCCRyrwukW+A==
-----END PUBLIC KEY-----";

const ED25519_SPKI: &str = "-----BEGIN PUBLIC KEY-----
MCowBQYDK2VwAyEAwAzuhKZwUh8ufBosv85S8xNrlxwo6rolO6U5UJD3b6w=
-----END PUBLIC KEY-----";

const DSA_SPKI: &str = "-----BEGIN PUBLIC KEY-----
MIIBvzCCATMGByqGSM44BAEwggEmAoGBAONVVGb1PaPs5uqljO/RzzRaxIKZbwME
74jFCzwagh8ZppPNuFr2P7audp1JEabq07nzQ0gzD+zlWbADKuTLOqKJKwr8vcNP
wqUC1kDCsUoUJR2Br/r8CGP0nP/0ADK8QVBslVAQoWbuJq+m3W3XRe0cjjanoQXD
2BXUHcvtMRifAh0A9eAKDg0J3AXaoOJUQvQ37kCuhVKkAa5TWVWURwKBgB92pzAd
aknXv0U1aWbwTQuAf9JfRk1sDnr5x4G1l+y1MnZzi1ZxcDk9j6P44vW0kAv7YViR
Uv+BmVsjgX8hkgnj21hlvUp5+KwsK+ptEBoJGQSDsqrpOh+MOCTkaVsD+UVhkxcN
KGhV7NTiRxKWmgZw+uIIsgNjqSiY5fwFAF8MA4GFAAKBgQDDO9W+Xtgl9Tosbx4u
kIdZXRAcFiJmYEFtyd2xcOCoRW6VwMXn4iN4IKfK4DLjsfGM8gXZoVORd41t87nD
IPopWdAXdMaIHjmArcBI7l4BX9wrQa4K7RPN5fKcryvzVp39oxIBDMNVStxC6izt
ndBvuJZkUoTYwMJfASJnI17BZg==
-----END PUBLIC KEY-----";

fn rsa_params(jwk: &Jwk) -> &RSAKeyParameters {
	match &jwk.algorithm {
		AlgorithmParameters::RSA(p) => p,
		other => panic!("expected RSA parameters, got {other:?}"),
	}
}

#[test]
fn test_rsa_spki_pem() {
	let ks = translate_key(RSA_SPKI).unwrap();
	assert_eq!(ks.keys.len(), 1);
	let jwk = &ks.keys[0];
	assert_eq!(jwk.common.key_algorithm, Some(KeyAlgorithm::RS256));
	assert_eq!(jwk.common.public_key_use, Some(PublicKeyUse::Signature));
	let p = rsa_params(jwk);
	assert_eq!(p.e, "AQAB");
	assert!(p.n.starts_with("lx2WTWPbx8EbTCI1GTlI"));
}

#[test]
fn test_rsa_pkcs1_pem_matches_spki() {
	let spki = translate_key(RSA_SPKI).unwrap();
	let pkcs1 = translate_key(RSA_PKCS1).unwrap();
	assert_eq!(rsa_params(&spki.keys[0]), rsa_params(&pkcs1.keys[0]));
}

#[test]
fn test_ec_pem() {
	let ks = translate_key(EC_SPKI).unwrap();
	let jwk = &ks.keys[0];
	assert_eq!(jwk.common.key_algorithm, Some(KeyAlgorithm::ES256));
	let AlgorithmParameters::EllipticCurve(p) = &jwk.algorithm else {
		panic!("expected EC parameters");
	};
	assert_eq!(p.curve, EllipticCurve::P256);
	assert_eq!(p.x, "tlDsnxxhT2soiHRD6WYDHlL2-N02OQbHdXLOQ7cHTLo");
	assert_eq!(p.y, "Te02XQBo5oZoxuMjSMcjxmyt2z50lmbnwgkcq8LpFvg");
}

#[test]
fn test_ed25519_pem() {
	let ks = translate_key(ED25519_SPKI).unwrap();
	let jwk = &ks.keys[0];
	assert_eq!(jwk.common.key_algorithm, Some(KeyAlgorithm::EdDSA));
	let AlgorithmParameters::OctetKeyPair(p) = &jwk.algorithm else {
		panic!("expected OKP parameters");
	};
	assert_eq!(p.x, "wAzuhKZwUh8ufBosv85S8xNrlxwo6rolO6U5UJD3b6w");
}

#[test]
fn test_unsupported_pem_algorithm() {
	let err = translate_key(DSA_SPKI).unwrap_err().to_string();
	assert!(err.contains("only RSA, ECDSA, and Ed25519"), "{err}");
}

#[test]
fn test_single_jwk() {
	let jwk = json!({
		"use": "sig",
		"kty": "EC",
		"kid": "XhO06x8JjWH1wwkWkyeEUxsooGEWoEdidEpwyd_hmuI",
		"crv": "P-256",
		"alg": "ES256",
		"x": "XZHF8Em5LbpqfgewAalpSEH4Ka2I2xjcxxUt2j6-lCo",
		"y": "g3DFz45A7EOUMgmsNXatrXw1t-PG5xsbkxUs851RxSE"
	});
	let ks = translate_key(&jwk.to_string()).unwrap();
	assert_eq!(ks.keys.len(), 1);
	assert_eq!(
		ks.keys[0].common.key_id.as_deref(),
		Some("XhO06x8JjWH1wwkWkyeEUxsooGEWoEdidEpwyd_hmuI")
	);
}

#[test]
fn test_jwk_set() {
	let set = json!({"keys": [
		{"kty": "EC", "kid": "a", "crv": "P-256", "alg": "ES256",
		 "x": "XZHF8Em5LbpqfgewAalpSEH4Ka2I2xjcxxUt2j6-lCo",
		 "y": "g3DFz45A7EOUMgmsNXatrXw1t-PG5xsbkxUs851RxSE"},
		{"kty": "EC", "kid": "b", "crv": "P-256", "alg": "ES256",
		 "x": "XZHF8Em5LbpqfgewAalpSEH4Ka2I2xjcxxUt2j6-lCo",
		 "y": "g3DFz45A7EOUMgmsNXatrXw1t-PG5xsbkxUs851RxSE"}
	]});
	let ks = translate_key(&set.to_string()).unwrap();
	assert_eq!(ks.keys.len(), 2);
}

#[test]
fn test_empty_jwk_set_rejected() {
	let err = translate_key(r#"{"keys": []}"#).unwrap_err().to_string();
	assert!(err.contains("no keys in set"), "{err}");
}

#[test]
fn test_garbage_reports_all_three_failures() {
	let err = translate_key("not a key").unwrap_err().to_string();
	assert!(err.contains("PEM"), "{err}");
	assert!(err.contains("JWK"), "{err}");
	assert!(err.contains("JWKS"), "{err}");
}

#[test]
fn test_round_trip_preserves_keys() {
	let set = json!({"keys": [
		{"kty": "EC", "kid": "first", "crv": "P-256", "alg": "ES256",
		 "x": "XZHF8Em5LbpqfgewAalpSEH4Ka2I2xjcxxUt2j6-lCo",
		 "y": "g3DFz45A7EOUMgmsNXatrXw1t-PG5xsbkxUs851RxSE"},
		{"kty": "EC", "kid": "second", "crv": "P-256", "alg": "ES256",
		 "x": "XZHF8Em5LbpqfgewAalpSEH4Ka2I2xjcxxUt2j6-lCo",
		 "y": "g3DFz45A7EOUMgmsNXatrXw1t-PG5xsbkxUs851RxSE"}
	]});
	let ks = translate_key(&set.to_string()).unwrap();
	let serialized = serde_json::to_string(&ks).unwrap();
	let reparsed = translate_key(&serialized).unwrap();
	assert_eq!(reparsed.keys.len(), ks.keys.len());
	let kids = |s: &JwkSet| {
		s.keys
			.iter()
			.map(|k| k.common.key_id.clone().unwrap_or_default())
			.collect::<Vec<_>>()
	};
	assert_eq!(kids(&reparsed), kids(&ks));
}
