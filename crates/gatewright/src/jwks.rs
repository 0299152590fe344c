//! Key material parsing: inline JWKS configuration may be a PEM public key, a single
//! JWK, or a full JWK set. Parsed once at translation time; the resulting set is
//! serialized into the provider wire config.

use anyhow::{anyhow, bail};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use jsonwebtoken::jwk::{
	AlgorithmParameters, CommonParameters, EllipticCurve, EllipticCurveKeyParameters,
	EllipticCurveKeyType, Jwk, JwkSet, KeyAlgorithm, OctetKeyPairParameters, OctetKeyPairType,
	PublicKeyUse, RSAKeyParameters, RSAKeyType,
};
use pkcs1::der::Decode as _;
use spki::{ObjectIdentifier, SubjectPublicKeyInfoRef};

const OID_RSA_ENCRYPTION: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.1");
const OID_EC_PUBLIC_KEY: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.2.1");
const OID_ED25519: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.101.112");
const OID_SECP256R1: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.3.1.7");
const OID_SECP384R1: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.132.0.34");

/// Parse inline key material. The input may be a PEM block, an individual JWK, or a
/// JWK set; sources are tried in that order and the first success wins.
pub fn translate_key(key: &str) -> anyhow::Result<JwkSet> {
	let pem_err = match parse_pem(key) {
		Ok(ks) => return Ok(ks),
		Err(e) => e,
	};
	let jwk_err = match parse_jwk(key) {
		Ok(ks) => return Ok(ks),
		Err(e) => e,
	};
	let set_err = match parse_jwk_set(key) {
		Ok(ks) if !ks.keys.is_empty() => return Ok(ks),
		Ok(_) => anyhow!("no keys in set"),
		Err(e) => e,
	};
	bail!("cannot parse local jwks: PEM {pem_err}; JWK {jwk_err}; JWKS {set_err}")
}

fn parse_jwk(key: &str) -> anyhow::Result<JwkSet> {
	let jwk: Jwk = serde_json::from_str(key)?;
	Ok(JwkSet { keys: vec![jwk] })
}

fn parse_jwk_set(key: &str) -> anyhow::Result<JwkSet> {
	Ok(serde_json::from_str(key)?)
}

fn parse_pem(key: &str) -> anyhow::Result<JwkSet> {
	let block = pem::parse(key).map_err(|_| anyhow!("no PEM block found"))?;
	let der = block.contents();

	// A bare PKCS#1 RSA public key, else a SubjectPublicKeyInfo wrapper.
	let jwk = if let Ok(rsa) = pkcs1::RsaPublicKey::from_der(der) {
		rsa_jwk(&rsa)
	} else {
		spki_jwk(der)?
	};
	Ok(JwkSet { keys: vec![jwk] })
}

fn spki_jwk(der: &[u8]) -> anyhow::Result<Jwk> {
	let info = SubjectPublicKeyInfoRef::from_der(der).map_err(|e| anyhow!("invalid public key: {e}"))?;
	let key_bytes = info
		.subject_public_key
		.as_bytes()
		.ok_or_else(|| anyhow!("invalid public key bit string"))?;

	let oid = info.algorithm.oid;
	if oid == OID_RSA_ENCRYPTION {
		let rsa = pkcs1::RsaPublicKey::from_der(key_bytes)
			.map_err(|e| anyhow!("invalid RSA public key: {e}"))?;
		Ok(rsa_jwk(&rsa))
	} else if oid == OID_EC_PUBLIC_KEY {
		let curve_oid = info
			.algorithm
			.parameters_oid()
			.map_err(|_| anyhow!("EC public key is missing its curve"))?;
		let (curve, coord_len, alg) = if curve_oid == OID_SECP256R1 {
			(EllipticCurve::P256, 32, KeyAlgorithm::ES256)
		} else if curve_oid == OID_SECP384R1 {
			(EllipticCurve::P384, 48, KeyAlgorithm::ES384)
		} else {
			bail!("unsupported EC curve {curve_oid}")
		};
		// SEC1 uncompressed point: 0x04 || x || y
		if key_bytes.len() != 1 + 2 * coord_len || key_bytes[0] != 0x04 {
			bail!("EC public key is not an uncompressed point");
		}
		Ok(make_jwk(
			alg,
			AlgorithmParameters::EllipticCurve(EllipticCurveKeyParameters {
				key_type: EllipticCurveKeyType::EC,
				curve,
				x: URL_SAFE_NO_PAD.encode(&key_bytes[1..1 + coord_len]),
				y: URL_SAFE_NO_PAD.encode(&key_bytes[1 + coord_len..]),
			}),
		))
	} else if oid == OID_ED25519 {
		Ok(make_jwk(
			KeyAlgorithm::EdDSA,
			AlgorithmParameters::OctetKeyPair(OctetKeyPairParameters {
				key_type: OctetKeyPairType::OctetKeyPair,
				curve: EllipticCurve::Ed25519,
				x: URL_SAFE_NO_PAD.encode(key_bytes),
			}),
		))
	} else {
		// HMAC has no public-key form, so there is nothing to accept here.
		bail!(
			"unsupported public key algorithm {oid}; only RSA, ECDSA, and Ed25519 public keys are supported in PEM form"
		)
	}
}

fn rsa_jwk(rsa: &pkcs1::RsaPublicKey) -> Jwk {
	make_jwk(
		KeyAlgorithm::RS256,
		AlgorithmParameters::RSA(RSAKeyParameters {
			key_type: RSAKeyType::RSA,
			n: URL_SAFE_NO_PAD.encode(rsa.modulus.as_bytes()),
			e: URL_SAFE_NO_PAD.encode(rsa.public_exponent.as_bytes()),
		}),
	)
}

fn make_jwk(alg: KeyAlgorithm, algorithm: AlgorithmParameters) -> Jwk {
	Jwk {
		common: CommonParameters {
			public_key_use: Some(PublicKeyUse::Signature),
			key_algorithm: Some(alg),
			..Default::default()
		},
		algorithm,
	}
}

#[cfg(test)]
#[path = "jwks_tests.rs"]
mod tests;
