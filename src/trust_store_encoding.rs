//! PKCS#12 encoding for certificate-only trust stores.
//!
//! openssl writes a key-less certificate bag with nothing but a friendly
//! name, and Java's PKCS#12 loader skips such bags. A Java trust store
//! entry is a certificate bag that also carries Oracle's trusted key usage
//! attribute (`2.16.840.1.113894.746875.1.1`, value `anyExtendedKeyUsage`).
//! This module lays out the PFX by hand:
//!
//! ```text
//! PFX
//! ├── version 3
//! ├── authSafe: data ─ AuthenticatedSafe
//! │                    └── data ─ SafeContents
//! │                               └── certBag { x509Certificate, friendlyName, trustedKeyUsage }
//! └── macData: HMAC-SHA256, key from the PKCS#12 KDF
//! ```
//!
//! The certificate bag is not encrypted; the store only holds public data
//! and its integrity comes from the password MAC.

use openssl::hash::{hash, Hasher, MessageDigest};
use openssl::pkey::PKey;
use openssl::rand::rand_bytes;
use openssl::sign::Signer;
use simple_asn1::{oid, to_der, ASN1Block, ASN1Class, BigInt, BigUint, OID};

use crate::error::{Error, Result};

const PFX_VERSION: i64 = 3;
const MAC_ITERATIONS: usize = 10_000;
const MAC_SALT_LEN: usize = 20;
const SHA256_LEN: usize = 32;
const SHA256_BLOCK_LEN: usize = 64;
const KDF_MAC_ID: u8 = 3;

pub(crate) fn data_oid() -> OID {
    oid!(1, 2, 840, 113549, 1, 7, 1)
}

pub(crate) fn cert_bag_oid() -> OID {
    oid!(1, 2, 840, 113549, 1, 12, 10, 1, 3)
}

pub(crate) fn x509_certificate_oid() -> OID {
    oid!(1, 2, 840, 113549, 1, 9, 22, 1)
}

pub(crate) fn friendly_name_oid() -> OID {
    oid!(1, 2, 840, 113549, 1, 9, 20)
}

pub(crate) fn trusted_key_usage_oid() -> OID {
    oid!(2, 16, 840, 1, 113894, 746875, 1, 1)
}

pub(crate) fn any_extended_key_usage_oid() -> OID {
    oid!(2, 5, 29, 37, 0)
}

fn sha256_oid() -> OID {
    oid!(2, 16, 840, 1, 101, 3, 4, 2, 1)
}

/// Encode a password-protected PFX holding `certificate_der` as a trusted
/// certificate entry named `alias`.
pub fn encode_trust_store(alias: &str, certificate_der: &[u8], password: &str) -> Result<Vec<u8>> {
    let safe_contents = ASN1Block::Sequence(0, vec![cert_bag(alias, certificate_der)]);
    let authenticated_safe = ASN1Block::Sequence(0, vec![data_content_info(der(&safe_contents)?)]);
    let auth_safe_der = der(&authenticated_safe)?;

    let mut salt = vec![0u8; MAC_SALT_LEN];
    rand_bytes(&mut salt)
        .map_err(|e| Error::EncodingFailed(format!("Failed to generate MAC salt: {}", e)))?;
    let mac = compute_mac(password, &salt, MAC_ITERATIONS, &auth_safe_der)?;

    let mac_data = ASN1Block::Sequence(
        0,
        vec![
            ASN1Block::Sequence(
                0,
                vec![
                    ASN1Block::Sequence(
                        0,
                        vec![
                            ASN1Block::ObjectIdentifier(0, sha256_oid()),
                            ASN1Block::Null(0),
                        ],
                    ),
                    ASN1Block::OctetString(0, mac),
                ],
            ),
            ASN1Block::OctetString(0, salt),
            ASN1Block::Integer(0, BigInt::from(MAC_ITERATIONS)),
        ],
    );

    let pfx = ASN1Block::Sequence(
        0,
        vec![
            ASN1Block::Integer(0, BigInt::from(PFX_VERSION)),
            data_content_info(auth_safe_der),
            mac_data,
        ],
    );
    der(&pfx)
}

fn cert_bag(alias: &str, certificate_der: &[u8]) -> ASN1Block {
    let cert_bag_value = ASN1Block::Sequence(
        0,
        vec![
            ASN1Block::ObjectIdentifier(0, x509_certificate_oid()),
            explicit_zero(ASN1Block::OctetString(0, certificate_der.to_vec())),
        ],
    );

    let friendly_name = ASN1Block::Sequence(
        0,
        vec![
            ASN1Block::ObjectIdentifier(0, friendly_name_oid()),
            ASN1Block::Set(0, vec![ASN1Block::BMPString(0, alias.to_string())]),
        ],
    );
    let trusted_key_usage = ASN1Block::Sequence(
        0,
        vec![
            ASN1Block::ObjectIdentifier(0, trusted_key_usage_oid()),
            ASN1Block::Set(
                0,
                vec![ASN1Block::ObjectIdentifier(0, any_extended_key_usage_oid())],
            ),
        ],
    );

    ASN1Block::Sequence(
        0,
        vec![
            ASN1Block::ObjectIdentifier(0, cert_bag_oid()),
            explicit_zero(cert_bag_value),
            ASN1Block::Set(0, vec![friendly_name, trusted_key_usage]),
        ],
    )
}

fn data_content_info(content: Vec<u8>) -> ASN1Block {
    ASN1Block::Sequence(
        0,
        vec![
            ASN1Block::ObjectIdentifier(0, data_oid()),
            explicit_zero(ASN1Block::OctetString(0, content)),
        ],
    )
}

fn explicit_zero(inner: ASN1Block) -> ASN1Block {
    ASN1Block::Explicit(ASN1Class::ContextSpecific, 0, BigUint::from(0u8), Box::new(inner))
}

fn der(block: &ASN1Block) -> Result<Vec<u8>> {
    to_der(block).map_err(|e| Error::EncodingFailed(format!("Failed to encode DER: {}", e)))
}

/// HMAC-SHA256 over `data`, keyed by the PKCS#12 KDF (RFC 7292, appendix B).
pub(crate) fn compute_mac(
    password: &str,
    salt: &[u8],
    iterations: usize,
    data: &[u8],
) -> Result<Vec<u8>> {
    let failed = |e: openssl::error::ErrorStack| {
        Error::EncodingFailed(format!("Failed to compute store MAC: {}", e))
    };

    let key = pkcs12_kdf(password, salt, iterations, KDF_MAC_ID, SHA256_LEN).map_err(failed)?;
    let key = PKey::hmac(&key).map_err(failed)?;
    let mut signer = Signer::new(MessageDigest::sha256(), &key).map_err(failed)?;
    signer.update(data).map_err(failed)?;
    signer.sign_to_vec().map_err(failed)
}

fn pkcs12_kdf(
    password: &str,
    salt: &[u8],
    iterations: usize,
    id: u8,
    out_len: usize,
) -> std::result::Result<Vec<u8>, openssl::error::ErrorStack> {
    // BMPString, big-endian, with a two byte terminator.
    let mut password_bytes: Vec<u8> = password
        .encode_utf16()
        .flat_map(|unit| unit.to_be_bytes())
        .collect();
    password_bytes.extend_from_slice(&[0, 0]);

    let diversifier = [id; SHA256_BLOCK_LEN];
    let mut input = fill_blocks(salt);
    input.extend(fill_blocks(&password_bytes));

    let mut out = Vec::with_capacity(out_len);
    loop {
        let mut hasher = Hasher::new(MessageDigest::sha256())?;
        hasher.update(&diversifier)?;
        hasher.update(&input)?;
        let mut block = hasher.finish()?.to_vec();
        for _ in 1..iterations {
            block = hash(MessageDigest::sha256(), &block)?.to_vec();
        }
        out.extend_from_slice(&block);
        if out.len() >= out_len {
            break;
        }

        let b: Vec<u8> = block.iter().cycle().take(SHA256_BLOCK_LEN).copied().collect();
        for chunk in input.chunks_mut(SHA256_BLOCK_LEN) {
            let mut carry = 1u16;
            for k in (0..chunk.len()).rev() {
                let sum = u16::from(chunk[k]) + u16::from(b[k]) + carry;
                chunk[k] = sum as u8;
                carry = sum >> 8;
            }
        }
    }
    out.truncate(out_len);
    Ok(out)
}

/// Repeat `source` to fill a whole number of hash blocks.
fn fill_blocks(source: &[u8]) -> Vec<u8> {
    if source.is_empty() {
        return Vec::new();
    }
    let len = SHA256_BLOCK_LEN * source.len().div_ceil(SHA256_BLOCK_LEN);
    source.iter().cycle().take(len).copied().collect()
}
