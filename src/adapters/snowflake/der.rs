//! Minimal DER writers for the two RSA key wrappers key-pair authentication needs.

const TAG_INTEGER: u8 = 0x02;
const TAG_BIT_STRING: u8 = 0x03;
const TAG_OCTET_STRING: u8 = 0x04;
const TAG_SEQUENCE: u8 = 0x30;

/// `AlgorithmIdentifier { rsaEncryption (1.2.840.113549.1.1.1), NULL }`
const RSA_ENCRYPTION_ALGORITHM: &[u8] = &[
    0x30, 0x0d, 0x06, 0x09, 0x2a, 0x86, 0x48, 0x86, 0xf7, 0x0d, 0x01, 0x01, 0x01, 0x05, 0x00,
];

/// Wraps a PKCS#1 `RSAPrivateKey` into an unencrypted PKCS#8 `PrivateKeyInfo`.
pub fn pkcs1_to_pkcs8(rsa_private_key: &[u8]) -> Vec<u8> {
    let mut body = tlv(TAG_INTEGER, &[0x00]);
    body.extend_from_slice(RSA_ENCRYPTION_ALGORITHM);
    body.extend(tlv(TAG_OCTET_STRING, rsa_private_key));
    tlv(TAG_SEQUENCE, &body)
}

/// Wraps a PKCS#1 `RSAPublicKey` into a `SubjectPublicKeyInfo`.
pub fn rsa_public_key_to_spki(rsa_public_key: &[u8]) -> Vec<u8> {
    let mut bits = Vec::with_capacity(rsa_public_key.len() + 1);
    bits.push(0x00); // no unused bits
    bits.extend_from_slice(rsa_public_key);

    let mut body = RSA_ENCRYPTION_ALGORITHM.to_vec();
    body.extend(tlv(TAG_BIT_STRING, &bits));
    tlv(TAG_SEQUENCE, &body)
}

fn tlv(tag: u8, contents: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(contents.len() + 6);
    out.push(tag);
    encode_length(contents.len(), &mut out);
    out.extend_from_slice(contents);
    out
}

fn encode_length(len: usize, out: &mut Vec<u8>) {
    if len < 0x80 {
        out.push(len as u8);
        return;
    }
    let bytes = len.to_be_bytes();
    let skip = bytes.iter().take_while(|b| **b == 0).count();
    out.push(0x80 | (bytes.len() - skip) as u8);
    out.extend_from_slice(&bytes[skip..]);
}
