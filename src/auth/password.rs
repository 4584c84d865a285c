use pbkdf2::pbkdf2_hmac;
use rand::{rngs::OsRng, RngCore};
use sha2::Sha512;

const SALT_BYTES: usize = 16;
const DIGEST_BYTES: usize = 64;
// 1000 rounds matches the digests already in the user table; raising it
// would invalidate every stored credential.
const ROUNDS: u32 = 1_000;

/// Derives a fresh hex salt and the digest for `password` under it.
pub fn hash(password: &str) -> (String, String) {
    let mut salt = [0u8; SALT_BYTES];
    OsRng.fill_bytes(&mut salt);
    let salt = hex::encode(salt);
    let digest = hash_with_salt(password, &salt);
    (salt, digest)
}

/// PBKDF2-HMAC-SHA512 over the UTF-8 password bytes. The hex salt string
/// itself (not its decoded bytes) is the derivation salt.
pub fn hash_with_salt(password: &str, salt: &str) -> String {
    let mut digest = [0u8; DIGEST_BYTES];
    pbkdf2_hmac::<Sha512>(password.as_bytes(), salt.as_bytes(), ROUNDS, &mut digest);
    hex::encode(digest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_with_salt_is_deterministic() {
        let a = hash_with_salt("pw1", "00112233445566778899aabbccddeeff");
        let b = hash_with_salt("pw1", "00112233445566778899aabbccddeeff");
        assert_eq!(a, b);
    }

    #[test]
    fn hash_produces_fixed_length_hex() {
        let (salt, digest) = hash("pw1");
        assert_eq!(salt.len(), 32);
        assert_eq!(digest.len(), 128);
        assert!(salt.chars().all(|c| c.is_ascii_hexdigit()));
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn hash_roundtrips_through_hash_with_salt() {
        let (salt, digest) = hash("correct-horse-battery-staple");
        assert_eq!(hash_with_salt("correct-horse-battery-staple", &salt), digest);
    }

    #[test]
    fn single_character_change_alters_digest() {
        let (salt, digest) = hash("pw1");
        assert_ne!(hash_with_salt("pw2", &salt), digest);
    }

    #[test]
    fn fresh_salts_differ() {
        let (salt_a, _) = hash("pw1");
        let (salt_b, _) = hash("pw1");
        assert_ne!(salt_a, salt_b);
    }
}
