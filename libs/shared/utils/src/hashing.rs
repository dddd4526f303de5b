use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Canonical form of a contact string before hashing.
pub fn normalize_contact(contact: &str) -> String {
    contact.trim().to_lowercase()
}

/// One-way keyed hash of a patient contact, hex encoded.
///
/// Returns `None` only when the key is empty; HMAC accepts keys of any
/// other length.
pub fn contact_hash(secret: &str, contact: &str) -> Option<String> {
    if secret.is_empty() {
        return None;
    }

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(normalize_contact(contact).as_bytes());
    Some(hex::encode(mac.finalize().into_bytes()))
}
