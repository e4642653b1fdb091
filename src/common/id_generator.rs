// src/common/id_generator.rs
//! Crockford Base32 ID Generator
//!
//! Generates human-readable, prefixed IDs using Crockford Base32 encoding.
//! Format: PREFIX_XXXXXXXX (e.g., U_K7NP3XQ2 for users)
//!
//! The alphabet excludes I, L, O and U, so IDs are case-insensitive and
//! easy to read back over the phone.

use rand::Rng;

/// Crockford Base32 alphabet (excludes I, L, O, U to avoid confusion)
const CROCKFORD_ALPHABET: &[u8; 32] = b"0123456789ABCDEFGHJKMNPQRSTVWXYZ";

/// Random characters after the prefix; 32^8 ≈ 1.1e12 per entity type
const ID_LENGTH: usize = 8;

/// Entity type prefixes for ID generation
#[derive(Debug, Clone, Copy)]
pub enum EntityPrefix {
    /// User (U_)
    User,
    /// Workshop (W_)
    Workshop,
    /// Trainer profile (T_), only minted by test fixtures
    #[cfg(test)]
    TrainerProfile,
}

impl EntityPrefix {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityPrefix::User => "U",
            EntityPrefix::Workshop => "W",
            #[cfg(test)]
            EntityPrefix::TrainerProfile => "T",
        }
    }
}

fn generate_crockford_string(length: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| {
            let idx = rng.gen_range(0..32);
            CROCKFORD_ALPHABET[idx] as char
        })
        .collect()
}

/// Generate a prefixed ID, e.g. `generate_id(EntityPrefix::User)` → "U_8MWQT2K9"
pub fn generate_id(prefix: EntityPrefix) -> String {
    format!("{}_{}", prefix.as_str(), generate_crockford_string(ID_LENGTH))
}

/// Generate a User ID (U_XXXXXXXX)
pub fn generate_user_id() -> String {
    generate_id(EntityPrefix::User)
}

/// Generate a Workshop ID (W_XXXXXXXX)
pub fn generate_workshop_id() -> String {
    generate_id(EntityPrefix::Workshop)
}

/// Generate a Trainer Profile ID (T_XXXXXXXX)
#[cfg(test)]
pub fn generate_trainer_profile_id() -> String {
    generate_id(EntityPrefix::TrainerProfile)
}
