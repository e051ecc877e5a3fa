//! Slug storage and random slug generation

use parking_lot::RwLock;
use rand::rngs::OsRng;
use rand::RngCore;
use thiserror::Error;

/// Length of server-generated slugs.
pub const GENERATED_SLUG_LEN: usize = 20;

const SLUG_ALPHABET: &[u8; 36] = b"abcdefghijklmnopqrstuvwxyz0123456789";

// Largest multiple of the alphabet size that fits in a byte. Bytes at or
// above this are rejected so the draw stays uniform.
const REJECTION_LIMIT: u8 = 252;

#[derive(Debug, Error)]
pub enum SlugError {
    #[error("system entropy source failed: {0}")]
    Entropy(#[from] rand::Error),
}

/// The single slug belonging to one session.
///
/// Reads happen on every dashboard redraw and front-door lookup; writes
/// happen once on allocation and at most once more on a rename.
#[derive(Debug, Default)]
pub struct SlugHolder {
    value: RwLock<String>,
}

impl SlugHolder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> String {
        self.value.read().clone()
    }

    pub fn set(&self, slug: impl Into<String>) {
        *self.value.write() = slug.into();
    }
}

/// Generate `len` characters drawn uniformly from `[a-z0-9]` using the
/// operating system's entropy source.
pub fn random_string(len: usize) -> Result<String, SlugError> {
    let mut out = String::with_capacity(len);
    let mut block = [0u8; 64];

    while out.len() < len {
        OsRng.try_fill_bytes(&mut block)?;
        for &byte in block.iter() {
            if byte >= REJECTION_LIMIT {
                continue;
            }
            out.push(SLUG_ALPHABET[(byte % SLUG_ALPHABET.len() as u8) as usize] as char);
            if out.len() == len {
                break;
            }
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_string_length_and_charset() {
        let slug = random_string(GENERATED_SLUG_LEN).unwrap();
        assert_eq!(slug.len(), GENERATED_SLUG_LEN);
        assert!(slug
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit()));
    }

    #[test]
    fn test_random_string_empty() {
        assert_eq!(random_string(0).unwrap(), "");
    }

    #[test]
    fn test_random_string_distinct() {
        // 36^20 values; a collision here means the generator is broken
        let a = random_string(GENERATED_SLUG_LEN).unwrap();
        let b = random_string(GENERATED_SLUG_LEN).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_generated_slugs_are_well_formed() {
        for _ in 0..32 {
            let slug = random_string(GENERATED_SLUG_LEN).unwrap();
            assert!(crate::policy::slug_well_formed(&slug));
        }
    }

    #[test]
    fn test_slug_holder_get_set() {
        let holder = SlugHolder::new();
        assert_eq!(holder.get(), "");

        holder.set("abc123");
        assert_eq!(holder.get(), "abc123");

        holder.set("renamed");
        assert_eq!(holder.get(), "renamed");
    }
}
