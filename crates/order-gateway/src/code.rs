//! Order code generation.
//!
//! Codes are the submission timestamp (milliseconds since the epoch) run
//! through hashids over a lowercase alphanumeric alphabet. They are short
//! and URL-safe, and can be decoded back to the timestamp. Within one
//! process the generator never uses the same millisecond twice.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::LazyLock;

use chrono::Utc;
use harsh::Harsh;

use crate::error::GatewayError;

/// Characters order codes are made of.
pub const ORDER_CODE_ALPHABET: &str = "0123456789abcdefghijklmnopqrstuvwxyz";

static UNSALTED: LazyLock<Harsh> =
    LazyLock::new(|| hasher("").expect("order code alphabet is valid"));

fn hasher(salt: &str) -> Result<Harsh, harsh::BuildError> {
    Harsh::builder()
        .salt(salt)
        .alphabet(ORDER_CODE_ALPHABET)
        .build()
}

/// Generates order codes.
#[derive(Debug)]
pub struct OrderCodeGenerator {
    harsh: Harsh,
    last: AtomicU64,
}

impl OrderCodeGenerator {
    /// Create a generator. Codes from generators with different salts differ.
    pub fn new(salt: &str) -> Result<Self, GatewayError> {
        let harsh = hasher(salt)
            .map_err(|e| GatewayError::Configuration(format!("order code salt: {}", e)))?;

        Ok(Self {
            harsh,
            last: AtomicU64::new(0),
        })
    }

    /// Generate a code for the current time.
    pub fn generate(&self) -> String {
        let now = u64::try_from(Utc::now().timestamp_millis()).unwrap_or_default();
        self.generate_at(now)
    }

    /// Generate a code for `millis`, bumped past any millisecond already used.
    pub fn generate_at(&self, millis: u64) -> String {
        let previous = self
            .last
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(millis.max(last.saturating_add(1)))
            })
            .unwrap_or_else(|last| last);
        let stamp = millis.max(previous.saturating_add(1));

        self.encode(stamp)
    }

    /// Encode a timestamp without recording it.
    pub fn encode(&self, millis: u64) -> String {
        self.harsh.encode(&[millis])
    }

    /// Decode a code back to its timestamp.
    ///
    /// Returns `None` for anything this generator could not have produced.
    pub fn decode(&self, code: &str) -> Option<u64> {
        match self.harsh.decode(code.trim()) {
            Ok(values) if values.len() == 1 => Some(values[0]),
            _ => None,
        }
    }
}

impl Default for OrderCodeGenerator {
    /// An unsalted generator.
    fn default() -> Self {
        Self {
            harsh: UNSALTED.clone(),
            last: AtomicU64::new(0),
        }
    }
}
