//! ID generation utilities.

use std::sync::{LazyLock, Mutex};

use ulid::{Generator, Ulid};

/// Process-wide monotonic source so IDs minted in the same millisecond still sort.
static GENERATOR: LazyLock<Mutex<Generator>> = LazyLock::new(|| Mutex::new(Generator::new()));

/// ID generator for entities.
///
/// Every row in SocialHub is keyed by a lowercase ULID so that ordering by
/// primary key is ordering by creation time.
#[derive(Debug, Clone, Default)]
pub struct IdGenerator {
    _private: (),
}

impl IdGenerator {
    /// Create a new ID generator.
    #[must_use]
    pub const fn new() -> Self {
        Self { _private: () }
    }

    /// Generate a new ULID-based ID.
    #[must_use]
    pub fn generate(&self) -> String {
        let ulid = GENERATOR
            .lock()
            .ok()
            .and_then(|mut generator| generator.generate().ok())
            .unwrap_or_else(Ulid::new);
        ulid.to_string().to_lowercase()
    }

    /// Check whether a string looks like an ID issued by [`Self::generate`].
    #[must_use]
    pub fn is_valid(&self, id: &str) -> bool {
        id.len() == 26 && Ulid::from_string(id).is_ok()
    }
}
