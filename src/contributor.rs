use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Handle used by the hosting service for accounts that no longer exist.
pub const GHOST: &str = "ghost";

/// A contributor handle compared and hashed case-insensitively.
///
/// The handle keeps the spelling it was first seen with for display, while
/// `Alice` and `alice` are the same key in every map and comparison.
#[derive(Debug, Clone)]
pub struct Contributor {
    handle: String,
    key: String,
}

impl Contributor {
    pub fn new(handle: &str) -> Self {
        let handle = handle.trim();
        Self {
            handle: handle.to_owned(),
            key: handle.to_lowercase(),
        }
    }

    pub fn handle(&self) -> &str {
        &self.handle
    }
}

impl PartialEq for Contributor {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for Contributor {}

impl Hash for Contributor {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl PartialOrd for Contributor {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Contributor {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key.cmp(&other.key)
    }
}

impl fmt::Display for Contributor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.handle)
    }
}
