//! Project skeletons for `init`.
//!
//! [`BuiltinSkeleton`] ships with the binary. [`DirectorySkeleton`] reads a
//! user-supplied tree instead, for teams with their own house layout.

mod builtin;
mod directory;

pub use builtin::BuiltinSkeleton;
pub use directory::DirectorySkeleton;

use uuid::Uuid;

/// 64 hex characters from two v4 UUIDs, for the generated `.env`.
pub fn generate_secret_key() -> String {
    format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
}
