//! Session-related types.
//!
//! The session stores a single value: the guest id that names the guest's
//! remote cart document. There is no authentication state.

/// Session keys.
pub mod keys {
    /// Key for storing the guest id (names the `carts/{guest_id}` document).
    pub const GUEST_ID: &str = "guest_id";
}
