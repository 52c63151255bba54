//! PIN credentials, admin privileges and SSH key identity.

pub mod admin;
pub mod pin;
pub mod ssh_keys;

pub use admin::AdminStore;
pub use pin::{hash_pin, is_valid_pin, verify_pin, ALLOWED_PIN_ATTEMPTS};
pub use ssh_keys::SshKeyStore;
