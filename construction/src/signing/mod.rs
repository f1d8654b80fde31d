//! # Signing
//!
//! Two layers:
//!
//! - `keys` — the per-role [`Signer`] capability and the [`Keyring`] that
//!   implements it with ed25519.
//! - `router` — maps gateway payloads to roles and wraps raw signatures in
//!   the structure `/construction/combine` expects.

pub mod keys;
pub mod router;

pub use keys::{KeyRole, Keyring, Signer, SigningError};
pub use router::{KeyAssignment, PayloadSigner, SignatureRouter};
