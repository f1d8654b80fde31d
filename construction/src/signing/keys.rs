//! # Key Roles & the Ed25519 Keyring
//!
//! A Cardano transaction can need witnesses from up to three keys:
//!
//! - **payment** — spends the inputs.
//! - **stake** — authorises stake certificates and reward withdrawals.
//! - **pool cold** — authorises pool registration, update, retirement and
//!   pool governance votes.
//!
//! The [`Signer`] trait is the capability the pipeline signs through: one
//! operation per role, each taking the bytes to sign and returning the
//! signature as hex. [`Keyring`] is the in-process implementation backed by
//! `ed25519-dalek`. Key bytes are never logged.

use std::fmt;

use ed25519_dalek::{Signer as _, SigningKey};
use rand::rngs::OsRng;
use thiserror::Error;

use crate::config::SECRET_KEY_LENGTH;

/// Failures of a [`Signer`].
#[derive(Debug, Error)]
pub enum SigningError {
    #[error("no {0} key is loaded")]
    MissingKey(KeyRole),

    #[error("invalid {0} secret key: expected 32 bytes of hex")]
    InvalidSecretKey(KeyRole),

    #[error("payload bytes are not valid hex: {0}")]
    InvalidPayload(String),
}

// ---------------------------------------------------------------------------
// KeyRole
// ---------------------------------------------------------------------------

/// Which key a payload must be signed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum KeyRole {
    Payment,
    Stake,
    PoolCold,
}

impl fmt::Display for KeyRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Payment => write!(f, "payment"),
            Self::Stake => write!(f, "stake"),
            Self::PoolCold => write!(f, "pool-cold"),
        }
    }
}

impl std::str::FromStr for KeyRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "payment" => Ok(Self::Payment),
            "stake" => Ok(Self::Stake),
            "pool-cold" | "pool" => Ok(Self::PoolCold),
            other => Err(format!("unknown key role '{other}'")),
        }
    }
}

// ---------------------------------------------------------------------------
// Signer
// ---------------------------------------------------------------------------

/// Raw ed25519 signing, one entry point per key role.
pub trait Signer {
    fn sign_with_payment(&self, message: &[u8]) -> Result<String, SigningError>;
    fn sign_with_stake(&self, message: &[u8]) -> Result<String, SigningError>;
    fn sign_with_pool_cold(&self, message: &[u8]) -> Result<String, SigningError>;

    /// Hex public key of `role`, attached to every signature it produces.
    fn public_key_hex(&self, role: KeyRole) -> Result<String, SigningError>;

    /// Dispatches to the per-role entry point.
    fn sign_with(&self, role: KeyRole, message: &[u8]) -> Result<String, SigningError> {
        match role {
            KeyRole::Payment => self.sign_with_payment(message),
            KeyRole::Stake => self.sign_with_stake(message),
            KeyRole::PoolCold => self.sign_with_pool_cold(message),
        }
    }

    fn has_role(&self, role: KeyRole) -> bool {
        self.public_key_hex(role).is_ok()
    }
}

// ---------------------------------------------------------------------------
// Keyring
// ---------------------------------------------------------------------------

/// Up to one ed25519 signing key per role.
///
/// Intentionally not `Clone` and its `Debug` output shows public keys only.
#[derive(Default)]
pub struct Keyring {
    payment: Option<SigningKey>,
    stake: Option<SigningKey>,
    pool_cold: Option<SigningKey>,
}

impl Keyring {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads `role` from a hex-encoded 32-byte seed.
    pub fn with_hex(mut self, role: KeyRole, secret_hex: &str) -> Result<Self, SigningError> {
        let bytes = hex::decode(secret_hex.trim()).map_err(|_| SigningError::InvalidSecretKey(role))?;
        let seed: [u8; SECRET_KEY_LENGTH] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| SigningError::InvalidSecretKey(role))?;
        *self.slot_mut(role) = Some(SigningKey::from_bytes(&seed));
        Ok(self)
    }

    /// Loads `role` with a fresh random key. Handy for tests and devnets.
    pub fn with_generated(mut self, role: KeyRole) -> Self {
        *self.slot_mut(role) = Some(SigningKey::generate(&mut OsRng));
        self
    }

    pub fn roles(&self) -> Vec<KeyRole> {
        [KeyRole::Payment, KeyRole::Stake, KeyRole::PoolCold]
            .into_iter()
            .filter(|role| self.slot(*role).is_some())
            .collect()
    }

    fn slot(&self, role: KeyRole) -> &Option<SigningKey> {
        match role {
            KeyRole::Payment => &self.payment,
            KeyRole::Stake => &self.stake,
            KeyRole::PoolCold => &self.pool_cold,
        }
    }

    fn slot_mut(&mut self, role: KeyRole) -> &mut Option<SigningKey> {
        match role {
            KeyRole::Payment => &mut self.payment,
            KeyRole::Stake => &mut self.stake,
            KeyRole::PoolCold => &mut self.pool_cold,
        }
    }

    fn key(&self, role: KeyRole) -> Result<&SigningKey, SigningError> {
        self.slot(role).as_ref().ok_or(SigningError::MissingKey(role))
    }

    fn sign_role(&self, role: KeyRole, message: &[u8]) -> Result<String, SigningError> {
        let signature = self.key(role)?.sign(message);
        Ok(hex::encode(signature.to_bytes()))
    }
}

impl Signer for Keyring {
    fn sign_with_payment(&self, message: &[u8]) -> Result<String, SigningError> {
        self.sign_role(KeyRole::Payment, message)
    }

    fn sign_with_stake(&self, message: &[u8]) -> Result<String, SigningError> {
        self.sign_role(KeyRole::Stake, message)
    }

    fn sign_with_pool_cold(&self, message: &[u8]) -> Result<String, SigningError> {
        self.sign_role(KeyRole::PoolCold, message)
    }

    fn public_key_hex(&self, role: KeyRole) -> Result<String, SigningError> {
        Ok(hex::encode(self.key(role)?.verifying_key().to_bytes()))
    }
}

impl fmt::Debug for Keyring {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let public = |role| self.public_key_hex(role).ok();
        f.debug_struct("Keyring")
            .field("payment", &public(KeyRole::Payment))
            .field("stake", &public(KeyRole::Stake))
            .field("pool_cold", &public(KeyRole::PoolCold))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::{Signature, Verifier, VerifyingKey};

    const SEED: &str = "9d61b19deffd5a60ba844af492ec2cc44449c5697b326919703bac031cae7f60";
    // RFC 8032 test vector 1.
    const SEED_PUBLIC: &str = "d75a980182b10ab7d54bfed3c964073a0ee172f3daa62325af021a68f707511a";

    #[test]
    fn hex_seed_derives_expected_public_key() {
        let ring = Keyring::new().with_hex(KeyRole::Payment, SEED).unwrap();
        assert_eq!(ring.public_key_hex(KeyRole::Payment).unwrap(), SEED_PUBLIC);
    }

    #[test]
    fn signatures_verify_under_role_key() {
        let ring = Keyring::new()
            .with_generated(KeyRole::Payment)
            .with_generated(KeyRole::Stake);
        let msg = b"tx body hash";
        let sig_hex = ring.sign_with(KeyRole::Stake, msg).unwrap();

        let pk_bytes: [u8; 32] = hex::decode(ring.public_key_hex(KeyRole::Stake).unwrap())
            .unwrap()
            .try_into()
            .unwrap();
        let sig_bytes: [u8; 64] = hex::decode(sig_hex).unwrap().try_into().unwrap();
        let vk = VerifyingKey::from_bytes(&pk_bytes).unwrap();
        assert!(vk.verify(msg, &Signature::from_bytes(&sig_bytes)).is_ok());
    }

    #[test]
    fn missing_role_is_reported() {
        let ring = Keyring::new().with_generated(KeyRole::Payment);
        assert!(matches!(
            ring.sign_with_pool_cold(b"x"),
            Err(SigningError::MissingKey(KeyRole::PoolCold))
        ));
        assert_eq!(ring.roles(), vec![KeyRole::Payment]);
        assert!(!ring.has_role(KeyRole::Stake));
    }

    #[test]
    fn short_seed_is_rejected() {
        assert!(matches!(
            Keyring::new().with_hex(KeyRole::Stake, "abcd"),
            Err(SigningError::InvalidSecretKey(KeyRole::Stake))
        ));
    }

    #[test]
    fn debug_output_hides_secret_material() {
        let ring = Keyring::new().with_hex(KeyRole::Payment, SEED).unwrap();
        let rendered = format!("{ring:?}");
        assert!(rendered.contains(SEED_PUBLIC));
        assert!(!rendered.contains(SEED));
    }

    #[test]
    fn key_role_parses_cli_spellings() {
        assert_eq!("pool_cold".parse::<KeyRole>().unwrap(), KeyRole::PoolCold);
        assert_eq!("Payment".parse::<KeyRole>().unwrap(), KeyRole::Payment);
        assert!("vrf".parse::<KeyRole>().is_err());
    }
}
