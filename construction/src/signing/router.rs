//! Routes each signing payload to the key that must sign it.
//!
//! The association is always explicit: by payload position or by the
//! payload's account address. Nothing is keyed on object identity, so a
//! payload list that was cloned, serialized or re-decoded routes the same.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use tracing::debug;

use super::keys::{KeyRole, Signer, SigningError};
use crate::error::{ConstructionError, Result};
use crate::gateway::types::{Signature, SigningPayload};
use crate::operation::types::OperationSet;

// ---------------------------------------------------------------------------
// KeyAssignment
// ---------------------------------------------------------------------------

/// Policy deciding which [`KeyRole`] signs which payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum KeyAssignment {
    /// Payload 0 with the payment key, payload 1 with the stake key. Enough
    /// for transfers and stake certificates; pool transactions need more.
    #[default]
    Default,
    /// Explicit payload-index map.
    ByIndex(BTreeMap<usize, KeyRole>),
    /// Match `account_identifier.address` against known signer addresses.
    ByAddress(HashMap<String, KeyRole>),
}

impl KeyAssignment {
    /// Roles in payload order: the first role signs payload 0, and so on.
    pub fn in_order(roles: impl IntoIterator<Item = KeyRole>) -> Self {
        Self::ByIndex(roles.into_iter().enumerate().collect())
    }

    /// Payload order the gateway emits for a `poolRegistration`.
    pub fn pool_registration() -> Self {
        Self::in_order([KeyRole::Stake, KeyRole::Payment, KeyRole::PoolCold])
    }

    pub fn by_address<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, KeyRole)>,
        S: Into<String>,
    {
        Self::ByAddress(pairs.into_iter().map(|(a, r)| (a.into(), r)).collect())
    }

    pub fn role_for(&self, index: usize, payload: &SigningPayload) -> Option<KeyRole> {
        match self {
            Self::Default => match index {
                0 => Some(KeyRole::Payment),
                1 => Some(KeyRole::Stake),
                _ => None,
            },
            Self::ByIndex(map) => map.get(&index).copied(),
            Self::ByAddress(map) => payload.address().and_then(|a| map.get(a).copied()),
        }
    }
}

// ---------------------------------------------------------------------------
// PayloadSigner
// ---------------------------------------------------------------------------

/// The signing function [`crate::ConstructionPipeline::sign_and_submit`]
/// calls once per payload, in order.
pub trait PayloadSigner {
    fn sign_payload(&self, index: usize, payload: &SigningPayload) -> Result<Signature>;
}

// ---------------------------------------------------------------------------
// SignatureRouter
// ---------------------------------------------------------------------------

/// Produces exactly one [`Signature`] per payload using a [`Signer`].
pub struct SignatureRouter<'a, S: Signer + ?Sized> {
    signer: &'a S,
    assignment: KeyAssignment,
}

fn signing_failure(err: SigningError) -> ConstructionError {
    ConstructionError::transaction(format!("signer failed: {err}"))
}

impl<'a, S: Signer + ?Sized> SignatureRouter<'a, S> {
    pub fn new(signer: &'a S, assignment: KeyAssignment) -> Self {
        Self { signer, assignment }
    }

    pub fn assignment(&self) -> &KeyAssignment {
        &self.assignment
    }

    pub fn role_for(&self, index: usize, payload: &SigningPayload) -> Result<KeyRole> {
        self.assignment.role_for(index, payload).ok_or_else(|| {
            ConstructionError::transaction(format!(
                "no key role is assigned to payload {index} (address {})",
                payload.address().unwrap_or("<none>")
            ))
        })
    }

    /// Signs `payload` with `role` and wraps the result for `/construction/combine`.
    pub fn sign(&self, payload: &SigningPayload, role: KeyRole) -> Result<Signature> {
        let message = hex::decode(&payload.hex_bytes)
            .map_err(|e| signing_failure(SigningError::InvalidPayload(e.to_string())))?;
        let signature_hex = self.signer.sign_with(role, &message).map_err(signing_failure)?;
        let public_key_hex = self.signer.public_key_hex(role).map_err(signing_failure)?;
        debug!(%role, address = payload.address().unwrap_or(""), "payload signed");
        Ok(Signature::ed25519(payload.clone(), public_key_hex, signature_hex))
    }

    pub fn sign_all(&self, payloads: &[SigningPayload]) -> Result<Vec<Signature>> {
        payloads
            .iter()
            .enumerate()
            .map(|(index, payload)| self.sign_payload(index, payload))
            .collect()
    }

    /// Fails before any signature is produced if the signer lacks a role
    /// that some operation in `ops` requires.
    pub fn check_roles(&self, ops: &OperationSet) -> Result<()> {
        let required: BTreeSet<KeyRole> = ops
            .iter()
            .flat_map(|op| op.kind.required_signers().iter().copied())
            .collect();
        let missing: Vec<String> = required
            .into_iter()
            .filter(|role| !self.signer.has_role(*role))
            .map(|role| role.to_string())
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ConstructionError::transaction(format!(
                "signer is missing required key roles: {}",
                missing.join(", ")
            )))
        }
    }
}

impl<S: Signer + ?Sized> PayloadSigner for SignatureRouter<'_, S> {
    fn sign_payload(&self, index: usize, payload: &SigningPayload) -> Result<Signature> {
        let role = self.role_for(index, payload)?;
        self.sign(payload, role)
    }
}
