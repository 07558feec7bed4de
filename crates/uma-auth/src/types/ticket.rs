//! The ticket: persistent state of one negotiation.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::types::claims::{ClaimSet, Requirements};
use crate::types::outcome::Outcome;
use crate::types::permission::Permission;

/// State of an in-progress negotiation.
///
/// `required` holds *alternatives*: the ticket resolves as soon as any one
/// of them is empty. `provided` only grows across rounds.
#[derive(Debug, Clone, Default)]
pub struct Ticket {
    /// The requested permissions.
    pub permissions: Vec<Permission>,

    /// Alternative requirement sets, logically OR'd.
    pub required: Vec<Requirements>,

    /// Claims accumulated so far.
    pub provided: ClaimSet,

    /// Resource ids of synthetic derivation permissions in `permissions`.
    pub derived_ids: BTreeSet<String>,

    /// Internal resource id to the synthetic id the client used for it.
    pub aliases: BTreeMap<String, String>,
}

impl Ticket {
    /// Creates a ticket for `permissions` with the given alternatives.
    #[must_use]
    pub fn new(permissions: Vec<Permission>, required: Vec<Requirements>) -> Self {
        Self {
            permissions,
            required,
            ..Default::default()
        }
    }

    /// Returns `true` if at least one alternative is fully satisfied.
    #[must_use]
    pub fn is_satisfied(&self) -> bool {
        self.required.iter().any(Requirements::is_solved)
    }

    /// Merges `claims` into `provided`.
    pub fn provide(&mut self, claims: &ClaimSet) {
        for (claim_type, value) in claims {
            self.provided.insert(claim_type.clone(), value.clone());
        }
    }

    /// Claim types each alternative still misses.
    #[must_use]
    pub fn outstanding_claim_types(&self) -> Vec<Vec<String>> {
        self.required.iter().map(Requirements::claim_types).collect()
    }

    /// Permissions that refer to real resources (no derivation entries).
    #[must_use]
    pub fn resource_permissions(&self) -> Vec<Permission> {
        self.permissions
            .iter()
            .filter(|p| !self.derived_ids.contains(&p.resource_id))
            .cloned()
            .collect()
    }
}

/// Something that still stands between a ticket and a token.
#[derive(Debug, Clone)]
pub enum MissingClaims {
    /// An alternative requirement set that is not yet satisfied.
    Alternative(Requirements),
    /// An upstream access token proving derivation access.
    Derivation(DerivationClaim),
}

impl MissingClaims {
    /// Returns the derivation descriptor, if this is one.
    #[must_use]
    pub fn as_derivation(&self) -> Option<&DerivationClaim> {
        match self {
            Self::Derivation(claim) => Some(claim),
            Self::Alternative(_) => None,
        }
    }
}

/// Description of an upstream access token that proves derivation access.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivationClaim {
    /// Format of the claim token to present.
    pub claim_token_format: String,
    /// Authorization server that can issue the token.
    pub issuer: String,
    /// Synthetic resource id to request at `issuer`.
    pub derivation_resource_id: String,
    /// Scopes to request on `derivation_resource_id`.
    pub resource_scopes: Vec<String>,
}

/// Result of trying to resolve a ticket.
pub type Resolution = Outcome<Vec<Permission>, Vec<MissingClaims>>;
