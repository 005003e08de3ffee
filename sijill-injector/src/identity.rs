//! Token identity assignment.
//!
//! Maps every [`Token`] to a [`TokenKey`] usable as a registry key.
//! Type tokens get a process-wide unique number on first sight and opaque
//! tokens draw one from the same counter when they are created. Value-like
//! tokens derive their key from their value, so equal values of the same
//! kind share one key.
//!
//! The assigner owns its identity map. Tokens are never mutated.

use std::any::TypeId;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use once_cell::sync::Lazy;
use tracing::trace;

use crate::error::{InjectorError, Result};
use crate::token::Token;

/// The key a token is stored under.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TokenKey {
    /// Assigned to reference-like tokens and private multi slots.
    Ref(u64),
    /// Derived from a string token.
    Str(Arc<str>),
    /// Derived from an integer token.
    Int(i64),
}

static ASSIGNER: Lazy<IdentityAssigner> = Lazy::new(IdentityAssigner::new);

/// Hands out keys for reference-like tokens.
///
/// The counter starts at zero and is never reset.
struct IdentityAssigner {
    next: AtomicU64,
    types: DashMap<TypeId, u64>,
}

impl IdentityAssigner {
    fn new() -> Self {
        Self {
            next: AtomicU64::new(0),
            types: DashMap::new(),
        }
    }

    fn fresh(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }

    fn key_of(&self, token: &Token) -> Result<TokenKey> {
        match token {
            Token::Type(t) => {
                let id = *self
                    .types
                    .entry(t.type_id())
                    .or_insert_with(|| self.fresh());
                Ok(TokenKey::Ref(id))
            }
            Token::Opaque(t) => Ok(TokenKey::Ref(t.id())),
            Token::Str(s) if s.is_empty() => Err(InjectorError::InvalidToken {
                token: token.literal(),
            }),
            Token::Str(s) => Ok(TokenKey::Str(s.clone())),
            Token::Int(n) => Ok(TokenKey::Int(*n)),
            Token::Forward(_) => {
                let target = token.resolve_forward();
                trace!(token = %target, "Dereferenced forward token");
                self.key_of(&target)
            }
        }
    }
}

/// Returns the registry key of `token`.
///
/// Stable across calls and across injectors for the same token.
///
/// # Errors
/// [`InjectorError::InvalidToken`] for an empty string token.
pub fn key_of(token: &Token) -> Result<TokenKey> {
    ASSIGNER.key_of(token)
}

/// Allocates a key no token will ever map to.
pub(crate) fn fresh_key() -> TokenKey {
    TokenKey::Ref(fresh_id())
}

/// Allocates the next reference identity. Opaque tokens take theirs at
/// construction, so nothing is stored for them here.
pub(crate) fn fresh_id() -> u64 {
    ASSIGNER.fresh()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::{OpaqueToken, forward_ref};

    struct Database;
    struct Cache;

    #[test]
    fn type_keys_are_stable() {
        let a = key_of(&Token::of::<Database>()).unwrap();
        let b = key_of(&Token::of::<Database>()).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, key_of(&Token::of::<Cache>()).unwrap());
    }

    #[test]
    fn opaque_keys_follow_identity() {
        let token = OpaqueToken::new("CONFIG");
        let twin = OpaqueToken::new("CONFIG");
        let a = key_of(&Token::from(&token)).unwrap();
        assert_eq!(a, key_of(&Token::from(token.clone())).unwrap());
        assert_ne!(a, key_of(&Token::from(twin)).unwrap());
    }

    #[test]
    fn dropped_opaque_tokens_never_share_keys() {
        let first = key_of(&Token::opaque("tmp")).unwrap();
        let second = key_of(&Token::opaque("tmp")).unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn opaque_key_is_fixed_at_creation() {
        let token = OpaqueToken::new("CONFIG");
        let key = key_of(&Token::from(&token)).unwrap();
        assert_eq!(key, TokenKey::Ref(token.id()));
        assert_ne!(key, fresh_key());
    }

    #[test]
    fn value_keys_derive_from_value() {
        assert_eq!(
            key_of(&Token::from("A")).unwrap(),
            TokenKey::Str(Arc::from("A"))
        );
        assert_eq!(key_of(&Token::from(0i64)).unwrap(), TokenKey::Int(0));
        assert_ne!(
            key_of(&Token::from("1")).unwrap(),
            key_of(&Token::from(1i64)).unwrap()
        );
    }

    #[test]
    fn empty_string_is_rejected() {
        let err = key_of(&Token::from("")).unwrap_err();
        assert!(matches!(err, InjectorError::InvalidToken { .. }));
        assert_eq!(
            err.to_string(),
            "StaticInjectorError[\"\"]: Token must be defined!"
        );
    }

    #[test]
    fn forward_ref_shares_target_key() {
        let forward = forward_ref(|| Token::of::<Database>());
        assert_eq!(
            key_of(&forward).unwrap(),
            key_of(&Token::of::<Database>()).unwrap()
        );
    }

    #[test]
    fn fresh_keys_are_unique() {
        assert_ne!(fresh_key(), fresh_key());
    }
}
