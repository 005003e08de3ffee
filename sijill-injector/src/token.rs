//! Tokens: the identities injectors are keyed by.
//!
//! A [`Token`] is either reference-like (a Rust type, an [`OpaqueToken`])
//! or value-like (a string or an integer). Two value-like tokens of the
//! same kind and value are the same token; reference-like tokens are
//! compared by identity.
//!
//! # Examples
//! ```
//! use sijill_injector::token::{OpaqueToken, Token};
//!
//! struct Database;
//!
//! let by_type = Token::of::<Database>();
//! let by_name = Token::from("database_url");
//! let config = OpaqueToken::new("APP_CONFIG");
//!
//! assert_eq!(by_name, Token::from("database_url"));
//! assert_ne!(Token::from(config.clone()), Token::from(OpaqueToken::new("APP_CONFIG")));
//! assert_eq!(by_type.to_string(), "Database");
//! ```

use std::any::{TypeId, type_name};
use std::fmt;
use std::sync::Arc;

use sijill_support::rendering::shorten_type_name;

/// An identity used as a registry key.
#[derive(Clone)]
pub enum Token {
    /// A Rust type, the counterpart of a class reference.
    Type(TypeToken),
    /// A unique symbol-like handle.
    Opaque(OpaqueToken),
    /// A string value.
    Str(Arc<str>),
    /// An integer value.
    Int(i64),
    /// A token that is only known once dereferenced.
    Forward(ForwardRef),
}

impl Token {
    /// Creates a token for type `T`.
    #[inline]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Token::Type(TypeToken::of::<T>())
    }

    /// Creates a fresh opaque token.
    ///
    /// Every call yields a distinct token, even for equal descriptions.
    pub fn opaque(description: impl Into<String>) -> Self {
        Token::Opaque(OpaqueToken::new(description))
    }

    /// Dereferences forward references until a concrete token is reached.
    pub fn resolve_forward(&self) -> Token {
        let mut token = self.clone();
        while let Token::Forward(forward) = &token {
            token = forward.deref_token();
        }
        token
    }

    /// Returns `true` for tokens compared by identity.
    pub fn is_reference_like(&self) -> bool {
        match self {
            Token::Type(_) | Token::Opaque(_) => true,
            Token::Str(_) | Token::Int(_) => false,
            Token::Forward(forward) => forward.deref_token().is_reference_like(),
        }
    }

    /// Renders the token as it appears inside a provider description:
    /// string tokens are quoted, everything else is displayed.
    pub fn literal(&self) -> String {
        match self.resolve_forward() {
            Token::Str(s) => format!("{s:?}"),
            other => other.to_string(),
        }
    }
}

impl PartialEq for Token {
    fn eq(&self, other: &Self) -> bool {
        match (self.resolve_forward(), other.resolve_forward()) {
            (Token::Type(a), Token::Type(b)) => a.type_id == b.type_id,
            (Token::Opaque(a), Token::Opaque(b)) => a == b,
            (Token::Str(a), Token::Str(b)) => a == b,
            (Token::Int(a), Token::Int(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Type(t) => write!(f, "{}", shorten_type_name(t.type_name)),
            Token::Opaque(t) => write!(f, "InjectionToken {}", t.description()),
            Token::Str(s) => write!(f, "{s}"),
            Token::Int(n) => write!(f, "{n}"),
            Token::Forward(forward) => write!(f, "{}", forward.deref_token()),
        }
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Type(t) => write!(f, "Token::Type({})", t.type_name),
            Token::Opaque(t) => write!(f, "Token::Opaque({:?})", t.description()),
            Token::Str(s) => write!(f, "Token::Str({s:?})"),
            Token::Int(n) => write!(f, "Token::Int({n})"),
            Token::Forward(_) => write!(f, "Token::Forward(..)"),
        }
    }
}

impl From<TypeToken> for Token {
    fn from(token: TypeToken) -> Self {
        Token::Type(token)
    }
}

impl From<OpaqueToken> for Token {
    fn from(token: OpaqueToken) -> Self {
        Token::Opaque(token)
    }
}

impl From<&OpaqueToken> for Token {
    fn from(token: &OpaqueToken) -> Self {
        Token::Opaque(token.clone())
    }
}

impl From<&str> for Token {
    fn from(s: &str) -> Self {
        Token::Str(Arc::from(s))
    }
}

impl From<String> for Token {
    fn from(s: String) -> Self {
        Token::Str(Arc::from(s))
    }
}

impl From<i64> for Token {
    fn from(n: i64) -> Self {
        Token::Int(n)
    }
}

impl From<&Token> for Token {
    fn from(token: &Token) -> Self {
        token.clone()
    }
}

/// A type used as a token.
#[derive(Clone, Copy)]
pub struct TypeToken {
    type_id: TypeId,
    type_name: &'static str,
}

impl TypeToken {
    /// Creates a type token for `T`.
    #[inline]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: type_name::<T>(),
        }
    }

    /// Returns the [`TypeId`] of this token.
    #[inline]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Returns the fully qualified type name.
    #[inline]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

/// A unique, symbol-like token.
///
/// Clones share identity; two separately created tokens never do,
/// whatever their description.
#[derive(Clone)]
pub struct OpaqueToken {
    inner: Arc<OpaqueInner>,
}

struct OpaqueInner {
    id: u64,
    description: String,
}

impl OpaqueToken {
    /// Creates a new opaque token with a human-readable description.
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(OpaqueInner {
                id: crate::identity::fresh_id(),
                description: description.into(),
            }),
        }
    }

    /// Returns the description given at creation.
    pub fn description(&self) -> &str {
        &self.inner.description
    }

    /// The identity assigned at creation, shared by all clones.
    pub(crate) fn id(&self) -> u64 {
        self.inner.id
    }
}

impl PartialEq for OpaqueToken {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for OpaqueToken {}

impl fmt::Debug for OpaqueToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OpaqueToken({:?})", self.inner.description)
    }
}

/// A lazily dereferenced token.
///
/// Lets a description mention a token that is defined later.
#[derive(Clone)]
pub struct ForwardRef(Arc<dyn Fn() -> Token + Send + Sync>);

impl ForwardRef {
    fn deref_token(&self) -> Token {
        (self.0)()
    }
}

/// Wraps a token-producing closure into a forward reference.
///
/// ```
/// use sijill_injector::token::{forward_ref, Token};
///
/// let forward = forward_ref(|| Token::from("later"));
/// assert_eq!(forward.resolve_forward(), Token::from("later"));
/// ```
pub fn forward_ref(f: impl Fn() -> Token + Send + Sync + 'static) -> Token {
    Token::Forward(ForwardRef(Arc::new(f)))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct MyStruct;

    #[test]
    fn type_token_display_is_short() {
        let token = Token::of::<MyStruct>();
        assert_eq!(token.to_string(), "MyStruct");
        assert!(token.is_reference_like());
    }

    #[test]
    fn value_tokens_compare_by_value() {
        assert_eq!(Token::from("A"), Token::from(String::from("A")));
        assert_eq!(Token::from(7i64), Token::from(7i64));
        assert_ne!(Token::from("7"), Token::from(7i64));
    }

    #[test]
    fn opaque_tokens_compare_by_identity() {
        let a = OpaqueToken::new("CONFIG");
        let b = OpaqueToken::new("CONFIG");
        assert_eq!(Token::from(&a), Token::from(a.clone()));
        assert_ne!(Token::from(a), Token::from(b));
    }

    #[test]
    fn forward_ref_derefs_to_target() {
        let forward = forward_ref(|| Token::of::<MyStruct>());
        assert_eq!(forward, Token::of::<MyStruct>());
        assert_eq!(forward.to_string(), "MyStruct");
        assert!(forward.is_reference_like());
    }

    #[test]
    fn nested_forward_refs_are_dereferenced() {
        let forward = forward_ref(|| forward_ref(|| Token::from("deep")));
        assert!(matches!(forward.resolve_forward(), Token::Str(s) if &*s == "deep"));
    }

    #[test]
    fn literal_quotes_strings_only() {
        assert_eq!(Token::from("A").literal(), "\"A\"");
        assert_eq!(Token::from(3i64).literal(), "3");
        assert_eq!(Token::opaque("X").literal(), "InjectionToken X");
    }

    #[test]
    fn unsized_type_token() {
        trait MyTrait {}
        let token = Token::of::<dyn MyTrait>();
        assert!(token.to_string().contains("MyTrait"));
    }
}
