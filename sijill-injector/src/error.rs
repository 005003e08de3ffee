//! Error types for injector operations.
//!
//! Build-time failures carry the offending provider description.
//! Resolution failures carry the token path from the original request
//! down to the failing token, e.g. `StaticInjectorError[B -> A]`.

use std::fmt;

use sijill_support::rendering::{Context, format_error};

use crate::token::Token;

/// Name every rendered injector error starts with.
pub const ERROR_NAME: &str = "StaticInjectorError";

/// Boxed error returned by factories and class constructors.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Main error type for all injector operations.
#[derive(Debug, thiserror::Error)]
pub enum InjectorError {
    /// A provider description has no recognizable recipe.
    #[error("{}", .0)]
    InvalidProvider(ProviderError),

    /// A factory or class recipe was given without `deps`.
    #[error("{}", .0)]
    MissingDeps(ProviderError),

    /// The same token was registered both as multi and non-multi.
    #[error("{}", .0)]
    MixedMultiProvider(ProviderError),

    /// A token was registered twice while overrides are disabled.
    #[error("{}", .0)]
    AlreadyRegistered(ProviderError),

    /// An empty token was used as a key.
    #[error("{}", format_error(ERROR_NAME, None, Context::Text(.token), "Token must be defined!"))]
    InvalidToken { token: String },

    /// No scope in the chain provides the token.
    #[error("{}", .0)]
    NoProvider(ResolutionError),

    /// Resolving a token re-entered itself.
    #[error("{}", .0)]
    CircularDependency(ResolutionError),

    /// A factory or class constructor returned an error.
    #[error(transparent)]
    ConstructionFailed(ResolutionError),

    /// The resolved value is not of the requested type.
    #[error("{}", .0)]
    TypeMismatch(ResolutionError),
}

impl InjectorError {
    pub(crate) fn invalid_provider(reason: impl Into<String>, description: Description) -> Self {
        InjectorError::InvalidProvider(ProviderError::new(reason, description))
    }

    pub(crate) fn missing_deps(description: Description) -> Self {
        InjectorError::MissingDeps(ProviderError::new("'deps' required", description))
    }

    pub(crate) fn mixed_multi(description: Description) -> Self {
        InjectorError::MixedMultiProvider(ProviderError::new(
            "Cannot mix multi providers and regular providers",
            description,
        ))
    }

    pub(crate) fn already_registered(description: Description) -> Self {
        InjectorError::AlreadyRegistered(ProviderError::new(
            "Token is already registered and overrides are disabled",
            description,
        ))
    }

    pub(crate) fn no_provider(token: &Token) -> Self {
        InjectorError::NoProvider(ResolutionError::new(
            format!("NullInjectorError: No provider for {token}!"),
            vec![token.clone()],
        ))
    }

    pub(crate) fn circular() -> Self {
        InjectorError::CircularDependency(ResolutionError::new("Circular dependency", Vec::new()))
    }

    pub(crate) fn construction(token: &Token, cause: BoxError) -> Self {
        let mut err = ResolutionError::new(format!("Failed to construct {token}: {cause}"), Vec::new());
        err.cause = Some(cause);
        InjectorError::ConstructionFailed(err)
    }

    pub(crate) fn type_mismatch(token: &Token, expected: &'static str) -> Self {
        InjectorError::TypeMismatch(ResolutionError::new(
            format!("Type mismatch: {token} does not resolve to {expected}"),
            vec![token.clone()],
        ))
    }

    /// The token path of a resolution failure, outermost request first.
    ///
    /// Empty for build-time errors.
    pub fn path(&self) -> &[Token] {
        self.resolution().map(|e| e.path.as_slice()).unwrap_or(&[])
    }

    /// The resolution details, for resolution-time errors.
    pub fn resolution(&self) -> Option<&ResolutionError> {
        match self {
            InjectorError::NoProvider(e)
            | InjectorError::CircularDependency(e)
            | InjectorError::ConstructionFailed(e)
            | InjectorError::TypeMismatch(e) => Some(e),
            _ => None,
        }
    }

    /// The offending description, for build-time errors.
    pub fn provider(&self) -> Option<&ProviderError> {
        match self {
            InjectorError::InvalidProvider(e)
            | InjectorError::MissingDeps(e)
            | InjectorError::MixedMultiProvider(e)
            | InjectorError::AlreadyRegistered(e) => Some(e),
            _ => None,
        }
    }

    fn resolution_mut(&mut self) -> Option<&mut ResolutionError> {
        match self {
            InjectorError::NoProvider(e)
            | InjectorError::CircularDependency(e)
            | InjectorError::ConstructionFailed(e)
            | InjectorError::TypeMismatch(e) => Some(e),
            _ => None,
        }
    }

    /// Prepends the token of the frame the error is propagating through.
    pub(crate) fn within(mut self, token: &Token) -> Self {
        if let Some(e) = self.resolution_mut() {
            e.path.insert(0, token.clone());
        }
        self
    }

    /// Stamps the error with the scope it surfaced at.
    pub(crate) fn at_boundary(mut self, source: Option<&str>, suggestions: Vec<String>) -> Self {
        if let Some(e) = self.resolution_mut() {
            if e.source_name.is_none() {
                e.source_name = source.map(str::to_string);
            }
            if e.suggestions.is_empty() {
                e.suggestions = suggestions;
            }
        }
        self
    }
}

/// A provider description rendered as `(key, value)` pairs.
pub type Description = Vec<(&'static str, String)>;

/// Build-time error about one provider description.
#[derive(Debug)]
pub struct ProviderError {
    /// Why the description was rejected
    pub reason: String,
    /// The offending description
    pub description: Description,
}

impl ProviderError {
    fn new(reason: impl Into<String>, description: Description) -> Self {
        Self {
            reason: reason.into(),
            description,
        }
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            format_error(ERROR_NAME, None, Context::Fields(&self.description), &self.reason)
        )
    }
}

/// Resolution-time error with the token path that led to it.
#[derive(Debug)]
pub struct ResolutionError {
    /// Why resolution failed
    pub reason: String,
    path: Vec<Token>,
    source_name: Option<String>,
    suggestions: Vec<String>,
    cause: Option<BoxError>,
}

impl ResolutionError {
    fn new(reason: impl Into<String>, path: Vec<Token>) -> Self {
        Self {
            reason: reason.into(),
            path,
            source_name: None,
            suggestions: Vec::new(),
            cause: None,
        }
    }

    /// Tokens from the original request down to the failing one.
    pub fn path(&self) -> &[Token] {
        &self.path
    }

    /// Name of the scope the error surfaced at, if it has one.
    pub fn source_name(&self) -> Option<&str> {
        self.source_name.as_deref()
    }

    /// Registered tokens that look like the missing one.
    pub fn suggestions(&self) -> &[String] {
        &self.suggestions
    }
}

impl fmt::Display for ResolutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let chain: Vec<String> = self.path.iter().map(Token::to_string).collect();
        let mut reason = self.reason.clone();
        if !self.suggestions.is_empty() {
            reason.push_str(&format!(" Did you mean: {}?", self.suggestions.join(", ")));
        }
        write!(
            f,
            "{}",
            format_error(ERROR_NAME, self.source_name.as_deref(), Context::Chain(&chain), &reason)
        )
    }
}

impl std::error::Error for ResolutionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

/// Convenient Result type for injector operations.
pub type Result<T, E = InjectorError> = std::result::Result<T, E>;
