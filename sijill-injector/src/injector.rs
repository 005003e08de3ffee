//! # Injectors: scopes that resolve tokens
//!
//! A [`StaticInjector`] owns one registry built from provider descriptions
//! and a parent injector to delegate to. Chains of injectors end at the
//! [`NullInjector`], which provides nothing.
//!
//! # Architecture
//! ```text
//! InjectorBuilder ──build()──> StaticInjector ──parent──> ... ──> NullInjector
//!                                    │
//!                              create_child()
//!                                    │
//!                                    ▼
//!                              StaticInjector
//! ```
//!
//! # Examples
//! ```rust
//! use sijill_injector::prelude::*;
//!
//! let root = StaticInjector::builder()
//!     .name("root")
//!     .provider(Provider::new("A").use_value(1i32))
//!     .provider(
//!         Provider::new("B")
//!             .use_factory(|deps| Ok(instance(*deps.get::<i32>(0)? + 1)))
//!             .deps(["A"]),
//!     )
//!     .build()
//!     .expect("Failed to build injector");
//!
//! let b = root.get::<i32>("B").expect("Failed to resolve");
//! assert_eq!(*b, 2);
//! ```

use std::any::{Any, type_name};
use std::fmt;
use std::sync::Arc;

use parking_lot::ReentrantMutex;
use serde::Serialize;
use sijill_support::rendering::suggest_similar;
use tracing::{debug, info, instrument};

use crate::error::{InjectorError, Result};
use crate::instance::Instance;
use crate::provider::{DepFlags, ProviderEntry};
use crate::registry::{Dependency, RecordSnapshot, Registry};
use crate::resolver::Resolver;
use crate::settings::Settings;
use crate::token::Token;

/// The token an injector resolves to itself under.
pub fn injector_token() -> Token {
    Token::of::<StaticInjector>()
}

/// What a lookup does when no scope provides the token.
#[derive(Clone)]
pub enum NotFound {
    /// Fail with [`InjectorError::NoProvider`].
    Throw,
    /// Return this value instead.
    Value(Option<Instance>),
}

impl NotFound {
    /// An optional request never fails for lack of a provider.
    fn under(self, flags: DepFlags) -> Self {
        match self {
            NotFound::Throw if flags.contains(DepFlags::OPTIONAL) => NotFound::Value(None),
            other => other,
        }
    }
}

impl fmt::Debug for NotFound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotFound::Throw => write!(f, "Throw"),
            NotFound::Value(None) => write!(f, "Value(None)"),
            NotFound::Value(Some(_)) => write!(f, "Value(..)"),
        }
    }
}

/// A scope in an injector chain.
pub trait Injector: Send + Sync {
    /// Resolves `token` without formatting failures.
    ///
    /// `flags` restrict where the token may be found; `not_found` decides
    /// what happens when no scope provides it. Use the [`ResolverApi`]
    /// methods unless you are implementing a scope.
    fn lookup(&self, token: &Token, not_found: NotFound, flags: DepFlags) -> Result<Option<Instance>>;

    /// Name shown in error messages.
    fn source(&self) -> Option<&str> {
        None
    }

    /// Tokens this scope and its ancestors can provide, for suggestions.
    fn registered_tokens(&self) -> Vec<String> {
        Vec::new()
    }
}

// ═══════════════════════════════════════════
// NullInjector
// ═══════════════════════════════════════════

/// The terminal scope: provides nothing.
///
/// Fails with [`InjectorError::NoProvider`] or returns the caller's
/// fallback. Optional requests get `None`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullInjector;

impl Injector for NullInjector {
    fn lookup(&self, token: &Token, not_found: NotFound, flags: DepFlags) -> Result<Option<Instance>> {
        match not_found.under(flags) {
            NotFound::Throw => Err(InjectorError::no_provider(token)),
            NotFound::Value(value) => Ok(value),
        }
    }
}

// ═══════════════════════════════════════════
// InjectorBuilder
// ═══════════════════════════════════════════

/// Builds a [`StaticInjector`].
///
/// # Examples
/// ```rust,ignore
/// let injector = StaticInjector::builder()
///     .name("request")
///     .parent(root.clone())
///     .providers(request_providers)
///     .build()?;
/// ```
pub struct InjectorBuilder {
    providers: Vec<ProviderEntry>,
    parent: Option<Arc<dyn Injector>>,
    settings: Settings,
}

impl InjectorBuilder {
    fn new() -> Self {
        Self {
            providers: Vec::new(),
            parent: None,
            settings: Settings::default(),
        }
    }

    /// Name used in error messages.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.settings.name = Some(name.into());
        self
    }

    /// Parent scope. Defaults to the [`NullInjector`].
    pub fn parent(mut self, parent: Arc<dyn Injector>) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Allow a later description to replace an earlier one for the same
    /// token. On by default.
    pub fn allow_override(mut self, allow: bool) -> Self {
        self.settings.allow_override = allow;
        self
    }

    /// Replace all settings at once.
    pub fn settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    /// Add one description or nested list.
    pub fn provider(mut self, entry: impl Into<ProviderEntry>) -> Self {
        self.providers.push(entry.into());
        self
    }

    /// Add several descriptions or nested lists.
    pub fn providers<E: Into<ProviderEntry>>(mut self, entries: impl IntoIterator<Item = E>) -> Self {
        self.providers.extend(entries.into_iter().map(Into::into));
        self
    }

    /// Build the injector, interpreting every description.
    ///
    /// # Errors
    /// [`InjectorError::InvalidProvider`], [`InjectorError::MissingDeps`],
    /// [`InjectorError::MixedMultiProvider`], [`InjectorError::AlreadyRegistered`]
    /// or [`InjectorError::InvalidToken`] for the first bad description.
    #[instrument(skip_all, name = "injector_build")]
    pub fn build(self) -> Result<Arc<StaticInjector>> {
        let providers = ProviderEntry::flatten(self.providers);
        info!(
            name = ?self.settings.name,
            providers = providers.len(),
            "Building injector"
        );

        let registry = Registry::build(providers, self.settings.allow_override)?;
        let injector = Arc::new(StaticInjector {
            registry,
            parent: self.parent.unwrap_or_else(|| Arc::new(NullInjector)),
            settings: self.settings,
            guard: ReentrantMutex::new(()),
        });
        injector.registry.bind_scope(Arc::downgrade(&injector));

        info!(records = injector.registry.len(), "Injector built");
        Ok(injector)
    }
}

// ═══════════════════════════════════════════
// StaticInjector
// ═══════════════════════════════════════════

/// A scope backed by a registry built once from provider descriptions.
///
/// Values are created lazily on first request and live as long as the
/// injector. Resolution through one injector is serialized; the same
/// thread may re-enter it from inside a recipe.
pub struct StaticInjector {
    registry: Registry,
    parent: Arc<dyn Injector>,
    settings: Settings,
    guard: ReentrantMutex<()>,
}

impl StaticInjector {
    /// Create a new builder.
    pub fn builder() -> InjectorBuilder {
        InjectorBuilder::new()
    }

    /// Build an injector from `providers` under `parent`
    /// (the [`NullInjector`] when `None`).
    pub fn create<E: Into<ProviderEntry>>(
        providers: impl IntoIterator<Item = E>,
        parent: Option<Arc<dyn Injector>>,
    ) -> Result<Arc<Self>> {
        let mut builder = Self::builder().providers(providers);
        if let Some(parent) = parent {
            builder = builder.parent(parent);
        }
        builder.build()
    }

    /// Build a child injector whose parent is this one.
    pub fn create_child<E: Into<ProviderEntry>>(
        self: &Arc<Self>,
        providers: impl IntoIterator<Item = E>,
    ) -> Result<Arc<StaticInjector>> {
        debug!(parent = ?self.settings.name, "Creating child injector");
        Self::builder()
            .parent(self.clone())
            .providers(providers)
            .build()
    }

    /// The parent scope.
    pub fn parent(&self) -> &Arc<dyn Injector> {
        &self.parent
    }

    /// The settings this injector was built with.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Describes every record of this injector, in registration order.
    pub fn snapshot(&self) -> RegistrySnapshot {
        RegistrySnapshot {
            name: self.settings.name.clone(),
            records: self.registry.snapshot(),
        }
    }
}

impl Injector for StaticInjector {
    fn lookup(&self, token: &Token, not_found: NotFound, flags: DepFlags) -> Result<Option<Instance>> {
        let _guard = self.guard.lock();

        let request = Dependency::new(token.resolve_forward(), flags)?;
        let not_found = not_found.under(flags);

        Resolver::new(&self.registry, self.parent.as_ref()).resolve_dependency(&request, not_found)
    }

    fn source(&self) -> Option<&str> {
        self.settings.name.as_deref()
    }

    fn registered_tokens(&self) -> Vec<String> {
        let mut tokens: Vec<String> = self.registry.tokens().map(Token::to_string).collect();
        tokens.extend(self.parent.registered_tokens());
        tokens
    }
}

impl fmt::Display for StaticInjector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tokens: Vec<String> = self.registry.tokens().map(Token::to_string).collect();
        write!(f, "StaticInjector[{}]", tokens.join(", "))
    }
}

impl fmt::Debug for StaticInjector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticInjector")
            .field("name", &self.settings.name)
            .field("records", &self.registry.len())
            .finish()
    }
}

/// Serializable description of one injector's registry.
#[derive(Debug, Clone, Serialize)]
pub struct RegistrySnapshot {
    pub name: Option<String>,
    pub records: Vec<RecordSnapshot>,
}

// ═══════════════════════════════════════════
// ResolverApi
// ═══════════════════════════════════════════

/// Typed resolution on any [`Injector`].
///
/// Every method formats failures once, at the injector it was called on.
pub trait ResolverApi: Injector {
    /// Resolve with explicit fallback and lookup flags.
    fn get_with(
        &self,
        token: impl Into<Token>,
        not_found: NotFound,
        flags: DepFlags,
    ) -> Result<Option<Instance>> {
        let token = token.into();
        self.lookup(&token, not_found, flags)
            .map_err(|err| at_boundary(self, err))
    }

    /// Resolve `token`, failing if no scope provides it.
    fn get_instance(&self, token: impl Into<Token>) -> Result<Instance> {
        let token = token.into();
        self.get_with(&token, NotFound::Throw, DepFlags::default())?
            .ok_or_else(|| at_boundary(self, InjectorError::no_provider(&token)))
    }

    /// Resolve `token` and downcast it to `T`.
    fn get<T: Any + Send + Sync>(&self, token: impl Into<Token>) -> Result<Arc<T>> {
        let token = token.into();
        let value = self.get_instance(&token)?;
        downcast(self, &token, value)
    }

    /// Resolve `token`, or return `default` if no scope provides it.
    fn get_or(&self, token: impl Into<Token>, default: Instance) -> Result<Instance> {
        let token = token.into();
        self.get_with(&token, NotFound::Value(Some(default)), DepFlags::default())?
            .ok_or_else(|| at_boundary(self, InjectorError::no_provider(&token)))
    }

    /// Resolve `token` as `T`, or `None` if no scope provides it.
    fn get_optional<T: Any + Send + Sync>(&self, token: impl Into<Token>) -> Result<Option<Arc<T>>> {
        let token = token.into();
        match self.get_with(&token, NotFound::Value(None), DepFlags::default())? {
            Some(value) => downcast(self, &token, value).map(Some),
            None => Ok(None),
        }
    }

    /// Resolve a multi token and downcast every element to `T`.
    fn get_all<T: Any + Send + Sync>(&self, token: impl Into<Token>) -> Result<Vec<Arc<T>>> {
        let token = token.into();
        let items = self.get::<Vec<Instance>>(&token)?;
        items
            .iter()
            .map(|item| downcast(self, &token, item.clone()))
            .collect()
    }
}

impl<I: Injector + ?Sized> ResolverApi for I {}

fn downcast<I, T>(injector: &I, token: &Token, value: Instance) -> Result<Arc<T>>
where
    I: Injector + ?Sized,
    T: Any + Send + Sync,
{
    value.downcast::<T>().map_err(|_| {
        at_boundary(injector, InjectorError::type_mismatch(token, type_name::<T>()))
    })
}

fn at_boundary<I: Injector + ?Sized>(injector: &I, err: InjectorError) -> InjectorError {
    let suggestions = match (&err, err.path().last()) {
        (InjectorError::NoProvider(_), Some(missing)) => {
            suggest_similar(&missing.to_string(), &injector.registered_tokens(), 3)
        }
        _ => Vec::new(),
    };
    err.at_boundary(injector.source(), suggestions)
}

// ═══════════════════════════════════════════
// Prelude
// ═══════════════════════════════════════════

pub mod prelude {
    pub use super::{
        Injector, InjectorBuilder, NotFound, NullInjector, ResolverApi, StaticInjector,
        injector_token,
    };
    pub use crate::error::{BoxError, InjectorError, Result};
    pub use crate::instance::{Deps, Injectable, Instance, instance};
    pub use crate::provider::{Annotation, Dep, DepFlags, Provider, ProviderEntry};
    pub use crate::settings::Settings;
    pub use crate::token::{OpaqueToken, Token, forward_ref};
}
