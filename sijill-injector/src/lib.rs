//! Static, hierarchical injector for Sijill.
//!
//! Provider descriptions are interpreted once into a registry; tokens are
//! resolved lazily, memoized per injector and delegated up the parent
//! chain when not provided locally.

pub mod error;
pub mod identity;
pub mod injector;
pub mod instance;
pub mod provider;
pub mod registry;
pub(crate) mod resolver;
pub mod settings;
pub mod token;

pub use error::{InjectorError, Result};
pub use injector::{
    Injector, InjectorBuilder, NotFound, NullInjector, RegistrySnapshot, ResolverApi,
    StaticInjector, injector_token, prelude,
};
pub use instance::{Deps, Injectable, Instance, instance};
pub use provider::{Annotation, Dep, DepFlags, Provider, ProviderEntry};
pub use token::{OpaqueToken, Token, forward_ref};
