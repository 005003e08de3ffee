//! Provider descriptions: the declarative input of an injector.
//!
//! A [`Provider`] tells the injector how to produce the value of one
//! token. It names the token and exactly one recipe:
//!
//! | recipe        | builder                              |
//! |---------------|--------------------------------------|
//! | value         | `Provider::new(t).use_value(v)`      |
//! | factory       | `Provider::new(t).use_factory(f)`    |
//! | class         | `Provider::new(t).use_class::<C>()`  |
//! | alias         | `Provider::new(t).use_existing(o)`   |
//! | constructor   | `Provider::of::<C>()`                |
//!
//! Factory and class recipes must declare their dependencies with
//! [`Provider::deps`], even when there are none. Adding
//! [`Provider::multi`] makes the description contribute one element of an
//! ordered sequence instead of the whole value.
//!
//! # Examples
//! ```
//! use sijill_injector::instance::instance;
//! use sijill_injector::provider::{Dep, Provider};
//!
//! let providers = vec![
//!     Provider::new("A").use_value(1i32),
//!     Provider::new("B")
//!         .use_factory(|deps| Ok(instance(*deps.get::<i32>(0)? + 1)))
//!         .deps(["A"]),
//!     Provider::new("C")
//!         .use_factory(|deps| Ok(instance(deps.instance(0).is_some())))
//!         .deps([Dep::optional("missing")]),
//! ];
//! # let _ = providers;
//! ```

use std::any::{Any, type_name};
use std::fmt;
use std::sync::Arc;

use bitflags::bitflags;
use sijill_support::rendering::shorten_type_name;

use crate::error::{BoxError, Description};
use crate::instance::{Deps, Injectable, Instance};
use crate::token::{OpaqueToken, Token};

/// A recipe that turns resolved dependencies into a value.
pub type FactoryFn = Arc<dyn Fn(&Deps<'_>) -> Result<Instance, BoxError> + Send + Sync>;

bitflags! {
    /// Where a dependency may be looked up, and whether it may be absent.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct DepFlags: u8 {
        /// Look in the requesting scope's own registry.
        const CHECK_SELF = 1 << 0;
        /// Delegate to the parent scope when not found locally.
        const CHECK_PARENT = 1 << 1;
        /// Yield nothing instead of failing when no one provides it.
        const OPTIONAL = 1 << 2;
    }
}

impl Default for DepFlags {
    fn default() -> Self {
        DepFlags::CHECK_SELF | DepFlags::CHECK_PARENT
    }
}

/// A modifier or token inside an annotated dependency.
#[derive(Clone, Debug)]
pub enum Annotation {
    /// Absence yields `None` instead of an error.
    Optional,
    /// Never delegate to the parent scope.
    SelfOnly,
    /// Never look in the requesting scope; go straight to the parent.
    SkipSelf,
    /// Inject this token instead of the plain token entry.
    Inject(Token),
    /// The dependency's token.
    Token(Token),
}

impl fmt::Display for Annotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Annotation::Optional => write!(f, "Optional"),
            Annotation::SelfOnly => write!(f, "Self"),
            Annotation::SkipSelf => write!(f, "SkipSelf"),
            Annotation::Inject(token) => write!(f, "Inject({})", token.literal()),
            Annotation::Token(token) => write!(f, "{}", token.literal()),
        }
    }
}

/// One entry of a `deps` list.
#[derive(Clone, Debug)]
pub enum Dep {
    /// A bare token, resolved with default lookup rules.
    Token(Token),
    /// A token surrounded by modifiers.
    Annotated(Vec<Annotation>),
}

impl Dep {
    /// An optional dependency on `token`.
    pub fn optional(token: impl Into<Token>) -> Self {
        Dep::Token(token.into()).with(Annotation::Optional)
    }

    /// A dependency on `token` that never leaves the requesting scope.
    pub fn self_only(token: impl Into<Token>) -> Self {
        Dep::Token(token.into()).with(Annotation::SelfOnly)
    }

    /// A dependency on `token` that is always taken from the parent scope.
    pub fn skip_self(token: impl Into<Token>) -> Self {
        Dep::Token(token.into()).with(Annotation::SkipSelf)
    }

    /// Adds a modifier, turning a bare token into an annotated entry.
    pub fn with(self, annotation: Annotation) -> Self {
        match self {
            Dep::Token(token) => Dep::Annotated(vec![Annotation::Token(token), annotation]),
            Dep::Annotated(mut annotations) => {
                annotations.push(annotation);
                Dep::Annotated(annotations)
            }
        }
    }

    /// Marks the dependency optional.
    pub fn and_optional(self) -> Self {
        self.with(Annotation::Optional)
    }

    /// Forbids delegation to the parent scope.
    pub fn and_self_only(self) -> Self {
        self.with(Annotation::SelfOnly)
    }

    /// Skips the requesting scope.
    pub fn and_skip_self(self) -> Self {
        self.with(Annotation::SkipSelf)
    }

    /// Renders the entry for diagnostics.
    pub fn literal(&self) -> String {
        match self {
            Dep::Token(token) => token.literal(),
            Dep::Annotated(annotations) => {
                let parts: Vec<String> = annotations.iter().map(ToString::to_string).collect();
                format!("[{}]", parts.join(", "))
            }
        }
    }
}

impl From<Token> for Dep {
    fn from(token: Token) -> Self {
        Dep::Token(token)
    }
}

impl From<&Token> for Dep {
    fn from(token: &Token) -> Self {
        Dep::Token(token.clone())
    }
}

impl From<OpaqueToken> for Dep {
    fn from(token: OpaqueToken) -> Self {
        Dep::Token(token.into())
    }
}

impl From<&OpaqueToken> for Dep {
    fn from(token: &OpaqueToken) -> Self {
        Dep::Token(token.into())
    }
}

impl From<&str> for Dep {
    fn from(s: &str) -> Self {
        Dep::Token(s.into())
    }
}

impl From<String> for Dep {
    fn from(s: String) -> Self {
        Dep::Token(s.into())
    }
}

impl From<i64> for Dep {
    fn from(n: i64) -> Self {
        Dep::Token(n.into())
    }
}

impl From<Vec<Annotation>> for Dep {
    fn from(annotations: Vec<Annotation>) -> Self {
        Dep::Annotated(annotations)
    }
}

/// A class recipe: a type name plus its constructor.
#[derive(Clone)]
pub(crate) struct ClassRecipe {
    pub(crate) name: &'static str,
    pub(crate) construct: FactoryFn,
}

impl ClassRecipe {
    fn of<T: Injectable>() -> Self {
        Self {
            name: type_name::<T>(),
            construct: Arc::new(construct_class::<T>),
        }
    }
}

fn construct_class<T: Injectable>(deps: &Deps<'_>) -> Result<Instance, BoxError> {
    Ok(Arc::new(T::construct(deps)?))
}

/// A declarative description of how to provide one token.
///
/// Built with the chaining setters and interpreted once, when an injector
/// is created.
#[derive(Clone)]
pub struct Provider {
    pub(crate) provide: Token,
    pub(crate) use_value: Option<Instance>,
    pub(crate) use_factory: Option<FactoryFn>,
    pub(crate) use_class: Option<ClassRecipe>,
    pub(crate) use_existing: Option<Token>,
    pub(crate) constructor: Option<ClassRecipe>,
    pub(crate) deps: Option<Vec<Dep>>,
    pub(crate) multi: bool,
}

impl Provider {
    /// Starts a description for `token`. A recipe must follow.
    pub fn new(token: impl Into<Token>) -> Self {
        Self {
            provide: token.into(),
            use_value: None,
            use_factory: None,
            use_class: None,
            use_existing: None,
            constructor: None,
            deps: None,
            multi: false,
        }
    }

    /// Constructor shorthand: `T` is both the token and the recipe.
    pub fn of<T: Injectable>() -> Self {
        let mut provider = Self::new(Token::of::<T>());
        provider.constructor = Some(ClassRecipe::of::<T>());
        provider
    }

    /// Provides a precomputed value.
    pub fn use_value<T: Any + Send + Sync>(self, value: T) -> Self {
        self.use_instance(Arc::new(value))
    }

    /// Provides an already type-erased value.
    pub fn use_instance(mut self, value: Instance) -> Self {
        self.use_value = Some(value);
        self
    }

    /// Provides the result of `factory`, called with the declared deps.
    pub fn use_factory(
        mut self,
        factory: impl Fn(&Deps<'_>) -> Result<Instance, BoxError> + Send + Sync + 'static,
    ) -> Self {
        self.use_factory = Some(Arc::new(factory));
        self
    }

    /// Provides a `T` built by [`Injectable::construct`].
    pub fn use_class<T: Injectable>(mut self) -> Self {
        self.use_class = Some(ClassRecipe::of::<T>());
        self
    }

    /// Provides whatever `token` resolves to.
    pub fn use_existing(mut self, token: impl Into<Token>) -> Self {
        self.use_existing = Some(token.into());
        self
    }

    /// Declares the dependencies passed to the recipe, in order.
    pub fn deps<D: Into<Dep>>(mut self, deps: impl IntoIterator<Item = D>) -> Self {
        self.deps = Some(deps.into_iter().map(Into::into).collect());
        self
    }

    /// Contributes one element of an ordered sequence under the token.
    pub fn multi(mut self) -> Self {
        self.multi = true;
        self
    }

    /// The token this description provides.
    pub fn token(&self) -> &Token {
        &self.provide
    }

    /// Returns `true` for multi contributions.
    pub fn is_multi(&self) -> bool {
        self.multi
    }

    /// Renders the description as `(key, value)` pairs for diagnostics.
    pub fn describe(&self) -> Description {
        let mut fields: Description = vec![("provide", self.provide.literal())];
        if self.use_value.is_some() {
            fields.push(("useValue", "<value>".to_string()));
        }
        if self.use_factory.is_some() {
            fields.push(("useFactory", "fn".to_string()));
        }
        if let Some(class) = &self.use_class {
            fields.push(("useClass", shorten_type_name(class.name)));
        }
        if let Some(existing) = &self.use_existing {
            fields.push(("useExisting", existing.literal()));
        }
        if let Some(deps) = &self.deps {
            let parts: Vec<String> = deps.iter().map(Dep::literal).collect();
            fields.push(("deps", format!("[{}]", parts.join(", "))));
        }
        if self.multi {
            fields.push(("multi", "true".to_string()));
        }
        fields
    }
}

impl fmt::Debug for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Provider");
        for (key, value) in self.describe() {
            s.field(key, &value);
        }
        s.finish()
    }
}

/// A provider description or a nested list of them.
#[derive(Clone, Debug)]
pub enum ProviderEntry {
    /// One description.
    Single(Provider),
    /// A list, flattened in order when the injector is built.
    List(Vec<ProviderEntry>),
}

impl ProviderEntry {
    /// Flattens nested lists, preserving order.
    pub fn flatten(entries: impl IntoIterator<Item = ProviderEntry>) -> Vec<Provider> {
        let mut flat = Vec::new();
        for entry in entries {
            entry.flatten_into(&mut flat);
        }
        flat
    }

    fn flatten_into(self, flat: &mut Vec<Provider>) {
        match self {
            ProviderEntry::Single(provider) => flat.push(provider),
            ProviderEntry::List(entries) => {
                for entry in entries {
                    entry.flatten_into(flat);
                }
            }
        }
    }
}

impl From<Provider> for ProviderEntry {
    fn from(provider: Provider) -> Self {
        ProviderEntry::Single(provider)
    }
}

impl From<Vec<Provider>> for ProviderEntry {
    fn from(providers: Vec<Provider>) -> Self {
        ProviderEntry::List(providers.into_iter().map(ProviderEntry::Single).collect())
    }
}

impl From<Vec<ProviderEntry>> for ProviderEntry {
    fn from(entries: Vec<ProviderEntry>) -> Self {
        ProviderEntry::List(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_flags_check_self_then_parent() {
        let flags = DepFlags::default();
        assert!(flags.contains(DepFlags::CHECK_SELF));
        assert!(flags.contains(DepFlags::CHECK_PARENT));
        assert!(!flags.contains(DepFlags::OPTIONAL));
    }

    #[test]
    fn modifiers_stack_on_one_token() {
        let dep = Dep::optional("A").and_skip_self();
        match &dep {
            Dep::Annotated(annotations) => assert_eq!(annotations.len(), 3),
            other => panic!("Expected annotated dependency, got: {other:?}"),
        }
        assert_eq!(dep.literal(), "[\"A\", Optional, SkipSelf]");
    }

    #[test]
    fn nested_lists_flatten_in_order() {
        let entries = vec![
            ProviderEntry::from(Provider::new("A").use_value(1i32)),
            ProviderEntry::from(vec![
                ProviderEntry::from(Provider::new("B").use_value(2i32)),
                ProviderEntry::from(vec![Provider::new("C").use_value(3i32)]),
            ]),
            ProviderEntry::from(Provider::new("D").use_value(4i32)),
        ];

        let names: Vec<String> = ProviderEntry::flatten(entries)
            .iter()
            .map(|p| p.token().to_string())
            .collect();
        assert_eq!(names, ["A", "B", "C", "D"]);
    }

    #[test]
    fn describe_lists_recipe_keys() {
        let provider = Provider::new("B")
            .use_factory(|_| Ok(crate::instance::instance(0u8)))
            .deps([Dep::from("A"), Dep::self_only("C")])
            .multi();

        let fields = provider.describe();
        let keys: Vec<&str> = fields.iter().map(|(k, _)| *k).collect();
        assert_eq!(keys, ["provide", "useFactory", "deps", "multi"]);
        assert_eq!(fields[2].1, "[\"A\", [\"C\", Self]]");
    }

    #[test]
    fn constructor_shorthand_uses_type_token() {
        struct Service;
        impl Injectable for Service {
            fn construct(_: &Deps<'_>) -> Result<Self, BoxError> {
                Ok(Service)
            }
        }

        let provider = Provider::of::<Service>();
        assert_eq!(provider.token(), &Token::of::<Service>());
        assert!(provider.constructor.is_some());
        assert!(!provider.is_multi());
    }
}
