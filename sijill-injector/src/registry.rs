//! Provider registry: the normalized records of one scope.
//!
//! [`Registry::build`] interprets a flat list of [`Provider`] descriptions
//! into records keyed by [`TokenKey`]. The shape of the registry is fixed
//! once built; only the value slots of its records change afterwards.

use std::collections::HashMap;
use std::sync::Weak;

use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{InjectorError, Result};
use crate::identity::{TokenKey, fresh_key, key_of};
use crate::injector::StaticInjector;
use crate::instance::Instance;
use crate::provider::{Annotation, ClassRecipe, Dep, DepFlags, FactoryFn, Provider};
use crate::token::Token;

/// How a record produces its value.
pub(crate) enum Recipe {
    /// Precomputed; the slot starts resolved.
    Value,
    /// A plain function over the dependencies.
    Factory(FactoryFn),
    /// A constructor over the dependencies.
    Class(ClassRecipe),
    /// The value of the first dependency. An alias always yields a value:
    /// if that dependency is optional and absent, resolving the alias
    /// fails with `NoProvider` for the aliased token.
    Existing,
    /// The values of all dependencies, in order.
    Multi,
    /// The owning injector itself, bound once the injector exists.
    /// Never memoized.
    Injector(OnceCell<Weak<StaticInjector>>),
}

/// The recipe kind of a record, as reported by snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Value,
    Factory,
    Class,
    Existing,
    Multi,
    Injector,
}

/// The memoization state of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotState {
    Unresolved,
    InProgress,
    Resolved,
}

enum Slot {
    Unresolved,
    InProgress,
    Resolved(Instance),
}

/// Outcome of trying to start resolving a record.
pub(crate) enum Claim {
    /// Already resolved.
    Cached(Instance),
    /// Already being resolved further up the stack.
    Cycle,
    /// Marked in progress; the caller must construct the value.
    Claimed,
}

/// A normalized dependency reference.
#[derive(Debug, Clone)]
pub(crate) struct Dependency {
    pub token: Token,
    pub key: TokenKey,
    pub flags: DepFlags,
    /// Points at a private multi contribution slot.
    pub private: bool,
}

impl Dependency {
    pub(crate) fn new(token: Token, flags: DepFlags) -> Result<Self> {
        let key = key_of(&token)?;
        Ok(Self {
            token,
            key,
            flags,
            private: false,
        })
    }
}

/// The registry-internal form of a provider description.
pub(crate) struct Record {
    pub token: Token,
    pub recipe: Recipe,
    pub deps: Vec<Dependency>,
    private: bool,
    slot: Mutex<Slot>,
}

impl Record {
    fn new(token: Token, recipe: Recipe, deps: Vec<Dependency>, preset: Option<Instance>) -> Self {
        let slot = match preset {
            Some(value) => Slot::Resolved(value),
            None => Slot::Unresolved,
        };
        Self {
            token,
            recipe,
            deps,
            private: false,
            slot: Mutex::new(slot),
        }
    }

    /// Whether the recipe is instantiated with constructor semantics.
    pub fn instantiates(&self) -> bool {
        matches!(self.recipe, Recipe::Class(_))
    }

    pub fn kind(&self) -> RecordKind {
        match self.recipe {
            Recipe::Value => RecordKind::Value,
            Recipe::Factory(_) => RecordKind::Factory,
            Recipe::Class(_) => RecordKind::Class,
            Recipe::Existing => RecordKind::Existing,
            Recipe::Multi => RecordKind::Multi,
            Recipe::Injector(_) => RecordKind::Injector,
        }
    }

    pub fn state(&self) -> SlotState {
        match &*self.slot.lock() {
            Slot::Unresolved => SlotState::Unresolved,
            Slot::InProgress => SlotState::InProgress,
            Slot::Resolved(_) => SlotState::Resolved,
        }
    }

    /// Returns the memoized value, reports a cycle, or marks the slot
    /// in progress.
    pub(crate) fn claim(&self) -> Claim {
        let mut slot = self.slot.lock();
        match &*slot {
            Slot::Resolved(value) => Claim::Cached(value.clone()),
            Slot::InProgress => Claim::Cycle,
            Slot::Unresolved => {
                *slot = Slot::InProgress;
                Claim::Claimed
            }
        }
    }

    pub(crate) fn fulfill(&self, value: Instance) {
        *self.slot.lock() = Slot::Resolved(value);
    }

    /// Clears an in-progress mark left by a failed resolution.
    pub(crate) fn release(&self) {
        let mut slot = self.slot.lock();
        if matches!(*slot, Slot::InProgress) {
            *slot = Slot::Unresolved;
        }
    }
}

/// All records of one scope, in registration order.
pub(crate) struct Registry {
    records: Vec<Record>,
    index: HashMap<TokenKey, usize>,
    self_key: TokenKey,
}

impl Registry {
    /// Builds a registry from flattened descriptions.
    ///
    /// The record for the owning scope is always seeded first; it answers
    /// once [`Registry::bind_scope`] has been called.
    ///
    /// # Errors
    /// The first malformed or conflicting description aborts the build.
    pub fn build(providers: Vec<Provider>, allow_override: bool) -> Result<Self> {
        let self_token = crate::injector::injector_token();
        let self_key = key_of(&self_token)?;
        let mut registry = Self {
            records: Vec::with_capacity(providers.len() + 1),
            index: HashMap::new(),
            self_key: self_key.clone(),
        };

        let self_record = Record::new(
            self_token,
            Recipe::Injector(OnceCell::new()),
            Vec::new(),
            None,
        );
        registry.insert(self_key, self_record);

        for provider in &providers {
            registry.register(provider, allow_override)?;
        }

        Ok(registry)
    }

    fn register(&mut self, provider: &Provider, allow_override: bool) -> Result<()> {
        let token = provider.provide.resolve_forward();
        let key = key_of(&token)?;
        let (recipe, preset) = select_recipe(provider)?;
        let deps = compute_deps(provider)?;
        let record = Record::new(token.clone(), recipe, deps, preset);

        if provider.multi {
            let slot = match self.index.get(&key).copied() {
                Some(i) if !matches!(self.records[i].recipe, Recipe::Multi) => {
                    return Err(InjectorError::mixed_multi(provider.describe()));
                }
                Some(i) => i,
                None => self.insert(
                    key,
                    Record::new(token.clone(), Recipe::Multi, Vec::new(), None),
                ),
            };

            let private = fresh_key();
            let placeholder = &mut self.records[slot];
            placeholder.deps.push(Dependency {
                token: token.clone(),
                key: private.clone(),
                flags: DepFlags::default(),
                private: true,
            });
            debug!(
                token = %token,
                position = placeholder.deps.len() - 1,
                kind = ?record.kind(),
                "Registered multi contribution"
            );

            let mut record = record;
            record.private = true;
            self.insert(private, record);
            return Ok(());
        }

        match self.index.get(&key).copied() {
            Some(i) if matches!(self.records[i].recipe, Recipe::Multi) => {
                Err(InjectorError::mixed_multi(provider.describe()))
            }
            Some(_) if !allow_override => Err(InjectorError::already_registered(provider.describe())),
            Some(i) => {
                warn!(token = %token, "Provider overridden; the last registration wins");
                self.records[i] = record;
                Ok(())
            }
            None => {
                debug!(token = %token, kind = ?record.kind(), "Registered provider");
                self.insert(key, record);
                Ok(())
            }
        }
    }

    /// Points the self record at the injector owning this registry.
    pub fn bind_scope(&self, scope: Weak<StaticInjector>) {
        if let Some(Record {
            recipe: Recipe::Injector(cell),
            ..
        }) = self.get(&self.self_key)
        {
            let _ = cell.set(scope);
        }
    }

    fn insert(&mut self, key: TokenKey, record: Record) -> usize {
        let position = self.records.len();
        self.records.push(record);
        self.index.insert(key, position);
        position
    }

    /// Looks up the record stored under `key`.
    pub fn get(&self, key: &TokenKey) -> Option<&Record> {
        self.index.get(key).map(|&i| &self.records[i])
    }

    /// Returns the number of records, private multi slots included.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` if only the self record is present.
    pub fn is_empty(&self) -> bool {
        self.records.len() <= 1
    }

    /// Tokens a caller can request, in registration order.
    pub fn tokens(&self) -> impl Iterator<Item = &Token> {
        self.records.iter().filter(|r| !r.private).map(|r| &r.token)
    }

    /// Describes every record, in registration order.
    pub fn snapshot(&self) -> Vec<RecordSnapshot> {
        self.records
            .iter()
            .map(|record| RecordSnapshot {
                token: record.token.to_string(),
                kind: record.kind(),
                state: record.state(),
                contribution: record.private,
                dependencies: record
                    .deps
                    .iter()
                    .map(|dep| DependencySnapshot {
                        token: dep.token.to_string(),
                        optional: dep.flags.contains(DepFlags::OPTIONAL),
                        check_self: dep.flags.contains(DepFlags::CHECK_SELF),
                        check_parent: dep.flags.contains(DepFlags::CHECK_PARENT),
                    })
                    .collect(),
            })
            .collect()
    }
}

/// Picks the recipe by priority: value, factory, class, existing, then
/// the constructor shorthand.
fn select_recipe(provider: &Provider) -> Result<(Recipe, Option<Instance>)> {
    if let Some(value) = &provider.use_value {
        return Ok((Recipe::Value, Some(value.clone())));
    }
    if let Some(factory) = &provider.use_factory {
        return Ok((Recipe::Factory(factory.clone()), None));
    }
    if let Some(class) = &provider.use_class {
        return Ok((Recipe::Class(class.clone()), None));
    }
    if provider.use_existing.is_some() {
        return Ok((Recipe::Existing, None));
    }
    if let Some(constructor) = &provider.constructor {
        return Ok((Recipe::Class(constructor.clone()), None));
    }
    Err(InjectorError::invalid_provider(
        "Provider does not have [useValue|useFactory|useExisting|useClass] or [provide] is not constructible",
        provider.describe(),
    ))
}

fn compute_deps(provider: &Provider) -> Result<Vec<Dependency>> {
    match (&provider.deps, &provider.use_existing) {
        (Some(deps), _) if !deps.is_empty() => deps
            .iter()
            .enumerate()
            .map(|(position, dep)| normalize_dep(provider, position, dep))
            .collect(),
        (_, Some(existing)) => Ok(vec![Dependency::new(
            existing.resolve_forward(),
            DepFlags::default(),
        )?]),
        (None, None) if provider.use_value.is_none() => {
            Err(InjectorError::missing_deps(provider.describe()))
        }
        _ => Ok(Vec::new()),
    }
}

/// Scans one `deps` entry for its token and modifiers.
fn normalize_dep(provider: &Provider, position: usize, dep: &Dep) -> Result<Dependency> {
    let annotations = match dep {
        Dep::Token(token) => return Dependency::new(token.resolve_forward(), DepFlags::default()),
        Dep::Annotated(annotations) => annotations,
    };

    let mut flags = DepFlags::default();
    let mut token = None;
    for annotation in annotations {
        match annotation {
            Annotation::Optional => flags |= DepFlags::OPTIONAL,
            Annotation::SelfOnly => flags.remove(DepFlags::CHECK_PARENT),
            Annotation::SkipSelf => flags.remove(DepFlags::CHECK_SELF),
            Annotation::Inject(t) | Annotation::Token(t) => token = Some(t.resolve_forward()),
        }
    }

    match token {
        Some(token) => Dependency::new(token, flags),
        None => Err(InjectorError::invalid_provider(
            format!("Dependency #{position} has no token"),
            provider.describe(),
        )),
    }
}

/// One record of a [`RegistrySnapshot`](crate::injector::RegistrySnapshot).
#[derive(Debug, Clone, Serialize)]
pub struct RecordSnapshot {
    pub token: String,
    pub kind: RecordKind,
    pub state: SlotState,
    /// `true` for the private slot of one multi contribution.
    pub contribution: bool,
    pub dependencies: Vec<DependencySnapshot>,
}

/// One dependency of a [`RecordSnapshot`].
#[derive(Debug, Clone, Serialize)]
pub struct DependencySnapshot {
    pub token: String,
    pub optional: bool,
    pub check_self: bool,
    pub check_parent: bool,
}
