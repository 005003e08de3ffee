//! Recursive, memoizing resolution of records.
//!
//! Resolution is a depth-first walk over declared dependencies. A record
//! is marked in progress before its dependencies are visited, so meeting
//! it again on the same walk is a cycle. Every failing frame that owns a
//! record prepends its token to the error path on the way out.

use std::sync::{Arc, Weak};

use tracing::{trace, warn};

use crate::error::{InjectorError, Result};
use crate::injector::{Injector, NotFound, NullInjector};
use crate::instance::{Deps, Instance};
use crate::provider::DepFlags;
use crate::registry::{Claim, Dependency, Recipe, Record, Registry};

/// Resolves tokens against one registry and its parent scope.
pub(crate) struct Resolver<'a> {
    registry: &'a Registry,
    parent: &'a dyn Injector,
}

impl<'a> Resolver<'a> {
    pub fn new(registry: &'a Registry, parent: &'a dyn Injector) -> Self {
        Self { registry, parent }
    }

    /// Resolves one dependency reference.
    ///
    /// The local registry is consulted only if the reference allows it;
    /// otherwise, or when nothing is registered locally, the request goes
    /// to the parent, or to the terminal scope for self-only references.
    pub fn resolve_dependency(&self, dep: &Dependency, not_found: NotFound) -> Result<Option<Instance>> {
        let record = if dep.flags.contains(DepFlags::CHECK_SELF) {
            self.registry.get(&dep.key)
        } else {
            None
        };

        let Some(record) = record else {
            if dep.flags.contains(DepFlags::CHECK_PARENT) {
                trace!(token = %dep.token, "Delegating to parent");
                return self.parent.lookup(&dep.token, not_found, DepFlags::default());
            }
            return NullInjector.lookup(&dep.token, not_found, DepFlags::default());
        };

        self.resolve_record(record).map(Some).map_err(|err| {
            record.release();
            if dep.private { err } else { err.within(&dep.token) }
        })
    }

    /// Produces the value of `record`, constructing it on first use.
    pub fn resolve_record(&self, record: &Record) -> Result<Instance> {
        if let Recipe::Injector(scope) = &record.recipe {
            return scope
                .get()
                .and_then(Weak::upgrade)
                .map(|scope| scope as Instance)
                .ok_or_else(|| InjectorError::construction(&record.token, "injector is being dropped".into()));
        }

        match record.claim() {
            Claim::Cached(value) => {
                trace!(token = %record.token, "Resolved from cache");
                return Ok(value);
            }
            Claim::Cycle => {
                warn!(token = %record.token, "Circular dependency detected");
                return Err(InjectorError::circular());
            }
            Claim::Claimed => {}
        }

        let mut values = Vec::with_capacity(record.deps.len());
        for dep in &record.deps {
            let not_found = if dep.flags.contains(DepFlags::OPTIONAL) {
                NotFound::Value(None)
            } else {
                NotFound::Throw
            };
            values.push(self.resolve_dependency(dep, not_found)?);
        }

        trace!(
            token = %record.token,
            kind = ?record.kind(),
            instantiate = record.instantiates(),
            "Constructing"
        );
        let value = self.construct(record, &values)?;
        record.fulfill(value.clone());
        Ok(value)
    }

    fn construct(&self, record: &Record, values: &[Option<Instance>]) -> Result<Instance> {
        let deps = Deps::new(&record.token, values);
        match &record.recipe {
            Recipe::Factory(factory) => {
                factory(&deps).map_err(|cause| InjectorError::construction(&record.token, cause))
            }
            Recipe::Class(class) => {
                (class.construct)(&deps).map_err(|cause| InjectorError::construction(&record.token, cause))
            }
            Recipe::Existing => deps.instance(0).cloned().ok_or_else(|| {
                let target = record.deps.first().map_or(&record.token, |dep| &dep.token);
                InjectorError::no_provider(target)
            }),
            Recipe::Multi => {
                let items: Vec<Instance> = values.iter().flatten().cloned().collect();
                Ok(Arc::new(items))
            }
            Recipe::Value | Recipe::Injector(_) => {
                // Both are answered before construction is reached.
                Err(InjectorError::construction(&record.token, "record has no recipe".into()))
            }
        }
    }
}
