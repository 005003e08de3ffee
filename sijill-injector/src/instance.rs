//! Resolved values and the argument view handed to recipes.

use std::any::{Any, type_name};
use std::sync::Arc;

use crate::error::BoxError;
use crate::token::Token;

/// A resolved, type-erased value.
pub type Instance = Arc<dyn Any + Send + Sync>;

/// Wraps a value into an [`Instance`].
#[inline]
pub fn instance<T: Any + Send + Sync>(value: T) -> Instance {
    Arc::new(value)
}

/// A type the injector can construct from declared dependencies.
///
/// This is the recipe behind `use_class` and the [`Provider::of`]
/// shorthand.
///
/// [`Provider::of`]: crate::provider::Provider::of
///
/// # Examples
/// ```
/// use std::sync::Arc;
/// use sijill_injector::error::BoxError;
/// use sijill_injector::instance::{Deps, Injectable};
///
/// struct Greeter {
///     greeting: Arc<String>,
/// }
///
/// impl Injectable for Greeter {
///     fn construct(deps: &Deps<'_>) -> Result<Self, BoxError> {
///         Ok(Greeter { greeting: deps.get::<String>(0)? })
///     }
/// }
/// ```
pub trait Injectable: Sized + Send + Sync + 'static {
    /// Builds the value from its resolved dependencies, in declaration order.
    fn construct(deps: &Deps<'_>) -> Result<Self, BoxError>;
}

/// Resolved dependency values, in the order they were declared.
///
/// An entry is `None` only for an optional dependency nobody provides.
pub struct Deps<'a> {
    owner: &'a Token,
    values: &'a [Option<Instance>],
}

impl<'a> Deps<'a> {
    pub(crate) fn new(owner: &'a Token, values: &'a [Option<Instance>]) -> Self {
        Self { owner, values }
    }

    /// The token being constructed.
    pub fn owner(&self) -> &Token {
        self.owner
    }

    /// Number of declared dependencies.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if nothing was declared.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The raw value at `index`, `None` if out of range or absent.
    pub fn instance(&self, index: usize) -> Option<&Instance> {
        self.values.get(index).and_then(Option::as_ref)
    }

    /// The value at `index`, downcast to `T`.
    ///
    /// # Errors
    /// Fails if the index is out of range, the dependency was optional and
    /// absent, or the value is not a `T`.
    pub fn get<T: Any + Send + Sync>(&self, index: usize) -> Result<Arc<T>, DepError> {
        self.optional::<T>(index)?.ok_or_else(|| DepError::Missing {
            owner: self.owner.to_string(),
            index,
        })
    }

    /// The value at `index` downcast to `T`, or `None` if it was optional
    /// and absent.
    pub fn optional<T: Any + Send + Sync>(&self, index: usize) -> Result<Option<Arc<T>>, DepError> {
        let slot = self.values.get(index).ok_or_else(|| DepError::OutOfRange {
            owner: self.owner.to_string(),
            index,
            len: self.values.len(),
        })?;

        match slot {
            None => Ok(None),
            Some(value) => value.clone().downcast::<T>().map(Some).map_err(|_| {
                DepError::TypeMismatch {
                    owner: self.owner.to_string(),
                    index,
                    expected: type_name::<T>(),
                }
            }),
        }
    }
}

/// Error raised while reading a dependency inside a recipe.
#[derive(Debug, thiserror::Error)]
pub enum DepError {
    /// The recipe asked for more dependencies than were declared.
    #[error("{owner} declares {len} dependencies, #{index} requested")]
    OutOfRange {
        owner: String,
        index: usize,
        len: usize,
    },

    /// An optional dependency was read as required.
    #[error("dependency #{index} of {owner} was not provided")]
    Missing { owner: String, index: usize },

    /// The dependency holds a value of another type.
    #[error("dependency #{index} of {owner} is not a {expected}")]
    TypeMismatch {
        owner: String,
        index: usize,
        expected: &'static str,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_access() {
        let owner = Token::from("Owner");
        let values = vec![Some(instance(41i32)), None];
        let deps = Deps::new(&owner, &values);

        assert_eq!(deps.len(), 2);
        assert_eq!(*deps.get::<i32>(0).unwrap(), 41);
        assert!(deps.optional::<String>(1).unwrap().is_none());
        assert!(deps.instance(1).is_none());
    }

    #[test]
    fn access_errors() {
        let owner = Token::from("Owner");
        let values = vec![Some(instance(1u8)), None];
        let deps = Deps::new(&owner, &values);

        assert!(matches!(deps.get::<u8>(5), Err(DepError::OutOfRange { len: 2, .. })));
        assert!(matches!(deps.get::<u8>(1), Err(DepError::Missing { index: 1, .. })));
        let err = deps.get::<String>(0).unwrap_err();
        assert!(err.to_string().contains("String"));
    }
}
