//! Value sources: configuration fields resolved at invocation time.
//!
//! Most request-level options can be given three ways: as a literal value, as
//! a reactive [`Observable`] cell whose current value is read per attempt, or
//! as a function of the optional action payload. [`ValueSource`] models that
//! union as a tagged variant so resolution is exhaustive rather than
//! type-sniffed.

use crate::observable::Observable;
use std::fmt;
use std::sync::Arc;

/// A function-of-payload source.
pub type ComputeFn<T, P> = Arc<dyn Fn(Option<&P>) -> T + Send + Sync>;

/// A configuration field that is a literal, a reactive cell, or a function of
/// the action payload.
///
/// # Example
///
/// ```
/// use reqflow_core::source::ValueSource;
///
/// let literal: ValueSource<String, u32> = ValueSource::from("/users");
/// let dynamic: ValueSource<String, u32> =
///     ValueSource::compute(|id: Option<&u32>| format!("/users/{}", id.copied().unwrap_or(0)));
///
/// assert_eq!(literal.resolve(None), "/users");
/// assert_eq!(dynamic.resolve(Some(&7)), "/users/7");
/// ```
pub enum ValueSource<T, P = ()> {
    /// A fixed value, cloned per resolution.
    Literal(T),
    /// A reactive cell; the current value is read per resolution.
    Cell(Observable<T>),
    /// A function invoked with the action payload per resolution.
    Compute(ComputeFn<T, P>),
}

impl<T: Clone, P> ValueSource<T, P> {
    /// Create a function-of-payload source.
    pub fn compute(f: impl Fn(Option<&P>) -> T + Send + Sync + 'static) -> Self {
        Self::Compute(Arc::new(f))
    }

    /// Produce the concrete value for this invocation.
    #[must_use]
    pub fn resolve(&self, payload: Option<&P>) -> T {
        match self {
            Self::Literal(value) => value.clone(),
            Self::Cell(cell) => cell.get(),
            Self::Compute(f) => f(payload),
        }
    }
}

impl<T: Clone, P> Clone for ValueSource<T, P> {
    fn clone(&self) -> Self {
        match self {
            Self::Literal(value) => Self::Literal(value.clone()),
            Self::Cell(cell) => Self::Cell(cell.clone()),
            Self::Compute(f) => Self::Compute(Arc::clone(f)),
        }
    }
}

impl<T: fmt::Debug, P> fmt::Debug for ValueSource<T, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(value) => f.debug_tuple("Literal").field(value).finish(),
            Self::Cell(cell) => f.debug_tuple("Cell").field(cell).finish(),
            Self::Compute(_) => f.write_str("Compute(..)"),
        }
    }
}

impl<T, P> From<T> for ValueSource<T, P> {
    fn from(value: T) -> Self {
        Self::Literal(value)
    }
}

impl<T, P> From<Observable<T>> for ValueSource<T, P> {
    fn from(cell: Observable<T>) -> Self {
        Self::Cell(cell)
    }
}

impl<P> From<&str> for ValueSource<String, P> {
    fn from(value: &str) -> Self {
        Self::Literal(value.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_resolves_to_clone() {
        let source: ValueSource<u32, ()> = 7.into();
        assert_eq!(source.resolve(None), 7);
        assert_eq!(source.resolve(None), 7);
    }

    #[test]
    fn cell_resolves_current_value() {
        let cell = Observable::new(String::from("a"));
        let source: ValueSource<String, ()> = cell.clone().into();
        assert_eq!(source.resolve(None), "a");
        cell.set(String::from("b"));
        assert_eq!(source.resolve(None), "b");
    }

    #[test]
    fn clones_resolve_like_the_original() {
        let literal: ValueSource<String, ()> = "/users".into();
        assert_eq!(literal.clone().resolve(None), "/users");

        let dynamic: ValueSource<String, u32> =
            ValueSource::compute(|p| format!("/users/{}", p.copied().unwrap_or(0)));
        assert_eq!(dynamic.clone().resolve(Some(&7)), "/users/7");
    }

    #[test]
    fn compute_receives_payload() {
        let source: ValueSource<String, u32> =
            ValueSource::compute(|p| p.map_or_else(|| String::from("none"), u32::to_string));
        assert_eq!(source.resolve(None), "none");
        assert_eq!(source.resolve(Some(&42)), "42");
    }
}
