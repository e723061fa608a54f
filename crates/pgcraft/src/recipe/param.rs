//! Parameter values and named-parameter extraction.
//!
//! [`Param`] wraps any driver-bindable value behind an `Arc` so recipes and
//! their bound values stay clone-friendly. [`prepare_parameters`] resolves
//! a named/positional slot list against an ordered set of [`Source`]s for
//! feeding a bound query.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio_postgres::types::ToSql;

use crate::dynamic::Handle;
use crate::error::{CraftError, CraftResult};

/// A clone-friendly bound-parameter value.
#[derive(Clone)]
pub struct Param(pub(crate) Arc<dyn ToSql + Send + Sync>);

impl Param {
    /// Wrap any driver-bindable value.
    pub fn new<T: ToSql + Send + Sync + 'static>(value: T) -> Self {
        Param(Arc::new(value))
    }

    /// Borrow the inner value as a driver trait object.
    pub fn as_dyn(&self) -> &(dyn ToSql + Sync) {
        &*self.0 as &(dyn ToSql + Sync)
    }
}

impl std::fmt::Debug for Param {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Param").field(&"<dyn ToSql>").finish()
    }
}

/// An ordered collection of bound parameters.
#[derive(Clone, Debug, Default)]
pub struct ParamList {
    params: Vec<Param>,
}

impl ParamList {
    pub fn new() -> Self {
        Self { params: Vec::new() }
    }

    /// Add a value and return its 1-based index.
    pub fn push<T: ToSql + Send + Sync + 'static>(&mut self, value: T) -> usize {
        self.params.push(Param::new(value));
        self.params.len()
    }

    /// Add a pre-wrapped param and return its 1-based index.
    pub fn push_param(&mut self, param: Param) -> usize {
        self.params.push(param);
        self.params.len()
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// All parameters as references, in order, for the driver.
    pub fn as_refs(&self) -> Vec<&(dyn ToSql + Sync)> {
        self.params.iter().map(|p| p.as_dyn()).collect()
    }
}

impl FromIterator<Param> for ParamList {
    fn from_iter<I: IntoIterator<Item = Param>>(iter: I) -> Self {
        Self {
            params: iter.into_iter().collect(),
        }
    }
}

/// One supplier of parameter values.
///
/// The original API accepted untyped arguments and silently skipped
/// anything unrecognized; this enum makes the three supported shapes
/// explicit so unsupported inputs are unrepresentable.
#[derive(Debug, Clone)]
pub enum Source {
    /// A positional value, consumed by empty name-list slots in order.
    Value(Param),
    /// A name→value mapping.
    Map(BTreeMap<String, Param>),
    /// A record or patch handle; absent patch members do not resolve.
    Record(Handle),
}

impl Source {
    /// A positional value.
    pub fn value<T: ToSql + Send + Sync + 'static>(value: T) -> Source {
        Source::Value(Param::new(value))
    }

    /// A named map source.
    pub fn map<K: Into<String>>(entries: impl IntoIterator<Item = (K, Param)>) -> Source {
        Source::Map(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// A record source.
    pub fn record(handle: Handle) -> Source {
        Source::Record(handle)
    }

    fn lookup(&self, name: &str) -> Option<Param> {
        match self {
            Source::Value(_) => None,
            Source::Map(map) => map.get(name).cloned(),
            Source::Record(handle) => match handle.field(name) {
                Ok(value) => value.cell().map(Param::new),
                Err(_) => None,
            },
        }
    }
}

impl From<Handle> for Source {
    fn from(handle: Handle) -> Source {
        Source::Record(handle)
    }
}

/// Resolve a slot list against a set of sources.
///
/// Empty names fill positionally from [`Source::Value`] entries in order.
/// Named slots resolve by scanning the map/record sources in the order
/// given; the first source exposing a name wins and later sources are not
/// consulted for it. Any unresolved slot fails the whole call; no partial
/// result is returned.
pub fn prepare_parameters(names: &[&str], sources: &[Source]) -> CraftResult<ParamList> {
    let mut resolved: Vec<Option<Param>> = vec![None; names.len()];
    let mut positional = names
        .iter()
        .enumerate()
        .filter(|(_, name)| name.is_empty())
        .map(|(i, _)| i);

    for source in sources {
        match source {
            Source::Value(param) => {
                // Values beyond the positional slots are ignored.
                if let Some(slot) = positional.next() {
                    resolved[slot] = Some(param.clone());
                }
            }
            named => {
                for (i, name) in names.iter().enumerate() {
                    if !name.is_empty() && resolved[i].is_none() {
                        if let Some(param) = named.lookup(name) {
                            resolved[i] = Some(param);
                        }
                    }
                }
            }
        }
    }

    resolved
        .into_iter()
        .zip(names)
        .map(|(param, name)| {
            param.ok_or_else(|| {
                if name.is_empty() {
                    CraftError::Unresolved("not enough positional values".to_string())
                } else {
                    CraftError::Unresolved(format!("no source supplied a value for '{name}'"))
                }
            })
        })
        .collect()
}
