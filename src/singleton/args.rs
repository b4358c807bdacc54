//! Constructor Arguments
//!
//! Hashable argument values and the canonical key built from them.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{CacheError, Result};

// == Argument Value ==
/// A hashable constructor argument.
///
/// Integers of every width share one variant, so `10` and `10usize` build
/// the same key. Floats are stored by bit pattern so they can take part in
/// hashing; `-0.0` is folded into `0.0`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ArgValue {
    Bool(bool),
    Int(i128),
    Float(u64),
    Str(String),
}

impl ArgValue {
    pub fn float(value: f64) -> Self {
        let value = if value == 0.0 { 0.0 } else { value };
        ArgValue::Float(value.to_bits())
    }

    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            ArgValue::Int(v) => Some(v as f64),
            ArgValue::Float(bits) => Some(f64::from_bits(bits)),
            _ => None,
        }
    }

    pub fn as_usize(&self) -> Option<usize> {
        match *self {
            ArgValue::Int(v) => usize::try_from(v).ok(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ArgValue::Str(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for ArgValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgValue::Bool(v) => write!(f, "{}", v),
            ArgValue::Int(v) => write!(f, "{}", v),
            ArgValue::Float(bits) => write!(f, "{}", f64::from_bits(*bits)),
            ArgValue::Str(v) => write!(f, "{:?}", v),
        }
    }
}

macro_rules! arg_from {
    ($variant:ident: $($ty:ty),+) => {
        $(impl From<$ty> for ArgValue {
            fn from(value: $ty) -> Self {
                ArgValue::$variant(value.into())
            }
        })+
    };
}

arg_from!(Bool: bool);
arg_from!(Int: i8, i16, i32, i64, u8, u16, u32, u64);
arg_from!(Str: String, &str);

impl From<usize> for ArgValue {
    fn from(value: usize) -> Self {
        ArgValue::Int(value as i128)
    }
}

impl From<f64> for ArgValue {
    fn from(value: f64) -> Self {
        ArgValue::float(value)
    }
}

impl From<f32> for ArgValue {
    fn from(value: f32) -> Self {
        ArgValue::float(value.into())
    }
}

impl From<&Path> for ArgValue {
    fn from(value: &Path) -> Self {
        ArgValue::Str(value.to_string_lossy().into_owned())
    }
}

impl From<PathBuf> for ArgValue {
    fn from(value: PathBuf) -> Self {
        ArgValue::from(value.as_path())
    }
}

// == Keyword Arguments ==
/// Keyword arguments, kept sorted by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KwArgs(BTreeMap<String, ArgValue>);

impl KwArgs {
    pub fn get(&self, name: &str) -> Option<&ArgValue> {
        self.0.get(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ArgValue)> {
        self.0.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Numeric argument, or `default` when absent.
    pub fn f64_or(&self, name: &str, default: f64) -> Result<f64> {
        match self.get(name) {
            None => Ok(default),
            Some(value) => value.as_f64().ok_or_else(|| invalid(name, "a number")),
        }
    }

    /// Non-negative integer argument, or `default` when absent.
    pub fn usize_or(&self, name: &str, default: usize) -> Result<usize> {
        match self.get(name) {
            None => Ok(default),
            Some(value) => value
                .as_usize()
                .ok_or_else(|| invalid(name, "a non-negative integer")),
        }
    }

    /// Required string argument.
    pub fn require_str(&self, name: &str) -> Result<&str> {
        self.get(name)
            .ok_or_else(|| CacheError::MissingArgument(name.to_string()))?
            .as_str()
            .ok_or_else(|| invalid(name, "a string"))
    }
}

fn invalid(name: &str, expected: &'static str) -> CacheError {
    CacheError::InvalidArgument {
        name: name.to_string(),
        expected,
    }
}

// == Constructor Arguments ==
/// Arguments handed to a singleton constructor.
///
/// # Example
/// ```
/// use mini_cache::CtorArgs;
///
/// let args = CtorArgs::new().kwarg("capacity", 10).kwarg("seconds", 2.5);
/// assert_eq!(args.kwargs().len(), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct CtorArgs {
    positional: Vec<ArgValue>,
    kwargs: KwArgs,
}

impl CtorArgs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a keyword argument. A repeated name keeps the last value.
    pub fn kwarg(mut self, name: impl Into<String>, value: impl Into<ArgValue>) -> Self {
        self.kwargs.0.insert(name.into(), value.into());
        self
    }

    /// Adds a positional argument. Singleton constructors reject these.
    pub fn positional(mut self, value: impl Into<ArgValue>) -> Self {
        self.positional.push(value.into());
        self
    }

    pub fn has_positional(&self) -> bool {
        !self.positional.is_empty()
    }

    pub fn kwargs(&self) -> &KwArgs {
        &self.kwargs
    }

    pub fn key(&self) -> SingletonKey {
        SingletonKey::from(&self.kwargs)
    }
}

// == Singleton Key ==
/// Canonical identity of a configuration.
///
/// `Default` when no keyword arguments were given, otherwise the
/// name-sorted argument pairs, so argument order never matters.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SingletonKey {
    Default,
    Kwargs(Vec<(String, ArgValue)>),
}

impl From<&KwArgs> for SingletonKey {
    fn from(kwargs: &KwArgs) -> Self {
        if kwargs.is_empty() {
            SingletonKey::Default
        } else {
            SingletonKey::Kwargs(
                kwargs
                    .iter()
                    .map(|(name, value)| (name.to_string(), value.clone()))
                    .collect(),
            )
        }
    }
}

impl fmt::Display for SingletonKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SingletonKey::Default => f.write_str("default"),
            SingletonKey::Kwargs(pairs) => {
                for (i, (name, value)) in pairs.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{}={}", name, value)?;
                }
                Ok(())
            }
        }
    }
}
