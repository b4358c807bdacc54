//! Singleton Module
//!
//! Shares one instance per distinct constructor configuration.
//!
//! Construction arguments are reduced to a canonical [`SingletonKey`]
//! (`"default"` for no arguments, otherwise name-sorted pairs) and looked up
//! in a [`SingletonRegistry`]. Positional arguments are rejected.

mod args;
mod registry;

pub use args::{ArgValue, CtorArgs, KwArgs, SingletonKey};
pub use registry::{ConstructorSingleton, SingletonRegistry};
