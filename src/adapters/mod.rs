//! Adapters normalizing concrete detector implementations into the
//! registry's shared [`Detection`](crate::registry::Detection) shape.
//!
//! [`BuiltinProvider`] wraps the hand-written chart detector and is always
//! available. [`PluginProvider`] wraps an optional external pattern
//! library loaded as a dynamic plugin; it reports itself unavailable
//! whenever that library cannot be loaded.

pub mod builtin;
pub mod plugin;

pub use builtin::BuiltinProvider;
pub use plugin::PluginProvider;
