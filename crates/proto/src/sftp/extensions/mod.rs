//! Built-in vendor extensions.

pub mod openssh;

pub use openssh::{builtin, Limits, OpenSshExtension, StatVfs};
