//! IANA Definitions for DNS.
//!
//! This module contains types for parameters defined in IANA registries
//! that are relevant for this crate. Currently, that is only the registry
//! of EDNS option codes.
//!
//! Each type wraps a raw integer and provides associated constants for the
//! well-defined values. There are two methods `from_int()` and `to_int()`
//! to convert from and to raw integer values as well as implementations of
//! the `From` trait for these. `FromStr` and `Display` are implemented to
//! convert from the string codes to the values and back.

pub use self::opt::OptionCode;

#[macro_use]
mod macros;

pub mod opt;
