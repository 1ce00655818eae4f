//! Handling of EDNS data on the wire.
//!
//! This module provides the types needed to read the options of a received
//! OPT record and to assemble the options of an outgoing one. Everything
//! here is independent of policy: deciding which options to send is the
//! business of [`edns`][crate::edns].
//!
//! * [`iana`] contains the registry of option codes,
//! * [`opt`] contains the option list and the individual options,
//! * [`serial`] provides the wrapping 32 bit time values used by cookies,
//! * [`wire`] contains the parse error types.

//--- Re-exports

pub use self::iana::OptionCode;
pub use self::opt::{EdnsOption, Opt, OptionSet};
pub use self::serial::Serial;
pub use self::wire::ParseError;

//--- Modules

pub mod iana;
pub mod opt;
pub mod serial;
pub mod wire;
