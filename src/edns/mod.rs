//! Policy for the EDNS options of a resolver.
//!
//! * [`tags`] maps address prefixes to client tags,
//! * [`builder`] builds the tag table from configuration statements,
//! * [`cookies`] validates and mints DNS cookies,
//! * [`compose`] assembles the options of outgoing messages.

pub use self::compose::{compose, Direction, MessageInfo, Transport};
pub use self::cookies::{CookieSecrets, CookieStatus, CookieValidity};
pub use self::tags::{Prefix, TagTable};

pub mod builder;
pub mod compose;
pub mod cookies;
pub mod tags;
