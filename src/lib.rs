//! EDNS option handling for a recursive DNS resolver.
//!
//! This crate takes care of the options in the OPT record of messages a
//! resolver receives and sends. It checks DNS cookies received from
//! clients, attaches client tags to upstream queries based on address
//! prefixes, and assembles the final option list of outgoing messages,
//! including padding and the TCP keepalive option.
//!
//! # Modules
//!
//! * [base] contains the wire-level types: option codes, the option list,
//!   and the individual options,
//! * [edns] contains the cookie validator, the tag table, and the option
//!   composer,
//! * [config] contains the configuration types,
//! * [state] holds the current configuration and lets it be replaced
//!   atomically,
//! * [utils] contains helpers for hex data and bounded configuration
//!   values.
//!
//! # Reference of Feature Flags
//!
//! * `rand`: Enables generating random cookie secrets and client cookies
//!   via the [rand](https://github.com/rust-random/rand) crate. This is a
//!   default feature.
//! * `serde`: Enables deserializing the configuration via
//!   [serde](https://serde.rs/).
//! * `logging`: Adds [`logging::init_logging`] which installs a
//!   [tracing-subscriber](https://github.com/tokio-rs/tracing) log
//!   subscriber.
//!
//! # Example
//!
//! ```
//! use edns_base::base::opt::cookie::ClientCookie;
//! use edns_base::base::{Opt, OptionSet, Serial};
//! use edns_base::config::EdnsConfig;
//! use edns_base::edns::MessageInfo;
//! use edns_base::state::EdnsState;
//!
//! let mut config = EdnsConfig::default();
//! config.cookies.secret = Some("00112233445566778899aabbccddeeff".into());
//! let state = EdnsState::new(config).unwrap();
//!
//! let client = ClientCookie::from_octets([1, 2, 3, 4, 5, 6, 7, 8]);
//! let options = state.load().compose(
//!     &OptionSet::new(),
//!     &Opt::empty(),
//!     "192.0.2.1".parse().unwrap(),
//!     Serial::now(),
//!     &MessageInfo::response(100).with_client_cookie(client),
//! ).unwrap();
//! assert_eq!(options.len(), 1);
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod base;
pub mod config;
pub mod edns;
pub mod error;
#[cfg(feature = "logging")]
#[cfg_attr(docsrs, doc(cfg(feature = "logging")))]
pub mod logging;
pub mod state;
pub mod utils;
