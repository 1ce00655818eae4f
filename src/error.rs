//! Error type for configuration problems.

use core::fmt;


//------------ ConfigError ---------------------------------------------------

/// A configuration can not be turned into a working EDNS setup.
///
/// These errors are fatal for the configuration in question: the resolver
/// must not start with it and a reload must keep the previous one.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ConfigError {
    /// An address or prefix could not be parsed.
    BadAddress(String),

    /// A prefix length is outside the range of its address family.
    BadPrefixLength(u16),

    /// Raw address octets are neither 4 nor 16 octets long.
    AddressFamilyMismatch(usize),

    /// The same prefix has been configured more than once.
    DuplicatePrefix(String),

    /// The tag option code collides with a code that can’t be used.
    ReservedOpcode(u16),

    /// A cookie secret is not exactly 16 octets of hex data.
    BadSecret,

    /// Client tags are enabled but no tag table has been built.
    TagsNotBuilt,

    /// A numeric configuration value is out of range.
    BadValue {
        /// The name of the configuration value.
        name: &'static str,

        /// The value found in the configuration.
        value: u64,
    },
}

//--- Display and Error

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            ConfigError::BadAddress(ref addr) => {
                write!(f, "invalid address prefix '{}'", addr)
            }
            ConfigError::BadPrefixLength(len) => {
                write!(f, "invalid prefix length {}", len)
            }
            ConfigError::AddressFamilyMismatch(len) => {
                write!(f, "address of {} octets is neither IPv4 nor IPv6", len)
            }
            ConfigError::DuplicatePrefix(ref prefix) => {
                write!(f, "duplicate tag prefix {}", prefix)
            }
            ConfigError::ReservedOpcode(code) => {
                write!(f, "option code {} can't be used for client tags", code)
            }
            ConfigError::BadSecret => {
                f.write_str("cookie secret must be 32 hex digits")
            }
            ConfigError::TagsNotBuilt => {
                f.write_str("client tags enabled without a tag table")
            }
            ConfigError::BadValue { name, value } => {
                write!(f, "value {} out of range for '{}'", value, name)
            }
        }
    }
}

impl std::error::Error for ConfigError {}
