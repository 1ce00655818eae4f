//! Building a tag table from configuration statements.
//!
//! Tag statements name a prefix in its textual form `addr[/len]` together
//! with a tag. A missing length means a host prefix. The option code for
//! the tags is given once for the whole table.

use std::net::IpAddr;
use tracing::warn;
use crate::base::iana::OptionCode;
use crate::error::ConfigError;
use super::tags::{Prefix, TagTable};


//------------ TagTableBuilder -----------------------------------------------

/// Collects tag statements and builds a [`TagTable`] from them.
///
/// Each statement is checked when it is added. The check for duplicate
/// prefixes happens in [`build`][Self::build].
#[derive(Clone, Debug)]
pub struct TagTableBuilder {
    opcode: OptionCode,
    entries: Vec<(Prefix, u16)>,
}

impl TagTableBuilder {
    /// Creates a new builder for tags sent under the given option code.
    ///
    /// Fails if the code is reserved or managed by this crate itself.
    pub fn new(opcode: u16) -> Result<Self, ConfigError> {
        let code = OptionCode::from_int(opcode);
        if code.is_reserved_for_tags() {
            warn!("Option code {} can't be used for client tags", code);
            return Err(ConfigError::ReservedOpcode(opcode))
        }
        Ok(TagTableBuilder { opcode: code, entries: Vec::new() })
    }

    /// Returns the option code.
    pub fn opcode(&self) -> OptionCode {
        self.opcode
    }

    /// Adds an entry for a prefix.
    pub fn push(&mut self, prefix: Prefix, tag: u16) {
        self.entries.push((prefix, tag))
    }

    /// Adds an entry for a prefix in textual form.
    pub fn push_str(&mut self, prefix: &str, tag: u16) -> Result<(), ConfigError> {
        self.push(parse_prefix(prefix)?, tag);
        Ok(())
    }

    /// Builds the table.
    pub fn build(self) -> Result<TagTable, ConfigError> {
        TagTable::from_prefixes(self.opcode, self.entries).map_err(|err| {
            warn!("Bad client tag configuration: {}", err);
            err
        })
    }
}


//------------ build_table ---------------------------------------------------

/// Builds a tag table from an option code and textual entries.
pub fn build_table<I, S>(opcode: u16, entries: I) -> Result<TagTable, ConfigError>
where
    I: IntoIterator<Item = (S, u16)>,
    S: AsRef<str>,
{
    let mut builder = TagTableBuilder::new(opcode)?;
    for (prefix, tag) in entries {
        builder.push_str(prefix.as_ref(), tag)?;
    }
    builder.build()
}


//------------ parse_prefix --------------------------------------------------

/// Parses a prefix from its textual form `addr[/len]`.
///
/// Host bits beyond the prefix length are cleared.
pub fn parse_prefix(s: &str) -> Result<Prefix, ConfigError> {
    let s = s.trim();
    let (addr, len) = match s.split_once('/') {
        Some((addr, len)) => (addr, Some(len)),
        None => (s, None),
    };
    let addr: IpAddr = addr.parse().map_err(|_| {
        warn!("Invalid address in tag prefix '{}'", s);
        ConfigError::BadAddress(s.into())
    })?;
    let len = match len {
        Some(len) => {
            let len: u16 = len.parse().map_err(|_| {
                warn!("Invalid prefix length in tag prefix '{}'", s);
                ConfigError::BadAddress(s.into())
            })?;
            u8::try_from(len).map_err(|_| ConfigError::BadPrefixLength(len))?
        }
        None => match addr {
            IpAddr::V4(_) => 32,
            IpAddr::V6(_) => 128,
        }
    };
    Prefix::new(addr, len).map_err(|err| {
        warn!("Invalid tag prefix '{}': {}", s, err);
        err
    })
}


//============ Tests =========================================================

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn prefixes() {
        assert_eq!(
            parse_prefix("198.51.100.0/24").unwrap().to_string(),
            "198.51.100.0/24"
        );
        assert_eq!(
            parse_prefix(" 198.51.100.7/24 ").unwrap(),
            parse_prefix("198.51.100.0/24").unwrap()
        );
        assert_eq!(parse_prefix("192.0.2.1").unwrap().len(), 32);
        assert_eq!(parse_prefix("2001:db8::1").unwrap().len(), 128);
        assert_eq!(parse_prefix("2001:db8::/32").unwrap().len(), 32);
        assert_eq!(parse_prefix("0.0.0.0/0").unwrap().len(), 0);
    }

    #[test]
    fn bad_prefixes() {
        assert_eq!(
            parse_prefix("198.51.100/24"),
            Err(ConfigError::BadAddress("198.51.100/24".into()))
        );
        assert_eq!(
            parse_prefix("198.51.100.0/x"),
            Err(ConfigError::BadAddress("198.51.100.0/x".into()))
        );
        assert_eq!(
            parse_prefix("198.51.100.0/33"),
            Err(ConfigError::BadPrefixLength(33))
        );
        assert_eq!(
            parse_prefix("::/300"), Err(ConfigError::BadPrefixLength(300))
        );
        assert!(parse_prefix("").is_err());
    }

    #[test]
    fn opcodes() {
        for code in [0, 10, 11, 12, 65535] {
            assert_eq!(
                TagTableBuilder::new(code).unwrap_err(),
                ConfigError::ReservedOpcode(code)
            );
        }
        assert!(TagTableBuilder::new(16).is_ok());
        assert!(TagTableBuilder::new(65001).is_ok());
    }

    #[test]
    fn build() {
        let table = build_table(65001, [("198.51.100.0/24", 0x2A)]).unwrap();
        assert_eq!(table.opcode(), OptionCode::from_int(65001));
        assert_eq!(table.lookup("198.51.100.77".parse().unwrap()), Some(0x2A));
        assert_eq!(table.lookup("203.0.113.5".parse().unwrap()), None);

        assert_eq!(
            build_table(65001, [
                ("198.51.100.0/24", 1), ("198.51.100.99/24", 2)
            ]).unwrap_err(),
            ConfigError::DuplicatePrefix("198.51.100.0/24".into())
        );
        assert!(build_table(65001, [("nonsense", 1)]).is_err());
    }
}
