//! Configuration of EDNS option handling.
//!
//! The configuration arrives as already parsed values. With the `serde`
//! feature enabled, all types can be deserialized. Every field has a
//! default so a configuration only needs to mention what it changes.
//!
//! Numeric values are checked against their allowed range when the
//! configuration is turned into a [`Snapshot`][crate::state::Snapshot].

use tracing::warn;
use crate::edns::builder::build_table;
use crate::edns::cookies::{
    CookieSecrets, CookieWindow, FIVE_MINUTES_AS_SECS, HALF_HOUR_AS_SECS,
    ONE_HOUR_AS_SECS,
};
use crate::edns::tags::TagTable;
use crate::error::ConfigError;
use crate::utils::base16;
use crate::utils::config::DefMinMax;


//------------ Constants -----------------------------------------------------

/// Maximum age of a server cookie in seconds.
const MAX_AGE: DefMinMax<u32> = DefMinMax::new(ONE_HOUR_AS_SECS, 1, 86400);

/// Tolerated clock skew for server cookies in seconds.
const MAX_FUTURE_SKEW: DefMinMax<u32> = DefMinMax::new(
    FIVE_MINUTES_AS_SECS, 0, ONE_HOUR_AS_SECS
);

/// The default option code for client tags.
const DEFAULT_TAG_OPCODE: u16 = 16;

/// Padding block sizes. Zero makes no sense and 4096 is plenty.
const QUERY_BLOCK_SIZE: DefMinMax<u16> = DefMinMax::new(128, 1, 4096);
const RESPONSE_BLOCK_SIZE: DefMinMax<u16> = DefMinMax::new(468, 1, 4096);

/// The idle timeout of the keepalive option in milliseconds.
///
/// The option carries units of 100 ms in 16 bits.
const KEEPALIVE_TIMEOUT: DefMinMax<u32> = DefMinMax::new(
    120_000, 0, 6_553_500
);


//------------ EdnsConfig ----------------------------------------------------

/// The complete EDNS configuration.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default, deny_unknown_fields))]
pub struct EdnsConfig {
    /// DNS cookies.
    pub cookies: CookieConfig,

    /// Client tags for upstream queries.
    pub tags: TagConfig,

    /// Padding of messages.
    pub padding: PaddingConfig,

    /// The edns-tcp-keepalive option.
    pub keepalive: KeepaliveConfig,
}

impl EdnsConfig {
    /// Checks all numeric values against their allowed ranges.
    pub fn check(&self) -> Result<(), ConfigError> {
        self.cookies.window()?;
        self.padding.check()?;
        self.keepalive.check()?;
        Ok(())
    }
}


//------------ CookieConfig --------------------------------------------------

/// Configuration for DNS cookies.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default, deny_unknown_fields))]
pub struct CookieConfig {
    /// Whether to include cookies in responses to clients.
    pub answer_cookies: bool,

    /// Whether to include cookies in queries sent upstream.
    pub query_cookies: bool,

    /// The current secret as 32 hex digits.
    ///
    /// If missing, a random secret is used.
    pub secret: Option<String>,

    /// The previous secret as 32 hex digits.
    pub previous_secret: Option<String>,

    /// The maximum age of a server cookie in seconds.
    pub max_age: u32,

    /// How far in the future a server cookie may be in seconds.
    pub max_future_skew: u32,

    /// The age in seconds after which a valid server cookie is renewed.
    pub refresh_after: u32,

    /// What to send back when the peer’s cookie is not valid.
    pub on_invalid: InvalidCookiePolicy,
}

impl CookieConfig {
    /// Returns the checked time window.
    pub fn window(&self) -> Result<CookieWindow, ConfigError> {
        check_range("max_age", self.max_age, MAX_AGE)?;
        check_range(
            "max_future_skew", self.max_future_skew, MAX_FUTURE_SKEW
        )?;
        check_range(
            "refresh_after", self.refresh_after,
            DefMinMax::new(HALF_HOUR_AS_SECS, 0, self.max_age)
        )?;
        Ok(CookieWindow {
            max_age: self.max_age,
            max_future_skew: self.max_future_skew,
            refresh_after: self.refresh_after,
        })
    }

    /// Returns the cookie secrets.
    ///
    /// Without the `rand` feature, a current secret must be configured.
    pub fn secrets(&self) -> Result<CookieSecrets, ConfigError> {
        let previous = match self.previous_secret {
            Some(ref secret) => Some(parse_secret(secret)?),
            None => None,
        };
        match self.secret {
            Some(ref secret) => {
                Ok(CookieSecrets::new(parse_secret(secret)?, previous))
            }
            None => random_secrets(previous),
        }
    }
}

impl Default for CookieConfig {
    fn default() -> Self {
        CookieConfig {
            answer_cookies: true,
            query_cookies: false,
            secret: None,
            previous_secret: None,
            max_age: MAX_AGE.default(),
            max_future_skew: MAX_FUTURE_SKEW.default(),
            refresh_after: HALF_HOUR_AS_SECS,
            on_invalid: InvalidCookiePolicy::default(),
        }
    }
}

fn parse_secret(secret: &str) -> Result<[u8; 16], ConfigError> {
    base16::decode_array(secret.trim()).map_err(|err| {
        warn!("Invalid cookie secret: {}", err);
        ConfigError::BadSecret
    })
}

#[cfg(feature = "rand")]
fn random_secrets(
    previous: Option<[u8; 16]>
) -> Result<CookieSecrets, ConfigError> {
    Ok(CookieSecrets::new(*CookieSecrets::generate().current(), previous))
}

#[cfg(not(feature = "rand"))]
fn random_secrets(
    _previous: Option<[u8; 16]>
) -> Result<CookieSecrets, ConfigError> {
    warn!("No cookie secret configured");
    Err(ConfigError::BadSecret)
}


//------------ InvalidCookiePolicy -------------------------------------------

/// What to do when a peer presents an invalid server cookie.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum InvalidCookiePolicy {
    /// Send back the client cookie with a freshly minted server cookie.
    #[default]
    Remint,

    /// Send back only the client cookie.
    ClientOnly,
}


//------------ TagConfig -----------------------------------------------------

/// Configuration for client tags.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default, deny_unknown_fields))]
pub struct TagConfig {
    /// Whether tags are attached to upstream queries.
    pub enabled: bool,

    /// The option code tags are sent under.
    pub opcode: u16,

    /// The prefixes and their tags.
    pub entries: Vec<TagEntry>,
}

impl TagConfig {
    /// Builds the tag table if tags are enabled.
    pub fn build(&self) -> Result<Option<TagTable>, ConfigError> {
        if !self.enabled {
            return Ok(None)
        }
        build_table(
            self.opcode,
            self.entries.iter().map(|entry| (entry.prefix.as_str(), entry.tag))
        ).map(Some)
    }
}

impl Default for TagConfig {
    fn default() -> Self {
        TagConfig {
            enabled: false,
            opcode: DEFAULT_TAG_OPCODE,
            entries: Vec::new(),
        }
    }
}


//------------ TagEntry ------------------------------------------------------

/// A single tag statement.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(deny_unknown_fields))]
pub struct TagEntry {
    /// The prefix in the form `addr[/len]`.
    pub prefix: String,

    /// The tag.
    pub tag: u16,
}

impl TagEntry {
    /// Creates a new entry.
    pub fn new(prefix: impl Into<String>, tag: u16) -> Self {
        TagEntry { prefix: prefix.into(), tag }
    }
}


//------------ PaddingConfig -------------------------------------------------

/// Configuration for block-length padding.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default, deny_unknown_fields))]
pub struct PaddingConfig {
    /// Whether messages are padded.
    pub enabled: bool,

    /// The block size queries are padded to.
    pub query_block_size: u16,

    /// The block size responses are padded to.
    pub response_block_size: u16,

    /// Whether to pad only messages sent over encrypted transports.
    pub encrypted_only: bool,
}

impl PaddingConfig {
    fn check(&self) -> Result<(), ConfigError> {
        check_range(
            "query_block_size", self.query_block_size, QUERY_BLOCK_SIZE
        )?;
        check_range(
            "response_block_size", self.response_block_size,
            RESPONSE_BLOCK_SIZE
        )
    }
}

impl Default for PaddingConfig {
    fn default() -> Self {
        PaddingConfig {
            enabled: false,
            query_block_size: QUERY_BLOCK_SIZE.default(),
            response_block_size: RESPONSE_BLOCK_SIZE.default(),
            encrypted_only: true,
        }
    }
}


//------------ KeepaliveConfig -----------------------------------------------

/// Configuration for the edns-tcp-keepalive option.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default, deny_unknown_fields))]
pub struct KeepaliveConfig {
    /// Whether to send the option in responses over stream transports.
    pub enabled: bool,

    /// The idle timeout in milliseconds.
    pub timeout_ms: u32,
}

impl KeepaliveConfig {
    fn check(&self) -> Result<(), ConfigError> {
        check_range("timeout_ms", self.timeout_ms, KEEPALIVE_TIMEOUT)
    }
}

impl Default for KeepaliveConfig {
    fn default() -> Self {
        KeepaliveConfig {
            enabled: false,
            timeout_ms: KEEPALIVE_TIMEOUT.default(),
        }
    }
}


//------------ Helpers -------------------------------------------------------

fn check_range<T>(
    name: &'static str, value: T, limits: DefMinMax<T>
) -> Result<(), ConfigError>
where T: Copy + Ord + Into<u64> {
    if limits.contains(&value) {
        Ok(())
    }
    else {
        warn!(
            "Configuration value {} for '{}' out of range {}..={}",
            value.into(), name, limits.min().into(), limits.max().into()
        );
        Err(ConfigError::BadValue { name, value: value.into() })
    }
}


//============ Tests =========================================================

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn defaults() {
        let config = EdnsConfig::default();
        assert!(config.cookies.answer_cookies);
        assert!(!config.cookies.query_cookies);
        assert_eq!(config.cookies.on_invalid, InvalidCookiePolicy::Remint);
        assert_eq!(config.cookies.window().unwrap(), CookieWindow::default());
        assert!(!config.tags.enabled);
        assert_eq!(config.tags.opcode, 16);
        assert_eq!(config.padding.query_block_size, 128);
        assert_eq!(config.padding.response_block_size, 468);
        assert!(config.padding.encrypted_only);
        assert_eq!(config.keepalive.timeout_ms, 120_000);
        assert!(config.check().is_ok());
    }

    #[test]
    fn ranges() {
        let mut config = CookieConfig { max_age: 0, ..Default::default() };
        assert_eq!(
            config.window(),
            Err(ConfigError::BadValue { name: "max_age", value: 0 })
        );
        config.max_age = 600;
        assert_eq!(
            config.window(),
            Err(ConfigError::BadValue { name: "refresh_after", value: 1800 })
        );
        config.refresh_after = 600;
        assert!(config.window().is_ok());

        let padding = PaddingConfig {
            query_block_size: 0, ..Default::default()
        };
        assert!(padding.check().is_err());
    }

    #[test]
    fn secrets() {
        let config = CookieConfig {
            secret: Some("00112233445566778899aabbccddeeff".into()),
            previous_secret: Some("FFEEDDCCBBAA99887766554433221100".into()),
            ..Default::default()
        };
        let secrets = config.secrets().unwrap();
        assert_eq!(secrets.current()[..2], [0x00u8, 0x11]);
        assert_eq!(secrets.previous().unwrap()[..2], [0xffu8, 0xee]);

        for bad in ["", "0011", "00112233445566778899aabbccddeeff00", "xyz"] {
            let config = CookieConfig {
                secret: Some(bad.into()), ..Default::default()
            };
            assert_eq!(config.secrets(), Err(ConfigError::BadSecret));
        }
    }

    #[test]
    #[cfg(feature = "rand")]
    fn random_secret() {
        let config = CookieConfig {
            previous_secret: Some("00112233445566778899aabbccddeeff".into()),
            ..Default::default()
        };
        let secrets = config.secrets().unwrap();
        assert_eq!(secrets.previous().unwrap()[0], 0x00);
    }

    #[test]
    fn tag_table() {
        let config = TagConfig {
            enabled: true,
            opcode: 65001,
            entries: vec![TagEntry::new("198.51.100.0/24", 0x2A)],
        };
        let table = config.build().unwrap().unwrap();
        assert_eq!(table.len(), 1);
        assert!(TagConfig::default().build().unwrap().is_none());
    }
}
