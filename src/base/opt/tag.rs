//! EDNS option carrying a client tag.
//!
//! The option in this module – [`ClientTag`] – carries a 16 bit value that
//! a resolver attaches to its upstream queries depending on the address
//! prefix a query relates to. The receiving server can use the tag to
//! correlate queries with a local policy.
//!
//! The option was proposed in the now expired
//! [draft-bellis-dnsop-edns-tags] under option code 16. Since the code is
//! configurable, a [`ClientTag`] carries the code it is sent under.
//!
//! [draft-bellis-dnsop-edns-tags]: https://datatracker.ietf.org/doc/draft-bellis-dnsop-edns-tags/

use core::fmt;
use octseq::builder::OctetsBuilder;
use crate::base::iana::OptionCode;
use crate::base::wire::ParseError;
use super::{ComposeOptData, OptData};


//------------ ClientTag -----------------------------------------------------

/// Option data for a client tag.
///
/// The data is exactly two octets: the tag in network byte order.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct ClientTag {
    /// The option code the tag is sent under.
    code: OptionCode,

    /// The tag value.
    tag: u16,
}

impl ClientTag {
    /// The length of the option data.
    pub const COMPOSE_LEN: u16 = 2;

    /// Creates a new client tag option.
    pub fn new(code: OptionCode, tag: u16) -> Self {
        ClientTag { code, tag }
    }

    /// Returns the tag value.
    pub fn tag(self) -> u16 {
        self.tag
    }

    /// Parses a client tag from the complete option data.
    pub fn from_slice(
        code: OptionCode, data: &[u8]
    ) -> Result<Self, ParseError> {
        match *data {
            [hi, lo] => Ok(ClientTag::new(code, u16::from_be_bytes([hi, lo]))),
            _ => Err(ParseError::form_error("client tag must be two octets")),
        }
    }
}

//--- OptData

impl OptData for ClientTag {
    fn code(&self) -> OptionCode {
        self.code
    }
}

impl ComposeOptData for ClientTag {
    fn compose_len(&self) -> u16 {
        Self::COMPOSE_LEN
    }

    fn compose_option<Target: OctetsBuilder + ?Sized>(
        &self, target: &mut Target
    ) -> Result<(), Target::AppendError> {
        target.append_slice(&self.tag.to_be_bytes())
    }
}

//--- Display

impl fmt::Display for ClientTag {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:#06x}", self.tag)
    }
}


//============ Tests =========================================================
