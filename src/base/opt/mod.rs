//! Record data for OPT records.
//!
//! Since DNS message headers are relatively short, the amount of information
//! that can be conveyed through them is very limited. In order to provide an
//! extensible means to transmit additional information, [RFC 6891] introduces
//! a resource record called OPT that can be added to the additional section
//! of a message. The record data in turn consists of a sequence of options.
//!
//! This module provides two views on that sequence. [`Opt`] is a checked,
//! borrowed view of received record data. It is what you use for the
//! options of a peer: it never copies anything and never reads past the
//! data it was created from. [`OptionSet`] is an owned, ordered list of
//! options that is assembled for an outgoing message.
//!
//! The option types this crate generates itself live in sub-modules and are
//! re-exported here.
//!
//! [RFC 6891]: https://tools.ietf.org/html/rfc6891

//============ Sub-modules and Re-exports ====================================

pub mod cookie;
pub mod keepalive;
pub mod padding;
pub mod tag;

pub use self::cookie::Cookie;
pub use self::keepalive::TcpKeepalive;
pub use self::padding::Padding;
pub use self::tag::ClientTag;

//============ Module Content ================================================

use core::fmt;
use bytes::Bytes;
use octseq::builder::OctetsBuilder;
use octseq::parse::Parser;
use smallvec::SmallVec;
use super::iana::OptionCode;
use super::wire::ParseError;


//------------ Opt -----------------------------------------------------------

/// A view on the record data of a received OPT record.
///
/// The data is guaranteed to contain a correctly formatted sequence of
/// options but the options themselves are not checked. You can iterate over
/// the options via the [`iter`][Self::iter] method or pick the first option
/// of a given code via [`first`][Self::first].
#[derive(Clone, Copy)]
pub struct Opt<'a> {
    octets: &'a [u8],
}

impl<'a> Opt<'a> {
    /// Creates OPT record data from an octets slice.
    ///
    /// The function checks whether the octets contain a sequence of
    /// options. It does not check whether the options themselves are valid.
    pub fn from_slice(octets: &'a [u8]) -> Result<Self, ParseError> {
        let mut parser = Parser::from_ref(octets);
        while parser.remaining() > 0 {
            parser.advance(2)?;
            let len = parser.parse_u16_be()?;
            parser.advance(usize::from(len))?;
        }
        Ok(Opt { octets })
    }

    /// Returns empty OPT record data.
    pub fn empty() -> Self {
        Opt { octets: b"" }
    }

    /// Returns the raw octets of the record data.
    pub fn as_slice(&self) -> &'a [u8] {
        self.octets
    }

    /// Returns whether there are no options.
    pub fn is_empty(&self) -> bool {
        self.octets.is_empty()
    }

    /// Returns an iterator over all options.
    pub fn iter(&self) -> OptIter<'a> {
        OptIter { rest: self.octets }
    }

    /// Returns the data of the first option with the given code.
    ///
    /// If there are multiple options with this code, only the first one
    /// is considered, as demanded for cookies by section 5.2 of RFC 7873.
    pub fn first(&self, code: OptionCode) -> Option<&'a [u8]> {
        self.iter()
            .find(|(opt_code, _)| *opt_code == code)
            .map(|(_, data)| data)
    }

    /// Returns whether there is an option with the given code.
    pub fn contains(&self, code: OptionCode) -> bool {
        self.first(code).is_some()
    }
}

impl fmt::Debug for Opt<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_list()
            .entries(self.iter().map(|(code, data)| (code, data.len())))
            .finish()
    }
}


//------------ OptIter -------------------------------------------------------

/// An iterator over the options of an OPT record.
///
/// Returns pairs of the option code and a slice of the option data.
#[derive(Clone, Debug)]
pub struct OptIter<'a> {
    /// The part of the record data not yet iterated over.
    rest: &'a [u8],
}

impl<'a> OptIter<'a> {
    /// Returns the next option.
    ///
    /// The data has been checked when creating the [`Opt`], so `None` for a
    /// non-empty remainder can only happen if that check was bypassed.
    fn next_step(&mut self) -> Option<(OptionCode, &'a [u8])> {
        let header = self.rest.get(..4)?;
        let code = OptionCode::from_int(u16::from_be_bytes([
            header[0], header[1]
        ]));
        let len = usize::from(u16::from_be_bytes([header[2], header[3]]));
        let data = self.rest.get(4..4 + len)?;
        self.rest = &self.rest[4 + len..];
        Some((code, data))
    }
}

impl<'a> Iterator for OptIter<'a> {
    type Item = (OptionCode, &'a [u8]);

    fn next(&mut self) -> Option<Self::Item> {
        let res = self.next_step();
        if res.is_none() {
            // Advance to end so we’ll return None from now on.
            self.rest = b"";
        }
        res
    }
}


//------------ EdnsOption ----------------------------------------------------

/// A single option owned by an [`OptionSet`].
///
/// The option data is kept as [`Bytes`] so that options passed through from
/// the resolver’s own option list are shared rather than copied.
#[derive(Clone, Eq, Hash, PartialEq)]
pub struct EdnsOption {
    /// The option code.
    code: OptionCode,

    /// The option data.
    data: Bytes,
}

impl EdnsOption {
    /// Creates a new option from its code and data.
    ///
    /// Returns an error if the data is longer than 65,535 octets.
    pub fn new(
        code: OptionCode, data: impl Into<Bytes>
    ) -> Result<Self, LongOptData> {
        let data = data.into();
        LongOptData::check_len(data.len())?;
        Ok(EdnsOption { code, data })
    }

    /// Creates a new option from option data.
    pub fn from_data<Data: ComposeOptData + ?Sized>(data: &Data) -> Self {
        let mut buf = Vec::with_capacity(usize::from(data.compose_len()));
        // Appending to a vec is infallible.
        let _ = data.compose_option(&mut buf);
        EdnsOption { code: data.code(), data: buf.into() }
    }

    /// Returns the option code.
    pub fn code(&self) -> OptionCode {
        self.code
    }

    /// Returns the option data.
    pub fn data(&self) -> &[u8] {
        self.data.as_ref()
    }

    /// Returns the length of the option’s wire format.
    ///
    /// This includes the four octets of option code and length.
    pub fn compose_len(&self) -> usize {
        4 + self.data.len()
    }

    /// Appends the wire format of the option to `target`.
    pub fn compose<Target: OctetsBuilder + ?Sized>(
        &self, target: &mut Target
    ) -> Result<(), Target::AppendError> {
        self.code.compose(target)?;
        // The length has been checked upon creation.
        target.append_slice(&(self.data.len() as u16).to_be_bytes())?;
        target.append_slice(self.data.as_ref())
    }
}

impl fmt::Debug for EdnsOption {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("EdnsOption")
            .field("code", &self.code)
            .field("len", &self.data.len())
            .finish()
    }
}


//------------ OptionSet -----------------------------------------------------

/// An ordered sequence of options for an outgoing message.
///
/// An option set is built fresh for every outgoing message and owned by
/// whoever builds that message. Most messages only carry a handful of
/// options, so these are kept inline.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct OptionSet {
    options: SmallVec<[EdnsOption; 4]>,
}

impl OptionSet {
    /// Creates a new, empty option set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an option set by copying all options of received data.
    pub fn from_opt(opt: &Opt) -> Result<Self, LongOptData> {
        let mut res = Self::new();
        for (code, data) in opt.iter() {
            res.push(EdnsOption::new(code, Bytes::copy_from_slice(data))?);
        }
        Ok(res)
    }

    /// Parses an option set from the record data of an OPT record.
    ///
    /// Fails if the data is not a sequence of complete options.
    pub fn parse(data: &[u8]) -> Result<Self, ParseError> {
        Opt::from_slice(data)?.iter().map(|(code, data)| {
            // The length came from a 16 bit field and always fits.
            EdnsOption::new(code, Bytes::copy_from_slice(data)).map_err(|_| {
                ParseError::form_error("long option data")
            })
        }).collect()
    }

    /// Returns the number of options in the set.
    pub fn len(&self) -> usize {
        self.options.len()
    }

    /// Returns whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }

    /// Returns an iterator over the options.
    pub fn iter(&self) -> core::slice::Iter<EdnsOption> {
        self.options.iter()
    }

    /// Returns the first option with the given code.
    pub fn first(&self, code: OptionCode) -> Option<&EdnsOption> {
        self.options.iter().find(|opt| opt.code() == code)
    }

    /// Returns whether there is an option with the given code.
    pub fn contains(&self, code: OptionCode) -> bool {
        self.first(code).is_some()
    }

    /// Appends an option.
    pub fn push(&mut self, option: EdnsOption) {
        self.options.push(option)
    }

    /// Appends an option from option data.
    pub fn push_data<Data: ComposeOptData + ?Sized>(&mut self, data: &Data) {
        self.push(EdnsOption::from_data(data))
    }

    /// Returns the length of the wire format of all options.
    pub fn compose_len(&self) -> usize {
        self.options.iter().map(EdnsOption::compose_len).sum()
    }

    /// Appends the wire format of all options to `target`.
    ///
    /// This is the record data of the OPT record.
    pub fn compose<Target: OctetsBuilder + ?Sized>(
        &self, target: &mut Target
    ) -> Result<(), Target::AppendError> {
        for option in &self.options {
            option.compose(target)?;
        }
        Ok(())
    }

    /// Returns the wire format of all options as a vec.
    pub fn to_vec(&self) -> Vec<u8> {
        let mut res = Vec::with_capacity(self.compose_len());
        let _ = self.compose(&mut res);
        res
    }
}

impl<'a> IntoIterator for &'a OptionSet {
    type Item = &'a EdnsOption;
    type IntoIter = core::slice::Iter<'a, EdnsOption>;

    fn into_iter(self) -> Self::IntoIter {
        self.options.iter()
    }
}

impl FromIterator<EdnsOption> for OptionSet {
    fn from_iter<I: IntoIterator<Item = EdnsOption>>(iter: I) -> Self {
        OptionSet { options: iter.into_iter().collect() }
    }
}


//------------ OptData -------------------------------------------------------

/// A type representing an OPT option.
pub trait OptData {
    /// Returns the option code associated with this option.
    fn code(&self) -> OptionCode;
}


//------------ ComposeOptData ------------------------------------------------

/// An OPT option that can be written to wire format.
pub trait ComposeOptData: OptData {
    /// Returns the length of the option data.
    fn compose_len(&self) -> u16;

    /// Appends the option data to `target`.
    fn compose_option<Target: OctetsBuilder + ?Sized>(
        &self, target: &mut Target
    ) -> Result<(), Target::AppendError>;
}


//------------ LongOptData ---------------------------------------------------

/// The octets sequence to be used for option data is too long.
#[derive(Clone, Copy, Debug)]
pub struct LongOptData(());

impl LongOptData {
    /// Checks whether a length is acceptable for option data.
    pub fn check_len(len: usize) -> Result<(), Self> {
        if len > usize::from(u16::MAX) {
            Err(Self(()))
        } else {
            Ok(())
        }
    }
}

impl fmt::Display for LongOptData {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("option data too long")
    }
}

impl std::error::Error for LongOptData {}


//============ Tests =========================================================
