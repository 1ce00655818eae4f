//! Client tags by address prefix.
//!
//! A [`TagTable`] maps address prefixes to 16 bit tag values. When sending
//! a query upstream, the resolver looks up the address in question and
//! attaches the tag of the longest matching prefix as an EDNS option under
//! the table’s option code.
//!
//! The table is immutable once built. A new configuration results in a new
//! table that replaces the old one as a whole.

use core::fmt;
use std::collections::BTreeMap;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use tracing::debug;
use crate::base::iana::OptionCode;
use crate::error::ConfigError;


//------------ Family --------------------------------------------------------

/// The address family of a prefix.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Family {
    /// IPv4 with 32 bit addresses.
    V4,

    /// IPv6 with 128 bit addresses.
    V6,
}

impl Family {
    /// Returns the family for raw address octets of the given length.
    pub fn from_octets_len(len: usize) -> Option<Self> {
        match len {
            4 => Some(Family::V4),
            16 => Some(Family::V6),
            _ => None,
        }
    }

    /// Returns the number of octets in an address.
    pub fn octets_len(self) -> usize {
        match self {
            Family::V4 => 4,
            Family::V6 => 16,
        }
    }

    /// Returns the number of bits in an address.
    pub fn width(self) -> u8 {
        match self {
            Family::V4 => 32,
            Family::V6 => 128,
        }
    }

    fn index(self) -> usize {
        match self {
            Family::V4 => 0,
            Family::V6 => 1,
        }
    }
}


//------------ Prefix --------------------------------------------------------

/// An address prefix.
///
/// All bits beyond the prefix length are zero. The derived ordering sorts
/// by family first, then address octets, then length.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Prefix {
    family: Family,

    /// The address octets. Only the first four are used for IPv4.
    octets: [u8; 16],

    len: u8,
}

impl Prefix {
    /// Creates a prefix from an address and prefix length.
    ///
    /// Bits of the address beyond `len` are cleared.
    pub fn new(addr: IpAddr, len: u8) -> Result<Self, ConfigError> {
        match addr {
            IpAddr::V4(addr) => Self::from_octets(&addr.octets(), len),
            IpAddr::V6(addr) => Self::from_octets(&addr.octets(), len),
        }
    }

    /// Creates a prefix from raw address octets and a prefix length.
    ///
    /// The family is determined by the number of octets which must be
    /// either 4 or 16.
    pub fn from_octets(octets: &[u8], len: u8) -> Result<Self, ConfigError> {
        let family = Family::from_octets_len(octets.len()).ok_or(
            ConfigError::AddressFamilyMismatch(octets.len())
        )?;
        if len > family.width() {
            return Err(ConfigError::BadPrefixLength(len.into()))
        }
        Ok(Self::masked(family, octets, len))
    }

    /// Creates the prefix of length `len` covering the given address.
    ///
    /// The caller guarantees that `octets` has the right length for
    /// `family` and `len` is within its width.
    fn masked(family: Family, octets: &[u8], len: u8) -> Self {
        let mut res = Prefix { family, octets: [0; 16], len };
        let used = &mut res.octets[..family.octets_len()];
        used.copy_from_slice(octets);
        let len = usize::from(len);
        for (i, octet) in used.iter_mut().enumerate() {
            let start = i * 8;
            if start >= len {
                *octet = 0;
            }
            else if start + 8 > len {
                *octet &= 0xFF << (8 - (len - start));
            }
        }
        res
    }

    /// Returns the address family.
    pub fn family(&self) -> Family {
        self.family
    }

    /// Returns the prefix length in bits.
    pub fn len(&self) -> u8 {
        self.len
    }

    /// Returns whether this is the zero-length prefix.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the network address of the prefix.
    pub fn addr(&self) -> IpAddr {
        match self.family {
            Family::V4 => {
                let mut octets = [0; 4];
                octets.copy_from_slice(&self.octets[..4]);
                Ipv4Addr::from(octets).into()
            }
            Family::V6 => Ipv6Addr::from(self.octets).into(),
        }
    }

    /// Returns whether the prefix covers the given address.
    pub fn contains(&self, addr: IpAddr) -> bool {
        Prefix::new(addr, self.len).map(|p| p == *self).unwrap_or(false)
    }
}

//--- Display

impl fmt::Display for Prefix {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}/{}", self.addr(), self.len)
    }
}


//------------ TagTable ------------------------------------------------------

/// The address prefix to client tag mapping.
///
/// Entries are kept in a balanced tree keyed by prefix. A lookup masks the
/// address to each configured prefix length, longest first, and searches
/// the tree for an exact match. The first hit is the longest matching
/// prefix.
#[derive(Clone, Debug)]
pub struct TagTable {
    /// The option code tags are sent under.
    opcode: OptionCode,

    /// The tags by prefix.
    tree: BTreeMap<Prefix, u16>,

    /// The distinct prefix lengths in use, longest first, per family.
    lengths: [Vec<u8>; 2],
}

impl TagTable {
    /// Builds a table from raw address octets, prefix lengths, and tags.
    ///
    /// Fails if any entry is malformed or a prefix appears twice. No table
    /// is produced in this case.
    pub fn build<I, A>(
        opcode: OptionCode, entries: I
    ) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (A, u8, u16)>,
        A: AsRef<[u8]>,
    {
        let entries = entries.into_iter().map(|(octets, len, tag)| {
            Prefix::from_octets(octets.as_ref(), len).map(|p| (p, tag))
        }).collect::<Result<Vec<_>, _>>()?;
        Self::from_prefixes(opcode, entries)
    }

    /// Builds a table from prefixes and tags.
    pub fn from_prefixes(
        opcode: OptionCode,
        entries: impl IntoIterator<Item = (Prefix, u16)>
    ) -> Result<Self, ConfigError> {
        let mut tree = BTreeMap::new();
        for (prefix, tag) in entries {
            if tree.insert(prefix, tag).is_some() {
                return Err(ConfigError::DuplicatePrefix(prefix.to_string()))
            }
        }
        let mut lengths: [Vec<u8>; 2] = Default::default();
        for prefix in tree.keys() {
            lengths[prefix.family.index()].push(prefix.len);
        }
        for item in &mut lengths {
            item.sort_unstable_by(|a, b| b.cmp(a));
            item.dedup();
        }
        debug!(
            "built client tag table with {} entries for option {}",
            tree.len(), opcode
        );
        Ok(TagTable { opcode, tree, lengths })
    }

    /// Returns the option code tags are sent under.
    pub fn opcode(&self) -> OptionCode {
        self.opcode
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.tree.len()
    }

    /// Returns whether the table has no entries.
    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    /// Returns an iterator over all entries in prefix order.
    pub fn iter(&self) -> impl Iterator<Item = (&Prefix, u16)> + '_ {
        self.tree.iter().map(|(prefix, tag)| (prefix, *tag))
    }

    /// Returns the tag of the longest prefix covering `addr`.
    pub fn lookup(&self, addr: IpAddr) -> Option<u16> {
        match addr {
            IpAddr::V4(addr) => self.lookup_family(Family::V4, &addr.octets()),
            IpAddr::V6(addr) => self.lookup_family(Family::V6, &addr.octets()),
        }
    }

    /// Returns the tag for an address given as raw octets.
    ///
    /// Octets of any length other than 4 or 16 never match.
    pub fn lookup_octets(&self, octets: &[u8]) -> Option<u16> {
        let family = Family::from_octets_len(octets.len())?;
        self.lookup_family(family, octets)
    }

    fn lookup_family(&self, family: Family, octets: &[u8]) -> Option<u16> {
        self.lengths[family.index()].iter().find_map(|&len| {
            self.tree.get(&Prefix::masked(family, octets, len)).copied()
        })
    }
}


//============ Tests =========================================================
