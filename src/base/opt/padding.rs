//! EDNS options for padding message sizes.
//!
//! The option in this module – [`Padding`] – allows to increase the
//! size of a DNS message to any desired value. This can be helpful with
//! confidentialty.
//!
//! Padding is only useful on encrypted transports. The block-length padding
//! strategy recommended in [RFC 8467] pads every message to the next
//! multiple of a fixed block size. [`Padding::for_block`] calculates the
//! option for that strategy.
//!
//! The option is defined in [RFC 7830](https://tools.ietf.org/html/rfc7830).
//!
//! [RFC 8467]: https://tools.ietf.org/html/rfc8467

use core::fmt;
use octseq::builder::OctetsBuilder;
use crate::base::iana::OptionCode;
use super::{ComposeOptData, OptData};


//------------ Padding -------------------------------------------------------

/// Option data for the padding option.
///
/// This option is used to increase the size of a DNS message to a fixed
/// value so eavesdropper can’t dertermine information from the size. The
/// padding octets carry no meaning and are always set to zero.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct Padding {
    /// The number of padding octets.
    len: u16,
}

impl Padding {
    /// The recommended block size for queries.
    pub const QUERY_BLOCK_SIZE: u16 = 128;

    /// The recommended block size for responses.
    pub const RESPONSE_BLOCK_SIZE: u16 = 468;

    /// Creates a padding option with `len` octets of padding.
    pub fn new(len: u16) -> Self {
        Padding { len }
    }

    /// Creates padding to fill a message up to a multiple of `block_size`.
    ///
    /// The `msg_len` is the length of the complete message without the
    /// padding option. The four octets for the option’s header are taken
    /// into account. Returns `None` if `block_size` is zero.
    pub fn for_block(msg_len: usize, block_size: u16) -> Option<Self> {
        if block_size == 0 {
            return None
        }
        let block = usize::from(block_size);
        let pad = (block - (msg_len + 4) % block) % block;
        // `pad` is less than `block_size` and thus fits.
        Some(Padding::new(pad as u16))
    }

    /// Returns the number of padding octets.
    pub fn len(self) -> u16 {
        self.len
    }

    /// Returns whether the option carries no padding octets.
    pub fn is_empty(self) -> bool {
        self.len == 0
    }
}

//--- OptData

impl OptData for Padding {
    fn code(&self) -> OptionCode {
        OptionCode::PADDING
    }
}

impl ComposeOptData for Padding {
    fn compose_len(&self) -> u16 {
        self.len
    }

    fn compose_option<Target: OctetsBuilder + ?Sized>(
        &self, target: &mut Target
    ) -> Result<(), Target::AppendError> {
        const ZEROS: [u8; 64] = [0; 64];
        let mut left = usize::from(self.len);
        while left > 0 {
            let chunk = left.min(ZEROS.len());
            target.append_slice(&ZEROS[..chunk])?;
            left -= chunk;
        }
        Ok(())
    }
}

//--- Display

impl fmt::Display for Padding {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} octets", self.len)
    }
}


//============ Tests =========================================================

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn block_padding() {
        // 100 + 4 = 104, next multiple of 128 is 128.
        assert_eq!(Padding::for_block(100, 128), Some(Padding::new(24)));
        // Already aligned including the option header.
        assert_eq!(Padding::for_block(124, 128), Some(Padding::new(0)));
        assert_eq!(Padding::for_block(125, 128), Some(Padding::new(127)));
        assert_eq!(Padding::for_block(500, 468), Some(Padding::new(432)));
        assert_eq!(Padding::for_block(500, 0), None);
    }

    #[test]
    fn compose() {
        let mut buf = Vec::new();
        let _ = Padding::new(130).compose_option(&mut buf);
        assert_eq!(buf.len(), 130);
        assert!(buf.iter().all(|&x| x == 0));
    }
}
