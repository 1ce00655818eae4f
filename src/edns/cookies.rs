//! Validating and minting DNS cookies.
//!
//! A server cookie minted by this crate uses the interoperable format of
//! [RFC 9018]: a version octet of 1, three zero octets, a 32 bit timestamp,
//! and eight octets of SipHash-2-4 output. See
//! [`StandardServerCookie`] for the details.
//!
//! Validation is a pure function of the secrets, the peer’s address, the
//! received option data, and the current time. It never fails: every input
//! is classified as a [`CookieStatus`], which in turn maps to one of the
//! three outcomes of [`CookieValidity`].
//!
//! [RFC 9018]: https://tools.ietf.org/html/rfc9018

use core::fmt;
use std::net::IpAddr;
#[cfg(feature = "rand")]
use rand::{CryptoRng, Rng, RngCore};
use tracing::trace;
use crate::base::opt::cookie::{ClientCookie, Cookie, StandardServerCookie};
use crate::base::serial::Serial;
use crate::utils::base16;


//----------- Constants ------------------------------------------------------

/// The one hour period suggested by section 4.3 of RFC 9018.
pub const ONE_HOUR_AS_SECS: u32 = 60 * 60;

/// The five minute period suggested by section 4.3 of RFC 9018.
pub const FIVE_MINUTES_AS_SECS: u32 = 5 * 60;

/// The age after which a valid cookie is replaced by a fresh one.
pub const HALF_HOUR_AS_SECS: u32 = 30 * 60;


//----------- CookieSecrets --------------------------------------------------

/// The secrets used for DNS cookies.
///
/// New cookies are always minted with the current secret. The previous
/// secret is only ever used for verification so that cookies handed out
/// before a rollover stay valid for a while.
#[derive(Clone, Eq, PartialEq)]
pub struct CookieSecrets {
    /// The current secret.
    current: [u8; 16],

    /// The secret before the last rollover.
    previous: Option<[u8; 16]>,
}

impl CookieSecrets {
    /// Creates the secrets from their values.
    pub fn new(current: [u8; 16], previous: Option<[u8; 16]>) -> Self {
        CookieSecrets { current, previous }
    }

    /// Creates secrets with a random current secret.
    #[cfg(feature = "rand")]
    pub fn generate() -> Self {
        Self::generate_with(rand::thread_rng())
    }

    /// Creates secrets with a current secret taken from the given RNG.
    #[cfg(feature = "rand")]
    pub fn generate_with(mut rng: impl CryptoRng + RngCore) -> Self {
        Self::new(rng.gen(), None)
    }

    /// Returns the current secret.
    pub fn current(&self) -> &[u8; 16] {
        &self.current
    }

    /// Returns the previous secret if there is one.
    pub fn previous(&self) -> Option<&[u8; 16]> {
        self.previous.as_ref()
    }

    /// Returns new secrets with `current` and this current as previous.
    #[must_use]
    pub fn rotate(&self, current: [u8; 16]) -> Self {
        Self::new(current, Some(self.current))
    }

    /// Returns these secrets without the previous secret.
    #[must_use]
    pub fn retire_previous(&self) -> Self {
        Self::new(self.current, None)
    }

    /// Determines the status of received cookie option data.
    pub fn status(
        &self,
        peer: IpAddr,
        data: &[u8],
        now: Serial,
        window: &CookieWindow,
    ) -> CookieStatus {
        status(&self.current, self.previous(), peer, data, now, window)
    }

    /// Mints a complete cookie for the given client cookie and peer.
    pub fn mint(
        &self, client: ClientCookie, peer: IpAddr, now: Serial
    ) -> Cookie {
        mint(client, peer, now, &self.current)
    }
}

//--- Debug

impl fmt::Debug for CookieSecrets {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        // Secrets stay out of the logs.
        f.debug_struct("CookieSecrets")
            .field("previous", &self.previous.is_some())
            .finish_non_exhaustive()
    }
}


//----------- CookieWindow ---------------------------------------------------

/// The time window within which a server cookie is accepted.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct CookieWindow {
    /// The maximum age of a cookie in seconds.
    pub max_age: u32,

    /// How many seconds a cookie’s timestamp may be in the future.
    pub max_future_skew: u32,

    /// The age in seconds after which a valid cookie should be renewed.
    pub refresh_after: u32,
}

impl Default for CookieWindow {
    fn default() -> Self {
        CookieWindow {
            max_age: ONE_HOUR_AS_SECS,
            max_future_skew: FIVE_MINUTES_AS_SECS,
            refresh_after: HALF_HOUR_AS_SECS,
        }
    }
}


//----------- CookieValidity -------------------------------------------------

/// The outcome of validating received cookie option data.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum CookieValidity {
    /// The server cookie was minted by us for this peer and is fresh.
    Valid,

    /// The option is well-formed but doesn’t carry a valid server cookie.
    Invalid,

    /// The option data has an impossible length.
    Malformed,
}

impl CookieValidity {
    /// Returns whether the cookie is valid.
    pub fn is_valid(self) -> bool {
        matches!(self, CookieValidity::Valid)
    }
}


//----------- CookieStatus ---------------------------------------------------

/// The detailed status of received cookie option data.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum CookieStatus {
    /// The option data length is not 8 nor between 16 and 40.
    Malformed,

    /// There is only a client cookie.
    ClientOnly,

    /// The server cookie is not 16 octets long and thus not ours.
    Foreign,

    /// The server cookie has an unknown version.
    Version,

    /// The reserved octets of the server cookie are not zero.
    Reserved,

    /// The server cookie’s timestamp is too far in the past.
    Expired,

    /// The server cookie’s timestamp is too far in the future.
    Future,

    /// The hash doesn’t match any of our secrets.
    BadHash,

    /// The cookie is valid.
    Valid,

    /// The cookie is valid but old enough to be replaced.
    ValidRenew,
}

impl CookieStatus {
    /// Returns the three-way validity for this status.
    pub fn validity(self) -> CookieValidity {
        match self {
            CookieStatus::Valid | CookieStatus::ValidRenew => {
                CookieValidity::Valid
            }
            CookieStatus::Malformed => CookieValidity::Malformed,
            _ => CookieValidity::Invalid,
        }
    }

    /// Returns whether a new server cookie should be sent to the peer.
    pub fn needs_renewal(self) -> bool {
        !matches!(self, CookieStatus::Valid)
    }
}


//----------- validate -------------------------------------------------------

/// Validates received cookie option data.
///
/// The `data` is the complete data of the first cookie option of a
/// message. The server cookie is checked against the `current` secret and,
/// if that fails, against the `previous` secret.
pub fn validate(
    current: &[u8; 16],
    previous: Option<&[u8; 16]>,
    peer: IpAddr,
    data: &[u8],
    now: Serial,
    window: &CookieWindow,
) -> CookieValidity {
    status(current, previous, peer, data, now, window).validity()
}

/// Determines the detailed status of received cookie option data.
///
/// This is what [`validate`] does but with the reason for an invalid
/// cookie and whether a valid cookie is due for renewal.
pub fn status(
    current: &[u8; 16],
    previous: Option<&[u8; 16]>,
    peer: IpAddr,
    data: &[u8],
    now: Serial,
    window: &CookieWindow,
) -> CookieStatus {
    // Cookie::from_slice checks the length before looking at the data.
    let cookie = match Cookie::from_slice(data) {
        Ok(cookie) => cookie,
        Err(_) => {
            trace!("Malformed cookie: option length {}", data.len());
            return CookieStatus::Malformed
        }
    };
    let server = match cookie.server() {
        Some(server) => server,
        None => {
            trace!("Client cookie only: {}", cookie.client());
            return CookieStatus::ClientOnly
        }
    };
    let server = match server.try_to_standard() {
        Some(server) => server,
        None => {
            trace!(
                "Invalid server cookie: foreign length {}",
                server.compose_len()
            );
            return CookieStatus::Foreign
        }
    };

    if server.version() != StandardServerCookie::VERSION {
        trace!("Invalid server cookie: version {}", server.version());
        return CookieStatus::Version
    }
    if server.reserved() != [0; 3] {
        trace!("Invalid server cookie: reserved octets {}",
            base16::encode_string(&server.reserved())
        );
        return CookieStatus::Reserved
    }

    // https://www.rfc-editor.org/rfc/rfc9018.html#section-4.3
    let timestamp = server.timestamp();
    let elapsed = i64::from(now.distance_from(timestamp));
    if elapsed > i64::from(window.max_age) {
        trace!(
            "Invalid server cookie: cookie has expired ({} > {})",
            elapsed, window.max_age
        );
        return CookieStatus::Expired
    }
    if elapsed < -i64::from(window.max_future_skew) {
        trace!(
            "Invalid server cookie: cookie is too new ({} > {})",
            timestamp, now
        );
        return CookieStatus::Future
    }

    let client = cookie.client();
    if !server.check_hash(client, peer, current)
        && !previous.map_or(false, |prev| server.check_hash(client, peer, prev))
    {
        trace!("Invalid server cookie: hash mismatch for {}", client);
        return CookieStatus::BadHash
    }

    if elapsed > i64::from(window.refresh_after) {
        CookieStatus::ValidRenew
    }
    else {
        CookieStatus::Valid
    }
}


//----------- mint -----------------------------------------------------------

/// Mints a complete cookie with a fresh server cookie.
pub fn mint(
    client: ClientCookie,
    peer: IpAddr,
    now: Serial,
    secret: &[u8; 16],
) -> Cookie {
    client.create_response(now, peer, secret)
}


//============ Tests =========================================================
