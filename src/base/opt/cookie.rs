//! EDNS Option for DNS cookies.
//!
//! The option in this module – [`Cookie`] –  is part of a simple mechanism
//! that helps DNS servers to mitigate denial-of-service and amplification
//! attacks called DNS cookies.
//!
//! In this mechanism, the client creates a client cookie and includes it in
//! its request to a server. When answering, the server generates a server
//! cookie from the client cookie and a secret and includes it in the
//! response. When the client sends subsequent queries to the same server,
//! it includes both the same client cookie as before and the server cookie
//! it received, thus identifying itself as having sent a query before.
//! Because server cookies are deterministic for a given client cookie, the
//! server doesn’t need to keep any state other than the secret.
//!
//! The DNS Cookie mechanism is defined in [RFC 7873]. Guidance for creating
//! client and server cookies is provided by [RFC 9018].
//!
//! [RFC 7873]: https://tools.ietf.org/html/rfc7873
//! [RFC 9018]: https://tools.ietf.org/html/rfc9018

use core::hash::{Hash, Hasher};
use core::{fmt, hash};
use std::net::IpAddr;
use octseq::array::Array;
use octseq::builder::OctetsBuilder;
use octseq::parse::Parser;
use siphasher::sip::SipHasher24;
use crate::base::iana::OptionCode;
use crate::base::serial::Serial;
use crate::base::wire::{parse_slice, ParseError};
use crate::utils::base16;
use super::{ComposeOptData, OptData};


//------------ Cookie --------------------------------------------------------

/// Option data for a DNS cookie.
///
/// A value of this type carries two parts: A mandatory [`ClientCookie`] and
/// an optional [`ServerCookie`]. The client cookie is chosen by, yes, the
/// client and added to a request when contacting a specific server for the
/// first time. When responding, a server calculates a server cookie from the
/// client cookie and adds both of them to the response. The client remembers
/// both and includes them in subsequent requests. The server can now check
/// that the the server cookie was indeed calculated by it and treat the
/// repeat customer differently.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Cookie {
    /// The client cookie.
    client: ClientCookie,

    /// The optional server cookie.
    server: Option<ServerCookie>,
}

impl Cookie {
    /// The shortest acceptable length of the option data with a server cookie.
    pub const MIN_FULL_LEN: usize = 16;

    /// The longest acceptable length of the option data.
    pub const MAX_LEN: usize = 40;

    /// Creates a new cookie from client and optional server cookie.
    pub fn new(
        client: ClientCookie,
        server: Option<ServerCookie>
    ) -> Self {
        Cookie { client, server }
    }

    /// Returns the client cookie.
    pub fn client(&self) -> ClientCookie {
        self.client
    }

    /// Returns a reference to the server cookie if present.
    pub fn server(&self) -> Option<&ServerCookie> {
        self.server.as_ref()
    }

    /// Returns whether a length is acceptable for cookie option data.
    ///
    /// This is the case for exactly 8 octets – a client cookie only – and
    /// for 16 to 40 octets – a client cookie and a server cookie of 8 to 32
    /// octets.
    pub fn is_valid_len(len: usize) -> bool {
        len == usize::from(ClientCookie::COMPOSE_LEN)
            || (Self::MIN_FULL_LEN..=Self::MAX_LEN).contains(&len)
    }

    /// Parses the cookie from its wire format.
    ///
    /// The parser must be limited to the option data. All of the remaining
    /// data is taken as the server cookie.
    pub fn parse<Octs: AsRef<[u8]> + ?Sized>(
        parser: &mut Parser<Octs>
    ) -> Result<Self, ParseError> {
        Ok(Cookie::new(
            ClientCookie::parse(parser)?,
            ServerCookie::parse_opt(parser)?,
        ))
    }

    /// Parses the cookie from the complete option data.
    ///
    /// The length of the data is checked before anything is read.
    pub fn from_slice(data: &[u8]) -> Result<Self, ParseError> {
        if !Self::is_valid_len(data.len()) {
            return Err(ParseError::form_error("invalid cookie length"))
        }
        parse_slice(data, Self::parse)
    }
}


//--- OptData

impl OptData for Cookie {
    fn code(&self) -> OptionCode {
        OptionCode::COOKIE
    }
}

impl ComposeOptData for Cookie {
    fn compose_len(&self) -> u16 {
        match self.server.as_ref() {
            // A server cookie is at most 32 octets long.
            Some(server) => ClientCookie::COMPOSE_LEN + server.compose_len(),
            None => ClientCookie::COMPOSE_LEN
        }
    }

    fn compose_option<Target: OctetsBuilder + ?Sized>(
        &self, target: &mut Target
    ) -> Result<(), Target::AppendError> {
        self.client.compose(target)?;
        if let Some(server) = self.server.as_ref() {
            server.compose(target)?;
        }
        Ok(())
    }
}

impl fmt::Display for Cookie {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(&self.client, f)?;
        if let Some(server) = self.server.as_ref() {
            fmt::Display::fmt(server, f)?;
        }
        Ok(())
    }
}


//------------ ClientCookie --------------------------------------------------

/// A client cookie for DNS cookies.
///
/// The client cookies consists of exactly 8 octets. It is generated by a
/// client for each server it sends queries to. It is important to use a
/// different cookie for every server so a server cannot spoof answers for
/// other servers.
///
/// Originally, it was suggested to include the client’s IP address when
/// generating the cookie, but since the address may not be known when
/// originating a request, this has been relaxed and it is now suggested that
/// the cookies is just random data. If the `rand` feature is enabled, the
/// `new_random` constructor can be used to generate such a random cookie.
/// Otherwise, it needs to be created from the octets via
/// [`from_octets`][ClientCookie::from_octets].
#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub struct ClientCookie([u8; 8]);

impl ClientCookie {
    /// Creates a new client cookie from the given octets.
    pub const fn from_octets(octets: [u8; 8]) -> Self {
        Self(octets)
    }

    /// Creates a new random client cookie.
    #[cfg(feature = "rand")]
    pub fn new_random() -> Self {
        Self(rand::random())
    }

    /// Parses a client cookie from its wire format.
    pub fn parse<Octs: AsRef<[u8]> + ?Sized>(
        parser: &mut Parser<Octs>
    ) -> Result<Self, ParseError> {
        let mut res = Self::from_octets([0; 8]);
        parser.parse_buf(res.as_mut())?;
        Ok(res)
    }

    /// The length of the wire format of a client cookie.
    pub const COMPOSE_LEN: u16 = 8;

    /// Appends the wire format of the client cookie to the target.
    pub fn compose<Target: OctetsBuilder + ?Sized>(
        &self, target: &mut Target
    ) -> Result<(), Target::AppendError> {
        target.append_slice(&self.0)
    }

    /// Creates a full cookie with a fresh standard server cookie.
    pub fn create_response(
        self,
        timestamp: Serial,
        client_ip: IpAddr,
        secret: &[u8; 16]
    ) -> Cookie {
        Cookie::new(
            self,
            Some(
                StandardServerCookie::calculate(
                    self, timestamp, client_ip, secret
                ).into()
            )
        )
    }
}

//--- From

impl From<[u8; 8]> for ClientCookie {
    fn from(src: [u8; 8]) -> Self {
        Self::from_octets(src)
    }
}

impl From<ClientCookie> for [u8; 8] {
    fn from(src: ClientCookie) -> Self {
        src.0
    }
}

//--- AsRef and AsMut

impl AsRef<[u8]> for ClientCookie {
    fn as_ref(&self) -> &[u8] {
        self.0.as_ref()
    }
}

impl AsMut<[u8]> for ClientCookie {
    fn as_mut(&mut self) -> &mut [u8] {
        self.0.as_mut()
    }
}

//--- Hash

impl hash::Hash for ClientCookie {
    fn hash<H: hash::Hasher>(&self, state: &mut H) {
        state.write(&self.0)
    }
}

//--- Display

impl fmt::Display for ClientCookie {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        base16::display(self.0.as_ref(), f)
    }
}


//------------ ServerCookie --------------------------------------------------

/// A server cookie for DNS cookies.
///
/// As defined in RFC 7873, the server cookie is of variable length
/// between 8 and 32 octets. This type can hold any of those. Cookies in the
/// interoperable format of [RFC 9018] can be accessed via
/// [`try_to_standard`][Self::try_to_standard].
///
/// [RFC 9018]: https://tools.ietf.org/html/rfc9018
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct ServerCookie(Array<32>);

impl ServerCookie {
    /// Creates a new server cookie from the given octets.
    ///
    /// Returns an error if `octets` is shorter than 8 octets or longer
    /// than 32.
    pub fn from_octets(slice: &[u8]) -> Result<Self, ParseError> {
        parse_slice(slice, Self::parse)
    }

    /// Parses a server cookie from its wire format.
    ///
    /// Takes all the remaining data of the parser.
    pub fn parse<Octs: AsRef<[u8]> + ?Sized>(
        parser: &mut Parser<Octs>
    ) -> Result<Self, ParseError> {
        if parser.remaining() < 8 {
            return Err(ParseError::form_error("short server cookie"))
        }
        let mut res = Array::new();
        res.resize_raw(parser.remaining()).map_err(|_| {
            ParseError::form_error("long server cookie")
        })?;
        parser.parse_buf(res.as_slice_mut())?;
        Ok(Self(res))
    }

    /// Parses an optional server cookie from its wire format.
    pub fn parse_opt<Octs: AsRef<[u8]> + ?Sized>(
        parser: &mut Parser<Octs>
    ) -> Result<Option<Self>, ParseError> {
        if parser.remaining() > 0 {
            Self::parse(parser).map(Some)
        }
        else {
            Ok(None)
        }
    }

    /// Converts the cookie into a standard cookie if possible.
    ///
    /// This is possible if the length of the cookie is 16 octets. Returns
    /// `None` otherwise.
    pub fn try_to_standard(&self) -> Option<StandardServerCookie> {
        TryFrom::try_from(self.0.as_slice()).map(StandardServerCookie).ok()
    }

    /// Returns the length of the wire format of the cookie.
    pub fn compose_len(&self) -> u16 {
        // The array holds at most 32 octets.
        self.0.as_slice().len() as u16
    }

    /// Appends the wire format of the cookie to the target.
    pub fn compose<Target: OctetsBuilder + ?Sized>(
        &self, target: &mut Target
    ) -> Result<(), Target::AppendError> {
        target.append_slice(self.0.as_ref())
    }
}

//--- From

impl From<StandardServerCookie> for ServerCookie {
    fn from(src: StandardServerCookie) -> Self {
        let mut res = Array::new();
        // Sixteen octets always fit.
        let _ = res.append_slice(&src.0);
        Self(res)
    }
}

//--- AsRef

impl AsRef<[u8]> for ServerCookie {
    fn as_ref(&self) -> &[u8] {
        self.0.as_ref()
    }
}

//--- Display

impl fmt::Display for ServerCookie {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        base16::display(self.0.as_ref(), f)
    }
}


//------------ StandardServerCookie ------------------------------------------

/// An interoperable server cookie for DNS cookies.
///
/// This standard server cookie consists of a 1 octet version number
/// (currently 1), 3 reserved octets that must be zero, a 4 octet timestamp
/// as seconds since the Unix epoch, and 8 octets of hash value.
///
/// In version 1, the hash is calculated feeding the SipHash-2-4 that has been
/// initialized with a server secret the concatenation of client cookie,
/// version, reserved, timestamp, client IP address.
///
/// [RFC 9018]: https://tools.ietf.org/html/rfc9018
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct StandardServerCookie(
    // We let this type wrap a u8 array so we can provide AsRef<[u8]> it.
    [u8; 16]
);

impl StandardServerCookie {
    /// The only version of the format currently defined.
    pub const VERSION: u8 = 1;

    /// Creates a new server cookie from the provided components.
    pub fn new(
        version: u8,
        reserved: [u8; 3],
        timestamp: Serial,
        hash: [u8; 8]
    ) -> Self {
        let ts = timestamp.to_be_bytes();
        Self(
            [ version, reserved[0], reserved[1], reserved[2],
              ts[0], ts[1], ts[2], ts[3],
              hash[0], hash[1], hash[2], hash[3],
              hash[4], hash[5], hash[6], hash[7],
            ]
        )
    }

    /// Calculates the server cookie for the given components.
    pub fn calculate(
        client_cookie: ClientCookie,
        timestamp: Serial,
        client_ip: IpAddr,
        secret: &[u8; 16]
    ) -> Self {
        let mut res = Self::new(Self::VERSION, [0; 3], timestamp, [0; 8]);
        res.set_hash(
            res.calculate_hash(client_cookie, client_ip, secret)
        );
        res
    }

    /// Returns the version field of the cookie.
    pub fn version(self) -> u8 {
        self.0[0]
    }

    /// Returns the reserved field of the cookie.
    pub fn reserved(self) -> [u8; 3] {
        [self.0[1], self.0[2], self.0[3]]
    }

    /// Returns the timestamp field of the cookie.
    pub fn timestamp(self) -> Serial {
        Serial::from_be_bytes([self.0[4], self.0[5], self.0[6], self.0[7]])
    }

    /// Returns the hash field of the cookie.
    pub fn hash(self) -> [u8; 8] {
        let mut res = [0u8; 8];
        res.copy_from_slice(&self.0[8..]);
        res
    }

    /// Sets the hash field to the given value.
    pub fn set_hash(&mut self, hash: [u8; 8]) {
        self.0[8..].copy_from_slice(&hash);
    }

    /// Returns whether the hash matches the given client cookie and secret.
    pub fn check_hash(
        self,
        client_cookie: ClientCookie,
        client_ip: IpAddr,
        secret: &[u8; 16]
    ) -> bool {
        self.calculate_hash(client_cookie, client_ip, secret) == self.hash()
    }

    /// Calculates the hash value.
    ///
    /// The method takes the version, reserved, and timestamp fields from
    /// `self` and the rest from the arguments. It returns the hash as an
    /// octets array.
    //
    // XXX The hash implementation for SipHash-2-4 returns the result as
    // a `u64` whereas RFC 9018 assumes it is returned as an octets array in
    // a standard ordering. Somewhat surprisingly, this ordering turns out to
    // be little endian.
    fn calculate_hash(
        self,
        client_cookie: ClientCookie,
        client_ip: IpAddr,
        secret: &[u8; 16]
    ) -> [u8; 8] {
        let mut hasher = SipHasher24::new_with_key(secret);
        client_cookie.hash(&mut hasher);
        hasher.write(&self.0[..8]);
        match client_ip {
            IpAddr::V4(addr) => hasher.write(&addr.octets()),
            IpAddr::V6(addr) => hasher.write(&addr.octets()),
        }
        hasher.finish().to_le_bytes()
    }
}

//--- AsRef

impl AsRef<[u8]> for StandardServerCookie {
    fn as_ref(&self) -> &[u8] {
        self.0.as_ref()
    }
}

//--- Display

impl fmt::Display for StandardServerCookie {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        base16::display(self.0.as_ref(), f)
    }
}


//============ Tests =========================================================

#[cfg(test)]
mod test {
    use super::*;

    fn compose_vec(cookie: &Cookie) -> Vec<u8> {
        let mut res = Vec::new();
        let _ = cookie.compose_option(&mut res);
        res
    }

    #[test]
    #[cfg(feature = "rand")]
    fn random_client_cookie() {
        let one = ClientCookie::new_random();
        let two = ClientCookie::new_random();
        assert_ne!(one, two);
        let cookie = Cookie::new(one, None);
        assert_eq!(compose_vec(&cookie), <[u8; 8]>::from(one));
    }

    #[test]
    fn lengths() {
        for len in 0..=64 {
            let data = vec![0u8; len];
            let res = Cookie::from_slice(&data);
            if len == 8 || (16..=40).contains(&len) {
                let cookie = res.unwrap();
                assert_eq!(usize::from(cookie.compose_len()), len);
                assert_eq!(cookie.server().is_some(), len > 8);
            }
            else {
                assert!(res.is_err(), "length {} accepted", len);
            }
        }
    }

    /// Tests from Appendix A of RFC 9018.
    mod standard_server {
        use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
        use super::*;

        const CLIENT_1: IpAddr = IpAddr::V4(Ipv4Addr::new(198, 51, 100, 100));
        const CLIENT_6: IpAddr = IpAddr::V6(Ipv6Addr::new(
            0x2001, 0xdb8, 0x220, 0x1, 0x59de, 0xd0f4, 0x8769, 0x82b8
        ));

        const SECRET: [u8; 16] = [
            0xe5, 0xe9, 0x73, 0xe5, 0xa6, 0xb2, 0xa4, 0x3f,
            0x48, 0xe7, 0xdc, 0x84, 0x9e, 0x37, 0xbf, 0xcf,
        ];

        /// A.1. Learning a New Server Cookie
        #[test]
        fn new_cookie() {
            let request = Cookie::new(
                ClientCookie::from_octets(
                    [ 0x24, 0x64, 0xc4, 0xab, 0xcf, 0x10, 0xc9, 0x57 ]
                ),
                None
            );
            assert_eq!(
                compose_vec(&request),
                base16::decode_vec("2464c4abcf10c957").unwrap()
            );
            assert_eq!(
                compose_vec(
                    &request.client().create_response(
                        Serial(1559731985), CLIENT_1, &SECRET
                    )
                ),
                base16::decode_vec(
                    "2464c4abcf10c957010000005cf79f111f8130c3eee29480"
                ).unwrap()
            );
        }

        /// A.2.  The Same Client Learning a Renewed (Fresh) Server Cookie
        #[test]
        fn renew_cookie() {
            let request = Cookie::from_slice(
                &base16::decode_vec(
                "2464c4abcf10c957010000005cf79f111f8130c3eee29480"
                ).unwrap()
            ).unwrap();
            let server = request.server().unwrap().try_to_standard().unwrap();
            assert_eq!(server.timestamp(), Serial(1559731985));
            assert!(server.check_hash(request.client(), CLIENT_1, &SECRET));

            assert_eq!(
                compose_vec(
                    &request.client().create_response(
                        Serial(1559734385), CLIENT_1, &SECRET
                    )
                ),
                base16::decode_vec(
                    "2464c4abcf10c957010000005cf7a871d4a564a1442aca77"
                ).unwrap()
            );
        }

        /// A.4.  IPv6 Query with Rolled Over Secret
        #[test]
        fn new_secret() {
            const OLD_SECRET: [u8; 16] = [
                0xdd, 0x3b, 0xdf, 0x93, 0x44, 0xb6, 0x78, 0xb1,
                0x85, 0xa6, 0xf5, 0xcb, 0x60, 0xfc, 0xa7, 0x15,
            ];
            const NEW_SECRET: [u8; 16] = [
                0x44, 0x55, 0x36, 0xbc, 0xd2, 0x51, 0x32, 0x98,
                0x07, 0x5a, 0x5d, 0x37, 0x96, 0x63, 0xc9, 0x62,
            ];

            let request = Cookie::from_slice(
                &base16::decode_vec(
                    "22681ab97d52c298010000005cf7c57926556bd0934c72f8"
                ).unwrap()
            ).unwrap();
            let server = request.server().unwrap().try_to_standard().unwrap();
            assert!(
                !server.check_hash(request.client(), CLIENT_6, &NEW_SECRET)
            );
            assert!(
                server.check_hash(request.client(), CLIENT_6, &OLD_SECRET)
            );

            assert_eq!(
                compose_vec(
                    &request.client().create_response(
                        Serial(1559741961), CLIENT_6, &NEW_SECRET
                    )
                ),
                base16::decode_vec(
                    "22681ab97d52c298010000005cf7c609a6bb79d16625507a"
                ).unwrap()
            );
        }
    }
}
