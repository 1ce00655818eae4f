//! Assembling the options of an outgoing message.
//!
//! The composer takes the options the resolver wants to send, the options
//! received from the peer, and the current [`Snapshot`] of configuration
//! and secrets. From these it produces the option list for the OPT record
//! of the outgoing message.
//!
//! Options are added in this order:
//!
//! 1. options from the resolver’s own list this module doesn’t manage,
//! 2. the cookie,
//! 3. the client tag (queries only),
//! 4. the keepalive option (stream transports only),
//! 5. padding.
//!
//! Padding comes last because its length depends on everything else.
//!
//! Nothing the peer sends can make composing fail. A broken cookie from the
//! peer is treated as an invalid one. The only errors are configuration
//! errors.

use std::net::IpAddr;
use tracing::trace;
use crate::base::iana::OptionCode;
use crate::base::opt::cookie::{ClientCookie, Cookie};
use crate::base::opt::keepalive::{IdleTimeout, TcpKeepalive};
use crate::base::opt::{ClientTag, Opt, OptionSet, Padding};
use crate::base::serial::Serial;
use crate::config::InvalidCookiePolicy;
use crate::edns::cookies::CookieStatus;
use crate::error::ConfigError;
use crate::state::Snapshot;


//------------ Direction -----------------------------------------------------

/// The kind of message being composed.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Direction {
    /// A query sent upstream.
    Query,

    /// A response sent to a client.
    Response,
}


//------------ Transport -----------------------------------------------------

/// The transport an outgoing message is sent over.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum Transport {
    /// A datagram transport such as UDP.
    #[default]
    Datagram,

    /// A stream transport such as TCP or TLS.
    Stream,
}


//------------ MessageInfo ---------------------------------------------------

/// What the composer needs to know about the outgoing message.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct MessageInfo {
    /// Whether the message is a query or a response.
    pub direction: Direction,

    /// The transport the message is sent over.
    pub transport: Transport,

    /// Whether the transport is encrypted.
    pub encrypted: bool,

    /// The client cookie to use if a cookie has to be created.
    pub client_cookie: Option<ClientCookie>,

    /// The length of the message without any EDNS options.
    ///
    /// This includes the fixed part of the OPT record.
    pub message_len: usize,
}

impl MessageInfo {
    /// Creates info for a query of the given length over a datagram.
    pub fn query(message_len: usize) -> Self {
        Self::new(Direction::Query, message_len)
    }

    /// Creates info for a response of the given length over a datagram.
    pub fn response(message_len: usize) -> Self {
        Self::new(Direction::Response, message_len)
    }

    fn new(direction: Direction, message_len: usize) -> Self {
        MessageInfo {
            direction,
            transport: Transport::Datagram,
            encrypted: false,
            client_cookie: None,
            message_len,
        }
    }

    /// Sets the transport.
    #[must_use]
    pub fn with_transport(mut self, transport: Transport) -> Self {
        self.transport = transport;
        self
    }

    /// Marks the transport as encrypted.
    #[must_use]
    pub fn with_encryption(mut self) -> Self {
        self.encrypted = true;
        self
    }

    /// Sets the client cookie for creating new cookies.
    #[must_use]
    pub fn with_client_cookie(mut self, cookie: ClientCookie) -> Self {
        self.client_cookie = Some(cookie);
        self
    }
}


//------------ compose -------------------------------------------------------

/// Composes the options for an outgoing message.
///
/// The `own` options are those the resolver wants to include. The `peer`
/// options are those of the message received from `peer_addr` that the
/// outgoing message relates to.
pub fn compose(
    own: &OptionSet,
    peer: &Opt,
    snapshot: &Snapshot,
    peer_addr: IpAddr,
    now: Serial,
    info: &MessageInfo,
) -> Result<OptionSet, ConfigError> {
    let config = snapshot.config();
    let tag_code = match (config.tags.enabled, info.direction) {
        (true, Direction::Query) => {
            Some(snapshot.tags().ok_or(ConfigError::TagsNotBuilt)?.opcode())
        }
        _ => None,
    };

    let mut res: OptionSet = own.iter().filter(|opt| {
        !is_managed(opt.code(), snapshot, tag_code)
    }).cloned().collect();

    if let Some(cookie) = cookie(own, peer, snapshot, peer_addr, now, info) {
        res.push_data(&cookie);
    }

    if let Some(code) = tag_code {
        if let Some(tag) = snapshot.tags().and_then(|t| t.lookup(peer_addr)) {
            trace!("Adding client tag {:#06x} for {}", tag, peer_addr);
            res.push_data(&ClientTag::new(code, tag));
        }
    }

    if let Some(keepalive) = keepalive(peer, snapshot, info) {
        res.push_data(&keepalive);
    }

    if let Some(padding) = padding(&res, peer, snapshot, info) {
        res.push_data(&padding);
    }

    Ok(res)
}

/// Returns whether an option of the own list is replaced by the composer.
fn is_managed(
    code: OptionCode, snapshot: &Snapshot, tag_code: Option<OptionCode>
) -> bool {
    code == OptionCode::COOKIE
        || code == OptionCode::PADDING
        || (code == OptionCode::TCP_KEEPALIVE
            && snapshot.config().keepalive.enabled)
        || Some(code) == tag_code
}


//------------ Cookie --------------------------------------------------------

/// Determines the cookie to send, if any.
fn cookie(
    own: &OptionSet,
    peer: &Opt,
    snapshot: &Snapshot,
    peer_addr: IpAddr,
    now: Serial,
    info: &MessageInfo,
) -> Option<Cookie> {
    let cookies = &snapshot.config().cookies;
    let enabled = match info.direction {
        Direction::Query => cookies.query_cookies,
        Direction::Response => cookies.answer_cookies,
    };
    if !enabled {
        return None
    }

    if let Some(data) = peer.first(OptionCode::COOKIE) {
        return peer_cookie(data, snapshot, peer_addr, now)
    }

    if let Some(data) = own.first(OptionCode::COOKIE) {
        match Cookie::from_slice(data.data()) {
            Ok(cookie) => return Some(cookie),
            Err(_) => {
                trace!("Ignoring own cookie option of length {}",
                    data.data().len()
                );
            }
        }
    }

    info.client_cookie.map(|client| {
        snapshot.secrets().mint(client, peer_addr, now)
    })
}

/// Determines the cookie to send in reaction to the peer’s cookie.
fn peer_cookie(
    data: &[u8],
    snapshot: &Snapshot,
    peer_addr: IpAddr,
    now: Serial,
) -> Option<Cookie> {
    let status = snapshot.cookie_status(peer_addr, data, now);
    let client = ClientCookie::from_octets(data.get(..8)?.try_into().ok()?);
    match status {
        CookieStatus::Valid => {
            // Valid means the data parses.
            Cookie::from_slice(data).ok()
        }
        CookieStatus::ValidRenew => {
            trace!("Renewing server cookie for {}", client);
            Some(snapshot.secrets().mint(client, peer_addr, now))
        }
        _ => {
            match snapshot.config().cookies.on_invalid {
                InvalidCookiePolicy::Remint => {
                    Some(snapshot.secrets().mint(client, peer_addr, now))
                }
                InvalidCookiePolicy::ClientOnly => {
                    Some(Cookie::new(client, None))
                }
            }
        }
    }
}


//------------ Keepalive -----------------------------------------------------

/// Determines the keepalive option to send, if any.
///
/// Over stream transports, queries carry the option without a timeout to
/// signal support. Responses carry the timeout if the query had the option.
fn keepalive(
    peer: &Opt,
    snapshot: &Snapshot,
    info: &MessageInfo,
) -> Option<TcpKeepalive> {
    let config = &snapshot.config().keepalive;
    if !config.enabled || info.transport != Transport::Stream {
        return None
    }
    match info.direction {
        Direction::Query => Some(TcpKeepalive::new(None)),
        Direction::Response => {
            if peer.contains(OptionCode::TCP_KEEPALIVE) {
                Some(TcpKeepalive::new(Some(
                    IdleTimeout::from_millis_saturating(
                        config.timeout_ms.into()
                    )
                )))
            }
            else {
                None
            }
        }
    }
}


//------------ Padding -------------------------------------------------------

/// Determines the padding option to send, if any.
///
/// Responses are only padded if the query carried a padding option.
fn padding(
    options: &OptionSet,
    peer: &Opt,
    snapshot: &Snapshot,
    info: &MessageInfo,
) -> Option<Padding> {
    let config = &snapshot.config().padding;
    if !config.enabled || (config.encrypted_only && !info.encrypted) {
        return None
    }
    let block = match info.direction {
        Direction::Query => config.query_block_size,
        Direction::Response => {
            if !peer.contains(OptionCode::PADDING) {
                return None
            }
            config.response_block_size
        }
    };
    Padding::for_block(info.message_len + options.compose_len(), block)
}


//============ Tests =========================================================

#[cfg(test)]
mod test {
    use super::*;
    use std::net::Ipv4Addr;
    use crate::base::opt::{ComposeOptData, EdnsOption};
    use crate::config::{EdnsConfig, TagEntry};
    use crate::edns::cookies::{mint, CookieSecrets, CookieValidity};
    use crate::utils::base16;

    const SECRET: [u8; 16] = [
        0x00, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77,
        0x88, 0x99, 0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff,
    ];
    const PEER: IpAddr = IpAddr::V4(Ipv4Addr::new(192, 0, 2, 1));
    const CLIENT: ClientCookie = ClientCookie::from_octets(
        [1, 2, 3, 4, 5, 6, 7, 8]
    );
    const NOW: Serial = Serial(1_700_000_000);

    fn snapshot(config: EdnsConfig) -> Snapshot {
        Snapshot::from_parts(
            config.clone(), CookieSecrets::new(SECRET, None),
            config.tags.build().unwrap()
        ).unwrap()
    }

    fn peer_opts(code: OptionCode, data: &[u8]) -> Vec<u8> {
        let mut res = OptionSet::new();
        res.push(EdnsOption::new(code, data.to_vec()).unwrap());
        res.to_vec()
    }

    fn cookie_data(set: &OptionSet) -> Option<&[u8]> {
        set.first(OptionCode::COOKIE).map(EdnsOption::data)
    }

    fn minted(ts: Serial) -> Vec<u8> {
        let mut res = Vec::new();
        let _ = mint(CLIENT, PEER, ts, &SECRET).compose_option(&mut res);
        res
    }

    #[test]
    fn pass_through() {
        let snapshot = snapshot(EdnsConfig::default());
        let mut own = OptionSet::new();
        own.push(EdnsOption::new(OptionCode::NSID, &b"ns1"[..]).unwrap());
        own.push(EdnsOption::new(OptionCode::PADDING, vec![0u8; 10]).unwrap());
        own.push(
            EdnsOption::new(OptionCode::from_int(65001), vec![0u8, 1]).unwrap()
        );
        let res = compose(
            &own, &Opt::empty(), &snapshot, PEER, NOW,
            &MessageInfo::query(100)
        ).unwrap();
        assert_eq!(res.len(), 2);
        assert!(res.contains(OptionCode::NSID));
        assert!(res.contains(OptionCode::from_int(65001)));
        assert!(!res.contains(OptionCode::PADDING));
    }

    #[test]
    fn mint_for_client_cookie() {
        let snapshot = snapshot(EdnsConfig::default());
        let res = compose(
            &OptionSet::new(), &Opt::empty(), &snapshot, PEER, NOW,
            &MessageInfo::response(100).with_client_cookie(CLIENT)
        ).unwrap();
        let data = cookie_data(&res).unwrap();
        assert_eq!(data.len(), 24);
        assert_eq!(data[8..16], base16::decode_vec("010000006553F100").unwrap());
        assert_eq!(
            snapshot.validate(PEER, data, NOW), CookieValidity::Valid
        );

        // Cookies on queries are off by default.
        let res = compose(
            &OptionSet::new(), &Opt::empty(), &snapshot, PEER, NOW,
            &MessageInfo::query(100).with_client_cookie(CLIENT)
        ).unwrap();
        assert!(res.is_empty());
    }

    #[test]
    fn echo_valid_cookie() {
        let snapshot = snapshot(EdnsConfig::default());
        let minted = minted(NOW);
        let peer = peer_opts(OptionCode::COOKIE, &minted);
        let res = compose(
            &OptionSet::new(), &Opt::from_slice(&peer).unwrap(), &snapshot,
            PEER, NOW.add(60), &MessageInfo::response(100)
        ).unwrap();
        assert_eq!(cookie_data(&res), Some(minted.as_slice()));
    }

    #[test]
    fn renew_old_cookie() {
        let snapshot = snapshot(EdnsConfig::default());
        let peer = peer_opts(OptionCode::COOKIE, &minted(NOW));
        let later = NOW.add(2000);
        let res = compose(
            &OptionSet::new(), &Opt::from_slice(&peer).unwrap(), &snapshot,
            PEER, later, &MessageInfo::response(100)
        ).unwrap();
        assert_eq!(cookie_data(&res), Some(minted(later).as_slice()));
    }

    #[test]
    fn invalid_cookie_policies() {
        let mut config = EdnsConfig::default();
        let peer = peer_opts(OptionCode::COOKIE, &minted(NOW)[..20]);
        let peer = Opt::from_slice(&peer).unwrap();

        let res = compose(
            &OptionSet::new(), &peer, &snapshot(config.clone()), PEER, NOW,
            &MessageInfo::response(100)
        ).unwrap();
        assert_eq!(cookie_data(&res), Some(minted(NOW).as_slice()));

        config.cookies.on_invalid = InvalidCookiePolicy::ClientOnly;
        let res = compose(
            &OptionSet::new(), &peer, &snapshot(config), PEER, NOW,
            &MessageInfo::response(100)
        ).unwrap();
        assert_eq!(cookie_data(&res), Some(&[1u8, 2, 3, 4, 5, 6, 7, 8][..]));
    }

    #[test]
    fn malformed_cookie() {
        let snapshot = snapshot(EdnsConfig::default());
        // Too long: the client cookie is still used.
        let peer = peer_opts(OptionCode::COOKIE, &[7; 41]);
        let res = compose(
            &OptionSet::new(), &Opt::from_slice(&peer).unwrap(), &snapshot,
            PEER, NOW, &MessageInfo::response(100)
        ).unwrap();
        assert_eq!(cookie_data(&res).unwrap()[..8], [7u8; 8]);

        // Too short for a client cookie: nothing.
        let peer = peer_opts(OptionCode::COOKIE, &[7; 5]);
        let res = compose(
            &OptionSet::new(), &Opt::from_slice(&peer).unwrap(), &snapshot,
            PEER, NOW, &MessageInfo::response(100).with_client_cookie(CLIENT)
        ).unwrap();
        assert!(res.is_empty());
    }

    #[test]
    fn own_cookie() {
        let mut config = EdnsConfig::default();
        config.cookies.query_cookies = true;
        let snapshot = snapshot(config);
        let mut own = OptionSet::new();
        own.push(EdnsOption::new(OptionCode::COOKIE, vec![9u8; 8]).unwrap());
        let res = compose(
            &own, &Opt::empty(), &snapshot, PEER, NOW,
            &MessageInfo::query(100).with_client_cookie(CLIENT)
        ).unwrap();
        assert_eq!(res.len(), 1);
        assert_eq!(cookie_data(&res), Some(&[9u8; 8][..]));
    }

    #[test]
    fn client_tags() {
        let mut config = EdnsConfig::default();
        config.tags.enabled = true;
        config.tags.opcode = 65001;
        config.tags.entries.push(TagEntry::new("198.51.100.0/24", 0x2A));
        let snapshot = snapshot(config);
        let code = OptionCode::from_int(65001);

        let addr = "198.51.100.77".parse().unwrap();
        let res = compose(
            &OptionSet::new(), &Opt::empty(), &snapshot, addr, NOW,
            &MessageInfo::query(100)
        ).unwrap();
        assert_eq!(res.first(code).map(EdnsOption::data), Some(&[0, 0x2A][..]));

        let res = compose(
            &OptionSet::new(), &Opt::empty(), &snapshot, PEER, NOW,
            &MessageInfo::query(100)
        ).unwrap();
        assert!(res.is_empty());

        let res = compose(
            &OptionSet::new(), &Opt::empty(), &snapshot, addr, NOW,
            &MessageInfo::response(100)
        ).unwrap();
        assert!(!res.contains(code));
    }

    #[test]
    fn tags_not_built() {
        let mut config = EdnsConfig::default();
        config.tags.enabled = true;
        let snapshot = Snapshot::from_parts(
            config, CookieSecrets::new(SECRET, None), None
        ).unwrap();
        assert_eq!(
            compose(
                &OptionSet::new(), &Opt::empty(), &snapshot, PEER, NOW,
                &MessageInfo::query(100)
            ),
            Err(ConfigError::TagsNotBuilt)
        );
    }

    #[test]
    fn keepalive_option() {
        let mut config = EdnsConfig::default();
        config.keepalive.enabled = true;
        let snapshot = snapshot(config);
        let peer = peer_opts(OptionCode::TCP_KEEPALIVE, b"");
        let peer = Opt::from_slice(&peer).unwrap();
        let stream = MessageInfo::response(100)
            .with_transport(Transport::Stream);

        let res = compose(
            &OptionSet::new(), &peer, &snapshot, PEER, NOW, &stream
        ).unwrap();
        assert_eq!(
            res.first(OptionCode::TCP_KEEPALIVE).map(EdnsOption::data),
            Some(&[0x04, 0xb0][..])
        );

        let res = compose(
            &OptionSet::new(), &peer, &snapshot, PEER, NOW,
            &MessageInfo::response(100)
        ).unwrap();
        assert!(res.is_empty());

        let res = compose(
            &OptionSet::new(), &Opt::empty(), &snapshot, PEER, NOW, &stream
        ).unwrap();
        assert!(res.is_empty());

        let res = compose(
            &OptionSet::new(), &Opt::empty(), &snapshot, PEER, NOW,
            &MessageInfo::query(100).with_transport(Transport::Stream)
        ).unwrap();
        assert_eq!(
            res.first(OptionCode::TCP_KEEPALIVE).map(EdnsOption::data),
            Some(&b""[..])
        );
    }

    #[test]
    fn padding_last() {
        let mut config = EdnsConfig::default();
        config.padding.enabled = true;
        let snapshot = snapshot(config);
        let info = MessageInfo::response(100).with_client_cookie(CLIENT);

        // Not encrypted, no padding.
        let res = compose(
            &OptionSet::new(), &Opt::empty(), &snapshot, PEER, NOW, &info
        ).unwrap();
        assert!(!res.contains(OptionCode::PADDING));

        let info = info.with_encryption();
        let peer = peer_opts(OptionCode::PADDING, &[0; 30]);
        let res = compose(
            &OptionSet::new(), &Opt::from_slice(&peer).unwrap(), &snapshot,
            PEER, NOW, &info
        ).unwrap();
        assert_eq!(res.iter().last().unwrap().code(), OptionCode::PADDING);
        assert_eq!((info.message_len + res.compose_len()) % 468, 0);
    }

    #[test]
    fn padding_follows_query() {
        let mut config = EdnsConfig::default();
        config.padding.enabled = true;
        let snapshot = snapshot(config);

        // A response to a query without padding stays unpadded.
        let res = compose(
            &OptionSet::new(), &Opt::empty(), &snapshot, PEER, NOW,
            &MessageInfo::response(100).with_encryption()
        ).unwrap();
        assert!(!res.contains(OptionCode::PADDING));

        // Queries are padded on our own account.
        let res = compose(
            &OptionSet::new(), &Opt::empty(), &snapshot, PEER, NOW,
            &MessageInfo::query(100).with_encryption()
        ).unwrap();
        assert!(res.contains(OptionCode::PADDING));
        assert_eq!((100 + res.compose_len()) % 128, 0);
    }
}
