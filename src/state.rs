//! The current EDNS configuration shared between workers.
//!
//! Everything the composer and validator need is bundled in an immutable
//! [`Snapshot`]. [`EdnsState`] holds the current snapshot and replaces it
//! atomically on reload or secret rotation. Readers always see a complete
//! snapshot, either the old or the new one.

use std::net::IpAddr;
use std::sync::Arc;
use arc_swap::ArcSwap;
use tracing::debug;
use crate::base::opt::{Opt, OptionSet};
use crate::base::serial::Serial;
use crate::config::EdnsConfig;
use crate::edns::compose::{compose, MessageInfo};
use crate::edns::cookies::{
    CookieSecrets, CookieStatus, CookieValidity, CookieWindow,
};
use crate::edns::tags::TagTable;
use crate::error::ConfigError;


//------------ Snapshot ------------------------------------------------------

/// A checked configuration together with the state derived from it.
#[derive(Clone, Debug)]
pub struct Snapshot {
    /// The configuration.
    config: EdnsConfig,

    /// The cookie time window from the configuration.
    window: CookieWindow,

    /// The cookie secrets.
    secrets: CookieSecrets,

    /// The tag table if tags are enabled.
    tags: Option<Arc<TagTable>>,
}

impl Snapshot {
    /// Creates a snapshot from a configuration.
    ///
    /// This checks the configuration, decodes or generates the cookie
    /// secrets, and builds the tag table.
    pub fn new(config: EdnsConfig) -> Result<Self, ConfigError> {
        let secrets = config.cookies.secrets()?;
        let tags = config.tags.build()?;
        Self::from_parts(config, secrets, tags)
    }

    /// Creates a snapshot from a configuration and prepared parts.
    ///
    /// The configuration’s secrets and tag entries are ignored.
    pub fn from_parts(
        config: EdnsConfig,
        secrets: CookieSecrets,
        tags: Option<TagTable>,
    ) -> Result<Self, ConfigError> {
        config.check()?;
        let window = config.cookies.window()?;
        Ok(Snapshot { config, window, secrets, tags: tags.map(Arc::new) })
    }

    /// Returns the configuration.
    pub fn config(&self) -> &EdnsConfig {
        &self.config
    }

    /// Returns the cookie time window.
    pub fn window(&self) -> &CookieWindow {
        &self.window
    }

    /// Returns the cookie secrets.
    pub fn secrets(&self) -> &CookieSecrets {
        &self.secrets
    }

    /// Returns the tag table if one has been built.
    pub fn tags(&self) -> Option<&TagTable> {
        self.tags.as_deref()
    }

    /// Returns a copy of the snapshot with different secrets.
    #[must_use]
    pub fn with_secrets(&self, secrets: CookieSecrets) -> Self {
        Snapshot { secrets, ..self.clone() }
    }

    /// Validates the data of a cookie option received from `peer`.
    pub fn validate(
        &self, peer: IpAddr, data: &[u8], now: Serial
    ) -> CookieValidity {
        self.cookie_status(peer, data, now).validity()
    }

    /// Determines the detailed status of a received cookie option.
    pub fn cookie_status(
        &self, peer: IpAddr, data: &[u8], now: Serial
    ) -> CookieStatus {
        self.secrets.status(peer, data, now, &self.window)
    }

    /// Composes the options for an outgoing message.
    ///
    /// See [`compose`] for details.
    pub fn compose(
        &self,
        own: &OptionSet,
        peer: &Opt,
        peer_addr: IpAddr,
        now: Serial,
        info: &MessageInfo,
    ) -> Result<OptionSet, ConfigError> {
        compose(own, peer, self, peer_addr, now, info)
    }
}


//------------ EdnsState -----------------------------------------------------

/// The current snapshot, replaceable at runtime.
#[derive(Debug)]
pub struct EdnsState {
    current: ArcSwap<Snapshot>,
}

impl EdnsState {
    /// Creates the state from an initial configuration.
    pub fn new(config: EdnsConfig) -> Result<Self, ConfigError> {
        Snapshot::new(config).map(Self::from_snapshot)
    }

    /// Creates the state from an initial snapshot.
    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        EdnsState { current: ArcSwap::new(Arc::new(snapshot)) }
    }

    /// Loads the current snapshot.
    ///
    /// The snapshot may be replaced by a different thread at any time, so
    /// future calls may return a different one. The returned snapshot stays
    /// valid for as long as it is held.
    pub fn load(&self) -> Arc<Snapshot> {
        self.current.load_full()
    }

    /// Replaces the configuration.
    ///
    /// The new snapshot is published only if the whole configuration is
    /// fine. Otherwise the current snapshot stays in place and the error is
    /// returned.
    ///
    /// If the new configuration doesn’t provide a cookie secret, the
    /// current secrets are kept so that cookies already handed out stay
    /// valid. A secret rotation happening concurrently is not lost.
    pub fn reload(&self, config: EdnsConfig) -> Result<(), ConfigError> {
        let keep_secrets = config.cookies.secret.is_none();
        let secrets = if keep_secrets {
            self.current.load().secrets.clone()
        }
        else {
            config.cookies.secrets()?
        };
        let tags = config.tags.build()?;
        let snapshot = Snapshot::from_parts(config, secrets, tags)?;
        debug!("Publishing new EDNS configuration");
        if keep_secrets {
            self.current.rcu(|current| {
                snapshot.with_secrets(current.secrets.clone())
            });
        }
        else {
            self.current.store(Arc::new(snapshot));
        }
        Ok(())
    }

    /// Makes `secret` the current secret.
    ///
    /// The current secret becomes the previous one and is still accepted
    /// when validating cookies.
    pub fn rotate_secret(&self, secret: [u8; 16]) {
        self.current.rcu(|snapshot| {
            snapshot.with_secrets(snapshot.secrets.rotate(secret))
        });
        debug!("Rotated cookie secret");
    }

    /// Makes a random secret the current secret.
    #[cfg(feature = "rand")]
    pub fn rotate_random_secret(&self) {
        self.rotate_secret(*CookieSecrets::generate().current())
    }

    /// Stops accepting cookies made with the previous secret.
    pub fn retire_previous_secret(&self) {
        self.current.rcu(|snapshot| {
            snapshot.with_secrets(snapshot.secrets.retire_previous())
        });
        debug!("Retired previous cookie secret");
    }
}


//============ Tests =========================================================

#[cfg(test)]
mod test {
    use super::*;
    use std::net::Ipv4Addr;
    use crate::base::opt::cookie::ClientCookie;
    use crate::base::opt::ComposeOptData;
    use crate::config::TagEntry;
    use crate::edns::cookies::mint;

    const SECRET: &str = "00112233445566778899aabbccddeeff";
    const PEER: IpAddr = IpAddr::V4(Ipv4Addr::new(192, 0, 2, 1));
    const NOW: Serial = Serial(1_700_000_000);

    fn config() -> EdnsConfig {
        let mut config = EdnsConfig::default();
        config.cookies.secret = Some(SECRET.into());
        config
    }

    fn cookie(secrets: &CookieSecrets) -> Vec<u8> {
        let mut res = Vec::new();
        let _ = mint(
            ClientCookie::from_octets([1; 8]), PEER, NOW, secrets.current()
        ).compose_option(&mut res);
        res
    }

    #[test]
    fn failed_reload_keeps_snapshot() {
        let state = EdnsState::new(config()).unwrap();
        let mut bad = config();
        bad.tags.enabled = true;
        bad.tags.entries.push(TagEntry::new("not an address", 1));
        assert!(state.reload(bad).is_err());
        assert!(!state.load().config().tags.enabled);

        let mut good = config();
        good.tags.enabled = true;
        good.tags.opcode = 65001;
        good.tags.entries.push(TagEntry::new("198.51.100.0/24", 0x2A));
        state.reload(good).unwrap();
        assert_eq!(
            state.load().tags().unwrap()
                .lookup("198.51.100.1".parse().unwrap()),
            Some(0x2A)
        );
    }

    #[test]
    fn rotation() {
        let state = EdnsState::new(config()).unwrap();
        let old = state.load();
        let data = cookie(old.secrets());

        state.rotate_secret([0x42; 16]);
        let new = state.load();
        assert_eq!(new.secrets().current(), &[0x42; 16]);
        assert_eq!(new.validate(PEER, &data, NOW), CookieValidity::Valid);
        // The old snapshot is unaffected.
        assert!(old.secrets().previous().is_none());

        state.retire_previous_secret();
        assert_eq!(
            state.load().validate(PEER, &data, NOW), CookieValidity::Invalid
        );
    }

    #[test]
    fn reload_during_rotation() {
        let state = EdnsState::new(config()).unwrap();
        std::thread::scope(|scope| {
            scope.spawn(|| {
                for i in 1..=50u8 {
                    state.rotate_secret([i; 16]);
                }
            });
            scope.spawn(|| {
                for i in 0..50 {
                    let mut config = EdnsConfig::default();
                    config.cookies.max_age = 3600 + i;
                    state.reload(config).unwrap();
                }
            });
        });
        let snapshot = state.load();
        assert_eq!(snapshot.secrets().current(), &[50; 16]);
        assert_eq!(snapshot.secrets().previous(), Some(&[49; 16]));
    }

    #[test]
    fn lookups_during_reload() {
        fn tagged(tag: u16) -> EdnsConfig {
            let mut config = config();
            config.tags.enabled = true;
            config.tags.opcode = 65001;
            config.tags.entries = vec![
                TagEntry::new("10.0.0.0/8", 3),
                TagEntry::new("198.51.100.0/24", tag),
                TagEntry::new("2001:db8::/32", tag),
            ];
            config
        }

        let state = EdnsState::new(tagged(1)).unwrap();
        let v4: IpAddr = "198.51.100.7".parse().unwrap();
        let v6: IpAddr = "2001:db8::7".parse().unwrap();
        let other: IpAddr = "10.1.2.3".parse().unwrap();
        std::thread::scope(|scope| {
            for _ in 0..4 {
                scope.spawn(|| {
                    for _ in 0..500 {
                        let snapshot = state.load();
                        let table = snapshot.tags().unwrap();
                        let tag = table.lookup(v4);
                        assert!(tag == Some(1) || tag == Some(2));
                        // Both lookups see the same table.
                        assert_eq!(table.lookup(v6), tag);
                        assert_eq!(table.lookup(other), Some(3));
                        assert_eq!(table.len(), 3);
                    }
                });
            }
            scope.spawn(|| {
                for i in 0..100 {
                    state.reload(tagged(1 + (i % 2))).unwrap();
                }
            });
        });
    }

    #[test]
    fn reload_keeps_secrets() {
        let state = EdnsState::new(config()).unwrap();
        let data = cookie(state.load().secrets());
        let mut config = EdnsConfig::default();
        config.cookies.max_age = 7200;
        config.cookies.secret = None;
        state.reload(config).unwrap();
        let snapshot = state.load();
        assert_eq!(snapshot.window().max_age, 7200);
        assert_eq!(snapshot.validate(PEER, &data, NOW), CookieValidity::Valid);
    }
}
