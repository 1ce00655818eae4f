//! DNS EDNS0 option codes.

//------------ OptionCode ----------------------------------------------------

int_enum! {
    /// DNS EDNS0 option codes.
    ///
    /// The record data of OPT records is a sequence of options. The type of
    /// each of these options is given through a 16 bit value called *option
    /// code.*
    ///
    /// Only the codes relevant to base EDNS processing are named here. All
    /// other values can still be represented via
    /// [`from_int`][OptionCode::from_int].
    ///
    /// [IANA registry]: http://www.iana.org/assignments/dns-parameters/dns-parameters.xhtml#dns-parameters-11
    =>
    OptionCode, u16;

    /// Name server identifier (NSID, 3).
    ///
    /// The NSID option allows a name server to include an indentifier in an
    /// answer for diagnostic purposes. The options in defined in [RFC 5001].
    ///
    /// [RFC 5001]: https://tools.ietf.org/html/rfc5001
    (NSID => 3, "NSID")

    /// EDNS client subnet (8),
    ///
    /// The EDSN client subnet option allows a resolver to identify the IP
    /// address subnet it queries from so that a server can determine the best
    /// answer. This option is defined in [RFC 7871].
    ///
    /// [RFC 7871]: https://tools.ietf.org/html/rfc7871
    (CLIENT_SUBNET => 8, "edns-client-subnet")

    /// DNS Cookie (10).
    ///
    /// The cookie option allows clients and server to exchange session
    /// cookies as a mechanism for protecting agains denial-of-service and
    /// amplification attacks. The option is defined in [RFC 7873].
    ///
    /// [RFC 7873]: https://tools.ietf.org/html/rfc7873
    (COOKIE => 10, "COOKIE")

    /// edns-tcp-keepalive (11).
    ///
    /// This option allows DNS servers to signal to a client for how long they
    /// may hold open a TCP connection. The option is defined in [RFC 7828].
    ///
    /// [RFC 7828]: https://tools.ietf.org/html/rfc7828
    (TCP_KEEPALIVE => 11, "edns-tcp-keepalive")

    /// Padding (12).
    ///
    /// The padding option allows clients and servers to pad their messages
    /// with extra data to make it harder to guess content based on length.
    /// The option is defined in [RFC 7830].
    ///
    /// [RFC 7830]: https://tools.ietf.org/html/rfc7830
    (PADDING => 12, "Padding")

    /// Extended DNS Error (15).
    ///
    /// This option allows the server to return additional information
    /// about the cause of DNS errors. The option is defined in [RFC 8914].
    ///
    /// [RFC 8914]: https://tools.ietf.org/html/rfc8914
    (EXTENDED_ERROR => 15, "Extended DNS Error")

    /// EDNS client tag (16).
    ///
    /// The client tag option allows a client to send arbitrary additional
    /// data to a server. The option is defined in the now expired
    /// [draft-bellis-dnsop-edns-tags].
    ///
    /// [draft-bellis-dnsop-edns-tags]: https://datatracker.ietf.org/doc/draft-bellis-dnsop-edns-tags/
    (CLIENT_TAG => 16, "EDNS-Client-Tag")
}

int_enum_str_with_decimal!(OptionCode, u16, "unknown option code");

impl OptionCode {
    /// Returns whether the code is unavailable for client tags.
    ///
    /// This is true for the reserved values 0 and 65535 as well as for the
    /// codes of all options whose content is generated by this crate
    /// itself: cookies, edns-tcp-keepalive, and padding.
    pub fn is_reserved_for_tags(self) -> bool {
        matches!(self.to_int(), 0 | 0xFFFF)
            || self == OptionCode::COOKIE
            || self == OptionCode::TCP_KEEPALIVE
            || self == OptionCode::PADDING
    }
}


//============ Tests =========================================================

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn mnemonics() {
        assert_eq!("cookie".parse::<OptionCode>().unwrap(), OptionCode::COOKIE);
        assert_eq!("65001".parse::<OptionCode>().unwrap().to_int(), 65001);
        assert!("nonsense".parse::<OptionCode>().is_err());
        assert_eq!(format!("{}", OptionCode::PADDING), "Padding(12)");
        assert_eq!(format!("{}", OptionCode::from_int(65001)), "65001");
    }

    #[test]
    fn reserved_for_tags() {
        assert!(OptionCode::from_int(0).is_reserved_for_tags());
        assert!(OptionCode::from_int(0xFFFF).is_reserved_for_tags());
        assert!(OptionCode::COOKIE.is_reserved_for_tags());
        assert!(OptionCode::PADDING.is_reserved_for_tags());
        assert!(!OptionCode::CLIENT_TAG.is_reserved_for_tags());
        assert!(!OptionCode::from_int(65001).is_reserved_for_tags());
    }
}
