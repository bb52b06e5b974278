use super::binding_cache::BindingCache;
use super::binding_list::BindingUpdateList;
use super::hint::{HintLimiter, RrHint};
use super::Config;
use crate::time::Instant;
use crate::wire::{
    IpProtocol, Ipv6Address, Ipv6DestOptsHeader, Ipv6DestOptsRepr, Ipv6OptionRepr, Ipv6Packet,
    Ipv6RoutingHeader, MobilityMessage, MobilityPacket, Result as WireResult,
};

// ICMPv6 message types with the high order bit set are informational;
// anything below is an error message. See RFC 4443 section 2.1.
const ICMPV6_INFORMATIONAL: u8 = 0x80;

// A Type 2 Routing Header only ever carries one segment.
const TYPE2_SEGMENTS_LEFT: u8 = 1;

/// Why a packet was silently dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DropReason {
    /// Mobile IPv6 processing is disabled.
    Disabled,
    /// The packet could not be parsed at all.
    Malformed,
    /// The Mobility Header is shorter than its type requires.
    TooShort,
    /// The Mobility Header checksum does not verify.
    Checksum,
    /// Registration signaling arrived without the required protection.
    Unauthenticated,
}

/// What to do with a received Mobility Header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Disposition {
    /// Hand the message to raw-socket delivery.
    Deliver,
    /// Drop, and send an ICMPv6 parameter problem pointing at the octet
    /// at `pointer`, addressed to `reply_to`.
    ///
    /// `reply_to` is the topological (care-of) source when the packet
    /// carried a Home Address option or Type 2 Routing Header without a
    /// confirmed binding, so that an unconfirmed home address is never
    /// echoed back onto the network.
    ParamProblem {
        pointer: u32,
        reply_to: Ipv6Address,
    },
    /// Drop silently.
    Drop(DropReason),
}

/// What to do with a reverse-tunneled packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DecapDisposition<'p> {
    /// Deliver the decapsulated packet to IPv6 input, after putting
    /// `hint` (if any) on the signaling channel.
    Deliver {
        inner: &'p [u8],
        hint: Option<RrHint>,
    },
    /// Drop silently.
    Drop(DropReason),
}

/// Counters over the dispatcher's decisions.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Stats {
    /// Mobility Headers handed to raw delivery.
    pub delivered: u32,
    /// Parameter problem conditions signaled.
    pub param_problem: u32,
    /// Mobility Headers below their type's minimum length.
    pub too_short: u32,
    /// Mobility Header checksum failures.
    pub bad_checksum: u32,
    /// Registration messages dropped for missing protection.
    pub unauthenticated: u32,
    /// Packets dropped as unparseable.
    pub malformed: u32,
    /// Reverse-tunneled packets decapsulated and delivered.
    pub decapsulated: u32,
    /// Return-Routability hints emitted.
    pub hints_emitted: u32,
    /// Return-Routability hints suppressed by the rate limiter.
    pub hints_limited: u32,
}

/// The addresses a packet is attributed to once the Home Address option
/// and the Type 2 Routing Header are accounted for, as opposed to the
/// topological addresses it traveled with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LogicalAddresses {
    /// The source, substituted from a Home Address option if present.
    pub source: Ipv6Address,
    /// The destination, substituted from a Type 2 Routing Header if
    /// present.
    pub destination: Ipv6Address,
    /// Whether a Home Address option substituted the source.
    pub substituted_source: bool,
    /// Whether a Type 2 Routing Header substituted the destination.
    pub substituted_destination: bool,
}

/// Extract the logical source and destination of a complete IPv6 packet,
/// along with the final protocol of its extension header chain and the
/// offset of that protocol's header.
pub(crate) fn parse_headers(data: &[u8]) -> WireResult<(LogicalAddresses, IpProtocol, usize)> {
    let packet = Ipv6Packet::new_checked(data)?;
    let mut addrs = LogicalAddresses {
        source: packet.src_addr(),
        destination: packet.dst_addr(),
        substituted_source: false,
        substituted_destination: false,
    };

    let data = &data[..packet.total_len()];
    let mut next_header = packet.next_header();
    let mut offset = packet.header_len();
    loop {
        match next_header {
            IpProtocol::HopByHop | IpProtocol::Ipv6Opts => {
                let header = Ipv6DestOptsHeader::new_checked(&data[offset..])?;
                if next_header == IpProtocol::Ipv6Opts {
                    let repr = Ipv6DestOptsRepr::parse(&header)?;
                    for opt in repr.options() {
                        if let Ipv6OptionRepr::HomeAddress(home) = opt? {
                            addrs.source = home;
                            addrs.substituted_source = true;
                        }
                    }
                }
                next_header = header.next_header();
                offset += header.total_len();
            }
            IpProtocol::Ipv6Route => {
                // The generic routing header layout: next header and
                // length octets, then the type-specific part the
                // [Ipv6RoutingHeader] wrapper covers.
                if data.len() < offset + 2 {
                    return Err(crate::wire::Error);
                }
                let proto = data[offset];
                let total_len = (data[offset + 1] as usize + 1) * 8;
                let header = Ipv6RoutingHeader::new_checked(
                    data.get(offset + 2..offset + total_len)
                        .ok_or(crate::wire::Error)?,
                )?;
                if header.routing_type() == crate::wire::Ipv6RoutingType::Type2
                    && header.segments_left() == TYPE2_SEGMENTS_LEFT
                {
                    addrs.destination = header.home_address();
                    addrs.substituted_destination = true;
                }
                next_header = IpProtocol::from(proto);
                offset += total_len;
            }
            IpProtocol::Ipv6Frag => {
                // An 8-octet header; the chain continues in this
                // fragment only if it is the first one, but the offsets
                // of interest to us always are.
                let fragment = data.get(offset..offset + 8).ok_or(crate::wire::Error)?;
                next_header = IpProtocol::from(fragment[0]);
                offset += 8;
            }
            _ => break,
        }
        if offset > data.len() {
            return Err(crate::wire::Error);
        }
    }
    Ok((addrs, next_header, offset))
}

/// Extract the logical source and destination of a complete IPv6 packet.
pub fn logical_addresses(data: &[u8]) -> WireResult<LogicalAddresses> {
    parse_headers(data).map(|(addrs, _, _)| addrs)
}

/// Validates and routes incoming Mobility Header messages and
/// reverse-tunneled packets.
///
/// The dispatcher only decides; sending parameter problems, delivering
/// payloads and writing hints to the signaling channel stay with the
/// caller. Failure classes are terminal for the packet that caused them:
/// there is no retry and no partial processing.
#[derive(Debug)]
pub struct Dispatcher {
    config: Config,
    limiter: HintLimiter,
    stats: Stats,
}

impl Dispatcher {
    /// Create a dispatcher with the given configuration.
    pub fn new(config: Config) -> Dispatcher {
        Dispatcher {
            config,
            limiter: HintLimiter::new(),
            stats: Stats::default(),
        }
    }

    /// Return the decision counters.
    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    /// Return the configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Process a received IPv6 packet whose Mobility Header starts at
    /// byte `mh_offset`. `authenticated` tells whether the security
    /// layer authenticated or decrypted this packet.
    pub fn process_mobility(
        &mut self,
        cache: &BindingCache,
        list: &BindingUpdateList,
        data: &[u8],
        mh_offset: usize,
        authenticated: bool,
    ) -> Disposition {
        if !self.config.enabled {
            return Disposition::Drop(DropReason::Disabled);
        }

        let Ok((addrs, _, _)) = parse_headers(data) else {
            self.stats.malformed += 1;
            return Disposition::Drop(DropReason::Malformed);
        };
        let packet = Ipv6Packet::new_unchecked(data);
        let end = packet.total_len();
        if mh_offset + 8 > end {
            self.stats.too_short += 1;
            return Disposition::Drop(DropReason::TooShort);
        }
        let mh = MobilityPacket::new_unchecked(&data[mh_offset..end]);

        // A Mobility Header never carries another protocol; anything
        // else is a protocol violation answered with a parameter problem
        // pointing at the payload proto field.
        if mh.next_header() != IpProtocol::Ipv6NoNxt {
            net_trace!(
                "mobility: payload proto {} from {}",
                mh.next_header(),
                addrs.source
            );
            self.stats.param_problem += 1;
            return Disposition::ParamProblem {
                pointer: mh_offset as u32,
                reply_to: self.param_problem_reply(cache, &packet, &addrs),
            };
        }

        if mh.check_len().is_err() {
            self.stats.too_short += 1;
            return Disposition::Drop(DropReason::TooShort);
        }

        // The checksum covers the pseudo-header built from the logical
        // addresses.
        if !mh.verify_checksum(&addrs.source, &addrs.destination) {
            self.stats.bad_checksum += 1;
            return Disposition::Drop(DropReason::Checksum);
        }

        if self.config.debug {
            net_debug!(
                "mobility: {} from {} (topological {})",
                mh.msg_type(),
                addrs.source,
                packet.src_addr()
            );
        }

        // Registration signaling for a home registration must have come
        // through the security layer; anything else is dropped without a
        // trace on the wire.
        let requires_authentication = match mh.msg_type() {
            MobilityMessage::BindingAck => list
                .lookup(&addrs.destination, &addrs.source, None)
                .map_or(false, |entry| entry.is_home_registration()),
            MobilityMessage::BindingUpdate => mh
                .bu_flags()
                .contains(crate::wire::BindingUpdateFlags::HOME_REGISTRATION),
            _ => false,
        };
        if requires_authentication && !authenticated {
            net_trace!(
                "mobility: unauthenticated registration from {}",
                addrs.source
            );
            self.stats.unauthenticated += 1;
            return Disposition::Drop(DropReason::Unauthenticated);
        }

        self.stats.delivered += 1;
        Disposition::Deliver
    }

    // The source address a parameter problem reply should go to. The
    // logical source is only safe once the binding it claims has been
    // confirmed; before that, replying to it would leak the unconfirmed
    // home address, so the reply goes to the topological source instead.
    fn param_problem_reply(
        &self,
        cache: &BindingCache,
        packet: &Ipv6Packet<&[u8]>,
        addrs: &LogicalAddresses,
    ) -> Ipv6Address {
        let substituted = addrs.substituted_source || addrs.substituted_destination;
        let confirmed = cache
            .lookup(&addrs.source, Some(&addrs.destination), None, None)
            .is_some();
        if substituted && !confirmed {
            packet.src_addr()
        } else {
            addrs.source
        }
    }

    /// Process a packet delivered through the home-agent reverse-tunnel
    /// registration: strip the outer header, and decide whether the
    /// inner packet warrants a Return-Routability hint before delivery.
    ///
    /// Mobility signaling and ICMPv6 errors never trigger a hint. For
    /// anything else, a hint toward the inner packet's logical source is
    /// emitted if the logical destination is one of our registered home
    /// addresses and no binding for the pair exists yet.
    pub fn process_reverse_tunnel<'p>(
        &mut self,
        cache: &BindingCache,
        list: &BindingUpdateList,
        data: &'p [u8],
        timestamp: Instant,
    ) -> DecapDisposition<'p> {
        if !self.config.enabled {
            return DecapDisposition::Drop(DropReason::Disabled);
        }

        let Ok(outer) = Ipv6Packet::new_checked(data) else {
            self.stats.malformed += 1;
            return DecapDisposition::Drop(DropReason::Malformed);
        };
        if outer.next_header() != IpProtocol::Ipv6 {
            self.stats.malformed += 1;
            return DecapDisposition::Drop(DropReason::Malformed);
        }
        let inner = outer.payload();

        let Ok((addrs, final_protocol, final_offset)) = parse_headers(inner) else {
            self.stats.malformed += 1;
            return DecapDisposition::Drop(DropReason::Malformed);
        };
        self.stats.decapsulated += 1;

        // Mobility signaling must not trigger route-optimization
        // signaling of its own, and neither must ICMPv6 errors: hinting
        // on either would answer signaling with signaling.
        match final_protocol {
            IpProtocol::Mobility => {
                return DecapDisposition::Deliver { inner, hint: None };
            }
            IpProtocol::Icmpv6 => {
                match inner.get(final_offset) {
                    Some(&msg_type) if msg_type < ICMPV6_INFORMATIONAL => {
                        return DecapDisposition::Deliver { inner, hint: None };
                    }
                    None => {
                        return DecapDisposition::Deliver { inner, hint: None };
                    }
                    Some(_) => (),
                }
            }
            _ => (),
        }

        let registered = list.lookup_home_registration(&addrs.destination).is_ok();
        let already_bound = cache
            .lookup(&addrs.destination, Some(&addrs.source), None, None)
            .is_some();

        let hint = if registered && !already_bound {
            let hint =
                self.limiter
                    .notify(&self.config, addrs.source, addrs.destination, timestamp);
            match hint {
                Some(_) => self.stats.hints_emitted += 1,
                None => self.stats.hints_limited += 1,
            }
            hint
        } else {
            None
        };

        DecapDisposition::Deliver { inner, hint }
    }
}
