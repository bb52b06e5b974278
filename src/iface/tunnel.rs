use core::fmt;

use heapless::Vec;

use super::binding_cache::BindingCache;
use crate::config::TUNNEL_ACCEPTOR_COUNT;
use crate::wire::{IpProtocol, Ipv6Address, Ipv6Packet, Ipv6Repr, IPV6_HEADER_LEN};

/// The score an acceptor reports for an exact match: 128 matched address
/// bits for each of the outer addresses. Scores cooperate with
/// longest-match selection between tunnel acceptors, so an exact match
/// always beats any prefix-based one.
pub const EXACT_MATCH_SCORE: u16 = 256;

/// The registry cannot hold another acceptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RegistryFull;

impl fmt::Display for RegistryFull {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tunnel registry full")
    }
}

#[cfg(feature = "std")]
impl std::error::Error for RegistryFull {}

/// A handle to an installed tunnel acceptor, returned by
/// [TunnelRegistry::install] and consumed by [TunnelRegistry::uninstall].
///
/// [TunnelRegistry::install]: struct.TunnelRegistry.html#method.install
/// [TunnelRegistry::uninstall]: struct.TunnelRegistry.html#method.uninstall
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TunnelHandle(usize);

/// A predicate deciding whether an arriving IPv6-in-IPv6 packet belongs
/// to an installed tunnel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TunnelAcceptor {
    /// A mobile node's side of the bidirectional tunnel: accepts packets
    /// the home agent encapsulates toward the current care-of address.
    MobileNode {
        /// The home agent the registration was sent to.
        peer: Ipv6Address,
        /// The care-of address the registration bound.
        care_of: Ipv6Address,
    },
    /// A home agent's side of the reverse tunnel: accepts packets whose
    /// addresses check out against the Binding Cache.
    HomeAgent,
}

impl TunnelAcceptor {
    /// Score an encapsulated packet against this acceptor. Zero means
    /// reject; [EXACT_MATCH_SCORE] means both outer addresses matched
    /// exactly.
    ///
    /// The mobile-node predicate accepts only packets from the
    /// registration's peer to the registration's care-of address. The
    /// home-agent predicate accepts only packets for which a Binding
    /// Cache entry exists, keyed by the inner source (the home address)
    /// and the outer destination, whose registered care-of address
    /// equals the outer source.
    ///
    /// [EXACT_MATCH_SCORE]: constant.EXACT_MATCH_SCORE.html
    pub fn score(
        &self,
        cache: &BindingCache,
        outer_src: &Ipv6Address,
        outer_dst: &Ipv6Address,
        inner_src: &Ipv6Address,
    ) -> u16 {
        match self {
            TunnelAcceptor::MobileNode { peer, care_of } => {
                if outer_src == peer && outer_dst == care_of {
                    EXACT_MATCH_SCORE
                } else {
                    0
                }
            }
            TunnelAcceptor::HomeAgent => {
                match cache.lookup(inner_src, Some(outer_dst), None, None) {
                    Some(entry) if entry.care_of_address == *outer_src => EXACT_MATCH_SCORE,
                    _ => 0,
                }
            }
        }
    }
}

/// The installed tunnel acceptors.
///
/// Each acceptor pairs a validation predicate with the state it needs;
/// [install] returns a handle that [uninstall] takes back. A handle is
/// invalidated by uninstalling it; its slot may be reused by a later
/// install.
///
/// [install]: #method.install
/// [uninstall]: #method.uninstall
#[derive(Debug, Default)]
pub struct TunnelRegistry {
    slots: Vec<Option<TunnelAcceptor>, TUNNEL_ACCEPTOR_COUNT>,
}

impl TunnelRegistry {
    /// Create an empty registry.
    pub fn new() -> TunnelRegistry {
        TunnelRegistry { slots: Vec::new() }
    }

    /// Install an acceptor, returning its handle.
    pub fn install(&mut self, acceptor: TunnelAcceptor) -> Result<TunnelHandle, RegistryFull> {
        if let Some(index) = self.slots.iter().position(|slot| slot.is_none()) {
            self.slots[index] = Some(acceptor);
            return Ok(TunnelHandle(index));
        }
        let index = self.slots.len();
        self.slots.push(Some(acceptor)).map_err(|_| RegistryFull)?;
        Ok(TunnelHandle(index))
    }

    /// Uninstall the acceptor behind `handle`, returning it.
    pub fn uninstall(&mut self, handle: TunnelHandle) -> Option<TunnelAcceptor> {
        self.slots.get_mut(handle.0).and_then(|slot| slot.take())
    }

    /// Return the acceptor behind `handle`.
    pub fn get(&self, handle: TunnelHandle) -> Option<&TunnelAcceptor> {
        self.slots.get(handle.0).and_then(|slot| slot.as_ref())
    }

    /// Return the number of installed acceptors.
    pub fn count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    /// Iterate over the installed acceptors.
    pub fn iter(&self) -> impl Iterator<Item = &TunnelAcceptor> {
        self.slots.iter().filter_map(|slot| slot.as_ref())
    }

    /// Find the best-scoring acceptor for an encapsulated packet, or
    /// `None` when every installed acceptor rejects it.
    pub fn accept(
        &self,
        cache: &BindingCache,
        outer_src: &Ipv6Address,
        outer_dst: &Ipv6Address,
        inner_src: &Ipv6Address,
    ) -> Option<(TunnelHandle, u16)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| {
                let score = slot.as_ref()?.score(cache, outer_src, outer_dst, inner_src);
                if score > 0 {
                    Some((TunnelHandle(index), score))
                } else {
                    None
                }
            })
            .max_by_key(|&(_, score)| score)
    }
}

/// Encapsulate `inner`, a complete IPv6 packet, in an outer IPv6 header
/// from `outer_src` to `outer_dst`, writing the result to `buffer`.
/// Returns the number of octets written.
///
/// This is the output half of the bidirectional tunnel: a mobile node
/// reverse-tunnels its traffic to the home agent this way, and the home
/// agent encapsulates intercepted traffic toward the care-of address.
///
/// # Panics
/// This function panics if `buffer` is shorter than the encapsulated
/// packet.
pub fn encapsulate(
    outer_src: Ipv6Address,
    outer_dst: Ipv6Address,
    hop_limit: u8,
    inner: &[u8],
    buffer: &mut [u8],
) -> usize {
    let repr = Ipv6Repr {
        src_addr: outer_src,
        dst_addr: outer_dst,
        next_header: IpProtocol::Ipv6,
        payload_len: inner.len(),
        hop_limit,
    };
    let mut packet = Ipv6Packet::new_unchecked(&mut buffer[..IPV6_HEADER_LEN + inner.len()]);
    repr.emit(&mut packet);
    packet.payload_mut().copy_from_slice(inner);
    IPV6_HEADER_LEN + inner.len()
}
