/*! The interface module deals with the protocol state Mobile IPv6 keeps
between packets.

Three stores carry that state: the [BindingCache] a correspondent node or
home agent keeps for remote mobile nodes, the [BindingUpdateList] a mobile
node keeps for its own registrations, and the [TunnelRegistry] of
installed IPv6-in-IPv6 acceptors. The [Dispatcher] validates and routes
incoming Mobility Header messages and reverse-tunneled packets, consulting
the stores and emitting [RrHint] signals through the rate-limited
[HintLimiter].

Each store is an independent value mutated through `&mut self`: an
exclusive borrow is the critical section, held for exactly one operation
and released on every exit path. Callers that run packet-receive and
control-plane work concurrently wrap each store in its own lock; no
operation ever needs two stores locked at once unless its signature
borrows both.

[BindingCache]: struct.BindingCache.html
[BindingUpdateList]: struct.BindingUpdateList.html
[TunnelRegistry]: struct.TunnelRegistry.html
[Dispatcher]: struct.Dispatcher.html
[RrHint]: struct.RrHint.html
[HintLimiter]: struct.HintLimiter.html
*/

mod binding_cache;
mod binding_list;
mod dad;
mod hint;
mod mobility;
mod neighbor;
mod tunnel;

use core::fmt;

use crate::wire::Ipv6Address;

pub use self::binding_cache::{BindingCache, BindingCacheEntry, CacheError};
pub use self::binding_list::{
    BindingState, BindingUpdateEntry, BindingUpdateList, HomeAddress, HomeAddressFlags, ListError,
};
pub use self::dad::{DadError, DadTable};
pub use self::hint::{HintLimiter, RrHint};
pub use self::mobility::{
    logical_addresses, DecapDisposition, Dispatcher, Disposition, DropReason, LogicalAddresses,
    Stats,
};
pub use self::neighbor::{Neighbor, NeighborCache, NeighborState};
pub use self::tunnel::{
    encapsulate, RegistryFull, TunnelAcceptor, TunnelHandle, TunnelRegistry, EXACT_MATCH_SCORE,
};

/// An opaque identifier of a local network interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InterfaceId(pub u8);

impl fmt::Display for InterfaceId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "if{}", self.0)
    }
}

bitflags::bitflags! {
    /// Flags describing a binding, stored by both the Binding Cache and
    /// the Binding Update List.
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct BindingFlags: u8 {
        /// The binding is registered with the node's home agent.
        const HOME_REGISTRATION = 0b0000_0001;
        /// The binding belongs to a mobile router.
        const ROUTER = 0b0000_0010;
    }
}

/// Subsystem configuration, consumed read-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    /// Whether Mobile IPv6 processing is enabled at all.
    pub enabled: bool,
    /// Whether to trace per-packet decisions.
    pub debug: bool,
    /// Ceiling on emitted Return-Routability hints, in packets per
    /// second.
    pub hint_rate_limit: u32,
    /// Use the experimental "migrate" form of security-database updates.
    pub migrate: bool,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            enabled: true,
            debug: false,
            hint_rate_limit: 10,
            migrate: false,
        }
    }
}

/// An error reported by the surrounding stack for a requested service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ServiceError;

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "stack service failed")
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ServiceError {}

/// Services the surrounding IPv6 stack renders to this subsystem.
///
/// The stores call these while applying the side effects of a binding:
/// proxy host routes that answer neighbor solicitations for a home
/// address, security-policy database updates, and duplicate address
/// detection runs. Implementations must not block; every method is called
/// from inside a store's critical section.
pub trait StackServices {
    /// Install a host route for `home`, through `iface`, that answers
    /// neighbor solicitations on the mobile node's behalf.
    fn install_proxy_route(
        &mut self,
        home: Ipv6Address,
        iface: InterfaceId,
    ) -> Result<(), ServiceError>;

    /// Remove the proxy host route for `home`.
    fn remove_proxy_route(
        &mut self,
        home: Ipv6Address,
        iface: InterfaceId,
    ) -> Result<(), ServiceError>;

    /// Tell the security-policy database that `home` is now bound to
    /// `care_of` with respect to `peer`.
    fn security_bind(
        &mut self,
        home: Ipv6Address,
        care_of: Ipv6Address,
        peer: Ipv6Address,
        migrate: bool,
    );

    /// Tell the security-policy database that the binding of `home` to
    /// `care_of` with respect to `peer` is gone.
    fn security_unbind(&mut self, home: Ipv6Address, care_of: Ipv6Address, peer: Ipv6Address);

    /// Start duplicate address detection for `addr` on `iface`.
    fn start_dad(&mut self, addr: Ipv6Address, iface: InterfaceId);

    /// Cancel duplicate address detection for `addr` on `iface`.
    fn stop_dad(&mut self, addr: Ipv6Address, iface: InterfaceId);
}

#[cfg(test)]
pub(crate) mod mock {
    use super::*;
    use std::vec::Vec;

    /// What a mock service call was asked to do.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum ServiceCall {
        InstallProxyRoute(Ipv6Address, InterfaceId),
        RemoveProxyRoute(Ipv6Address, InterfaceId),
        SecurityBind(Ipv6Address, Ipv6Address, Ipv6Address, bool),
        SecurityUnbind(Ipv6Address, Ipv6Address, Ipv6Address),
        StartDad(Ipv6Address, InterfaceId),
        StopDad(Ipv6Address, InterfaceId),
    }

    /// A `StackServices` implementation recording every call, optionally
    /// failing route operations.
    #[derive(Debug, Default)]
    pub struct MockServices {
        pub calls: Vec<ServiceCall>,
        pub fail_routes: bool,
    }

    impl MockServices {
        pub fn new() -> MockServices {
            MockServices::default()
        }
    }

    impl StackServices for MockServices {
        fn install_proxy_route(
            &mut self,
            home: Ipv6Address,
            iface: InterfaceId,
        ) -> Result<(), ServiceError> {
            self.calls.push(ServiceCall::InstallProxyRoute(home, iface));
            if self.fail_routes {
                Err(ServiceError)
            } else {
                Ok(())
            }
        }

        fn remove_proxy_route(
            &mut self,
            home: Ipv6Address,
            iface: InterfaceId,
        ) -> Result<(), ServiceError> {
            self.calls.push(ServiceCall::RemoveProxyRoute(home, iface));
            if self.fail_routes {
                Err(ServiceError)
            } else {
                Ok(())
            }
        }

        fn security_bind(
            &mut self,
            home: Ipv6Address,
            care_of: Ipv6Address,
            peer: Ipv6Address,
            migrate: bool,
        ) {
            self.calls
                .push(ServiceCall::SecurityBind(home, care_of, peer, migrate));
        }

        fn security_unbind(&mut self, home: Ipv6Address, care_of: Ipv6Address, peer: Ipv6Address) {
            self.calls
                .push(ServiceCall::SecurityUnbind(home, care_of, peer));
        }

        fn start_dad(&mut self, addr: Ipv6Address, iface: InterfaceId) {
            self.calls.push(ServiceCall::StartDad(addr, iface));
        }

        fn stop_dad(&mut self, addr: Ipv6Address, iface: InterfaceId) {
            self.calls.push(ServiceCall::StopDad(addr, iface));
        }
    }
}
