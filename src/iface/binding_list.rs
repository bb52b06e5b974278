use core::fmt;

use heapless::Vec;

use super::tunnel::{TunnelAcceptor, TunnelHandle, TunnelRegistry};
use super::{BindingFlags, Config, InterfaceId, StackServices};
use crate::config::{BINDING_UPDATE_ENTRY_COUNT, HOME_ADDRESS_COUNT};
use crate::wire::Ipv6Address;

/// An error returned by a Binding Update List operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ListError {
    /// The home address is not a registered local home address.
    AddressNotLocal,
    /// No entry matches the given key.
    NotFound,
    /// The list cannot hold another home address or entry.
    Exhausted,
    /// The peer or care-of address is unspecified or multicast.
    InvalidAddress,
    /// The tunnel acceptor for a home registration could not be
    /// installed; the entry was torn back down.
    Tunnel,
}

impl fmt::Display for ListError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListError::AddressNotLocal => write!(f, "not a local home address"),
            ListError::NotFound => write!(f, "no matching registration"),
            ListError::Exhausted => write!(f, "binding update list full"),
            ListError::InvalidAddress => write!(f, "invalid peer or care-of address"),
            ListError::Tunnel => write!(f, "tunnel acceptor installation failed"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ListError {}

bitflags::bitflags! {
    /// Flags describing a local home address record.
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct HomeAddressFlags: u8 {
        /// The address is configured as a home address.
        const HOME_ADDRESS = 0b0000_0001;
        /// The node is topologically attached to its home link.
        const AT_HOME = 0b0000_0010;
        /// The node is in the middle of deregistering this address.
        const DEREGISTERING = 0b0000_0100;
    }
}

/// A local home address record: the anchor every Binding Update List
/// entry for that home address hangs off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct HomeAddress {
    pub address: Ipv6Address,
    /// The mobile interface the home address is configured on.
    pub interface: InterfaceId,
    pub flags: HomeAddressFlags,
}

/// The registration state of a Binding Update List entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BindingState {
    /// A Binding Update has been sent, no acknowledgement yet.
    Registering,
    /// The binding is acknowledged and in use.
    Bound,
    /// A de-registration has been sent.
    Deregistering,
}

/// One outstanding registration a mobile node has sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BindingUpdateEntry {
    /// The correspondent node or home agent the registration went to.
    pub peer_address: Ipv6Address,
    /// The home address the registration is for.
    pub home_address: Ipv6Address,
    /// The care-of address the registration bound.
    pub care_of_address: Ipv6Address,
    pub flags: BindingFlags,
    pub state: BindingState,
    /// Distinguishes simultaneous care-of addresses for one home
    /// address.
    pub binding_id: Option<u16>,
    /// The tunnel acceptor a home registration owns.
    pub tunnel: Option<TunnelHandle>,
}

impl BindingUpdateEntry {
    /// Return whether this entry is a home registration.
    pub fn is_home_registration(&self) -> bool {
        self.flags.contains(BindingFlags::HOME_REGISTRATION)
    }

    fn key_matches(&self, peer: &Ipv6Address, binding_id: Option<u16>) -> bool {
        self.peer_address == *peer && self.binding_id == binding_id
    }

    // Mobile router registrations keep their traffic on the bidirectional
    // home agent tunnel and never get a per-binding acceptor.
    fn wants_tunnel(&self) -> bool {
        self.is_home_registration() && !self.flags.contains(BindingFlags::ROUTER)
    }
}

#[derive(Debug)]
struct HomeBindings {
    record: HomeAddress,
    entries: Vec<BindingUpdateEntry, BINDING_UPDATE_ENTRY_COUNT>,
}

/// The registrations a mobile node has outstanding, grouped by the home
/// address they are for.
///
/// Lookup is a two-step affair: the home address must first resolve to a
/// registered local [HomeAddress] record, and only then is its list of
/// entries searched. The two failures are distinct: [ListError::AddressNotLocal]
/// against [ListError::NotFound].
///
/// [HomeAddress]: struct.HomeAddress.html
/// [ListError::AddressNotLocal]: enum.ListError.html#variant.AddressNotLocal
/// [ListError::NotFound]: enum.ListError.html#variant.NotFound
#[derive(Debug, Default)]
pub struct BindingUpdateList {
    homes: Vec<HomeBindings, HOME_ADDRESS_COUNT>,
}

impl BindingUpdateList {
    /// Create an empty Binding Update List.
    pub fn new() -> BindingUpdateList {
        BindingUpdateList { homes: Vec::new() }
    }

    /// Register a local home address record, the anchor for its
    /// registrations. Registering an address again replaces its record
    /// and keeps its entries.
    pub fn register_home(&mut self, record: HomeAddress) -> Result<(), ListError> {
        if let Some(home) = self
            .homes
            .iter_mut()
            .find(|home| home.record.address == record.address)
        {
            home.record = record;
            return Ok(());
        }
        self.homes
            .push(HomeBindings {
                record,
                entries: Vec::new(),
            })
            .map_err(|_| ListError::Exhausted)
    }

    /// Deregister a local home address record, tearing down every
    /// registration still anchored to it.
    pub fn deregister_home<S: StackServices>(
        &mut self,
        tunnels: &mut TunnelRegistry,
        services: &mut S,
        address: &Ipv6Address,
    ) -> Result<(), ListError> {
        let Some(position) = self
            .homes
            .iter()
            .position(|home| home.record.address == *address)
        else {
            return Err(ListError::AddressNotLocal);
        };
        let mut bindings = self.homes.remove(position);
        while !bindings.entries.is_empty() {
            let entry = bindings.entries.remove(0);
            Self::teardown(tunnels, services, entry);
        }
        Ok(())
    }

    /// Return the record for a registered home address.
    pub fn home(&self, address: &Ipv6Address) -> Option<&HomeAddress> {
        self.resolve(address).map(|home| &home.record)
    }

    /// Update the flags of a registered home address record.
    pub fn set_home_flags(
        &mut self,
        address: &Ipv6Address,
        flags: HomeAddressFlags,
    ) -> Result<(), ListError> {
        let home = self.resolve_mut(address).ok_or(ListError::AddressNotLocal)?;
        home.record.flags = flags;
        Ok(())
    }

    /// Iterate over the registered home address records.
    pub fn homes(&self) -> impl Iterator<Item = &HomeAddress> {
        self.homes.iter().map(|home| &home.record)
    }

    /// Iterate over the registrations for one home address.
    pub fn entries(
        &self,
        home: &Ipv6Address,
    ) -> Result<impl Iterator<Item = &BindingUpdateEntry>, ListError> {
        let home = self.resolve(home).ok_or(ListError::AddressNotLocal)?;
        Ok(home.entries.iter())
    }

    fn resolve(&self, address: &Ipv6Address) -> Option<&HomeBindings> {
        self.homes
            .iter()
            .find(|home| home.record.address == *address)
    }

    fn resolve_mut(&mut self, address: &Ipv6Address) -> Option<&mut HomeBindings> {
        self.homes
            .iter_mut()
            .find(|home| home.record.address == *address)
    }

    /// Look up the registration sent to `peer` for `home`.
    pub fn lookup(
        &self,
        home: &Ipv6Address,
        peer: &Ipv6Address,
        binding_id: Option<u16>,
    ) -> Result<&BindingUpdateEntry, ListError> {
        let bindings = self.resolve(home).ok_or(ListError::AddressNotLocal)?;
        bindings
            .entries
            .iter()
            .find(|entry| entry.key_matches(peer, binding_id))
            .ok_or(ListError::NotFound)
    }

    /// Look up the home registration for `home`, whatever home agent it
    /// went to.
    pub fn lookup_home_registration(
        &self,
        home: &Ipv6Address,
    ) -> Result<&BindingUpdateEntry, ListError> {
        let bindings = self.resolve(home).ok_or(ListError::AddressNotLocal)?;
        bindings
            .entries
            .iter()
            .find(|entry| entry.is_home_registration())
            .ok_or(ListError::NotFound)
    }

    /// Record a registration sent to `peer`, replacing (and fully tearing
    /// down) any existing entry with the same key.
    ///
    /// A non-router home registration additionally installs a tunnel
    /// acceptor for the home agent's encapsulated traffic and notifies
    /// the security database. If the acceptor cannot be installed the
    /// just-created entry is torn back down and `Err(Tunnel)` returned.
    #[allow(clippy::too_many_arguments)]
    pub fn add<S: StackServices>(
        &mut self,
        tunnels: &mut TunnelRegistry,
        services: &mut S,
        config: &Config,
        peer: Ipv6Address,
        home: Ipv6Address,
        care_of: Ipv6Address,
        flags: BindingFlags,
        state: BindingState,
        binding_id: Option<u16>,
    ) -> Result<(), ListError> {
        if !peer.is_unicast() || !care_of.is_unicast() {
            return Err(ListError::InvalidAddress);
        }

        let bindings = self.resolve_mut(&home).ok_or(ListError::AddressNotLocal)?;

        if let Some(position) = bindings
            .entries
            .iter()
            .position(|entry| entry.key_matches(&peer, binding_id))
        {
            let old = bindings.entries.remove(position);
            Self::teardown(tunnels, services, old);
        }

        let mut entry = BindingUpdateEntry {
            peer_address: peer,
            home_address: home,
            care_of_address: care_of,
            flags,
            state,
            binding_id,
            tunnel: None,
        };

        if entry.wants_tunnel() {
            entry.tunnel = Some(
                tunnels
                    .install(TunnelAcceptor::MobileNode { peer, care_of })
                    .map_err(|_| ListError::Tunnel)?,
            );
        }

        if let Err(entry) = bindings.entries.push(entry) {
            if let Some(handle) = entry.tunnel {
                tunnels.uninstall(handle);
            }
            return Err(ListError::Exhausted);
        }
        net_trace!("binding update list: {} registered with {}", home, peer);

        if entry.wants_tunnel() {
            services.security_bind(home, care_of, peer, config.migrate);
        }
        Ok(())
    }

    /// Remove the registration matching the given key, tearing down its
    /// side effects.
    pub fn remove<S: StackServices>(
        &mut self,
        tunnels: &mut TunnelRegistry,
        services: &mut S,
        home: &Ipv6Address,
        peer: &Ipv6Address,
        binding_id: Option<u16>,
    ) -> Result<(), ListError> {
        let bindings = self.resolve_mut(home).ok_or(ListError::AddressNotLocal)?;
        let Some(position) = bindings
            .entries
            .iter()
            .position(|entry| entry.key_matches(peer, binding_id))
        else {
            return Err(ListError::NotFound);
        };
        let entry = bindings.entries.remove(position);
        Self::teardown(tunnels, services, entry);
        Ok(())
    }

    /// Remove every registration of every home address. The home address
    /// records themselves stay registered.
    pub fn remove_all<S: StackServices>(
        &mut self,
        tunnels: &mut TunnelRegistry,
        services: &mut S,
    ) {
        for bindings in self.homes.iter_mut() {
            while !bindings.entries.is_empty() {
                let entry = bindings.entries.remove(0);
                Self::teardown(tunnels, services, entry);
            }
        }
    }

    /// Return whether `home` is usable as a home address right now:
    /// it must be configured as one, and the node must either sit on its
    /// home link (and not be mid-deregistration) or hold a home
    /// registration for it.
    pub fn is_home_address_valid(&self, home: &Ipv6Address) -> bool {
        let Some(bindings) = self.resolve(home) else {
            return false;
        };
        let flags = bindings.record.flags;
        if !flags.contains(HomeAddressFlags::HOME_ADDRESS) {
            return false;
        }
        if flags.contains(HomeAddressFlags::AT_HOME)
            && !flags.contains(HomeAddressFlags::DEREGISTERING)
        {
            return true;
        }
        bindings
            .entries
            .iter()
            .any(|entry| entry.is_home_registration())
    }

    fn teardown<S: StackServices>(
        tunnels: &mut TunnelRegistry,
        services: &mut S,
        entry: BindingUpdateEntry,
    ) {
        net_trace!(
            "binding update list: {} deregistered from {}",
            entry.home_address,
            entry.peer_address
        );
        if entry.wants_tunnel() {
            if let Some(handle) = entry.tunnel {
                tunnels.uninstall(handle);
            }
            services.security_unbind(
                entry.home_address,
                entry.care_of_address,
                entry.peer_address,
            );
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config::TUNNEL_ACCEPTOR_COUNT;
    use crate::iface::mock::{MockServices, ServiceCall};

    const HOME_1: Ipv6Address = Ipv6Address::new(0x2001, 0xdb8, 0, 1, 0, 0, 0, 1);
    const HOME_2: Ipv6Address = Ipv6Address::new(0x2001, 0xdb8, 0, 1, 0, 0, 0, 2);
    const HOME_AGENT: Ipv6Address = Ipv6Address::new(0x2001, 0xdb8, 0, 1, 0, 0, 0, 0x99);
    const PEER: Ipv6Address = Ipv6Address::new(0x2001, 0xdb8, 0, 2, 0, 0, 0, 1);
    const CARE_OF_1: Ipv6Address = Ipv6Address::new(0x2001, 0xdb8, 0, 3, 0, 0, 0, 1);
    const CARE_OF_2: Ipv6Address = Ipv6Address::new(0x2001, 0xdb8, 0, 3, 0, 0, 0, 2);
    const IFACE: InterfaceId = InterfaceId(1);

    fn list_with_home(address: Ipv6Address, flags: HomeAddressFlags) -> BindingUpdateList {
        let mut list = BindingUpdateList::new();
        list.register_home(HomeAddress {
            address,
            interface: IFACE,
            flags,
        })
        .unwrap();
        list
    }

    fn add(
        list: &mut BindingUpdateList,
        tunnels: &mut TunnelRegistry,
        services: &mut MockServices,
        peer: Ipv6Address,
        home: Ipv6Address,
        care_of: Ipv6Address,
        flags: BindingFlags,
    ) -> Result<(), ListError> {
        list.add(
            tunnels,
            services,
            &Config::default(),
            peer,
            home,
            care_of,
            flags,
            BindingState::Registering,
            None,
        )
    }

    #[test]
    fn test_lookup_distinguishes_failures() {
        let list = list_with_home(HOME_1, HomeAddressFlags::HOME_ADDRESS);

        assert_eq!(
            list.lookup(&HOME_2, &PEER, None),
            Err(ListError::AddressNotLocal)
        );
        assert_eq!(list.lookup(&HOME_1, &PEER, None), Err(ListError::NotFound));
        assert_eq!(
            list.lookup_home_registration(&HOME_2),
            Err(ListError::AddressNotLocal)
        );
        assert_eq!(
            list.lookup_home_registration(&HOME_1),
            Err(ListError::NotFound)
        );
    }

    #[test]
    fn test_add_then_lookup() {
        let mut list = list_with_home(HOME_1, HomeAddressFlags::HOME_ADDRESS);
        let mut tunnels = TunnelRegistry::new();
        let mut services = MockServices::new();

        assert_eq!(
            add(
                &mut list,
                &mut tunnels,
                &mut services,
                PEER,
                HOME_1,
                CARE_OF_1,
                BindingFlags::empty(),
            ),
            Ok(())
        );
        let entry = list.lookup(&HOME_1, &PEER, None).unwrap();
        assert_eq!(entry.care_of_address, CARE_OF_1);
        assert_eq!(entry.state, BindingState::Registering);
        // no tunnel and no security binding for a correspondent
        // registration
        assert_eq!(entry.tunnel, None);
        assert_eq!(tunnels.count(), 0);
        assert!(services.calls.is_empty());
    }

    #[test]
    fn test_invalid_addresses_rejected() {
        let mut list = list_with_home(HOME_1, HomeAddressFlags::HOME_ADDRESS);
        let mut tunnels = TunnelRegistry::new();
        let mut services = MockServices::new();

        for (peer, care_of) in [
            (Ipv6Address::UNSPECIFIED, CARE_OF_1),
            (Ipv6Address::LINK_LOCAL_ALL_NODES, CARE_OF_1),
            (PEER, Ipv6Address::UNSPECIFIED),
            (PEER, Ipv6Address::LINK_LOCAL_ALL_NODES),
        ] {
            assert_eq!(
                add(
                    &mut list,
                    &mut tunnels,
                    &mut services,
                    peer,
                    HOME_1,
                    care_of,
                    BindingFlags::empty(),
                ),
                Err(ListError::InvalidAddress)
            );
        }
    }

    #[test]
    fn test_home_registration_reregisters_tunnel() {
        let mut list = list_with_home(HOME_1, HomeAddressFlags::HOME_ADDRESS);
        let mut tunnels = TunnelRegistry::new();
        let mut services = MockServices::new();

        assert_eq!(
            add(
                &mut list,
                &mut tunnels,
                &mut services,
                HOME_AGENT,
                HOME_1,
                CARE_OF_1,
                BindingFlags::HOME_REGISTRATION,
            ),
            Ok(())
        );
        assert_eq!(tunnels.count(), 1);

        // re-registering from a new care-of address leaves exactly one
        // entry and exactly one acceptor, the one for the new address
        assert_eq!(
            add(
                &mut list,
                &mut tunnels,
                &mut services,
                HOME_AGENT,
                HOME_1,
                CARE_OF_2,
                BindingFlags::HOME_REGISTRATION,
            ),
            Ok(())
        );
        let entries: Vec<_, BINDING_UPDATE_ENTRY_COUNT> =
            list.entries(&HOME_1).unwrap().collect();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].care_of_address, CARE_OF_2);

        assert_eq!(tunnels.count(), 1);
        assert_eq!(
            tunnels.iter().next(),
            Some(&TunnelAcceptor::MobileNode {
                peer: HOME_AGENT,
                care_of: CARE_OF_2,
            })
        );

        assert_eq!(
            services.calls,
            [
                ServiceCall::SecurityBind(HOME_1, CARE_OF_1, HOME_AGENT, false),
                ServiceCall::SecurityUnbind(HOME_1, CARE_OF_1, HOME_AGENT),
                ServiceCall::SecurityBind(HOME_1, CARE_OF_2, HOME_AGENT, false),
            ]
        );
    }

    #[test]
    fn test_mobile_router_has_no_tunnel() {
        let mut list = list_with_home(HOME_1, HomeAddressFlags::HOME_ADDRESS);
        let mut tunnels = TunnelRegistry::new();
        let mut services = MockServices::new();

        assert_eq!(
            add(
                &mut list,
                &mut tunnels,
                &mut services,
                HOME_AGENT,
                HOME_1,
                CARE_OF_1,
                BindingFlags::HOME_REGISTRATION | BindingFlags::ROUTER,
            ),
            Ok(())
        );
        assert_eq!(tunnels.count(), 0);
        assert!(services.calls.is_empty());
    }

    #[test]
    fn test_tunnel_failure_unwinds() {
        let mut list = list_with_home(HOME_1, HomeAddressFlags::HOME_ADDRESS);
        let mut tunnels = TunnelRegistry::new();
        let mut services = MockServices::new();

        for _ in 0..TUNNEL_ACCEPTOR_COUNT {
            tunnels.install(TunnelAcceptor::HomeAgent).unwrap();
        }

        assert_eq!(
            add(
                &mut list,
                &mut tunnels,
                &mut services,
                HOME_AGENT,
                HOME_1,
                CARE_OF_1,
                BindingFlags::HOME_REGISTRATION,
            ),
            Err(ListError::Tunnel)
        );
        // the entry was unwound and the security database never told
        assert_eq!(list.lookup(&HOME_1, &HOME_AGENT, None), Err(ListError::NotFound));
        assert!(services.calls.is_empty());
    }

    #[test]
    fn test_remove() {
        let mut list = list_with_home(HOME_1, HomeAddressFlags::HOME_ADDRESS);
        let mut tunnels = TunnelRegistry::new();
        let mut services = MockServices::new();

        add(
            &mut list,
            &mut tunnels,
            &mut services,
            HOME_AGENT,
            HOME_1,
            CARE_OF_1,
            BindingFlags::HOME_REGISTRATION,
        )
        .unwrap();

        assert_eq!(
            list.remove(&mut tunnels, &mut services, &HOME_1, &HOME_AGENT, None),
            Ok(())
        );
        assert_eq!(
            list.lookup(&HOME_1, &HOME_AGENT, None),
            Err(ListError::NotFound)
        );
        assert_eq!(tunnels.count(), 0);
        assert_eq!(
            services.calls.last(),
            Some(&ServiceCall::SecurityUnbind(HOME_1, CARE_OF_1, HOME_AGENT))
        );

        assert_eq!(
            list.remove(&mut tunnels, &mut services, &HOME_1, &HOME_AGENT, None),
            Err(ListError::NotFound)
        );
    }

    #[test]
    fn test_remove_all() {
        let mut list = list_with_home(HOME_1, HomeAddressFlags::HOME_ADDRESS);
        list.register_home(HomeAddress {
            address: HOME_2,
            interface: IFACE,
            flags: HomeAddressFlags::HOME_ADDRESS,
        })
        .unwrap();
        let mut tunnels = TunnelRegistry::new();
        let mut services = MockServices::new();

        add(
            &mut list,
            &mut tunnels,
            &mut services,
            HOME_AGENT,
            HOME_1,
            CARE_OF_1,
            BindingFlags::HOME_REGISTRATION,
        )
        .unwrap();
        add(
            &mut list,
            &mut tunnels,
            &mut services,
            PEER,
            HOME_2,
            CARE_OF_1,
            BindingFlags::empty(),
        )
        .unwrap();

        list.remove_all(&mut tunnels, &mut services);
        assert_eq!(list.lookup(&HOME_1, &HOME_AGENT, None), Err(ListError::NotFound));
        assert_eq!(list.lookup(&HOME_2, &PEER, None), Err(ListError::NotFound));
        assert_eq!(tunnels.count(), 0);
        // the anchors survive a flush
        assert!(list.home(&HOME_1).is_some());
        assert!(list.home(&HOME_2).is_some());
    }

    #[test]
    fn test_deregister_home() {
        let mut list = list_with_home(HOME_1, HomeAddressFlags::HOME_ADDRESS);
        let mut tunnels = TunnelRegistry::new();
        let mut services = MockServices::new();

        add(
            &mut list,
            &mut tunnels,
            &mut services,
            HOME_AGENT,
            HOME_1,
            CARE_OF_1,
            BindingFlags::HOME_REGISTRATION,
        )
        .unwrap();

        assert_eq!(
            list.deregister_home(&mut tunnels, &mut services, &HOME_1),
            Ok(())
        );
        // the anchor is gone along with its registrations
        assert!(list.home(&HOME_1).is_none());
        assert_eq!(tunnels.count(), 0);
        assert_eq!(
            services.calls.last(),
            Some(&ServiceCall::SecurityUnbind(HOME_1, CARE_OF_1, HOME_AGENT))
        );

        assert_eq!(
            list.deregister_home(&mut tunnels, &mut services, &HOME_1),
            Err(ListError::AddressNotLocal)
        );
    }

    #[test]
    fn test_home_address_validity() {
        // unknown address
        let list = BindingUpdateList::new();
        assert!(!list.is_home_address_valid(&HOME_1));

        // at home, not deregistering
        let list = list_with_home(
            HOME_1,
            HomeAddressFlags::HOME_ADDRESS | HomeAddressFlags::AT_HOME,
        );
        assert!(list.is_home_address_valid(&HOME_1));

        // at home but mid-deregistration, with no home registration left
        let list = list_with_home(
            HOME_1,
            HomeAddressFlags::HOME_ADDRESS
                | HomeAddressFlags::AT_HOME
                | HomeAddressFlags::DEREGISTERING,
        );
        assert!(!list.is_home_address_valid(&HOME_1));

        // away from home without a registration
        let list = list_with_home(HOME_1, HomeAddressFlags::HOME_ADDRESS);
        assert!(!list.is_home_address_valid(&HOME_1));

        // away from home with a home registration
        let mut list = list_with_home(HOME_1, HomeAddressFlags::HOME_ADDRESS);
        let mut tunnels = TunnelRegistry::new();
        let mut services = MockServices::new();
        add(
            &mut list,
            &mut tunnels,
            &mut services,
            HOME_AGENT,
            HOME_1,
            CARE_OF_1,
            BindingFlags::HOME_REGISTRATION,
        )
        .unwrap();
        assert!(list.is_home_address_valid(&HOME_1));

        // the address flag is required no matter what
        let list = list_with_home(HOME_1, HomeAddressFlags::AT_HOME);
        assert!(!list.is_home_address_valid(&HOME_1));
    }
}
