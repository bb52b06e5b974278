use core::fmt;

use heapless::Vec;

use super::dad::DadTable;
use super::{BindingFlags, Config, InterfaceId, StackServices};
use crate::config::BINDING_CACHE_ENTRY_COUNT;
use crate::wire::Ipv6Address;

/// An error returned by a Binding Cache operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CacheError {
    /// The cache cannot hold another entry.
    Exhausted,
    /// No entry matches the given key.
    NotFound,
    /// The stack failed to install or remove the proxy host route. The
    /// cache itself was still updated.
    ProxyRoute,
}

impl fmt::Display for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheError::Exhausted => write!(f, "binding cache full"),
            CacheError::NotFound => write!(f, "no matching binding"),
            CacheError::ProxyRoute => write!(f, "proxy route operation failed"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for CacheError {}

/// One mobile node's current location, as seen by a correspondent node
/// or home agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BindingCacheEntry {
    /// The mobile node's home address.
    pub home_address: Ipv6Address,
    /// The local peer this entry belongs to: the correspondent address
    /// the mobile node registered with, or the home agent address.
    pub peer_address: Ipv6Address,
    /// Where the mobile node currently is.
    pub care_of_address: Ipv6Address,
    /// The interface the home address is proxied on. Only meaningful for
    /// home registrations.
    pub interface: Option<InterfaceId>,
    pub flags: BindingFlags,
    /// Distinguishes simultaneous care-of addresses for one home
    /// address.
    pub binding_id: Option<u16>,
}

impl BindingCacheEntry {
    /// Return whether this entry is a home registration.
    pub fn is_home_registration(&self) -> bool {
        self.flags.contains(BindingFlags::HOME_REGISTRATION)
    }

    fn key_matches(&self, home: &Ipv6Address, peer: &Ipv6Address, binding_id: Option<u16>) -> bool {
        self.home_address == *home && self.peer_address == *peer && self.binding_id == binding_id
    }
}

/// The bindings a correspondent node or home agent currently holds for
/// remote mobile nodes.
///
/// Entries are kept most-recently-created first and are unique per
/// (home address, peer address, binding id). A home registration entry
/// additionally owns a proxy host route, a security-database binding and
/// a duplicate address detection run on the home address; all of them are
/// set up and torn down together with the entry.
#[derive(Debug, Default)]
pub struct BindingCache {
    entries: Vec<BindingCacheEntry, BINDING_CACHE_ENTRY_COUNT>,
    dad: DadTable,
}

impl BindingCache {
    /// Create an empty Binding Cache.
    pub fn new() -> BindingCache {
        BindingCache {
            entries: Vec::new(),
            dad: DadTable::new(),
        }
    }

    /// Return the number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Return whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over the entries, most recently created first.
    pub fn iter(&self) -> impl Iterator<Item = &BindingCacheEntry> {
        self.entries.iter()
    }

    /// Return the duplicate address detection runs this cache owns.
    pub fn dad(&self) -> &DadTable {
        &self.dad
    }

    /// Look up a binding by home address, narrowing by any of the other
    /// fields. The first entry passing every given filter is returned;
    /// with several candidates, that is the most recently created one.
    pub fn lookup(
        &self,
        home: &Ipv6Address,
        peer: Option<&Ipv6Address>,
        care_of: Option<&Ipv6Address>,
        binding_id: Option<u16>,
    ) -> Option<&BindingCacheEntry> {
        self.entries.iter().find(|entry| {
            entry.home_address == *home
                && peer.map_or(true, |peer| entry.peer_address == *peer)
                && care_of.map_or(true, |care_of| entry.care_of_address == *care_of)
                && binding_id.map_or(true, |id| entry.binding_id == Some(id))
        })
    }

    /// Register or refresh a binding.
    ///
    /// A matching entry has its care-of address overwritten in place;
    /// otherwise a new entry is created, and `Err(Exhausted)` leaves the
    /// cache untouched. For home registrations the proxy host route and
    /// duplicate address detection are set up on creation, and the
    /// security database is (re)notified on every registration. A failed
    /// proxy route install is reported as `Err(ProxyRoute)`, but the
    /// entry is committed regardless.
    #[allow(clippy::too_many_arguments)]
    pub fn update_or_create<S: StackServices>(
        &mut self,
        services: &mut S,
        config: &Config,
        peer: Ipv6Address,
        home: Ipv6Address,
        care_of: Ipv6Address,
        interface: Option<InterfaceId>,
        flags: BindingFlags,
        binding_id: Option<u16>,
    ) -> Result<(), CacheError> {
        if let Some(entry) = self
            .entries
            .iter_mut()
            .find(|entry| entry.key_matches(&home, &peer, binding_id))
        {
            net_trace!("binding cache: {} now at {}", home, care_of);
            entry.care_of_address = care_of;
            if entry.is_home_registration() {
                services.security_bind(home, care_of, peer, config.migrate);
            }
            return Ok(());
        }

        let entry = BindingCacheEntry {
            home_address: home,
            peer_address: peer,
            care_of_address: care_of,
            interface,
            flags,
            binding_id,
        };
        let is_home_registration = entry.is_home_registration();
        self.entries
            .insert(0, entry)
            .map_err(|_| CacheError::Exhausted)?;
        net_trace!("binding cache: created {} at {}", home, care_of);

        let mut result = Ok(());
        if is_home_registration {
            match interface {
                Some(iface) => {
                    if let Err(err) = self.dad.start(services, home, iface) {
                        net_debug!("binding cache: dad for {} not started: {}", home, err);
                    }
                    if services.install_proxy_route(home, iface).is_err() {
                        net_debug!("binding cache: proxy route for {} failed", home);
                        result = Err(CacheError::ProxyRoute);
                    }
                }
                None => debug_assert!(false, "home registration without an owning interface"),
            }
            services.security_bind(home, care_of, peer, config.migrate);
        }
        result
    }

    /// Remove the binding matching the given key, tearing down its side
    /// effects. The first error encountered during teardown is returned;
    /// the entry is removed regardless. Removing an absent binding
    /// returns `Err(NotFound)`.
    pub fn remove<S: StackServices>(
        &mut self,
        services: &mut S,
        home: &Ipv6Address,
        peer: &Ipv6Address,
        binding_id: Option<u16>,
    ) -> Result<(), CacheError> {
        let Some(position) = self
            .entries
            .iter()
            .position(|entry| entry.key_matches(home, peer, binding_id))
        else {
            return Err(CacheError::NotFound);
        };
        let entry = self.entries.remove(position);
        self.teardown(services, entry)
    }

    /// Remove every binding, tearing each down as [remove] does. The
    /// first error encountered is returned.
    ///
    /// [remove]: #method.remove
    pub fn remove_all<S: StackServices>(&mut self, services: &mut S) -> Result<(), CacheError> {
        let mut result = Ok(());
        while !self.entries.is_empty() {
            let entry = self.entries.remove(0);
            let entry_result = self.teardown(services, entry);
            if result.is_ok() {
                result = entry_result;
            }
        }
        result
    }

    fn teardown<S: StackServices>(
        &mut self,
        services: &mut S,
        entry: BindingCacheEntry,
    ) -> Result<(), CacheError> {
        net_trace!("binding cache: removed {}", entry.home_address);
        let mut result = Ok(());
        if entry.is_home_registration() {
            if let Some(iface) = entry.interface {
                let _ = self.dad.stop(services, entry.home_address);
                if services
                    .remove_proxy_route(entry.home_address, iface)
                    .is_err()
                {
                    net_debug!(
                        "binding cache: proxy route removal for {} failed",
                        entry.home_address
                    );
                    result = Err(CacheError::ProxyRoute);
                }
            }
            services.security_unbind(entry.home_address, entry.care_of_address, entry.peer_address);
        }
        result
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::iface::mock::{MockServices, ServiceCall};

    const HOME_1: Ipv6Address = Ipv6Address::new(0x2001, 0xdb8, 0, 1, 0, 0, 0, 1);
    const HOME_2: Ipv6Address = Ipv6Address::new(0x2001, 0xdb8, 0, 1, 0, 0, 0, 2);
    const PEER_1: Ipv6Address = Ipv6Address::new(0x2001, 0xdb8, 0, 2, 0, 0, 0, 1);
    const PEER_2: Ipv6Address = Ipv6Address::new(0x2001, 0xdb8, 0, 2, 0, 0, 0, 2);
    const CARE_OF_1: Ipv6Address = Ipv6Address::new(0x2001, 0xdb8, 0, 3, 0, 0, 0, 1);
    const CARE_OF_2: Ipv6Address = Ipv6Address::new(0x2001, 0xdb8, 0, 3, 0, 0, 0, 2);
    const IFACE: InterfaceId = InterfaceId(1);

    fn fill(
        cache: &mut BindingCache,
        services: &mut MockServices,
        home: Ipv6Address,
        peer: Ipv6Address,
        care_of: Ipv6Address,
    ) -> Result<(), CacheError> {
        cache.update_or_create(
            services,
            &Config::default(),
            peer,
            home,
            care_of,
            None,
            BindingFlags::empty(),
            None,
        )
    }

    #[test]
    fn test_create_then_lookup() {
        let mut services = MockServices::new();
        let mut cache = BindingCache::new();

        assert_eq!(fill(&mut cache, &mut services, HOME_1, PEER_1, CARE_OF_1), Ok(()));
        let entry = cache.lookup(&HOME_1, Some(&PEER_1), None, None).unwrap();
        assert_eq!(entry.care_of_address, CARE_OF_1);
        assert_eq!(cache.len(), 1);

        // no side effects for a correspondent registration
        assert!(services.calls.is_empty());
    }

    #[test]
    fn test_update_in_place() {
        let mut services = MockServices::new();
        let mut cache = BindingCache::new();

        assert_eq!(fill(&mut cache, &mut services, HOME_1, PEER_1, CARE_OF_1), Ok(()));
        assert_eq!(fill(&mut cache, &mut services, HOME_1, PEER_1, CARE_OF_2), Ok(()));

        assert_eq!(cache.len(), 1);
        let entry = cache.lookup(&HOME_1, Some(&PEER_1), None, None).unwrap();
        assert_eq!(entry.care_of_address, CARE_OF_2);
    }

    #[test]
    fn test_lookup_filters() {
        let mut services = MockServices::new();
        let mut cache = BindingCache::new();

        fill(&mut cache, &mut services, HOME_1, PEER_1, CARE_OF_1).unwrap();
        fill(&mut cache, &mut services, HOME_1, PEER_2, CARE_OF_2).unwrap();
        fill(&mut cache, &mut services, HOME_2, PEER_1, CARE_OF_2).unwrap();

        // a bare home-address lookup returns the most recent registration
        assert_eq!(
            cache.lookup(&HOME_1, None, None, None).unwrap().peer_address,
            PEER_2
        );
        // narrowing by peer disambiguates
        assert_eq!(
            cache
                .lookup(&HOME_1, Some(&PEER_1), None, None)
                .unwrap()
                .care_of_address,
            CARE_OF_1
        );
        // narrowing by care-of address as the reverse tunnel validator does
        assert!(cache
            .lookup(&HOME_1, Some(&PEER_1), Some(&CARE_OF_2), None)
            .is_none());
    }

    #[test]
    fn test_remove() {
        let mut services = MockServices::new();
        let mut cache = BindingCache::new();

        fill(&mut cache, &mut services, HOME_1, PEER_1, CARE_OF_1).unwrap();
        assert_eq!(cache.remove(&mut services, &HOME_1, &PEER_1, None), Ok(()));
        assert!(cache.lookup(&HOME_1, Some(&PEER_1), None, None).is_none());

        // removing twice is a well-defined not-found error
        assert_eq!(
            cache.remove(&mut services, &HOME_1, &PEER_1, None),
            Err(CacheError::NotFound)
        );
    }

    #[test]
    fn test_exhausted() {
        let mut services = MockServices::new();
        let mut cache = BindingCache::new();

        for i in 0..BINDING_CACHE_ENTRY_COUNT {
            let home = Ipv6Address::new(0x2001, 0xdb8, 0, 1, 0, 0, 0, i as u16 + 1);
            assert_eq!(fill(&mut cache, &mut services, home, PEER_1, CARE_OF_1), Ok(()));
        }
        assert_eq!(
            fill(&mut cache, &mut services, HOME_2, PEER_2, CARE_OF_2),
            Err(CacheError::Exhausted)
        );
        assert_eq!(cache.len(), BINDING_CACHE_ENTRY_COUNT);
        assert!(cache.lookup(&HOME_2, Some(&PEER_2), None, None).is_none());
    }

    #[test]
    fn test_home_registration_side_effects() {
        let mut services = MockServices::new();
        let mut cache = BindingCache::new();

        assert_eq!(
            cache.update_or_create(
                &mut services,
                &Config::default(),
                PEER_1,
                HOME_1,
                CARE_OF_1,
                Some(IFACE),
                BindingFlags::HOME_REGISTRATION,
                None,
            ),
            Ok(())
        );
        assert_eq!(
            services.calls,
            [
                ServiceCall::StartDad(HOME_1, IFACE),
                ServiceCall::InstallProxyRoute(HOME_1, IFACE),
                ServiceCall::SecurityBind(HOME_1, CARE_OF_1, PEER_1, false),
            ]
        );

        services.calls.clear();
        assert_eq!(cache.remove(&mut services, &HOME_1, &PEER_1, None), Ok(()));
        assert_eq!(
            services.calls,
            [
                ServiceCall::StopDad(HOME_1, IFACE),
                ServiceCall::RemoveProxyRoute(HOME_1, IFACE),
                ServiceCall::SecurityUnbind(HOME_1, CARE_OF_1, PEER_1),
            ]
        );
    }

    #[test]
    fn test_proxy_route_failure_still_commits() {
        let mut services = MockServices::new();
        services.fail_routes = true;
        let mut cache = BindingCache::new();

        assert_eq!(
            cache.update_or_create(
                &mut services,
                &Config::default(),
                PEER_1,
                HOME_1,
                CARE_OF_1,
                Some(IFACE),
                BindingFlags::HOME_REGISTRATION,
                None,
            ),
            Err(CacheError::ProxyRoute)
        );
        // the entry is committed regardless
        assert!(cache.lookup(&HOME_1, Some(&PEER_1), None, None).is_some());
    }

    #[test]
    fn test_remove_all() {
        let mut services = MockServices::new();
        let mut cache = BindingCache::new();

        fill(&mut cache, &mut services, HOME_1, PEER_1, CARE_OF_1).unwrap();
        cache
            .update_or_create(
                &mut services,
                &Config::default(),
                PEER_2,
                HOME_2,
                CARE_OF_2,
                Some(IFACE),
                BindingFlags::HOME_REGISTRATION,
                None,
            )
            .unwrap();

        services.calls.clear();
        assert_eq!(cache.remove_all(&mut services), Ok(()));
        assert!(cache.is_empty());
        // the home registration was torn down with its side effects
        assert!(services
            .calls
            .contains(&ServiceCall::RemoveProxyRoute(HOME_2, IFACE)));
        assert!(services
            .calls
            .contains(&ServiceCall::SecurityUnbind(HOME_2, CARE_OF_2, PEER_2)));
    }
}
