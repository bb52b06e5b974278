// Heads up! Before working on this file you should read, at least,
// the parts of RFC 4861 that discuss neighbor unreachability detection.

use managed::ManagedMap;

use crate::time::{Duration, Instant};
use crate::wire::Ipv6Address;

/// The reachability state of a cached neighbor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum NeighborState {
    /// Address resolution is in progress.
    Incomplete,
    /// The neighbor answered recently.
    Reachable,
    /// Reachability is unconfirmed but assumed.
    Stale,
    /// Reachability is unconfirmed; a probe is scheduled after a short
    /// grace period.
    Delay,
    /// Probes are being sent.
    Probe,
}

/// A cached neighbor.
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Neighbor {
    pub state: NeighborState,
    /// Whether the neighbor advertised itself as a router.
    pub is_router: bool,
    /// The timestamp past which the mapping should be discarded.
    pub expires_at: Instant,
}

/// A neighbor cache backed by a map.
///
/// The cache keeps per-neighbor reachability state so that reachability
/// of the routers a mobile node depends on can be forced into
/// re-confirmation after a movement.
#[derive(Debug)]
pub struct NeighborCache<'a> {
    storage: ManagedMap<'a, Ipv6Address, Neighbor>,
}

impl<'a> NeighborCache<'a> {
    /// Neighbor entry lifetime.
    pub const ENTRY_LIFETIME: Duration = Duration::from_millis(60_000);

    /// Create a cache. The backing storage is cleared upon creation.
    pub fn new<T>(storage: T) -> NeighborCache<'a>
    where
        T: Into<ManagedMap<'a, Ipv6Address, Neighbor>>,
    {
        let mut storage = storage.into();
        storage.clear();

        NeighborCache { storage }
    }

    /// Enter or refresh a neighbor.
    pub fn fill(
        &mut self,
        addr: Ipv6Address,
        state: NeighborState,
        is_router: bool,
        timestamp: Instant,
    ) {
        debug_assert!(addr.is_unicast());

        let neighbor = Neighbor {
            state,
            is_router,
            expires_at: timestamp + Self::ENTRY_LIFETIME,
        };
        match self.storage.insert(addr, neighbor) {
            Ok(Some(_)) => net_trace!("neighbor: refreshed {}", addr),
            Ok(None) => net_trace!("neighbor: filled {}", addr),
            Err((addr, neighbor)) => {
                // A fixed-size cache storage is full; evict the entry
                // expiring soonest.
                let old_addr = match self.storage {
                    ManagedMap::Borrowed(ref mut pairs) => {
                        pairs
                            .iter()
                            .flatten()
                            .min_by_key(|(_, neighbor)| neighbor.expires_at)
                            .expect("empty neighbor cache storage")
                            .0
                    }
                    // Owned maps can extend themselves.
                    #[cfg(any(feature = "std", feature = "alloc"))]
                    ManagedMap::Owned(_) => unreachable!(),
                };
                self.storage.remove(&old_addr);
                match self.storage.insert(addr, neighbor) {
                    Ok(None) => {
                        net_trace!("neighbor: filled {} (evicted {})", addr, old_addr)
                    }
                    // We've covered everything else above.
                    _ => unreachable!(),
                }
            }
        }
    }

    /// Look up a neighbor, disregarding expired entries.
    pub fn lookup(&self, addr: &Ipv6Address, timestamp: Instant) -> Option<Neighbor> {
        match self.storage.get(addr) {
            Some(&neighbor) if timestamp < neighbor.expires_at => Some(neighbor),
            _ => None,
        }
    }

    /// Force reachability re-confirmation of every router in the cache:
    /// any router-flagged entry in the Reachable or Stale state is
    /// demoted to Delay. A mobile node calls this after movement, since
    /// the routers it used to reach may no longer be on-link.
    pub fn probe_routers(&mut self) {
        fn demote(neighbor: &mut Neighbor) {
            if neighbor.is_router
                && matches!(
                    neighbor.state,
                    NeighborState::Reachable | NeighborState::Stale
                )
            {
                neighbor.state = NeighborState::Delay;
            }
        }

        match self.storage {
            ManagedMap::Borrowed(ref mut pairs) => {
                for pair in pairs.iter_mut() {
                    if let Some((_, neighbor)) = pair {
                        demote(neighbor);
                    }
                }
            }
            #[cfg(any(feature = "std", feature = "alloc"))]
            ManagedMap::Owned(ref mut map) => {
                for neighbor in map.values_mut() {
                    demote(neighbor);
                }
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const ADDR_ROUTER_1: Ipv6Address = Ipv6Address::new(0xfe80, 0, 0, 0, 0, 0, 0, 1);
    const ADDR_ROUTER_2: Ipv6Address = Ipv6Address::new(0xfe80, 0, 0, 0, 0, 0, 0, 2);
    const ADDR_ROUTER_3: Ipv6Address = Ipv6Address::new(0xfe80, 0, 0, 0, 0, 0, 0, 3);
    const ADDR_HOST: Ipv6Address = Ipv6Address::new(0xfe80, 0, 0, 0, 0, 0, 0, 4);

    #[test]
    fn test_fill_and_lookup() {
        let mut cache_storage = [Default::default(); 4];
        let mut cache = NeighborCache::new(&mut cache_storage[..]);

        assert!(cache.lookup(&ADDR_HOST, Instant::from_millis(0)).is_none());

        cache.fill(
            ADDR_HOST,
            NeighborState::Reachable,
            false,
            Instant::from_millis(0),
        );
        let neighbor = cache.lookup(&ADDR_HOST, Instant::from_millis(100)).unwrap();
        assert_eq!(neighbor.state, NeighborState::Reachable);
        assert!(!neighbor.is_router);

        // expired entries are disregarded
        assert!(cache
            .lookup(
                &ADDR_HOST,
                Instant::from_millis(0) + NeighborCache::ENTRY_LIFETIME * 2
            )
            .is_none());
    }

    #[test]
    fn test_evict() {
        let mut cache_storage = [Default::default(); 2];
        let mut cache = NeighborCache::new(&mut cache_storage[..]);

        cache.fill(
            ADDR_ROUTER_1,
            NeighborState::Reachable,
            true,
            Instant::from_millis(100),
        );
        cache.fill(
            ADDR_ROUTER_2,
            NeighborState::Reachable,
            true,
            Instant::from_millis(50),
        );
        cache.fill(
            ADDR_HOST,
            NeighborState::Reachable,
            false,
            Instant::from_millis(200),
        );

        // the entry expiring soonest was evicted
        assert!(cache.lookup(&ADDR_ROUTER_2, Instant::from_millis(300)).is_none());
        assert!(cache.lookup(&ADDR_ROUTER_1, Instant::from_millis(300)).is_some());
        assert!(cache.lookup(&ADDR_HOST, Instant::from_millis(300)).is_some());
    }

    #[test]
    fn test_probe_routers() {
        let mut cache_storage = [Default::default(); 8];
        let mut cache = NeighborCache::new(&mut cache_storage[..]);
        let now = Instant::from_millis(0);

        cache.fill(ADDR_ROUTER_1, NeighborState::Reachable, true, now);
        cache.fill(ADDR_ROUTER_2, NeighborState::Stale, true, now);
        cache.fill(ADDR_ROUTER_3, NeighborState::Probe, true, now);
        cache.fill(ADDR_HOST, NeighborState::Reachable, false, now);

        cache.probe_routers();

        // reachable and stale routers get demoted to delay
        assert_eq!(
            cache.lookup(&ADDR_ROUTER_1, now).unwrap().state,
            NeighborState::Delay
        );
        assert_eq!(
            cache.lookup(&ADDR_ROUTER_2, now).unwrap().state,
            NeighborState::Delay
        );
        // a router already probing is left alone
        assert_eq!(
            cache.lookup(&ADDR_ROUTER_3, now).unwrap().state,
            NeighborState::Probe
        );
        // hosts are never touched
        assert_eq!(
            cache.lookup(&ADDR_HOST, now).unwrap().state,
            NeighborState::Reachable
        );
    }
}
