use core::fmt;

use heapless::Vec;

use super::{InterfaceId, StackServices};
use crate::config::DAD_ENTRY_COUNT;
use crate::wire::Ipv6Address;

/// An error returned by the duplicate address detection table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DadError {
    /// Detection is already running for this address.
    InProgress,
    /// No detection is running for this address.
    NotRunning,
    /// The table cannot track another detection run.
    Exhausted,
}

impl fmt::Display for DadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DadError::InProgress => write!(f, "duplicate address detection already running"),
            DadError::NotRunning => write!(f, "no duplicate address detection running"),
            DadError::Exhausted => write!(f, "duplicate address detection table full"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for DadError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
struct DadEntry {
    address: Ipv6Address,
    interface: InterfaceId,
}

/// Tracks in-flight duplicate address detection runs.
///
/// The actual neighbor solicitations are the neighbor discovery
/// subsystem's business, reached through [StackServices]; this table only
/// guards against starting detection twice for the same address and
/// remembers what to cancel.
///
/// [StackServices]: trait.StackServices.html
#[derive(Debug, Default)]
pub struct DadTable {
    entries: Vec<DadEntry, DAD_ENTRY_COUNT>,
}

impl DadTable {
    /// Create an empty table.
    pub fn new() -> DadTable {
        DadTable {
            entries: Vec::new(),
        }
    }

    /// Return the interface detection is running on for `address`, if
    /// any.
    pub fn find(&self, address: &Ipv6Address) -> Option<InterfaceId> {
        self.entries
            .iter()
            .find(|e| e.address == *address)
            .map(|e| e.interface)
    }

    /// Start duplicate address detection for `address` on `iface`.
    ///
    /// Detection already running for the address is left alone.
    pub fn start<S: StackServices>(
        &mut self,
        services: &mut S,
        address: Ipv6Address,
        iface: InterfaceId,
    ) -> Result<(), DadError> {
        if self.find(&address).is_some() {
            return Err(DadError::InProgress);
        }
        self.entries
            .push(DadEntry {
                address,
                interface: iface,
            })
            .map_err(|_| DadError::Exhausted)?;
        net_trace!("dad: start for {} on {}", address, iface);
        services.start_dad(address, iface);
        Ok(())
    }

    /// Cancel duplicate address detection for `address`, if it is
    /// running.
    pub fn stop<S: StackServices>(
        &mut self,
        services: &mut S,
        address: Ipv6Address,
    ) -> Result<(), DadError> {
        let Some(position) = self.entries.iter().position(|e| e.address == address) else {
            return Err(DadError::NotRunning);
        };
        let entry = self.entries.swap_remove(position);
        net_trace!("dad: stop for {} on {}", entry.address, entry.interface);
        services.stop_dad(entry.address, entry.interface);
        Ok(())
    }
}
