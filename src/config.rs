//! Compile-time sizing of the bounded stores.
//!
//! All collections in this crate are bounded; these constants pick the
//! bounds. They are deliberately generous for a single node: a mobile node
//! rarely keeps more than a handful of outstanding registrations, and a
//! home agent serving a small site stays well under the cache bound.

/// Maximum number of Binding Cache entries kept by a correspondent node or
/// home agent.
pub const BINDING_CACHE_ENTRY_COUNT: usize = 16;

/// Maximum number of home addresses a mobile node registers bindings for.
pub const HOME_ADDRESS_COUNT: usize = 4;

/// Maximum number of Binding Update List entries per home address.
pub const BINDING_UPDATE_ENTRY_COUNT: usize = 8;

/// Maximum number of installed tunnel acceptors.
pub const TUNNEL_ACCEPTOR_COUNT: usize = 8;

/// Maximum number of concurrent duplicate address detection runs tracked.
pub const DAD_ENTRY_COUNT: usize = 8;
