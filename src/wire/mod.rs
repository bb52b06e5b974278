/*! Low-level packet access and construction.

The `wire` module deals with the packet *representation* of the headers
Mobile IPv6 adds to IPv6, plus the IPv6 fixed header itself. It provides
two levels of functionality.

 * First, it provides functions to extract fields from sequences of
   octets, and to insert fields into sequences of octets. This happens
   through the `Packet` and `Header` family of structures, e.g.
   [MobilityPacket] or [Ipv6RoutingHeader].
 * Second, in cases where the space of valid field values is much smaller
   than the space of possible field values, it provides a compact,
   high-level representation of packet data that can be parsed from and
   emitted into a sequence of octets. This happens through the `Repr`
   family of structs and enums, e.g. [MobilityRepr].

[MobilityPacket]: struct.MobilityPacket.html
[Ipv6RoutingHeader]: struct.Ipv6RoutingHeader.html
[MobilityRepr]: enum.MobilityRepr.html

The `Packet` family of data structures guarantees that, if the
`Packet::check_len()` method returned `Ok(())`, then no accessor or setter
method will panic; however, the guarantee provided by `Packet::check_len()`
may no longer hold after changing certain fields, which are listed in the
documentation for the specific packet.

The `Packet::new_checked` method is a shorthand for a combination of
`Packet::new_unchecked` and `Packet::check_len`. When parsing untrusted
input, it is *necessary* to use `Packet::new_checked()`; so long as the
buffer is not modified, no accessor will fail. When emitting output,
though, it is *incorrect* to use `Packet::new_checked()`; the length check
is likely to succeed on a zeroed buffer, but fail on a buffer filled with
data from a previous packet.

In the `Repr` family of data structures, the `Repr::parse()` method never
panics as long as `Packet::new_checked()` (or `Packet::check_len()`) has
succeeded, and the `Repr::emit()` method never panics as long as the
underlying buffer is at least `Repr::buffer_len()` octets long.
*/

mod field {
    pub type Field = ::core::ops::Range<usize>;
    pub type Rest = ::core::ops::RangeFrom<usize>;
}

pub(crate) mod ip;
mod ipv6;
mod ipv6destopts;
mod ipv6option;
mod ipv6routing;
mod mobility;

use core::fmt;

pub use self::ip::Protocol as IpProtocol;

pub use self::ipv6::{
    Address as Ipv6Address, Packet as Ipv6Packet, Repr as Ipv6Repr, ADDR_SIZE as IPV6_ADDR_SIZE,
    HEADER_LEN as IPV6_HEADER_LEN, MIN_MTU as IPV6_MIN_MTU,
};

pub use self::ipv6option::{
    Ipv6Option, Ipv6OptionsIterator, Repr as Ipv6OptionRepr, Type as Ipv6OptionType,
};

pub use self::ipv6destopts::{
    Header as Ipv6DestOptsHeader, HomeAddressRepr, Repr as Ipv6DestOptsRepr,
    HOME_ADDRESS_HEADER_LEN,
};

pub use self::ipv6routing::{
    Header as Ipv6RoutingHeader, Repr as Ipv6RoutingRepr, Type as Ipv6RoutingType,
};

pub use self::mobility::{
    AckStatus as MobilityAckStatus, BindingAckFlags, BindingUpdateFlags,
    Message as MobilityMessage, Packet as MobilityPacket, Repr as MobilityRepr,
};

/// Parsing a packet failed.
///
/// Either it is malformed, or it is not supported by mip6.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Error;

#[cfg(feature = "std")]
impl std::error::Error for Error {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "wire::Error")
    }
}

pub type Result<T> = core::result::Result<T, Error>;
