use core::fmt;

use super::{Error, Result};
use crate::wire::ipv6option::{Ipv6Option, Ipv6OptionsIterator, Repr as OptionRepr};
use crate::wire::Ipv6Address as Address;

pub use super::ip::Protocol;

/// Byte length of a Destination Options header that carries exactly one
/// Home Address option, padded so the option type octet sits at an 8n+6
/// offset from the start of the header.
pub const HOME_ADDRESS_HEADER_LEN: usize = 24;

// Offset of the Home Address option within such a header: two fixed
// octets, then a PadN option covering four octets.
const HOME_ADDRESS_OPT_OFFSET: usize = 6;

/// A read/write wrapper around an IPv6 Destination Options header.
#[derive(Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Header<T: AsRef<[u8]>> {
    buffer: T,
}

// Format of the Destination Options Header
//
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
// |  Next Header  |  Hdr Ext Len  |                               |
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+                               +
// |                                                               |
// .                                                               .
// .                            Options                            .
// .                                                               .
// |                                                               |
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//
//
// See https://tools.ietf.org/html/rfc8200#section-4.6 for details.
mod field {
    #![allow(non_snake_case)]

    use crate::wire::field::*;

    // Minimum size of the header.
    pub const MIN_HEADER_SIZE: usize = 8;

    // 8-bit identifier of the header immediately following this header.
    pub const NXT_HDR: usize = 0;
    // 8-bit unsigned integer. Length of the OPTIONS field in 8-octet units,
    // not including the first 8 octets.
    pub const LENGTH: usize = 1;
    // Variable-length field. Option-Type-specific data.
    pub const fn OPTIONS(length_field: u8) -> Field {
        let bytes = length_field as usize * 8 + 8;
        2..bytes
    }
}

impl<T: AsRef<[u8]>> Header<T> {
    /// Create a raw octet buffer with an IPv6 Destination Options Header
    /// structure.
    pub const fn new_unchecked(buffer: T) -> Header<T> {
        Header { buffer }
    }

    /// Shorthand for a combination of [new_unchecked] and [check_len].
    ///
    /// [new_unchecked]: #method.new_unchecked
    /// [check_len]: #method.check_len
    pub fn new_checked(buffer: T) -> Result<Header<T>> {
        let header = Self::new_unchecked(buffer);
        header.check_len()?;
        Ok(header)
    }

    /// Ensure that no accessor method will panic if called.
    /// Returns `Err(Error)` if the buffer is too short.
    ///
    /// The result of this check is invalidated by calling [set_header_len].
    ///
    /// [set_header_len]: #method.set_header_len
    pub fn check_len(&self) -> Result<()> {
        let data = self.buffer.as_ref();
        let len = data.len();

        if len < field::MIN_HEADER_SIZE {
            return Err(Error);
        }

        let of = field::OPTIONS(data[field::LENGTH]);

        if len < of.end {
            return Err(Error);
        }

        Ok(())
    }

    /// Consume the header, returning the underlying buffer.
    pub fn into_inner(self) -> T {
        self.buffer
    }

    /// Return the next header field.
    #[inline]
    pub fn next_header(&self) -> Protocol {
        let data = self.buffer.as_ref();
        Protocol::from(data[field::NXT_HDR])
    }

    /// Return the length of the Destination Options header in 8-octet
    /// units, not including the first 8 octets.
    #[inline]
    pub fn header_len(&self) -> u8 {
        let data = self.buffer.as_ref();
        data[field::LENGTH]
    }

    /// Return the length of the Destination Options header in octets.
    #[inline]
    pub fn total_len(&self) -> usize {
        field::OPTIONS(self.header_len()).end
    }
}

impl<'a, T: AsRef<[u8]> + ?Sized> Header<&'a T> {
    /// Return the options area.
    #[inline]
    pub fn options(&self) -> &'a [u8] {
        let data = self.buffer.as_ref();
        &data[field::OPTIONS(data[field::LENGTH])]
    }
}

impl<T: AsRef<[u8]> + AsMut<[u8]>> Header<T> {
    /// Set the next header field.
    #[inline]
    pub fn set_next_header(&mut self, value: Protocol) {
        let data = self.buffer.as_mut();
        data[field::NXT_HDR] = value.into();
    }

    /// Set the header length, in 8-octet units, not including the first
    /// 8 octets.
    #[inline]
    pub fn set_header_len(&mut self, value: u8) {
        let data = self.buffer.as_mut();
        data[field::LENGTH] = value;
    }

    /// Return a mutable pointer to the options area.
    #[inline]
    pub fn options_mut(&mut self) -> &mut [u8] {
        let data = self.buffer.as_mut();
        let len = data[field::LENGTH];
        &mut data[field::OPTIONS(len)]
    }
}

impl<'a, T: AsRef<[u8]> + ?Sized> fmt::Display for Header<&'a T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match Repr::parse(self) {
            Ok(repr) => write!(f, "{repr}"),
            Err(err) => {
                write!(f, "IPv6 Destination Options ({err})")?;
                Ok(())
            }
        }
    }
}

/// A high-level representation of an IPv6 Destination Options header.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Repr<'a> {
    /// The type of header immediately following this header.
    pub next_header: Protocol,
    /// Length of the header in 8-octet units, not including the first
    /// 8 octets.
    pub length: u8,
    /// The options contained in the header.
    pub options: &'a [u8],
}

impl<'a> Repr<'a> {
    /// Parse an IPv6 Destination Options header and return a high-level
    /// representation.
    pub fn parse<T>(header: &Header<&'a T>) -> Result<Repr<'a>>
    where
        T: AsRef<[u8]> + ?Sized,
    {
        header.check_len()?;
        Ok(Repr {
            next_header: header.next_header(),
            length: header.header_len(),
            options: header.options(),
        })
    }

    /// Return the length, in bytes, of a header that will be emitted from
    /// this high-level representation.
    pub const fn buffer_len(&self) -> usize {
        field::OPTIONS(self.length).end
    }

    /// Emit a high-level representation into an IPv6 Destination Options
    /// header.
    pub fn emit<T: AsRef<[u8]> + AsMut<[u8]> + ?Sized>(&self, header: &mut Header<&mut T>) {
        header.set_next_header(self.next_header);
        header.set_header_len(self.length);
        header.options_mut().copy_from_slice(self.options);
    }

    /// Return an `Iterator` for the options contained in this header.
    pub fn options(&self) -> Ipv6OptionsIterator<'a> {
        Ipv6OptionsIterator::new(self.options)
    }

    /// Return the address carried in a Home Address option, if the header
    /// contains a well-formed one.
    pub fn home_address(&self) -> Option<Address> {
        for opt in self.options() {
            match opt {
                Ok(OptionRepr::HomeAddress(addr)) => return Some(addr),
                Ok(_) => (),
                Err(_) => return None,
            }
        }
        None
    }
}

impl<'a> fmt::Display for Repr<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "IPv6 Destination Options next_hdr={} length={}",
            self.next_header, self.length
        )
    }
}

/// A high-level representation of a Destination Options header carrying a
/// single Home Address option.
///
/// The emitted header is the one a mobile node prepends to packets sent
/// away from home: two fixed octets, a PadN option covering four octets,
/// and the Home Address option itself, whose type octet then sits at
/// offset 6. That satisfies the option's 8n+6 alignment requirement and
/// makes the header exactly [HOME_ADDRESS_HEADER_LEN] octets.
///
/// [HOME_ADDRESS_HEADER_LEN]: constant.HOME_ADDRESS_HEADER_LEN.html
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct HomeAddressRepr {
    /// The type of header immediately following this header.
    pub next_header: Protocol,
    /// The home address of the sending mobile node.
    pub home_address: Address,
}

impl HomeAddressRepr {
    /// Parse a Destination Options header into a `HomeAddressRepr`, if it
    /// carries a Home Address option.
    pub fn parse<T>(header: &Header<&T>) -> Result<HomeAddressRepr>
    where
        T: AsRef<[u8]> + ?Sized,
    {
        let repr = Repr::parse(header)?;
        let home_address = repr.home_address().ok_or(Error)?;
        Ok(HomeAddressRepr {
            next_header: repr.next_header,
            home_address,
        })
    }

    /// Return the length, in bytes, of a header that will be emitted from
    /// this high-level representation.
    pub const fn buffer_len(&self) -> usize {
        HOME_ADDRESS_HEADER_LEN
    }

    /// Emit a high-level representation into an IPv6 Destination Options
    /// header.
    pub fn emit<T: AsRef<[u8]> + AsMut<[u8]> + ?Sized>(&self, header: &mut Header<&mut T>) {
        header.set_next_header(self.next_header);
        header.set_header_len((HOME_ADDRESS_HEADER_LEN / 8 - 1) as u8);

        let options = header.options_mut();
        OptionRepr::PadN(2).emit(&mut Ipv6Option::new_unchecked(
            &mut options[..HOME_ADDRESS_OPT_OFFSET - 2],
        ));
        OptionRepr::HomeAddress(self.home_address).emit(&mut Ipv6Option::new_unchecked(
            &mut options[HOME_ADDRESS_OPT_OFFSET - 2..],
        ));
    }
}

impl fmt::Display for HomeAddressRepr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "IPv6 Destination Options next_hdr={} home_address={}",
            self.next_header, self.home_address
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;

    // A Destination Options header carrying a PadN and a Home Address
    // option, as built for an outgoing packet away from home.
    static BYTES_HOME_ADDRESS: [u8; 24] = [
        0x87, 0x2, 0x1, 0x2, 0x0, 0x0, 0xc9, 0x10, 0x20, 0x01, 0x0d, 0xb8, 0x0, 0x0, 0x0, 0x0,
        0x0, 0x0, 0x0, 0x0, 0x0, 0x0, 0x0, 0x1,
    ];

    const HOME_ADDRESS: Address = Address::new(0x2001, 0xdb8, 0, 0, 0, 0, 0, 1);

    fn home_address_repr() -> HomeAddressRepr {
        HomeAddressRepr {
            next_header: Protocol::Mobility,
            home_address: HOME_ADDRESS,
        }
    }

    #[test]
    fn test_check_len() {
        // less than the minimum header size
        assert_eq!(
            Err(Error),
            Header::new_unchecked(&BYTES_HOME_ADDRESS[..7]).check_len()
        );
        // length field value greater than the number of bytes
        assert_eq!(
            Err(Error),
            Header::new_unchecked(&BYTES_HOME_ADDRESS[..16]).check_len()
        );
        // valid
        assert_eq!(Ok(()), Header::new_unchecked(&BYTES_HOME_ADDRESS[..]).check_len());
    }

    #[test]
    fn test_header_deconstruct() {
        let header = Header::new_checked(&BYTES_HOME_ADDRESS[..]).unwrap();
        assert_eq!(header.next_header(), Protocol::Mobility);
        assert_eq!(header.header_len(), 2);
        assert_eq!(header.total_len(), 24);
        assert_eq!(header.options(), &BYTES_HOME_ADDRESS[2..]);
    }

    #[test]
    fn test_repr_parse() {
        let header = Header::new_checked(&BYTES_HOME_ADDRESS[..]).unwrap();
        let repr = Repr::parse(&header).unwrap();
        assert_eq!(repr.next_header, Protocol::Mobility);
        assert_eq!(repr.length, 2);
        assert_eq!(repr.home_address(), Some(HOME_ADDRESS));

        let repr = HomeAddressRepr::parse(&header).unwrap();
        assert_eq!(repr, home_address_repr());
    }

    #[test]
    fn test_repr_emit() {
        let repr = home_address_repr();
        let mut bytes = [0xffu8; 24];
        let mut header = Header::new_unchecked(&mut bytes[..]);
        repr.emit(&mut header);
        assert_eq!(header.into_inner(), &BYTES_HOME_ADDRESS[..]);
    }

    #[test]
    fn test_home_address_alignment() {
        let repr = home_address_repr();
        let mut bytes = [0xffu8; 24];
        let mut header = Header::new_unchecked(&mut bytes[..]);
        repr.emit(&mut header);

        let bytes = header.into_inner();
        // The option type octet must sit at an 8n+6 offset from the start
        // of the header, and the header must be a whole number of 8-octet
        // units.
        let offset = bytes
            .iter()
            .position(|&b| b == u8::from(crate::wire::Ipv6OptionType::HomeAddress))
            .unwrap();
        assert_eq!(offset % 8, 6);
        assert_eq!(bytes.len() % 8, 0);
    }

    #[test]
    fn test_no_home_address() {
        // a header with only padding
        let bytes: [u8; 8] = [0x3b, 0x0, 0x1, 0x4, 0x0, 0x0, 0x0, 0x0];
        let header = Header::new_checked(&bytes[..]).unwrap();
        let repr = Repr::parse(&header).unwrap();
        assert_eq!(repr.home_address(), None);
        assert_eq!(HomeAddressRepr::parse(&header), Err(Error));
    }
}
