use byteorder::{ByteOrder, NetworkEndian};
use core::fmt;

use super::{Error, Result};
use crate::wire::ip::checksum;
use crate::wire::Ipv6Address as Address;

pub use super::ip::Protocol;

enum_with_unknown! {
    /// Mobility Header message type.
    ///
    /// See https://tools.ietf.org/html/rfc6275#section-6.1 for details.
    pub enum Message(u8) {
        /// Binding Refresh Request
        BindingRefreshRequest = 0,
        /// Home Test Init
        HomeTestInit = 1,
        /// Care-of Test Init
        CareOfTestInit = 2,
        /// Home Test
        HomeTest = 3,
        /// Care-of Test
        CareOfTest = 4,
        /// Binding Update
        BindingUpdate = 5,
        /// Binding Acknowledgement
        BindingAck = 6,
        /// Binding Error
        BindingError = 7,
    }
}

impl Message {
    /// Return the minimum length, in octets, a Mobility Header of this
    /// type may declare: the fixed part of the message, before any
    /// mobility options. Unrecognized types are held only to the common
    /// header length.
    pub const fn min_len(&self) -> usize {
        match self {
            Message::BindingRefreshRequest => 8,
            Message::HomeTestInit => 16,
            Message::CareOfTestInit => 16,
            Message::HomeTest => 24,
            Message::CareOfTest => 24,
            Message::BindingUpdate => 12,
            Message::BindingAck => 12,
            Message::BindingError => 24,
            Message::Unknown(_) => 8,
        }
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Message::BindingRefreshRequest => write!(f, "binding refresh request"),
            Message::HomeTestInit => write!(f, "home test init"),
            Message::CareOfTestInit => write!(f, "care-of test init"),
            Message::HomeTest => write!(f, "home test"),
            Message::CareOfTest => write!(f, "care-of test"),
            Message::BindingUpdate => write!(f, "binding update"),
            Message::BindingAck => write!(f, "binding acknowledgement"),
            Message::BindingError => write!(f, "binding error"),
            Message::Unknown(id) => write!(f, "{id}"),
        }
    }
}

enum_with_unknown! {
    /// Status of a Binding Acknowledgement.
    ///
    /// Values below 128 indicate that the Binding Update was accepted.
    pub enum AckStatus(u8) {
        /// Binding Update accepted
        Accepted = 0,
        /// Accepted, but prefix discovery necessary
        PrefixDiscovery = 1,
        /// Reason unspecified
        Unspecified = 128,
        /// Administratively prohibited
        Prohibited = 129,
        /// Insufficient resources
        InsufficientResources = 130,
        /// Home registration not supported
        HomeRegistrationNotSupported = 131,
        /// Not home subnet
        NotHomeSubnet = 132,
        /// Not home agent for this mobile node
        NotHomeAgent = 133,
        /// Duplicate Address Detection failed
        DadFailed = 134,
        /// Sequence number out of window
        SequenceOutOfWindow = 135,
    }
}

impl AckStatus {
    /// Return whether this status rejects the Binding Update.
    pub fn is_rejection(&self) -> bool {
        u8::from(*self) >= 128
    }
}

impl fmt::Display for AckStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            AckStatus::Accepted => write!(f, "accepted"),
            AckStatus::PrefixDiscovery => write!(f, "accepted, prefix discovery necessary"),
            AckStatus::Unspecified => write!(f, "rejected, reason unspecified"),
            AckStatus::Prohibited => write!(f, "administratively prohibited"),
            AckStatus::InsufficientResources => write!(f, "insufficient resources"),
            AckStatus::HomeRegistrationNotSupported => {
                write!(f, "home registration not supported")
            }
            AckStatus::NotHomeSubnet => write!(f, "not home subnet"),
            AckStatus::NotHomeAgent => write!(f, "not home agent for this mobile node"),
            AckStatus::DadFailed => write!(f, "duplicate address detection failed"),
            AckStatus::SequenceOutOfWindow => write!(f, "sequence number out of window"),
            AckStatus::Unknown(id) => write!(f, "{id}"),
        }
    }
}

bitflags::bitflags! {
    /// Flags carried by a Binding Update.
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct BindingUpdateFlags: u16 {
        /// Acknowledge: a Binding Acknowledgement is requested.
        const ACKNOWLEDGE = 0x8000;
        /// Home registration: directed to the sender's home agent.
        const HOME_REGISTRATION = 0x4000;
        /// Link-local address compatibility.
        const LINK_LOCAL_COMPAT = 0x2000;
        /// Key management mobility capability.
        const KEY_MANAGEMENT = 0x1000;
        const _ = !0;
    }
}

bitflags::bitflags! {
    /// Flags carried by a Binding Acknowledgement.
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct BindingAckFlags: u8 {
        /// Key management mobility capability.
        const KEY_MANAGEMENT = 0x80;
        const _ = !0;
    }
}

/// A read/write wrapper around a Mobility Header buffer.
#[derive(Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Packet<T: AsRef<[u8]>> {
    buffer: T,
}

// Format of the Mobility Header
//
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
// | Payload Proto |  Header Len   |   MH Type     |   Reserved    |
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
// |           Checksum            |                               |
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+                               |
// |                                                               |
// .                                                               .
// .                       Message Data                            .
// .                                                               .
// |                                                               |
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//
// See https://tools.ietf.org/html/rfc6275#section-6.1.1 for details.
mod field {
    use crate::wire::field::*;

    // 8-bit selector identifying the header following the Mobility
    // Header. Always "no next header" for a well-formed header.
    pub const PAYLOAD_PROTO: usize = 0;
    // 8-bit unsigned integer. Length of the Mobility Header in units of
    // 8 octets, excluding the first 8 octets.
    pub const HEADER_LEN: usize = 1;
    // 8-bit selector identifying the mobility message.
    pub const MH_TYPE: usize = 2;
    // Reserved. Set to zero by the sender.
    pub const RESERVED: usize = 3;
    // 16-bit checksum over the pseudo-header and the Mobility Header.
    pub const CHECKSUM: Field = 4..6;

    pub const HEADER_END: usize = 8;

    // Binding Update message offsets.
    pub const BU_SEQUENCE: Field = 6..8;
    pub const BU_FLAGS: Field = 8..10;
    pub const BU_LIFETIME: Field = 10..12;

    // Binding Acknowledgement message offsets.
    pub const BA_STATUS: usize = 6;
    pub const BA_FLAGS: usize = 7;
    pub const BA_SEQUENCE: Field = 8..10;
    pub const BA_LIFETIME: Field = 10..12;

    // Binding Error message offsets.
    pub const BE_STATUS: usize = 6;
    pub const BE_HOME_ADDRESS: Field = 8..24;
}

impl<T: AsRef<[u8]>> Packet<T> {
    /// Imbue a raw octet buffer with Mobility Header structure.
    pub const fn new_unchecked(buffer: T) -> Packet<T> {
        Packet { buffer }
    }

    /// Shorthand for a combination of [new_unchecked] and [check_len].
    ///
    /// [new_unchecked]: #method.new_unchecked
    /// [check_len]: #method.check_len
    pub fn new_checked(buffer: T) -> Result<Packet<T>> {
        let packet = Self::new_unchecked(buffer);
        packet.check_len()?;
        Ok(packet)
    }

    /// Ensure that no accessor method will panic if called.
    /// Returns `Err(Error)` if the buffer is too short for the header
    /// length it declares, or for the fixed part of the message type it
    /// declares.
    ///
    /// The result of this check is invalidated by calling
    /// [set_header_len].
    ///
    /// [set_header_len]: #method.set_header_len
    pub fn check_len(&self) -> Result<()> {
        let len = self.buffer.as_ref().len();
        if len < field::HEADER_END || len < self.total_len() || self.total_len() < self.msg_type().min_len()
        {
            return Err(Error);
        }
        Ok(())
    }

    /// Consume the packet, returning the underlying buffer.
    pub fn into_inner(self) -> T {
        self.buffer
    }

    /// Return the payload proto field.
    #[inline]
    pub fn next_header(&self) -> Protocol {
        let data = self.buffer.as_ref();
        Protocol::from(data[field::PAYLOAD_PROTO])
    }

    /// Return the header length field, in units of 8 octets, excluding
    /// the first 8 octets.
    #[inline]
    pub fn header_len(&self) -> u8 {
        let data = self.buffer.as_ref();
        data[field::HEADER_LEN]
    }

    /// Return the length of the Mobility Header in octets.
    #[inline]
    pub fn total_len(&self) -> usize {
        (self.header_len() as usize + 1) * 8
    }

    /// Return the mobility message type.
    #[inline]
    pub fn msg_type(&self) -> Message {
        let data = self.buffer.as_ref();
        Message::from(data[field::MH_TYPE])
    }

    /// Return the checksum field.
    #[inline]
    pub fn checksum(&self) -> u16 {
        let data = self.buffer.as_ref();
        NetworkEndian::read_u16(&data[field::CHECKSUM])
    }

    /// Return the sequence number field.
    ///
    /// # Panics
    /// This function may panic if this packet is not a Binding Update or
    /// Binding Acknowledgement.
    #[inline]
    pub fn sequence(&self) -> u16 {
        let data = self.buffer.as_ref();
        match self.msg_type() {
            Message::BindingAck => NetworkEndian::read_u16(&data[field::BA_SEQUENCE]),
            _ => NetworkEndian::read_u16(&data[field::BU_SEQUENCE]),
        }
    }

    /// Return the Binding Update flags.
    ///
    /// # Panics
    /// This function may panic if this packet is not a Binding Update.
    #[inline]
    pub fn bu_flags(&self) -> BindingUpdateFlags {
        let data = self.buffer.as_ref();
        BindingUpdateFlags::from_bits_retain(NetworkEndian::read_u16(&data[field::BU_FLAGS]))
    }

    /// Return the Binding Update lifetime, in units of 4 seconds.
    ///
    /// # Panics
    /// This function may panic if this packet is not a Binding Update.
    #[inline]
    pub fn bu_lifetime(&self) -> u16 {
        let data = self.buffer.as_ref();
        NetworkEndian::read_u16(&data[field::BU_LIFETIME])
    }

    /// Return the Binding Acknowledgement status.
    ///
    /// # Panics
    /// This function may panic if this packet is not a Binding
    /// Acknowledgement.
    #[inline]
    pub fn ba_status(&self) -> AckStatus {
        let data = self.buffer.as_ref();
        AckStatus::from(data[field::BA_STATUS])
    }

    /// Return the Binding Acknowledgement flags.
    ///
    /// # Panics
    /// This function may panic if this packet is not a Binding
    /// Acknowledgement.
    #[inline]
    pub fn ba_flags(&self) -> BindingAckFlags {
        let data = self.buffer.as_ref();
        BindingAckFlags::from_bits_retain(data[field::BA_FLAGS])
    }

    /// Return the Binding Acknowledgement lifetime, in units of 4
    /// seconds.
    ///
    /// # Panics
    /// This function may panic if this packet is not a Binding
    /// Acknowledgement.
    #[inline]
    pub fn ba_lifetime(&self) -> u16 {
        let data = self.buffer.as_ref();
        NetworkEndian::read_u16(&data[field::BA_LIFETIME])
    }

    /// Return the Binding Error status.
    ///
    /// # Panics
    /// This function may panic if this packet is not a Binding Error.
    #[inline]
    pub fn be_status(&self) -> u8 {
        let data = self.buffer.as_ref();
        data[field::BE_STATUS]
    }

    /// Return the home address of a Binding Error message.
    ///
    /// # Panics
    /// This function may panic if this packet is not a Binding Error.
    #[inline]
    pub fn be_home_address(&self) -> Address {
        let data = self.buffer.as_ref();
        Address::from_bytes(&data[field::BE_HOME_ADDRESS])
    }

    /// Return the message data following the checksum.
    #[inline]
    pub fn message_data(&self) -> &[u8] {
        let data = self.buffer.as_ref();
        &data[field::CHECKSUM.end..self.total_len()]
    }

    /// Validate the header checksum.
    pub fn verify_checksum(&self, src_addr: &Address, dst_addr: &Address) -> bool {
        let data = &self.buffer.as_ref()[..self.total_len()];
        checksum::combine(&[
            checksum::pseudo_header(src_addr, dst_addr, Protocol::Mobility, data.len() as u32),
            checksum::data(data),
        ]) == !0
    }
}

impl<T: AsRef<[u8]> + AsMut<[u8]>> Packet<T> {
    /// Set the payload proto field.
    #[inline]
    pub fn set_next_header(&mut self, value: Protocol) {
        let data = self.buffer.as_mut();
        data[field::PAYLOAD_PROTO] = value.into();
    }

    /// Set the header length field, in units of 8 octets, excluding the
    /// first 8 octets.
    #[inline]
    pub fn set_header_len(&mut self, value: u8) {
        let data = self.buffer.as_mut();
        data[field::HEADER_LEN] = value;
    }

    /// Set the mobility message type.
    #[inline]
    pub fn set_msg_type(&mut self, value: Message) {
        let data = self.buffer.as_mut();
        data[field::MH_TYPE] = value.into();
    }

    /// Clear the reserved field.
    #[inline]
    pub fn clear_reserved(&mut self) {
        let data = self.buffer.as_mut();
        data[field::RESERVED] = 0;
    }

    /// Set the checksum field.
    #[inline]
    pub fn set_checksum(&mut self, value: u16) {
        let data = self.buffer.as_mut();
        NetworkEndian::write_u16(&mut data[field::CHECKSUM], value);
    }

    /// Set the sequence number of a Binding Update.
    #[inline]
    pub fn set_bu_sequence(&mut self, value: u16) {
        let data = self.buffer.as_mut();
        NetworkEndian::write_u16(&mut data[field::BU_SEQUENCE], value);
    }

    /// Set the Binding Update flags.
    #[inline]
    pub fn set_bu_flags(&mut self, value: BindingUpdateFlags) {
        let data = self.buffer.as_mut();
        NetworkEndian::write_u16(&mut data[field::BU_FLAGS], value.bits());
    }

    /// Set the Binding Update lifetime, in units of 4 seconds.
    #[inline]
    pub fn set_bu_lifetime(&mut self, value: u16) {
        let data = self.buffer.as_mut();
        NetworkEndian::write_u16(&mut data[field::BU_LIFETIME], value);
    }

    /// Set the Binding Acknowledgement status.
    #[inline]
    pub fn set_ba_status(&mut self, value: AckStatus) {
        let data = self.buffer.as_mut();
        data[field::BA_STATUS] = value.into();
    }

    /// Set the Binding Acknowledgement flags.
    #[inline]
    pub fn set_ba_flags(&mut self, value: BindingAckFlags) {
        let data = self.buffer.as_mut();
        data[field::BA_FLAGS] = value.bits();
    }

    /// Set the sequence number of a Binding Acknowledgement.
    #[inline]
    pub fn set_ba_sequence(&mut self, value: u16) {
        let data = self.buffer.as_mut();
        NetworkEndian::write_u16(&mut data[field::BA_SEQUENCE], value);
    }

    /// Set the Binding Acknowledgement lifetime, in units of 4 seconds.
    #[inline]
    pub fn set_ba_lifetime(&mut self, value: u16) {
        let data = self.buffer.as_mut();
        NetworkEndian::write_u16(&mut data[field::BA_LIFETIME], value);
    }

    /// Set the Binding Error status.
    #[inline]
    pub fn set_be_status(&mut self, value: u8) {
        let data = self.buffer.as_mut();
        data[field::BE_STATUS] = value;
    }

    /// Set the home address of a Binding Error message.
    #[inline]
    pub fn set_be_home_address(&mut self, value: Address) {
        let data = self.buffer.as_mut();
        data[field::BE_HOME_ADDRESS].copy_from_slice(value.as_bytes());
    }

    /// Return a mutable pointer to the message data.
    #[inline]
    pub fn message_data_mut(&mut self) -> &mut [u8] {
        let range = field::CHECKSUM.end..self.total_len();
        let data = self.buffer.as_mut();
        &mut data[range]
    }

    /// Compute and fill in the checksum.
    ///
    /// The buffer must hold exactly the emitted header for the result to
    /// be meaningful, and every other field must already be filled in.
    pub fn fill_checksum(&mut self, src_addr: &Address, dst_addr: &Address) {
        self.set_checksum(0);
        let checksum = {
            let data = &self.buffer.as_ref()[..self.total_len()];
            !checksum::combine(&[
                checksum::pseudo_header(src_addr, dst_addr, Protocol::Mobility, data.len() as u32),
                checksum::data(data),
            ])
        };
        self.set_checksum(checksum)
    }
}

impl<'a, T: AsRef<[u8]> + ?Sized> fmt::Display for Packet<&'a T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match Repr::parse(self) {
            Ok(repr) => write!(f, "{repr}"),
            Err(err) => {
                write!(f, "Mobility ({err})")?;
                Ok(())
            }
        }
    }
}

/// A high-level representation of a Mobility Header.
///
/// The Return Routability messages are carried opaquely: their cookies
/// and keygen tokens belong to the route-optimization handshake, which
/// this subsystem forwards to its signaling socket without interpreting.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[non_exhaustive]
pub enum Repr<'a> {
    BindingRefreshRequest,
    BindingUpdate {
        sequence: u16,
        flags: BindingUpdateFlags,
        /// Granted lifetime, in units of 4 seconds.
        lifetime: u16,
    },
    BindingAck {
        status: AckStatus,
        flags: BindingAckFlags,
        sequence: u16,
        /// Granted lifetime, in units of 4 seconds.
        lifetime: u16,
    },
    BindingError {
        status: u8,
        home_address: Address,
    },
    ReturnRoutability {
        msg_type: Message,
        data: &'a [u8],
    },
}

impl<'a> Repr<'a> {
    /// Parse a Mobility Header and return a high-level representation.
    ///
    /// The checksum is *not* verified here; callers on the input path
    /// verify it with [Packet::verify_checksum] against the addresses the
    /// packet actually traveled with.
    ///
    /// [Packet::verify_checksum]: struct.Packet.html#method.verify_checksum
    pub fn parse<T>(packet: &Packet<&'a T>) -> Result<Repr<'a>>
    where
        T: AsRef<[u8]> + ?Sized,
    {
        packet.check_len()?;
        match packet.msg_type() {
            Message::BindingRefreshRequest => Ok(Repr::BindingRefreshRequest),
            Message::BindingUpdate => Ok(Repr::BindingUpdate {
                sequence: packet.sequence(),
                flags: packet.bu_flags(),
                lifetime: packet.bu_lifetime(),
            }),
            Message::BindingAck => Ok(Repr::BindingAck {
                status: packet.ba_status(),
                flags: packet.ba_flags(),
                sequence: packet.sequence(),
                lifetime: packet.ba_lifetime(),
            }),
            Message::BindingError => Ok(Repr::BindingError {
                status: packet.be_status(),
                home_address: packet.be_home_address(),
            }),
            msg_type @ (Message::HomeTestInit
            | Message::CareOfTestInit
            | Message::HomeTest
            | Message::CareOfTest) => Ok(Repr::ReturnRoutability {
                msg_type,
                data: &packet.buffer.as_ref()[field::CHECKSUM.end..packet.total_len()],
            }),
            Message::Unknown(_) => Err(Error),
        }
    }

    /// Return the length, in bytes, of a header that will be emitted
    /// from this high-level representation. Always a whole number of
    /// 8-octet units; the Binding Update and Binding Acknowledgement
    /// fixed parts are padded out with a PadN mobility option.
    pub const fn buffer_len(&self) -> usize {
        match self {
            Repr::BindingRefreshRequest => 8,
            Repr::BindingUpdate { .. } => 16,
            Repr::BindingAck { .. } => 16,
            Repr::BindingError { .. } => 24,
            Repr::ReturnRoutability { data, .. } => (field::CHECKSUM.end + data.len() + 7) & !7,
        }
    }

    /// Emit a high-level representation into a Mobility Header, filling
    /// in the checksum over the given pseudo-header addresses.
    pub fn emit<T: AsRef<[u8]> + AsMut<[u8]>>(
        &self,
        src_addr: &Address,
        dst_addr: &Address,
        packet: &mut Packet<T>,
    ) {
        packet.set_next_header(Protocol::Ipv6NoNxt);
        packet.set_header_len((self.buffer_len() / 8 - 1) as u8);
        packet.clear_reserved();
        match *self {
            Repr::BindingRefreshRequest => {
                packet.set_msg_type(Message::BindingRefreshRequest);
                packet.message_data_mut().fill(0);
            }
            Repr::BindingUpdate {
                sequence,
                flags,
                lifetime,
            } => {
                packet.set_msg_type(Message::BindingUpdate);
                packet.set_bu_sequence(sequence);
                packet.set_bu_flags(flags);
                packet.set_bu_lifetime(lifetime);
                emit_pad_option(&mut packet.message_data_mut()[6..]);
            }
            Repr::BindingAck {
                status,
                flags,
                sequence,
                lifetime,
            } => {
                packet.set_msg_type(Message::BindingAck);
                packet.set_ba_status(status);
                packet.set_ba_flags(flags);
                packet.set_ba_sequence(sequence);
                packet.set_ba_lifetime(lifetime);
                emit_pad_option(&mut packet.message_data_mut()[6..]);
            }
            Repr::BindingError {
                status,
                home_address,
            } => {
                packet.set_msg_type(Message::BindingError);
                packet.set_be_status(status);
                let data = packet.buffer.as_mut();
                data[field::BE_STATUS + 1] = 0;
                packet.set_be_home_address(home_address);
            }
            Repr::ReturnRoutability { msg_type, data } => {
                packet.set_msg_type(msg_type);
                let message_data = packet.message_data_mut();
                message_data[..data.len()].copy_from_slice(data);
                message_data[data.len()..].fill(0);
            }
        }
        packet.fill_checksum(src_addr, dst_addr)
    }
}

// Mobility messages are padded to a multiple of 8 octets with a PadN
// mobility option covering the remainder of the message data.
fn emit_pad_option(data: &mut [u8]) {
    data[0] = 1;
    data[1] = (data.len() - 2) as u8;
    data[2..].fill(0);
}

impl<'a> fmt::Display for Repr<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Repr::BindingRefreshRequest => write!(f, "Mobility binding refresh request"),
            Repr::BindingUpdate {
                sequence, lifetime, ..
            } => {
                write!(f, "Mobility binding update seq={sequence} lifetime={lifetime}")
            }
            Repr::BindingAck {
                status, sequence, ..
            } => {
                write!(f, "Mobility binding acknowledgement seq={sequence} status={status}")
            }
            Repr::BindingError {
                status,
                home_address,
            } => {
                write!(f, "Mobility binding error status={status} home_address={home_address}")
            }
            Repr::ReturnRoutability { msg_type, .. } => write!(f, "Mobility {msg_type}"),
        }
    }
}
