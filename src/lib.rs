/*! The _mip6_ library provides the signaling and forwarding core of
Mobile IPv6 in a portable, `#![no_std]` form.

Mobile IPv6 lets a node keep a stable _home address_ while it attaches to
the network at a changing _care-of address_. The pieces implemented here
are the ones every participating node needs:

  * The [wire] module provides access to the Mobility Header, the Home
    Address destination option, the Type 2 Routing Header, and the IPv6
    fixed header used for IPv6-in-IPv6 tunneling.
  * The [iface] module provides the protocol state: the Binding Cache kept
    by correspondent nodes and home agents, the Binding Update List kept
    by mobile nodes, the tunnel acceptor registry with its source
    validation predicates, the Mobility Header dispatcher, and the
    Return-Routability hint limiter with its address coordination helpers.

The crate does not own sockets, timers or routes; it computes protocol
decisions and hands them back to the surrounding IPv6 stack through return
values and the [iface::StackServices](iface/trait.StackServices.html)
trait.

The library is `no_std` by default and uses bounded storage everywhere;
the `std` feature only widens the storage choices and enables
`std::error::Error` integration.
*/

#![cfg_attr(not(any(test, feature = "std")), no_std)]
#![deny(unsafe_code)]

#[cfg(feature = "alloc")]
extern crate alloc;

#[macro_use]
mod macros;

pub mod config;
pub mod iface;
pub mod time;
pub mod wire;
