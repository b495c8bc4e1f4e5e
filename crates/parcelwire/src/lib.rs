//! Configure and poll parcel tracking devices over a serial link.
//!
//! parcelwire talks to a shipment tracker through its packet protocol: the
//! host sends init, dump and status commands; the device answers with
//! acknowledgements, status reports and its log of drop and flip events.
//!
//! # Crate Structure
//!
//! - [`transport`]: Serial port access
//! - [`frame`]: Frame encoding, decoding and checksum verification
//! - [`session`]: The read loop, the command loop and their shutdown token

pub mod session;

/// Re-export transport types.
pub mod transport {
    pub use parcelwire_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use parcelwire_frame::*;
}
