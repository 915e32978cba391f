//! Generic netlink and nl80211 for Linux wireless management.
//!
//! The crate speaks the generic netlink protocol directly: it resolves
//! families through the control family, encodes requests, decodes replies
//! and events into attribute trees, and dispatches them to callbacks by
//! sequence number.
//!
//! # Features
//!
//! - `serde` - `Serialize` for family info and scan reports
//! - `testing` - in-memory transport and manual clock ([`testing`])
//! - `full` - All features enabled
//!
//! # Example
//!
//! ```ignore
//! use nlwifi::netlink::{Manager, ResponseHandler};
//! use nlwifi::netlink::genl::nl80211::{self, Nl80211Attr, Nl80211Message};
//!
//! let mut manager = Manager::open()?;
//! let family_id = manager.get_family(nl80211::FAMILY_NAME, Some(nl80211::create_message))?;
//!
//! let handler = ResponseHandler::new().on_message(|_, message| {
//!     if let Some(wiphy) = message.as_generic() {
//!         let name = wiphy.attributes().get_string(Nl80211Attr::WIPHY_NAME);
//!         println!("{:?}", name);
//!     }
//! });
//! manager.send_message(Nl80211Message::get_wiphy(family_id), handler)?;
//! ```
//!
//! # Scanning
//!
//! [`wifi::ScanSession`] splits the frequencies to scan into batches,
//! most frequently seen first, and retries while the device is busy.

pub mod netlink;
pub mod wifi;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use netlink::{Error, Manager, Result};
