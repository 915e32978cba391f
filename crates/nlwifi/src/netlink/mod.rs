//! Netlink and generic netlink protocol implementation.
//!
//! Layers, bottom up:
//!
//! - [`packet`]: a bounds-checked cursor over one received message;
//! - [`attribute_list`]: the TLV attribute tree, decoded against static
//!   [`schema`] tables and re-encoded from the tree;
//! - [`message`]: typed messages (Error/Ack, Done, generic families) and the
//!   [`MessageFactory`] that decodes them by message type;
//! - [`manager`]: sequence numbers, response handlers, the dump queue and
//!   broadcast fan-out over a [`Transport`].
//!
//! # Quick Start
//!
//! ```ignore
//! use nlwifi::netlink::{EventLoop, Manager, ResponseHandler};
//! use nlwifi::netlink::genl::nl80211::{self, Nl80211Message};
//!
//! let mut manager = Manager::open()?;
//! let nl80211_id = manager.get_family(nl80211::FAMILY_NAME, Some(nl80211::create_message))?;
//!
//! manager.send_message(
//!     Nl80211Message::get_interfaces(nl80211_id),
//!     ResponseHandler::new().on_message(|_, message| println!("{}", message)),
//! )?;
//!
//! EventLoop::run_until(&mut manager, tokio::time::sleep(Duration::from_secs(1))).await?;
//! ```
//!
//! # Events
//!
//! Messages that answer no request go to broadcast handlers:
//!
//! ```ignore
//! manager.subscribe_to_events(nl80211::FAMILY_NAME, nl80211::Nl80211Group::SCAN)?;
//! manager.add_broadcast_handler(|_, message| {
//!     if let Some(event) = message.as_generic() {
//!         println!("event: {}", event.command_name());
//!     }
//! });
//! ```

pub mod attr;
pub mod attribute;
pub mod attribute_list;
mod builder;
pub mod clock;
mod config;
mod error;
mod event_loop;
pub mod factory;
pub mod genl;
pub mod manager;
pub mod message;
pub mod packet;
pub mod schema;
mod socket;
mod transport;

pub use attribute::{Attribute, AttributeKind, AttributeValue};
pub use attribute_list::AttributeList;
pub use builder::{AttrWriter, MessageBuilder, NestedMark};
#[cfg(any(test, feature = "testing"))]
pub use clock::ManualClock;
pub use clock::{Clock, SystemClock};
pub use config::ManagerConfig;
pub use error::{Error, Result};
pub use event_loop::EventLoop;
pub use factory::{FactoryMethod, MessageFactory};
pub use manager::{
    AckDisposition, AuxiliaryMessageType, HandlerId, Manager, ResponseHandler, TaskId,
};
pub use message::{
    ErrorAckMessage, GenericMessage, MessagePayload, NLMSG_HDRLEN, NetlinkMessage, NlMsgType,
};
pub use packet::NetlinkPacket;
pub use schema::{MessageContext, NestedEntry, NestedSchema};
pub use socket::NetlinkSocket;
pub use transport::Transport;
