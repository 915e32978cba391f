//! Message type to decoder registry.

use std::collections::HashMap;

use tracing::debug;

use super::error::Result;
use super::genl::{GENL_ID_CTRL, control};
use super::message::{MessagePayload, NetlinkMessage, NlMsgType};
use super::packet::NetlinkPacket;
use super::schema::MessageContext;

/// Decoder for one netlink message type.
///
/// It receives the packet with its cursor at the start of the payload.
pub type FactoryMethod = fn(&mut NetlinkPacket<'_>, &MessageContext) -> Result<NetlinkMessage>;

/// Decodes received packets by message type.
///
/// Generic netlink families are registered once their id is known; see
/// [`Manager::get_family`](super::Manager::get_family).
#[derive(Debug, Clone)]
pub struct MessageFactory {
    methods: HashMap<u16, FactoryMethod>,
}

impl Default for MessageFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageFactory {
    /// A factory that knows the reserved types and the control family.
    pub fn new() -> Self {
        let mut methods: HashMap<u16, FactoryMethod> = HashMap::new();
        methods.insert(NlMsgType::NOOP, NetlinkMessage::decode_noop);
        methods.insert(NlMsgType::ERROR, NetlinkMessage::decode_error_ack);
        methods.insert(NlMsgType::DONE, NetlinkMessage::decode_done);
        methods.insert(NlMsgType::OVERRUN, NetlinkMessage::decode_overrun);
        methods.insert(GENL_ID_CTRL, control::create_message);
        Self { methods }
    }

    /// Register `method` for `message_type`.
    ///
    /// Returns `false` and keeps the existing decoder if the type is taken.
    pub fn add_factory_method(&mut self, message_type: u16, method: FactoryMethod) -> bool {
        if self.methods.contains_key(&message_type) {
            debug!(message_type, "factory method already registered");
            return false;
        }
        self.methods.insert(message_type, method);
        true
    }

    pub fn has_factory_method(&self, message_type: u16) -> bool {
        self.methods.contains_key(&message_type)
    }

    /// Decode `packet`.
    ///
    /// A type with no decoder becomes [`MessagePayload::Unknown`] holding the
    /// payload bytes.
    pub fn create(
        &self,
        packet: &mut NetlinkPacket<'_>,
        context: &MessageContext,
    ) -> Result<NetlinkMessage> {
        let Some(method) = self.methods.get(&packet.message_type()) else {
            debug!(
                message_type = packet.message_type(),
                len = packet.length(),
                "no factory method for message type"
            );
            let payload = packet.payload().to_vec();
            return Ok(NetlinkMessage::from_packet(
                packet,
                MessagePayload::Unknown(payload),
            ));
        };

        let message = method(packet, context)?;
        if packet.remaining_bytes() > 0 {
            debug!(
                message_type = packet.message_type(),
                count = packet.remaining_bytes(),
                "message decoded with trailing bytes"
            );
        }
        Ok(message)
    }
}
