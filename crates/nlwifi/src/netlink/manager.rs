//! Request/response dispatch over one netlink transport.
//!
//! The [`Manager`] owns the transport and matches every received message to
//! the request that caused it by sequence number. Each outstanding request is
//! in one of these states:
//!
//! - no handler: the message is fanned out to the broadcast handlers;
//! - single response pending: the first reply (or Error/Ack) completes it;
//! - multipart pending: `NLM_F_MULTI` parts keep the handler registered until
//!   the Done marker arrives;
//! - dump pending: dumps are sent one at a time, later ones wait in a FIFO
//!   until the one in flight completes. A dump answered with EBUSY is resent
//!   after a delay, a bounded number of times.
//!
//! The manager is a synchronous state machine. Time comes from a [`Clock`];
//! whoever drives it calls [`Manager::on_datagram`] (or
//! [`Manager::receive_available`]) when data arrives and
//! [`Manager::run_expired_timers`] once [`Manager::next_deadline`] passes.
//! [`EventLoop`](super::EventLoop) does both on a tokio runtime.
//!
//! Handlers receive `&mut Manager` and may send, post tasks or cancel other
//! handlers while they run.
//!
//! # Example
//!
//! ```ignore
//! use nlwifi::netlink::{Manager, ResponseHandler};
//! use nlwifi::netlink::genl::nl80211::{self, Nl80211Message};
//!
//! let mut manager = Manager::open()?;
//! let family_id = manager.get_family(nl80211::FAMILY_NAME, Some(nl80211::create_message))?;
//!
//! let handler = ResponseHandler::new()
//!     .on_message(|_, message| println!("{}", message))
//!     .on_error(|_, kind, _| println!("dump ended: {:?}", kind));
//! manager.send_message(Nl80211Message::get_wiphy(family_id), handler)?;
//! ```

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::fmt;
use std::os::unix::io::RawFd;
use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};

use super::clock::{Clock, SystemClock};
use super::config::ManagerConfig;
use super::error::{Error, Result};
use super::factory::{FactoryMethod, MessageFactory};
use super::genl::{ControlMessage, Family, FamilyInfo};
use super::message::{NetlinkMessage, nlmsg_align};
use super::packet::NetlinkPacket;
use super::schema::MessageContext;
use super::socket::NetlinkSocket;
use super::transport::Transport;

/// Why an error handler is being called.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuxiliaryMessageType {
    /// A multipart reply finished. Not a failure.
    Done,
    /// The kernel answered with a nonzero Error/Ack.
    ErrorFromKernel,
    /// No reply arrived before the deadline.
    TimeoutWaitingForResponse,
    /// The reply was not of the family the handler expects.
    UnexpectedResponseType,
}

impl fmt::Display for AuxiliaryMessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Done => "done",
            Self::ErrorFromKernel => "error from kernel",
            Self::TimeoutWaitingForResponse => "timeout waiting for response",
            Self::UnexpectedResponseType => "unexpected response type",
        };
        f.write_str(s)
    }
}

/// What happens to a response handler after a successful ack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckDisposition {
    /// The exchange is over.
    Remove,
    /// More replies are expected for the same sequence number.
    Keep,
}

pub type MessageHandler = Box<dyn FnMut(&mut Manager, &NetlinkMessage)>;
pub type AckHandler = Box<dyn FnMut(&mut Manager) -> AckDisposition>;
pub type ErrorHandler =
    Box<dyn FnMut(&mut Manager, AuxiliaryMessageType, Option<&NetlinkMessage>)>;
pub type BroadcastHandler = Box<dyn FnMut(&mut Manager, &NetlinkMessage)>;
pub type Task = Box<dyn FnOnce(&mut Manager)>;

/// Callbacks for the replies to one request.
///
/// Every callback is optional. Without an ack callback an ack ends the
/// exchange; without an error callback errors are only logged.
#[derive(Default)]
pub struct ResponseHandler {
    on_message: Option<MessageHandler>,
    on_ack: Option<AckHandler>,
    on_error: Option<ErrorHandler>,
    expected_family: Option<Family>,
}

impl ResponseHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Called for each reply that is not an Error/Ack or a Done marker.
    pub fn on_message(mut self, f: impl FnMut(&mut Manager, &NetlinkMessage) + 'static) -> Self {
        self.on_message = Some(Box::new(f));
        self
    }

    /// Called for an Error/Ack with error code 0.
    pub fn on_ack(mut self, f: impl FnMut(&mut Manager) -> AckDisposition + 'static) -> Self {
        self.on_ack = Some(Box::new(f));
        self
    }

    pub fn on_error(
        mut self,
        f: impl FnMut(&mut Manager, AuxiliaryMessageType, Option<&NetlinkMessage>) + 'static,
    ) -> Self {
        self.on_error = Some(Box::new(f));
        self
    }

    /// Only accept generic messages of `family`; anything else is reported as
    /// [`AuxiliaryMessageType::UnexpectedResponseType`].
    pub fn expect_family(mut self, family: Family) -> Self {
        self.expected_family = Some(family);
        self
    }

    fn accepts(&self, message: &NetlinkMessage) -> bool {
        match self.expected_family {
            None => true,
            Some(family) => message.as_generic().is_some_and(|g| g.family() == family),
        }
    }

    fn message(&mut self, manager: &mut Manager, message: &NetlinkMessage) {
        match self.on_message.as_mut() {
            Some(f) => f(manager, message),
            None => debug!(seq = message.sequence_number(), "reply with no message handler"),
        }
    }

    fn ack(&mut self, manager: &mut Manager) -> AckDisposition {
        match self.on_ack.as_mut() {
            Some(f) => f(manager),
            None => AckDisposition::Remove,
        }
    }

    fn error(
        &mut self,
        manager: &mut Manager,
        kind: AuxiliaryMessageType,
        message: Option<&NetlinkMessage>,
    ) {
        match self.on_error.as_mut() {
            Some(f) => f(manager, kind, message),
            None => match message {
                Some(message) => debug!(%kind, "unhandled: {}", message),
                None => debug!(%kind, "unhandled auxiliary message"),
            },
        }
    }
}

impl fmt::Debug for ResponseHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseHandler")
            .field("on_message", &self.on_message.is_some())
            .field("on_ack", &self.on_ack.is_some())
            .field("on_error", &self.on_error.is_some())
            .field("expected_family", &self.expected_family)
            .finish()
    }
}

/// Identifies a registered broadcast handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandlerId(u64);

/// Identifies a posted task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

struct PendingResponse {
    handler: ResponseHandler,
    deadline: Instant,
}

struct PendingDump {
    seq: u32,
    bytes: Vec<u8>,
    /// Held here until the dump is transmitted.
    handler: Option<ResponseHandler>,
    sent: bool,
}

struct DelayedTask {
    deadline: Instant,
    task: Task,
}

/// Netlink request/response dispatcher.
pub struct Manager {
    transport: Box<dyn Transport>,
    clock: Box<dyn Clock>,
    config: ManagerConfig,
    factory: MessageFactory,
    families: HashMap<String, FamilyInfo>,
    next_sequence: u32,
    responses: HashMap<u32, PendingResponse>,
    broadcast: Vec<(HandlerId, Option<BroadcastHandler>)>,
    next_handler_id: u64,
    dumps: VecDeque<PendingDump>,
    dump_timeout: Option<Instant>,
    dump_resend: Option<Instant>,
    dump_retries_left: u32,
    last_dump_error: i32,
    tasks: BTreeMap<TaskId, DelayedTask>,
    next_task_id: u64,
    /// Sequence number whose handler is currently running.
    dispatching: Option<u32>,
    dispatch_cancelled: bool,
    /// Bumped by `reset` so handlers taken out before it are not restored.
    generation: u64,
}

impl fmt::Debug for Manager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Manager")
            .field("config", &self.config)
            .field("families", &self.families.keys().collect::<Vec<_>>())
            .field("pending_responses", &self.responses.len())
            .field("broadcast_handlers", &self.broadcast.len())
            .field("queued_dumps", &self.dumps.len())
            .field("tasks", &self.tasks.len())
            .finish_non_exhaustive()
    }
}

impl Manager {
    /// Create a manager over `transport` with the default configuration and
    /// the system clock.
    pub fn new(transport: impl Transport + 'static) -> Self {
        Self {
            transport: Box::new(transport),
            clock: Box::new(SystemClock),
            config: ManagerConfig::default(),
            factory: MessageFactory::new(),
            families: HashMap::new(),
            next_sequence: 1,
            responses: HashMap::new(),
            broadcast: Vec::new(),
            next_handler_id: 1,
            dumps: VecDeque::new(),
            dump_timeout: None,
            dump_resend: None,
            dump_retries_left: 0,
            last_dump_error: 0,
            tasks: BTreeMap::new(),
            next_task_id: 1,
            dispatching: None,
            dispatch_cancelled: false,
            generation: 0,
        }
    }

    /// Create a manager over a new kernel generic netlink socket.
    pub fn open() -> Result<Self> {
        Ok(Self::new(NetlinkSocket::new()?))
    }

    pub fn with_config(mut self, config: ManagerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    pub fn factory(&self) -> &MessageFactory {
        &self.factory
    }

    pub fn factory_mut(&mut self) -> &mut MessageFactory {
        &mut self.factory
    }

    /// Current time according to the manager's clock.
    pub fn now(&self) -> Instant {
        self.clock.now()
    }

    /// Descriptor of the transport, if it has one.
    pub fn raw_fd(&self) -> Option<RawFd> {
        self.transport.raw_fd()
    }

    fn next_sequence_number(&mut self) -> u32 {
        let seq = self.next_sequence;
        self.next_sequence = self.next_sequence.wrapping_add(1);
        if self.next_sequence == 0 {
            self.next_sequence = 1;
        }
        seq
    }

    // Sending

    /// Send `message` and route its replies to `handler`.
    ///
    /// Returns the sequence number used. A dump request sent while another
    /// dump is in flight is queued and transmitted once the earlier one
    /// completes; its sequence number is still returned immediately.
    pub fn send_message(&mut self, message: NetlinkMessage, handler: ResponseHandler) -> Result<u32> {
        self.sweep_expired_responses();

        let seq = self.next_sequence_number();
        let bytes = message.encode(seq, self.transport.port_id())?;

        if message.is_dump_request() {
            if !self.dumps.is_empty() {
                debug!(seq, queued = self.dumps.len(), "dump in flight, queueing request");
                self.dumps.push_back(PendingDump {
                    seq,
                    bytes,
                    handler: Some(handler),
                    sent: false,
                });
                return Ok(seq);
            }
            self.register_and_send(seq, &bytes, handler)?;
            self.dumps.push_back(PendingDump {
                seq,
                bytes,
                handler: None,
                sent: true,
            });
            self.arm_dump();
            return Ok(seq);
        }

        self.register_and_send(seq, &bytes, handler)?;
        Ok(seq)
    }

    fn register(&mut self, seq: u32, handler: ResponseHandler) {
        let deadline = self.clock.now() + self.config.response_timeout;
        self.responses.insert(seq, PendingResponse { handler, deadline });
    }

    fn register_and_send(&mut self, seq: u32, bytes: &[u8], handler: ResponseHandler) -> Result<()> {
        self.register(seq, handler);
        if let Err(e) = self.transport.send(bytes) {
            error!(seq, error = %e, "failed to send message");
            self.responses.remove(&seq);
            return Err(e);
        }
        Ok(())
    }

    /// Report every response handler whose deadline has passed.
    fn sweep_expired_responses(&mut self) {
        let now = self.clock.now();
        let mut expired: Vec<u32> = self
            .responses
            .iter()
            .filter(|(_, pending)| pending.deadline <= now)
            .map(|(seq, _)| *seq)
            .collect();
        expired.sort_unstable();

        for seq in expired {
            let Some(mut pending) = self.responses.remove(&seq) else {
                continue;
            };
            info!(seq, "timed out waiting for response");
            pending
                .handler
                .error(self, AuxiliaryMessageType::TimeoutWaitingForResponse, None);
        }
    }

    /// Forget the handler for `seq`, or drop a dump still waiting in the
    /// queue. Returns `false` if nothing was registered.
    pub fn remove_response_handler(&mut self, seq: u32) -> bool {
        if self.responses.remove(&seq).is_some() {
            return true;
        }
        if self.dispatching == Some(seq) {
            self.dispatch_cancelled = true;
            return true;
        }
        if let Some(index) = self.dumps.iter().position(|d| d.seq == seq && !d.sent) {
            self.dumps.remove(index);
            return true;
        }
        false
    }

    pub fn has_response_handler(&self, seq: u32) -> bool {
        self.responses.contains_key(&seq)
    }

    // Broadcast handlers

    /// Register a handler for messages no request is waiting for.
    ///
    /// Handlers run in registration order.
    pub fn add_broadcast_handler(
        &mut self,
        handler: impl FnMut(&mut Manager, &NetlinkMessage) + 'static,
    ) -> HandlerId {
        let id = HandlerId(self.next_handler_id);
        self.next_handler_id += 1;
        self.broadcast.push((id, Some(Box::new(handler))));
        id
    }

    pub fn remove_broadcast_handler(&mut self, id: HandlerId) -> bool {
        let before = self.broadcast.len();
        self.broadcast.retain(|(handler_id, _)| *handler_id != id);
        self.broadcast.len() != before
    }

    pub fn has_broadcast_handler(&self, id: HandlerId) -> bool {
        self.broadcast.iter().any(|(handler_id, _)| *handler_id == id)
    }

    pub fn clear_broadcast_handlers(&mut self) {
        self.broadcast.clear();
    }

    fn broadcast_slot(&mut self, id: HandlerId) -> Option<&mut Option<BroadcastHandler>> {
        self.broadcast
            .iter_mut()
            .find(|(handler_id, _)| *handler_id == id)
            .map(|(_, slot)| slot)
    }

    fn dispatch_broadcast(&mut self, message: &NetlinkMessage) {
        let ids: Vec<HandlerId> = self.broadcast.iter().map(|(id, _)| *id).collect();
        if ids.is_empty() {
            debug!(seq = message.sequence_number(), "no broadcast handlers, dropping message");
            return;
        }
        for id in ids {
            let Some(mut handler) = self.broadcast_slot(id).and_then(Option::take) else {
                continue;
            };
            handler(self, message);
            if let Some(slot) = self.broadcast_slot(id) {
                *slot = Some(handler);
            }
        }
    }

    // Receiving

    /// Drain every datagram the transport has queued. Returns how many were
    /// processed.
    pub fn receive_available(&mut self) -> Result<usize> {
        let mut count = 0;
        loop {
            match self.transport.recv() {
                Ok(bytes) => {
                    self.on_datagram(&bytes);
                    count += 1;
                }
                Err(e) if e.is_would_block() => return Ok(count),
                Err(e) => return Err(e),
            }
        }
    }

    /// Process one received datagram.
    ///
    /// Every message in it is dispatched in order. An invalid header stops
    /// processing; messages before it are still delivered. A message that
    /// fails to decode is logged and skipped.
    pub fn on_datagram(&mut self, bytes: &[u8]) {
        let mut offset = 0;
        while offset < bytes.len() {
            let mut packet = match NetlinkPacket::new(&bytes[offset..]) {
                Ok(packet) => packet,
                Err(e) => {
                    error!(offset, error = %e, "invalid packet, dropping rest of datagram");
                    break;
                }
            };
            offset += nlmsg_align(packet.length());

            let context = MessageContext {
                nl80211_command: None,
                is_broadcast: !self.responses.contains_key(&packet.sequence_number()),
            };
            match self.factory.create(&mut packet, &context) {
                Ok(message) => self.dispatch(message),
                Err(e) => error!(
                    message_type = packet.message_type(),
                    seq = packet.sequence_number(),
                    error = %e,
                    "failed to decode message"
                ),
            }
        }
    }

    fn dispatch(&mut self, message: NetlinkMessage) {
        let seq = message.sequence_number();

        if self.dump_in_flight() == Some(seq) && !(message.is_multi() && !message.is_done()) {
            if let Some(error) = message.as_error_ack()
                && error.is_busy()
                && self.dump_retries_left > 0
            {
                debug!(
                    seq,
                    retries_left = self.dump_retries_left,
                    "dump busy, scheduling resend"
                );
                self.dump_timeout = None;
                self.last_dump_error = error.error();
                self.dump_resend = Some(self.clock.now() + self.config.dump_retry_delay);
                return;
            }
            debug!(seq, "dump complete");
            self.complete_dump();
        }

        if let Some(pending) = self.responses.remove(&seq) {
            self.deliver(seq, pending, &message);
            return;
        }

        if message.as_error_ack().is_some() {
            debug!("dropping unrequested {}", message);
            return;
        }
        self.dispatch_broadcast(&message);
    }

    fn deliver(&mut self, seq: u32, mut pending: PendingResponse, message: &NetlinkMessage) {
        let generation = self.generation;
        let previous = self.dispatching.replace(seq);
        let previous_cancelled = std::mem::take(&mut self.dispatch_cancelled);

        let handler = &mut pending.handler;
        let keep = match message.as_error_ack() {
            Some(error) if error.is_ack() => handler.ack(self) == AckDisposition::Keep,
            Some(_) => {
                handler.error(self, AuxiliaryMessageType::ErrorFromKernel, Some(message));
                false
            }
            None if message.is_done() => {
                handler.error(self, AuxiliaryMessageType::Done, Some(message));
                false
            }
            None => {
                if handler.accepts(message) {
                    handler.message(self, message);
                } else {
                    warn!(seq, "unexpected response type: {}", message);
                    handler.error(
                        self,
                        AuxiliaryMessageType::UnexpectedResponseType,
                        Some(message),
                    );
                }
                message.is_multi()
            }
        };

        let cancelled = std::mem::replace(&mut self.dispatch_cancelled, previous_cancelled);
        self.dispatching = previous;
        if keep && !cancelled && generation == self.generation {
            pending.deadline = self.clock.now() + self.config.response_timeout;
            self.responses.insert(seq, pending);
        }
    }

    // Dumps

    fn dump_in_flight(&self) -> Option<u32> {
        self.dumps.front().filter(|d| d.sent).map(|d| d.seq)
    }

    fn arm_dump(&mut self) {
        self.dump_timeout = Some(self.clock.now() + self.config.dump_timeout);
        self.dump_resend = None;
        self.dump_retries_left = self.config.max_dump_retries;
        self.last_dump_error = 0;
    }

    fn complete_dump(&mut self) {
        self.dump_timeout = None;
        self.dump_resend = None;
        self.dumps.pop_front();
        self.send_next_dump();
    }

    fn send_next_dump(&mut self) {
        loop {
            let Some(next) = self.dumps.front_mut() else {
                return;
            };
            if next.sent {
                return;
            }
            next.sent = true;
            let seq = next.seq;
            let bytes = next.bytes.clone();
            let handler = next.handler.take().unwrap_or_default();

            self.register(seq, handler);
            match self.transport.send(&bytes) {
                Ok(()) => {
                    debug!(seq, "sent queued dump");
                    self.arm_dump();
                    return;
                }
                Err(e) => {
                    error!(seq, error = %e, "failed to send queued dump");
                    self.dumps.pop_front();
                    if let Some(mut pending) = self.responses.remove(&seq) {
                        let synthesized = NetlinkMessage::error_ack(seq, libc::EIO);
                        pending.handler.error(
                            self,
                            AuxiliaryMessageType::ErrorFromKernel,
                            Some(&synthesized),
                        );
                    }
                }
            }
        }
    }

    fn resend_dump(&mut self) {
        let Some(dump) = self.dumps.front().filter(|d| d.sent) else {
            return;
        };
        let seq = dump.seq;
        let bytes = dump.bytes.clone();
        self.dump_retries_left = self.dump_retries_left.saturating_sub(1);

        debug!(seq, retries_left = self.dump_retries_left, "resending dump");
        match self.transport.send(&bytes) {
            Ok(()) => self.dump_timeout = Some(self.clock.now() + self.config.dump_timeout),
            Err(e) => {
                error!(seq, error = %e, "failed to resend dump");
                let synthesized = NetlinkMessage::error_ack(seq, self.last_dump_error);
                self.complete_dump();
                self.dispatch(synthesized);
            }
        }
    }

    fn on_dump_timeout(&mut self) {
        let Some(seq) = self.dump_in_flight() else {
            return;
        };
        info!(seq, "timed out waiting for dump to complete");
        let pending = self.responses.remove(&seq);
        self.complete_dump();
        if let Some(mut pending) = pending {
            pending
                .handler
                .error(self, AuxiliaryMessageType::TimeoutWaitingForResponse, None);
        }
    }

    // Timers and tasks

    /// Run `task` once `delay` has passed.
    pub fn post_delayed(
        &mut self,
        delay: Duration,
        task: impl FnOnce(&mut Manager) + 'static,
    ) -> TaskId {
        let id = TaskId(self.next_task_id);
        self.next_task_id += 1;
        self.tasks.insert(
            id,
            DelayedTask {
                deadline: self.clock.now() + delay,
                task: Box::new(task),
            },
        );
        id
    }

    pub fn cancel_task(&mut self, id: TaskId) -> bool {
        self.tasks.remove(&id).is_some()
    }

    /// Earliest armed timer: dump timeout, dump resend or posted task.
    pub fn next_deadline(&self) -> Option<Instant> {
        [self.dump_timeout, self.dump_resend]
            .into_iter()
            .flatten()
            .chain(self.tasks.values().map(|t| t.deadline))
            .min()
    }

    /// Fire every timer that is due. Returns how many fired.
    ///
    /// Timers armed by the callbacks themselves wait for the next call.
    pub fn run_expired_timers(&mut self) -> usize {
        let now = self.clock.now();
        let mut fired = 0;

        if self.dump_resend.is_some_and(|at| at <= now) {
            self.dump_resend = None;
            self.resend_dump();
            fired += 1;
        }
        if self.dump_timeout.is_some_and(|at| at <= now) {
            self.dump_timeout = None;
            self.on_dump_timeout();
            fired += 1;
        }

        let mut due: Vec<(Instant, TaskId)> = self
            .tasks
            .iter()
            .filter(|(_, task)| task.deadline <= now)
            .map(|(id, task)| (task.deadline, *id))
            .collect();
        due.sort_unstable();
        for (_, id) in due {
            if let Some(task) = self.tasks.remove(&id) {
                (task.task)(self);
                fired += 1;
            }
        }
        fired
    }

    // Families

    /// Resolve a generic netlink family id by name.
    ///
    /// Cached names return immediately. Otherwise this sends
    /// `CTRL_CMD_GETFAMILY` and blocks, feeding received data through the
    /// normal dispatch path, until the reply arrives or
    /// [`ManagerConfig::family_wait`] passes. On success `factory_method`, if
    /// given, is registered for the family id.
    pub fn get_family(&mut self, name: &str, factory_method: Option<FactoryMethod>) -> Result<u16> {
        if let Some(info) = self.families.get(name) {
            let id = info.id;
            if let Some(method) = factory_method {
                self.factory.add_factory_method(id, method);
            }
            return Ok(id);
        }

        let key = name.to_string();
        let handler = ResponseHandler::new()
            .expect_family(Family::Control)
            .on_message(move |manager, message| manager.record_family(&key, message))
            .on_error(|_, kind, message| match message {
                Some(message) => debug!(%kind, "family request: {}", message),
                None => debug!(%kind, "family request"),
            });
        self.send_message(ControlMessage::get_family(name)?, handler)?;

        let deadline = self.clock.now() + self.config.family_wait;
        let id = loop {
            if let Some(info) = self.families.get(name) {
                break info.id;
            }
            let now = self.clock.now();
            if now >= deadline {
                warn!(family = name, "timed out resolving family");
                return Err(Error::FamilyNotFound {
                    name: name.to_string(),
                });
            }
            if !self.transport.wait_readable(deadline - now)? {
                continue;
            }
            match self.transport.recv() {
                Ok(bytes) => self.on_datagram(&bytes),
                Err(e) if e.is_would_block() => {}
                Err(e) => return Err(e),
            }
        };

        if let Some(method) = factory_method {
            self.factory.add_factory_method(id, method);
        }
        Ok(id)
    }

    /// Cache the family a `CTRL_CMD_NEWFAMILY` reply describes, under the
    /// name it carries (`requested` if it carries none).
    fn record_family(&mut self, requested: &str, message: &NetlinkMessage) {
        let Some(generic) = message.as_generic() else {
            return;
        };
        match FamilyInfo::from_attributes(generic.attributes()) {
            Ok(info) => {
                let name = if info.name.is_empty() {
                    requested.to_string()
                } else {
                    info.name.clone()
                };
                if name != requested {
                    warn!(requested, family = %name, "family reply names another family");
                }
                info!(
                    family = %name,
                    id = info.id,
                    groups = info.mcast_groups.len(),
                    "resolved family"
                );
                self.families.insert(name, info);
            }
            Err(e) => warn!(family = requested, error = %e, "unusable family description"),
        }
    }

    /// Cached id of `family`.
    pub fn family_id(&self, family: &str) -> Option<u16> {
        self.families.get(family).map(|info| info.id)
    }

    pub fn family_info(&self, family: &str) -> Option<&FamilyInfo> {
        self.families.get(family)
    }

    /// Id of multicast `group` in a resolved `family`.
    pub fn multicast_group_id(&self, family: &str, group: &str) -> Result<u32> {
        let info = self.families.get(family).ok_or_else(|| Error::FamilyNotFound {
            name: family.to_string(),
        })?;
        info.mcast_groups
            .get(group)
            .copied()
            .ok_or_else(|| Error::GroupNotFound {
                family: family.to_string(),
                group: group.to_string(),
            })
    }

    /// Join multicast `group` of a resolved `family`.
    pub fn subscribe_to_events(&mut self, family: &str, group: &str) -> Result<()> {
        let id = self.multicast_group_id(family, group)?;
        self.transport.subscribe(id)?;
        info!(family, group, id, "subscribed to multicast group");
        Ok(())
    }

    /// Drop every handler, queued dump, timer, task and cached family.
    pub fn reset(&mut self) {
        self.responses.clear();
        self.broadcast.clear();
        self.dumps.clear();
        self.dump_timeout = None;
        self.dump_resend = None;
        self.dump_retries_left = 0;
        self.last_dump_error = 0;
        self.tasks.clear();
        self.families.clear();
        self.factory = MessageFactory::new();
        self.dispatch_cancelled = false;
        self.generation += 1;
    }
}
