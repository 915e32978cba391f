//! Progressive scans over the frequencies a device is likely to find.
//!
//! A [`ScanSession`] orders the frequencies to scan by how often they led to
//! a connection before, then scans them in batches: each
//! [`initiate_scan`](ScanSession::initiate_scan) covers a larger share of the
//! historical weight than the one before, so the likely frequencies are
//! scanned first and the rest only if needed.
//!
//! A trigger that the device rejects with EBUSY is resent after a delay. A
//! missing unicast reply is expected: a successful trigger is answered by a
//! broadcast on the `scan` group, not by a reply to the request.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use std::rc::{Rc, Weak};
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::netlink::genl::Family;
use crate::netlink::genl::nl80211::Nl80211Message;
use crate::netlink::{
    AckDisposition, AuxiliaryMessageType, Manager, NetlinkMessage, ResponseHandler, Result,
};

/// Batching and retry parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanSessionConfig {
    /// Share of the total historical weight added by each scan.
    pub fraction_per_scan: f32,
    /// Smallest batch, unless the pool runs out first.
    pub min_frequencies: usize,
    /// Largest batch. Unbounded by default, so the weight target alone
    /// decides how far past the minimum a batch grows.
    pub max_frequencies: usize,
    /// Delay before resending a trigger rejected with EBUSY.
    pub retry_delay: Duration,
    /// EBUSY resends allowed over the whole session.
    pub max_retries: u32,
}

impl Default for ScanSessionConfig {
    fn default() -> Self {
        Self {
            fraction_per_scan: 0.34,
            min_frequencies: 4,
            max_frequencies: usize::MAX,
            retry_delay: Duration::from_millis(200),
            max_retries: 50,
        }
    }
}

impl ScanSessionConfig {
    pub fn with_fraction_per_scan(mut self, fraction: f32) -> Self {
        self.fraction_per_scan = fraction;
        self
    }

    pub fn with_min_frequencies(mut self, min: usize) -> Self {
        self.min_frequencies = min;
        self
    }

    pub fn with_max_frequencies(mut self, max: usize) -> Self {
        self.max_frequencies = max;
        self
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }
}

/// Summary of a session, for logging and metrics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ScanReport {
    /// Triggers sent, not counting EBUSY resends.
    pub batches: usize,
    pub frequencies_scanned: usize,
    pub frequencies_remaining: usize,
    pub ebusy_retries: u32,
    /// A trigger failed for a reason other than a missing reply.
    pub found_error: bool,
}

impl fmt::Display for ScanReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} batches, {} frequencies scanned, {} remaining, {} EBUSY retries{}",
            self.batches,
            self.frequencies_scanned,
            self.frequencies_remaining,
            self.ebusy_retries,
            if self.found_error { ", failed" } else { "" }
        )
    }
}

struct SessionState {
    family_id: u16,
    ifindex: u32,
    config: ScanSessionConfig,
    /// (frequency, connection count), best first.
    pool: VecDeque<(u16, u64)>,
    total_weight: u64,
    consumed_weight: u64,
    fraction_wanted: f32,
    ssids: Vec<Vec<u8>>,
    batches: usize,
    frequencies_scanned: usize,
    ebusy_retries: u32,
    found_error: bool,
    on_scan_failed: Option<Box<dyn FnOnce()>>,
}

impl SessionState {
    fn next_batch(&mut self, fraction_wanted: f32, min_count: usize, max_count: usize) -> Vec<u16> {
        let target = f64::from(fraction_wanted) * self.total_weight as f64;
        let mut batch = Vec::new();
        while let Some(&(frequency, count)) = self.pool.front() {
            if batch.len() >= max_count {
                break;
            }
            if batch.len() >= min_count && self.consumed_weight as f64 >= target {
                break;
            }
            self.pool.pop_front();
            self.consumed_weight += count;
            batch.push(frequency);
        }
        batch
    }
}

/// Scans a device's frequencies in batches, most likely first.
///
/// The session is driven by the [`Manager`] it sends through: EBUSY resends
/// are posted as manager tasks and replies arrive through manager handlers.
/// Clones share the same session.
#[derive(Clone)]
pub struct ScanSession {
    state: Rc<RefCell<SessionState>>,
}

impl fmt::Debug for ScanSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("ScanSession")
            .field("ifindex", &state.ifindex)
            .field("remaining", &state.pool.len())
            .field("config", &state.config)
            .finish_non_exhaustive()
    }
}

impl ScanSession {
    /// Create a session for interface `ifindex`.
    ///
    /// `previous_counts` maps frequencies (MHz) to how often they led to a
    /// connection. Frequencies in `available_frequencies` with no history are
    /// scanned last. `on_scan_failed` runs at most once, on the first trigger
    /// failure that retries cannot fix.
    pub fn new(
        family_id: u16,
        ifindex: u32,
        previous_counts: &HashMap<u16, u64>,
        available_frequencies: &[u16],
        config: ScanSessionConfig,
        on_scan_failed: impl FnOnce() + 'static,
    ) -> Self {
        let mut pool: Vec<(u16, u64)> = previous_counts
            .iter()
            .map(|(&frequency, &count)| (frequency, count))
            .collect();
        pool.sort_unstable_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        let total_weight: u64 = pool.iter().map(|(_, count)| count).sum();

        let mut seen: HashSet<u16> = pool.iter().map(|(frequency, _)| *frequency).collect();
        let mut unseen: Vec<u16> = available_frequencies
            .iter()
            .copied()
            .filter(|frequency| seen.insert(*frequency))
            .collect();
        unseen.sort_unstable();
        pool.extend(unseen.into_iter().map(|frequency| (frequency, 0)));

        debug!(
            ifindex,
            frequencies = pool.len(),
            total_weight,
            "created scan session"
        );

        Self {
            state: Rc::new(RefCell::new(SessionState {
                family_id,
                ifindex,
                config,
                pool: pool.into(),
                total_weight,
                consumed_weight: 0,
                fraction_wanted: 0.0,
                ssids: Vec::new(),
                batches: 0,
                frequencies_scanned: 0,
                ebusy_retries: 0,
                found_error: false,
                on_scan_failed: Some(Box::new(on_scan_failed)),
            })),
        }
    }

    /// Include `ssid` in every later trigger.
    pub fn add_ssid(&self, ssid: impl Into<Vec<u8>>) {
        self.state.borrow_mut().ssids.push(ssid.into());
    }

    pub fn has_more_frequencies(&self) -> bool {
        !self.state.borrow().pool.is_empty()
    }

    /// Frequencies still waiting to be scanned, best first.
    pub fn remaining_frequencies(&self) -> Vec<u16> {
        self.state.borrow().pool.iter().map(|(frequency, _)| *frequency).collect()
    }

    /// Take the next batch off the pool.
    ///
    /// Frequencies are taken until at least `min_count` were taken and the
    /// weight taken over all batches so far reaches `fraction_wanted` of the
    /// total, or until `max_count` were taken.
    pub fn next_batch(&self, fraction_wanted: f32, min_count: usize, max_count: usize) -> Vec<u16> {
        self.state
            .borrow_mut()
            .next_batch(fraction_wanted, min_count, max_count)
    }

    /// Trigger a scan of the next batch.
    ///
    /// Each call raises the wanted share of the total weight by
    /// [`ScanSessionConfig::fraction_per_scan`]. With nothing left to scan
    /// this logs and does nothing.
    pub fn initiate_scan(&self, manager: &mut Manager) -> Result<()> {
        let message = {
            let mut state = self.state.borrow_mut();
            if state.pool.is_empty() {
                info!(ifindex = state.ifindex, "no frequencies left to scan");
                return Ok(());
            }
            state.fraction_wanted = (state.fraction_wanted + state.config.fraction_per_scan).min(1.0);
            let (fraction, min, max) = (
                state.fraction_wanted,
                state.config.min_frequencies,
                state.config.max_frequencies,
            );
            let batch = state.next_batch(fraction, min, max);
            state.batches += 1;
            state.frequencies_scanned += batch.len();
            debug!(ifindex = state.ifindex, ?batch, "scanning batch");

            let frequencies: Vec<u32> = batch.into_iter().map(u32::from).collect();
            Nl80211Message::trigger_scan(state.family_id, state.ifindex, &frequencies, &state.ssids)?
        };

        if let Err(e) = send_trigger(Rc::downgrade(&self.state), manager, message) {
            fail(&self.state, "trigger could not be sent");
            return Err(e);
        }
        Ok(())
    }

    /// Summarize the session and log the summary.
    pub fn report(&self) -> ScanReport {
        let state = self.state.borrow();
        let report = ScanReport {
            batches: state.batches,
            frequencies_scanned: state.frequencies_scanned,
            frequencies_remaining: state.pool.len(),
            ebusy_retries: state.ebusy_retries,
            found_error: state.found_error,
        };
        info!(ifindex = state.ifindex, "scan session: {}", report);
        report
    }
}

fn send_trigger(
    session: Weak<RefCell<SessionState>>,
    manager: &mut Manager,
    message: NetlinkMessage,
) -> Result<u32> {
    let retry = message.clone();
    let on_reply = session.clone();
    let handler = ResponseHandler::new()
        .expect_family(Family::Nl80211)
        .on_message(move |_, reply| {
            warn!("unexpected unicast reply to scan trigger: {}", reply);
            if let Some(state) = on_reply.upgrade() {
                fail(&state, "unexpected reply");
            }
        })
        .on_ack(|_| {
            debug!("scan trigger acknowledged");
            AckDisposition::Remove
        })
        .on_error(move |manager, kind, reply| {
            on_trigger_error(&session, manager, kind, reply, &retry)
        });
    manager.send_message(message, handler)
}

fn on_trigger_error(
    session: &Weak<RefCell<SessionState>>,
    manager: &mut Manager,
    kind: AuxiliaryMessageType,
    reply: Option<&NetlinkMessage>,
    message: &NetlinkMessage,
) {
    let Some(state) = session.upgrade() else {
        return;
    };
    match kind {
        // Successful triggers are answered on the scan multicast group.
        AuxiliaryMessageType::TimeoutWaitingForResponse => {
            debug!("no unicast reply to scan trigger");
        }
        AuxiliaryMessageType::ErrorFromKernel
            if reply
                .and_then(NetlinkMessage::as_error_ack)
                .is_some_and(|e| e.is_busy()) =>
        {
            let delay = {
                let mut state = state.borrow_mut();
                if state.ebusy_retries >= state.config.max_retries {
                    None
                } else {
                    state.ebusy_retries += 1;
                    debug!(retries = state.ebusy_retries, "device busy, retrying scan trigger");
                    Some(state.config.retry_delay)
                }
            };
            let Some(delay) = delay else {
                fail(&state, "device still busy after all retries");
                return;
            };

            let session = session.clone();
            let message = message.clone();
            manager.post_delayed(delay, move |manager| {
                let Some(state) = session.upgrade() else {
                    return;
                };
                if let Err(e) = send_trigger(session, manager, message) {
                    error!(error = %e, "failed to resend scan trigger");
                    fail(&state, "trigger could not be resent");
                }
            });
        }
        AuxiliaryMessageType::ErrorFromKernel => {
            let reason = reply
                .and_then(NetlinkMessage::as_error_ack)
                .map(|e| e.error_string())
                .unwrap_or_default();
            error!(reason, "scan trigger rejected");
            fail(&state, "rejected by kernel");
        }
        AuxiliaryMessageType::UnexpectedResponseType | AuxiliaryMessageType::Done => {
            error!(%kind, "unexpected auxiliary message for scan trigger");
            fail(&state, "unexpected response");
        }
    }
}

/// Mark the session failed and run the failure callback the first time.
fn fail(state: &Rc<RefCell<SessionState>>, reason: &str) {
    let callback = {
        let mut state = state.borrow_mut();
        state.found_error = true;
        state.on_scan_failed.take()
    };
    if let Some(callback) = callback {
        warn!(reason, "scan failed");
        callback();
    }
}
