//! nlscan command - nl80211 queries and scans.
//!
//! Talks generic netlink directly through `nlwifi`: resolves the nl80211
//! family, dumps wiphys and interfaces, runs batched scans and prints
//! multicast events.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use nlwifi::netlink::genl::nl80211::{self, Nl80211Attr, Nl80211Cmd, Nl80211Group, Nl80211Message};
use nlwifi::netlink::{AuxiliaryMessageType, EventLoop, Manager, NetlinkMessage, ResponseHandler};
use nlwifi::wifi::{ScanSession, ScanSessionConfig};
use nlwifi::{Error, Result};
use tokio::sync::oneshot;

/// Frequencies scanned when none are given: 2.4 GHz channels 1-13 and the
/// non-DFS 5 GHz channels.
const DEFAULT_FREQUENCIES: &[u16] = &[
    2412, 2417, 2422, 2427, 2432, 2437, 2442, 2447, 2452, 2457, 2462, 2467, 2472, 5180, 5200,
    5220, 5240, 5745, 5765, 5785, 5805, 5825,
];

#[derive(Parser)]
#[command(name = "nlscan", version, about = "nl80211 query and scan utility")]
struct Cli {
    /// Output in JSON format where supported.
    #[arg(short = 'j', long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show the nl80211 family id and multicast groups.
    Family,
    /// Dump every wiphy.
    Wiphy,
    /// Dump every wireless interface.
    Interfaces,
    /// Scan in batches and print the results.
    Scan {
        /// Interface index.
        ifindex: u32,
        /// Frequency to scan, in MHz (repeatable).
        #[arg(short = 'f', long = "freq")]
        frequencies: Vec<u16>,
        /// Frequency seen before, as FREQ:COUNT (repeatable).
        #[arg(long = "seen", value_parser = parse_seen)]
        seen: Vec<(u16, u64)>,
        /// SSID to scan for (repeatable).
        #[arg(short = 's', long = "ssid")]
        ssids: Vec<String>,
        /// Seconds to wait for each batch.
        #[arg(short = 't', long, default_value_t = 10)]
        timeout: u64,
    },
    /// Print nl80211 multicast events until interrupted.
    Events {
        /// Multicast group (repeatable).
        #[arg(short = 'g', long = "group", default_values = [Nl80211Group::SCAN, Nl80211Group::MLME])]
        groups: Vec<String>,
    },
}

fn parse_seen(s: &str) -> std::result::Result<(u16, u64), String> {
    let (frequency, count) = s
        .split_once(':')
        .ok_or_else(|| format!("expected FREQ:COUNT, got {}", s))?;
    let frequency = frequency
        .parse()
        .map_err(|e| format!("invalid frequency '{}': {}", frequency, e))?;
    let count = count
        .parse()
        .map_err(|e| format!("invalid count '{}': {}", count, e))?;
    Ok((frequency, count))
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    let cli = Cli::parse();

    let mut manager = Manager::open()?;
    let family_id = manager.get_family(nl80211::FAMILY_NAME, Some(nl80211::create_message))?;

    match cli.command {
        Command::Family => {
            let Some(info) = manager.family_info(nl80211::FAMILY_NAME) else {
                return Err(Error::FamilyNotFound {
                    name: nl80211::FAMILY_NAME.to_string(),
                });
            };
            if cli.json {
                print_json(info);
            } else {
                println!("{} id {} version {}", info.name, info.id, info.version);
                let mut groups: Vec<_> = info.mcast_groups.iter().collect();
                groups.sort_by_key(|(_, id)| **id);
                for (name, id) in groups {
                    println!("    group {} id {}", name, id);
                }
            }
        }
        Command::Wiphy => {
            for message in dump(&mut manager, Nl80211Message::get_wiphy(family_id)).await? {
                println!("{}", message);
            }
        }
        Command::Interfaces => {
            for message in dump(&mut manager, Nl80211Message::get_interfaces(family_id)).await? {
                println!("{}", message);
            }
        }
        Command::Scan {
            ifindex,
            frequencies,
            seen,
            ssids,
            timeout,
        } => {
            let available = if frequencies.is_empty() {
                DEFAULT_FREQUENCIES.to_vec()
            } else {
                frequencies
            };
            let seen: HashMap<u16, u64> = seen.into_iter().collect();
            scan(
                &mut manager,
                family_id,
                ifindex,
                &seen,
                &available,
                &ssids,
                Duration::from_secs(timeout),
                cli.json,
            )
            .await?;
        }
        Command::Events { groups } => {
            for group in &groups {
                manager.subscribe_to_events(nl80211::FAMILY_NAME, group)?;
            }
            manager.add_broadcast_handler(|_, message| println!("{}", message));
            EventLoop::run_until(&mut manager, async {
                let _ = tokio::signal::ctrl_c().await;
            })
            .await?;
        }
    }

    Ok(())
}

fn print_json(value: &impl serde::Serialize) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("failed to encode JSON: {}", e),
    }
}

/// Send a dump request and collect every part until it completes.
async fn dump(manager: &mut Manager, request: NetlinkMessage) -> Result<Vec<NetlinkMessage>> {
    let parts = Rc::new(RefCell::new(Vec::new()));
    let (tx, rx) = oneshot::channel();
    let mut tx = Some(tx);

    let collected = parts.clone();
    let handler = ResponseHandler::new()
        .on_message(move |_, message| collected.borrow_mut().push(message.clone()))
        .on_error(move |_, kind, message| {
            let outcome = match kind {
                AuxiliaryMessageType::Done => Ok(()),
                AuxiliaryMessageType::ErrorFromKernel => Err(message
                    .and_then(NetlinkMessage::as_error_ack)
                    .and_then(|e| e.to_error())
                    .unwrap_or_else(|| Error::InvalidMessage("dump failed".into()))),
                other => Err(Error::InvalidMessage(format!("dump ended: {}", other))),
            };
            if let Some(tx) = tx.take() {
                let _ = tx.send(outcome);
            }
        });
    manager.send_message(request, handler)?;

    match EventLoop::run_until(manager, rx).await? {
        Ok(outcome) => outcome?,
        Err(_) => return Err(Error::InvalidMessage("dump abandoned".into())),
    }
    Ok(parts.take())
}

#[allow(clippy::too_many_arguments)]
async fn scan(
    manager: &mut Manager,
    family_id: u16,
    ifindex: u32,
    seen: &HashMap<u16, u64>,
    available: &[u16],
    ssids: &[String],
    timeout: Duration,
    json: bool,
) -> Result<()> {
    manager.subscribe_to_events(nl80211::FAMILY_NAME, Nl80211Group::SCAN)?;

    // Completes a batch: the command of the results event, or `None` when
    // the session gave up.
    let finished: Rc<RefCell<Option<oneshot::Sender<Option<u8>>>>> = Rc::new(RefCell::new(None));

    let on_failed = finished.clone();
    let session = ScanSession::new(
        family_id,
        ifindex,
        seen,
        available,
        ScanSessionConfig::default(),
        move || {
            if let Some(tx) = on_failed.borrow_mut().take() {
                let _ = tx.send(None);
            }
        },
    );
    for ssid in ssids {
        session.add_ssid(ssid.as_bytes());
    }

    let notify = finished.clone();
    let handler = manager.add_broadcast_handler(move |_, message| {
        let Some(event) = message.as_generic() else {
            return;
        };
        let command = event.command();
        if command != Nl80211Cmd::NEW_SCAN_RESULTS && command != Nl80211Cmd::SCAN_ABORTED {
            return;
        }
        if event.attributes().get_u32(Nl80211Attr::IFINDEX).ok() != Some(ifindex) {
            return;
        }
        if let Some(tx) = notify.borrow_mut().take() {
            let _ = tx.send(Some(command));
        }
    });

    while session.has_more_frequencies() {
        let (tx, rx) = oneshot::channel();
        *finished.borrow_mut() = Some(tx);
        session.initiate_scan(manager)?;

        match EventLoop::run_until(manager, tokio::time::timeout(timeout, rx)).await? {
            Ok(Ok(Some(command))) if command == Nl80211Cmd::SCAN_ABORTED => {
                tracing::warn!(ifindex, "scan aborted");
                break;
            }
            Ok(Ok(Some(_))) => {}
            Ok(Ok(None)) => {
                tracing::warn!(ifindex, "scan request failed");
                break;
            }
            Ok(Err(_)) | Err(_) => {
                tracing::warn!(ifindex, "no scan results before timeout");
                break;
            }
        }
    }
    manager.remove_broadcast_handler(handler);

    let results = dump(manager, Nl80211Message::get_scan(family_id, ifindex)?).await?;
    let report = session.report();
    if json {
        print_json(&report);
    } else {
        for bss in &results {
            println!("{}", bss);
        }
        println!("{}", report);
    }
    Ok(())
}
