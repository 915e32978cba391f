//! Wireless operations built on the nl80211 family.

mod scan_session;

pub use scan_session::{ScanReport, ScanSession, ScanSessionConfig};
