//! 802.11 information elements carried in `NL80211_BSS_INFORMATION_ELEMENTS`.
//!
//! The payload is a run of `{id: u8, len: u8, data}` elements. A few ids are
//! decoded into children of a nested attribute; the rest are skipped.

use tracing::debug;

use crate::netlink::attribute::{Attribute, AttributeValue};
use crate::netlink::attribute_list::AttributeList;
use crate::netlink::error::{Error, Result};

const ELEMENT_HEADER_LEN: usize = 2;

/// Element ids this parser understands.
pub struct ElementId;

impl ElementId {
    pub const SSID: u8 = 0;
    pub const SUPPORTED_RATES: u8 = 1;
    pub const HT_CAPABILITIES: u8 = 45;
    pub const EXTENDED_RATES: u8 = 50;
    pub const HT_OPERATION: u8 = 61;
    pub const VHT_CAPABILITIES: u8 = 191;
    pub const VHT_OPERATION: u8 = 192;
}

/// Bit marking a rate as part of the basic rate set.
const BASIC_RATE_FLAG: u8 = 0x80;

fn add_rates(elements: &mut AttributeList, id: u16, data: &[u8]) -> Result<()> {
    let mut rates = AttributeList::new();
    for (index, rate) in data.iter().enumerate() {
        rates.add_u8(index as u16, format!("Rate-{}", index), rate & !BASIC_RATE_FLAG)?;
    }
    elements.insert(Attribute::with_value(
        id,
        "Rates",
        AttributeValue::Nested(rates),
    ))
}

fn add_element(elements: &mut AttributeList, element: u8, data: &[u8]) -> Result<()> {
    let id = element as u16;
    let raw_name = match element {
        ElementId::SSID => {
            return elements.add_string(id, "SSID", String::from_utf8_lossy(data));
        }
        ElementId::SUPPORTED_RATES | ElementId::EXTENDED_RATES => {
            return add_rates(elements, id, data);
        }
        ElementId::HT_CAPABILITIES => "HTCapabilities",
        ElementId::HT_OPERATION => "HTOperation",
        ElementId::VHT_CAPABILITIES => "VHTCapabilities",
        ElementId::VHT_OPERATION => "VHTOperation",
        _ => return Ok(()),
    };
    elements.add_raw(id, raw_name, data)
}

/// Custom parser for `NL80211_BSS_INFORMATION_ELEMENTS`.
///
/// An element whose length runs past the payload fails the whole attribute.
/// Repeated element ids keep the first occurrence.
pub fn parse_information_elements(
    list: &mut AttributeList,
    id: u16,
    name: &'static str,
    payload: &[u8],
) -> Result<()> {
    let mut elements = AttributeList::new();
    let mut rest = payload;
    while rest.len() > ELEMENT_HEADER_LEN {
        let element = rest[0];
        let len = rest[1] as usize;
        let end = ELEMENT_HEADER_LEN + len;
        if end > rest.len() {
            return Err(Error::InvalidAttribute(format!(
                "information element {} needs {} bytes, {} left",
                element,
                len,
                rest.len() - ELEMENT_HEADER_LEN
            )));
        }

        let data = &rest[ELEMENT_HEADER_LEN..end];
        if elements.contains(element as u16) {
            debug!(element, "skipping repeated information element");
        } else {
            add_element(&mut elements, element, data)?;
        }
        rest = &rest[end..];
    }

    list.insert(Attribute::with_value(
        id,
        name,
        AttributeValue::Nested(elements),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    const NAME: &str = "NL80211_BSS_INFORMATION_ELEMENTS";

    fn parse(payload: &[u8]) -> Result<AttributeList> {
        let mut list = AttributeList::new();
        parse_information_elements(&mut list, 6, NAME, payload)?;
        Ok(list)
    }

    #[test]
    fn test_parse_beacon_elements() {
        let payload = [
            0x00, 0x04, b'h', b'o', b'm', b'e', // SSID
            0x01, 0x03, 0x82, 0x84, 0x0c, // supported rates
            0x2d, 0x02, 0xaa, 0xbb, // HT capabilities
            0xdd, 0x01, 0x00, // vendor specific, skipped
        ];
        let list = parse(&payload).unwrap();
        let elements = list.nested(6).unwrap();
        assert!(list.get(6).unwrap().has_value());
        assert_eq!(elements.len(), 3);
        assert_eq!(elements.get_string(0).unwrap(), "home");

        let rates = elements.nested(1).unwrap();
        assert_eq!(rates.get_u8(0).unwrap(), 2);
        assert_eq!(rates.get_u8(1).unwrap(), 4);
        assert_eq!(rates.get_u8(2).unwrap(), 12);
        assert_eq!(rates.get(2).unwrap().name(), "Rate-2");

        assert_eq!(elements.get_raw(45).unwrap(), &[0xaa, 0xbb]);
        assert_eq!(elements.get(45).unwrap().name(), "HTCapabilities");
    }

    #[test]
    fn test_repeated_element_keeps_first() {
        let payload = [0x00, 0x01, b'a', 0x00, 0x01, b'b'];
        let list = parse(&payload).unwrap();
        assert_eq!(list.nested(6).unwrap().get_string(0).unwrap(), "a");
    }

    #[test]
    fn test_overrunning_element_fails() {
        let payload = [0x00, 0x08, b'a', b'b'];
        assert!(matches!(parse(&payload), Err(Error::InvalidAttribute(_))));
    }

    #[test]
    fn test_short_tail_is_ignored() {
        let payload = [0x00, 0x00, 0x01, 0x00];
        let list = parse(&payload).unwrap();
        let elements = list.nested(6).unwrap();
        assert_eq!(elements.get_string(0).unwrap(), "");
        // Only two bytes remain after the SSID, which is not enough to loop.
        assert!(!elements.contains(1));
    }
}
