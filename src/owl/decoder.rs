//! Turns one multicast datagram into a [`Message`].
//!
//! The root tag picks the message kind. Anything we do not know how to read
//! (weather reports, firmware status, future additions) comes back as
//! [`DecodeError::Unsupported`] rather than being guessed at.

use crate::error::DecodeError;
use crate::owl::message::{Channel, Electricity, Heating, Message, Signal, Zone};
use crate::owl::scalar;

use roxmltree::{Document, Node};
use rust_decimal::Decimal;

const ELECTRICITY: &str = "electricity";
const HEATING: &str = "heating";

pub fn parse_datagram(datagram: &[u8]) -> Result<Message, DecodeError> {
    let text = std::str::from_utf8(datagram)?;
    let document = Document::parse(text)?;
    let root = document.root_element();

    match root.tag_name().name() {
        ELECTRICITY => electricity(root).map(Message::Electricity),
        HEATING => heating(root).map(Message::Heating),
        other => Err(DecodeError::Unsupported(other.to_string())),
    }
}

fn electricity(root: Node) -> Result<Electricity, DecodeError> {
    expect_tag(root, ELECTRICITY)?;

    let mac = attribute(root, "id")?;
    let signal = signal(root)?;
    let battery_pc = scalar_attribute(single_child(root, "battery")?, "level", Some("%"))?;

    let channels = children(root, "chan")
        .map(channel)
        .collect::<Result<Vec<_>, _>>()?;

    Electricity::new(mac, signal, battery_pc, channels)
}

fn channel(node: Node) -> Result<Channel, DecodeError> {
    let channel_id = attribute(node, "id")?;

    let curr = single_child(node, "curr")?;
    expect_units(curr, "w")?;
    let day = single_child(node, "day")?;
    expect_units(day, "wh")?;

    Ok(Channel::new(channel_id, scalar_text(curr)?, scalar_text(day)?))
}

fn heating(root: Node) -> Result<Heating, DecodeError> {
    expect_tag(root, HEATING)?;

    let mac = attribute(root, "id")?;
    let signal = signal(root)?;
    let battery_mv = scalar_attribute(single_child(root, "battery")?, "level", Some("mV"))?;

    let zones = children(root, "temperature")
        .map(zone)
        .collect::<Result<Vec<_>, _>>()?;

    Heating::new(mac, signal, battery_mv, zones)
}

// heating payloads carry no units at all
fn zone(node: Node) -> Result<Zone, DecodeError> {
    let zone_id = attribute(node, "zone")?;
    let current = scalar_text(single_child(node, "current")?)?;
    let required = scalar_text(single_child(node, "required")?)?;

    Ok(Zone::new(zone_id, current, required))
}

fn signal(root: Node) -> Result<Signal, DecodeError> {
    let node = single_child(root, "signal")?;

    Ok(Signal {
        rssi: scalar_attribute(node, "rssi", None)?,
        lqi: scalar_attribute(node, "lqi", None)?,
    })
}

fn expect_tag(node: Node, tag: &str) -> Result<(), DecodeError> {
    let found = node.tag_name().name();
    if found != tag {
        return Err(DecodeError::validation(format!(
            "expected <{}> root element, got <{}>",
            tag, found
        )));
    }
    Ok(())
}

fn expect_units(node: Node, units: &str) -> Result<(), DecodeError> {
    let found = attribute(node, "units")?;
    if found != units {
        return Err(DecodeError::validation(format!(
            "<{}> units must be {:?}, got {:?}",
            node.tag_name().name(),
            units,
            found
        )));
    }
    Ok(())
}

fn children<'a, 'input: 'a>(
    node: Node<'a, 'input>,
    tag: &'static str,
) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children()
        .filter(move |n| n.is_element() && n.tag_name().name() == tag)
}

fn single_child<'a, 'input: 'a>(
    node: Node<'a, 'input>,
    tag: &'static str,
) -> Result<Node<'a, 'input>, DecodeError> {
    let mut found = children(node, tag);

    let child = found.next().ok_or_else(|| {
        DecodeError::validation(format!(
            "missing <{}> in <{}>",
            tag,
            node.tag_name().name()
        ))
    })?;

    if found.next().is_some() {
        return Err(DecodeError::validation(format!(
            "more than one <{}> in <{}>",
            tag,
            node.tag_name().name()
        )));
    }

    Ok(child)
}

fn attribute<'a, 'input: 'a>(node: Node<'a, 'input>, name: &str) -> Result<&'a str, DecodeError> {
    node.attribute(name).ok_or_else(|| {
        DecodeError::validation(format!(
            "missing attribute {:?} on <{}>",
            name,
            node.tag_name().name()
        ))
    })
}

fn scalar_attribute(node: Node, name: &str, unit: Option<&str>) -> Result<Decimal, DecodeError> {
    scalar::parse(attribute(node, name)?, unit).map_err(|err| {
        DecodeError::validation(format!("<{}> {}: {}", node.tag_name().name(), name, err))
    })
}

// units were already checked on the element, so the text is a bare number
fn scalar_text(node: Node) -> Result<Decimal, DecodeError> {
    scalar::parse(node.text().unwrap_or_default(), None).map_err(|err| {
        DecodeError::validation(format!("<{}>: {}", node.tag_name().name(), err))
    })
}
