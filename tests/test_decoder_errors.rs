mod common;
use common::*;
use owl_bridge::owl::parse_datagram;
use owl_bridge::prelude::DecodeError;

fn electricity(body: &str) -> String {
    format!(
        "<electricity id='443719123456'><signal rssi='-42' lqi='15'/><battery level='100%'/>{}</electricity>",
        body
    )
}

fn validation(payload: &str) -> String {
    match parse_datagram(payload.as_bytes()) {
        Err(DecodeError::Validation(detail)) => detail,
        other => panic!("expected validation error, got {:?}", other),
    }
}

#[test]
fn weather_is_unsupported() {
    common_setup();

    assert_eq!(
        parse_datagram(Factory::weather_datagram().as_bytes()),
        Err(DecodeError::Unsupported("weather".to_string()))
    );
}

#[test]
fn unknown_root_is_unsupported() {
    let err = parse_datagram(b"<solar id='1'><current><generating units='w'>1.00</generating></current></solar>")
        .unwrap_err();

    assert_eq!(err, DecodeError::Unsupported("solar".to_string()));
    assert_eq!(err.kind(), "unsupported");
}

#[test]
fn malformed_xml() {
    let payloads: [&[u8]; 5] = [
        b"",
        b"not xml at all",
        b"<electricity id='1'>",
        b"<electricity id='1'></heating>",
        b"\xff\xfe<electricity/>",
    ];

    for payload in payloads {
        let err = parse_datagram(payload).unwrap_err();
        assert!(matches!(err, DecodeError::Parse(_)), "{:?} -> {:?}", payload, err);
    }
}

#[test]
fn doctype_rejected() {
    let payload = "<!DOCTYPE electricity [<!ENTITY a 'aaaa'>]><electricity id='&a;'/>";
    assert!(matches!(
        parse_datagram(payload.as_bytes()),
        Err(DecodeError::Parse(_))
    ));
}

#[test]
fn duplicate_channel() {
    let payload = electricity(
        "<chan id='0'><curr units='w'>257.00</curr><day units='wh'>17.13</day></chan>\
         <chan id='0'><curr units='w'>96.00</curr><day units='wh'>6.40</day></chan>",
    );

    assert_eq!(validation(&payload), "duplicate channel id \"0\"");
}

#[test]
fn kilowatts_rejected() {
    let payload = electricity(
        "<chan id='0'><curr units='kw'>0.257</curr><day units='wh'>17.13</day></chan>",
    );

    assert_eq!(validation(&payload), "<curr> units must be \"w\", got \"kw\"");
}

#[test]
fn day_units_checked() {
    let payload = electricity(
        "<chan id='0'><curr units='w'>257.00</curr><day units='kwh'>0.017</day></chan>",
    );

    assert_eq!(validation(&payload), "<day> units must be \"wh\", got \"kwh\"");
}

#[test]
fn missing_units_attribute() {
    let payload =
        electricity("<chan id='0'><curr>257.00</curr><day units='wh'>17.13</day></chan>");

    assert_eq!(validation(&payload), "missing attribute \"units\" on <curr>");
}

#[test]
fn missing_mac() {
    let payload = "<electricity><signal rssi='-42' lqi='15'/><battery level='100%'/></electricity>";

    assert_eq!(validation(payload), "missing attribute \"id\" on <electricity>");
}

#[test]
fn missing_signal() {
    let payload = "<electricity id='443719123456'><battery level='100%'/></electricity>";

    assert_eq!(validation(payload), "missing <signal> in <electricity>");
}

#[test]
fn repeated_battery() {
    let payload = electricity("<battery level='90%'/>");

    assert_eq!(validation(&payload), "more than one <battery> in <electricity>");
}

#[test]
fn battery_without_percent() {
    let payload = "<electricity id='443719123456'><signal rssi='-42' lqi='15'/><battery level='100'/></electricity>";

    assert_eq!(
        validation(payload),
        "<battery> level: unexpected unit in \"100\", expected \"%\""
    );
}

#[test]
fn non_numeric_reading() {
    let payload =
        electricity("<chan id='0'><curr units='w'>lots</curr><day units='wh'>17.13</day></chan>");

    assert_eq!(validation(&payload), "<curr>: malformed numeric value \"lots\"");
}

#[test]
fn empty_reading() {
    let payload = electricity("<chan id='0'><curr units='w'/><day units='wh'>17.13</day></chan>");

    assert_eq!(validation(&payload), "<curr>: malformed numeric value \"\"");
}

#[test]
fn non_numeric_signal() {
    let payload = "<electricity id='443719123456'><signal rssi='strong' lqi='15'/><battery level='100%'/></electricity>";

    assert!(validation(payload).starts_with("<signal> rssi: malformed numeric value"));
}
