use crate::entity::EntityId;
use crate::record::{FlightSummary, Record, StateVector};
use std::collections::HashMap;
use teloxide::utils::html::{bold, code_inline, escape};
use url::Url;

/// Shown for a missing text field.
pub const MISSING_TEXT: &str = "N/A";
/// Shown for a missing measurement.
pub const MISSING_NUMBER: &str = "--";

/// metres per second -> knots
const MPS_TO_KNOTS: f64 = 1.943;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Link {
    pub label: String,
    pub url: Url,
}

/// HTML text plus the buttons that go under it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notification {
    pub text: String,
    pub links: Vec<Link>,
}

fn or_missing(v: Option<&str>) -> &str {
    v.filter(|s| !s.is_empty()).unwrap_or(MISSING_TEXT)
}

fn number(v: Option<f64>, precision: usize, unit: &str) -> String {
    match v {
        Some(v) => format!("{v:.precision$}{unit}"),
        None => MISSING_NUMBER.to_string(),
    }
}

fn line(label: &str, value: &str) -> String {
    format!("• {label}: {}\n", code_inline(value))
}

fn link(label: String, url: &str) -> Option<Link> {
    Url::parse(url).ok().map(|url| Link { label, url })
}

pub fn notification(entity: &EntityId, record: &Record) -> Notification {
    match record {
        Record::Summary(s) => summary_notification(entity, s),
        Record::Position(s) => position_notification(entity, s),
    }
}

fn route(s: &FlightSummary) -> String {
    match (s.orig_icao.as_deref(), s.dest_icao.as_deref()) {
        (None, None) => MISSING_TEXT.to_string(),
        (orig, dest) => format!("{} → {}", or_missing(orig), or_missing(dest)),
    }
}

fn summary_notification(entity: &EntityId, s: &FlightSummary) -> Notification {
    let flight = s.flight.as_deref().filter(|f| !f.trim().is_empty());

    let mut text = format!("✈️ {}\n", bold(&escape(&format!("{entity} Flight Summary"))));
    text += &line("Flight No", or_missing(flight));
    text += &line("Callsign ", or_missing(s.callsign.as_deref()));
    text += &line("Route    ", &route(s));
    text += &line("Take-off ", or_missing(s.datetime_takeoff.as_deref()));
    text += &line("Landed   ", or_missing(s.datetime_landed.as_deref()));
    text += &line("Hex Code ", or_missing(s.hex.as_deref()));

    let links = flight
        .and_then(|f| {
            link(
                format!("View {entity} on FR24"),
                &format!(
                    "https://www.flightradar24.com/data/flights/{}",
                    f.trim().to_lowercase()
                ),
            )
        })
        .into_iter()
        .collect();

    Notification { text, links }
}

fn position_notification(entity: &EntityId, s: &StateVector) -> Notification {
    let coords = match (s.latitude, s.longitude) {
        (Some(lat), Some(lon)) => format!("{lat:.3}, {lon:.3}"),
        _ => MISSING_NUMBER.to_string(),
    };

    let mut text = format!("📡 {}\n", bold(&escape(&format!("{entity} Position"))));
    text += &line("Callsign ", or_missing(s.callsign.as_deref()));
    text += &line("Country  ", or_missing(s.origin_country.as_deref()));
    text += &line("Position ", &coords);
    text += &line("Altitude ", &number(s.altitude(), 0, " m"));
    text += &line("Speed    ", &number(s.velocity.map(|v| v * MPS_TO_KNOTS), 1, " kt"));
    text += &line("Heading  ", &number(s.true_track, 0, "°"));
    text += &line("Climb    ", &number(s.vertical_rate, 1, " m/s"));
    text += &line("On ground", if s.on_ground { "yes" } else { "no" });

    let mut links = Vec::new();
    if let (Some(lat), Some(lon)) = (s.latitude, s.longitude) {
        links.extend(link(
            format!("{entity} on the map"),
            &format!("https://www.google.com/maps?q={lat:.5},{lon:.5}"),
        ));
    }
    if !s.icao24.is_empty() {
        links.extend(link(
            format!("{entity} on OpenSky"),
            &format!(
                "https://opensky-network.org/aircraft-profile?icao24={}",
                s.icao24
            ),
        ));
    }

    Notification { text, links }
}

/// Reply for `/status`, built only from what has already been sent.
pub fn status(entities: &[EntityId], last: &HashMap<EntityId, Record>) -> String {
    if last.is_empty() {
        return "⚠️ No flight data fetched yet.".to_string();
    }

    let mut text = String::from("🛰 Last known data:\n\n");
    for entity in entities {
        let name = bold(&escape(entity.as_str()));
        match last.get(entity) {
            Some(Record::Summary(s)) => {
                text += &format!(
                    "• {name}:\n  - Take-off: {}\n  - Landed: {}\n\n",
                    escape(or_missing(s.datetime_takeoff.as_deref())),
                    escape(or_missing(s.datetime_landed.as_deref())),
                );
            }
            Some(Record::Position(s)) => {
                let coords = match (s.latitude, s.longitude) {
                    (Some(lat), Some(lon)) => format!("{lat:.3}, {lon:.3}"),
                    _ => MISSING_NUMBER.to_string(),
                };
                text += &format!(
                    "• {name}:\n  - Position: {coords}\n  - Altitude: {}\n\n",
                    number(s.altitude(), 0, " m"),
                );
            }
            None => text += &format!("• {name}: No data\n\n"),
        }
    }

    text.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cji() -> EntityId {
        "ZS-CJI".parse().unwrap()
    }

    fn summary() -> FlightSummary {
        FlightSummary {
            flight: Some("CJ1".into()),
            datetime_takeoff: Some("2024-03-02T08:00:00".into()),
            hex: Some("00B1F3".into()),
            ..Default::default()
        }
    }

    #[test]
    fn summary_lists_every_field() {
        let n = notification(&cji(), &Record::Summary(summary()));
        assert!(n.text.starts_with("✈️ <b>ZS-CJI Flight Summary</b>\n"));
        assert!(n.text.contains("• Flight No: <code>CJ1</code>"));
        assert!(n.text.contains("• Take-off : <code>2024-03-02T08:00:00</code>"));
        assert!(n.text.contains("• Landed   : <code>N/A</code>"));
        assert!(n.text.contains("• Route    : <code>N/A</code>"));
        assert_eq!(n.links.len(), 1);
        assert_eq!(
            n.links[0].url.as_str(),
            "https://www.flightradar24.com/data/flights/cj1"
        );
        assert_eq!(n.links[0].label, "View ZS-CJI on FR24");
    }

    #[test]
    fn missing_flight_number_drops_link() {
        let s = FlightSummary {
            flight: None,
            ..summary()
        };
        let n = notification(&cji(), &Record::Summary(s));
        assert!(n.text.contains("• Flight No: <code>N/A</code>"));
        assert!(n.links.is_empty());
    }

    #[test]
    fn route_shows_known_end() {
        let s = FlightSummary {
            orig_icao: Some("FAGC".into()),
            ..summary()
        };
        let n = notification(&cji(), &Record::Summary(s));
        assert!(n.text.contains("<code>FAGC → N/A</code>"));
    }

    #[test]
    fn values_are_escaped() {
        let s = FlightSummary {
            callsign: Some("<b>x</b>".into()),
            ..summary()
        };
        let n = notification(&cji(), &Record::Summary(s));
        assert!(n.text.contains("&lt;b&gt;x&lt;/b&gt;"));
    }

    #[test]
    fn position_converts_units() {
        let entity: EntityId = "00b1f3".parse().unwrap();
        let sv = StateVector {
            icao24: "00b1f3".into(),
            latitude: Some(-33.96912),
            longitude: Some(18.60148),
            baro_altitude: Some(3048.4),
            velocity: Some(100.0),
            true_track: Some(269.6),
            ..Default::default()
        };
        let n = notification(&entity, &Record::Position(sv));
        assert!(n.text.contains("<code>-33.969, 18.601</code>"));
        assert!(n.text.contains("<code>3048 m</code>"));
        assert!(n.text.contains("<code>194.3 kt</code>"));
        assert!(n.text.contains("<code>270°</code>"));
        assert!(n.text.contains("• Climb    : <code>--</code>"));
        assert_eq!(n.links.len(), 2);
        assert!(n.links[0].url.as_str().starts_with("https://www.google.com/maps?q=-33.96912,18.60148"));
    }

    #[test]
    fn position_without_coordinates_has_no_map() {
        let entity: EntityId = "00b1f3".parse().unwrap();
        let sv = StateVector {
            icao24: "00b1f3".into(),
            latitude: Some(1.0),
            ..Default::default()
        };
        let n = notification(&entity, &Record::Position(sv));
        assert!(n.text.contains("• Position : <code>--</code>"));
        assert_eq!(n.links.len(), 1);
        assert!(n.links[0].url.as_str().contains("opensky-network.org"));
    }

    #[test]
    fn formatting_is_repeatable() {
        let record = Record::Summary(summary());
        assert_eq!(notification(&cji(), &record), notification(&cji(), &record));
    }

    #[test]
    fn status_before_any_data() {
        assert_eq!(
            status(&[cji()], &HashMap::new()),
            "⚠️ No flight data fetched yet."
        );
    }

    #[test]
    fn status_lists_each_entity() {
        let tlf: EntityId = "ZS-TLF".parse().unwrap();
        let last = HashMap::from([(cji(), Record::Summary(summary()))]);
        let text = status(&[cji(), tlf], &last);
        assert!(text.contains("• <b>ZS-CJI</b>:\n  - Take-off: 2024-03-02T08:00:00\n  - Landed: N/A"));
        assert!(text.ends_with("• <b>ZS-TLF</b>: No data"));
    }
}
