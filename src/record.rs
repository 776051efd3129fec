use serde::Deserialize;

/// Latest flight of an aircraft as reported by the Flightradar24 summary API.
///
/// Only the fields describing the flight itself take part in equality; the
/// provider's bookkeeping (`fr24_id`, `first_seen`, `last_seen`) moves on
/// every poll and is not deserialized.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct FlightSummary {
    pub flight: Option<String>,
    pub callsign: Option<String>,
    pub reg: Option<String>,
    #[serde(rename = "type")]
    pub aircraft_type: Option<String>,
    pub orig_icao: Option<String>,
    pub dest_icao: Option<String>,
    pub datetime_takeoff: Option<String>,
    pub datetime_landed: Option<String>,
    pub hex: Option<String>,
    pub flight_ended: Option<bool>,
}

/// Live position of an aircraft from the OpenSky `states` endpoint.
///
/// Units are the provider's: metres, metres per second and degrees.
/// `time_position` and `last_contact` are dropped so a parked aircraft does
/// not count as changed on every poll.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StateVector {
    pub icao24: String,
    pub callsign: Option<String>,
    pub origin_country: Option<String>,
    pub longitude: Option<f64>,
    pub latitude: Option<f64>,
    pub baro_altitude: Option<f64>,
    pub geo_altitude: Option<f64>,
    pub on_ground: bool,
    pub velocity: Option<f64>,
    pub true_track: Option<f64>,
    pub vertical_rate: Option<f64>,
    pub squawk: Option<String>,
}

impl StateVector {
    /// Geometric altitude when known, barometric otherwise.
    pub fn altitude(&self) -> Option<f64> {
        self.geo_altitude.or(self.baro_altitude)
    }
}

/// A normalized snapshot produced by one fetch.
#[derive(Clone, Debug, PartialEq)]
pub enum Record {
    Summary(FlightSummary),
    Position(StateVector),
}
