use crate::entity::EntityId;
use crate::record::{FlightSummary, Record, StateVector};
use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use reqwest::header::ACCEPT;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

pub const FR24_BASE_URL: &str = "https://fr24api.flightradar24.com";
pub const OPENSKY_BASE_URL: &str = "https://opensky-network.org";

const FR24_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("upstream answered {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("malformed payload: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("no answer within {0:?}")]
    Timeout(Duration),
    #[error("query window of {0} reaches before the representable range")]
    Window(ChronoDuration),
    #[error("{0}")]
    Unsupported(String),
}

/// A flight-data provider queried once per entity per tick.
///
/// `Ok(None)` means the provider answered but has nothing for the entity,
/// which is not an error.
#[async_trait]
pub trait FlightSource: Send + Sync {
    fn name(&self) -> &'static str;

    async fn fetch(&self, entity: &EntityId) -> Result<Option<Record>, FetchError>;
}

fn http_client(timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder()
        .timeout(timeout)
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()
}

async fn body_of(resp: Response) -> Result<String, FetchError> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(FetchError::Status { status, body });
    }
    Ok(resp.text().await?)
}

/// Flightradar24 flight-summary client, queried by registration.
pub struct Fr24Client {
    http: Client,
    base_url: String,
    token: String,
    lookback: ChronoDuration,
}

impl Fr24Client {
    pub fn new(
        token: String,
        base_url: impl Into<String>,
        timeout: Duration,
        lookback: ChronoDuration,
    ) -> Result<Self, reqwest::Error> {
        Ok(Self {
            http: http_client(timeout)?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
            lookback,
        })
    }
}

/// `(from, to)` bounds of the summary query ending at `now`.
pub fn query_window(
    now: DateTime<Utc>,
    lookback: ChronoDuration,
) -> Result<(String, String), FetchError> {
    let from = now
        .checked_sub_signed(lookback)
        .ok_or(FetchError::Window(lookback))?;
    Ok((
        from.format(FR24_TIME_FORMAT).to_string(),
        now.format(FR24_TIME_FORMAT).to_string(),
    ))
}

#[derive(Deserialize)]
struct SummaryPage {
    #[serde(default)]
    data: Option<Vec<FlightSummary>>,
}

/// The newest flight of a summary response, if there is one.
pub fn decode_summary(body: &str) -> Result<Option<FlightSummary>, FetchError> {
    let page: SummaryPage = serde_json::from_str(body)?;
    Ok(page.data.unwrap_or_default().into_iter().next())
}

#[async_trait]
impl FlightSource for Fr24Client {
    fn name(&self) -> &'static str {
        "flightradar24"
    }

    async fn fetch(&self, entity: &EntityId) -> Result<Option<Record>, FetchError> {
        if entity.is_icao24() {
            return Err(FetchError::Unsupported(format!(
                "flightradar24 summaries are queried by registration, got hex {entity}"
            )));
        }

        let (from, to) = query_window(Utc::now(), self.lookback)?;
        let resp = self
            .http
            .get(format!("{}/api/flight-summary/light", self.base_url))
            .bearer_auth(&self.token)
            .header(ACCEPT, "application/json")
            .header("Accept-Version", "v1")
            .query(&[
                ("registrations", entity.as_str()),
                ("flight_datetime_from", from.as_str()),
                ("flight_datetime_to", to.as_str()),
                ("limit", "1"),
                ("sort", "desc"),
            ])
            .send()
            .await?;

        let body = body_of(resp).await?;
        Ok(decode_summary(&body)?.map(Record::Summary))
    }
}

/// OpenSky live-states client, queried by transponder address.
pub struct OpenSkyClient {
    http: Client,
    base_url: String,
    credentials: Option<(String, String)>,
}

impl OpenSkyClient {
    pub fn new(
        base_url: impl Into<String>,
        timeout: Duration,
        credentials: Option<(String, String)>,
    ) -> Result<Self, reqwest::Error> {
        Ok(Self {
            http: http_client(timeout)?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credentials,
        })
    }
}

#[derive(Deserialize)]
struct StatesPage {
    #[serde(default)]
    states: Option<Vec<RawState>>,
}

/// OpenSky documents states as positional arrays; some mirrors return
/// objects with the same field names.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawState {
    Positional(Vec<Value>),
    Object(NamedState),
}

#[derive(Deserialize)]
struct NamedState {
    icao24: Option<String>,
    callsign: Option<String>,
    origin_country: Option<String>,
    longitude: Option<f64>,
    latitude: Option<f64>,
    baro_altitude: Option<f64>,
    geo_altitude: Option<f64>,
    #[serde(default)]
    on_ground: bool,
    velocity: Option<f64>,
    true_track: Option<f64>,
    vertical_rate: Option<f64>,
    squawk: Option<String>,
}

fn text_at(state: &[Value], i: usize) -> Option<String> {
    state
        .get(i)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn number_at(state: &[Value], i: usize) -> Option<f64> {
    state.get(i).and_then(Value::as_f64)
}

fn non_blank(s: Option<String>) -> Option<String> {
    s.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

impl RawState {
    fn into_vector(self, fallback_icao24: &str) -> StateVector {
        match self {
            // [icao24, callsign, origin_country, time_position, last_contact,
            //  longitude, latitude, baro_altitude, on_ground, velocity,
            //  true_track, vertical_rate, sensors, geo_altitude, squawk, ...]
            RawState::Positional(s) => StateVector {
                icao24: text_at(&s, 0).unwrap_or_else(|| fallback_icao24.to_string()),
                callsign: text_at(&s, 1),
                origin_country: text_at(&s, 2),
                longitude: number_at(&s, 5),
                latitude: number_at(&s, 6),
                baro_altitude: number_at(&s, 7),
                on_ground: s.get(8).and_then(Value::as_bool).unwrap_or(false),
                velocity: number_at(&s, 9),
                true_track: number_at(&s, 10),
                vertical_rate: number_at(&s, 11),
                geo_altitude: number_at(&s, 13),
                squawk: text_at(&s, 14),
            },
            RawState::Object(s) => StateVector {
                icao24: non_blank(s.icao24).unwrap_or_else(|| fallback_icao24.to_string()),
                callsign: non_blank(s.callsign),
                origin_country: non_blank(s.origin_country),
                longitude: s.longitude,
                latitude: s.latitude,
                baro_altitude: s.baro_altitude,
                geo_altitude: s.geo_altitude,
                on_ground: s.on_ground,
                velocity: s.velocity,
                true_track: s.true_track,
                vertical_rate: s.vertical_rate,
                squawk: non_blank(s.squawk),
            },
        }
    }
}

/// First state vector of a `states/all` response. `states: null` is how
/// OpenSky reports an aircraft that is not currently seen.
pub fn decode_states(body: &str, icao24: &str) -> Result<Option<StateVector>, FetchError> {
    let page: StatesPage = serde_json::from_str(body)?;
    Ok(page
        .states
        .and_then(|states| states.into_iter().next())
        .map(|s| s.into_vector(icao24)))
}

#[async_trait]
impl FlightSource for OpenSkyClient {
    fn name(&self) -> &'static str {
        "opensky"
    }

    async fn fetch(&self, entity: &EntityId) -> Result<Option<Record>, FetchError> {
        if !entity.is_icao24() {
            return Err(FetchError::Unsupported(format!(
                "opensky states are queried by ICAO24 address, got {entity}"
            )));
        }

        let mut req = self
            .http
            .get(format!("{}/api/states/all", self.base_url))
            .header(ACCEPT, "application/json")
            .query(&[("icao24", entity.as_str())]);
        if let Some((user, pass)) = &self.credentials {
            req = req.basic_auth(user, Some(pass));
        }

        let body = body_of(req.send().await?).await?;
        Ok(decode_states(&body, entity.as_str())?.map(Record::Position))
    }
}
