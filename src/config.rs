use crate::entity::{EntityError, EntityId};
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
  #[error("missing required environment variable {0}")]
  Missing(&'static str),
  #[error("{key}={value:?} is invalid: {reason}")]
  Invalid {
    key: &'static str,
    value: String,
    reason: String,
  },
  #[error("TRACK_AIRCRAFT: {0}")]
  Entity(#[from] EntityError),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Provider {
  Flightradar24,
  OpenSky,
}

impl FromStr for Provider {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_lowercase().as_str() {
      "fr24" | "flightradar24" => Ok(Self::Flightradar24),
      "opensky" => Ok(Self::OpenSky),
      other => Err(format!("unknown provider `{other}`, expect `fr24` or `opensky`")),
    }
  }
}

/// Everything read from the environment at start-up. Immutable afterwards.
#[derive(Clone, Debug)]
pub struct Config {
  pub bot_token: String,
  pub chat_id: i64,
  pub provider: Provider,
  pub fr24_token: Option<String>,
  pub opensky_credentials: Option<(String, String)>,
  pub entities: Vec<EntityId>,
  pub poll_interval: Duration,
  pub fetch_timeout: Duration,
  pub lookback: chrono::Duration,
}

impl Config {
  pub fn from_env() -> Result<Self, ConfigError> {
    Self::from_lookup(|k| std::env::var(k).ok())
  }

  /// Build the config from any key lookup, so tests need not touch the
  /// process environment.
  pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
  where
    F: Fn(&str) -> Option<String>,
  {
    let get = |k: &str| lookup(k).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

    let bot_token = get("TG_TOKEN")
      .or_else(|| get("TELOXIDE_TOKEN"))
      .ok_or(ConfigError::Missing("TG_TOKEN"))?;

    let chat_id: i64 = parse("TG_CHAT", get("TG_CHAT").ok_or(ConfigError::Missing("TG_CHAT"))?)?;
    if chat_id == 0 {
      return Err(invalid("TG_CHAT", "0", "chat id can not be zero"));
    }

    let provider = match get("FLIGHT_PROVIDER") {
      Some(p) => parse("FLIGHT_PROVIDER", p)?,
      None => Provider::Flightradar24,
    };

    let fr24_token = get("FR24_TOKEN");
    if provider == Provider::Flightradar24 && fr24_token.is_none() {
      return Err(ConfigError::Missing("FR24_TOKEN"));
    }

    let opensky_credentials = match (get("OPENSKY_USER"), get("OPENSKY_PASS")) {
      (Some(user), Some(pass)) => Some((user, pass)),
      (None, None) => None,
      (Some(_), None) => return Err(ConfigError::Missing("OPENSKY_PASS")),
      (None, Some(_)) => return Err(ConfigError::Missing("OPENSKY_USER")),
    };

    // Expect: `export TRACK_AIRCRAFT="ZS-CJI,ZS-TLF"`
    let raw = get("TRACK_AIRCRAFT").ok_or(ConfigError::Missing("TRACK_AIRCRAFT"))?;
    let mut entities = Vec::new();
    for id in raw.split(',').filter(|x| !x.trim().is_empty()) {
      // fr24 is queried by registration, opensky by transponder address
      let id = match provider {
        Provider::Flightradar24 => EntityId::registration(id)?,
        Provider::OpenSky => EntityId::icao24(id)?,
      };
      if !entities.contains(&id) {
        entities.push(id);
      }
    }
    if entities.is_empty() {
      return Err(ConfigError::Missing("TRACK_AIRCRAFT"));
    }

    let poll_interval = Duration::from_secs(positive("POLL_SEC", get("POLL_SEC"), 60)?);
    let fetch_timeout = Duration::from_secs(positive(
      "FETCH_TIMEOUT_SEC",
      get("FETCH_TIMEOUT_SEC"),
      10,
    )?);
    let lookback = lookback_hours(positive("LOOKBACK_HOURS", get("LOOKBACK_HOURS"), 24)?)?;

    Ok(Self {
      bot_token,
      chat_id,
      provider,
      fr24_token,
      opensky_credentials,
      entities,
      poll_interval,
      fetch_timeout,
      lookback,
    })
  }
}

/// Upper bound of the summary query window.
pub const MAX_LOOKBACK_HOURS: u64 = 30 * 24;

fn lookback_hours(hours: u64) -> Result<chrono::Duration, ConfigError> {
  let too_long = || {
    invalid(
      "LOOKBACK_HOURS",
      &hours.to_string(),
      &format!("must be at most {MAX_LOOKBACK_HOURS}"),
    )
  };
  if hours > MAX_LOOKBACK_HOURS {
    return Err(too_long());
  }
  i64::try_from(hours)
    .ok()
    .and_then(chrono::Duration::try_hours)
    .ok_or_else(too_long)
}

fn invalid(key: &'static str, value: &str, reason: &str) -> ConfigError {
  ConfigError::Invalid {
    key,
    value: value.to_string(),
    reason: reason.to_string(),
  }
}

fn parse<T>(key: &'static str, value: String) -> Result<T, ConfigError>
where
  T: FromStr,
  <T as FromStr>::Err: Display,
{
  value.parse::<T>().map_err(|e| ConfigError::Invalid {
    key,
    reason: e.to_string(),
    value,
  })
}

fn positive(key: &'static str, value: Option<String>, default: u64) -> Result<u64, ConfigError> {
  match value {
    None => Ok(default),
    Some(v) => match parse::<u64>(key, v)? {
      0 => Err(invalid(key, "0", "must be greater than zero")),
      n => Ok(n),
    },
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::collections::HashMap;

  fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
    let env: HashMap<String, String> = vars
      .iter()
      .map(|(k, v)| (k.to_string(), v.to_string()))
      .collect();
    Config::from_lookup(|k| env.get(k).cloned())
  }

  const BASE: [(&str, &str); 4] = [
    ("TG_TOKEN", "123:abc"),
    ("TG_CHAT", "-1001234"),
    ("FR24_TOKEN", "secret"),
    ("TRACK_AIRCRAFT", "ZS-CJI, zs-tlf"),
  ];

  #[test]
  fn defaults_apply() {
    let cfg = load(&BASE).unwrap();
    assert_eq!(cfg.chat_id, -1001234);
    assert_eq!(cfg.provider, Provider::Flightradar24);
    assert_eq!(cfg.poll_interval, Duration::from_secs(60));
    assert_eq!(cfg.fetch_timeout, Duration::from_secs(10));
    assert_eq!(cfg.lookback, chrono::Duration::hours(24));
    let ids: Vec<&str> = cfg.entities.iter().map(EntityId::as_str).collect();
    assert_eq!(ids, vec!["ZS-CJI", "ZS-TLF"]);
  }

  #[test]
  fn teloxide_token_is_accepted() {
    let mut vars = BASE[1..].to_vec();
    vars.push(("TELOXIDE_TOKEN", "456:def"));
    assert_eq!(load(&vars).unwrap().bot_token, "456:def");
  }

  #[test]
  fn missing_values_are_named() {
    for key in ["TG_TOKEN", "TG_CHAT", "FR24_TOKEN", "TRACK_AIRCRAFT"] {
      let vars: Vec<_> = BASE.iter().copied().filter(|(k, _)| *k != key).collect();
      match load(&vars) {
        Err(ConfigError::Missing(k)) => assert_eq!(k, key),
        other => panic!("expected {key} to be missing, got {other:?}"),
      }
    }
  }

  #[test]
  fn rejects_bad_numbers() {
    let mut vars = BASE.to_vec();
    vars.push(("POLL_SEC", "soon"));
    assert!(matches!(load(&vars), Err(ConfigError::Invalid { key: "POLL_SEC", .. })));

    let mut vars = BASE.to_vec();
    vars.push(("POLL_SEC", "0"));
    assert!(matches!(load(&vars), Err(ConfigError::Invalid { key: "POLL_SEC", .. })));
  }

  #[test]
  fn opensky_needs_hex_addresses() {
    let vars = [
      ("TG_TOKEN", "123:abc"),
      ("TG_CHAT", "42"),
      ("FLIGHT_PROVIDER", "opensky"),
      ("TRACK_AIRCRAFT", "00b1f3"),
    ];
    let cfg = load(&vars).unwrap();
    assert_eq!(cfg.provider, Provider::OpenSky);
    assert!(cfg.fr24_token.is_none());

    let vars = [
      ("TG_TOKEN", "123:abc"),
      ("TG_CHAT", "42"),
      ("FLIGHT_PROVIDER", "opensky"),
      ("TRACK_AIRCRAFT", "ZS-CJI"),
    ];
    assert!(matches!(
      load(&vars),
      Err(ConfigError::Entity(EntityError::NotIcao24(_)))
    ));
  }

  #[test]
  fn fr24_keeps_hex_looking_registrations() {
    let mut vars = BASE[..3].to_vec();
    vars.push(("TRACK_AIRCRAFT", "C12345"));
    let cfg = load(&vars).unwrap();
    assert!(!cfg.entities[0].is_icao24());
    assert_eq!(cfg.entities[0].as_str(), "C12345");
  }

  #[test]
  fn lookback_is_bounded() {
    for hours in ["721", "10000000000", "3000000000000000", "18446744073709551615"] {
      let mut vars = BASE.to_vec();
      vars.push(("LOOKBACK_HOURS", hours));
      assert!(matches!(
        load(&vars),
        Err(ConfigError::Invalid { key: "LOOKBACK_HOURS", .. })
      ));
    }

    let mut vars = BASE.to_vec();
    vars.push(("LOOKBACK_HOURS", "720"));
    assert_eq!(load(&vars).unwrap().lookback, chrono::Duration::hours(720));
  }

  #[test]
  fn half_credentials_are_rejected() {
    let mut vars = BASE.to_vec();
    vars.push(("OPENSKY_USER", "me"));
    assert!(matches!(load(&vars), Err(ConfigError::Missing("OPENSKY_PASS"))));
  }
}
