use crate::error::Error;
use core::fmt;
use core::str::FromStr;
use uuid::Uuid;

/// Leading character of every rendered id, so that ids are always valid DOM ids.
const PREFIX: char = 'w';

/// A unique identifier for a component.
///
/// (this is just a UUID)
///
/// Generated once when the component is created and never reused while the process runs, so an
/// id that arrives from the client after its component was disposed simply matches nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ComponentId(Uuid);

impl ComponentId {
    pub(crate) fn new() -> ComponentId {
        ComponentId(Uuid::new_v4())
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}{}", PREFIX, self.0.simple())
    }
}

impl FromStr for ComponentId {
    type Err = Error;

    fn from_str(s: &str) -> Result<ComponentId, Error> {
        let invalid = || Error::InvalidId(s.to_string());
        let raw = s.strip_prefix(PREFIX).ok_or_else(invalid)?;
        if raw.len() != 32 {
            return Err(invalid());
        }
        Uuid::parse_str(raw).map(ComponentId).map_err(|_| invalid())
    }
}

#[cfg(test)]
use std::collections::HashSet;

#[test]
fn ids_are_unique() {
    let ids: HashSet<_> = (0..10_000).map(|_| ComponentId::new()).collect();
    assert_eq!(ids.len(), 10_000);
}

#[test]
fn rendered_id_parses_back() {
    let id = ComponentId::new();
    let text = id.to_string();
    assert!(text.starts_with('w'));
    assert_eq!(text.len(), 33);
    assert_eq!(text.parse::<ComponentId>().unwrap(), id);
}

#[test]
fn foreign_text_is_rejected() {
    for text in &["", "a1", "HEARTBEAT", "w1234", "x0123456789abcdef0123456789abcdef"] {
        assert!(text.parse::<ComponentId>().is_err(), "{:?} parsed", text);
    }
    let hyphenated = format!("w{}", Uuid::new_v4().hyphenated());
    assert!(hyphenated.parse::<ComponentId>().is_err());
}
