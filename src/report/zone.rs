//! Fixed reporting time zone, independent of the host's locale.

use chrono::{DateTime, FixedOffset, Offset, Utc};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ZoneError {
    #[error("invalid UTC offset '{0}': expected [+-]HH:MM")]
    InvalidOffset(String),
}

/// A UTC offset plus the label operators know it by (e.g. `MSK`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportZone {
    pub offset: FixedOffset,
    pub label: String,
}

impl ReportZone {
    pub fn new(offset: FixedOffset, label: impl Into<String>) -> Self {
        Self {
            offset,
            label: label.into(),
        }
    }

    /// Parse `+03:00`, `-0530`, `+3` style offsets.
    pub fn parse(offset: &str, label: &str) -> Result<Self, ZoneError> {
        let invalid = || ZoneError::InvalidOffset(offset.to_string());
        let trimmed = offset.trim();

        let (sign, rest) = match trimmed.chars().next() {
            Some('+') => (1, &trimmed[1..]),
            Some('-') => (-1, &trimmed[1..]),
            _ => return Err(invalid()),
        };

        let (hours, minutes) = match rest.split_once(':') {
            Some((h, m)) => (h, m),
            None if rest.len() == 4 => match (rest.get(..2), rest.get(2..)) {
                (Some(h), Some(m)) => (h, m),
                _ => return Err(invalid()),
            },
            None => (rest, "0"),
        };
        let hours: i32 = hours.parse().map_err(|_| invalid())?;
        let minutes: i32 = minutes.parse().map_err(|_| invalid())?;
        if !(0..=14).contains(&hours) || !(0..60).contains(&minutes) {
            return Err(invalid());
        }

        let seconds = sign * (hours * 3600 + minutes * 60);
        let offset = FixedOffset::east_opt(seconds).ok_or_else(invalid)?;
        let label = if label.trim().is_empty() {
            format!("UTC{}", offset)
        } else {
            label.trim().to_string()
        };
        Ok(Self { offset, label })
    }

    pub fn now(&self) -> DateTime<FixedOffset> {
        Utc::now().with_timezone(&self.offset)
    }

    /// Render an instant as `DD.MM.YYYY, HH:MM:SS <label>` in this zone.
    pub fn format(&self, at: &DateTime<Utc>) -> String {
        format!(
            "{} {}",
            at.with_timezone(&self.offset).format("%d.%m.%Y, %H:%M:%S"),
            self.label
        )
    }
}

impl Default for ReportZone {
    fn default() -> Self {
        let offset = FixedOffset::east_opt(3 * 3600).unwrap_or_else(|| Utc.fix());
        Self::new(offset, "MSK")
    }
}

impl std::fmt::Display for ReportZone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (UTC{})", self.label, self.offset)
    }
}
