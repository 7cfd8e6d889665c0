//! Generic validated value objects with smart constructors.
//!
//! Value objects are immutable, equality-compared by value (not identity),
//! and validated at construction time. This module implements the "parse,
//! don't validate" principle: if you have a value object, it is guaranteed
//! to satisfy its invariants.

use crate::error::{ValidationError, ValidationErrorKind};
use chrono::{DateTime, Duration, TimeZone, Utc};
use std::fmt;
use std::marker::PhantomData;

/// A string with compile-time length bounds.
///
/// Guarantees:
/// - Non-empty (at least `MIN` non-whitespace characters)
/// - At most `MAX` characters
/// - Trimmed of leading/trailing whitespace
///
/// Uses const generics to encode length constraints in the type system.
/// This allows different string types with different bounds to share
/// implementation while remaining distinct types.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct BoundedString<const MIN: usize, const MAX: usize> {
    value: String,
    _marker: PhantomData<()>,
}

impl<const MIN: usize, const MAX: usize> BoundedString<MIN, MAX> {
    /// Create a new BoundedString, validating and normalizing the input.
    ///
    /// The input is trimmed before validation. The character count
    /// (not byte count) is used for length checks.
    ///
    /// # Errors
    ///
    /// - [`ValidationError`] with `TooShort` if trimmed length < MIN
    /// - [`ValidationError`] with `TooLong` if trimmed length > MAX
    pub fn new(value: impl Into<String>, field_name: &str) -> Result<Self, ValidationError> {
        let value = value.into();
        let trimmed = value.trim();
        let char_count = trimmed.chars().count();

        if char_count < MIN {
            return Err(ValidationError::new(ValidationErrorKind::TooShort {
                field: field_name.to_string(),
                min_length: MIN,
                actual_length: char_count,
            }));
        }

        if char_count > MAX {
            return Err(ValidationError::new(ValidationErrorKind::TooLong {
                field: field_name.to_string(),
                max_length: MAX,
                actual_length: char_count,
            }));
        }

        Ok(Self {
            value: trimmed.to_string(),
            _marker: PhantomData,
        })
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.value
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.value
    }

    #[must_use]
    pub const fn min_length() -> usize {
        MIN
    }

    #[must_use]
    pub const fn max_length() -> usize {
        MAX
    }
}

impl<const MIN: usize, const MAX: usize> fmt::Debug for BoundedString<MIN, MAX> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundedString")
            .field("value", &self.value)
            .field("min", &MIN)
            .field("max", &MAX)
            .finish()
    }
}

impl<const MIN: usize, const MAX: usize> fmt::Display for BoundedString<MIN, MAX> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

impl<const MIN: usize, const MAX: usize> AsRef<str> for BoundedString<MIN, MAX> {
    fn as_ref(&self) -> &str {
        &self.value
    }
}

/// Opaque tenant identifier. Every cached datum is partitioned by it.
pub type TenantIdString = BoundedString<1, 64>;

#[derive(Clone, PartialEq, Eq, Hash)]
pub struct TenantId(TenantIdString);

impl TenantId {
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        Ok(Self(TenantIdString::new(value, "tenant_id")?))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Debug for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TenantId({})", self.0.as_str())
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Canonical hour bucket: `YYYY-MM-DD-HH`, always UTC.
///
/// This is the temporal grain every hourly bin, cache TTL, and range query
/// is expressed in. Construction validates the format; once built, a
/// `HourKey` is guaranteed to round-trip through [`HourKey::to_string`] and
/// [`HourKey::parse`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HourKey {
    year: i32,
    month: u32,
    day: u32,
    hour: u32,
}

impl HourKey {
    /// Build the hour key containing the given UTC instant.
    #[must_use]
    pub fn from_datetime(at: DateTime<Utc>) -> Self {
        Self {
            year: at.format("%Y").to_string().parse().unwrap_or(1970),
            month: at.format("%m").to_string().parse().unwrap_or(1),
            day: at.format("%d").to_string().parse().unwrap_or(1),
            hour: at.format("%H").to_string().parse().unwrap_or(0),
        }
    }

    /// Parse a canonical `YYYY-MM-DD-HH` string.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] with `InvalidFormat` if the string does not
    /// match the four-component, zero-padded layout, or describes an
    /// impossible calendar date/hour.
    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        let invalid = || {
            ValidationError::new(ValidationErrorKind::InvalidFormat {
                field: "hour_key".to_string(),
                expected: "YYYY-MM-DD-HH".to_string(),
            })
        };

        let parts: Vec<&str> = value.split('-').collect();
        let [y, m, d, h]: [&str; 4] = parts.try_into().map_err(|_| invalid())?;
        let year: i32 = y.parse().map_err(|_| invalid())?;
        let month: u32 = m.parse().map_err(|_| invalid())?;
        let day: u32 = d.parse().map_err(|_| invalid())?;
        let hour: u32 = h.parse().map_err(|_| invalid())?;

        if !(1..=12).contains(&month) || !(1..=31).contains(&day) || hour > 23 {
            return Err(invalid());
        }
        Utc.with_ymd_and_hms(year, month, day, hour, 0, 0)
            .single()
            .ok_or_else(invalid)?;

        Ok(Self {
            year,
            month,
            day,
            hour,
        })
    }

    /// The instant this hour bucket starts at.
    #[must_use]
    pub fn start(&self) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(self.year, self.month, self.day, self.hour, 0, 0)
            .single()
            .unwrap_or_default()
    }

    /// The hour immediately preceding this one.
    #[must_use]
    pub fn previous(&self) -> Self {
        Self::from_datetime(self.start() - Duration::hours(1))
    }

    /// The hour immediately following this one.
    #[must_use]
    pub fn next(&self) -> Self {
        Self::from_datetime(self.start() + Duration::hours(1))
    }

    /// Whether this is the hour bucket containing `now`.
    #[must_use]
    pub fn is_current(&self, now: DateTime<Utc>) -> bool {
        *self == Self::from_datetime(now)
    }
}

impl fmt::Display for HourKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02}-{:02}",
            self.year, self.month, self.day, self.hour
        )
    }
}
