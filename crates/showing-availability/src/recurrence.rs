//! Recurrence tokens and the predicate table that matches them against dates.
//!
//! Each [`RecurrenceToken`] has exactly one row in [`TOKEN_TABLE`] holding its
//! wire name, its RFC 5545 equivalent and the predicate that decides whether a
//! calendar date falls on the pattern. Adding a pattern means adding a variant
//! and a row; matching never branches on strings.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Days, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::AvailabilityError;

/// A recurring calendar pattern a blackout rule can repeat on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecurrenceToken {
    Sunday,
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    /// Saturday and Sunday.
    Weekends,
    /// Monday through Friday.
    Weekdays,
    /// The first Monday of each month (day-of-month 1..=7).
    FirstMonday,
    /// The last Friday of each month.
    LastFriday,
}

struct TokenEntry {
    token: RecurrenceToken,
    name: &'static str,
    rrule: &'static str,
    matches: fn(NaiveDate) -> bool,
}

const TOKEN_TABLE: &[TokenEntry] = &[
    TokenEntry {
        token: RecurrenceToken::Sunday,
        name: "SUNDAY",
        rrule: "FREQ=WEEKLY;BYDAY=SU",
        matches: is_sunday,
    },
    TokenEntry {
        token: RecurrenceToken::Monday,
        name: "MONDAY",
        rrule: "FREQ=WEEKLY;BYDAY=MO",
        matches: is_monday,
    },
    TokenEntry {
        token: RecurrenceToken::Tuesday,
        name: "TUESDAY",
        rrule: "FREQ=WEEKLY;BYDAY=TU",
        matches: is_tuesday,
    },
    TokenEntry {
        token: RecurrenceToken::Wednesday,
        name: "WEDNESDAY",
        rrule: "FREQ=WEEKLY;BYDAY=WE",
        matches: is_wednesday,
    },
    TokenEntry {
        token: RecurrenceToken::Thursday,
        name: "THURSDAY",
        rrule: "FREQ=WEEKLY;BYDAY=TH",
        matches: is_thursday,
    },
    TokenEntry {
        token: RecurrenceToken::Friday,
        name: "FRIDAY",
        rrule: "FREQ=WEEKLY;BYDAY=FR",
        matches: is_friday,
    },
    TokenEntry {
        token: RecurrenceToken::Saturday,
        name: "SATURDAY",
        rrule: "FREQ=WEEKLY;BYDAY=SA",
        matches: is_saturday,
    },
    TokenEntry {
        token: RecurrenceToken::Weekends,
        name: "WEEKENDS",
        rrule: "FREQ=WEEKLY;BYDAY=SA,SU",
        matches: is_weekend,
    },
    TokenEntry {
        token: RecurrenceToken::Weekdays,
        name: "WEEKDAYS",
        rrule: "FREQ=WEEKLY;BYDAY=MO,TU,WE,TH,FR",
        matches: is_weekday,
    },
    TokenEntry {
        token: RecurrenceToken::FirstMonday,
        name: "FIRST_MONDAY",
        rrule: "FREQ=MONTHLY;BYDAY=1MO",
        matches: is_first_monday,
    },
    TokenEntry {
        token: RecurrenceToken::LastFriday,
        name: "LAST_FRIDAY",
        rrule: "FREQ=MONTHLY;BYDAY=-1FR",
        matches: is_last_friday,
    },
];

fn is_sunday(date: NaiveDate) -> bool {
    date.weekday() == Weekday::Sun
}

fn is_monday(date: NaiveDate) -> bool {
    date.weekday() == Weekday::Mon
}

fn is_tuesday(date: NaiveDate) -> bool {
    date.weekday() == Weekday::Tue
}

fn is_wednesday(date: NaiveDate) -> bool {
    date.weekday() == Weekday::Wed
}

fn is_thursday(date: NaiveDate) -> bool {
    date.weekday() == Weekday::Thu
}

fn is_friday(date: NaiveDate) -> bool {
    date.weekday() == Weekday::Fri
}

fn is_saturday(date: NaiveDate) -> bool {
    date.weekday() == Weekday::Sat
}

fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

fn is_weekday(date: NaiveDate) -> bool {
    !is_weekend(date)
}

fn is_first_monday(date: NaiveDate) -> bool {
    is_monday(date) && date.day() <= 7
}

fn is_last_friday(date: NaiveDate) -> bool {
    is_friday(date)
        && date
            .checked_add_days(Days::new(7))
            .is_none_or(|next| next.month() != date.month())
}

impl RecurrenceToken {
    /// Every token, in table order.
    pub fn all() -> impl Iterator<Item = RecurrenceToken> {
        TOKEN_TABLE.iter().map(|entry| entry.token)
    }

    fn entry(self) -> &'static TokenEntry {
        let row = match self {
            Self::Sunday => 0,
            Self::Monday => 1,
            Self::Tuesday => 2,
            Self::Wednesday => 3,
            Self::Thursday => 4,
            Self::Friday => 5,
            Self::Saturday => 6,
            Self::Weekends => 7,
            Self::Weekdays => 8,
            Self::FirstMonday => 9,
            Self::LastFriday => 10,
        };
        &TOKEN_TABLE[row]
    }

    /// Canonical upper-case name, e.g. `FIRST_MONDAY`.
    pub fn name(self) -> &'static str {
        self.entry().name
    }

    /// The RFC 5545 RRULE body describing the same set of dates.
    pub fn as_rrule(self) -> &'static str {
        self.entry().rrule
    }

    /// Whether `date` falls on this pattern.
    pub fn matches(self, date: NaiveDate) -> bool {
        (self.entry().matches)(date)
    }

    /// Monthly patterns occur once per month; the rest repeat weekly.
    pub fn is_monthly(self) -> bool {
        matches!(self, Self::FirstMonday | Self::LastFriday)
    }
}

impl fmt::Display for RecurrenceToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Parses the canonical name only. `sunday` and ` SUNDAY` are not tokens.
impl FromStr for RecurrenceToken {
    type Err = AvailabilityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TOKEN_TABLE
            .iter()
            .find(|entry| entry.name == s)
            .map(|entry| entry.token)
            .ok_or_else(|| {
                AvailabilityError::validation(
                    "recurrence_token",
                    format!("unrecognized recurrence token {s:?}"),
                )
            })
    }
}

/// Match a raw token string against a date.
///
/// Unknown tokens never match. Rules built through the administration API
/// can only carry known tokens, so this only matters for raw input.
pub fn matches_token(token: &str, date: NaiveDate) -> bool {
    token
        .parse::<RecurrenceToken>()
        .is_ok_and(|token| token.matches(date))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_has_one_row_per_variant() {
        let tokens: Vec<_> = RecurrenceToken::all().collect();
        assert_eq!(tokens.len(), 11);
        for token in &tokens {
            assert_eq!(token.entry().token, *token);
        }
    }

    #[test]
    fn names_roundtrip_through_from_str() {
        for token in RecurrenceToken::all() {
            assert_eq!(token.name().parse::<RecurrenceToken>().unwrap(), token);
        }
    }

    #[test]
    fn only_canonical_names_parse() {
        for raw in ["first_monday", "Sunday", " SUNDAY", "SUNDAY\n"] {
            assert!(raw.parse::<RecurrenceToken>().is_err(), "{raw:?} parsed");
        }
    }

    #[test]
    fn last_representable_date_does_not_overflow() {
        let mut last_friday = NaiveDate::MAX;
        while last_friday.weekday() != Weekday::Fri {
            last_friday = last_friday.pred_opt().unwrap();
        }
        assert!(RecurrenceToken::LastFriday.matches(last_friday));
        for token in RecurrenceToken::all() {
            token.matches(NaiveDate::MAX);
        }
    }

    #[test]
    fn serde_uses_canonical_names() {
        let json = serde_json::to_string(&RecurrenceToken::LastFriday).unwrap();
        assert_eq!(json, "\"LAST_FRIDAY\"");
    }
}
