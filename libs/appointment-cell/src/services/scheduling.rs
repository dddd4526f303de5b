// libs/appointment-cell/src/services/scheduling.rs
//! Free-text date/time understanding for English and Spanish patients.
//!
//! Expressions are resolved in the patient's IANA timezone, converted to UTC
//! and truncated to the minute. The reference instant is always passed in so
//! that callers (and tests) control "now".

use std::sync::LazyLock;

use chrono::{
    DateTime, Datelike, Days, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Timelike,
    Utc, Weekday,
};
use chrono_tz::Tz;
use regex::Regex;
use thiserror::Error;
use tracing::{debug, warn};

use shared_models::locale::Locale;
use shared_utils::text::fold_accents;

pub const DEFAULT_APPOINTMENT_HOUR: u32 = 9;
pub const MAX_DAYS_AHEAD: i64 = 365;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseFailure {
    #[error("could not understand the requested date or time")]
    Unrecognized,

    #[error("the requested date or time does not exist")]
    OutOfRange,

    #[error("the requested time is in the past")]
    InPast,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DayPeriod {
    Morning,
    Afternoon,
    Evening,
}

impl DayPeriod {
    fn is_pm(self) -> bool {
        !matches!(self, DayPeriod::Morning)
    }

    fn default_hour(self) -> u32 {
        match self {
            DayPeriod::Morning => DEFAULT_APPOINTMENT_HOUR,
            DayPeriod::Afternoon => 15,
            DayPeriod::Evening => 19,
        }
    }
}

// Longer phrases first; each one is removed from the text once matched.
const PERIOD_PHRASES: &[(&str, DayPeriod)] = &[
    ("de la manana", DayPeriod::Morning),
    ("por la manana", DayPeriod::Morning),
    ("en la manana", DayPeriod::Morning),
    ("in the morning", DayPeriod::Morning),
    ("this morning", DayPeriod::Morning),
    ("morning", DayPeriod::Morning),
    ("de la tarde", DayPeriod::Afternoon),
    ("por la tarde", DayPeriod::Afternoon),
    ("en la tarde", DayPeriod::Afternoon),
    ("esta tarde", DayPeriod::Afternoon),
    ("in the afternoon", DayPeriod::Afternoon),
    ("this afternoon", DayPeriod::Afternoon),
    ("afternoon", DayPeriod::Afternoon),
    ("de la noche", DayPeriod::Evening),
    ("por la noche", DayPeriod::Evening),
    ("en la noche", DayPeriod::Evening),
    ("esta noche", DayPeriod::Evening),
    ("in the evening", DayPeriod::Evening),
    ("this evening", DayPeriod::Evening),
    ("tonight", DayPeriod::Evening),
    ("evening", DayPeriod::Evening),
];

const MONTHS: &[(&str, u32)] = &[
    ("january", 1),
    ("february", 2),
    ("march", 3),
    ("april", 4),
    ("may", 5),
    ("june", 6),
    ("july", 7),
    ("august", 8),
    ("september", 9),
    ("october", 10),
    ("november", 11),
    ("december", 12),
    ("enero", 1),
    ("febrero", 2),
    ("marzo", 3),
    ("abril", 4),
    ("mayo", 5),
    ("junio", 6),
    ("julio", 7),
    ("agosto", 8),
    ("septiembre", 9),
    ("setiembre", 9),
    ("octubre", 10),
    ("noviembre", 11),
    ("diciembre", 12),
    ("sept", 9),
    ("jan", 1),
    ("feb", 2),
    ("mar", 3),
    ("apr", 4),
    ("jun", 6),
    ("jul", 7),
    ("aug", 8),
    ("sep", 9),
    ("oct", 10),
    ("nov", 11),
    ("dec", 12),
];

const WEEKDAYS: &[(&str, Weekday)] = &[
    ("monday", Weekday::Mon),
    ("tuesday", Weekday::Tue),
    ("wednesday", Weekday::Wed),
    ("thursday", Weekday::Thu),
    ("friday", Weekday::Fri),
    ("saturday", Weekday::Sat),
    ("sunday", Weekday::Sun),
    ("lunes", Weekday::Mon),
    ("martes", Weekday::Tue),
    ("miercoles", Weekday::Wed),
    ("jueves", Weekday::Thu),
    ("viernes", Weekday::Fri),
    ("sabado", Weekday::Sat),
    ("domingo", Weekday::Sun),
];

const SPANISH_WEEKDAYS: [&str; 7] = ["lunes", "martes", "miércoles", "jueves", "viernes", "sábado", "domingo"];
const SPANISH_MONTHS: [&str; 12] = [
    "enero", "febrero", "marzo", "abril", "mayo", "junio", "julio", "agosto", "septiembre",
    "octubre", "noviembre", "diciembre",
];

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("scheduling pattern compiles")
}

fn alternation<T>(table: &[(&str, T)]) -> String {
    table.iter().map(|(name, _)| *name).collect::<Vec<_>>().join("|")
}

static ISO_DATE: LazyLock<Regex> = LazyLock::new(|| compile(r"\b(\d{4})[-/](\d{1,2})[-/](\d{1,2})\b"));

static MONTH_DAY: LazyLock<Regex> = LazyLock::new(|| {
    compile(&format!(
        r"\b({})\s+(\d{{1,2}})(?:st|nd|rd|th)?\b(?:\s+(?:de\s+|del\s+)?(\d{{4}})\b)?",
        alternation(MONTHS)
    ))
});

static DAY_MONTH: LazyLock<Regex> = LazyLock::new(|| {
    compile(&format!(
        r"\b(\d{{1,2}})(?:st|nd|rd|th)?\s+(?:de\s+|of\s+)?({})\b(?:\s+(?:de\s+|del\s+)?(\d{{4}})\b)?",
        alternation(MONTHS)
    ))
});

static DAY_AFTER_TOMORROW: LazyLock<Regex> =
    LazyLock::new(|| compile(r"\b(?:pasado manana|day after tomorrow)\b"));
static TOMORROW: LazyLock<Regex> = LazyLock::new(|| compile(r"\b(?:tomorrow|manana)\b"));
static TODAY: LazyLock<Regex> = LazyLock::new(|| compile(r"\b(?:today|hoy)\b"));
static NEXT_WEEK: LazyLock<Regex> = LazyLock::new(|| {
    compile(r"\b(?:next week|(?:la )?proxima semana|(?:la )?semana que viene|(?:la )?siguiente semana)\b")
});
static IN_DAYS: LazyLock<Regex> = LazyLock::new(|| compile(r"\b(?:in|en)\s+(\d{1,3})\s+(?:days?|dias?)\b"));

static WEEKDAY: LazyLock<Regex> = LazyLock::new(|| {
    compile(&format!(
        r"\b(?:(?:next|this|el proximo|proximo|el|este)\s+)?({})\b",
        alternation(WEEKDAYS)
    ))
});

static TWELVE_HOUR: LazyLock<Regex> = LazyLock::new(|| compile(r"\b(\d{1,2})(?::(\d{2}))?\s*(am|pm)\b"));
static TWENTY_FOUR_HOUR: LazyLock<Regex> = LazyLock::new(|| compile(r"\b(\d{1,2}):(\d{2})(?::\d{2})?\b"));
static BARE_HOUR: LazyLock<Regex> =
    LazyLock::new(|| compile(r"(?:\bat|\ba las|\ba la|@)\s+(\d{1,2})\b"));
static NOON: LazyLock<Regex> = LazyLock::new(|| compile(r"\b(?:noon|midday|mediodia)\b"));
static MIDNIGHT: LazyLock<Regex> = LazyLock::new(|| compile(r"\b(?:midnight|medianoche)\b"));
static DATE_TIME_SEPARATOR: LazyLock<Regex> = LazyLock::new(|| compile(r"(\d)t(\d)"));

fn normalize(raw: &str) -> String {
    let folded = fold_accents(raw)
        .replace("a.m.", "am")
        .replace("p.m.", "pm")
        .replace("a. m.", "am")
        .replace("p. m.", "pm");
    let separated = DATE_TIME_SEPARATOR.replace_all(&folded, "$1 $2");
    let cleaned: String = separated
        .chars()
        .map(|ch| match ch {
            ',' | ';' | '!' | '?' | '¿' | '¡' | '.' | '(' | ')' => ' ',
            other => other,
        })
        .collect();
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Removes the first match of `re` from `text`, returning its capture groups.
fn take_match(re: &Regex, text: &mut String) -> Option<Vec<Option<String>>> {
    let (range, groups) = {
        let caps = re.captures(text)?;
        let whole = caps.get(0)?;
        let groups = caps
            .iter()
            .map(|group| group.map(|m| m.as_str().to_string()))
            .collect::<Vec<_>>();
        (whole.range(), groups)
    };
    text.replace_range(range, " ");
    Some(groups)
}

fn group_u32(groups: &[Option<String>], index: usize) -> Option<u32> {
    groups.get(index)?.as_deref()?.parse().ok()
}

fn group_i32(groups: &[Option<String>], index: usize) -> Option<i32> {
    groups.get(index)?.as_deref()?.parse().ok()
}

fn lookup<T: Copy>(table: &[(&str, T)], name: &str) -> Option<T> {
    table.iter().find(|(candidate, _)| *candidate == name).map(|(_, value)| *value)
}

static PERIODS: LazyLock<Vec<(Regex, DayPeriod)>> = LazyLock::new(|| {
    PERIOD_PHRASES
        .iter()
        .map(|(phrase, period)| (compile(&format!(r"\b{}\b", regex::escape(phrase))), *period))
        .collect()
});

fn take_period(text: &mut String) -> Option<DayPeriod> {
    PERIODS
        .iter()
        .find_map(|(pattern, period)| take_match(pattern, text).map(|_| *period))
}

fn add_days(date: NaiveDate, days: u64) -> Result<NaiveDate, ParseFailure> {
    date.checked_add_days(Days::new(days)).ok_or(ParseFailure::OutOfRange)
}

/// Calendar date with an optional explicit year; without one, the next
/// occurrence on or after `today`.
fn month_day(today: NaiveDate, month: u32, day: u32, year: Option<i32>) -> Result<NaiveDate, ParseFailure> {
    if let Some(year) = year {
        return NaiveDate::from_ymd_opt(year, month, day).ok_or(ParseFailure::OutOfRange);
    }
    match NaiveDate::from_ymd_opt(today.year(), month, day) {
        Some(date) if date >= today => Ok(date),
        _ => NaiveDate::from_ymd_opt(today.year() + 1, month, day).ok_or(ParseFailure::OutOfRange),
    }
}

fn take_date(text: &mut String, today: NaiveDate) -> Result<Option<NaiveDate>, ParseFailure> {
    if let Some(groups) = take_match(&ISO_DATE, text) {
        let (year, month, day) = (group_i32(&groups, 1), group_u32(&groups, 2), group_u32(&groups, 3));
        return match (year, month, day) {
            (Some(year), Some(month), Some(day)) => {
                NaiveDate::from_ymd_opt(year, month, day).map(Some).ok_or(ParseFailure::OutOfRange)
            }
            _ => Err(ParseFailure::OutOfRange),
        };
    }

    if let Some(groups) = take_match(&MONTH_DAY, text) {
        let month = groups[1].as_deref().and_then(|name| lookup(MONTHS, name));
        let day = group_u32(&groups, 2);
        return match (month, day) {
            (Some(month), Some(day)) => month_day(today, month, day, group_i32(&groups, 3)).map(Some),
            _ => Err(ParseFailure::OutOfRange),
        };
    }

    if let Some(groups) = take_match(&DAY_MONTH, text) {
        let day = group_u32(&groups, 1);
        let month = groups[2].as_deref().and_then(|name| lookup(MONTHS, name));
        return match (month, day) {
            (Some(month), Some(day)) => month_day(today, month, day, group_i32(&groups, 3)).map(Some),
            _ => Err(ParseFailure::OutOfRange),
        };
    }

    // "pasado mañana" contains "mañana", so it goes first.
    if take_match(&DAY_AFTER_TOMORROW, text).is_some() {
        return add_days(today, 2).map(Some);
    }
    if take_match(&TOMORROW, text).is_some() {
        return add_days(today, 1).map(Some);
    }
    if take_match(&TODAY, text).is_some() {
        return Ok(Some(today));
    }
    if take_match(&NEXT_WEEK, text).is_some() {
        return add_days(today, 7).map(Some);
    }
    if let Some(groups) = take_match(&IN_DAYS, text) {
        let days = group_u32(&groups, 1).ok_or(ParseFailure::OutOfRange)?;
        return add_days(today, u64::from(days)).map(Some);
    }

    if let Some(groups) = take_match(&WEEKDAY, text) {
        let weekday = groups[1]
            .as_deref()
            .and_then(|name| lookup(WEEKDAYS, name))
            .ok_or(ParseFailure::Unrecognized)?;
        let current = today.weekday().num_days_from_monday();
        let target = weekday.num_days_from_monday();
        // Naming today's weekday means the one a week out.
        let ahead = match (target + 7 - current) % 7 {
            0 => 7,
            n => n,
        };
        return add_days(today, u64::from(ahead)).map(Some);
    }

    Ok(None)
}

fn time_of(hour: u32, minute: u32) -> Result<NaiveTime, ParseFailure> {
    NaiveTime::from_hms_opt(hour, minute, 0).ok_or(ParseFailure::OutOfRange)
}

fn apply_period(hour: u32, period: Option<DayPeriod>) -> u32 {
    match period {
        Some(p) if p.is_pm() && hour < 12 => hour + 12,
        Some(DayPeriod::Morning) if hour == 12 => 0,
        _ => hour,
    }
}

fn take_time(text: &mut String, period: Option<DayPeriod>) -> Result<Option<NaiveTime>, ParseFailure> {
    if let Some(groups) = take_match(&TWELVE_HOUR, text) {
        let hour = group_u32(&groups, 1).ok_or(ParseFailure::OutOfRange)?;
        let minute = group_u32(&groups, 2).unwrap_or(0);
        if !(1..=12).contains(&hour) {
            return Err(ParseFailure::OutOfRange);
        }
        let hour = match groups[3].as_deref() {
            Some("pm") => hour % 12 + 12,
            _ => hour % 12,
        };
        return time_of(hour, minute).map(Some);
    }

    if take_match(&NOON, text).is_some() {
        return time_of(12, 0).map(Some);
    }
    if take_match(&MIDNIGHT, text).is_some() {
        return time_of(0, 0).map(Some);
    }

    if let Some(groups) = take_match(&TWENTY_FOUR_HOUR, text) {
        let hour = group_u32(&groups, 1).ok_or(ParseFailure::OutOfRange)?;
        let minute = group_u32(&groups, 2).ok_or(ParseFailure::OutOfRange)?;
        return time_of(apply_period(hour, period), minute).map(Some);
    }

    if let Some(groups) = take_match(&BARE_HOUR, text) {
        let hour = group_u32(&groups, 1).ok_or(ParseFailure::OutOfRange)?;
        let hour = match period {
            Some(_) => apply_period(hour, period),
            // Nobody books a telehealth visit at 3 in the morning.
            None if (1..=7).contains(&hour) => hour + 12,
            None => hour,
        };
        return time_of(hour, 0).map(Some);
    }

    match period {
        Some(p) => time_of(p.default_hour(), 0).map(Some),
        None => Ok(None),
    }
}

fn localize(naive: NaiveDateTime, tz: Tz) -> Result<DateTime<Utc>, ParseFailure> {
    tz.from_local_datetime(&naive)
        .earliest()
        .map(|local| local.with_timezone(&Utc))
        .ok_or(ParseFailure::OutOfRange)
}

fn truncate_to_minute(instant: DateTime<Utc>) -> DateTime<Utc> {
    instant
        .with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(instant)
}

fn check_window(instant: DateTime<Utc>, reference: DateTime<Utc>) -> Result<DateTime<Utc>, ParseFailure> {
    if instant < reference {
        return Err(ParseFailure::InPast);
    }
    if instant > reference + Duration::days(MAX_DAYS_AHEAD) {
        return Err(ParseFailure::OutOfRange);
    }
    Ok(instant)
}

/// Resolves a patient's date/time expression.
///
/// A time without a date means the next occurrence of that time. A date
/// without a time means 09:00 local (or the start of a named part of the
/// day, e.g. "tomorrow afternoon").
pub fn parse_datetime(text: &str, reference: DateTime<Utc>, tz: Tz) -> Result<DateTime<Utc>, ParseFailure> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ParseFailure::Unrecognized);
    }

    if let Ok(fixed) = DateTime::parse_from_rfc3339(trimmed) {
        return check_window(truncate_to_minute(fixed.with_timezone(&Utc)), reference);
    }

    let mut normalized = normalize(trimmed);
    let period = take_period(&mut normalized);
    let today = reference.with_timezone(&tz).date_naive();

    let date = take_date(&mut normalized, today)?;
    let time = take_time(&mut normalized, period)?;
    debug!("Parsed '{}' as date={:?} time={:?}", trimmed, date, time);

    let instant = match (date, time) {
        (None, None) => return Err(ParseFailure::Unrecognized),
        (Some(date), time) => {
            let time = match time {
                Some(time) => time,
                None => time_of(DEFAULT_APPOINTMENT_HOUR, 0)?,
            };
            localize(date.and_time(time), tz)?
        }
        (None, Some(time)) => {
            let candidate = localize(today.and_time(time), tz)?;
            if candidate < reference {
                localize(add_days(today, 1)?.and_time(time), tz)?
            } else {
                candidate
            }
        }
    };

    check_window(truncate_to_minute(instant), reference)
}

/// English rendering, e.g. "Tuesday, January 15, 2030 at 3:00 PM (America/Mexico_City)".
pub fn format_local(instant: DateTime<Utc>, tz: Tz) -> String {
    let local = instant.with_timezone(&tz);
    format!("{} ({})", local.format("%A, %B %-d, %Y at %-I:%M %p"), tz.name())
}

pub fn format_local_for(instant: DateTime<Utc>, tz: Tz, locale: Locale) -> String {
    match locale {
        Locale::En => format_local(instant, tz),
        Locale::Es => {
            let local = instant.with_timezone(&tz);
            format!(
                "{} {} de {} de {}, {} ({})",
                SPANISH_WEEKDAYS[local.weekday().num_days_from_monday() as usize],
                local.day(),
                SPANISH_MONTHS[local.month0() as usize],
                local.year(),
                local.format("%H:%M"),
                tz.name()
            )
        }
    }
}

/// Validates an IANA zone name, falling back to `default`.
pub fn parse_timezone(name: Option<&str>, default: Tz) -> Tz {
    match name.map(str::trim).filter(|n| !n.is_empty()) {
        None => default,
        Some(name) => name.parse::<Tz>().unwrap_or_else(|_| {
            warn!("Unknown timezone '{}', using {}", name, default.name());
            default
        }),
    }
}
