//! Campaign Window Evaluator — pure time/date checks.
//!
//! All failures here (malformed "HH:MM" strings, unknown IANA zones) fail
//! closed: the campaign is simply treated as outside its window, with a
//! `warn!` so an operator can fix the configuration. A misconfigured
//! campaign silently never calls anyone; it never crashes the scheduler.

use chrono::{DateTime, NaiveDate, Timelike, Utc};
use chrono_tz::Tz;
use tracing::warn;

use crate::models::campaign::Campaign;

/// True when `now`, in the campaign's zone, falls inside the daily
/// `[start_time, end_time]` range — inclusive on both bounds.
///
/// `start_time == end_time` therefore opens the window for exactly one
/// minute, and `start_time > end_time` never opens it: there is no
/// overnight wraparound.
pub fn is_within_hours(
    now: DateTime<Utc>,
    start_time: &str,
    end_time: &str,
    timezone: &str,
) -> bool {
    let Some(local) = local_time(now, timezone) else {
        return false;
    };
    let (Some(start_minutes), Some(end_minutes)) =
        (parse_minutes(start_time), parse_minutes(end_time))
    else {
        warn!("Malformed campaign time window '{start_time}'..'{end_time}'");
        return false;
    };

    let current_minutes = local.hour() * 60 + local.minute();
    start_minutes <= current_minutes && current_minutes <= end_minutes
}

/// True while `start_date <= today <= end_date` in the campaign's zone,
/// compared at day granularity.
pub fn is_within_dates(
    now: DateTime<Utc>,
    start_date: NaiveDate,
    end_date: NaiveDate,
    timezone: &str,
) -> bool {
    let Some(local) = local_time(now, timezone) else {
        return false;
    };
    let today = local.date_naive();
    start_date <= today && today <= end_date
}

/// True once today (campaign zone) has reached the campaign end date; used
/// by the run loop's completion check. Fails closed: a bad zone never marks
/// a campaign completed.
pub fn is_on_or_after_end_date(now: DateTime<Utc>, end_date: NaiveDate, timezone: &str) -> bool {
    match local_time(now, timezone) {
        Some(local) => local.date_naive() >= end_date,
        None => false,
    }
}

/// Combined eligibility: inside the date range and inside today's hours.
pub fn is_callable(now: DateTime<Utc>, campaign: &Campaign) -> bool {
    is_within_dates(
        now,
        campaign.campaign_start_date,
        campaign.campaign_end_date,
        &campaign.timezone,
    ) && is_within_hours(
        now,
        &campaign.start_time,
        &campaign.end_time,
        &campaign.timezone,
    )
}

fn local_time(now: DateTime<Utc>, timezone: &str) -> Option<DateTime<Tz>> {
    match timezone.parse::<Tz>() {
        Ok(tz) => Some(now.with_timezone(&tz)),
        Err(_) => {
            warn!("Unknown campaign timezone '{timezone}'");
            None
        }
    }
}

/// Parses "HH:MM" into minutes since midnight. Hours above 23 or minutes
/// above 59 are rejected.
fn parse_minutes(hhmm: &str) -> Option<u32> {
    let (hour, minute) = hhmm.split_once(':')?;
    let hour: u32 = hour.parse().ok()?;
    let minute: u32 = minute.parse().ok()?;
    if hour > 23 || minute > 59 {
        return None;
    }
    Some(hour * 60 + minute)
}
