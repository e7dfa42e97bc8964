use chrono::{DateTime, Duration, Local, TimeZone, Timelike, Utc};

/// Wake-ups before this local hour are deferred to it.
pub const QUIET_UNTIL_HOUR: u32 = 7;

pub const POLL_INTERVAL_MINUTES: i64 = 5;

/// Next wake time after `now`, in `now`'s timezone.
///
/// During quiet hours (before 07:00) the next wake is 07:00 the same day;
/// otherwise it is five minutes from now.
pub fn next_wake<Tz: TimeZone>(now: &DateTime<Tz>) -> DateTime<Tz> {
    if now.hour() < QUIET_UNTIL_HOUR {
        let morning = now
            .date_naive()
            .and_hms_opt(QUIET_UNTIL_HOUR, 0, 0)
            .and_then(|naive| now.timezone().from_local_datetime(&naive).earliest());
        if let Some(morning) = morning {
            return morning;
        }
    }
    now.clone() + Duration::minutes(POLL_INTERVAL_MINUTES)
}

/// Source of local time for wake computation.
pub trait Clock {
    /// Next wake after the current instant, computed in the clock's own
    /// timezone so that 07:00 stays 07:00 across DST changes.
    fn next_wake(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn next_wake(&self) -> DateTime<Utc> {
        next_wake(&Local::now()).with_timezone(&Utc)
    }
}
