use std::{fmt, str::FromStr, time::Duration};

use anyhow::{anyhow, Context};
use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone};
use serde::{Deserialize, Deserializer};

/// A wall-clock time such as `7:30 PM` or `19:30`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TimeOfDay(NaiveTime);

const TIME_FORMATS: &[&str] = &["%I:%M %p", "%I:%M%p", "%H:%M"];

impl TimeOfDay {
    pub fn new(time: NaiveTime) -> Self {
        TimeOfDay(time)
    }

    pub fn time(&self) -> NaiveTime {
        self.0
    }

    /// This time of day on `date` in the given timezone. Fails for a local
    /// time skipped by a DST transition; an ambiguous one resolves to the
    /// earlier instant.
    pub fn on<Tz: TimeZone>(&self, tz: &Tz, date: NaiveDate) -> anyhow::Result<DateTime<Tz>> {
        tz.from_local_datetime(&date.and_time(self.0))
            .earliest()
            .ok_or_else(|| anyhow!("{} does not exist on {}", self, date))
    }
}

impl FromStr for TimeOfDay {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();

        TIME_FORMATS
            .iter()
            .find_map(|format| NaiveTime::parse_from_str(s, format).ok())
            .map(TimeOfDay)
            .ok_or_else(|| anyhow!("invalid time of day {:?}, expected e.g. \"7:30 PM\"", s))
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%-I:%M %p"))
    }
}

impl<'de> Deserialize<'de> for TimeOfDay {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// A half-open range of unix timestamps, `[start, end)`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: i64,
    pub end: i64,
}

impl TimeWindow {
    pub fn contains(&self, timestamp: i64) -> bool {
        self.start <= timestamp && timestamp < self.end
    }
}

/// The window covered by the video made at `now`: from `start` yesterday up
/// to `end` today.
pub fn capture_window<Tz: TimeZone>(
    now: &DateTime<Tz>,
    start: TimeOfDay,
    end: TimeOfDay,
) -> anyhow::Result<TimeWindow> {
    let tz = now.timezone();
    let today = now.date_naive();
    let yesterday = today.pred_opt().context("date out of range")?;

    Ok(TimeWindow {
        start: start.on(&tz, yesterday)?.timestamp(),
        end: end.on(&tz, today)?.timestamp(),
    })
}

/// The window covered by the video due at `run`, which is scheduled `delay`
/// after `end`. Anchored on `run - delay` so a run pushed past midnight still
/// covers the night that just ended.
pub fn run_window<Tz: TimeZone>(
    run: &DateTime<Tz>,
    start: TimeOfDay,
    end: TimeOfDay,
    delay: Duration,
) -> anyhow::Result<TimeWindow> {
    let delay = chrono::Duration::from_std(delay).context("run delay too large")?;

    capture_window(&(run.clone() - delay), start, end)
}

/// The first instant strictly after `now` that lies `delay` past `end` on
/// some day.
pub fn next_run<Tz: TimeZone>(
    now: &DateTime<Tz>,
    end: TimeOfDay,
    delay: Duration,
) -> anyhow::Result<DateTime<Tz>> {
    let tz = now.timezone();
    let delay = chrono::Duration::from_std(delay).context("run delay too large")?;

    // the delay may push the run past midnight, so start looking a day early
    let mut date = now
        .date_naive()
        .pred_opt()
        .context("date out of range")?;

    // covers a delay of up to a week
    for _ in 0..9 {
        if let Ok(at) = end.on(&tz, date) {
            let run = at + delay;
            if run > *now {
                return Ok(run);
            }
        }

        date = date.succ_opt().context("date out of range")?;
    }

    Err(anyhow!("could not schedule next run after {:?}", now.naive_local()))
}

#[cfg(test)]
mod tests {
    use chrono::{FixedOffset, Utc};
    use pretty_assertions::assert_eq;

    use super::*;

    fn tod(s: &str) -> TimeOfDay {
        s.parse().unwrap()
    }

    fn hm(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn parses_twelve_and_twenty_four_hour_times() {
        assert_eq!(tod("7:30 PM").time(), hm(19, 30));
        assert_eq!(tod("07:30 pm").time(), hm(19, 30));
        assert_eq!(tod("7:05am").time(), hm(7, 5));
        assert_eq!(tod("12:00 AM").time(), hm(0, 0));
        assert_eq!(tod("12:15 PM").time(), hm(12, 15));
        assert_eq!(tod(" 21:45 ").time(), hm(21, 45));
    }

    #[test]
    fn rejects_garbage_times() {
        assert!("".parse::<TimeOfDay>().is_err());
        assert!("noon".parse::<TimeOfDay>().is_err());
        assert!("25:00".parse::<TimeOfDay>().is_err());
        assert!("13:00 PM".parse::<TimeOfDay>().is_err());
    }

    #[test]
    fn displays_as_twelve_hour() {
        assert_eq!(tod("19:05").to_string(), "7:05 PM");
    }

    #[test]
    fn window_spans_yesterday_start_to_today_end() {
        let tz = FixedOffset::west_opt(7 * 3600).unwrap();
        let now = tz.with_ymd_and_hms(2018, 1, 2, 7, 35, 0).unwrap();

        let window = capture_window(&now, tod("7:00 PM"), tod("7:30 AM")).unwrap();

        assert_eq!(
            window,
            TimeWindow {
                start: tz.with_ymd_and_hms(2018, 1, 1, 19, 0, 0).unwrap().timestamp(),
                end: tz.with_ymd_and_hms(2018, 1, 2, 7, 30, 0).unwrap().timestamp(),
            }
        );
    }

    #[test]
    fn window_is_half_open() {
        let window = TimeWindow {
            start: 100,
            end: 200,
        };

        assert!(!window.contains(99));
        assert!(window.contains(100));
        assert!(window.contains(199));
        assert!(!window.contains(200));
    }

    #[test]
    fn next_run_later_today() {
        let now = Utc.with_ymd_and_hms(2018, 1, 2, 6, 0, 0).unwrap();

        let run = next_run(&now, tod("7:30 AM"), Duration::from_secs(300)).unwrap();

        assert_eq!(run, Utc.with_ymd_and_hms(2018, 1, 2, 7, 35, 0).unwrap());
    }

    #[test]
    fn next_run_tomorrow_once_passed() {
        let now = Utc.with_ymd_and_hms(2018, 1, 2, 7, 35, 0).unwrap();

        let run = next_run(&now, tod("7:30 AM"), Duration::from_secs(300)).unwrap();

        assert_eq!(run, Utc.with_ymd_and_hms(2018, 1, 3, 7, 35, 0).unwrap());
    }

    #[test]
    fn next_run_delay_past_midnight() {
        // 23:50 + 20 minutes lands at 00:10 the following day
        let now = Utc.with_ymd_and_hms(2018, 1, 2, 0, 5, 0).unwrap();

        let run = next_run(&now, tod("11:50 PM"), Duration::from_secs(20 * 60)).unwrap();

        assert_eq!(run, Utc.with_ymd_and_hms(2018, 1, 2, 0, 10, 0).unwrap());
    }

    #[test]
    fn run_past_midnight_covers_the_night_that_ended() {
        let run = next_run(
            &Utc.with_ymd_and_hms(2018, 1, 2, 0, 5, 0).unwrap(),
            tod("11:50 PM"),
            Duration::from_secs(20 * 60),
        )
        .unwrap();

        let window = run_window(
            &run,
            tod("8:00 PM"),
            tod("11:50 PM"),
            Duration::from_secs(20 * 60),
        )
        .unwrap();

        assert_eq!(
            window,
            TimeWindow {
                start: Utc.with_ymd_and_hms(2017, 12, 31, 20, 0, 0).unwrap().timestamp(),
                end: Utc.with_ymd_and_hms(2018, 1, 1, 23, 50, 0).unwrap().timestamp(),
            }
        );
    }

    #[test]
    fn scheduled_window_always_ends_before_its_run() {
        let start = Utc.with_ymd_and_hms(2018, 3, 1, 0, 0, 0).unwrap();

        for (end, delay) in &[("7:30 AM", 300), ("11:50 PM", 20 * 60), ("11:00 PM", 3 * 3600)] {
            let delay = Duration::from_secs(*delay);

            for minutes in (0..48 * 60).step_by(23) {
                let now = start + chrono::Duration::minutes(minutes);
                let run = next_run(&now, tod(end), delay).unwrap();
                let window = run_window(&run, tod("7:00 PM"), tod(end), delay).unwrap();

                assert!(window.end <= run.timestamp());
                assert_eq!(run.timestamp() - window.end, delay.as_secs() as i64);
            }
        }
    }

    #[test]
    fn skipped_local_time_is_an_error() {
        use chrono_tz::America::Denver;

        // clocks jump from 2:00 to 3:00 AM
        let spring_forward = NaiveDate::from_ymd_opt(2018, 3, 11).unwrap();

        assert!(tod("2:30 AM").on(&Denver, spring_forward).is_err());
        assert!(tod("3:30 AM").on(&Denver, spring_forward).is_ok());

        let now = Denver.with_ymd_and_hms(2018, 3, 11, 12, 0, 0).unwrap();
        assert!(capture_window(&now, tod("7:00 PM"), tod("2:30 AM")).is_err());
    }

    #[test]
    fn next_run_skips_a_day_without_the_end_time() {
        use chrono_tz::America::Denver;

        let now = Denver.with_ymd_and_hms(2018, 3, 10, 12, 0, 0).unwrap();

        let run = next_run(&now, tod("2:30 AM"), Duration::from_secs(300)).unwrap();

        assert_eq!(run, Denver.with_ymd_and_hms(2018, 3, 12, 2, 35, 0).unwrap());
    }

    #[test]
    fn next_run_is_always_in_the_future() {
        let start = Utc.with_ymd_and_hms(2018, 3, 1, 0, 0, 0).unwrap();

        for minutes in (0..48 * 60).step_by(17) {
            let now = start + chrono::Duration::minutes(minutes);
            let run = next_run(&now, tod("7:30 AM"), Duration::from_secs(300)).unwrap();

            assert!(run > now);
            assert!(run - now <= chrono::Duration::days(1));
        }
    }
}
