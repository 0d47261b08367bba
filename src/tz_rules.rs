//! Local time from a daylight/standard rule pair.
//!
//! A node only needs to print a local "last update" time, so instead of a
//! full zone database it can carry the two transitions of its region, the
//! same way hobby firmware usually does. Any IANA zone known to `chrono-tz`
//! is accepted as well.

use anyhow::bail;
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Offset, TimeDelta, Utc, Weekday};
use chrono_tz::{OffsetName, Tz};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Week {
    First,
    Second,
    Third,
    Fourth,
    Last,
}

/// "On the `week` `dow` of `month` at `hour` local time, switch to `offset_minutes` from UTC."
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimeChangeRule {
    pub abbrev: &'static str,
    pub week: Week,
    pub dow: Weekday,
    pub month: u32,
    pub hour: u32,
    pub offset_minutes: i32,
}

impl TimeChangeRule {
    /// Wall-clock moment in `year` at which the rule fires, in the time in force before it.
    pub fn local_instant(&self, year: i32) -> Option<NaiveDateTime> {
        let date = match self.week {
            Week::Last => last_weekday_of_month(year, self.month, self.dow)?,
            Week::First => NaiveDate::from_weekday_of_month_opt(year, self.month, self.dow, 1)?,
            Week::Second => NaiveDate::from_weekday_of_month_opt(year, self.month, self.dow, 2)?,
            Week::Third => NaiveDate::from_weekday_of_month_opt(year, self.month, self.dow, 3)?,
            Week::Fourth => NaiveDate::from_weekday_of_month_opt(year, self.month, self.dow, 4)?,
        };
        date.and_hms_opt(self.hour, 0, 0)
    }

    fn offset(&self) -> TimeDelta {
        TimeDelta::minutes(i64::from(self.offset_minutes))
    }
}

fn last_weekday_of_month(year: i32, month: u32, dow: Weekday) -> Option<NaiveDate> {
    let first_of_next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    let last = first_of_next.pred_opt()?;
    let back = (last.weekday().num_days_from_sunday() + 7 - dow.num_days_from_sunday()) % 7;
    Some(last - TimeDelta::days(i64::from(back)))
}

/// Daylight rule plus standard rule.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DstRules {
    pub dst: TimeChangeRule,
    pub std: TimeChangeRule,
}

impl DstRules {
    pub const fn new(dst: TimeChangeRule, std: TimeChangeRule) -> Self {
        Self { dst, std }
    }

    pub const fn central_europe() -> Self {
        Self::new(
            TimeChangeRule {
                abbrev: "CEST",
                week: Week::Last,
                dow: Weekday::Sun,
                month: 3,
                hour: 2,
                offset_minutes: 120,
            },
            // 03:00 CEST (01:00 UTC) per EU law and the zone database, not 02:00
            TimeChangeRule {
                abbrev: "CET",
                week: Week::Last,
                dow: Weekday::Sun,
                month: 10,
                hour: 3,
                offset_minutes: 60,
            },
        )
    }

    pub const fn us_eastern() -> Self {
        Self::us(("EDT", -240), ("EST", -300))
    }

    pub const fn us_central() -> Self {
        Self::us(("CDT", -300), ("CST", -360))
    }

    pub const fn us_mountain() -> Self {
        Self::us(("MDT", -360), ("MST", -420))
    }

    pub const fn us_pacific() -> Self {
        Self::us(("PDT", -420), ("PST", -480))
    }

    pub const fn australia_eastern() -> Self {
        Self::new(
            TimeChangeRule {
                abbrev: "AEDT",
                week: Week::First,
                dow: Weekday::Sun,
                month: 10,
                hour: 2,
                offset_minutes: 660,
            },
            TimeChangeRule {
                abbrev: "AEST",
                week: Week::First,
                dow: Weekday::Sun,
                month: 4,
                hour: 3,
                offset_minutes: 600,
            },
        )
    }

    const fn us(dst: (&'static str, i32), std: (&'static str, i32)) -> Self {
        Self::new(
            TimeChangeRule {
                abbrev: dst.0,
                week: Week::Second,
                dow: Weekday::Sun,
                month: 3,
                hour: 2,
                offset_minutes: dst.1,
            },
            TimeChangeRule {
                abbrev: std.0,
                week: Week::First,
                dow: Weekday::Sun,
                month: 11,
                hour: 2,
                offset_minutes: std.1,
            },
        )
    }

    /// The rule in force at `utc`.
    pub fn rule_at(&self, utc: DateTime<Utc>) -> &TimeChangeRule {
        if self.dst.offset_minutes == self.std.offset_minutes {
            return &self.std;
        }

        let year = utc.year();
        let (Some(dst_local), Some(std_local)) =
            (self.dst.local_instant(year), self.std.local_instant(year))
        else {
            return &self.std;
        };
        // DST begins on standard time and ends on daylight time.
        let dst_start = dst_local - self.std.offset();
        let std_start = std_local - self.dst.offset();

        let t = utc.naive_utc();
        let in_dst = if dst_start < std_start {
            t >= dst_start && t < std_start
        } else {
            // southern hemisphere: DST spans the new year
            !(t >= std_start && t < dst_start)
        };

        if in_dst { &self.dst } else { &self.std }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LocalTime {
    pub wall_clock: NaiveDateTime,
    pub abbrev: String,
    pub offset_minutes: i32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum LocalZone {
    Rules(DstRules),
    Iana(Tz),
}

impl LocalZone {
    pub const PRESETS: &'static [(&'static str, DstRules)] = &[
        ("central-europe", DstRules::central_europe()),
        ("us-eastern", DstRules::us_eastern()),
        ("us-central", DstRules::us_central()),
        ("us-mountain", DstRules::us_mountain()),
        ("us-pacific", DstRules::us_pacific()),
        ("australia-eastern", DstRules::australia_eastern()),
    ];

    /// Resolves a preset name (case-insensitive) or an IANA zone such as `Europe/Zurich`.
    pub fn from_name(name: &str) -> anyhow::Result<Self> {
        let name = name.trim();
        if let Some((_, rules)) = Self::PRESETS
            .iter()
            .find(|(preset, _)| preset.eq_ignore_ascii_case(name))
        {
            return Ok(LocalZone::Rules(*rules));
        }

        match name.parse::<Tz>() {
            Ok(tz) => Ok(LocalZone::Iana(tz)),
            Err(_) => bail!("unknown TIMEZONE {name:?}: expected a preset or an IANA zone name"),
        }
    }

    pub fn local_time(&self, utc: DateTime<Utc>) -> LocalTime {
        match self {
            LocalZone::Rules(rules) => {
                let rule = rules.rule_at(utc);
                LocalTime {
                    wall_clock: utc.naive_utc() + rule.offset(),
                    abbrev: rule.abbrev.to_string(),
                    offset_minutes: rule.offset_minutes,
                }
            }
            LocalZone::Iana(tz) => {
                let local = utc.with_timezone(tz);
                let offset = local.offset();
                LocalTime {
                    wall_clock: local.naive_local(),
                    abbrev: offset.abbreviation().unwrap_or(tz.name()).to_string(),
                    offset_minutes: offset.fix().local_minus_utc() / 60,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    fn assert_agrees_with_iana(rules: DstRules, tz: Tz) {
        let rules = LocalZone::Rules(rules);
        let iana = LocalZone::Iana(tz);
        let mut t = utc(2024, 1, 1, 0, 0);
        let end = utc(2028, 1, 1, 0, 0);
        while t < end {
            let ours = rules.local_time(t);
            let theirs = iana.local_time(t);
            assert_eq!(ours.offset_minutes, theirs.offset_minutes, "{tz} at {t}");
            assert_eq!(ours.wall_clock, theirs.wall_clock, "{tz} at {t}");
            t += TimeDelta::minutes(30);
        }
    }

    #[test]
    fn last_sunday_rules() {
        let rules = DstRules::central_europe();
        assert_eq!(
            rules.dst.local_instant(2026),
            NaiveDate::from_ymd_opt(2026, 3, 29).unwrap().and_hms_opt(2, 0, 0)
        );
        assert_eq!(
            rules.std.local_instant(2026),
            NaiveDate::from_ymd_opt(2026, 10, 25).unwrap().and_hms_opt(3, 0, 0)
        );
        // December rolls over into the next year when looking for the last weekday
        assert_eq!(
            last_weekday_of_month(2026, 12, Weekday::Thu),
            NaiveDate::from_ymd_opt(2026, 12, 31)
        );
    }

    #[test]
    fn switch_happens_exactly_at_the_transition() {
        let zone = LocalZone::Rules(DstRules::central_europe());

        let before = zone.local_time(utc(2026, 3, 29, 0, 59));
        assert_eq!(before.abbrev, "CET");
        let after = zone.local_time(utc(2026, 3, 29, 1, 0));
        assert_eq!(after.abbrev, "CEST");
        assert_eq!(after.wall_clock.to_string(), "2026-03-29 03:00:00");

        assert_eq!(zone.local_time(utc(2026, 10, 25, 0, 59)).abbrev, "CEST");
        assert_eq!(zone.local_time(utc(2026, 10, 25, 1, 0)).abbrev, "CET");
    }

    #[test]
    fn presets_agree_with_the_zone_database() {
        assert_agrees_with_iana(DstRules::central_europe(), chrono_tz::Europe::Zurich);
        assert_agrees_with_iana(DstRules::us_eastern(), chrono_tz::America::New_York);
        assert_agrees_with_iana(DstRules::us_central(), chrono_tz::America::Chicago);
        assert_agrees_with_iana(DstRules::us_mountain(), chrono_tz::America::Denver);
        assert_agrees_with_iana(DstRules::us_pacific(), chrono_tz::America::Los_Angeles);
        assert_agrees_with_iana(DstRules::australia_eastern(), chrono_tz::Australia::Sydney);
    }

    #[test]
    fn identical_offsets_mean_no_daylight_saving() {
        let std = TimeChangeRule {
            abbrev: "UTC",
            week: Week::First,
            dow: Weekday::Sun,
            month: 3,
            hour: 2,
            offset_minutes: 0,
        };
        let rules = DstRules::new(std, std);
        assert_eq!(rules.rule_at(utc(2026, 7, 1, 12, 0)).abbrev, "UTC");
    }

    #[test]
    fn resolves_presets_and_iana_names() {
        assert_eq!(
            LocalZone::from_name("US-Pacific").unwrap(),
            LocalZone::Rules(DstRules::us_pacific())
        );
        assert_eq!(
            LocalZone::from_name("Europe/Zurich").unwrap(),
            LocalZone::Iana(chrono_tz::Europe::Zurich)
        );
        assert!(LocalZone::from_name("Atlantis").is_err());
    }

    #[test]
    fn iana_zone_reports_abbreviation() {
        let zone = LocalZone::Iana(chrono_tz::America::New_York);
        let local = zone.local_time(utc(2026, 7, 1, 16, 0));
        assert_eq!(local.abbrev, "EDT");
        assert_eq!(local.offset_minutes, -240);
        assert_eq!(local.wall_clock.to_string(), "2026-07-01 12:00:00");
    }
}
