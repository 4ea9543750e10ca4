//! Sampling frequency inference and timestamp stepping

use crate::error::{ForecastError, Result};
use chrono::{DateTime, Datelike, Duration, Months, NaiveDate, NaiveDateTime, Utc};
use std::fmt;

/// Regular spacing between consecutive observations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frequency {
    /// Constant elapsed time, e.g. hourly, daily or weekly
    Fixed(Duration),
    /// Calendar months; `month_end` pins every timestamp to the last day
    Months { step: u32, month_end: bool },
}

impl Frequency {
    /// Infer the frequency from ordered timestamps.
    ///
    /// Calendar-month spacing is tried first so that monthly, quarterly and
    /// yearly data are not rejected for their uneven day counts. Any gap or
    /// jitter in the spacing makes the series irregular.
    pub fn infer(timestamps: &[DateTime<Utc>]) -> Result<Frequency> {
        if timestamps.len() < 2 {
            return Err(ForecastError::MalformedInput(
                "At least two timestamps are needed to infer a frequency".to_string(),
            ));
        }

        if let Some(freq) = Self::infer_months(timestamps) {
            return Ok(freq);
        }

        let step = timestamps[1] - timestamps[0];
        if let Some(pos) = timestamps.windows(2).position(|w| w[1] - w[0] != step) {
            return Err(ForecastError::MalformedInput(format!(
                "Irregular spacing: {} to {} differs from the initial step of {}s",
                timestamps[pos],
                timestamps[pos + 1],
                step.num_seconds()
            )));
        }
        if step <= Duration::zero() {
            return Err(ForecastError::MalformedInput(
                "Timestamps must be strictly increasing".to_string(),
            ));
        }

        Ok(Frequency::Fixed(step))
    }

    fn infer_months(timestamps: &[DateTime<Utc>]) -> Option<Frequency> {
        let first = timestamps[0];
        let month_index = |ts: &DateTime<Utc>| ts.year() as i64 * 12 + ts.month0() as i64;

        let step = month_index(&timestamps[1]) - month_index(&first);
        if step <= 0 {
            return None;
        }

        let regular = timestamps.windows(2).all(|w| {
            month_index(&w[1]) - month_index(&w[0]) == step && w[1].time() == first.time()
        });
        if !regular {
            return None;
        }

        if timestamps.iter().all(|ts| is_month_end(ts.date_naive())) {
            return Some(Frequency::Months {
                step: step as u32,
                month_end: true,
            });
        }
        if timestamps.iter().all(|ts| ts.day() == first.day()) {
            return Some(Frequency::Months {
                step: step as u32,
                month_end: false,
            });
        }
        None
    }

    /// The timestamp `steps` periods after `from`
    pub fn advance(&self, from: DateTime<Utc>, steps: u32) -> Result<DateTime<Utc>> {
        let overflow = || {
            ForecastError::ForecastingError(format!(
                "Timestamp overflow stepping {} periods from {}",
                steps, from
            ))
        };

        match *self {
            Frequency::Fixed(step) => {
                let steps = i64::from(steps);
                let seconds = step.num_seconds();
                let subsec = (step - Duration::seconds(seconds))
                    .num_nanoseconds()
                    .ok_or_else(overflow)?;
                let offset = seconds
                    .checked_mul(steps)
                    .and_then(|s| s.checked_mul(1_000))
                    .map(Duration::milliseconds)
                    .and_then(|whole| {
                        let fraction = Duration::nanoseconds(subsec.checked_mul(steps)?);
                        whole.checked_add(&fraction)
                    })
                    .ok_or_else(overflow)?;
                from.checked_add_signed(offset).ok_or_else(overflow)
            }
            Frequency::Months {
                step,
                month_end: false,
            } => {
                let months = step.checked_mul(steps).ok_or_else(overflow)?;
                from.checked_add_months(Months::new(months))
                    .ok_or_else(overflow)
            }
            Frequency::Months {
                step,
                month_end: true,
            } => {
                let months = step
                    .checked_mul(steps)
                    .and_then(|m| m.checked_add(1))
                    .ok_or_else(overflow)?;
                let first_of_month = from.date_naive().with_day(1).ok_or_else(overflow)?;
                let last_day = first_of_month
                    .checked_add_months(Months::new(months))
                    .and_then(|d| d.pred_opt())
                    .ok_or_else(overflow)?;
                let naive = NaiveDateTime::new(last_day, from.time());
                Ok(DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc))
            }
        }
    }

    /// `horizon` timestamps continuing immediately after `last`
    pub fn future_timestamps(&self, last: DateTime<Utc>, horizon: usize) -> Result<Vec<DateTime<Utc>>> {
        (1..=horizon)
            .map(|i| {
                let steps = u32::try_from(i).map_err(|_| {
                    ForecastError::ForecastingError(format!(
                        "Horizon {} exceeds the largest supported step count",
                        horizon
                    ))
                })?;
                self.advance(last, steps)
            })
            .collect()
    }
}

fn is_month_end(date: NaiveDate) -> bool {
    date.succ_opt().map(|next| next.month() != date.month()).unwrap_or(true)
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Frequency::Fixed(step) => match step.num_seconds() {
                60 => write!(f, "minutely"),
                3_600 => write!(f, "hourly"),
                86_400 => write!(f, "daily"),
                604_800 => write!(f, "weekly"),
                _ => write!(f, "every {}ms", step.num_milliseconds()),
            },
            Frequency::Months { step, month_end } => {
                match step {
                    1 => write!(f, "monthly")?,
                    3 => write!(f, "quarterly")?,
                    12 => write!(f, "yearly")?,
                    n => write!(f, "every {} months", n)?,
                }
                if month_end {
                    write!(f, " (month end)")?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ymd(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_daily() {
        let ts: Vec<_> = (1..=5).map(|d| ymd(2024, 1, d)).collect();
        let freq = Frequency::infer(&ts).unwrap();
        assert_eq!(freq, Frequency::Fixed(Duration::days(1)));
        assert_eq!(freq.to_string(), "daily");
        assert_eq!(freq.advance(ymd(2024, 1, 31), 1).unwrap(), ymd(2024, 2, 1));
    }

    #[test]
    fn test_monthly_first_of_month() {
        let ts: Vec<_> = (1..=12).map(|m| ymd(2023, m, 1)).collect();
        let freq = Frequency::infer(&ts).unwrap();
        assert_eq!(
            freq,
            Frequency::Months {
                step: 1,
                month_end: false
            }
        );
        assert_eq!(freq.advance(ymd(2023, 12, 1), 1).unwrap(), ymd(2024, 1, 1));
        assert_eq!(freq.advance(ymd(2023, 12, 1), 3).unwrap(), ymd(2024, 3, 1));
    }

    #[test]
    fn test_month_end_and_quarterly() {
        let ts = vec![ymd(2023, 1, 31), ymd(2023, 2, 28), ymd(2023, 3, 31), ymd(2023, 4, 30)];
        let freq = Frequency::infer(&ts).unwrap();
        assert_eq!(
            freq,
            Frequency::Months {
                step: 1,
                month_end: true
            }
        );
        assert_eq!(freq.advance(ymd(2023, 4, 30), 1).unwrap(), ymd(2023, 5, 31));
        assert_eq!(freq.advance(ymd(2023, 4, 30), 10).unwrap(), ymd(2024, 2, 29));

        let quarters = vec![ymd(2023, 1, 1), ymd(2023, 4, 1), ymd(2023, 7, 1)];
        assert_eq!(Frequency::infer(&quarters).unwrap().to_string(), "quarterly");
    }

    #[test]
    fn test_irregular_is_rejected() {
        let ts = vec![ymd(2024, 1, 1), ymd(2024, 1, 2), ymd(2024, 1, 4)];
        assert!(matches!(
            Frequency::infer(&ts),
            Err(ForecastError::MalformedInput(_))
        ));
        assert!(Frequency::infer(&ts[..1]).is_err());
    }

    #[test]
    fn test_weekly_crossing_months() {
        let ts: Vec<_> = (0..6).map(|w| ymd(2024, 1, 1) + Duration::weeks(w)).collect();
        let freq = Frequency::infer(&ts).unwrap();
        assert_eq!(freq, Frequency::Fixed(Duration::weeks(1)));
        let future = freq.future_timestamps(*ts.last().unwrap(), 2).unwrap();
        assert_eq!(future, vec![ymd(2024, 2, 12), ymd(2024, 2, 19)]);
    }

    #[test]
    fn test_sub_millisecond_steps_are_exact() {
        let start = ymd(2024, 1, 1);
        let freq = Frequency::Fixed(Duration::microseconds(1_500));
        assert_eq!(
            freq.advance(start, 3).unwrap(),
            start + Duration::microseconds(4_500)
        );

        let freq = Frequency::Fixed(Duration::seconds(2) + Duration::nanoseconds(250));
        assert_eq!(
            freq.advance(start, 4).unwrap(),
            start + Duration::seconds(8) + Duration::nanoseconds(1_000)
        );
    }

    #[test]
    fn test_step_overflow_is_an_error() {
        let start = ymd(2024, 1, 1);
        let monthly = Frequency::Months {
            step: 2,
            month_end: false,
        };
        assert!(matches!(
            monthly.advance(start, u32::MAX),
            Err(ForecastError::ForecastingError(_))
        ));

        let month_end = Frequency::Months {
            step: 1,
            month_end: true,
        };
        assert!(month_end.advance(ymd(2024, 1, 31), u32::MAX).is_err());

        let weekly = Frequency::Fixed(Duration::weeks(1));
        assert!(weekly.advance(start, u32::MAX).is_err());
    }
}
