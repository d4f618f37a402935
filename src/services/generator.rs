//! Synthetic visitor count generation
//!
//! Counts follow a step profile over the day (quiet nights, a lunchtime
//! peak), get a 20% lift on weekends and are perturbed by a bounded random
//! factor so successive runs differ while staying in a realistic band.

use std::ops::RangeInclusive;

use chrono::{Datelike, NaiveDateTime, TimeDelta, Timelike, Weekday};
use rand::Rng;

use crate::{
    config::ExportConfig,
    error::ExportError,
    models::{SampleWindow, VisitorRecord},
};

const MORNING_VISITORS: u32 = 15;
const NOON_VISITORS: u32 = 45;
const EVENING_VISITORS: u32 = 30;
const NIGHT_VISITORS: u32 = 8;

/// Upper bound for the configured `max_hours_back`, one leap year
pub const HOURS_BACK_LIMIT: i64 = 24 * 366;

#[derive(Debug, Clone)]
pub struct VisitorDataGenerator {
    interval_minutes: u32,
    variation: f64,
    max_hours_back: i64,
}

impl VisitorDataGenerator {
    /// Create a generator, rejecting parameters that cannot describe a window
    pub fn new(interval_minutes: u32, variation: f64, max_hours_back: i64) -> Result<Self, ExportError> {
        if interval_minutes == 0 || interval_minutes > 60 || 60 % interval_minutes != 0 {
            return Err(ExportError::Generation(format!(
                "interval of {} minutes does not divide an hour",
                interval_minutes
            )));
        }
        if !(0.0..1.0).contains(&variation) {
            return Err(ExportError::Generation(format!(
                "variation {} outside [0, 1)",
                variation
            )));
        }
        if !(1..=HOURS_BACK_LIMIT).contains(&max_hours_back) {
            return Err(ExportError::Generation(format!(
                "max_hours_back {} outside 1..={}",
                max_hours_back, HOURS_BACK_LIMIT
            )));
        }

        Ok(Self {
            interval_minutes,
            variation,
            max_hours_back,
        })
    }

    pub fn from_config(config: &ExportConfig) -> Result<Self, ExportError> {
        Self::new(config.interval_minutes, config.variation, config.max_hours_back)
    }

    /// Same profile with the random perturbation switched off
    pub fn without_perturbation(mut self) -> Self {
        self.variation = 0.0;
        self
    }

    /// Generate records for `window`, ending at `reference` floored to the
    /// sample interval. Records are ordered oldest first.
    pub fn generate<R: Rng>(
        &self,
        reference: NaiveDateTime,
        window: SampleWindow,
        rng: &mut R,
    ) -> Result<Vec<VisitorRecord>, ExportError> {
        let end = self.floor_to_interval(reference);

        let samples = match window {
            SampleWindow::Current => 1,
            SampleWindow::Series { hours_back } => {
                if hours_back <= 0 {
                    return Err(ExportError::Generation(format!(
                        "hours_back must be positive, got {}",
                        hours_back
                    )));
                }
                if hours_back > self.max_hours_back {
                    return Err(ExportError::Generation(format!(
                        "hours_back {} exceeds the maximum of {}",
                        hours_back, self.max_hours_back
                    )));
                }
                hours_back * 60 / i64::from(self.interval_minutes)
            }
        };

        let interval = i64::from(self.interval_minutes);
        (0..samples)
            .rev()
            .map(|i| -> Result<VisitorRecord, ExportError> {
                let timestamp = end
                    .checked_sub_signed(TimeDelta::minutes(i * interval))
                    .ok_or_else(|| {
                        ExportError::Generation(format!(
                            "window of {} samples before {} is out of range",
                            samples, end
                        ))
                    })?;
                Ok(VisitorRecord::new(timestamp, self.visitor_count(timestamp, rng)))
            })
            .collect()
    }

    /// Drop seconds and round minutes down to the sample interval
    pub fn floor_to_interval(&self, timestamp: NaiveDateTime) -> NaiveDateTime {
        let excess = i64::from(timestamp.minute() % self.interval_minutes) * 60
            + i64::from(timestamp.second());
        timestamp
            - TimeDelta::seconds(excess)
            - TimeDelta::nanoseconds(i64::from(timestamp.nanosecond()))
    }

    /// Inclusive range every generated count at `timestamp` falls in
    pub fn band(&self, timestamp: NaiveDateTime) -> RangeInclusive<u32> {
        let base = base_visitors(timestamp);
        scale(base, 1.0 - self.variation)..=scale(base, 1.0 + self.variation)
    }

    fn visitor_count<R: Rng>(&self, timestamp: NaiveDateTime, rng: &mut R) -> u32 {
        let base = base_visitors(timestamp);
        if self.variation == 0.0 {
            return base;
        }
        let factor = rng.gen_range(1.0 - self.variation..=1.0 + self.variation);
        scale(base, factor)
    }
}

/// Expected visitors for the time of day, with the weekend lift applied
pub fn base_visitors(timestamp: NaiveDateTime) -> u32 {
    let base = match timestamp.hour() {
        6..=10 => MORNING_VISITORS,
        11..=14 => NOON_VISITORS,
        15..=19 => EVENING_VISITORS,
        _ => NIGHT_VISITORS,
    };

    match timestamp.weekday() {
        Weekday::Sat | Weekday::Sun => base * 6 / 5,
        _ => base,
    }
}

fn scale(base: u32, factor: f64) -> u32 {
    (f64::from(base) * factor).floor().max(0.0) as u32
}
