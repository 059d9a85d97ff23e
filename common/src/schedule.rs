// Publish schedule
//
// Cron expressions use the six-field syntax with second precision and are
// evaluated in the configured timezone. Fire times are returned in UTC.

use crate::config::ScheduleConfig;
use crate::errors::ScheduleError;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use cron::Schedule as CronSchedule;
use std::str::FromStr;

#[derive(Debug, Clone)]
pub struct PublishSchedule {
    expression: String,
    cron: CronSchedule,
    timezone: Tz,
}

impl PublishSchedule {
    pub fn new(expression: &str, timezone: &str) -> Result<Self, ScheduleError> {
        Ok(Self {
            expression: expression.to_string(),
            cron: parse_cron_expression(expression)?,
            timezone: parse_timezone(timezone)?,
        })
    }

    pub fn from_config(config: &ScheduleConfig) -> Result<Self, ScheduleError> {
        Self::new(&config.cron, &config.timezone)
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    /// First fire time strictly after `reference`
    pub fn next_run_after(&self, reference: DateTime<Utc>) -> Result<DateTime<Utc>, ScheduleError> {
        let reference_in_tz = reference.with_timezone(&self.timezone);
        self.cron
            .after(&reference_in_tz)
            .next()
            .map(|next| next.with_timezone(&Utc))
            .ok_or_else(|| ScheduleError::NoNextExecution(self.expression.clone()))
    }

    /// The next `count` fire times after `reference`
    pub fn upcoming(&self, reference: DateTime<Utc>, count: usize) -> Vec<DateTime<Utc>> {
        let reference_in_tz = reference.with_timezone(&self.timezone);
        self.cron
            .after(&reference_in_tz)
            .take(count)
            .map(|next| next.with_timezone(&Utc))
            .collect()
    }
}

/// Parse and validate a cron expression
pub fn parse_cron_expression(expression: &str) -> Result<CronSchedule, ScheduleError> {
    CronSchedule::from_str(expression).map_err(|e| ScheduleError::InvalidCronExpression {
        expression: expression.to_string(),
        reason: e.to_string(),
    })
}

pub fn parse_timezone(name: &str) -> Result<Tz, ScheduleError> {
    name.parse::<Tz>()
        .map_err(|_| ScheduleError::InvalidTimezone(name.to_string()))
}
