//! Billing statistics for a named or custom period.

use chrono::{Utc, Weekday};
use medibill_core::period::StatsPeriod;
use medibill_core::statistics::BillingStatistics;
use medibill_db::Database;

use crate::dto::StatisticsQuery;
use crate::error::ServiceResult;

#[derive(Clone)]
pub struct StatisticsService {
    db: Database,
    week_start: Weekday,
}

impl StatisticsService {
    pub fn new(db: Database, week_start: Weekday) -> Self {
        StatisticsService { db, week_start }
    }

    /// `period` defaults to `this_month`; `custom` needs both dates.
    pub async fn get(&self, hospital_id: &str, query: StatisticsQuery) -> ServiceResult<BillingStatistics> {
        let period = match query.period.as_deref() {
            Some(name) => name.parse::<StatsPeriod>()?,
            None => StatsPeriod::default(),
        };

        let custom = match (query.start_date, query.end_date) {
            (Some(start), Some(end)) => Some((start, end)),
            _ => None,
        };

        let range = period.resolve(Utc::now(), self.week_start, custom)?;
        Ok(self.db.statistics().aggregate(hospital_id, period, range).await?)
    }
}
