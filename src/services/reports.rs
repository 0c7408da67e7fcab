//! Circulation reports

use std::sync::Arc;

use uuid::Uuid;

use super::{access::authorize, clock::Clock};
use crate::{
    error::AppResult,
    models::{
        policy::Operation,
        report::{LateStudent, LoanTrendQuery, PeriodCount, ReportPeriod, SummaryReport, TitleCount, TitleRating},
    },
    repository::{reports::ReportsRepository, UserDirectory},
};

const DEFAULT_LIMIT: i64 = 10;

#[derive(Clone)]
pub struct ReportsService {
    users: Arc<dyn UserDirectory>,
    reports: ReportsRepository,
    clock: Arc<dyn Clock>,
}

impl ReportsService {
    pub fn new(users: Arc<dyn UserDirectory>, reports: ReportsRepository, clock: Arc<dyn Clock>) -> Self {
        Self { users, reports, clock }
    }

    pub async fn summary(&self, actor: Uuid) -> AppResult<SummaryReport> {
        authorize(self.users.as_ref(), actor, Operation::ViewReports).await?;
        self.reports.summary(self.clock.today()).await
    }

    pub async fn most_borrowed(&self, actor: Uuid, period: &ReportPeriod) -> AppResult<Vec<TitleCount>> {
        authorize(self.users.as_ref(), actor, Operation::ViewReports).await?;
        self.reports
            .most_borrowed(period, limit(period.limit))
            .await
    }

    /// Students ranked by closed returns that carried a late fine
    pub async fn late_students(&self, actor: Uuid, period: &ReportPeriod) -> AppResult<Vec<LateStudent>> {
        authorize(self.users.as_ref(), actor, Operation::ViewReports).await?;
        self.reports
            .late_students(period, limit(period.limit))
            .await
    }

    /// Titles by average rating over loans borrowed within the period
    pub async fn top_rated(&self, actor: Uuid, period: &ReportPeriod) -> AppResult<Vec<TitleRating>> {
        authorize(self.users.as_ref(), actor, Operation::ViewReports).await?;
        self.reports.top_rated(period, limit(period.limit)).await
    }

    pub async fn loans_per_period(&self, actor: Uuid, query: &LoanTrendQuery) -> AppResult<Vec<PeriodCount>> {
        authorize(self.users.as_ref(), actor, Operation::ViewReports).await?;
        self.reports
            .loans_per_period(query.from, query.to, query.interval.unwrap_or_default())
            .await
    }
}

fn limit(requested: Option<i64>) -> i64 {
    requested.unwrap_or(DEFAULT_LIMIT).clamp(1, 100)
}
