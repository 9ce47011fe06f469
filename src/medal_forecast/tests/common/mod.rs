#![allow(dead_code)]

use std::sync::Mutex;

use medal_forecast::{
    error::InvocationFailure,
    model::{MedalModel, ModelFamily},
};
use olympic_stats::{
    RepoError, RepoResult, Season, StatsRecord, StatsRepo,
    repo::{CountryMedals, DashboardSummary},
};

/// In-memory repository returning a fixed baseline, or failing every call.
pub struct FakeRepo {
    baseline: Result<Vec<StatsRecord>, String>,
    pub calls: Mutex<Vec<Season>>,
}

impl FakeRepo {
    pub fn with(records: Vec<StatsRecord>) -> Self {
        Self {
            baseline: Ok(records),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn unreachable() -> Self {
        Self {
            baseline: Err("connection refused".into()),
            calls: Mutex::new(Vec::new()),
        }
    }
}

impl StatsRepo for FakeRepo {
    fn latest_baseline(&self, season: Season) -> RepoResult<Vec<StatsRecord>> {
        self.calls.lock().unwrap().push(season);
        match &self.baseline {
            Ok(records) => Ok(records.iter().filter(|r| r.season == season).cloned().collect()),
            Err(msg) => Err(RepoError::Unavailable(msg.clone())),
        }
    }

    fn summary(&self) -> RepoResult<DashboardSummary> {
        Err(RepoError::Unavailable("not used".into()))
    }

    fn top_countries(&self, _limit: u32) -> RepoResult<Vec<CountryMedals>> {
        Err(RepoError::Unavailable("not used".into()))
    }
}

/// Summer baseline record.
pub fn record(code: &str, year: i32, athletes: u32, medals: u32) -> StatsRecord {
    let mut r = StatsRecord::new(code, year, Season::Summer);
    r.total_athletes = athletes;
    r.total_medals = medals;
    r.gold_medals = medals;
    r
}

/// `athletes * per_athlete + host_bonus * is_host`, over `[total_athletes, is_host]`.
pub struct ProportionalModel {
    names: Vec<String>,
    pub per_athlete: f64,
    pub host_bonus: f64,
}

impl ProportionalModel {
    pub fn new(per_athlete: f64, host_bonus: f64) -> Self {
        Self {
            names: vec!["total_athletes".into(), "is_host".into()],
            per_athlete,
            host_bonus,
        }
    }
}

impl MedalModel for ProportionalModel {
    fn family(&self) -> ModelFamily {
        ModelFamily::GradientBoosting
    }

    fn feature_names(&self) -> &[String] {
        &self.names
    }

    fn predict_raw(&self, features: &[f64]) -> Result<f64, InvocationFailure> {
        Ok(features[0] * self.per_athlete + features[1] * self.host_bonus)
    }
}

/// Fails for any record whose athlete count equals `poison`, otherwise predicts the count.
pub struct PoisonedModel {
    names: Vec<String>,
    pub poison: f64,
}

impl PoisonedModel {
    pub fn new(poison: f64) -> Self {
        Self {
            names: vec!["total_athletes".into()],
            poison,
        }
    }
}

impl MedalModel for PoisonedModel {
    fn family(&self) -> ModelFamily {
        ModelFamily::RandomForest
    }

    fn feature_names(&self) -> &[String] {
        &self.names
    }

    fn predict_raw(&self, features: &[f64]) -> Result<f64, InvocationFailure> {
        if features[0] == self.poison {
            return Err(InvocationFailure::Other("poisoned input".into()));
        }
        Ok(features[0])
    }
}
