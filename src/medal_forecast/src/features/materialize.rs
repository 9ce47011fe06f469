use olympic_stats::{Season, StatsRecord};

use super::{FeatureSpec, FeatureVector, FillRule};

/// Request-scoped facts that are not on the stats record.
#[derive(Debug, Clone, Copy)]
pub struct MaterializeContext<'a> {
    /// Host country code of the target edition.
    pub host_country_code: &'a str,
    /// Season of the target edition.
    pub season: Season,
}

impl MaterializeContext<'_> {
    fn is_host(&self, country_code: &str) -> bool {
        self.host_country_code.eq_ignore_ascii_case(country_code)
    }
}

fn indicator(hit: bool) -> f64 {
    if hit { 1.0 } else { 0.0 }
}

/// Build the model input for one record; the result always has `spec.len()` entries.
pub fn materialize(record: &StatsRecord, spec: &FeatureSpec, ctx: &MaterializeContext<'_>) -> FeatureVector {
    spec.features()
        .iter()
        .map(|f| match &f.rule {
            FillRule::Field { source, null_default } => source.read(record).unwrap_or(*null_default),
            FillRule::HostFlag => indicator(ctx.is_host(&record.country_code)),
            FillRule::SeasonIndicator { season } => indicator(*season == ctx.season),
            FillRule::CountryIndicator { code } => indicator(record.country_code.eq_ignore_ascii_case(code)),
            FillRule::ProxyField { source } => source.read(record).unwrap_or(0.0),
            FillRule::ProxyConstant { value } => *value,
            FillRule::Unmapped => 0.0,
        })
        .collect()
}
