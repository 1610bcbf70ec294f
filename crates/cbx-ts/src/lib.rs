//! # cbx-ts: aggregation and KPI engine
//!
//! Read-only views over a processed exchange dataset: filtered resampling
//! at hour/day/week/month granularity, per-partner breakdowns for stacked
//! areas, a weekday×hour pivot for heatmaps, scalar KPIs, and the analytics
//! extras behind the dashboard (partner totals, top days, rolling mean).
//!
//! Energy-like quantities are always resampled by **sum** so conserved
//! totals survive; the pivot is a typical-pattern view and averages.
//!
//! The overall France series follows the source-totals policy: with no
//! partner selection it comes from the reserved `TOTAL` records, while a
//! subset selection sums the selected partners' rows. An explicitly empty
//! selection yields empty series and all-zero KPIs, never an error.

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::str::FromStr;
use std::sync::Arc;

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Timelike};
use serde::Serialize;

use cbx_core::{CbxError, CbxResult, ProcessedRecord};

/// Weekday row labels of the pivot table, Monday first.
pub const WEEKDAY_LABELS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

/// Time-bucket size for resampling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Granularity {
    Hour,
    Day,
    Week,
    Month,
}

impl Granularity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Granularity::Hour => "hour",
            Granularity::Day => "day",
            Granularity::Week => "week",
            Granularity::Month => "month",
        }
    }

    /// Start of the bucket containing `ts`: the hour itself, midnight, the
    /// preceding Monday, or the first of the month.
    pub fn bucket(&self, ts: NaiveDateTime) -> NaiveDateTime {
        let start_of = |date: NaiveDate| date.and_hms_opt(0, 0, 0).unwrap_or(ts);
        match self {
            Granularity::Hour => ts
                .date()
                .and_hms_opt(ts.hour(), 0, 0)
                .unwrap_or(ts),
            Granularity::Day => start_of(ts.date()),
            Granularity::Week => {
                let monday =
                    ts.date() - Duration::days(ts.weekday().num_days_from_monday() as i64);
                start_of(monday)
            }
            Granularity::Month => NaiveDate::from_ymd_opt(ts.year(), ts.month(), 1)
                .map(start_of)
                .unwrap_or(ts),
        }
    }
}

impl FromStr for Granularity {
    type Err = CbxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "hour" | "hourly" | "h" => Ok(Granularity::Hour),
            "day" | "daily" | "d" => Ok(Granularity::Day),
            "week" | "weekly" | "w" => Ok(Granularity::Week),
            "month" | "monthly" | "m" => Ok(Granularity::Month),
            other => Err(CbxError::config(format!(
                "unknown granularity '{other}'; use hour, day, week, or month"
            ))),
        }
    }
}

impl std::fmt::Display for Granularity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Date/partner filter of an aggregation request.
///
/// `partners: None` selects every real partner; `Some` with an empty set is
/// an explicit empty selection. Bounds are inclusive calendar dates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct FilterSpec {
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub partners: Option<BTreeSet<String>>,
}

impl FilterSpec {
    pub fn validate(&self) -> CbxResult<()> {
        if let (Some(from), Some(to)) = (self.date_from, self.date_to) {
            if from > to {
                return Err(CbxError::config(format!(
                    "invalid date range: {from} is after {to}"
                )));
            }
        }
        Ok(())
    }

    fn admits_date(&self, ts: NaiveDateTime) -> bool {
        let date = ts.date();
        self.date_from.map_or(true, |from| date >= from)
            && self.date_to.map_or(true, |to| date <= to)
    }
}

/// One bucket of the overall resampled series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub bucket: NaiveDateTime,
    pub export_mw: f64,
    pub import_mw: f64,
    pub net_mw: f64,
}

/// One (bucket, partner) cell of the stacked-area breakdown.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BreakdownPoint {
    pub bucket: NaiveDateTime,
    pub partner: String,
    pub export_mw: f64,
    pub import_mw: f64,
    pub net_mw: f64,
}

/// Scalar KPIs over a filtered, resampled window.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Kpis {
    pub total_export_mwh: f64,
    pub total_import_mwh: f64,
    pub total_net_mwh: f64,
    /// Share of buckets with a positive net balance.
    pub exporter_fraction: f64,
    pub buckets: usize,
}

/// Mean net balance by weekday (rows, Monday first) × hour-of-day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PivotTable {
    pub mean_net_mw: Vec<Vec<f64>>,
    pub samples: Vec<Vec<u32>>,
}

/// Cumulative net balance of one partner over the filter window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PartnerNet {
    pub partner: String,
    pub net_mwh: f64,
}

/// One day of the overall net series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayNet {
    pub day: NaiveDate,
    pub net_mwh: f64,
}

/// Strongest export and import days of the filtered window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopDays {
    pub exports: Vec<DayNet>,
    pub imports: Vec<DayNet>,
}

/// Hourly overall stream after filtering, sorted by timestamp.
///
/// No selection → the `TOTAL` records (falling back to summing every
/// partner for datasets without an overall series); a selection → the sum
/// of the selected partners' rows.
fn overall_hourly(
    records: &[ProcessedRecord],
    filter: &FilterSpec,
) -> Vec<(NaiveDateTime, f64, f64, f64)> {
    match &filter.partners {
        None => {
            let mut totals: Vec<_> = records
                .iter()
                .filter(|r| r.is_total() && filter.admits_date(r.timestamp))
                .map(|r| (r.timestamp, r.export_mw, r.import_mw, r.net_mw))
                .collect();
            if totals.is_empty() {
                return sum_partners(records, filter, None);
            }
            totals.sort_unstable_by_key(|(ts, ..)| *ts);
            totals
        }
        Some(selection) => sum_partners(records, filter, Some(selection)),
    }
}

fn sum_partners(
    records: &[ProcessedRecord],
    filter: &FilterSpec,
    selection: Option<&BTreeSet<String>>,
) -> Vec<(NaiveDateTime, f64, f64, f64)> {
    let mut hours: BTreeMap<NaiveDateTime, (f64, f64, f64)> = BTreeMap::new();
    for record in records {
        if record.is_total() || !filter.admits_date(record.timestamp) {
            continue;
        }
        if let Some(set) = selection {
            if !set.contains(&record.partner) {
                continue;
            }
        }
        let entry = hours.entry(record.timestamp).or_default();
        entry.0 += record.export_mw;
        entry.1 += record.import_mw;
        entry.2 += record.net_mw;
    }
    hours
        .into_iter()
        .map(|(ts, (export, import, net))| (ts, export, import, net))
        .collect()
}

/// Resample the overall series to `granularity`, summing per bucket.
pub fn resample(
    records: &[ProcessedRecord],
    filter: &FilterSpec,
    granularity: Granularity,
) -> CbxResult<Vec<SeriesPoint>> {
    filter.validate()?;
    let mut buckets: BTreeMap<NaiveDateTime, (f64, f64, f64)> = BTreeMap::new();
    for (ts, export, import, net) in overall_hourly(records, filter) {
        let entry = buckets.entry(granularity.bucket(ts)).or_default();
        entry.0 += export;
        entry.1 += import;
        entry.2 += net;
    }
    Ok(buckets
        .into_iter()
        .map(|(bucket, (export_mw, import_mw, net_mw))| SeriesPoint {
            bucket,
            export_mw,
            import_mw,
            net_mw,
        })
        .collect())
}

/// Per-partner resampled series, ordered by (bucket, partner).
pub fn breakdown(
    records: &[ProcessedRecord],
    filter: &FilterSpec,
    granularity: Granularity,
) -> CbxResult<Vec<BreakdownPoint>> {
    filter.validate()?;
    let mut buckets: BTreeMap<(NaiveDateTime, &str), (f64, f64, f64)> = BTreeMap::new();
    for record in records {
        if record.is_total() || !filter.admits_date(record.timestamp) {
            continue;
        }
        if let Some(set) = &filter.partners {
            if !set.contains(&record.partner) {
                continue;
            }
        }
        let key = (granularity.bucket(record.timestamp), record.partner.as_str());
        let entry = buckets.entry(key).or_default();
        entry.0 += record.export_mw;
        entry.1 += record.import_mw;
        entry.2 += record.net_mw;
    }
    Ok(buckets
        .into_iter()
        .map(|((bucket, partner), (export_mw, import_mw, net_mw))| BreakdownPoint {
            bucket,
            partner: partner.to_string(),
            export_mw,
            import_mw,
            net_mw,
        })
        .collect())
}

fn kpis_from_series(series: &[SeriesPoint]) -> Kpis {
    let mut kpis = Kpis {
        buckets: series.len(),
        ..Default::default()
    };
    let mut exporting = 0usize;
    for point in series {
        kpis.total_export_mwh += point.export_mw;
        kpis.total_import_mwh += point.import_mw;
        kpis.total_net_mwh += point.net_mw;
        if point.net_mw > 0.0 {
            exporting += 1;
        }
    }
    if !series.is_empty() {
        kpis.exporter_fraction = exporting as f64 / series.len() as f64;
    }
    kpis
}

/// Scalar KPIs at the requested granularity.
///
/// An empty window (no overlap, or an explicit empty selection) yields
/// all-zero KPIs rather than an error.
pub fn kpis(
    records: &[ProcessedRecord],
    filter: &FilterSpec,
    granularity: Granularity,
) -> CbxResult<Kpis> {
    Ok(kpis_from_series(&resample(records, filter, granularity)?))
}

/// Mean net balance per (weekday, hour-of-day) cell over the filtered
/// hourly records. Cells with no samples read 0.0; `samples` tells them
/// apart from true zero means.
pub fn pivot_weekday_hour(
    records: &[ProcessedRecord],
    filter: &FilterSpec,
) -> CbxResult<PivotTable> {
    filter.validate()?;
    let mut sums = vec![vec![0.0f64; 24]; 7];
    let mut samples = vec![vec![0u32; 24]; 7];
    for (ts, _, _, net) in overall_hourly(records, filter) {
        let weekday = ts.weekday().num_days_from_monday() as usize;
        let hour = ts.hour() as usize;
        sums[weekday][hour] += net;
        samples[weekday][hour] += 1;
    }
    let mean_net_mw = sums
        .iter()
        .zip(&samples)
        .map(|(row_sums, row_counts)| {
            row_sums
                .iter()
                .zip(row_counts)
                .map(|(&sum, &count)| if count > 0 { sum / count as f64 } else { 0.0 })
                .collect()
        })
        .collect();
    Ok(PivotTable {
        mean_net_mw,
        samples,
    })
}

/// Cumulative net per partner over the window, strongest exporter first.
pub fn partner_totals(
    records: &[ProcessedRecord],
    filter: &FilterSpec,
) -> CbxResult<Vec<PartnerNet>> {
    filter.validate()?;
    let mut totals: BTreeMap<&str, f64> = BTreeMap::new();
    for record in records {
        if record.is_total() || !filter.admits_date(record.timestamp) {
            continue;
        }
        if let Some(set) = &filter.partners {
            if !set.contains(&record.partner) {
                continue;
            }
        }
        *totals.entry(record.partner.as_str()).or_default() += record.net_mw;
    }
    let mut out: Vec<PartnerNet> = totals
        .into_iter()
        .map(|(partner, net_mwh)| PartnerNet {
            partner: partner.to_string(),
            net_mwh,
        })
        .collect();
    out.sort_by(|a, b| {
        b.net_mwh
            .partial_cmp(&a.net_mwh)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.partner.cmp(&b.partner))
    });
    Ok(out)
}

/// The `count` strongest export days and import days of the window.
pub fn top_days(
    records: &[ProcessedRecord],
    filter: &FilterSpec,
    count: usize,
) -> CbxResult<TopDays> {
    let daily = resample(records, filter, Granularity::Day)?;
    let mut by_net: Vec<DayNet> = daily
        .iter()
        .map(|point| DayNet {
            day: point.bucket.date(),
            net_mwh: point.net_mw,
        })
        .collect();
    by_net.sort_by(|a, b| {
        b.net_mwh
            .partial_cmp(&a.net_mwh)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    let exports: Vec<DayNet> = by_net.iter().take(count).cloned().collect();
    let imports: Vec<DayNet> = by_net.iter().rev().take(count).cloned().collect();
    Ok(TopDays { exports, imports })
}

/// Rolling mean over the daily overall net.
///
/// The window slides over a contiguous calendar (missing days count as
/// zero, matching a daily resample of a gappy series) and ramps up from a
/// single day at the start of the range.
pub fn rolling_daily_mean(
    records: &[ProcessedRecord],
    filter: &FilterSpec,
    window: usize,
) -> CbxResult<Vec<DayNet>> {
    if window == 0 {
        return Err(CbxError::config("rolling window must be at least 1 day"));
    }
    let daily = resample(records, filter, Granularity::Day)?;
    let Some(first) = daily.first() else {
        return Ok(Vec::new());
    };
    let last = daily[daily.len() - 1].bucket.date();
    let by_day: BTreeMap<NaiveDate, f64> = daily
        .iter()
        .map(|point| (point.bucket.date(), point.net_mw))
        .collect();

    let mut days: Vec<(NaiveDate, f64)> = Vec::new();
    let mut day = first.bucket.date();
    while day <= last {
        days.push((day, by_day.get(&day).copied().unwrap_or(0.0)));
        day = day
            .succ_opt()
            .ok_or_else(|| CbxError::config("date range overflows the calendar"))?;
    }

    Ok(days
        .iter()
        .enumerate()
        .map(|(i, &(day, _))| {
            let start = i.saturating_sub(window - 1);
            let slice = &days[start..=i];
            let mean = slice.iter().map(|(_, net)| net).sum::<f64>() / slice.len() as f64;
            DayNet {
                day,
                net_mwh: mean,
            }
        })
        .collect())
}

/// Key of one memoized aggregation request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    filter: FilterSpec,
    granularity: Granularity,
}

/// Everything the dashboard needs for one (filter, granularity) request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateView {
    pub series: Vec<SeriesPoint>,
    pub breakdown: Vec<BreakdownPoint>,
    pub kpis: Kpis,
}

/// Bounded, explicitly evictable cache of aggregation results.
///
/// The processed table is immutable after load, so views are memoized per
/// (filter, granularity) key. Eviction is FIFO at a fixed capacity; the
/// cache is owned by the caller, never global.
pub struct AggCache {
    capacity: usize,
    map: HashMap<CacheKey, Arc<AggregateView>>,
    order: VecDeque<CacheKey>,
}

impl AggCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            map: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Cached view for the request, computing and storing it on a miss.
    pub fn get_or_compute(
        &mut self,
        records: &[ProcessedRecord],
        filter: &FilterSpec,
        granularity: Granularity,
    ) -> CbxResult<Arc<AggregateView>> {
        let key = CacheKey {
            filter: filter.clone(),
            granularity,
        };
        if let Some(hit) = self.map.get(&key) {
            return Ok(Arc::clone(hit));
        }

        let series = resample(records, filter, granularity)?;
        let view = Arc::new(AggregateView {
            kpis: kpis_from_series(&series),
            breakdown: breakdown(records, filter, granularity)?,
            series,
        });

        if self.map.len() == self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.map.remove(&oldest);
            }
        }
        self.order.push_back(key.clone());
        self.map.insert(key, Arc::clone(&view));
        Ok(view)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cbx_core::TOTAL_PARTNER;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn rec(day: u32, hour: u32, partner: &str, export: f64, import: f64) -> ProcessedRecord {
        ProcessedRecord::new(
            date(day).and_hms_opt(hour, 0, 0).unwrap(),
            partner,
            export,
            import,
        )
    }

    /// 24 hourly records for one partner plus matching TOTAL rows.
    fn full_day(day: u32, partner: &str, export: f64, import: f64) -> Vec<ProcessedRecord> {
        let mut records = Vec::new();
        for hour in 0..24 {
            records.push(rec(day, hour, partner, export, import));
            records.push(rec(day, hour, TOTAL_PARTNER, export, import));
        }
        records
    }

    #[test]
    fn granularity_parses_names_and_aliases() {
        assert_eq!("hour".parse::<Granularity>().unwrap(), Granularity::Hour);
        assert_eq!("H".parse::<Granularity>().unwrap(), Granularity::Hour);
        assert_eq!("daily".parse::<Granularity>().unwrap(), Granularity::Day);
        assert_eq!("w".parse::<Granularity>().unwrap(), Granularity::Week);
        assert_eq!("month".parse::<Granularity>().unwrap(), Granularity::Month);
    }

    #[test]
    fn unknown_granularity_is_a_config_error() {
        let err = "fortnight".parse::<Granularity>().unwrap_err();
        assert!(matches!(err, CbxError::Config(_)));
        assert!(err.to_string().contains("fortnight"));
    }

    #[test]
    fn buckets_snap_to_period_starts() {
        let ts = date(10).and_hms_opt(13, 0, 0).unwrap(); // Wednesday 2024-01-10
        assert_eq!(Granularity::Hour.bucket(ts), ts);
        assert_eq!(
            Granularity::Day.bucket(ts),
            date(10).and_hms_opt(0, 0, 0).unwrap()
        );
        assert_eq!(
            Granularity::Week.bucket(ts),
            date(8).and_hms_opt(0, 0, 0).unwrap() // Monday of that week
        );
        assert_eq!(
            Granularity::Month.bucket(ts),
            date(1).and_hms_opt(0, 0, 0).unwrap()
        );
    }

    #[test]
    fn hourly_resample_of_hourly_data_is_identity() {
        let records = full_day(1, "GBR", 10.0, 2.0);
        let series = resample(&records, &FilterSpec::default(), Granularity::Hour).unwrap();
        assert_eq!(series.len(), 24);
        assert!(series.iter().all(|p| p.net_mw == 8.0));
        let total: f64 = series.iter().map(|p| p.net_mw).sum();
        assert!((total - 24.0 * 8.0).abs() < 1e-9);
    }

    #[test]
    fn daily_totals_equal_sum_of_hourly_totals() {
        let mut records = full_day(1, "GBR", 12.0, 2.0);
        records.extend(full_day(2, "GBR", 5.0, 8.0));

        let hourly = resample(&records, &FilterSpec::default(), Granularity::Hour).unwrap();
        let daily = resample(&records, &FilterSpec::default(), Granularity::Day).unwrap();
        assert_eq!(daily.len(), 2);
        let fields: [fn(&SeriesPoint) -> f64; 3] =
            [|p| p.export_mw, |p| p.import_mw, |p| p.net_mw];
        for field in fields {
            let hourly_sum: f64 = hourly.iter().map(field).sum();
            let daily_sum: f64 = daily.iter().map(field).sum();
            assert!((hourly_sum - daily_sum).abs() < 1e-9);
        }
        // 24 hourly rows of net 10 collapse into one daily row of net 240
        let day_one = full_day(3, "ESP", 10.0, 0.0);
        let daily = resample(&day_one, &FilterSpec::default(), Granularity::Day).unwrap();
        assert_eq!(daily.len(), 1);
        assert!((daily[0].net_mw - 240.0).abs() < 1e-9);
    }

    #[test]
    fn overall_series_prefers_total_records() {
        // TOTAL carries source totals that differ from the bilateral sum
        let records = vec![
            rec(1, 0, "GBR", 100.0, 0.0),
            rec(1, 0, TOTAL_PARTNER, 120.0, 30.0),
        ];
        let series = resample(&records, &FilterSpec::default(), Granularity::Hour).unwrap();
        assert_eq!(series[0].export_mw, 120.0);
        assert_eq!(series[0].import_mw, 30.0);
    }

    #[test]
    fn overall_series_falls_back_without_total_records() {
        let records = vec![rec(1, 0, "GBR", 100.0, 0.0), rec(1, 0, "ESP", 0.0, 40.0)];
        let series = resample(&records, &FilterSpec::default(), Granularity::Hour).unwrap();
        assert_eq!(series[0].export_mw, 100.0);
        assert_eq!(series[0].import_mw, 40.0);
        assert_eq!(series[0].net_mw, 60.0);
    }

    #[test]
    fn subset_selection_sums_selected_partners_only() {
        let records = vec![
            rec(1, 0, "GBR", 100.0, 0.0),
            rec(1, 0, "ESP", 50.0, 0.0),
            rec(1, 0, TOTAL_PARTNER, 150.0, 0.0),
        ];
        let filter = FilterSpec {
            partners: Some(BTreeSet::from(["GBR".to_string()])),
            ..Default::default()
        };
        let series = resample(&records, &filter, Granularity::Hour).unwrap();
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].export_mw, 100.0);
    }

    #[test]
    fn empty_selection_yields_zero_kpis_not_an_error() {
        let records = full_day(1, "GBR", 10.0, 2.0);
        let filter = FilterSpec {
            partners: Some(BTreeSet::new()),
            ..Default::default()
        };
        let kpis = kpis(&records, &filter, Granularity::Day).unwrap();
        assert_eq!(kpis, Kpis::default());
    }

    #[test]
    fn disjoint_date_range_yields_empty_result_not_an_error() {
        let records = full_day(1, "GBR", 10.0, 2.0);
        let filter = FilterSpec {
            date_from: Some(NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()),
            date_to: Some(NaiveDate::from_ymd_opt(2025, 2, 1).unwrap()),
            partners: None,
        };
        let series = resample(&records, &filter, Granularity::Month).unwrap();
        assert!(series.is_empty());
        let kpis = kpis(&records, &filter, Granularity::Month).unwrap();
        assert_eq!(kpis.total_net_mwh, 0.0);
        assert_eq!(kpis.exporter_fraction, 0.0);
    }

    #[test]
    fn inverted_date_range_is_a_config_error() {
        let filter = FilterSpec {
            date_from: Some(date(10)),
            date_to: Some(date(1)),
            partners: None,
        };
        let err = resample(&[], &filter, Granularity::Day).unwrap_err();
        assert!(matches!(err, CbxError::Config(_)));
    }

    #[test]
    fn date_bounds_are_inclusive() {
        let mut records = full_day(1, "GBR", 1.0, 0.0);
        records.extend(full_day(2, "GBR", 1.0, 0.0));
        records.extend(full_day(3, "GBR", 1.0, 0.0));
        let filter = FilterSpec {
            date_from: Some(date(2)),
            date_to: Some(date(2)),
            partners: None,
        };
        let series = resample(&records, &filter, Granularity::Day).unwrap();
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].bucket.date(), date(2));
    }

    #[test]
    fn breakdown_keeps_partners_separate_and_skips_total() {
        let records = vec![
            rec(1, 0, "GBR", 10.0, 0.0),
            rec(1, 0, "ESP", 0.0, 5.0),
            rec(1, 0, TOTAL_PARTNER, 10.0, 5.0),
            rec(1, 1, "GBR", 20.0, 0.0),
        ];
        let points = breakdown(&records, &FilterSpec::default(), Granularity::Day).unwrap();
        assert_eq!(points.len(), 2);
        assert!(points.iter().all(|p| p.partner != TOTAL_PARTNER));
        let gbr = points.iter().find(|p| p.partner == "GBR").unwrap();
        assert_eq!(gbr.export_mw, 30.0);
        let esp = points.iter().find(|p| p.partner == "ESP").unwrap();
        assert_eq!(esp.net_mw, -5.0);
    }

    #[test]
    fn kpis_report_exporter_fraction() {
        // two exporting days, one importing day
        let mut records = full_day(1, "GBR", 10.0, 2.0);
        records.extend(full_day(2, "GBR", 10.0, 2.0));
        records.extend(full_day(3, "GBR", 2.0, 10.0));
        let kpis = kpis(&records, &FilterSpec::default(), Granularity::Day).unwrap();
        assert_eq!(kpis.buckets, 3);
        assert!((kpis.exporter_fraction - 2.0 / 3.0).abs() < 1e-9);
        assert!((kpis.total_net_mwh - (192.0 + 192.0 - 192.0)).abs() < 1e-9);
    }

    #[test]
    fn pivot_averages_by_weekday_and_hour() {
        // 2024-01-01 and 2024-01-08 are both Mondays
        let records = vec![
            rec(1, 6, TOTAL_PARTNER, 10.0, 0.0),
            rec(8, 6, TOTAL_PARTNER, 30.0, 0.0),
            rec(2, 6, TOTAL_PARTNER, 7.0, 0.0), // Tuesday
        ];
        let pivot = pivot_weekday_hour(&records, &FilterSpec::default()).unwrap();
        assert_eq!(pivot.mean_net_mw[0][6], 20.0);
        assert_eq!(pivot.samples[0][6], 2);
        assert_eq!(pivot.mean_net_mw[1][6], 7.0);
        assert_eq!(pivot.samples[1][6], 1);
        assert_eq!(pivot.mean_net_mw[3][6], 0.0);
        assert_eq!(pivot.samples[3][6], 0);
    }

    #[test]
    fn partner_totals_rank_strongest_exporter_first() {
        let records = vec![
            rec(1, 0, "GBR", 10.0, 0.0),
            rec(1, 1, "GBR", 10.0, 0.0),
            rec(1, 0, "ESP", 0.0, 5.0),
            rec(1, 0, "CHE", 8.0, 1.0),
            rec(1, 0, TOTAL_PARTNER, 23.0, 1.0),
        ];
        let totals = partner_totals(&records, &FilterSpec::default()).unwrap();
        let codes: Vec<&str> = totals.iter().map(|p| p.partner.as_str()).collect();
        assert_eq!(codes, vec!["GBR", "CHE", "ESP"]);
        assert_eq!(totals[0].net_mwh, 20.0);
        assert_eq!(totals[2].net_mwh, -5.0);
    }

    #[test]
    fn top_days_sorts_both_tails() {
        let mut records = full_day(1, "GBR", 10.0, 0.0); // +240
        records.extend(full_day(2, "GBR", 0.0, 20.0)); // -480
        records.extend(full_day(3, "GBR", 5.0, 0.0)); // +120
        let top = top_days(&records, &FilterSpec::default(), 2).unwrap();
        assert_eq!(top.exports.len(), 2);
        assert_eq!(top.exports[0].day, date(1));
        assert_eq!(top.exports[0].net_mwh, 240.0);
        assert_eq!(top.imports[0].day, date(2));
        assert_eq!(top.imports[0].net_mwh, -480.0);
    }

    #[test]
    fn rolling_mean_ramps_and_fills_calendar_gaps() {
        // day 1: net 240, day 2 missing, day 3: net 0 (from 120 export/import)
        let mut records = full_day(1, "GBR", 10.0, 0.0);
        records.extend(full_day(3, "GBR", 5.0, 5.0));
        let rolled = rolling_daily_mean(&records, &FilterSpec::default(), 2).unwrap();
        assert_eq!(rolled.len(), 3);
        assert_eq!(rolled[0].net_mwh, 240.0); // ramp-up: single day
        assert_eq!(rolled[1].net_mwh, 120.0); // (240 + 0)/2, gap counts as zero
        assert_eq!(rolled[2].net_mwh, 0.0); // (0 + 0)/2
    }

    #[test]
    fn rolling_window_of_zero_is_a_config_error() {
        assert!(matches!(
            rolling_daily_mean(&[], &FilterSpec::default(), 0),
            Err(CbxError::Config(_))
        ));
    }

    #[test]
    fn cache_hits_return_the_same_view() {
        let records = full_day(1, "GBR", 10.0, 2.0);
        let mut cache = AggCache::new(4);
        let filter = FilterSpec::default();
        let first = cache
            .get_or_compute(&records, &filter, Granularity::Day)
            .unwrap();
        let second = cache
            .get_or_compute(&records, &filter, Granularity::Day)
            .unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
        assert_eq!(first.kpis.buckets, 1);
        assert!(!first.breakdown.is_empty());
    }

    #[test]
    fn cache_evicts_oldest_entry_at_capacity() {
        let records = full_day(1, "GBR", 10.0, 2.0);
        let mut cache = AggCache::new(2);
        let filter = FilterSpec::default();
        let hour = cache
            .get_or_compute(&records, &filter, Granularity::Hour)
            .unwrap();
        cache
            .get_or_compute(&records, &filter, Granularity::Day)
            .unwrap();
        cache
            .get_or_compute(&records, &filter, Granularity::Week)
            .unwrap();
        assert_eq!(cache.len(), 2);
        // the hour view was evicted; recomputing yields a fresh Arc
        let again = cache
            .get_or_compute(&records, &filter, Granularity::Hour)
            .unwrap();
        assert!(!Arc::ptr_eq(&hour, &again));
        assert_eq!(*hour, *again);
    }
}
