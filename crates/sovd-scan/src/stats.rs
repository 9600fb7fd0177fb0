//! Statistics over stored results

use std::fmt;

use serde::Serialize;

use crate::policy::NegativeResponsePolicy;
use crate::store::ScanResult;

/// Min/max/mean of a set of response times (seconds)
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LatencyStats {
    pub min: f64,
    pub max: f64,
    pub avg: f64,
}

impl LatencyStats {
    /// `None` when there are no samples
    pub fn from_samples(samples: &[f64]) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }
        let min = samples.iter().copied().fold(f64::INFINITY, f64::min);
        let max = samples.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let avg = samples.iter().sum::<f64>() / samples.len() as f64;
        Some(Self { min, max, avg })
    }
}

/// Counts and latencies for one data set ("all" or a single state)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatisticsEntry {
    pub label: String,
    pub num_answered: usize,
    pub num_unanswered: usize,
    pub num_negative: usize,
    pub latency: Option<LatencyStats>,
    pub latency_negative: Option<LatencyStats>,
    pub latency_positive: Option<LatencyStats>,
}

/// One `(data set, metric, value)` row; missing data renders as `-`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatisticsRow {
    pub label: String,
    pub metric: String,
    pub value: String,
}

impl StatisticsEntry {
    fn compute<'a, S, P>(label: String, data: impl Iterator<Item = &'a ScanResult<S>>, policy: &P) -> Self
    where
        S: 'a,
        P: NegativeResponsePolicy + ?Sized,
    {
        let mut entry = Self {
            label,
            num_answered: 0,
            num_unanswered: 0,
            num_negative: 0,
            latency: None,
            latency_negative: None,
            latency_positive: None,
        };
        let mut all = Vec::new();
        let mut negative = Vec::new();
        let mut positive = Vec::new();

        for result in data {
            let Some(response) = result.response.as_ref() else {
                entry.num_unanswered += 1;
                continue;
            };
            entry.num_answered += 1;
            let is_negative = policy.is_negative(response);
            if is_negative {
                entry.num_negative += 1;
            }
            if let Some(latency) = result.latency() {
                all.push(latency);
                if is_negative {
                    negative.push(latency);
                } else {
                    positive.push(latency);
                }
            }
        }

        entry.latency = LatencyStats::from_samples(&all);
        entry.latency_negative = LatencyStats::from_samples(&negative);
        entry.latency_positive = LatencyStats::from_samples(&positive);
        entry
    }

    /// Flatten into report rows, values rounded to five decimals
    pub fn rows(&self) -> Vec<StatisticsRow> {
        let mut rows = vec![
            self.row("num_answered", self.num_answered.to_string()),
            self.row("num_unanswered", self.num_unanswered.to_string()),
            self.row("num_negative_resps", self.num_negative.to_string()),
        ];
        for (postfix, stats) in [
            ("", &self.latency),
            ("_nr", &self.latency_negative),
            ("_pr", &self.latency_positive),
        ] {
            rows.push(self.row(&format!("answertime_min{}", postfix), fmt_stat(stats.map(|s| s.min))));
            rows.push(self.row(&format!("answertime_max{}", postfix), fmt_stat(stats.map(|s| s.max))));
            rows.push(self.row(&format!("answertime_avg{}", postfix), fmt_stat(stats.map(|s| s.avg))));
        }
        rows
    }

    fn row(&self, metric: &str, value: String) -> StatisticsRow {
        StatisticsRow {
            label: self.label.clone(),
            metric: metric.to_string(),
            value,
        }
    }
}

fn fmt_stat(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{}", (v * 1e5).round() / 1e5),
        None => "-".to_string(),
    }
}

impl fmt::Display for StatisticsEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} answered, {} unanswered, {} negative",
            self.label, self.num_answered, self.num_unanswered, self.num_negative
        )
    }
}

/// Statistics for all results followed by one entry per state
///
/// `states` lists the executed states in the order they should be reported.
pub fn compute_statistics<S, P>(
    results: &[ScanResult<S>],
    states: &[S],
    policy: &P,
) -> Vec<StatisticsEntry>
where
    S: PartialEq + fmt::Display,
    P: NegativeResponsePolicy + ?Sized,
{
    let mut entries = vec![StatisticsEntry::compute("all".to_string(), results.iter(), policy)];
    for state in states {
        entries.push(StatisticsEntry::compute(
            state.to_string(),
            results.iter().filter(|r| &r.state == state),
            policy,
        ));
    }
    entries
}
