//! Structured enumerator reports
//!
//! Rendering (tables, JSON, CSV) is left to the caller; everything here is
//! plain serializable data.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::catalog::ServiceCatalog;
use crate::enumerator::{Enumerator, NegativeResponseDetail, ServiceEnumerator};
use crate::packet::Packet;
use crate::state::StateModel;
use crate::stats::StatisticsRow;

/// Label of positive responses in result tables
#[derive(Clone)]
pub enum PositiveLabel {
    /// Same text for every positive response
    Text(String),
    /// Label computed from the response
    Custom(Arc<dyn Fn(&Packet) -> String + Send + Sync>),
}

impl PositiveLabel {
    pub fn custom(f: impl Fn(&Packet) -> String + Send + Sync + 'static) -> Self {
        Self::Custom(Arc::new(f))
    }

    pub fn render(&self, response: &Packet) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Custom(f) => f(response),
        }
    }
}

impl Default for PositiveLabel {
    fn default() -> Self {
        Self::Text("PR: PositiveResponse".to_string())
    }
}

impl fmt::Debug for PositiveLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

impl From<&str> for PositiveLabel {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

/// One stored exchange as shown in a report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultRow {
    pub state: String,
    pub request: String,
    pub response: Option<String>,
    pub label: String,
    /// Response time in seconds
    pub latency: Option<f64>,
}

/// Blacklisted code with its description
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlacklistedCode {
    pub code: u8,
    pub description: String,
}

/// Positive response and the states it was seen in
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SupportedRow {
    pub response: String,
    pub states: Vec<String>,
}

/// Everything known about one enumerator
#[derive(Debug, Clone, Serialize)]
pub struct EnumeratorReport {
    pub name: String,
    pub completed: bool,
    pub terminated: bool,
    pub num_requests: usize,
    pub num_answered: usize,
    /// Results exclude blacklisted negative responses and timeouts
    pub filtered: bool,
    pub statistics: Vec<StatisticsRow>,
    pub negative_responses: Vec<NegativeResponseDetail>,
    pub blacklist: Vec<BlacklistedCode>,
    pub results: Vec<ResultRow>,
    pub supported_responses: Vec<SupportedRow>,
    pub edges: Vec<String>,
}

impl EnumeratorReport {
    /// Build a report; a filtered report recomputes the blacklist first
    pub fn build<C, M>(
        enumerator: &mut ServiceEnumerator<C, M>,
        filtered: bool,
        positive: &PositiveLabel,
    ) -> Self
    where
        C: ServiceCatalog,
        M: StateModel,
    {
        if filtered {
            enumerator.prepare_blacklist();
        }
        let enumerator = &*enumerator;

        let rows = if filtered {
            enumerator.filtered_results()
        } else {
            enumerator.results().iter().collect()
        };
        let results = rows
            .into_iter()
            .map(|r| ResultRow {
                state: r.state.to_string(),
                request: r.request.to_hex(),
                response: r.response.as_ref().map(Packet::to_hex),
                label: enumerator.label(r.response.as_ref(), positive),
                latency: r.latency(),
            })
            .collect();

        let statistics = enumerator
            .statistics()
            .iter()
            .flat_map(|entry| entry.rows())
            .collect();

        let catalog = enumerator.catalog();
        let blacklist = enumerator
            .blacklist()
            .codes()
            .iter()
            .map(|&code| BlacklistedCode {
                code,
                description: catalog.description_of(code),
            })
            .collect();

        let supported_responses = enumerator
            .supported_responses()
            .into_iter()
            .map(|s| SupportedRow {
                response: s.response.to_hex(),
                states: s.states.iter().map(ToString::to_string).collect(),
            })
            .collect();

        Self {
            name: enumerator.name().to_string(),
            completed: enumerator.completed(),
            terminated: enumerator.is_terminated(),
            num_requests: enumerator.results().len(),
            num_answered: enumerator.store().with_response().len(),
            filtered,
            statistics,
            negative_responses: enumerator.negative_response_details(),
            blacklist,
            results,
            supported_responses,
            edges: enumerator
                .edges()
                .entries()
                .iter()
                .map(|e| format!("{}: {}", e.edge, e.request))
                .collect(),
        }
    }
}

impl fmt::Display for EnumeratorReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} of {} requests answered",
            self.name, self.num_answered, self.num_requests
        )?;
        if self.completed {
            write!(f, ", completed")?;
        }
        if self.terminated {
            write!(f, ", terminated")?;
        }
        Ok(())
    }
}
