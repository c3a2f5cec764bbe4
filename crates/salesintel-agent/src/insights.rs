//! Insight Synthesizer.
//!
//! Callers supply already-aggregated metrics as a [`MetricSnapshot`]. The
//! synthesizer renders them into a context block, asks the oracle for a JSON
//! narrative and coerces whatever comes back into an [`Insight`]. Missing or
//! malformed narrative fields fall back to fixed defaults; the numbers in
//! `key_metrics` always come from the snapshot.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use salesintel_core::traits::{CompletionRequest, TextGenerator};
use salesintel_core::types::ChatTurn;
use salesintel_core::{Error, Result};
use salesintel_oracle::parse_json_object;
use salesintel_vector::VectorStore;

const MAX_TOKENS: u32 = 2000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightKind {
    WeeklySales,
    CampaignPerformance,
    RevenueForecast,
    LeadAnalysis,
}

/// Default for a narrative field the oracle may omit.
#[derive(Debug, Clone, Copy)]
enum Fallback {
    Text(&'static str),
    List,
    Zero,
}

impl Fallback {
    fn value(self) -> Value {
        match self {
            Fallback::Text(s) => Value::from(s),
            Fallback::List => Value::Array(Vec::new()),
            Fallback::Zero => Value::from(0),
        }
    }
}

impl InsightKind {
    pub const ALL: [InsightKind; 4] =
        [InsightKind::WeeklySales, InsightKind::CampaignPerformance, InsightKind::RevenueForecast, InsightKind::LeadAnalysis];

    pub fn as_str(&self) -> &'static str {
        match self {
            InsightKind::WeeklySales => "weekly_sales",
            InsightKind::CampaignPerformance => "campaign_performance",
            InsightKind::RevenueForecast => "revenue_forecast",
            InsightKind::LeadAnalysis => "lead_analysis",
        }
    }

    pub fn default_title(&self) -> &'static str {
        match self {
            InsightKind::WeeklySales => "Weekly Sales Summary",
            InsightKind::CampaignPerformance => "Campaign Performance Summary",
            InsightKind::RevenueForecast => "Quarterly Revenue Forecast",
            InsightKind::LeadAnalysis => "Lead Funnel Analysis",
        }
    }

    fn persona(&self) -> &'static str {
        match self {
            InsightKind::WeeklySales => {
                "You are a senior sales analyst. Analyze the weekly sales data and provide actionable insights. \
                 Focus on trends, opportunities, and recommendations."
            }
            InsightKind::CampaignPerformance => {
                "You are a marketing analytics expert. Analyze campaign performance data and provide strategic \
                 insights for optimization."
            }
            InsightKind::RevenueForecast => {
                "You are a financial analyst specializing in revenue forecasting. Analyze historical trends and \
                 pipeline data to forecast next quarter's revenue."
            }
            InsightKind::LeadAnalysis => {
                "You are a sales operations analyst. Analyze lead data to identify patterns, bottlenecks, and \
                 opportunities for improvement."
            }
        }
    }

    fn requested_fields(&self) -> &'static str {
        match self {
            InsightKind::WeeklySales => {
                "- title: A compelling title for this week's summary\n\
                 - summary: 2-3 paragraph executive summary\n\
                 - highlights: Array of 3-5 key highlights\n\
                 - concerns: Array of any concerns or areas needing attention\n\
                 - recommendations: Array of 3-5 actionable recommendations for next week"
            }
            InsightKind::CampaignPerformance => {
                "- title: Compelling title for this report\n\
                 - summary: Executive summary of campaign performance\n\
                 - top_performers: Analysis of best performing campaigns and why\n\
                 - underperformers: Campaigns that need attention and suggested fixes\n\
                 - recommendations: Strategic recommendations for campaign optimization"
            }
            InsightKind::RevenueForecast => {
                "- title: Report title\n\
                 - summary: Executive summary of the forecast\n\
                 - forecast_low: Conservative revenue estimate for next quarter\n\
                 - forecast_mid: Most likely revenue estimate\n\
                 - forecast_high: Optimistic revenue estimate\n\
                 - confidence_level: Your confidence in this forecast (low/medium/high)\n\
                 - key_assumptions: Assumptions underlying this forecast\n\
                 - risks: Potential risks to the forecast\n\
                 - recommendations: Actions to improve revenue performance"
            }
            InsightKind::LeadAnalysis => {
                "- title: Report title\n\
                 - summary: Key findings summary\n\
                 - funnel_analysis: Analysis of the lead funnel health\n\
                 - source_analysis: Which lead sources are performing best/worst\n\
                 - recommendations: Specific actions to improve lead quality and conversion"
            }
        }
    }

    /// Narrative fields merged into `key_metrics`, with their defaults.
    fn narrative_fields(&self) -> &'static [(&'static str, Fallback)] {
        match self {
            InsightKind::WeeklySales => &[("highlights", Fallback::List), ("concerns", Fallback::List)],
            InsightKind::CampaignPerformance => {
                &[("top_performers", Fallback::Text("")), ("underperformers", Fallback::Text(""))]
            }
            InsightKind::RevenueForecast => &[
                ("forecast_low", Fallback::Zero),
                ("forecast_mid", Fallback::Zero),
                ("forecast_high", Fallback::Zero),
                ("confidence_level", Fallback::Text("medium")),
                ("key_assumptions", Fallback::List),
                ("risks", Fallback::List),
            ],
            InsightKind::LeadAnalysis => {
                &[("funnel_analysis", Fallback::Text("")), ("source_analysis", Fallback::Text(""))]
            }
        }
    }

    fn temperature(&self) -> f32 {
        match self {
            InsightKind::RevenueForecast => 0.4,
            _ => 0.5,
        }
    }

    /// Search text used to pull related notes from the vector store.
    fn context_query(&self) -> &'static str {
        match self {
            InsightKind::WeeklySales => "deals closed lost this week sales notes",
            InsightKind::CampaignPerformance => "campaign performance content results",
            InsightKind::RevenueForecast => "pipeline deals forecast revenue risk",
            InsightKind::LeadAnalysis => "lead interest qualification notes",
        }
    }
}

impl fmt::Display for InsightKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InsightKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        InsightKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s.trim())
            .ok_or_else(|| Error::NotFound(format!("unknown insight type: {s}")))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum MetricValue {
    Count(i64),
    Currency(f64),
    Percent(f64),
    Number(f64),
    Text(String),
}

impl MetricValue {
    fn to_json(&self) -> Value {
        match self {
            MetricValue::Count(n) => Value::from(*n),
            MetricValue::Currency(x) | MetricValue::Percent(x) | MetricValue::Number(x) => Value::from(*x),
            MetricValue::Text(s) => Value::from(s.as_str()),
        }
    }
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricValue::Count(n) => write!(f, "{n}"),
            MetricValue::Currency(x) => f.write_str(&format_currency(*x)),
            MetricValue::Percent(x) => write!(f, "{x:.1}%"),
            MetricValue::Number(x) => write!(f, "{x:.1}"),
            MetricValue::Text(s) => f.write_str(s),
        }
    }
}

/// `$1,234,567.89`
pub fn format_currency(amount: f64) -> String {
    let cents = (amount.abs() * 100.0).round() as u64;
    let digits = (cents / 100).to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    let sign = if amount < 0.0 && cents > 0 { "-" } else { "" };
    format!("{sign}${grouped}.{:02}", cents % 100)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    pub key: String,
    pub label: String,
    pub value: MetricValue,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricSection {
    pub title: String,
    pub lines: Vec<String>,
}

/// Aggregated numbers produced by the caller for one insight request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricSnapshot {
    pub heading: String,
    #[serde(default)]
    pub metrics: Vec<Metric>,
    #[serde(default)]
    pub sections: Vec<MetricSection>,
    /// Extra structured values copied into `key_metrics` verbatim.
    #[serde(default)]
    pub extra: Map<String, Value>,
}

impl MetricSnapshot {
    pub fn new(heading: impl Into<String>) -> Self {
        Self { heading: heading.into(), ..Self::default() }
    }

    pub fn metric(mut self, key: &str, label: &str, value: MetricValue) -> Self {
        self.metrics.push(Metric { key: key.to_string(), label: label.to_string(), value });
        self
    }

    pub fn section(mut self, title: &str, lines: Vec<String>) -> Self {
        self.sections.push(MetricSection { title: title.to_string(), lines });
        self
    }

    /// Numeric context block placed in the prompt.
    pub fn render(&self) -> String {
        let mut out = format!("{}:\n", self.heading);
        for m in &self.metrics {
            out.push_str(&format!("- {}: {}\n", m.label, m.value));
        }
        for s in &self.sections {
            out.push_str(&format!("\n{}:\n", s.title));
            for line in &s.lines {
                out.push_str(&format!("- {line}\n"));
            }
        }
        out
    }

    fn key_metrics(&self) -> Map<String, Value> {
        let mut map: Map<String, Value> = self.metrics.iter().map(|m| (m.key.clone(), m.value.to_json())).collect();
        map.extend(self.extra.clone());
        map
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Insight {
    pub insight_type: InsightKind,
    pub title: String,
    pub summary: String,
    pub key_metrics: Map<String, Value>,
    pub recommendations: Vec<String>,
    pub generated_at: DateTime<Utc>,
}

/// Oracle reply as received: every field optional, any JSON type.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawInsight {
    #[serde(default)]
    pub title: Option<Value>,
    #[serde(default)]
    pub summary: Option<Value>,
    #[serde(default)]
    pub recommendations: Option<Value>,
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

fn non_blank_text(value: Option<Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.trim().is_empty() => Some(s),
        Value::String(_) | Value::Null => None,
        other => Some(other.to_string()),
    }
}

fn string_list(value: Option<Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .into_iter()
            .filter_map(|v| match v {
                Value::String(s) => Some(s),
                Value::Null => None,
                other => Some(other.to_string()),
            })
            .collect(),
        Some(Value::String(s)) if !s.trim().is_empty() => vec![s],
        _ => Vec::new(),
    }
}

impl RawInsight {
    /// Lenient parse: anything that is not a JSON object yields all defaults.
    pub fn parse(text: &str) -> Option<Self> {
        let map = parse_json_object(text).ok()?;
        serde_json::from_value(Value::Object(map)).ok()
    }

    /// The single defaulting step for every insight shape.
    pub fn coerce(mut self, kind: InsightKind, snapshot: &MetricSnapshot) -> Insight {
        let mut key_metrics = snapshot.key_metrics();
        for (field, fallback) in kind.narrative_fields() {
            let value = match self.rest.remove(*field) {
                Some(Value::Null) | None => fallback.value(),
                Some(v) => v,
            };
            key_metrics.insert(field.to_string(), value);
        }
        Insight {
            insight_type: kind,
            title: non_blank_text(self.title).unwrap_or_else(|| kind.default_title().to_string()),
            summary: non_blank_text(self.summary).unwrap_or_default(),
            key_metrics,
            recommendations: string_list(self.recommendations),
            generated_at: Utc::now(),
        }
    }
}

pub struct InsightSynthesizer {
    oracle: Arc<dyn TextGenerator>,
    notes: Option<(Arc<VectorStore>, usize)>,
}

impl InsightSynthesizer {
    pub fn new(oracle: Arc<dyn TextGenerator>) -> Self {
        Self { oracle, notes: None }
    }

    /// Append related notes from `store`, within `token_budget`, to each prompt.
    pub fn with_notes(mut self, store: Arc<VectorStore>, token_budget: usize) -> Self {
        self.notes = Some((store, token_budget));
        self
    }

    pub async fn build_request(&self, kind: InsightKind, snapshot: &MetricSnapshot) -> Result<CompletionRequest> {
        let mut context = snapshot.render();
        if let Some((store, budget)) = &self.notes {
            let notes = store.assemble_context(kind.context_query(), None, *budget).await?;
            if !notes.is_empty() {
                context.push_str(&format!("\nRelated notes:\n{notes}\n"));
            }
        }
        let user = format!("{context}\nProvide a JSON response with:\n{}", kind.requested_fields());
        Ok(CompletionRequest::new(vec![ChatTurn::system(kind.persona()), ChatTurn::user(user)], kind.temperature(), MAX_TOKENS)
            .json())
    }

    /// Oracle transport failures propagate; unusable JSON yields the defaults.
    pub async fn generate(&self, kind: InsightKind, snapshot: &MetricSnapshot) -> Result<Insight> {
        let request = self.build_request(kind, snapshot).await?;
        let text = self.oracle.complete(request).await?;
        let raw = RawInsight::parse(&text).unwrap_or_else(|| {
            tracing::warn!(target: "agent", kind = kind.as_str(), "insight reply was not a JSON object, using defaults");
            RawInsight::default()
        });
        Ok(raw.coerce(kind, snapshot))
    }
}
