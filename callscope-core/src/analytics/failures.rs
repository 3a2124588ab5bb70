//! Failure pattern analysis.
//!
//! Free-text "what went wrong" items from adherence reviews are parsed,
//! categorized into a fixed taxonomy, and tallied overall, per model, and per
//! day. Critical-failure summaries are counted separately from the items.

use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::OnceLock;

use super::stats::round2;
use super::{group_by_first_seen, percentage, top_by_frequency};
use crate::types::{CallRecord, FreeText, ModelCategory};

/// Number of recurring items and recommendations reported.
pub const TOP_RECURRING: usize = 10;

fn section_marker() -> &'static Regex {
    static MARKER: OnceLock<Regex> = OnceLock::new();
    MARKER.get_or_init(|| {
        Regex::new(r"(?i)(critical failure:|rule:|issue:|problem:)").expect("marker pattern is valid")
    })
}

/// Split a review text field into individual items.
///
/// Lists are taken as-is. A raw string holding a JSON string array is
/// decoded; anything else is split on labeled-section markers (`Rule:`,
/// `CRITICAL FAILURE:`, `Issue:`, `Problem:`), each marker staying with its
/// segment. Text with no marker becomes a single item. Blank items are dropped.
pub fn parse_free_text(text: &FreeText) -> Vec<String> {
    let items: Vec<String> = match text {
        FreeText::List(items) => items.iter().map(|s| s.trim().to_string()).collect(),
        FreeText::Raw(raw) => match serde_json::from_str::<Vec<String>>(raw) {
            Ok(items) => items.into_iter().map(|s| s.trim().to_string()).collect(),
            Err(_) => split_labeled_sections(raw),
        },
    };
    items.into_iter().filter(|s| !s.is_empty()).collect()
}

fn split_labeled_sections(raw: &str) -> Vec<String> {
    let starts: Vec<usize> = section_marker().find_iter(raw).map(|m| m.start()).collect();
    if starts.is_empty() {
        return vec![raw.trim().to_string()];
    }

    let mut items = Vec::with_capacity(starts.len() + 1);
    // Unlabeled lead-in before the first marker
    items.push(raw[..starts[0]].trim().to_string());
    for (i, &start) in starts.iter().enumerate() {
        let end = starts.get(i + 1).copied().unwrap_or(raw.len());
        items.push(raw[start..end].trim().to_string());
    }
    items
}

/// Failure taxonomy, in reporting order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureCategory {
    Hallucination,
    Transcriber,
    Rules,
    Protocol,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
        }
    }
}

impl FailureCategory {
    pub const ALL: [FailureCategory; 5] = [
        FailureCategory::Hallucination,
        FailureCategory::Transcriber,
        FailureCategory::Rules,
        FailureCategory::Protocol,
        FailureCategory::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FailureCategory::Hallucination => "hallucination",
            FailureCategory::Transcriber => "transcriber",
            FailureCategory::Rules => "rules",
            FailureCategory::Protocol => "protocol",
            FailureCategory::Other => "other",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            FailureCategory::Hallucination => Severity::Critical,
            FailureCategory::Rules | FailureCategory::Protocol => Severity::High,
            FailureCategory::Transcriber => Severity::Medium,
            FailureCategory::Other => Severity::Low,
        }
    }

    fn stems(&self) -> &'static [&'static str] {
        match self {
            FailureCategory::Hallucination => &["hallucin", "fabricat", "made up", "false information"],
            FailureCategory::Transcriber => &[
                "transcrib",
                "transcript",
                "audio",
                "misheard",
                "speech recognition",
            ],
            FailureCategory::Rules => &["rule", "guideline", "policy", "violat"],
            FailureCategory::Protocol => &["protocol", "prompt", "procedure"],
            FailureCategory::Other => &[],
        }
    }

    /// Terms that only count as a whole word ("script" but not "description").
    fn words(&self) -> &'static [&'static str] {
        match self {
            FailureCategory::Protocol => &["script", "scripts", "scripted"],
            _ => &[],
        }
    }

    fn matches(&self, lower: &str) -> bool {
        self.stems().iter().any(|stem| lower.contains(stem))
            || lower
                .split(|c: char| !c.is_alphanumeric())
                .any(|word| self.words().contains(&word))
    }
}

/// Categorize one failure item by case-insensitive stem match.
///
/// Categories are tried in taxonomy order; the first match wins.
pub fn categorize(item: &str) -> FailureCategory {
    let lower = item.to_lowercase();
    FailureCategory::ALL
        .into_iter()
        .find(|category| category.matches(&lower))
        .unwrap_or(FailureCategory::Other)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryCount {
    pub category: FailureCategory,
    pub count: usize,
    /// Share of categorized items (0-100)
    pub percentage: f64,
    pub severity: Severity,
}

/// Item counts per category.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryCounts {
    pub hallucination: usize,
    pub transcriber: usize,
    pub rules: usize,
    pub protocol: usize,
    pub other: usize,
}

impl CategoryCounts {
    fn add(&mut self, category: FailureCategory) {
        match category {
            FailureCategory::Hallucination => self.hallucination += 1,
            FailureCategory::Transcriber => self.transcriber += 1,
            FailureCategory::Rules => self.rules += 1,
            FailureCategory::Protocol => self.protocol += 1,
            FailureCategory::Other => self.other += 1,
        }
    }

    pub fn get(&self, category: FailureCategory) -> usize {
        match category {
            FailureCategory::Hallucination => self.hallucination,
            FailureCategory::Transcriber => self.transcriber,
            FailureCategory::Rules => self.rules,
            FailureCategory::Protocol => self.protocol,
            FailureCategory::Other => self.other,
        }
    }

    pub fn total(&self) -> usize {
        FailureCategory::ALL.iter().map(|c| self.get(*c)).sum()
    }

    fn breakdown(&self) -> Vec<CategoryCount> {
        let total = self.total();
        FailureCategory::ALL
            .into_iter()
            .map(|category| CategoryCount {
                category,
                count: self.get(category),
                percentage: round2(percentage(self.get(category), total)),
                severity: category.severity(),
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelFailureBreakdown {
    pub model: String,
    pub total_calls: usize,
    /// Calls with a critical-failure summary
    pub critical_failures: usize,
    pub failure_rate: f64,
    pub total_items: usize,
    pub categories: Vec<CategoryCount>,
}

/// Failure activity on one calendar day (UTC).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureTrendPoint {
    pub date: String,
    pub categories: CategoryCounts,
    pub critical_failures: usize,
    /// Running total of critical failures up to and including this date
    pub cumulative_critical_failures: usize,
}

/// A normalized text and how often it occurred.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecurringItem {
    pub text: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureReport {
    pub category: ModelCategory,
    pub total_calls: usize,
    pub calls_with_critical_failures: usize,
    pub total_items: usize,
    pub categories: Vec<CategoryCount>,
    pub by_model: Vec<ModelFailureBreakdown>,
    /// Ascending by date
    pub trends: Vec<FailureTrendPoint>,
    pub top_items: Vec<RecurringItem>,
    pub top_recommendations: Vec<RecurringItem>,
}

fn what_went_wrong(call: &CallRecord) -> Vec<String> {
    call.adherence
        .as_ref()
        .and_then(|a| a.what_went_wrong.as_ref())
        .map(parse_free_text)
        .unwrap_or_default()
}

fn recommendations(call: &CallRecord) -> Vec<String> {
    call.adherence
        .as_ref()
        .and_then(|a| a.recommendations.as_ref())
        .map(parse_free_text)
        .unwrap_or_default()
}

/// Lower-case and collapse whitespace so near-duplicates count together.
fn normalize(item: &str) -> String {
    item.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim_end_matches('.')
        .to_lowercase()
}

fn recurring(texts: Vec<String>) -> Vec<RecurringItem> {
    top_by_frequency(
        texts.iter().map(|t| normalize(t)).filter(|t| !t.is_empty()),
        TOP_RECURRING,
    )
    .into_iter()
    .map(|(text, count)| RecurringItem { text, count })
    .collect()
}

/// Analyze failure patterns across `calls`.
pub fn analyze_failure_patterns(calls: &[CallRecord], category: ModelCategory) -> FailureReport {
    let mut totals = CategoryCounts::default();
    let mut by_date: BTreeMap<String, (CategoryCounts, usize)> = BTreeMap::new();
    let mut all_items = Vec::new();
    let mut all_recommendations = Vec::new();

    for call in calls {
        let items = what_went_wrong(call);
        let critical = call.critical_failure().is_some();
        if items.is_empty() && !critical {
            all_recommendations.extend(recommendations(call));
            continue;
        }

        let day = by_date
            .entry(call.date().format("%Y-%m-%d").to_string())
            .or_default();
        for item in &items {
            let category = categorize(item);
            totals.add(category);
            day.0.add(category);
        }
        if critical {
            day.1 += 1;
        }
        all_items.extend(items);
        all_recommendations.extend(recommendations(call));
    }

    let mut cumulative = 0;
    let trends = by_date
        .into_iter()
        .map(|(date, (categories, critical))| {
            cumulative += critical;
            FailureTrendPoint {
                date,
                categories,
                critical_failures: critical,
                cumulative_critical_failures: cumulative,
            }
        })
        .collect();

    let by_model = group_by_first_seen(calls, |c| c.model_id(category))
        .into_iter()
        .map(|(model, group)| {
            let mut counts = CategoryCounts::default();
            for call in &group {
                for item in what_went_wrong(call) {
                    counts.add(categorize(&item));
                }
            }
            let critical = group.iter().filter(|c| c.critical_failure().is_some()).count();
            ModelFailureBreakdown {
                model,
                total_calls: group.len(),
                critical_failures: critical,
                failure_rate: round2(percentage(critical, group.len())),
                total_items: counts.total(),
                categories: counts.breakdown(),
            }
        })
        .collect();

    let calls_with_critical_failures = calls
        .iter()
        .filter(|c| c.critical_failure().is_some())
        .count();

    tracing::debug!(
        calls = calls.len(),
        items = totals.total(),
        critical = calls_with_critical_failures,
        "Computed failure patterns"
    );

    FailureReport {
        category,
        total_calls: calls.len(),
        calls_with_critical_failures,
        total_items: totals.total(),
        categories: totals.breakdown(),
        by_model,
        trends,
        top_items: recurring(all_items),
        top_recommendations: recurring(all_recommendations),
    }
}
