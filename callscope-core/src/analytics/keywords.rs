//! Keyword frequency over failure text.
//!
//! Each call contributes the tokens of its "what went wrong" items and its
//! critical-failure summary, counted at most once per call.

use regex::Regex;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::OnceLock;

use super::failures::parse_free_text;
use super::stats::round2;
use super::{percentage, top_by_frequency};
use crate::types::CallRecord;

pub const DEFAULT_TOP_KEYWORDS: usize = 20;
pub const DEFAULT_TRENDING_KEYWORDS: usize = 10;

/// Tokens at or below this many characters are dropped.
const MIN_TOKEN_CHARS: usize = 3;

const STOP_WORDS: &[&str] = &[
    "about", "above", "after", "again", "against", "also", "because", "been", "before", "being",
    "below", "between", "both", "could", "does", "doing", "down", "during", "each", "from",
    "further", "have", "having", "here", "into", "itself", "just", "more", "most", "once", "only",
    "other", "over", "same", "should", "some", "such", "than", "that", "their", "them", "then",
    "there", "these", "they", "this", "those", "through", "under", "until", "very", "were",
    "what", "when", "where", "which", "while", "will", "with", "would", "your",
];

fn punctuation() -> &'static Regex {
    static PUNCT: OnceLock<Regex> = OnceLock::new();
    PUNCT.get_or_init(|| Regex::new(r"[^\w\s]").expect("punctuation pattern is valid"))
}

/// Lower-case, strip punctuation, split on whitespace, and drop short tokens
/// and stop words. Duplicates are kept.
pub fn tokenize(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    let stripped = punctuation().replace_all(&lower, "");
    stripped
        .split_whitespace()
        .filter(|token| token.chars().count() > MIN_TOKEN_CHARS)
        .filter(|token| !STOP_WORDS.contains(token))
        .map(str::to_string)
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KeywordFrequency {
    pub keyword: String,
    /// Number of calls mentioning the keyword
    pub count: usize,
    /// Share of contributing calls (0-100)
    pub percentage: f64,
}

/// Trend direction for a keyword. Only `Stable` is produced: trending is
/// frequency-ranked with no time comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum KeywordTrend {
    Stable,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendingKeyword {
    pub keyword: String,
    pub count: usize,
    pub trend: KeywordTrend,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KeywordAnalysis {
    /// Calls that produced at least one keyword
    pub contributing_calls: usize,
    pub top_keywords: Vec<KeywordFrequency>,
    pub trending_keywords: Vec<TrendingKeyword>,
}

fn call_keywords(call: &CallRecord) -> HashSet<String> {
    let mut keywords = HashSet::new();
    if let Some(review) = &call.adherence {
        if let Some(wrong) = &review.what_went_wrong {
            for item in parse_free_text(wrong) {
                keywords.extend(tokenize(&item));
            }
        }
        if let Some(summary) = &review.critical_failures_summary {
            keywords.extend(tokenize(summary));
        }
    }
    keywords
}

/// Rank keywords by how many calls mention them; ties sort alphabetically.
pub fn analyze_keywords(calls: &[CallRecord], top_n: usize, trending_n: usize) -> KeywordAnalysis {
    let per_call: Vec<HashSet<String>> = calls
        .iter()
        .map(call_keywords)
        .filter(|keywords| !keywords.is_empty())
        .collect();
    let contributing_calls = per_call.len();

    let ranked = top_by_frequency(per_call.into_iter().flatten(), top_n.max(trending_n));

    let top_keywords = ranked
        .iter()
        .take(top_n)
        .map(|(keyword, count)| KeywordFrequency {
            keyword: keyword.clone(),
            count: *count,
            percentage: round2(percentage(*count, contributing_calls)),
        })
        .collect();

    let trending_keywords = ranked
        .into_iter()
        .take(trending_n)
        .map(|(keyword, count)| TrendingKeyword {
            keyword,
            count,
            trend: KeywordTrend::Stable,
        })
        .collect();

    KeywordAnalysis {
        contributing_calls,
        top_keywords,
        trending_keywords,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AdherenceReview, FreeText};
    use chrono::Utc;

    fn reviewed(id: &str, wrong: &[&str], critical: Option<&str>) -> CallRecord {
        let mut call = CallRecord::new(id, Utc::now());
        call.adherence = Some(AdherenceReview {
            what_went_wrong: Some(FreeText::List(wrong.iter().map(|s| s.to_string()).collect())),
            critical_failures_summary: critical.map(str::to_string),
            ..Default::default()
        });
        call
    }

    #[test]
    fn test_tokenize() {
        assert_eq!(
            tokenize("The agent QUOTED a wrong price, twice!"),
            vec!["agent", "quoted", "wrong", "price", "twice"]
        );
        // Short tokens and stop words
        assert!(tokenize("it was not that bad").is_empty());
        assert_eq!(tokenize("didn't confirm"), vec!["didnt", "confirm"]);
    }

    #[test]
    fn test_dedupes_per_call() {
        let calls = vec![
            reviewed("c1", &["price price price", "wrong price"], Some("price again")),
            reviewed("c2", &["price quoted"], None),
        ];
        let analysis = analyze_keywords(&calls, 20, 10);
        let price = analysis.top_keywords.iter().find(|k| k.keyword == "price").unwrap();
        assert_eq!(price.count, 2);
        assert_eq!(price.percentage, 100.0);
    }

    #[test]
    fn test_ranking_and_ties() {
        let calls = vec![
            reviewed("c1", &["greeting missed"], None),
            reviewed("c2", &["greeting skipped"], None),
            reviewed("c3", &[], None),
        ];
        let analysis = analyze_keywords(&calls, 20, 10);
        assert_eq!(analysis.contributing_calls, 2);

        let words: Vec<&str> = analysis.top_keywords.iter().map(|k| k.keyword.as_str()).collect();
        assert_eq!(words, vec!["greeting", "missed", "skipped"]);
        assert_eq!(analysis.top_keywords[1].percentage, 50.0);
    }

    #[test]
    fn test_limits_and_stable_trend() {
        let items: Vec<String> = (0..30).map(|i| format!("keyword{:02}", i)).collect();
        let refs: Vec<&str> = items.iter().map(String::as_str).collect();
        let calls = vec![reviewed("c1", &refs, None)];

        let analysis = analyze_keywords(&calls, 20, 10);
        assert_eq!(analysis.top_keywords.len(), 20);
        assert_eq!(analysis.trending_keywords.len(), 10);
        assert!(analysis
            .trending_keywords
            .iter()
            .all(|k| k.trend == KeywordTrend::Stable));
        assert_eq!(analysis.trending_keywords[0].keyword, "keyword00");
    }

    #[test]
    fn test_no_reviews() {
        let calls = vec![CallRecord::new("c1", Utc::now())];
        let analysis = analyze_keywords(&calls, 20, 10);
        assert_eq!(analysis.contributing_calls, 0);
        assert!(analysis.top_keywords.is_empty());
        assert!(analysis.trending_keywords.is_empty());
    }
}
