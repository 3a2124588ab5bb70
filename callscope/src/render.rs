//! Plain-text rendering of analytics results.

use callscope_core::analytics::ModelComparison;
use callscope_core::format::{fit, format_currency, format_duration, format_percent};
use callscope_core::AnalyticsReport;

const MODEL_WIDTH: usize = 26;

/// Number of rows shown in ranked lists.
const TOP_ROWS: usize = 5;

pub fn print_report(report: &AnalyticsReport) {
    let request = &report.request;
    println!(
        "Call analytics {} to {} ({} models)",
        request.start_date.format("%Y-%m-%d"),
        request.end_date.format("%Y-%m-%d"),
        request.category.as_str()
    );
    if let Some(client) = &request.client_id {
        println!("Client: {}", client);
    }
    if let Some(model) = &request.model {
        println!("Model: {}", model);
    }

    print_models(report);
    print_trends(report);
    print_quality(report);
    print_failures(report);
    print_keywords(report);
    print_technical(report);
}

fn section(title: &str) {
    println!();
    println!("{}", title);
    println!("{}", "-".repeat(title.len()));
}

fn print_models(report: &AnalyticsReport) {
    let metrics = &report.model_performance;
    section("Model performance");

    if metrics.models_used.is_empty() {
        println!("No calls in range.");
        return;
    }

    println!(
        "{} {:>6} {:>8} {:>9} {:>8} {:>9} {:>9} {:>9} {:>8}",
        fit("Model", MODEL_WIDTH),
        "Calls",
        "Usage",
        "Accuracy",
        "Quality",
        "Adherence",
        "Failures",
        "Cost/call",
        "Avg time"
    );
    for model in &metrics.models_used {
        println!(
            "{} {:>6} {:>8} {:>9.2} {:>8.2} {:>9.2} {:>9} {:>9} {:>8}",
            fit(&model.model, MODEL_WIDTH),
            model.call_count,
            format_percent(model.usage_percentage),
            model.average_accuracy,
            model.average_quality_score,
            model.average_adherence_score,
            format_percent(model.failure_rate),
            format_currency(model.cost_efficiency),
            format_duration(model.response_time as f64)
        );
    }

    println!();
    println!(
        "Total calls: {}   Average accuracy: {:.2}",
        metrics.total_calls, metrics.average_accuracy
    );
    println!(
        "Best: {}   Worst: {}",
        metrics.best_performing_model, metrics.worst_performing_model
    );
}

fn print_trends(report: &AnalyticsReport) {
    let trends = &report.accuracy_trends;
    section(&format!("Accuracy trends ({})", trends.granularity.as_str()));

    if trends.points.is_empty() {
        println!("No data.");
        return;
    }

    for point in &trends.points {
        println!(
            "{:<10} {} {:>8.2} (avg {:.2}, {} calls)",
            point.period,
            fit(&point.model, MODEL_WIDTH),
            point.accuracy_score,
            point.moving_average,
            point.call_count
        );
    }
}

fn print_quality(report: &AnalyticsReport) {
    let quality = &report.conversation_quality;
    section("Conversation quality");

    println!(
        "Evaluations: {}   Average score: {:.2}   Sentiment: {} positive, {} neutral, {} negative",
        quality.total_evaluations,
        quality.average_overall_score,
        format_percent(quality.sentiment.positive),
        format_percent(quality.sentiment.neutral),
        format_percent(quality.sentiment.negative)
    );

    for ranking in &quality.thresholds.rankings {
        println!(
            "  #{} {} {:.2}",
            ranking.rank,
            fit(&ranking.model, MODEL_WIDTH),
            ranking.average_score
        );
    }

    for model in quality.models.iter().filter(|m| m.evaluation_count > 0) {
        if !model.strengths.is_empty() {
            println!("  {} strengths: {}", model.model, model.strengths.join(", "));
        }
        if !model.improvements.is_empty() {
            println!(
                "  {} needs work: {}",
                model.model,
                model.improvements.join(", ")
            );
        }
    }
}

fn print_failures(report: &AnalyticsReport) {
    let failures = &report.failure_patterns;
    section("Failure patterns");

    println!(
        "Calls with critical failures: {} of {}   Reported issues: {}",
        failures.calls_with_critical_failures, failures.total_calls, failures.total_items
    );
    for category in failures.categories.iter().filter(|c| c.count > 0) {
        println!(
            "  {:<14} {:>4} {:>8}  {}",
            category.category.as_str(),
            category.count,
            format_percent(category.percentage),
            category.severity.as_str()
        );
    }

    if !failures.top_items.is_empty() {
        println!("Most frequent issues:");
        for item in failures.top_items.iter().take(TOP_ROWS) {
            println!("  {:>3}x {}", item.count, item.text);
        }
    }
    if !failures.top_recommendations.is_empty() {
        println!("Most frequent recommendations:");
        for item in failures.top_recommendations.iter().take(TOP_ROWS) {
            println!("  {:>3}x {}", item.count, item.text);
        }
    }
}

fn print_keywords(report: &AnalyticsReport) {
    let keywords = &report.keywords;
    section("Keywords");

    if keywords.top_keywords.is_empty() {
        println!("No failure text.");
        return;
    }

    let line: Vec<String> = keywords
        .top_keywords
        .iter()
        .take(TOP_ROWS * 2)
        .map(|k| format!("{} ({})", k.keyword, k.count))
        .collect();
    println!("{}", line.join(", "));
}

fn print_technical(report: &AnalyticsReport) {
    let technical = &report.technical;
    section("Cost and duration");

    println!(
        "Total cost: {}   Average cost: {}   Average duration: {}",
        format_currency(technical.total_cost),
        format_currency(technical.average_cost),
        format_duration(technical.average_duration)
    );
    println!(
        "Duration p50/p90/p99: {} / {} / {}",
        format_duration(technical.duration_percentiles.p50),
        format_duration(technical.duration_percentiles.p90),
        format_duration(technical.duration_percentiles.p99)
    );
    for model in &technical.by_model {
        println!(
            "  {} {:>9} {:>9}/min",
            fit(&model.model, MODEL_WIDTH),
            format_currency(model.total_cost),
            format_currency(model.cost_per_minute)
        );
    }
}

pub fn print_comparison(comparison: &ModelComparison) {
    println!(
        "{} ({} calls) vs {} ({} calls)",
        comparison.model_a, comparison.sample_size_a, comparison.model_b, comparison.sample_size_b
    );

    for (label, result) in [
        ("Quality", &comparison.quality),
        ("Adherence", &comparison.adherence),
    ] {
        println!(
            "  {:<10} t = {:.3}  df = {:.1}  p = {:.4}  d = {:.3}  {}",
            label,
            result.t_statistic,
            result.degrees_of_freedom,
            result.p_value,
            result.effect_size,
            if result.is_significant {
                "significant"
            } else {
                "not significant"
            }
        );
    }
}
