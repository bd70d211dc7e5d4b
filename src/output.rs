use crate::flow::winner;
use crate::models::{CATEGORY_MAX, Category, ComparisonResult, EvaluationResult, EvaluationScore};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt::Write;
use std::str::FromStr;

/// Issues shown per comparison entry before "+N more"
pub const ISSUE_LIMIT: usize = 3;
/// Characters kept from each issue in comparison view
pub const ISSUE_CHARS: usize = 40;
/// Recommendations shown per comparison entry
pub const RECOMMENDATION_LIMIT: usize = 2;

/// Output format options
#[derive(Debug, Clone, Copy, ValueEnum, Serialize, Deserialize)]
pub enum OutputFormat {
    Plain,
    Json,
}

/// Color bucket for a score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreTier {
    Success,
    Warning,
    Destructive,
}

impl ScoreTier {
    /// Score card bucket for a single category
    pub fn category(score: i32) -> Self {
        Self::bucket(score, 8, 6)
    }

    /// Bucket for the 0-100 overall score
    pub fn total(score: i32) -> Self {
        Self::bucket(score, 80, 60)
    }

    /// Bucket for comparison table cells
    pub fn table_cell(score: i32) -> Self {
        Self::bucket(score, 7, 5)
    }

    fn bucket(score: i32, success: i32, warning: i32) -> Self {
        if score >= success {
            ScoreTier::Success
        } else if score >= warning {
            ScoreTier::Warning
        } else {
            ScoreTier::Destructive
        }
    }

    fn name(self) -> &'static str {
        match self {
            ScoreTier::Success => "good",
            ScoreTier::Warning => "fair",
            ScoreTier::Destructive => "weak",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreCard {
    pub category: Category,
    pub label: &'static str,
    pub score: i32,
    pub max_score: i32,
    pub percentage: f64,
    pub tier: ScoreTier,
}

/// One card per category, in display order
pub fn score_cards(scores: &EvaluationScore) -> Vec<ScoreCard> {
    scores
        .iter()
        .map(|(category, score)| ScoreCard {
            category,
            label: category.label(),
            score,
            max_score: CATEGORY_MAX,
            percentage: f64::from(score) / f64::from(CATEGORY_MAX) * 100.0,
            tier: ScoreTier::category(score),
        })
        .collect()
}

/// A named line on the radar chart
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RadarSeries {
    pub key: String,
    pub name: String,
    pub color: Option<String>,
}

/// One axis of the radar chart; `values` lines up with `RadarData::series`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RadarPoint {
    pub subject: &'static str,
    pub full_mark: i32,
    pub values: Vec<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RadarData {
    pub series: Vec<RadarSeries>,
    pub points: Vec<RadarPoint>,
}

impl RadarData {
    fn build(series: Vec<RadarSeries>, scores: &[&EvaluationScore]) -> Self {
        let points = Category::ALL
            .into_iter()
            .map(|category| RadarPoint {
                subject: category.subject(),
                full_mark: CATEGORY_MAX,
                values: scores.iter().map(|s| s.get(category)).collect(),
            })
            .collect();

        Self { series, points }
    }
}

/// Single series keyed `value`
pub fn radar_single(scores: &EvaluationScore) -> RadarData {
    let series = vec![RadarSeries {
        key: "value".to_string(),
        name: "Score".to_string(),
        color: None,
    }];
    RadarData::build(series, &[scores])
}

/// One series per compared prompt, keyed by entry id
pub fn radar_comparison(results: &[ComparisonResult]) -> RadarData {
    let series = results
        .iter()
        .map(|result| RadarSeries {
            key: result.id.to_string(),
            name: result.name.clone(),
            color: Some(result.color.clone()),
        })
        .collect();
    let scores: Vec<&EvaluationScore> = results.iter().map(|r| &r.evaluation.scores).collect();
    RadarData::build(series, &scores)
}

/// Column order of the comparison table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortKey {
    #[default]
    Input,
    /// Highest total first
    Total,
    Name,
    /// Highest score in this category first
    Category(Category),
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "input" => Ok(SortKey::Input),
            "total" => Ok(SortKey::Total),
            "name" => Ok(SortKey::Name),
            other => other
                .parse::<Category>()
                .map(SortKey::Category)
                .map_err(|_| format!("unknown sort key: {} (expected input, total, name or a category)", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableColumn {
    pub id: String,
    pub name: String,
    pub color: String,
    pub total_score: i32,
    pub total_tier: ScoreTier,
    pub is_winner: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableCell {
    pub score: i32,
    pub tier: ScoreTier,
    /// Set only when this cell is the single best score of its row
    pub highlighted: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableRow {
    pub category: Category,
    pub label: &'static str,
    pub cells: Vec<TableCell>,
}

/// Category-by-prompt score grid
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonTable {
    pub columns: Vec<TableColumn>,
    pub rows: Vec<TableRow>,
}

impl ComparisonTable {
    pub fn build(results: &[ComparisonResult], sort: SortKey) -> Self {
        let winner_id = winner(results).map(|w| w.id);
        let ordered = sorted(results, sort);

        let columns = ordered
            .iter()
            .map(|result| TableColumn {
                id: result.id.to_string(),
                name: result.name.clone(),
                color: result.color.clone(),
                total_score: result.total_score(),
                total_tier: ScoreTier::total(result.total_score()),
                is_winner: Some(result.id) == winner_id,
            })
            .collect();

        let rows = Category::ALL
            .into_iter()
            .map(|category| {
                let scores: Vec<i32> = ordered
                    .iter()
                    .map(|r| r.evaluation.scores.get(category))
                    .collect();
                let max = scores.iter().copied().max();
                let unique_max = max.filter(|m| scores.iter().filter(|s| *s == m).count() == 1);

                TableRow {
                    category,
                    label: category.label(),
                    cells: scores
                        .iter()
                        .map(|&score| TableCell {
                            score,
                            tier: ScoreTier::table_cell(score),
                            highlighted: Some(score) == unique_max,
                        })
                        .collect(),
                }
            })
            .collect();

        Self { columns, rows }
    }
}

/// Stable sort of the results by `key`
fn sorted(results: &[ComparisonResult], key: SortKey) -> Vec<&ComparisonResult> {
    let mut ordered: Vec<&ComparisonResult> = results.iter().collect();
    match key {
        SortKey::Input => {}
        SortKey::Total => ordered.sort_by(|a, b| b.total_score().cmp(&a.total_score())),
        SortKey::Name => ordered.sort_by(|a, b| a.name.cmp(&b.name)),
        SortKey::Category(category) => ordered.sort_by(|a, b| {
            b.evaluation
                .scores
                .get(category)
                .cmp(&a.evaluation.scores.get(category))
        }),
    }
    ordered
}

/// The visible head of a list plus how many items were left out
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Truncated {
    pub shown: Vec<String>,
    pub hidden: usize,
}

impl Truncated {
    pub fn overflow_label(&self) -> Option<String> {
        (self.hidden > 0).then(|| format!("+{} more", self.hidden))
    }
}

/// Keep the first `limit` items, cutting each to `max_chars` characters plus "..."
pub fn truncate_list(items: &[String], limit: usize, max_chars: Option<usize>) -> Truncated {
    let shown = items
        .iter()
        .take(limit)
        .map(|item| match max_chars {
            Some(max) if item.chars().count() > max => {
                format!("{}...", item.chars().take(max).collect::<String>())
            }
            _ => item.clone(),
        })
        .collect();

    Truncated {
        shown,
        hidden: items.len().saturating_sub(limit),
    }
}

/// Something that can be rendered or exported
#[derive(Debug, Clone, Copy)]
pub enum Report<'a> {
    Single(&'a EvaluationResult),
    Comparison {
        results: &'a [ComparisonResult],
        sort: SortKey,
    },
}

impl Report<'_> {
    /// File name stem used for exported artifacts
    pub fn artifact_stem(&self) -> &'static str {
        match self {
            Report::Single(_) => "prompt-evaluation",
            Report::Comparison { .. } => "prompt-comparison",
        }
    }
}

/// Print a report in the specified format
pub fn print_report(report: Report<'_>, format: OutputFormat) {
    match render(report, format) {
        Ok(text) => println!("{}", text),
        Err(e) => eprintln!("Error serializing results to JSON: {}", e),
    }
}

pub fn render(report: Report<'_>, format: OutputFormat) -> serde_json::Result<String> {
    match format {
        OutputFormat::Plain => Ok(render_plain(report)),
        OutputFormat::Json => render_json(report),
    }
}

fn render_json(report: Report<'_>) -> serde_json::Result<String> {
    match report {
        Report::Single(result) => serde_json::to_string_pretty(result),
        Report::Comparison { results, .. } => serde_json::to_string_pretty(&serde_json::json!({
            "results": results,
            "winner": winner(results).map(|w| w.id),
        })),
    }
}

/// Human-readable report, ASCII only so it also fits document exports
pub fn render_plain(report: Report<'_>) -> String {
    let mut out = String::new();
    match report {
        Report::Single(result) => write_single(&mut out, result),
        Report::Comparison { results, sort } => write_comparison(&mut out, results, sort),
    }
    out
}

fn heading(out: &mut String, title: &str) {
    let _ = writeln!(out, "{}", title);
    let _ = writeln!(out, "{}", "-".repeat(title.len()));
}

fn bar(score: i32) -> String {
    let filled = score.clamp(0, CATEGORY_MAX) as usize;
    format!(
        "{}{}",
        "#".repeat(filled),
        ".".repeat(CATEGORY_MAX as usize - filled)
    )
}

fn write_single(out: &mut String, result: &EvaluationResult) {
    let _ = writeln!(out, "=== Prompt Evaluation ===");
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "Overall Score: {}/100 ({})",
        result.total_score,
        ScoreTier::total(result.total_score).name()
    );
    let _ = writeln!(out);

    heading(out, "SUMMARY");
    let _ = writeln!(out, "{}", result.summary);
    let _ = writeln!(out);

    heading(out, "SCORE BREAKDOWN");
    for card in score_cards(&result.scores) {
        let _ = writeln!(
            out,
            "{:<26} {:>2}/{:<2} {} {:>3.0}% ({})",
            card.label,
            card.score,
            card.max_score,
            bar(card.score),
            card.percentage,
            card.tier.name()
        );
    }
    let _ = writeln!(out);

    write_list(out, "CRITICAL ISSUES", &result.issues);
    write_list(out, "RECOMMENDATIONS", &result.recommendations);

    if let Some(optimized) = &result.optimized_prompt {
        heading(out, "OPTIMIZED PROMPT");
        let _ = writeln!(out, "{}", optimized);
    }
}

fn write_list(out: &mut String, title: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    heading(out, title);
    for (i, item) in items.iter().enumerate() {
        let _ = writeln!(out, "{:>2}. {}", i + 1, item);
    }
    let _ = writeln!(out);
}

fn write_comparison(out: &mut String, results: &[ComparisonResult], sort: SortKey) {
    let table = ComparisonTable::build(results, sort);

    let _ = writeln!(out, "=== Prompt Comparison ===");
    let _ = writeln!(out);

    heading(out, "COMPARISON RESULTS");
    for column in &table.columns {
        let _ = writeln!(
            out,
            "{} {:<24} {:>3}/100 ({}){}",
            if column.is_winner { "*" } else { " " },
            column.name,
            column.total_score,
            column.total_tier.name(),
            if column.is_winner { "  Winner" } else { "" }
        );
    }
    let _ = writeln!(out);

    heading(out, "SCORE BREAKDOWN COMPARISON");
    let width = table
        .columns
        .iter()
        .map(|c| c.name.chars().count())
        .max()
        .unwrap_or(0)
        .max(5)
        + 2;

    let _ = write!(out, "{:<26}", "Category");
    for column in &table.columns {
        let _ = write!(out, "{:>width$}", column.name, width = width);
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "{}", "-".repeat(26 + width * table.columns.len()));

    for row in &table.rows {
        let _ = write!(out, "{:<26}", row.label);
        for cell in &row.cells {
            let value = if cell.highlighted {
                format!("{}*", cell.score)
            } else {
                format!("{} ", cell.score)
            };
            let _ = write!(out, "{:>width$}", value, width = width);
        }
        let _ = writeln!(out);
    }
    let _ = write!(out, "{:<26}", "Total Score");
    for column in &table.columns {
        let _ = write!(out, "{:>width$}", format!("{} ", column.total_score), width = width);
    }
    let _ = writeln!(out);
    let _ = writeln!(out);

    for result in sorted(results, sort) {
        heading(out, &result.name);
        let _ = writeln!(out, "Summary: {}", result.evaluation.summary);

        let issues = truncate_list(&result.evaluation.issues, ISSUE_LIMIT, Some(ISSUE_CHARS));
        if !issues.shown.is_empty() {
            let mut line = issues.shown.join(" | ");
            if let Some(more) = issues.overflow_label() {
                let _ = write!(line, " | {}", more);
            }
            let _ = writeln!(out, "Issues: {}", line);
        }

        let recommendations =
            truncate_list(&result.evaluation.recommendations, RECOMMENDATION_LIMIT, None);
        if !recommendations.shown.is_empty() {
            let _ = writeln!(out, "Top Recommendations:");
            for recommendation in &recommendations.shown {
                let _ = writeln!(out, "  * {}", recommendation);
            }
        }
        let _ = writeln!(out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Assessment, PromptEntry};
    use uuid::Uuid;

    fn comparison(name: &str, values: [i32; 10], issues: usize) -> ComparisonResult {
        let entry = PromptEntry {
            id: Uuid::new_v4(),
            name: name.to_string(),
            value: "text".to_string(),
            color: "hsl(280, 80%, 60%)".to_string(),
        };
        let assessment = Assessment {
            scores: EvaluationScore::from_array(values),
            issues: (1..=issues).map(|i| format!("Issue number {}", i)).collect(),
            recommendations: vec![
                "First recommendation".to_string(),
                "Second recommendation".to_string(),
                "Third recommendation".to_string(),
            ],
            summary: format!("{} summary", name),
            optimized_prompt: None,
        };
        ComparisonResult::new(&entry, assessment)
    }

    fn single() -> EvaluationResult {
        EvaluationResult::from_assessment(Assessment {
            scores: EvaluationScore::from_array([7, 6, 5, 6, 7, 8, 6, 5, 7, 8]),
            issues: vec!["Lacks specific output format requirements".to_string()],
            recommendations: vec!["Include 2-3 concrete examples".to_string()],
            summary: "The prompt shows good intent.".to_string(),
            optimized_prompt: Some("[OPTIMIZED VERSION OF PROMPT]".to_string()),
        })
    }

    #[test]
    fn test_tier_boundaries() {
        assert_eq!(ScoreTier::category(8), ScoreTier::Success);
        assert_eq!(ScoreTier::category(7), ScoreTier::Warning);
        assert_eq!(ScoreTier::category(6), ScoreTier::Warning);
        assert_eq!(ScoreTier::category(5), ScoreTier::Destructive);

        assert_eq!(ScoreTier::total(80), ScoreTier::Success);
        assert_eq!(ScoreTier::total(79), ScoreTier::Warning);
        assert_eq!(ScoreTier::total(60), ScoreTier::Warning);
        assert_eq!(ScoreTier::total(59), ScoreTier::Destructive);

        assert_eq!(ScoreTier::table_cell(7), ScoreTier::Success);
        assert_eq!(ScoreTier::table_cell(5), ScoreTier::Warning);
        assert_eq!(ScoreTier::table_cell(4), ScoreTier::Destructive);
    }

    #[test]
    fn test_score_cards_follow_category_order() {
        let cards = score_cards(&single().scores);
        assert_eq!(cards.len(), 10);
        assert_eq!(cards[0].label, "Clarity");
        assert_eq!(cards[0].score, 7);
        assert_eq!(cards[0].percentage, 70.0);
        assert_eq!(cards[5].tier, ScoreTier::Success);
        assert_eq!(cards[6].label, "Hallucination Resistance");
        assert_eq!(cards[9].max_score, 10);
    }

    #[test]
    fn test_radar_single_has_one_series() {
        let radar = radar_single(&single().scores);
        assert_eq!(radar.series.len(), 1);
        assert_eq!(radar.series[0].key, "value");
        assert_eq!(radar.points.len(), 10);
        assert_eq!(radar.points[6].subject, "Hallucination Resist.");
        assert_eq!(radar.points[7].subject, "Formatting");
        assert_eq!(radar.points[5].values, vec![8]);
        assert!(radar.points.iter().all(|p| p.full_mark == 10));
    }

    #[test]
    fn test_radar_comparison_keys_series_by_id() {
        let results = vec![
            comparison("A", [1, 2, 3, 4, 5, 6, 7, 8, 9, 10], 0),
            comparison("B", [10, 9, 8, 7, 6, 5, 4, 3, 2, 1], 0),
        ];
        let radar = radar_comparison(&results);

        assert_eq!(radar.series[0].key, results[0].id.to_string());
        assert_eq!(radar.series[1].name, "B");
        assert_eq!(radar.series[1].color.as_deref(), Some("hsl(280, 80%, 60%)"));
        assert_eq!(radar.points[0].values, vec![1, 10]);
        assert_eq!(radar.points[9].values, vec![10, 1]);
    }

    #[test]
    fn test_table_highlights_only_unique_maximum() {
        let results = vec![
            comparison("A", [7, 8, 5, 5, 5, 5, 5, 5, 5, 5], 0),
            comparison("B", [9, 8, 5, 5, 5, 5, 5, 5, 5, 5], 0),
        ];
        let table = ComparisonTable::build(&results, SortKey::Input);

        let clarity = &table.rows[0];
        assert!(!clarity.cells[0].highlighted);
        assert!(clarity.cells[1].highlighted);

        let specificity = &table.rows[1];
        assert!(specificity.cells.iter().all(|c| !c.highlighted));

        assert_eq!(table.columns[0].total_score, 55);
        assert_eq!(table.columns[1].total_score, 57);
        assert!(table.columns[1].is_winner);
        assert!(!table.columns[0].is_winner);
    }

    #[test]
    fn test_table_sorting_is_stable() {
        let results = vec![
            comparison("Charlie", [6; 10], 0),
            comparison("Alpha", [8; 10], 0),
            comparison("Bravo", [6, 6, 6, 6, 6, 6, 6, 6, 6, 6], 0),
        ];

        let names = |sort| -> Vec<String> {
            ComparisonTable::build(&results, sort)
                .columns
                .into_iter()
                .map(|c| c.name)
                .collect()
        };

        assert_eq!(names(SortKey::Input), vec!["Charlie", "Alpha", "Bravo"]);
        assert_eq!(names(SortKey::Total), vec!["Alpha", "Charlie", "Bravo"]);
        assert_eq!(names(SortKey::Name), vec!["Alpha", "Bravo", "Charlie"]);
        assert_eq!(
            names(SortKey::Category(Category::Safety)),
            vec!["Alpha", "Charlie", "Bravo"]
        );
    }

    #[test]
    fn test_winner_flag_ignores_sort_order() {
        let results = vec![comparison("A", [8; 10], 0), comparison("B", [8; 10], 0)];
        let table = ComparisonTable::build(&results, SortKey::Name);
        let winners: Vec<&str> = table
            .columns
            .iter()
            .filter(|c| c.is_winner)
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(winners, vec!["A"]);
    }

    #[test]
    fn test_sort_key_parsing() {
        assert_eq!("total".parse::<SortKey>(), Ok(SortKey::Total));
        assert_eq!("Name".parse::<SortKey>(), Ok(SortKey::Name));
        assert_eq!(
            "domain-fit".parse::<SortKey>(),
            Ok(SortKey::Category(Category::DomainFit))
        );
        assert!("loudness".parse::<SortKey>().is_err());
    }

    #[test]
    fn test_truncate_list_with_overflow() {
        let items: Vec<String> = vec![
            "Lacks specific output format requirements for the answer".to_string(),
            "Short".to_string(),
            "Another".to_string(),
            "Fourth".to_string(),
            "Fifth".to_string(),
        ];
        let truncated = truncate_list(&items, ISSUE_LIMIT, Some(ISSUE_CHARS));

        assert_eq!(truncated.shown.len(), 3);
        assert_eq!(
            truncated.shown[0],
            "Lacks specific output format requirement..."
        );
        assert_eq!(truncated.shown[1], "Short");
        assert_eq!(truncated.hidden, 2);
        assert_eq!(truncated.overflow_label().as_deref(), Some("+2 more"));
    }

    #[test]
    fn test_truncate_list_without_overflow() {
        let items = vec!["exactly forty characters long, no more!!".to_string()];
        assert_eq!(items[0].chars().count(), 40);

        let truncated = truncate_list(&items, ISSUE_LIMIT, Some(ISSUE_CHARS));
        assert_eq!(truncated.shown, items);
        assert_eq!(truncated.hidden, 0);
        assert!(truncated.overflow_label().is_none());
    }

    #[test]
    fn test_plain_single_report() {
        let result = single();
        let text = render_plain(Report::Single(&result));

        assert!(text.contains("Overall Score: 65/100 (fair)"));
        assert!(text.contains("The prompt shows good intent."));
        assert!(text.contains("Hallucination Resistance"));
        assert!(text.contains("#######..."));
        assert!(text.contains(" 1. Lacks specific output format requirements"));
        assert!(text.contains("[OPTIMIZED VERSION OF PROMPT]"));
        assert!(text.is_ascii());
    }

    #[test]
    fn test_plain_comparison_report() {
        let results = vec![
            comparison("Terse", [7, 7, 7, 7, 7, 7, 7, 7, 8, 8], 5),
            comparison("Detailed", [8, 8, 8, 8, 8, 9, 9, 9, 9, 9], 1),
        ];
        let text = render_plain(Report::Comparison {
            results: &results,
            sort: SortKey::Input,
        });

        assert!(text.contains("* Detailed"));
        assert!(text.contains("Winner"));
        assert!(text.contains("Total Score"));
        assert!(text.contains("+2 more"));
        assert!(text.contains("  * First recommendation"));
        assert!(!text.contains("Third recommendation"));
    }

    #[test]
    fn test_json_comparison_names_winner() {
        let results = vec![comparison("A", [5; 10], 0), comparison("B", [6; 10], 0)];
        let json = render(
            Report::Comparison {
                results: &results,
                sort: SortKey::Input,
            },
            OutputFormat::Json,
        )
        .unwrap();

        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["winner"], results[1].id.to_string());
        assert_eq!(value["results"][0]["totalScore"], 50);
        assert_eq!(value["results"][1]["scores"]["domainFit"], 6);
    }

    #[test]
    fn test_json_single_includes_optimized_prompt() {
        let result = single();
        let json = render(Report::Single(&result), OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["totalScore"], 65);
        assert_eq!(value["optimizedPrompt"], "[OPTIMIZED VERSION OF PROMPT]");
    }

    #[test]
    fn test_artifact_stems() {
        let result = single();
        assert_eq!(Report::Single(&result).artifact_stem(), "prompt-evaluation");
        let results: Vec<ComparisonResult> = vec![];
        let report = Report::Comparison {
            results: &results,
            sort: SortKey::Input,
        };
        assert_eq!(report.artifact_stem(), "prompt-comparison");
    }
}
