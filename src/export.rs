use crate::config::ExportConfig;
use crate::error::ExportError;
use crate::flow::winner;
use crate::models::{CATEGORY_MAX, Category};
use crate::notify::{Notifier, Toast};
use crate::output::{RadarData, Report, ScoreTier, radar_comparison, radar_single, render_plain};
use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
pub enum ExportFormat {
    /// SVG picture of the results
    Image,
    /// Single-page PDF of the plain report
    Pdf,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Image => "svg",
            ExportFormat::Pdf => "pdf",
        }
    }

    fn success_title(self) -> &'static str {
        match self {
            ExportFormat::Image => "Image Exported",
            ExportFormat::Pdf => "PDF Exported",
        }
    }

    fn noun(self) -> &'static str {
        match self {
            ExportFormat::Image => "image",
            ExportFormat::Pdf => "PDF",
        }
    }
}

/// `<stem>-<unix millis>.<ext>`
pub fn artifact_name(stem: &str, format: ExportFormat, at: DateTime<Utc>) -> String {
    format!("{}-{}.{}", stem, at.timestamp_millis(), format.extension())
}

/// Writes rendered reports to disk, one export at a time
pub struct Exporter {
    directory: PathBuf,
    background: String,
    notifier: Arc<dyn Notifier>,
    in_progress: AtomicBool,
}

/// Clears the in-progress flag however the export ends
struct InProgressGuard<'a>(&'a AtomicBool);

impl<'a> InProgressGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self, ExportError> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| Self(flag))
            .map_err(|_| ExportError::InProgress)
    }
}

impl Drop for InProgressGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Exporter {
    pub fn new(config: &ExportConfig, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            directory: config.directory.clone(),
            background: config.background.clone(),
            notifier,
            in_progress: AtomicBool::new(false),
        }
    }

    pub fn is_exporting(&self) -> bool {
        self.in_progress.load(Ordering::Acquire)
    }

    /// Render `report` and save it; the outcome is also reported through the notifier
    pub async fn export(&self, report: Report<'_>, format: ExportFormat) -> Result<PathBuf, ExportError> {
        let _guard = InProgressGuard::acquire(&self.in_progress)?;

        match self.write_artifact(report, format).await {
            Ok(path) => {
                tracing::info!(path = %path.display(), "export written");
                self.notifier.notify(Toast::info(
                    format.success_title(),
                    format!("Results saved to {}.", path.display()),
                ));
                Ok(path)
            }
            Err(e) => {
                tracing::warn!(error = %e, "export failed");
                self.notifier.notify(Toast::destructive(
                    "Export Failed",
                    format!("Failed to export {}. Please try again.", format.noun()),
                ));
                Err(e)
            }
        }
    }

    async fn write_artifact(&self, report: Report<'_>, format: ExportFormat) -> Result<PathBuf, ExportError> {
        if let Report::Comparison { results, .. } = report
            && results.is_empty()
        {
            return Err(ExportError::Render("no results to export".to_string()));
        }

        let bytes = match format {
            ExportFormat::Image => render_svg(report, &self.background).into_bytes(),
            ExportFormat::Pdf => render_pdf(&render_plain(report)),
        };

        let file_name = artifact_name(report.artifact_stem(), format, Utc::now());
        let path = self.directory.join(&file_name);
        let partial = self.directory.join(format!(".{}.partial", file_name));

        tokio::fs::create_dir_all(&self.directory).await?;
        if let Err(e) = write_then_rename(&partial, &path, &bytes).await {
            let _ = tokio::fs::remove_file(&partial).await;
            return Err(e.into());
        }

        Ok(path)
    }
}

async fn write_then_rename(partial: &Path, path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    tokio::fs::write(partial, bytes).await?;
    tokio::fs::rename(partial, path).await
}

const SVG_WIDTH: f64 = 900.0;
const RADAR_RADIUS: f64 = 180.0;
const PRIMARY_COLOR: &str = "hsl(189, 94%, 43%)";
const TEXT_COLOR: &str = "#e5e7eb";
const MUTED_COLOR: &str = "#9ca3af";
const GRID_COLOR: &str = "#374151";

fn escape_xml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            other => escaped.push(other),
        }
    }
    escaped
}

fn tier_color(tier: ScoreTier) -> &'static str {
    match tier {
        ScoreTier::Success => "hsl(142, 76%, 36%)",
        ScoreTier::Warning => "hsl(38, 92%, 50%)",
        ScoreTier::Destructive => "hsl(0, 84%, 60%)",
    }
}

/// Vertex of axis `index` at `value` on a 0..=10 scale
fn radar_vertex(cx: f64, cy: f64, index: usize, value: f64) -> (f64, f64) {
    let angle = -PI / 2.0 + index as f64 * 2.0 * PI / Category::ALL.len() as f64;
    let r = RADAR_RADIUS * value / f64::from(CATEGORY_MAX);
    (cx + r * angle.cos(), cy + r * angle.sin())
}

fn polygon_points(cx: f64, cy: f64, values: impl Iterator<Item = f64>) -> String {
    values
        .enumerate()
        .map(|(i, v)| {
            let (x, y) = radar_vertex(cx, cy, i, v);
            format!("{:.1},{:.1}", x, y)
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn write_radar(svg: &mut String, cy: f64, radar: &RadarData) {
    let cx = SVG_WIDTH / 2.0;

    for level in [2, 4, 6, 8, 10] {
        let ring = polygon_points(cx, cy, radar.points.iter().map(|_| f64::from(level)));
        let _ = writeln!(
            svg,
            r#"<polygon points="{}" fill="none" stroke="{}" stroke-width="1"/>"#,
            ring, GRID_COLOR
        );
    }

    for (i, point) in radar.points.iter().enumerate() {
        let full = f64::from(point.full_mark);
        let (x, y) = radar_vertex(cx, cy, i, full);
        let (lx, ly) = radar_vertex(cx, cy, i, full + 1.8);
        let _ = writeln!(
            svg,
            r#"<line x1="{:.1}" y1="{:.1}" x2="{:.1}" y2="{:.1}" stroke="{}"/>"#,
            cx, cy, x, y, GRID_COLOR
        );
        let _ = writeln!(
            svg,
            r#"<text x="{:.1}" y="{:.1}" fill="{}" font-size="11" text-anchor="middle">{}</text>"#,
            lx,
            ly,
            MUTED_COLOR,
            escape_xml(point.subject)
        );
    }

    for (index, series) in radar.series.iter().enumerate() {
        let color = escape_xml(series.color.as_deref().unwrap_or(PRIMARY_COLOR));
        let points = polygon_points(
            cx,
            cy,
            radar.points.iter().map(|p| f64::from(p.values[index])),
        );
        let _ = writeln!(
            svg,
            r#"<polygon points="{}" fill="{}" fill-opacity="0.2" stroke="{}" stroke-width="2" class="series"/>"#,
            points, color, color
        );
    }
}

/// Draw the results region as an SVG document
pub fn render_svg(report: Report<'_>, background: &str) -> String {
    let mut body = String::new();
    let mut y;

    match report {
        Report::Single(result) => {
            let _ = writeln!(
                body,
                r#"<text x="40" y="50" fill="{}" font-size="24" font-weight="bold">Prompt Evaluation</text>"#,
                TEXT_COLOR
            );
            let _ = writeln!(
                body,
                r#"<text x="{:.0}" y="110" fill="{}" font-size="48" font-weight="bold" text-anchor="middle">{}<tspan fill="{}" font-size="20">/100</tspan></text>"#,
                SVG_WIDTH / 2.0,
                tier_color(ScoreTier::total(result.total_score)),
                result.total_score,
                MUTED_COLOR
            );
            write_radar(&mut body, 350.0, &radar_single(&result.scores));

            y = 590.0;
            for (category, score) in result.scores.iter() {
                let width = 400.0 * f64::from(score.clamp(0, CATEGORY_MAX)) / f64::from(CATEGORY_MAX);
                let _ = writeln!(
                    body,
                    r#"<text x="40" y="{:.0}" fill="{}" font-size="13">{}</text>"#,
                    y,
                    TEXT_COLOR,
                    escape_xml(category.label())
                );
                let _ = writeln!(
                    body,
                    r#"<rect x="260" y="{:.0}" width="400" height="8" rx="4" fill="{}"/><rect x="260" y="{:.0}" width="{:.1}" height="8" rx="4" fill="{}"/>"#,
                    y - 9.0,
                    GRID_COLOR,
                    y - 9.0,
                    width,
                    PRIMARY_COLOR
                );
                let _ = writeln!(
                    body,
                    r#"<text x="690" y="{:.0}" fill="{}" font-size="13" font-weight="bold">{}/{}</text>"#,
                    y,
                    tier_color(ScoreTier::category(score)),
                    score,
                    CATEGORY_MAX
                );
                y += 28.0;
            }
        }
        Report::Comparison { results, .. } => {
            let _ = writeln!(
                body,
                r#"<text x="40" y="50" fill="{}" font-size="24" font-weight="bold">Comparison Results</text>"#,
                TEXT_COLOR
            );
            let winner_id = winner(results).map(|w| w.id);

            y = 90.0;
            for result in results {
                let _ = writeln!(
                    body,
                    r#"<circle cx="50" cy="{:.0}" r="7" fill="{}"/>"#,
                    y - 5.0,
                    escape_xml(&result.color)
                );
                let _ = writeln!(
                    body,
                    r#"<text x="66" y="{:.0}" fill="{}" font-size="15">{}{}</text>"#,
                    y,
                    TEXT_COLOR,
                    escape_xml(&result.name),
                    if Some(result.id) == winner_id { " (Winner)" } else { "" }
                );
                let _ = writeln!(
                    body,
                    r#"<text x="{:.0}" y="{:.0}" fill="{}" font-size="15" font-weight="bold" text-anchor="end">{}</text>"#,
                    SVG_WIDTH - 40.0,
                    y,
                    tier_color(ScoreTier::total(result.total_score())),
                    result.total_score()
                );
                y += 30.0;
            }

            let cy = y + RADAR_RADIUS + 40.0;
            write_radar(&mut body, cy, &radar_comparison(results));
            y = cy + RADAR_RADIUS + 40.0;
        }
    }

    let height = y + 20.0;
    format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{w:.0}\" height=\"{h:.0}\" viewBox=\"0 0 {w:.0} {h:.0}\" font-family=\"sans-serif\">\n\
         <rect width=\"100%\" height=\"100%\" fill=\"{bg}\"/>\n{body}</svg>\n",
        w = SVG_WIDTH,
        h = height,
        bg = escape_xml(background),
        body = body
    )
}

const PDF_FONT_SIZE: usize = 10;
const PDF_LEADING: usize = 12;
/// Courier advance width at 10pt
const PDF_CHAR_WIDTH: usize = 6;
const PDF_MARGIN: usize = 36;

fn escape_pdf_text(line: &str) -> String {
    let mut escaped = String::with_capacity(line.len());
    for c in line.chars() {
        match c {
            '\\' | '(' | ')' => {
                escaped.push('\\');
                escaped.push(c);
            }
            c if c.is_ascii() && !c.is_ascii_control() => escaped.push(c),
            '\t' => escaped.push_str("    "),
            _ => escaped.push('?'),
        }
    }
    escaped
}

/// Lay `text` out on a single PDF page sized to fit every line
pub fn render_pdf(text: &str) -> Vec<u8> {
    let lines: Vec<&str> = text.lines().collect();
    let longest = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0);

    let width = (longest * PDF_CHAR_WIDTH + 2 * PDF_MARGIN).max(612);
    let height = (lines.len() * PDF_LEADING + 2 * PDF_MARGIN).max(200);

    let mut content = String::new();
    let _ = writeln!(content, "BT");
    let _ = writeln!(content, "/F1 {} Tf", PDF_FONT_SIZE);
    let _ = writeln!(content, "{} TL", PDF_LEADING);
    let _ = writeln!(
        content,
        "{} {} Td",
        PDF_MARGIN,
        height - PDF_MARGIN - PDF_FONT_SIZE
    );
    for line in &lines {
        let _ = writeln!(content, "({}) Tj T*", escape_pdf_text(line));
    }
    let _ = write!(content, "ET");

    let objects = [
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        "<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_string(),
        format!(
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {} {}] /Resources << /Font << /F1 5 0 R >> >> /Contents 4 0 R >>",
            width, height
        ),
        format!(
            "<< /Length {} >>\nstream\n{}\nendstream",
            content.len(),
            content
        ),
        "<< /Type /Font /Subtype /Type1 /BaseFont /Courier >>".to_string(),
    ];

    let mut pdf = String::from("%PDF-1.4\n");
    let mut offsets = Vec::with_capacity(objects.len());
    for (index, object) in objects.iter().enumerate() {
        offsets.push(pdf.len());
        let _ = write!(pdf, "{} 0 obj\n{}\nendobj\n", index + 1, object);
    }

    let xref = pdf.len();
    let _ = write!(pdf, "xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1);
    for offset in offsets {
        let _ = write!(pdf, "{:010} 00000 n \n", offset);
    }
    let _ = write!(
        pdf,
        "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
        objects.len() + 1,
        xref
    );

    pdf.into_bytes()
}
