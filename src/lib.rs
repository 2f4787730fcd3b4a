mod error;
mod fonts;
mod measure;
mod model;
mod paginate;
mod pdf;
mod report;

pub use error::Error;
pub use fonts::{FontFace, FontSet};
pub use measure::{MeasuredLine, MeasuredText, TextMeasurer};
pub use model::{
    Color, DrawOp, FontWeight, Page, PageGeometry, PageKind, PagePlan, SectionKind,
    StructuredReport, TextStyle,
};
pub use paginate::{LayoutCursor, LayoutOptions, paginate, paginate_with};
pub use pdf::render as render_pdf;
pub use report::{HeuristicParser, ParseOptions, ReportParser, parse, source_entries};

use std::path::Path;
use std::time::Instant;

/// Used when the report has no usable title.
pub const FALLBACK_FILENAME: &str = "research-report.pdf";
const FILENAME_TITLE_CHARS: usize = 50;

/// Everything one export needs besides the report text.
#[derive(Debug, Default)]
pub struct CompileOptions {
    pub geometry: PageGeometry,
    pub parse: ParseOptions,
    pub layout: LayoutOptions,
    pub fonts: FontSet,
}

/// Parse, paginate and render a report held in memory.
pub fn compile_report_text(raw: &str, options: &CompileOptions) -> Result<Vec<u8>, Error> {
    let t0 = Instant::now();
    let report = HeuristicParser::new(options.parse).parse(raw);
    log::debug!(
        "Parsed report in {:.1}ms: sections={:?}",
        t0.elapsed().as_secs_f64() * 1000.0,
        report.present_sections(),
    );
    compile_report(&report, options)
}

/// Paginate and render an already structured report.
pub fn compile_report(
    report: &StructuredReport,
    options: &CompileOptions,
) -> Result<Vec<u8>, Error> {
    let t0 = Instant::now();

    let plan = paginate_with(report, options.geometry, &options.fonts, &options.layout)?;
    let t_layout = t0.elapsed();

    let bytes = pdf::render(&plan, &options.fonts)?;
    let t_total = t0.elapsed();

    log::info!(
        "Timing: layout={:.1}ms, render={:.1}ms, total={:.1}ms (output {} bytes)",
        t_layout.as_secs_f64() * 1000.0,
        (t_total - t_layout).as_secs_f64() * 1000.0,
        t_total.as_secs_f64() * 1000.0,
        bytes.len(),
    );

    Ok(bytes)
}

/// Read a report text file and write the compiled PDF. The output is only
/// written once the whole document has been rendered.
pub fn compile_report_to_pdf(
    input: &Path,
    output: &Path,
    options: &CompileOptions,
) -> Result<(), Error> {
    let raw = std::fs::read_to_string(input)?;
    let bytes = compile_report_text(&raw, options)?;
    std::fs::write(output, &bytes)?;
    Ok(())
}

/// File name for an exported report: a slug of the first 50 characters of
/// the title, or [`FALLBACK_FILENAME`].
pub fn suggested_filename(report: &StructuredReport) -> String {
    let Some(title) = report.title.as_deref() else {
        return FALLBACK_FILENAME.to_string();
    };
    let slug: String = title
        .chars()
        .take(FILENAME_TITLE_CHARS)
        .flat_map(char::to_lowercase)
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect();
    if slug.chars().all(|c| c == '-') {
        return FALLBACK_FILENAME.to_string();
    }
    format!("{slug}.pdf")
}
