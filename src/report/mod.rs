mod fallback;

use crate::model::StructuredReport;

/// Turns raw report text into a [`StructuredReport`]. Implementations must be
/// pure and infallible: text they cannot classify ends up in the body.
pub trait ReportParser {
    fn parse(&self, raw: &str) -> StructuredReport;
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ParseOptions {
    /// Accept markdown decoration around markers (`## Conclusion`,
    /// `**Sources**`), drop `---` rules, strip `[n]` source labels, and let a
    /// rule after the introduction start the main content.
    pub markdown: bool,
}

impl ParseOptions {
    pub fn markdown() -> Self {
        Self { markdown: true }
    }
}

/// Line-oriented section detection keyed on bare section labels.
#[derive(Clone, Copy, Debug, Default)]
pub struct HeuristicParser {
    pub options: ParseOptions,
}

impl HeuristicParser {
    pub fn new(options: ParseOptions) -> Self {
        Self { options }
    }
}

/// Parse with the default heuristic.
pub fn parse(raw: &str) -> StructuredReport {
    HeuristicParser::default().parse(raw)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Slot {
    Introduction,
    Body,
    Conclusion,
    Sources,
}

impl ReportParser for HeuristicParser {
    fn parse(&self, raw: &str) -> StructuredReport {
        let opts = self.options;
        let mut report = StructuredReport::default();
        let mut lines = raw.lines().skip_while(|l| l.trim().is_empty());

        let Some(title_line) = lines.next() else {
            return report;
        };
        report.title = Some(clean_title(title_line, opts));

        // Text before the first marker belongs to the body.
        let mut current = Slot::Body;
        let mut buffer: Vec<&str> = Vec::new();
        let mut saw_marker = false;

        for line in lines {
            if let Some(next) = section_marker(line, opts) {
                flush(&mut report, current, &buffer, opts);
                buffer.clear();
                current = next;
                saw_marker = true;
                continue;
            }
            if opts.markdown && is_thematic_break(line) {
                if current == Slot::Introduction {
                    flush(&mut report, current, &buffer, opts);
                    buffer.clear();
                    current = Slot::Body;
                }
                continue;
            }
            buffer.push(line);
        }
        flush(&mut report, current, &buffer, opts);

        let salvage = report.introduction.is_none()
            && report.conclusion.is_none()
            && report.sources.is_none()
            && report.body.is_some();
        if salvage {
            fallback::split_body(&mut report, opts);
        }

        log::debug!(
            "parse: title={} intro={} body={} conclusion={} sources={} markers={} fallback={}",
            report.title.is_some(),
            report.introduction.is_some(),
            report.body.is_some(),
            report.conclusion.is_some(),
            report.sources.as_ref().map_or(0, Vec::len),
            saw_marker,
            salvage,
        );

        report
    }
}

fn clean_title(line: &str, opts: ParseOptions) -> String {
    let trimmed = line.trim();
    if opts.markdown {
        let stripped = trimmed.trim_start_matches('#').trim();
        if !stripped.is_empty() {
            return stripped.to_string();
        }
    }
    trimmed.to_string()
}

fn section_marker(line: &str, opts: ParseOptions) -> Option<Slot> {
    let mut label = line.trim();
    if opts.markdown {
        label = label.trim_start_matches('#').trim().trim_matches('*').trim();
    }
    match label.to_lowercase().as_str() {
        "introduction" => Some(Slot::Introduction),
        "conclusion" => Some(Slot::Conclusion),
        "sources" | "references" => Some(Slot::Sources),
        _ => None,
    }
}

pub(crate) fn is_thematic_break(line: &str) -> bool {
    let t = line.trim();
    t.len() >= 3 && (t.chars().all(|c| c == '-') || t.chars().all(|c| c == '*'))
}

/// Store accumulated lines into the field for `slot`. Empty text is skipped
/// so an absent section stays `None`.
pub(crate) fn flush(
    report: &mut StructuredReport,
    slot: Slot,
    buffer: &[&str],
    opts: ParseOptions,
) {
    let text = buffer.join("\n");
    let text = text.trim();
    if text.is_empty() {
        return;
    }
    match slot {
        Slot::Introduction => report.introduction = Some(text.to_string()),
        Slot::Body => report.body = Some(text.to_string()),
        Slot::Conclusion => report.conclusion = Some(text.to_string()),
        Slot::Sources => report.sources = Some(source_entries(text, opts)),
    }
}

/// Split a bibliography block into entries, dropping blank lines and leading
/// enumeration or bullet markers.
pub fn source_entries(text: &str, opts: ParseOptions) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(|l| strip_list_marker(l, opts).to_string())
        .collect()
}

fn strip_list_marker(line: &str, opts: ParseOptions) -> &str {
    if let Some(rest) = line.strip_prefix("- ").or_else(|| line.strip_prefix("* ")) {
        return rest.trim_start();
    }
    let digits = line.bytes().take_while(u8::is_ascii_digit).count();
    if digits > 0
        && let Some(rest) = line[digits..].strip_prefix(". ")
    {
        return rest.trim_start();
    }
    if opts.markdown
        && let Some(inner) = line.strip_prefix('[')
    {
        let digits = inner.bytes().take_while(u8::is_ascii_digit).count();
        if digits > 0
            && let Some(rest) = inner[digits..].strip_prefix("] ")
        {
            return rest.trim_start();
        }
    }
    line
}
