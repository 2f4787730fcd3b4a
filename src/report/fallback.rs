//! Salvage pass for reports without bare section labels: look for inline
//! conclusion/sources headings inside the body and carve an introduction off
//! its start.
//!
//! The thresholds below are tuning parameters calibrated by hand; they are
//! kept as-is until checked against a corpus of real reports.

use super::{ParseOptions, Slot, flush, is_thematic_break};
use crate::model::StructuredReport;

/// Lines at or above this length never count as an inline conclusion heading.
pub(crate) const CONCLUSION_HEADING_MAX_LEN: usize = 50;
/// Window (in lines) searched for the blank line ending the introduction.
pub(crate) const INTRO_BREAK_WINDOW: usize = 8;
/// Introduction length when no early blank line exists. Counts non-blank
/// lines, not blank-line separated paragraphs, so a long first paragraph can
/// be cut after its third line.
pub(crate) const INTRO_MAX_PARAGRAPHS: usize = 3;

fn inline_marker(line: &str) -> Option<Slot> {
    let lower = line.trim().to_lowercase();
    if lower.contains("conclusion") && line.chars().count() < CONCLUSION_HEADING_MAX_LEN {
        Some(Slot::Conclusion)
    } else if lower.contains("sources") || lower.contains("references") {
        Some(Slot::Sources)
    } else {
        None
    }
}

pub(super) fn split_body(report: &mut StructuredReport, opts: ParseOptions) {
    let Some(body) = report.body.take() else {
        return;
    };

    let mut lead: Vec<&str> = Vec::new();
    let mut conclusion: Vec<&str> = Vec::new();
    let mut sources: Vec<&str> = Vec::new();
    let mut current = Slot::Body;

    for line in body.lines() {
        if let Some(slot) = inline_marker(line) {
            current = slot;
            continue;
        }
        if opts.markdown && is_thematic_break(line) {
            continue;
        }
        match current {
            Slot::Conclusion => conclusion.push(line),
            Slot::Sources => sources.push(line),
            Slot::Introduction | Slot::Body => lead.push(line),
        }
    }

    match intro_split(&lead) {
        Some((intro, rest)) => {
            flush(report, Slot::Introduction, intro, opts);
            flush(report, Slot::Body, rest, opts);
        }
        None => flush(report, Slot::Body, &lead, opts),
    }
    flush(report, Slot::Conclusion, &conclusion, opts);
    flush(report, Slot::Sources, &sources, opts);

    log::debug!(
        "fallback split: intro={} body={} conclusion={} sources={}",
        report.introduction.is_some(),
        report.body.is_some(),
        report.conclusion.is_some(),
        report.sources.is_some(),
    );
}

/// Where the introduction ends inside `lines`. Prefers a blank line within
/// the first [`INTRO_BREAK_WINDOW`] lines that has text on both sides;
/// otherwise takes the first [`INTRO_MAX_PARAGRAPHS`] lines, as long as
/// something is left over for the body.
fn intro_split<'a, 'b>(lines: &'b [&'a str]) -> Option<(&'b [&'a str], &'b [&'a str])> {
    let is_blank = |l: &&str| l.trim().is_empty();

    let window = lines.len().min(INTRO_BREAK_WINDOW);
    let blank_break = (0..window).find(|&i| {
        is_blank(&lines[i])
            && lines[..i].iter().any(|l| !is_blank(l))
            && lines[i + 1..].iter().any(|l| !is_blank(l))
    });
    if let Some(i) = blank_break {
        return Some((&lines[..i], &lines[i + 1..]));
    }

    // Without an early blank line, paragraphs are the individual text lines.
    let mut taken = 0;
    let mut end = 0;
    for (i, line) in lines.iter().enumerate() {
        if taken == INTRO_MAX_PARAGRAPHS {
            break;
        }
        if !is_blank(line) {
            taken += 1;
            end = i + 1;
        }
    }
    let rest = &lines[end..];
    if taken == 0 || rest.iter().all(is_blank) {
        return None;
    }
    Some((&lines[..end], rest))
}
