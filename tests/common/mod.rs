#![allow(dead_code)]

use report_pdf::{
    DrawOp, Error, MeasuredLine, MeasuredText, Page, PagePlan, StructuredReport, TextMeasurer,
    TextStyle,
};

/// Every glyph is half an em wide; lines are 1.2 em apart.
pub struct FixedWidth;

impl TextMeasurer for FixedWidth {
    fn measure(
        &self,
        text: &str,
        style: &TextStyle,
        max_width: f32,
    ) -> Result<MeasuredText, Error> {
        let char_w = style.size * 0.5;
        let per_line = ((max_width / char_w).floor() as usize).max(1);
        let mut lines = Vec::new();
        for raw_line in text.split('\n') {
            let mut current = String::new();
            for word in raw_line.split_whitespace() {
                let word_len = word.chars().count();
                let candidate = if current.is_empty() {
                    word_len
                } else {
                    current.chars().count() + 1 + word_len
                };
                if candidate > per_line && !current.is_empty() {
                    lines.push(std::mem::take(&mut current));
                }
                if !current.is_empty() {
                    current.push(' ');
                }
                current.push_str(word);
            }
            lines.push(current);
        }
        Ok(MeasuredText {
            lines: lines
                .into_iter()
                .map(|text| MeasuredLine {
                    width: text.chars().count() as f32 * char_w,
                    text,
                })
                .collect(),
            line_height: style.size * 1.2,
        })
    }
}

/// Fails on any text containing `trigger`.
pub struct FailingOn(pub &'static str);

impl TextMeasurer for FailingOn {
    fn measure(
        &self,
        text: &str,
        style: &TextStyle,
        max_width: f32,
    ) -> Result<MeasuredText, Error> {
        if text.contains(self.0) {
            return Err(Error::Measure(format!("cannot shape {:?}", self.0)));
        }
        FixedWidth.measure(text, style, max_width)
    }
}

pub fn paragraph(seed: usize, words: usize) -> String {
    (0..words)
        .map(|i| format!("word{}", (seed * 31 + i) % 97))
        .collect::<Vec<_>>()
        .join(" ")
}

/// A report with all four sections and enough body text for several pages.
pub fn long_report() -> StructuredReport {
    let body = (0..40)
        .map(|i| {
            if i % 10 == 0 {
                format!("## Finding {}\n{}", i / 10 + 1, paragraph(i, 60))
            } else {
                paragraph(i, 80)
            }
        })
        .collect::<Vec<_>>()
        .join("\n\n");
    StructuredReport {
        title: Some("Battery Storage in Northern Grids".to_string()),
        introduction: Some(paragraph(1000, 120)),
        body: Some(body),
        conclusion: Some(paragraph(2000, 90)),
        sources: Some((1..=12).map(|i| format!("Source number {i}")).collect()),
    }
}

pub fn texts(page: &Page) -> Vec<&str> {
    page.texts().collect()
}

pub fn all_texts(plan: &PagePlan) -> Vec<&str> {
    plan.pages.iter().flat_map(|p| p.texts()).collect()
}

/// The "Page n of T" label stamped on a page, if any.
pub fn page_label(page: &Page) -> Option<&str> {
    page.texts().find(|t| t.starts_with("Page ") && t.contains(" of "))
}

/// Text ops in body sizes (headers and footers use smaller type).
pub fn body_text_ops(page: &Page) -> impl Iterator<Item = (f32, &TextStyle)> {
    page.ops.iter().filter_map(|op| match op {
        DrawOp::Text { y, style, .. } if style.size > 9.5 => Some((*y, style)),
        _ => None,
    })
}
