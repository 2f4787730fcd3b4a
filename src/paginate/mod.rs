mod decorate;

use std::collections::HashMap;

use crate::error::Error;
use crate::measure::{MeasuredText, TextMeasurer};
use crate::model::{
    Color, DrawOp, Page, PageGeometry, PageKind, PagePlan, SectionKind, StructuredReport,
    TextStyle,
};

pub(crate) const TITLE_SIZE: f32 = 26.0;
pub(crate) const SECTION_HEADING_SIZE: f32 = 16.0;
pub(crate) const SUBHEADING_SIZE: f32 = 13.0;
pub(crate) const SUBSUBHEADING_SIZE: f32 = 12.0;
pub(crate) const BODY_SIZE: f32 = 11.0;
pub(crate) const TOC_ENTRY_SIZE: f32 = 12.0;
pub(crate) const CAPTION_SIZE: f32 = 9.0;

const HEADING_SPACE_BEFORE: f32 = 14.0;
const HEADING_SPACE_AFTER: f32 = 6.0;
const SUBHEADING_SPACE_BEFORE: f32 = 8.0;
const SUBHEADING_SPACE_AFTER: f32 = 3.0;
const PARAGRAPH_GAP: f32 = 6.0;
const SOURCE_GAP: f32 = 3.0;
const TOC_ENTRY_GAP: f32 = 4.0;
/// Room for one body line that must follow a heading on the same page.
const KEEP_WITH_NEXT: f32 = BODY_SIZE * 1.2;
/// Width kept free at the right of ToC entries for the page number.
const TOC_PAGE_COLUMN: f32 = 36.0;
const TITLE_RULE_GAP: f32 = 18.0;
const TITLE_RULE_HALF_WIDTH: f32 = 80.0;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct LayoutOptions {
    /// Date text for the "Generated on" captions. Supplied by the caller so
    /// that layout stays deterministic.
    pub generated_on: String,
}

impl LayoutOptions {
    pub fn new(generated_on: impl Into<String>) -> Self {
        Self {
            generated_on: generated_on.into(),
        }
    }

    pub(crate) fn caption(&self) -> String {
        let date = self.generated_on.trim();
        if date.is_empty() {
            "Generated report".to_string()
        } else {
            format!("Generated on {date}")
        }
    }
}

/// Vertical position (top-down) of the next free line and the page receiving
/// content. Lives for one pagination call.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LayoutCursor {
    pub y: f32,
    pub page: usize,
}

pub(crate) struct PageBuf {
    pub(crate) kind: PageKind,
    pub(crate) ops: Vec<DrawOp>,
}

/// Table of contents line waiting for its section's page number.
pub(crate) struct TocSlot {
    pub(crate) page: usize,
    pub(crate) y: f32,
    pub(crate) section: SectionKind,
}

pub fn paginate<M: TextMeasurer + ?Sized>(
    report: &StructuredReport,
    geometry: PageGeometry,
    measurer: &M,
) -> Result<PagePlan, Error> {
    paginate_with(report, geometry, measurer, &LayoutOptions::default())
}

/// Lay a report out into pages: title page, body flow, then headers,
/// footers and page numbers once the page count is final.
pub fn paginate_with<M: TextMeasurer + ?Sized>(
    report: &StructuredReport,
    geometry: PageGeometry,
    measurer: &M,
    options: &LayoutOptions,
) -> Result<PagePlan, Error> {
    let t0 = std::time::Instant::now();
    let mut engine = Paginator::new(geometry, measurer, options);

    if let Some(title) = &report.title {
        engine.title_page(title)?;
    }
    let t_title = t0.elapsed();

    engine.body(report)?;
    let t_body = t0.elapsed();

    let pages = engine.decorate(report.title.as_deref())?;
    let t_total = t0.elapsed();

    let content = pages.iter().filter(|p| p.kind == PageKind::Content).count();
    log::info!(
        "Pagination: {} pages ({} content), title={:.1}ms, body={:.1}ms, decorate={:.1}ms",
        pages.len(),
        content,
        t_title.as_secs_f64() * 1000.0,
        (t_body - t_title).as_secs_f64() * 1000.0,
        (t_total - t_body).as_secs_f64() * 1000.0,
    );

    Ok(PagePlan {
        geometry,
        title: report.title.clone(),
        pages,
    })
}

pub(crate) struct Paginator<'a, M: ?Sized> {
    pub(crate) geometry: PageGeometry,
    pub(crate) measurer: &'a M,
    pub(crate) options: &'a LayoutOptions,
    pub(crate) pages: Vec<PageBuf>,
    cursor: LayoutCursor,
    pub(crate) toc_slots: Vec<TocSlot>,
    /// Physical page index where each section's heading landed.
    pub(crate) section_starts: HashMap<SectionKind, usize>,
}

impl<'a, M: TextMeasurer + ?Sized> Paginator<'a, M> {
    fn new(geometry: PageGeometry, measurer: &'a M, options: &'a LayoutOptions) -> Self {
        Self {
            geometry,
            measurer,
            options,
            pages: Vec::new(),
            cursor: LayoutCursor {
                y: geometry.margin,
                page: 0,
            },
            toc_slots: Vec::new(),
            section_starts: HashMap::new(),
        }
    }

    pub(crate) fn measure(
        &self,
        text: &str,
        style: &TextStyle,
        max_width: f32,
    ) -> Result<MeasuredText, Error> {
        self.measurer.measure(text, style, max_width)
    }

    fn title_page(&mut self, title: &str) -> Result<(), Error> {
        let g = self.geometry;
        let title_style = TextStyle::bold(TITLE_SIZE, Color::TEXT);
        let caption_style = TextStyle::regular(BODY_SIZE, Color::MUTED);
        let caption_m = self.measure(&self.options.caption(), &caption_style, g.content_width())?;
        let room = g.content_height() - 2.0 * TITLE_RULE_GAP - caption_m.height();
        let title_m = self.title_lines(title, &title_style, room)?;

        let group_h = title_m.height() + 2.0 * TITLE_RULE_GAP + caption_m.height();
        let top = ((g.height - group_h) / 2.0).max(g.margin);

        let mut ops = vec![DrawOp::Rect {
            x: 0.0,
            y: 0.0,
            width: g.width,
            height: g.margin / 2.0,
            fill: Color::ACCENT,
        }];

        let mut y = top;
        for line in &title_m.lines {
            ops.push(DrawOp::Text {
                x: (g.width - line.width) / 2.0,
                y,
                text: line.text.clone(),
                style: title_style,
            });
            y += title_m.line_height;
        }

        y += TITLE_RULE_GAP;
        ops.push(DrawOp::Line {
            x1: g.width / 2.0 - TITLE_RULE_HALF_WIDTH,
            y1: y,
            x2: g.width / 2.0 + TITLE_RULE_HALF_WIDTH,
            y2: y,
            width: 1.5,
            color: Color::ACCENT,
        });
        y += TITLE_RULE_GAP;

        for line in &caption_m.lines {
            ops.push(DrawOp::Text {
                x: (g.width - line.width) / 2.0,
                y,
                text: line.text.clone(),
                style: caption_style,
            });
            y += caption_m.line_height;
        }

        self.pages.push(PageBuf {
            kind: PageKind::Title,
            ops,
        });
        log::debug!("title page: {} title lines", title_m.lines.len());
        Ok(())
    }

    /// Title wrapped to the content width and cut to the lines that fit in
    /// `room`. A cut title ends in an ellipsis.
    fn title_lines(
        &self,
        title: &str,
        style: &TextStyle,
        room: f32,
    ) -> Result<MeasuredText, Error> {
        let width = self.geometry.content_width();
        let mut m = self.measure(title, style, width)?;
        let max_lines = ((room / m.line_height).floor() as usize).max(1);
        if m.lines.len() <= max_lines {
            return Ok(m);
        }

        m.lines.truncate(max_lines);
        if let Some(last) = m.lines.last_mut() {
            let mut text = last.text.trim_end().to_string();
            loop {
                let candidate = format!("{text}\u{2026}");
                let fitted = self.measure(&candidate, style, width)?;
                if fitted.lines.len() == 1 || text.is_empty() {
                    last.width = fitted.lines.first().map_or(0.0, |l| l.width);
                    last.text = candidate;
                    break;
                }
                text.pop();
                text.truncate(text.trim_end().len());
            }
        }
        log::debug!("title cut to {max_lines} lines");
        Ok(m)
    }

    fn new_page(&mut self) {
        self.pages.push(PageBuf {
            kind: PageKind::Content,
            ops: Vec::new(),
        });
        self.cursor = LayoutCursor {
            y: self.geometry.margin,
            page: self.pages.len() - 1,
        };
    }

    fn at_page_top(&self) -> bool {
        (self.cursor.y - self.geometry.margin).abs() < 0.01
    }

    /// Vertical gap; dropped at the top of a page.
    fn space(&mut self, gap: f32) {
        if !self.at_page_top() {
            self.cursor.y = (self.cursor.y + gap).min(self.geometry.bottom_limit());
        }
    }

    /// Break to a new page unless `height` fits below the cursor. A fresh
    /// page is never abandoned, so oversized content cannot loop.
    fn ensure_room(&mut self, height: f32) {
        if self.cursor.y + height > self.geometry.bottom_limit() && !self.at_page_top() {
            self.new_page();
        }
    }

    fn push_op(&mut self, op: DrawOp) {
        self.pages[self.cursor.page].ops.push(op);
    }

    /// Place a measured block at `x`. Blocks that fit on one page stay whole;
    /// a block taller than a full page continues line by line on new pages.
    fn place(&mut self, measured: &MeasuredText, x: f32, style: TextStyle, keep_with: f32) {
        self.ensure_room(measured.height() + keep_with);
        let lh = measured.line_height;
        for line in &measured.lines {
            self.ensure_room(lh);
            self.push_op(DrawOp::Text {
                x,
                y: self.cursor.y,
                text: line.text.clone(),
                style,
            });
            self.cursor.y += lh;
        }
    }

    fn flow(&mut self, text: &str, style: TextStyle) -> Result<(), Error> {
        let m = self.measure(text, &style, self.geometry.content_width())?;
        self.place(&m, self.geometry.margin, style, 0.0);
        Ok(())
    }

    /// Heading kept together with at least one line of the text after it.
    /// Returns the page the heading ended up on.
    fn heading(
        &mut self,
        text: &str,
        style: TextStyle,
        before: f32,
        after: f32,
    ) -> Result<usize, Error> {
        self.space(before);
        let m = self.measure(text, &style, self.geometry.content_width())?;
        self.place(&m, self.geometry.margin, style, KEEP_WITH_NEXT);
        let page = self.cursor.page;
        self.space(after);
        Ok(page)
    }

    fn body(&mut self, report: &StructuredReport) -> Result<(), Error> {
        self.new_page();
        let sections = report.present_sections();

        if sections.len() > 1 {
            self.table_of_contents(&sections)?;
            self.new_page();
        }

        for (i, &kind) in sections.iter().enumerate() {
            let heading_style = TextStyle::bold(SECTION_HEADING_SIZE, Color::ACCENT);
            let before = if i == 0 { 0.0 } else { HEADING_SPACE_BEFORE };
            let start = self.heading(kind.heading(), heading_style, before, HEADING_SPACE_AFTER)?;
            self.section_starts.insert(kind, start);

            match kind {
                SectionKind::Introduction => {
                    if let Some(text) = &report.introduction {
                        self.flow(text, TextStyle::regular(BODY_SIZE, Color::TEXT))?;
                    }
                }
                SectionKind::Body => {
                    if let Some(text) = &report.body {
                        self.main_content(text)?;
                    }
                }
                SectionKind::Conclusion => {
                    if let Some(text) = &report.conclusion {
                        self.flow(text, TextStyle::regular(BODY_SIZE, Color::TEXT))?;
                    }
                }
                SectionKind::Sources => {
                    if let Some(entries) = &report.sources {
                        self.references(entries)?;
                    }
                }
            }
        }

        log::debug!(
            "body layout: {} sections over {} pages, cursor ends at y={:.1}",
            sections.len(),
            self.pages.len(),
            self.cursor.y,
        );
        Ok(())
    }

    fn table_of_contents(&mut self, sections: &[SectionKind]) -> Result<(), Error> {
        let heading_style = TextStyle::bold(SECTION_HEADING_SIZE, Color::ACCENT);
        self.heading("Table of Contents", heading_style, 0.0, HEADING_SPACE_AFTER * 2.0)?;

        let entry_style = TextStyle::regular(TOC_ENTRY_SIZE, Color::TEXT);
        let width = self.geometry.content_width() - TOC_PAGE_COLUMN;
        for (i, &kind) in sections.iter().enumerate() {
            let label = format!("{}. {}", i + 1, kind.heading());
            let m = self.measure(&label, &entry_style, width)?;
            self.ensure_room(m.height());
            self.toc_slots.push(TocSlot {
                page: self.cursor.page,
                y: self.cursor.y,
                section: kind,
            });
            self.place(&m, self.geometry.margin, entry_style, 0.0);
            self.space(TOC_ENTRY_GAP);
        }
        Ok(())
    }

    /// Blank-line separated paragraphs; `##` / `###` paragraphs open with a
    /// bold subheading.
    fn main_content(&mut self, text: &str) -> Result<(), Error> {
        let body_style = TextStyle::regular(BODY_SIZE, Color::TEXT);
        for (i, para) in paragraphs(text).iter().enumerate() {
            let (first, rest) = match para.split_once('\n') {
                Some((first, rest)) => (first.trim(), Some(rest)),
                None => (para.trim(), None),
            };

            let subheading = if first.starts_with("###") {
                Some(SUBSUBHEADING_SIZE)
            } else if first.starts_with("##") {
                Some(SUBHEADING_SIZE)
            } else {
                None
            };

            match subheading {
                Some(size) => {
                    let label = first.trim_start_matches('#').trim();
                    if !label.is_empty() {
                        let before = if i == 0 { 0.0 } else { SUBHEADING_SPACE_BEFORE };
                        self.heading(
                            label,
                            TextStyle::bold(size, Color::TEXT),
                            before,
                            SUBHEADING_SPACE_AFTER,
                        )?;
                    }
                    if let Some(rest) = rest.filter(|r| !r.trim().is_empty()) {
                        self.flow(rest, body_style)?;
                    }
                }
                None => {
                    if i > 0 {
                        self.space(PARAGRAPH_GAP);
                    }
                    self.flow(para, body_style)?;
                }
            }
        }
        Ok(())
    }

    fn references(&mut self, entries: &[String]) -> Result<(), Error> {
        let style = TextStyle::regular(BODY_SIZE, Color::TEXT);
        for (i, entry) in entries.iter().enumerate() {
            if i > 0 {
                self.space(SOURCE_GAP);
            }
            self.flow(&format!("{}. {entry}", i + 1), style)?;
        }
        Ok(())
    }
}

/// Split on blank lines, keeping the line breaks inside each paragraph.
fn paragraphs(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    for line in text.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                out.push(current.join("\n"));
                current.clear();
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        out.push(current.join("\n"));
    }
    out
}

impl PageBuf {
    pub(crate) fn into_page(self, page_number: Option<usize>, total_pages: usize) -> Page {
        Page {
            kind: self.kind,
            page_number,
            total_pages,
            ops: self.ops,
        }
    }
}
