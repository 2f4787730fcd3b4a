//! Running headers, footers and page numbers. These depend on the final
//! content-page count, so they are added only after body layout is done.

use super::{CAPTION_SIZE, PageBuf, Paginator, TOC_ENTRY_SIZE};
use crate::error::Error;
use crate::measure::TextMeasurer;
use crate::model::{Color, DrawOp, Page, PageKind, TextStyle};

/// Fractions of the margin at which the header/footer bands sit.
const HEADER_TEXT_AT: f32 = 0.35;
const HEADER_RULE_AT: f32 = 0.7;
const FOOTER_RULE_AT: f32 = 0.7;
const FOOTER_TEXT_AT: f32 = 0.6;
const RULE_WIDTH: f32 = 0.5;
/// Share of the content width the running title may take.
const RUNNING_TITLE_SHARE: f32 = 0.6;

impl<M: TextMeasurer + ?Sized> Paginator<'_, M> {
    pub(super) fn decorate(mut self, title: Option<&str>) -> Result<Vec<Page>, Error> {
        // Content page number (1-based) for every physical page index.
        let mut numbers: Vec<Option<usize>> = Vec::with_capacity(self.pages.len());
        let mut next = 1;
        for page in &self.pages {
            if page.kind == PageKind::Content {
                numbers.push(Some(next));
                next += 1;
            } else {
                numbers.push(None);
            }
        }
        let total = next - 1;

        self.fill_toc(&numbers)?;

        let running_title = match title {
            Some(t) => Some(self.running_title(t)?),
            None => None,
        };
        let caption = self.options.caption();

        let mut pages = Vec::with_capacity(self.pages.len());
        let bufs = std::mem::take(&mut self.pages);
        for (buf, number) in bufs.into_iter().zip(numbers) {
            let page = match number {
                Some(n) => {
                    let mut buf = buf;
                    self.stamp(&mut buf, n, total, running_title.as_deref(), &caption)?;
                    buf.into_page(Some(n), total)
                }
                None => buf.into_page(None, total),
            };
            pages.push(page);
        }

        log::debug!("decorated {total} content pages");
        Ok(pages)
    }

    fn fill_toc(&mut self, numbers: &[Option<usize>]) -> Result<(), Error> {
        let style = TextStyle::regular(TOC_ENTRY_SIZE, Color::TEXT);
        let right = self.geometry.width - self.geometry.margin;
        let mut ops = Vec::new();
        for slot in &self.toc_slots {
            let Some(n) = self
                .section_starts
                .get(&slot.section)
                .and_then(|&page| numbers.get(page).copied().flatten())
            else {
                continue;
            };
            let label = n.to_string();
            let width = self.label_width(&label, &style)?;
            ops.push((
                slot.page,
                DrawOp::Text {
                    x: right - width,
                    y: slot.y,
                    text: label,
                    style,
                },
            ));
        }
        for (page, op) in ops {
            self.pages[page].ops.push(op);
        }
        Ok(())
    }

    /// The report title cut to one header line, with an ellipsis if it was
    /// longer.
    fn running_title(&self, title: &str) -> Result<String, Error> {
        let style = TextStyle::regular(CAPTION_SIZE, Color::MUTED);
        let width = self.geometry.content_width() * RUNNING_TITLE_SHARE;
        let m = self.measure(title, &style, width)?;
        let first = m.lines.first().map(|l| l.text.clone()).unwrap_or_default();
        if m.lines.len() > 1 {
            Ok(format!("{first}\u{2026}"))
        } else {
            Ok(first)
        }
    }

    fn label_width(&self, label: &str, style: &TextStyle) -> Result<f32, Error> {
        let m = self.measure(label, style, self.geometry.content_width())?;
        Ok(m.lines.iter().map(|l| l.width).fold(0.0, f32::max))
    }

    fn stamp(
        &self,
        buf: &mut PageBuf,
        number: usize,
        total: usize,
        running_title: Option<&str>,
        caption: &str,
    ) -> Result<(), Error> {
        let g = self.geometry;
        let style = TextStyle::regular(CAPTION_SIZE, Color::MUTED);
        let left = g.margin;
        let right = g.width - g.margin;

        let header_y = g.margin * HEADER_TEXT_AT;
        if let Some(t) = running_title {
            buf.ops.push(DrawOp::Text {
                x: left,
                y: header_y,
                text: t.to_string(),
                style,
            });
        }

        let label = format!("Page {number} of {total}");
        let label_w = self.label_width(&label, &style)?;
        buf.ops.push(DrawOp::Text {
            x: right - label_w,
            y: header_y,
            text: label,
            style,
        });

        let header_rule_y = g.margin * HEADER_RULE_AT;
        buf.ops.push(DrawOp::Line {
            x1: left,
            y1: header_rule_y,
            x2: right,
            y2: header_rule_y,
            width: RULE_WIDTH,
            color: Color::RULE,
        });

        let footer_rule_y = g.height - g.margin * FOOTER_RULE_AT;
        buf.ops.push(DrawOp::Line {
            x1: left,
            y1: footer_rule_y,
            x2: right,
            y2: footer_rule_y,
            width: RULE_WIDTH,
            color: Color::RULE,
        });

        // Narrow margins would push the caption past the page edge.
        let caption_m = self.measure(caption, &style, g.content_width())?;
        let caption_w = caption_m.lines.iter().map(|l| l.width).fold(0.0, f32::max);
        let caption_y = (g.height - g.margin * FOOTER_TEXT_AT).min(g.height - caption_m.height());
        buf.ops.push(DrawOp::Text {
            x: (g.width - caption_w) / 2.0,
            y: caption_y,
            text: caption.to_string(),
            style,
        });
        Ok(())
    }
}
