use std::collections::HashSet;

use pdf_writer::{Content, Filter, Name, Pdf, Rect, Ref, Str, TextStr};

use crate::error::Error;
use crate::fonts::{FontSet, RegisteredFont, register_font};
use crate::model::{Color, DrawOp, FontWeight, PagePlan};

struct Fonts {
    regular: RegisteredFont,
    bold: RegisteredFont,
}

impl Fonts {
    fn get(&self, weight: FontWeight) -> &RegisteredFont {
        match weight {
            FontWeight::Regular => &self.regular,
            FontWeight::Bold => &self.bold,
        }
    }
}

/// Fill/stroke state of one content stream, to skip redundant operators.
#[derive(Default)]
struct StreamState {
    fill: Option<Color>,
    stroke: Option<Color>,
    line_width: Option<f32>,
}

/// Write a page plan out as PDF bytes, embedding the faces it was measured with.
pub fn render(plan: &PagePlan, fonts: &FontSet) -> Result<Vec<u8>, Error> {
    let t0 = std::time::Instant::now();
    let mut pdf = Pdf::new();
    let mut next_id = 1i32;
    let mut alloc = || {
        let r = Ref::new(next_id);
        next_id += 1;
        r
    };

    let catalog_id = alloc();
    let pages_id = alloc();

    // Phase 1: collect the characters each face must cover, then embed
    let mut used_regular: HashSet<char> = HashSet::from([' ']);
    let mut used_bold: HashSet<char> = HashSet::from([' ']);
    for op in plan.pages.iter().flat_map(|p| p.ops.iter()) {
        if let DrawOp::Text { text, style, .. } = op {
            match style.weight {
                FontWeight::Regular => used_regular.extend(text.chars()),
                FontWeight::Bold => used_bold.extend(text.chars()),
            }
        }
    }

    let regular = register_font(
        &mut pdf,
        &fonts.regular,
        "F1".to_string(),
        &mut alloc,
        &used_regular,
    )?;
    let bold = register_font(&mut pdf, &fonts.bold, "F2".to_string(), &mut alloc, &used_bold)?;
    let registered = Fonts { regular, bold };
    let t_fonts = t0.elapsed();

    // Phase 2: one content stream per page
    let page_height = plan.geometry.height;
    let mut all_contents: Vec<Content> = Vec::with_capacity(plan.pages.len());
    for page in &plan.pages {
        let mut content = Content::new();
        let mut state = StreamState::default();
        for op in &page.ops {
            draw_op(&mut content, &mut state, op, page_height, &registered);
        }
        all_contents.push(content);
    }
    let t_draw = t0.elapsed();

    // Phase 3: page tree and resources
    let n = all_contents.len();
    let count = i32::try_from(n).map_err(|_| Error::Render(format!("too many pages: {n}")))?;
    let page_ids: Vec<Ref> = (0..n).map(|_| alloc()).collect();
    let content_ids: Vec<Ref> = (0..n).map(|_| alloc()).collect();

    for (i, c) in all_contents.into_iter().enumerate() {
        let raw = c.finish();
        let compressed = miniz_oxide::deflate::compress_to_vec_zlib(raw.as_slice(), 6);
        pdf.stream(content_ids[i], &compressed).filter(Filter::FlateDecode);
    }

    pdf.catalog(catalog_id).pages(pages_id);
    pdf.pages(pages_id)
        .kids(page_ids.iter().copied())
        .count(count);

    let media_box = Rect::new(0.0, 0.0, plan.geometry.width, plan.geometry.height);
    for i in 0..n {
        let mut page = pdf.page(page_ids[i]);
        page.media_box(media_box)
            .parent(pages_id)
            .contents(content_ids[i]);
        let mut resources = page.resources();
        let mut font_dict = resources.fonts();
        for font in [&registered.regular, &registered.bold] {
            font_dict.pair(Name(font.pdf_name.as_bytes()), font.font_ref);
        }
    }

    let info_id = alloc();
    {
        let mut info = pdf.document_info(info_id);
        if let Some(title) = &plan.title {
            info.title(TextStr(title));
        }
        info.producer(TextStr(concat!("report-pdf ", env!("CARGO_PKG_VERSION"))));
    }

    let bytes = pdf.finish();
    log::info!(
        "Render phases: fonts={:.1}ms, draw={:.1}ms, assembly={:.1}ms ({} pages, {} bytes)",
        t_fonts.as_secs_f64() * 1000.0,
        (t_draw - t_fonts).as_secs_f64() * 1000.0,
        (t0.elapsed() - t_draw).as_secs_f64() * 1000.0,
        n,
        bytes.len(),
    );

    Ok(bytes)
}

/// Emit one draw op. Plan coordinates are top-down; PDF user space is
/// bottom-up, so every y is flipped against the page height.
fn draw_op(
    content: &mut Content,
    state: &mut StreamState,
    op: &DrawOp,
    page_height: f32,
    fonts: &Fonts,
) {
    match op {
        DrawOp::Text { x, y, text, style } => {
            if text.is_empty() {
                return;
            }
            let font = fonts.get(style.weight);
            let baseline = page_height - (y + style.size * font.ascender_ratio);
            set_fill(content, state, style.color);
            content.begin_text();
            content.set_font(Name(font.pdf_name.as_bytes()), style.size);
            content.next_line(*x, baseline);
            content.show(Str(&font.encode(text)));
            content.end_text();
        }
        DrawOp::Line {
            x1,
            y1,
            x2,
            y2,
            width,
            color,
        } => {
            if state.stroke != Some(*color) {
                let (r, g, b) = color.to_unit_rgb();
                content.set_stroke_rgb(r, g, b);
                state.stroke = Some(*color);
            }
            if state.line_width != Some(*width) {
                content.set_line_width(*width);
                state.line_width = Some(*width);
            }
            content.move_to(*x1, page_height - y1);
            content.line_to(*x2, page_height - y2);
            content.stroke();
        }
        DrawOp::Rect {
            x,
            y,
            width,
            height,
            fill,
        } => {
            set_fill(content, state, *fill);
            content.rect(*x, page_height - y - height, *width, *height);
            content.fill_nonzero();
        }
    }
}

fn set_fill(content: &mut Content, state: &mut StreamState, color: Color) {
    if state.fill != Some(color) {
        let (r, g, b) = color.to_unit_rgb();
        content.set_fill_rgb(r, g, b);
        state.fill = Some(color);
    }
}
