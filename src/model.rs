/// A report split into its logical parts. Every field is optional: the
/// parser omits whatever it could not find.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StructuredReport {
    pub title: Option<String>,
    pub introduction: Option<String>,
    pub body: Option<String>,
    pub conclusion: Option<String>,
    pub sources: Option<Vec<String>>,
}

impl StructuredReport {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.present_sections().is_empty()
    }

    /// Present sections in document order (Introduction, Main Content,
    /// Conclusion, References).
    pub fn present_sections(&self) -> Vec<SectionKind> {
        SectionKind::ALL
            .into_iter()
            .filter(|kind| match kind {
                SectionKind::Introduction => self.introduction.is_some(),
                SectionKind::Body => self.body.is_some(),
                SectionKind::Conclusion => self.conclusion.is_some(),
                SectionKind::Sources => self.sources.is_some(),
            })
            .collect()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SectionKind {
    Introduction,
    Body,
    Conclusion,
    Sources,
}

impl SectionKind {
    pub const ALL: [SectionKind; 4] = [
        SectionKind::Introduction,
        SectionKind::Body,
        SectionKind::Conclusion,
        SectionKind::Sources,
    ];

    pub fn heading(self) -> &'static str {
        match self {
            SectionKind::Introduction => "Introduction",
            SectionKind::Body => "Main Content",
            SectionKind::Conclusion => "Conclusion",
            SectionKind::Sources => "References",
        }
    }
}

/// Portrait page size and uniform margin, in PDF points.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PageGeometry {
    pub width: f32,
    pub height: f32,
    pub margin: f32,
}

impl Default for PageGeometry {
    fn default() -> Self {
        Self::a4()
    }
}

impl PageGeometry {
    pub fn new(width: f32, height: f32, margin: f32) -> Self {
        Self {
            width,
            height,
            margin,
        }
    }

    /// ISO A4 with 20 mm margins.
    pub fn a4() -> Self {
        Self::new(595.28, 841.89, 56.69)
    }

    /// US Letter with 1 inch margins.
    pub fn letter() -> Self {
        Self::new(612.0, 792.0, 72.0)
    }

    pub fn content_width(&self) -> f32 {
        self.width - 2.0 * self.margin
    }

    pub fn content_height(&self) -> f32 {
        self.height - 2.0 * self.margin
    }

    /// Lowest y (top-down) that body content may reach.
    pub fn bottom_limit(&self) -> f32 {
        self.height - self.margin
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Color(pub [u8; 3]);

impl Color {
    pub const TEXT: Color = Color([33, 37, 41]);
    pub const ACCENT: Color = Color([31, 78, 121]);
    pub const MUTED: Color = Color([108, 117, 125]);
    pub const RULE: Color = Color([200, 205, 210]);

    pub fn to_unit_rgb(self) -> (f32, f32, f32) {
        let [r, g, b] = self.0;
        (r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FontWeight {
    Regular,
    Bold,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TextStyle {
    pub size: f32,
    pub weight: FontWeight,
    pub color: Color,
}

impl TextStyle {
    pub fn regular(size: f32, color: Color) -> Self {
        Self {
            size,
            weight: FontWeight::Regular,
            color,
        }
    }

    pub fn bold(size: f32, color: Color) -> Self {
        Self {
            size,
            weight: FontWeight::Bold,
            color,
        }
    }
}

/// A positioned drawing instruction. Coordinates are top-down from the
/// page's top-left corner; `Text::y` is the top of the line box.
#[derive(Clone, Debug, PartialEq)]
pub enum DrawOp {
    Text {
        x: f32,
        y: f32,
        text: String,
        style: TextStyle,
    },
    Line {
        x1: f32,
        y1: f32,
        x2: f32,
        y2: f32,
        width: f32,
        color: Color,
    },
    Rect {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        fill: Color,
    },
}

impl DrawOp {
    pub fn text(&self) -> Option<&str> {
        match self {
            DrawOp::Text { text, .. } => Some(text),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PageKind {
    Title,
    Content,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Page {
    pub kind: PageKind,
    /// 1-based index among content pages; `None` on the title page.
    pub page_number: Option<usize>,
    /// Final number of content pages in the plan.
    pub total_pages: usize,
    pub ops: Vec<DrawOp>,
}

impl Page {
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.ops.iter().filter_map(DrawOp::text)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct PagePlan {
    pub geometry: PageGeometry,
    pub title: Option<String>,
    pub pages: Vec<Page>,
}

impl PagePlan {
    pub fn content_pages(&self) -> impl Iterator<Item = &Page> {
        self.pages.iter().filter(|p| p.kind == PageKind::Content)
    }

    pub fn content_page_count(&self) -> usize {
        self.content_pages().count()
    }
}
