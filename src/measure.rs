use crate::error::Error;
use crate::model::TextStyle;

#[derive(Clone, Debug, PartialEq)]
pub struct MeasuredLine {
    pub text: String,
    pub width: f32,
}

/// Wrapped lines of one text block plus the line pitch used to stack them.
#[derive(Clone, Debug, PartialEq)]
pub struct MeasuredText {
    pub lines: Vec<MeasuredLine>,
    pub line_height: f32,
}

impl MeasuredText {
    pub fn height(&self) -> f32 {
        self.lines.len() as f32 * self.line_height
    }
}

/// Computes line breaks and line height for text set in a given style.
pub trait TextMeasurer {
    fn measure(
        &self,
        text: &str,
        style: &TextStyle,
        max_width: f32,
    ) -> Result<MeasuredText, Error>;
}

impl<T: TextMeasurer + ?Sized> TextMeasurer for &T {
    fn measure(
        &self,
        text: &str,
        style: &TextStyle,
        max_width: f32,
    ) -> Result<MeasuredText, Error> {
        (**self).measure(text, style, max_width)
    }
}

pub(crate) fn check_args(style: &TextStyle, max_width: f32) -> Result<(), Error> {
    if !max_width.is_finite() || max_width <= 0.0 {
        return Err(Error::Measure(format!("invalid wrap width {max_width}")));
    }
    if !style.size.is_finite() || style.size <= 0.0 {
        return Err(Error::Measure(format!("invalid font size {}", style.size)));
    }
    Ok(())
}

/// Greedy word wrap. `char_width` gives the advance of one character at the
/// target size. Explicit newlines always break; words wider than the line are
/// broken between characters.
pub(crate) fn wrap_text(
    text: &str,
    max_width: f32,
    char_width: impl Fn(char) -> f32,
) -> Vec<MeasuredLine> {
    let word_width = |w: &str| -> f32 { w.chars().map(&char_width).sum() };
    let space_w = char_width(' ');
    let mut lines = Vec::new();

    for source_line in text.split('\n') {
        let mut current = String::new();
        let mut current_w: f32 = 0.0;

        for word in source_line.split_whitespace() {
            let ww = word_width(word);
            let proposed = if current.is_empty() {
                ww
            } else {
                current_w + space_w + ww
            };

            if proposed <= max_width {
                if !current.is_empty() {
                    current.push(' ');
                }
                current.push_str(word);
                current_w = proposed;
                continue;
            }

            if !current.is_empty() {
                lines.push(MeasuredLine {
                    text: std::mem::take(&mut current),
                    width: current_w,
                });
                current_w = 0.0;
            }

            if ww <= max_width {
                current.push_str(word);
                current_w = ww;
                continue;
            }

            // Overlong word: hard-break between characters.
            for ch in word.chars() {
                let cw = char_width(ch);
                if !current.is_empty() && current_w + cw > max_width {
                    lines.push(MeasuredLine {
                        text: std::mem::take(&mut current),
                        width: current_w,
                    });
                    current_w = 0.0;
                }
                current.push(ch);
                current_w += cw;
            }
        }

        lines.push(MeasuredLine {
            text: current,
            width: current_w,
        });
    }

    lines
}
