//! Static font-metric tables for the PDF standard Type1 fonts.
//!
//! Widths are in em units (AFM widths / 1000). Tables cover ASCII
//! 0x20..=0x7E (95 printable characters); index = (char as usize) - 32.
//! Bold faces are not tabulated; they are measured as the regular face
//! widened by `BOLD_FACTOR`, which overestimates slightly and so never
//! lets a bold line overflow.

use serde::{Deserialize, Serialize};

const BOLD_FACTOR: f32 = 1.06;

/// Font families available to export templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FontFamily {
    /// Helvetica / Helvetica-Bold.
    Helvetica,
    /// Times-Roman / Times-Bold.
    Times,
}

impl FontFamily {
    /// PostScript base font names for the regular and bold face.
    pub fn base_fonts(&self) -> (&'static str, &'static str) {
        match self {
            FontFamily::Helvetica => ("Helvetica", "Helvetica-Bold"),
            FontFamily::Times => ("Times-Roman", "Times-Bold"),
        }
    }

    /// Font family name written into DOCX run properties.
    pub fn docx_name(&self) -> &'static str {
        match self {
            FontFamily::Helvetica => "Arial",
            FontFamily::Times => "Times New Roman",
        }
    }
}

/// Static character-width table for a font family.
///
/// Width array slot layout:
/// ```text
/// [0]=sp  [1]=!   [2]="   [3]=#   [4]=$   [5]=%   [6]=&   [7]='
/// [8]=(   [9]=)   [10]=*  [11]=+  [12]=,  [13]=-  [14]=.  [15]=/
/// [16..25]=0-9
/// [26]=:  [27]=;  [28]=<  [29]==  [30]=>  [31]=?  [32]=@
/// [33..58]=A-Z
/// [59]=[  [60]=\  [61]=]  [62]=^  [63]=_  [64]=`
/// [65..90]=a-z
/// [91]={  [92]=|  [93]=}  [94]=~
/// ```
pub struct FontMetricTable {
    pub font: FontFamily,
    widths: [f32; 95],
    /// Fallback width for non-ASCII characters.
    pub average_char_width: f32,
    pub space_width: f32,
}

impl FontMetricTable {
    /// Width of `s` in em units.
    pub fn measure_str(&self, s: &str) -> f32 {
        s.chars()
            .map(|c| {
                let code = c as usize;
                if (32..=126).contains(&code) {
                    self.widths[code - 32]
                } else {
                    self.average_char_width
                }
            })
            .sum()
    }

    /// Width of `s` in points at `size_pt`.
    pub fn width_pt(&self, s: &str, size_pt: f32, bold: bool) -> f32 {
        let factor = if bold { BOLD_FACTOR } else { 1.0 };
        self.measure_str(s) * size_pt * factor
    }

    /// Greedy word wrap of `text` into lines no wider than `max_width_pt`.
    ///
    /// Words wider than a full line are hard-broken at character boundaries.
    /// Whitespace runs collapse to a single space; empty input yields no lines.
    pub fn wrap(&self, text: &str, max_width_pt: f32, size_pt: f32, bold: bool) -> Vec<String> {
        let mut lines = Vec::new();
        let mut current = String::new();

        for word in text.split_whitespace() {
            let candidate = if current.is_empty() {
                word.to_string()
            } else {
                format!("{current} {word}")
            };
            if self.width_pt(&candidate, size_pt, bold) <= max_width_pt {
                current = candidate;
                continue;
            }

            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            if self.width_pt(word, size_pt, bold) <= max_width_pt {
                current = word.to_string();
            } else {
                for piece in self.hard_break(word, max_width_pt, size_pt, bold) {
                    if !current.is_empty() {
                        lines.push(std::mem::take(&mut current));
                    }
                    current = piece;
                }
            }
        }

        if !current.is_empty() {
            lines.push(current);
        }
        lines
    }

    fn hard_break(&self, word: &str, max_width_pt: f32, size_pt: f32, bold: bool) -> Vec<String> {
        let mut pieces = Vec::new();
        let mut piece = String::new();
        for c in word.chars() {
            piece.push(c);
            if piece.chars().count() > 1 && self.width_pt(&piece, size_pt, bold) > max_width_pt {
                piece.pop();
                pieces.push(std::mem::take(&mut piece));
                piece.push(c);
            }
        }
        if !piece.is_empty() {
            pieces.push(piece);
        }
        pieces
    }
}

static HELVETICA_TABLE: FontMetricTable = FontMetricTable {
    font: FontFamily::Helvetica,
    #[rustfmt::skip]
    widths: [
        // sp     !      "      #      $      %      &      '      (      )      *      +      ,      -      .      /
        0.278, 0.278, 0.355, 0.556, 0.556, 0.889, 0.667, 0.191, 0.333, 0.333, 0.389, 0.584, 0.278, 0.333, 0.278, 0.278,
        // 0      1      2      3      4      5      6      7      8      9
        0.556, 0.556, 0.556, 0.556, 0.556, 0.556, 0.556, 0.556, 0.556, 0.556,
        // :      ;      <      =      >      ?      @
        0.278, 0.278, 0.584, 0.584, 0.584, 0.556, 1.015,
        // A      B      C      D      E      F      G      H      I      J      K      L      M
        0.667, 0.667, 0.722, 0.722, 0.667, 0.611, 0.778, 0.722, 0.278, 0.500, 0.667, 0.556, 0.833,
        // N      O      P      Q      R      S      T      U      V      W      X      Y      Z
        0.722, 0.778, 0.667, 0.778, 0.722, 0.667, 0.611, 0.722, 0.667, 0.944, 0.667, 0.667, 0.611,
        // [      \      ]      ^      _      `
        0.278, 0.278, 0.278, 0.469, 0.556, 0.333,
        // a      b      c      d      e      f      g      h      i      j      k      l      m
        0.556, 0.556, 0.500, 0.556, 0.556, 0.278, 0.556, 0.556, 0.222, 0.222, 0.500, 0.222, 0.833,
        // n      o      p      q      r      s      t      u      v      w      x      y      z
        0.556, 0.556, 0.556, 0.556, 0.333, 0.500, 0.278, 0.556, 0.500, 0.722, 0.500, 0.500, 0.500,
        // {      |      }      ~
        0.334, 0.260, 0.334, 0.584,
    ],
    average_char_width: 0.556,
    space_width: 0.278,
};

static TIMES_TABLE: FontMetricTable = FontMetricTable {
    font: FontFamily::Times,
    #[rustfmt::skip]
    widths: [
        // sp     !      "      #      $      %      &      '      (      )      *      +      ,      -      .      /
        0.250, 0.333, 0.408, 0.500, 0.500, 0.833, 0.778, 0.180, 0.333, 0.333, 0.500, 0.564, 0.250, 0.333, 0.250, 0.278,
        // 0      1      2      3      4      5      6      7      8      9
        0.500, 0.500, 0.500, 0.500, 0.500, 0.500, 0.500, 0.500, 0.500, 0.500,
        // :      ;      <      =      >      ?      @
        0.278, 0.278, 0.564, 0.564, 0.564, 0.444, 0.921,
        // A      B      C      D      E      F      G      H      I      J      K      L      M
        0.722, 0.667, 0.667, 0.722, 0.611, 0.556, 0.722, 0.722, 0.333, 0.389, 0.722, 0.611, 0.889,
        // N      O      P      Q      R      S      T      U      V      W      X      Y      Z
        0.722, 0.722, 0.556, 0.722, 0.667, 0.556, 0.611, 0.722, 0.722, 0.944, 0.722, 0.722, 0.611,
        // [      \      ]      ^      _      `
        0.333, 0.278, 0.333, 0.469, 0.500, 0.333,
        // a      b      c      d      e      f      g      h      i      j      k      l      m
        0.444, 0.500, 0.444, 0.500, 0.444, 0.333, 0.500, 0.500, 0.278, 0.278, 0.500, 0.278, 0.778,
        // n      o      p      q      r      s      t      u      v      w      x      y      z
        0.500, 0.500, 0.500, 0.500, 0.333, 0.389, 0.278, 0.500, 0.500, 0.722, 0.500, 0.500, 0.444,
        // {      |      }      ~
        0.480, 0.200, 0.480, 0.541,
    ],
    average_char_width: 0.500,
    space_width: 0.250,
};

/// Returns the static metric table for a given font family.
pub fn get_metrics(font: FontFamily) -> &'static FontMetricTable {
    match font {
        FontFamily::Helvetica => &HELVETICA_TABLE,
        FontFamily::Times => &TIMES_TABLE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_measure_str_empty_returns_zero() {
        assert_eq!(get_metrics(FontFamily::Helvetica).measure_str(""), 0.0);
    }

    #[test]
    fn test_measure_str_ascii_characters() {
        let metrics = get_metrics(FontFamily::Helvetica);
        // R(0.722) + u(0.556) + s(0.500) + t(0.278)
        let width = metrics.measure_str("Rust");
        assert!((width - 2.056).abs() < 1e-3, "got {width}");
    }

    #[test]
    fn test_non_ascii_falls_back_to_average() {
        let metrics = get_metrics(FontFamily::Times);
        assert!((metrics.measure_str("é") - metrics.average_char_width).abs() < 1e-4);
    }

    #[test]
    fn test_times_is_narrower_than_helvetica() {
        let text = "Architected distributed caching layer";
        assert!(
            get_metrics(FontFamily::Times).measure_str(text)
                < get_metrics(FontFamily::Helvetica).measure_str(text)
        );
    }

    #[test]
    fn test_bold_is_wider() {
        let m = get_metrics(FontFamily::Helvetica);
        assert!(m.width_pt("Heading", 12.0, true) > m.width_pt("Heading", 12.0, false));
    }

    #[test]
    fn test_wrap_respects_width() {
        let m = get_metrics(FontFamily::Helvetica);
        let text = "Architected a distributed caching layer using consistent hashing, \
                    reducing p99 latency by 40% under peak load";
        let lines = m.wrap(text, 200.0, 10.0, false);
        assert!(lines.len() >= 2);
        for line in &lines {
            assert!(m.width_pt(line, 10.0, false) <= 200.0, "overflowing line: {line}");
        }
        assert_eq!(lines.join(" "), text.split_whitespace().collect::<Vec<_>>().join(" "));
    }

    #[test]
    fn test_wrap_hard_breaks_long_words() {
        let m = get_metrics(FontFamily::Helvetica);
        let word = "x".repeat(80);
        let lines = m.wrap(&word, 100.0, 10.0, false);
        assert!(lines.len() > 1);
        assert_eq!(lines.concat(), word);
    }

    #[test]
    fn test_wrap_empty_text_has_no_lines() {
        assert!(get_metrics(FontFamily::Times).wrap("   ", 100.0, 10.0, false).is_empty());
    }
}
