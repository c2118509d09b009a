//! Minimal PDF 1.4 writer.
//!
//! Output uses the standard Type1 fonts with WinAnsiEncoding, so no font
//! programs are embedded. Content streams are written uncompressed.
//! Object layout: 1 catalog, 2 page tree, 3/4 regular/bold font, 5 info,
//! then a (page, content) object pair per page.

use std::fmt::Write as _;

use crate::export::font_metrics::FontFamily;
use crate::export::layout::{DrawOp, Page, PAGE_HEIGHT, PAGE_WIDTH};

const FIRST_PAGE_OBJ: usize = 6;

/// Maps a character to its WinAnsiEncoding byte. Unmappable characters
/// become `?`.
fn win_ansi(c: char) -> u8 {
    match c {
        ' '..='~' => c as u8,
        '\u{00A0}'..='\u{00FF}' => c as u32 as u8,
        '\u{20AC}' => 0x80,
        '\u{2026}' => 0x85,
        '\u{2018}' => 0x91,
        '\u{2019}' => 0x92,
        '\u{201C}' => 0x93,
        '\u{201D}' => 0x94,
        '\u{2022}' => 0x95,
        '\u{2013}' => 0x96,
        '\u{2014}' => 0x97,
        '\t' | '\n' | '\r' => b' ',
        _ => b'?',
    }
}

/// Encodes `text` as a PDF literal string, parentheses included.
fn literal(text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len() + 2);
    out.push(b'(');
    for c in text.chars() {
        let byte = win_ansi(c);
        if matches!(byte, b'(' | b')' | b'\\') {
            out.push(b'\\');
        }
        out.push(byte);
    }
    out.push(b')');
    out
}

fn content_stream(page: &Page) -> Vec<u8> {
    let mut out = Vec::new();
    for op in &page.ops {
        match op {
            DrawOp::Text {
                x,
                y,
                size,
                bold,
                color,
                text,
            } => {
                let (r, g, b) = color.unit();
                let font = if *bold { "F2" } else { "F1" };
                out.extend_from_slice(
                    format!("BT /{font} {size:.2} Tf {r:.3} {g:.3} {b:.3} rg {x:.2} {y:.2} Td ").as_bytes(),
                );
                out.extend(literal(text));
                out.extend_from_slice(b" Tj ET\n");
            }
            DrawOp::Rule {
                x1,
                x2,
                y,
                width,
                color,
            } => {
                let (r, g, b) = color.unit();
                out.extend_from_slice(
                    format!("{r:.3} {g:.3} {b:.3} RG {width:.2} w {x1:.2} {y:.2} m {x2:.2} {y:.2} l S\n")
                        .as_bytes(),
                );
            }
        }
    }
    out
}

struct PdfBuilder {
    buf: Vec<u8>,
    offsets: Vec<usize>,
}

impl PdfBuilder {
    fn new() -> Self {
        let mut buf = Vec::new();
        buf.extend_from_slice(b"%PDF-1.4\n%\xE2\xE3\xCF\xD3\n");
        Self {
            buf,
            offsets: Vec::new(),
        }
    }

    /// Appends object `id`. Objects must be added in id order.
    fn object(&mut self, id: usize, body: &[u8]) {
        debug_assert_eq!(id, self.offsets.len() + 1);
        self.offsets.push(self.buf.len());
        self.buf.extend_from_slice(format!("{id} 0 obj\n").as_bytes());
        self.buf.extend_from_slice(body);
        self.buf.extend_from_slice(b"\nendobj\n");
    }

    fn stream(&mut self, id: usize, data: &[u8]) {
        let mut body = format!("<< /Length {} >>\nstream\n", data.len()).into_bytes();
        body.extend_from_slice(data);
        body.extend_from_slice(b"\nendstream");
        self.object(id, &body);
    }

    fn finish(mut self, root: usize, info: usize) -> Vec<u8> {
        let xref_at = self.buf.len();
        let size = self.offsets.len() + 1;
        let mut xref = format!("xref\n0 {size}\n0000000000 65535 f \n");
        for offset in &self.offsets {
            let _ = write!(xref, "{offset:010} 00000 n \n");
        }
        let _ = write!(
            xref,
            "trailer\n<< /Size {size} /Root {root} 0 R /Info {info} 0 R >>\nstartxref\n{xref_at}\n%%EOF\n"
        );
        self.buf.extend_from_slice(xref.as_bytes());
        self.buf
    }
}

/// Serializes laid-out pages into a complete PDF file.
pub fn write_pdf(pages: &[Page], font: FontFamily, title: &str) -> Vec<u8> {
    let (regular, bold) = font.base_fonts();
    let mut pdf = PdfBuilder::new();

    let kids: Vec<String> = (0..pages.len())
        .map(|i| format!("{} 0 R", FIRST_PAGE_OBJ + 2 * i))
        .collect();

    pdf.object(1, b"<< /Type /Catalog /Pages 2 0 R >>");
    pdf.object(
        2,
        format!("<< /Type /Pages /Kids [{}] /Count {} >>", kids.join(" "), pages.len()).as_bytes(),
    );
    for (id, base) in [(3, regular), (4, bold)] {
        pdf.object(
            id,
            format!("<< /Type /Font /Subtype /Type1 /BaseFont /{base} /Encoding /WinAnsiEncoding >>")
                .as_bytes(),
        );
    }
    let mut info = b"<< /Producer (folio) /Title ".to_vec();
    info.extend(literal(title));
    info.extend_from_slice(b" >>");
    pdf.object(5, &info);

    for (i, page) in pages.iter().enumerate() {
        let page_id = FIRST_PAGE_OBJ + 2 * i;
        let content_id = page_id + 1;
        pdf.object(
            page_id,
            format!(
                "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {PAGE_WIDTH} {PAGE_HEIGHT}] \
                 /Resources << /Font << /F1 3 0 R /F2 4 0 R >> >> /Contents {content_id} 0 R >>"
            )
            .as_bytes(),
        );
        pdf.stream(content_id, &content_stream(page));
    }

    pdf.finish(1, 5)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Rgb;

    fn page_with(text: &str) -> Page {
        Page {
            ops: vec![DrawOp::Text {
                x: 54.0,
                y: 700.0,
                size: 12.0,
                bold: false,
                color: Rgb(0, 0, 0),
                text: text.to_string(),
            }],
        }
    }

    #[test]
    fn test_literal_escapes_delimiters() {
        assert_eq!(literal("a(b)c\\"), b"(a\\(b\\)c\\\\)".to_vec());
    }

    #[test]
    fn test_win_ansi_mapping() {
        assert_eq!(win_ansi('é'), 0xE9);
        assert_eq!(win_ansi('\u{2022}'), 0x95);
        assert_eq!(win_ansi('\u{4E2D}'), b'?');
    }

    #[test]
    fn test_xref_offsets_point_at_objects() {
        let bytes = write_pdf(&[page_with("Hello"), page_with("World")], FontFamily::Helvetica, "T");
        let text = String::from_utf8_lossy(&bytes).into_owned();
        assert!(bytes.starts_with(b"%PDF-1.4"));
        assert!(text.ends_with("%%EOF\n"));

        let startxref: usize = text
            .rsplit("startxref\n")
            .next()
            .and_then(|tail| tail.lines().next())
            .and_then(|n| n.parse().ok())
            .unwrap();
        assert!(bytes[startxref..].starts_with(b"xref"));

        let xref = &text[text.find("xref\n").unwrap()..];
        let entries: Vec<usize> = xref
            .lines()
            .skip(3)
            .take_while(|l| l.ends_with(" n "))
            .map(|l| l[..10].parse().unwrap())
            .collect();
        // Catalog, pages, two fonts, info, and two objects per page.
        assert_eq!(entries.len(), 9);
        for (i, offset) in entries.iter().enumerate() {
            let expected = format!("{} 0 obj", i + 1);
            assert!(bytes[*offset..].starts_with(expected.as_bytes()), "object {}", i + 1);
        }
    }

    #[test]
    fn test_stream_length_matches_content() {
        let page = page_with("Length check");
        let stream = content_stream(&page);
        let bytes = write_pdf(&[page], FontFamily::Times, "T");
        let text = String::from_utf8_lossy(&bytes).into_owned();
        assert!(text.contains(&format!("/Length {}", stream.len())));
        assert!(text.contains("/BaseFont /Times-Roman"));
    }

    #[test]
    fn test_text_is_extractable() {
        let bytes = write_pdf(&[page_with("Ada Lovelace")], FontFamily::Helvetica, "Ada");
        let extracted = pdf_extract::extract_text_from_mem(&bytes).unwrap();
        assert!(extracted.contains("Ada Lovelace"), "extracted: {extracted:?}");
    }
}
