// Export pipeline: resume documents (PDF, DOCX) rendered in-process, banner
// images captured from a headless browser.
// Document rendering is CPU bound and runs inside tokio::task::spawn_blocking.

pub mod banner;
pub mod browser;
pub mod document;
pub mod docx;
pub mod font_metrics;
pub mod handlers;
pub mod job;
pub mod labels;
pub mod layout;
pub mod orchestrator;
pub mod pdf;
pub mod templates;

pub use job::{ExportFormat, ExportJob, ExportState};
pub use orchestrator::{capture_banner, export_document, ExportError, ExportOptions};
pub use templates::TemplateId;

/// Escapes text for XML and HTML content and attribute values.
/// Characters XML 1.0 forbids are dropped.
pub(crate) fn escape_markup(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c if (c as u32) < 0x20 && !matches!(c, '\t' | '\n' | '\r') => {}
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_markup() {
        assert_eq!(escape_markup("R&D <x> \"q\""), "R&amp;D &lt;x&gt; &quot;q&quot;");
        assert_eq!(escape_markup("it's"), "it&#39;s");
        assert_eq!(escape_markup("a\u{0007}b"), "ab");
    }
}
