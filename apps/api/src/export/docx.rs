//! WordprocessingML (DOCX) export.
//!
//! Writes the smallest package Word and LibreOffice open without repair:
//! content types, package relationships, the main document and a style part.

use std::io::{Cursor, Write};

use zip::result::ZipResult;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::export::document::{Block, ResumeDocument};
use crate::export::escape_markup;
use crate::export::templates::Template;
use crate::models::PaletteColors;

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
<Default Extension="xml" ContentType="application/xml"/>
<Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/>
<Override PartName="/word/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml"/>
</Types>"#;

const PACKAGE_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/>
</Relationships>"#;

const DOCUMENT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>
</Relationships>"#;

const W_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

/// Letter page, 0.75in margins, in twentieths of a point.
const SECT_PR: &str = r#"<w:sectPr><w:pgSz w:w="12240" w:h="15840"/><w:pgMar w:top="1080" w:right="1080" w:bottom="1080" w:left="1080" w:header="720" w:footer="720" w:gutter="0"/></w:sectPr>"#;
const RIGHT_TAB_POS: u32 = 12240 - 2 * 1080;

struct RunStyle<'a> {
    size_pt: f32,
    bold: bool,
    color: &'a str,
}

fn run(text: &str, style: &RunStyle<'_>) -> String {
    let half_points = (style.size_pt * 2.0).round() as u32;
    let bold = if style.bold { "<w:b/>" } else { "" };
    format!(
        r#"<w:r><w:rPr>{bold}<w:color w:val="{}"/><w:sz w:val="{half_points}"/></w:rPr><w:t xml:space="preserve">{}</w:t></w:r>"#,
        style.color,
        escape_markup(text)
    )
}

fn paragraph(props: &str, runs: &str) -> String {
    format!("<w:p><w:pPr>{props}</w:pPr>{runs}</w:p>")
}

fn document_xml(doc: &ResumeDocument, template: &Template, colors: PaletteColors) -> String {
    let accent = colors.accent.hex();
    let text = colors.text.hex();
    let muted = colors.muted.hex();
    let heading_color = if template.accent_headings { &accent } else { &text };
    let body = template.body_size;
    let spacing = |after: u32| format!(r#"<w:spacing w:before="0" w:after="{after}"/>"#);

    let mut out = format!(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:document xmlns:w="{W_NS}"><w:body>"#);
    for block in &doc.blocks {
        let p = match block {
            Block::Name(name) => paragraph(
                &spacing(80),
                &run(name, &RunStyle { size_pt: template.name_size, bold: true, color: heading_color }),
            ),
            Block::Headline(s) => paragraph(
                &spacing(40),
                &run(s, &RunStyle { size_pt: body + 1.5, bold: false, color: &muted }),
            ),
            Block::Contact(s) => paragraph(
                &spacing(40),
                &run(s, &RunStyle { size_pt: body - 0.5, bold: false, color: &muted }),
            ),
            Block::Paragraph(s) => paragraph(
                &spacing(80),
                &run(s, &RunStyle { size_pt: body, bold: false, color: &text }),
            ),
            Block::SectionHeading(title) => {
                let border = if template.heading_rule {
                    format!(r#"<w:pBdr><w:bottom w:val="single" w:sz="6" w:space="1" w:color="{heading_color}"/></w:pBdr>"#)
                } else {
                    String::new()
                };
                paragraph(
                    &format!(r#"<w:keepNext/>{border}<w:spacing w:before="240" w:after="80"/>"#),
                    &run(
                        &title.to_uppercase(),
                        &RunStyle { size_pt: template.heading_size, bold: true, color: heading_color },
                    ),
                )
            }
            Block::EntryHeading { title, meta } => {
                let mut runs = run(title, &RunStyle { size_pt: body, bold: true, color: &text });
                if !meta.is_empty() {
                    runs.push_str("<w:r><w:tab/></w:r>");
                    runs.push_str(&run(meta, &RunStyle { size_pt: body, bold: false, color: &muted }));
                }
                paragraph(
                    &format!(
                        r#"<w:keepNext/><w:tabs><w:tab w:val="right" w:pos="{RIGHT_TAB_POS}"/></w:tabs><w:spacing w:before="80" w:after="0"/>"#
                    ),
                    &runs,
                )
            }
            Block::EntrySubheading(s) => paragraph(
                &spacing(20),
                &run(s, &RunStyle { size_pt: body, bold: false, color: &muted }),
            ),
            Block::Bullet(s) => paragraph(
                r#"<w:ind w:left="360" w:hanging="240"/><w:spacing w:before="0" w:after="20"/>"#,
                &run(&format!("\u{2022}\t{s}"), &RunStyle { size_pt: body, bold: false, color: &text }),
            ),
        };
        out.push_str(&p);
    }
    out.push_str(SECT_PR);
    out.push_str("</w:body></w:document>");
    out
}

fn styles_xml(template: &Template) -> String {
    let font = template.font.docx_name();
    let half_points = (template.body_size * 2.0).round() as u32;
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:styles xmlns:w="{W_NS}"><w:docDefaults><w:rPrDefault><w:rPr><w:rFonts w:ascii="{font}" w:hAnsi="{font}" w:cs="{font}"/><w:sz w:val="{half_points}"/></w:rPr></w:rPrDefault><w:pPrDefault><w:pPr><w:spacing w:after="0" w:line="{line}" w:lineRule="auto"/></w:pPr></w:pPrDefault></w:docDefaults><w:style w:type="paragraph" w:default="1" w:styleId="Normal"><w:name w:val="Normal"/></w:style></w:styles>"#,
        line = (template.line_height * 240.0).round() as u32,
    )
}

/// Serializes the document into DOCX bytes.
pub fn write_docx(doc: &ResumeDocument, template: &Template, colors: PaletteColors) -> ZipResult<Vec<u8>> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let parts = [
        ("[Content_Types].xml", CONTENT_TYPES.to_string()),
        ("_rels/.rels", PACKAGE_RELS.to_string()),
        ("word/_rels/document.xml.rels", DOCUMENT_RELS.to_string()),
        ("word/document.xml", document_xml(doc, template, colors)),
        ("word/styles.xml", styles_xml(template)),
    ];
    for (name, body) in parts {
        zip.start_file(name, options)?;
        zip.write_all(body.as_bytes())?;
    }

    Ok(zip.finish()?.into_inner())
}
