//! Positions document blocks on US Letter pages.
//!
//! Coordinates are PDF points with the origin at the bottom-left corner.
//! Text `y` is the baseline. Layout is pure and CPU bound; callers run it
//! inside `spawn_blocking` together with the writer.

use crate::export::document::{Block, ResumeDocument};
use crate::export::font_metrics::{get_metrics, FontMetricTable};
use crate::export::templates::Template;
use crate::models::{PaletteColors, Rgb};

pub const PAGE_WIDTH: f32 = 612.0;
pub const PAGE_HEIGHT: f32 = 792.0;
pub const MARGIN: f32 = 54.0;
const BULLET_INDENT: f32 = 12.0;
const META_GAP: f32 = 12.0;

#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    Text {
        x: f32,
        y: f32,
        size: f32,
        bold: bool,
        color: Rgb,
        text: String,
    },
    Rule {
        x1: f32,
        x2: f32,
        y: f32,
        width: f32,
        color: Rgb,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub ops: Vec<DrawOp>,
}

struct Cursor<'a> {
    template: &'a Template,
    metrics: &'static FontMetricTable,
    colors: PaletteColors,
    pages: Vec<Page>,
    y: f32,
}

impl<'a> Cursor<'a> {
    fn new(template: &'a Template, colors: PaletteColors) -> Self {
        Self {
            template,
            metrics: get_metrics(template.font),
            colors,
            pages: vec![Page { ops: Vec::new() }],
            y: PAGE_HEIGHT - MARGIN,
        }
    }

    fn content_width(&self) -> f32 {
        PAGE_WIDTH - 2.0 * MARGIN
    }

    fn ops(&mut self) -> &mut Vec<DrawOp> {
        let last = self.pages.len() - 1;
        &mut self.pages[last].ops
    }

    /// Moves the baseline down by `advance`, opening a new page when the
    /// line would cross the bottom margin.
    fn advance(&mut self, advance: f32) -> f32 {
        if self.y - advance < MARGIN {
            self.pages.push(Page { ops: Vec::new() });
            self.y = PAGE_HEIGHT - MARGIN;
        }
        self.y -= advance;
        self.y
    }

    fn gap(&mut self, amount: f32) {
        self.y -= amount;
    }

    fn text(&mut self, x: f32, y: f32, size: f32, bold: bool, color: Rgb, text: String) {
        self.ops().push(DrawOp::Text {
            x,
            y,
            size,
            bold,
            color,
            text,
        });
    }

    fn wrapped(&mut self, text: &str, x: f32, width: f32, size: f32, bold: bool, color: Rgb) {
        let leading = size * self.template.line_height;
        for line in self.metrics.wrap(text, width, size, bold) {
            let y = self.advance(leading);
            self.text(x, y, size, bold, color, line);
        }
    }

    fn block(&mut self, block: &Block) {
        let t = self.template;
        let body = t.body_size;
        let width = self.content_width();
        match block {
            Block::Name(name) => {
                let color = if t.accent_headings { self.colors.accent } else { self.colors.text };
                self.wrapped(name, MARGIN, width, t.name_size, true, color);
                self.gap(t.name_size * 0.15);
            }
            Block::Headline(text) => {
                self.wrapped(text, MARGIN, width, body + 1.5, false, self.colors.muted);
            }
            Block::Contact(text) => {
                self.wrapped(text, MARGIN, width, body - 0.5, false, self.colors.muted);
            }
            Block::Paragraph(text) => {
                self.wrapped(text, MARGIN, width, body, false, self.colors.text);
                self.gap(body * 0.3);
            }
            Block::SectionHeading(title) => {
                self.gap(t.heading_size * 0.8);
                let color = if t.accent_headings { self.colors.accent } else { self.colors.text };
                let y = self.advance(t.heading_size * t.line_height);
                self.text(MARGIN, y, t.heading_size, true, color, title.to_uppercase());
                if t.heading_rule {
                    let rule_y = y - t.heading_size * 0.35;
                    self.ops().push(DrawOp::Rule {
                        x1: MARGIN,
                        x2: PAGE_WIDTH - MARGIN,
                        y: rule_y,
                        width: 0.75,
                        color,
                    });
                    self.gap(t.heading_size * 0.35);
                }
                self.gap(body * 0.3);
            }
            Block::EntryHeading { title, meta } => {
                self.gap(body * 0.3);
                let meta_width = if meta.is_empty() {
                    0.0
                } else {
                    self.metrics.width_pt(meta, body, false)
                };
                let title_width = (width - meta_width - META_GAP).max(width / 2.0);
                let lines = self.metrics.wrap(title, title_width, body, true);
                let leading = body * t.line_height;
                for (i, line) in lines.into_iter().enumerate() {
                    let y = self.advance(leading);
                    self.text(MARGIN, y, body, true, self.colors.text, line);
                    if i == 0 && !meta.is_empty() {
                        let x = PAGE_WIDTH - MARGIN - meta_width;
                        self.text(x, y, body, false, self.colors.muted, meta.clone());
                    }
                }
            }
            Block::EntrySubheading(text) => {
                self.wrapped(text, MARGIN, width, body, false, self.colors.muted);
            }
            Block::Bullet(text) => {
                let leading = body * t.line_height;
                let lines = self.metrics.wrap(text, width - BULLET_INDENT, body, false);
                for (i, line) in lines.into_iter().enumerate() {
                    let y = self.advance(leading);
                    if i == 0 {
                        self.text(MARGIN + 2.0, y, body, false, self.colors.accent, "\u{2022}".to_string());
                    }
                    self.text(MARGIN + BULLET_INDENT, y, body, false, self.colors.text, line);
                }
            }
        }
    }
}

/// Lays out the whole document. Always returns at least one page.
pub fn layout_document(doc: &ResumeDocument, template: &Template, colors: PaletteColors) -> Vec<Page> {
    let mut cursor = Cursor::new(template, colors);
    for block in &doc.blocks {
        cursor.block(block);
    }
    cursor.pages
}
