//! Virtual printer that renders laid-out pages into a PDF document.

mod table;

use std::collections::HashSet;

use pdf_writer::{Content, Filter, Name, Pdf, Rect, Ref, Str};

use crate::config::ReportStyle;
use crate::content::{ContentBlock, PatientInfo};
use crate::error::Error;
use crate::fonts::{FontSet, register_font};
use crate::layout::{Page, PageGeometry, TextBlockLayout, TextMeasurer};
use crate::print::Printer;

const RULE_WIDTH: f32 = 0.5;
const HEADER_SHADE: f32 = 0.9;

enum DrawOp {
    Text {
        bold: bool,
        size: f32,
        x: f32,
        y: f32,
        text: String,
    },
    Rule {
        from: (f32, f32),
        to: (f32, f32),
    },
    Shade {
        x: f32,
        y: f32,
        w: f32,
        h: f32,
    },
}

/// Drawing operations of one page, in PDF user space (origin bottom-left).
struct Canvas<'u> {
    ops: Vec<DrawOp>,
    /// Characters drawn per face (regular, bold); fonts are subset to these.
    used_chars: &'u mut [HashSet<char>; 2],
}

impl Canvas<'_> {
    fn text(&mut self, bold: bool, size: f32, x: f32, y: f32, text: &str) {
        if text.is_empty() {
            return;
        }
        self.used_chars[bold as usize].extend(text.chars());
        self.ops.push(DrawOp::Text {
            bold,
            size,
            x,
            y,
            text: text.to_string(),
        });
    }

    fn rule(&mut self, from: (f32, f32), to: (f32, f32)) {
        self.ops.push(DrawOp::Rule { from, to });
    }

    fn shade(&mut self, x: f32, y: f32, w: f32, h: f32) {
        self.ops.push(DrawOp::Shade { x, y, w, h });
    }
}

struct DrawnPage {
    width: f32,
    height: f32,
    ops: Vec<DrawOp>,
}

/// Accepts pages from the dispatcher and produces a PDF on [`finish`].
///
/// Pages are drawn with the same [`TextMeasurer`] layouts the flow engine
/// measured, so row heights on paper match the pagination.
///
/// [`finish`]: PdfPrinter::finish
pub struct PdfPrinter<'a> {
    measurer: TextMeasurer<'a>,
    pages: Vec<DrawnPage>,
    used_chars: [HashSet<char>; 2],
}

impl<'a> PdfPrinter<'a> {
    pub fn new(fonts: &'a FontSet, style: &'a ReportStyle) -> Self {
        Self {
            measurer: TextMeasurer::new(fonts, style),
            pages: Vec::new(),
            used_chars: [HashSet::new(), HashSet::new()],
        }
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn finish(self) -> Result<Vec<u8>, Error> {
        if self.pages.is_empty() {
            return Err(Error::Pdf("no pages were printed".into()));
        }
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

        let font_set = self.measurer.fonts();
        let fonts = [
            register_font(&mut pdf, &font_set.regular, "F1".into(), &self.used_chars[0], &mut alloc),
            register_font(&mut pdf, &font_set.bold, "F2".into(), &self.used_chars[1], &mut alloc),
        ];
        let t_fonts = t0.elapsed();

        let n = self.pages.len();
        let page_ids: Vec<Ref> = (0..n).map(|_| alloc()).collect();
        let content_ids: Vec<Ref> = (0..n).map(|_| alloc()).collect();

        for (i, drawn) in self.pages.iter().enumerate() {
            let mut content = Content::new();
            for op in &drawn.ops {
                match op {
                    DrawOp::Text {
                        bold,
                        size,
                        x,
                        y,
                        text,
                    } => {
                        let font = &fonts[*bold as usize];
                        content
                            .begin_text()
                            .set_font(Name(font.pdf_name.as_bytes()), *size)
                            .next_line(*x, *y)
                            .show(Str(&font.encode(text)));
                        content.end_text();
                    }
                    DrawOp::Rule { from, to } => {
                        content.save_state();
                        content.set_line_width(RULE_WIDTH);
                        content.move_to(from.0, from.1);
                        content.line_to(to.0, to.1);
                        content.stroke();
                        content.restore_state();
                    }
                    DrawOp::Shade { x, y, w, h } => {
                        content.save_state();
                        content.set_fill_gray(HEADER_SHADE);
                        content.rect(*x, *y, *w, *h);
                        content.fill_nonzero();
                        content.restore_state();
                    }
                }
            }
            let raw = content.finish();
            let compressed = miniz_oxide::deflate::compress_to_vec_zlib(raw.as_slice(), 6);
            pdf.stream(content_ids[i], &compressed).filter(Filter::FlateDecode);
        }

        pdf.catalog(catalog_id).pages(pages_id);
        pdf.pages(pages_id)
            .kids(page_ids.iter().copied())
            .count(n as i32);

        for (i, drawn) in self.pages.iter().enumerate() {
            let mut page = pdf.page(page_ids[i]);
            page.media_box(Rect::new(0.0, 0.0, drawn.width, drawn.height))
                .parent(pages_id)
                .contents(content_ids[i]);
            let mut resources = page.resources();
            let mut font_dict = resources.fonts();
            for font in &fonts {
                font_dict.pair(Name(font.pdf_name.as_bytes()), font.font_ref);
            }
        }

        log::info!(
            "PDF assembly: font_embed={:.1}ms, pages={:.1}ms ({n} page(s))",
            t_fonts.as_secs_f64() * 1000.0,
            (t0.elapsed() - t_fonts).as_secs_f64() * 1000.0,
        );

        Ok(pdf.finish())
    }
}

impl Printer for PdfPrinter<'_> {
    fn print_page(&mut self, page: &Page, total: usize) -> bool {
        if page.number != self.pages.len() + 1 {
            log::warn!(
                "Page {} arrived out of order (expected {})",
                page.number,
                self.pages.len() + 1
            );
            return false;
        }
        let mut canvas = Canvas {
            ops: Vec::new(),
            used_chars: &mut self.used_chars,
        };
        draw_page(&self.measurer, &mut canvas, page, total);
        self.pages.push(DrawnPage {
            width: page.geometry.printable_width,
            height: page.geometry.printable_height,
            ops: canvas.ops,
        });
        true
    }
}

fn draw_page(m: &TextMeasurer, canvas: &mut Canvas, page: &Page, total: usize) {
    let g = &page.geometry;
    let left = g.content_left();
    let width = g.content_width;
    let content_top = g.printable_height - g.top_inset;

    if let Some(info) = &page.header {
        draw_patient_header(m, canvas, info, g);
    }

    for placed in &page.blocks {
        let top = content_top - placed.y;
        match &placed.block {
            ContentBlock::DepartmentLabel(name) => {
                draw_text_block(m.fonts(), canvas, &m.department_label(name, width), left, top);
            }
            ContentBlock::ResultsTableHeader => {
                table::draw_row(canvas, m.fonts(), m.style(), &m.table_header(width), left, top, true);
            }
            ContentBlock::ResultsTableRow(row) => {
                table::draw_row(canvas, m.fonts(), m.style(), &m.table_row(row, width), left, top, false);
            }
            ContentBlock::Footer(text) => {
                draw_text_block(m.fonts(), canvas, &m.footer(text, width), left, top);
            }
            ContentBlock::PatientInfo(_) | ContentBlock::Spacer(_) => {}
        }
    }

    if m.style().page_numbers {
        let size = m.style().footer_size;
        let label = format!("Page {} of {total}", page.number);
        let w = m.fonts().regular.text_width(&label, size);
        let x = (g.printable_width - w) / 2.0;
        let y = (g.bottom_inset / 2.0 - size * 0.3).max(0.0);
        canvas.text(false, size, x, y, &label);
    }
}

fn draw_text_block(fonts: &FontSet, canvas: &mut Canvas, layout: &TextBlockLayout, left: f32, top: f32) {
    let face = fonts.face(layout.bold);
    let mut baseline_y = top - layout.space_before - face.ascent(layout.font_size);
    for line in &layout.lines {
        canvas.text(layout.bold, layout.font_size, left, baseline_y, &line.text);
        baseline_y -= layout.line_h;
    }
}

/// Patient details, right-aligned with the content column and resting on
/// top of the content region, inside the reserved top inset.
fn draw_patient_header(m: &TextMeasurer, canvas: &mut Canvas, info: &PatientInfo, g: &PageGeometry) {
    let fonts = m.fonts();
    let header_w = m.patient_header_width(g.content_width);
    let layout = m.patient_info(info, header_w);
    let x = g.content_left() + g.content_width - header_w;
    let top = (g.printable_height - g.top_inset + layout.height()).min(g.printable_height);

    let title = fonts.bold.display_text(&layout.title);
    canvas.text(true, layout.title_size, x, top - fonts.bold.ascent(layout.title_size), &title);

    let mut row_top = top - layout.line_h * (layout.title_size / layout.font_size);
    for (label, lines) in &layout.pairs {
        let label_baseline = row_top - fonts.bold.ascent(layout.font_size);
        canvas.text(true, layout.font_size, x, label_baseline, &format!("{label}:"));
        for line in lines {
            let baseline_y = row_top - fonts.regular.ascent(layout.font_size);
            canvas.text(false, layout.font_size, x + layout.label_width, baseline_y, &line.text);
            row_top -= layout.line_h;
        }
    }
}
