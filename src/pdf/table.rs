use crate::config::ReportStyle;
use crate::fonts::FontSet;
use crate::layout::RowLayout;

use super::Canvas;

/// Draw one results-table row with its top edge at `top`. Cell text starts
/// at the top padding; remarks follow the cell's own lines in smaller type.
pub(super) fn draw_row(
    canvas: &mut Canvas,
    fonts: &FontSet,
    style: &ReportStyle,
    layout: &RowLayout,
    left: f32,
    top: f32,
    shaded: bool,
) {
    let cm = &style.cell_margins;
    let bottom = top - layout.height;
    let total_w: f32 = layout.col_widths.iter().sum();

    if shaded {
        canvas.shade(left, bottom, total_w, layout.height);
    }

    let mut cell_x = left;
    for (cell, col_w) in layout.cells.iter().zip(layout.col_widths) {
        let face = fonts.face(cell.bold);
        let text_x = cell_x + cm.left;

        let mut baseline_y = top - cm.top - face.ascent(cell.font_size);
        for line in &cell.lines {
            canvas.text(cell.bold, cell.font_size, text_x, baseline_y, &line.text);
            baseline_y -= cell.line_h;
        }

        if !cell.notes.is_empty() {
            let notes_top = top - cm.top - cell.lines.len() as f32 * cell.line_h;
            let mut baseline_y = notes_top - fonts.regular.ascent(cell.notes_size);
            for line in &cell.notes {
                canvas.text(false, cell.notes_size, text_x, baseline_y, &line.text);
                baseline_y -= cell.notes_line_h;
            }
        }

        canvas.rule((cell_x, top), (cell_x, bottom));
        cell_x += col_w;
    }

    canvas.rule((cell_x, top), (cell_x, bottom));
    canvas.rule((left, top), (left + total_w, top));
    canvas.rule((left, bottom), (left + total_w, bottom));
}
