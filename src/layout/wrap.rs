use crate::fonts::FontFace;

pub struct TextLine {
    pub text: String,
    pub width: f32,
}

fn finish_line(words: &mut Vec<String>, width: f32) -> TextLine {
    TextLine {
        text: std::mem::take(words).join(" "),
        width,
    }
}

/// Split a word that is wider than the line on its own into line-sized
/// pieces, so nothing is ever measured wider than `max_width`.
fn break_word(word: &str, face: &FontFace, font_size: f32, max_width: f32) -> Vec<(String, f32)> {
    let mut pieces = Vec::new();
    let mut piece = String::new();
    let mut piece_w = 0.0f32;
    for ch in word.chars() {
        let cw = face.char_width_1000(ch) * font_size / 1000.0;
        if !piece.is_empty() && piece_w + cw > max_width {
            pieces.push((std::mem::take(&mut piece), piece_w));
            piece_w = 0.0;
        }
        piece.push(ch);
        piece_w += cw;
    }
    if !piece.is_empty() {
        pieces.push((piece, piece_w));
    }
    pieces
}

/// Greedy word wrap at `max_width`. Explicit newlines start a new line.
/// Always returns at least one (possibly empty) line.
pub fn wrap_text(text: &str, face: &FontFace, font_size: f32, max_width: f32) -> Vec<TextLine> {
    let shown = face.display_text(text);
    let space_w = face.space_width(font_size);
    let mut lines: Vec<TextLine> = Vec::new();

    for paragraph in shown.split('\n') {
        let mut words: Vec<String> = Vec::new();
        let mut current_x: f32 = 0.0;

        for word in paragraph.split_whitespace() {
            let ww = face.text_width(word, font_size);
            let pieces = if ww > max_width {
                break_word(word, face, font_size, max_width)
            } else {
                vec![(word.to_string(), ww)]
            };

            for (piece, pw) in pieces {
                let proposed_x = if words.is_empty() {
                    current_x
                } else {
                    current_x + space_w
                };
                if !words.is_empty() && proposed_x + pw > max_width {
                    lines.push(finish_line(&mut words, current_x));
                    current_x = 0.0;
                } else {
                    current_x = proposed_x;
                }
                words.push(piece);
                current_x += pw;
            }
        }

        lines.push(finish_line(&mut words, current_x));
    }

    lines
}
