//! Text splitting helpers for segmentation.

/// A run of text that either becomes a highlight target or stays inert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextPiece {
    Token(String),
    Space(String),
}

/// Split text into alternating word and whitespace runs, or into single
/// characters for wide scripts. Concatenating the pieces yields `text`.
pub fn split_atomic(text: &str, wide_script: bool) -> Vec<TextPiece> {
    if wide_script {
        return text
            .chars()
            .map(|ch| {
                if ch.is_whitespace() {
                    TextPiece::Space(ch.to_string())
                } else {
                    TextPiece::Token(ch.to_string())
                }
            })
            .collect();
    }

    let mut pieces = Vec::new();
    let mut current = String::new();
    let mut in_space = false;

    for ch in text.chars() {
        let is_space = ch.is_whitespace();
        if !current.is_empty() && is_space != in_space {
            pieces.push(finish(std::mem::take(&mut current), in_space));
        }
        in_space = is_space;
        current.push(ch);
    }

    if !current.is_empty() {
        pieces.push(finish(current, in_space));
    }

    pieces
}

fn finish(run: String, is_space: bool) -> TextPiece {
    if is_space {
        TextPiece::Space(run)
    } else {
        TextPiece::Token(run)
    }
}
