//! Query splitting for compound requests.
//!
//! Embedding relevance degrades on compound natural-language queries such as
//! "roadmap and sprint notes", so a query containing the conjunction `and`
//! (or, failing that, `or`) is submitted to the index as separate sub-queries.
//!
//! This is a heuristic, not a parser. In [`SplitMode::Substring`] it also
//! fires inside unrelated words ("brand", "report"); [`SplitMode::Word`]
//! only splits on whole tokens.

use serde::{Deserialize, Serialize};

/// How conjunctions are located in the query text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitMode {
    /// Split only on whitespace-delimited `and` / `or` tokens.
    #[default]
    Word,
    /// Split wherever the letters occur, including inside words.
    Substring,
}

/// Conjunctions in priority order. Only the first one present is used.
const CONJUNCTIONS: [&str; 2] = ["and", "or"];

/// Split `query` into one or more sub-queries.
///
/// Split pieces are lower-cased and trimmed, and empty pieces are dropped.
/// When no conjunction applies (or every piece is empty) the result is the
/// trimmed input as the single sub-query, case preserved.
pub fn split_query(query: &str, mode: SplitMode) -> Vec<String> {
    let lowered = query.to_lowercase();

    for word in CONJUNCTIONS {
        let pieces = match mode {
            SplitMode::Word => split_on_token(&lowered, word),
            SplitMode::Substring => split_on_substring(&lowered, word),
        };
        if let Some(pieces) = pieces {
            if pieces.is_empty() {
                break;
            }
            return pieces;
        }
    }

    vec![query.trim().to_string()]
}

/// `None` when `word` is absent; otherwise the non-empty pieces around it.
fn split_on_token(text: &str, word: &str) -> Option<Vec<String>> {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    if !tokens.iter().any(|t| is_conjunction(t, word)) {
        return None;
    }

    let mut pieces = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    for token in tokens {
        if is_conjunction(token, word) {
            push_piece(&mut pieces, &current.join(" "));
            current.clear();
        } else {
            current.push(token);
        }
    }
    push_piece(&mut pieces, &current.join(" "));
    Some(pieces)
}

fn split_on_substring(text: &str, word: &str) -> Option<Vec<String>> {
    if !text.contains(word) {
        return None;
    }
    let mut pieces = Vec::new();
    for part in text.split(word) {
        push_piece(&mut pieces, part);
    }
    Some(pieces)
}

fn is_conjunction(token: &str, word: &str) -> bool {
    token.trim_matches(|c: char| !c.is_alphanumeric()) == word
}

fn push_piece(pieces: &mut Vec<String>, piece: &str) {
    let piece = piece.trim();
    if !piece.is_empty() {
        pieces.push(piece.to_string());
    }
}
