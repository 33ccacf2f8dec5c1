//! # Workload decisions
//!
//! Pure, seedable decision functions behind every random choice the driver
//! makes. Callers pass their own RNG so a seeded `StdRng` reproduces a run.

use rand::Rng;
use serde::Serialize;
use strum::Display;

/// Length of the counter-example search token.
pub const TOKEN_LEN: usize = 8;

const TOKEN_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// The four requests the driver issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, Serialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Create,
    Read,
    Search,
    Delete,
}

/// Task weights of the weighted scenario.
pub const WEIGHTED_MIX: [(Operation, u32); 4] = [
    (Operation::Create, 3),
    (Operation::Read, 10),
    (Operation::Search, 10),
    (Operation::Delete, 1),
];

impl Operation {
    /// Sequence of one sequential-scenario iteration.
    pub const SEQUENCE: [Operation; 4] = [
        Operation::Create,
        Operation::Read,
        Operation::Search,
        Operation::Delete,
    ];

    /// Pick one operation according to [`WEIGHTED_MIX`].
    pub fn choose_weighted<R: Rng + ?Sized>(rng: &mut R) -> Operation {
        let total: u32 = WEIGHTED_MIX.iter().map(|(_, weight)| weight).sum();
        let mut roll = rng.gen_range(0..total);
        for (op, weight) in WEIGHTED_MIX {
            if roll < weight {
                return op;
            }
            roll -= weight;
        }
        WEIGHTED_MIX[WEIGHTED_MIX.len() - 1].0
    }
}

/// A search request together with the answer the server must give.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchProbe {
    pub term: String,
    pub expect_found: bool,
}

impl SearchProbe {
    pub fn present(term: impl Into<String>) -> Self {
        Self {
            term: term.into(),
            expect_found: true,
        }
    }

    pub fn absent(term: impl Into<String>) -> Self {
        Self {
            term: term.into(),
            expect_found: false,
        }
    }
}

/// Uniform index into a collection of `len` items, `None` when empty.
pub fn pick_index<R: Rng + ?Sized>(len: usize, rng: &mut R) -> Option<usize> {
    (len > 0).then(|| rng.gen_range(0..len))
}

/// Drop every character outside the ASCII range.
pub fn strip_non_ascii(text: &str) -> String {
    text.chars().filter(char::is_ascii).collect()
}

/// Pick a word of `text`, resampling until the token is non-empty.
///
/// Words are whitespace separated, so runs of delimiters produce empty
/// tokens that are rejected. Returns `None` when the text has no word at all.
pub fn pick_word<'a, R: Rng + ?Sized>(text: &'a str, rng: &mut R) -> Option<&'a str> {
    let tokens: Vec<&str> = text.split(|c: char| c.is_ascii_whitespace()).collect();
    if tokens.iter().all(|t| t.is_empty()) {
        return None;
    }
    loop {
        let word = tokens[rng.gen_range(0..tokens.len())];
        if !word.is_empty() {
            return Some(word);
        }
    }
}

/// Random lowercase alphanumeric token of `len` characters.
pub fn random_token<R: Rng + ?Sized>(len: usize, rng: &mut R) -> String {
    (0..len)
        .map(|_| TOKEN_ALPHABET[rng.gen_range(0..TOKEN_ALPHABET.len())] as char)
        .collect()
}

/// Random [`TOKEN_LEN`] token guaranteed not to occur anywhere in `text`.
pub fn counter_example<R: Rng + ?Sized>(text: &str, rng: &mut R) -> String {
    loop {
        let token = random_token(TOKEN_LEN, rng);
        if !text.contains(&token) {
            return token;
        }
    }
}

/// Flip a fair coin between a real word of `text` and a counter-example.
pub fn search_probe<R: Rng + ?Sized>(text: &str, rng: &mut R) -> SearchProbe {
    match pick_word(text, rng) {
        Some(word) if rng.gen_bool(0.5) => SearchProbe::present(word),
        _ => SearchProbe::absent(counter_example(text, rng)),
    }
}
