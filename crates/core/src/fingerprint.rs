use crate::util::{djb2, fnv1a32, sdbm};

/// FNV-1a, djb2 and sdbm hashes of one canonical n-gram, always computed together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HashTriple(pub [u32; 3]);

impl HashTriple {
    pub fn of(ngram: &str) -> Self {
        Self([fnv1a32(ngram), djb2(ngram), sdbm(ngram)])
    }

    pub fn values(&self) -> [u32; 3] {
        self.0
    }
}

/// Whether an n-gram carries enough signal to be required by the priority rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NgramKind {
    Ordinary,
    Priority,
}

impl NgramKind {
    /// Long n-grams with at least one alphanumeric character are priority n-grams.
    pub fn of(ngram: &str, priority_min_chars: usize) -> Self {
        if ngram.chars().count() >= priority_min_chars && ngram.chars().any(char::is_alphanumeric)
        {
            Self::Priority
        } else {
            Self::Ordinary
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fingerprint {
    pub ngram: String,
    pub hashes: HashTriple,
    pub kind: NgramKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashedNgrams {
    /// Window width actually used; smaller than requested when the input is short.
    pub width: usize,
    pub entries: Vec<(String, HashTriple)>,
}

/// Hashes every width-`n` window of `tokens`, in window order.
pub fn hash_ngrams(tokens: &[String], n: usize) -> HashedNgrams {
    let width = effective_width(tokens.len(), n);
    let mut entries = Vec::with_capacity(tokens.len().saturating_sub(width) + 1);
    if width > 0 {
        for window in tokens.windows(width) {
            let ngram = window.join(" ");
            let hashes = HashTriple::of(&ngram);
            entries.push((ngram, hashes));
        }
    }
    HashedNgrams { width, entries }
}

pub(crate) fn effective_width(len: usize, n: usize) -> usize {
    n.min(len)
}

/// Calls `on_triple` for every width-`width` window without keeping the n-gram strings.
pub(crate) fn for_each_ngram_triple(
    tokens: &[String],
    width: usize,
    mut on_triple: impl FnMut(HashTriple),
) {
    if width == 0 || tokens.len() < width {
        return;
    }
    let mut buf = String::new();
    for window in tokens.windows(width) {
        buf.clear();
        for (i, token) in window.iter().enumerate() {
            if i > 0 {
                buf.push(' ');
            }
            buf.push_str(token);
        }
        on_triple(HashTriple::of(&buf));
    }
}
