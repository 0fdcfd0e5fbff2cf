//! Finite-state scanner that partitions SQL text into classified spans.
//!
//! The scanner never backtracks: every byte is visited a bounded number of
//! times, so pathological input (long runs of quotes, brackets or dashes)
//! costs linear time. All delimiters are ASCII, which keeps every span
//! boundary on a UTF-8 character boundary.

use std::fmt;

/// Keywords the validation policy cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeywordKind {
    Select,
    Update,
    Insert,
    Delete,
    Drop,
    Truncate,
    Alter,
    Create,
    Rename,
    Where,
    Top,
    Distinct,
    All,
    OrderBy,
    GroupBy,
    Having,
    Limit,
    Offset,
}

/// Single-word keyword table. `ORDER BY` and `GROUP BY` are recognized
/// separately because they span two words.
const SINGLE_WORD_KEYWORDS: [(&str, KeywordKind); 16] = [
    ("SELECT", KeywordKind::Select),
    ("UPDATE", KeywordKind::Update),
    ("INSERT", KeywordKind::Insert),
    ("DELETE", KeywordKind::Delete),
    ("DROP", KeywordKind::Drop),
    ("TRUNCATE", KeywordKind::Truncate),
    ("ALTER", KeywordKind::Alter),
    ("CREATE", KeywordKind::Create),
    ("RENAME", KeywordKind::Rename),
    ("WHERE", KeywordKind::Where),
    ("TOP", KeywordKind::Top),
    ("DISTINCT", KeywordKind::Distinct),
    ("ALL", KeywordKind::All),
    ("HAVING", KeywordKind::Having),
    ("LIMIT", KeywordKind::Limit),
    ("OFFSET", KeywordKind::Offset),
];

impl KeywordKind {
    /// Canonical upper-case spelling.
    pub fn as_str(&self) -> &'static str {
        match self {
            KeywordKind::Select => "SELECT",
            KeywordKind::Update => "UPDATE",
            KeywordKind::Insert => "INSERT",
            KeywordKind::Delete => "DELETE",
            KeywordKind::Drop => "DROP",
            KeywordKind::Truncate => "TRUNCATE",
            KeywordKind::Alter => "ALTER",
            KeywordKind::Create => "CREATE",
            KeywordKind::Rename => "RENAME",
            KeywordKind::Where => "WHERE",
            KeywordKind::Top => "TOP",
            KeywordKind::Distinct => "DISTINCT",
            KeywordKind::All => "ALL",
            KeywordKind::OrderBy => "ORDER BY",
            KeywordKind::GroupBy => "GROUP BY",
            KeywordKind::Having => "HAVING",
            KeywordKind::Limit => "LIMIT",
            KeywordKind::Offset => "OFFSET",
        }
    }

    /// Schema-changing keywords that are never allowed in mutations or queries.
    pub fn is_dangerous(&self) -> bool {
        matches!(
            self,
            KeywordKind::Drop
                | KeywordKind::Truncate
                | KeywordKind::Alter
                | KeywordKind::Create
                | KeywordKind::Rename
        )
    }

    /// Data manipulation verbs.
    pub fn is_dml(&self) -> bool {
        matches!(
            self,
            KeywordKind::Select | KeywordKind::Update | KeywordKind::Insert | KeywordKind::Delete
        )
    }

    /// Keywords that end a WHERE clause.
    pub fn is_trailing_clause(&self) -> bool {
        matches!(
            self,
            KeywordKind::OrderBy
                | KeywordKind::GroupBy
                | KeywordKind::Having
                | KeywordKind::Limit
                | KeywordKind::Offset
        )
    }

    fn from_word(word: &str) -> Option<Self> {
        SINGLE_WORD_KEYWORDS
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(word))
            .map(|(_, kind)| *kind)
    }
}

impl fmt::Display for KeywordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classification of a span of source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpanKind {
    LineComment,
    BlockComment,
    StringLiteral,
    BracketedIdentifier,
    Semicolon,
    Keyword(KeywordKind),
    Plain,
}

/// A classified byte range `[start, end)` of the scanned text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub kind: SpanKind,
    pub start: usize,
    pub end: usize,
}

impl Span {
    fn new(kind: SpanKind, start: usize, end: usize) -> Self {
        Self { kind, start, end }
    }

    /// The text this span covers.
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        &source[self.start..self.end]
    }

    /// Comments, string literals and bracketed identifiers.
    pub fn is_noise(&self) -> bool {
        matches!(
            self.kind,
            SpanKind::LineComment
                | SpanKind::BlockComment
                | SpanKind::StringLiteral
                | SpanKind::BracketedIdentifier
        )
    }

    pub fn is_comment(&self) -> bool {
        matches!(self.kind, SpanKind::LineComment | SpanKind::BlockComment)
    }

    /// Returns the keyword if this span is one.
    pub fn keyword(&self) -> Option<KeywordKind> {
        match self.kind {
            SpanKind::Keyword(kind) => Some(kind),
            _ => None,
        }
    }

    /// Whether the span carries statement content: anything except comments
    /// and whitespace-only plain text.
    pub fn is_significant(&self, source: &str) -> bool {
        match self.kind {
            SpanKind::LineComment | SpanKind::BlockComment => false,
            SpanKind::Plain => !self.text(source).trim().is_empty(),
            _ => true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Normal,
    InLineComment,
    InBlockComment,
    InStringLiteral,
    InBracketedIdentifier,
}

/// Scan SQL text into an ordered, gap-free, non-overlapping span list.
pub fn scan(source: &str) -> Vec<Span> {
    Scanner::new(source).run()
}

/// Identifier characters. Non-ASCII bytes are treated as part of a word so
/// that a keyword glued to a Unicode letter never matches.
pub(crate) fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'_' | b'@' | b'#' | b'$') || b >= 0x80
}

struct Scanner<'a> {
    source: &'a str,
    bytes: &'a [u8],
    pos: usize,
    spans: Vec<Span>,
}

impl<'a> Scanner<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            bytes: source.as_bytes(),
            pos: 0,
            spans: Vec::new(),
        }
    }

    fn run(mut self) -> Vec<Span> {
        let len = self.bytes.len();
        let mut state = State::Normal;
        let mut start = 0;

        while self.pos < len {
            match state {
                State::Normal => {
                    start = self.pos;
                    let b = self.bytes[self.pos];
                    match b {
                        b'-' if self.peek(1) == Some(b'-') => {
                            self.pos += 2;
                            state = State::InLineComment;
                        }
                        b'/' if self.peek(1) == Some(b'*') => {
                            self.pos += 2;
                            state = State::InBlockComment;
                        }
                        b'\'' => {
                            self.pos += 1;
                            state = State::InStringLiteral;
                        }
                        // A word starting with N directly followed by a quote
                        // is a national string literal.
                        b'N' | b'n' if self.peek(1) == Some(b'\'') => {
                            self.pos += 2;
                            state = State::InStringLiteral;
                        }
                        b'[' => {
                            self.pos += 1;
                            state = State::InBracketedIdentifier;
                        }
                        b';' => {
                            self.pos += 1;
                            self.push(SpanKind::Semicolon, start, self.pos);
                        }
                        b if is_word_byte(b) => self.word(),
                        _ => {
                            self.pos += 1;
                            self.push(SpanKind::Plain, start, self.pos);
                        }
                    }
                }
                State::InLineComment => {
                    let end = self.find_byte(b'\n').unwrap_or(len);
                    self.pos = end;
                    self.push(SpanKind::LineComment, start, end);
                    state = State::Normal;
                }
                State::InBlockComment => {
                    let end = self.source[self.pos..]
                        .find("*/")
                        .map(|offset| self.pos + offset + 2)
                        .unwrap_or(len);
                    self.pos = end;
                    self.push(SpanKind::BlockComment, start, end);
                    state = State::Normal;
                }
                State::InStringLiteral => {
                    match self.find_byte(b'\'') {
                        // '' is an escaped quote; stay in the literal.
                        Some(quote) if self.bytes.get(quote + 1) == Some(&b'\'') => {
                            self.pos = quote + 2;
                        }
                        Some(quote) => {
                            self.pos = quote + 1;
                            self.push(SpanKind::StringLiteral, start, self.pos);
                            state = State::Normal;
                        }
                        None => {
                            self.pos = len;
                            self.push(SpanKind::StringLiteral, start, len);
                            state = State::Normal;
                        }
                    }
                }
                State::InBracketedIdentifier => {
                    let end = self.find_byte(b']').map(|i| i + 1).unwrap_or(len);
                    self.pos = end;
                    self.push(SpanKind::BracketedIdentifier, start, end);
                    state = State::Normal;
                }
            }
        }

        // An opener at end-of-input, or a literal whose escaped quote sits at
        // end-of-input, leaves the loop without closing its span.
        let unclosed = match state {
            State::Normal => None,
            State::InLineComment => Some(SpanKind::LineComment),
            State::InBlockComment => Some(SpanKind::BlockComment),
            State::InStringLiteral => Some(SpanKind::StringLiteral),
            State::InBracketedIdentifier => Some(SpanKind::BracketedIdentifier),
        };
        if let Some(kind) = unclosed {
            self.push(kind, start, len);
        }

        self.spans
    }

    /// Consume a maximal identifier run and classify it.
    fn word(&mut self) {
        let start = self.pos;
        let end = self.word_end(start);
        self.pos = end;
        let word = &self.source[start..end];

        if word.eq_ignore_ascii_case("ORDER") || word.eq_ignore_ascii_case("GROUP") {
            if let Some(by_end) = self.following_by(end) {
                let kind = if word.eq_ignore_ascii_case("ORDER") {
                    KeywordKind::OrderBy
                } else {
                    KeywordKind::GroupBy
                };
                self.pos = by_end;
                self.push(SpanKind::Keyword(kind), start, by_end);
                return;
            }
        }

        match KeywordKind::from_word(word) {
            Some(kind) => self.push(SpanKind::Keyword(kind), start, end),
            None => self.push(SpanKind::Plain, start, end),
        }
    }

    /// If whitespace and then the whole word `BY` follow `from`, return the
    /// offset just past `BY`.
    fn following_by(&self, from: usize) -> Option<usize> {
        let mut i = from;
        while i < self.bytes.len() && self.bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        if i == from {
            return None;
        }
        let end = self.word_end(i);
        self.source[i..end].eq_ignore_ascii_case("BY").then_some(end)
    }

    fn word_end(&self, from: usize) -> usize {
        self.bytes[from..]
            .iter()
            .position(|&b| !is_word_byte(b))
            .map(|offset| from + offset)
            .unwrap_or(self.bytes.len())
    }

    fn find_byte(&self, needle: u8) -> Option<usize> {
        self.bytes[self.pos..]
            .iter()
            .position(|&b| b == needle)
            .map(|offset| self.pos + offset)
    }

    fn peek(&self, ahead: usize) -> Option<u8> {
        self.bytes.get(self.pos + ahead).copied()
    }

    /// Append a span, merging adjacent plain text into one span.
    fn push(&mut self, kind: SpanKind, start: usize, end: usize) {
        if start == end {
            return;
        }
        if kind == SpanKind::Plain {
            if let Some(last) = self.spans.last_mut() {
                if last.kind == SpanKind::Plain && last.end == start {
                    last.end = end;
                    return;
                }
            }
        }
        self.spans.push(Span::new(kind, start, end));
    }
}
