//! Query - Per-term search predicates
//!
//! Each query term is read as natural language: bare words are alternatives,
//! so an entry matching any of them is a candidate. Operators are honored
//! when present:
//!
//! - `"exact phrase"` - consecutive words in one field
//! - `a AND b` - both clauses
//! - `a OR b` - explicit alternation (same as juxtaposition)
//! - `-word` / `NOT word` - exclusion
//! - `( ... )` - grouping
//!
//! Malformed input never fails; stray operators are dropped, and `(` or
//! `NOT` nested deeper than `MAX_DEPTH` is read as a separator.

use std::collections::HashSet;

/// Deepest nesting of `(` and `NOT` honored; beyond it they are separators
const MAX_DEPTH: usize = 64;

/// Split text into lowercase alphanumeric tokens.
///
/// The same rule is used for stored fields and for queries, so a token in a
/// query matches exactly the tokens produced from stored text.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .collect()
}

/// Tokenized fields of one knowledge entry
#[derive(Debug, Clone, Default)]
pub struct Document {
    pub tags: Vec<String>,
    pub content: Vec<String>,
}

impl Document {
    pub fn new(tags: Vec<String>, content: Vec<String>) -> Self {
        Self { tags, content }
    }

    pub fn from_text(tags: &str, content: &str) -> Self {
        Self::new(tokenize(tags), tokenize(content))
    }

    fn contains(&self, unit: &[String]) -> bool {
        field_contains(&self.tags, unit) || field_contains(&self.content, unit)
    }
}

fn field_contains(field: &[String], unit: &[String]) -> bool {
    if unit.is_empty() || unit.len() > field.len() {
        return false;
    }
    field.windows(unit.len()).any(|w| w == unit)
}

/// Parsed predicate
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// A word (one token) or phrase (several consecutive tokens)
    Unit(Vec<String>),
    /// Any child matches
    Any(Vec<Node>),
    /// Every child matches
    All(Vec<Node>),
    /// Child does not match
    Not(Box<Node>),
}

impl Node {
    fn matches(&self, doc: &Document) -> bool {
        match self {
            Node::Unit(unit) => doc.contains(unit),
            Node::Any(children) => children.iter().any(|c| c.matches(doc)),
            Node::All(children) => children.iter().all(|c| c.matches(doc)),
            Node::Not(inner) => !inner.matches(doc),
        }
    }

    fn collect_positive<'a>(&'a self, out: &mut Vec<&'a [String]>) {
        match self {
            Node::Unit(unit) => {
                if !out.iter().any(|u| *u == unit.as_slice()) {
                    out.push(unit);
                }
            }
            Node::Any(children) | Node::All(children) => {
                for child in children {
                    child.collect_positive(out);
                }
            }
            Node::Not(_) => {}
        }
    }
}

/// Field weights used when scoring a match
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Weights {
    pub tags: f32,
    pub content: f32,
}

impl Default for Weights {
    fn default() -> Self {
        Self {
            tags: 1.0,
            content: 0.4,
        }
    }
}

/// One parsed query term
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    raw: String,
    root: Option<Node>,
}

impl Query {
    /// Parse a natural-language query term
    pub fn parse(raw: &str) -> Self {
        let tokens = lex(raw);
        let mut parser = Parser {
            tokens,
            pos: 0,
            depth: 0,
        };
        let root = parser.parse_top();
        Self {
            raw: raw.to_string(),
            root,
        }
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn root(&self) -> Option<&Node> {
        self.root.as_ref()
    }

    /// Words and phrases that count toward relevance (excluded ones do not)
    pub fn positive_units(&self) -> Vec<&[String]> {
        let mut out = Vec::new();
        if let Some(root) = &self.root {
            root.collect_positive(&mut out);
        }
        out
    }

    /// A term without positive words matches nothing
    pub fn is_empty(&self) -> bool {
        self.positive_units().is_empty()
    }

    pub fn matches(&self, doc: &Document) -> bool {
        match &self.root {
            Some(root) if !self.is_empty() => root.matches(doc),
            _ => false,
        }
    }

    /// Relevance of `doc` for this term.
    ///
    /// `weights.tags * coverage(tags) + weights.content * coverage(content)`
    /// where coverage is the share of positive units found in the field.
    /// Zero when the predicate does not match.
    pub fn score(&self, doc: &Document, weights: Weights) -> f32 {
        if !self.matches(doc) {
            return 0.0;
        }

        let units = self.positive_units();
        let total = units.len() as f32;
        let coverage = |field: &[String]| {
            units.iter().filter(|u| field_contains(field, u)).count() as f32 / total
        };

        weights.tags * coverage(&doc.tags) + weights.content * coverage(&doc.content)
    }
}

/// Build an FTS5 expression that matches every row containing at least one
/// positive unit of any of `queries`. Used as a cheap candidate prefilter.
pub fn fts_prefilter(queries: &[Query]) -> Option<String> {
    let mut seen = HashSet::new();
    let mut phrases = Vec::new();

    for query in queries {
        for unit in query.positive_units() {
            let phrase = unit.join(" ");
            if seen.insert(phrase.clone()) {
                phrases.push(format!("\"{}\"", phrase.replace('"', "\"\"")));
            }
        }
    }

    if phrases.is_empty() {
        None
    } else {
        Some(phrases.join(" OR "))
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Unit(Vec<String>),
    And,
    Or,
    Not,
    Open,
    Close,
}

fn lex(input: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }

        match c {
            '(' => {
                chars.next();
                tokens.push(Token::Open);
            }
            ')' => {
                chars.next();
                tokens.push(Token::Close);
            }
            '"' => {
                chars.next();
                let mut phrase = String::new();
                for ch in chars.by_ref() {
                    if ch == '"' {
                        break;
                    }
                    phrase.push(ch);
                }
                let words = tokenize(&phrase);
                if !words.is_empty() {
                    tokens.push(Token::Unit(words));
                }
            }
            '-' => {
                chars.next();
                match chars.peek() {
                    Some(&next) if !next.is_whitespace() => tokens.push(Token::Not),
                    _ => {}
                }
            }
            _ => {
                let mut word = String::new();
                while let Some(&ch) = chars.peek() {
                    if ch.is_whitespace() || ch == '(' || ch == ')' || ch == '"' {
                        break;
                    }
                    word.push(ch);
                    chars.next();
                }
                match word.as_str() {
                    "AND" => tokens.push(Token::And),
                    "OR" => tokens.push(Token::Or),
                    "NOT" => tokens.push(Token::Not),
                    _ => {
                        let words = tokenize(&word);
                        if !words.is_empty() {
                            tokens.push(Token::Unit(words));
                        }
                    }
                }
            }
        }
    }

    tokens
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn bump(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn parse_top(&mut self) -> Option<Node> {
        let mut parts = Vec::new();
        while self.peek().is_some() {
            if let Some(node) = self.parse_group() {
                parts.push(node);
            }
            // unmatched ')' at the top level
            if self.peek() == Some(&Token::Close) {
                self.bump();
            }
        }
        merge_alternatives(parts)
    }

    /// Clauses separated by juxtaposition or `OR`; bare negations exclude
    fn parse_group(&mut self) -> Option<Node> {
        let mut alternatives = Vec::new();
        let mut exclusions = Vec::new();

        loop {
            match self.peek() {
                None | Some(Token::Close) => break,
                Some(Token::Or) | Some(Token::And) => {
                    self.bump();
                }
                Some(_) => match self.parse_clause() {
                    Some(Node::Not(inner)) => exclusions.push(*inner),
                    Some(node) => alternatives.push(node),
                    None => {}
                },
            }
        }

        let positive = match alternatives.len() {
            0 => None,
            1 => alternatives.pop(),
            _ => Some(Node::Any(alternatives)),
        };
        let negative = match exclusions.len() {
            0 => None,
            1 => exclusions.pop().map(|n| Node::Not(Box::new(n))),
            _ => Some(Node::Not(Box::new(Node::Any(exclusions)))),
        };

        match (positive, negative) {
            (Some(p), Some(n)) => Some(Node::All(vec![p, n])),
            (Some(p), None) => Some(p),
            (None, n) => n,
        }
    }

    /// `unary (AND unary)*`
    fn parse_clause(&mut self) -> Option<Node> {
        let mut items = Vec::new();
        if let Some(first) = self.parse_unary() {
            items.push(first);
        }

        while self.peek() == Some(&Token::And) {
            self.bump();
            if let Some(next) = self.parse_unary() {
                items.push(next);
            }
        }

        match items.len() {
            0 => None,
            1 => items.pop(),
            _ => Some(Node::All(items)),
        }
    }

    fn parse_unary(&mut self) -> Option<Node> {
        loop {
            match self.peek()? {
                Token::Not | Token::Open if self.depth >= MAX_DEPTH => {
                    self.bump();
                }
                Token::Not => {
                    self.bump();
                    return self
                        .nested(Self::parse_unary)
                        .map(|inner| Node::Not(Box::new(inner)));
                }
                Token::Open => {
                    self.bump();
                    let inner = self.nested(Self::parse_group);
                    if self.peek() == Some(&Token::Close) {
                        self.bump();
                    }
                    return inner;
                }
                Token::Unit(_) => {
                    return match self.bump() {
                        Some(Token::Unit(words)) => Some(Node::Unit(words)),
                        _ => None,
                    }
                }
                Token::And | Token::Or | Token::Close => return None,
            }
        }
    }

    fn nested(&mut self, f: fn(&mut Self) -> Option<Node>) -> Option<Node> {
        self.depth += 1;
        let node = f(self);
        self.depth -= 1;
        node
    }
}

fn merge_alternatives(mut parts: Vec<Node>) -> Option<Node> {
    match parts.len() {
        0 => None,
        1 => parts.pop(),
        _ => Some(Node::Any(parts)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(words: &[&str]) -> Node {
        Node::Unit(words.iter().map(|w| w.to_string()).collect())
    }

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-5
    }

    #[test]
    fn test_tokenize() {
        assert_eq!(tokenize("Use OAuth2, with PKCE!"), vec!["use", "oauth2", "with", "pkce"]);
        assert_eq!(tokenize("session-storage"), vec!["session", "storage"]);
        assert!(tokenize("  --  ").is_empty());
    }

    #[test]
    fn test_bare_words_are_alternatives() {
        let q = Query::parse("security api");
        assert_eq!(q.root(), Some(&Node::Any(vec![unit(&["security"]), unit(&["api"])])));
    }

    #[test]
    fn test_phrase() {
        let q = Query::parse("\"session storage\" redis");
        assert_eq!(
            q.root(),
            Some(&Node::Any(vec![unit(&["session", "storage"]), unit(&["redis"])]))
        );

        let doc = Document::from_text("", "store the session in storage");
        assert!(!Query::parse("\"session storage\"").matches(&doc));
        let doc = Document::from_text("", "session storage lives in redis");
        assert!(Query::parse("\"session storage\"").matches(&doc));
    }

    #[test]
    fn test_and_binds_tighter_than_or() {
        let q = Query::parse("oauth AND pkce OR saml");
        assert_eq!(
            q.root(),
            Some(&Node::Any(vec![
                Node::All(vec![unit(&["oauth"]), unit(&["pkce"])]),
                unit(&["saml"]),
            ]))
        );
    }

    #[test]
    fn test_negation_excludes() {
        let q = Query::parse("api -legacy");
        assert!(q.matches(&Document::from_text("api", "modern endpoint")));
        assert!(!q.matches(&Document::from_text("api", "legacy endpoint")));

        let q = Query::parse("api NOT legacy");
        assert!(!q.matches(&Document::from_text("legacy api", "")));
    }

    #[test]
    fn test_only_negations_match_nothing() {
        let q = Query::parse("-legacy");
        assert!(q.is_empty());
        assert!(!q.matches(&Document::from_text("modern", "code")));
    }

    #[test]
    fn test_grouping() {
        let q = Query::parse("(oauth OR saml) AND mobile");
        assert!(q.matches(&Document::from_text("saml mobile", "")));
        assert!(!q.matches(&Document::from_text("saml", "desktop")));
    }

    #[test]
    fn test_malformed_input_degrades() {
        assert!(Query::parse("").root().is_none());
        assert!(Query::parse("AND OR").root().is_none());
        let q = Query::parse("(api");
        assert!(q.matches(&Document::from_text("api", "")));
        let q = Query::parse("api)) \"unterminated phrase");
        assert!(q.matches(&Document::from_text("", "unterminated phrase here")));
    }

    #[test]
    fn test_score_weights() {
        let weights = Weights::default();
        let q = Query::parse("security api");

        let tags_only = Document::from_text("https security api", "always use https");
        assert!(approx(q.score(&tags_only, weights), 1.0));

        let content_only = Document::from_text("mobile", "security for every api");
        assert!(approx(q.score(&content_only, weights), 0.4));

        let both = Document::from_text("security api", "security of the api");
        assert!(approx(q.score(&both, weights), 1.4));

        let half_tags = Document::from_text("security", "nothing here");
        assert!(approx(q.score(&half_tags, weights), 0.5));
    }

    #[test]
    fn test_score_zero_without_match() {
        let q = Query::parse("oauth AND pkce");
        let doc = Document::from_text("oauth", "login flow");
        assert_eq!(q.score(&doc, Weights::default()), 0.0);
    }

    #[test]
    fn test_negated_words_do_not_count() {
        let q = Query::parse("api -legacy");
        assert_eq!(q.positive_units().len(), 1);
        let doc = Document::from_text("api", "");
        assert!(approx(q.score(&doc, Weights::default()), 1.0));
    }

    #[test]
    fn test_fts_prefilter() {
        let queries = vec![Query::parse("oauth flow"), Query::parse("\"session storage\" -x oauth")];
        assert_eq!(
            fts_prefilter(&queries).unwrap(),
            "\"oauth\" OR \"flow\" OR \"session storage\""
        );
        assert!(fts_prefilter(&[Query::parse("-x")]).is_none());
    }

    #[test]
    fn test_deep_nesting_is_capped() {
        let doc = Document::from_text("x", "");

        let q = Query::parse(&format!("{}x", "(".repeat(100_000)));
        assert_eq!(q.positive_units(), vec![&["x".to_string()][..]]);
        assert!(q.matches(&doc));

        let q = Query::parse(&format!("{}x{}", "(".repeat(5_000), ")".repeat(5_000)));
        assert!(q.matches(&doc));

        // negations past the cap are dropped; the term stays exclusion-only
        let q = Query::parse(&format!("{}x", "NOT ".repeat(100_000)));
        assert!(q.is_empty());
        assert!(!q.matches(&doc));

        let q = Query::parse(&format!("{}x", "-".repeat(100_000)));
        assert!(!q.matches(&doc));
    }

    #[test]
    fn test_nesting_within_cap_is_honored() {
        let q = Query::parse(&format!("{}a AND b{}", "(".repeat(MAX_DEPTH), ")".repeat(MAX_DEPTH)));
        assert!(q.matches(&Document::from_text("a b", "")));
        assert!(!q.matches(&Document::from_text("a", "")));
    }
}
