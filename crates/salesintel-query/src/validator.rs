//! Query Safety Validator.
//!
//! A string classifier, not a parser. It decides whether a generated query
//! may reach the structured store at all; the store connection refusing
//! writes is the second line of defense and must stay in place.
use regex::Regex;
use std::collections::HashSet;
use std::fmt;

use salesintel_core::{Error, Result};

/// Mutating, privilege and session keywords, matched as whole words.
const DENIED_KEYWORDS: &[&str] = &[
    "INSERT", "UPDATE", "DELETE", "DROP", "CREATE", "ALTER", "TRUNCATE", "EXEC", "EXECUTE", "GRANT", "REVOKE",
    "INTO", "ATTACH", "DETACH", "PRAGMA", "VACUUM", "COPY", "MERGE", "CALL",
];

/// Comment and statement-termination sequences, matched anywhere.
const DENIED_SEQUENCES: &[&str] = &["--", "/*", "*/", ";"];

const CATALOG_PATTERN: &str = r"(?i)\b(pg_\w*|information_schema|sqlite_\w*|sys\.|mysql\.)";

/// Functions whose argument list uses `FROM` without naming a table.
const FROM_FUNCTIONS: &[&str] = &["EXTRACT", "SUBSTRING", "TRIM", "POSITION", "OVERLAY"];

/// Words that close a FROM clause at the current nesting level.
const FROM_ENDERS: &[&str] = &[
    "WHERE", "GROUP", "ORDER", "HAVING", "LIMIT", "OFFSET", "UNION", "EXCEPT", "INTERSECT", "WINDOW", "FETCH",
    "RETURNING",
];

/// Words that open a subquery when they follow `(` in table position.
const SUBQUERY_STARTS: &[&str] = &["SELECT", "WITH", "VALUES"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    Empty,
    TooLong,
    NotReadOnly,
    ForbiddenKeyword,
    ForbiddenSequence,
    SystemCatalog,
    UnknownEntity,
}

impl RejectReason {
    pub fn code(&self) -> &'static str {
        match self {
            RejectReason::Empty => "empty",
            RejectReason::TooLong => "too_long",
            RejectReason::NotReadOnly => "not_read_only",
            RejectReason::ForbiddenKeyword => "forbidden_keyword",
            RejectReason::ForbiddenSequence => "forbidden_sequence",
            RejectReason::SystemCatalog => "system_catalog",
            RejectReason::UnknownEntity => "unknown_entity",
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Safe,
    Rejected(RejectReason),
}

impl Verdict {
    pub fn is_safe(&self) -> bool {
        matches!(self, Verdict::Safe)
    }
}

pub struct QueryValidator {
    allowed: HashSet<String>,
    max_len: usize,
    keywords: Regex,
    union_select: Regex,
    catalog: Regex,
}

impl QueryValidator {
    pub fn new<I, S>(allowed_entities: I, max_len: usize) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let compile = |pattern: &str| Regex::new(pattern).map_err(|e| Error::InvalidConfig(format!("validator pattern: {e}")));
        let keywords = compile(&format!(r"\b({})\b", DENIED_KEYWORDS.join("|")))?;
        Ok(Self {
            allowed: allowed_entities.into_iter().map(|e| e.as_ref().trim().to_ascii_lowercase()).collect(),
            max_len,
            keywords,
            union_select: compile(r"\bUNION\s+(ALL\s+)?SELECT\b")?,
            catalog: compile(CATALOG_PATTERN)?,
        })
    }

    pub fn max_len(&self) -> usize {
        self.max_len
    }

    /// Classify `candidate`. Rules short-circuit in order: shape, denied
    /// keywords and sequences, system catalogs, entity allow-list.
    pub fn validate(&self, candidate: &str) -> Verdict {
        let verdict = self.classify(candidate);
        if let Verdict::Rejected(reason) = verdict {
            tracing::debug!(target: "query", reason = reason.code(), "candidate rejected");
        }
        verdict
    }

    fn classify(&self, candidate: &str) -> Verdict {
        let trimmed = candidate.trim();
        if trimmed.is_empty() {
            return Verdict::Rejected(RejectReason::Empty);
        }
        if trimmed.chars().count() > self.max_len {
            return Verdict::Rejected(RejectReason::TooLong);
        }
        let upper = trimmed.to_uppercase();
        if !starts_with_select(&upper) {
            return Verdict::Rejected(RejectReason::NotReadOnly);
        }
        if self.keywords.is_match(&upper) || self.union_select.is_match(&upper) {
            return Verdict::Rejected(RejectReason::ForbiddenKeyword);
        }
        if DENIED_SEQUENCES.iter().any(|seq| upper.contains(seq)) {
            return Verdict::Rejected(RejectReason::ForbiddenSequence);
        }
        if self.catalog.is_match(trimmed) {
            return Verdict::Rejected(RejectReason::SystemCatalog);
        }
        if referenced_entities(trimmed).iter().any(|name| !self.allowed.contains(name)) {
            return Verdict::Rejected(RejectReason::UnknownEntity);
        }
        Verdict::Safe
    }
}

fn starts_with_select(upper: &str) -> bool {
    match upper.strip_prefix("SELECT") {
        Some(rest) => rest.chars().next().map_or(false, |c| !(c.is_alphanumeric() || c == '_')),
        None => false,
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Word(String),
    Quoted(String),
    Literal,
    Punct(char),
}

fn tokenize(sql: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut chars = sql.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            c if c.is_whitespace() => {}
            '\'' => {
                while let Some(n) = chars.next() {
                    if n == '\'' {
                        if chars.peek() == Some(&'\'') {
                            chars.next();
                        } else {
                            break;
                        }
                    }
                }
                tokens.push(Token::Literal);
            }
            '"' | '`' | '[' => {
                let close = if c == '[' { ']' } else { c };
                let ident: String = chars.by_ref().take_while(|n| *n != close).collect();
                tokens.push(Token::Quoted(ident));
            }
            c if c.is_alphanumeric() || c == '_' => {
                let mut word = String::from(c);
                while let Some(&n) = chars.peek() {
                    if n.is_alphanumeric() || n == '_' || n == '$' {
                        word.push(n);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Word(word));
            }
            other => tokens.push(Token::Punct(other)),
        }
    }
    tokens
}

fn is_any_word(token: Option<&Token>, words: &[&str]) -> bool {
    matches!(token, Some(Token::Word(w)) if words.iter().any(|k| w.eq_ignore_ascii_case(k)))
}

/// Read a possibly qualified table name at `i`. Returns the lowercase name
/// and the index after it, or `None` when `i` does not hold a name.
fn table_name(tokens: &[Token], mut i: usize) -> Option<(String, usize)> {
    let mut name = match tokens.get(i)? {
        Token::Word(w) | Token::Quoted(w) => w.to_ascii_lowercase(),
        _ => return None,
    };
    i += 1;
    while tokens.get(i) == Some(&Token::Punct('.')) {
        match tokens.get(i + 1) {
            Some(Token::Word(w)) | Some(Token::Quoted(w)) => {
                name.push('.');
                name.push_str(&w.to_ascii_lowercase());
                i += 2;
            }
            _ => break,
        }
    }
    Some((name, i))
}

/// One open parenthesis level while scanning.
#[derive(Debug, Clone, Copy, Default)]
struct Level {
    /// Argument list of `EXTRACT` and friends, where `FROM` names no table.
    function: bool,
    /// Inside a FROM clause, so `,` starts another table reference.
    in_from: bool,
}

/// Entity names in table position: after `FROM`, `JOIN`, or a comma inside
/// a FROM clause. Parenthesised references such as `FROM (t)` or
/// `FROM (a JOIN b)` are looked through; subqueries are walked in place.
fn referenced_entities(sql: &str) -> Vec<String> {
    let tokens = tokenize(sql);
    let mut entities = Vec::new();
    let mut levels = vec![Level::default()];
    let mut expect_table = false;
    let mut i = 0;
    while i < tokens.len() {
        let prev = i.checked_sub(1).and_then(|p| tokens.get(p));
        let level = levels.len() - 1;
        match &tokens[i] {
            Token::Punct('(') => {
                if expect_table && !is_any_word(tokens.get(i + 1), SUBQUERY_STARTS) {
                    levels.push(Level { function: false, in_from: true });
                } else {
                    levels.push(Level { function: !expect_table && is_any_word(prev, FROM_FUNCTIONS), in_from: false });
                    expect_table = false;
                }
            }
            Token::Punct(')') => {
                if levels.len() > 1 {
                    levels.pop();
                }
                expect_table = false;
            }
            Token::Punct(',') => expect_table = levels[level].in_from,
            Token::Word(w) if w.eq_ignore_ascii_case("FROM") => {
                if !levels[level].function {
                    levels[level].in_from = true;
                    expect_table = true;
                }
            }
            Token::Word(w) if w.eq_ignore_ascii_case("JOIN") => {
                levels[level].in_from = true;
                expect_table = true;
            }
            Token::Word(_) if is_any_word(tokens.get(i), FROM_ENDERS) => {
                levels[level].in_from = false;
                expect_table = false;
            }
            Token::Word(_) | Token::Quoted(_) if expect_table => {
                expect_table = false;
                match table_name(&tokens, i) {
                    Some((name, next)) => {
                        entities.push(name);
                        i = next;
                    }
                    None => i += 1,
                }
                continue;
            }
            _ => expect_table = false,
        }
        i += 1;
    }
    entities
}
