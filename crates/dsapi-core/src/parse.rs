//! Recursive-descent parser for criteria strings.
//!
//! Grammar, lowest precedence first:
//!
//! ```text
//! or      := and ("OR" and)*
//! and     := primary (["AND"] primary)*
//! primary := "(" or ")" | "*:*" | field ":" value
//! value   := "[" bound "TO" bound "]" | quoted | bare
//! ```
//!
//! Juxtaposed clauses are joined with `AND`. Positions in [`ParseError`] are
//! byte offsets into the input.

use crate::errors::ParseError;
use crate::query::{Bound, QueryClause};
use crate::util::is_compact_date;
use chrono::NaiveDate;

type PResult<T> = Result<T, ParseError>;

/// Deepest parenthesised nesting accepted.
pub const MAX_DEPTH: usize = 64;
/// Most leaf clauses in one criteria string.
pub const MAX_CLAUSES: usize = 1024;

pub fn parse(criteria: &str) -> PResult<QueryClause> {
    let mut p = Parser {
        src: criteria,
        pos: 0,
        depth: 0,
        clauses: 0,
    };
    p.skip_ws();
    if p.at_end() {
        return Err(ParseError::new(0, "empty criteria"));
    }
    let clause = p.parse_or()?;
    p.skip_ws();
    match p.peek() {
        None => Ok(clause),
        Some(')') => Err(ParseError::new(
            p.pos,
            "unbalanced parentheses: unexpected `)`",
        )),
        Some(_) => Err(ParseError::new(p.pos, "unexpected input")),
    }
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
    depth: usize,
    clauses: usize,
}

struct RawBound {
    text: String,
    quoted: bool,
    at: usize,
}

impl<'a> Parser<'a> {
    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn at_end(&self) -> bool {
        self.pos >= self.src.len()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.bump();
        }
    }

    fn keyword_at(&self, kw: &str) -> bool {
        let rest = self.rest();
        if !rest.starts_with(kw) {
            return false;
        }
        match rest[kw.len()..].chars().next() {
            None => true,
            Some(c) => c.is_whitespace() || matches!(c, '(' | ')' | ']'),
        }
    }

    fn eat_keyword(&mut self, kw: &str) -> bool {
        if self.keyword_at(kw) {
            self.pos += kw.len();
            true
        } else {
            false
        }
    }

    fn take_until(&mut self, stop: impl Fn(char) -> bool) -> &'a str {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if stop(c) {
                break;
            }
            self.pos += c.len_utf8();
        }
        &self.src[start..self.pos]
    }

    fn parse_or(&mut self) -> PResult<QueryClause> {
        let mut left = self.parse_and()?;
        loop {
            self.skip_ws();
            let at = self.pos;
            if !self.eat_keyword("OR") {
                return Ok(left);
            }
            self.expect_operand("OR", at)?;
            let right = self.parse_and()?;
            left = QueryClause::or(left, right);
        }
    }

    fn parse_and(&mut self) -> PResult<QueryClause> {
        let mut left = self.parse_primary()?;
        loop {
            self.skip_ws();
            if matches!(self.peek(), None | Some(')')) || self.keyword_at("OR") {
                return Ok(left);
            }
            let at = self.pos;
            if self.eat_keyword("AND") {
                self.expect_operand("AND", at)?;
            }
            let right = self.parse_primary()?;
            left = QueryClause::and(left, right);
        }
    }

    fn expect_operand(&mut self, op: &str, at: usize) -> PResult<()> {
        self.skip_ws();
        if matches!(self.peek(), None | Some(')')) {
            return Err(ParseError::new(
                at,
                format!("`{op}` is missing its right-hand clause"),
            ));
        }
        Ok(())
    }

    fn parse_primary(&mut self) -> PResult<QueryClause> {
        self.skip_ws();
        let start = self.pos;
        match self.peek() {
            None => Err(ParseError::new(start, "expected a clause")),
            Some('(') => {
                if self.depth == MAX_DEPTH {
                    return Err(ParseError::new(start, "nesting too deep"));
                }
                self.bump();
                self.skip_ws();
                if self.peek() == Some(')') {
                    return Err(ParseError::new(start, "empty group"));
                }
                self.depth += 1;
                let inner = self.parse_or();
                self.depth -= 1;
                let inner = inner?;
                self.skip_ws();
                if self.peek() == Some(')') {
                    self.bump();
                    Ok(inner)
                } else {
                    Err(ParseError::new(
                        start,
                        "unbalanced parentheses: missing `)`",
                    ))
                }
            }
            Some(')') => Err(ParseError::new(
                start,
                "unbalanced parentheses: unexpected `)`",
            )),
            _ if self.clauses == MAX_CLAUSES => {
                Err(ParseError::new(start, "too many clauses"))
            }
            _ if self.rest().starts_with("*:*") => {
                self.clauses += 1;
                self.pos += 3;
                Ok(QueryClause::MatchAll)
            }
            _ if self.keyword_at("AND") => Err(ParseError::new(start, "unexpected `AND`")),
            _ if self.keyword_at("OR") => Err(ParseError::new(start, "unexpected `OR`")),
            _ => {
                self.clauses += 1;
                self.parse_field_clause()
            }
        }
    }

    fn parse_field_clause(&mut self) -> PResult<QueryClause> {
        let start = self.pos;
        let field = self.take_until(|c| !(c.is_ascii_alphanumeric() || c == '_' || c == '.'));
        if field.is_empty() {
            return Err(ParseError::new(start, "expected a field name"));
        }
        if self.peek() != Some(':') {
            return Err(ParseError::new(self.pos, "expected `:` after field name"));
        }
        self.bump();
        match self.peek() {
            Some('[') => self.parse_range(field),
            Some('"') => {
                let value = self.parse_quoted()?;
                Ok(QueryClause::equals(field, value))
            }
            _ => {
                let at = self.pos;
                let value = self.take_until(|c| c.is_whitespace() || c == '(' || c == ')');
                if value.is_empty() {
                    return Err(ParseError::new(at, format!("missing value for `{field}`")));
                }
                Ok(QueryClause::equals(field, value))
            }
        }
    }

    fn parse_quoted(&mut self) -> PResult<String> {
        let open = self.pos;
        self.bump();
        let mut out = String::new();
        loop {
            match self.bump() {
                None => return Err(ParseError::new(open, "unterminated quote")),
                Some('"') => return Ok(out),
                Some('\\') => match self.bump() {
                    None => return Err(ParseError::new(open, "unterminated quote")),
                    Some(c) => out.push(c),
                },
                Some(c) => out.push(c),
            }
        }
    }

    fn parse_range(&mut self, field: &str) -> PResult<QueryClause> {
        let open = self.pos;
        self.bump();
        self.skip_ws();
        let low = self.range_bound(open)?;
        if !low.quoted && low.text == "TO" {
            return Err(ParseError::new(low.at, "malformed range: missing lower bound"));
        }
        self.skip_ws();
        if self.at_end() {
            return Err(ParseError::new(open, "malformed range: missing `]`"));
        }
        if !self.eat_keyword("TO") {
            return Err(ParseError::new(self.pos, "malformed range: expected `TO`"));
        }
        self.skip_ws();
        let high = self.range_bound(open)?;
        self.skip_ws();
        match self.peek() {
            Some(']') => {
                self.bump();
            }
            None => return Err(ParseError::new(open, "malformed range: missing `]`")),
            Some(_) => return Err(ParseError::new(self.pos, "malformed range: expected `]`")),
        }

        if !low.quoted && !high.quoted && is_compact_date(&low.text) && is_compact_date(&high.text)
        {
            let lo = compact_date(&low)?;
            let hi = compact_date(&high)?;
            if lo > hi {
                return Err(ParseError::new(
                    low.at,
                    "malformed range: lower date is after upper date",
                ));
            }
            return Ok(QueryClause::date_range(field, lo, hi));
        }
        Ok(QueryClause::range(field, to_bound(low), to_bound(high)))
    }

    fn range_bound(&mut self, open: usize) -> PResult<RawBound> {
        let at = self.pos;
        match self.peek() {
            None => Err(ParseError::new(open, "malformed range: missing `]`")),
            Some(']') => Err(ParseError::new(at, "malformed range: missing bound")),
            Some('"') => Ok(RawBound {
                text: self.parse_quoted()?,
                quoted: true,
                at,
            }),
            _ => {
                let text = self.take_until(|c| c.is_whitespace() || c == ']');
                Ok(RawBound {
                    text: text.to_string(),
                    quoted: false,
                    at,
                })
            }
        }
    }
}

fn compact_date(b: &RawBound) -> PResult<NaiveDate> {
    NaiveDate::parse_from_str(&b.text, "%Y%m%d")
        .map_err(|_| ParseError::new(b.at, format!("invalid date `{}`", b.text)))
}

fn to_bound(b: RawBound) -> Bound {
    if !b.quoted && b.text == "*" {
        Bound::Unbounded
    } else {
        Bound::Value(b.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eq(f: &str, v: &str) -> QueryClause {
        QueryClause::equals(f, v)
    }

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn single_equality() {
        assert_eq!(parse("patentNumber:5123456").unwrap(), eq("patentNumber", "5123456"));
    }

    #[test]
    fn quoted_value_keeps_whitespace_and_escapes() {
        assert_eq!(
            parse(r#"title:"a \"quoted\" phrase""#).unwrap(),
            eq("title", r#"a "quoted" phrase"#)
        );
    }

    #[test]
    fn match_all() {
        assert_eq!(parse(" *:* ").unwrap(), QueryClause::MatchAll);
    }

    #[test]
    fn date_range_detected() {
        assert_eq!(
            parse("filingdate:[20010101 TO 20011231]").unwrap(),
            QueryClause::date_range("filingdate", ymd(2001, 1, 1), ymd(2001, 12, 31))
        );
    }

    #[test]
    fn lexical_and_open_ranges() {
        assert_eq!(
            parse("claims:[1 TO 10]").unwrap(),
            QueryClause::range("claims", Bound::value("1"), Bound::value("10"))
        );
        assert_eq!(
            parse("filingdate:[20010101 TO *]").unwrap(),
            QueryClause::range("filingdate", Bound::value("20010101"), Bound::Unbounded)
        );
        assert_eq!(
            parse(r#"code:["*" TO zz]"#).unwrap(),
            QueryClause::range("code", Bound::value("*"), Bound::value("zz"))
        );
    }

    #[test]
    fn quoted_eight_digit_bounds_stay_lexical() {
        assert_eq!(
            parse(r#"serial:["20010101" TO "20011231"]"#).unwrap(),
            QueryClause::range("serial", Bound::value("20010101"), Bound::value("20011231"))
        );
    }

    #[test]
    fn and_binds_tighter_than_or() {
        let q = parse("a:1 OR b:2 AND c:3").unwrap();
        assert_eq!(q, QueryClause::or(eq("a", "1"), QueryClause::and(eq("b", "2"), eq("c", "3"))));
    }

    #[test]
    fn operators_are_left_associative() {
        let q = parse("a:1 OR b:2 OR c:3").unwrap();
        assert_eq!(q, QueryClause::or(QueryClause::or(eq("a", "1"), eq("b", "2")), eq("c", "3")));
    }

    #[test]
    fn juxtaposition_is_and() {
        assert_eq!(parse("a:1 b:2").unwrap(), QueryClause::and(eq("a", "1"), eq("b", "2")));
    }

    #[test]
    fn parentheses_group() {
        let q = parse("(a:1 OR b:2) AND c:3").unwrap();
        assert_eq!(q, QueryClause::and(QueryClause::or(eq("a", "1"), eq("b", "2")), eq("c", "3")));
        let q = parse("a:1 AND(b:2 OR c:3)").unwrap();
        assert_eq!(q, QueryClause::and(eq("a", "1"), QueryClause::or(eq("b", "2"), eq("c", "3"))));
    }

    #[test]
    fn keyword_prefixed_field_names_are_fields() {
        assert_eq!(
            parse("ORDER:x ANDROID:y").unwrap(),
            QueryClause::and(eq("ORDER", "x"), eq("ANDROID", "y"))
        );
    }

    #[test]
    fn unbalanced_parentheses() {
        let e = parse("(a:1 OR b:2").unwrap_err();
        assert_eq!(e.position, 0);
        assert!(e.reason.contains("missing `)`"));
        let e = parse("a:1)").unwrap_err();
        assert_eq!(e.position, 3);
        assert!(e.reason.contains("unexpected `)`"));
    }

    #[test]
    fn deep_nesting_is_rejected() {
        let n = 10_000;
        let e = parse(&format!("{}a:1{}", "(".repeat(n), ")".repeat(n))).unwrap_err();
        assert_eq!(e.position, MAX_DEPTH);
        assert_eq!(e.reason, "nesting too deep");

        let ok = MAX_DEPTH;
        let q = parse(&format!("{}a:1{}", "(".repeat(ok), ")".repeat(ok))).unwrap();
        assert_eq!(q, eq("a", "1"));
    }

    #[test]
    fn clause_count_is_bounded() {
        let at_limit = vec!["a:1"; MAX_CLAUSES].join(" ");
        assert!(parse(&at_limit).is_ok());

        let over = vec!["a:1"; 100_000].join(" ");
        let e = parse(&over).unwrap_err();
        assert_eq!(e.reason, "too many clauses");
        assert_eq!(e.position, MAX_CLAUSES * 4);
    }

    #[test]
    fn unterminated_quote() {
        let e = parse(r#"title:"open"#).unwrap_err();
        assert_eq!(e, ParseError::new(6, "unterminated quote"));
    }

    #[test]
    fn malformed_ranges() {
        assert!(parse("a:[1 10]").unwrap_err().reason.contains("expected `TO`"));
        assert!(parse("a:[1 TO 10").unwrap_err().reason.contains("missing `]`"));
        assert!(parse("a:[1 TO]").unwrap_err().reason.contains("missing bound"));
        assert!(parse("a:[TO 5]").unwrap_err().reason.contains("missing lower bound"));
        assert!(parse("a:[1 TO 2 3]").unwrap_err().reason.contains("expected `]`"));
    }

    #[test]
    fn invalid_and_reversed_dates() {
        let e = parse("d:[20011332 TO 20020101]").unwrap_err();
        assert_eq!(e.position, 3);
        assert!(e.reason.contains("invalid date"));
        assert!(parse("d:[20020101 TO 20010101]").unwrap_err().reason.contains("after"));
    }

    #[test]
    fn dangling_and_leading_operators() {
        let e = parse("a:1 AND").unwrap_err();
        assert_eq!(e.position, 4);
        assert!(parse("a:1 OR ").is_err());
        assert!(parse("OR a:1").unwrap_err().reason.contains("unexpected `OR`"));
        assert!(parse("(a:1 AND)").is_err());
    }

    #[test]
    fn missing_pieces() {
        assert_eq!(parse("   ").unwrap_err(), ParseError::new(0, "empty criteria"));
        assert!(parse("justaword").unwrap_err().reason.contains("expected `:`"));
        assert!(parse("a:").unwrap_err().reason.contains("missing value"));
        assert!(parse(":x").unwrap_err().reason.contains("field name"));
        assert!(parse("()").unwrap_err().reason.contains("empty group"));
    }
}
