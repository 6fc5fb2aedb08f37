//! Serializes a [`QueryClause`] into a backend query string. All backend
//! syntax quirks (escaping, bracket styles, date formats) live here.

use crate::query::{Bound, Dialect, QueryClause};
use crate::util::is_compact_date;
use chrono::NaiveDate;

pub fn render(clause: &QueryClause, dialect: Dialect) -> String {
    let mut out = String::new();
    write_clause(&mut out, clause, dialect);
    out
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Op {
    And,
    Or,
}

fn op_of(clause: &QueryClause) -> Option<Op> {
    match clause {
        QueryClause::And { .. } => Some(Op::And),
        QueryClause::Or { .. } => Some(Op::Or),
        _ => None,
    }
}

fn write_clause(out: &mut String, clause: &QueryClause, dialect: Dialect) {
    match clause {
        QueryClause::MatchAll => out.push_str("*:*"),
        QueryClause::FieldEquals { field, value } => {
            out.push_str(field);
            out.push(':');
            write_term(out, value);
        }
        QueryClause::FieldRange { field, low, high } => {
            out.push_str(field);
            out.push_str(":[");
            write_bound(out, low);
            out.push_str(" TO ");
            write_bound(out, high);
            out.push(']');
        }
        QueryClause::DateRange { field, low, high } => {
            out.push_str(field);
            out.push_str(":[");
            write_date(out, *low, dialect, false);
            out.push_str(" TO ");
            write_date(out, *high, dialect, true);
            out.push(']');
        }
        QueryClause::And { left, right } => write_binary(out, Op::And, left, right, dialect),
        QueryClause::Or { left, right } => write_binary(out, Op::Or, left, right, dialect),
    }
}

fn write_binary(
    out: &mut String,
    op: Op,
    left: &QueryClause,
    right: &QueryClause,
    dialect: Dialect,
) {
    write_operand(out, op, left, false, dialect);
    out.push_str(match op {
        Op::And => " AND ",
        Op::Or => " OR ",
    });
    write_operand(out, op, right, true, dialect);
}

fn write_operand(
    out: &mut String,
    parent: Op,
    child: &QueryClause,
    is_right: bool,
    dialect: Dialect,
) {
    // OR under AND needs grouping; a right-nested same operator does too, or
    // re-parsing would fold it to the left.
    let grouped = match op_of(child) {
        Some(Op::Or) if parent == Op::And => true,
        Some(op) if op == parent => is_right,
        _ => false,
    };
    if grouped {
        out.push('(');
        write_clause(out, child, dialect);
        out.push(')');
    } else {
        write_clause(out, child, dialect);
    }
}

fn write_bound(out: &mut String, bound: &Bound) {
    match bound {
        Bound::Unbounded => out.push('*'),
        // Bare eight-digit bounds would read back as a date range.
        Bound::Value(v) if is_compact_date(v) => write_quoted(out, v),
        Bound::Value(v) => write_term(out, v),
    }
}

fn write_date(out: &mut String, date: NaiveDate, dialect: Dialect, end_of_day: bool) {
    match dialect {
        Dialect::Standard => out.push_str(&date.format("%Y%m%d").to_string()),
        Dialect::Solr => {
            out.push_str(&date.format("%Y-%m-%d").to_string());
            out.push_str(if end_of_day { "T23:59:59Z" } else { "T00:00:00Z" });
        }
    }
}

fn is_bare_safe(v: &str) -> bool {
    !v.is_empty()
        && !v.starts_with('-')
        && !matches!(v, "AND" | "OR" | "NOT" | "TO")
        && v.chars().all(|c| c.is_alphanumeric() || matches!(c, '_' | '.' | '-'))
}

fn write_term(out: &mut String, v: &str) {
    if is_bare_safe(v) {
        out.push_str(v);
    } else {
        write_quoted(out, v);
    }
}

fn write_quoted(out: &mut String, v: &str) {
    out.push('"');
    for c in v.chars() {
        if c == '"' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse;

    fn eq(f: &str, v: &str) -> QueryClause {
        QueryClause::equals(f, v)
    }

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn renders_leaves() {
        assert_eq!(
            render(&eq("patentNumber", "5123456"), Dialect::Standard),
            "patentNumber:5123456"
        );
        assert_eq!(render(&eq("title", "fuel cell"), Dialect::Standard), r#"title:"fuel cell""#);
        assert_eq!(render(&eq("t", r#"say "hi""#), Dialect::Standard), r#"t:"say \"hi\"""#);
        assert_eq!(render(&eq("t", "-x"), Dialect::Standard), r#"t:"-x""#);
        assert_eq!(render(&eq("t", "a:b"), Dialect::Solr), r#"t:"a:b""#);
        assert_eq!(
            render(
                &QueryClause::range("n", Bound::Unbounded, Bound::value("5")),
                Dialect::Standard
            ),
            "n:[* TO 5]"
        );
    }

    #[test]
    fn date_ranges_per_dialect() {
        let q = QueryClause::date_range("filingdate", ymd(2001, 1, 1), ymd(2001, 12, 31));
        assert_eq!(render(&q, Dialect::Standard), "filingdate:[20010101 TO 20011231]");
        assert_eq!(
            render(&q, Dialect::Solr),
            "filingdate:[2001-01-01T00:00:00Z TO 2001-12-31T23:59:59Z]"
        );
    }

    #[test]
    fn parenthesizes_only_where_needed() {
        let q = QueryClause::and(QueryClause::or(eq("a", "1"), eq("b", "2")), eq("c", "3"));
        assert_eq!(render(&q, Dialect::Standard), "(a:1 OR b:2) AND c:3");
        let q = QueryClause::or(eq("a", "1"), QueryClause::and(eq("b", "2"), eq("c", "3")));
        assert_eq!(render(&q, Dialect::Standard), "a:1 OR b:2 AND c:3");
        let q = QueryClause::and(eq("a", "1"), QueryClause::and(eq("b", "2"), eq("c", "3")));
        assert_eq!(render(&q, Dialect::Standard), "a:1 AND (b:2 AND c:3)");
    }

    #[test]
    fn standard_dialect_round_trips() {
        let trees = vec![
            QueryClause::MatchAll,
            eq("title", "fuel cell"),
            eq("t", r#"back\slash "q""#),
            eq("t", "TO"),
            QueryClause::range("code", Bound::value("*"), Bound::value("zz top")),
            QueryClause::range("serial", Bound::value("20010101"), Bound::value("20011231")),
            QueryClause::range("n", Bound::Unbounded, Bound::Unbounded),
            QueryClause::date_range("filingdate", ymd(2001, 1, 1), ymd(2001, 12, 31)),
            QueryClause::and(
                QueryClause::or(eq("a", "1"), QueryClause::or(eq("b", "2"), eq("c", "3"))),
                QueryClause::and(QueryClause::MatchAll, eq("d", "x y")),
            ),
            QueryClause::or(
                QueryClause::and(eq("a", "1"), eq("b", "2")),
                QueryClause::and(eq("c", "3"), QueryClause::or(eq("d", "4"), eq("e", "5"))),
            ),
        ];
        for tree in trees {
            let rendered = render(&tree, Dialect::Standard);
            assert_eq!(parse(&rendered).unwrap(), tree, "rendered: {rendered}");
        }
    }

    #[test]
    fn parse_render_parse_is_stable() {
        let src = "a:1 b:2 OR (c:[1 TO *] AND d:[20200101 TO 20201231]) OR e:\"x y\"";
        let once = parse(src).unwrap();
        let twice = parse(&render(&once, Dialect::Standard)).unwrap();
        assert_eq!(once, twice);
    }
}
