//! SQL text rendering.
//!
//! Condition expressions are stored with bare `?` placeholders; rendering
//! numbers them in statement order (`?1`, `?2`, ...) so the bind list lines
//! up with the text no matter how the conditions were merged.

use burrow_query::{Clauses, Condition, Expressions};

/// Quote a possibly dotted identifier: `badgers.name` → `"badgers"."name"`.
///
/// A `*` segment is left bare so `badgers.*` stays usable in selects.
pub fn quote_identifier(raw: &str) -> String {
    raw.split('.')
        .map(|part| {
            if part == "*" {
                part.to_string()
            } else {
                format!("\"{}\"", part.replace('"', "\"\""))
            }
        })
        .collect::<Vec<_>>()
        .join(".")
}

/// Number of `?` placeholders outside quoted strings and identifiers
pub fn count_placeholders(expr: &str) -> usize {
    let mut count = 0;
    scan_placeholders(expr, |_| count += 1);
    count
}

/// Rewrite bare `?` placeholders as `?N`, continuing from `next`
pub(crate) fn number_placeholders(expr: &str, next: &mut usize) -> String {
    let mut out = String::with_capacity(expr.len() + 4);
    let mut last = 0;
    scan_placeholders(expr, |at| {
        *next += 1;
        out.push_str(&expr[last..=at]);
        out.push_str(&next.to_string());
        last = at + 1;
    });
    out.push_str(&expr[last..]);
    out
}

fn scan_placeholders(expr: &str, mut found: impl FnMut(usize)) {
    let mut quote: Option<char> = None;
    for (at, ch) in expr.char_indices() {
        match (quote, ch) {
            (Some(open), ch) if ch == open => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(ch),
            (None, '?') => found(at),
            (None, _) => {}
        }
    }
}

/// Render `clauses` as a SELECT statement with numbered placeholders
pub fn to_sql(clauses: &Clauses<Expressions>) -> String {
    let mut next = 0;
    let mut sql = String::from("SELECT ");

    if clauses.select.is_empty() {
        sql.push('*');
    } else {
        sql.push_str(&clauses.select.join(", "));
    }

    if let Some(table) = &clauses.from {
        sql.push_str(" FROM ");
        sql.push_str(&quote_identifier(table));
    }

    for join in &clauses.joins {
        sql.push(' ');
        sql.push_str(join);
    }

    if !clauses.filter.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&number_placeholders(&clauses.filter.joined(), &mut next));
    }

    if !clauses.group.is_empty() {
        sql.push_str(" GROUP BY ");
        sql.push_str(&clauses.group.join(", "));
    }

    if !clauses.having.is_empty() {
        sql.push_str(" HAVING ");
        sql.push_str(&number_placeholders(&clauses.having.joined(), &mut next));
    }

    if !clauses.order.is_empty() {
        sql.push_str(" ORDER BY ");
        sql.push_str(&clauses.order.join(", "));
    }

    // SQLite only accepts OFFSET after a LIMIT
    match (clauses.limit, clauses.offset) {
        (Some(limit), Some(offset)) => sql.push_str(&format!(" LIMIT {limit} OFFSET {offset}")),
        (Some(limit), None) => sql.push_str(&format!(" LIMIT {limit}")),
        (None, Some(offset)) => sql.push_str(&format!(" LIMIT -1 OFFSET {offset}")),
        (None, None) => {}
    }

    sql
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use test_case::test_case;

    #[test_case("name", "\"name\"")]
    #[test_case("badgers.name", "\"badgers\".\"name\"")]
    #[test_case("badgers.*", "\"badgers\".*")]
    #[test_case("we\"ird", "\"we\"\"ird\"")]
    fn test_quote_identifier(raw: &str, expected: &str) {
        assert_eq!(quote_identifier(raw), expected);
    }

    #[test_case("a = ?", 1)]
    #[test_case("a = ? AND b = ?", 2)]
    #[test_case("a = '?' AND b = ?", 1 ; "quoted string")]
    #[test_case("\"wh?t\" = ?", 1 ; "quoted identifier")]
    #[test_case("a = 'it''s?'", 0 ; "doubled quote")]
    fn test_count_placeholders(expr: &str, expected: usize) {
        assert_eq!(count_placeholders(expr), expected);
    }

    #[test]
    fn test_numbering_continues_across_expressions() {
        let mut next = 0;
        assert_eq!(number_placeholders("a = ? OR b = '?'", &mut next), "a = ?1 OR b = '?'");
        assert_eq!(number_placeholders("c > ?", &mut next), "c > ?2");
        assert_eq!(next, 2);
    }

    #[test]
    fn test_bare_table_selects_everything() {
        let clauses = Clauses {
            from: Some("badgers".to_string()),
            ..Clauses::default()
        };
        assert_eq!(to_sql(&clauses), "SELECT * FROM \"badgers\"");
    }

    #[test]
    fn test_full_statement() {
        let mut clauses: Clauses<Expressions> = Clauses {
            select: vec!["name".into(), "COUNT(*) AS n".into()],
            from: Some("badgers".into()),
            joins: vec!["JOIN setts ON setts.badger_id = badgers.id".into()],
            group: vec!["name".into()],
            order: vec!["name DESC".into()],
            offset: Some(5),
            ..Clauses::default()
        };
        clauses.filter.push("\"age\" > ?", [json!(3)]);
        clauses.filter.push("\"iq\" < ?", [json!(100)]);
        clauses.having.push("COUNT(*) > ?", [json!(1)]);

        assert_eq!(
            to_sql(&clauses),
            "SELECT name, COUNT(*) AS n FROM \"badgers\" \
             JOIN setts ON setts.badger_id = badgers.id \
             WHERE (\"age\" > ?1) AND (\"iq\" < ?2) GROUP BY name \
             HAVING COUNT(*) > ?3 ORDER BY name DESC LIMIT -1 OFFSET 5"
        );
    }
}
