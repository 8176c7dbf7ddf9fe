//! Token rewrites applied before parsing
//!
//! sqlparser reads each nested type spelling in only some of its dialects,
//! and reads interval fields only inside expressions. These rewrites map
//! every spelling the renderer writes onto one the generic parser accepts:
//!
//! | written                  | parsed as               |
//! |--------------------------|-------------------------|
//! | `MAP<K, V>`              | `MAP(K, V)`             |
//! | `STRUCT(a T)`            | `STRUCT<a T>`           |
//! | `STRUCT<a: T>`           | `STRUCT<a T>`           |
//! | `INTERVAL DAY TO SECOND` | `INTERVAL(DAY, SECOND)` |
//!
//! The statement is then split after its column list, so the table clauses
//! can be read in any order.

use sqlparser::dialect::Dialect as ParserDialect;
use sqlparser::keywords::Keyword;
use sqlparser::tokenizer::{Token, Tokenizer, Word};
use tabspec_core::{Error, Result};

/// A single statement split after its column list
#[derive(Debug, Clone, PartialEq)]
pub struct SplitStatement {
    /// Up to and including the parenthesis closing the column list
    pub head: Vec<Token>,
    /// Table clauses after the column list
    pub clauses: Vec<Token>,
}

/// Tokenize `sql`, rewrite its type spellings and split off the clauses
pub fn prepare(dialect: &dyn ParserDialect, sql: &str) -> Result<SplitStatement> {
    let tokens = Tokenizer::new(dialect, sql)
        .tokenize()
        .map_err(|e| Error::validation(format!("Failed to parse DDL: {}", e)))?;
    let statement = single_statement(normalize_types(tokens))?;
    Ok(split_column_list(statement))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Frame {
    Paren,
    /// `STRUCT(` written out as `STRUCT<`
    StructParen,
    Angle,
    /// `MAP<` written out as `MAP(`
    MapAngle,
    StructAngle,
}

const INTERVAL_UNITS: &[Keyword] = &[
    Keyword::YEAR,
    Keyword::MONTH,
    Keyword::DAY,
    Keyword::HOUR,
    Keyword::MINUTE,
    Keyword::SECOND,
];

fn is_keyword(token: Option<&Token>, keyword: Keyword) -> bool {
    matches!(token, Some(Token::Word(w)) if w.keyword == keyword)
}

fn is_interval_unit(token: Option<&Token>) -> bool {
    matches!(token, Some(Token::Word(w)) if INTERVAL_UNITS.contains(&w.keyword))
}

/// Rewrite nested type and interval spellings; whitespace is dropped
pub fn normalize_types(tokens: Vec<Token>) -> Vec<Token> {
    let mut input = tokens
        .into_iter()
        .filter(|token| !matches!(token, Token::Whitespace(_)))
        .peekable();
    let mut out = Vec::new();
    let mut frames: Vec<Frame> = Vec::new();

    while let Some(token) = input.next() {
        match token {
            // A bare word keeps sqlparser from reading an interval expression
            Token::Word(word)
                if word.keyword == Keyword::INTERVAL && is_interval_unit(input.peek()) =>
            {
                out.push(Token::Word(Word {
                    value: word.value,
                    quote_style: None,
                    keyword: Keyword::NoKeyword,
                }));
                out.push(Token::LParen);
                out.extend(input.next());
                if is_keyword(input.peek(), Keyword::TO) {
                    input.next();
                    out.push(Token::Comma);
                    out.extend(input.next());
                }
                out.push(Token::RParen);
            }
            Token::Word(word) if word.keyword == Keyword::MAP && input.peek() == Some(&Token::Lt) => {
                input.next();
                out.push(Token::Word(word));
                out.push(Token::LParen);
                frames.push(Frame::MapAngle);
            }
            Token::Word(word)
                if word.keyword == Keyword::STRUCT && input.peek() == Some(&Token::LParen) =>
            {
                input.next();
                out.push(Token::Word(word));
                out.push(Token::Lt);
                frames.push(Frame::StructParen);
            }
            Token::Word(word)
                if matches!(word.keyword, Keyword::STRUCT | Keyword::ARRAY)
                    && input.peek() == Some(&Token::Lt) =>
            {
                input.next();
                frames.push(if word.keyword == Keyword::STRUCT {
                    Frame::StructAngle
                } else {
                    Frame::Angle
                });
                out.push(Token::Word(word));
                out.push(Token::Lt);
            }
            Token::LParen => {
                frames.push(Frame::Paren);
                out.push(Token::LParen);
            }
            Token::RParen => match frames.last() {
                Some(Frame::Paren) => {
                    frames.pop();
                    out.push(Token::RParen);
                }
                Some(Frame::StructParen) => {
                    frames.pop();
                    out.push(Token::Gt);
                }
                _ => out.push(Token::RParen),
            },
            Token::Gt => close_angle(&mut frames, &mut out),
            Token::ShiftRight if in_angle(&frames) => {
                close_angle(&mut frames, &mut out);
                close_angle(&mut frames, &mut out);
            }
            Token::Colon if matches!(frames.last(), Some(Frame::StructAngle | Frame::StructParen)) => {}
            other => out.push(other),
        }
    }
    out
}

fn in_angle(frames: &[Frame]) -> bool {
    matches!(
        frames.last(),
        Some(Frame::Angle | Frame::MapAngle | Frame::StructAngle)
    )
}

fn close_angle(frames: &mut Vec<Frame>, out: &mut Vec<Token>) {
    match frames.last() {
        Some(Frame::MapAngle) => {
            frames.pop();
            out.push(Token::RParen);
        }
        Some(Frame::Angle | Frame::StructAngle) => {
            frames.pop();
            out.push(Token::Gt);
        }
        _ => out.push(Token::Gt),
    }
}

fn single_statement(tokens: Vec<Token>) -> Result<Vec<Token>> {
    let mut statements: Vec<Vec<Token>> = vec![Vec::new()];
    for token in tokens {
        match token {
            Token::SemiColon => statements.push(Vec::new()),
            token => {
                if let Some(current) = statements.last_mut() {
                    current.push(token);
                }
            }
        }
    }
    statements.retain(|statement| !statement.is_empty());

    match statements.pop() {
        Some(statement) if statements.is_empty() => Ok(statement),
        last => Err(Error::validation(format!(
            "Expected exactly one statement, found {}.",
            statements.len() + usize::from(last.is_some())
        ))),
    }
}

fn split_column_list(mut tokens: Vec<Token>) -> SplitStatement {
    if !is_keyword(tokens.first(), Keyword::CREATE) {
        return SplitStatement {
            head: tokens,
            clauses: Vec::new(),
        };
    }

    let mut depth = 0usize;
    let mut end = None;
    for (i, token) in tokens.iter().enumerate() {
        match token {
            Token::LParen => depth += 1,
            Token::RParen if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    end = Some(i);
                    break;
                }
            }
            _ => {}
        }
    }

    let clauses = match end {
        Some(end) => tokens.split_off(end + 1),
        None => Vec::new(),
    };
    SplitStatement {
        head: tokens,
        clauses,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sqlparser::dialect::GenericDialect;

    fn rewritten(sql: &str) -> String {
        let tokens = Tokenizer::new(&GenericDialect {}, sql).tokenize().unwrap();
        normalize_types(tokens)
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[test]
    fn nested_spellings_converge() {
        assert_eq!(rewritten("MAP<TEXT, INT>"), "MAP ( TEXT , INT )");
        assert_eq!(rewritten("STRUCT(a INT, b VARCHAR(3))"), "STRUCT < a INT , b VARCHAR ( 3 ) >");
        assert_eq!(rewritten("STRUCT<a: INT>"), "STRUCT < a INT >");
        assert_eq!(
            rewritten("ARRAY<MAP<STRING, ARRAY<INT>>>"),
            "ARRAY < MAP ( STRING , ARRAY < INT > ) >"
        );
    }

    #[test]
    fn interval_fields_become_modifiers() {
        assert_eq!(rewritten("INTERVAL YEAR TO MONTH"), "INTERVAL ( YEAR , MONTH )");
        assert_eq!(rewritten("INTERVAL day"), "INTERVAL ( day )");
        assert_eq!(rewritten("INTERVAL '1' DAY"), "INTERVAL '1' DAY");
    }

    #[test]
    fn comparisons_are_left_alone() {
        assert_eq!(rewritten("(a > 1 AND b < 2)"), "( a > 1 AND b < 2 )");
    }

    #[test]
    fn clauses_split_after_column_list() {
        let tokens = Tokenizer::new(
            &GenericDialect {},
            "CREATE TABLE t (a DECIMAL(3, 1)) USING parquet LOCATION 's3://x';",
        )
        .tokenize()
        .unwrap();
        let split = split_column_list(single_statement(normalize_types(tokens)).unwrap());
        assert_eq!(split.head.last(), Some(&Token::RParen));
        assert_eq!(split.clauses.len(), 4);
    }

    #[test]
    fn statement_count_checked() {
        assert!(prepare(&GenericDialect {}, "CREATE TABLE a (x INT); CREATE TABLE b (y INT)").is_err());
        assert!(prepare(&GenericDialect {}, " ; ").is_err());
        assert!(prepare(&GenericDialect {}, "CREATE TABLE a (x INT);;").is_ok());
    }
}
