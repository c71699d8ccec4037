use super::error::CompileError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Tok {
    Ident(String),
    Str(String),
    Int(i64),
    /// Decimal literal, kept as written (`0.5`).
    Decimal(String),
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    EqEq,
    NotEq,
    Lt,
    LtE,
    Gt,
    GtE,
    Plus,
    Minus,
    Star,
    SlashSlash,
    Percent,
}

/// A token and the byte offset it starts at.
pub(crate) type Spanned = (usize, Tok);

pub(crate) fn tokenize(text: &str) -> Result<Vec<Spanned>, CompileError> {
    let error = |offset: usize, message: String| CompileError::Syntax { text: text.to_string(), offset, message };
    let mut tokens = Vec::new();
    let mut chars = text.char_indices().peekable();

    while let Some((start, ch)) = chars.next() {
        let tok = match ch {
            c if c.is_whitespace() => continue,
            '#' => break,
            '(' => Tok::LParen,
            ')' => Tok::RParen,
            '[' => Tok::LBracket,
            ']' => Tok::RBracket,
            ',' => Tok::Comma,
            '+' => Tok::Plus,
            '-' => Tok::Minus,
            '*' => Tok::Star,
            '%' => Tok::Percent,
            '/' => match chars.next_if(|&(_, c)| c == '/') {
                Some(_) => Tok::SlashSlash,
                None => return Err(error(start, "true division is not supported, use `//`".into())),
            },
            '=' => match chars.next_if(|&(_, c)| c == '=') {
                Some(_) => Tok::EqEq,
                None => return Err(error(start, "assignment is not an expression".into())),
            },
            '!' => match chars.next_if(|&(_, c)| c == '=') {
                Some(_) => Tok::NotEq,
                None => return Err(error(start, "unexpected `!`".into())),
            },
            '<' => match chars.next_if(|&(_, c)| c == '=') {
                Some(_) => Tok::LtE,
                None => Tok::Lt,
            },
            '>' => match chars.next_if(|&(_, c)| c == '=') {
                Some(_) => Tok::GtE,
                None => Tok::Gt,
            },
            quote @ ('\'' | '"') => {
                let mut value = String::new();
                loop {
                    match chars.next() {
                        Some((_, c)) if c == quote => break,
                        Some((_, '\\')) => match chars.next() {
                            Some((_, c)) => value.push(c),
                            None => return Err(error(start, "unterminated string".into())),
                        },
                        Some((_, c)) => value.push(c),
                        None => return Err(error(start, "unterminated string".into())),
                    }
                }
                Tok::Str(value)
            }
            c if c.is_ascii_digit() => {
                let mut end = start + c.len_utf8();
                while let Some((i, _)) = chars.next_if(|&(_, c)| c.is_ascii_digit() || c == '_') {
                    end = i + 1;
                }
                let fraction = chars.peek().is_some_and(|&(_, c)| c == '.')
                    && text[end + 1..].starts_with(|c: char| c.is_ascii_digit());
                if fraction {
                    chars.next();
                    while let Some((i, _)) = chars.next_if(|&(_, c)| c.is_ascii_digit()) {
                        end = i + 1;
                    }
                    Tok::Decimal(text[start..end].replace('_', ""))
                } else {
                    let digits: String = text[start..end].chars().filter(|&c| c != '_').collect();
                    let value = digits.parse().map_err(|_| error(start, format!("integer `{digits}` out of range")))?;
                    Tok::Int(value)
                }
            }
            c if is_ident_start(c) => {
                let mut end = start + c.len_utf8();
                while let Some((i, c)) = chars.next_if(|&(_, c)| is_ident_char(c)) {
                    end = i + c.len_utf8();
                }
                Tok::Ident(text[start..end].to_string())
            }
            other => return Err(error(start, format!("unexpected character `{other}`"))),
        };
        tokens.push((start, tok));
    }

    Ok(tokens)
}

fn is_ident_start(ch: char) -> bool {
    ch.is_alphabetic() || ch == '_'
}

fn is_ident_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(text: &str) -> Vec<Tok> {
        tokenize(text).unwrap().into_iter().map(|(_, tok)| tok).collect()
    }

    #[test]
    fn operators_and_literals() {
        assert_eq!(
            kinds("(Bow, 2) != 'adult' # trailing comment"),
            vec![
                Tok::LParen,
                Tok::Ident("Bow".into()),
                Tok::Comma,
                Tok::Int(2),
                Tok::RParen,
                Tok::NotEq,
                Tok::Str("adult".into()),
            ]
        );
        assert_eq!(kinds("can_live_dmg(0.5)")[2], Tok::Decimal("0.5".into()));
        assert_eq!(kinds("a<=b>c//2"), vec![
            Tok::Ident("a".into()),
            Tok::LtE,
            Tok::Ident("b".into()),
            Tok::Gt,
            Tok::Ident("c".into()),
            Tok::SlashSlash,
            Tok::Int(2)
        ]);
    }

    #[test]
    fn offsets_point_at_token_starts() {
        let tokens = tokenize("has( \"Suns Song\" )").unwrap();
        let offsets: Vec<usize> = tokens.iter().map(|(offset, _)| *offset).collect();
        assert_eq!(offsets, vec![0, 3, 5, 17]);
        assert_eq!(tokens[2].1, Tok::Str("Suns Song".into()));
    }

    #[test]
    fn bad_input_reports_offset() {
        match tokenize("Bow = 2") {
            Err(CompileError::Syntax { offset, .. }) => assert_eq!(offset, 4),
            other => panic!("expected syntax error, got {other:?}"),
        }
        assert!(tokenize("'open").is_err());
        assert!(tokenize("a / b").is_err());
        assert!(tokenize("a $ b").is_err());
    }
}
