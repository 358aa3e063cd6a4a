//! The tokenizer: byte stream in, token stream out. A small state
//! machine with one byte of lookahead, following the shape of the
//! distilled `tokenizer.c` this crate is grounded on, with source
//! positions added (spec §7 requires them; the original does not
//! track them).

use crate::ast::BinOp;
use crate::error::LexError;
use crate::names::{NameId, NamePool};
use crate::span::SourceSpan;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Keyword {
    If,
    Else,
    While,
    In,
    Void,
    Struct,
    Fn,
    Let,
    Mut,
    Const,
}

#[derive(Clone, PartialEq, Debug)]
pub enum TokenKind {
    Identifier(NameId),
    Number(f64),
    String(String),
    Boolean(bool),
    Keyword(Keyword),
    /// The raw contents between `#[` and `]`, unsplit; the parser is
    /// responsible for parsing the attribute name and arguments out
    /// of this text.
    Attribute(String),
    Operator(BinOp),
    Not,
    LeftParen,
    RightParen,
    LeftCurly,
    RightCurly,
    LeftBracket,
    RightBracket,
    Semicolon,
    Dot,
    Colon,
    Comma,
    Arrow,
    Eof,
}

#[derive(Clone, Debug)]
pub struct Token {
    pub kind: TokenKind,
    pub span: SourceSpan,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Mode {
    Select,
    Identifier,
    Number,
    String,
    Operator,
    LineComment,
    BlockComment,
    Attribute,
}

struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
    line: u32,
    column: u32,
}

impl<'a> Cursor<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Cursor {
            bytes,
            pos: 0,
            line: 1,
            column: 1,
        }
    }

    fn peek(&self) -> u8 {
        self.bytes.get(self.pos).copied().unwrap_or(0)
    }

    fn peek_next(&self) -> u8 {
        self.bytes.get(self.pos + 1).copied().unwrap_or(0)
    }

    fn span(&self) -> SourceSpan {
        SourceSpan::new(self.line, self.column)
    }

    fn advance(&mut self) {
        if self.peek() == b'\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        self.pos += 1;
    }
}

fn is_digit(ch: u8) -> bool {
    ch.is_ascii_digit()
}

fn is_operator_char(ch: u8) -> bool {
    matches!(
        ch,
        b'&' | b'|' | b'+' | b'-' | b'*' | b'/' | b'=' | b'!' | b'<' | b'>' | b'%'
    )
}

fn is_whitespace(ch: u8) -> bool {
    matches!(ch, b' ' | b'\n' | b'\r' | b'\t')
}

fn is_identifier_terminator(ch: u8) -> bool {
    is_whitespace(ch)
        || is_operator_char(ch)
        || matches!(
            ch,
            b'(' | b')' | b'{' | b'}' | b'"' | b'\'' | b';' | b'.' | b',' | b':' | b'[' | b']' | 0
        )
}

fn keyword_or_identifier(word: &str, pool: &mut NamePool) -> TokenKind {
    match word {
        "true" => TokenKind::Boolean(true),
        "false" => TokenKind::Boolean(false),
        "if" => TokenKind::Keyword(Keyword::If),
        "else" => TokenKind::Keyword(Keyword::Else),
        "while" => TokenKind::Keyword(Keyword::While),
        "in" => TokenKind::Keyword(Keyword::In),
        "void" => TokenKind::Keyword(Keyword::Void),
        "struct" => TokenKind::Keyword(Keyword::Struct),
        "fn" => TokenKind::Keyword(Keyword::Fn),
        "let" => TokenKind::Keyword(Keyword::Let),
        "mut" => TokenKind::Keyword(Keyword::Mut),
        "const" => TokenKind::Keyword(Keyword::Const),
        _ => TokenKind::Identifier(pool.intern(word)),
    }
}

/// Tokenize `source`, interning identifiers into `pool` as they are
/// found. The returned vector always ends with [`TokenKind::Eof`].
pub fn tokenize(source: &str, pool: &mut NamePool) -> Result<Vec<Token>, (LexError, SourceSpan)> {
    let bytes = source.as_bytes();
    let mut cur = Cursor::new(bytes);
    let mut mode = Mode::Select;
    let mut tokens = Vec::new();
    let mut buf = String::new();
    let mut buf_start = cur.span();

    macro_rules! emit {
        ($kind:expr, $span:expr) => {
            tokens.push(Token {
                kind: $kind,
                span: $span,
            })
        };
    }

    loop {
        if cur.peek() == 0 {
            match mode {
                Mode::Identifier => emit!(keyword_or_identifier(&buf, pool), buf_start),
                Mode::Attribute => emit!(TokenKind::Attribute(buf.clone()), buf_start),
                Mode::Number => emit!(
                    TokenKind::Number(buf.parse().map_err(|_| (
                        LexError::UnrecognizedCharacter('?'),
                        buf_start
                    ))?),
                    buf_start
                ),
                Mode::Select | Mode::LineComment => {}
                Mode::String => return Err((LexError::UnterminatedString, buf_start)),
                Mode::Operator => {
                    return Err((LexError::UnknownOperator(buf.clone()), buf_start))
                }
                Mode::BlockComment => return Err((LexError::UnterminatedComment, buf_start)),
            }
            emit!(TokenKind::Eof, cur.span());
            return Ok(tokens);
        }

        let ch = cur.peek();
        match mode {
            Mode::Select => {
                let span = cur.span();
                if ch == b'/' && cur.peek_next() == b'/' {
                    mode = Mode::LineComment;
                    cur.advance();
                } else if ch == b'/' && cur.peek_next() == b'*' {
                    mode = Mode::BlockComment;
                    cur.advance();
                } else if ch == b'#' {
                    cur.advance();
                    if cur.peek() != b'[' {
                        return Err((LexError::ExpectedAttributeOpen, cur.span()));
                    }
                    mode = Mode::Attribute;
                    buf.clear();
                    buf_start = span;
                } else if is_digit(ch) {
                    mode = Mode::Number;
                    buf.clear();
                    buf.push(ch as char);
                    buf_start = span;
                } else if is_operator_char(ch) {
                    mode = Mode::Operator;
                    buf.clear();
                    buf.push(ch as char);
                    buf_start = span;
                } else if is_whitespace(ch) {
                    // skip
                } else if ch == b'(' {
                    emit!(TokenKind::LeftParen, span);
                } else if ch == b')' {
                    emit!(TokenKind::RightParen, span);
                } else if ch == b'{' {
                    emit!(TokenKind::LeftCurly, span);
                } else if ch == b'}' {
                    emit!(TokenKind::RightCurly, span);
                } else if ch == b'[' {
                    emit!(TokenKind::LeftBracket, span);
                } else if ch == b']' {
                    emit!(TokenKind::RightBracket, span);
                } else if ch == b';' {
                    emit!(TokenKind::Semicolon, span);
                } else if ch == b'.' {
                    emit!(TokenKind::Dot, span);
                } else if ch == b':' {
                    emit!(TokenKind::Colon, span);
                } else if ch == b',' {
                    emit!(TokenKind::Comma, span);
                } else if ch == b'"' || ch == b'\'' {
                    mode = Mode::String;
                    buf.clear();
                    buf_start = span;
                } else {
                    mode = Mode::Identifier;
                    buf.clear();
                    buf.push(ch as char);
                    buf_start = span;
                }
                cur.advance();
            }
            Mode::LineComment => {
                if ch == b'\n' {
                    mode = Mode::Select;
                }
                cur.advance();
            }
            Mode::BlockComment => {
                if ch == b'*' && cur.peek_next() == b'/' {
                    cur.advance();
                    mode = Mode::Select;
                }
                cur.advance();
            }
            Mode::Number => {
                if is_digit(ch) || ch == b'.' {
                    buf.push(ch as char);
                    cur.advance();
                } else {
                    let value: f64 = buf
                        .parse()
                        .map_err(|_| (LexError::UnrecognizedCharacter(ch as char), buf_start))?;
                    emit!(TokenKind::Number(value), buf_start);
                    mode = Mode::Select;
                }
            }
            Mode::Operator => {
                let maybe_two: String = if buf.len() == 1 {
                    format!("{}{}", buf, ch as char)
                } else {
                    String::new()
                };
                let two_char = matches!(
                    maybe_two.as_str(),
                    "==" | "!=" | "<=" | ">=" | "||" | "&&" | "->"
                );
                if two_char {
                    buf.push(ch as char);
                    cur.advance();
                }
                let kind = match buf.as_str() {
                    "==" => TokenKind::Operator(BinOp::Equals),
                    "!=" => TokenKind::Operator(BinOp::NotEquals),
                    ">" => TokenKind::Operator(BinOp::Greater),
                    ">=" => TokenKind::Operator(BinOp::GreaterEqual),
                    "<" => TokenKind::Operator(BinOp::Less),
                    "<=" => TokenKind::Operator(BinOp::LessEqual),
                    "-" => TokenKind::Operator(BinOp::Sub),
                    "+" => TokenKind::Operator(BinOp::Add),
                    "/" => TokenKind::Operator(BinOp::Div),
                    "*" => TokenKind::Operator(BinOp::Mul),
                    "%" => TokenKind::Operator(BinOp::Mod),
                    "!" => TokenKind::Not,
                    "||" => TokenKind::Operator(BinOp::Or),
                    "&&" => TokenKind::Operator(BinOp::And),
                    "=" => TokenKind::Operator(BinOp::Assign),
                    "+=" => TokenKind::Operator(BinOp::AddAssign),
                    "-=" => TokenKind::Operator(BinOp::SubAssign),
                    "*=" => TokenKind::Operator(BinOp::MulAssign),
                    "/=" => TokenKind::Operator(BinOp::DivAssign),
                    "->" => TokenKind::Arrow,
                    _ => return Err((LexError::UnknownOperator(buf.clone()), buf_start)),
                };
                emit!(kind, buf_start);
                mode = Mode::Select;
            }
            Mode::String => {
                if ch == b'"' || ch == b'\'' {
                    emit!(TokenKind::String(buf.clone()), buf_start);
                    cur.advance();
                    mode = Mode::Select;
                } else {
                    buf.push(ch as char);
                    cur.advance();
                }
            }
            Mode::Identifier => {
                if is_identifier_terminator(ch) {
                    emit!(keyword_or_identifier(&buf, pool), buf_start);
                    mode = Mode::Select;
                } else {
                    buf.push(ch as char);
                    cur.advance();
                }
            }
            Mode::Attribute => {
                if ch == b']' {
                    emit!(TokenKind::Attribute(buf.clone()), buf_start);
                    cur.advance();
                    mode = Mode::Select;
                } else {
                    buf.push(ch as char);
                    cur.advance();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        let mut pool = NamePool::new();
        tokenize(src, &mut pool)
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn maximal_munch_operators() {
        let k = kinds("a == b != c <= d >= e -> f");
        assert!(k.contains(&TokenKind::Operator(BinOp::Equals)));
        assert!(k.contains(&TokenKind::Operator(BinOp::NotEquals)));
        assert!(k.contains(&TokenKind::Operator(BinOp::LessEqual)));
        assert!(k.contains(&TokenKind::Operator(BinOp::GreaterEqual)));
        assert!(k.contains(&TokenKind::Arrow));
    }

    #[test]
    fn compound_assignment_operators() {
        let k = kinds("x += 1; y -= 2; z *= 3; w /= 4;");
        assert!(k.contains(&TokenKind::Operator(BinOp::AddAssign)));
        assert!(k.contains(&TokenKind::Operator(BinOp::SubAssign)));
        assert!(k.contains(&TokenKind::Operator(BinOp::MulAssign)));
        assert!(k.contains(&TokenKind::Operator(BinOp::DivAssign)));
    }

    #[test]
    fn keywords_recognized() {
        let k = kinds("if else while in void struct fn let mut const");
        assert_eq!(
            k,
            vec![
                TokenKind::Keyword(Keyword::If),
                TokenKind::Keyword(Keyword::Else),
                TokenKind::Keyword(Keyword::While),
                TokenKind::Keyword(Keyword::In),
                TokenKind::Keyword(Keyword::Void),
                TokenKind::Keyword(Keyword::Struct),
                TokenKind::Keyword(Keyword::Fn),
                TokenKind::Keyword(Keyword::Let),
                TokenKind::Keyword(Keyword::Mut),
                TokenKind::Keyword(Keyword::Const),
            ]
        );
    }

    #[test]
    fn line_comments_and_block_comments_are_skipped() {
        let k = kinds("1 // trailing\n/* block */ 2");
        assert_eq!(k, vec![TokenKind::Number(1.0), TokenKind::Number(2.0), TokenKind::Eof]);
    }

    #[test]
    fn attribute_body_captured_verbatim() {
        let k = kinds("#[set(foo)]");
        assert_eq!(k[0], TokenKind::Attribute("set(foo)".to_string()));
    }

    #[test]
    fn unterminated_string_is_an_error() {
        let mut pool = NamePool::new();
        let err = tokenize("\"abc", &mut pool).unwrap_err();
        assert_eq!(err.0, LexError::UnterminatedString);
    }

    #[test]
    fn positions_are_tracked_across_lines() {
        let mut pool = NamePool::new();
        let tokens = tokenize("a\nb", &mut pool).unwrap();
        assert_eq!(tokens[0].span, SourceSpan::new(1, 1));
        assert_eq!(tokens[1].span, SourceSpan::new(2, 1));
    }
}
