//! Lexer for RiriLang source text.

use crate::error::CoreError;

/// Kind of a token produced by the lexer.
///
/// The lexer does not attach meaning beyond keywords and literals.
/// Numbers are always `Integer`, whether or not they carry a fraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    // Special
    Eof,

    // Identifiers and literals
    Identifier,
    Integer,
    StringLiteral,

    // Keywords
    Let,
    If,
    Else,
    While,
    For,
    Func, // func / fn
    Return,
    Class,
    New,
    This,
    Switch,
    Case,
    Default,
    Break,
    Continue,
    Import,
    Try,
    Catch,
    Finally,
    Async,
    Await,

    // Operators
    Equals,    // =
    Plus,      // +
    Minus,     // -
    Multiply,  // *
    Divide,    // /
    Modulo,    // %
    EqEq,      // ==
    NotEq,     // !=
    Less,      // <
    Greater,   // >
    LessEq,    // <=
    GreaterEq, // >=
    And,       // &&
    Or,        // ||
    Arrow,     // =>
    Question,  // ?

    // Punctuation
    OpenParen,    // (
    CloseParen,   // )
    OpenBrace,    // {
    CloseBrace,   // }
    OpenBracket,  // [
    CloseBracket, // ]
    SemiColon,    // ;
    Comma,        // ,
    Dot,          // .
    Colon,        // :
}

/// A single token with its text and 1-based position.
///
/// String literal tokens hold the raw text between the quotes, escape
/// sequences included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub line: usize,
    pub column: usize,
}

impl Token {
    pub fn is(&self, kind: TokenKind) -> bool {
        self.kind == kind
    }
}

const KEYWORDS: &[(&str, TokenKind)] = &[
    ("let", TokenKind::Let),
    ("if", TokenKind::If),
    ("else", TokenKind::Else),
    ("while", TokenKind::While),
    ("for", TokenKind::For),
    ("func", TokenKind::Func),
    ("fn", TokenKind::Func),
    ("return", TokenKind::Return),
    ("class", TokenKind::Class),
    ("new", TokenKind::New),
    ("this", TokenKind::This),
    ("switch", TokenKind::Switch),
    ("case", TokenKind::Case),
    ("default", TokenKind::Default),
    ("break", TokenKind::Break),
    ("continue", TokenKind::Continue),
    ("import", TokenKind::Import),
    ("try", TokenKind::Try),
    ("catch", TokenKind::Catch),
    ("finally", TokenKind::Finally),
    ("async", TokenKind::Async),
    ("await", TokenKind::Await),
];

pub fn keyword(text: &str) -> Option<TokenKind> {
    KEYWORDS
        .iter()
        .find(|(word, _)| *word == text)
        .map(|(_, kind)| *kind)
}

/// Lex a source string into tokens, terminated by a single `Eof` token.
///
/// Fails on the first unrecognized character or unterminated string.
pub fn tokenize(source: &str) -> Result<Vec<Token>, CoreError> {
    let mut lexer = Lexer {
        source,
        chars: source.as_bytes(),
        index: 0,
        line: 1,
        column: 1,
    };
    lexer.run()
}

struct Lexer<'src> {
    source: &'src str,
    chars: &'src [u8],
    index: usize,
    line: usize,
    column: usize,
}

impl<'src> Lexer<'src> {
    fn run(&mut self) -> Result<Vec<Token>, CoreError> {
        let mut tokens = Vec::new();

        while let Some(ch) = self.peek_char() {
            if is_whitespace(ch) {
                self.consume_char();
                continue;
            }
            if ch == b'/' && self.peek_next() == Some(b'/') {
                self.skip_line_comment();
                continue;
            }

            let (line, column) = (self.line, self.column);
            let start = self.index;
            let kind = match ch {
                b'"' => {
                    tokens.push(self.lex_string(line, column)?);
                    continue;
                }
                b'0'..=b'9' => {
                    tokens.push(self.lex_number(line, column));
                    continue;
                }
                _ if is_ident_start(ch) => {
                    tokens.push(self.lex_ident_or_keyword(line, column));
                    continue;
                }
                b'=' if self.peek_next() == Some(b'>') => self.two(TokenKind::Arrow),
                b'=' => self.one_or_two(b'=', TokenKind::EqEq, TokenKind::Equals),
                b'<' => self.one_or_two(b'=', TokenKind::LessEq, TokenKind::Less),
                b'>' => self.one_or_two(b'=', TokenKind::GreaterEq, TokenKind::Greater),
                b'!' if self.peek_next() == Some(b'=') => self.two(TokenKind::NotEq),
                b'&' if self.peek_next() == Some(b'&') => self.two(TokenKind::And),
                b'|' if self.peek_next() == Some(b'|') => self.two(TokenKind::Or),
                _ => match single_char_kind(ch) {
                    Some(kind) => {
                        self.consume_char();
                        kind
                    }
                    None => return Err(self.unexpected_char(line, column)),
                },
            };
            tokens.push(self.simple_token(kind, start, line, column));
        }

        tokens.push(Token {
            kind: TokenKind::Eof,
            text: "EOF".to_string(),
            line: self.line,
            column: self.column,
        });
        Ok(tokens)
    }

    fn simple_token(&self, kind: TokenKind, start: usize, line: usize, column: usize) -> Token {
        Token {
            kind,
            text: self.source[start..self.index].to_string(),
            line,
            column,
        }
    }

    fn one_or_two(&mut self, second: u8, double: TokenKind, single: TokenKind) -> TokenKind {
        self.consume_char();
        if self.peek_char() == Some(second) {
            self.consume_char();
            double
        } else {
            single
        }
    }

    fn two(&mut self, kind: TokenKind) -> TokenKind {
        self.consume_char();
        self.consume_char();
        kind
    }

    fn skip_line_comment(&mut self) {
        while let Some(ch) = self.peek_char() {
            if ch == b'\n' {
                break;
            }
            self.consume_char();
        }
    }

    fn lex_string(&mut self, line: usize, column: usize) -> Result<Token, CoreError> {
        // opening quote
        self.consume_char();
        let start = self.index;

        loop {
            match self.peek_char() {
                Some(b'"') => break,
                Some(b'\\') => {
                    self.consume_char();
                    match self.peek_char() {
                        None | Some(b'\n') => return Err(self.unterminated(line, column)),
                        Some(_) => self.consume_char(),
                    }
                }
                None | Some(b'\n') => return Err(self.unterminated(line, column)),
                Some(_) => self.consume_char(),
            }
        }

        let text = self.source[start..self.index].to_string();
        // closing quote
        self.consume_char();
        Ok(Token {
            kind: TokenKind::StringLiteral,
            text,
            line,
            column,
        })
    }

    fn lex_number(&mut self, line: usize, column: usize) -> Token {
        let start = self.index;
        let mut seen_dot = false;
        while let Some(ch) = self.peek_char() {
            match ch {
                b'0'..=b'9' => self.consume_char(),
                b'.' if !seen_dot => {
                    seen_dot = true;
                    self.consume_char();
                }
                _ => break,
            }
        }
        self.simple_token(TokenKind::Integer, start, line, column)
    }

    fn lex_ident_or_keyword(&mut self, line: usize, column: usize) -> Token {
        let start = self.index;
        while let Some(ch) = self.peek_char() {
            if is_ident_continue(ch) {
                self.consume_char();
            } else {
                break;
            }
        }
        let text = &self.source[start..self.index];
        let kind = keyword(text).unwrap_or(TokenKind::Identifier);
        self.simple_token(kind, start, line, column)
    }

    fn unexpected_char(&self, line: usize, column: usize) -> CoreError {
        let ch = self.source[self.index..].chars().next().unwrap_or('\0');
        CoreError::Lexical {
            message: format!("Unexpected character '{ch}'"),
            line,
            column,
        }
    }

    fn unterminated(&self, line: usize, column: usize) -> CoreError {
        CoreError::Lexical {
            message: "Unterminated string literal".to_string(),
            line,
            column,
        }
    }

    fn peek_char(&self) -> Option<u8> {
        self.chars.get(self.index).copied()
    }

    fn peek_next(&self) -> Option<u8> {
        self.chars.get(self.index + 1).copied()
    }

    fn consume_char(&mut self) {
        let Some(ch) = self.peek_char() else {
            return;
        };
        self.index += 1;
        if ch == b'\n' {
            self.line += 1;
            self.column = 1;
        } else if !is_utf8_continuation(ch) {
            self.column += 1;
        }
    }
}

fn single_char_kind(ch: u8) -> Option<TokenKind> {
    let kind = match ch {
        b'(' => TokenKind::OpenParen,
        b')' => TokenKind::CloseParen,
        b'{' => TokenKind::OpenBrace,
        b'}' => TokenKind::CloseBrace,
        b'[' => TokenKind::OpenBracket,
        b']' => TokenKind::CloseBracket,
        b';' => TokenKind::SemiColon,
        b',' => TokenKind::Comma,
        b'.' => TokenKind::Dot,
        b':' => TokenKind::Colon,
        b'+' => TokenKind::Plus,
        b'-' => TokenKind::Minus,
        b'*' => TokenKind::Multiply,
        b'/' => TokenKind::Divide,
        b'%' => TokenKind::Modulo,
        b'?' => TokenKind::Question,
        _ => return None,
    };
    Some(kind)
}

fn is_whitespace(ch: u8) -> bool {
    matches!(ch, b' ' | b'\t' | b'\n' | b'\r')
}

fn is_ident_start(ch: u8) -> bool {
    ch.is_ascii_alphabetic() || ch == b'_'
}

fn is_ident_continue(ch: u8) -> bool {
    ch.is_ascii_alphanumeric() || ch == b'_'
}

fn is_utf8_continuation(ch: u8) -> bool {
    ch & 0xC0 == 0x80
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source)
            .expect("tokenize")
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn lexes_let_with_precedence_operators() {
        let tokens = tokenize("let x = 1 + 2 * 3;").expect("tokenize");
        let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::Let,
                TokenKind::Identifier,
                TokenKind::Equals,
                TokenKind::Integer,
                TokenKind::Plus,
                TokenKind::Integer,
                TokenKind::Multiply,
                TokenKind::Integer,
                TokenKind::SemiColon,
                TokenKind::Eof,
            ]
        );
        assert_eq!(tokens[1].text, "x");
        assert_eq!(tokens[7].text, "3");
        assert_eq!(tokens[9].text, "EOF");
    }

    #[test]
    fn two_char_operators_win_over_single() {
        assert_eq!(
            kinds("== != <= >= && || => = < > ?"),
            vec![
                TokenKind::EqEq,
                TokenKind::NotEq,
                TokenKind::LessEq,
                TokenKind::GreaterEq,
                TokenKind::And,
                TokenKind::Or,
                TokenKind::Arrow,
                TokenKind::Equals,
                TokenKind::Less,
                TokenKind::Greater,
                TokenKind::Question,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn func_and_fn_are_the_same_keyword() {
        assert_eq!(kinds("func fn"), vec![TokenKind::Func, TokenKind::Func, TokenKind::Eof]);
        assert_eq!(kinds("funcs"), vec![TokenKind::Identifier, TokenKind::Eof]);
    }

    #[test]
    fn number_stops_at_second_dot() {
        let tokens = tokenize("1.2.3").expect("tokenize");
        assert_eq!(tokens[0].kind, TokenKind::Integer);
        assert_eq!(tokens[0].text, "1.2");
        assert_eq!(tokens[1].kind, TokenKind::Dot);
        assert_eq!(tokens[2].text, "3");
    }

    #[test]
    fn string_keeps_escapes_verbatim() {
        let tokens = tokenize(r#"print("a\"b\n");"#).expect("tokenize");
        assert_eq!(tokens[2].kind, TokenKind::StringLiteral);
        assert_eq!(tokens[2].text, r#"a\"b\n"#);
    }

    #[test]
    fn comments_and_whitespace_are_skipped() {
        let tokens = tokenize("// header\nlet a; // trailing\n").expect("tokenize");
        assert_eq!(tokens.len(), 4);
        assert_eq!(tokens[0].line, 2);
        assert_eq!(tokens[0].column, 1);
        assert_eq!(tokens[1].column, 5);
    }

    #[test]
    fn divide_is_not_a_comment() {
        assert_eq!(
            kinds("a / b"),
            vec![TokenKind::Identifier, TokenKind::Divide, TokenKind::Identifier, TokenKind::Eof]
        );
    }

    #[test]
    fn unterminated_string_is_lexical_error() {
        let err = tokenize("let s = \"abc\nlet t;").unwrap_err();
        match err {
            CoreError::Lexical { message, line, column } => {
                assert_eq!(message, "Unterminated string literal");
                assert_eq!((line, column), (1, 9));
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert!(matches!(tokenize("\"abc"), Err(CoreError::Lexical { .. })));
    }

    #[test]
    fn unknown_character_reports_position() {
        let err = tokenize("let a = 1;\n  a @ 2;").unwrap_err();
        match err {
            CoreError::Lexical { message, line, column } => {
                assert!(message.contains('@'));
                assert_eq!((line, column), (2, 5));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn lone_bang_and_ampersand_are_rejected() {
        assert!(tokenize("!a").is_err());
        assert!(tokenize("a & b").is_err());
    }

    #[test]
    fn non_whitespace_characters_are_never_dropped() {
        let source = "if(a>=b){c=d%2;}else{e(f,[1,2]);}";
        let tokens = tokenize(source).expect("tokenize");
        let joined: String = tokens
            .iter()
            .filter(|t| t.kind != TokenKind::Eof)
            .map(|t| t.text.as_str())
            .collect();
        assert_eq!(joined, source);
    }
}
