/// Token types for the Lunette lexer.
use crate::ast::Span;

/// A single token produced by the lexer.
///
/// `lexeme` holds the decoded payload: the identifier for names, the
/// unescaped bytes for strings and the literal text for numbers.
#[derive(Clone, Debug)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
    pub lexeme: Vec<u8>,
}

impl Token {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.lexeme).into_owned()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenKind {
    // Literals
    Number,
    StringLit,

    // Keywords
    And,
    Break,
    Do,
    Else,
    Elseif,
    End,
    False,
    For,
    Function,
    If,
    In,
    Local,
    Nil,
    Not,
    Or,
    Repeat,
    Return,
    Then,
    True,
    Until,
    While,

    Ident,

    // Operators
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Caret,
    Hash,
    Eq,
    Neq,
    Lt,
    Le,
    Gt,
    Ge,
    Assign,
    Concat,
    Ellipsis,
    Dot,

    // Delimiters
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Comma,
    Colon,
    Semicolon,

    Eof,
}

pub fn keyword(word: &[u8]) -> Option<TokenKind> {
    Some(match word {
        b"and" => TokenKind::And,
        b"break" => TokenKind::Break,
        b"do" => TokenKind::Do,
        b"else" => TokenKind::Else,
        b"elseif" => TokenKind::Elseif,
        b"end" => TokenKind::End,
        b"false" => TokenKind::False,
        b"for" => TokenKind::For,
        b"function" => TokenKind::Function,
        b"if" => TokenKind::If,
        b"in" => TokenKind::In,
        b"local" => TokenKind::Local,
        b"nil" => TokenKind::Nil,
        b"not" => TokenKind::Not,
        b"or" => TokenKind::Or,
        b"repeat" => TokenKind::Repeat,
        b"return" => TokenKind::Return,
        b"then" => TokenKind::Then,
        b"true" => TokenKind::True,
        b"until" => TokenKind::Until,
        b"while" => TokenKind::While,
        _ => return None,
    })
}

pub fn kind_name(kind: TokenKind) -> &'static str {
    match kind {
        TokenKind::Number => "number",
        TokenKind::StringLit => "string",
        TokenKind::And => "and",
        TokenKind::Break => "break",
        TokenKind::Do => "do",
        TokenKind::Else => "else",
        TokenKind::Elseif => "elseif",
        TokenKind::End => "end",
        TokenKind::False => "false",
        TokenKind::For => "for",
        TokenKind::Function => "function",
        TokenKind::If => "if",
        TokenKind::In => "in",
        TokenKind::Local => "local",
        TokenKind::Nil => "nil",
        TokenKind::Not => "not",
        TokenKind::Or => "or",
        TokenKind::Repeat => "repeat",
        TokenKind::Return => "return",
        TokenKind::Then => "then",
        TokenKind::True => "true",
        TokenKind::Until => "until",
        TokenKind::While => "while",
        TokenKind::Ident => "identifier",
        TokenKind::Plus => "+",
        TokenKind::Minus => "-",
        TokenKind::Star => "*",
        TokenKind::Slash => "/",
        TokenKind::Percent => "%",
        TokenKind::Caret => "^",
        TokenKind::Hash => "#",
        TokenKind::Eq => "==",
        TokenKind::Neq => "~=",
        TokenKind::Lt => "<",
        TokenKind::Le => "<=",
        TokenKind::Gt => ">",
        TokenKind::Ge => ">=",
        TokenKind::Assign => "=",
        TokenKind::Concat => "..",
        TokenKind::Ellipsis => "...",
        TokenKind::Dot => ".",
        TokenKind::LParen => "(",
        TokenKind::RParen => ")",
        TokenKind::LBracket => "[",
        TokenKind::RBracket => "]",
        TokenKind::LBrace => "{",
        TokenKind::RBrace => "}",
        TokenKind::Comma => ",",
        TokenKind::Colon => ":",
        TokenKind::Semicolon => ";",
        TokenKind::Eof => "<eof>",
    }
}
