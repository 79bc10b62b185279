use std::fmt;

/// Kinds of tokens produced by the guest-language lexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenType {
    Illegal,
    Eof,

    Ident,
    Int,
    Float,
    Str,

    // Keywords
    True,
    False,
    NoneKw,
    Not,
    Del,

    Assign,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,

    Eq,
    NotEq,
    Lt,
    Gt,
    LtEq,
    GtEq,

    Comma,
    Colon,
    Semicolon,
    Newline,
    Dot,

    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TokenType::Illegal => "illegal",
            TokenType::Eof => "end of input",
            TokenType::Ident => "identifier",
            TokenType::Int => "integer",
            TokenType::Float => "float",
            TokenType::Str => "string",
            TokenType::True => "True",
            TokenType::False => "False",
            TokenType::NoneKw => "None",
            TokenType::Not => "not",
            TokenType::Del => "del",
            TokenType::Assign => "=",
            TokenType::Plus => "+",
            TokenType::Minus => "-",
            TokenType::Star => "*",
            TokenType::Slash => "/",
            TokenType::Percent => "%",
            TokenType::Eq => "==",
            TokenType::NotEq => "!=",
            TokenType::Lt => "<",
            TokenType::Gt => ">",
            TokenType::LtEq => "<=",
            TokenType::GtEq => ">=",
            TokenType::Comma => ",",
            TokenType::Colon => ":",
            TokenType::Semicolon => ";",
            TokenType::Newline => "newline",
            TokenType::Dot => ".",
            TokenType::LParen => "(",
            TokenType::RParen => ")",
            TokenType::LBracket => "[",
            TokenType::RBracket => "]",
            TokenType::LBrace => "{",
            TokenType::RBrace => "}",
        };
        f.write_str(name)
    }
}

/// A single lexed token. Only the line number is tracked; guest source
/// arrives one short frame at a time, so column-precise spans buy nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub token_type: TokenType,
    pub literal: String,
    pub line: usize,
}

impl Token {
    pub fn new(token_type: TokenType, literal: impl Into<String>, line: usize) -> Self {
        Self {
            token_type,
            literal: literal.into(),
            line,
        }
    }
}

/// Map an identifier to its keyword token type, if it is one.
pub fn lookup_ident(ident: &str) -> TokenType {
    match ident {
        "True" => TokenType::True,
        "False" => TokenType::False,
        "None" => TokenType::NoneKw,
        "not" => TokenType::Not,
        "del" => TokenType::Del,
        _ => TokenType::Ident,
    }
}
