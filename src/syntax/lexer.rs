use crate::syntax::token::{Token, TokenType, lookup_ident};

/// Lexer for the guest expression language.
///
/// Input is one command frame, so the whole source is held as a char
/// vector and scanned with a one-character lookahead.
#[derive(Debug, Clone)]
pub struct Lexer {
    input: Vec<char>,
    position: usize,
    read_position: usize,
    current_char: Option<char>,
    line: usize,
}

impl Lexer {
    pub fn new(input: impl Into<String>) -> Self {
        let mut lexer = Self {
            input: input.into().chars().collect(),
            position: 0,
            read_position: 0,
            current_char: None,
            line: 1,
        };
        lexer.read_char();
        lexer
    }

    fn read_char(&mut self) {
        self.current_char = self.input.get(self.read_position).copied();
        self.position = self.read_position;
        self.read_position += 1;
    }

    fn peek_char(&self) -> Option<char> {
        self.input.get(self.read_position).copied()
    }

    fn skip_spaces(&mut self) {
        while matches!(self.current_char, Some(' ') | Some('\t') | Some('\r')) {
            self.read_char();
        }
    }

    fn skip_comment(&mut self) {
        while self.current_char.is_some() && self.current_char != Some('\n') {
            self.read_char();
        }
    }

    pub fn next_token(&mut self) -> Token {
        self.skip_spaces();
        if self.current_char == Some('#') {
            self.skip_comment();
        }

        let line = self.line;
        let token = match self.current_char {
            None => Token::new(TokenType::Eof, "", line),
            Some('\n') => {
                self.line += 1;
                Token::new(TokenType::Newline, "\n", line)
            }
            Some('=') => {
                if self.peek_char() == Some('=') {
                    self.read_char();
                    Token::new(TokenType::Eq, "==", line)
                } else {
                    Token::new(TokenType::Assign, "=", line)
                }
            }
            Some('!') => {
                if self.peek_char() == Some('=') {
                    self.read_char();
                    Token::new(TokenType::NotEq, "!=", line)
                } else {
                    Token::new(TokenType::Illegal, "!", line)
                }
            }
            Some('<') => {
                if self.peek_char() == Some('=') {
                    self.read_char();
                    Token::new(TokenType::LtEq, "<=", line)
                } else {
                    Token::new(TokenType::Lt, "<", line)
                }
            }
            Some('>') => {
                if self.peek_char() == Some('=') {
                    self.read_char();
                    Token::new(TokenType::GtEq, ">=", line)
                } else {
                    Token::new(TokenType::Gt, ">", line)
                }
            }
            Some('+') => Token::new(TokenType::Plus, "+", line),
            Some('-') => Token::new(TokenType::Minus, "-", line),
            Some('*') => Token::new(TokenType::Star, "*", line),
            Some('/') => Token::new(TokenType::Slash, "/", line),
            Some('%') => Token::new(TokenType::Percent, "%", line),
            Some(',') => Token::new(TokenType::Comma, ",", line),
            Some(':') => Token::new(TokenType::Colon, ":", line),
            Some(';') => Token::new(TokenType::Semicolon, ";", line),
            Some('.') => {
                // `.5` is a float literal, `x.y` is attribute access.
                if self.peek_char().is_some_and(|c| c.is_ascii_digit()) {
                    return self.read_number();
                }
                Token::new(TokenType::Dot, ".", line)
            }
            Some('(') => Token::new(TokenType::LParen, "(", line),
            Some(')') => Token::new(TokenType::RParen, ")", line),
            Some('[') => Token::new(TokenType::LBracket, "[", line),
            Some(']') => Token::new(TokenType::RBracket, "]", line),
            Some('{') => Token::new(TokenType::LBrace, "{", line),
            Some('}') => Token::new(TokenType::RBrace, "}", line),
            Some(quote @ ('"' | '\'')) => return self.read_string(quote),
            Some(c) if c.is_ascii_digit() => return self.read_number(),
            Some(c) if is_ident_start(c) => return self.read_identifier(),
            Some(c) => Token::new(TokenType::Illegal, c.to_string(), line),
        };
        self.read_char();
        token
    }

    fn read_identifier(&mut self) -> Token {
        let line = self.line;
        let start = self.position;
        while self.current_char.is_some_and(is_ident_continue) {
            self.read_char();
        }
        let literal: String = self.input[start..self.position].iter().collect();
        let token_type = lookup_ident(&literal);
        Token::new(token_type, literal, line)
    }

    fn read_number(&mut self) -> Token {
        let line = self.line;
        let start = self.position;
        let mut is_float = false;

        while self.current_char.is_some_and(|c| c.is_ascii_digit()) {
            self.read_char();
        }
        if self.current_char == Some('.')
            && self.peek_char().is_none_or(|c| !is_ident_start(c))
        {
            is_float = true;
            self.read_char();
            while self.current_char.is_some_and(|c| c.is_ascii_digit()) {
                self.read_char();
            }
        }
        if matches!(self.current_char, Some('e') | Some('E')) {
            let mut ahead = self.read_position;
            if matches!(self.input.get(ahead), Some('+') | Some('-')) {
                ahead += 1;
            }
            if self.input.get(ahead).is_some_and(|c| c.is_ascii_digit()) {
                is_float = true;
                self.read_char();
                if matches!(self.current_char, Some('+') | Some('-')) {
                    self.read_char();
                }
                while self.current_char.is_some_and(|c| c.is_ascii_digit()) {
                    self.read_char();
                }
            }
        }

        let literal: String = self.input[start..self.position].iter().collect();
        let token_type = if is_float {
            TokenType::Float
        } else {
            TokenType::Int
        };
        Token::new(token_type, literal, line)
    }

    fn read_string(&mut self, quote: char) -> Token {
        let line = self.line;
        self.read_char(); // consume opening quote
        let mut value = String::new();
        loop {
            match self.current_char {
                None => return Token::new(TokenType::Illegal, value, line),
                Some(c) if c == quote => break,
                Some('\\') => {
                    self.read_char();
                    match self.current_char {
                        Some('n') => value.push('\n'),
                        Some('t') => value.push('\t'),
                        Some('r') => value.push('\r'),
                        Some('\\') => value.push('\\'),
                        Some('\'') => value.push('\''),
                        Some('"') => value.push('"'),
                        Some('0') => value.push('\0'),
                        Some(other) => {
                            // Unknown escape: keep it verbatim.
                            value.push('\\');
                            value.push(other);
                        }
                        None => return Token::new(TokenType::Illegal, value, line),
                    }
                    self.read_char();
                }
                Some('\n') => return Token::new(TokenType::Illegal, value, line),
                Some(c) => {
                    value.push(c);
                    self.read_char();
                }
            }
        }
        self.read_char(); // consume closing quote
        Token::new(TokenType::Str, value, line)
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}
