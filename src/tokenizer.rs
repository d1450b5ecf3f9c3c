//! Splits raw tales expressions into alternatives.
//!
//! The scanner is quote aware (`''` inside a quote is a literal quote), keeps a
//! balance counter for `(`, `{`, `[`, splits alternatives on top-level `|`
//! (a doubled `||` is unwrapped to a literal `|`) and stops without consuming
//! at a top-level `;` or `,`. It also stops where a new statement obviously
//! begins: a word or closing bracket, whitespace, then another word, quote or
//! opening paren. Callers that parse lists (`define`, `attributes`) use the
//! returned cursor position to continue from there.

use log::trace;

use crate::errors::ExpressionError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Last {
    Word,
    Other,
}

/// Cursor over an expression source.
///
/// A failed scan leaves the cursor where it was.
#[derive(Debug, Clone)]
pub struct Tokenizer<'a> {
    src: &'a str,
    pos: usize,
    terminator: Option<char>,
}

impl<'a> Tokenizer<'a> {
    pub fn new(src: &'a str) -> Self {
        Self { src, pos: 0, terminator: None }
    }

    /// Scanning also stops at an unbalanced `terminator`, as in `${ ... }`.
    pub fn with_terminator(src: &'a str, terminator: char) -> Self {
        Self { src, pos: 0, terminator: Some(terminator) }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    pub fn at_end(&self) -> bool {
        self.pos >= self.src.len()
    }

    pub fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    pub fn advance(&mut self, c: char) {
        self.pos += c.len_utf8();
    }

    pub fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if !c.is_whitespace() {
                break;
            }
            self.advance(c);
        }
    }

    pub fn at_separator(&self) -> bool {
        matches!(self.peek(), Some(';') | Some(','))
    }

    /// Consumes one `;` or `,` if present.
    pub fn skip_separator(&mut self) -> bool {
        match self.peek() {
            Some(c @ (';' | ',')) => {
                self.advance(c);
                true
            }
            _ => false,
        }
    }

    /// Reads `[A-Za-z_$][A-Za-z0-9_$-]*`, returning `None` without moving otherwise.
    pub fn read_identifier(&mut self) -> Option<&'a str> {
        let start = self.pos;
        let mut chars = self.rest().char_indices();
        match chars.next() {
            Some((_, c)) if c.is_ascii_alphabetic() || c == '_' || c == '$' => {}
            _ => return None,
        }
        let mut end = self.src.len();
        for (offset, c) in chars {
            if !(is_word_char(c) || c == '-') {
                end = start + offset;
                break;
            }
        }
        self.pos = end;
        Some(&self.src[start..end])
    }

    /// Scans one expression from the cursor and returns its alternatives.
    pub fn expression(&mut self) -> Result<Vec<String>, ExpressionError> {
        let start = self.pos;
        match self.scan() {
            Ok(alternatives) => Ok(alternatives),
            Err(e) => {
                self.pos = start;
                Err(e)
            }
        }
    }

    fn scan(&mut self) -> Result<Vec<String>, ExpressionError> {
        let start = self.pos;
        let rest = self.rest();
        let mut alternatives = Vec::new();
        let mut current = String::new();
        let mut quote: Option<(char, usize)> = None;
        let mut balance: i32 = 0;
        let mut last = Last::Other;
        let mut statement_may_end = false;
        let mut end = rest.len();

        let mut chars = rest.char_indices().peekable();
        while let Some((offset, c)) = chars.next() {
            if let Some((q, _)) = quote {
                current.push(c);
                if c == '\\' {
                    if let Some((_, escaped)) = chars.next() {
                        current.push(escaped);
                    }
                } else if c == q {
                    if matches!(chars.peek(), Some((_, next)) if *next == q) {
                        // doubled quote is a literal quote
                        if let Some((_, next)) = chars.next() {
                            current.push(next);
                        }
                    } else {
                        quote = None;
                        last = Last::Other;
                    }
                }
                continue;
            }

            if c.is_whitespace() {
                if last == Last::Word {
                    statement_may_end = true;
                }
                current.push(c);
                continue;
            }

            if balance == 0 {
                if statement_may_end && (is_word_start(c) || c == '\'' || c == '"' || c == '(') {
                    trace!("Implicit statement boundary at {} in {:?}", start + offset, self.src);
                    end = offset;
                    break;
                }
                if Some(c) == self.terminator || c == ';' || c == ',' {
                    end = offset;
                    break;
                }
                if c == '|' {
                    if matches!(chars.peek(), Some((_, '|'))) {
                        chars.next();
                        current.push('|');
                        last = Last::Other;
                        statement_may_end = false;
                        continue;
                    }
                    alternatives.push(finish_alternative(self.src, start + offset, &mut current)?);
                    last = Last::Other;
                    statement_may_end = false;
                    continue;
                }
            }
            statement_may_end = false;

            match c {
                '\'' | '"' => {
                    quote = Some((c, start + offset));
                    last = Last::Other;
                }
                '(' | '{' | '[' => {
                    balance += 1;
                    last = Last::Other;
                }
                ')' | '}' | ']' => {
                    balance -= 1;
                    if balance < 0 {
                        return Err(ExpressionError::syntax(
                            self.src,
                            start + offset,
                            format!("unbalanced `{}`", c),
                        ));
                    }
                    last = Last::Word;
                }
                c if is_word_char(c) => last = Last::Word,
                _ => last = Last::Other,
            }
            current.push(c);
        }

        if let Some((q, at)) = quote {
            return Err(ExpressionError::syntax(self.src, at, format!("unterminated {} quote", q)));
        }
        if balance != 0 {
            return Err(ExpressionError::syntax(self.src, start + end, "unbalanced brackets"));
        }

        alternatives.push(finish_alternative(self.src, start + end, &mut current)?);
        self.pos = start + end;
        trace!("Tokenized {:?} into {:?}", &rest[..end], alternatives);
        Ok(alternatives)
    }
}

fn finish_alternative(src: &str, position: usize, current: &mut String) -> Result<String, ExpressionError> {
    let text = current.trim().to_string();
    current.clear();
    if text.is_empty() {
        return Err(ExpressionError::syntax(src, position, "empty expression"));
    }
    Ok(text)
}

fn is_word_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

/// Tokenizes a complete expression; anything left after the scan stops is an error.
pub fn tokenize(src: &str) -> Result<Vec<String>, ExpressionError> {
    let mut tokenizer = Tokenizer::new(src);
    let alternatives = tokenizer.expression()?;
    tokenizer.skip_whitespace();
    if !tokenizer.at_end() {
        return Err(ExpressionError::syntax(
            src,
            tokenizer.position(),
            format!("unexpected `{}`", tokenizer.rest()),
        ));
    }
    Ok(alternatives)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_alternatives() {
        assert_eq!(tokenize("foo | 'bar'").unwrap(), vec!["foo", "'bar'"]);
        assert_eq!(tokenize("not: a|b | c").unwrap(), vec!["not: a", "b", "c"]);
    }

    #[test]
    fn doubled_pipe_is_literal() {
        assert_eq!(tokenize("a || b").unwrap(), vec!["a | b"]);
    }

    #[test]
    fn pipes_inside_quotes_and_brackets_do_not_split() {
        assert_eq!(tokenize("'a|b' | c").unwrap(), vec!["'a|b'", "c"]);
        assert_eq!(tokenize("f(a || b)").unwrap(), vec!["f(a || b)"]);
        assert_eq!(tokenize("[1, 2] | x").unwrap(), vec!["[1, 2]", "x"]);
    }

    #[test]
    fn doubled_quotes_stay_inside_the_literal() {
        assert_eq!(tokenize("'it''s'").unwrap(), vec!["'it''s'"]);
        assert_eq!(tokenize("'a\\'b' | c").unwrap(), vec!["'a\\'b'", "c"]);
    }

    #[test]
    fn separators_stop_the_scan() {
        let mut tokenizer = Tokenizer::new("1 + 2; y 3");
        assert_eq!(tokenizer.expression().unwrap(), vec!["1 + 2"]);
        assert!(tokenizer.at_separator());
        assert_eq!(tokenizer.rest(), "; y 3");
    }

    #[test]
    fn implicit_statement_boundary() {
        let mut tokenizer = Tokenizer::new("foo bar");
        assert_eq!(tokenizer.expression().unwrap(), vec!["foo"]);
        assert_eq!(tokenizer.rest(), "bar");

        let mut tokenizer = Tokenizer::new("a + b c");
        assert_eq!(tokenizer.expression().unwrap(), vec!["a + b"]);
        assert_eq!(tokenizer.rest(), "c");

        assert!(tokenize("foo bar").is_err());
    }

    #[test]
    fn terminator_ends_interpolation() {
        let mut tokenizer = Tokenizer::with_terminator("user.name } tail", '}');
        assert_eq!(tokenizer.expression().unwrap(), vec!["user.name"]);
        assert_eq!(tokenizer.peek(), Some('}'));

        let mut tokenizer = Tokenizer::with_terminator("{a: 1}.a}", '}');
        assert_eq!(tokenizer.expression().unwrap(), vec!["{a: 1}.a"]);
        assert_eq!(tokenizer.rest(), "}");
    }

    #[test]
    fn unterminated_quote_is_an_error_and_restores_position() {
        let mut tokenizer = Tokenizer::new("'abc");
        let err = tokenizer.expression().unwrap_err();
        assert!(matches!(err, ExpressionError::Syntax { position: 0, .. }));
        assert_eq!(tokenizer.position(), 0);
    }

    #[test]
    fn unbalanced_brackets_are_errors() {
        assert!(tokenize("(a").is_err());
        assert!(tokenize("a)").is_err());
    }

    #[test]
    fn empty_expressions_are_errors() {
        assert!(tokenize("").is_err());
        assert!(tokenize("a | ").is_err());
    }

    #[test]
    fn reads_identifiers() {
        let mut tokenizer = Tokenizer::new("data-id: x");
        assert_eq!(tokenizer.read_identifier(), Some("data-id"));
        assert_eq!(tokenizer.peek(), Some(':'));
        let mut tokenizer = Tokenizer::new("1x");
        assert_eq!(tokenizer.read_identifier(), None);
        assert_eq!(tokenizer.position(), 0);
    }
}
