//! Compact signature syntax for declaring library types.
//!
//! Types: `String`, `java.util.List<E>`, `Map<K, List<V>>`, `int[]`,
//! `? extends Number`. Methods: `[static] [<T, U>] ReturnType name(ParamType [name], ...)`.
//! Simple names of well-known JDK and Groovy types are qualified; names
//! listed as type parameters become placeholders.

use std::fmt;

use crate::ty::{names, TypeDescriptor};

const WELL_KNOWN: &[(&str, &str)] = &[
    ("Object", names::OBJECT),
    ("String", names::STRING),
    ("CharSequence", names::CHAR_SEQUENCE),
    ("Boolean", names::BOOLEAN),
    ("Byte", names::BYTE),
    ("Short", names::SHORT),
    ("Character", names::CHARACTER),
    ("Integer", names::INTEGER),
    ("Long", names::LONG),
    ("Float", names::FLOAT),
    ("Double", names::DOUBLE),
    ("Number", names::NUMBER),
    ("Void", names::VOID),
    ("Class", names::CLASS),
    ("Comparable", names::COMPARABLE),
    ("Iterable", names::ITERABLE),
    ("StringBuilder", "java.lang.StringBuilder"),
    ("StringBuffer", "java.lang.StringBuffer"),
    ("Throwable", "java.lang.Throwable"),
    ("Exception", "java.lang.Exception"),
    ("RuntimeException", "java.lang.RuntimeException"),
    ("BigInteger", names::BIG_INTEGER),
    ("BigDecimal", names::BIG_DECIMAL),
    ("Collection", names::COLLECTION),
    ("List", names::LIST),
    ("ArrayList", "java.util.ArrayList"),
    ("Set", names::SET),
    ("HashSet", "java.util.HashSet"),
    ("Map", names::MAP),
    ("HashMap", "java.util.HashMap"),
    ("LinkedHashMap", "java.util.LinkedHashMap"),
    ("Map.Entry", names::MAP_ENTRY),
    ("Entry", names::MAP_ENTRY),
    ("Iterator", names::ITERATOR),
    ("Pattern", names::PATTERN),
    ("Matcher", names::MATCHER),
    ("Closure", names::CLOSURE),
    ("GString", names::GSTRING),
    ("Range", names::RANGE),
    ("IntRange", "groovy.lang.IntRange"),
    ("Script", names::SCRIPT),
    ("Binding", "groovy.lang.Binding"),
    ("PrintStream", "java.io.PrintStream"),
];

/// Expand a simple well-known name to its qualified form.
pub fn qualify(name: &str) -> &str {
    WELL_KNOWN
        .iter()
        .find(|(simple, _)| *simple == name)
        .map(|(_, qualified)| *qualified)
        .unwrap_or(name)
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignatureError {
    pub text: String,
    pub reason: &'static str,
}

impl fmt::Display for SignatureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "malformed signature `{}`: {}", self.text, self.reason)
    }
}

impl std::error::Error for SignatureError {}

/// A parsed method signature.
#[derive(Clone, Debug)]
pub struct MethodSignature {
    pub is_static: bool,
    pub type_params: Vec<String>,
    pub return_type: TypeDescriptor,
    pub name: String,
    pub params: Vec<(String, TypeDescriptor)>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Token {
    Ident(String),
    Punct(char),
}

fn tokenize(text: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut chars = text.chars().peekable();
    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
        } else if c.is_alphanumeric() || matches!(c, '_' | '$' | '.' | '?') {
            let mut ident = String::new();
            while let Some(&c) = chars.peek() {
                if c.is_alphanumeric() || matches!(c, '_' | '$' | '.') || (ident.is_empty() && c == '?') {
                    ident.push(c);
                    chars.next();
                } else {
                    break;
                }
            }
            tokens.push(Token::Ident(ident));
        } else {
            tokens.push(Token::Punct(c));
            chars.next();
        }
    }
    tokens
}

struct Parser<'a> {
    text: &'a str,
    tokens: Vec<Token>,
    pos: usize,
    type_params: &'a [String],
}

impl<'a> Parser<'a> {
    fn new(text: &'a str, type_params: &'a [String]) -> Self {
        Parser {
            text,
            tokens: tokenize(text),
            pos: 0,
            type_params,
        }
    }

    fn error(&self, reason: &'static str) -> SignatureError {
        SignatureError {
            text: self.text.to_string(),
            reason,
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn at_punct(&self, c: char) -> bool {
        self.peek() == Some(&Token::Punct(c))
    }

    fn at_ident(&self, word: &str) -> bool {
        matches!(self.peek(), Some(Token::Ident(w)) if w == word)
    }

    fn expect_punct(&mut self, c: char, reason: &'static str) -> Result<(), SignatureError> {
        if self.at_punct(c) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error(reason))
        }
    }

    fn ident(&mut self, reason: &'static str) -> Result<String, SignatureError> {
        match self.peek() {
            Some(Token::Ident(word)) => {
                let word = word.clone();
                self.pos += 1;
                Ok(word)
            }
            _ => Err(self.error(reason)),
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn ty(&mut self) -> Result<TypeDescriptor, SignatureError> {
        let name = self.ident("expected a type name")?;
        if name == "?" {
            if self.at_ident("extends") || self.at_ident("super") {
                self.pos += 1;
                return self.ty();
            }
            return Ok(TypeDescriptor::object());
        }
        let mut ty = if self.type_params.iter().any(|p| *p == name) {
            TypeDescriptor::placeholder(name)
        } else {
            TypeDescriptor::class(qualify(&name))
        };
        if self.at_punct('<') {
            self.pos += 1;
            let mut args = vec![self.ty()?];
            while self.at_punct(',') {
                self.pos += 1;
                args.push(self.ty()?);
            }
            self.expect_punct('>', "unclosed type argument list")?;
            ty = ty.with_args(args);
        }
        while self.at_punct('[') {
            self.pos += 1;
            self.expect_punct(']', "expected `]`")?;
            ty = TypeDescriptor::array_of(ty);
        }
        Ok(ty)
    }
}

/// Parse a type, treating the names in `type_params` as placeholders.
pub fn parse_type(text: &str, type_params: &[String]) -> Result<TypeDescriptor, SignatureError> {
    let mut parser = Parser::new(text, type_params);
    let ty = parser.ty()?;
    if !parser.at_end() {
        return Err(parser.error("trailing input after type"));
    }
    Ok(ty)
}

/// Parse a class header such as `java.util.Map<K, V>` into its name and
/// generic slot names (with optional `extends` bounds).
pub fn parse_class_header(
    text: &str,
) -> Result<(String, Vec<(String, Option<TypeDescriptor>)>), SignatureError> {
    let empty = Vec::new();
    let mut parser = Parser::new(text, &empty);
    let name = parser.ident("expected a class name")?;
    let mut slots = Vec::new();
    if parser.at_punct('<') {
        parser.pos += 1;
        loop {
            let slot = parser.ident("expected a type parameter")?;
            slots.push((slot, None));
            if parser.at_ident("extends") {
                parser.pos += 1;
                let bound = parser.ty()?;
                if let Some(last) = slots.last_mut() {
                    last.1 = Some(bound);
                }
            }
            if parser.at_punct(',') {
                parser.pos += 1;
                continue;
            }
            parser.expect_punct('>', "unclosed type parameter list")?;
            break;
        }
    }
    if !parser.at_end() {
        return Err(parser.error("trailing input after class header"));
    }
    Ok((qualify(&name).to_string(), slots))
}

/// Parse a method signature. `class_params` are the declaring class's type
/// parameters, which are placeholders alongside the method's own.
pub fn parse_method(text: &str, class_params: &[String]) -> Result<MethodSignature, SignatureError> {
    let header = Parser::new(text, class_params);
    let mut pos = 0;
    let mut is_static = false;
    if matches!(header.tokens.first(), Some(Token::Ident(w)) if w == "static") {
        is_static = true;
        pos = 1;
    }

    let mut type_params = Vec::new();
    if header.tokens.get(pos) == Some(&Token::Punct('<')) {
        pos += 1;
        loop {
            match header.tokens.get(pos) {
                Some(Token::Ident(name)) => type_params.push(name.clone()),
                _ => return Err(header.error("expected a method type parameter")),
            }
            pos += 1;
            match header.tokens.get(pos) {
                Some(Token::Punct(',')) => pos += 1,
                Some(Token::Punct('>')) => {
                    pos += 1;
                    break;
                }
                _ => return Err(header.error("unclosed method type parameter list")),
            }
        }
    }

    let mut in_scope: Vec<String> = class_params.to_vec();
    in_scope.extend(type_params.iter().cloned());
    let mut parser = Parser::new(text, &in_scope);
    parser.pos = pos;

    let return_type = parser.ty()?;
    let name = parser.ident("expected a method name")?;
    parser.expect_punct('(', "expected `(`")?;
    let mut params = Vec::new();
    if !parser.at_punct(')') {
        loop {
            let ty = parser.ty()?;
            let param_name = match parser.peek() {
                Some(Token::Ident(_)) => parser.ident("expected a parameter name")?,
                _ => format!("arg{}", params.len()),
            };
            params.push((param_name, ty));
            if parser.at_punct(',') {
                parser.pos += 1;
            } else {
                break;
            }
        }
    }
    parser.expect_punct(')', "expected `)`")?;
    if !parser.at_end() {
        return Err(parser.error("trailing input after method signature"));
    }

    Ok(MethodSignature {
        is_static,
        type_params,
        return_type,
        name,
        params,
    })
}
