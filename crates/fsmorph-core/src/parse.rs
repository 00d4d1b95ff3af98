// Recursive-descent parser for the bracketed feature-structure literal
// syntax:
//
//   [tense=past, +neg, -plr, tm=prf|imf, sbj=[per=1]]
//   %vtype[+fin]          {%a %b}[...]        [...]/val
//
// `feat=v1|v2` value disjunction and `+-feat` boolean disjunction make
// one literal denote several concrete structures; parsing yields a
// template that is expanded into the Cartesian product of the
// alternatives. `FeatStruct::parse` requires that product to be a
// singleton; `FsSet::parse` takes all of it.

use crate::featstruct::{FeatStruct, SLASH_FEATURE, Value};
use crate::hierarchy::TypeHierarchy;
use crate::FsError;

/// Parse one feature-structure literal, expanding any disjunctions.
/// Returns one structure per combination of alternatives (unfrozen).
pub fn parse_literal(text: &str, hier: &TypeHierarchy) -> Result<Vec<FeatStruct>, FsError> {
    let mut parser = Parser::new(text, hier);
    let template = parser.parse_struct()?;
    parser.skip_ws();
    if !parser.at_end() {
        return Err(parser.error("end of literal"));
    }
    Ok(expand(&template))
}

// ---------------------------------------------------------------------------
// Templates: a parsed structure before disjunction expansion
// ---------------------------------------------------------------------------

struct Template {
    types: Vec<FeatStruct>,
    feats: Vec<(String, TValue)>,
}

enum TValue {
    Atom(Value),
    Alts(Vec<TValue>),
    Nested(Template),
}

fn expand(template: &Template) -> Vec<FeatStruct> {
    let seed = FeatStruct::new();
    for tp in &template.types {
        seed.add_type(tp.clone());
    }
    let mut results = vec![seed];
    for (name, tv) in &template.feats {
        let values = expand_value(tv);
        let mut next = Vec::with_capacity(results.len() * values.len());
        for r in &results {
            for v in &values {
                let combined = r.deep_copy();
                combined.set_feature(name.clone(), v.clone());
                next.push(combined);
            }
        }
        results = next;
    }
    results
}

fn expand_value(tv: &TValue) -> Vec<Value> {
    match tv {
        TValue::Atom(v) => vec![v.clone()],
        TValue::Alts(alts) => alts.iter().flat_map(expand_value).collect(),
        TValue::Nested(t) => expand(t).into_iter().map(Value::Struct).collect(),
    }
}

// ---------------------------------------------------------------------------
// Scanner / parser
// ---------------------------------------------------------------------------

struct Parser<'a> {
    text: &'a str,
    chars: Vec<char>,
    pos: usize,
    hier: &'a TypeHierarchy,
}

impl<'a> Parser<'a> {
    fn new(text: &'a str, hier: &'a TypeHierarchy) -> Self {
        Parser {
            text,
            chars: text.chars().collect(),
            pos: 0,
            hier,
        }
    }

    fn error(&self, expected: impl Into<String>) -> FsError {
        FsError::Parse {
            text: self.text.to_string(),
            position: self.pos,
            expected: expected.into(),
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek();
        if c.is_some() {
            self.pos += 1;
        }
        c
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.pos += 1;
        }
    }

    fn expect(&mut self, c: char) -> Result<(), FsError> {
        if self.peek() == Some(c) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error(format!("{c:?}")))
        }
    }

    fn name(&mut self) -> Result<String, FsError> {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_alphanumeric() || c == '_') {
            self.pos += 1;
        }
        if self.pos == start {
            return Err(self.error("a name"));
        }
        Ok(self.chars[start..self.pos].iter().collect())
    }

    fn lookup_type(&mut self) -> Result<FeatStruct, FsError> {
        self.expect('%')?;
        let label = self.name()?;
        self.hier
            .get(&label)
            .ok_or(FsError::UnknownType(label))
    }

    /// `%t [...]` | `{%t1 %t2} [...]` | `[...]`, with an optional
    /// trailing `/value` slash feature.
    fn parse_struct(&mut self) -> Result<Template, FsError> {
        self.skip_ws();
        let mut types = Vec::new();
        match self.peek() {
            Some('%') => types.push(self.lookup_type()?),
            Some('{') => {
                self.bump();
                loop {
                    self.skip_ws();
                    if self.peek() == Some('}') {
                        self.bump();
                        break;
                    }
                    types.push(self.lookup_type()?);
                }
            }
            _ => {}
        }
        self.skip_ws();
        self.expect('[')?;
        let mut feats = Vec::new();
        self.skip_ws();
        if self.peek() == Some(']') {
            self.bump();
        } else {
            loop {
                let (name, value) = self.parse_item()?;
                feats.push((name, value));
                self.skip_ws();
                match self.peek() {
                    Some(',') => {
                        self.bump();
                    }
                    Some(']') => {
                        self.bump();
                        break;
                    }
                    _ => return Err(self.error("',' or ']'")),
                }
            }
        }
        if self.peek() == Some('/') {
            self.bump();
            let slash = self.parse_single_value()?;
            feats.push((SLASH_FEATURE.to_string(), slash));
        }
        Ok(Template { types, feats })
    }

    /// `+f` | `-f` | `+-f` | `name=value(|value)*`
    fn parse_item(&mut self) -> Result<(String, TValue), FsError> {
        self.skip_ws();
        match self.peek() {
            Some('+') if self.peek_at(1) == Some('-') => {
                self.pos += 2;
                let name = self.name()?;
                Ok((
                    name,
                    TValue::Alts(vec![
                        TValue::Atom(Value::Bool(true)),
                        TValue::Atom(Value::Bool(false)),
                    ]),
                ))
            }
            Some('+') => {
                self.bump();
                Ok((self.name()?, TValue::Atom(Value::Bool(true))))
            }
            Some('-') => {
                self.bump();
                Ok((self.name()?, TValue::Atom(Value::Bool(false))))
            }
            _ => {
                let name = self.name()?;
                self.skip_ws();
                self.expect('=')?;
                let mut first = self.parse_single_value()?;
                if self.peek() == Some('|') {
                    let mut alts = vec![first];
                    while self.peek() == Some('|') {
                        self.bump();
                        alts.push(self.parse_single_value()?);
                    }
                    first = TValue::Alts(alts);
                }
                Ok((name, first))
            }
        }
    }

    /// A single value: nested structure, variable, integer or symbol.
    fn parse_single_value(&mut self) -> Result<TValue, FsError> {
        self.skip_ws();
        match self.peek() {
            Some('[') | Some('%') | Some('{') => Ok(TValue::Nested(self.parse_struct()?)),
            Some('?') => {
                self.bump();
                Ok(TValue::Atom(Value::Var(self.name()?)))
            }
            Some('(') => {
                self.bump();
                let mut items = Vec::new();
                loop {
                    self.skip_ws();
                    if self.peek() == Some(')') {
                        self.bump();
                        break;
                    }
                    match self.parse_single_value()? {
                        TValue::Atom(v) => items.push(v),
                        _ => return Err(self.error("an atomic sequence element")),
                    }
                }
                Ok(TValue::Atom(Value::Seq(items)))
            }
            Some(c) if c.is_ascii_digit() || (c == '-' && self.digit_follows()) => {
                let negative = c == '-';
                if negative {
                    self.bump();
                }
                let start = self.pos;
                while matches!(self.peek(), Some(d) if d.is_ascii_digit()) {
                    self.pos += 1;
                }
                let digits: String = self.chars[start..self.pos].iter().collect();
                let mut n: i64 = digits.parse().map_err(|_| self.error("an integer"))?;
                if negative {
                    n = -n;
                }
                // A trailing name character means this was a symbol
                // starting with digits, not a number.
                if matches!(self.peek(), Some(d) if d.is_alphanumeric() || d == '_') {
                    while matches!(self.peek(), Some(d) if d.is_alphanumeric() || d == '_') {
                        self.pos += 1;
                    }
                    let sym: String = self.chars[if negative { start - 1 } else { start }..self.pos]
                        .iter()
                        .collect();
                    return Ok(TValue::Atom(Value::Sym(sym)));
                }
                Ok(TValue::Atom(Value::Int(n)))
            }
            Some(_) => {
                let start = self.pos;
                while matches!(self.peek(), Some(c)
                    if !c.is_whitespace() && !matches!(c, ',' | ']' | '|' | '/' | ')' | '}'))
                {
                    self.pos += 1;
                }
                if self.pos == start {
                    return Err(self.error("a value"));
                }
                Ok(TValue::Atom(Value::Sym(
                    self.chars[start..self.pos].iter().collect(),
                )))
            }
            None => Err(self.error("a value")),
        }
    }

    fn digit_follows(&self) -> bool {
        matches!(self.peek_at(1), Some(d) if d.is_ascii_digit())
    }
}
