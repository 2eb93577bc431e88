//! Type-name resolution for references found in class descriptors.
//!
//! The class-file reader hands over type names in whatever form it found them:
//! source form (`java.util.Map<java.lang.String, com.acme.Order>[]`), JVM internal
//! names (`com/acme/Order`), field descriptors (`[Lcom/acme/Order;`) or generic
//! signatures (`Ljava/util/List<+Lcom/acme/Order;>;`). Everything is normalized
//! to dotted binary names so the builder can look types up in the `TypeIndex`.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeParseError {
    #[error("empty type name")]
    Empty,
    #[error("unexpected `{found}` at offset {offset}")]
    Unexpected { found: char, offset: usize },
    #[error("unexpected end of type name")]
    UnexpectedEnd,
    #[error("unknown descriptor character `{0}`")]
    UnknownDescriptor(char),
}

/// A parsed type reference. Primitive types keep their keyword as `name`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeRef {
    pub name: String,
    pub array_dims: usize,
    pub arguments: Vec<TypeRef>,
}

const PRIMITIVES: [&str; 9] = [
    "boolean", "byte", "char", "short", "int", "long", "float", "double", "void",
];

const COLLECTION_TYPES: &[&str] = &[
    "java.lang.Iterable",
    "java.util.Collection",
    "java.util.List",
    "java.util.Set",
    "java.util.SortedSet",
    "java.util.NavigableSet",
    "java.util.Queue",
    "java.util.Deque",
    "java.util.Map",
    "java.util.SortedMap",
    "java.util.NavigableMap",
    "java.util.ArrayList",
    "java.util.LinkedList",
    "java.util.Vector",
    "java.util.Stack",
    "java.util.HashSet",
    "java.util.LinkedHashSet",
    "java.util.TreeSet",
    "java.util.EnumSet",
    "java.util.HashMap",
    "java.util.LinkedHashMap",
    "java.util.TreeMap",
    "java.util.EnumMap",
    "java.util.WeakHashMap",
    "java.util.IdentityHashMap",
    "java.util.ArrayDeque",
    "java.util.PriorityQueue",
    "java.util.concurrent.ConcurrentMap",
    "java.util.concurrent.ConcurrentHashMap",
    "java.util.concurrent.ConcurrentLinkedQueue",
    "java.util.concurrent.ConcurrentLinkedDeque",
    "java.util.concurrent.CopyOnWriteArrayList",
    "java.util.concurrent.CopyOnWriteArraySet",
    "java.util.concurrent.BlockingQueue",
    "java.util.concurrent.LinkedBlockingQueue",
    "java.util.concurrent.ArrayBlockingQueue",
];

const PLATFORM_PREFIXES: [&str; 5] = ["java.", "javax.", "jdk.", "sun.", "com.sun."];

impl TypeRef {
    pub fn simple(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            array_dims: 0,
            arguments: Vec::new(),
        }
    }

    /// Parses a type name. Returns `Ok(None)` for references that name no concrete
    /// type: unbounded wildcards and type variables in signature form.
    ///
    /// A lone letter such as `V` is a source-form type variable here; use
    /// [`TypeRef::parse_descriptor`] where primitive codes are expected.
    pub fn parse(raw: &str) -> Result<Option<TypeRef>, TypeParseError> {
        Self::parse_with(raw, is_descriptor_form(raw.trim()))
    }

    /// Parses a field descriptor or generic signature, including the one-letter
    /// primitive codes (`I`, `J`, `Z`, ...).
    pub fn parse_descriptor(raw: &str) -> Result<Option<TypeRef>, TypeParseError> {
        Self::parse_with(raw, true)
    }

    fn parse_with(raw: &str, descriptor: bool) -> Result<Option<TypeRef>, TypeParseError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(TypeParseError::Empty);
        }

        let mut parser = Parser::new(trimmed);
        let parsed = if descriptor {
            parser.signature()?
        } else {
            parser.source()?
        };
        parser.skip_ws();
        parser.expect_end()?;
        Ok(parsed)
    }

    pub fn is_primitive(&self) -> bool {
        PRIMITIVES.contains(&self.name.as_str())
    }

    pub fn is_array(&self) -> bool {
        self.array_dims > 0
    }

    /// Arrays and the standard container types.
    pub fn is_collection(&self) -> bool {
        self.is_array() || COLLECTION_TYPES.contains(&self.name.as_str())
    }

    /// Every class name mentioned, outermost first.
    pub fn class_names(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.collect_names(&mut names);
        names
    }

    /// Class names of the elements held by a collection or array.
    pub fn element_class_names(&self) -> Vec<&str> {
        let mut names = Vec::new();
        if self.is_array() {
            self.collect_names(&mut names);
        } else {
            for arg in &self.arguments {
                arg.collect_names(&mut names);
            }
        }
        names
    }

    /// Erased form used in method signatures: `java.util.List`, `int[]`.
    pub fn erasure(&self) -> String {
        let mut erased = self.name.clone();
        for _ in 0..self.array_dims {
            erased.push_str("[]");
        }
        erased
    }

    fn collect_names<'a>(&'a self, out: &mut Vec<&'a str>) {
        if !self.is_primitive() {
            out.push(&self.name);
        }
        for arg in &self.arguments {
            arg.collect_names(out);
        }
    }
}

impl std::fmt::Display for TypeRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)?;
        if !self.arguments.is_empty() {
            let args: Vec<String> = self.arguments.iter().map(|a| a.to_string()).collect();
            write!(f, "<{}>", args.join(", "))?;
        }
        for _ in 0..self.array_dims {
            write!(f, "[]")?;
        }
        Ok(())
    }
}

/// JDK and vendor runtime types.
pub fn is_platform_type(name: &str) -> bool {
    PLATFORM_PREFIXES.iter().any(|p| name.starts_with(p))
}

/// Dotted binary name of a class reference in any accepted spelling, without
/// type arguments or array dimensions.
pub fn class_name(raw: &str) -> Option<String> {
    match TypeRef::parse(raw) {
        Ok(Some(parsed)) if !parsed.is_primitive() => Some(parsed.name),
        _ => None,
    }
}

/// `name(T1,T2)` with every parameter type erased, so that descriptor and
/// source spellings of the same method compare equal. Unparsable types are
/// kept verbatim and type variables erase to `java.lang.Object`.
///
/// One-letter primitive codes are read as primitives only when another
/// parameter of the same list is in descriptor form; otherwise `V` or `K` are
/// type variables, as in `put(K,V)`.
pub fn erased_signature(name: &str, parameter_types: &[String]) -> String {
    let descriptors = parameter_types
        .iter()
        .any(|raw| is_descriptor_form(raw.trim()));
    let params: Vec<String> = parameter_types
        .iter()
        .map(|raw| {
            let parsed = if descriptors && is_primitive_code(raw.trim()) {
                TypeRef::parse_descriptor(raw)
            } else {
                TypeRef::parse(raw)
            };
            match parsed {
                Ok(Some(parsed)) if is_type_variable(&parsed) => {
                    let mut erased = TypeRef::simple("java.lang.Object");
                    erased.array_dims = parsed.array_dims;
                    erased.erasure()
                }
                Ok(Some(parsed)) => parsed.erasure(),
                Ok(None) => "java.lang.Object".to_string(),
                Err(_) => raw.trim().to_string(),
            }
        })
        .collect();
    format!("{}({})", name.trim(), params.join(","))
}

// Undotted non-primitive source names, e.g. `T` or `V[]`
fn is_type_variable(parsed: &TypeRef) -> bool {
    !parsed.is_primitive() && !parsed.name.contains('.') && parsed.arguments.is_empty()
}

fn is_descriptor_form(raw: &str) -> bool {
    raw.starts_with('[') || ((raw.starts_with('L') || raw.starts_with('T')) && raw.ends_with(';'))
}

fn is_primitive_code(raw: &str) -> bool {
    let mut chars = raw.chars();
    matches!((chars.next(), chars.next()), (Some(c), None) if primitive_for_code(c).is_some())
}

fn primitive_for_code(code: char) -> Option<&'static str> {
    Some(match code {
        'B' => "byte",
        'C' => "char",
        'D' => "double",
        'F' => "float",
        'I' => "int",
        'J' => "long",
        'S' => "short",
        'Z' => "boolean",
        'V' => "void",
        _ => return None,
    })
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
}

impl Parser {
    fn new(input: &str) -> Self {
        Self {
            chars: input.chars().collect(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn next(&mut self) -> Result<char, TypeParseError> {
        let c = self.peek().ok_or(TypeParseError::UnexpectedEnd)?;
        self.pos += 1;
        Ok(c)
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn eat_str(&mut self, expected: &str) -> bool {
        let matches = expected
            .chars()
            .enumerate()
            .all(|(i, c)| self.peek_at(i) == Some(c));
        if matches {
            self.pos += expected.chars().count();
        }
        matches
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        let len = keyword.chars().count();
        let boundary = !self.peek_at(len).is_some_and(is_ident_char);
        boundary && self.eat_str(keyword)
    }

    fn unexpected(&self) -> TypeParseError {
        match self.peek() {
            Some(found) => TypeParseError::Unexpected {
                found,
                offset: self.pos,
            },
            None => TypeParseError::UnexpectedEnd,
        }
    }

    fn expect(&mut self, expected: char) -> Result<(), TypeParseError> {
        if self.eat(expected) {
            Ok(())
        } else {
            Err(self.unexpected())
        }
    }

    fn expect_end(&self) -> Result<(), TypeParseError> {
        match self.peek() {
            None => Ok(()),
            Some(_) => Err(self.unexpected()),
        }
    }

    // `com.acme.Order`, `java.util.List<? extends com.acme.Order>[]`, `com.acme.Order...`
    fn source(&mut self) -> Result<Option<TypeRef>, TypeParseError> {
        self.skip_ws();
        if self.eat('?') {
            self.skip_ws();
            if self.eat_keyword("extends") || self.eat_keyword("super") {
                return self.source();
            }
            return Ok(None);
        }

        let name = self.dotted_name()?;
        let mut parsed = TypeRef::simple(name);

        self.skip_ws();
        if self.eat('<') {
            loop {
                if let Some(arg) = self.source()? {
                    parsed.arguments.push(arg);
                }
                self.skip_ws();
                if self.eat(',') {
                    continue;
                }
                self.expect('>')?;
                break;
            }
        }

        loop {
            self.skip_ws();
            if self.eat_str("[]") || self.eat_str("...") {
                parsed.array_dims += 1;
            } else {
                break;
            }
        }

        Ok(Some(parsed))
    }

    fn dotted_name(&mut self) -> Result<String, TypeParseError> {
        let mut name = String::new();
        loop {
            let start = self.pos;
            while self.peek().is_some_and(is_ident_char) {
                name.push(self.chars[self.pos]);
                self.pos += 1;
            }
            if self.pos == start {
                return Err(self.unexpected());
            }
            let separator = match self.peek() {
                Some('/') => true,
                Some('.') => self.peek_at(1) != Some('.'),
                _ => false,
            };
            if !separator {
                return Ok(name);
            }
            self.pos += 1;
            name.push('.');
        }
    }

    // `[[I`, `Lcom/acme/Order;`, `Ljava/util/Map<TK;+Lcom/acme/Order;>;`
    fn signature(&mut self) -> Result<Option<TypeRef>, TypeParseError> {
        let code = self.next()?;
        match code {
            '[' => Ok(self.signature()?.map(|mut inner| {
                inner.array_dims += 1;
                inner
            })),
            'L' => self.class_signature().map(Some),
            'T' => {
                while self.next()? != ';' {}
                Ok(None)
            }
            other => primitive_for_code(other)
                .map(|p| Some(TypeRef::simple(p)))
                .ok_or(TypeParseError::UnknownDescriptor(other)),
        }
    }

    fn class_signature(&mut self) -> Result<TypeRef, TypeParseError> {
        let mut parsed = TypeRef::simple(self.internal_name()?);

        loop {
            if self.eat('<') {
                while !self.eat('>') {
                    match self.peek() {
                        Some('*') => self.pos += 1,
                        Some('+') | Some('-') => {
                            self.pos += 1;
                            if let Some(arg) = self.signature()? {
                                parsed.arguments.push(arg);
                            }
                        }
                        Some(_) => {
                            if let Some(arg) = self.signature()? {
                                parsed.arguments.push(arg);
                            }
                        }
                        None => return Err(TypeParseError::UnexpectedEnd),
                    }
                }
            }

            if self.eat('.') {
                let inner = self.internal_name()?;
                parsed.name = format!("{}${}", parsed.name, inner);
                continue;
            }

            self.expect(';')?;
            return Ok(parsed);
        }
    }

    fn internal_name(&mut self) -> Result<String, TypeParseError> {
        let mut name = String::new();
        while let Some(c) = self.peek() {
            match c {
                '/' => name.push('.'),
                ';' | '<' | '.' => break,
                c if is_ident_char(c) => name.push(c),
                _ => return Err(self.unexpected()),
            }
            self.pos += 1;
        }
        if name.is_empty() || name.ends_with('.') || name.starts_with('.') {
            return Err(self.unexpected());
        }
        Ok(name)
    }
}
