//! Formula parser
//!
//! A recursive descent parser for Excel formulas with proper operator
//! precedence. Each rule returns the reverse Polish token run of its
//! subexpression, so the finished formula is ready for the evaluator or the
//! BIFF8 codec.

use crate::error::{FormulaError, FormulaResult};
use crate::eval::{BinaryOperator, FormulaParsingWorkbook, UnaryOperator};
use crate::functions::metadata::{
    self, FunctionMetadata, FUNCTION_INDEX_CHOOSE, FUNCTION_INDEX_EXTERNAL, FUNCTION_INDEX_IF,
    FUNCTION_INDEX_SUM, MAX_VAR_ARGS,
};
use crate::ptg::{tokens_size, AreaRef, CellRef, Ptg};
use lazy_regex::regex_captures;
use sheetcalc_core::{CellAddress, ErrorCode, SpreadsheetVersion};

/// Longest string literal a token can carry
const MAX_STRING_LEN: usize = 255;

/// Parse a formula into tokens without a workbook
///
/// The leading `=` is optional. Sheet-qualified references need a
/// workbook, and unknown function names evaluate to `#NAME?` without one;
/// use [`FormulaParser::with_workbook`].
///
/// # Example
/// ```rust
/// use sheetcalc_formula::{parse_formula, Ptg};
///
/// let ptgs = parse_formula("=1+2").unwrap();
/// assert_eq!(ptgs.len(), 3);
/// let ptgs = parse_formula("SUM(A1:A10)").unwrap();
/// assert_eq!(ptgs.last(), Some(&Ptg::AttrSum));
/// ```
pub fn parse_formula(formula: &str) -> FormulaResult<Vec<Ptg>> {
    FormulaParser::new(formula).parse()
}

/// Token types
#[derive(Debug, Clone, PartialEq)]
enum Token {
    // Literals
    Number { value: f64, integral: bool },
    String(String),
    Boolean(bool),
    Error(ErrorCode),

    // Identifiers and references
    Identifier(String),
    CellRef(CellAddress),
    WholeArea(AreaRef),
    SheetRef(String),

    // Operators
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    Percent,
    Ampersand,
    Equal,
    NotEqual,
    LessThan,
    LessEqual,
    GreaterThan,
    GreaterEqual,
    Colon,
    Comma,

    // Delimiters
    LeftParen,
    RightParen,
    LeftBrace,

    // End of input
    Eof,
}

/// A scanned token with where it started and whether whitespace preceded it
#[derive(Debug, Clone)]
struct Lexeme {
    token: Token,
    position: usize,
    spaced: bool,
}

/// Formula parser
pub struct FormulaParser<'a> {
    input: &'a str,
    pos: usize,
    current: Lexeme,
    scan_error: Option<FormulaError>,
    workbook: Option<&'a mut dyn FormulaParsingWorkbook>,
    version: SpreadsheetVersion,
}

impl<'a> FormulaParser<'a> {
    /// Create a parser for `formula` (leading `=` optional)
    pub fn new(formula: &'a str) -> Self {
        let trimmed = formula.trim_start();
        let start = formula.len() - trimmed.len();
        let start = match trimmed.strip_prefix('=') {
            Some(_) => start + 1,
            None => start,
        };
        Self {
            input: formula,
            pos: start,
            current: Lexeme {
                token: Token::Eof,
                position: start,
                spaced: false,
            },
            scan_error: None,
            workbook: None,
            version: SpreadsheetVersion::default(),
        }
    }

    /// Resolve sheet names and add-in functions through `workbook`
    pub fn with_workbook(mut self, workbook: &'a mut dyn FormulaParsingWorkbook) -> Self {
        self.workbook = Some(workbook);
        self
    }

    /// Check references against the grid of `version`
    pub fn with_version(mut self, version: SpreadsheetVersion) -> Self {
        self.version = version;
        self
    }

    /// Parse the whole formula
    pub fn parse(mut self) -> FormulaResult<Vec<Ptg>> {
        self.advance_token()?;
        if matches!(self.current_token(), Token::Eof) {
            return Err(FormulaError::parse("empty formula", self.current.position));
        }
        let ptgs = self.parse_expression()?;

        // Make sure we consumed all input
        if !matches!(self.current_token(), Token::Eof) {
            return Err(FormulaError::parse(
                format!(
                    "unexpected characters after expression: '{}'",
                    &self.input[self.current.position..]
                ),
                self.current.position,
            ));
        }
        Ok(ptgs)
    }

    // === Token scanning ===

    fn advance_token(&mut self) -> FormulaResult<()> {
        let spaced = self.skip_whitespace();
        let position = self.pos;
        let token = self.scan_token();
        if let Some(err) = self.scan_error.take() {
            return Err(err);
        }
        self.current = Lexeme {
            token,
            position,
            spaced,
        };
        Ok(())
    }

    fn fail(&mut self, message: impl Into<String>, position: usize) -> Token {
        self.scan_error = Some(FormulaError::parse(message, position));
        Token::Eof
    }

    fn scan_token(&mut self) -> Token {
        let Some(c) = self.peek_char() else {
            return Token::Eof;
        };

        // Single-character tokens
        let single = match c {
            '+' => Some(Token::Plus),
            '-' => Some(Token::Minus),
            '*' => Some(Token::Star),
            '/' => Some(Token::Slash),
            '^' => Some(Token::Caret),
            '%' => Some(Token::Percent),
            '&' => Some(Token::Ampersand),
            ':' => Some(Token::Colon),
            ',' => Some(Token::Comma),
            '(' => Some(Token::LeftParen),
            ')' => Some(Token::RightParen),
            '{' => Some(Token::LeftBrace),
            '=' => Some(Token::Equal),
            _ => None,
        };
        if let Some(token) = single {
            self.advance();
            return token;
        }

        // Two-character operators
        if c == '<' {
            self.advance();
            if self.peek_char() == Some('=') {
                self.advance();
                return Token::LessEqual;
            } else if self.peek_char() == Some('>') {
                self.advance();
                return Token::NotEqual;
            }
            return Token::LessThan;
        }

        if c == '>' {
            self.advance();
            if self.peek_char() == Some('=') {
                self.advance();
                return Token::GreaterEqual;
            }
            return Token::GreaterThan;
        }

        if c == '"' {
            return self.scan_string();
        }

        if c == '\'' {
            return self.scan_quoted_sheet();
        }

        // Whole rows and columns have to be recognised before numbers and names
        if let Some(token) = self.scan_whole_area() {
            return token;
        }

        if c.is_ascii_digit() || (c == '.' && self.peek_char_at(1).map_or(false, |c| c.is_ascii_digit())) {
            return self.scan_number();
        }

        if c == '#' {
            return self.scan_error_literal();
        }

        if c.is_alphabetic() || c == '_' || c == '$' || c == '\\' {
            return self.scan_identifier_or_ref();
        }

        let position = self.pos;
        self.fail(format!("unexpected character '{}'", c), position)
    }

    fn scan_string(&mut self) -> Token {
        let start = self.pos;
        self.advance(); // opening quote

        let mut s = String::new();
        loop {
            match self.peek_char() {
                Some('"') if self.peek_char_at(1) == Some('"') => {
                    s.push('"');
                    self.advance();
                    self.advance();
                }
                Some('"') => {
                    self.advance();
                    break;
                }
                Some(c) => {
                    s.push(c);
                    self.advance();
                }
                None => return self.fail("unterminated string literal", start),
            }
        }

        if s.chars().count() > MAX_STRING_LEN {
            return self.fail(
                format!("string literals are limited to {} characters", MAX_STRING_LEN),
                start,
            );
        }
        Token::String(s)
    }

    fn scan_quoted_sheet(&mut self) -> Token {
        let start = self.pos;
        self.advance(); // opening quote

        let mut name = String::new();
        loop {
            match self.peek_char() {
                Some('\'') if self.peek_char_at(1) == Some('\'') => {
                    name.push('\'');
                    self.advance();
                    self.advance();
                }
                Some('\'') => {
                    self.advance();
                    break;
                }
                Some(c) => {
                    name.push(c);
                    self.advance();
                }
                None => return self.fail("unterminated sheet name", start),
            }
        }

        if self.peek_char() != Some('!') {
            let position = self.pos;
            return self.fail("expected '!' after quoted sheet name", position);
        }
        self.advance();
        Token::SheetRef(name)
    }

    fn scan_whole_area(&mut self) -> Option<Token> {
        let rest = &self.input[self.pos..];
        let (area, len) = if let Some((_, text, c1, c2)) = regex_captures!(
            r"^((\$?[A-Za-z]{1,3}):(\$?[A-Za-z]{1,3}))(?:[^A-Za-z0-9_(!.]|$)",
            rest
        ) {
            let first = column_ref(c1)?;
            let last = column_ref(c2)?;
            let last_row = self.version.last_row_index();
            let area = AreaRef::new(
                CellRef { row: 0, row_relative: false, ..first },
                CellRef { row: last_row, row_relative: false, ..last },
            );
            (area, text.len())
        } else if let Some((_, text, r1, r2)) =
            regex_captures!(r"^((\$?\d+):(\$?\d+))(?:[^0-9.A-Za-z_]|$)", rest)
        {
            let first = row_ref(r1)?;
            let last = row_ref(r2)?;
            let last_col = self.version.last_column_index();
            let area = AreaRef::new(
                CellRef { col: 0, col_relative: false, ..first },
                CellRef { col: last_col, col_relative: false, ..last },
            );
            (area, text.len())
        } else {
            return None;
        };
        self.pos += len;
        Some(Token::WholeArea(area))
    }

    fn scan_number(&mut self) -> Token {
        let start = self.pos;
        let mut integral = true;

        // Integer part
        while self.peek_char().map_or(false, |c| c.is_ascii_digit()) {
            self.advance();
        }

        // Decimal part
        if self.peek_char() == Some('.') {
            integral = false;
            self.advance();
            while self.peek_char().map_or(false, |c| c.is_ascii_digit()) {
                self.advance();
            }
        }

        // Exponent part
        if self.peek_char().map_or(false, |c| c == 'e' || c == 'E') {
            integral = false;
            self.advance();
            if self.peek_char().map_or(false, |c| c == '+' || c == '-') {
                self.advance();
            }
            while self.peek_char().map_or(false, |c| c.is_ascii_digit()) {
                self.advance();
            }
        }

        let text = &self.input[start..self.pos];
        match text.parse::<f64>() {
            Ok(value) if value.is_finite() => Token::Number { value, integral },
            _ => self.fail(format!("invalid number '{}'", text), start),
        }
    }

    fn scan_error_literal(&mut self) -> Token {
        let start = self.pos;
        self.advance();
        while self
            .peek_char()
            .map_or(false, |c| c.is_ascii_alphanumeric() || c == '!' || c == '/' || c == '?')
        {
            self.advance();
        }
        let text = &self.input[start..self.pos];
        match ErrorCode::from_text(text) {
            Some(code) => Token::Error(code),
            None => self.fail(format!("unknown error literal '{}'", text), start),
        }
    }

    fn scan_identifier_or_ref(&mut self) -> Token {
        let start = self.pos;
        while self
            .peek_char()
            .map_or(false, |c| c.is_alphanumeric() || c == '_' || c == '$' || c == '.' || c == '\\')
        {
            self.advance();
        }
        let text = &self.input[start..self.pos];

        // Sheet reference (ends with !)
        if self.peek_char() == Some('!') {
            self.advance();
            return Token::SheetRef(text.to_string());
        }

        // A following '(' makes it a function call, e.g. LOG10(100)
        let is_call = self.peek_char() == Some('(');
        if !is_call {
            if text.eq_ignore_ascii_case("TRUE") {
                return Token::Boolean(true);
            }
            if text.eq_ignore_ascii_case("FALSE") {
                return Token::Boolean(false);
            }
            if is_cell_reference(text) {
                return match CellAddress::parse(text) {
                    Ok(addr) => Token::CellRef(addr),
                    Err(e) => self.fail(format!("invalid cell reference '{}': {}", text, e), start),
                };
            }
        }

        Token::Identifier(text.to_string())
    }

    // === Helper methods ===

    fn peek_char(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn peek_char_at(&self, offset: usize) -> Option<char> {
        self.input[self.pos..].chars().nth(offset)
    }

    fn advance(&mut self) {
        if let Some(c) = self.peek_char() {
            self.pos += c.len_utf8();
        }
    }

    fn skip_whitespace(&mut self) -> bool {
        let start = self.pos;
        while self.peek_char().map_or(false, |c| c.is_whitespace()) {
            self.advance();
        }
        self.pos > start
    }

    fn current_token(&self) -> &Token {
        &self.current.token
    }

    fn consume(&mut self) -> FormulaResult<Token> {
        let token = std::mem::replace(&mut self.current.token, Token::Eof);
        self.advance_token()?;
        Ok(token)
    }

    fn expect(&mut self, expected: &Token) -> FormulaResult<()> {
        if self.current_token() == expected {
            self.consume()?;
            Ok(())
        } else {
            Err(self.unexpected(&format!("{:?}", expected)))
        }
    }

    fn unexpected(&self, wanted: &str) -> FormulaError {
        FormulaError::parse(
            format!("expected {}, got {:?}", wanted, self.current_token()),
            self.current.position,
        )
    }

    fn check_bounds(&self, addr: &CellAddress, position: usize) -> FormulaResult<()> {
        if addr.row > self.version.last_row_index() || addr.col > self.version.last_column_index() {
            return Err(FormulaError::parse(
                format!("{} is outside the {:?} grid", addr, self.version),
                position,
            ));
        }
        Ok(())
    }

    // === Expression parsing with precedence ===
    // Precedence (lowest to highest):
    // 1. Comparison: =, <>, <, <=, >, >=
    // 2. Concatenation: &
    // 3. Addition/Subtraction: +, -
    // 4. Multiplication/Division: *, /
    // 5. Exponentiation: ^
    // 6. Unary: -, +, postfix %
    // 7. Intersection: (space)
    // 8. Range: :
    // 9. Primary: literals, references, function calls, parentheses

    fn parse_expression(&mut self) -> FormulaResult<Vec<Ptg>> {
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> FormulaResult<Vec<Ptg>> {
        let mut left = self.parse_concatenation()?;

        loop {
            let op = match self.current_token() {
                Token::Equal => BinaryOperator::Equal,
                Token::NotEqual => BinaryOperator::NotEqual,
                Token::LessThan => BinaryOperator::LessThan,
                Token::LessEqual => BinaryOperator::LessEqual,
                Token::GreaterThan => BinaryOperator::GreaterThan,
                Token::GreaterEqual => BinaryOperator::GreaterEqual,
                _ => break,
            };

            self.consume()?;
            let right = self.parse_concatenation()?;
            binary(&mut left, right, op);
        }

        Ok(left)
    }

    fn parse_concatenation(&mut self) -> FormulaResult<Vec<Ptg>> {
        let mut left = self.parse_additive()?;

        while matches!(self.current_token(), Token::Ampersand) {
            self.consume()?;
            let right = self.parse_additive()?;
            binary(&mut left, right, BinaryOperator::Concat);
        }

        Ok(left)
    }

    fn parse_additive(&mut self) -> FormulaResult<Vec<Ptg>> {
        let mut left = self.parse_multiplicative()?;

        loop {
            let op = match self.current_token() {
                Token::Plus => BinaryOperator::Add,
                Token::Minus => BinaryOperator::Subtract,
                _ => break,
            };

            self.consume()?;
            let right = self.parse_multiplicative()?;
            binary(&mut left, right, op);
        }

        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> FormulaResult<Vec<Ptg>> {
        let mut left = self.parse_exponent()?;

        loop {
            let op = match self.current_token() {
                Token::Star => BinaryOperator::Multiply,
                Token::Slash => BinaryOperator::Divide,
                _ => break,
            };

            self.consume()?;
            let right = self.parse_exponent()?;
            binary(&mut left, right, op);
        }

        Ok(left)
    }

    fn parse_exponent(&mut self) -> FormulaResult<Vec<Ptg>> {
        let mut left = self.parse_unary()?;

        while matches!(self.current_token(), Token::Caret) {
            self.consume()?;
            let right = self.parse_unary()?;
            binary(&mut left, right, BinaryOperator::Power);
        }

        Ok(left)
    }

    fn parse_unary(&mut self) -> FormulaResult<Vec<Ptg>> {
        let prefix = match self.current_token() {
            Token::Minus => Some(UnaryOperator::Negate),
            Token::Plus => Some(UnaryOperator::Plus),
            _ => None,
        };
        if let Some(op) = prefix {
            self.consume()?;
            let mut operand = self.parse_unary()?;
            operand.push(Ptg::Unary(op));
            return Ok(operand);
        }

        // Parse operand, then check for postfix percent
        let mut ptgs = self.parse_intersection()?;

        while matches!(self.current_token(), Token::Percent) {
            self.consume()?;
            ptgs.push(Ptg::Unary(UnaryOperator::Percent));
        }

        Ok(ptgs)
    }

    fn parse_intersection(&mut self) -> FormulaResult<Vec<Ptg>> {
        let mut left = self.parse_range()?;

        // Whitespace between two references is the intersection operator
        while self.current.spaced && starts_reference(self.current_token()) && yields_reference(&left) {
            let right = self.parse_range()?;
            binary(&mut left, right, BinaryOperator::Intersect);
        }

        Ok(left)
    }

    fn parse_range(&mut self) -> FormulaResult<Vec<Ptg>> {
        let mut left = self.parse_primary()?;

        while matches!(self.current_token(), Token::Colon) {
            let position = self.current.position;
            self.consume()?;
            let right = self.parse_primary()?;

            // Two plain cell references on the same sheet form an area
            let area = match (left.as_slice(), right.as_slice()) {
                ([Ptg::Ref(first)], [Ptg::Ref(last)]) => Some(Ptg::Area(AreaRef::new(*first, *last))),
                ([Ptg::Ref3d { ixti, cell: first }], [Ptg::Ref(last)]) => Some(Ptg::Area3d {
                    ixti: *ixti,
                    area: AreaRef::new(*first, *last),
                }),
                _ => None,
            };
            match area {
                Some(area) => left = vec![area],
                None if yields_reference(&left) && yields_reference(&right) => {
                    binary(&mut left, right, BinaryOperator::Range)
                }
                None => return Err(FormulaError::parse("':' needs references on both sides", position)),
            }
        }

        Ok(left)
    }

    fn parse_primary(&mut self) -> FormulaResult<Vec<Ptg>> {
        let position = self.current.position;
        match self.current_token().clone() {
            Token::Number { value, integral } => {
                self.consume()?;
                let ptg = if integral && value <= u16::MAX as f64 {
                    Ptg::Int(value as u16)
                } else {
                    Ptg::Number(value)
                };
                Ok(vec![ptg])
            }

            Token::String(s) => {
                self.consume()?;
                Ok(vec![Ptg::Str(s)])
            }

            Token::Boolean(b) => {
                self.consume()?;
                Ok(vec![Ptg::Bool(b)])
            }

            Token::Error(code) => {
                self.consume()?;
                Ok(vec![Ptg::Error(code)])
            }

            Token::LeftParen => {
                self.consume()?;
                let mut ptgs = self.parse_expression()?;
                self.expect(&Token::RightParen)?;
                ptgs.push(Ptg::Paren);
                Ok(ptgs)
            }

            Token::LeftBrace => Err(FormulaError::parse("array constants are not supported", position)),

            Token::SheetRef(sheet) => {
                self.consume()?;
                self.parse_sheet_reference(&sheet, position)
            }

            Token::CellRef(addr) => {
                self.consume()?;
                self.check_bounds(&addr, position)?;
                Ok(vec![Ptg::Ref(CellRef::from(addr))])
            }

            Token::WholeArea(area) => {
                self.consume()?;
                Ok(vec![Ptg::Area(area)])
            }

            Token::Identifier(name) => {
                self.consume()?;
                if matches!(self.current_token(), Token::LeftParen) {
                    self.parse_function_call(&name, position)
                } else {
                    // Defined names are not supported, so the name is undefined
                    log::debug!("undefined name '{}'", name);
                    Ok(vec![Ptg::Error(ErrorCode::Name)])
                }
            }

            _ => Err(self.unexpected("an operand")),
        }
    }

    fn parse_sheet_reference(&mut self, sheet: &str, position: usize) -> FormulaResult<Vec<Ptg>> {
        let ixti = match self.workbook.as_deref_mut() {
            Some(workbook) => workbook.extern_sheet_index(sheet).ok_or_else(|| {
                FormulaError::InvalidReference(format!("unknown sheet '{}'", sheet))
            })?,
            None => {
                return Err(FormulaError::parse(
                    format!("reference to sheet '{}' needs a workbook", sheet),
                    position,
                ))
            }
        };

        // After Sheet1!, we expect a cell reference or a whole row/column
        let reference_at = self.current.position;
        match self.current_token().clone() {
            Token::CellRef(addr) => {
                self.consume()?;
                self.check_bounds(&addr, reference_at)?;
                Ok(vec![Ptg::Ref3d {
                    ixti,
                    cell: CellRef::from(addr),
                }])
            }
            Token::WholeArea(area) => {
                self.consume()?;
                Ok(vec![Ptg::Area3d { ixti, area }])
            }
            _ => Err(self.unexpected("a cell reference after the sheet name")),
        }
    }

    fn parse_function_call(&mut self, name: &str, position: usize) -> FormulaResult<Vec<Ptg>> {
        self.expect(&Token::LeftParen)?;

        let mut args: Vec<Vec<Ptg>> = Vec::new();
        if !matches!(self.current_token(), Token::RightParen) {
            loop {
                args.push(self.parse_argument()?);
                if matches!(self.current_token(), Token::Comma) {
                    self.consume()?;
                } else {
                    break;
                }
            }
        }
        self.expect(&Token::RightParen)?;

        let Some(meta) = metadata::lookup_by_name(name) else {
            return self.external_call(name, args, position);
        };
        self.check_arity(meta, args.len())?;

        Ok(match meta.index {
            FUNCTION_INDEX_IF => encode_if(args)?,
            FUNCTION_INDEX_CHOOSE => encode_choose(args)?,
            FUNCTION_INDEX_SUM if args.len() == 1 => {
                let mut ptgs: Vec<Ptg> = args.into_iter().flatten().collect();
                ptgs.push(Ptg::AttrSum);
                ptgs
            }
            index => {
                let argc = args.len();
                let mut ptgs: Vec<Ptg> = args.into_iter().flatten().collect();
                ptgs.push(if meta.has_fixed_args() {
                    Ptg::Func { index }
                } else {
                    Ptg::FuncVar {
                        index,
                        argc: argc as u8,
                    }
                });
                ptgs
            }
        })
    }

    /// An empty argument slot is a missing argument
    fn parse_argument(&mut self) -> FormulaResult<Vec<Ptg>> {
        match self.current_token() {
            Token::Comma | Token::RightParen => Ok(vec![Ptg::MissingArg]),
            _ => self.parse_expression(),
        }
    }

    fn check_arity(&self, meta: &FunctionMetadata, argc: usize) -> FormulaResult<()> {
        let max = if meta.max_args >= MAX_VAR_ARGS {
            self.version.max_function_args()
        } else {
            meta.max_args as usize
        };
        if argc < meta.min_args as usize || argc > max {
            return Err(FormulaError::ArgumentCount {
                function: meta.name.to_string(),
                expected: meta.arity_text(),
                actual: argc,
            });
        }
        Ok(())
    }

    /// Call through `EXTERNAL_FUNC`
    ///
    /// Without a workbook to record the name in, the name slot holds `#NAME?`
    /// so the call evaluates to that error.
    fn external_call(&mut self, name: &str, args: Vec<Vec<Ptg>>, position: usize) -> FormulaResult<Vec<Ptg>> {
        if args.len() >= self.version.max_function_args() {
            return Err(FormulaError::parse(
                format!("too many arguments to {}", name),
                position,
            ));
        }
        let name_slot = match self.workbook.as_deref_mut() {
            Some(workbook) => {
                let (ixti, name_index) = workbook.external_name_index(name);
                Ptg::NameX { ixti, name_index }
            }
            None => {
                log::debug!("unknown function '{}' with no workbook", name);
                Ptg::Error(ErrorCode::Name)
            }
        };
        let argc = args.len() as u8 + 1;
        let mut ptgs = vec![name_slot];
        ptgs.extend(args.into_iter().flatten());
        ptgs.push(Ptg::FuncVar {
            index: FUNCTION_INDEX_EXTERNAL,
            argc,
        });
        Ok(ptgs)
    }
}

fn binary(left: &mut Vec<Ptg>, right: Vec<Ptg>, op: BinaryOperator) {
    left.extend(right);
    left.push(Ptg::Binary(op));
}

fn skip_distance(bytes: usize) -> FormulaResult<u16> {
    u16::try_from(bytes).map_err(|_| FormulaError::Encoding(format!("branch of {} bytes is too long", bytes)))
}

/// IF with `AttrIf`/`AttrSkip` so only the taken branch is evaluated
fn encode_if(args: Vec<Vec<Ptg>>) -> FormulaResult<Vec<Ptg>> {
    let mut args = args.into_iter();
    let (Some(condition), Some(if_true)) = (args.next(), args.next()) else {
        return Err(FormulaError::Encoding("IF needs a condition and a value".into()));
    };
    let if_false = args.next();

    let skip_size = Ptg::AttrSkip { data: 0 }.size();
    let func_size = Ptg::FuncVar { index: 0, argc: 0 }.size();

    let mut ptgs = condition;
    ptgs.push(Ptg::AttrIf {
        data: skip_distance(tokens_size(&if_true) + skip_size)?,
    });
    ptgs.extend(if_true);

    let argc = match if_false {
        Some(if_false) => {
            let jump = tokens_size(&if_false) + skip_size + func_size - 1;
            ptgs.push(Ptg::AttrSkip {
                data: skip_distance(jump)?,
            });
            ptgs.extend(if_false);
            3
        }
        None => 2,
    };
    ptgs.push(Ptg::AttrSkip {
        data: skip_distance(func_size - 1)?,
    });
    ptgs.push(Ptg::FuncVar {
        index: FUNCTION_INDEX_IF,
        argc,
    });
    Ok(ptgs)
}

/// CHOOSE with an `AttrChoose` jump table and an `AttrSkip` after each option
fn encode_choose(args: Vec<Vec<Ptg>>) -> FormulaResult<Vec<Ptg>> {
    let mut args = args.into_iter();
    let Some(index) = args.next() else {
        return Err(FormulaError::Encoding("CHOOSE needs an index".into()));
    };
    let options: Vec<Vec<Ptg>> = args.collect();
    let n = options.len();

    let skip_size = Ptg::AttrSkip { data: 0 }.size();
    let func_size = Ptg::FuncVar { index: 0, argc: 0 }.size();
    let table = 2 * (n + 1);
    let spans: Vec<usize> = options.iter().map(|o| tokens_size(o) + skip_size).collect();
    let total: usize = spans.iter().sum();

    let mut jump_table = Vec::with_capacity(n);
    let mut offset = 0;
    for span in &spans {
        jump_table.push(skip_distance(table + offset)?);
        offset += span;
    }

    let mut ptgs = index;
    ptgs.push(Ptg::AttrChoose {
        jump_table,
        choose_func_offset: skip_distance(table + total)?,
    });
    let mut remaining = total;
    for (option, span) in options.into_iter().zip(spans) {
        remaining -= span;
        ptgs.extend(option);
        ptgs.push(Ptg::AttrSkip {
            data: skip_distance(remaining + func_size - 1)?,
        });
    }
    ptgs.push(Ptg::FuncVar {
        index: FUNCTION_INDEX_CHOOSE,
        argc: n as u8 + 1,
    });
    Ok(ptgs)
}

/// Cell reference pattern: `[$]A-XFD[$]1-1048576`
fn is_cell_reference(text: &str) -> bool {
    regex_captures!(r"^\$?[A-Za-z]{1,3}\$?[0-9]+$", text).is_some()
}

fn column_ref(text: &str) -> Option<CellRef> {
    let (absolute, letters) = match text.strip_prefix('$') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    let col = CellAddress::letters_to_column(letters).ok()?;
    Some(CellRef {
        row: 0,
        col,
        row_relative: false,
        col_relative: !absolute,
    })
}

fn row_ref(text: &str) -> Option<CellRef> {
    let (absolute, digits) = match text.strip_prefix('$') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    let row: u32 = digits.parse().ok()?;
    Some(CellRef {
        row: row.checked_sub(1)?,
        col: 0,
        row_relative: !absolute,
        col_relative: false,
    })
}

fn starts_reference(token: &Token) -> bool {
    matches!(
        token,
        Token::CellRef(_) | Token::WholeArea(_) | Token::SheetRef(_)
    )
}

fn yields_reference(ptgs: &[Ptg]) -> bool {
    matches!(
        ptgs.last(),
        Some(
            Ptg::Ref(_)
                | Ptg::Area(_)
                | Ptg::Ref3d { .. }
                | Ptg::Area3d { .. }
                | Ptg::Binary(BinaryOperator::Range)
                | Ptg::Binary(BinaryOperator::Intersect)
        )
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::InMemoryWorkbook;
    use pretty_assertions::assert_eq;

    fn r(a1: &str) -> CellRef {
        CellRef::from(CellAddress::parse(a1).unwrap())
    }

    #[test]
    fn test_parse_simple() {
        assert_eq!(
            parse_formula("=1+2").unwrap(),
            vec![Ptg::Int(1), Ptg::Int(2), Ptg::Binary(BinaryOperator::Add)]
        );
        assert_eq!(parse_formula("1.5").unwrap(), vec![Ptg::Number(1.5)]);
        assert_eq!(parse_formula("70000").unwrap(), vec![Ptg::Number(70000.0)]);
        assert_eq!(parse_formula("\"say \"\"hi\"\"\"").unwrap(), vec![Ptg::Str("say \"hi\"".into())]);
        assert_eq!(parse_formula("true").unwrap(), vec![Ptg::Bool(true)]);
        assert_eq!(parse_formula("#N/A").unwrap(), vec![Ptg::Error(ErrorCode::Na)]);
    }

    #[test]
    fn test_precedence() {
        // 1+2*3
        assert_eq!(
            parse_formula("1+2*3").unwrap(),
            vec![
                Ptg::Int(1),
                Ptg::Int(2),
                Ptg::Int(3),
                Ptg::Binary(BinaryOperator::Multiply),
                Ptg::Binary(BinaryOperator::Add),
            ]
        );
        // 2^3^2 groups left
        assert_eq!(
            parse_formula("2^3^2").unwrap(),
            vec![
                Ptg::Int(2),
                Ptg::Int(3),
                Ptg::Binary(BinaryOperator::Power),
                Ptg::Int(2),
                Ptg::Binary(BinaryOperator::Power),
            ]
        );
        // -2^2 negates first
        assert_eq!(
            parse_formula("-2^2").unwrap(),
            vec![
                Ptg::Int(2),
                Ptg::Unary(UnaryOperator::Negate),
                Ptg::Int(2),
                Ptg::Binary(BinaryOperator::Power),
            ]
        );
        assert_eq!(
            parse_formula("(1+2)%").unwrap(),
            vec![
                Ptg::Int(1),
                Ptg::Int(2),
                Ptg::Binary(BinaryOperator::Add),
                Ptg::Paren,
                Ptg::Unary(UnaryOperator::Percent),
            ]
        );
    }

    #[test]
    fn test_references() {
        assert_eq!(parse_formula("$B$2").unwrap(), vec![Ptg::Ref(r("$B$2"))]);
        assert_eq!(
            parse_formula("A1:B3").unwrap(),
            vec![Ptg::Area(AreaRef::new(r("A1"), r("B3")))]
        );
        match parse_formula("B:C").unwrap().as_slice() {
            [Ptg::Area(area)] => {
                assert_eq!((area.first.col, area.last.col), (1, 2));
                assert_eq!((area.first.row, area.last.row), (0, 65535));
            }
            other => panic!("unexpected tokens {:?}", other),
        }
        match parse_formula("3:4").unwrap().as_slice() {
            [Ptg::Area(area)] => {
                assert_eq!((area.first.row, area.last.row), (2, 3));
                assert_eq!(area.last.col, 255);
            }
            other => panic!("unexpected tokens {:?}", other),
        }
    }

    #[test]
    fn test_reference_outside_grid() {
        assert!(parse_formula("A70000").is_err());
        let ptgs = FormulaParser::new("A70000")
            .with_version(SpreadsheetVersion::Excel2007)
            .parse()
            .unwrap();
        assert_eq!(ptgs, vec![Ptg::Ref(r("A70000"))]);
    }

    #[test]
    fn test_intersection() {
        assert_eq!(
            parse_formula("A1:C3 B2:D4").unwrap(),
            vec![
                Ptg::Area(AreaRef::new(r("A1"), r("C3"))),
                Ptg::Area(AreaRef::new(r("B2"), r("D4"))),
                Ptg::Binary(BinaryOperator::Intersect),
            ]
        );
        // spaces around ordinary operators are not intersections
        assert_eq!(parse_formula(" A1 + B1 ").unwrap().len(), 3);
    }

    #[test]
    fn test_sheet_references() {
        let mut wb = InMemoryWorkbook::with_default_sheet();
        wb.add_sheet("My Sheet").unwrap();
        let ptgs = FormulaParser::new("'My Sheet'!A1:B2+Sheet1!C3")
            .with_workbook(&mut wb)
            .parse()
            .unwrap();
        assert!(matches!(ptgs[0], Ptg::Area3d { .. }));
        assert!(matches!(ptgs[1], Ptg::Ref3d { .. }));

        assert!(matches!(
            parse_formula("Sheet1!A1"),
            Err(FormulaError::Parse { .. })
        ));
        let mut wb = InMemoryWorkbook::with_default_sheet();
        assert!(matches!(
            FormulaParser::new("Nope!A1").with_workbook(&mut wb).parse(),
            Err(FormulaError::InvalidReference(_))
        ));
    }

    #[test]
    fn test_functions() {
        assert_eq!(
            parse_formula("ABS(-1)").unwrap(),
            vec![
                Ptg::Int(1),
                Ptg::Unary(UnaryOperator::Negate),
                Ptg::Func { index: 24 },
            ]
        );
        assert_eq!(
            parse_formula("sum(1,2)").unwrap(),
            vec![Ptg::Int(1), Ptg::Int(2), Ptg::FuncVar { index: 4, argc: 2 }]
        );
        assert_eq!(
            parse_formula("SUM(A1:A3)").unwrap(),
            vec![Ptg::Area(AreaRef::new(r("A1"), r("A3"))), Ptg::AttrSum]
        );
        assert_eq!(parse_formula("PI()").unwrap(), vec![Ptg::Func { index: 19 }]);
        assert_eq!(parse_formula("LOG10(100)").unwrap().last(), Some(&Ptg::Func { index: 23 }));
    }

    #[test]
    fn test_missing_arguments() {
        assert_eq!(
            parse_formula("ROUND(1,)").unwrap(),
            vec![Ptg::Int(1), Ptg::MissingArg, Ptg::Func { index: 27 }]
        );
    }

    #[test]
    fn test_argument_count() {
        assert_eq!(
            parse_formula("ABS(1,2)").unwrap_err(),
            FormulaError::ArgumentCount {
                function: "ABS".into(),
                expected: "1".into(),
                actual: 2,
            }
        );
    }

    #[test]
    fn test_if_layout() {
        assert_eq!(
            parse_formula("IF(TRUE,\"pos\",\"neg\")").unwrap(),
            vec![
                Ptg::Bool(true),
                Ptg::AttrIf { data: 10 },
                Ptg::Str("pos".into()),
                Ptg::AttrSkip { data: 13 },
                Ptg::Str("neg".into()),
                Ptg::AttrSkip { data: 3 },
                Ptg::FuncVar { index: 1, argc: 3 },
            ]
        );
        assert_eq!(
            parse_formula("IF(TRUE,1)").unwrap(),
            vec![
                Ptg::Bool(true),
                Ptg::AttrIf { data: 7 },
                Ptg::Int(1),
                Ptg::AttrSkip { data: 3 },
                Ptg::FuncVar { index: 1, argc: 2 },
            ]
        );
    }

    #[test]
    fn test_choose_layout() {
        assert_eq!(
            parse_formula("CHOOSE(2,\"a\",\"bb\",\"ccc\")").unwrap(),
            vec![
                Ptg::Int(2),
                Ptg::AttrChoose {
                    jump_table: vec![8, 16, 25],
                    choose_func_offset: 35,
                },
                Ptg::Str("a".into()),
                Ptg::AttrSkip { data: 22 },
                Ptg::Str("bb".into()),
                Ptg::AttrSkip { data: 13 },
                Ptg::Str("ccc".into()),
                Ptg::AttrSkip { data: 3 },
                Ptg::FuncVar { index: 100, argc: 4 },
            ]
        );
    }

    #[test]
    fn test_unknown_function() {
        assert_eq!(
            parse_formula("MYFUNC(1)").unwrap(),
            vec![
                Ptg::Error(ErrorCode::Name),
                Ptg::Int(1),
                Ptg::FuncVar { index: 255, argc: 2 },
            ]
        );

        let mut wb = InMemoryWorkbook::with_default_sheet();
        let ptgs = FormulaParser::new("MyFunc(1,2)").with_workbook(&mut wb).parse().unwrap();
        assert_eq!(
            ptgs,
            vec![
                Ptg::NameX { ixti: 0, name_index: 0 },
                Ptg::Int(1),
                Ptg::Int(2),
                Ptg::FuncVar { index: 255, argc: 3 },
            ]
        );
    }

    #[test]
    fn test_undefined_name() {
        assert_eq!(parse_formula("Revenue").unwrap(), vec![Ptg::Error(ErrorCode::Name)]);
    }

    #[test]
    fn test_parse_errors() {
        for bad in ["", "=", "1+", "(1", "\"open", "1 2", "{1,2}", "#BOGUS!", "SUM(1", "1:2+"] {
            assert!(parse_formula(bad).is_err(), "{:?} should not parse", bad);
        }
        match parse_formula("1+)").unwrap_err() {
            FormulaError::Parse { position, .. } => assert_eq!(position, 2),
            other => panic!("unexpected error {:?}", other),
        }
    }
}
