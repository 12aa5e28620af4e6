//! Parsed formula tokens
//!
//! A formula is a flat list of [`Ptg`]s in reverse Polish order, the same
//! shape BIFF8 stores on disk. Control tokens (`AttrIf`, `AttrSkip`,
//! `AttrChoose`) carry byte distances, so [`Ptg::size`] must match the
//! encoded width exactly.

pub mod codec;

pub use codec::{decode, encode, encoded_size};

use crate::eval::{BinaryOperator, UnaryOperator};
use sheetcalc_core::{CellAddress, CellRangeAddress, ErrorCode};
use std::fmt;

/// A cell coordinate with its relative/absolute flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellRef {
    pub row: u32,
    pub col: u32,
    pub row_relative: bool,
    pub col_relative: bool,
}

impl CellRef {
    /// Relative reference to `(row, col)`
    pub fn new(row: u32, col: u32) -> Self {
        Self {
            row,
            col,
            row_relative: true,
            col_relative: true,
        }
    }

    /// Convert to an address, `$` flags included
    pub fn to_address(self) -> CellAddress {
        CellAddress::with_absolute(self.row, self.col, !self.row_relative, !self.col_relative)
    }
}

impl From<CellAddress> for CellRef {
    fn from(addr: CellAddress) -> Self {
        Self {
            row: addr.row,
            col: addr.col,
            row_relative: !addr.row_absolute,
            col_relative: !addr.col_absolute,
        }
    }
}

/// Two corners of a rectangular reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AreaRef {
    pub first: CellRef,
    pub last: CellRef,
}

impl AreaRef {
    pub fn new(first: CellRef, last: CellRef) -> Self {
        Self { first, last }
    }

    /// Normalised range covered by the corners
    pub fn range(&self) -> CellRangeAddress {
        CellRangeAddress::new(self.first.row, self.last.row, self.first.col, self.last.col)
    }
}

/// One formula token
#[derive(Debug, Clone, PartialEq)]
pub enum Ptg {
    /// tNum: 8-byte float
    Number(f64),
    /// tInt: unsigned 16-bit integer
    Int(u16),
    /// tStr: text literal (at most 255 characters)
    Str(String),
    /// tBool
    Bool(bool),
    /// tErr: error literal
    Error(ErrorCode),
    /// tMissArg: argument left empty in a call
    MissingArg,
    /// tRef: cell on the formula's own sheet
    Ref(CellRef),
    /// tArea: area on the formula's own sheet
    Area(AreaRef),
    /// tRef3d: cell on the sheets named by an extern-sheet index
    Ref3d { ixti: u16, cell: CellRef },
    /// tArea3d: area on the sheets named by an extern-sheet index
    Area3d { ixti: u16, area: AreaRef },
    /// tRefErr: reference to a deleted cell
    RefErr,
    /// tAreaErr: reference to a deleted area
    AreaErr,
    /// tNameX: external or add-in name
    NameX { ixti: u16, name_index: u16 },
    /// Binary operator token
    Binary(BinaryOperator),
    /// Unary operator token
    Unary(UnaryOperator),
    /// tParen: display-only parentheses
    Paren,
    /// tFunc: fixed-arity function
    Func { index: u16 },
    /// tFuncVar: variable-arity function
    FuncVar { index: u16, argc: u8 },
    /// tAttrIf: bytes to skip when the condition is false
    AttrIf { data: u16 },
    /// tAttrSkip: bytes to skip, minus one
    AttrSkip { data: u16 },
    /// tAttrChoose: jump table into the CHOOSE options
    AttrChoose {
        jump_table: Vec<u16>,
        choose_func_offset: u16,
    },
    /// tAttrSum: SUM of a single argument
    AttrSum,
    /// tAttrVolatile: marks the formula volatile
    AttrVolatile,
    /// tAttrSpace: whitespace kept for display
    AttrSpace { kind: u8, count: u8 },
}

/// Token ids (reference class for operands)
pub mod id {
    pub const ADD: u8 = 0x03;
    pub const SUB: u8 = 0x04;
    pub const MUL: u8 = 0x05;
    pub const DIV: u8 = 0x06;
    pub const POWER: u8 = 0x07;
    pub const CONCAT: u8 = 0x08;
    pub const LT: u8 = 0x09;
    pub const LE: u8 = 0x0A;
    pub const EQ: u8 = 0x0B;
    pub const GE: u8 = 0x0C;
    pub const GT: u8 = 0x0D;
    pub const NE: u8 = 0x0E;
    pub const INTERSECT: u8 = 0x0F;
    pub const RANGE: u8 = 0x11;
    pub const UPLUS: u8 = 0x12;
    pub const UMINUS: u8 = 0x13;
    pub const PERCENT: u8 = 0x14;
    pub const PAREN: u8 = 0x15;
    pub const MISS_ARG: u8 = 0x16;
    pub const STR: u8 = 0x17;
    pub const ATTR: u8 = 0x19;
    pub const ERR: u8 = 0x1C;
    pub const BOOL: u8 = 0x1D;
    pub const INT: u8 = 0x1E;
    pub const NUM: u8 = 0x1F;
    pub const FUNC: u8 = 0x21;
    pub const FUNC_VAR: u8 = 0x22;
    pub const REF: u8 = 0x24;
    pub const AREA: u8 = 0x25;
    pub const REF_ERR: u8 = 0x2A;
    pub const AREA_ERR: u8 = 0x2B;
    pub const NAME_X: u8 = 0x39;
    pub const REF_3D: u8 = 0x3A;
    pub const AREA_3D: u8 = 0x3B;

    /// Strip the operand class bits from a classified token id
    pub const fn base(raw: u8) -> u8 {
        if raw < 0x20 {
            raw
        } else {
            (raw & 0x1F) | 0x20
        }
    }
}

/// tAttr option bits
pub mod attr {
    pub const VOLATILE: u8 = 0x01;
    pub const IF: u8 = 0x02;
    pub const CHOOSE: u8 = 0x04;
    pub const SKIP: u8 = 0x08;
    pub const SUM: u8 = 0x10;
    pub const SPACE: u8 = 0x40;
}

impl Ptg {
    /// Encoded width in bytes
    pub fn size(&self) -> usize {
        match self {
            Ptg::Number(_) => 9,
            Ptg::Int(_) => 3,
            Ptg::Str(s) => {
                let chars = s.chars().count();
                if s.chars().all(|c| (c as u32) < 0x100) {
                    3 + chars
                } else {
                    3 + 2 * s.encode_utf16().count()
                }
            }
            Ptg::Bool(_) | Ptg::Error(_) => 2,
            Ptg::MissingArg | Ptg::Binary(_) | Ptg::Unary(_) | Ptg::Paren => 1,
            Ptg::Ref(_) | Ptg::RefErr => 5,
            Ptg::Area(_) | Ptg::AreaErr => 9,
            Ptg::Ref3d { .. } | Ptg::NameX { .. } => 7,
            Ptg::Area3d { .. } => 11,
            Ptg::Func { .. } => 3,
            Ptg::FuncVar { .. } => 4,
            Ptg::AttrChoose { jump_table, .. } => 4 + 2 * (jump_table.len() + 1),
            Ptg::AttrIf { .. }
            | Ptg::AttrSkip { .. }
            | Ptg::AttrSum
            | Ptg::AttrVolatile
            | Ptg::AttrSpace { .. } => 4,
        }
    }

    /// Whether the token pushes a value rather than consuming operands
    pub fn is_operand(&self) -> bool {
        matches!(
            self,
            Ptg::Number(_)
                | Ptg::Int(_)
                | Ptg::Str(_)
                | Ptg::Bool(_)
                | Ptg::Error(_)
                | Ptg::MissingArg
                | Ptg::Ref(_)
                | Ptg::Area(_)
                | Ptg::Ref3d { .. }
                | Ptg::Area3d { .. }
                | Ptg::RefErr
                | Ptg::AreaErr
                | Ptg::NameX { .. }
        )
    }
}

/// Total encoded width of a token run
pub fn tokens_size(ptgs: &[Ptg]) -> usize {
    ptgs.iter().map(Ptg::size).sum()
}

impl fmt::Display for Ptg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ptg::Number(n) => write!(f, "{}", sheetcalc_core::number_to_text(*n)),
            Ptg::Int(n) => write!(f, "{}", n),
            Ptg::Str(s) => write!(f, "\"{}\"", s.replace('"', "\"\"")),
            Ptg::Bool(b) => f.write_str(if *b { "TRUE" } else { "FALSE" }),
            Ptg::Error(e) => write!(f, "{}", e),
            Ptg::MissingArg => f.write_str("<missing>"),
            Ptg::Ref(c) => write!(f, "{}", c.to_address()),
            Ptg::Area(a) => write!(f, "{}:{}", a.first.to_address(), a.last.to_address()),
            Ptg::Ref3d { ixti, cell } => write!(f, "[{}]!{}", ixti, cell.to_address()),
            Ptg::Area3d { ixti, area } => write!(
                f,
                "[{}]!{}:{}",
                ixti,
                area.first.to_address(),
                area.last.to_address()
            ),
            Ptg::RefErr | Ptg::AreaErr => f.write_str("#REF!"),
            Ptg::NameX { ixti, name_index } => write!(f, "NameX[{}:{}]", ixti, name_index),
            Ptg::Binary(op) => write!(f, "{}", op),
            Ptg::Unary(UnaryOperator::Percent) => f.write_str("%"),
            Ptg::Unary(op) => write!(f, "u{}", op),
            Ptg::Paren => f.write_str("()"),
            Ptg::Func { index } => write!(f, "Func[{}]", index),
            Ptg::FuncVar { index, argc } => write!(f, "FuncVar[{},{}]", index, argc),
            Ptg::AttrIf { data } => write!(f, "AttrIf[{}]", data),
            Ptg::AttrSkip { data } => write!(f, "AttrSkip[{}]", data),
            Ptg::AttrChoose { jump_table, .. } => write!(f, "AttrChoose[{}]", jump_table.len()),
            Ptg::AttrSum => f.write_str("AttrSum"),
            Ptg::AttrVolatile => f.write_str("AttrVolatile"),
            Ptg::AttrSpace { .. } => f.write_str("AttrSpace"),
        }
    }
}
