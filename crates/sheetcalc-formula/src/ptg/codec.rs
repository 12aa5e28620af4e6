//! BIFF8 token encoding
//!
//! All multi-byte fields are little-endian. Operands are written in
//! reference class and functions in value class; any class is accepted on
//! read.

use super::{attr, id, AreaRef, CellRef, Ptg};
use crate::error::{FormulaError, FormulaResult};
use crate::eval::{BinaryOperator, UnaryOperator};
use sheetcalc_core::ErrorCode;

const ROW_LIMIT: u32 = 0xFFFF;
const COL_MASK: u16 = 0x3FFF;
const COL_RELATIVE: u16 = 0x4000;
const ROW_RELATIVE: u16 = 0x8000;
const VALUE_CLASS: u8 = 0x40;

fn value_class(base: u8) -> u8 {
    (base & 0x1F) | VALUE_CLASS
}

/// Encoded width of a token run
pub fn encoded_size(ptgs: &[Ptg]) -> usize {
    super::tokens_size(ptgs)
}

/// Write tokens in BIFF8 layout
pub fn encode(ptgs: &[Ptg]) -> FormulaResult<Vec<u8>> {
    let mut out = Vec::with_capacity(encoded_size(ptgs));
    for ptg in ptgs {
        let start = out.len();
        write_ptg(ptg, &mut out)?;
        debug_assert_eq!(out.len() - start, ptg.size(), "size mismatch for {:?}", ptg);
    }
    Ok(out)
}

/// Read a complete token stream
pub fn decode(bytes: &[u8]) -> FormulaResult<Vec<Ptg>> {
    let mut reader = Reader { bytes, pos: 0 };
    let mut ptgs = Vec::new();
    while reader.pos < bytes.len() {
        ptgs.push(read_ptg(&mut reader)?);
    }
    Ok(ptgs)
}

fn put_u16(out: &mut Vec<u8>, v: u16) {
    out.extend_from_slice(&v.to_le_bytes());
}

fn row_field(row: u32) -> FormulaResult<u16> {
    if row > ROW_LIMIT {
        return Err(FormulaError::Encoding(format!("row {} exceeds BIFF8 limit", row + 1)));
    }
    Ok(row as u16)
}

fn col_field(cell: &CellRef) -> FormulaResult<u16> {
    if cell.col > COL_MASK as u32 {
        return Err(FormulaError::Encoding(format!("column {} exceeds BIFF8 limit", cell.col + 1)));
    }
    let mut field = cell.col as u16;
    if cell.col_relative {
        field |= COL_RELATIVE;
    }
    if cell.row_relative {
        field |= ROW_RELATIVE;
    }
    Ok(field)
}

fn write_cell(cell: &CellRef, out: &mut Vec<u8>) -> FormulaResult<()> {
    put_u16(out, row_field(cell.row)?);
    put_u16(out, col_field(cell)?);
    Ok(())
}

fn write_area(area: &AreaRef, out: &mut Vec<u8>) -> FormulaResult<()> {
    put_u16(out, row_field(area.first.row)?);
    put_u16(out, row_field(area.last.row)?);
    put_u16(out, col_field(&area.first)?);
    put_u16(out, col_field(&area.last)?);
    Ok(())
}

fn binary_id(op: BinaryOperator) -> u8 {
    match op {
        BinaryOperator::Add => id::ADD,
        BinaryOperator::Subtract => id::SUB,
        BinaryOperator::Multiply => id::MUL,
        BinaryOperator::Divide => id::DIV,
        BinaryOperator::Power => id::POWER,
        BinaryOperator::Concat => id::CONCAT,
        BinaryOperator::LessThan => id::LT,
        BinaryOperator::LessEqual => id::LE,
        BinaryOperator::Equal => id::EQ,
        BinaryOperator::GreaterEqual => id::GE,
        BinaryOperator::GreaterThan => id::GT,
        BinaryOperator::NotEqual => id::NE,
        BinaryOperator::Intersect => id::INTERSECT,
        BinaryOperator::Range => id::RANGE,
    }
}

fn write_attr(out: &mut Vec<u8>, options: u8, data: u16) {
    out.push(id::ATTR);
    out.push(options);
    put_u16(out, data);
}

fn write_ptg(ptg: &Ptg, out: &mut Vec<u8>) -> FormulaResult<()> {
    match ptg {
        Ptg::Number(n) => {
            out.push(id::NUM);
            out.extend_from_slice(&n.to_le_bytes());
        }
        Ptg::Int(n) => {
            out.push(id::INT);
            put_u16(out, *n);
        }
        Ptg::Str(s) => write_str(s, out)?,
        Ptg::Bool(b) => {
            out.push(id::BOOL);
            out.push(u8::from(*b));
        }
        Ptg::Error(code) => {
            if !code.is_native() {
                return Err(FormulaError::Encoding(format!("{} has no file representation", code)));
            }
            out.push(id::ERR);
            out.push(code.code() as u8);
        }
        Ptg::MissingArg => out.push(id::MISS_ARG),
        Ptg::Ref(cell) => {
            out.push(id::REF);
            write_cell(cell, out)?;
        }
        Ptg::Area(area) => {
            out.push(id::AREA);
            write_area(area, out)?;
        }
        Ptg::Ref3d { ixti, cell } => {
            out.push(id::REF_3D);
            put_u16(out, *ixti);
            write_cell(cell, out)?;
        }
        Ptg::Area3d { ixti, area } => {
            out.push(id::AREA_3D);
            put_u16(out, *ixti);
            write_area(area, out)?;
        }
        Ptg::RefErr => {
            out.push(id::REF_ERR);
            out.extend_from_slice(&[0; 4]);
        }
        Ptg::AreaErr => {
            out.push(id::AREA_ERR);
            out.extend_from_slice(&[0; 8]);
        }
        Ptg::NameX { ixti, name_index } => {
            out.push(id::NAME_X);
            put_u16(out, *ixti);
            put_u16(out, *name_index);
            put_u16(out, 0);
        }
        Ptg::Binary(op) => out.push(binary_id(*op)),
        Ptg::Unary(op) => out.push(match op {
            UnaryOperator::Plus => id::UPLUS,
            UnaryOperator::Negate => id::UMINUS,
            UnaryOperator::Percent => id::PERCENT,
        }),
        Ptg::Paren => out.push(id::PAREN),
        Ptg::Func { index } => {
            out.push(value_class(id::FUNC));
            put_u16(out, *index);
        }
        Ptg::FuncVar { index, argc } => {
            out.push(value_class(id::FUNC_VAR));
            out.push(argc & 0x7F);
            put_u16(out, index & 0x7FFF);
        }
        Ptg::AttrIf { data } => write_attr(out, attr::IF, *data),
        Ptg::AttrSkip { data } => write_attr(out, attr::SKIP, *data),
        Ptg::AttrSum => write_attr(out, attr::SUM, 0),
        Ptg::AttrVolatile => write_attr(out, attr::VOLATILE, 0),
        Ptg::AttrSpace { kind, count } => {
            write_attr(out, attr::SPACE, u16::from_le_bytes([*kind, *count]))
        }
        Ptg::AttrChoose {
            jump_table,
            choose_func_offset,
        } => {
            let n = u16::try_from(jump_table.len())
                .map_err(|_| FormulaError::Encoding("CHOOSE jump table too long".into()))?;
            write_attr(out, attr::CHOOSE, n);
            for offset in jump_table {
                put_u16(out, *offset);
            }
            put_u16(out, *choose_func_offset);
        }
    }
    Ok(())
}

fn write_str(s: &str, out: &mut Vec<u8>) -> FormulaResult<()> {
    let compressed = s.chars().all(|c| (c as u32) < 0x100);
    let units: Vec<u16> = s.encode_utf16().collect();
    let len = if compressed { s.chars().count() } else { units.len() };
    let cch = u8::try_from(len)
        .map_err(|_| FormulaError::Encoding(format!("string literal of {} characters", len)))?;
    out.push(id::STR);
    out.push(cch);
    if compressed {
        out.push(0);
        out.extend(s.chars().map(|c| c as u32 as u8));
    } else {
        out.push(1);
        for unit in units {
            put_u16(out, unit);
        }
    }
    Ok(())
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn error(&self, message: impl Into<String>) -> FormulaError {
        FormulaError::Decoding {
            offset: self.pos,
            message: message.into(),
        }
    }

    fn take(&mut self, n: usize) -> FormulaResult<&'a [u8]> {
        let end = self.pos + n;
        if end > self.bytes.len() {
            return Err(self.error(format!("need {} more bytes", end - self.bytes.len())));
        }
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn u8(&mut self) -> FormulaResult<u8> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> FormulaResult<u16> {
        let b = self.take(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    fn f64(&mut self) -> FormulaResult<f64> {
        let b = self.take(8)?;
        let mut buf = [0u8; 8];
        buf.copy_from_slice(b);
        Ok(f64::from_le_bytes(buf))
    }

    fn cell(&mut self) -> FormulaResult<CellRef> {
        let row = self.u16()? as u32;
        let col = self.u16()?;
        Ok(cell_from_fields(row, col))
    }

    fn area(&mut self) -> FormulaResult<AreaRef> {
        let r1 = self.u16()? as u32;
        let r2 = self.u16()? as u32;
        let c1 = self.u16()?;
        let c2 = self.u16()?;
        Ok(AreaRef::new(cell_from_fields(r1, c1), cell_from_fields(r2, c2)))
    }
}

fn cell_from_fields(row: u32, col: u16) -> CellRef {
    CellRef {
        row,
        col: (col & COL_MASK) as u32,
        row_relative: col & ROW_RELATIVE != 0,
        col_relative: col & COL_RELATIVE != 0,
    }
}

fn read_ptg(r: &mut Reader<'_>) -> FormulaResult<Ptg> {
    let start = r.pos;
    let raw = r.u8()?;
    let ptg = match id::base(raw) {
        id::ADD => Ptg::Binary(BinaryOperator::Add),
        id::SUB => Ptg::Binary(BinaryOperator::Subtract),
        id::MUL => Ptg::Binary(BinaryOperator::Multiply),
        id::DIV => Ptg::Binary(BinaryOperator::Divide),
        id::POWER => Ptg::Binary(BinaryOperator::Power),
        id::CONCAT => Ptg::Binary(BinaryOperator::Concat),
        id::LT => Ptg::Binary(BinaryOperator::LessThan),
        id::LE => Ptg::Binary(BinaryOperator::LessEqual),
        id::EQ => Ptg::Binary(BinaryOperator::Equal),
        id::GE => Ptg::Binary(BinaryOperator::GreaterEqual),
        id::GT => Ptg::Binary(BinaryOperator::GreaterThan),
        id::NE => Ptg::Binary(BinaryOperator::NotEqual),
        id::INTERSECT => Ptg::Binary(BinaryOperator::Intersect),
        id::RANGE => Ptg::Binary(BinaryOperator::Range),
        id::UPLUS => Ptg::Unary(UnaryOperator::Plus),
        id::UMINUS => Ptg::Unary(UnaryOperator::Negate),
        id::PERCENT => Ptg::Unary(UnaryOperator::Percent),
        id::PAREN => Ptg::Paren,
        id::MISS_ARG => Ptg::MissingArg,
        id::STR => {
            let cch = r.u8()? as usize;
            let flags = r.u8()?;
            if flags & 0x01 == 0 {
                Ptg::Str(r.take(cch)?.iter().map(|&b| b as char).collect())
            } else {
                let mut units = Vec::with_capacity(cch);
                for _ in 0..cch {
                    units.push(r.u16()?);
                }
                Ptg::Str(String::from_utf16_lossy(&units))
            }
        }
        id::ATTR => read_attr(r)?,
        id::ERR => {
            let code = r.u8()?;
            let code = ErrorCode::from_code(code as i32).map_err(|e| FormulaError::Decoding {
                offset: start,
                message: e.to_string(),
            })?;
            Ptg::Error(code)
        }
        id::BOOL => Ptg::Bool(r.u8()? != 0),
        id::INT => Ptg::Int(r.u16()?),
        id::NUM => Ptg::Number(r.f64()?),
        id::FUNC => Ptg::Func { index: r.u16()? },
        id::FUNC_VAR => {
            let argc = r.u8()? & 0x7F;
            let index = r.u16()? & 0x7FFF;
            Ptg::FuncVar { index, argc }
        }
        id::REF => Ptg::Ref(r.cell()?),
        id::AREA => Ptg::Area(r.area()?),
        id::REF_ERR => {
            r.take(4)?;
            Ptg::RefErr
        }
        id::AREA_ERR => {
            r.take(8)?;
            Ptg::AreaErr
        }
        id::NAME_X => {
            let ixti = r.u16()?;
            let name_index = r.u16()?;
            r.take(2)?;
            Ptg::NameX { ixti, name_index }
        }
        id::REF_3D => {
            let ixti = r.u16()?;
            Ptg::Ref3d { ixti, cell: r.cell()? }
        }
        id::AREA_3D => {
            let ixti = r.u16()?;
            Ptg::Area3d { ixti, area: r.area()? }
        }
        _ => {
            return Err(FormulaError::Decoding {
                offset: start,
                message: format!("unsupported token id 0x{:02X}", raw),
            })
        }
    };
    Ok(ptg)
}

fn read_attr(r: &mut Reader<'_>) -> FormulaResult<Ptg> {
    let options = r.u8()?;
    let data = r.u16()?;
    let ptg = if options & attr::CHOOSE != 0 {
        let mut jump_table = Vec::with_capacity(data as usize);
        for _ in 0..data {
            jump_table.push(r.u16()?);
        }
        Ptg::AttrChoose {
            jump_table,
            choose_func_offset: r.u16()?,
        }
    } else if options & attr::IF != 0 {
        Ptg::AttrIf { data }
    } else if options & attr::SKIP != 0 {
        Ptg::AttrSkip { data }
    } else if options & attr::SUM != 0 {
        Ptg::AttrSum
    } else if options & attr::SPACE != 0 {
        let [kind, count] = data.to_le_bytes();
        Ptg::AttrSpace { kind, count }
    } else if options & attr::VOLATILE != 0 {
        Ptg::AttrVolatile
    } else {
        return Err(r.error(format!("unsupported tAttr options 0x{:02X}", options)));
    };
    Ok(ptg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_encode_ref_flags() {
        let bytes = encode(&[Ptg::Ref(CellRef {
            row: 2,
            col: 1,
            row_relative: true,
            col_relative: false,
        })])
        .unwrap();
        assert_eq!(bytes, vec![0x24, 0x02, 0x00, 0x01, 0x80]);
    }

    #[test]
    fn test_encode_function_tokens() {
        let bytes = encode(&[Ptg::Func { index: 24 }, Ptg::FuncVar { index: 4, argc: 2 }]).unwrap();
        assert_eq!(bytes, vec![0x41, 24, 0, 0x42, 2, 4, 0]);
    }

    #[test]
    fn test_decode_value_class_tokens() {
        // tRefV B3, tFuncV ABS
        let ptgs = decode(&[0x44, 0x02, 0x00, 0x01, 0xC0, 0x41, 24, 0]).unwrap();
        assert_eq!(
            ptgs,
            vec![Ptg::Ref(CellRef::new(2, 1)), Ptg::Func { index: 24 }]
        );
    }

    #[test]
    fn test_string_forms() {
        let latin = encode(&[Ptg::Str("é".into())]).unwrap();
        assert_eq!(latin, vec![0x17, 1, 0, 0xE9]);
        let wide = encode(&[Ptg::Str("\u{3042}".into())]).unwrap();
        assert_eq!(wide, vec![0x17, 1, 1, 0x42, 0x30]);
        assert_eq!(decode(&wide).unwrap(), vec![Ptg::Str("\u{3042}".into())]);
    }

    #[test]
    fn test_choose_layout() {
        let ptg = Ptg::AttrChoose {
            jump_table: vec![6, 12],
            choose_func_offset: 18,
        };
        let bytes = encode(&[ptg.clone()]).unwrap();
        assert_eq!(bytes, vec![0x19, 0x04, 2, 0, 6, 0, 12, 0, 18, 0]);
        assert_eq!(decode(&bytes).unwrap(), vec![ptg]);
    }

    #[test]
    fn test_attr_tokens() {
        let ptgs = vec![
            Ptg::Bool(true),
            Ptg::AttrIf { data: 7 },
            Ptg::Int(1),
            Ptg::AttrSkip { data: 3 },
            Ptg::FuncVar { index: 1, argc: 2 },
        ];
        let bytes = encode(&ptgs).unwrap();
        assert_eq!(bytes.len(), encoded_size(&ptgs));
        assert_eq!(decode(&bytes).unwrap(), ptgs);
    }

    #[test]
    fn test_encode_limits() {
        assert!(matches!(
            encode(&[Ptg::Ref(CellRef::new(70_000, 0))]),
            Err(FormulaError::Encoding(_))
        ));
        assert!(matches!(
            encode(&[Ptg::Error(ErrorCode::CircularRef)]),
            Err(FormulaError::Encoding(_))
        ));
        assert!(encode(&[Ptg::Str("x".repeat(256))]).is_err());
    }

    #[test]
    fn test_decode_errors() {
        assert!(matches!(
            decode(&[0x1F, 0, 0]),
            Err(FormulaError::Decoding { offset: 1, .. })
        ));
        assert!(matches!(
            decode(&[0xFF]),
            Err(FormulaError::Decoding { offset: 0, .. })
        ));
    }
}
