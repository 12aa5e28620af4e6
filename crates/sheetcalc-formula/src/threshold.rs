//! Conditional-formatting thresholds
//!
//! A threshold (CFVO) marks one boundary of a colour scale, data bar or icon
//! set: the minimum or maximum of the formatted range, a literal number, a
//! percent or percentile of the range, or a formula result.
//!
//! Binary layout, little-endian:
//!
//! | field | size |
//! |---|---|
//! | type | 1 |
//! | formula length `n` (0 when absent) | 2 |
//! | formula tokens | `n` |
//! | value, only when there is no formula and the type is not MIN or MAX | 8 |
//!
//! Colour-gradient thresholds append an 8-byte stop position; icon-set
//! thresholds append an equals flag and 4 reserved bytes.

use crate::error::{FormulaError, FormulaResult};
use crate::eval::{EvaluationCell, FormulaEvaluator, ValueEval};
use crate::ptg::{self, Ptg};
use sheetcalc_core::Color;

/// What a threshold's boundary is measured against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ThresholdType {
    Number = 1,
    Min = 2,
    Max = 3,
    Percent = 4,
    Percentile = 5,
    Unallocated = 6,
    Formula = 7,
}

impl ThresholdType {
    /// Decode the type byte
    pub fn from_code(code: u8) -> FormulaResult<Self> {
        Ok(match code {
            1 => ThresholdType::Number,
            2 => ThresholdType::Min,
            3 => ThresholdType::Max,
            4 => ThresholdType::Percent,
            5 => ThresholdType::Percentile,
            6 => ThresholdType::Unallocated,
            7 => ThresholdType::Formula,
            _ => {
                return Err(FormulaError::Decoding {
                    offset: 0,
                    message: format!("unknown threshold type {}", code),
                })
            }
        })
    }

    pub fn code(self) -> u8 {
        self as u8
    }

    /// Whether thresholds of this type carry no literal value
    pub fn is_valueless(self) -> bool {
        matches!(self, ThresholdType::Min | ThresholdType::Max | ThresholdType::Formula)
    }
}

/// One boundary of a conditional format
#[derive(Debug, Clone, PartialEq)]
pub struct Threshold {
    kind: ThresholdType,
    formula: Vec<Ptg>,
    value: Option<f64>,
}

impl Threshold {
    /// A threshold of `kind`, with a zero value where the type needs one
    pub fn new(kind: ThresholdType) -> Self {
        let mut threshold = Self {
            kind,
            formula: Vec::new(),
            value: None,
        };
        threshold.set_type(kind);
        threshold
    }

    /// A literal-number threshold
    pub fn number(value: f64) -> Self {
        Self {
            kind: ThresholdType::Number,
            formula: Vec::new(),
            value: Some(value),
        }
    }

    /// A formula threshold
    pub fn formula(ptgs: Vec<Ptg>) -> Self {
        Self {
            kind: ThresholdType::Formula,
            formula: ptgs,
            value: None,
        }
    }

    pub fn kind(&self) -> ThresholdType {
        self.kind
    }

    /// Change the type, dropping or defaulting the value to match it
    pub fn set_type(&mut self, kind: ThresholdType) {
        self.kind = kind;
        if kind.is_valueless() {
            self.value = None;
        } else if self.value.is_none() {
            self.value = Some(0.0);
        }
    }

    pub fn value(&self) -> Option<f64> {
        self.value
    }

    /// Set the literal value; ignored for types that carry none
    pub fn set_value(&mut self, value: Option<f64>) {
        if self.kind.is_valueless() {
            log::debug!("ignoring value for a {:?} threshold", self.kind);
            return;
        }
        self.value = value;
    }

    pub fn parsed_expression(&self) -> &[Ptg] {
        &self.formula
    }

    pub fn set_parsed_expression(&mut self, ptgs: Vec<Ptg>) {
        self.formula = ptgs;
    }

    /// Read a threshold from the start of `data`, returning it and the bytes used
    pub fn read(data: &[u8]) -> FormulaResult<(Self, usize)> {
        let mut offset = 0;
        let kind = ThresholdType::from_code(read_u8(data, &mut offset)?)?;
        let formula_len = read_u16(data, &mut offset)? as usize;

        let formula = if formula_len > 0 {
            let bytes = take(data, &mut offset, formula_len)?;
            ptg::decode(bytes).map_err(|e| match e {
                FormulaError::Decoding { offset: at, message } => FormulaError::Decoding {
                    offset: 3 + at,
                    message,
                },
                other => other,
            })?
        } else {
            Vec::new()
        };

        // Value is only there for non-formula, non min-max
        let stored = if stores_value(kind, formula_len) {
            Some(read_f64(data, &mut offset)?)
        } else {
            None
        };

        let mut threshold = Self {
            kind,
            formula,
            value: None,
        };
        if !kind.is_valueless() {
            threshold.value = Some(stored.unwrap_or(0.0));
        }
        Ok((threshold, offset))
    }

    /// Append the binary form to `out`
    pub fn write(&self, out: &mut Vec<u8>) -> FormulaResult<()> {
        out.push(self.kind.code());
        let tokens = ptg::encode(&self.formula)?;
        let len = u16::try_from(tokens.len())
            .map_err(|_| FormulaError::Encoding(format!("formula of {} bytes is too long", tokens.len())))?;
        out.extend_from_slice(&len.to_le_bytes());
        out.extend_from_slice(&tokens);
        if stores_value(self.kind, tokens.len()) {
            out.extend_from_slice(&self.value.unwrap_or(0.0).to_le_bytes());
        }
        Ok(())
    }

    /// Size of the binary form in bytes
    pub fn data_length(&self) -> usize {
        let formula_len = ptg::encoded_size(&self.formula);
        let mut len = 1 + 2 + formula_len;
        if stores_value(self.kind, formula_len) {
            len += 8;
        }
        len
    }

    /// The boundary this threshold marks for a range holding `values`
    ///
    /// `None` when the boundary is undefined: an empty range, a formula that
    /// does not produce a number, or an unallocated type. Formulas are
    /// evaluated as if they were in `cell`.
    pub fn resolve(
        &self,
        values: &[f64],
        evaluator: &FormulaEvaluator,
        cell: EvaluationCell,
    ) -> FormulaResult<Option<f64>> {
        let min = values.iter().copied().reduce(f64::min);
        let max = values.iter().copied().reduce(f64::max);

        Ok(match self.kind {
            ThresholdType::Min => min,
            ThresholdType::Max => max,
            ThresholdType::Number => self.value,
            ThresholdType::Percent => match (min, max, self.value) {
                (Some(min), Some(max), Some(pct)) => Some(min + (max - min) * pct / 100.0),
                _ => None,
            },
            ThresholdType::Percentile => match self.value {
                Some(pct) => percentile_inclusive(values, pct / 100.0),
                None => None,
            },
            ThresholdType::Formula => {
                if self.formula.is_empty() {
                    return Ok(None);
                }
                match evaluator.evaluate(&self.formula, cell)? {
                    ValueEval::Number(n) => Some(n),
                    other => {
                        log::debug!("threshold formula produced {}", other.type_name());
                        None
                    }
                }
            }
            ThresholdType::Unallocated => None,
        })
    }
}

/// Whether the record carries the trailing double
fn stores_value(kind: ThresholdType, formula_len: usize) -> bool {
    formula_len == 0 && !matches!(kind, ThresholdType::Min | ThresholdType::Max)
}

/// Inclusive percentile (`PERCENTILE.INC`) of `values` at `k` in 0..=1
pub fn percentile_inclusive(values: &[f64], k: f64) -> Option<f64> {
    if values.is_empty() || !(0.0..=1.0).contains(&k) {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let rank = k * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let fraction = rank - lower as f64;
    Some(match sorted.get(lower + 1) {
        Some(upper) => sorted[lower] + fraction * (upper - sorted[lower]),
        None => sorted[lower],
    })
}

/// A colour-scale stop: threshold plus its position along the gradient
#[derive(Debug, Clone, PartialEq)]
pub struct ColorGradientThreshold {
    pub threshold: Threshold,
    /// Stop position between 0 and 1
    pub position: f64,
}

impl ColorGradientThreshold {
    pub fn new(threshold: Threshold, position: f64) -> Self {
        Self { threshold, position }
    }

    pub fn read(data: &[u8]) -> FormulaResult<(Self, usize)> {
        let (threshold, mut offset) = Threshold::read(data)?;
        let position = read_f64(data, &mut offset)?;
        Ok((Self { threshold, position }, offset))
    }

    pub fn write(&self, out: &mut Vec<u8>) -> FormulaResult<()> {
        self.threshold.write(out)?;
        out.extend_from_slice(&self.position.to_le_bytes());
        Ok(())
    }

    pub fn data_length(&self) -> usize {
        self.threshold.data_length() + 8
    }
}

/// Colour for `value` on a scale whose stops are `(boundary, colour)` pairs
/// in ascending boundary order
///
/// Values outside the scale take the nearest end colour.
pub fn gradient_color(value: f64, stops: &[(f64, Color)]) -> Option<Color> {
    let (first, last) = (stops.first()?, stops.last()?);
    if value <= first.0 {
        return Some(first.1);
    }
    if value >= last.0 {
        return Some(last.1);
    }
    stops.windows(2).find_map(|pair| {
        let ((lo, lo_color), (hi, hi_color)) = (pair[0], pair[1]);
        if value < lo || value > hi {
            return None;
        }
        if hi == lo {
            return Some(hi_color);
        }
        Some(lo_color.interpolate(&hi_color, (value - lo) / (hi - lo)))
    })
}

/// An icon-set boundary
#[derive(Debug, Clone, PartialEq)]
pub struct IconMultiStateThreshold {
    pub threshold: Threshold,
    /// [`Self::EQUALS_INCLUDE`] when a value equal to the boundary reaches it
    pub equals: u8,
}

impl IconMultiStateThreshold {
    pub const EQUALS_EXCLUDE: u8 = 0;
    pub const EQUALS_INCLUDE: u8 = 1;

    pub fn new(threshold: Threshold, equals_include: bool) -> Self {
        Self {
            threshold,
            equals: if equals_include {
                Self::EQUALS_INCLUDE
            } else {
                Self::EQUALS_EXCLUDE
            },
        }
    }

    pub fn read(data: &[u8]) -> FormulaResult<(Self, usize)> {
        let (threshold, mut offset) = Threshold::read(data)?;
        let equals = read_u8(data, &mut offset)?;
        // reserved
        take(data, &mut offset, 4)?;
        Ok((Self { threshold, equals }, offset))
    }

    pub fn write(&self, out: &mut Vec<u8>) -> FormulaResult<()> {
        self.threshold.write(out)?;
        out.push(self.equals);
        out.extend_from_slice(&0u32.to_le_bytes());
        Ok(())
    }

    pub fn data_length(&self) -> usize {
        self.threshold.data_length() + 5
    }

    /// Whether `value` reaches this threshold's `boundary`
    pub fn admits(&self, value: f64, boundary: f64) -> bool {
        if self.equals == Self::EQUALS_INCLUDE {
            value >= boundary
        } else {
            value > boundary
        }
    }
}

/// Icon for `value` given resolved boundaries in ascending order
///
/// The highest threshold the value reaches wins; a value below every
/// threshold gets icon 0.
pub fn icon_index(value: f64, thresholds: &[(f64, &IconMultiStateThreshold)]) -> usize {
    thresholds
        .iter()
        .rposition(|(boundary, threshold)| threshold.admits(value, *boundary))
        .unwrap_or(0)
}

/// The three threshold record shapes
#[derive(Debug, Clone, PartialEq)]
pub enum ThresholdRecord {
    Plain(Threshold),
    ColorGradient(ColorGradientThreshold),
    IconMultiState(IconMultiStateThreshold),
}

impl ThresholdRecord {
    /// The shared threshold part
    pub fn threshold(&self) -> &Threshold {
        match self {
            ThresholdRecord::Plain(t) => t,
            ThresholdRecord::ColorGradient(g) => &g.threshold,
            ThresholdRecord::IconMultiState(i) => &i.threshold,
        }
    }

    pub fn write(&self, out: &mut Vec<u8>) -> FormulaResult<()> {
        match self {
            ThresholdRecord::Plain(t) => t.write(out),
            ThresholdRecord::ColorGradient(g) => g.write(out),
            ThresholdRecord::IconMultiState(i) => i.write(out),
        }
    }

    pub fn data_length(&self) -> usize {
        match self {
            ThresholdRecord::Plain(t) => t.data_length(),
            ThresholdRecord::ColorGradient(g) => g.data_length(),
            ThresholdRecord::IconMultiState(i) => i.data_length(),
        }
    }
}

// === Little-endian readers ===

fn take<'d>(data: &'d [u8], offset: &mut usize, len: usize) -> FormulaResult<&'d [u8]> {
    let end = offset.checked_add(len).filter(|end| *end <= data.len());
    match end {
        Some(end) => {
            let bytes = &data[*offset..end];
            *offset = end;
            Ok(bytes)
        }
        None => Err(FormulaError::Decoding {
            offset: *offset,
            message: format!("unexpected end of data, need {} bytes", len),
        }),
    }
}

fn read_u8(data: &[u8], offset: &mut usize) -> FormulaResult<u8> {
    Ok(take(data, offset, 1)?[0])
}

fn read_u16(data: &[u8], offset: &mut usize) -> FormulaResult<u16> {
    let bytes = take(data, offset, 2)?;
    Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
}

fn read_f64(data: &[u8], offset: &mut usize) -> FormulaResult<f64> {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(take(data, offset, 8)?);
    Ok(f64::from_le_bytes(buf))
}
