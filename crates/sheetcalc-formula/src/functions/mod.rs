//! Built-in spreadsheet functions
//!
//! Functions receive their arguments exactly as they sit on the operand
//! stack, references included, and always produce a value: failures are
//! returned as [`ValueEval::Error`].

pub mod date;
pub mod info;
pub mod logical;
pub mod math;
pub mod metadata;
pub mod reference;
pub mod special;
pub mod text;

use crate::error::{FormulaError, FormulaResult};
use crate::eval::{ErrorEval, EvalResult, OperandResolver, OperationContext, ValueEval};
use ahash::AHashMap;
use metadata::FunctionMetadata;
use once_cell::sync::Lazy;
use std::fmt;
use std::sync::Arc;

/// Function implementation signature
pub type Function = fn(&[ValueEval], &OperationContext<'_>) -> ValueEval;

/// User-defined (add-in) function signature
///
/// Same shape as [`Function`]; kept separate because add-ins are looked up
/// by name rather than by index.
pub type FreeRefFunction = fn(&[ValueEval], &OperationContext<'_>) -> ValueEval;

/// Built-ins the evaluator handles itself because they need control over
/// argument evaluation or the workbook
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecialForm {
    If,
    Choose,
    Offset,
    Indirect,
    External,
}

impl SpecialForm {
    /// The special form stored at a function index
    pub fn from_index(index: u16) -> Option<Self> {
        match index {
            metadata::FUNCTION_INDEX_IF => Some(SpecialForm::If),
            metadata::FUNCTION_INDEX_CHOOSE => Some(SpecialForm::Choose),
            metadata::FUNCTION_INDEX_OFFSET => Some(SpecialForm::Offset),
            metadata::FUNCTION_INDEX_INDIRECT => Some(SpecialForm::Indirect),
            metadata::FUNCTION_INDEX_EXTERNAL => Some(SpecialForm::External),
            _ => None,
        }
    }
}

/// One entry of the function table
#[derive(Clone, Copy)]
pub enum FunctionSlot {
    /// No function has this index
    Empty,
    /// Ordinary function
    Basic(Function),
    /// Handled by the evaluator
    Special(SpecialForm),
    /// Known built-in without an implementation
    NotImplemented(&'static str),
}

impl fmt::Debug for FunctionSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FunctionSlot::Empty => f.write_str("Empty"),
            FunctionSlot::Basic(_) => f.write_str("Basic"),
            FunctionSlot::Special(form) => write!(f, "Special({:?})", form),
            FunctionSlot::NotImplemented(name) => write!(f, "NotImplemented({})", name),
        }
    }
}

/// Function table indexed by BIFF function number, plus add-ins by name
#[derive(Clone)]
pub struct FunctionRegistry {
    slots: Vec<FunctionSlot>,
    udfs: AHashMap<String, FreeRefFunction>,
}

static SHARED: Lazy<Arc<FunctionRegistry>> = Lazy::new(|| Arc::new(FunctionRegistry::new()));

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionRegistry")
            .field("implemented", &self.implemented().count())
            .field("udfs", &self.udfs.len())
            .finish()
    }
}

impl FunctionRegistry {
    /// Create a new registry with all built-in functions
    pub fn new() -> Self {
        let mut registry = Self {
            slots: vec![FunctionSlot::Empty; metadata::FUNCTION_SLOTS],
            udfs: AHashMap::new(),
        };

        for meta in metadata::all() {
            registry.slots[meta.index as usize] = match SpecialForm::from_index(meta.index) {
                Some(form) => FunctionSlot::Special(form),
                None => FunctionSlot::NotImplemented(meta.name),
            };
        }

        registry.register_math_functions();
        registry.register_logical_functions();
        registry.register_text_functions();
        registry.register_info_functions();
        registry.register_reference_functions();
        registry.register_date_functions();

        registry
    }

    /// The process-wide default registry
    pub fn shared() -> Arc<FunctionRegistry> {
        Arc::clone(&SHARED)
    }

    /// Entry at `index`
    pub fn slot(&self, index: u16) -> FunctionSlot {
        self.slots
            .get(index as usize)
            .copied()
            .unwrap_or(FunctionSlot::Empty)
    }

    /// The ordinary function at `index`
    ///
    /// `Ok(None)` marks a special form the evaluator must handle itself.
    pub fn get_basic_function(&self, index: u16) -> FormulaResult<Option<Function>> {
        match self.slot(index) {
            FunctionSlot::Basic(f) => Ok(Some(f)),
            FunctionSlot::Special(_) => Ok(None),
            FunctionSlot::NotImplemented(name) => Err(FormulaError::NotImplementedFunction {
                name: name.to_string(),
            }),
            FunctionSlot::Empty => Err(FormulaError::UnregisteredFunction(index)),
        }
    }

    /// Install or replace the implementation of a known built-in
    pub fn register(&mut self, name: &str, function: Function) -> FormulaResult<()> {
        let meta = metadata::lookup_by_name(name)
            .ok_or_else(|| FormulaError::UnknownFunction(name.to_string()))?;
        if SpecialForm::from_index(meta.index).is_some() {
            return Err(FormulaError::ReservedFunction(meta.name.to_string()));
        }
        self.slots[meta.index as usize] = FunctionSlot::Basic(function);
        Ok(())
    }

    /// Register an add-in function, callable under `name` from any formula
    pub fn register_udf(&mut self, name: &str, function: FreeRefFunction) {
        self.udfs.insert(name.to_ascii_uppercase(), function);
    }

    /// Look up an add-in function by name (case-insensitive)
    pub fn find_udf(&self, name: &str) -> Option<FreeRefFunction> {
        self.udfs.get(&name.to_ascii_uppercase()).copied()
    }

    /// Metadata of every built-in that has an implementation
    pub fn implemented(&self) -> impl Iterator<Item = &'static FunctionMetadata> + '_ {
        metadata::all()
            .iter()
            .filter(|m| !matches!(self.slot(m.index), FunctionSlot::NotImplemented(_)))
    }

    fn set(&mut self, name: &str, function: Function) {
        match metadata::lookup_by_name(name) {
            Some(meta) => self.slots[meta.index as usize] = FunctionSlot::Basic(function),
            None => log::error!("built-in {} missing from the function table", name),
        }
    }

    fn register_math_functions(&mut self) {
        self.set("SUM", math::fn_sum);
        self.set("AVERAGE", math::fn_average);
        self.set("MIN", math::fn_min);
        self.set("MAX", math::fn_max);
        self.set("COUNT", math::fn_count);
        self.set("COUNTA", math::fn_counta);
        self.set("COUNTBLANK", math::fn_countblank);
        self.set("ABS", math::fn_abs);
        self.set("INT", math::fn_int);
        self.set("SIGN", math::fn_sign);
        self.set("ROUND", math::fn_round);
        self.set("ROUNDUP", math::fn_roundup);
        self.set("ROUNDDOWN", math::fn_rounddown);
        self.set("TRUNC", math::fn_trunc);
        self.set("SQRT", math::fn_sqrt);
        self.set("EXP", math::fn_exp);
        self.set("LN", math::fn_ln);
        self.set("LOG10", math::fn_log10);
        self.set("MOD", math::fn_mod);
        self.set("POWER", math::fn_power);
        self.set("PI", math::fn_pi);
        self.set("PRODUCT", math::fn_product);
        self.set("RAND", math::fn_rand);
    }

    fn register_logical_functions(&mut self) {
        self.set("AND", logical::fn_and);
        self.set("OR", logical::fn_or);
        self.set("NOT", logical::fn_not);
        self.set("TRUE", logical::fn_true);
        self.set("FALSE", logical::fn_false);
    }

    fn register_text_functions(&mut self) {
        self.set("LEN", text::fn_len);
        self.set("LEFT", text::fn_left);
        self.set("RIGHT", text::fn_right);
        self.set("MID", text::fn_mid);
        self.set("LOWER", text::fn_lower);
        self.set("UPPER", text::fn_upper);
        self.set("TRIM", text::fn_trim);
        self.set("EXACT", text::fn_exact);
        self.set("CONCATENATE", text::fn_concatenate);
        self.set("VALUE", text::fn_value);
        self.set("TEXT", text::fn_text);
    }

    fn register_info_functions(&mut self) {
        self.set("ISNA", info::fn_isna);
        self.set("ISERROR", info::fn_iserror);
        self.set("ISERR", info::fn_iserr);
        self.set("ISTEXT", info::fn_istext);
        self.set("ISNONTEXT", info::fn_isnontext);
        self.set("ISNUMBER", info::fn_isnumber);
        self.set("ISBLANK", info::fn_isblank);
        self.set("ISLOGICAL", info::fn_islogical);
        self.set("ISREF", info::fn_isref);
        self.set("NA", info::fn_na);
        self.set("ERROR.TYPE", info::fn_error_type);
    }

    fn register_reference_functions(&mut self) {
        self.set("ROW", reference::fn_row);
        self.set("COLUMN", reference::fn_column);
        self.set("ROWS", reference::fn_rows);
        self.set("COLUMNS", reference::fn_columns);
        self.set("INDEX", reference::fn_index);
    }

    fn register_date_functions(&mut self) {
        self.set("DATE", date::fn_date);
    }
}

// === Argument helpers shared by the function modules ===

/// Fold an `EvalResult` into a value
pub(crate) fn value_of(result: EvalResult<ValueEval>) -> ValueEval {
    result.unwrap_or_else(ValueEval::Error)
}

/// Wrap a numeric result, turning NaN and infinities into `#NUM!`
pub(crate) fn number_of(result: EvalResult<f64>) -> ValueEval {
    match result {
        Ok(n) if n.is_finite() => ValueEval::Number(n),
        Ok(_) => ValueEval::Error(ErrorEval::NUM_ERROR),
        Err(e) => ValueEval::Error(e),
    }
}

/// Check the argument count, `#VALUE!` when it is out of range
pub(crate) fn check_args(args: &[ValueEval], min: usize, max: usize) -> EvalResult<()> {
    if args.len() < min || args.len() > max {
        return Err(ErrorEval::VALUE_INVALID);
    }
    Ok(())
}

/// Argument reduced to a single scalar
pub(crate) fn scalar_arg(arg: &ValueEval, ctx: &OperationContext<'_>) -> EvalResult<ValueEval> {
    OperandResolver::get_single_value(arg, ctx.row(), ctx.col())
}

/// Argument reduced to a number
pub(crate) fn number_arg(arg: &ValueEval, ctx: &OperationContext<'_>) -> EvalResult<f64> {
    ctx.checked(OperandResolver::coerce_value_to_double(&scalar_arg(arg, ctx)?))
}

/// Argument reduced to an integer (rounded toward negative infinity)
pub(crate) fn int_arg(arg: &ValueEval, ctx: &OperationContext<'_>) -> EvalResult<i32> {
    ctx.checked(OperandResolver::coerce_value_to_int(&scalar_arg(arg, ctx)?))
}

/// Argument reduced to text
pub(crate) fn text_arg(arg: &ValueEval, ctx: &OperationContext<'_>) -> EvalResult<String> {
    Ok(OperandResolver::coerce_value_to_string(&scalar_arg(arg, ctx)?))
}
