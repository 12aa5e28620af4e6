//! Formula evaluator
//!
//! Runs a token stream against a workbook with an operand stack. IF and
//! CHOOSE are short-circuited through their attribute tokens, so only the
//! chosen branch is ever evaluated.

use super::context::OperationContext;
use super::error_eval::ErrorEval;
use super::operators::{evaluate_binary, evaluate_unary};
use super::options::{EvaluatorOptions, UnimplementedPolicy};
use super::reference::{AreaEval, CellSource, RefEval};
use super::resolver::OperandResolver;
use super::value::ValueEval;
use super::workbook::{EvaluationCell, EvaluationWorkbook};
use crate::error::{FormulaError, FormulaResult};
use crate::functions::metadata::{self, FUNCTION_INDEX_IF, FUNCTION_INDEX_SUM};
use crate::functions::{special, FunctionRegistry, SpecialForm};
use crate::ptg::Ptg;
use std::rc::Rc;
use std::sync::Arc;

/// Evaluates formula tokens against one workbook
pub struct FormulaEvaluator {
    workbook: Rc<dyn EvaluationWorkbook>,
    registry: Arc<FunctionRegistry>,
    options: EvaluatorOptions,
}

impl FormulaEvaluator {
    /// Create an evaluator using the shared built-in function table
    pub fn new(workbook: Rc<dyn EvaluationWorkbook>) -> Self {
        Self::with_registry(workbook, FunctionRegistry::shared())
    }

    /// Create an evaluator with a custom function table
    pub fn with_registry(workbook: Rc<dyn EvaluationWorkbook>, registry: Arc<FunctionRegistry>) -> Self {
        Self {
            workbook,
            registry,
            options: EvaluatorOptions::default(),
        }
    }

    /// Replace the evaluator settings
    pub fn with_options(mut self, options: EvaluatorOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &EvaluatorOptions {
        &self.options
    }

    pub fn workbook(&self) -> &Rc<dyn EvaluationWorkbook> {
        &self.workbook
    }

    pub fn registry(&self) -> &FunctionRegistry {
        &self.registry
    }

    /// Parse `formula` and evaluate it at `cell`
    ///
    /// The text is parsed without a workbook, so sheet-qualified references
    /// are rejected and add-in names evaluate to `#NAME?`. Parse with
    /// [`FormulaParser::with_workbook`](crate::FormulaParser::with_workbook)
    /// and call [`evaluate`](Self::evaluate) for those.
    pub fn evaluate_formula(&self, formula: &str, cell: EvaluationCell) -> FormulaResult<ValueEval> {
        let ptgs = crate::parser::FormulaParser::new(formula)
            .with_version(self.options.version)
            .parse()?;
        self.evaluate(&ptgs, cell)
    }

    /// Evaluate a token stream for the formula in `cell`
    ///
    /// The result is always a scalar: references are dereferenced relative
    /// to `cell` and a blank result becomes 0. Spreadsheet errors are
    /// returned as [`ValueEval::Error`].
    pub fn evaluate(&self, ptgs: &[Ptg], cell: EvaluationCell) -> FormulaResult<ValueEval> {
        let ctx = OperationContext::new(cell, &self.workbook, &self.registry, &self.options);
        let mut stack: Vec<ValueEval> = Vec::with_capacity(ptgs.len());

        let mut i = 0;
        while i < ptgs.len() {
            let ptg = &ptgs[i];
            log::trace!("token {}: {:?} (stack depth {})", i, ptg, stack.len());

            match ptg {
                Ptg::AttrIf { data } => {
                    let condition = pop(&mut stack, i)?;
                    let outcome = match OperandResolver::get_single_value(&condition, cell.row, cell.col) {
                        Ok(v) => OperandResolver::coerce_value_to_boolean(&v, false)?,
                        Err(e) => Err(e),
                    };
                    match outcome {
                        Ok(Some(true)) => {}
                        Ok(_) => {
                            i += count_tokens_to_be_skipped(ptgs, i, *data as usize)?;
                            let at_skip = matches!(ptgs.get(i), Some(Ptg::AttrSkip { .. }));
                            let if_follows = matches!(
                                ptgs.get(i + 1),
                                Some(Ptg::FuncVar { index: FUNCTION_INDEX_IF, .. })
                            );
                            if at_skip && if_follows {
                                // IF without a false branch
                                stack.push(condition);
                                stack.push(ValueEval::FALSE);
                            }
                        }
                        Err(e) => {
                            stack.push(ValueEval::Error(e));
                            i += count_tokens_to_be_skipped(ptgs, i, *data as usize)?;
                            let Some(Ptg::AttrSkip { data: skip }) = ptgs.get(i) else {
                                return Err(FormulaError::BadSkipDistance {
                                    index: i,
                                    distance: *data as usize,
                                });
                            };
                            i += count_tokens_to_be_skipped(ptgs, i, *skip as usize + 1)?;
                        }
                    }
                }
                Ptg::AttrSkip { data } => {
                    i += count_tokens_to_be_skipped(ptgs, i, *data as usize + 1)?;
                    if matches!(stack.last(), Some(ValueEval::MissingArg)) {
                        stack.pop();
                        stack.push(ValueEval::Blank);
                    }
                }
                Ptg::AttrChoose {
                    jump_table,
                    choose_func_offset,
                } => {
                    let index = pop(&mut stack, i)?;
                    let choices = jump_table.len();
                    let past_choose = *choose_func_offset as usize + 4;
                    let chosen = match OperandResolver::get_single_value(&index, cell.row, cell.col) {
                        Ok(v) => OperandResolver::coerce_value_to_int(&v)?,
                        Err(e) => Err(e),
                    };
                    let distance = match chosen {
                        Ok(k) if k >= 1 && k as usize <= choices => jump_table[k as usize - 1] as usize,
                        Ok(_) => {
                            stack.push(ValueEval::Error(ErrorEval::VALUE_INVALID));
                            past_choose
                        }
                        Err(e) => {
                            stack.push(ValueEval::Error(e));
                            past_choose
                        }
                    };
                    // The encoded distance includes the jump table itself
                    let table = choices * 2 + 2;
                    let distance = distance.checked_sub(table).ok_or(FormulaError::BadSkipDistance {
                        index: i,
                        distance,
                    })?;
                    i += count_tokens_to_be_skipped(ptgs, i, distance)?;
                }
                Ptg::AttrSum => {
                    let args = pop_args(&mut stack, 1, i)?;
                    stack.push(self.call(FUNCTION_INDEX_SUM, &args, &ctx)?);
                }
                Ptg::AttrSpace { .. } | Ptg::AttrVolatile | Ptg::Paren => {}
                Ptg::Func { index } => {
                    let meta = metadata::lookup_by_index(*index)
                        .ok_or(FormulaError::UnregisteredFunction(*index))?;
                    let args = pop_args(&mut stack, meta.min_args as usize, i)?;
                    stack.push(self.call(*index, &args, &ctx)?);
                }
                Ptg::FuncVar { index, argc } => {
                    let args = pop_args(&mut stack, *argc as usize, i)?;
                    stack.push(self.call(*index, &args, &ctx)?);
                }
                Ptg::Binary(op) => {
                    let right = pop(&mut stack, i)?;
                    let left = pop(&mut stack, i)?;
                    stack.push(evaluate_binary(*op, &left, &right, cell)?);
                }
                Ptg::Unary(op) => {
                    let operand = pop(&mut stack, i)?;
                    stack.push(evaluate_unary(*op, &operand, cell)?);
                }
                operand => stack.push(self.operand_value(operand, &ctx)),
            }
            i += 1;
        }

        let value = stack.pop().ok_or(FormulaError::StackUnderflow(ptgs.len()))?;
        if !stack.is_empty() {
            return Err(FormulaError::StackNotEmpty(stack.len()));
        }
        Ok(dereference_result(value, cell))
    }

    fn operand_value(&self, ptg: &Ptg, ctx: &OperationContext<'_>) -> ValueEval {
        let sheet = ctx.sheet();
        let source = || CellSource::Workbook(Rc::clone(&self.workbook));
        match ptg {
            Ptg::Number(n) => ValueEval::Number(*n),
            Ptg::Int(n) => ValueEval::Number(*n as f64),
            Ptg::Str(s) => ValueEval::Text(s.clone()),
            Ptg::Bool(b) => ValueEval::Bool(*b),
            Ptg::Error(code) => ValueEval::Error(*ErrorEval::of(*code)),
            Ptg::MissingArg => ValueEval::MissingArg,
            Ptg::Ref(r) => ValueEval::Ref(RefEval::new(sheet, r.row, r.col, source())),
            Ptg::Area(a) => ValueEval::Area(AreaEval::new(sheet, a.range(), source())),
            Ptg::Ref3d { ixti, cell } => match self.workbook.extern_sheet(*ixti) {
                Some((first, last)) => {
                    ValueEval::Ref(RefEval::new_3d(first, last, cell.row, cell.col, source()))
                }
                None => ValueEval::Error(ErrorEval::REF_INVALID),
            },
            Ptg::Area3d { ixti, area } => match self.workbook.extern_sheet(*ixti) {
                Some((first, last)) => {
                    ValueEval::Area(AreaEval::new_3d(first, last, area.range(), source()))
                }
                None => ValueEval::Error(ErrorEval::REF_INVALID),
            },
            Ptg::RefErr | Ptg::AreaErr => ValueEval::Error(ErrorEval::REF_INVALID),
            Ptg::NameX { ixti, name_index } => match self.workbook.external_name(*ixti, *name_index) {
                Some(name) => ValueEval::FunctionName(name),
                None => ValueEval::Error(ErrorEval::NAME_INVALID),
            },
            other => {
                log::error!("token {:?} reached the operand path", other);
                ValueEval::Error(ErrorEval::VALUE_INVALID)
            }
        }
    }

    fn call(&self, index: u16, args: &[ValueEval], ctx: &OperationContext<'_>) -> FormulaResult<ValueEval> {
        let value = self.dispatch(index, args, ctx)?;
        match ctx.take_fault() {
            Some(defect) => Err(defect),
            None => Ok(value),
        }
    }

    fn dispatch(&self, index: u16, args: &[ValueEval], ctx: &OperationContext<'_>) -> FormulaResult<ValueEval> {
        match self.registry.get_basic_function(index) {
            Ok(Some(function)) => Ok(function(args, ctx)),
            Ok(None) => {
                let form =
                    SpecialForm::from_index(index).ok_or(FormulaError::UnregisteredFunction(index))?;
                Ok(special::evaluate(form, args, ctx))
            }
            Err(FormulaError::NotImplementedFunction { name })
                if self.options.unimplemented == UnimplementedPolicy::NameError =>
            {
                log::warn!("{} is not implemented, returning #NAME?", name);
                Ok(ValueEval::Error(ErrorEval::NAME_INVALID))
            }
            Err(e) => Err(e),
        }
    }
}

fn pop(stack: &mut Vec<ValueEval>, token: usize) -> FormulaResult<ValueEval> {
    stack.pop().ok_or(FormulaError::StackUnderflow(token))
}

/// Pop the top `count` operands, first argument first
fn pop_args(stack: &mut Vec<ValueEval>, count: usize, token: usize) -> FormulaResult<Vec<ValueEval>> {
    if stack.len() < count {
        return Err(FormulaError::StackUnderflow(token));
    }
    Ok(stack.split_off(stack.len() - count))
}

fn dereference_result(value: ValueEval, cell: EvaluationCell) -> ValueEval {
    match OperandResolver::get_single_value(&value, cell.row, cell.col) {
        Ok(ValueEval::Blank) | Ok(ValueEval::MissingArg) => ValueEval::Number(0.0),
        Ok(v) => v,
        Err(e) => ValueEval::Error(e),
    }
}

/// Number of tokens after `start` covering exactly `distance` bytes
///
/// Fails when the distance ends inside a token or past the end.
pub fn count_tokens_to_be_skipped(ptgs: &[Ptg], start: usize, distance: usize) -> FormulaResult<usize> {
    let bad = || FormulaError::BadSkipDistance {
        index: start,
        distance,
    };
    let mut remaining = distance;
    let mut index = start;
    while remaining != 0 {
        index += 1;
        let size = ptgs.get(index).ok_or_else(bad)?.size();
        remaining = remaining.checked_sub(size).ok_or_else(bad)?;
    }
    Ok(index - start)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::{BinaryOperator, InMemoryWorkbook};
    use crate::ptg::CellRef;
    use pretty_assertions::assert_eq;

    fn evaluator() -> FormulaEvaluator {
        let mut wb = InMemoryWorkbook::with_default_sheet();
        wb.set_cell(0, "A1", 5.0).unwrap();
        wb.set_cell(0, "A2", ErrorEval::DIV_ZERO).unwrap();
        FormulaEvaluator::new(wb.into_shared())
    }

    fn s(text: &str) -> Ptg {
        Ptg::Str(text.to_string())
    }

    /// IF(cond, "pos", "neg")
    fn if_else(cond: Vec<Ptg>) -> Vec<Ptg> {
        let mut ptgs = cond;
        ptgs.extend([
            Ptg::AttrIf { data: 6 + 4 },
            s("pos"),
            Ptg::AttrSkip { data: 6 + 4 + 4 - 1 },
            s("neg"),
            Ptg::AttrSkip { data: 3 },
            Ptg::FuncVar { index: FUNCTION_INDEX_IF, argc: 3 },
        ]);
        ptgs
    }

    /// CHOOSE(index, "a", "bb", "ccc")
    fn choose(index: Ptg) -> Vec<Ptg> {
        vec![
            index,
            Ptg::AttrChoose {
                jump_table: vec![8, 16, 25],
                choose_func_offset: 35,
            },
            s("a"),
            Ptg::AttrSkip { data: 22 },
            s("bb"),
            Ptg::AttrSkip { data: 13 },
            s("ccc"),
            Ptg::AttrSkip { data: 3 },
            Ptg::FuncVar { index: 100, argc: 4 },
        ]
    }

    fn at_a3() -> EvaluationCell {
        EvaluationCell::new(0, 2, 0)
    }

    #[test]
    fn test_arithmetic() {
        let ev = evaluator();
        let ptgs = [
            Ptg::Ref(CellRef::new(0, 0)),
            Ptg::Int(3),
            Ptg::Binary(BinaryOperator::Multiply),
        ];
        assert_eq!(ev.evaluate(&ptgs, at_a3()).unwrap(), ValueEval::Number(15.0));
    }

    #[test]
    fn test_if_true_and_false() {
        let ev = evaluator();
        let cond = |n| {
            vec![
                Ptg::Ref(CellRef::new(0, 0)),
                Ptg::Int(n),
                Ptg::Binary(BinaryOperator::GreaterThan),
            ]
        };
        assert_eq!(ev.evaluate(&if_else(cond(1)), at_a3()).unwrap(), "pos".into());
        assert_eq!(ev.evaluate(&if_else(cond(9)), at_a3()).unwrap(), "neg".into());
    }

    #[test]
    fn test_if_without_false_branch() {
        let ev = evaluator();
        let ptgs = |cond: bool| {
            vec![
                Ptg::Bool(cond),
                Ptg::AttrIf { data: 6 + 4 },
                s("yes"),
                Ptg::AttrSkip { data: 3 },
                Ptg::FuncVar { index: FUNCTION_INDEX_IF, argc: 2 },
            ]
        };
        assert_eq!(ev.evaluate(&ptgs(true), at_a3()).unwrap(), "yes".into());
        assert_eq!(ev.evaluate(&ptgs(false), at_a3()).unwrap(), ValueEval::FALSE);
    }

    #[test]
    fn test_if_error_condition() {
        let ev = evaluator();
        let ptgs = if_else(vec![Ptg::Ref(CellRef::new(1, 0))]);
        assert_eq!(
            ev.evaluate(&ptgs, at_a3()).unwrap(),
            ValueEval::Error(ErrorEval::DIV_ZERO)
        );
    }

    #[test]
    fn test_choose_branches() {
        let ev = evaluator();
        assert_eq!(ev.evaluate(&choose(Ptg::Int(1)), at_a3()).unwrap(), "a".into());
        assert_eq!(ev.evaluate(&choose(Ptg::Int(2)), at_a3()).unwrap(), "bb".into());
        assert_eq!(ev.evaluate(&choose(Ptg::Int(3)), at_a3()).unwrap(), "ccc".into());
    }

    #[test]
    fn test_choose_out_of_range() {
        let ev = evaluator();
        assert_eq!(
            ev.evaluate(&choose(Ptg::Int(4)), at_a3()).unwrap(),
            ValueEval::Error(ErrorEval::VALUE_INVALID)
        );
        assert_eq!(
            ev.evaluate(&choose(Ptg::Ref(CellRef::new(1, 0))), at_a3()).unwrap(),
            ValueEval::Error(ErrorEval::DIV_ZERO)
        );
    }

    #[test]
    fn test_missing_branch_is_blank() {
        let ev = evaluator();
        let ptgs = [
            Ptg::Bool(true),
            Ptg::AttrIf { data: 1 + 4 },
            Ptg::MissingArg,
            Ptg::AttrSkip { data: 3 + 4 + 4 - 1 },
            Ptg::Int(1),
            Ptg::AttrSkip { data: 3 },
            Ptg::FuncVar { index: FUNCTION_INDEX_IF, argc: 3 },
        ];
        // blank results read as zero
        assert_eq!(ev.evaluate(&ptgs, at_a3()).unwrap(), ValueEval::Number(0.0));
    }

    #[test]
    fn test_count_tokens_to_be_skipped() {
        let ptgs = [Ptg::AttrSkip { data: 0 }, Ptg::Int(1), s("abc"), Ptg::Bool(true)];
        assert_eq!(count_tokens_to_be_skipped(&ptgs, 0, 0).unwrap(), 0);
        assert_eq!(count_tokens_to_be_skipped(&ptgs, 0, 3).unwrap(), 1);
        assert_eq!(count_tokens_to_be_skipped(&ptgs, 0, 11).unwrap(), 3);
        assert!(matches!(
            count_tokens_to_be_skipped(&ptgs, 0, 4),
            Err(FormulaError::BadSkipDistance { index: 0, distance: 4 })
        ));
        assert!(count_tokens_to_be_skipped(&ptgs, 0, 20).is_err());
    }

    #[test]
    fn test_bad_skip_in_stream() {
        let ev = evaluator();
        let ptgs = [Ptg::Int(1), Ptg::AttrSkip { data: 1 }, s("abc")];
        assert!(matches!(
            ev.evaluate(&ptgs, at_a3()),
            Err(FormulaError::BadSkipDistance { .. })
        ));
    }

    #[test]
    fn test_stack_errors() {
        let ev = evaluator();
        assert_eq!(
            ev.evaluate(&[Ptg::Binary(BinaryOperator::Add)], at_a3()),
            Err(FormulaError::StackUnderflow(0))
        );
        assert_eq!(
            ev.evaluate(&[Ptg::Int(1), Ptg::Int(2)], at_a3()),
            Err(FormulaError::StackNotEmpty(1))
        );
        assert_eq!(ev.evaluate(&[], at_a3()), Err(FormulaError::StackUnderflow(0)));
    }

    #[test]
    fn test_attr_sum() {
        let mut wb = InMemoryWorkbook::with_default_sheet();
        wb.set_cell(0, "A1", 2.0).unwrap();
        wb.set_cell(0, "A2", 3.0).unwrap();
        let ev = FormulaEvaluator::new(wb.into_shared());
        let area = crate::ptg::AreaRef::new(CellRef::new(0, 0), CellRef::new(1, 0));
        let ptgs = [Ptg::Area(area), Ptg::AttrSum];
        assert_eq!(ev.evaluate(&ptgs, at_a3()).unwrap(), ValueEval::Number(5.0));
    }

    #[test]
    fn test_reference_result_is_dereferenced() {
        let ev = evaluator();
        let ptgs = [Ptg::Ref(CellRef::new(0, 0))];
        assert_eq!(ev.evaluate(&ptgs, at_a3()).unwrap(), ValueEval::Number(5.0));
        let ptgs = [Ptg::Ref(CellRef::new(9, 9))];
        assert_eq!(ev.evaluate(&ptgs, at_a3()).unwrap(), ValueEval::Number(0.0));
    }

    #[test]
    fn test_missing_extern_sheet_is_ref_error() {
        let ev = evaluator();
        let ptgs = [Ptg::Ref3d {
            ixti: 7,
            cell: CellRef::new(0, 0),
        }];
        assert_eq!(
            ev.evaluate(&ptgs, at_a3()).unwrap(),
            ValueEval::Error(ErrorEval::REF_INVALID)
        );
    }

    #[test]
    fn test_unimplemented_policy() {
        // SIN
        let ptgs = [Ptg::Int(1), Ptg::Func { index: 15 }];
        let ev = evaluator();
        assert_eq!(
            ev.evaluate(&ptgs, at_a3()),
            Err(FormulaError::NotImplementedFunction { name: "SIN".into() })
        );

        let ev = evaluator().with_options(
            EvaluatorOptions::default().with_unimplemented(UnimplementedPolicy::NameError),
        );
        assert_eq!(
            ev.evaluate(&ptgs, at_a3()).unwrap(),
            ValueEval::Error(ErrorEval::NAME_INVALID)
        );
    }

    fn triple(args: &[ValueEval], ctx: &OperationContext<'_>) -> ValueEval {
        match args.first().map(|a| OperandResolver::get_single_value(a, ctx.row(), ctx.col())) {
            Some(Ok(ValueEval::Number(n))) => ValueEval::Number(n * 3.0),
            _ => ValueEval::Error(ErrorEval::VALUE_INVALID),
        }
    }

    #[test]
    fn test_add_in_function() {
        use crate::eval::FormulaParsingWorkbook;

        let mut wb = InMemoryWorkbook::with_default_sheet();
        wb.set_cell(0, "A1", 5.0).unwrap();
        let (ixti, name_index) = wb.external_name_index("Triple");
        let mut registry = FunctionRegistry::new();
        registry.register_udf("triple", triple);
        let ev = FormulaEvaluator::with_registry(wb.into_shared(), Arc::new(registry));

        let ptgs = [
            Ptg::NameX { ixti, name_index },
            Ptg::Ref(CellRef::new(0, 0)),
            Ptg::FuncVar { index: 255, argc: 2 },
        ];
        assert_eq!(ev.evaluate(&ptgs, at_a3()).unwrap(), ValueEval::Number(15.0));
    }

    #[test]
    fn test_unresolved_operand_is_not_a_formula_error() {
        use crate::eval::{FormulaParsingWorkbook, UnaryOperator};

        let mut wb = InMemoryWorkbook::with_default_sheet();
        let (ixti, name_index) = wb.external_name_index("Stray");
        let ev = FormulaEvaluator::new(wb.into_shared());
        let name = Ptg::NameX { ixti, name_index };

        // ABS(name) and -name coerce a function name to a number
        for ptgs in [
            vec![name.clone(), Ptg::Func { index: 24 }],
            vec![name.clone(), Ptg::Unary(UnaryOperator::Negate)],
            vec![name, Ptg::Number(1.0), Ptg::Binary(BinaryOperator::Add)],
        ] {
            assert!(matches!(
                ev.evaluate(&ptgs, at_a3()),
                Err(FormulaError::UnexpectedOperand(_))
            ));
        }
    }
}
