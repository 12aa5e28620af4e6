//! Formula text through parser and evaluator

use pretty_assertions::assert_eq;
use sheetcalc_formula::eval::OperandResolver;
use sheetcalc_formula::{
    ErrorEval, EvaluationCell, EvaluatorOptions, FormulaError, FormulaEvaluator, FormulaParser,
    FunctionRegistry, InMemoryWorkbook, OperationContext, Ptg, UnimplementedPolicy, ValueEval,
};
use std::sync::Arc;

fn data_workbook() -> InMemoryWorkbook {
    let mut wb = InMemoryWorkbook::with_default_sheet();
    wb.set_cell(0, "A1", 10.0).unwrap();
    wb.set_cell(0, "A2", 20.0).unwrap();
    wb.set_cell(0, "A3", 30.0).unwrap();
    wb.set_cell(0, "B1", 5.0).unwrap();
    wb.set_cell(0, "C1", "hello").unwrap();
    wb
}

fn eval(formula: &str) -> ValueEval {
    let ev = FormulaEvaluator::new(data_workbook().into_shared());
    ev.evaluate_formula(formula, EvaluationCell::new(0, 9, 9)).unwrap()
}

/// Test basic formula evaluation without cell references
#[test]
fn test_evaluate_simple_formulas() {
    assert_eq!(eval("=1+2*3"), ValueEval::Number(7.0));
    assert_eq!(eval("=(1+2)*3"), ValueEval::Number(9.0));
    assert_eq!(eval("=2^3^2"), ValueEval::Number(64.0));
    assert_eq!(eval("=-2^2"), ValueEval::Number(4.0));
    assert_eq!(eval("=50%"), ValueEval::Number(0.5));
    assert_eq!(
        eval("=\"Hello \"&\"World\""),
        ValueEval::Text("Hello World".into())
    );
    assert_eq!(eval("=5>3"), ValueEval::Bool(true));
    assert_eq!(eval("=\"abc\"=\"ABC\""), ValueEval::Bool(true));
}

#[test]
fn test_evaluate_errors_as_values() {
    assert_eq!(eval("=1/0"), ValueEval::Error(ErrorEval::DIV_ZERO));
    assert_eq!(eval("=C1+1"), ValueEval::Error(ErrorEval::VALUE_INVALID));
    assert_eq!(eval("=#N/A"), ValueEval::Error(ErrorEval::NA));
    assert_eq!(eval("=ISNA(NA())"), ValueEval::Bool(true));
}

/// Test formula evaluation with cell references
#[test]
fn test_evaluate_with_cell_references() {
    assert_eq!(eval("=A1"), ValueEval::Number(10.0));
    assert_eq!(eval("=A1+B1"), ValueEval::Number(15.0));
    assert_eq!(eval("=A1>B1"), ValueEval::Bool(true));
    assert_eq!(eval("=C1&\" world\""), ValueEval::Text("hello world".into()));
    // Blank cell
    assert_eq!(eval("=Z99"), ValueEval::Number(0.0));
}

#[test]
fn test_evaluate_ranges() {
    assert_eq!(eval("=SUM(A1:A3)"), ValueEval::Number(60.0));
    assert_eq!(eval("=SUM(A1:A3,B1)"), ValueEval::Number(65.0));
    assert_eq!(eval("=AVERAGE(A1:A3)"), ValueEval::Number(20.0));
    assert_eq!(eval("=COUNT(A1:C3)"), ValueEval::Number(4.0));
    assert_eq!(eval("=ROWS(A1:B3)*COLUMNS(A1:B3)"), ValueEval::Number(6.0));
}

#[test]
fn test_evaluate_if_and_choose() {
    assert_eq!(
        eval("=IF(A1>15,\"big\",\"small\")"),
        ValueEval::Text("small".into())
    );
    assert_eq!(eval("=IF(A2>15,\"big\")"), ValueEval::Text("big".into()));
    assert_eq!(eval("=IF(A1>15,\"big\")"), ValueEval::Bool(false));
    // The untaken branch is never evaluated
    assert_eq!(eval("=IF(TRUE,1,1/0)"), ValueEval::Number(1.0));
    assert_eq!(eval("=CHOOSE(2,\"a\",\"b\",\"c\")"), ValueEval::Text("b".into()));
    assert_eq!(eval("=CHOOSE(4,1,2,3)"), ValueEval::Error(ErrorEval::VALUE_INVALID));
}

#[test]
fn test_evaluate_dynamic_references() {
    assert_eq!(eval("=INDIRECT(\"A2\")"), ValueEval::Number(20.0));
    assert_eq!(eval("=SUM(OFFSET(A1,1,0,2,1))"), ValueEval::Number(50.0));
    assert_eq!(eval("=INDEX(A1:A3,3)"), ValueEval::Number(30.0));
    assert_eq!(eval("=ROW(A3)+COLUMN(B1)"), ValueEval::Number(5.0));
}

#[test]
fn test_text_uses_format_engine() {
    assert_eq!(
        eval("=TEXT(1234.5,\"#,##0.00\")"),
        ValueEval::Text("1,234.50".into())
    );
    assert_eq!(eval("=UPPER(LEFT(C1,3))"), ValueEval::Text("HEL".into()));
}

#[test]
fn test_sheet_qualified_references() {
    let mut wb = data_workbook();
    let data = wb.add_sheet("Data Sheet").unwrap();
    wb.set_cell(data, "A1", 7.0).unwrap();

    let ptgs = FormulaParser::new("='Data Sheet'!A1*2+A1")
        .with_workbook(&mut wb)
        .parse()
        .unwrap();
    assert!(matches!(ptgs[0], Ptg::Ref3d { .. }));

    let ev = FormulaEvaluator::new(wb.into_shared());
    let result = ev.evaluate(&ptgs, EvaluationCell::new(0, 5, 5)).unwrap();
    assert_eq!(result, ValueEval::Number(24.0));

    assert!(matches!(
        ev.evaluate_formula("=Data!A1", EvaluationCell::default()),
        Err(FormulaError::Parse { .. })
    ));
}

fn double_it(args: &[ValueEval], ctx: &OperationContext<'_>) -> ValueEval {
    match args.first().map(|a| OperandResolver::get_single_value(a, ctx.row(), ctx.col())) {
        Some(Ok(ValueEval::Number(n))) => ValueEval::Number(n * 2.0),
        _ => ValueEval::Error(ErrorEval::VALUE_INVALID),
    }
}

#[test]
fn test_user_defined_function() {
    let mut wb = data_workbook();
    let ptgs = FormulaParser::new("=DoubleIt(A2)+1")
        .with_workbook(&mut wb)
        .parse()
        .unwrap();

    let mut registry = FunctionRegistry::new();
    registry.register_udf("DOUBLEIT", double_it);
    let ev = FormulaEvaluator::with_registry(wb.into_shared(), Arc::new(registry));
    assert_eq!(
        ev.evaluate(&ptgs, EvaluationCell::default()).unwrap(),
        ValueEval::Number(41.0)
    );
}

#[test]
fn test_unknown_and_unimplemented_functions() {
    let ev = FormulaEvaluator::new(data_workbook().into_shared());
    assert_eq!(
        ev.evaluate_formula("=NOSUCHFUNC(1)", EvaluationCell::default()).unwrap(),
        ValueEval::Error(ErrorEval::NAME_INVALID)
    );
    assert_eq!(
        ev.evaluate_formula("=ISERROR(NOSUCHFUNC(1))", EvaluationCell::default()).unwrap(),
        ValueEval::Bool(true)
    );
    assert!(matches!(
        ev.evaluate_formula("=SIN(1)", EvaluationCell::default()),
        Err(FormulaError::NotImplementedFunction { .. })
    ));

    let lenient = FormulaEvaluator::new(data_workbook().into_shared()).with_options(
        EvaluatorOptions::default().with_unimplemented(UnimplementedPolicy::NameError),
    );
    assert_eq!(
        lenient.evaluate_formula("=SIN(1)", EvaluationCell::default()).unwrap(),
        ValueEval::Error(ErrorEval::NAME_INVALID)
    );
}

#[test]
fn test_tokens_survive_binary_form() {
    let ptgs = FormulaParser::new("=IF(A1>0,SUM(A1:A3),-1)").parse().unwrap();
    let bytes = sheetcalc_formula::ptg::encode(&ptgs).unwrap();
    assert_eq!(bytes.len(), sheetcalc_formula::ptg::encoded_size(&ptgs));
    let decoded = sheetcalc_formula::ptg::decode(&bytes).unwrap();

    let ev = FormulaEvaluator::new(data_workbook().into_shared());
    assert_eq!(
        ev.evaluate(&decoded, EvaluationCell::default()).unwrap(),
        ValueEval::Number(60.0)
    );
}
