//! sheetcalc CLI - evaluate formulas and render number formats

use anyhow::{anyhow, bail, Context, Result};
use chrono::{NaiveDate, NaiveDateTime};
use clap::{Parser, Subcommand, ValueEnum};
use sheetcalc::prelude::*;
use sheetcalc::{ErrorEval, FunctionRegistry, UnimplementedPolicy};

#[derive(Parser)]
#[command(name = "sheetcalc")]
#[command(
    author,
    version,
    about = "Spreadsheet formula evaluation and number-format rendering"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a value through a number format
    #[command(alias = "fmt")]
    Format {
        /// Format string, e.g. '#,##0.00;[Red](#,##0.00)'
        #[arg(allow_hyphen_values = true)]
        format: String,

        /// Value: a number, TRUE/FALSE, a date (2024-01-31 or 2024-01-31T09:30:00) or text
        #[arg(allow_hyphen_values = true)]
        value: String,

        /// Treat the value as text even if it looks like a number
        #[arg(short, long)]
        text: bool,

        /// Date system for serial numbers
        #[arg(short, long, value_enum, default_value_t = Epoch::Excel1900)]
        date_system: Epoch,

        /// Also print the text colour the format selects
        #[arg(short, long)]
        verbose: bool,
    },

    /// Evaluate a formula against cells given on the command line
    Eval {
        /// Formula text, with or without a leading '='
        #[arg(allow_hyphen_values = true)]
        formula: String,

        /// Cell value, e.g. A1=5, B2=hello, 'Data!C3=TRUE' (repeatable)
        #[arg(short, long = "cell", value_name = "REF=VALUE")]
        cells: Vec<String>,

        /// Cell the formula lives in
        #[arg(short, long, default_value = "A1")]
        at: String,

        /// Render the result through this number format
        #[arg(short, long)]
        format: Option<String>,

        /// Print the parsed token stream before the result
        #[arg(long)]
        tokens: bool,

        /// Show #NAME? instead of failing on unimplemented functions
        #[arg(long)]
        lenient: bool,

        /// Use Excel 2007 grid limits instead of BIFF8
        #[arg(long)]
        excel2007: bool,

        /// Date system for DATE and TEXT
        #[arg(short, long, value_enum, default_value_t = Epoch::Excel1900)]
        date_system: Epoch,
    },

    /// List the built-in functions and whether they are implemented
    Functions {
        /// Only show implemented functions
        #[arg(short, long)]
        implemented: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Epoch {
    #[value(name = "1900")]
    Excel1900,
    #[value(name = "1904")]
    Excel1904,
}

impl From<Epoch> for DateSystem {
    fn from(epoch: Epoch) -> Self {
        match epoch {
            Epoch::Excel1900 => DateSystem::Excel1900,
            Epoch::Excel1904 => DateSystem::Excel1904,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Format {
            format,
            value,
            text,
            date_system,
            verbose,
        } => format_command(&format, &value, text, date_system.into(), verbose),
        Commands::Eval {
            formula,
            cells,
            at,
            format,
            tokens,
            lenient,
            excel2007,
            date_system,
        } => {
            let options = EvaluatorOptions::default()
                .with_date_system(date_system.into())
                .with_version(if excel2007 {
                    SpreadsheetVersion::Excel2007
                } else {
                    SpreadsheetVersion::Excel97
                })
                .with_unimplemented(if lenient {
                    UnimplementedPolicy::NameError
                } else {
                    UnimplementedPolicy::Fail
                });
            eval_command(&formula, &cells, &at, format.as_deref(), tokens, options)
        }
        Commands::Functions { implemented } => list_functions(implemented),
    }
}

fn format_command(
    format: &str,
    value: &str,
    as_text: bool,
    date_system: DateSystem,
    verbose: bool,
) -> Result<()> {
    let cell_format = CellFormat::get_instance(format)
        .with_context(|| format!("Invalid format '{}'", format))?;
    let value = if as_text {
        FormatValue::Text(value.to_string())
    } else {
        parse_format_value(value)
    };

    let result = cell_format.apply_with(&value, &FormatOptions { date_system });
    println!("{}", result.text);
    if verbose {
        match result.text_color {
            Some(color) => eprintln!("colour: {} ({})", color, color.to_hex()),
            None => eprintln!("colour: none"),
        }
        if !result.applies {
            eprintln!("no section's condition accepted the value");
        }
    }
    Ok(())
}

/// Interpret a command-line value for formatting
fn parse_format_value(value: &str) -> FormatValue {
    if let Ok(n) = value.trim().parse::<f64>() {
        return FormatValue::Number(n);
    }
    if value.eq_ignore_ascii_case("true") || value.eq_ignore_ascii_case("false") {
        return FormatValue::Bool(value.eq_ignore_ascii_case("true"));
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S") {
        return FormatValue::Date(dt);
    }
    if let Some(dt) = NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
    {
        return FormatValue::Date(dt);
    }
    FormatValue::Text(value.to_string())
}

fn eval_command(
    formula: &str,
    cells: &[String],
    at: &str,
    format: Option<&str>,
    show_tokens: bool,
    options: EvaluatorOptions,
) -> Result<()> {
    let mut workbook = InMemoryWorkbook::with_default_sheet();
    for assignment in cells {
        let (sheet, a1, value) = parse_assignment(assignment)?;
        let sheet_index = match sheet {
            Some(name) => workbook
                .add_sheet(name)
                .with_context(|| format!("Bad sheet name in '{}'", assignment))?,
            None => 0,
        };
        workbook
            .set_cell(sheet_index, a1, value)
            .with_context(|| format!("Bad cell in '{}'", assignment))?;
    }

    let ptgs = FormulaParser::new(formula)
        .with_workbook(&mut workbook)
        .with_version(options.version)
        .parse()
        .with_context(|| format!("Failed to parse '{}'", formula))?;
    if show_tokens {
        let listing: Vec<String> = ptgs.iter().map(|p| p.to_string()).collect();
        println!("{}", listing.join(" "));
    }

    let cell = EvaluationCell::at(0, at).with_context(|| format!("Bad cell '{}'", at))?;
    let evaluator = FormulaEvaluator::new(workbook.into_shared()).with_options(options);

    match format {
        Some(format) => {
            let renderer = CellRenderer::new(evaluator);
            let shown = renderer
                .render_tokens(&ptgs, format, cell)
                .context("Failed to evaluate")?;
            println!("{}", shown.text);
        }
        None => {
            let value = evaluator
                .evaluate(&ptgs, cell)
                .context("Failed to evaluate")?;
            println!("{}", value);
        }
    }
    Ok(())
}

/// Split `[Sheet!]A1=value` into its parts
fn parse_assignment(assignment: &str) -> Result<(Option<&str>, &str, ValueEval)> {
    let (target, raw) = assignment
        .split_once('=')
        .ok_or_else(|| anyhow!("expected REF=VALUE, got '{}'", assignment))?;
    let (sheet, a1) = match target.rsplit_once('!') {
        Some((sheet, a1)) => (Some(sheet.trim_matches('\'')), a1),
        None => (None, target),
    };
    if a1.is_empty() {
        bail!("missing cell reference in '{}'", assignment);
    }
    Ok((sheet, a1.trim(), parse_cell_value(raw)))
}

/// Interpret a command-line cell value
fn parse_cell_value(raw: &str) -> ValueEval {
    if let Some(quoted) = raw.strip_prefix('"').and_then(|s| s.strip_suffix('"')) {
        return ValueEval::Text(quoted.to_string());
    }
    if raw.is_empty() {
        return ValueEval::Blank;
    }
    if let Ok(n) = raw.trim().parse::<f64>() {
        return ValueEval::Number(n);
    }
    if raw.eq_ignore_ascii_case("true") || raw.eq_ignore_ascii_case("false") {
        return ValueEval::Bool(raw.eq_ignore_ascii_case("true"));
    }
    if let Some(code) = ErrorCode::from_text(raw) {
        return ValueEval::Error(*ErrorEval::of(code));
    }
    ValueEval::Text(raw.to_string())
}

fn list_functions(implemented_only: bool) -> Result<()> {
    let registry = FunctionRegistry::shared();
    let implemented: Vec<u16> = registry.implemented().map(|m| m.index).collect();

    for meta in sheetcalc::sheetcalc_formula::functions::metadata::all() {
        let available = implemented.contains(&meta.index);
        if implemented_only && !available {
            continue;
        }
        println!(
            "{:>3}\t{}\t{}\t{}",
            meta.index,
            meta.name,
            meta.arity_text(),
            if available { "yes" } else { "no" }
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_assignment() {
        let (sheet, a1, value) = parse_assignment("A1=5").unwrap();
        assert_eq!((sheet, a1, value), (None, "A1", ValueEval::Number(5.0)));

        let (sheet, a1, value) = parse_assignment("'My Data'!C3=TRUE").unwrap();
        assert_eq!((sheet, a1, value), (Some("My Data"), "C3", ValueEval::Bool(true)));

        let (_, _, value) = parse_assignment("B2=a=b").unwrap();
        assert_eq!(value, ValueEval::Text("a=b".into()));

        assert!(parse_assignment("A1").is_err());
        assert!(parse_assignment("Data!=3").is_err());
    }

    #[test]
    fn test_parse_cell_value() {
        assert_eq!(parse_cell_value("\"42\""), ValueEval::Text("42".into()));
        assert_eq!(parse_cell_value("-1.5"), ValueEval::Number(-1.5));
        assert_eq!(parse_cell_value(""), ValueEval::Blank);
        assert_eq!(parse_cell_value("#DIV/0!"), ValueEval::Error(ErrorEval::DIV_ZERO));
        assert_eq!(parse_cell_value("hello"), ValueEval::Text("hello".into()));
    }

    #[test]
    fn test_parse_format_value() {
        assert_eq!(parse_format_value("12.5"), FormatValue::Number(12.5));
        assert_eq!(parse_format_value("FALSE"), FormatValue::Bool(false));
        let date = NaiveDate::from_ymd_opt(2024, 1, 31)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert_eq!(parse_format_value("2024-01-31"), FormatValue::Date(date));
        assert_eq!(parse_format_value("abc"), FormatValue::Text("abc".into()));
    }

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
