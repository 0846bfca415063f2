//! Data toolkit exposed to generated scripts.
//!
//! Rhai ships without file access or statistics, so the executor registers
//! these host functions. File access is read-only. Failures surface as
//! script runtime errors.

use rhai::{Array, Dynamic, Engine, EvalAltResult, Map, FLOAT, INT};
use std::fs::File;
use std::io::{BufRead, BufReader};
use walkdir::WalkDir;

type FnResult<T> = Result<T, Box<EvalAltResult>>;

/// Function reference included in the code-generation contract.
pub const TOOLKIT_REFERENCE: &str = r#"Available host functions (Rhai has no other file or math library):
- read_head(path, n) -> array of the first n lines (does not load the whole file)
- read_text(path) -> whole file as a string
- file_size(path) -> size in bytes
- list_dir(path) -> array of entry names
- read_csv(path) / read_csv(path, limit) -> #{ columns: [..], rows: [[..], ..] } (all cells are strings)
- column(table, name) -> array of cells for one column
- mean(arr), median(arr), std_dev(arr), min_of(arr), max_of(arr) -> float, or () when no numeric values
- count_missing(arr) -> number of blank / NA / null cells
- describe(table) -> text summary per column (count, missing, numeric stats or distinct values)
- histogram(arr, bins) -> text bar chart of the numeric values (at most 100 bins)
Use print(...) for all output."#;

/// Register every toolkit function on `engine`.
pub fn register(engine: &mut Engine) {
    engine
        .register_fn("read_head", |path: &str, lines: INT| read_head(path, lines))
        .register_fn("read_text", |path: &str| read_text(path))
        .register_fn("file_size", |path: &str| file_size(path))
        .register_fn("list_dir", |path: &str| list_dir(path))
        .register_fn("read_csv", |path: &str| read_csv(path, None))
        .register_fn("read_csv", |path: &str, limit: INT| read_csv(path, Some(limit)))
        .register_fn("column", |table: Map, name: &str| column(&table, name))
        .register_fn("mean", |values: Array| to_dynamic(mean(&numbers(&values))))
        .register_fn("median", |values: Array| to_dynamic(median(&numbers(&values))))
        .register_fn("std_dev", |values: Array| to_dynamic(std_dev(&numbers(&values))))
        .register_fn("min_of", |values: Array| to_dynamic(min_of(&numbers(&values))))
        .register_fn("max_of", |values: Array| to_dynamic(max_of(&numbers(&values))))
        .register_fn("count_missing", |values: Array| {
            values.iter().filter(|v| is_missing(v)).count() as INT
        })
        .register_fn("describe", |table: Map| describe(&table))
        .register_fn("histogram", |values: Array, bins: INT| {
            histogram(&numbers(&values), bins.max(1) as usize)
        });
}

fn io_error(path: &str, err: std::io::Error) -> Box<EvalAltResult> {
    format!("{}: {}", path, err).into()
}

fn read_head(path: &str, lines: INT) -> FnResult<Array> {
    let file = File::open(path).map_err(|e| io_error(path, e))?;
    BufReader::new(file)
        .lines()
        .take(lines.max(0) as usize)
        .map(|line| line.map(Dynamic::from).map_err(|e| io_error(path, e)))
        .collect()
}

fn read_text(path: &str) -> FnResult<String> {
    std::fs::read_to_string(path).map_err(|e| io_error(path, e))
}

fn file_size(path: &str) -> FnResult<INT> {
    let metadata = std::fs::metadata(path).map_err(|e| io_error(path, e))?;
    Ok(metadata.len() as INT)
}

fn list_dir(path: &str) -> FnResult<Array> {
    let mut names = Array::new();
    for entry in WalkDir::new(path)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| -> Box<EvalAltResult> { format!("{}: {}", path, e).into() })?;
        names.push(Dynamic::from(entry.file_name().to_string_lossy().into_owned()));
    }
    Ok(names)
}

/// Split one CSV record, honouring double quotes and `""` escapes.
///
/// Quoted fields spanning several lines are not supported.
pub fn split_csv_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => fields.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    fields.push(current);
    fields
}

fn read_csv(path: &str, limit: Option<INT>) -> FnResult<Map> {
    let file = File::open(path).map_err(|e| io_error(path, e))?;
    let limit = limit.map(|l| l.max(0) as usize).unwrap_or(usize::MAX);

    let mut lines = BufReader::new(file)
        .lines()
        .map(|line| line.map(|l| l.trim_end_matches('\r').to_string()));

    let mut header = Vec::new();
    for line in lines.by_ref() {
        let line = line.map_err(|e| io_error(path, e))?;
        if !line.trim().is_empty() {
            header = split_csv_line(&line);
            break;
        }
    }

    let mut rows = Array::new();
    for line in lines {
        if rows.len() >= limit {
            break;
        }
        let line = line.map_err(|e| io_error(path, e))?;
        if line.trim().is_empty() {
            continue;
        }
        let mut fields = split_csv_line(&line);
        fields.resize(header.len().max(fields.len()), String::new());
        rows.push(Dynamic::from_array(
            fields.into_iter().map(Dynamic::from).collect(),
        ));
    }

    let mut table = Map::new();
    table.insert(
        "columns".into(),
        Dynamic::from_array(header.into_iter().map(Dynamic::from).collect()),
    );
    table.insert("rows".into(), Dynamic::from_array(rows));
    Ok(table)
}

fn table_parts(table: &Map) -> FnResult<(Vec<String>, Vec<Array>)> {
    let columns = table
        .get("columns")
        .and_then(|c| c.clone().try_cast::<Array>())
        .ok_or_else(|| -> Box<EvalAltResult> { "table has no 'columns' array".into() })?
        .into_iter()
        .map(|c| c.to_string())
        .collect();

    let rows = table
        .get("rows")
        .and_then(|r| r.clone().try_cast::<Array>())
        .ok_or_else(|| -> Box<EvalAltResult> { "table has no 'rows' array".into() })?
        .into_iter()
        .filter_map(|row| row.try_cast::<Array>())
        .collect();

    Ok((columns, rows))
}

fn column(table: &Map, name: &str) -> FnResult<Array> {
    let (columns, rows) = table_parts(table)?;
    let index = columns
        .iter()
        .position(|c| c == name)
        .ok_or_else(|| -> Box<EvalAltResult> { format!("unknown column '{}'", name).into() })?;

    Ok(rows
        .iter()
        .map(|row| row.get(index).cloned().unwrap_or(Dynamic::UNIT))
        .collect())
}

/// Blank strings, common NA spellings and `()` count as missing.
pub fn is_missing(value: &Dynamic) -> bool {
    if value.is_unit() {
        return true;
    }
    if value.is_string() {
        let text = value.to_string();
        let text = text.trim();
        return text.is_empty()
            || ["na", "n/a", "nan", "null", "none"].contains(&text.to_lowercase().as_str());
    }
    false
}

fn as_number(value: &Dynamic) -> Option<FLOAT> {
    if let Ok(v) = value.as_float() {
        return Some(v);
    }
    if let Ok(v) = value.as_int() {
        return Some(v as FLOAT);
    }
    if value.is_string() {
        return value.to_string().trim().parse::<FLOAT>().ok();
    }
    None
}

/// Finite numeric values of `values`; everything else is skipped.
pub fn numbers(values: &[Dynamic]) -> Vec<FLOAT> {
    values
        .iter()
        .filter_map(as_number)
        .filter(|v| v.is_finite())
        .collect()
}

fn to_dynamic(value: Option<FLOAT>) -> Dynamic {
    value.map_or(Dynamic::UNIT, Dynamic::from_float)
}

pub fn mean(values: &[FLOAT]) -> Option<FLOAT> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<FLOAT>() / values.len() as FLOAT)
}

pub fn median(values: &[FLOAT]) -> Option<FLOAT> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// Sample standard deviation (n - 1 denominator).
pub fn std_dev(values: &[FLOAT]) -> Option<FLOAT> {
    if values.len() < 2 {
        return None;
    }
    let avg = mean(values)?;
    let variance =
        values.iter().map(|v| (v - avg).powi(2)).sum::<FLOAT>() / (values.len() - 1) as FLOAT;
    Some(variance.sqrt())
}

pub fn min_of(values: &[FLOAT]) -> Option<FLOAT> {
    values.iter().copied().reduce(FLOAT::min)
}

pub fn max_of(values: &[FLOAT]) -> Option<FLOAT> {
    values.iter().copied().reduce(FLOAT::max)
}

fn describe(table: &Map) -> FnResult<String> {
    let (columns, rows) = table_parts(table)?;
    let mut out = format!("rows: {}, columns: {}\n", rows.len(), columns.len());

    for (index, name) in columns.iter().enumerate() {
        let cells: Vec<Dynamic> = rows
            .iter()
            .map(|row| row.get(index).cloned().unwrap_or(Dynamic::UNIT))
            .collect();
        let present: Vec<Dynamic> = cells.iter().filter(|c| !is_missing(c)).cloned().collect();
        let missing = cells.len() - present.len();
        let values = numbers(&present);

        out.push_str(&format!("{}: count={} missing={}", name, present.len(), missing));

        if !values.is_empty() && values.len() == present.len() {
            let fmt = |v: Option<FLOAT>| v.map_or("-".to_string(), |v| format!("{:.4}", v));
            out.push_str(&format!(
                " mean={} std={} min={} max={}",
                fmt(mean(&values)),
                fmt(std_dev(&values)),
                fmt(min_of(&values)),
                fmt(max_of(&values))
            ));
        } else {
            let mut distinct: Vec<String> = present.iter().map(|c| c.to_string()).collect();
            distinct.sort();
            distinct.dedup();
            out.push_str(&format!(" distinct={}", distinct.len()));
        }
        out.push('\n');
    }

    Ok(out)
}

const HISTOGRAM_WIDTH: usize = 40;
const MAX_HISTOGRAM_BINS: usize = 100;

/// Text histogram with `bins` equal-width buckets, at most
/// `MAX_HISTOGRAM_BINS` of them.
pub fn histogram(values: &[FLOAT], bins: usize) -> String {
    let (Some(lo), Some(hi)) = (min_of(values), max_of(values)) else {
        return "(no numeric values)".to_string();
    };

    let bins = if hi > lo {
        bins.clamp(1, MAX_HISTOGRAM_BINS)
    } else {
        1
    };
    let width = if hi > lo { (hi - lo) / bins as FLOAT } else { 1.0 };

    let mut counts = vec![0usize; bins];
    for v in values {
        let bucket = (((v - lo) / width) as usize).min(bins - 1);
        counts[bucket] += 1;
    }

    let peak = counts.iter().copied().max().unwrap_or(0).max(1);
    counts
        .iter()
        .enumerate()
        .map(|(i, count)| {
            let start = lo + width * i as FLOAT;
            let bar = "#".repeat(count * HISTOGRAM_WIDTH / peak);
            format!("[{:>10.3}, {:>10.3}) | {} {}", start, start + width, bar, count)
        })
        .collect::<Vec<_>>()
        .join("\n")
}
