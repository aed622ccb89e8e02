//! Cleaner: applies a definition's cleaning steps to a dataset

use rustc_hash::FxHashSet;

use crate::definition::CleaningStep;
use crate::error::EtlError;
use crate::table::{Cell, TabularDataset};

/// Apply `steps` to `dataset`.
///
/// `blank-to-null` runs first when present, so later steps always see
/// normalized missing values; every other step runs in declared order on
/// the output of the previous one. Column references are checked before
/// anything is modified.
pub fn clean(
    mut dataset: TabularDataset,
    steps: &[CleaningStep],
) -> Result<TabularDataset, EtlError> {
    for step in steps {
        if let Some(column) = step.column() {
            if dataset.column(column).is_none() {
                return Err(EtlError::UnknownColumn {
                    column: column.to_string(),
                    step: step.kind(),
                });
            }
        }
    }

    let (blank, rest): (Vec<&CleaningStep>, Vec<&CleaningStep>) = steps
        .iter()
        .partition(|s| matches!(s, CleaningStep::BlankToNull));

    for step in blank.into_iter().take(1).chain(rest) {
        let before = dataset.num_rows();
        apply_step(&mut dataset, step)?;
        log::trace!("{step}: {} -> {} rows", before, dataset.num_rows());
    }
    Ok(dataset)
}

/// Apply one step in place.
pub fn apply_step(dataset: &mut TabularDataset, step: &CleaningStep) -> Result<(), EtlError> {
    match step {
        CleaningStep::BlankToNull => {
            for column in dataset.columns_mut() {
                for cell in &mut column.values {
                    if cell.as_str().is_some_and(|s| s.trim().is_empty()) {
                        *cell = Cell::Null;
                    }
                }
            }
            Ok(())
        }
        CleaningStep::DedupeRows => {
            let keep = first_occurrences(dataset);
            dataset.retain_rows(&keep);
            Ok(())
        }
        CleaningStep::TitleCase { column } => map_strings(dataset, step, column, title_case),
        CleaningStep::UpperCase { column } => {
            map_strings(dataset, step, column, |s| s.to_uppercase())
        }
        CleaningStep::LowerCase { column } => {
            map_strings(dataset, step, column, |s| s.to_lowercase())
        }
        CleaningStep::StripPunctuation { column } => map_strings(dataset, step, column, |s| {
            s.chars().filter(|c| !c.is_ascii_punctuation()).collect()
        }),
        CleaningStep::ValueRemap { column, from, to } => {
            let column = lookup(dataset, step, column)?;
            for cell in &mut column.values {
                if cell.as_str() == Some(from.as_str()) {
                    *cell = Cell::Str(to.clone());
                }
            }
            Ok(())
        }
        CleaningStep::ReplaceLiteral { column, from, to } => {
            if from.is_empty() {
                return Ok(());
            }
            map_strings(dataset, step, column, |s| s.replace(from.as_str(), to))
        }
    }
}

fn lookup<'a>(
    dataset: &'a mut TabularDataset,
    step: &CleaningStep,
    column: &str,
) -> Result<&'a mut crate::table::Column, EtlError> {
    dataset
        .column_mut(column)
        .ok_or_else(|| EtlError::UnknownColumn {
            column: column.to_string(),
            step: step.kind(),
        })
}

/// Rewrite every string cell of one column; nulls and non-strings pass through.
fn map_strings(
    dataset: &mut TabularDataset,
    step: &CleaningStep,
    column: &str,
    f: impl Fn(&str) -> String,
) -> Result<(), EtlError> {
    let column = lookup(dataset, step, column)?;
    for cell in &mut column.values {
        if let Cell::Str(s) = cell {
            *s = f(s);
        }
    }
    Ok(())
}

/// Mask marking the first occurrence of each distinct row.
fn first_occurrences(dataset: &TabularDataset) -> Vec<bool> {
    let mut seen: FxHashSet<Vec<&Cell>> = FxHashSet::default();
    seen.reserve(dataset.num_rows());
    dataset.rows().map(|row| seen.insert(row)).collect()
}

/// Uppercase the first letter of every word, lowercase the rest.
///
/// A word starts after any non-alphabetic character, so `"beleza_saude"`
/// becomes `"Beleza_Saude"` and `"d'oeste"` becomes `"D'Oeste"`. Applying it
/// twice gives the same result as once.
pub fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_word = false;
    for ch in s.chars() {
        if in_word {
            out.extend(ch.to_lowercase());
        } else {
            // Multi-char uppercase forms (e.g. 'ß' -> "SS") keep only the
            // leading capital, like a titlecase mapping
            let mut upper = ch.to_uppercase();
            if let Some(first) = upper.next() {
                out.push(first);
                out.extend(upper.flat_map(char::to_lowercase));
            }
        }
        in_word = ch.is_alphabetic();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{Column, ColumnType};

    fn strings(name: &str, values: &[Option<&str>]) -> Column {
        Column::new(
            name,
            ColumnType::String,
            values
                .iter()
                .map(|v| v.map_or(Cell::Null, Cell::from))
                .collect(),
        )
    }

    fn values<'a>(ds: &'a TabularDataset, name: &str) -> Vec<Option<&'a str>> {
        ds.column(name)
            .unwrap()
            .values
            .iter()
            .map(|c| c.as_str())
            .collect()
    }

    #[test]
    fn title_case_words() {
        assert_eq!(title_case("sao paulo"), "Sao Paulo");
        assert_eq!(title_case("SAO PAULO"), "Sao Paulo");
        assert_eq!(title_case("beleza_saude"), "Beleza_Saude");
        assert_eq!(title_case("d'oeste"), "D'Oeste");
        assert_eq!(title_case("3a avenida"), "3A Avenida");
        assert_eq!(title_case(""), "");
    }

    #[test]
    fn title_case_is_idempotent() {
        for s in ["sao paulo", "credit card", "ßtraße", "mOgI dAs cRuZeS", "é_açaí-ok"] {
            let once = title_case(s);
            assert_eq!(title_case(&once), once, "input {s:?}");
        }
    }

    #[test]
    fn blank_to_null_everywhere() {
        let ds = TabularDataset::new(vec![
            strings("a", &[Some(""), Some("  "), Some("x"), None]),
            strings("b", &[Some("\t"), Some(" y "), Some("\u{a0}"), Some("z")]),
        ]);
        let ds = clean(ds, &[CleaningStep::BlankToNull]).unwrap();
        assert_eq!(values(&ds, "a"), vec![None, None, Some("x"), None]);
        assert_eq!(values(&ds, "b"), vec![None, Some(" y "), None, Some("z")]);
        assert!(ds.column("a").unwrap().values[0].is_null());
    }

    #[test]
    fn blank_to_null_runs_before_other_steps() {
        let ds = TabularDataset::new(vec![strings("a", &[Some("x"), Some(" "), Some("")])]);
        // Declared last, but duplicates of blank variants must collapse
        let ds = clean(ds, &[CleaningStep::DedupeRows, CleaningStep::BlankToNull]).unwrap();
        assert_eq!(values(&ds, "a"), vec![Some("x"), None]);
        assert_eq!(ds.row_ids(), &[0, 1]);
    }

    #[test]
    fn dedupe_keeps_first_occurrence_in_order() {
        let ds = TabularDataset::new(vec![
            strings("a", &[Some("1"), Some("2"), Some("1"), Some("3"), Some("2")]),
            strings("b", &[Some("x"), Some("y"), Some("x"), Some("z"), Some("q")]),
        ]);
        let ds = clean(ds, &[CleaningStep::DedupeRows]).unwrap();
        assert_eq!(values(&ds, "a"), vec![Some("1"), Some("2"), Some("3"), Some("2")]);
        assert_eq!(values(&ds, "b"), vec![Some("x"), Some("y"), Some("z"), Some("q")]);
        assert_eq!(ds.row_ids(), &[0, 1, 3, 4]);
    }

    #[test]
    fn dedupe_leaves_no_equal_rows() {
        let ds = TabularDataset::new(vec![
            strings("a", &[None, None, Some("k"), None, Some("k")]),
            Column::new(
                "n",
                ColumnType::Integer,
                vec![Cell::Int(1), Cell::Int(1), Cell::Int(1), Cell::Int(2), Cell::Int(1)],
            ),
        ]);
        let ds = clean(ds, &[CleaningStep::DedupeRows]).unwrap();
        let rows: Vec<_> = ds.rows().collect();
        for (i, a) in rows.iter().enumerate() {
            for b in &rows[i + 1..] {
                assert_ne!(a, b);
            }
        }
        assert_eq!(ds.row_ids(), &[0, 2, 3]);
    }

    #[test]
    fn case_steps_skip_nulls() {
        let ds = TabularDataset::new(vec![
            strings("city", &[Some("rio de janeiro"), None]),
            strings("state", &[Some("rj"), None]),
            strings("msg", &[Some("ÓTIMO Produto"), None]),
        ]);
        let ds = clean(
            ds,
            &[
                CleaningStep::title_case("city"),
                CleaningStep::upper_case("state"),
                CleaningStep::lower_case("msg"),
            ],
        )
        .unwrap();
        assert_eq!(values(&ds, "city"), vec![Some("Rio De Janeiro"), None]);
        assert_eq!(values(&ds, "state"), vec![Some("RJ"), None]);
        assert_eq!(values(&ds, "msg"), vec![Some("ótimo produto"), None]);
    }

    #[test]
    fn case_steps_ignore_non_string_cells() {
        let ds = TabularDataset::new(vec![Column::new(
            "n",
            ColumnType::Integer,
            vec![Cell::Int(5)],
        )]);
        let ds = clean(ds, &[CleaningStep::upper_case("n")]).unwrap();
        assert_eq!(ds.column("n").unwrap().values[0], Cell::Int(5));
    }

    #[test]
    fn strip_punctuation_keeps_case_and_spaces() {
        let ds = TabularDataset::new(vec![strings(
            "msg",
            &[Some("Muito bom!!! Recomendo, (nota 10)."), Some("não_chegou ainda?")],
        )]);
        let ds = clean(ds, &[CleaningStep::strip_punctuation("msg")]).unwrap();
        assert_eq!(
            values(&ds, "msg"),
            vec![Some("Muito bom Recomendo nota 10"), Some("nãochegou ainda")]
        );
    }

    #[test]
    fn value_remap_is_exact_match() {
        let ds = TabularDataset::new(vec![strings(
            "payment_type",
            &[Some("credit_card"), Some("credit_card_x"), Some("boleto")],
        )]);
        let ds = clean(
            ds,
            &[CleaningStep::value_remap("payment_type", "credit_card", "credit card")],
        )
        .unwrap();
        assert_eq!(
            values(&ds, "payment_type"),
            vec![Some("credit card"), Some("credit_card_x"), Some("boleto")]
        );
    }

    #[test]
    fn replace_literal_is_substring() {
        let ds = TabularDataset::new(vec![strings(
            "cat",
            &[Some("Beleza_Saude"), Some("cama_mesa_banho"), None],
        )]);
        let ds = clean(ds, &[CleaningStep::replace_literal("cat", "_", " ")]).unwrap();
        assert_eq!(
            values(&ds, "cat"),
            vec![Some("Beleza Saude"), Some("cama mesa banho"), None]
        );
    }

    #[test]
    fn remap_then_title_reaches_spaced_form() {
        let ds = TabularDataset::new(vec![strings("payment_type", &[Some("credit_card")])]);
        let ds = clean(
            ds,
            &[
                CleaningStep::value_remap("payment_type", "credit_card", "credit card"),
                CleaningStep::title_case("payment_type"),
            ],
        )
        .unwrap();
        assert_eq!(values(&ds, "payment_type"), vec![Some("Credit Card")]);
    }

    #[test]
    fn title_before_remap_misses_lowercase_literal() {
        let ds = TabularDataset::new(vec![strings("payment_type", &[Some("credit_card")])]);
        let ds = clean(
            ds,
            &[
                CleaningStep::title_case("payment_type"),
                CleaningStep::value_remap("payment_type", "credit_card", "credit card"),
            ],
        )
        .unwrap();
        assert_eq!(values(&ds, "payment_type"), vec![Some("Credit_Card")]);
    }

    #[test]
    fn unknown_column_fails_before_any_change() {
        let ds = TabularDataset::new(vec![strings("a", &[Some(" ")])]);
        let err = clean(
            ds,
            &[CleaningStep::BlankToNull, CleaningStep::title_case("missing")],
        )
        .unwrap_err();
        match err {
            EtlError::UnknownColumn { column, step } => {
                assert_eq!(column, "missing");
                assert_eq!(step, "title-case");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn columns_and_types_are_stable() {
        let ds = TabularDataset::new(vec![
            strings("a", &[Some(" "), Some("b")]),
            Column::new("n", ColumnType::Float, vec![Cell::Float(1.5), Cell::Float(1.5)]),
        ]);
        let ds = clean(
            ds,
            &[
                CleaningStep::BlankToNull,
                CleaningStep::DedupeRows,
                CleaningStep::title_case("a"),
            ],
        )
        .unwrap();
        let shape: Vec<_> = ds.columns().iter().map(|c| (c.name.as_str(), c.ty)).collect();
        assert_eq!(shape, vec![("a", ColumnType::String), ("n", ColumnType::Float)]);
    }
}
