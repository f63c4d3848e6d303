use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::Serialize;

use super::aggregate::aggregate;
use super::catalog::{QuestionCursor, SurveyCatalog};
use super::domain::{AnswerMatrix, SummedWeights};

const RESPONDENT_COLUMN: &str = "respondent_id";

/// Weights computed for one row of a bulk answer sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnswerSheet {
    pub respondent_id: String,
    pub weights: SummedWeights,
    pub answered: usize,
    pub complete: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("failed to read answer sheet: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid answer sheet CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("answer sheet is missing the '{0}' column")]
    MissingColumn(String),
    #[error("row {row}: '{value}' in column '{column}' is not a score offered by that question")]
    InvalidScore {
        row: usize,
        column: String,
        value: String,
    },
}

/// Column header used for a question, e.g. `battery_1` for the first battery question.
pub fn column_name(catalog: &SurveyCatalog, cursor: QuestionCursor) -> Option<String> {
    let factor = catalog.factors().get(cursor.factor)?;
    factor.questions.get(cursor.question)?;
    Some(format!("{}_{}", factor.key.wire_name(), cursor.question + 1))
}

fn question_columns(catalog: &SurveyCatalog) -> Vec<(QuestionCursor, String)> {
    let mut columns = Vec::with_capacity(catalog.total_questions());
    let mut cursor = Some(QuestionCursor::first());
    while let Some(current) = cursor {
        if let Some(name) = column_name(catalog, current) {
            columns.push((current, name));
        }
        cursor = catalog.next_cursor(current);
    }
    columns
}

/// Scores every row of a CSV answer sheet. Empty cells are treated as unanswered.
pub fn read_answer_sheets<R: Read>(
    reader: R,
    catalog: &SurveyCatalog,
) -> Result<Vec<AnswerSheet>, ImportError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let headers = csv_reader.headers()?.clone();

    let position = |name: &str| headers.iter().position(|header| header == name);
    let respondent_index =
        position(RESPONDENT_COLUMN).ok_or_else(|| ImportError::MissingColumn(RESPONDENT_COLUMN.to_string()))?;

    let mut columns = Vec::new();
    for (cursor, name) in question_columns(catalog) {
        let index = position(&name).ok_or_else(|| ImportError::MissingColumn(name.clone()))?;
        columns.push((cursor, name, index));
    }

    let mut sheets = Vec::new();
    for (row_index, record) in csv_reader.records().enumerate() {
        let record = record?;
        let row = row_index + 1;
        let mut matrix = AnswerMatrix::for_catalog(catalog);

        for (cursor, name, index) in &columns {
            let raw = record.get(*index).unwrap_or("");
            if raw.is_empty() {
                continue;
            }
            let invalid = || ImportError::InvalidScore {
                row,
                column: name.clone(),
                value: raw.to_string(),
            };
            let score = raw.parse::<u8>().map_err(|_| invalid())?;
            matrix
                .record(catalog, *cursor, score)
                .map_err(|_| invalid())?;
        }

        sheets.push(AnswerSheet {
            respondent_id: record.get(respondent_index).unwrap_or("").to_string(),
            weights: aggregate(&matrix),
            answered: matrix.answered(),
            complete: matrix.is_complete(),
        });
    }

    Ok(sheets)
}

pub fn read_answer_sheets_from_path<P: AsRef<Path>>(
    path: P,
    catalog: &SurveyCatalog,
) -> Result<Vec<AnswerSheet>, ImportError> {
    let file = File::open(path)?;
    read_answer_sheets(file, catalog)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::survey::FactorKey;
    use std::io::Cursor;

    fn header(catalog: &SurveyCatalog) -> String {
        let mut columns = vec![RESPONDENT_COLUMN.to_string()];
        columns.extend(question_columns(catalog).into_iter().map(|(_, name)| name));
        columns.join(",")
    }

    #[test]
    fn scores_complete_and_partial_rows() {
        let catalog = SurveyCatalog::standard();
        let csv = format!(
            "{}\nr-1,9,9,8,8,7,1,5,5,9,9,1,9,8,2\nr-2,9,,,,,,,,,,,,,\n",
            header(&catalog)
        );

        let sheets = read_answer_sheets(Cursor::new(csv), &catalog).expect("sheet parses");
        assert_eq!(sheets.len(), 2);

        let first = &sheets[0];
        assert_eq!(first.respondent_id, "r-1");
        assert!(first.complete);
        assert_eq!(first.weights.get(FactorKey::Battery), 18);
        assert_eq!(first.weights.get(FactorKey::Acceleration), 8);
        assert_eq!(first.weights.get(FactorKey::FastCharge), 10);

        let second = &sheets[1];
        assert!(!second.complete);
        assert_eq!(second.answered, 1);
        assert_eq!(second.weights.keys(), catalog.keys());
    }

    #[test]
    fn rejects_scores_not_offered_by_the_question() {
        let catalog = SurveyCatalog::standard();
        let csv = format!("{}\nr-1,4,,,,,,,,,,,,,\n", header(&catalog));

        match read_answer_sheets(Cursor::new(csv), &catalog) {
            Err(ImportError::InvalidScore { row, column, value }) => {
                assert_eq!(row, 1);
                assert_eq!(column, "battery_1");
                assert_eq!(value, "4");
            }
            other => panic!("expected invalid score, got {other:?}"),
        }
    }

    #[test]
    fn requires_every_question_column() {
        let catalog = SurveyCatalog::standard();
        let csv = "respondent_id,battery_1\nr-1,9\n";
        assert!(matches!(
            read_answer_sheets(Cursor::new(csv), &catalog),
            Err(ImportError::MissingColumn(column)) if column == "battery_2"
        ));
    }
}
