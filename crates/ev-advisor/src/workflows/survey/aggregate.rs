use super::domain::{AnswerMatrix, SummedWeights};

/// Sums the recorded scores of each factor. Unanswered slots contribute nothing, so partial
/// matrices still yield one entry per factor.
pub fn aggregate(matrix: &AnswerMatrix) -> SummedWeights {
    SummedWeights(
        matrix
            .iter()
            .map(|(key, answers)| {
                let total = answers.iter().flatten().map(|score| u32::from(*score)).sum();
                (key, total)
            })
            .collect(),
    )
}
