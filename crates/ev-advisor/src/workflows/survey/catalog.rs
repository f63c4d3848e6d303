use std::collections::HashSet;
use std::sync::{Arc, OnceLock};

use serde::{Deserialize, Serialize};

/// Weighting factors scored by the survey. The serialized form is the wire name the ranking
/// service reads from `summedWeight`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FactorKey {
    #[serde(rename = "battery")]
    Battery,
    #[serde(rename = "range")]
    Range,
    #[serde(rename = "accelarate")]
    Acceleration,
    #[serde(rename = "top_speed")]
    TopSpeed,
    #[serde(rename = "efficiency")]
    Efficiency,
    #[serde(rename = "estimated_thb_value")]
    Price,
    #[serde(rename = "fastcharge")]
    FastCharge,
}

impl FactorKey {
    pub const fn ordered() -> [Self; 7] {
        [
            Self::Battery,
            Self::Range,
            Self::Acceleration,
            Self::TopSpeed,
            Self::Efficiency,
            Self::Price,
            Self::FastCharge,
        ]
    }

    pub const fn wire_name(self) -> &'static str {
        match self {
            Self::Battery => "battery",
            Self::Range => "range",
            Self::Acceleration => "accelarate",
            Self::TopSpeed => "top_speed",
            Self::Efficiency => "efficiency",
            Self::Price => "estimated_thb_value",
            Self::FastCharge => "fastcharge",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Battery => "Battery",
            Self::Range => "Range",
            Self::Acceleration => "Acceleration",
            Self::TopSpeed => "Top speed",
            Self::Efficiency => "Efficiency",
            Self::Price => "Price",
            Self::FastCharge => "Fast charging",
        }
    }

    pub fn from_wire_name(value: &str) -> Option<Self> {
        Self::ordered()
            .into_iter()
            .find(|key| key.wire_name() == value.trim())
    }
}

/// One answer choice with the score it contributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LikertOption {
    pub label: &'static str,
    pub score: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LikertQuestion {
    pub label: &'static str,
    pub options: Vec<LikertOption>,
}

impl LikertQuestion {
    pub fn option(&self, index: usize) -> Option<&LikertOption> {
        self.options.get(index)
    }

    pub fn accepts_score(&self, score: u8) -> bool {
        self.options.iter().any(|option| option.score == score)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SurveyFactor {
    pub key: FactorKey,
    pub title: &'static str,
    pub description: &'static str,
    pub questions: Vec<LikertQuestion>,
}

/// Coordinate of a single question inside the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QuestionCursor {
    pub factor: usize,
    pub question: usize,
}

impl QuestionCursor {
    pub const fn first() -> Self {
        Self {
            factor: 0,
            question: 0,
        }
    }
}

pub const OPTIONS_PER_QUESTION: usize = 7;
pub const MIN_OPTION_SCORE: u8 = 1;
pub const MAX_OPTION_SCORE: u8 = 9;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CatalogError {
    #[error("catalog must declare at least one factor")]
    Empty,
    #[error("factor '{0}' is declared more than once")]
    DuplicateFactor(&'static str),
    #[error("factor '{0}' has no questions")]
    NoQuestions(&'static str),
    #[error("question {question} of factor '{factor}' has {found} options, expected 7")]
    OptionCount {
        factor: &'static str,
        question: usize,
        found: usize,
    },
    #[error("question {question} of factor '{factor}' has out-of-range score {score}")]
    ScoreOutOfRange {
        factor: &'static str,
        question: usize,
        score: u8,
    },
}

/// Ordered, validated set of factors presented by the survey.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SurveyCatalog {
    factors: Vec<SurveyFactor>,
}

impl SurveyCatalog {
    pub fn new(factors: Vec<SurveyFactor>) -> Result<Self, CatalogError> {
        if factors.is_empty() {
            return Err(CatalogError::Empty);
        }

        let mut seen = HashSet::new();
        for factor in &factors {
            let name = factor.key.wire_name();
            if !seen.insert(factor.key) {
                return Err(CatalogError::DuplicateFactor(name));
            }
            if factor.questions.is_empty() {
                return Err(CatalogError::NoQuestions(name));
            }
            for (index, question) in factor.questions.iter().enumerate() {
                if question.options.len() != OPTIONS_PER_QUESTION {
                    return Err(CatalogError::OptionCount {
                        factor: name,
                        question: index,
                        found: question.options.len(),
                    });
                }
                if let Some(option) = question
                    .options
                    .iter()
                    .find(|option| !(MIN_OPTION_SCORE..=MAX_OPTION_SCORE).contains(&option.score))
                {
                    return Err(CatalogError::ScoreOutOfRange {
                        factor: name,
                        question: index,
                        score: option.score,
                    });
                }
            }
        }

        Ok(Self { factors })
    }

    /// The seven-factor Thai survey served to respondents.
    pub fn standard() -> Self {
        Self {
            factors: standard_factors(),
        }
    }

    /// Process-wide handle to [`SurveyCatalog::standard`].
    pub fn shared_standard() -> Arc<Self> {
        static STANDARD: OnceLock<Arc<SurveyCatalog>> = OnceLock::new();
        STANDARD
            .get_or_init(|| Arc::new(SurveyCatalog::standard()))
            .clone()
    }

    pub fn factors(&self) -> &[SurveyFactor] {
        &self.factors
    }

    pub fn factor(&self, key: FactorKey) -> Option<&SurveyFactor> {
        self.factors.iter().find(|factor| factor.key == key)
    }

    pub fn keys(&self) -> Vec<FactorKey> {
        self.factors.iter().map(|factor| factor.key).collect()
    }

    pub fn question(&self, cursor: QuestionCursor) -> Option<&LikertQuestion> {
        self.factors
            .get(cursor.factor)
            .and_then(|factor| factor.questions.get(cursor.question))
    }

    pub fn total_questions(&self) -> usize {
        self.factors
            .iter()
            .map(|factor| factor.questions.len())
            .sum()
    }

    /// Zero-based position of `cursor` when all questions are laid out in order.
    pub fn flat_index(&self, cursor: QuestionCursor) -> Option<usize> {
        let factor = self.factors.get(cursor.factor)?;
        if cursor.question >= factor.questions.len() {
            return None;
        }
        let preceding: usize = self.factors[..cursor.factor]
            .iter()
            .map(|factor| factor.questions.len())
            .sum();
        Some(preceding + cursor.question)
    }

    pub fn next_cursor(&self, cursor: QuestionCursor) -> Option<QuestionCursor> {
        let factor = self.factors.get(cursor.factor)?;
        if cursor.question + 1 < factor.questions.len() {
            return Some(QuestionCursor {
                factor: cursor.factor,
                question: cursor.question + 1,
            });
        }
        if cursor.factor + 1 < self.factors.len() {
            return Some(QuestionCursor {
                factor: cursor.factor + 1,
                question: 0,
            });
        }
        None
    }

    pub fn previous_cursor(&self, cursor: QuestionCursor) -> Option<QuestionCursor> {
        if cursor.question > 0 {
            return Some(QuestionCursor {
                factor: cursor.factor,
                question: cursor.question - 1,
            });
        }
        if cursor.factor == 0 {
            return None;
        }
        let factor = cursor.factor - 1;
        let questions = self.factors.get(factor)?.questions.len();
        Some(QuestionCursor {
            factor,
            question: questions.saturating_sub(1),
        })
    }

    pub fn last_cursor(&self) -> QuestionCursor {
        let factor = self.factors.len().saturating_sub(1);
        let question = self
            .factors
            .get(factor)
            .map(|factor| factor.questions.len().saturating_sub(1))
            .unwrap_or(0);
        QuestionCursor { factor, question }
    }
}

const AGREEMENT_LABELS: [&str; OPTIONS_PER_QUESTION] = [
    "เห็นด้วยอย่างยิ่ง",
    "เห็นด้วย",
    "ค่อนข้างเห็นด้วย",
    "เฉยๆ",
    "ค่อนข้างไม่เห็นด้วย",
    "ไม่เห็นด้วย",
    "ไม่เห็นด้วยอย่างยิ่ง",
];

fn question(label: &'static str, scores: [u8; OPTIONS_PER_QUESTION]) -> LikertQuestion {
    LikertQuestion {
        label,
        options: AGREEMENT_LABELS
            .into_iter()
            .zip(scores)
            .map(|(label, score)| LikertOption { label, score })
            .collect(),
    }
}

// Negatively phrased statements carry the reversed table; scores are stored per option.
fn standard_factors() -> Vec<SurveyFactor> {
    vec![
        SurveyFactor {
            key: FactorKey::Battery,
            title: "แบตเตอรี่",
            description: "ความจุและเทคโนโลยีของแบตเตอรี่มีผลต่อระยะทางและอายุการใช้งาน",
            questions: vec![
                question(
                    "คุณมักจะให้ความสำคัญกับเทคโนโลยีของแบตเตอรี่รถยนต์ไฟฟ้า",
                    [9, 8, 7, 5, 3, 2, 1],
                ),
                question(
                    "รถยนต์ไฟฟ้าที่ดีควรมีแบตเตอรี่ที่จุได้เยอะ",
                    [9, 8, 7, 5, 3, 2, 1],
                ),
            ],
        },
        SurveyFactor {
            key: FactorKey::Range,
            title: "ระยะทาง",
            description: "ระยะทางที่สามารถขับได้ต่อการชาร์จหนึ่งครั้ง",
            questions: vec![
                question(
                    "คุณชอบรถที่สามารถเดินทางได้ไกลในหนึ่งการชาร์จ",
                    [9, 8, 7, 5, 3, 2, 1],
                ),
                question("คุณมักจะเดินทางไกลอยู่บ่อยครั้ง", [9, 8, 7, 5, 3, 2, 1]),
            ],
        },
        SurveyFactor {
            key: FactorKey::Acceleration,
            title: "อัตราเร่ง",
            description: "ความเร็วในการเร่งจาก 0-100 กม./ชม.",
            questions: vec![
                question(
                    "คุณมักจะแซงรถยนต์คันข้างหน้าเมื่อมีโอกาส",
                    [9, 8, 7, 5, 3, 2, 1],
                ),
                question(
                    "การขับรถที่ดีคือการขับอย่างใจเย็นและระมัดระวัง",
                    [1, 2, 3, 5, 7, 8, 9],
                ),
            ],
        },
        SurveyFactor {
            key: FactorKey::TopSpeed,
            title: "ความเร็วสูงสุด",
            description: "ความเร็วสูงสุดที่รถสามารถทำได้",
            questions: vec![
                question("คุณเป็นคนรีบร้อนในการขับขี่", [9, 8, 7, 5, 3, 2, 1]),
                question(
                    "ความเร็วไม่ใช่คำตอบสำหรับการขับขี่ที่ปลอดภัย",
                    [1, 2, 3, 5, 7, 8, 9],
                ),
            ],
        },
        SurveyFactor {
            key: FactorKey::Efficiency,
            title: "ประสิทธิภาพ",
            description: "ประสิทธิภาพในการใช้พลังงานไฟฟ้า",
            questions: vec![
                question(
                    "รถยนต์ไฟฟ้าที่ดีควรเป็นรถที่ประหยัดพลังงาน",
                    [9, 8, 7, 5, 3, 2, 1],
                ),
                question(
                    "คุณจะซื้อรถยนต์ไฟฟ้าเพราะคิดว่ารถยนต์ไฟฟ้าจะประหยัดค่าใช้จ่ายได้ดีกว่ารถยนต์น้ำมัน",
                    [9, 8, 7, 5, 3, 2, 1],
                ),
            ],
        },
        SurveyFactor {
            key: FactorKey::Price,
            title: "ราคา",
            description: "งบประมาณและความคุ้มค่าในการลงทุน",
            questions: vec![
                question(
                    "คุณมักจะซื้อของโดยไม่คำนึงถึงราคา",
                    [1, 2, 3, 5, 7, 8, 9],
                ),
                question(
                    "คุณเป็นคนสบาย ๆ ใช้รถยี่ห้อไหนก็ได้ขอแค่ราคาถูกและจับต้องได้",
                    [9, 8, 7, 5, 3, 2, 1],
                ),
            ],
        },
        SurveyFactor {
            key: FactorKey::FastCharge,
            title: "ชาร์จเร็ว",
            description: "ความเร็วในการชาร์จแบตเตอรี่",
            questions: vec![
                question(
                    "คุณไม่ค่อยชอบการรอคอยสิ่งต่าง ๆ เป็นเวลานาน",
                    [9, 8, 7, 5, 3, 2, 1],
                ),
                question(
                    "ก่อนออกจากบ้านทุกครั้ง คุณมักจะเตรียมพร้อมเสมอ",
                    [1, 2, 3, 5, 7, 8, 9],
                ),
            ],
        },
    ]
}
