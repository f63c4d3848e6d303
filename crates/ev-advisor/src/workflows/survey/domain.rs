use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::catalog::{FactorKey, QuestionCursor, SurveyCatalog};

/// Opaque respondent identifier forwarded to the ranking service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AgeRange {
    #[serde(rename = "18-24")]
    From18To24,
    #[serde(rename = "25-34")]
    From25To34,
    #[serde(rename = "35-44")]
    From35To44,
    #[serde(rename = "45-54")]
    From45To54,
    #[serde(rename = "55-64")]
    From55To64,
    #[serde(rename = "65+")]
    Over65,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Occupation {
    Student,
    Employed,
    SelfEmployed,
    Unemployed,
    Retired,
    Officer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaritalStatus {
    Single,
    Married,
    Divorced,
    Widowed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FamilyStatus {
    NoChildren,
    WithChildren,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncomeRange {
    Low,
    Medium,
    High,
    VeryHigh,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VehicleStatus {
    #[serde(rename = "have")]
    Have,
    #[serde(rename = "don't_have")]
    DoNotHave,
}

/// Profile fields the respondent must fill before the questions unlock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileField {
    Gender,
    AgeRange,
    Occupation,
    MaritalStatus,
    FamilyStatus,
    IncomeRange,
    VehicleStatus,
}

/// Partially filled profile owned by a running session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileDraft {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<Gender>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age_range: Option<AgeRange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub occupation: Option<Occupation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marital_status: Option<MaritalStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family_status: Option<FamilyStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub income_range: Option<IncomeRange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vehicle_status: Option<VehicleStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
}

impl ProfileDraft {
    /// Overlays every field set in `update`; unset fields keep their current value.
    pub fn merge(&mut self, update: ProfileDraft) {
        fn overlay<T>(slot: &mut Option<T>, value: Option<T>) {
            if value.is_some() {
                *slot = value;
            }
        }

        overlay(&mut self.gender, update.gender);
        overlay(&mut self.age_range, update.age_range);
        overlay(&mut self.occupation, update.occupation);
        overlay(&mut self.marital_status, update.marital_status);
        overlay(&mut self.family_status, update.family_status);
        overlay(&mut self.income_range, update.income_range);
        overlay(&mut self.vehicle_status, update.vehicle_status);
        overlay(&mut self.user_id, update.user_id);
    }

    pub fn missing_fields(&self) -> Vec<ProfileField> {
        let mut missing = Vec::new();
        if self.gender.is_none() {
            missing.push(ProfileField::Gender);
        }
        if self.age_range.is_none() {
            missing.push(ProfileField::AgeRange);
        }
        if self.occupation.is_none() {
            missing.push(ProfileField::Occupation);
        }
        if self.marital_status.is_none() {
            missing.push(ProfileField::MaritalStatus);
        }
        if self.family_status.is_none() {
            missing.push(ProfileField::FamilyStatus);
        }
        if self.income_range.is_none() {
            missing.push(ProfileField::IncomeRange);
        }
        if self.vehicle_status.is_none() {
            missing.push(ProfileField::VehicleStatus);
        }
        missing
    }

    pub fn is_complete(&self) -> bool {
        self.missing_fields().is_empty()
    }

    /// Returns the user id, minting one on first use.
    pub fn ensure_user_id(&mut self) -> UserId {
        self.user_id.get_or_insert_with(UserId::generate).clone()
    }

    pub fn finalize(&self) -> Option<UserProfile> {
        Some(UserProfile {
            gender: self.gender?,
            age_range: self.age_range?,
            occupation: self.occupation?,
            marital_status: self.marital_status?,
            family_status: self.family_status?,
            income_range: self.income_range?,
            user_id: self.user_id.clone()?,
            vehicle_status: self.vehicle_status?,
        })
    }
}

/// Completed profile as transmitted inside a [`Submission`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub gender: Gender,
    pub age_range: AgeRange,
    pub occupation: Occupation,
    pub marital_status: MaritalStatus,
    pub family_status: FamilyStatus,
    pub income_range: IncomeRange,
    pub user_id: UserId,
    pub vehicle_status: VehicleStatus,
}

/// Seat-count preference. Serialized as the plain number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum SeatChoice {
    Two,
    Four,
    Five,
    Seven,
}

impl SeatChoice {
    pub const fn ordered() -> [Self; 4] {
        [Self::Two, Self::Four, Self::Five, Self::Seven]
    }

    pub const fn seats(self) -> u8 {
        match self {
            Self::Two => 2,
            Self::Four => 4,
            Self::Five => 5,
            Self::Seven => 7,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Two => "2 ที่นั่ง",
            Self::Four => "4 ที่นั่ง",
            Self::Five => "5 ที่นั่ง",
            Self::Seven => "7 ที่นั่ง",
        }
    }

    pub const fn description(self) -> &'static str {
        match self {
            Self::Two => "รถสปอร์ต 2 ที่นั่ง",
            Self::Four => "รถยนต์ขนาดเล็ก-กลาง",
            Self::Five => "รถยนต์ขนาดกลาง-ใหญ่",
            Self::Seven => "รถอเนกประสงค์ครอบครัว",
        }
    }
}

impl From<SeatChoice> for u8 {
    fn from(value: SeatChoice) -> Self {
        value.seats()
    }
}

impl TryFrom<u8> for SeatChoice {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::ordered()
            .into_iter()
            .find(|choice| choice.seats() == value)
            .ok_or_else(|| format!("unsupported seat count {value}; expected 2, 4, 5 or 7"))
    }
}

/// Drivetrain preference. Serialized with the identifiers the ranking service filters on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DriveType {
    #[serde(rename = "ระบบขับเคลื่อนล้อหน้า")]
    FrontWheel,
    #[serde(rename = "ระบบขับเคลื่อนล้อหลัง")]
    RearWheel,
    #[serde(rename = "ระบบขับเคลื่อนสี่ล้อแบบอัตโนมัติ")]
    AllWheel,
}

impl DriveType {
    pub const fn ordered() -> [Self; 3] {
        [Self::FrontWheel, Self::RearWheel, Self::AllWheel]
    }

    pub const fn id(self) -> &'static str {
        match self {
            Self::FrontWheel => "ระบบขับเคลื่อนล้อหน้า",
            Self::RearWheel => "ระบบขับเคลื่อนล้อหลัง",
            Self::AllWheel => "ระบบขับเคลื่อนสี่ล้อแบบอัตโนมัติ",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::FrontWheel => "ขับเคลื่อนล้อหน้า",
            Self::RearWheel => "ขับเคลื่อนล้อหลัง",
            Self::AllWheel => "ขับเคลื่อน 4 ล้อ",
        }
    }

    pub const fn description(self) -> &'static str {
        match self {
            Self::FrontWheel => "เหมาะสำหรับการขับขี่ในเมืองและประหยัดพลังงาน",
            Self::RearWheel => "ให้ความรู้สึกสปอร์ตและการทรงตัวที่ดี",
            Self::AllWheel => "เหมาะกับทุกสภาพถนนและให้ความมั่นใจสูงสุด",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AnswerError {
    #[error("no question at factor {factor}, question {question}")]
    UnknownQuestion { factor: usize, question: usize },
    #[error("score {score} is not an option of factor {factor}, question {question}")]
    UnknownScore {
        factor: usize,
        question: usize,
        score: u8,
    },
}

/// Per-factor answer slots, one per question, `None` until answered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnswerMatrix {
    slots: BTreeMap<FactorKey, Vec<Option<u8>>>,
}

impl AnswerMatrix {
    pub fn for_catalog(catalog: &SurveyCatalog) -> Self {
        let slots = catalog
            .factors()
            .iter()
            .map(|factor| (factor.key, vec![None; factor.questions.len()]))
            .collect();
        Self { slots }
    }

    /// Stores `score` at `cursor`, replacing any earlier answer.
    pub fn record(
        &mut self,
        catalog: &SurveyCatalog,
        cursor: QuestionCursor,
        score: u8,
    ) -> Result<(), AnswerError> {
        let unknown = AnswerError::UnknownQuestion {
            factor: cursor.factor,
            question: cursor.question,
        };
        let factor = catalog.factors().get(cursor.factor).ok_or(unknown.clone())?;
        let question = factor
            .questions
            .get(cursor.question)
            .ok_or(unknown.clone())?;
        if !question.accepts_score(score) {
            return Err(AnswerError::UnknownScore {
                factor: cursor.factor,
                question: cursor.question,
                score,
            });
        }

        let slot = self
            .slots
            .get_mut(&factor.key)
            .and_then(|answers| answers.get_mut(cursor.question))
            .ok_or(unknown)?;
        *slot = Some(score);
        Ok(())
    }

    pub fn answer(&self, key: FactorKey, question: usize) -> Option<u8> {
        self.slots
            .get(&key)
            .and_then(|answers| answers.get(question).copied().flatten())
    }

    pub fn factor_answers(&self, key: FactorKey) -> &[Option<u8>] {
        self.slots.get(&key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn iter(&self) -> impl Iterator<Item = (FactorKey, &[Option<u8>])> {
        self.slots
            .iter()
            .map(|(key, answers)| (*key, answers.as_slice()))
    }

    pub fn answered(&self) -> usize {
        self.slots
            .values()
            .flat_map(|answers| answers.iter())
            .filter(|slot| slot.is_some())
            .count()
    }

    pub fn is_complete(&self) -> bool {
        self.slots
            .values()
            .all(|answers| answers.iter().all(Option::is_some))
    }
}

/// One aggregated weight per factor, keyed by the factor's wire name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SummedWeights(pub BTreeMap<FactorKey, u32>);

impl SummedWeights {
    pub fn get(&self, key: FactorKey) -> u32 {
        self.0.get(&key).copied().unwrap_or(0)
    }

    pub fn keys(&self) -> Vec<FactorKey> {
        self.0.keys().copied().collect()
    }

    pub fn total(&self) -> u32 {
        self.0.values().sum()
    }
}

impl fmt::Display for SummedWeights {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self
            .0
            .iter()
            .map(|(key, weight)| format!("{}={}", key.wire_name(), weight))
            .collect();
        write!(f, "{}", rendered.join(", "))
    }
}

/// Payload sent to the ranking service once the survey is complete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub user_profile: UserProfile,
    pub num_seats: SeatChoice,
    pub drive_con: DriveType,
    pub summed_weight: SummedWeights,
}
