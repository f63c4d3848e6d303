use std::sync::Arc;

use serde::Serialize;

use super::aggregate::aggregate;
use super::catalog::{LikertQuestion, QuestionCursor, SurveyCatalog};
use super::domain::{
    AnswerMatrix, DriveType, ProfileDraft, ProfileField, SeatChoice, Submission, SummedWeights,
};

/// Screens of the survey, in forward order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum SurveyStep {
    Welcome,
    Profile,
    Questions { factor: usize, question: usize },
    Seats,
    Drive,
    Summary,
}

impl SurveyStep {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Welcome => "welcome",
            Self::Profile => "profile",
            Self::Questions { .. } => "questions",
            Self::Seats => "seats",
            Self::Drive => "drive",
            Self::Summary => "summary",
        }
    }

    fn at(cursor: QuestionCursor) -> Self {
        Self::Questions {
            factor: cursor.factor,
            question: cursor.question,
        }
    }
}

/// Why a gated transition did not happen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum ValidationGap {
    #[error("profile is missing {missing:?}")]
    ProfileIncomplete { missing: Vec<ProfileField> },
    #[error("every question must be answered before submitting")]
    AnswersIncomplete { unanswered: usize },
    #[error("choose a seat count first")]
    SeatsNotSelected,
    #[error("choose a drive type first")]
    DriveTypeNotSelected,
    #[error("answer the current question to continue")]
    AnswerRequired,
    #[error("option {index} does not exist for the current question")]
    UnknownOption { index: usize },
    #[error("'{action}' is not available on the {step} step")]
    NotAvailable {
        action: &'static str,
        step: &'static str,
    },
    #[error("already at the first step")]
    AtStart,
}

/// Result of a session operation. A rejected transition leaves the session untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Transition {
    Moved { from: SurveyStep, to: SurveyStep },
    Stayed,
    Rejected { gap: ValidationGap },
}

impl Transition {
    pub fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected { .. })
    }

    fn rejected(gap: ValidationGap) -> Self {
        Self::Rejected { gap }
    }
}

/// Which actions a client should currently offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Affordances {
    pub can_go_back: bool,
    pub can_advance: bool,
    pub can_submit: bool,
}

/// One respondent's walk through the survey.
#[derive(Debug, Clone)]
pub struct SurveySession {
    catalog: Arc<SurveyCatalog>,
    step: SurveyStep,
    profile: ProfileDraft,
    answers: AnswerMatrix,
    seats: Option<SeatChoice>,
    drive: Option<DriveType>,
}

impl SurveySession {
    pub fn new(catalog: Arc<SurveyCatalog>) -> Self {
        let answers = AnswerMatrix::for_catalog(&catalog);
        Self {
            catalog,
            step: SurveyStep::Welcome,
            profile: ProfileDraft::default(),
            answers,
            seats: None,
            drive: None,
        }
    }

    pub fn catalog(&self) -> &SurveyCatalog {
        &self.catalog
    }

    pub fn step(&self) -> SurveyStep {
        self.step
    }

    pub fn profile(&self) -> &ProfileDraft {
        &self.profile
    }

    pub fn answers(&self) -> &AnswerMatrix {
        &self.answers
    }

    pub fn seats(&self) -> Option<SeatChoice> {
        self.seats
    }

    pub fn drive(&self) -> Option<DriveType> {
        self.drive
    }

    pub fn weights(&self) -> SummedWeights {
        aggregate(&self.answers)
    }

    pub fn current_question(&self) -> Option<&LikertQuestion> {
        match self.step {
            SurveyStep::Questions { factor, question } => {
                self.catalog.question(QuestionCursor { factor, question })
            }
            _ => None,
        }
    }

    pub fn start(&mut self) -> Transition {
        match self.step {
            SurveyStep::Welcome => self.move_to(SurveyStep::Profile),
            step => Transition::rejected(ValidationGap::NotAvailable {
                action: "start",
                step: step.label(),
            }),
        }
    }

    pub fn update_profile(&mut self, update: ProfileDraft) -> Transition {
        self.profile.merge(update);
        Transition::Stayed
    }

    pub fn confirm_profile(&mut self) -> Transition {
        if self.step != SurveyStep::Profile {
            return Transition::rejected(ValidationGap::NotAvailable {
                action: "confirm_profile",
                step: self.step.label(),
            });
        }

        let missing = self.profile.missing_fields();
        if !missing.is_empty() {
            return Transition::rejected(ValidationGap::ProfileIncomplete { missing });
        }

        self.move_to(SurveyStep::at(QuestionCursor::first()))
    }

    /// Records the chosen option for the current question and moves on.
    pub fn answer(&mut self, option_index: usize) -> Transition {
        let SurveyStep::Questions { factor, question } = self.step else {
            return Transition::rejected(ValidationGap::NotAvailable {
                action: "answer",
                step: self.step.label(),
            });
        };
        let cursor = QuestionCursor { factor, question };

        let score = match self
            .catalog
            .question(cursor)
            .and_then(|question| question.option(option_index))
        {
            Some(option) => option.score,
            None => {
                return Transition::rejected(ValidationGap::UnknownOption {
                    index: option_index,
                })
            }
        };

        if self.answers.record(&self.catalog, cursor, score).is_err() {
            return Transition::rejected(ValidationGap::UnknownOption {
                index: option_index,
            });
        }

        let next = match self.catalog.next_cursor(cursor) {
            Some(next) => SurveyStep::at(next),
            None => SurveyStep::Seats,
        };
        self.move_to(next)
    }

    pub fn select_seats(&mut self, seats: SeatChoice) -> Transition {
        self.seats = Some(seats);
        Transition::Stayed
    }

    pub fn select_drive(&mut self, drive: DriveType) -> Transition {
        self.drive = Some(drive);
        Transition::Stayed
    }

    pub fn next(&mut self) -> Transition {
        match self.step {
            SurveyStep::Welcome => self.start(),
            SurveyStep::Profile => self.confirm_profile(),
            SurveyStep::Questions { .. } => Transition::rejected(ValidationGap::AnswerRequired),
            SurveyStep::Seats => match self.seats {
                Some(_) => self.move_to(SurveyStep::Drive),
                None => Transition::rejected(ValidationGap::SeatsNotSelected),
            },
            SurveyStep::Drive => match self.drive {
                Some(_) => self.move_to(SurveyStep::Summary),
                None => Transition::rejected(ValidationGap::DriveTypeNotSelected),
            },
            SurveyStep::Summary => Transition::rejected(ValidationGap::NotAvailable {
                action: "next",
                step: self.step.label(),
            }),
        }
    }

    pub fn back(&mut self) -> Transition {
        let previous = match self.step {
            SurveyStep::Welcome => return Transition::rejected(ValidationGap::AtStart),
            SurveyStep::Profile => SurveyStep::Welcome,
            SurveyStep::Questions { factor, question } => {
                match self
                    .catalog
                    .previous_cursor(QuestionCursor { factor, question })
                {
                    Some(cursor) => SurveyStep::at(cursor),
                    None => SurveyStep::Profile,
                }
            }
            SurveyStep::Seats => SurveyStep::at(self.catalog.last_cursor()),
            SurveyStep::Drive => SurveyStep::Seats,
            SurveyStep::Summary => SurveyStep::Drive,
        };
        self.move_to(previous)
    }

    /// Completion percentage shown alongside the current step.
    pub fn progress(&self) -> u8 {
        match self.step {
            SurveyStep::Welcome => 0,
            SurveyStep::Profile => 10,
            SurveyStep::Questions { factor, question } => {
                let total = self.catalog.total_questions();
                let position = self
                    .catalog
                    .flat_index(QuestionCursor { factor, question })
                    .map(|index| index + 1)
                    .unwrap_or(0);
                if total == 0 {
                    return 10;
                }
                // round-half-up of 70 * position / total in integer space
                let share = (140 * position + total) / (2 * total);
                10 + share.min(70) as u8
            }
            SurveyStep::Seats => 80,
            SurveyStep::Drive => 90,
            SurveyStep::Summary => 100,
        }
    }

    /// First unmet requirement for submission, if any.
    pub fn completion_gap(&self) -> Option<ValidationGap> {
        let missing = self.profile.missing_fields();
        if !missing.is_empty() {
            return Some(ValidationGap::ProfileIncomplete { missing });
        }
        if !self.answers.is_complete() {
            let unanswered = self.catalog.total_questions() - self.answers.answered();
            return Some(ValidationGap::AnswersIncomplete { unanswered });
        }
        if self.seats.is_none() {
            return Some(ValidationGap::SeatsNotSelected);
        }
        if self.drive.is_none() {
            return Some(ValidationGap::DriveTypeNotSelected);
        }
        None
    }

    pub fn is_complete(&self) -> bool {
        self.completion_gap().is_none()
    }

    pub fn affordances(&self) -> Affordances {
        let can_advance = match self.step {
            SurveyStep::Welcome => true,
            SurveyStep::Profile => self.profile.is_complete(),
            SurveyStep::Questions { .. } => false,
            SurveyStep::Seats => self.seats.is_some(),
            SurveyStep::Drive => self.drive.is_some(),
            SurveyStep::Summary => false,
        };

        Affordances {
            can_go_back: self.step != SurveyStep::Welcome,
            can_advance,
            can_submit: self.step == SurveyStep::Summary && self.is_complete(),
        }
    }

    /// Builds the payload for the ranking service. Only available from the summary screen
    /// once every requirement is met; mints the respondent id on first submission.
    pub fn submit(&mut self) -> Result<Submission, ValidationGap> {
        if self.step != SurveyStep::Summary {
            return Err(ValidationGap::NotAvailable {
                action: "submit",
                step: self.step.label(),
            });
        }
        if let Some(gap) = self.completion_gap() {
            return Err(gap);
        }

        self.profile.ensure_user_id();
        let user_profile = self
            .profile
            .finalize()
            .ok_or_else(|| ValidationGap::ProfileIncomplete {
                missing: self.profile.missing_fields(),
            })?;
        let num_seats = self.seats.ok_or(ValidationGap::SeatsNotSelected)?;
        let drive_con = self.drive.ok_or(ValidationGap::DriveTypeNotSelected)?;

        Ok(Submission {
            user_profile,
            num_seats,
            drive_con,
            summed_weight: self.weights(),
        })
    }

    fn move_to(&mut self, to: SurveyStep) -> Transition {
        let from = self.step;
        self.step = to;
        Transition::Moved { from, to }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::survey::domain::{
        AgeRange, FamilyStatus, Gender, IncomeRange, MaritalStatus, Occupation, VehicleStatus,
    };
    use crate::workflows::survey::FactorKey;

    fn profile() -> ProfileDraft {
        ProfileDraft {
            gender: Some(Gender::Male),
            age_range: Some(AgeRange::From35To44),
            occupation: Some(Occupation::Employed),
            marital_status: Some(MaritalStatus::Married),
            family_status: Some(FamilyStatus::WithChildren),
            income_range: Some(IncomeRange::High),
            vehicle_status: Some(VehicleStatus::Have),
            user_id: None,
        }
    }

    fn session() -> SurveySession {
        SurveySession::new(SurveyCatalog::shared_standard())
    }

    fn session_at_questions() -> SurveySession {
        let mut session = session();
        session.start();
        session.update_profile(profile());
        assert!(!session.confirm_profile().is_rejected());
        session
    }

    fn answer_all(session: &mut SurveySession, option: usize) {
        while matches!(session.step(), SurveyStep::Questions { .. }) {
            assert!(!session.answer(option).is_rejected());
        }
    }

    #[test]
    fn profile_gate_blocks_until_every_field_is_set() {
        let mut session = session();
        session.start();
        session.update_profile(ProfileDraft {
            gender: Some(Gender::Other),
            ..ProfileDraft::default()
        });

        match session.next() {
            Transition::Rejected {
                gap: ValidationGap::ProfileIncomplete { missing },
            } => assert_eq!(missing.len(), 6),
            other => panic!("expected incomplete profile, got {other:?}"),
        }
        assert_eq!(session.step(), SurveyStep::Profile);
        assert!(!session.affordances().can_advance);

        session.update_profile(profile());
        assert_eq!(
            session.next(),
            Transition::Moved {
                from: SurveyStep::Profile,
                to: SurveyStep::Questions {
                    factor: 0,
                    question: 0
                }
            }
        );
    }

    #[test]
    fn answering_walks_every_question_then_reaches_seats() {
        let mut session = session_at_questions();
        answer_all(&mut session, 0);

        assert_eq!(session.step(), SurveyStep::Seats);
        assert!(session.answers().is_complete());
        assert_eq!(session.weights().get(FactorKey::Battery), 18);
        // calm-driving statement is reverse scored
        assert_eq!(session.weights().get(FactorKey::Acceleration), 10);
    }

    #[test]
    fn going_back_and_reanswering_overwrites() {
        let mut session = session_at_questions();
        session.answer(0);
        session.back();
        assert_eq!(
            session.step(),
            SurveyStep::Questions {
                factor: 0,
                question: 0
            }
        );
        session.answer(6);

        assert_eq!(session.answers().answer(FactorKey::Battery, 0), Some(1));
        assert_eq!(session.answers().answered(), 1);
    }

    #[test]
    fn back_crosses_factor_boundary_to_previous_last_question() {
        let mut session = session_at_questions();
        session.answer(0);
        session.answer(0);
        assert_eq!(
            session.step(),
            SurveyStep::Questions {
                factor: 1,
                question: 0
            }
        );

        session.back();
        assert_eq!(
            session.step(),
            SurveyStep::Questions {
                factor: 0,
                question: 1
            }
        );
    }

    #[test]
    fn back_never_leaves_welcome() {
        let mut session = session_at_questions();
        for _ in 0..40 {
            session.back();
        }
        assert_eq!(session.step(), SurveyStep::Welcome);
        assert_eq!(
            session.back(),
            Transition::Rejected {
                gap: ValidationGap::AtStart
            }
        );
        assert!(!session.affordances().can_go_back);
    }

    #[test]
    fn back_from_seats_returns_to_last_question() {
        let mut session = session_at_questions();
        answer_all(&mut session, 3);
        session.back();
        assert_eq!(
            session.step(),
            SurveyStep::Questions {
                factor: 6,
                question: 1
            }
        );
    }

    #[test]
    fn seats_and_drive_are_gated_by_selection() {
        let mut session = session_at_questions();
        answer_all(&mut session, 2);

        assert_eq!(
            session.next(),
            Transition::Rejected {
                gap: ValidationGap::SeatsNotSelected
            }
        );
        session.select_seats(SeatChoice::Five);
        assert!(!session.next().is_rejected());

        assert_eq!(
            session.next(),
            Transition::Rejected {
                gap: ValidationGap::DriveTypeNotSelected
            }
        );
        session.select_drive(DriveType::RearWheel);
        assert!(!session.next().is_rejected());
        assert_eq!(session.step(), SurveyStep::Summary);
    }

    #[test]
    fn summary_only_moves_forward_through_submit() {
        let mut session = session_at_questions();
        answer_all(&mut session, 1);
        session.select_seats(SeatChoice::Seven);
        session.next();
        session.select_drive(DriveType::AllWheel);
        session.next();

        assert!(session.next().is_rejected());
        assert!(session.affordances().can_submit);

        let submission = session.submit().expect("complete survey submits");
        assert_eq!(submission.num_seats, SeatChoice::Seven);
        assert_eq!(submission.drive_con, DriveType::AllWheel);
        assert_eq!(submission.summed_weight.keys(), FactorKey::ordered().to_vec());
        assert!(session.profile().user_id.is_some());

        let again = session.submit().expect("resubmission allowed");
        assert_eq!(again.user_profile.user_id, submission.user_profile.user_id);
    }

    #[test]
    fn submit_is_refused_before_summary() {
        let mut session = session_at_questions();
        assert!(matches!(
            session.submit(),
            Err(ValidationGap::NotAvailable {
                action: "submit",
                ..
            })
        ));
    }

    #[test]
    fn progress_never_decreases_on_forward_traversal() {
        let mut session = session();
        let mut observed = vec![session.progress()];

        session.start();
        observed.push(session.progress());
        session.update_profile(profile());
        session.confirm_profile();
        observed.push(session.progress());
        while matches!(session.step(), SurveyStep::Questions { .. }) {
            session.answer(4);
            observed.push(session.progress());
        }
        session.select_seats(SeatChoice::Four);
        session.next();
        observed.push(session.progress());
        session.select_drive(DriveType::FrontWheel);
        session.next();
        observed.push(session.progress());

        assert!(observed.windows(2).all(|pair| pair[0] <= pair[1]));
        assert_eq!(observed.first(), Some(&0));
        assert_eq!(observed.last(), Some(&100));
    }

    #[test]
    fn question_progress_uses_flat_position() {
        let mut session = session_at_questions();
        // 10 + round(70 * 1 / 14)
        assert_eq!(session.progress(), 15);
        for _ in 0..6 {
            session.answer(0);
        }
        // 10 + round(70 * 7 / 14)
        assert_eq!(session.progress(), 45);
    }

    #[test]
    fn unknown_option_is_rejected_without_recording() {
        let mut session = session_at_questions();
        assert_eq!(
            session.answer(7),
            Transition::Rejected {
                gap: ValidationGap::UnknownOption { index: 7 }
            }
        );
        assert_eq!(session.answers().answered(), 0);
    }
}
