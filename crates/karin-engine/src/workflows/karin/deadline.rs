use super::calendar::{BusinessCalendar, DayCountMode};
use super::stage::Stage;
use chrono::NaiveDate;
use serde::Serialize;
use tracing::warn;

pub const DEFAULT_TERM_DAYS: u32 = 3;
pub const DEFAULT_PRECAUTIONARY_MEASURES_DAYS: u32 = 3;
pub const INVESTIGATION_DAYS: u32 = 30;
pub const EXTENDED_INVESTIGATION_DAYS: u32 = 60;

/// A legal term: how many days, and how they are counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatutoryTerm {
    pub days: u32,
    pub mode: DayCountMode,
}

impl StatutoryTerm {
    pub const fn business(days: u32) -> Self {
        Self {
            days,
            mode: DayCountMode::Administrative,
        }
    }

    pub const fn calendar(days: u32) -> Self {
        Self {
            days,
            mode: DayCountMode::Calendar,
        }
    }

    pub fn describe(&self) -> String {
        format!("{} {}", self.days, self.mode.label())
    }
}

/// Terms that are configurable per deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatuteParameters {
    pub precautionary_measures_days: u32,
    pub default_term_days: u32,
}

impl Default for StatuteParameters {
    fn default() -> Self {
        Self {
            precautionary_measures_days: DEFAULT_PRECAUTIONARY_MEASURES_DAYS,
            default_term_days: DEFAULT_TERM_DAYS,
        }
    }
}

/// Maps stages to statutory deadlines on a [`BusinessCalendar`].
#[derive(Debug, Clone, Default)]
pub struct DeadlineCalculator {
    calendar: BusinessCalendar,
    parameters: StatuteParameters,
}

impl DeadlineCalculator {
    pub fn new(calendar: BusinessCalendar, parameters: StatuteParameters) -> Self {
        Self {
            calendar,
            parameters,
        }
    }

    pub fn calendar(&self) -> &BusinessCalendar {
        &self.calendar
    }

    pub fn parameters(&self) -> StatuteParameters {
        self.parameters
    }

    pub fn default_term(&self) -> StatutoryTerm {
        StatutoryTerm::business(self.parameters.default_term_days)
    }

    /// Statutory term for a stage. Stages without a term of their own fall
    /// back to the default term.
    pub fn term_for(&self, stage: Stage, extended: bool) -> StatutoryTerm {
        match stage {
            Stage::ComplaintFiled => StatutoryTerm::business(1),
            Stage::Reception | Stage::DecisionToInvestigate | Stage::ReportApproval => {
                StatutoryTerm::business(3)
            }
            Stage::Subsanation | Stage::ReportCreation => StatutoryTerm::business(5),
            Stage::PrecautionaryMeasures => {
                StatutoryTerm::business(self.parameters.precautionary_measures_days)
            }
            Stage::Investigation if extended => {
                StatutoryTerm::business(EXTENDED_INVESTIGATION_DAYS)
            }
            Stage::Investigation => StatutoryTerm::business(INVESTIGATION_DAYS),
            Stage::DtNotification | Stage::SusesoNotification => StatutoryTerm::business(10),
            Stage::DtResolution => StatutoryTerm::business(15),
            Stage::MeasuresAdoption => StatutoryTerm::calendar(15),
            Stage::Closed => StatutoryTerm::business(0),
            Stage::InvestigationComplete | Stage::FinalReport | Stage::DtSubmission => {
                self.default_term()
            }
        }
    }

    /// Term lookup by key, covering the statutory terms that are not stages
    /// (sanctions, false claims, retaliation review, labor department review).
    /// Unknown keys get the default term instead of blocking the workflow.
    pub fn term_for_key(&self, key: &str) -> StatutoryTerm {
        if let Ok(stage) = key.parse::<Stage>() {
            return self.term_for(stage, false);
        }

        match key.trim() {
            "labor_department" => self.term_for(Stage::DtResolution, false),
            "sanctions" | "false_claim" => StatutoryTerm::business(10),
            "retaliation_review" => StatutoryTerm::business(5),
            other => {
                warn!(term = other, "no statutory term registered, using default");
                self.default_term()
            }
        }
    }

    pub fn deadline_for(&self, stage: Stage, start: NaiveDate, extended: bool) -> NaiveDate {
        self.apply(self.term_for(stage, extended), start)
    }

    pub fn deadline_for_key(&self, key: &str, start: NaiveDate) -> NaiveDate {
        self.apply(self.term_for_key(key), start)
    }

    pub fn apply(&self, term: StatutoryTerm, start: NaiveDate) -> NaiveDate {
        self.calendar.add_days(start, term.days, term.mode)
    }

    /// `None` when the deadline would fall past the last representable date.
    pub fn checked_deadline_for(
        &self,
        stage: Stage,
        start: NaiveDate,
        extended: bool,
    ) -> Option<NaiveDate> {
        let term = self.term_for(stage, extended);
        self.calendar.checked_add_days(start, term.days, term.mode)
    }
}
