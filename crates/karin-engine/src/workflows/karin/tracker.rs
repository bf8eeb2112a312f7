use super::calendar::DayCountMode;
use super::deadline::DeadlineCalculator;
use super::domain::KarinProcess;
use super::stage::Stage;
use chrono::NaiveDate;
use serde::Serialize;

/// A statutory milestone shown on the case dashboard.
#[derive(Debug, Clone, Copy)]
pub struct Milestone {
    pub key: &'static str,
    pub title: &'static str,
    pub stage: Stage,
    /// Days remaining at or below which the milestone is flagged urgent.
    pub urgency_threshold: i64,
}

pub const MILESTONES: [Milestone; 15] = [
    Milestone {
        key: "complaint_acknowledgement",
        title: "Acuse de recibo de la denuncia",
        stage: Stage::ComplaintFiled,
        urgency_threshold: 1,
    },
    Milestone {
        key: "reception",
        title: "Recepción y derechos informados",
        stage: Stage::Reception,
        urgency_threshold: 1,
    },
    Milestone {
        key: "subsanation",
        title: "Plazo de subsanación",
        stage: Stage::Subsanation,
        urgency_threshold: 1,
    },
    Milestone {
        key: "precautionary_measures",
        title: "Adopción de medidas de resguardo",
        stage: Stage::PrecautionaryMeasures,
        urgency_threshold: 1,
    },
    Milestone {
        key: "decision_to_investigate",
        title: "Decisión de investigar",
        stage: Stage::DecisionToInvestigate,
        urgency_threshold: 1,
    },
    Milestone {
        key: "investigation",
        title: "Plazo de investigación",
        stage: Stage::Investigation,
        urgency_threshold: 5,
    },
    Milestone {
        key: "report_creation",
        title: "Elaboración del informe",
        stage: Stage::ReportCreation,
        urgency_threshold: 1,
    },
    Milestone {
        key: "report_approval",
        title: "Aprobación del informe",
        stage: Stage::ReportApproval,
        urgency_threshold: 1,
    },
    Milestone {
        key: "dt_notification",
        title: "Notificación a la Dirección del Trabajo",
        stage: Stage::DtNotification,
        urgency_threshold: 1,
    },
    Milestone {
        key: "suseso_notification",
        title: "Notificación a SUSESO/Mutualidad",
        stage: Stage::SusesoNotification,
        urgency_threshold: 1,
    },
    Milestone {
        key: "investigation_complete",
        title: "Cierre de la investigación",
        stage: Stage::InvestigationComplete,
        urgency_threshold: 1,
    },
    Milestone {
        key: "final_report",
        title: "Emisión del informe final",
        stage: Stage::FinalReport,
        urgency_threshold: 1,
    },
    Milestone {
        key: "dt_submission",
        title: "Remisión a la Dirección del Trabajo",
        stage: Stage::DtSubmission,
        urgency_threshold: 1,
    },
    Milestone {
        key: "dt_resolution",
        title: "Pronunciamiento de la Dirección del Trabajo",
        stage: Stage::DtResolution,
        urgency_threshold: 3,
    },
    Milestone {
        key: "measures_adoption",
        title: "Adopción de medidas y sanciones",
        stage: Stage::MeasuresAdoption,
        urgency_threshold: 3,
    },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeadlineStatus {
    Completed,
    Active,
    Pending,
    Overdue,
}

impl DeadlineStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Completed => "Completado",
            Self::Active => "En curso",
            Self::Pending => "Pendiente",
            Self::Overdue => "Vencido",
        }
    }

    pub const fn is_open(self) -> bool {
        matches!(self, Self::Active | Self::Overdue)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Deadline {
    pub key: &'static str,
    pub title: &'static str,
    pub stage: Stage,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub mode: DayCountMode,
    pub days_total: i64,
    pub days_elapsed: i64,
    pub days_remaining: i64,
    pub status: DeadlineStatus,
    pub is_urgent: bool,
}

impl Deadline {
    pub fn progress_percent(&self) -> u8 {
        if self.days_total <= 0 {
            return if self.status == DeadlineStatus::Pending { 0 } else { 100 };
        }
        let ratio = self.days_elapsed as f64 / self.days_total as f64;
        (ratio * 100.0).round().clamp(0.0, 100.0) as u8
    }
}

/// Derives deadline views from the process and "now". Breaches are detected
/// here, on read.
#[derive(Debug, Clone, Copy)]
pub struct DeadlineTracker<'a> {
    calculator: &'a DeadlineCalculator,
}

impl<'a> DeadlineTracker<'a> {
    pub fn new(calculator: &'a DeadlineCalculator) -> Self {
        Self { calculator }
    }

    /// Every milestone of the procedure, projecting future ones from today.
    /// Subsanation only appears if the process went through it.
    pub fn track_all(&self, process: &KarinProcess, now: NaiveDate) -> Vec<Deadline> {
        let mut cursor = process.created_on;
        MILESTONES
            .iter()
            .filter(|milestone| {
                milestone.stage != Stage::Subsanation || process.entered_subsanation()
            })
            .map(|milestone| {
                let deadline = self.evaluate(milestone, process, now, cursor);
                cursor = deadline.end_date;
                deadline
            })
            .collect()
    }

    pub fn track_stage(
        &self,
        process: &KarinProcess,
        stage: Stage,
        now: NaiveDate,
    ) -> Option<Deadline> {
        self.track_all(process, now)
            .into_iter()
            .find(|deadline| deadline.stage == stage)
    }

    /// The window that matters for the current stage: the latest completed
    /// milestone, the open one(s) and the next pending one.
    pub fn active_deadlines(&self, process: &KarinProcess, now: NaiveDate) -> Vec<Deadline> {
        let all = self.track_all(process, now);

        let last_completed = all
            .iter()
            .rposition(|deadline| deadline.status == DeadlineStatus::Completed);
        let first_pending = all
            .iter()
            .position(|deadline| deadline.status == DeadlineStatus::Pending);

        all.iter()
            .enumerate()
            .filter(|(index, deadline)| {
                deadline.status.is_open()
                    || Some(*index) == last_completed
                    || Some(*index) == first_pending
            })
            .map(|(_, deadline)| deadline.clone())
            .collect()
    }

    fn evaluate(
        &self,
        milestone: &Milestone,
        process: &KarinProcess,
        now: NaiveDate,
        cursor: NaiveDate,
    ) -> Deadline {
        let calendar = self.calculator.calendar();
        let term = self
            .calculator
            .term_for(milestone.stage, process.investigation_extended);

        let current = process.stage;
        let base_status = if current.rank() > milestone.stage.rank() {
            DeadlineStatus::Completed
        } else if current == milestone.stage {
            DeadlineStatus::Active
        } else {
            DeadlineStatus::Pending
        };

        let start_date = match process.entered_on(milestone.stage) {
            Some(entered) => entered,
            None if base_status == DeadlineStatus::Pending => cursor.max(now),
            None => cursor,
        };
        let end_date = process
            .deadline(milestone.stage)
            .unwrap_or_else(|| self.calculator.apply(term, start_date));
        let days_total = calendar.count_days(start_date, end_date, term.mode).max(0);

        let (status, days_elapsed, days_remaining) = match base_status {
            DeadlineStatus::Completed => (DeadlineStatus::Completed, days_total, 0),
            DeadlineStatus::Pending => (DeadlineStatus::Pending, 0, days_total),
            _ => {
                let elapsed = calendar.count_days(start_date, now, term.mode).max(0);
                let mut remaining = calendar.count_days(now, end_date, term.mode);
                // A deadline falling before a weekend is already missed on Saturday.
                if now > end_date {
                    remaining = remaining.min(-1);
                }
                let status = if remaining < 0 {
                    DeadlineStatus::Overdue
                } else {
                    DeadlineStatus::Active
                };
                (status, elapsed, remaining)
            }
        };

        Deadline {
            key: milestone.key,
            title: milestone.title,
            stage: milestone.stage,
            start_date,
            end_date,
            mode: term.mode,
            days_total,
            days_elapsed,
            days_remaining,
            status,
            is_urgent: status.is_open() && days_remaining <= milestone.urgency_threshold,
        }
    }
}
