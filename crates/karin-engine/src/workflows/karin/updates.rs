use super::deadline::DeadlineCalculator;
use super::domain::{
    AdoptedMeasure, DtResolution, FinalReport, Interview, InvestigationPlan, InvestigationReport,
    KarinProcess, MeasureStatus, ReportRevision, RevisionStatus, SignatureState, Testimony,
};
use super::stage::Stage;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Sub-operations on a process outside of stage transitions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProcessUpdate {
    InformRights,
    PrecautionaryMeasures {
        measures: Vec<String>,
        #[serde(default)]
        justification: Option<String>,
    },
    InvestigationPlan {
        plan: InvestigationPlan,
    },
    Interview {
        interview: Interview,
    },
    Testimony {
        testimony: Testimony,
    },
    TestimonySignature {
        id: String,
        state: SignatureState,
    },
    Report {
        report: InvestigationReport,
    },
    ReportRevision {
        revision: ReportRevision,
    },
    ApproveReport,
    FinalReport {
        report: FinalReport,
    },
    ExtendInvestigation,
    Measure {
        measure: AdoptedMeasure,
    },
    MeasureStatus {
        id: String,
        status: MeasureStatus,
    },
    DtResolution {
        resolution: DtResolution,
    },
}

impl ProcessUpdate {
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::InformRights => "inform_rights",
            Self::PrecautionaryMeasures { .. } => "precautionary_measures",
            Self::InvestigationPlan { .. } => "investigation_plan",
            Self::Interview { .. } => "interview",
            Self::Testimony { .. } => "testimony",
            Self::TestimonySignature { .. } => "testimony_signature",
            Self::Report { .. } => "report",
            Self::ReportRevision { .. } => "report_revision",
            Self::ApproveReport => "approve_report",
            Self::FinalReport { .. } => "final_report",
            Self::ExtendInvestigation => "extend_investigation",
            Self::Measure { .. } => "measure",
            Self::MeasureStatus { .. } => "measure_status",
            Self::DtResolution { .. } => "dt_resolution",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProcessError {
    #[error("the process is closed and read-only")]
    Closed,
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: String },
    #[error("{kind} {id} already exists")]
    Duplicate { kind: &'static str, id: String },
    #[error("{kind} {id} can only move forward, not from {from} to {to}")]
    BackwardStatus {
        kind: &'static str,
        id: String,
        from: &'static str,
        to: &'static str,
    },
    #[error("precautionary measures require at least one measure id")]
    EmptyMeasures,
    #[error("the report must be drafted before it can be approved")]
    NoReportToApprove,
    #[error("no statutory deadline can be computed from {0}")]
    DateOutOfRange(NaiveDate),
}

impl KarinProcess {
    /// Apply a sub-operation. Every update is refused once the process is closed.
    pub fn apply(
        &mut self,
        update: ProcessUpdate,
        calculator: &DeadlineCalculator,
    ) -> Result<(), ProcessError> {
        if self.is_closed() {
            return Err(ProcessError::Closed);
        }

        match update {
            ProcessUpdate::InformRights => self.informed_rights = true,
            ProcessUpdate::PrecautionaryMeasures {
                measures,
                justification,
            } => {
                let measures: Vec<String> = measures
                    .into_iter()
                    .map(|measure| measure.trim().to_string())
                    .filter(|measure| !measure.is_empty())
                    .collect();
                if measures.is_empty() {
                    return Err(ProcessError::EmptyMeasures);
                }
                self.precautionary_measures = measures.into_iter().collect();
                if justification.is_some() {
                    self.precautionary_measures_justification = justification;
                }
            }
            ProcessUpdate::InvestigationPlan { plan } => self.investigation_plan = Some(plan),
            ProcessUpdate::Interview { interview } => {
                if self.interviews.iter().any(|existing| existing.id == interview.id) {
                    return Err(ProcessError::Duplicate {
                        kind: "interview",
                        id: interview.id,
                    });
                }
                self.interviews.push(interview);
            }
            ProcessUpdate::Testimony { testimony } => {
                if self.testimonies.iter().any(|existing| existing.id == testimony.id) {
                    return Err(ProcessError::Duplicate {
                        kind: "testimony",
                        id: testimony.id,
                    });
                }
                self.testimonies.push(testimony);
            }
            ProcessUpdate::TestimonySignature { id, state } => {
                let testimony = self
                    .testimonies
                    .iter_mut()
                    .find(|testimony| testimony.id == id)
                    .ok_or_else(|| ProcessError::NotFound {
                        kind: "testimony",
                        id: id.clone(),
                    })?;
                if state <= testimony.signature {
                    return Err(ProcessError::BackwardStatus {
                        kind: "testimony",
                        id,
                        from: testimony.signature.label(),
                        to: state.label(),
                    });
                }
                testimony.signature = state;
            }
            ProcessUpdate::Report { report } => {
                self.report = Some(report);
                self.report_approved = false;
            }
            ProcessUpdate::ReportRevision { revision } => {
                self.report_approved =
                    revision.status == RevisionStatus::Approved && self.report.is_some();
                self.report_revisions.push(revision);
            }
            ProcessUpdate::ApproveReport => {
                if self.report.is_none() {
                    return Err(ProcessError::NoReportToApprove);
                }
                self.report_approved = true;
            }
            ProcessUpdate::FinalReport { report } => self.final_report = Some(report),
            ProcessUpdate::ExtendInvestigation => self.extend_investigation(calculator)?,
            ProcessUpdate::Measure { measure } => {
                if self.measures_adopted.iter().any(|existing| existing.id == measure.id) {
                    return Err(ProcessError::Duplicate {
                        kind: "measure",
                        id: measure.id,
                    });
                }
                self.measures_adopted.push(measure);
            }
            ProcessUpdate::MeasureStatus { id, status } => {
                let measure = self
                    .measures_adopted
                    .iter_mut()
                    .find(|measure| measure.id == id)
                    .ok_or_else(|| ProcessError::NotFound {
                        kind: "measure",
                        id: id.clone(),
                    })?;
                if status <= measure.status {
                    return Err(ProcessError::BackwardStatus {
                        kind: "measure",
                        id,
                        from: measure.status.label(),
                        to: status.label(),
                    });
                }
                measure.status = status;
            }
            ProcessUpdate::DtResolution { resolution } => self.dt_resolution = Some(resolution),
        }

        Ok(())
    }

    /// Grant the 60-day investigation term. If the investigation already has a
    /// deadline it is corrected from the same start date.
    fn extend_investigation(
        &mut self,
        calculator: &DeadlineCalculator,
    ) -> Result<(), ProcessError> {
        if let Some(start) = self.entered_on(Stage::Investigation) {
            let deadline = calculator
                .checked_deadline_for(Stage::Investigation, start, true)
                .ok_or(ProcessError::DateOutOfRange(start))?;
            self.deadlines.insert(Stage::Investigation, deadline);
        }
        self.investigation_extended = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn extension_recomputes_investigation_deadline_from_same_start() {
        let calculator = DeadlineCalculator::default();
        let mut process = KarinProcess::open(date(2023, 12, 20));
        process.stage = Stage::Investigation;
        process.stage_dates.insert(Stage::Investigation, date(2024, 1, 2));
        process.deadlines.insert(
            Stage::Investigation,
            calculator.deadline_for(Stage::Investigation, date(2024, 1, 2), false),
        );
        assert_eq!(process.deadline(Stage::Investigation), Some(date(2024, 2, 13)));

        process
            .apply(ProcessUpdate::ExtendInvestigation, &calculator)
            .expect("extension");

        assert!(process.investigation_extended);
        assert_eq!(process.deadline(Stage::Investigation), Some(date(2024, 3, 26)));
    }

    #[test]
    fn measure_status_moves_forward_and_reports_unknown_ids() {
        let calculator = DeadlineCalculator::default();
        let mut process = KarinProcess::open(date(2024, 3, 4));
        process
            .apply(
                ProcessUpdate::Measure {
                    measure: AdoptedMeasure {
                        id: "med-1".to_string(),
                        description: "Capacitación en prevención del acoso".to_string(),
                        responsible: "RR.HH.".to_string(),
                        due_date: None,
                        status: MeasureStatus::Pending,
                    },
                },
                &calculator,
            )
            .expect("measure added");

        process
            .apply(
                ProcessUpdate::MeasureStatus {
                    id: "med-1".to_string(),
                    status: MeasureStatus::Implemented,
                },
                &calculator,
            )
            .expect("forward");

        let backward = process.apply(
            ProcessUpdate::MeasureStatus {
                id: "med-1".to_string(),
                status: MeasureStatus::InProgress,
            },
            &calculator,
        );
        assert!(matches!(
            backward,
            Err(ProcessError::BackwardStatus { kind: "measure", .. })
        ));

        let missing = process.apply(
            ProcessUpdate::MeasureStatus {
                id: "med-9".to_string(),
                status: MeasureStatus::Verified,
            },
            &calculator,
        );
        assert_eq!(
            missing,
            Err(ProcessError::NotFound {
                kind: "measure",
                id: "med-9".to_string()
            })
        );
    }

    #[test]
    fn approval_requires_a_report() {
        let calculator = DeadlineCalculator::default();
        let mut process = KarinProcess::open(date(2024, 3, 4));
        assert_eq!(
            process.apply(ProcessUpdate::ApproveReport, &calculator),
            Err(ProcessError::NoReportToApprove)
        );

        process
            .apply(
                ProcessUpdate::Report {
                    report: InvestigationReport {
                        author_id: "inv-1".to_string(),
                        drafted_on: date(2024, 4, 1),
                        conclusions: "Sin hechos acreditados".to_string(),
                        proposed_measures: Vec::new(),
                    },
                },
                &calculator,
            )
            .expect("report");
        process
            .apply(
                ProcessUpdate::ReportRevision {
                    revision: ReportRevision {
                        date: date(2024, 4, 3),
                        reviewer: "Gerencia".to_string(),
                        comments: "Conforme".to_string(),
                        status: RevisionStatus::Approved,
                    },
                },
                &calculator,
            )
            .expect("revision");
        assert!(process.report_approved);
    }

    #[test]
    fn replaced_or_rejected_report_needs_new_approval() {
        let calculator = DeadlineCalculator::default();
        let mut process = KarinProcess::open(date(2024, 3, 4));
        let report = |conclusions: &str| ProcessUpdate::Report {
            report: InvestigationReport {
                author_id: "inv-1".to_string(),
                drafted_on: date(2024, 4, 1),
                conclusions: conclusions.to_string(),
                proposed_measures: Vec::new(),
            },
        };

        process.apply(report("Borrador"), &calculator).expect("report");
        process
            .apply(ProcessUpdate::ApproveReport, &calculator)
            .expect("approved");
        process
            .apply(report("Borrador corregido"), &calculator)
            .expect("replacement");
        assert!(!process.report_approved);

        process
            .apply(ProcessUpdate::ApproveReport, &calculator)
            .expect("approved again");
        process
            .apply(
                ProcessUpdate::ReportRevision {
                    revision: ReportRevision {
                        date: date(2024, 4, 5),
                        reviewer: "Gerencia".to_string(),
                        comments: "Falta detalle de testigos".to_string(),
                        status: RevisionStatus::ChangesRequested,
                    },
                },
                &calculator,
            )
            .expect("revision");
        assert!(!process.report_approved);
    }

    #[test]
    fn extension_past_the_last_date_is_refused() {
        let calculator = DeadlineCalculator::default();
        let mut process = KarinProcess::open(NaiveDate::MAX);
        process.stage = Stage::Investigation;
        process
            .stage_dates
            .insert(Stage::Investigation, NaiveDate::MAX);

        assert_eq!(
            process.apply(ProcessUpdate::ExtendInvestigation, &calculator),
            Err(ProcessError::DateOutOfRange(NaiveDate::MAX))
        );
        assert!(!process.investigation_extended);
    }

    #[test]
    fn closed_process_is_read_only() {
        let calculator = DeadlineCalculator::default();
        let mut process = KarinProcess::open(date(2024, 3, 4));
        process.stage = Stage::Closed;
        assert_eq!(
            process.apply(ProcessUpdate::InformRights, &calculator),
            Err(ProcessError::Closed)
        );
        assert!(!process.informed_rights);
    }

    #[test]
    fn updates_deserialize_from_tagged_json() {
        let update: ProcessUpdate = serde_json::from_str(
            r#"{"type":"precautionary_measures","measures":["separacion_espacios"],"justification":"Evitar contacto"}"#,
        )
        .expect("valid payload");
        assert_eq!(update.kind(), "precautionary_measures");
    }
}
