use super::ledger::AuthorityNotifications;
use super::stage::Stage;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Identifier of the surrounding case document.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CaseId(pub String);

impl fmt::Display for CaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The engine's view of an investigation case owned by the wider application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KarinCase {
    pub id: CaseId,
    /// External reference printed on folios, e.g. `ABC12345`.
    pub code: String,
    pub company_id: String,
    pub is_karin_case: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub process: Option<KarinProcess>,
}

/// One audit entry per stage left behind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageHistoryEntry {
    pub stage: Stage,
    pub date: NaiveDate,
    pub actor_id: String,
    pub actor_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvestigationPlan {
    pub investigator_id: String,
    pub summary: String,
    #[serde(default)]
    pub scheduled_interviews: Vec<String>,
    /// Whether the investigation was handed over to the Dirección del Trabajo.
    #[serde(default)]
    pub referred_to_dt: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interview {
    pub id: String,
    pub interviewee: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub summary: String,
}

/// Signature workflow of a formal testimony.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignatureState {
    Draft,
    PendingSignature,
    Signed,
    Verified,
}

impl SignatureState {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Draft => "Borrador",
            Self::PendingSignature => "Pendiente de firma",
            Self::Signed => "Firmada",
            Self::Verified => "Verificada",
        }
    }

    pub const fn is_signed(self) -> bool {
        matches!(self, Self::Signed | Self::Verified)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Testimony {
    pub id: String,
    pub deponent: String,
    pub date: NaiveDate,
    pub signature: SignatureState,
}

impl Testimony {
    pub fn has_signed(&self) -> bool {
        self.signature.is_signed()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeasureStatus {
    Pending,
    InProgress,
    Implemented,
    Verified,
}

impl MeasureStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "Pendiente",
            Self::InProgress => "En curso",
            Self::Implemented => "Implementada",
            Self::Verified => "Verificada",
        }
    }

    pub const fn is_done(self) -> bool {
        matches!(self, Self::Implemented | Self::Verified)
    }
}

/// Corrective measure or sanction adopted after the investigation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdoptedMeasure {
    pub id: String,
    pub description: String,
    pub responsible: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    pub status: MeasureStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvestigationReport {
    pub author_id: String,
    pub drafted_on: NaiveDate,
    pub conclusions: String,
    #[serde(default)]
    pub proposed_measures: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevisionStatus {
    ChangesRequested,
    Approved,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportRevision {
    pub date: NaiveDate,
    pub reviewer: String,
    pub comments: String,
    pub status: RevisionStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalReport {
    pub issued_on: NaiveDate,
    pub summary: String,
    #[serde(default)]
    pub sanctions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DtResolution {
    pub received_on: NaiveDate,
    pub outcome: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution_number: Option<String>,
}

/// Document stamped with a folio from the per-company counter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisteredDocument {
    pub folio: String,
    pub document_type: String,
    pub title: String,
    pub registered_on: NaiveDate,
    /// Set when the folio came from the timestamp fallback.
    #[serde(default)]
    pub degraded_folio: bool,
}

/// Engine-owned state of a Ley Karin procedure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KarinProcess {
    pub stage: Stage,
    pub status_label: String,
    pub created_on: NaiveDate,
    #[serde(default)]
    pub stage_history: Vec<StageHistoryEntry>,
    #[serde(default)]
    pub stage_dates: BTreeMap<Stage, NaiveDate>,
    #[serde(default)]
    pub deadlines: BTreeMap<Stage, NaiveDate>,
    #[serde(default)]
    pub investigation_extended: bool,
    #[serde(default)]
    pub informed_rights: bool,
    #[serde(default)]
    pub precautionary_measures: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precautionary_measures_justification: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub investigation_plan: Option<InvestigationPlan>,
    #[serde(default)]
    pub interviews: Vec<Interview>,
    #[serde(default)]
    pub testimonies: Vec<Testimony>,
    #[serde(default)]
    pub notifications: AuthorityNotifications,
    #[serde(default)]
    pub measures_adopted: Vec<AdoptedMeasure>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report: Option<InvestigationReport>,
    #[serde(default)]
    pub report_revisions: Vec<ReportRevision>,
    #[serde(default)]
    pub report_approved: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_report: Option<FinalReport>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dt_resolution: Option<DtResolution>,
    #[serde(default)]
    pub documents: Vec<RegisteredDocument>,
}

impl KarinProcess {
    /// Fresh procedure at `complaint_filed`, dated on the case creation day.
    pub fn open(created_on: NaiveDate) -> Self {
        let mut stage_dates = BTreeMap::new();
        stage_dates.insert(Stage::ComplaintFiled, created_on);

        Self {
            stage: Stage::ComplaintFiled,
            status_label: Stage::ComplaintFiled.status_label().to_string(),
            created_on,
            stage_history: Vec::new(),
            stage_dates,
            deadlines: BTreeMap::new(),
            investigation_extended: false,
            informed_rights: false,
            precautionary_measures: BTreeSet::new(),
            precautionary_measures_justification: None,
            investigation_plan: None,
            interviews: Vec::new(),
            testimonies: Vec::new(),
            notifications: AuthorityNotifications::default(),
            measures_adopted: Vec::new(),
            report: None,
            report_revisions: Vec::new(),
            report_approved: false,
            final_report: None,
            dt_resolution: None,
            documents: Vec::new(),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.stage.is_terminal()
    }

    /// Date the given stage was entered, if it ever was.
    pub fn entered_on(&self, stage: Stage) -> Option<NaiveDate> {
        self.stage_dates.get(&stage).copied()
    }

    pub fn deadline(&self, stage: Stage) -> Option<NaiveDate> {
        self.deadlines.get(&stage).copied()
    }

    /// Start date of the current stage: its recorded entry date, else the
    /// latest history entry (the day the previous stage was left), else the
    /// creation date.
    pub fn current_stage_started_on(&self) -> NaiveDate {
        self.entered_on(self.stage)
            .or_else(|| self.stage_history.iter().map(|entry| entry.date).max())
            .unwrap_or(self.created_on)
    }

    pub fn testimonies_signed(&self) -> bool {
        self.testimonies.iter().all(Testimony::has_signed)
    }

    pub fn entered_subsanation(&self) -> bool {
        self.stage_dates.contains_key(&Stage::Subsanation)
    }
}
