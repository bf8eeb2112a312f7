use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Statutory stages of a Ley Karin investigation.
///
/// Declaration order matches [`Stage::rank`], so the derived `Ord` can key
/// ordered maps and agrees with every progress comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    ComplaintFiled,
    Reception,
    Subsanation,
    PrecautionaryMeasures,
    DecisionToInvestigate,
    Investigation,
    ReportCreation,
    ReportApproval,
    DtNotification,
    SusesoNotification,
    InvestigationComplete,
    FinalReport,
    DtSubmission,
    DtResolution,
    MeasuresAdoption,
    Closed,
}

impl Stage {
    pub const ALL: [Self; 16] = [
        Self::ComplaintFiled,
        Self::Reception,
        Self::Subsanation,
        Self::PrecautionaryMeasures,
        Self::DecisionToInvestigate,
        Self::Investigation,
        Self::ReportCreation,
        Self::ReportApproval,
        Self::DtNotification,
        Self::SusesoNotification,
        Self::InvestigationComplete,
        Self::FinalReport,
        Self::DtSubmission,
        Self::DtResolution,
        Self::MeasuresAdoption,
        Self::Closed,
    ];

    /// Canonical path from filing to closure, without the subsanation branch.
    pub fn main_line() -> impl Iterator<Item = Self> {
        Self::ALL
            .into_iter()
            .filter(|stage| *stage != Self::Subsanation)
    }

    /// Total order on a doubled scale: main-line stages sit on even ranks and
    /// subsanation on the odd rank between reception and precautionary measures.
    pub const fn rank(self) -> u8 {
        match self {
            Self::ComplaintFiled => 0,
            Self::Reception => 2,
            Self::Subsanation => 3,
            Self::PrecautionaryMeasures => 4,
            Self::DecisionToInvestigate => 6,
            Self::Investigation => 8,
            Self::ReportCreation => 10,
            Self::ReportApproval => 12,
            Self::DtNotification => 14,
            Self::SusesoNotification => 16,
            Self::InvestigationComplete => 18,
            Self::FinalReport => 20,
            Self::DtSubmission => 22,
            Self::DtResolution => 24,
            Self::MeasuresAdoption => 26,
            Self::Closed => 28,
        }
    }

    /// Position on the main line. Subsanation does not advance the count.
    pub const fn step(self) -> u8 {
        self.rank() / 2
    }

    pub const fn final_step() -> u8 {
        Self::Closed.step()
    }

    /// Share of the main line already covered, 0 to 100.
    pub fn progress_percent(self) -> u8 {
        let ratio = f64::from(self.step()) / f64::from(Self::final_step());
        (ratio * 100.0).round().clamp(0.0, 100.0) as u8
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Closed)
    }

    pub const fn next(self) -> Self {
        match self {
            Self::ComplaintFiled => Self::Reception,
            Self::Reception | Self::Subsanation => Self::PrecautionaryMeasures,
            Self::PrecautionaryMeasures => Self::DecisionToInvestigate,
            Self::DecisionToInvestigate => Self::Investigation,
            Self::Investigation => Self::ReportCreation,
            Self::ReportCreation => Self::ReportApproval,
            Self::ReportApproval => Self::DtNotification,
            Self::DtNotification => Self::SusesoNotification,
            Self::SusesoNotification => Self::InvestigationComplete,
            Self::InvestigationComplete => Self::FinalReport,
            Self::FinalReport => Self::DtSubmission,
            Self::DtSubmission => Self::DtResolution,
            Self::DtResolution => Self::MeasuresAdoption,
            Self::MeasuresAdoption | Self::Closed => Self::Closed,
        }
    }

    pub const fn key(self) -> &'static str {
        match self {
            Self::ComplaintFiled => "complaint_filed",
            Self::Reception => "reception",
            Self::Subsanation => "subsanation",
            Self::PrecautionaryMeasures => "precautionary_measures",
            Self::DecisionToInvestigate => "decision_to_investigate",
            Self::Investigation => "investigation",
            Self::ReportCreation => "report_creation",
            Self::ReportApproval => "report_approval",
            Self::DtNotification => "dt_notification",
            Self::SusesoNotification => "suseso_notification",
            Self::InvestigationComplete => "investigation_complete",
            Self::FinalReport => "final_report",
            Self::DtSubmission => "dt_submission",
            Self::DtResolution => "dt_resolution",
            Self::MeasuresAdoption => "measures_adoption",
            Self::Closed => "closed",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::ComplaintFiled => "Denuncia Interpuesta",
            Self::Reception => "Recepción de Denuncia",
            Self::Subsanation => "Subsanación de Denuncia",
            Self::PrecautionaryMeasures => "Medidas de Resguardo",
            Self::DecisionToInvestigate => "Decisión de Investigar",
            Self::Investigation => "Investigación",
            Self::ReportCreation => "Elaboración de Informe",
            Self::ReportApproval => "Aprobación de Informe",
            Self::DtNotification => "Notificación a la DT",
            Self::SusesoNotification => "Notificación a SUSESO/Mutualidad",
            Self::InvestigationComplete => "Investigación Completada",
            Self::FinalReport => "Informe Final",
            Self::DtSubmission => "Envío a la DT",
            Self::DtResolution => "Resolución de la DT",
            Self::MeasuresAdoption => "Adopción de Medidas",
            Self::Closed => "Cerrado",
        }
    }

    pub const fn description(self) -> &'static str {
        match self {
            Self::ComplaintFiled => {
                "La denuncia fue ingresada y debe ser recepcionada formalmente."
            }
            Self::Reception => {
                "Se recepciona la denuncia y se informa a la persona denunciante de sus derechos."
            }
            Self::Subsanation => {
                "La denuncia presenta omisiones y se solicita su corrección antes de continuar."
            }
            Self::PrecautionaryMeasures => {
                "Se adoptan medidas de resguardo para proteger a las personas involucradas."
            }
            Self::DecisionToInvestigate => {
                "Se decide si la investigación será interna o derivada a la Dirección del Trabajo."
            }
            Self::Investigation => "Se realizan entrevistas y se recaban declaraciones firmadas.",
            Self::ReportCreation => {
                "Se redacta el informe de investigación con conclusiones y propuestas."
            }
            Self::ReportApproval => {
                "El informe es revisado y aprobado antes de notificar a las autoridades."
            }
            Self::DtNotification => {
                "Se notifica a la Dirección del Trabajo el resultado de la investigación."
            }
            Self::SusesoNotification => {
                "Se notifica a SUSESO o al organismo administrador de la ley 16.744."
            }
            Self::InvestigationComplete => "La etapa investigativa ha concluido.",
            Self::FinalReport => {
                "Se emite el informe final con las medidas y sanciones propuestas."
            }
            Self::DtSubmission => "El expediente completo es remitido a la Dirección del Trabajo.",
            Self::DtResolution => "La Dirección del Trabajo se pronuncia sobre el procedimiento.",
            Self::MeasuresAdoption => {
                "Se implementan las medidas y sanciones dentro de 15 días corridos."
            }
            Self::Closed => "El procedimiento se encuentra cerrado.",
        }
    }

    /// Case status shown in listings and search. Display only.
    pub const fn status_label(self) -> &'static str {
        match self {
            Self::ComplaintFiled | Self::Reception => "Denuncia recibida",
            Self::Subsanation => "Pendiente de subsanación",
            Self::PrecautionaryMeasures | Self::DecisionToInvestigate => "En evaluación",
            Self::Investigation => "En investigación",
            Self::ReportCreation | Self::ReportApproval => "Informe en preparación",
            Self::DtNotification | Self::SusesoNotification => "Notificando autoridades",
            Self::InvestigationComplete | Self::FinalReport => "Investigación finalizada",
            Self::DtSubmission | Self::DtResolution => "En revisión DT",
            Self::MeasuresAdoption => "Adoptando medidas",
            Self::Closed => "Cerrado",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown stage '{0}'")]
pub struct UnknownStage(pub String);

impl FromStr for Stage {
    type Err = UnknownStage;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let key = value.trim();
        Self::ALL
            .into_iter()
            .find(|stage| stage.key() == key)
            .ok_or_else(|| UnknownStage(key.to_string()))
    }
}
