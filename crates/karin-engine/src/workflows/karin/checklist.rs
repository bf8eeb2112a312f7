use super::domain::{KarinProcess, MeasureStatus};
use super::ledger::Authority;
use super::stage::Stage;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplianceCategory {
    Reception,
    Protection,
    Investigation,
    Reporting,
    Authorities,
    Closure,
}

impl ComplianceCategory {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Reception => "Recepción",
            Self::Protection => "Protección",
            Self::Investigation => "Investigación",
            Self::Reporting => "Informes",
            Self::Authorities => "Autoridades",
            Self::Closure => "Cierre",
        }
    }
}

/// Checklist entry derived from the process on every read. Never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComplianceItem {
    pub id: &'static str,
    pub title: &'static str,
    pub required: bool,
    pub completed: bool,
    pub stage: Stage,
    pub deadline_description: &'static str,
    pub priority: Priority,
    pub category: ComplianceCategory,
}

struct ItemTemplate {
    id: &'static str,
    title: &'static str,
    required: bool,
    stage: Stage,
    deadline_description: &'static str,
    priority: Priority,
    category: ComplianceCategory,
    completed: fn(&KarinProcess) -> bool,
}

const TEMPLATES: [ItemTemplate; 16] = [
    ItemTemplate {
        id: "complaint_registered",
        title: "Denuncia registrada",
        required: true,
        stage: Stage::ComplaintFiled,
        deadline_description: "Al momento de recibir la denuncia",
        priority: Priority::High,
        category: ComplianceCategory::Reception,
        completed: |process| process.entered_on(Stage::ComplaintFiled).is_some(),
    },
    ItemTemplate {
        id: "reception_acknowledged",
        title: "Recepción formal de la denuncia",
        required: true,
        stage: Stage::Reception,
        deadline_description: "1 día hábil desde la denuncia",
        priority: Priority::Medium,
        category: ComplianceCategory::Reception,
        completed: |process| process.entered_on(Stage::Reception).is_some(),
    },
    ItemTemplate {
        id: "rights_informed",
        title: "Derechos informados a la persona denunciante",
        required: true,
        stage: Stage::Reception,
        deadline_description: "3 días hábiles desde la recepción",
        priority: Priority::High,
        category: ComplianceCategory::Reception,
        completed: |process| process.informed_rights,
    },
    ItemTemplate {
        id: "subsanation_resolved",
        title: "Denuncia subsanada",
        required: false,
        stage: Stage::Subsanation,
        deadline_description: "5 días hábiles desde la solicitud",
        priority: Priority::Medium,
        category: ComplianceCategory::Reception,
        completed: |process| process.stage != Stage::Subsanation,
    },
    ItemTemplate {
        id: "precautionary_measures_adopted",
        title: "Medidas de resguardo adoptadas",
        required: true,
        stage: Stage::PrecautionaryMeasures,
        deadline_description: "3 días hábiles desde la recepción",
        priority: Priority::High,
        category: ComplianceCategory::Protection,
        completed: |process| !process.precautionary_measures.is_empty(),
    },
    ItemTemplate {
        id: "precautionary_measures_justified",
        title: "Fundamentación de las medidas de resguardo",
        required: false,
        stage: Stage::PrecautionaryMeasures,
        deadline_description: "Junto con la adopción de medidas",
        priority: Priority::Medium,
        category: ComplianceCategory::Protection,
        completed: |process| {
            process
                .precautionary_measures_justification
                .as_deref()
                .is_some_and(|text| !text.trim().is_empty())
        },
    },
    ItemTemplate {
        id: "investigation_plan",
        title: "Plan de investigación definido",
        required: true,
        stage: Stage::DecisionToInvestigate,
        deadline_description: "3 días hábiles desde la recepción",
        priority: Priority::High,
        category: ComplianceCategory::Investigation,
        completed: |process| process.investigation_plan.is_some(),
    },
    ItemTemplate {
        id: "interviews_conducted",
        title: "Entrevistas realizadas",
        required: true,
        stage: Stage::Investigation,
        deadline_description: "Dentro de los 30 días hábiles de investigación",
        priority: Priority::High,
        category: ComplianceCategory::Investigation,
        completed: |process| !process.interviews.is_empty(),
    },
    ItemTemplate {
        id: "testimonies_signed",
        title: "Declaraciones firmadas",
        required: true,
        stage: Stage::Investigation,
        deadline_description: "Antes de cerrar la investigación",
        priority: Priority::High,
        category: ComplianceCategory::Investigation,
        completed: KarinProcess::testimonies_signed,
    },
    ItemTemplate {
        id: "confidentiality_maintained",
        title: "Confidencialidad resguardada",
        required: true,
        stage: Stage::Investigation,
        deadline_description: "Durante todo el procedimiento",
        priority: Priority::Medium,
        category: ComplianceCategory::Investigation,
        completed: |_| true,
    },
    ItemTemplate {
        id: "report_drafted",
        title: "Informe de investigación redactado",
        required: true,
        stage: Stage::ReportCreation,
        deadline_description: "5 días hábiles desde el cierre de la investigación",
        priority: Priority::High,
        category: ComplianceCategory::Reporting,
        completed: |process| process.report.is_some(),
    },
    ItemTemplate {
        id: "report_approved",
        title: "Informe aprobado",
        required: true,
        stage: Stage::ReportApproval,
        deadline_description: "3 días hábiles desde la entrega del informe",
        priority: Priority::High,
        category: ComplianceCategory::Reporting,
        completed: |process| process.report_approved,
    },
    ItemTemplate {
        id: "dt_notified",
        title: "Dirección del Trabajo notificada",
        required: true,
        stage: Stage::DtNotification,
        deadline_description: "10 días hábiles desde la aprobación del informe",
        priority: Priority::High,
        category: ComplianceCategory::Authorities,
        completed: |process| {
            process
                .notifications
                .initial_notification_date(Authority::Dt)
                .is_some()
        },
    },
    ItemTemplate {
        id: "suseso_notified",
        title: "SUSESO/Mutualidad notificada",
        required: true,
        stage: Stage::SusesoNotification,
        deadline_description: "10 días hábiles desde la aprobación del informe",
        priority: Priority::High,
        category: ComplianceCategory::Authorities,
        completed: |process| {
            process
                .notifications
                .initial_notification_date(Authority::Suseso)
                .is_some()
        },
    },
    ItemTemplate {
        id: "final_report_issued",
        title: "Informe final emitido",
        required: true,
        stage: Stage::FinalReport,
        deadline_description: "Al concluir la investigación",
        priority: Priority::High,
        category: ComplianceCategory::Reporting,
        completed: |process| process.final_report.is_some(),
    },
    ItemTemplate {
        id: "measures_implemented",
        title: "Medidas y sanciones implementadas",
        required: true,
        stage: Stage::MeasuresAdoption,
        deadline_description: "15 días corridos desde el pronunciamiento de la DT",
        priority: Priority::Medium,
        category: ComplianceCategory::Closure,
        completed: |process| {
            !process.measures_adopted.is_empty()
                && process
                    .measures_adopted
                    .iter()
                    .all(|measure| MeasureStatus::is_done(measure.status))
        },
    },
];

/// Aggregate completion over the items active at the current stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChecklistStats {
    pub total: usize,
    pub completed: usize,
    pub required: usize,
    pub completed_required: usize,
    pub percentage: u8,
    pub required_percentage: u8,
    /// Required, active and incomplete items. Non-empty means action is needed.
    pub blocking: Vec<&'static str>,
}

impl ChecklistStats {
    /// Items whose stage lies after `current` are left out of every count.
    pub fn from_items(items: &[ComplianceItem], current: Stage) -> Self {
        let active: Vec<&ComplianceItem> = items
            .iter()
            .filter(|item| item.stage.rank() <= current.rank())
            .collect();

        let total = active.len();
        let completed = active.iter().filter(|item| item.completed).count();
        let required = active.iter().filter(|item| item.required).count();
        let completed_required = active
            .iter()
            .filter(|item| item.required && item.completed)
            .count();
        let blocking = active
            .iter()
            .filter(|item| item.required && !item.completed)
            .map(|item| item.id)
            .collect();

        Self {
            total,
            completed,
            required,
            completed_required,
            percentage: percent(completed, total),
            required_percentage: percent(completed_required, required),
            blocking,
        }
    }

    pub fn is_blocked(&self) -> bool {
        self.required_percentage < 100
    }
}

fn percent(part: usize, whole: usize) -> u8 {
    if whole == 0 {
        return 100;
    }
    ((part as f64 / whole as f64) * 100.0).round() as u8
}

#[derive(Debug, Clone, Default)]
pub struct ComplianceChecklist;

impl ComplianceChecklist {
    pub fn items(&self, process: &KarinProcess) -> Vec<ComplianceItem> {
        TEMPLATES
            .iter()
            .map(|template| ComplianceItem {
                id: template.id,
                title: template.title,
                required: template.required,
                completed: (template.completed)(process),
                stage: template.stage,
                deadline_description: template.deadline_description,
                priority: template.priority,
                category: template.category,
            })
            .collect()
    }

    pub fn evaluate(&self, process: &KarinProcess) -> (Vec<ComplianceItem>, ChecklistStats) {
        let items = self.items(process);
        let stats = ChecklistStats::from_items(&items, process.stage);
        (items, stats)
    }
}
