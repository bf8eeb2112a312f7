use crate::infra::{parse_date, StaticActorDirectory, TracingDispatcher};
use chrono::NaiveDate;
use clap::Args;
use karin_engine::config::AppConfig;
use karin_engine::error::AppError;
use karin_engine::workflows::karin::{
    ActorDirectory, AdoptedMeasure, Authority, CaseId, CaseStore, CounterStore, DayCountMode,
    DtResolution, FinalReport, InMemoryCaseStore, InMemoryCounterStore, Interview,
    InvestigationPlan, InvestigationReport, KarinCase, KarinProcessService, MeasureStatus,
    NotificationDispatcher, NotificationDraft, NotificationMethod, ProcessUpdate, ServiceError,
    SignatureState, Stage, StageData, Testimony,
};
use std::collections::BTreeMap;
use std::sync::Arc;

const DEMO_CASE: &str = "karin-demo-001";
const INVESTIGATOR: &str = "usr-inv";
const HR_MANAGER: &str = "usr-hr";

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Date the complaint is filed (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date, default_value = "2024-01-02")]
    pub(crate) start: NaiveDate,
    /// Date used for the deadline snapshot (defaults to the investigation start)
    #[arg(long, value_parser = parse_date)]
    pub(crate) today: Option<NaiveDate>,
    /// Print the audit CSV at the end of the walkthrough
    #[arg(long)]
    pub(crate) audit: bool,
}

#[derive(Args, Debug)]
pub(crate) struct DeadlinesArgs {
    /// Date the term starts counting from (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    pub(crate) start: NaiveDate,
    /// Only show this stage, e.g. `investigation`
    #[arg(long)]
    pub(crate) stage: Option<Stage>,
    /// Use the extended investigation term
    #[arg(long)]
    pub(crate) extended: bool,
}

pub(crate) fn run_deadline_table(args: DeadlinesArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let calculator = config.statute.calculator();
    let stages = match args.stage {
        Some(stage) => vec![stage],
        None => Stage::ALL.to_vec(),
    };

    println!(
        "Statutory deadlines from {} ({} holidays configured)",
        args.start,
        calculator.calendar().holidays().count()
    );
    for stage in stages {
        let term = calculator.term_for(stage, args.extended);
        println!(
            "- {:<36} {:>22} -> {}",
            stage.label(),
            term.describe(),
            calculator.apply(term, args.start)
        );
    }
    Ok(())
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let cases = Arc::new(InMemoryCaseStore::new());
    cases
        .insert(demo_case())
        .map_err(ServiceError::from)?;
    let dispatcher = Arc::new(TracingDispatcher::default());
    let directory = StaticActorDirectory::default()
        .with_actor(INVESTIGATOR, "Carolina Rojas")
        .with_actor(HR_MANAGER, "Pedro Soto");
    let service = KarinProcessService::new(
        cases,
        Arc::new(InMemoryCounterStore::new()),
        dispatcher.clone(),
        Arc::new(directory),
        config.statute.calculator(),
    );
    let case_id = CaseId(DEMO_CASE.to_string());

    println!("Ley Karin walkthrough for case {DEMO_CASE} (filed {})", args.start);
    let mut walk = Walkthrough::new(&service, case_id.clone(), args.start);
    walk.through_investigation_start()?;

    let snapshot = args.today.unwrap_or(walk.on);
    println!("\nDeadline snapshot on {snapshot}:");
    for deadline in service.active_deadlines(&case_id, snapshot)? {
        println!(
            "  - {:<36} {} -> {} | {} | {} days remaining{}",
            deadline.title,
            deadline.start_date,
            deadline.end_date,
            deadline.status.label(),
            deadline.days_remaining,
            if deadline.is_urgent { " | URGENT" } else { "" }
        );
    }

    walk.through_closure()?;

    let compliance = service.compliance_status(&case_id)?;
    println!(
        "\nCompliance: {}/{} items ({}% of required)",
        compliance.stats.completed, compliance.stats.total, compliance.stats.required_percentage
    );

    let process = service.process(&case_id)?;
    println!(
        "Closed after {} stage transitions; {} documents registered",
        process.stage_history.len(),
        process.documents.len()
    );

    let mut by_name: BTreeMap<&'static str, usize> = BTreeMap::new();
    for event in dispatcher.recent() {
        *by_name.entry(event.name()).or_default() += 1;
    }
    println!("Events dispatched:");
    for (name, count) in by_name {
        println!("  - {name}: {count}");
    }

    if args.audit {
        println!("\nAudit export:\n{}", service.audit_export(&case_id)?);
    }
    Ok(())
}

fn demo_case() -> KarinCase {
    KarinCase {
        id: CaseId(DEMO_CASE.to_string()),
        code: "KRN00001".to_string(),
        company_id: "demo-company".to_string(),
        is_karin_case: true,
        process: None,
    }
}

/// Drives one case through the procedure, one business day per step.
struct Walkthrough<'a, S, C, N, D> {
    service: &'a KarinProcessService<S, C, N, D>,
    case_id: CaseId,
    on: NaiveDate,
}

impl<'a, S, C, N, D> Walkthrough<'a, S, C, N, D>
where
    S: CaseStore + 'static,
    C: CounterStore + 'static,
    N: NotificationDispatcher + 'static,
    D: ActorDirectory + 'static,
{
    fn new(service: &'a KarinProcessService<S, C, N, D>, case_id: CaseId, on: NaiveDate) -> Self {
        Self {
            service,
            case_id,
            on,
        }
    }

    fn through_investigation_start(&mut self) -> Result<(), ServiceError> {
        self.service.open_process(&self.case_id, self.on)?;
        self.document("acta", "Acta de recepción de denuncia")?;
        self.advance(None)?;

        self.update(ProcessUpdate::InformRights)?;
        self.advance(Some("Derechos informados por escrito"))?;

        self.update(ProcessUpdate::PrecautionaryMeasures {
            measures: vec!["separacion_espacios".to_string()],
            justification: Some("Denunciante y denunciado comparten oficina".to_string()),
        })?;
        self.advance(None)?;

        self.update(ProcessUpdate::InvestigationPlan {
            plan: InvestigationPlan {
                investigator_id: INVESTIGATOR.to_string(),
                summary: "Entrevistas a las partes y revisión de correos".to_string(),
                scheduled_interviews: vec!["Denunciante".to_string(), "Denunciado".to_string()],
                referred_to_dt: false,
            },
        })?;
        self.advance(Some("Se designa investigadora interna"))?;
        Ok(())
    }

    fn through_closure(&mut self) -> Result<(), ServiceError> {
        self.update(ProcessUpdate::Interview {
            interview: Interview {
                id: "int-1".to_string(),
                interviewee: "Denunciante".to_string(),
                date: self.on,
                summary: "Relata hechos reiterados".to_string(),
            },
        })?;
        self.update(ProcessUpdate::Testimony {
            testimony: Testimony {
                id: "tes-1".to_string(),
                deponent: "Testigo".to_string(),
                date: self.on,
                signature: SignatureState::Signed,
            },
        })?;
        self.document("declaracion", "Declaración de testigo")?;
        self.advance(None)?;

        self.update(ProcessUpdate::Report {
            report: InvestigationReport {
                author_id: INVESTIGATOR.to_string(),
                drafted_on: self.on,
                conclusions: "Hechos acreditados".to_string(),
                proposed_measures: vec!["Amonestación escrita".to_string()],
            },
        })?;
        self.advance(None)?;

        self.update(ProcessUpdate::ApproveReport)?;
        self.advance(None)?;

        self.notify(Authority::Dt)?;
        self.advance(None)?;
        self.notify(Authority::Suseso)?;
        self.advance(None)?;
        self.advance(None)?;

        self.update(ProcessUpdate::FinalReport {
            report: FinalReport {
                issued_on: self.on,
                summary: "Se acreditan los hechos denunciados".to_string(),
                sanctions: vec!["Amonestación escrita".to_string()],
            },
        })?;
        self.advance(None)?;
        self.advance(None)?;

        self.update(ProcessUpdate::DtResolution {
            resolution: DtResolution {
                received_on: self.on,
                outcome: "Conforme".to_string(),
                resolution_number: None,
            },
        })?;
        self.advance(None)?;

        self.update(ProcessUpdate::Measure {
            measure: AdoptedMeasure {
                id: "med-1".to_string(),
                description: "Amonestación escrita".to_string(),
                responsible: "Gerencia de personas".to_string(),
                due_date: None,
                status: MeasureStatus::Pending,
            },
        })?;
        self.update(ProcessUpdate::MeasureStatus {
            id: "med-1".to_string(),
            status: MeasureStatus::Implemented,
        })?;
        self.advance(Some("Medidas implementadas"))?;
        Ok(())
    }

    fn advance(&mut self, notes: Option<&str>) -> Result<(), ServiceError> {
        let change = self.service.advance_stage(
            &self.case_id,
            INVESTIGATOR,
            notes.map(str::to_string),
            self.on,
            StageData::default(),
        )?;
        println!(
            "- {}: {} -> {} (due {})",
            change.entered_on,
            change.from.label(),
            change.to.label(),
            change.deadline
        );
        self.on = self
            .service
            .calculator()
            .calendar()
            .add_days(self.on, 1, DayCountMode::Administrative);
        Ok(())
    }

    fn update(&self, update: ProcessUpdate) -> Result<(), ServiceError> {
        self.service.apply_update(&self.case_id, update)?;
        Ok(())
    }

    fn notify(&self, authority: Authority) -> Result<(), ServiceError> {
        let record = self.service.record_notification(
            &self.case_id,
            authority,
            NotificationDraft {
                date: self.on,
                method: NotificationMethod::Email,
                contact_person: None,
                tracking_number: None,
                document_id: None,
                proof_of_delivery_id: None,
                status: None,
                notified_by: HR_MANAGER.to_string(),
                notified_by_name: None,
            },
        )?;
        println!(
            "  {} notified ({}) by {}",
            authority.label(),
            record.id,
            record.notified_by_name
        );
        Ok(())
    }

    fn document(&self, document_type: &str, title: &str) -> Result<(), ServiceError> {
        let document =
            self.service
                .register_document(&self.case_id, document_type, title, self.on)?;
        println!("  folio {} issued for '{}'", document.folio, document.title);
        Ok(())
    }
}
