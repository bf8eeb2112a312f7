use std::sync::{Arc, Mutex};

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use karin_engine::workflows::karin::{
    ActorDirectory, AdoptedMeasure, Authority, BusinessCalendar, CaseId, DayCountMode,
    DeadlineCalculator, DispatchError, DtResolution, FinalReport, InMemoryCaseStore,
    InMemoryCounterStore, Interview, InvalidTransition, InvestigationPlan, InvestigationReport,
    KarinCase, KarinEvent, KarinProcessService, MeasureStatus, NotificationDispatcher,
    NotificationDraft, NotificationMethod, ProcessError, ProcessUpdate, ServiceError,
    SignatureState, Stage, StageData, Testimony, TransitionError,
};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

#[derive(Default)]
struct RecordingDispatcher {
    events: Mutex<Vec<KarinEvent>>,
}

impl NotificationDispatcher for RecordingDispatcher {
    fn notify(&self, event: KarinEvent) -> Result<(), DispatchError> {
        self.events
            .lock()
            .expect("dispatcher mutex poisoned")
            .push(event);
        Ok(())
    }
}

struct NoDirectory;

impl ActorDirectory for NoDirectory {
    fn resolve_display_name(&self, _actor_id: &str) -> Option<String> {
        None
    }
}

type Service =
    KarinProcessService<InMemoryCaseStore, InMemoryCounterStore, RecordingDispatcher, NoDirectory>;

fn service() -> (Service, Arc<RecordingDispatcher>) {
    let store = Arc::new(InMemoryCaseStore::new());
    store
        .insert(KarinCase {
            id: CaseId("karin-2024-017".to_string()),
            code: "KRN00017".to_string(),
            company_id: "acme".to_string(),
            is_karin_case: true,
            process: None,
        })
        .expect("seed case");
    let dispatcher = Arc::new(RecordingDispatcher::default());
    let service = KarinProcessService::new(
        store,
        Arc::new(InMemoryCounterStore::new()),
        dispatcher.clone(),
        Arc::new(NoDirectory),
        DeadlineCalculator::default(),
    );
    (service, dispatcher)
}

fn id() -> CaseId {
    CaseId("karin-2024-017".to_string())
}

fn step(service: &Service, on: NaiveDate) -> Stage {
    service
        .advance_stage(&id(), "usr-7", None, on, StageData::default())
        .expect("advance allowed")
        .to
}

fn update(service: &Service, update: ProcessUpdate) {
    service.apply_update(&id(), update).expect("update applied");
}

fn notify(service: &Service, authority: Authority, on: NaiveDate) {
    service
        .record_notification(
            &id(),
            authority,
            NotificationDraft {
                date: on,
                method: NotificationMethod::Email,
                contact_person: None,
                tracking_number: None,
                document_id: None,
                proof_of_delivery_id: None,
                status: None,
                notified_by: "usr-7".to_string(),
                notified_by_name: Some("Encargada de cumplimiento".to_string()),
            },
        )
        .expect("notification recorded");
}

#[test]
fn business_day_arithmetic_round_trips_for_every_start_day() {
    let calendar = BusinessCalendar::new();
    let mut start = date(2024, 1, 1);
    for _ in 0..21 {
        for n in 0..25 {
            let end = calendar.add_days(start, n, DayCountMode::Administrative);
            if n > 0 {
                assert!(
                    !matches!(end.weekday(), Weekday::Sat | Weekday::Sun),
                    "{start} + {n} landed on {end}"
                );
            }
            assert_eq!(
                calendar.count_days(start, end, DayCountMode::Administrative),
                i64::from(n)
            );
        }
        start += Duration::days(1);
    }
}

#[test]
fn counts_are_antisymmetric_on_pinned_dates() {
    let calendar = BusinessCalendar::new();
    let monday = date(2024, 3, 4);
    let next_wednesday = date(2024, 3, 13);
    assert_eq!(
        calendar.count_days(monday, next_wednesday, DayCountMode::Administrative),
        7
    );
    assert_eq!(
        calendar.count_days(next_wednesday, monday, DayCountMode::Administrative),
        -7
    );
    assert_eq!(
        calendar.count_days(monday, next_wednesday, DayCountMode::Calendar),
        -calendar.count_days(next_wednesday, monday, DayCountMode::Calendar)
    );
}

#[test]
fn reception_deadline_on_monday_filing() {
    let calculator = DeadlineCalculator::default();
    assert_eq!(
        calculator.deadline_for(Stage::Reception, date(2024, 3, 4), false),
        date(2024, 3, 7)
    );
}

#[test]
fn stage_ranks_increase_along_the_main_line() {
    let ranks: Vec<u8> = Stage::main_line().map(Stage::rank).collect();
    assert!(ranks.windows(2).all(|pair| pair[0] < pair[1]));
    assert_eq!(Stage::main_line().last(), Some(Stage::Closed));
}

#[test]
fn full_procedure_from_complaint_to_closure() {
    let (service, dispatcher) = service();
    service
        .open_process(&id(), date(2024, 1, 2))
        .expect("process opened");

    assert_eq!(step(&service, date(2024, 1, 2)), Stage::Reception);
    update(&service, ProcessUpdate::InformRights);
    assert_eq!(step(&service, date(2024, 1, 3)), Stage::PrecautionaryMeasures);
    update(
        &service,
        ProcessUpdate::PrecautionaryMeasures {
            measures: vec!["redistribucion_jornada".to_string()],
            justification: None,
        },
    );
    assert_eq!(step(&service, date(2024, 1, 4)), Stage::DecisionToInvestigate);

    let missing_plan = service
        .advance_stage(
            &id(),
            "usr-7",
            Some("Se designa investigadora interna".to_string()),
            date(2024, 1, 5),
            StageData::default(),
        )
        .expect_err("plan missing");
    assert!(missing_plan.to_string().contains("investigation plan"));

    update(
        &service,
        ProcessUpdate::InvestigationPlan {
            plan: InvestigationPlan {
                investigator_id: "usr-9".to_string(),
                summary: "Entrevistas y revisión de correos".to_string(),
                scheduled_interviews: Vec::new(),
                referred_to_dt: false,
            },
        },
    );
    assert_eq!(step(&service, date(2024, 1, 5)), Stage::Investigation);
    update(
        &service,
        ProcessUpdate::Interview {
            interview: Interview {
                id: "int-1".to_string(),
                interviewee: "Denunciante".to_string(),
                date: date(2024, 1, 10),
                summary: String::new(),
            },
        },
    );
    update(
        &service,
        ProcessUpdate::Testimony {
            testimony: Testimony {
                id: "tes-1".to_string(),
                deponent: "Testigo".to_string(),
                date: date(2024, 1, 12),
                signature: SignatureState::PendingSignature,
            },
        },
    );
    let blocked = service
        .advance_stage(&id(), "usr-7", None, date(2024, 2, 1), StageData::default())
        .expect_err("unsigned testimony");
    assert!(blocked.to_string().contains("tes-1"));
    update(
        &service,
        ProcessUpdate::TestimonySignature {
            id: "tes-1".to_string(),
            state: SignatureState::Signed,
        },
    );

    let report = service
        .advance_stage(
            &id(),
            "usr-7",
            None,
            date(2024, 2, 1),
            StageData {
                report: Some(InvestigationReport {
                    author_id: "usr-9".to_string(),
                    drafted_on: date(2024, 2, 1),
                    conclusions: "Conductas acreditadas".to_string(),
                    proposed_measures: vec!["Amonestación".to_string()],
                }),
                ..StageData::default()
            },
        )
        .expect("to report creation");
    assert_eq!(report.to, Stage::ReportCreation);
    assert_eq!(step(&service, date(2024, 2, 2)), Stage::ReportApproval);
    update(&service, ProcessUpdate::ApproveReport);
    assert_eq!(step(&service, date(2024, 2, 6)), Stage::DtNotification);
    notify(&service, Authority::Dt, date(2024, 2, 7));
    assert_eq!(step(&service, date(2024, 2, 7)), Stage::SusesoNotification);
    notify(&service, Authority::Suseso, date(2024, 2, 8));
    assert_eq!(step(&service, date(2024, 2, 8)), Stage::InvestigationComplete);
    assert_eq!(step(&service, date(2024, 2, 9)), Stage::FinalReport);
    update(
        &service,
        ProcessUpdate::FinalReport {
            report: FinalReport {
                issued_on: date(2024, 2, 12),
                summary: "Se acreditan los hechos denunciados".to_string(),
                sanctions: vec!["Amonestación escrita".to_string()],
            },
        },
    );
    assert_eq!(step(&service, date(2024, 2, 12)), Stage::DtSubmission);
    assert_eq!(step(&service, date(2024, 2, 13)), Stage::DtResolution);
    update(
        &service,
        ProcessUpdate::DtResolution {
            resolution: DtResolution {
                received_on: date(2024, 3, 1),
                outcome: "Conforme".to_string(),
                resolution_number: Some("ORD-118".to_string()),
            },
        },
    );
    assert_eq!(step(&service, date(2024, 3, 4)), Stage::MeasuresAdoption);
    update(
        &service,
        ProcessUpdate::Measure {
            measure: AdoptedMeasure {
                id: "med-1".to_string(),
                description: "Amonestación escrita".to_string(),
                responsible: "Gerencia de personas".to_string(),
                due_date: Some(date(2024, 3, 15)),
                status: MeasureStatus::Pending,
            },
        },
    );
    update(
        &service,
        ProcessUpdate::MeasureStatus {
            id: "med-1".to_string(),
            status: MeasureStatus::Implemented,
        },
    );

    let compliance = service.compliance_status(&id()).expect("compliance");
    assert!(compliance.stats.blocking.is_empty(), "{:?}", compliance.stats);
    assert_eq!(compliance.stats.required_percentage, 100);

    assert_eq!(step(&service, date(2024, 3, 18)), Stage::Closed);
    let info = service.stage_info(&id()).expect("stage info");
    assert_eq!(info.progress_percent, 100);
    assert!(!info.can_advance);

    let process = service.process(&id()).expect("process");
    assert_eq!(process.stage_history.len(), 14);
    assert_eq!(process.deadline(Stage::DtResolution), Some(date(2024, 3, 5)));

    match service.advance_stage(&id(), "usr-7", None, date(2024, 3, 19), StageData::default()) {
        Err(ServiceError::Transition(TransitionError::Invalid(InvalidTransition::Terminal))) => {}
        other => panic!("closed must be terminal, got {other:?}"),
    }
    match service.apply_update(&id(), ProcessUpdate::InformRights) {
        Err(ServiceError::Process(ProcessError::Closed)) => {}
        other => panic!("closed process is read-only, got {other:?}"),
    }
    assert_eq!(
        service.process(&id()).expect("process").stage_history.len(),
        14
    );

    let events = dispatcher.events.lock().expect("dispatcher mutex poisoned");
    assert!(events
        .iter()
        .any(|event| matches!(event, KarinEvent::ReportReviewRequired { .. })));
    assert_eq!(
        events
            .iter()
            .filter(|event| matches!(event, KarinEvent::NotificationRecorded { .. }))
            .count(),
        2
    );
}

#[test]
fn subsanation_branch_rejoins_main_line() {
    let (service, dispatcher) = service();
    service
        .open_process(&id(), date(2024, 3, 4))
        .expect("process opened");
    step(&service, date(2024, 3, 4));

    let change = service
        .enter_subsanation(
            &id(),
            "usr-7",
            Some("Falta identificación de la persona denunciada".to_string()),
            date(2024, 3, 5),
        )
        .expect("subsanation from reception");
    assert_eq!(change.to, Stage::Subsanation);
    assert_eq!(change.deadline, date(2024, 3, 12));

    assert_eq!(step(&service, date(2024, 3, 8)), Stage::PrecautionaryMeasures);
    let info = service.stage_info(&id()).expect("stage info");
    assert_eq!(info.step, Stage::PrecautionaryMeasures.step());

    let again = service.enter_subsanation(&id(), "usr-7", None, date(2024, 3, 8));
    assert!(matches!(
        again,
        Err(ServiceError::Transition(TransitionError::Invalid(
            InvalidTransition::SubsanationNotAllowed { .. }
        )))
    ));

    let events = dispatcher.events.lock().expect("dispatcher mutex poisoned");
    assert!(events
        .iter()
        .any(|event| matches!(event, KarinEvent::SubsanationRequested { .. })));
}

#[test]
fn concurrent_document_registration_issues_distinct_folios() {
    let (service, _) = service();
    service
        .open_process(&id(), date(2024, 3, 4))
        .expect("process opened");
    let service = Arc::new(service);

    let folios: Vec<String> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..6)
            .map(|_| {
                let service = Arc::clone(&service);
                scope.spawn(move || {
                    service
                        .allocate_folio(&id(), "declaracion")
                        .expect("folio allocated")
                        .value
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().expect("thread completes"))
            .collect()
    });

    let mut sorted = folios;
    sorted.sort();
    sorted.dedup();
    assert_eq!(sorted.len(), 6);
    assert_eq!(sorted.first().map(String::as_str), Some("DECL-KRN00017-001"));
    assert_eq!(sorted.last().map(String::as_str), Some("DECL-KRN00017-006"));
}
