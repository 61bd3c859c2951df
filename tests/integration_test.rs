use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;
use tokio_test::{assert_err, assert_ok};

use label_ocr_client::config::Config;
use label_ocr_client::error::{InputError, ServiceFailure};
use label_ocr_client::models::{
    ComparisonReport, Decision, Document, ExtractionResult, ProgressTone, RiskLevel,
    ValidationDetails, ValidationResult, VerifiedControl,
};
use label_ocr_client::orchestrator::{App, Command, ThemeChoice};
use label_ocr_client::services::{
    AvailabilityMonitor, ExpectedDurations, MonitorSettings, PreferenceStore, ProgressSettings,
};
use label_ocr_client::workflow::{DocumentFlow, FlowStage, Phase};
use label_ocr_client::{HttpRemoteService, RemoteService};

/// 一次预先安排好的远程调用
struct Step<T> {
    delay: Duration,
    outcome: Result<T, ServiceFailure>,
}

impl<T> Step<T> {
    fn ok(delay_secs: u64, value: T) -> Self {
        Self {
            delay: Duration::from_secs(delay_secs),
            outcome: Ok(value),
        }
    }

    fn fail(delay_secs: u64, message: &str) -> Self {
        Self {
            delay: Duration::from_secs(delay_secs),
            outcome: Err(ServiceFailure::new(message)),
        }
    }
}

/// 按顺序返回预设结果的远程服务
#[derive(Default)]
struct ScriptedService {
    extractions: Mutex<VecDeque<Step<ExtractionResult>>>,
    validations: Mutex<VecDeque<Step<ValidationResult>>>,
    submitted: AtomicUsize,
    validated: Mutex<Vec<String>>,
    online: AtomicBool,
    probes: AtomicUsize,
}

impl ScriptedService {
    fn with_extraction(self, step: Step<ExtractionResult>) -> Self {
        self.extractions.lock().unwrap().push_back(step);
        self
    }

    fn with_validation(self, step: Step<ValidationResult>) -> Self {
        self.validations.lock().unwrap().push_back(step);
        self
    }

    fn online(self, online: bool) -> Self {
        self.online.store(online, Ordering::SeqCst);
        self
    }

    fn submit_count(&self) -> usize {
        self.submitted.load(Ordering::SeqCst)
    }

    fn validated_texts(&self) -> Vec<String> {
        self.validated.lock().unwrap().clone()
    }
}

async fn play<T>(step: Option<Step<T>>) -> Result<T, ServiceFailure> {
    match step {
        Some(step) => {
            tokio::time::sleep(step.delay).await;
            step.outcome
        }
        None => Err(ServiceFailure::new("no scripted response")),
    }
}

impl RemoteService for ScriptedService {
    fn submit_document<'a>(
        &'a self,
        _document: &'a Document,
    ) -> BoxFuture<'a, Result<ExtractionResult, ServiceFailure>> {
        self.submitted.fetch_add(1, Ordering::SeqCst);
        let step = self.extractions.lock().unwrap().pop_front();
        play(step).boxed()
    }

    fn validate_text<'a>(
        &'a self,
        text: &'a str,
    ) -> BoxFuture<'a, Result<ValidationResult, ServiceFailure>> {
        self.validated.lock().unwrap().push(text.to_string());
        let step = self.validations.lock().unwrap().pop_front();
        play(step).boxed()
    }

    fn list_verified_controls(&self) -> BoxFuture<'_, Result<Vec<VerifiedControl>, ServiceFailure>> {
        async { Ok(Vec::new()) }.boxed()
    }

    fn run_comparison<'a>(
        &'a self,
        _document: &'a Document,
    ) -> BoxFuture<'a, Result<ComparisonReport, ServiceFailure>> {
        async {
            Ok(ComparisonReport {
                decision: Decision::Valid,
                similarity_score: 0.93,
                authenticity_score: 0.88,
                validation_details: ValidationDetails::default(),
                extracted_text: None,
            })
        }
        .boxed()
    }

    fn probe_health(&self) -> BoxFuture<'_, bool> {
        async move {
            self.probes.fetch_add(1, Ordering::SeqCst);
            self.online.load(Ordering::SeqCst)
        }
        .boxed()
    }
}

fn settings() -> ProgressSettings {
    ProgressSettings {
        tick: Duration::from_millis(100),
        reset_delay: Duration::from_millis(1500),
        expected: ExpectedDurations {
            image: Duration::from_secs(20),
            paged_document: Duration::from_secs(60),
        },
    }
}

fn text(value: &str, pages: Option<u32>) -> ExtractionResult {
    ExtractionResult {
        text: value.to_string(),
        engine_name: "tesseract".to_string(),
        processing_time_seconds: 2.4,
        pages_processed: pages,
    }
}

fn risk(level: RiskLevel) -> ValidationResult {
    ValidationResult {
        drug_name: Some("Paracetamol".to_string()),
        strength: Some("500mg".to_string()),
        batch_number: Some("B2024-117".to_string()),
        risk_level: level,
        ..ValidationResult::default()
    }
}

fn pdf(name: &str) -> Document {
    Document::new(name, "application/pdf", b"%PDF-1.7".to_vec()).unwrap()
}

fn png(name: &str) -> Document {
    Document::new(name, "image/png", vec![0x89, b'P', b'N', b'G']).unwrap()
}

#[tokio::test(start_paused = true)]
async fn test_pdf_label_completes_with_low_risk() {
    let label = "Paracetamol 500mg\nBatch B2024-117\nExp 12/2026";
    let service = Arc::new(
        ScriptedService::default()
            .with_extraction(Step::ok(2, text(label, Some(3))))
            .with_validation(Step::ok(1, risk(RiskLevel::Low))),
    );
    let flow = DocumentFlow::spawn(service.clone(), settings());

    let id = flow.select(pdf("label.pdf"));
    flow.extract();
    let state = flow.wait_until_settled(id).await;

    assert_eq!(state.phase(), Phase::Completed);
    let extraction = state.extraction().unwrap();
    assert_eq!(extraction.text, label);
    assert_eq!(extraction.pages_processed, Some(3));
    assert_eq!(state.validation().unwrap().risk_level, RiskLevel::Low);
    assert!(state.last_error().is_none());

    // 识别出的文本原样提交校验，且只提交一次
    assert_eq!(service.validated_texts(), vec![label.to_string()]);

    // 识别成功后进度条保持满格，随后重置
    let progress = flow.progress().borrow().clone();
    assert_eq!(progress.fraction, 100.0);
    assert!(progress.terminal);
    assert_eq!(progress.tone, ProgressTone::Success);

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert!(flow.progress().borrow().is_reset());
}

#[tokio::test(start_paused = true)]
async fn test_image_extraction_failure() {
    let service = Arc::new(
        ScriptedService::default().with_extraction(Step::fail(3, "Failed to extract text")),
    );
    let flow = DocumentFlow::spawn(service.clone(), settings());

    let id = flow.select(png("blurry.png"));
    flow.extract();
    let state = flow.wait_until_settled(id).await;

    assert_eq!(state.phase(), Phase::Failed);
    let error = state.last_error().unwrap();
    assert_eq!(error.stage, FlowStage::Extraction);
    assert_eq!(error.message, "Failed to extract text");
    assert!(state.validation().is_none());
    assert!(service.validated_texts().is_empty());

    let progress = flow.progress().borrow().clone();
    assert_eq!(progress.fraction, 100.0);
    assert!(progress.terminal);
    assert_eq!(progress.tone, ProgressTone::Failure);

    tokio::time::sleep(Duration::from_millis(1400)).await;
    assert_eq!(flow.progress().borrow().fraction, 100.0);

    tokio::time::sleep(Duration::from_millis(200)).await;
    let progress = flow.progress().borrow().clone();
    assert_eq!(progress.fraction, 0.0);
    assert!(progress.label.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_empty_text_stops_before_validation() {
    for empty in ["", "  \n\t "] {
        let service = Arc::new(
            ScriptedService::default().with_extraction(Step::ok(1, text(empty, None))),
        );
        let flow = DocumentFlow::spawn(service.clone(), settings());

        let id = flow.select(png("blank.png"));
        flow.extract();
        let state = flow.wait_until_settled(id).await;

        assert_eq!(state.phase(), Phase::Extracted);
        assert!(state.validation().is_none());
        assert!(state.last_error().is_none());

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(flow.snapshot().phase(), Phase::Extracted);
        assert!(service.validated_texts().is_empty());
    }
}

#[tokio::test(start_paused = true)]
async fn test_validation_failure_keeps_extraction() {
    let service = Arc::new(
        ScriptedService::default()
            .with_extraction(Step::ok(1, text("Ibuprofen 200mg", None)))
            .with_validation(Step::fail(1, "validation backend unavailable")),
    );
    let flow = DocumentFlow::spawn(service.clone(), settings());

    let id = flow.select(png("ibuprofen.png"));
    flow.extract();
    let state = flow.wait_until_settled(id).await;

    assert_eq!(state.phase(), Phase::Completed);
    assert_eq!(state.extraction().unwrap().text, "Ibuprofen 200mg");
    assert!(state.validation().is_none());
    let error = state.last_error().unwrap();
    assert_eq!(error.stage, FlowStage::Validation);
    assert_eq!(error.message, "validation backend unavailable");
}

#[tokio::test(start_paused = true)]
async fn test_reselect_discards_stale_response() {
    let service = Arc::new(
        ScriptedService::default()
            .with_extraction(Step::ok(10, text("old label", None)))
            .with_extraction(Step::ok(1, text("new label", None)))
            .with_validation(Step::ok(0, risk(RiskLevel::Medium))),
    );
    let flow = DocumentFlow::spawn(service.clone(), settings());

    let first = flow.select(png("a.png"));
    flow.extract();
    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(flow.snapshot().phase(), Phase::Extracting);
    assert!(flow.progress().borrow().fraction > 0.0);

    let second = flow.select(png("b.png"));
    let mut states = flow.subscribe();
    let selected = states
        .wait_for(|s| s.document_id() == Some(second))
        .await
        .unwrap()
        .clone();
    assert_eq!(selected.phase(), Phase::Selected);
    assert!(selected.extraction().is_none());
    assert!(flow.progress().borrow().is_reset());

    // 旧编号的等待立即以新文档的状态返回
    let superseded = flow.wait_until_settled(first).await;
    assert_eq!(superseded.document_id(), Some(second));

    flow.extract();
    let state = flow.wait_until_settled(second).await;
    assert_eq!(state.phase(), Phase::Completed);
    assert_eq!(state.extraction().unwrap().text, "new label");

    // 旧请求在 t=10s 返回，被丢弃
    tokio::time::sleep(Duration::from_secs(10)).await;
    let after = flow.snapshot();
    assert_eq!(after, state);
    assert_eq!(service.validated_texts(), vec!["new label".to_string()]);
    assert!(flow.progress().borrow().is_reset());
}

#[tokio::test(start_paused = true)]
async fn test_extract_is_ignored_outside_selected() {
    let service = Arc::new(
        ScriptedService::default().with_extraction(Step::ok(1, text("Aspirin", None))),
    );
    let flow = DocumentFlow::spawn(service.clone(), settings());

    flow.extract();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(flow.snapshot().phase(), Phase::Idle);
    assert_eq!(service.submit_count(), 0);

    flow.select(png("aspirin.png"));
    flow.extract();
    flow.extract();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(service.submit_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_progress_freezes_near_ceiling_on_slow_backend() {
    let service = Arc::new(
        ScriptedService::default().with_extraction(Step::ok(40, text("Amoxicillin", None))),
    );
    let flow = DocumentFlow::spawn(service.clone(), settings());

    let id = flow.select(png("slow.png"));
    flow.extract();

    tokio::time::sleep(Duration::from_millis(10_050)).await;
    let halfway = flow.progress().borrow().clone();
    assert!(halfway.fraction > 45.0 && halfway.fraction < 55.0);
    assert_eq!(halfway.tone, ProgressTone::Working);

    tokio::time::sleep(Duration::from_secs(20)).await;
    let stalled = flow.progress().borrow().clone();
    assert_eq!(stalled.fraction, 95.0);
    assert_eq!(stalled.tone, ProgressTone::Pulsing);
    assert!(!stalled.terminal);

    flow.wait_until_settled(id).await;
    assert_eq!(flow.progress().borrow().fraction, 100.0);
}

#[tokio::test(start_paused = true)]
async fn test_rejected_uploads_do_not_change_state() {
    let service = Arc::new(ScriptedService::default());
    let flow = DocumentFlow::spawn(service.clone(), settings());

    let err = assert_err!(flow.select_upload("notes.txt", "text/plain", b"hello".to_vec()));
    assert_eq!(
        err,
        InputError::UnsupportedMediaType {
            content_type: "text/plain".to_string()
        }
    );

    for content_type in ["image/webp", "image/gif"] {
        let err = assert_err!(flow.select_upload("scan", content_type, vec![1, 2, 3]));
        assert!(matches!(err, InputError::UnsupportedMediaType { .. }));
    }

    let err = assert_err!(flow.select_upload("empty.png", "image/png", Vec::new()));
    assert!(matches!(err, InputError::EmptyDocument { .. }));

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(flow.snapshot().phase(), Phase::Idle);

    let id = assert_ok!(flow.select_upload("scan.tiff", "image/tiff", vec![1, 2, 3]));
    let mut states = flow.subscribe();
    states.wait_for(|s| s.document_id() == Some(id)).await.unwrap();
    assert_eq!(flow.snapshot().phase(), Phase::Selected);
}

#[tokio::test(start_paused = true)]
async fn test_reselect_after_completion_clears_everything() {
    let service = Arc::new(
        ScriptedService::default()
            .with_extraction(Step::ok(1, text("Loratadine 10mg", None)))
            .with_validation(Step::ok(0, risk(RiskLevel::High))),
    );
    let flow = DocumentFlow::spawn(service.clone(), settings());

    let first = flow.select(png("loratadine.png"));
    flow.extract();
    let done = flow.wait_until_settled(first).await;
    assert_eq!(done.phase(), Phase::Completed);
    assert!(done.validation().is_some());

    // 成功帧仍在显示
    assert_eq!(flow.progress().borrow().tone, ProgressTone::Success);

    let mut states = flow.subscribe();
    let second = flow.select(pdf("next.pdf"));
    let fresh = states
        .wait_for(|s| s.document_id() == Some(second))
        .await
        .unwrap()
        .clone();

    assert_eq!(fresh.phase(), Phase::Selected);
    assert!(fresh.extraction().is_none());
    assert!(fresh.validation().is_none());
    assert!(fresh.last_error().is_none());
    assert!(flow.progress().borrow().is_reset());
}

#[tokio::test(start_paused = true)]
async fn test_monitor_reports_steady_backends() {
    let settings = MonitorSettings {
        period: Duration::from_secs(10),
        probe_timeout: Duration::from_secs(5),
    };

    for online in [true, false] {
        let service = Arc::new(ScriptedService::default().online(online));
        let monitor = AvailabilityMonitor::start(service.clone(), settings);

        let first = monitor.first_reading().await;
        assert_eq!(first.online, online);

        for _ in 0..6 {
            tokio::time::sleep(Duration::from_secs(10)).await;
            assert_eq!(monitor.signal().online, online);
        }
        assert!(service.probes.load(Ordering::SeqCst) >= 6);
        monitor.shutdown();
    }
}

#[tokio::test(start_paused = true)]
async fn test_app_commands_with_scripted_backend() {
    let dir = tempfile::tempdir().unwrap();
    let label = dir.path().join("label.png");
    std::fs::write(&label, [0x89, b'P', b'N', b'G']).unwrap();

    let config = Config {
        preference_file: dir.path().join("preferences.toml").display().to_string(),
        ..Config::default()
    };

    let service = Arc::new(
        ScriptedService::default()
            .online(true)
            .with_extraction(Step::ok(1, text("Cetirizine 10mg", None)))
            .with_validation(Step::ok(1, risk(RiskLevel::Low)))
            .with_extraction(Step::fail(1, "Failed to extract text")),
    );
    let app = App::with_service(config.clone(), service.clone());

    assert_ok!(app.run(Command::Health).await);
    assert_ok!(app.run(Command::Controls).await);
    assert_ok!(app.run(Command::Compare { file: label.clone() }).await);
    assert_ok!(app.run(Command::Verify { file: label.clone() }).await);
    assert_err!(app.run(Command::Verify { file: label.clone() }).await);
    assert_err!(app.run(Command::Verify { file: dir.path().join("missing.png") }).await);

    assert_ok!(
        app.run(Command::Theme {
            choice: Some(ThemeChoice::Toggle)
        })
        .await
    );
    let preferences = PreferenceStore::new(&config.preference_file).load().await.unwrap();
    assert_eq!(preferences.theme.to_string(), "dark");

    assert_eq!(service.submit_count(), 2);
    assert_eq!(service.validated_texts(), vec!["Cetirizine 10mg".to_string()]);
    app.shutdown();
}

#[tokio::test]
#[ignore] // 默认忽略，需要后端：cargo test -- --ignored
async fn test_live_backend_health() {
    label_ocr_client::utils::logging::init(true);

    let config = Config::from_env().expect("配置无效");
    let service = HttpRemoteService::new(&config).expect("创建远程服务失败");

    assert!(service.probe_health().await, "后端不在线: {}", service.base_url());

    let controls = service
        .list_verified_controls()
        .await
        .expect("获取核准样本失败");
    println!("核准样本数量: {}", controls.len());
}
