//! 命令行应用 - 编排层
//!
//! ## 职责
//!
//! 1. **应用初始化**：启动日志、创建远程服务、启动健康检查
//! 2. **命令分发**：verify / compare / controls / health / theme
//! 3. **资源管理**：持有 RemoteService 和 AvailabilityMonitor，退出前停止所有定时任务
//!
//! 本模块只做调度和输出，识别与校验的状态推进全部委托给 `DocumentFlow`。

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, bail, Result};
use clap::{Subcommand, ValueEnum};
use tracing::{debug, info, warn};

use crate::clients::{HttpRemoteService, RemoteService};
use crate::config::Config;
use crate::models::{Document, Theme};
use crate::orchestrator::renderer;
use crate::services::{AvailabilityMonitor, PreferenceStore};
use crate::utils::logging::log_startup;
use crate::workflow::{DocumentFlow, Phase, WorkflowState};

/// 子命令
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// 识别标签并自动进行合规校验
    Verify {
        /// 图片或 PDF 文件
        file: PathBuf,
    },
    /// 与核准样本比对
    Compare {
        /// 图片或 PDF 文件
        file: PathBuf,
    },
    /// 列出核准样本
    Controls,
    /// 检查后端是否在线
    Health,
    /// 查看或切换界面主题
    Theme {
        #[arg(value_enum)]
        choice: Option<ThemeChoice>,
    },
}

/// theme 子命令的参数
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ThemeChoice {
    Light,
    Dark,
    Toggle,
}

/// 应用主结构
pub struct App {
    config: Config,
    service: Arc<dyn RemoteService>,
    preferences: PreferenceStore,
    monitor: AvailabilityMonitor,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config) -> Result<Self> {
        log_startup(&config);

        let service = HttpRemoteService::new(&config)?;
        info!("✓ 远程服务已就绪: {}", service.base_url());

        Ok(Self::with_service(config, Arc::new(service)))
    }

    /// 使用指定的远程服务创建（测试时注入模拟服务）
    pub fn with_service(config: Config, service: Arc<dyn RemoteService>) -> Self {
        let preferences = PreferenceStore::new(&config.preference_file);
        let monitor = AvailabilityMonitor::start(Arc::clone(&service), config.monitor_settings());

        Self {
            config,
            service,
            preferences,
            monitor,
        }
    }

    /// 运行单条命令
    pub async fn run(&self, command: Command) -> Result<()> {
        debug!("执行命令: {:?}", command);
        match command {
            Command::Verify { file } => self.verify(&file).await,
            Command::Compare { file } => self.compare(&file).await,
            Command::Controls => self.controls().await,
            Command::Health => self.health().await,
            Command::Theme { choice } => self.theme(choice).await,
        }
    }

    /// 停止健康检查
    pub fn shutdown(self) {
        self.monitor.shutdown();
        info!("👋 已停止所有后台任务");
    }

    /// 识别 + 自动校验，实时显示进度
    async fn verify(&self, path: &Path) -> Result<()> {
        let theme = self.current_theme().await;
        let document = Document::from_path(path).await?;
        print_line(renderer::render_availability(&self.monitor.signal(), theme));

        let flow = DocumentFlow::spawn(Arc::clone(&self.service), self.config.progress_settings());
        let settled = follow_flow(&flow, document, theme).await;
        flow.shutdown();

        for line in renderer::render_state(&settled, theme) {
            print_line(line);
        }

        if settled.phase() == Phase::Failed {
            let message = settled
                .last_error()
                .map(|e| e.to_string())
                .unwrap_or_else(|| "识别失败".to_string());
            bail!(message);
        }
        Ok(())
    }

    async fn compare(&self, path: &Path) -> Result<()> {
        let theme = self.current_theme().await;
        let document = Document::from_path(path).await?;
        info!("🔬 开始比对: {}", document.name());

        let report = self
            .service
            .run_comparison(&document)
            .await
            .map_err(|f| anyhow!("比对失败: {}", f))?;

        for line in renderer::render_comparison(&report, theme) {
            print_line(line);
        }
        Ok(())
    }

    async fn controls(&self) -> Result<()> {
        let theme = self.current_theme().await;
        let controls = self
            .service
            .list_verified_controls()
            .await
            .map_err(|f| anyhow!("获取核准样本失败: {}", f))?;

        info!("📋 共 {} 个核准样本", controls.len());
        for line in renderer::render_controls(&controls, theme) {
            print_line(line);
        }
        Ok(())
    }

    async fn health(&self) -> Result<()> {
        let theme = self.current_theme().await;
        let signal = self.monitor.first_reading().await;
        print_line(renderer::render_availability(&signal, theme));
        Ok(())
    }

    async fn theme(&self, choice: Option<ThemeChoice>) -> Result<()> {
        let preferences = match choice {
            None => self.preferences.load().await?,
            Some(ThemeChoice::Light) => self.preferences.set_theme(Theme::Light).await?,
            Some(ThemeChoice::Dark) => self.preferences.set_theme(Theme::Dark).await?,
            Some(ThemeChoice::Toggle) => self.preferences.toggle_theme().await?,
        };
        print_line(format!("当前主题: {}", preferences.theme));
        Ok(())
    }

    /// 偏好文件损坏时不影响主流程
    async fn current_theme(&self) -> Theme {
        match self.preferences.load().await {
            Ok(preferences) => preferences.theme,
            Err(e) => {
                warn!("⚠️ 读取偏好失败，使用默认主题: {}", e);
                Theme::default()
            }
        }
    }
}

/// 选择并识别文档，边等边渲染进度，返回最终状态
async fn follow_flow(flow: &DocumentFlow, document: Document, theme: Theme) -> WorkflowState {
    let mut progress = flow.progress();
    let mut state = flow.subscribe();
    let mut last_phase = state.borrow().phase();

    let id = flow.select(document);
    flow.extract();

    let settled = flow.wait_until_settled(id);
    tokio::pin!(settled);

    let final_state = loop {
        tokio::select! {
            final_state = &mut settled => break final_state,
            Ok(()) = progress.changed() => {
                let line = renderer::render_progress(&progress.borrow_and_update(), theme);
                if !line.is_empty() {
                    print_progress(&line);
                }
            }
            Ok(()) = state.changed() => {
                let phase = state.borrow_and_update().phase();
                if phase != last_phase {
                    debug!("阶段变化: {} → {}", last_phase, phase);
                    last_phase = phase;
                }
            }
        }
    };

    // 最后一帧（100% 或失败）
    let line = renderer::render_progress(&progress.borrow(), theme);
    if !line.is_empty() {
        print_progress(&line);
    }
    println!();

    final_state
}

fn print_line(line: impl AsRef<str>) {
    println!("{}", line.as_ref());
}

/// 原地刷新进度行
fn print_progress(line: &str) {
    let mut stdout = std::io::stdout();
    let _ = write!(stdout, "\r\x1b[2K{}", line);
    let _ = stdout.flush();
}
