//! 终端渲染 - 编排层
//!
//! 纯函数：把状态、进度、可用性映射为带颜色的终端文本。
//! 不持有任何状态，流程层也从不调用这里。

use crate::models::{
    AvailabilitySignal, ComparisonReport, ControlStatus, Decision, ProgressSnapshot, ProgressTone,
    RiskLevel, Theme, VerifiedControl,
};
use crate::workflow::{FlowStage, Phase, WorkflowState};

const BAR_WIDTH: usize = 30;
const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";

/// 主题色板
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub accent: &'static str,
    pub success: &'static str,
    pub warning: &'static str,
    pub danger: &'static str,
    pub muted: &'static str,
}

impl Palette {
    pub fn for_theme(theme: Theme) -> Self {
        match theme {
            Theme::Light => Palette {
                accent: "\x1b[34m",
                success: "\x1b[32m",
                warning: "\x1b[33m",
                danger: "\x1b[31m",
                muted: "\x1b[90m",
            },
            Theme::Dark => Palette {
                accent: "\x1b[94m",
                success: "\x1b[92m",
                warning: "\x1b[93m",
                danger: "\x1b[91m",
                muted: "\x1b[37m",
            },
        }
    }

    fn paint(&self, color: &str, text: impl AsRef<str>) -> String {
        format!("{}{}{}", color, text.as_ref(), RESET)
    }
}

/// 进度条，已重置时返回空字符串
pub fn render_progress(snapshot: &ProgressSnapshot, theme: Theme) -> String {
    if snapshot.is_reset() {
        return String::new();
    }

    let palette = Palette::for_theme(theme);
    let fraction = snapshot.fraction.clamp(0.0, 100.0);
    let filled = ((fraction / 100.0) * BAR_WIDTH as f64).round() as usize;
    let bar = format!("[{}{}]", "#".repeat(filled), "-".repeat(BAR_WIDTH - filled));

    let color = match snapshot.tone {
        ProgressTone::Idle => palette.muted.to_string(),
        ProgressTone::Working => palette.accent.to_string(),
        // 等待过久时加粗提示
        ProgressTone::Pulsing => format!("{}{}", BOLD, palette.warning),
        ProgressTone::Success => palette.success.to_string(),
        ProgressTone::Failure => palette.danger.to_string(),
    };

    format!(
        "{} {:>3.0}% {}",
        palette.paint(&color, bar),
        fraction,
        snapshot.label
    )
}

/// 后端可用性指示
pub fn render_availability(signal: &AvailabilitySignal, theme: Theme) -> String {
    let palette = Palette::for_theme(theme);
    match (signal.checked_at, signal.online) {
        (None, _) => palette.paint(palette.muted, "○ 正在检查后端…"),
        (Some(at), true) => palette.paint(
            palette.success,
            format!("● 后端在线 ({})", at.format("%H:%M:%S")),
        ),
        (Some(at), false) => palette.paint(
            palette.danger,
            format!("● 后端离线 ({})", at.format("%H:%M:%S")),
        ),
    }
}

pub fn risk_color(level: &RiskLevel, palette: &Palette) -> &'static str {
    match level {
        RiskLevel::Low => palette.success,
        RiskLevel::Medium => palette.warning,
        RiskLevel::High => palette.danger,
        RiskLevel::Unknown(_) => palette.muted,
    }
}

/// 流程状态（识别结果 + 校验结果 + 错误）
pub fn render_state(state: &WorkflowState, theme: Theme) -> Vec<String> {
    let palette = Palette::for_theme(theme);
    let mut lines = Vec::new();

    let phase_color = match state.phase() {
        Phase::Completed => palette.success,
        Phase::Failed => palette.danger,
        Phase::Idle => palette.muted,
        _ => palette.accent,
    };
    lines.push(format!("状态: {}", palette.paint(phase_color, state.phase().name())));

    if let Some(document) = state.document() {
        lines.push(format!(
            "文件: {} ({}, {} 字节)",
            document.name(),
            document.category(),
            document.len()
        ));
    }

    if let Some(extraction) = state.extraction() {
        let mut meta = format!(
            "识别引擎: {} | 耗时 {:.2} 秒",
            extraction.engine_name, extraction.processing_time_seconds
        );
        if let Some(pages) = extraction.pages_processed {
            meta.push_str(&format!(" | {} 页", pages));
        }
        lines.push(meta);

        if extraction.has_text() {
            lines.push("识别文本:".to_string());
            lines.extend(extraction.text.lines().map(|l| format!("  {}", l)));
        } else {
            lines.push(palette.paint(palette.warning, "未识别出文字，跳过合规校验"));
        }
    }

    if let Some(validation) = state.validation() {
        lines.push("合规校验:".to_string());
        for (name, value) in validation.fields() {
            let shown = value
                .map(str::to_string)
                .unwrap_or_else(|| palette.paint(palette.muted, "—"));
            lines.push(format!("  {}: {}", name, shown));
        }
        if let Some(present) = validation.serialization_present {
            lines.push(format!("  追溯码: {}", if present { "有" } else { "无" }));
        }
        if !validation.missing_fields.is_empty() {
            lines.push(palette.paint(
                palette.warning,
                format!("  缺失字段: {}", validation.missing_fields.join(", ")),
            ));
        }
        lines.push(format!(
            "  风险等级: {}",
            palette.paint(risk_color(&validation.risk_level, &palette), validation.risk_level.to_string())
        ));
        if let Some(score) = validation.confidence_score {
            lines.push(format!("  置信度: {:.0}%", normalize_score(score)));
        }
        if let Some(summary) = &validation.analysis_summary {
            lines.push(format!("  分析: {}", summary));
        }
    }

    if let Some(error) = state.last_error() {
        let color = match error.stage {
            FlowStage::Extraction => palette.danger,
            FlowStage::Validation => palette.warning,
        };
        lines.push(palette.paint(color, error.to_string()));
    }

    lines
}

/// 比对报告
pub fn render_comparison(report: &ComparisonReport, theme: Theme) -> Vec<String> {
    let palette = Palette::for_theme(theme);
    let (decision_color, decision_text) = match &report.decision {
        Decision::Valid => (palette.success, "VALID".to_string()),
        Decision::Other(raw) => (palette.danger, raw.clone()),
    };

    let mut lines = vec![
        format!("结论: {}", palette.paint(decision_color, decision_text)),
        format!("相似度: {:.0}%", normalize_score(report.similarity_score)),
        format!("真实性: {:.0}%", normalize_score(report.authenticity_score)),
    ];

    for (name, ok) in report.validation_details.checks() {
        let mark = if ok {
            palette.paint(palette.success, "✓")
        } else {
            palette.paint(palette.danger, "✗")
        };
        lines.push(format!("  {} {}", mark, name));
    }

    if let Some(text) = &report.extracted_text {
        lines.push(format!("识别文本: {}", text));
    }

    lines
}

/// 核准样本列表
pub fn render_controls(controls: &[VerifiedControl], theme: Theme) -> Vec<String> {
    let palette = Palette::for_theme(theme);
    if controls.is_empty() {
        return vec![palette.paint(palette.muted, "暂无核准样本")];
    }

    controls
        .iter()
        .map(|control| {
            let (color, status) = match &control.status {
                ControlStatus::Approved => (palette.success, "approved".to_string()),
                ControlStatus::Pending => (palette.warning, "pending".to_string()),
                ControlStatus::Rejected => (palette.danger, "rejected".to_string()),
                ControlStatus::Unknown(raw) => (palette.muted, raw.clone()),
            };
            let approved_at = control
                .approved_at
                .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_else(|| "—".to_string());
            format!(
                "{} [{}] {}",
                control.control_name,
                palette.paint(color, status),
                approved_at
            )
        })
        .collect()
}

/// 后端有的分数是 0~1，有的是 0~100
fn normalize_score(score: f64) -> f64 {
    if score <= 1.0 {
        score * 100.0
    } else {
        score
    }
}
