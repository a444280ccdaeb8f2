//! # 右键菜单入口（ContextMenuOrchestrator）
//!
//! ## 设计思路
//!
//! 对库中已有的图片原地处理：
//! - 单个文件：直接处理，成功或失败都会单独通知
//! - 多个文件：原地覆写具有破坏性，必须先经用户确认；随后按顺序逐个处理，
//!   结束时只发一条汇总通知
//!
//! ## 实现思路
//!
//! 每个文件的处理顺序固定为：读取原始字节 → （可选）备份 → 变换 → 协调落盘。
//! - 变换失败：单文件时通知用户，批处理时仅记录日志并跳过
//! - 读取 / 备份 / 落盘失败：记录日志并发出点名该文件的保存失败通知，不回滚已创建的备份
//! - 改名后链接改写失败：新内容照常写入，通知用户手动检查链接
//! - 任何失败都不会中断批处理循环

use super::{Notifier, messages, run_transform};
use crate::image_handler::{CodecLimits, TransformSource, is_supported_extension};
use crate::settings::IlluminatorSettings;
use crate::vault::{FileReconciler, SaveError, TrackedFile, Vault};

/// 单个文件的处理结局。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    /// 已写回，携带最终路径。
    Processed(String),
    /// 变换失败，文件保持原样。
    Skipped,
    /// 读取或落盘失败。
    Failed,
}

/// 批处理汇总。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// 尝试处理的文件数。
    pub attempted: usize,
    pub succeeded: usize,
    /// 变换失败而跳过的文件数。
    pub skipped: usize,
    /// 读取或落盘失败的文件数。
    pub failed: usize,
    /// 成功文件的最终路径（按处理顺序）。
    pub final_paths: Vec<String>,
}

impl BatchReport {
    fn record(&mut self, outcome: FileOutcome) {
        self.attempted += 1;
        match outcome {
            FileOutcome::Processed(path) => {
                self.succeeded += 1;
                self.final_paths.push(path);
            }
            FileOutcome::Skipped => self.skipped += 1,
            FileOutcome::Failed => self.failed += 1,
        }
    }
}

/// 一次菜单操作的结局。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IlluminateOutcome {
    /// 选中项里没有受支持的图片（菜单项不会出现）。
    NothingToDo,
    /// 用户取消了批处理确认。
    Cancelled,
    Completed(BatchReport),
}

/// 右键菜单流程编排器。
pub struct ContextMenuOrchestrator<'a, V: Vault, N: Notifier> {
    vault: &'a V,
    notifier: &'a N,
    settings: IlluminatorSettings,
    limits: CodecLimits,
}

impl<'a, V: Vault, N: Notifier> ContextMenuOrchestrator<'a, V, N> {
    pub fn new(vault: &'a V, notifier: &'a N, settings: IlluminatorSettings) -> Self {
        Self {
            vault,
            notifier,
            settings,
            limits: CodecLimits::default(),
        }
    }

    pub fn with_limits(mut self, limits: CodecLimits) -> Self {
        self.limits = limits;
        self
    }

    /// 选中项中受支持的图片文件。
    pub fn target_files(files: Vec<TrackedFile>) -> Vec<TrackedFile> {
        files
            .into_iter()
            .filter(|file| is_supported_extension(file.extension()))
            .collect()
    }

    /// 菜单动作入口。
    ///
    /// `confirm` 仅在多选时被调用，参数为待处理文件数，返回 `false` 表示取消。
    pub async fn illuminate<C>(&self, files: Vec<TrackedFile>, confirm: C) -> IlluminateOutcome
    where
        C: FnOnce(usize) -> bool,
    {
        let mut targets = Self::target_files(files);
        let mut report = BatchReport::default();

        match targets.len() {
            0 => IlluminateOutcome::NothingToDo,
            1 => {
                let outcome = self.process_file_in_place(&mut targets[0], false).await;
                report.record(outcome);
                IlluminateOutcome::Completed(report)
            }
            count => {
                if !confirm(count) {
                    log::info!("用户取消了 {} 个文件的批处理", count);
                    return IlluminateOutcome::Cancelled;
                }

                for file in targets.iter_mut() {
                    let outcome = self.process_file_in_place(file, true).await;
                    report.record(outcome);
                }

                log::info!(
                    "批处理结束 - attempted={} succeeded={} skipped={} failed={}",
                    report.attempted,
                    report.succeeded,
                    report.skipped,
                    report.failed
                );
                self.notifier.notice(&format!(
                    "{}\n{} {}",
                    messages::REPORT_TITLE,
                    report.attempted,
                    messages::PROCESSED
                ));
                IlluminateOutcome::Completed(report)
            }
        }
    }

    /// 原地处理单个文件；返回后 `file.path()` 为最终路径。
    pub async fn process_file_in_place(&self, file: &mut TrackedFile, is_batch: bool) -> FileOutcome {
        let name = file.name().to_string();

        match self.try_process(file, is_batch).await {
            Ok(Some(final_path)) => {
                if !is_batch {
                    self.notifier
                        .notice(&format!("{}{}", messages::ILLUMINATED, file.name()));
                }
                FileOutcome::Processed(final_path)
            }
            Ok(None) => FileOutcome::Skipped,
            Err(err) => {
                log::error!("原地处理失败 [{}]: {}", name, err);
                let message = match err {
                    // 文件已移动到新路径，提示用户检查指向它的链接
                    SaveError::Relink { .. } => format!("{}{}", messages::ERROR_UPDATE_LINKS, file.path()),
                    _ => format!("{}{}", messages::ERROR_SAVE, name),
                };
                self.notifier.notice(&message);
                FileOutcome::Failed
            }
        }
    }

    /// `Ok(None)` 表示变换失败而跳过。
    async fn try_process(&self, file: &mut TrackedFile, is_batch: bool) -> Result<Option<String>, SaveError> {
        let data = self.vault.read_binary(file).await?;
        let reconciler = FileReconciler::new(self.vault);

        if self.settings.do_backup {
            reconciler.backup_original(file, &data).await?;
        }

        let label = file.path().to_string();
        let result = match run_transform(TransformSource::Bytes(data), &self.settings, &self.limits, &label).await {
            Ok(result) => result,
            Err(message) => {
                if !is_batch {
                    self.notifier
                        .notice(&format!("{}{}", messages::ERROR_PROCESS, file.name()));
                } else {
                    log::warn!("批处理跳过 [{}]: {}", label, message);
                }
                return Ok(None);
            }
        };

        reconciler.reconcile(file, &result.bytes, result.extension).await?;
        Ok(Some(file.path().to_string()))
    }
}
