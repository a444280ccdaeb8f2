//! # 文件落盘协调（FileReconciler）
//!
//! ## 设计思路
//!
//! 原地处理一个已存在的文件时，扩展名可能因转码而变化（`cat.png` → `cat.webp`）。
//! 协调逻辑只有两种结局：
//! 1. 目标路径与当前路径相同：只覆写内容，文件身份不变
//! 2. 目标路径不同：**先**调用宿主的带链接改写重命名，**再**覆写内容
//!
//! 顺序不可颠倒：若先写入新字节再改名，文件会在一段时间内以旧扩展名
//! 承载新格式内容，链接改写也可能基于过期的元数据计算。
//!
//! ## 实现思路
//!
//! - 目标路径在文件当前父目录、原始 basename 与新扩展名上计算，
//!   判定占用时排除文件自身（文件不会与自己冲突）。
//! - 备份写到同目录 `basename_ORIGINAL.ext`，已存在则跳过，从不覆盖。
//! - 失败直接返回 `SaveError`，不重试、不回滚已创建的备份。

use super::{SaveError, TrackedFile, Vault, join_path, resolve_unique_path};

/// 备份文件名后缀。
pub const BACKUP_SUFFIX: &str = "_ORIGINAL";

/// 一次协调的结果。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// 路径未变，仅覆写内容。
    Overwritten,
    /// 先改名（含链接改写）再覆写。
    RenamedAndOverwritten { from: String, to: String },
}

/// 文件协调器，借用宿主库执行落盘。
pub struct FileReconciler<'a, V: Vault> {
    vault: &'a V,
}

impl<'a, V: Vault> FileReconciler<'a, V> {
    pub fn new(vault: &'a V) -> Self {
        Self { vault }
    }

    /// 计算 `file` 以 `new_ext` 落盘时的最终路径。
    pub fn target_path(&self, file: &TrackedFile, new_ext: &str) -> String {
        let current = file.path();
        resolve_unique_path(file.parent(), file.basename(), new_ext, |candidate| {
            candidate != current && self.vault.exists(candidate)
        })
    }

    /// 将新内容写回 `file`，必要时先改名。
    ///
    /// 返回后 `file.path()` 为最终路径。
    pub async fn reconcile(
        &self,
        file: &mut TrackedFile,
        new_bytes: &[u8],
        new_ext: &str,
    ) -> Result<ReconcileOutcome, SaveError> {
        let final_path = self.target_path(file, new_ext);

        if final_path == file.path() {
            self.vault.modify_binary(file, new_bytes).await?;
            log::debug!("原地覆写: {}", final_path);
            return Ok(ReconcileOutcome::Overwritten);
        }

        let from = file.path().to_string();
        match self.vault.rename_and_relink(file, &final_path).await {
            Ok(()) => {}
            // 文件已在新路径上，内容仍需与新扩展名一致
            Err(err @ SaveError::Relink { .. }) => {
                self.vault.modify_binary(file, new_bytes).await?;
                return Err(err);
            }
            Err(err) => return Err(err),
        }
        self.vault.modify_binary(file, new_bytes).await?;

        log::info!("🔁 已改名并覆写: {} -> {}", from, file.path());
        Ok(ReconcileOutcome::RenamedAndOverwritten {
            from,
            to: file.path().to_string(),
        })
    }

    /// 备份路径：同目录 `basename_ORIGINAL.ext`。
    pub fn backup_path(file: &TrackedFile) -> String {
        let name = if file.extension().is_empty() {
            format!("{}{}", file.basename(), BACKUP_SUFFIX)
        } else {
            format!("{}{}.{}", file.basename(), BACKUP_SUFFIX, file.extension())
        };
        join_path(file.parent(), &name)
    }

    /// 写入原始字节备份；备份已存在时不做任何事。
    ///
    /// 返回是否新建了备份。
    pub async fn backup_original(
        &self,
        file: &TrackedFile,
        original_bytes: &[u8],
    ) -> Result<bool, SaveError> {
        let backup_path = Self::backup_path(file);
        if self.vault.exists(&backup_path) {
            log::debug!("备份已存在，跳过: {}", backup_path);
            return Ok(false);
        }

        self.vault.create_binary(&backup_path, original_bytes).await?;
        log::info!("🗂️ 已创建备份: {}", backup_path);
        Ok(true)
    }
}
