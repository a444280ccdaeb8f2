//! # 粘贴入口（PasteOrchestrator）
//!
//! ## 设计思路
//!
//! 粘贴事件中的图片文件按扩展名白名单筛选后逐个变换，成功的结果
//! 以时间戳命名写入附件目录，并在光标处插入嵌入链接。
//!
//! ## 实现思路
//!
//! - `collect_images` 只做同步筛选：宿主据此决定是否阻止默认粘贴行为，
//!   必须在任何 `await` 之前完成。
//! - 附件目录为空、为 `/` 或不存在时落在库根目录；`./` 开头时相对当前笔记目录。
//! - 链接统一补 `!` 前缀，保证以嵌入方式渲染。
//! - 每个条目的失败都会记录日志并单独通知，不会中断后续条目。

use chrono::{DateTime, Local};

use super::{Editor, Notifier, messages, run_transform};
use crate::image_handler::{CodecLimits, TransformResult, TransformSource, is_supported_file_name};
use crate::settings::IlluminatorSettings;
use crate::vault::{SaveError, Vault, join_path, resolve_unique_path};

/// 粘贴事件携带的一个文件。
#[derive(Debug, Clone)]
pub struct PastedImage {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl PastedImage {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }
}

/// 粘贴流程编排器。
pub struct PasteOrchestrator<'a, V: Vault, N: Notifier> {
    vault: &'a V,
    notifier: &'a N,
    settings: IlluminatorSettings,
    limits: CodecLimits,
}

impl<'a, V: Vault, N: Notifier> PasteOrchestrator<'a, V, N> {
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

    /// 筛选需要接管的图片。
    ///
    /// 返回空列表时宿主应保留默认粘贴行为。
    pub fn collect_images(&self, files: Vec<PastedImage>) -> Vec<PastedImage> {
        if !self.settings.enable_auto_illumination {
            return Vec::new();
        }

        files
            .into_iter()
            .filter(|file| {
                let supported = is_supported_file_name(&file.name);
                if !supported {
                    log::debug!("跳过不支持的粘贴文件: {}", file.name);
                }
                supported
            })
            .collect()
    }

    /// 依次处理粘贴的图片，返回新建文件的库内路径。
    pub async fn handle_paste<E: Editor>(&self, images: Vec<PastedImage>, editor: &mut E) -> Vec<String> {
        let mut created = Vec::with_capacity(images.len());

        for image in images {
            let result = match run_transform(
                TransformSource::Bytes(image.bytes),
                &self.settings,
                &self.limits,
                &image.name,
            )
            .await
            {
                Ok(result) => result,
                Err(_) => {
                    self.notifier
                        .notice(&format!("{}{}", messages::ERROR_PROCESS, image.name));
                    continue;
                }
            };

            match self.save_and_insert(result, editor).await {
                Ok(path) => created.push(path),
                Err(err) => {
                    log::error!("粘贴图片保存失败 [{}]: {}", image.name, err);
                    self.notifier
                        .notice(&format!("{}{}", messages::ERROR_SAVE, image.name));
                }
            }
        }

        created
    }

    async fn save_and_insert<E: Editor>(
        &self,
        result: TransformResult,
        editor: &mut E,
    ) -> Result<String, SaveError> {
        let active = editor.active_file();
        let base_name = paste_base_name(Local::now());
        let folder = self.target_folder(active.as_deref());

        let path = resolve_unique_path(&folder, &base_name, result.extension, |p| self.vault.exists(p));
        let new_file = self.vault.create_binary(&path, &result.bytes).await?;

        let mut link = self
            .vault
            .generate_markdown_link(&new_file, active.as_deref().unwrap_or(""));
        if !link.starts_with('!') {
            link.insert(0, '!');
        }
        editor.replace_selection(&link);

        log::info!("📋 粘贴图片已保存: {}", new_file.path());
        Ok(new_file.path().to_string())
    }

    /// 解析粘贴图片的落盘目录，空串表示库根目录。
    fn target_folder(&self, active_note: Option<&str>) -> String {
        let Some(configured) = self.vault.attachment_folder() else {
            return String::new();
        };
        let configured = configured.trim();

        if configured.is_empty() || configured == "/" {
            return String::new();
        }

        let folder = match configured.strip_prefix("./") {
            Some(relative) => {
                let note_dir = active_note
                    .and_then(|note| note.rsplit_once('/').map(|(dir, _)| dir))
                    .unwrap_or("");
                join_path(note_dir, relative)
            }
            None if configured == "." => active_note
                .and_then(|note| note.rsplit_once('/').map(|(dir, _)| dir.to_string()))
                .unwrap_or_default(),
            None => join_path(configured, ""),
        };

        if folder == "/" || folder.is_empty() || self.vault.exists(&folder) {
            folder.trim_matches('/').to_string()
        } else {
            log::warn!("附件目录不存在，改存到库根目录: {}", folder);
            String::new()
        }
    }
}

/// 粘贴图片的基础文件名：`IMG_YYYYMMDDHHmmss`。
pub fn paste_base_name(now: DateTime<Local>) -> String {
    format!("IMG_{}", now.format("%Y%m%d%H%M%S"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn base_name_uses_second_resolution_timestamp() {
        let now = Local
            .with_ymd_and_hms(2024, 3, 9, 7, 5, 1)
            .single()
            .expect("unambiguous local time");
        assert_eq!(paste_base_name(now), "IMG_20240309070501");
    }
}
