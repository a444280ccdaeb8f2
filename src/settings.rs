//! 插件设置模块
//!
//! # 设计思路
//!
//! 设置以显式结构体在调用时传给编排层，而不是全局可变状态，
//! 这样 worker 与协调器只依赖各自的显式输入。
//!
//! # 实现思路
//!
//! - JSON 键名沿用插件数据文件的 camelCase 写法。
//! - `#[serde(default)]`：缺失字段回落到默认值，兼容旧版本数据文件。
//! - 文件不存在时返回默认设置；解析失败返回 `AppError::Settings`。

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// 默认亮度阈值。
pub const DEFAULT_THRESHOLD: u8 = 235;

/// 插件设置。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IlluminatorSettings {
    /// 粘贴时自动处理图片。
    pub enable_auto_illumination: bool,
    /// 去除近白背景。
    pub do_transparency: bool,
    /// 转换为 WebP。
    #[serde(rename = "doWebP")]
    pub do_webp: bool,
    /// R、G、B 均大于该值的像素被设为透明。
    pub threshold: u8,
    /// 原地处理前备份原文件。
    pub do_backup: bool,
}

impl Default for IlluminatorSettings {
    fn default() -> Self {
        Self {
            enable_auto_illumination: true,
            do_transparency: true,
            do_webp: true,
            threshold: DEFAULT_THRESHOLD,
            do_backup: false,
        }
    }
}

/// 读取设置文件；文件不存在时返回默认设置。
pub fn load_settings(path: &Path) -> Result<IlluminatorSettings, AppError> {
    if !path.exists() {
        log::debug!("设置文件不存在，使用默认设置: {}", path.display());
        return Ok(IlluminatorSettings::default());
    }

    let content = fs::read_to_string(path)?;
    serde_json::from_str::<IlluminatorSettings>(&content)
        .map_err(|e| AppError::Settings(format!("解析设置文件失败: {}", e)))
}

/// 以格式化 JSON 保存设置。
pub fn save_settings(path: &Path, settings: &IlluminatorSettings) -> Result<(), AppError> {
    let content = serde_json::to_string_pretty(settings)
        .map_err(|e| AppError::Settings(format!("序列化设置失败: {}", e)))?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, content)?;
    Ok(())
}
