//! # 库（vault）抽象模块
//!
//! ## 设计思路
//!
//! 笔记应用的文件库由宿主提供，本 crate 只依赖一个窄接口 `Vault`：
//! - 存在性探测（`exists`）作为路径去重的判定依据
//! - 二进制读 / 建 / 改
//! - **带链接改写的重命名**：改名时由宿主负责把所有文档中指向旧路径的链接
//!   一并改写，本 crate 不重复实现这部分逻辑
//!
//! ## 实现思路
//!
//! - 所有路径都是相对库根目录、以 `/` 分隔的字符串，经 `normalize_path` 规范化。
//! - `TrackedFile` 的路径在重命名后会被改写，持有者应视其为易变值。
//! - `FsVault` 提供基于本地目录的实现，供命令行与集成测试使用。
//!
//! ## 子模块
//!
//! - `path_resolver`：冲突时追加 `_1`、`_2`… 的唯一路径计算
//! - `reconcile`：原地覆写 / 先改名再覆写，以及 `_ORIGINAL` 备份
//! - `fs_vault`：本地目录实现

mod error;
pub mod fs_vault;
pub mod path_resolver;
pub mod reconcile;

pub use error::SaveError;
pub use fs_vault::FsVault;
pub use path_resolver::resolve_unique_path;
pub use reconcile::{FileReconciler, ReconcileOutcome};

/// 宿主文件库的最小能力集合。
///
/// 实现方应保证 `rename_and_relink` 成功返回时 `file.path()` 已指向新路径，
/// 且所有文档内指向旧路径的链接已被改写。
#[allow(async_fn_in_trait)]
pub trait Vault {
    /// 路径上是否已存在文件或文件夹。
    fn exists(&self, path: &str) -> bool;

    /// 附件目录配置；未配置时返回 `None`。
    fn attachment_folder(&self) -> Option<String>;

    async fn read_binary(&self, file: &TrackedFile) -> Result<Vec<u8>, SaveError>;

    /// 在空闲路径上新建文件，路径已被占用时报错。
    async fn create_binary(&self, path: &str, bytes: &[u8]) -> Result<TrackedFile, SaveError>;

    /// 覆写已有文件内容，不改变其路径。
    async fn modify_binary(&self, file: &TrackedFile, bytes: &[u8]) -> Result<(), SaveError>;

    /// 重命名并改写所有指向旧路径的链接。
    async fn rename_and_relink(&self, file: &mut TrackedFile, new_path: &str) -> Result<(), SaveError>;

    /// 生成从 `source_path` 文档指向 `target` 的链接文本。
    fn generate_markdown_link(&self, target: &TrackedFile, source_path: &str) -> String;
}

/// 库中已存在的文件实体。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedFile {
    path: String,
}

impl TrackedFile {
    pub fn new(path: impl AsRef<str>) -> Self {
        Self {
            path: normalize_path(path.as_ref()),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// 文件名（含扩展名）。
    pub fn name(&self) -> &str {
        self.path.rsplit_once('/').map_or(self.path.as_str(), |(_, name)| name)
    }

    /// 不含扩展名的文件名。
    pub fn basename(&self) -> &str {
        let name = self.name();
        match name.rsplit_once('.') {
            Some((base, _)) if !base.is_empty() => base,
            _ => name,
        }
    }

    /// 扩展名（不含点），没有扩展名时为空串。
    pub fn extension(&self) -> &str {
        let name = self.name();
        match name.rsplit_once('.') {
            Some((base, ext)) if !base.is_empty() => ext,
            _ => "",
        }
    }

    /// 父目录路径，位于库根目录时为空串。
    pub fn parent(&self) -> &str {
        self.path.rsplit_once('/').map_or("", |(parent, _)| parent)
    }

    /// 由重命名原语调用，改写实体路径。
    pub fn set_path(&mut self, path: &str) {
        self.path = normalize_path(path);
    }
}

/// 规范化库内路径：统一分隔符、合并重复 `/`、去掉首尾 `/`，
/// 并将不间断空格替换为普通空格。库根目录表示为 `/`。
pub fn normalize_path(path: &str) -> String {
    let cleaned = path.replace('\u{00A0}', " ").replace('\\', "/");
    let joined = cleaned
        .split('/')
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("/");

    if joined.is_empty() {
        "/".to_string()
    } else {
        joined
    }
}

/// 拼接目录与文件名并规范化。
pub fn join_path(folder: &str, name: &str) -> String {
    normalize_path(&format!("{}/{}", folder, name))
}
