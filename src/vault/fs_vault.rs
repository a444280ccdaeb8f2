//! # 本地目录库实现（FsVault）
//!
//! ## 设计思路
//!
//! 把一个本地目录当作笔记库：库内路径相对根目录，Markdown 笔记（`.md`）
//! 中的链接在重命名时被统一改写。供命令行入口与集成测试使用，
//! 宿主应用中应替换为宿主自身的实现。
//!
//! ## 实现思路
//!
//! - 附件目录优先取构建时显式指定的值，其次读取 `.obsidian/app.json`
//!   中的 `attachmentFolderPath`。
//! - 链接改写覆盖两种写法：
//!   - wiki 链接 `[[path]]` / `![[name|alias]]`：按库内绝对路径或文件名匹配
//!   - Markdown 链接 `[alt](path)` / `![alt](path)`：按相对笔记目录或库内绝对路径匹配
//! - 正则通过 `once_cell::sync::Lazy` 在首次使用时编译。
//! - 改名前先在内存中算好全部笔记的新内容：读取失败则不做任何改动；
//!   改名后写回失败的笔记以 `SaveError::Relink` 报告。
//! - 拒绝包含 `..` 的路径，避免越出库根目录。

use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use super::{SaveError, TrackedFile, Vault, normalize_path};

static WIKI_LINK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(!?)\[\[([^\]\|#\n]+)([^\]\n]*)\]\]").expect("wiki link pattern is valid")
});

static MARKDOWN_LINK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(!?\[[^\]\n]*\])\(([^)\n]+)\)").expect("markdown link pattern is valid")
});

const APP_CONFIG_PATH: &str = ".obsidian/app.json";

/// 基于本地目录的库。
#[derive(Debug, Clone)]
pub struct FsVault {
    root: PathBuf,
    attachment_folder: Option<String>,
}

impl FsVault {
    /// 打开目录作为库，并尝试读取附件目录配置。
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, SaveError> {
        let root = root.into();
        if !root.is_dir() {
            return Err(SaveError::NotFound(root.to_string_lossy().to_string()));
        }

        let attachment_folder = Self::read_attachment_folder(&root);
        Ok(Self {
            root,
            attachment_folder,
        })
    }

    /// 显式指定附件目录，覆盖 `.obsidian/app.json` 中的配置。
    pub fn with_attachment_folder(mut self, folder: impl AsRef<str>) -> Self {
        self.attachment_folder = Some(normalize_path(folder.as_ref()));
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// 笔记的磁盘路径；越出库根目录或指向库根目录本身时报错。
    pub fn note_path(&self, note: &str) -> Result<PathBuf, SaveError> {
        let disk_path = self.absolute_path(note)?;
        if disk_path == self.root {
            return Err(SaveError::InvalidPath(note.to_string()));
        }
        Ok(disk_path)
    }

    /// 把若干行追加到笔记末尾，笔记不存在时新建。
    ///
    /// 已有内容按原始字节保留，不要求是 UTF-8；读取失败（不存在除外）时
    /// 直接报错，不会覆写笔记。
    pub async fn append_to_note(&self, note: &str, lines: &[String]) -> Result<(), SaveError> {
        let disk_path = self.note_path(note)?;

        let mut content = match tokio::fs::read(&disk_path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(err) => return Err(SaveError::io(note, err)),
        };

        if !content.is_empty() && !content.ends_with(b"\n") {
            content.push(b'\n');
        }
        for line in lines {
            content.extend_from_slice(line.as_bytes());
            content.push(b'\n');
        }

        self.ensure_parent_dir(&disk_path, note).await?;
        tokio::fs::write(&disk_path, content)
            .await
            .map_err(|e| SaveError::io(note, e))
    }

    fn read_attachment_folder(root: &Path) -> Option<String> {
        let content = std::fs::read_to_string(root.join(APP_CONFIG_PATH)).ok()?;
        let parsed = match serde_json::from_str::<serde_json::Value>(&content) {
            Ok(value) => value,
            Err(err) => {
                log::warn!("解析 {} 失败，忽略附件目录配置: {}", APP_CONFIG_PATH, err);
                return None;
            }
        };

        parsed
            .get("attachmentFolderPath")
            .and_then(|v| v.as_str())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    /// 库内路径 → 磁盘路径。
    fn absolute_path(&self, vault_path: &str) -> Result<PathBuf, SaveError> {
        let normalized = normalize_path(vault_path);
        if normalized == "/" {
            return Ok(self.root.clone());
        }
        if normalized.split('/').any(|segment| segment == ".." || segment == ".") {
            return Err(SaveError::InvalidPath(vault_path.to_string()));
        }
        Ok(self.root.join(normalized))
    }

    async fn ensure_parent_dir(&self, target: &Path, vault_path: &str) -> Result<(), SaveError> {
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| SaveError::io(vault_path, e))?;
        }
        Ok(())
    }

    /// 收集库内全部 Markdown 笔记（库内路径），跳过隐藏目录。
    async fn markdown_notes(&self) -> Result<Vec<String>, SaveError> {
        let mut notes = Vec::new();
        let mut pending = vec![self.root.clone()];

        while let Some(dir) = pending.pop() {
            let mut entries = tokio::fs::read_dir(&dir)
                .await
                .map_err(|e| SaveError::io(dir.to_string_lossy(), e))?;

            while let Some(entry) = entries
                .next_entry()
                .await
                .map_err(|e| SaveError::io(dir.to_string_lossy(), e))?
            {
                let path = entry.path();
                let file_name = entry.file_name().to_string_lossy().to_string();
                if file_name.starts_with('.') {
                    continue;
                }

                let file_type = entry
                    .file_type()
                    .await
                    .map_err(|e| SaveError::io(path.to_string_lossy(), e))?;

                if file_type.is_dir() {
                    pending.push(path);
                } else if file_name.to_ascii_lowercase().ends_with(".md") {
                    if let Ok(relative) = path.strip_prefix(&self.root) {
                        notes.push(normalize_path(&relative.to_string_lossy()));
                    }
                }
            }
        }

        notes.sort();
        Ok(notes)
    }

    /// 在改名之前，于内存中算出全部需要改写的笔记内容。
    ///
    /// 任何笔记读取失败都会让整个改名中止；非 UTF-8 的笔记无法安全改写，
    /// 记录警告后跳过。
    async fn plan_relinks(&self, old_path: &str, new_path: &str) -> Result<Vec<PendingNote>, SaveError> {
        let mut pending = Vec::new();

        for note in self.markdown_notes().await? {
            let disk_path = self.absolute_path(&note)?;
            let raw = tokio::fs::read(&disk_path)
                .await
                .map_err(|e| SaveError::io(&note, e))?;

            let content = match String::from_utf8(raw) {
                Ok(content) => content,
                Err(_) => {
                    log::warn!("笔记不是有效的 UTF-8，跳过链接改写: {}", note);
                    continue;
                }
            };

            if let Some(updated) = rewrite_links(&content, &note, old_path, new_path) {
                pending.push(PendingNote {
                    note,
                    disk_path,
                    content: updated,
                });
            }
        }

        Ok(pending)
    }

    /// 写回已算好的笔记内容；单篇失败不影响其余笔记，返回失败的笔记列表。
    async fn apply_relinks(pending: Vec<PendingNote>) -> Vec<String> {
        let mut failed = Vec::new();

        for PendingNote {
            note,
            disk_path,
            content,
        } in pending
        {
            match tokio::fs::write(&disk_path, content).await {
                Ok(()) => log::debug!("已改写笔记链接: {}", note),
                Err(err) => {
                    log::error!("写回笔记失败 [{}]: {}", note, err);
                    failed.push(note);
                }
            }
        }

        failed
    }
}

/// 待写回的笔记。
#[derive(Debug)]
struct PendingNote {
    note: String,
    disk_path: PathBuf,
    content: String,
}

impl Vault for FsVault {
    fn exists(&self, path: &str) -> bool {
        self.absolute_path(path).map(|p| p.exists()).unwrap_or(false)
    }

    fn attachment_folder(&self) -> Option<String> {
        self.attachment_folder.clone()
    }

    async fn read_binary(&self, file: &TrackedFile) -> Result<Vec<u8>, SaveError> {
        let disk_path = self.absolute_path(file.path())?;
        tokio::fs::read(&disk_path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                SaveError::NotFound(file.path().to_string())
            } else {
                SaveError::io(file.path(), e)
            }
        })
    }

    async fn create_binary(&self, path: &str, bytes: &[u8]) -> Result<TrackedFile, SaveError> {
        let disk_path = self.absolute_path(path)?;
        if disk_path.exists() {
            return Err(SaveError::AlreadyExists(path.to_string()));
        }

        self.ensure_parent_dir(&disk_path, path).await?;
        tokio::fs::write(&disk_path, bytes)
            .await
            .map_err(|e| SaveError::io(path, e))?;

        Ok(TrackedFile::new(path))
    }

    async fn modify_binary(&self, file: &TrackedFile, bytes: &[u8]) -> Result<(), SaveError> {
        let disk_path = self.absolute_path(file.path())?;
        if !disk_path.is_file() {
            return Err(SaveError::NotFound(file.path().to_string()));
        }

        tokio::fs::write(&disk_path, bytes)
            .await
            .map_err(|e| SaveError::io(file.path(), e))
    }

    async fn rename_and_relink(&self, file: &mut TrackedFile, new_path: &str) -> Result<(), SaveError> {
        let old_path = file.path().to_string();
        let new_path = normalize_path(new_path);
        let from = self.absolute_path(&old_path)?;
        let to = self.absolute_path(&new_path)?;

        if to.exists() {
            return Err(SaveError::AlreadyExists(new_path));
        }

        let pending = self
            .plan_relinks(&old_path, &new_path)
            .await
            .map_err(|e| SaveError::Rename {
                from: old_path.clone(),
                to: new_path.clone(),
                reason: format!("无法读取笔记，未做任何改动: {}", e),
            })?;

        self.ensure_parent_dir(&to, &new_path).await?;
        tokio::fs::rename(&from, &to)
            .await
            .map_err(|e| SaveError::Rename {
                from: old_path.clone(),
                to: new_path.clone(),
                reason: e.to_string(),
            })?;
        file.set_path(&new_path);

        let total = pending.len();
        let failed = Self::apply_relinks(pending).await;
        if !failed.is_empty() {
            return Err(SaveError::Relink {
                from: old_path,
                to: new_path,
                reason: format!("以下笔记写回失败: {}", failed.join(", ")),
            });
        }

        log::info!("🔗 {} -> {}，已更新 {} 篇笔记中的链接", old_path, new_path, total);
        Ok(())
    }

    fn generate_markdown_link(&self, target: &TrackedFile, _source_path: &str) -> String {
        format!("[[{}]]", target.path())
    }
}

/// 改写单篇笔记中指向 `old_path` 的链接；无变化时返回 `None`。
pub fn rewrite_links(content: &str, note_path: &str, old_path: &str, new_path: &str) -> Option<String> {
    let old_name = file_name(old_path);
    let new_name = file_name(new_path);
    let note_dir = note_path.rsplit_once('/').map_or("", |(dir, _)| dir);

    let after_wiki = WIKI_LINK.replace_all(content, |caps: &Captures| {
        let target = caps[2].trim();
        let replacement = if target == old_path {
            new_path
        } else if target == old_name {
            new_name
        } else {
            return caps[0].to_string();
        };
        format!("{}[[{}{}]]", &caps[1], replacement, &caps[3])
    });

    let after_markdown = MARKDOWN_LINK.replace_all(&after_wiki, |caps: &Captures| {
        let raw = caps[2].trim();
        let encoded = raw.contains("%20");
        let target = raw.replace("%20", " ");

        let replacement = if normalize_path(&target) == old_path && !target.starts_with('.') {
            // 库内绝对路径写法（同目录下的纯文件名也会落在这里）
            if target.contains('/') {
                new_path.to_string()
            } else {
                relative_path(note_dir, new_path)
            }
        } else if resolve_relative(note_dir, &target).as_deref() == Some(old_path) {
            relative_path(note_dir, new_path)
        } else {
            return caps[0].to_string();
        };

        let replacement = if encoded {
            replacement.replace(' ', "%20")
        } else {
            replacement
        };
        format!("{}({})", &caps[1], replacement)
    });

    if after_markdown == content {
        None
    } else {
        Some(after_markdown.into_owned())
    }
}

fn file_name(path: &str) -> &str {
    path.rsplit_once('/').map_or(path, |(_, name)| name)
}

/// 将相对 `dir` 的路径解析为库内路径，越出库根目录时返回 `None`。
fn resolve_relative(dir: &str, relative: &str) -> Option<String> {
    let mut segments: Vec<&str> = dir.split('/').filter(|s| !s.is_empty()).collect();
    for segment in relative.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop()?;
            }
            other => segments.push(other),
        }
    }
    Some(segments.join("/"))
}

/// 计算从目录 `from_dir` 指向库内路径 `to` 的相对路径。
fn relative_path(from_dir: &str, to: &str) -> String {
    let from: Vec<&str> = from_dir.split('/').filter(|s| !s.is_empty()).collect();
    let target: Vec<&str> = to.split('/').filter(|s| !s.is_empty()).collect();

    let common = from
        .iter()
        .zip(target.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut parts: Vec<&str> = std::iter::repeat_n("..", from.len() - common).collect();
    parts.extend(&target[common..]);
    parts.join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wiki_links_are_rewritten_by_path_and_name() {
        let content = "see ![[img/cat.png]] and [[cat.png|the cat]] and [[dog.png]]";
        let updated = rewrite_links(content, "notes/pets.md", "img/cat.png", "img/cat.webp")
            .expect("content should change");

        assert_eq!(
            updated,
            "see ![[img/cat.webp]] and [[cat.webp|the cat]] and [[dog.png]]"
        );
    }

    #[test]
    fn markdown_links_keep_relative_style() {
        let content = "![a](../img/cat.png) ![b](img/cat.png) ![c](other.png)";
        let updated = rewrite_links(content, "notes/pets.md", "img/cat.png", "img/cat.webp")
            .expect("content should change");

        assert_eq!(updated, "![a](../img/cat.webp) ![b](img/cat.webp) ![c](other.png)");
    }

    #[test]
    fn encoded_spaces_are_preserved() {
        let content = "![x](my%20cat.png)";
        let updated = rewrite_links(content, "my notes.md", "my cat.png", "my cat.webp")
            .expect("content should change");
        assert_eq!(updated, "![x](my%20cat.webp)");
    }

    #[test]
    fn unrelated_content_is_untouched() {
        assert!(rewrite_links("[[cats.png]] [x](cat.pngx)", "a.md", "cat.png", "cat.webp").is_none());
    }

    #[test]
    fn relative_path_walks_up_and_down() {
        assert_eq!(relative_path("notes/daily", "img/a.webp"), "../../img/a.webp");
        assert_eq!(relative_path("", "img/a.webp"), "img/a.webp");
        assert_eq!(relative_path("img", "img/a.webp"), "a.webp");
        assert_eq!(resolve_relative("notes", "../img/a.png").as_deref(), Some("img/a.png"));
        assert_eq!(resolve_relative("", "../a.png"), None);
    }
}
