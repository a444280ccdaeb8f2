// Shared in-memory host doubles for integration tests
#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::io::Cursor;

use image::{DynamicImage, ImageBuffer, ImageFormat, Rgba};
use illuminator::orchestrator::{Editor, Notifier};
use illuminator::vault::{SaveError, TrackedFile, Vault};

/// 内存库：文件内容、笔记文本与调用轨迹。
#[derive(Default)]
pub struct MemoryVault {
    pub files: RefCell<BTreeMap<String, Vec<u8>>>,
    pub folders: RefCell<Vec<String>>,
    pub notes: RefCell<BTreeMap<String, String>>,
    pub trace: RefCell<Vec<String>>,
    pub attachment_folder: Option<String>,
    /// 为真时改名照常完成，但报告链接改写失败。
    pub relink_fails: bool,
}

impl MemoryVault {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file(&self, path: &str, bytes: Vec<u8>) {
        self.files.borrow_mut().insert(path.to_string(), bytes);
    }

    pub fn add_folder(&self, path: &str) {
        self.folders.borrow_mut().push(path.to_string());
    }

    pub fn add_note(&self, path: &str, content: &str) {
        self.notes.borrow_mut().insert(path.to_string(), content.to_string());
    }

    pub fn file(&self, path: &str) -> Option<Vec<u8>> {
        self.files.borrow().get(path).cloned()
    }

    pub fn note(&self, path: &str) -> String {
        self.notes.borrow().get(path).cloned().unwrap_or_default()
    }

    pub fn trace(&self) -> Vec<String> {
        self.trace.borrow().clone()
    }
}

impl Vault for MemoryVault {
    fn exists(&self, path: &str) -> bool {
        self.files.borrow().contains_key(path)
            || self.notes.borrow().contains_key(path)
            || self.folders.borrow().iter().any(|f| f == path)
    }

    fn attachment_folder(&self) -> Option<String> {
        self.attachment_folder.clone()
    }

    async fn read_binary(&self, file: &TrackedFile) -> Result<Vec<u8>, SaveError> {
        self.file(file.path())
            .ok_or_else(|| SaveError::NotFound(file.path().to_string()))
    }

    async fn create_binary(&self, path: &str, bytes: &[u8]) -> Result<TrackedFile, SaveError> {
        if self.exists(path) {
            return Err(SaveError::AlreadyExists(path.to_string()));
        }
        self.trace.borrow_mut().push(format!("create {}", path));
        self.add_file(path, bytes.to_vec());
        Ok(TrackedFile::new(path))
    }

    async fn modify_binary(&self, file: &TrackedFile, bytes: &[u8]) -> Result<(), SaveError> {
        if !self.files.borrow().contains_key(file.path()) {
            return Err(SaveError::NotFound(file.path().to_string()));
        }
        self.trace.borrow_mut().push(format!("modify {}", file.path()));
        self.add_file(file.path(), bytes.to_vec());
        Ok(())
    }

    async fn rename_and_relink(&self, file: &mut TrackedFile, new_path: &str) -> Result<(), SaveError> {
        let old_path = file.path().to_string();
        let bytes = self
            .files
            .borrow_mut()
            .remove(&old_path)
            .ok_or_else(|| SaveError::NotFound(old_path.clone()))?;
        self.trace
            .borrow_mut()
            .push(format!("rename {} -> {}", old_path, new_path));
        self.add_file(new_path, bytes);

        file.set_path(new_path);
        if self.relink_fails {
            return Err(SaveError::Relink {
                from: old_path,
                to: new_path.to_string(),
                reason: "note locked".to_string(),
            });
        }

        for content in self.notes.borrow_mut().values_mut() {
            *content = content.replace(&old_path, new_path);
        }
        Ok(())
    }

    fn generate_markdown_link(&self, target: &TrackedFile, _source_path: &str) -> String {
        format!("[[{}]]", target.path())
    }
}

/// 收集通知文本。
#[derive(Default)]
pub struct RecordingNotifier {
    pub messages: RefCell<Vec<String>>,
}

impl RecordingNotifier {
    pub fn messages(&self) -> Vec<String> {
        self.messages.borrow().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notice(&self, message: &str) {
        self.messages.borrow_mut().push(message.to_string());
    }
}

/// 记录插入文本的编辑器。
#[derive(Default)]
pub struct RecordingEditor {
    pub active: Option<String>,
    pub inserted: Vec<String>,
}

impl Editor for RecordingEditor {
    fn active_file(&self) -> Option<String> {
        self.active.clone()
    }

    fn replace_selection(&mut self, text: &str) {
        self.inserted.push(text.to_string());
    }
}

pub fn encode_png(width: u32, height: u32, pixels: &[[u8; 4]]) -> Vec<u8> {
    let img = ImageBuffer::from_fn(width, height, |x, y| Rgba(pixels[(y * width + x) as usize]));
    let mut cursor = Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(img)
        .write_to(&mut cursor, ImageFormat::Png)
        .expect("failed to encode test png");
    cursor.into_inner()
}

pub fn white_and_dark_png() -> Vec<u8> {
    encode_png(2, 1, &[[255, 255, 255, 255], [10, 10, 10, 255]])
}

pub fn decode_rgba(bytes: &[u8]) -> Vec<[u8; 4]> {
    image::load_from_memory(bytes)
        .expect("failed to decode output")
        .to_rgba8()
        .pixels()
        .map(|p| p.0)
        .collect()
}

/// 只取 alpha 通道，用于不关心完全透明像素颜色值的断言。
pub fn decode_alpha(bytes: &[u8]) -> Vec<u8> {
    decode_rgba(bytes).iter().map(|p| p[3]).collect()
}
