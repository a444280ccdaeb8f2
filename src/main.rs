//! # Illuminator — 命令行入口
//!
//! 把一个本地目录当作笔记库，提供两个子命令：
//! - `process`：对库内已有图片原地处理（对应右键菜单）
//! - `paste`：把外部图片当作粘贴内容写入库中，并把嵌入链接追加到指定笔记

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use clap::{Parser, Subcommand};

use illuminator::error::AppError;
use illuminator::orchestrator::{
    ContextMenuOrchestrator, Editor, IlluminateOutcome, Notifier, PasteOrchestrator, PastedImage,
};
use illuminator::settings::{IlluminatorSettings, load_settings};
use illuminator::vault::{FsVault, TrackedFile, normalize_path};

#[derive(Debug, Parser)]
#[command(name = "illuminator", version, about = "去除图片近白背景并转码为 WebP")]
struct Cli {
    /// 库根目录
    #[arg(long, global = true, default_value = ".")]
    vault: PathBuf,

    /// 设置文件（JSON），不存在时使用默认设置
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    /// 覆盖附件目录
    #[arg(long, global = true)]
    attachment_folder: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// 原地处理库内图片（库内相对路径）
    Process {
        /// 多选时跳过确认
        #[arg(long, short = 'y')]
        yes: bool,
        files: Vec<String>,
    },
    /// 将外部图片作为粘贴内容写入库中
    Paste {
        /// 接收嵌入链接的笔记（库内相对路径）
        #[arg(long)]
        note: String,
        files: Vec<PathBuf>,
    },
}

/// 把通知直接打印到终端。
struct StdoutNotifier;

impl Notifier for StdoutNotifier {
    fn notice(&self, message: &str) {
        println!("{}", message);
    }
}

/// 把插入的链接追加到笔记末尾。
struct NoteAppender {
    note: String,
    inserted: Vec<String>,
}

impl Editor for NoteAppender {
    fn active_file(&self) -> Option<String> {
        Some(self.note.clone())
    }

    fn replace_selection(&mut self, text: &str) {
        self.inserted.push(text.to_string());
    }
}

fn confirm_on_stdin(count: usize) -> bool {
    print!("即将原地覆写 {} 张图片，如需保留原图请在设置中开启备份。继续？[y/N] ", count);
    if io::stdout().flush().is_err() {
        return false;
    }

    let mut answer = String::new();
    match io::stdin().lock().read_line(&mut answer) {
        Ok(_) => matches!(answer.trim(), "y" | "Y" | "yes"),
        Err(err) => {
            log::warn!("读取确认输入失败: {err}");
            false
        }
    }
}

async fn run(cli: Cli) -> Result<(), AppError> {
    let settings = match &cli.settings {
        Some(path) => load_settings(path)?,
        None => IlluminatorSettings::default(),
    };

    let mut vault = FsVault::open(&cli.vault)?;
    if let Some(folder) = &cli.attachment_folder {
        vault = vault.with_attachment_folder(folder);
    }
    let notifier = StdoutNotifier;

    match cli.command {
        Command::Process { yes, files } => {
            let files = files.iter().map(TrackedFile::new).collect::<Vec<_>>();
            let orchestrator = ContextMenuOrchestrator::new(&vault, &notifier, settings);
            let outcome = orchestrator
                .illuminate(files, |count| yes || confirm_on_stdin(count))
                .await;

            match outcome {
                IlluminateOutcome::NothingToDo => println!("没有可处理的图片（支持 png / jpg / jpeg / webp）"),
                IlluminateOutcome::Cancelled => println!("已取消"),
                IlluminateOutcome::Completed(report) => {
                    for path in &report.final_paths {
                        println!("{}", path);
                    }
                }
            }
        }
        Command::Paste { note, files } => {
            // 先校验笔记路径，避免处理完图片才发现无处写链接
            vault.note_path(&note)?;

            let mut pasted = Vec::with_capacity(files.len());
            for path in &files {
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_default();
                pasted.push(PastedImage::new(name, tokio::fs::read(path).await?));
            }

            let orchestrator = PasteOrchestrator::new(&vault, &notifier, settings);
            let images = orchestrator.collect_images(pasted);
            if images.is_empty() {
                println!("没有需要处理的图片");
                return Ok(());
            }

            let mut editor = NoteAppender {
                note: normalize_path(&note),
                inserted: Vec::new(),
            };
            orchestrator.handle_paste(images, &mut editor).await;

            if !editor.inserted.is_empty() {
                vault.append_to_note(&editor.note, &editor.inserted).await?;
            }
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    if let Err(err) = run(cli).await {
        log::error!("{err}");
        std::process::exit(1);
    }
}
