//! # Illuminator — 库入口
//!
//! 为笔记库中的图片做后处理：可选地去除近白背景（按逐通道阈值设透明），
//! 可选地转码为 WebP，然后写回库中并保持文档链接一致。
//!
//! ## 架构总览
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                宿主（笔记应用 / 命令行）                  │
//! │   粘贴事件 ── 右键菜单 ── 编辑器 ── 通知 ── 确认弹窗      │
//! └───────┬───────────────────┬──────────────────────────────┘
//!         ↓                   ↓
//! ┌───────┴───────────────────┴──────────────────────────────┐
//! │  orchestrator                                            │
//! │   ├─ paste          新建文件 + 插入嵌入链接               │
//! │   └─ context_menu   原地处理（单个 / 批量确认）           │
//! │        ↓                                                 │
//! │  image_handler                                           │
//! │   └─ TransformWorker（隔离执行，单请求单响应）            │
//! │        ├─ ImageCodec   解码 / 编码                        │
//! │        └─ transform    阈值透明化                         │
//! │        ↓                                                 │
//! │  vault                                                   │
//! │   ├─ path_resolver  唯一路径                              │
//! │   ├─ reconcile      先改名再覆写 / 备份                   │
//! │   └─ fs_vault       本地目录实现                          │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## 模块职责
//!
//! | 模块 | 职责 |
//! |------|------|
//! | [`error`] | 统一错误类型 `AppError` |
//! | [`settings`] | 插件设置的默认值与 JSON 读写 |
//! | [`image_handler`] | 解码、透明化、编码与隔离执行 |
//! | [`vault`] | 库抽象、唯一路径、落盘协调、本地目录实现 |
//! | [`orchestrator`] | 粘贴与右键菜单两个入口 |

pub mod error;
pub mod image_handler;
pub mod orchestrator;
pub mod settings;
pub mod vault;
