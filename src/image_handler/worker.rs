//! # 隔离变换模块（TransformWorker）
//!
//! ## 设计思路
//!
//! 像素处理可能很慢，不能阻塞宿主线程。每个请求创建一个一次性的
//! `TransformWorker`：在 tokio 阻塞线程池上运行完整的
//! “解码 → 透明化 → 编码”，通过 `oneshot` 通道回传**唯一一条**
//! `WorkerResponse`，随后任务结束，不做池化复用。
//!
//! ## 实现思路
//!
//! - 请求以所有权转移的方式进入隔离任务，不共享可变状态。
//! - 任务内部 `catch_unwind`，panic 也会被转换为失败响应，不会穿越边界。
//! - `BitmapHandle` 在绘制后立即关闭；错误和 panic 路径由 `Drop` 兜底，
//!   且 `run` 会等待任务完全结束后才返回。
//! - 通道断开或运行时不可用统一映射为 `ProcessingError::Context`。

use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;

use tokio::sync::oneshot;

use super::source::{TransformRequest, TransformResult, TransformSource, WorkerResponse};
use super::{ImageCodec, OutputFormat, ProcessingError, transform};

/// 一次性变换执行器：一个请求、一个响应，然后销毁。
#[derive(Debug)]
pub struct TransformWorker {
    request: TransformRequest,
}

impl TransformWorker {
    pub fn new(request: TransformRequest) -> Self {
        Self { request }
    }

    /// 在隔离上下文中执行变换并等待唯一响应。
    ///
    /// # 示例
    /// ```rust,ignore
    /// use illuminator::image_handler::{OutputFormat, TransformRequest, TransformSource, TransformWorker};
    ///
    /// # async fn demo(bytes: Vec<u8>) -> Result<(), illuminator::image_handler::ProcessingError> {
    /// let request = TransformRequest::new(TransformSource::Bytes(bytes), 235, true, OutputFormat::WebP);
    /// let result = TransformWorker::new(request).run().await?;
    /// assert_eq!(result.extension, "webp");
    /// # Ok(())
    /// # }
    /// ```
    pub async fn run(self) -> Result<TransformResult, ProcessingError> {
        let output_format = self.request.output_format;
        let response = self.dispatch().await?;
        Self::into_result(response, output_format)
    }

    /// 把请求移交给阻塞线程池，返回跨边界的原始响应消息。
    pub async fn dispatch(self) -> Result<WorkerResponse, ProcessingError> {
        let request = self.request;

        if tokio::runtime::Handle::try_current().is_err() {
            drop(request);
            return Err(ProcessingError::Context(
                "当前线程没有可用的异步运行时，无法创建隔离执行上下文".to_string(),
            ));
        }

        let (tx, rx) = oneshot::channel::<WorkerResponse>();
        let task = tokio::task::spawn_blocking(move || {
            let response = match panic::catch_unwind(AssertUnwindSafe(move || Self::execute(request))) {
                Ok(response) => response,
                Err(payload) => {
                    let message = panic_message(payload.as_ref());
                    log::error!("变换任务发生 panic：{}", message);
                    WorkerResponse::failed(&ProcessingError::Context(format!(
                        "变换任务异常终止：{}",
                        message
                    )))
                }
            };

            if tx.send(response).is_err() {
                log::warn!("变换结果无人接收，已丢弃");
            }
        });

        let received = rx.await;
        if let Err(err) = task.await {
            log::error!("变换任务未能正常结束：{}", err);
        }

        received.map_err(|_| ProcessingError::Context("变换任务未返回任何结果".to_string()))
    }

    fn execute(request: TransformRequest) -> WorkerResponse {
        match Self::transform_blocking(request) {
            Ok(result) => WorkerResponse::ok(result),
            Err(err) => {
                log::debug!("变换失败 [{}]：{}", err.code(), err.message());
                WorkerResponse::failed(&err)
            }
        }
    }

    fn transform_blocking(request: TransformRequest) -> Result<TransformResult, ProcessingError> {
        let TransformRequest {
            source,
            threshold,
            apply_alpha_mask,
            output_format,
            quality,
            limits,
        } = request;

        let total_start = Instant::now();
        let codec = ImageCodec::new(limits);

        let decode_start = Instant::now();
        let mut pixels = match source {
            TransformSource::Bytes(bytes) => codec.decode(&bytes)?,
            TransformSource::Bitmap(mut handle) => handle.draw_and_close()?,
        };
        let decode_elapsed = decode_start.elapsed();

        if apply_alpha_mask {
            transform::apply_alpha_mask(&mut pixels, threshold);
        }

        let encode_start = Instant::now();
        let bytes = codec.encode(&pixels, output_format, quality)?;
        let encode_elapsed = encode_start.elapsed();

        log::info!(
            "✅ 图片变换完成 - {}x{} transparency={} threshold={} -> {} decode={}ms encode={}ms total={}ms",
            pixels.width(),
            pixels.height(),
            apply_alpha_mask,
            threshold,
            output_format.extension(),
            decode_elapsed.as_millis(),
            encode_elapsed.as_millis(),
            total_start.elapsed().as_millis()
        );

        Ok(TransformResult {
            bytes,
            extension: output_format.extension(),
        })
    }

    /// 将跨边界消息还原为类型化结果。
    fn into_result(
        response: WorkerResponse,
        output_format: OutputFormat,
    ) -> Result<TransformResult, ProcessingError> {
        if !response.success {
            let message = response
                .error
                .unwrap_or_else(|| "变换失败且未提供原因".to_string());
            return Err(ProcessingError::from_code(response.error_code.as_deref(), message));
        }

        let bytes = response
            .blob
            .ok_or_else(|| ProcessingError::Context("变换响应缺少图片数据".to_string()))?;

        match response.ext.as_deref() {
            Some(ext) if ext == output_format.extension() => Ok(TransformResult {
                bytes,
                extension: output_format.extension(),
            }),
            other => Err(ProcessingError::Context(format!(
                "变换响应扩展名异常：{:?}（期望 {}）",
                other,
                output_format.extension()
            ))),
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "未知 panic".to_string()
    }
}
