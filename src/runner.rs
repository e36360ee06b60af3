use image::{DynamicImage, Rgba};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::color::{BoundingBox, Detector, image_to_pixels};
use crate::error::{DetectError, Result};

/// 一帧采集数据
#[derive(Debug, Clone, Default)]
pub struct Frame {
    /// 行优先的像素序列
    pub pixels: Vec<Rgba<u8>>,
    pub width: usize,
}

impl Frame {
    pub fn new(pixels: Vec<Rgba<u8>>, width: usize) -> Self {
        Self { pixels, width }
    }

    pub fn from_image(image: &DynamicImage) -> Self {
        let (pixels, width) = image_to_pixels(image);
        Self { pixels, width }
    }
}

/// 检测循环
///
/// 在 tokio 任务中持有检测器，逐帧串行检测，结果按提交顺序从结果通道送出。
/// 同一时刻只有一次检测在进行。停止时正在进行的检测被丢弃，其结果不会送出。
pub struct DetectionLoop {
    frames: mpsc::Sender<Frame>,
    results: mpsc::Receiver<Result<Vec<BoundingBox>>>,
    shutdown: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl DetectionLoop {
    /// 启动检测循环
    ///
    /// # 参数
    /// * `detector` - 检测器，所有权移入循环任务
    /// * `capacity` - 帧通道与结果通道的容量
    ///
    /// 必须在 tokio 运行时中调用。
    pub fn start<D>(detector: D, capacity: usize) -> Self
    where
        D: Detector + Send + 'static,
    {
        let (frame_tx, frame_rx) = mpsc::channel(capacity.max(1));
        let (result_tx, result_rx) = mpsc::channel(capacity.max(1));
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let handle = tokio::spawn(run_loop(detector, frame_rx, result_tx, shutdown_rx));

        Self {
            frames: frame_tx,
            results: result_rx,
            shutdown: Some(shutdown_tx),
            handle: Some(handle),
        }
    }

    /// 提交一帧，通道满时等待
    pub async fn submit(&self, frame: Frame) -> Result<()> {
        self.frames.send(frame).await.map_err(|_| DetectError::Closed)
    }

    /// 等待下一个检测结果，循环结束且结果取尽后返回 None
    pub async fn next_result(&mut self) -> Option<Result<Vec<BoundingBox>>> {
        self.results.recv().await
    }

    /// 停止循环
    pub fn stop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
    }

    /// 检查循环是否正在运行
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// 等待循环任务结束
    pub async fn join(&mut self) -> Result<()> {
        if let Some(handle) = self.handle.take() {
            handle
                .await
                .map_err(|e| DetectError::TaskFailed(e.to_string()))?;
        }
        Ok(())
    }
}

impl Drop for DetectionLoop {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn run_loop<D: Detector>(
    mut detector: D,
    mut frames: mpsc::Receiver<Frame>,
    results: mpsc::Sender<Result<Vec<BoundingBox>>>,
    mut shutdown: oneshot::Receiver<()>,
) {
    loop {
        let frame = tokio::select! {
            biased;
            _ = &mut shutdown => break,
            frame = frames.recv() => match frame {
                Some(frame) => frame,
                None => break,
            },
        };

        let outcome = tokio::select! {
            biased;
            _ = &mut shutdown => {
                debug!("检测循环停止, 丢弃进行中的检测");
                break;
            }
            outcome = detector.detect(frame.pixels.as_slice(), frame.width) => outcome,
        };
        if let Err(e) = &outcome {
            warn!("检测失败: {}", e);
        }

        tokio::select! {
            biased;
            _ = &mut shutdown => break,
            sent = results.send(outcome) => {
                if sent.is_err() {
                    break;
                }
            }
        }
    }
    debug!("检测循环已退出");
}
