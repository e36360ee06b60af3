use std::future::Future;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use ort::{session::Session, value::Tensor};
use tracing::debug;

use crate::color::model::load_model;
use crate::color::posts::RawOutput;
use crate::color::prevs::InputTensor;
use crate::config::DetectorConfig;
use crate::error::{DetectError, Result};

/// 推理引擎
///
/// 接收归一化后的输入张量，异步地产生原始输出。检测流程在这里让出执行权，
/// 等引擎完成后再继续。调用方丢弃返回的 future 即视为取消，引擎自身如何
/// 处理取消由实现决定。
pub trait InferenceEngine: Send {
    fn infer(&mut self, input: &InputTensor) -> impl Future<Output = Result<RawOutput>> + Send;
}

/// 基于 ONNX Runtime 的推理引擎
///
/// 会话在 tokio 的阻塞线程池上运行，不占用事件循环。
pub struct OrtEngine {
    session: Arc<Mutex<Session>>,
    input_name: String,
    output_name: String,
}

impl OrtEngine {
    pub fn new(session: Session, input_name: &str, output_name: &str) -> Self {
        Self {
            session: Arc::new(Mutex::new(session)),
            input_name: input_name.to_string(),
            output_name: output_name.to_string(),
        }
    }

    /// 加载模型文件，张量名称取自配置
    pub fn from_file(model_path: impl AsRef<Path>, config: &DetectorConfig) -> Result<Self> {
        let session = load_model(model_path)?;
        Ok(Self::new(session, &config.input_name, &config.output_name))
    }
}

impl InferenceEngine for OrtEngine {
    async fn infer(&mut self, input: &InputTensor) -> Result<RawOutput> {
        let session = Arc::clone(&self.session);
        let input_name = self.input_name.clone();
        let output_name = self.output_name.clone();
        let shape = input.shape();
        let data = input.as_slice().to_vec();

        let start_time = Instant::now();
        let output = tokio::task::spawn_blocking(move || -> Result<RawOutput> {
            let mut session = session
                .lock()
                .map_err(|_| DetectError::inference("推理会话锁已损坏"))?;
            let input_tensor = Tensor::from_array((shape, data))?;
            let outputs = session.run(ort::inputs![input_name.as_str() => input_tensor])?;

            let (out_shape, out_data) = outputs[output_name.as_str()].try_extract_tensor::<f32>()?;
            let out_shape = out_shape.iter().map(|&d| d as usize).collect();
            Ok(RawOutput::new(out_shape, out_data.to_vec()))
        })
        .await
        .map_err(DetectError::inference)??;

        debug!("模型推理耗时: {:?}", start_time.elapsed());
        Ok(output)
    }
}
