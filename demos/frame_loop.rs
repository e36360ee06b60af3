use std::time::Instant;

use tagsight::config::FRAME_CHANNEL_CAPACITY;
use tagsight::{DetectionLoop, DetectorConfig, Frame, LabelTable, OrtEngine, YoloDetector, load_image};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut args = std::env::args().skip(1);
    let model_path = args.next().unwrap_or_else(|| "models/markers.onnx".to_string());
    let labels_path = args.next().unwrap_or_else(|| "models/labels.txt".to_string());
    let image_path = args.next().unwrap_or_else(|| "data/frame.jpg".to_string());
    let frames: usize = args.next().and_then(|n| n.parse().ok()).unwrap_or(30);

    let config = DetectorConfig::default();
    let engine = OrtEngine::from_file(&model_path, &config)?;
    let labels = LabelTable::from_file(&labels_path)?;
    let detector = YoloDetector::new(engine, config, labels)?;

    let frame = Frame::from_image(&load_image(&image_path)?);
    let mut runner = DetectionLoop::start(detector, FRAME_CHANNEL_CAPACITY);

    let start_total = Instant::now();
    let mut received = 0;
    let mut submitted = 0;
    // 保持至多一个帧在排队，模拟实时采集
    while received < frames {
        if submitted < frames && submitted - received < 2 {
            runner.submit(frame.clone()).await?;
            submitted += 1;
            continue;
        }
        match runner.next_result().await {
            Some(Ok(boxes)) => println!("帧 {}: {} 个目标", received, boxes.len()),
            Some(Err(e)) => eprintln!("帧 {}: 检测失败: {}", received, e),
            None => break,
        }
        received += 1;
    }

    let total_duration = start_total.elapsed();
    println!("总处理耗时: {:?}", total_duration);
    println!("平均 FPS: {:.2}", received as f64 / total_duration.as_secs_f64());

    runner.stop();
    runner.join().await?;
    Ok(())
}
