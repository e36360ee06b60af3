use tagsight::{DetectorConfig, LabelTable, OrtEngine, YoloDetector, draw_detections, image_to_pixels, load_image};
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

    let config = DetectorConfig::default()
        .with_confidence_threshold(0.25)
        .with_iou_threshold(0.45);
    let engine = OrtEngine::from_file(&model_path, &config)?;
    let labels = LabelTable::from_file(&labels_path)?;
    let window = config.window_size;
    let mut detector = YoloDetector::new(engine, config, labels)?;

    let image = load_image(&image_path)?;
    println!("原始图像尺寸: {}x{}", image.width(), image.height());

    let (pixels, width) = image_to_pixels(&image);
    let boxes = detector.detect(&pixels, width).await?;
    println!("检测到 {} 个目标", boxes.len());
    for (i, bbox) in boxes.iter().enumerate() {
        println!("目标 {}: {}", i + 1, bbox);
    }

    let result_image = draw_detections(&image, &boxes, window)?;
    let output_path = "results/detect_image_result.png";
    std::fs::create_dir_all("results")?;
    result_image.save(output_path)?;
    println!("结果已保存到: {}", output_path);

    Ok(())
}
