use ndarray::{Array2, array};
use tagsight::color::model::LabelTable;
use tagsight::color::posts::{DecodeOptions, RawOutput, decode, sigmoid};
use tagsight::config::{ClassScore, OutputLayout};
use tagsight::suppress;

fn marker_labels() -> LabelTable {
    LabelTable::from(&["QR", "ArUco", "Other"][..])
}

fn options(num_rows: usize, min_confidence: f32) -> DecodeOptions {
    DecodeOptions {
        num_rows,
        num_classes: 3,
        min_confidence,
        class_score: ClassScore::Raw,
        box_scale: 1.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_marker_scenario() -> Result<(), Box<dyn std::error::Error>> {
        let table = array![
            [100.0, 120.0, 40.0, 30.0, 10.0, 0.9, 0.1, 0.05],
            [50.0, 60.0, 20.0, 20.0, -10.0, 0.9, 0.1, 0.05],
        ];
        let candidates = decode(table.view(), &marker_labels(), &options(2, 0.5))?;

        assert_eq!(candidates.len(), 1);
        let qr = &candidates[0];
        assert_eq!(qr.label, "QR");
        assert_eq!(qr.class_id, 0);
        assert!(qr.confidence > 0.99);
        assert!((qr.score - qr.confidence * 0.9).abs() < 1e-6);
        assert_eq!(qr.dimensions.x, 100.0);
        assert_eq!(qr.dimensions.height, 30.0);
        Ok(())
    }

    #[test]
    fn test_decode_confidence_equal_to_threshold_passes() -> Result<(), Box<dyn std::error::Error>> {
        // sigmoid(0) == 0.5
        let table = array![[1.0, 1.0, 1.0, 1.0, 0.0, 1.0, 0.0, 0.0]];
        let candidates = decode(table.view(), &marker_labels(), &options(1, 0.5))?;

        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].confidence, 0.5);
        Ok(())
    }

    #[test]
    fn test_decode_never_keeps_low_objectness() -> Result<(), Box<dyn std::error::Error>> {
        let logits: Vec<f32> = (-20..=20).map(|i| i as f32 * 0.25).collect();
        let mut table = Array2::<f32>::zeros((logits.len(), 8));
        for (i, &logit) in logits.iter().enumerate() {
            table[[i, 2]] = 4.0;
            table[[i, 3]] = 4.0;
            table[[i, 4]] = logit;
            table[[i, 5]] = 1.0;
        }

        for threshold in [0.0, 0.1, 0.25, 0.5, 0.75, 0.9, 1.0] {
            let candidates = decode(table.view(), &marker_labels(), &options(logits.len(), threshold))?;
            let expected = logits.iter().filter(|&&l| sigmoid(l) >= threshold).count();
            assert_eq!(candidates.len(), expected);
            assert!(candidates.iter().all(|c| c.confidence >= threshold));
        }
        Ok(())
    }

    #[test]
    fn test_decode_drops_low_combined_score() -> Result<(), Box<dyn std::error::Error>> {
        let table = array![[1.0, 1.0, 1.0, 1.0, 10.0, 0.3, 0.2, 0.1]];
        let candidates = decode(table.view(), &marker_labels(), &options(1, 0.5))?;
        assert!(candidates.is_empty());
        Ok(())
    }

    #[test]
    fn test_decode_class_tie_takes_first_index() -> Result<(), Box<dyn std::error::Error>> {
        let table = array![[1.0, 1.0, 1.0, 1.0, 10.0, 0.1, 0.7, 0.7]];
        let candidates = decode(table.view(), &marker_labels(), &options(1, 0.5))?;
        assert_eq!(candidates[0].label, "ArUco");
        Ok(())
    }

    #[test]
    fn test_decode_keeps_row_order() -> Result<(), Box<dyn std::error::Error>> {
        let table = array![
            [1.0, 1.0, 1.0, 1.0, 1.0, 0.0, 0.0, 1.0],
            [2.0, 2.0, 1.0, 1.0, 9.0, 1.0, 0.0, 0.0],
            [3.0, 3.0, 1.0, 1.0, 5.0, 0.0, 1.0, 0.0],
        ];
        let candidates = decode(table.view(), &marker_labels(), &options(3, 0.5))?;
        let labels: Vec<&str> = candidates.iter().map(|c| c.label.as_str()).collect();
        assert_eq!(labels, vec!["Other", "QR", "ArUco"]);
        Ok(())
    }

    #[test]
    fn test_decode_softmax_changes_class_score() -> Result<(), Box<dyn std::error::Error>> {
        let table = array![[1.0, 1.0, 1.0, 1.0, 10.0, 1.0, 1.0, -100.0]];

        let raw = decode(table.view(), &marker_labels(), &options(1, 0.5))?;
        assert_eq!(raw.len(), 1);

        let softmax = DecodeOptions {
            class_score: ClassScore::Softmax,
            ..options(1, 0.5)
        };
        // 两个类别各占约一半，乘积略低于 0.5
        assert!(decode(table.view(), &marker_labels(), &softmax)?.is_empty());

        let sigmoid_mode = DecodeOptions {
            class_score: ClassScore::Sigmoid,
            ..options(1, 0.5)
        };
        let kept = decode(table.view(), &marker_labels(), &sigmoid_mode)?;
        assert!((kept[0].score - kept[0].confidence * sigmoid(1.0)).abs() < 1e-6);
        Ok(())
    }

    #[test]
    fn test_decode_applies_box_scale() -> Result<(), Box<dyn std::error::Error>> {
        let table = array![[2.0, 3.0, 4.0, 5.0, 10.0, 1.0, 0.0, 0.0]];
        let scaled = DecodeOptions {
            box_scale: 8.0,
            ..options(1, 0.5)
        };
        let candidates = decode(table.view(), &marker_labels(), &scaled)?;
        let d = candidates[0].dimensions;
        assert_eq!((d.x, d.y, d.width, d.height), (16.0, 24.0, 32.0, 40.0));
        Ok(())
    }

    #[test]
    fn test_decode_label_out_of_range_fails_whole_decode() {
        let labels = LabelTable::from(&["QR"][..]);
        let table = array![
            [1.0, 1.0, 1.0, 1.0, 10.0, 1.0, 0.0, 0.0],
            [1.0, 1.0, 1.0, 1.0, 10.0, 0.0, 0.0, 1.0],
        ];
        let err = decode(table.view(), &labels, &options(2, 0.5)).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_decode_rejects_wrong_shape() {
        let table = Array2::<f32>::zeros((2, 7));
        let err = decode(table.view(), &marker_labels(), &options(2, 0.5)).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_attribute_major_output_matches_anchor_major() -> Result<(), Box<dyn std::error::Error>> {
        let rows = array![
            [100.0, 120.0, 40.0, 30.0, 10.0, 0.9, 0.1, 0.05],
            [50.0, 60.0, 20.0, 20.0, 10.0, 0.1, 0.1, 0.9],
        ];
        let anchor = RawOutput::new(vec![1, 2, 8], rows.iter().copied().collect());
        let attribute = RawOutput::new(vec![1, 8, 2], rows.t().iter().copied().collect());

        let a = decode(anchor.table(OutputLayout::AnchorMajor, 2, 8)?, &marker_labels(), &options(2, 0.5))?;
        let b = decode(
            attribute.table(OutputLayout::AttributeMajor, 2, 8)?,
            &marker_labels(),
            &options(2, 0.5),
        )?;
        assert_eq!(a, b);
        assert_eq!(a.len(), 2);
        Ok(())
    }

    #[test]
    fn test_raw_output_shape_mismatch() {
        let output = RawOutput::new(vec![1, 3, 8], vec![0.0; 24]);
        let err = output.table(OutputLayout::AnchorMajor, 2, 8).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_sigmoid_is_stable_at_extremes() {
        assert_eq!(sigmoid(0.0), 0.5);
        assert_eq!(sigmoid(100.0), 1.0);
        let low = sigmoid(-100.0);
        assert!(!low.is_nan());
        assert!((0.0..1e-30).contains(&low));
    }

    #[test]
    fn test_decode_skips_nan_objectness() -> Result<(), Box<dyn std::error::Error>> {
        let table = array![
            [50.0, 50.0, 4.0, 4.0, f32::NAN, 0.9, 0.1, 0.05],
            [10.0, 10.0, 4.0, 4.0, 8.0, 0.9, 0.1, 0.05],
        ];
        let candidates = decode(table.view(), &marker_labels(), &options(2, 0.5))?;

        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].dimensions.x, 10.0);
        assert!(!candidates[0].confidence.is_nan());

        let kept = suppress(&candidates, 1, 0.5);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].dimensions.x, 10.0);
        Ok(())
    }

    #[test]
    fn test_decode_skips_infinite_softmax_logit() -> Result<(), Box<dyn std::error::Error>> {
        // inf - inf 得到 NaN 得分
        let table = array![
            [50.0, 50.0, 4.0, 4.0, 8.0, f32::INFINITY, 0.0, 0.0],
            [10.0, 10.0, 4.0, 4.0, 8.0, 3.0, 0.0, 0.0],
        ];
        let softmax = DecodeOptions {
            class_score: ClassScore::Softmax,
            ..options(2, 0.5)
        };
        let candidates = decode(table.view(), &marker_labels(), &softmax)?;

        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].dimensions.x, 10.0);
        assert!(candidates[0].score >= 0.5);
        Ok(())
    }
}
