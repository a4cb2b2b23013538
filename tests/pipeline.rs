// 该文件是 Shanan （山南西风） 项目的一部分。
// tests/pipeline.rs - 端到端检测流程测试
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

use std::sync::Arc;

use image::{Rgb, RgbImage};
use serde_json::{Value, json};
use tempfile::TempDir;
use url::Url;

use shanan_detect::{
  DetectConfig, DetectError, Detector, FromUrl,
  detect::BBox,
  input::{ImageSource, InputError},
  model::{ClassTable, FixedOutputAdapter, ModelWrapper, RawTensor},
  output::{ActivityRecord, OutputWrapper, SaveSummaryFileOutput},
  task::{OneShotTask, Task},
};

const NUM_CLASSES: usize = 80;

fn row(cx: f32, cy: f32, w: f32, h: f32, obj: f32, class_id: usize, score: f32) -> Vec<f32> {
  let mut row = vec![cx, cy, w, h, obj];
  let mut scores = vec![0.0; NUM_CLASSES];
  scores[class_id] = score;
  row.extend(scores);
  row
}

fn coco_adapter(rows: &[Vec<f32>]) -> FixedOutputAdapter {
  FixedOutputAdapter::new((640, 640), vec![RawTensor::from_rows(rows, 5 + NUM_CLASSES)])
}

fn street_rows() -> Vec<Vec<f32>> {
  vec![
    // 两个重叠的 person，保留 0.9
    row(320.0, 320.0, 100.0, 200.0, 0.9, 0, 0.8),
    row(325.0, 320.0, 100.0, 200.0, 0.6, 0, 0.7),
    // 一辆 car
    row(100.0, 500.0, 80.0, 60.0, 0.7, 2, 0.9),
    // objectness 不足
    row(500.0, 100.0, 50.0, 50.0, 0.3, 2, 0.9),
  ]
}

fn write_model(dir: &TempDir, adapter: &FixedOutputAdapter) -> Url {
  let path = dir.path().join("model.json");
  std::fs::write(&path, serde_json::to_string(adapter).unwrap()).unwrap();
  Url::parse(&format!("fixed://{}", path.display())).unwrap()
}

fn write_image(dir: &TempDir, width: u32, height: u32) -> Url {
  let path = dir.path().join("input.png");
  RgbImage::from_pixel(width, height, Rgb([90, 120, 150]))
    .save(&path)
    .unwrap();
  Url::parse(&format!("image://{}", path.display())).unwrap()
}

#[test]
fn detects_from_urls_and_writes_summary() {
  let dir = TempDir::new().unwrap();
  let model = ModelWrapper::from_url(&write_model(&dir, &coco_adapter(&street_rows()))).unwrap();
  let source = ImageSource::from_url(&write_image(&dir, 1280, 720)).unwrap();
  let summary_path = dir.path().join("out/summary.json");
  let outputs = vec![
    OutputWrapper::from_url(&Url::parse(&format!("json://{}", summary_path.display())).unwrap())
      .unwrap(),
  ];

  let detector = Detector::new(model, ClassTable::coco(), DetectConfig::default()).unwrap();
  let report = OneShotTask.run_task(&source, &detector, &outputs).unwrap();

  assert_eq!(report.candidates_before_nms, 3);
  assert_eq!(report.detections.len(), 2);
  assert_eq!(report.detections[0].class_name, "person");
  assert_eq!(report.detections[0].bbox, BBox::new(540, 247, 200, 225));
  assert_eq!(report.detections[1].class_name, "car");

  let written: Value = serde_json::from_str(&std::fs::read_to_string(&summary_path).unwrap()).unwrap();
  assert_eq!(written["image"], json!({ "width": 1280, "height": 720 }));
  assert_eq!(written["summary"]["Total Objects Detected"], json!(2));
  assert_eq!(
    written["summary"]["Detected Objects List"]["person"]["Count"],
    json!(1)
  );
  assert_eq!(
    written["summary"]["Detected Objects List"]["car"]["Confidence Stats"]["Max"],
    json!(0.7)
  );
  assert_eq!(written["detections"].as_array().unwrap().len(), 2);
}

#[cfg(feature = "annotate")]
#[test]
fn writes_annotated_image_without_touching_input() {
  let dir = TempDir::new().unwrap();
  let detector = Detector::new(
    coco_adapter(&street_rows()),
    ClassTable::coco(),
    DetectConfig::default(),
  )
  .unwrap();
  let original = RgbImage::from_pixel(1280, 720, Rgb([90, 120, 150]));
  let source = ImageSource::from(original.clone());
  let image_path = dir.path().join("annotated.png");
  let outputs = vec![
    OutputWrapper::from_url(&Url::parse(&format!("image://{}", image_path.display())).unwrap())
      .unwrap(),
  ];

  OneShotTask.run_task(&source, &detector, &outputs).unwrap();

  let annotated = image::open(&image_path).unwrap().to_rgb8();
  assert_eq!(annotated.dimensions(), (1280, 720));
  // 框线位于 person 框的左上角
  assert_ne!(annotated.get_pixel(540, 300), original.get_pixel(540, 300));
  assert_eq!(annotated.get_pixel(1000, 700), original.get_pixel(1000, 700));
}

#[test]
fn empty_result_reports_notice() {
  let dir = TempDir::new().unwrap();
  let detector = Detector::new(
    coco_adapter(&[row(320.0, 320.0, 10.0, 10.0, 0.1, 0, 0.9)]),
    ClassTable::coco(),
    DetectConfig::default(),
  )
  .unwrap();
  let summary_path = dir.path().join("summary.json");
  let output = SaveSummaryFileOutput::new(&summary_path);

  let report = OneShotTask
    .run_task(&ImageSource::from(RgbImage::new(320, 240)), &detector, &output)
    .unwrap();

  assert!(report.is_empty());
  assert_eq!(
    report.summary.to_report_json(),
    json!({ "Notice": "No objects detected" })
  );
  let written: Value = serde_json::from_str(&std::fs::read_to_string(&summary_path).unwrap()).unwrap();
  assert_eq!(written["detections"], json!([]));

  let record = serde_json::to_value(ActivityRecord::new("carol", &report.summary)).unwrap();
  assert!(record.get("detected_objects").is_none());
}

#[test]
fn bgr_buffer_matches_decoded_image() {
  let detector = Detector::new(
    coco_adapter(&street_rows()),
    ClassTable::coco(),
    DetectConfig::default(),
  )
  .unwrap();
  let (width, height) = (64u32, 48u32);
  let rgb = RgbImage::from_fn(width, height, |x, y| Rgb([x as u8 * 3, y as u8 * 5, 77]));
  let bgr: Vec<u8> = rgb
    .pixels()
    .flat_map(|p| [p.0[2], p.0[1], p.0[0]])
    .collect();

  let (image_a, report_a) = detector.detect(&ImageSource::from(rgb.clone())).unwrap();
  let (image_b, report_b) = detector
    .detect(&ImageSource::pixel_buffer(width, height, 3, bgr).unwrap())
    .unwrap();

  assert_eq!(image_a, rgb);
  assert_eq!(image_a, image_b);
  assert_eq!(report_a.detections, report_b.detections);
}

#[test]
fn malformed_inputs_are_invalid_input() {
  let detector = Detector::new(coco_adapter(&[]), ClassTable::coco(), DetectConfig::default()).unwrap();

  let err = detector
    .detect(&ImageSource::pixel_buffer(4, 4, 3, vec![0; 10]).unwrap())
    .unwrap_err();
  assert!(matches!(
    err,
    DetectError::InvalidInput(InputError::BufferSizeMismatch { expected: 48, actual: 10 })
  ));

  assert!(matches!(
    ImageSource::pixel_buffer(4, 4, 2, vec![0; 32]),
    Err(InputError::UnsupportedChannels(2))
  ));

  let dir = TempDir::new().unwrap();
  let path = dir.path().join("broken.png");
  std::fs::write(&path, b"not an image").unwrap();
  let err = detector.detect(&ImageSource::file(&path)).unwrap_err();
  assert!(matches!(err, DetectError::InvalidInput(_)));
}

#[test]
fn repeated_runs_are_identical() {
  let detector = Detector::new(
    coco_adapter(&street_rows()),
    ClassTable::coco(),
    DetectConfig::default(),
  )
  .unwrap();
  let source = ImageSource::from(RgbImage::new(1280, 720));
  let (_, first) = detector.detect(&source).unwrap();
  let (_, second) = detector.detect(&source).unwrap();
  assert_eq!(first.detections, second.detections);
  assert_eq!(first.summary, second.summary);
}

#[test]
fn detector_is_shared_between_threads() {
  let detector = Arc::new(
    Detector::new(
      coco_adapter(&street_rows()),
      ClassTable::coco(),
      DetectConfig::default(),
    )
    .unwrap(),
  );
  let (_, expected) = detector.detect(&ImageSource::from(RgbImage::new(1280, 720))).unwrap();

  std::thread::scope(|s| {
    let handles: Vec<_> = (0..4)
      .map(|_| {
        let detector = Arc::clone(&detector);
        s.spawn(move || {
          let (_, report) = detector
            .detect(&ImageSource::from(RgbImage::new(1280, 720)))
            .unwrap();
          report.detections
        })
      })
      .collect();
    for handle in handles {
      assert_eq!(handle.join().unwrap(), expected.detections);
    }
  });
}

#[test]
fn custom_class_table_from_file() {
  let dir = TempDir::new().unwrap();
  let path = dir.path().join("classes.txt");
  std::fs::write(&path, "cat\n\ndog\n").unwrap();
  let classes = ClassTable::from_file(&path).unwrap();

  let prediction = vec![50.0, 50.0, 20.0, 20.0, 0.8, 0.1, 0.9];
  let adapter = FixedOutputAdapter::new((100, 100), vec![RawTensor::from_rows(&[prediction], 7)]);
  let detector = Detector::new(adapter, classes, DetectConfig::default()).unwrap();

  let (_, report) = detector.detect(&ImageSource::from(RgbImage::new(200, 100))).unwrap();
  assert_eq!(report.detections.len(), 1);
  assert_eq!(report.detections[0].class_name, "dog");
  assert_eq!(report.detections[0].bbox, BBox::new(80, 40, 40, 20));
}

#[test]
fn degenerate_rows_do_not_poison_the_report() {
  let dir = TempDir::new().unwrap();
  let rows = vec![
    row(3e9, 10.0, 3e9, 4.0, 0.9, 0, 0.9),
    row(3e9, 10.0, 3e9, 4.0, 0.8, 0, 0.9),
    row(100.0, 100.0, 20.0, 20.0, f32::NAN, 2, 0.9),
    row(300.0, 300.0, 20.0, 20.0, 0.7, 2, f32::NAN),
  ];
  let detector = Detector::new(coco_adapter(&rows), ClassTable::coco(), DetectConfig::default()).unwrap();

  #[cfg(feature = "annotate")]
  let outputs = vec![
    OutputWrapper::from_url(
      &Url::parse(&format!("image://{}", dir.path().join("out.png").display())).unwrap(),
    )
    .unwrap(),
  ];
  #[cfg(not(feature = "annotate"))]
  let outputs: Vec<OutputWrapper> = vec![];

  let report = OneShotTask
    .run_task(&ImageSource::from(RgbImage::new(640, 640)), &detector, &outputs)
    .unwrap();

  assert_eq!(report.candidates_before_nms, 2);
  assert_eq!(report.detections.len(), 1);
  assert!(report.detections.iter().all(|d| d.confidence >= 0.45));
  assert_eq!(report.detections[0].bbox.width, i32::MAX);
}
