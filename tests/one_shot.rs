use base64::{Engine, engine::general_purpose::STANDARD};
use image::{Rgb, RgbImage};
use owldet::{
  FromUrl,
  input::InputWrapper,
  model::ReplayDetector,
  output::{OutputWrapper, draw::Draw},
  pipeline::{DetectParams, DetectionPipeline},
  suppress::DetectionMode,
  task::{OneShotTask, Task},
};
use url::Url;

const CANDIDATES: &str = r#"[
  {"box": [1, 1, 11, 11], "score": 0.8, "label": 0},
  {"box": [0, 0, 10, 10], "score": 0.9, "label": 0},
  {"box": [50, 50, 60, 60], "score": 0.7, "label": 0},
  {"box": [30, 30, 35, 35], "score": 0.005, "label": 0}
]"#;

fn url(scheme: &str, path: &std::path::Path) -> Url {
  Url::parse(&format!("{}://{}", scheme, path.display())).unwrap()
}

#[test]
fn one_shot_task_writes_image_and_record() {
  let dir = tempfile::tempdir().unwrap();
  let input_path = dir.path().join("input.png");
  let model_path = dir.path().join("candidates.json");
  let image_path = dir.path().join("out").join("annotated.png");
  let record_path = dir.path().join("out").join("record.json");

  RgbImage::from_pixel(80, 80, Rgb([0, 0, 0])).save(&input_path).unwrap();
  std::fs::write(&model_path, CANDIDATES).unwrap();

  let input = InputWrapper::from_url(&url("image", &input_path)).unwrap();
  let pipeline = DetectionPipeline::new(ReplayDetector::from_url(&url("replay", &model_path)).unwrap());
  let outputs = vec![
    OutputWrapper::from_url(&url("image", &image_path))
      .unwrap()
      .with_draw(Draw::without_font()),
    OutputWrapper::from_url(&url("json", &record_path)).unwrap(),
  ];

  let params = DetectParams::default().with_mode(DetectionMode::Multiple);
  let response = OneShotTask::new("  cat ")
    .with_params(params)
    .run_task(input, &pipeline, &outputs)
    .unwrap();

  assert!(response.success);
  assert_eq!(response.query, "cat");
  assert_eq!(response.detection_count, 2);
  assert_eq!(response.detections[0].score, 0.9);
  assert_eq!(response.detections[1].score, 0.7);

  let annotated = image::open(&image_path).unwrap().to_rgb8();
  // 第一个目标红色，第二个蓝色
  assert_eq!(*annotated.get_pixel(0, 5), Rgb([255, 0, 0]));
  assert_eq!(*annotated.get_pixel(50, 55), Rgb([0, 0, 255]));

  let record: serde_json::Value =
    serde_json::from_slice(&std::fs::read(&record_path).unwrap()).unwrap();
  assert_eq!(record["detection_count"], 2);
  assert_eq!(record["detections"][1]["box"], serde_json::json!([50.0, 50.0, 60.0, 60.0]));
  assert_eq!(record["parameters"]["detection_mode"], "multiple");

  let encoded = record["image_data"]
    .as_str()
    .and_then(|data| data.strip_prefix("data:image/png;base64,"))
    .unwrap();
  let embedded = image::load_from_memory(&STANDARD.decode(encoded).unwrap()).unwrap();
  assert_eq!((embedded.width(), embedded.height()), (80, 80));
  assert!(response.image_data.is_none());
}

#[test]
fn one_shot_task_rejects_blank_query() {
  let dir = tempfile::tempdir().unwrap();
  let input_path = dir.path().join("input.png");
  RgbImage::new(8, 8).save(&input_path).unwrap();

  let input = InputWrapper::from_url(&url("image", &input_path)).unwrap();
  let pipeline = DetectionPipeline::new(ReplayDetector::new(Vec::new()));
  let outputs: Vec<OutputWrapper> = Vec::new();

  let result = OneShotTask::new("   ").run_task(input, &pipeline, &outputs);
  assert!(result.is_err());
}
