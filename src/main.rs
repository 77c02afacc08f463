// 该文件是 OwlDet （夜枭检测） 项目的一部分。
// src/main.rs - 项目主程序
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

mod args;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use owldet::{
  FromUrl,
  input::InputWrapper,
  model::ReplayDetector,
  output::{OutputWrapper, draw::Draw},
  pipeline::DetectionPipeline,
  task::{OneShotTask, Task},
};

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = args::Args::parse();

  info!("检测器来源: {}", args.model);
  info!("输入来源: {}", args.input);
  info!("查询: {}", args.query);
  info!("检测模式: {}", args.mode);
  info!("置信度阈值: {}", args.confidence);
  info!("NMS 阈值: {}", args.nms_threshold);

  let input = InputWrapper::from_url(&args.input)?;
  let detector = ReplayDetector::from_url(&args.model)?;
  let pipeline = DetectionPipeline::new(detector).with_score_floor(args.score_floor);

  let draw = match &args.font {
    Some(path) => Draw::with_font_file(path),
    None => Draw::default(),
  };
  let outputs = args
    .output
    .iter()
    .map(|url| OutputWrapper::from_url(url).map(|output| output.with_draw(draw.clone())))
    .collect::<Result<Vec<_>, _>>()?;

  let response = OneShotTask::new(&args.query)
    .with_params(args.params())
    .run_task(input, &pipeline, &outputs)?;

  if outputs.is_empty() {
    println!("{}", response.to_json()?);
  }

  Ok(())
}
