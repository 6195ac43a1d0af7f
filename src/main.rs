//! 色アクセシビリティモデルの学習・推論CLI

use std::path::PathBuf;

use anyhow::{Context, Result};
use burn::tensor::backend::AutodiffBackend;
use clap::Parser;
use tracing::{info, warn};

use color_accessibility_lib::csv_loader::load_training_set;
use color_accessibility_lib::logging::init_logging;
use color_accessibility_lib::ml::ColorSample;
use color_accessibility_lib::model::{AppConfig, DeviceType};
use color_accessibility_lib::{ColorAccessibilityModel, TrainingSet};

#[derive(Parser, Debug)]
#[command(version, about = "RGB値からアクセシビリティスコアを学習・推論します")]
struct Cli {
    /// 設定ファイル（JSON）
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// 学習データCSV（r,g,b,t0,t1）
    #[arg(short, long, value_name = "PATH")]
    data: Option<PathBuf>,
    /// 学習ステップ数
    #[arg(short, long, value_name = "INT")]
    steps: Option<usize>,
    /// コストを計算する間隔（ステップ数）
    #[arg(long, value_name = "INT")]
    cost_interval: Option<usize>,
    /// 学習後に推論する色（例: 255,128,0）
    #[arg(value_name = "R,G,B", value_parser = parse_rgb)]
    colors: Vec<ColorSample>,
}

fn parse_rgb(s: &str) -> Result<ColorSample, String> {
    let parts: Vec<&str> = s.split(',').map(str::trim).collect();
    if parts.len() != 3 {
        return Err(format!("R,G,Bの3値で指定してください: {}", s));
    }

    let mut rgb = [0.0f32; 3];
    for (value, part) in rgb.iter_mut().zip(&parts) {
        *value = part
            .parse()
            .map_err(|e| format!("数値ではありません '{}': {}", part, e))?;
    }
    Ok(rgb)
}

fn run<B: AutodiffBackend>(
    device: B::Device,
    config: &AppConfig,
    training_set: &TrainingSet,
    steps: usize,
    cost_interval: usize,
    colors: &[ColorSample],
) -> Result<()> {
    let mut model = ColorAccessibilityModel::<B>::with_config(
        config.network_config(),
        config.training_config(),
        device,
    )?;
    model.setup(training_set)?;

    info!("学習を開始します: {} ステップ, {} サンプル", steps, training_set.len());

    let mut last_cost = None;
    for step in 0..steps {
        let compute_cost = cost_interval > 0 && (step % cost_interval == 0 || step + 1 == steps);
        if let Some(cost) = model.train(step, compute_cost)? {
            if !cost.is_finite() {
                warn!("コストが発散しました (step {}): {}", step, cost);
                anyhow::bail!("学習が発散しました。学習率を下げて再実行してください");
            }
            info!(
                "step {:>5}: cost = {:.6}, lr = {:.6}",
                step,
                cost,
                model.learning_rate(step)
            );
            last_cost = Some(cost);
        }
    }

    if let Some(cost) = last_cost {
        info!("学習完了: 最終コスト {:.6}", cost);
    }

    for rgb in colors {
        let scores = model.predict(*rgb)?;
        println!("{:?} -> {:?}", rgb, scores);
    }

    Ok(())
}

fn main() -> Result<()> {
    init_logging().context("ログの初期化に失敗しました")?;

    let cli = Cli::parse();
    let config = AppConfig::load_or_default(cli.config.clone().unwrap_or_else(AppConfig::default_path));

    let data_path = cli
        .data
        .clone()
        .or_else(|| config.run.training_data.as_ref().map(PathBuf::from))
        .context("学習データCSVを --data または設定ファイルで指定してください")?;
    let training_set = load_training_set(&data_path)?;

    let steps = cli.steps.unwrap_or(config.run.steps);
    let cost_interval = cli.cost_interval.unwrap_or(config.run.cost_interval);

    info!("使用デバイス: {}", config.device_type);

    match config.device_type {
        DeviceType::Cpu => run::<color_accessibility_lib::DefaultBackend>(
            Default::default(),
            &config,
            &training_set,
            steps,
            cost_interval,
            &cli.colors,
        ),
        #[cfg(feature = "gpu")]
        DeviceType::Wgpu => run::<color_accessibility_lib::GpuBackend>(
            Default::default(),
            &config,
            &training_set,
            steps,
            cost_interval,
            &cli.colors,
        ),
        #[cfg(not(feature = "gpu"))]
        DeviceType::Wgpu => {
            anyhow::bail!("WGPUバックエンドを使うには `gpu` フィーチャを有効にしてビルドしてください")
        }
    }
}
