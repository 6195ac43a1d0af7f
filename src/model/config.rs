//! アプリケーション設定管理モジュール
//!
//! 計算デバイスやネットワーク・学習設定をJSON形式で保存・読み込みします。

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::ml::network::HIDDEN_LAYERS;
use crate::ml::{NetworkConfig, TrainingConfig};

/// 計算デバイスの種類
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub enum DeviceType {
    /// NdArray (CPU) バックエンド
    #[default]
    Cpu,
    /// WGPU (GPU) バックエンド（`gpu` フィーチャが必要）
    Wgpu,
}

impl std::fmt::Display for DeviceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeviceType::Cpu => write!(f, "CPU (NdArray)"),
            DeviceType::Wgpu => write!(f, "WGPU (GPU)"),
        }
    }
}

/// ネットワーク設定
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkSettings {
    /// 隠れ層の幅（3層固定）
    pub hidden_sizes: [usize; HIDDEN_LAYERS],
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self {
            hidden_sizes: [64, 32, 16],
        }
    }
}

/// トレーニング設定
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingSettings {
    /// 学習率の初期値
    pub initial_learning_rate: f64,
    /// バッチサイズ
    pub batch_size: usize,
    /// 学習率の減衰率
    pub decay_factor: f64,
    /// 減衰間隔（ステップ数）
    pub decay_interval: usize,
    /// ランダムシード
    pub seed: u64,
}

impl Default for TrainingSettings {
    fn default() -> Self {
        Self {
            initial_learning_rate: 0.06,
            batch_size: 300,
            decay_factor: 0.90,
            decay_interval: 50,
            seed: 42,
        }
    }
}

/// 実行設定（CLIの既定値）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSettings {
    /// 学習ステップ数
    pub steps: usize,
    /// コストを計算・表示する間隔（ステップ数）
    pub cost_interval: usize,
    /// 学習データCSVのパス
    #[serde(default)]
    pub training_data: Option<String>,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            steps: 500,
            cost_interval: 10,
            training_data: None,
        }
    }
}

/// アプリケーション設定
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// 計算デバイスの種類
    #[serde(default)]
    pub device_type: DeviceType,
    /// ネットワーク設定
    #[serde(default)]
    pub network: NetworkSettings,
    /// トレーニング設定
    #[serde(default)]
    pub training: TrainingSettings,
    /// 実行設定
    #[serde(default)]
    pub run: RunSettings,
}

impl AppConfig {
    /// 設定ファイルのデフォルトパス
    pub fn default_path() -> PathBuf {
        PathBuf::from("config.json")
    }

    /// 設定を読み込む
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: AppConfig = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// 設定を読み込む、存在しないか読めない場合はデフォルト設定を返す
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        if path.exists() {
            match Self::load(path) {
                Ok(config) => {
                    info!("設定ファイルを読み込みました: {}", path.display());
                    config
                }
                Err(e) => {
                    warn!(
                        "設定ファイルの読み込みに失敗しました ({}): {}。デフォルト設定を使用します",
                        path.display(),
                        e
                    );
                    Self::default()
                }
            }
        } else {
            info!("設定ファイルが存在しません。デフォルト設定を使用します");
            Self::default()
        }
    }

    /// 設定を保存する
    pub fn save<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// ネットワーク構成に変換
    pub fn network_config(&self) -> NetworkConfig {
        NetworkConfig::new().with_hidden_sizes(self.network.hidden_sizes)
    }

    /// 学習構成に変換
    pub fn training_config(&self) -> TrainingConfig {
        TrainingConfig::new()
            .with_initial_learning_rate(self.training.initial_learning_rate)
            .with_batch_size(self.training.batch_size)
            .with_decay_factor(self.training.decay_factor)
            .with_decay_interval(self.training.decay_interval)
            .with_seed(self.training.seed)
    }
}
