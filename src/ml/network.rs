//! 回帰ネットワークの定義
//!
//! RGB(3) -> 64 -> 32 -> 16 -> 2 の全結合層の積み重ねです。
//! 最終層以外はReLUを通し、最終層は線形（生のスコア）を出力します。

use burn::{
    config::Config,
    module::Module,
    nn::{
        loss::{MseLoss, Reduction},
        Linear, LinearConfig, Relu,
    },
    tensor::{backend::Backend, Tensor},
};

use crate::error::{ModelError, ModelResult};
use crate::ml::color::{INPUT_CHANNELS, OUTPUT_DIMENSION};

/// 隠れ層の数（全結合層は4層で固定）
pub const HIDDEN_LAYERS: usize = 3;

/// 全結合層の数
pub const NUM_LAYERS: usize = HIDDEN_LAYERS + 1;

/// 層名（モジュールのフィールド名、つまりレコード上のパラメータパスと同じ）
pub const LAYER_NAMES: [&str; NUM_LAYERS] = [
    "fully_connected_0",
    "fully_connected_1",
    "fully_connected_2",
    "fully_connected_3",
];

/// ネットワーク構成
///
/// 層の数は固定で、変更できるのは隠れ層の幅のみです。
#[derive(Config, Debug)]
pub struct NetworkConfig {
    /// 入力次元（RGB）
    #[config(default = 3)]
    pub input_size: usize,
    /// 隠れ層の幅（入力側から順）
    #[config(default = "[64, 32, 16]")]
    pub hidden_sizes: [usize; HIDDEN_LAYERS],
    /// 出力次元
    #[config(default = 2)]
    pub output_size: usize,
}

impl NetworkConfig {
    /// 入力から出力までの各層の幅
    pub fn layer_widths(&self) -> [usize; NUM_LAYERS + 1] {
        let [h0, h1, h2] = self.hidden_sizes;
        [self.input_size, h0, h1, h2, self.output_size]
    }

    /// 構成を検証
    ///
    /// 層の幅はすべて正の整数でなければなりません。
    /// 入出力次元はRGBとスコアの次元に固定です。
    pub fn validate(&self) -> ModelResult<()> {
        if self.input_size != INPUT_CHANNELS {
            return Err(ModelError::configuration(format!(
                "入力次元は{}である必要があります: {}",
                INPUT_CHANNELS, self.input_size
            )));
        }
        if self.output_size != OUTPUT_DIMENSION {
            return Err(ModelError::configuration(format!(
                "出力次元は{}である必要があります: {}",
                OUTPUT_DIMENSION, self.output_size
            )));
        }
        if let Some(pos) = self.hidden_sizes.iter().position(|&w| w == 0) {
            return Err(ModelError::configuration(format!(
                "隠れ層{}の幅が0です",
                pos
            )));
        }
        Ok(())
    }

    /// ネットワークを初期化
    ///
    /// 検証に失敗した場合は何も構築せずにエラーを返します。
    pub fn init<B: Backend>(&self, device: &B::Device) -> ModelResult<ContrastNet<B>> {
        self.validate()?;

        let [input, h0, h1, h2, output] = self.layer_widths();

        Ok(ContrastNet {
            fully_connected_0: LinearConfig::new(input, h0).init(device),
            fully_connected_1: LinearConfig::new(h0, h1).init(device),
            fully_connected_2: LinearConfig::new(h1, h2).init(device),
            fully_connected_3: LinearConfig::new(h2, output).init(device),
            activation: Relu::new(),
        })
    }
}

/// 色 -> アクセシビリティスコアの回帰モデル
///
/// # アーキテクチャ（既定の幅）
/// - FC: 3 -> 64 + ReLU
/// - FC: 64 -> 32 + ReLU
/// - FC: 32 -> 16 + ReLU
/// - FC: 16 -> 2（線形）
#[derive(Module, Debug)]
pub struct ContrastNet<B: Backend> {
    fully_connected_0: Linear<B>,
    fully_connected_1: Linear<B>,
    fully_connected_2: Linear<B>,
    fully_connected_3: Linear<B>,
    activation: Relu,
}

impl<B: Backend> ContrastNet<B> {
    /// 順伝播
    ///
    /// # 引数
    /// - `inputs`: 正規化済みRGB [batch_size, 3]
    ///
    /// # 戻り値
    /// - スコア [batch_size, 2]
    pub fn forward(&self, inputs: Tensor<B, 2>) -> Tensor<B, 2> {
        let x = self.fully_connected_0.forward(inputs);
        let x = self.activation.forward(x);

        let x = self.fully_connected_1.forward(x);
        let x = self.activation.forward(x);

        let x = self.fully_connected_2.forward(x);
        let x = self.activation.forward(x);

        // 最終層は線形
        self.fully_connected_3.forward(x)
    }

    /// 順伝播と損失計算（学習用）
    ///
    /// バッチ全体で平均した二乗誤差 [1] を返します。
    pub fn forward_regression(&self, inputs: Tensor<B, 2>, targets: Tensor<B, 2>) -> Tensor<B, 1> {
        let output = self.forward(inputs);
        MseLoss::new().forward(output, targets, Reduction::Mean)
    }

    /// 層の数
    pub fn num_layers(&self) -> usize {
        NUM_LAYERS
    }

    /// 層名（フィールド名と一致）
    pub fn layer_names(&self) -> [&'static str; NUM_LAYERS] {
        LAYER_NAMES
    }

    /// 各層の [入力幅, 出力幅]
    pub fn layer_shapes(&self) -> [[usize; 2]; NUM_LAYERS] {
        [
            self.fully_connected_0.weight.val().dims(),
            self.fully_connected_1.weight.val().dims(),
            self.fully_connected_2.weight.val().dims(),
            self.fully_connected_3.weight.val().dims(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::tensor::TensorData;
    use burn_ndarray::NdArray;

    type B = NdArray;

    #[test]
    fn test_default_topology() {
        let device = Default::default();
        let net = NetworkConfig::new().init::<B>(&device).unwrap();

        assert_eq!(net.num_layers(), 4);
        assert_eq!(net.layer_shapes(), [[3, 64], [64, 32], [32, 16], [16, 2]]);
        // 重み + バイアス
        let expected = (3 * 64 + 64) + (64 * 32 + 32) + (32 * 16 + 16) + (16 * 2 + 2);
        assert_eq!(net.num_params(), expected);
    }

    #[test]
    fn test_layer_names_are_stable() {
        let device = Default::default();
        let first = NetworkConfig::new().init::<B>(&device).unwrap();
        let second = NetworkConfig::new().init::<B>(&device).unwrap();

        assert_eq!(first.layer_names(), second.layer_names());
        assert_eq!(
            first.layer_names(),
            [
                "fully_connected_0",
                "fully_connected_1",
                "fully_connected_2",
                "fully_connected_3"
            ]
        );
        assert_eq!(first.layer_shapes(), second.layer_shapes());
    }

    #[test]
    fn test_zero_width_rejected() {
        let device = Default::default();
        let config = NetworkConfig::new().with_hidden_sizes([64, 0, 16]);
        let result = config.init::<B>(&device);
        assert!(matches!(result, Err(ModelError::Configuration(_))));
    }

    #[test]
    fn test_custom_widths_keep_depth() {
        let device = Default::default();
        let net = NetworkConfig::new()
            .with_hidden_sizes([8, 4, 2])
            .init::<B>(&device)
            .unwrap();
        assert_eq!(net.layer_shapes(), [[3, 8], [8, 4], [4, 2], [2, 2]]);
    }

    #[test]
    fn test_config_json_round_trip() {
        let config = NetworkConfig::new().with_hidden_sizes([32, 16, 8]);
        let json = serde_json::to_string(&config).unwrap();
        let loaded: NetworkConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(loaded.hidden_sizes, [32, 16, 8]);
        assert_eq!(loaded.layer_widths(), [3, 32, 16, 8, 2]);
    }

    #[test]
    fn test_config_with_other_depth_rejected() {
        let result = serde_json::from_str::<NetworkConfig>(
            r#"{ "input_size": 3, "hidden_sizes": [], "output_size": 2 }"#,
        );
        assert!(result.is_err());

        let result = serde_json::from_str::<NetworkConfig>(
            r#"{ "input_size": 3, "hidden_sizes": [64, 32, 16, 8], "output_size": 2 }"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_wrong_io_size_rejected() {
        let device = Default::default();
        let result = NetworkConfig::new().with_output_size(3).init::<B>(&device);
        assert!(matches!(result, Err(ModelError::Configuration(_))));
    }

    #[test]
    fn test_forward_shape() {
        let device = Default::default();
        let net = NetworkConfig::new().init::<B>(&device).unwrap();

        let inputs = Tensor::<B, 2>::from_data(
            TensorData::new(vec![0.0f32, 0.5, 1.0, 1.0, 1.0, 1.0], [2, 3]),
            &device,
        );
        let output = net.forward(inputs);
        assert_eq!(output.dims(), [2, 2]);
    }

    #[test]
    fn test_loss_is_scalar_mean() {
        let device = Default::default();
        let net = NetworkConfig::new().init::<B>(&device).unwrap();

        let inputs = Tensor::<B, 2>::from_data(TensorData::new(vec![0.2f32, 0.4, 0.6], [1, 3]), &device);
        let targets = Tensor::<B, 2>::from_data(TensorData::new(vec![1.0f32, 0.0], [1, 2]), &device);

        let output: Vec<f32> = net.forward(inputs.clone()).into_data().to_vec().unwrap();
        let loss: Vec<f32> = net
            .forward_regression(inputs, targets)
            .into_data()
            .to_vec()
            .unwrap();

        let expected = ((output[0] - 1.0).powi(2) + output[1].powi(2)) / 2.0;
        assert_eq!(loss.len(), 1);
        assert!((loss[0] - expected).abs() < 1e-5);
    }
}
