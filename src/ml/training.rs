//! モデル学習機能
//!
//! SGDと段階的な学習率減衰で、シャッフル済みバッチを1ステップずつ学習します。
//! 状態は「未初期化」→ `setup` →「準備完了」の2つだけで、`train` は重みのみ更新します。

use burn::{
    config::Config,
    module::Module,
    optim::{adaptor::OptimizerAdaptor, GradientsParams, Optimizer, Sgd, SgdConfig},
    tensor::{backend::AutodiffBackend, Tensor, TensorData},
};
use tracing::{debug, info, instrument};

use crate::error::{ModelError, ModelResult};
use crate::ml::color::{NormalizedInput, TargetVector, TrainingSet, INPUT_CHANNELS, OUTPUT_DIMENSION};
use crate::ml::network::{ContrastNet, NetworkConfig};
use crate::ml::provider::{InputProvider, ShuffledInputProviderBuilder};

/// 学習率の初期値
pub const INITIAL_LEARNING_RATE: f64 = 0.06;

/// 1ステップあたりのバッチサイズ
pub const BATCH_SIZE: usize = 300;

/// 減衰率（DECAY_INTERVALステップごとに掛ける）
pub const DECAY_FACTOR: f64 = 0.90;

/// 減衰間隔（ステップ数）
pub const DECAY_INTERVAL: usize = 50;

/// 学習設定
#[derive(Config, Debug)]
pub struct TrainingConfig {
    /// 学習率の初期値
    #[config(default = 0.06)]
    pub initial_learning_rate: f64,
    /// バッチサイズ
    #[config(default = 300)]
    pub batch_size: usize,
    /// 学習率の減衰率
    #[config(default = 0.9)]
    pub decay_factor: f64,
    /// 学習率を減衰させる間隔（ステップ数）
    #[config(default = 50)]
    pub decay_interval: usize,
    /// シャッフル用の乱数シード
    #[config(default = 42)]
    pub seed: u64,
}

impl TrainingConfig {
    pub fn validate(&self) -> ModelResult<()> {
        if self.batch_size == 0 {
            return Err(ModelError::configuration("バッチサイズは1以上である必要があります"));
        }
        if self.decay_interval == 0 {
            return Err(ModelError::configuration("減衰間隔は1以上である必要があります"));
        }
        if !self.initial_learning_rate.is_finite() || self.initial_learning_rate <= 0.0 {
            return Err(ModelError::configuration(format!(
                "学習率が不正です: {}",
                self.initial_learning_rate
            )));
        }
        if !self.decay_factor.is_finite() || self.decay_factor <= 0.0 {
            return Err(ModelError::configuration(format!(
                "減衰率が不正です: {}",
                self.decay_factor
            )));
        }
        Ok(())
    }

    /// 指定ステップの学習率
    pub fn learning_rate(&self, step: usize) -> f64 {
        decayed_learning_rate(
            self.initial_learning_rate,
            self.decay_factor,
            self.decay_interval,
            step,
        )
    }
}

/// 段階減衰の学習率: `initial * decay^floor(step / interval)`
pub fn decayed_learning_rate(initial: f64, decay: f64, interval: usize, step: usize) -> f64 {
    let decays = (step / interval.max(1)) as f64;
    initial * decay.powf(decays)
}

/// setup後に存在する学習状態
struct TrainingSession<B: AutodiffBackend> {
    model: ContrastNet<B>,
    optimizer: OptimizerAdaptor<Sgd<B::InnerBackend>, ContrastNet<B>, B>,
    inputs: InputProvider<NormalizedInput>,
    targets: InputProvider<TargetVector>,
}

impl<B: AutodiffBackend> TrainingSession<B> {
    /// プロバイダから対になったバッチを取り出す
    fn next_batch(&mut self, batch_size: usize, device: &B::Device) -> (Tensor<B, 2>, Tensor<B, 2>) {
        let mut input_values = Vec::with_capacity(batch_size * INPUT_CHANNELS);
        let mut target_values = Vec::with_capacity(batch_size * OUTPUT_DIMENSION);

        for _ in 0..batch_size {
            let (input_idx, input) = self.inputs.next_indexed();
            let (target_idx, target) = self.targets.next_indexed();
            debug_assert_eq!(input_idx, target_idx);
            input_values.extend_from_slice(input);
            target_values.extend_from_slice(target);
        }

        let inputs = Tensor::from_data(
            TensorData::new(input_values, [batch_size, INPUT_CHANNELS]),
            device,
        );
        let targets = Tensor::from_data(
            TensorData::new(target_values, [batch_size, OUTPUT_DIMENSION]),
            device,
        );

        (inputs, targets)
    }
}

/// 色アクセシビリティ回帰モデル
///
/// `setup` で学習データを渡してネットワークを構築し、
/// 以降 `train` / `predict` を繰り返し呼び出します。
pub struct ColorAccessibilityModel<B: AutodiffBackend> {
    network_config: NetworkConfig,
    training_config: TrainingConfig,
    device: B::Device,
    session: Option<TrainingSession<B>>,
}

impl<B: AutodiffBackend> ColorAccessibilityModel<B> {
    /// 既定の構成でモデルを作成（未初期化状態）
    pub fn new(device: B::Device) -> Self {
        Self {
            network_config: NetworkConfig::new(),
            training_config: TrainingConfig::new(),
            device,
            session: None,
        }
    }

    /// 構成を指定してモデルを作成（未初期化状態）
    ///
    /// 構成が不正な場合は `ModelError::Configuration` を返します。
    pub fn with_config(
        network_config: NetworkConfig,
        training_config: TrainingConfig,
        device: B::Device,
    ) -> ModelResult<Self> {
        network_config.validate()?;
        training_config.validate()?;

        Ok(Self {
            network_config,
            training_config,
            device,
            session: None,
        })
    }

    /// ネットワークを構築し、学習データを正規化してプロバイダに接続する
    ///
    /// 1回だけ呼び出せます。失敗した場合は何も構築されません。
    #[instrument(skip_all, fields(samples = training_set.len()))]
    pub fn setup(&mut self, training_set: &TrainingSet) -> ModelResult<()> {
        if self.session.is_some() {
            return Err(ModelError::invalid_state("setupは既に完了しています"));
        }

        // 長さの検証を先に行い、失敗時はネットワークを構築しない
        let builder = ShuffledInputProviderBuilder::new(
            training_set.normalized_inputs(),
            training_set.raw_targets.clone(),
        )?
        .with_seed(self.training_config.seed);

        let model = self.network_config.init::<B>(&self.device)?;
        let optimizer = SgdConfig::new().init();
        let (inputs, targets) = builder.build();

        info!(
            "ネットワーク構築完了: 層 {:?}, パラメータ数 {}",
            self.network_config.layer_widths(),
            model.num_params()
        );

        self.session = Some(TrainingSession {
            model,
            optimizer,
            inputs,
            targets,
        });

        Ok(())
    }

    /// 1バッチ分の学習を実行
    ///
    /// # 引数
    /// - `step`: 通算ステップ数（学習率の減衰に使用）
    /// - `compute_cost`: trueの場合のみ平均コストをホストへ読み出して返す
    ///
    /// # 戻り値
    /// - `compute_cost` がtrueならバッチ平均の二乗誤差、falseなら `None`
    pub fn train(&mut self, step: usize, compute_cost: bool) -> ModelResult<Option<f32>> {
        let learning_rate = self.training_config.learning_rate(step);
        let batch_size = self.training_config.batch_size;
        let session = self
            .session
            .as_mut()
            .ok_or_else(|| ModelError::invalid_state("setup前にtrainが呼び出されました"))?;

        let (inputs, targets) = session.next_batch(batch_size, &self.device);
        let loss = session.model.forward_regression(inputs, targets);

        // 重みを更新する前に読み出す（失敗時は状態を変えない）
        let cost = if compute_cost {
            Some(read_scalar(loss.clone())?)
        } else {
            None
        };

        let grads = GradientsParams::from_grads(loss.backward(), &session.model);
        session.model = session
            .optimizer
            .step(learning_rate, session.model.clone(), grads);

        if let Some(cost) = cost {
            debug!(step, learning_rate, cost, "学習ステップ");
        }

        Ok(cost)
    }

    /// 指定ステップの学習率
    pub fn learning_rate(&self, step: usize) -> f64 {
        self.training_config.learning_rate(step)
    }

    /// setupが完了しているか
    pub fn is_ready(&self) -> bool {
        self.session.is_some()
    }

    pub fn training_config(&self) -> &TrainingConfig {
        &self.training_config
    }

    pub fn network_config(&self) -> &NetworkConfig {
        &self.network_config
    }

    pub fn device(&self) -> &B::Device {
        &self.device
    }

    /// 学習中のネットワーク（setup前はエラー）
    pub fn network(&self) -> ModelResult<&ContrastNet<B>> {
        self.session
            .as_ref()
            .map(|session| &session.model)
            .ok_or_else(|| ModelError::invalid_state("setup前にネットワークが参照されました"))
    }
}

/// 要素数1のテンソルをホスト側のf32として読み出す
fn read_scalar<B: AutodiffBackend>(tensor: Tensor<B, 1>) -> ModelResult<f32> {
    let values = tensor
        .into_data()
        .to_vec::<f32>()
        .map_err(|e| ModelError::Tensor(format!("{:?}", e)))?;

    values
        .first()
        .copied()
        .ok_or_else(|| ModelError::Tensor("コストが空です".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_autodiff::Autodiff;
    use burn_ndarray::NdArray;

    type B = Autodiff<NdArray>;

    fn toy_training_set() -> TrainingSet {
        // 暗い色 -> 白文字 [0, 1]、明るい色 -> 黒文字 [1, 0]
        TrainingSet::new(
            vec![
                [0.0, 0.0, 0.0],
                [255.0, 255.0, 255.0],
                [20.0, 30.0, 60.0],
                [240.0, 230.0, 200.0],
            ],
            vec![[0.0, 1.0], [1.0, 0.0], [0.0, 1.0], [1.0, 0.0]],
        )
    }

    #[test]
    fn test_default_constants() {
        let config = TrainingConfig::new();
        assert_eq!(config.initial_learning_rate, INITIAL_LEARNING_RATE);
        assert_eq!(config.batch_size, BATCH_SIZE);
        assert_eq!(config.decay_factor, DECAY_FACTOR);
        assert_eq!(config.decay_interval, DECAY_INTERVAL);
    }

    #[test]
    fn test_learning_rate_schedule() {
        let config = TrainingConfig::new();
        assert!((config.learning_rate(0) - 0.06).abs() < 1e-6);
        assert!((config.learning_rate(49) - 0.06).abs() < 1e-6);
        assert!((config.learning_rate(50) - 0.054).abs() < 1e-6);
        assert!((config.learning_rate(100) - 0.0486).abs() < 1e-6);
        assert!((config.learning_rate(149) - 0.0486).abs() < 1e-6);
    }

    #[test]
    fn test_invalid_training_config_rejected() {
        let device = Default::default();
        let result = ColorAccessibilityModel::<B>::with_config(
            NetworkConfig::new(),
            TrainingConfig::new().with_batch_size(0),
            device,
        );
        assert!(matches!(result, Err(ModelError::Configuration(_))));

        let result = ColorAccessibilityModel::<B>::with_config(
            NetworkConfig::new().with_hidden_sizes([16, 0, 8]),
            TrainingConfig::new(),
            Default::default(),
        );
        assert!(matches!(result, Err(ModelError::Configuration(_))));
    }

    #[test]
    fn test_train_before_setup_fails() {
        let mut model = ColorAccessibilityModel::<B>::new(Default::default());
        assert!(matches!(model.train(0, true), Err(ModelError::InvalidState(_))));
    }

    #[test]
    fn test_mismatched_setup_builds_nothing() {
        let mut model = ColorAccessibilityModel::<B>::new(Default::default());
        let set = TrainingSet::new(vec![[0.0, 0.0, 0.0]; 3], vec![[0.0, 1.0]; 2]);

        let result = model.setup(&set);
        assert!(matches!(result, Err(ModelError::Configuration(_))));
        assert!(!model.is_ready());
        assert!(model.network().is_err());
    }

    #[test]
    fn test_setup_twice_fails() {
        let mut model = ColorAccessibilityModel::<B>::new(Default::default());
        model.setup(&toy_training_set()).unwrap();
        assert!(model.is_ready());
        assert!(matches!(
            model.setup(&toy_training_set()),
            Err(ModelError::InvalidState(_))
        ));
    }

    #[test]
    fn test_cost_only_when_requested() {
        let mut model = ColorAccessibilityModel::<B>::new(Default::default());
        model.setup(&toy_training_set()).unwrap();

        assert_eq!(model.train(0, false).unwrap(), None);
        let cost = model.train(1, true).unwrap();
        assert!(cost.is_some_and(|c| c.is_finite() && c >= 0.0));
    }

    #[test]
    fn test_cost_decreases_on_toy_dataset() {
        let mut model = ColorAccessibilityModel::<B>::new(Default::default());
        model.setup(&toy_training_set()).unwrap();

        // 50ステップごとの平均コストを比較
        let mut window_means = Vec::new();
        let mut step = 0;
        for _ in 0..5 {
            let mut total = 0.0;
            for _ in 0..50 {
                total += model.train(step, true).unwrap().unwrap();
                step += 1;
            }
            window_means.push(total / 50.0);
        }

        for pair in window_means.windows(2) {
            assert!(
                pair[1] <= pair[0] + 1e-3,
                "cost increased: {:?}",
                window_means
            );
        }
        assert!(window_means[4] < window_means[0], "no progress: {:?}", window_means);
    }
}
