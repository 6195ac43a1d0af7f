//! シャッフル済み入力プロバイダ
//!
//! 入力配列と目標配列で周回ごとの並び替え（順列）を共有し、
//! 2つのハンドルが同じ元インデックスを同じ順序で返すようにします。
//! 1周（全件）返し終わるたびに新しい順列で並び替えます。
//!
//! 周回nの順列は基準シードとnから決まるため、ハンドル同士で状態を共有せず、
//! 各ハンドルは現在の周回の順列1つだけを保持します。

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::error::{ModelError, ModelResult};

// 周回番号をシードへ散らすための定数（黄金比）
const CYCLE_SEED_MIX: u64 = 0x9E37_79B9_7F4A_7C15;

/// 周回 `cycle` の順列を生成
fn cycle_order(base_seed: u64, cycle: u64, len: usize) -> Vec<usize> {
    let mut rng = StdRng::seed_from_u64(base_seed ^ cycle.wrapping_mul(CYCLE_SEED_MIX));
    let mut order: Vec<usize> = (0..len).collect();
    order.shuffle(&mut rng);
    order
}

/// 1系列分のデータを返すハンドル
///
/// 同じビルダーから得たハンドル同士は、n回目の取得で必ず同じ元インデックスを返します。
/// 片方だけ先に進めても、片方を破棄しても対応関係と保持量は変わりません。
#[derive(Debug)]
pub struct InputProvider<T> {
    data: Vec<T>,
    base_seed: u64,
    // 通算取得数
    position: u64,
    // 現在の周回番号とその順列
    cycle: u64,
    order: Vec<usize>,
}

impl<T> InputProvider<T> {
    fn new(data: Vec<T>, base_seed: u64) -> Self {
        let order = cycle_order(base_seed, 0, data.len());
        Self {
            data,
            base_seed,
            position: 0,
            cycle: 0,
            order,
        }
    }

    /// 次の要素を元インデックスと共に取得
    pub fn next_indexed(&mut self) -> (usize, &T) {
        let len = self.data.len() as u64;
        let cycle = self.position / len;

        // 新しい周回に入ったら順列を作り直す（前の周回の順列は破棄）
        if cycle != self.cycle {
            self.order = cycle_order(self.base_seed, cycle, self.data.len());
            self.cycle = cycle;
        }

        let index = self.order[(self.position % len) as usize];
        self.position += 1;
        (index, &self.data[index])
    }

    /// 次の要素を取得
    pub fn get_next(&mut self) -> &T {
        self.next_indexed().1
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// 入力配列と目標配列から対になったプロバイダを作るビルダー
#[derive(Debug)]
pub struct ShuffledInputProviderBuilder<I, T> {
    inputs: Vec<I>,
    targets: Vec<T>,
    seed: Option<u64>,
}

impl<I, T> ShuffledInputProviderBuilder<I, T> {
    /// 同じ長さの入力・目標配列から作成
    ///
    /// 長さが一致しない場合、または空の場合は `ModelError::Configuration` を返します。
    pub fn new(inputs: Vec<I>, targets: Vec<T>) -> ModelResult<Self> {
        if inputs.len() != targets.len() {
            return Err(ModelError::configuration(format!(
                "入力数({})と目標数({})が一致しません",
                inputs.len(),
                targets.len()
            )));
        }
        if inputs.is_empty() {
            return Err(ModelError::configuration("学習データが空です"));
        }

        Ok(Self {
            inputs,
            targets,
            seed: None,
        })
    }

    /// 並び替えに使う乱数シードを固定
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// (入力ハンドル, 目標ハンドル) を返す
    pub fn build(self) -> (InputProvider<I>, InputProvider<T>) {
        let base_seed = self.seed.unwrap_or_else(rand::random);

        (
            InputProvider::new(self.inputs, base_seed),
            InputProvider::new(self.targets, base_seed),
        )
    }
}
