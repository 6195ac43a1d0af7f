//! 学習データCSVの読み込み
//!
//! ヘッダー行の後に `r,g,b,t0,t1` の5列が並ぶ形式です。

use crate::ml::TrainingSet;
use anyhow::{Context, Result};
use csv::ReaderBuilder;
use std::path::Path;

const COLUMNS: usize = 5;

pub fn load_training_set(path: &Path) -> Result<TrainingSet> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("CSVを開けません: {}", path.display()))?;

    let mut raw_inputs = Vec::new();
    let mut raw_targets = Vec::new();

    for (line, result) in reader.records().enumerate() {
        let record = result?;

        if record.len() != COLUMNS {
            anyhow::bail!(
                "{}行目: 列数が不正です ({}列, 期待: {}列)",
                line + 2,
                record.len(),
                COLUMNS
            );
        }

        let mut values = [0.0f32; COLUMNS];
        for (i, value) in values.iter_mut().enumerate() {
            *value = record
                .get(i)
                .ok_or_else(|| anyhow::anyhow!("{}行目: {}列目がありません", line + 2, i + 1))?
                .parse()
                .with_context(|| format!("{}行目: {}列目が数値ではありません", line + 2, i + 1))?;
        }

        raw_inputs.push([values[0], values[1], values[2]]);
        raw_targets.push([values[3], values[4]]);
    }

    Ok(TrainingSet::new(raw_inputs, raw_targets))
}
