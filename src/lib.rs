//! Lottie keyframe evaluation engine.
//!
//! Re-exports the data model ([`data`]) and the evaluation core ([`core`]).
//! Most hosts only need [`load`] and [`LottiePlayer`].

use std::sync::Arc;

pub use lottie_core as core;
pub use lottie_data::model as data;

pub use lottie_core::{
    EngineConfig, LottieAsset, LottieError, LottiePlayer, Paint, ResolvedFrame, ResolvedLayer,
    ResolvedShape, Result,
};

/// Parse and bind a document, ready to be shared between players.
pub fn load(json: &str) -> Result<Arc<LottieAsset>> {
    load_with_config(json, EngineConfig::default())
}

pub fn load_with_config(json: &str, config: EngineConfig) -> Result<Arc<LottieAsset>> {
    let model: data::LottieJson = serde_json::from_str(json)?;
    Ok(Arc::new(LottieAsset::with_config(&model, config)?))
}
