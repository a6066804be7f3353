// A small end-to-end run of both optimizers on a toy dataset.
use linclass::{LinearError, LogisticRegression, SdcaOptimizer, SgdOptimizer};
use log::info;
use ndarray::array;

fn main() -> Result<(), LinearError> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let x = array![[1.0, 0.0], [0.0, 1.0], [-1.0, 0.0], [0.0, -1.0]];
    let y = array![1.0, 1.0, -1.0, -1.0];

    let mut sgd = LogisticRegression::new(SgdOptimizer::new(1.0, 0.1)?);
    let (w, history) = sgd.fit(x.view(), y.view(), 50, true)?;
    info!("SGD weights: {}", w);
    if let Some(last) = history.as_ref().and_then(|h| h.last()) {
        info!("SGD final mean loss: {:.6}", last.loss);
    }
    info!("SGD accuracy: {}", sgd.score_accuracy(x.view(), y.view())?);

    let mut sdca = LogisticRegression::new(SdcaOptimizer::new(1.0)?);
    let (w, history) = sdca.fit(x.view(), y.view(), 20, true)?;
    info!("SDCA weights: {}", w);
    if let Some(last) = history.as_ref().and_then(|h| h.last()) {
        info!(
            "SDCA final mean loss: {:.6}, duality gap: {:?}",
            last.loss, last.duality_gap
        );
    }
    info!("SDCA accuracy: {}", sdca.score_accuracy(x.view(), y.view())?);

    Ok(())
}
