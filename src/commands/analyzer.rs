use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{info, warn};

use super::history_access;
use crate::analyzer::{prepare_image_file, PreparedImage, ProductAnalysis};
use crate::app::App;
use crate::history::new_entry;

pub const NO_PRODUCT_INPUT: &str = "Please provide a product name, ingredients, or an image.";

/// Query recorded for a photo submitted without any text.
pub const IMAGE_ONLY_QUERY: &str = "Image Analysis";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeOutcome {
    pub analysis: ProductAnalysis,
    pub saved: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<String>,
}

async fn load_image(path: &Path) -> Result<PreparedImage, String> {
    let path: PathBuf = path.to_path_buf();
    tokio::task::spawn_blocking(move || prepare_image_file(&path))
        .await
        .map_err(|e| format!("Image task panicked: {}", e))?
        .map_err(|e| e.to_string())
}

/// Analyze one product from a description, a photo, or both, and record
/// the result when the current owner has history.
pub async fn analyze(
    app: &mut App,
    text: &str,
    image: Option<&Path>,
) -> Result<AnalyzeOutcome, String> {
    let text = text.trim();
    if text.is_empty() && image.is_none() {
        return Err(NO_PRODUCT_INPUT.to_string());
    }

    let prepared = match image {
        Some(path) => {
            let prepared = load_image(path).await?;
            info!(
                "Prepared image {:?} at {}x{}",
                path, prepared.width, prepared.height
            );
            Some(prepared)
        }
        None => None,
    };

    let analysis = app
        .advisor()?
        .analyze_product(text, prepared.as_ref())
        .await?;

    let query = if text.is_empty() {
        IMAGE_ONLY_QUERY.to_string()
    } else {
        text.to_string()
    };

    let (saved, notice) = match history_access(app).await {
        Ok(Some(access)) => {
            let entry = new_entry(analysis.clone(), query);
            (app.history_mut().add_product(&access, entry).await, None)
        }
        Ok(None) => (false, None),
        Err(e) => {
            warn!("Analysis not saved: {}", e);
            (false, Some(e.to_string()))
        }
    };

    Ok(AnalyzeOutcome {
        analysis,
        saved,
        notice,
    })
}
