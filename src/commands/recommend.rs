use serde::Serialize;

use crate::analyzer::Recommendation;
use crate::app::App;

pub const NO_HISTORY: &str =
    "Analyze some products first, and then come back here to get personalized recommendations!";
pub const NO_LIKED_PRODUCTS: &str =
    "None of your analyzed products scored A or B yet, so there is nothing to base recommendations on.";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendOutcome {
    pub recommendations: Vec<Recommendation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<String>,
}

/// Suggest new products based on the current history.
pub async fn recommend(app: &mut App) -> Result<RecommendOutcome, String> {
    app.sync_history().await?;
    let history = app.history().history().clone();
    if history.products.is_empty() {
        return Ok(RecommendOutcome {
            recommendations: Vec::new(),
            notice: Some(NO_HISTORY.to_string()),
        });
    }

    let recommendations = app.advisor()?.get_recommendations(&history).await?;
    let notice = recommendations
        .is_empty()
        .then(|| NO_LIKED_PRODUCTS.to_string());
    Ok(RecommendOutcome {
        recommendations,
        notice,
    })
}
