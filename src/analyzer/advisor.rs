//! The three AI operations: product analysis, lifestyle overhaul, and
//! recommendations.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{error, info};

use super::gemini::{parse_structured, BackendError, GenerateRequest, GenerativeBackend, Part};
use super::image_prep::PreparedImage;
use super::prompts::{
    build_image_analysis_prompt, build_overhaul_prompt, build_recommendation_prompt,
    build_text_analysis_prompt, lifestyle_overhaul_schema, product_analysis_schema,
    recommendation_schema, RecommendationSignals, SYSTEM_PROMPT,
};
use super::types::{LifestyleOverhaulPlan, ProductAnalysis, Recommendation};
use super::validation::Validate;
use crate::history::HistoryData;

/// User-presentable failure of one AI operation. The original cause is kept
/// as the error source.
#[derive(Debug, Error)]
pub enum AdvisorError {
    #[error("The AI failed to provide an analysis. It might be busy, please try again.")]
    Analysis(#[source] BackendError),

    #[error("Failed to get lifestyle plan from AI. Please check your product list and try again.")]
    Overhaul(#[source] BackendError),

    #[error("Failed to get recommendations from AI. Please try again later.")]
    Recommendations(#[source] BackendError),
}

impl From<AdvisorError> for String {
    fn from(err: AdvisorError) -> Self {
        err.to_string()
    }
}

/// Derive liked, disliked, and already-analyzed product names from history.
pub fn recommendation_signals(history: &HistoryData) -> RecommendationSignals {
    let mut signals = RecommendationSignals::default();
    for item in &history.products {
        let name = item.record.product_name.clone();
        let score = item.record.overall_score;
        if score.is_liked() {
            signals.liked.push(name.clone());
        } else if score.is_disliked() {
            signals.disliked.push(name.clone());
        }
        signals.analyzed.push(name);
    }
    signals
}

pub struct Advisor {
    backend: Arc<dyn GenerativeBackend>,
    model: String,
}

impl Advisor {
    pub fn new(backend: Arc<dyn GenerativeBackend>, model: impl Into<String>) -> Self {
        Self {
            backend,
            model: model.into(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn request(&self, parts: Vec<Part>, response_schema: serde_json::Value) -> GenerateRequest {
        GenerateRequest {
            model: self.model.clone(),
            parts,
            system_instruction: SYSTEM_PROMPT.to_string(),
            response_schema,
        }
    }

    async fn generate_structured<T>(&self, request: GenerateRequest) -> Result<T, BackendError>
    where
        T: DeserializeOwned + Validate,
    {
        let text = self.backend.generate(request).await?;
        parse_structured(&text)
    }

    /// Analyze one product from its description, a photo, or both.
    pub async fn analyze_product(
        &self,
        product_info: &str,
        image: Option<&PreparedImage>,
    ) -> Result<ProductAnalysis, AdvisorError> {
        let parts = match image {
            Some(img) => vec![
                Part::InlineImage {
                    media_type: img.media_type.to_string(),
                    data: img.data.clone(),
                },
                Part::Text(build_image_analysis_prompt(product_info)),
            ],
            None => vec![Part::Text(build_text_analysis_prompt(product_info))],
        };

        info!("Requesting product analysis (image: {})", image.is_some());
        let request = self.request(parts, product_analysis_schema());
        self.generate_structured::<ProductAnalysis>(request)
            .await
            .map_err(|e| {
                error!("Product analysis call failed: {}", e);
                AdvisorError::Analysis(e)
            })
    }

    /// Build a prioritized swap plan from a free-form list of daily products.
    pub async fn get_lifestyle_overhaul(
        &self,
        product_list: &str,
    ) -> Result<LifestyleOverhaulPlan, AdvisorError> {
        info!("Requesting lifestyle overhaul");
        let request = self.request(
            vec![Part::Text(build_overhaul_prompt(product_list))],
            lifestyle_overhaul_schema(),
        );
        self.generate_structured::<LifestyleOverhaulPlan>(request)
            .await
            .map_err(|e| {
                error!("Lifestyle overhaul call failed: {}", e);
                AdvisorError::Overhaul(e)
            })
    }

    /// Suggest new products based on the liked products in `history`.
    ///
    /// Returns an empty list without calling the backend when nothing in
    /// the history scored A or B.
    pub async fn get_recommendations(
        &self,
        history: &HistoryData,
    ) -> Result<Vec<Recommendation>, AdvisorError> {
        let signals = recommendation_signals(history);
        if signals.liked.is_empty() {
            info!("No liked products in history, skipping recommendations");
            return Ok(Vec::new());
        }

        info!(
            "Requesting recommendations ({} liked, {} analyzed)",
            signals.liked.len(),
            signals.analyzed.len()
        );
        let request = self.request(
            vec![Part::Text(build_recommendation_prompt(&signals))],
            recommendation_schema(),
        );
        self.generate_structured::<Vec<Recommendation>>(request)
            .await
            .map_err(|e| {
                error!("Recommendations call failed: {}", e);
                AdvisorError::Recommendations(e)
            })
    }
}
