//! Typed results of the AI analysis calls.
//!
//! Field names follow the camelCase shape of the response schemas, which is
//! also the shape stored in local and remote history.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Letter grade for a product's overall healthiness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Score {
    A,
    B,
    C,
    D,
    F,
}

impl Score {
    pub const ALL: [Score; 5] = [Score::A, Score::B, Score::C, Score::D, Score::F];

    /// Scores A and B count as products the user liked.
    pub fn is_liked(self) -> bool {
        matches!(self, Score::A | Score::B)
    }

    /// Scores D and F count as products the user disliked.
    pub fn is_disliked(self) -> bool {
        matches!(self, Score::D | Score::F)
    }

    pub fn label(self) -> &'static str {
        match self {
            Score::A => "Excellent",
            Score::B => "Good",
            Score::C => "Moderate",
            Score::D => "Poor",
            Score::F => "Very Poor",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Score::A => "A",
            Score::B => "B",
            Score::C => "C",
            Score::D => "D",
            Score::F => "F",
        }
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Impact {
    Positive,
    Neutral,
    Negative,
    Controversial,
}

impl Impact {
    pub const ALL: [Impact; 4] = [
        Impact::Positive,
        Impact::Neutral,
        Impact::Negative,
        Impact::Controversial,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Impact::Positive => "Positive",
            Impact::Neutral => "Neutral",
            Impact::Negative => "Negative",
            Impact::Controversial => "Controversial",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    pub const ALL: [Priority; 3] = [Priority::High, Priority::Medium, Priority::Low];

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::High => "High",
            Priority::Medium => "Medium",
            Priority::Low => "Low",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ingredient {
    pub name: String,
    pub impact: Impact,
    pub description: String,
}

/// A healthier product, either a direct substitute or a plan swap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alternative {
    pub product_name: String,
    pub reason: String,
}

pub type SuggestedSwap = Alternative;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetailLink {
    pub retailer: String,
    pub url: String,
}

/// Health assessment of a single product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductAnalysis {
    pub product_name: String,
    pub overall_score: Score,
    pub summary: String,
    pub ingredients: Vec<Ingredient>,
    pub allergens: Vec<String>,
    pub alternatives: Vec<Alternative>,
    /// Older history entries were stored without an image URL.
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    pub retail_links: Vec<RetailLink>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionPlanItem {
    pub original_product: String,
    pub priority: Priority,
    pub reason: String,
    pub suggested_swaps: Vec<SuggestedSwap>,
}

/// Prioritized swap plan covering a list of daily products.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LifestyleOverhaulPlan {
    pub overall_summary: String,
    pub action_plan: Vec<ActionPlanItem>,
    pub general_advice: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub product_name: String,
    pub reason: String,
    pub image_search_term: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_product_analysis_deserialize() {
        let json = r#"{
            "productName": "Krave Cereal",
            "overallScore": "D",
            "summary": "High in added sugar.",
            "ingredients": [
                {"name": "Sugar", "impact": "Negative", "description": "Added sugar."}
            ],
            "allergens": ["Wheat"],
            "alternatives": [
                {"productName": "Plain Oats", "reason": "No added sugar."}
            ],
            "imageUrl": "https://example.com/krave.jpg",
            "retailLinks": [{"retailer": "Walmart", "url": "https://walmart.com/krave"}]
        }"#;

        let analysis: ProductAnalysis = serde_json::from_str(json).unwrap();
        assert_eq!(analysis.product_name, "Krave Cereal");
        assert_eq!(analysis.overall_score, Score::D);
        assert_eq!(analysis.ingredients[0].impact, Impact::Negative);
        assert_eq!(analysis.alternatives[0].product_name, "Plain Oats");
        assert_eq!(analysis.retail_links.len(), 1);
    }

    #[test]
    fn test_product_analysis_optional_fields_default() {
        let json = r#"{
            "productName": "Oat Milk",
            "overallScore": "B",
            "summary": "Fine.",
            "ingredients": [],
            "allergens": [],
            "alternatives": []
        }"#;

        let analysis: ProductAnalysis = serde_json::from_str(json).unwrap();
        assert!(analysis.image_url.is_empty());
        assert!(analysis.retail_links.is_empty());
    }

    #[test]
    fn test_unknown_score_rejected() {
        let json = r#"{
            "productName": "Mystery",
            "overallScore": "E",
            "summary": "",
            "ingredients": [],
            "allergens": [],
            "alternatives": []
        }"#;
        assert!(serde_json::from_str::<ProductAnalysis>(json).is_err());
    }

    #[test]
    fn test_score_buckets() {
        assert!(Score::A.is_liked());
        assert!(Score::B.is_liked());
        assert!(!Score::C.is_liked() && !Score::C.is_disliked());
        assert!(Score::D.is_disliked());
        assert!(Score::F.is_disliked());
        assert_eq!(Score::F.label(), "Very Poor");
    }

    #[test]
    fn test_overhaul_plan_serialize_camel_case() {
        let plan = LifestyleOverhaulPlan {
            overall_summary: "Lots of soda.".to_string(),
            action_plan: vec![ActionPlanItem {
                original_product: "Cola".to_string(),
                priority: Priority::High,
                reason: "Sugar".to_string(),
                suggested_swaps: vec![SuggestedSwap {
                    product_name: "Sparkling water".to_string(),
                    reason: "No sugar".to_string(),
                }],
            }],
            general_advice: vec!["Drink water".to_string()],
        };

        let json = serde_json::to_string(&plan).unwrap();
        assert!(json.contains("\"overallSummary\""));
        assert!(json.contains("\"suggestedSwaps\""));
        assert!(json.contains("\"High\""));
    }
}
