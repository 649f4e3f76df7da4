//! Field-level checks applied to every parsed AI response.
//!
//! Serde already rejects missing fields and out-of-enum values; these checks
//! catch shapes that parse but are unusable (blank names, empty summaries).

use std::fmt;

use super::types::{LifestyleOverhaulPlan, ProductAnalysis, Recommendation};

/// A required field that is present but unusable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaViolation {
    pub field: String,
    pub reason: &'static str,
}

impl fmt::Display for SchemaViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "field '{}' {}", self.field, self.reason)
    }
}

impl std::error::Error for SchemaViolation {}

pub trait Validate {
    fn validate(&self) -> Result<(), SchemaViolation>;
}

fn require_text(field: impl Into<String>, value: &str) -> Result<(), SchemaViolation> {
    if value.trim().is_empty() {
        return Err(SchemaViolation {
            field: field.into(),
            reason: "must not be empty",
        });
    }
    Ok(())
}

impl Validate for ProductAnalysis {
    fn validate(&self) -> Result<(), SchemaViolation> {
        require_text("productName", &self.product_name)?;
        require_text("summary", &self.summary)?;
        for (i, ingredient) in self.ingredients.iter().enumerate() {
            require_text(format!("ingredients[{}].name", i), &ingredient.name)?;
        }
        for (i, alt) in self.alternatives.iter().enumerate() {
            require_text(format!("alternatives[{}].productName", i), &alt.product_name)?;
        }
        for (i, link) in self.retail_links.iter().enumerate() {
            require_text(format!("retailLinks[{}].url", i), &link.url)?;
        }
        Ok(())
    }
}

impl Validate for LifestyleOverhaulPlan {
    fn validate(&self) -> Result<(), SchemaViolation> {
        require_text("overallSummary", &self.overall_summary)?;
        for (i, item) in self.action_plan.iter().enumerate() {
            require_text(format!("actionPlan[{}].originalProduct", i), &item.original_product)?;
            require_text(format!("actionPlan[{}].reason", i), &item.reason)?;
            for (j, swap) in item.suggested_swaps.iter().enumerate() {
                require_text(
                    format!("actionPlan[{}].suggestedSwaps[{}].productName", i, j),
                    &swap.product_name,
                )?;
            }
        }
        Ok(())
    }
}

impl Validate for Recommendation {
    fn validate(&self) -> Result<(), SchemaViolation> {
        require_text("productName", &self.product_name)?;
        require_text("reason", &self.reason)?;
        require_text("imageSearchTerm", &self.image_search_term)
    }
}

impl<T: Validate> Validate for Vec<T> {
    fn validate(&self) -> Result<(), SchemaViolation> {
        for (i, item) in self.iter().enumerate() {
            item.validate().map_err(|v| SchemaViolation {
                field: format!("[{}].{}", i, v.field),
                reason: v.reason,
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::types::{ActionPlanItem, Priority, Score, SuggestedSwap};

    fn analysis() -> ProductAnalysis {
        ProductAnalysis {
            product_name: "Oats".to_string(),
            overall_score: Score::A,
            summary: "Whole grain.".to_string(),
            ingredients: vec![],
            allergens: vec![],
            alternatives: vec![],
            image_url: String::new(),
            retail_links: vec![],
        }
    }

    #[test]
    fn test_valid_analysis_passes() {
        assert!(analysis().validate().is_ok());
    }

    #[test]
    fn test_blank_product_name_rejected() {
        let mut a = analysis();
        a.product_name = "   ".to_string();
        let err = a.validate().unwrap_err();
        assert_eq!(err.field, "productName");
    }

    #[test]
    fn test_nested_swap_path_reported() {
        let plan = LifestyleOverhaulPlan {
            overall_summary: "ok".to_string(),
            action_plan: vec![ActionPlanItem {
                original_product: "Soda".to_string(),
                priority: Priority::High,
                reason: "sugar".to_string(),
                suggested_swaps: vec![SuggestedSwap {
                    product_name: String::new(),
                    reason: "none".to_string(),
                }],
            }],
            general_advice: vec![],
        };
        let err = plan.validate().unwrap_err();
        assert_eq!(err.field, "actionPlan[0].suggestedSwaps[0].productName");
    }

    #[test]
    fn test_recommendation_list_index_in_path() {
        let recs = vec![
            Recommendation {
                product_name: "Kefir".to_string(),
                reason: "Probiotics".to_string(),
                image_search_term: "kefir".to_string(),
            },
            Recommendation {
                product_name: "Hummus".to_string(),
                reason: "Protein".to_string(),
                image_search_term: "".to_string(),
            },
        ];
        let err = recs.validate().unwrap_err();
        assert_eq!(err.field, "[1].imageSearchTerm");
        assert_eq!(err.to_string(), "field '[1].imageSearchTerm' must not be empty");
    }
}
