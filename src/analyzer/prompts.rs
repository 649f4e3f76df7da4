//! System instruction, response schemas, and prompt builders.
//!
//! Schemas use the OpenAPI subset accepted by Gemini's `responseSchema`
//! (upper-case type names).

use serde_json::{json, Value};

use super::types::{Impact, Priority, Score};

/// Shared system instruction for every call.
pub const SYSTEM_PROMPT: &str = "You are NutriLife AI, an expert health and wellness assistant. \
You help people understand the food and lifestyle products they use, grounded in scientific evidence, \
accurate, and always supportive and non-judgmental.
- Give a clear score with a detailed, easy-to-understand explanation.
- Include a direct, publicly accessible URL for a representative image of the product.
- Include up to 3 direct shopping links from major online retailers (e.g. Amazon, Walmart, Target).
- Identify potential allergens.
- Suggest 2-3 widely available alternatives that are genuinely healthier and would likely score 'A' or 'B'.
- For lifestyle overhauls, look for patterns across the listed daily products and build a prioritized, actionable plan.
- For recommendations, suggest products the user has not analyzed yet, based on the products they liked.
- Never give medical diagnoses or treatment plans; your advice is informational only.
- Always answer in the requested JSON format with every required field present.";

fn score_enum() -> Vec<&'static str> {
    Score::ALL.iter().map(|s| s.as_str()).collect()
}

fn impact_enum() -> Vec<&'static str> {
    Impact::ALL.iter().map(|i| i.as_str()).collect()
}

fn priority_enum() -> Vec<&'static str> {
    Priority::ALL.iter().map(|p| p.as_str()).collect()
}

/// Response schema for a single product analysis.
pub fn product_analysis_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "productName": { "type": "STRING", "description": "The identified name of the product." },
            "imageUrl": {
                "type": "STRING",
                "description": "A direct, publicly accessible URL for a high-quality, representative image of the product."
            },
            "overallScore": { "type": "STRING", "enum": score_enum(), "description": "A-F score." },
            "summary": {
                "type": "STRING",
                "description": "Detailed explanation for the score, highlighting key pros and cons."
            },
            "ingredients": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "name": { "type": "STRING" },
                        "impact": { "type": "STRING", "enum": impact_enum() },
                        "description": { "type": "STRING", "description": "Brief explanation of the ingredient's health impact." }
                    },
                    "required": ["name", "impact", "description"]
                }
            },
            "allergens": {
                "type": "ARRAY",
                "items": { "type": "STRING" },
                "description": "Potential common allergens found in the product."
            },
            "alternatives": {
                "type": "ARRAY",
                "description": "2-3 genuinely healthier alternatives that would likely score 'A' or 'B'.",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "productName": { "type": "STRING", "description": "Specific brand/product name." },
                        "reason": { "type": "STRING", "description": "Why this alternative is healthier." }
                    },
                    "required": ["productName", "reason"]
                }
            },
            "retailLinks": {
                "type": "ARRAY",
                "description": "Up to 3 shopping links from major online retailers.",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "retailer": { "type": "STRING", "description": "Name of the retailer." },
                        "url": { "type": "STRING", "description": "Direct URL to the product page." }
                    },
                    "required": ["retailer", "url"]
                }
            }
        },
        "required": [
            "productName", "imageUrl", "overallScore", "summary",
            "ingredients", "allergens", "alternatives", "retailLinks"
        ]
    })
}

/// Response schema for a lifestyle overhaul plan.
pub fn lifestyle_overhaul_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "overallSummary": {
                "type": "STRING",
                "description": "Summary of the user's current lifestyle based on the products and their common patterns."
            },
            "actionPlan": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "originalProduct": { "type": "STRING" },
                        "priority": { "type": "STRING", "enum": priority_enum(), "description": "Priority for swapping this product." },
                        "reason": { "type": "STRING", "description": "Why this product should be swapped." },
                        "suggestedSwaps": {
                            "type": "ARRAY",
                            "items": {
                                "type": "OBJECT",
                                "properties": {
                                    "productName": { "type": "STRING" },
                                    "reason": { "type": "STRING", "description": "Why this swap is healthier." }
                                },
                                "required": ["productName", "reason"]
                            }
                        }
                    },
                    "required": ["originalProduct", "priority", "reason", "suggestedSwaps"]
                }
            },
            "generalAdvice": {
                "type": "ARRAY",
                "items": { "type": "STRING" },
                "description": "Broader lifestyle advice."
            }
        },
        "required": ["overallSummary", "actionPlan", "generalAdvice"]
    })
}

/// Response schema for product recommendations.
pub fn recommendation_schema() -> Value {
    json!({
        "type": "ARRAY",
        "description": "5 recommended products similar to what the user likes but new to them.",
        "items": {
            "type": "OBJECT",
            "properties": {
                "productName": { "type": "STRING", "description": "Specific brand/product name." },
                "reason": { "type": "STRING", "description": "Brief reason the user might like it, based on their history." },
                "imageSearchTerm": {
                    "type": "STRING",
                    "description": "A simple 1-2 word search term for a product image (e.g. \"granola bar\")."
                }
            },
            "required": ["productName", "reason", "imageSearchTerm"]
        }
    })
}

/// Text part that accompanies an uploaded product photo.
pub fn build_image_analysis_prompt(context: &str) -> String {
    let context = context.trim();
    let guidance = if context.is_empty() {
        "Use the ingredient list and nutritional facts if they are visible.".to_string()
    } else {
        format!("The user also provided this text context: \"{}\"", context)
    };
    format!(
        "Analyze the product in this image. {} Provide a public image URL and shopping links for the identified product.",
        guidance
    )
}

/// Prompt for a text-only product analysis.
pub fn build_text_analysis_prompt(product_info: &str) -> String {
    format!(
        "Analyze the following product: \"{}\". Provide a public image URL and shopping links for it.",
        product_info.trim()
    )
}

/// Prompt embedding the raw list of daily products.
pub fn build_overhaul_prompt(product_list: &str) -> String {
    format!(
        "Please perform a \"Lifestyle Overhaul\" analysis based on the following list of daily products. \
Identify the worst offenders, suggest healthier swaps, and provide general advice.\n\nProduct List:\n{}",
        product_list.trim()
    )
}

/// Product-name sets derived from the analysis history.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecommendationSignals {
    /// Products scored A or B.
    pub liked: Vec<String>,
    /// Products scored D or F.
    pub disliked: Vec<String>,
    /// Every analyzed product; never to be recommended again.
    pub analyzed: Vec<String>,
}

fn join_or_none(names: &[String]) -> String {
    if names.is_empty() {
        "None".to_string()
    } else {
        names.join(", ")
    }
}

pub fn build_recommendation_prompt(signals: &RecommendationSignals) -> String {
    format!(
        "Based on a user's analysis history, suggest 5 new, healthy products they might like.\n\n\
The user has analyzed these products and liked them (score A or B):\n{}\n\n\
The user has analyzed these products and disliked them (score D or F):\n{}\n\n\
CRITICAL: Do not suggest any of the following products that the user has ALREADY analyzed:\n{}\n\n\
Provide 5 diverse recommendations for products that are generally considered healthy and match the \
user's positive preferences. For each one give a product name, a brief reason, and a simple 1-2 word \
search term for an image.",
        join_or_none(&signals.liked),
        join_or_none(&signals.disliked),
        join_or_none(&signals.analyzed),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_product_schema_requires_every_field() {
        let schema = product_analysis_schema();
        let required: Vec<&str> = schema["required"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_str().unwrap())
            .collect();
        for field in [
            "productName",
            "imageUrl",
            "overallScore",
            "summary",
            "ingredients",
            "allergens",
            "alternatives",
            "retailLinks",
        ] {
            assert!(required.contains(&field), "missing required field {}", field);
        }
    }

    #[test]
    fn test_product_schema_closed_enums() {
        let schema = product_analysis_schema();
        assert_eq!(
            schema["properties"]["overallScore"]["enum"],
            json!(["A", "B", "C", "D", "F"])
        );
        assert_eq!(
            schema["properties"]["ingredients"]["items"]["properties"]["impact"]["enum"],
            json!(["Positive", "Neutral", "Negative", "Controversial"])
        );
    }

    #[test]
    fn test_overhaul_schema_priority_enum() {
        let schema = lifestyle_overhaul_schema();
        assert_eq!(
            schema["properties"]["actionPlan"]["items"]["properties"]["priority"]["enum"],
            json!(["High", "Medium", "Low"])
        );
    }

    #[test]
    fn test_recommendation_schema_is_array() {
        assert_eq!(recommendation_schema()["type"], "ARRAY");
    }

    #[test]
    fn test_text_prompt_embeds_product() {
        let prompt = build_text_analysis_prompt("  Krave Cereal ");
        assert!(prompt.contains("\"Krave Cereal\""));
    }

    #[test]
    fn test_image_prompt_with_and_without_context() {
        let with_context = build_image_analysis_prompt("chocolate cereal");
        assert!(with_context.contains("\"chocolate cereal\""));

        let without = build_image_analysis_prompt("   ");
        assert!(without.contains("ingredient list"));
        assert!(!without.contains("text context"));
    }

    #[test]
    fn test_recommendation_prompt_lists() {
        let signals = RecommendationSignals {
            liked: vec!["Greek Yogurt".to_string(), "Oats".to_string()],
            disliked: vec![],
            analyzed: vec!["Greek Yogurt".to_string(), "Oats".to_string()],
        };
        let prompt = build_recommendation_prompt(&signals);
        assert!(prompt.contains("Greek Yogurt, Oats"));
        assert!(prompt.contains("score D or F):\nNone"));
        assert!(prompt.contains("ALREADY analyzed"));
    }
}
