use serde::Serialize;
use tracing::warn;

use super::history_access;
use crate::analyzer::LifestyleOverhaulPlan;
use crate::app::App;
use crate::history::new_entry;

pub const NO_PRODUCT_LIST: &str = "Please enter a list of products.";
pub const SIGN_IN_TO_SAVE: &str = "Sign in to save your lifestyle plans to your history.";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverhaulOutcome {
    pub plan: LifestyleOverhaulPlan,
    pub saved: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<String>,
}

/// Build a lifestyle overhaul plan for a list of daily products.
///
/// Plans are recorded for signed-in users only.
pub async fn overhaul(app: &mut App, products: &str) -> Result<OverhaulOutcome, String> {
    let query = products.trim();
    if query.is_empty() {
        return Err(NO_PRODUCT_LIST.to_string());
    }

    let plan = app.advisor()?.get_lifestyle_overhaul(query).await?;

    if app.session().is_none() {
        return Ok(OverhaulOutcome {
            plan,
            saved: false,
            notice: Some(SIGN_IN_TO_SAVE.to_string()),
        });
    }

    let (saved, notice) = match history_access(app).await {
        Ok(Some(access)) => {
            let entry = new_entry(plan.clone(), query.to_string());
            (app.history_mut().add_overhaul(&access, entry).await, None)
        }
        Ok(None) => (false, Some(SIGN_IN_TO_SAVE.to_string())),
        Err(e) => {
            warn!("Plan not saved: {}", e);
            (false, Some(e.to_string()))
        }
    };

    Ok(OverhaulOutcome {
        plan,
        saved,
        notice,
    })
}
