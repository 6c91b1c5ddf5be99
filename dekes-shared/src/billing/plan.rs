/// Paid plan catalog and price mapping
///
/// Quotas live on [`OrganizationPlan`]; this module maps the paid plans to
/// the Stripe price ids configured for the deployment.

use crate::models::organization::OrganizationPlan;

/// Stripe price ids for the paid plans; `None` means "not sold here"
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlanPrices {
    pub starter: Option<String>,
    pub professional: Option<String>,
    pub enterprise: Option<String>,
}

impl PlanPrices {
    /// Price id for a paid plan, if configured
    pub fn price_for(&self, plan: OrganizationPlan) -> Option<&str> {
        let price = match plan {
            OrganizationPlan::Free => None,
            OrganizationPlan::Starter => self.starter.as_deref(),
            OrganizationPlan::Professional => self.professional.as_deref(),
            OrganizationPlan::Enterprise => self.enterprise.as_deref(),
        };

        price.filter(|p| !p.is_empty())
    }
}

/// Parses a plan name that can be bought at checkout
///
/// ```
/// use dekes_shared::billing::plan::parse_paid_plan;
/// use dekes_shared::models::organization::OrganizationPlan;
///
/// assert_eq!(parse_paid_plan("STARTER"), Some(OrganizationPlan::Starter));
/// assert_eq!(parse_paid_plan("FREE"), None);
/// assert_eq!(parse_paid_plan("starter"), None);
/// ```
pub fn parse_paid_plan(value: &str) -> Option<OrganizationPlan> {
    OrganizationPlan::parse(value).filter(|plan| plan.is_paid())
}
