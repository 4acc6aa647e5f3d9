//! Membership plan catalog and monthly token allowances.

use crate::types::{SubscriptionTier, Tokens};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Plan {
    pub tier: SubscriptionTier,
    pub title: &'static str,
    /// Monthly price in cents.
    pub price_cents: u32,
    pub description: &'static str,
    /// Tokens included per month; `None` is unlimited.
    pub monthly_tokens: Option<u32>,
    pub features: Vec<&'static str>,
    pub popular: bool,
}

impl Plan {
    pub fn price_label(&self) -> String {
        format!("${}.{:02}", self.price_cents / 100, self.price_cents % 100)
    }

    /// Whether `requested` more tokens fit in the month after `used`.
    pub fn allows(&self, used: Tokens, requested: Tokens) -> bool {
        match self.monthly_tokens {
            None => true,
            Some(limit) => used + requested <= f64::from(limit),
        }
    }

    /// Tokens left this month; `None` when unlimited.
    pub fn remaining(&self, used: Tokens) -> Option<Tokens> {
        self.monthly_tokens
            .map(|limit| (f64::from(limit) - used).max(0.0))
    }
}

/// All plans, cheapest first.
pub fn plans() -> Vec<Plan> {
    SubscriptionTier::ALL.into_iter().map(plan_for).collect()
}

pub fn plan_for(tier: SubscriptionTier) -> Plan {
    match tier {
        SubscriptionTier::Free => Plan {
            tier,
            title: "Free",
            price_cents: 0,
            description: "Basic plan for small projects",
            monthly_tokens: Some(5),
            features: vec![
                "5 tokens per month",
                "Basic AI project assistance",
                "Access to Kanban board",
                "Manual calendar management",
            ],
            popular: false,
        },
        SubscriptionTier::Starter => Plan {
            tier,
            title: "Starter",
            price_cents: 999,
            description: "For freelancers and individuals",
            monthly_tokens: Some(20),
            features: vec![
                "20 tokens per month",
                "Advanced AI project assistance",
                "Full calendar features",
                "Priority support",
                "1 free task per day",
            ],
            popular: true,
        },
        SubscriptionTier::Professional => Plan {
            tier,
            title: "Professional",
            price_cents: 1999,
            description: "For design professionals",
            monthly_tokens: Some(50),
            features: vec![
                "50 tokens per month",
                "Premium AI project assistance",
                "Advanced project analytics",
                "Custom task groups",
                "Multiple free tasks",
                "Priority support",
            ],
            popular: false,
        },
        SubscriptionTier::Enterprise => Plan {
            tier,
            title: "Enterprise",
            price_cents: 4999,
            description: "For teams and agencies",
            monthly_tokens: None,
            features: vec![
                "Unlimited tokens",
                "Team collaboration features",
                "Multiple projects",
                "Custom integrations",
                "White-label option",
                "Dedicated support",
            ],
            popular: false,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_order_and_prices() {
        let labels: Vec<String> = plans().iter().map(Plan::price_label).collect();
        assert_eq!(labels, vec!["$0.00", "$9.99", "$19.99", "$49.99"]);
    }

    #[test]
    fn test_allowance() {
        let free = plan_for(SubscriptionTier::Free);
        assert!(free.allows(4.0, 1.0));
        assert!(!free.allows(4.5, 1.0));
        assert_eq!(free.remaining(6.0), Some(0.0));

        let enterprise = plan_for(SubscriptionTier::Enterprise);
        assert!(enterprise.allows(10_000.0, 50.0));
        assert_eq!(enterprise.remaining(10.0), None);
    }

    #[test]
    fn test_only_starter_is_popular() {
        let popular: Vec<SubscriptionTier> =
            plans().into_iter().filter(|p| p.popular).map(|p| p.tier).collect();
        assert_eq!(popular, vec![SubscriptionTier::Starter]);
    }
}
