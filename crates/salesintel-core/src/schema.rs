//! Static description of the readable structured-store entities.

use std::fmt::Write as _;

/// One readable entity, its columns and the closed value sets of its enum columns.
#[derive(Debug, Clone, Copy)]
pub struct Entity {
    pub name: &'static str,
    pub columns: &'static [&'static str],
    pub enums: &'static [(&'static str, &'static [&'static str])],
}

/// Read-only, process-wide schema text handed to the translator.
#[derive(Debug, Clone, Copy)]
pub struct SchemaDescription {
    entities: &'static [Entity],
}

const SALES_ENTITIES: &[Entity] = &[
    Entity {
        name: "users",
        columns: &["id", "email", "full_name", "role", "is_active", "created_at"],
        enums: &[("role", &["admin", "sales", "marketing"])],
    },
    Entity {
        name: "leads",
        columns: &[
            "id", "company_name", "contact_name", "email", "phone", "job_title", "industry", "company_size",
            "annual_revenue", "location", "status", "source", "ai_score", "estimated_value", "notes",
            "assigned_to", "created_at", "last_contact_date",
        ],
        enums: &[
            ("status", &["new", "contacted", "qualified", "proposal", "negotiation", "closed_won", "closed_lost"]),
            ("source", &["website", "referral", "linkedin", "cold_call", "email_campaign", "trade_show", "other"]),
        ],
    },
    Entity {
        name: "customers",
        columns: &[
            "id", "lead_id", "company_name", "contact_name", "email", "phone", "industry", "company_size",
            "location", "status", "lifetime_value", "total_purchases", "created_at",
        ],
        enums: &[("status", &["active", "inactive", "churned"])],
    },
    Entity {
        name: "campaigns",
        columns: &[
            "id", "name", "description", "campaign_type", "status", "target_audience", "target_industry", "budget",
            "spent", "impressions", "clicks", "conversions", "leads_generated", "revenue_attributed",
            "click_through_rate", "conversion_rate", "cost_per_lead", "roi", "start_date", "end_date",
        ],
        enums: &[
            ("campaign_type", &["email", "social_media", "ppc", "content", "event", "webinar", "other"]),
            ("status", &["draft", "active", "paused", "completed", "cancelled"]),
        ],
    },
    Entity {
        name: "sales_records",
        columns: &[
            "id", "customer_id", "sales_rep_id", "deal_name", "description", "amount", "currency", "stage",
            "probability", "product_name", "quantity", "close_date", "actual_close_date", "notes",
        ],
        enums: &[("stage", &["prospecting", "qualification", "proposal", "negotiation", "closed_won", "closed_lost"])],
    },
];

impl SchemaDescription {
    /// The sales platform schema: users, leads, customers, campaigns, sales_records.
    pub const fn sales() -> Self {
        Self { entities: SALES_ENTITIES }
    }

    pub fn entities(&self) -> &'static [Entity] {
        self.entities
    }

    pub fn entity_names(&self) -> Vec<String> {
        self.entities.iter().map(|e| e.name.to_string()).collect()
    }

    /// Numbered, human-readable listing used inside prompts.
    pub fn render(&self) -> String {
        let mut out = String::from("Database Schema:\n");
        for (i, entity) in self.entities.iter().enumerate() {
            let _ = writeln!(out, "\n{}. {} ({})", i + 1, entity.name, entity.columns.join(", "));
            for (column, values) in entity.enums {
                let quoted: Vec<String> = values.iter().map(|v| format!("'{v}'")).collect();
                let _ = writeln!(out, "   - {column}: {}", quoted.join(", "));
            }
        }
        out
    }
}

impl Default for SchemaDescription {
    fn default() -> Self {
        Self::sales()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_every_entity_with_enum_values() {
        let text = SchemaDescription::sales().render();
        assert!(text.starts_with("Database Schema:"));
        for name in ["users", "leads", "customers", "campaigns", "sales_records"] {
            assert!(text.contains(&format!(". {name} (")), "missing {name}");
        }
        assert!(text.contains("- stage: 'prospecting'"));
        assert!(text.contains("'closed_won'"));
    }

    #[test]
    fn entity_names_match_default_allow_list() {
        assert_eq!(
            SchemaDescription::default().entity_names(),
            vec!["users", "leads", "customers", "campaigns", "sales_records"]
        );
    }
}
