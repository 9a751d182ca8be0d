//! Document kinds: the only per-template piece of the engine.
//!
//! Each kind turns its payload into a `GenerationPlan` (the template context
//! plus the tables to trim). Search, substitution, trimming and rich content
//! are shared.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::context::{RichLinkSlot, TemplateContext};
use crate::error::ResolutionError;
use crate::format::FormatPolicy;
use crate::marker::{ItemField, Marker};

/// Contact row: up to five free-form fields, in template column order.
pub type ContactRow = Vec<String>;

/// Leading marker of the line-item table.
pub const ITEMS_TABLE_MARKER: &str = "<-tabla-items->";
/// Leading marker of the contact table.
pub const CONTACTS_TABLE_MARKER: &str = "<-tabla-contactos->";
/// Keyword identifying the summary row of the line-item table.
pub const TOTAL_KEYWORD: &str = "TOTAL";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub name: String,
    pub quantity: f64,
    pub unit_price: f64,
    #[serde(default)]
    pub dev_hours: Option<f64>,
}

impl LineItem {
    pub fn total(&self) -> f64 {
        self.quantity * self.unit_price
    }
}

/// A table the trimming pass shrinks to the data actually supplied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSpec {
    /// Text that precedes the table in the template. Left in place by the
    /// substitution pass and cleared by the trimming pass.
    pub leading_marker: String,
    pub data_rows: usize,
    /// Keyword of the trailing summary row, if the table has one.
    pub summary_keyword: Option<String>,
}

/// Everything the engine needs for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationPlan {
    pub context: TemplateContext,
    pub tables: Vec<TableSpec>,
}

/// A payload that can be resolved against a template.
pub trait DocumentKind {
    /// Short name used in logs and records.
    fn kind_name(&self) -> &'static str;

    /// Build the plan. Pure: no I/O, same payload → same plan.
    fn resolve(&self, policy: &FormatPolicy) -> Result<GenerationPlan, ResolutionError>;
}

/// Commercial proposal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProposalPayload {
    pub company: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub items: Vec<LineItem>,
    /// Tax rate as a fraction (`0.19` for 19%).
    #[serde(default)]
    pub tax_rate: f64,
    #[serde(default)]
    pub conditions: String,
    #[serde(default)]
    pub contacts: Vec<ContactRow>,
    #[serde(default)]
    pub links: Vec<RichLinkSlot>,
}

impl DocumentKind for ProposalPayload {
    fn kind_name(&self) -> &'static str {
        "proposal"
    }

    fn resolve(&self, policy: &FormatPolicy) -> Result<GenerationPlan, ResolutionError> {
        let company = required(&self.company, "company")?;
        check_amount("tax_rate", self.tax_rate)?;
        check_items(&self.items)?;

        let subtotal: f64 = self.items.iter().map(LineItem::total).sum();
        let tax = subtotal * self.tax_rate;
        let hours: f64 = self.items.iter().filter_map(|i| i.dev_hours).sum();

        let mut builder = TemplateContext::builder();
        builder
            .set(Marker::scalar("empresa"), company)
            .set(Marker::scalar("fecha"), policy.date(self.date))
            .set(Marker::scalar("subtotal"), policy.currency(subtotal))
            .set(Marker::scalar("impuesto"), policy.currency(tax))
            .set(Marker::scalar("total"), policy.currency(subtotal + tax))
            .set(Marker::scalar("horas"), policy.quantity(hours))
            .set(Marker::scalar("condiciones"), self.conditions.trim());
        set_items(&mut builder, &self.items, policy);
        builder.contact_matrix(&self.contacts)?;
        for link in &self.links {
            builder.rich_link(link)?;
        }

        Ok(GenerationPlan {
            context: builder.build()?,
            tables: standard_tables(self.items.len(), self.contacts.len()),
        })
    }
}

/// Marketing report: spend per channel over a period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportPayload {
    pub company: String,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    /// Generation date shown on the cover.
    pub date: NaiveDate,
    /// One row per channel: name, units bought, unit cost.
    #[serde(default)]
    pub channels: Vec<LineItem>,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub contacts: Vec<ContactRow>,
    #[serde(default)]
    pub links: Vec<RichLinkSlot>,
}

impl DocumentKind for ReportPayload {
    fn kind_name(&self) -> &'static str {
        "report"
    }

    fn resolve(&self, policy: &FormatPolicy) -> Result<GenerationPlan, ResolutionError> {
        let company = required(&self.company, "company")?;
        if self.period_end < self.period_start {
            return Err(ResolutionError::InvalidPeriod);
        }
        check_items(&self.channels)?;

        let investment: f64 = self.channels.iter().map(LineItem::total).sum();

        let mut builder = TemplateContext::builder();
        builder
            .set(Marker::scalar("empresa"), company)
            .set(Marker::scalar("fecha"), policy.date(self.date))
            .set(
                Marker::scalar("periodo"),
                policy.period(self.period_start, self.period_end),
            )
            .set(Marker::scalar("inversion"), policy.currency(investment))
            .set(Marker::scalar("notas"), self.notes.trim());
        set_items(&mut builder, &self.channels, policy);
        builder.contact_matrix(&self.contacts)?;
        for link in &self.links {
            builder.rich_link(link)?;
        }

        Ok(GenerationPlan {
            context: builder.build()?,
            tables: standard_tables(self.channels.len(), self.contacts.len()),
        })
    }
}

fn required<'a>(value: &'a str, field: &'static str) -> Result<&'a str, ResolutionError> {
    match value.trim() {
        "" => Err(ResolutionError::MissingField(field)),
        v => Ok(v),
    }
}

fn check_amount(field: &str, value: f64) -> Result<(), ResolutionError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ResolutionError::InvalidAmount {
            field: field.to_string(),
            value,
        })
    }
}

fn check_items(items: &[LineItem]) -> Result<(), ResolutionError> {
    for (i, item) in items.iter().enumerate() {
        let n = i + 1;
        if item.name.trim().is_empty() {
            return Err(ResolutionError::MissingField("items.name"));
        }
        check_amount(&format!("items[{}].quantity", n), item.quantity)?;
        check_amount(&format!("items[{}].unit_price", n), item.unit_price)?;
        if let Some(hours) = item.dev_hours {
            check_amount(&format!("items[{}].dev_hours", n), hours)?;
        }
    }
    Ok(())
}

/// Item markers exist only for `1..=items.len()`; leftover template rows are
/// removed by trimming.
fn set_items(builder: &mut crate::context::ContextBuilder, items: &[LineItem], policy: &FormatPolicy) {
    for (i, item) in items.iter().enumerate() {
        let n = i + 1;
        builder
            .set(Marker::Item { field: ItemField::Item, n }, item.name.trim())
            .set(
                Marker::Item { field: ItemField::Cantidad, n },
                policy.quantity(item.quantity),
            )
            .set(
                Marker::Item { field: ItemField::Precio, n },
                policy.currency(item.unit_price),
            )
            .set(
                Marker::Item { field: ItemField::Total, n },
                policy.currency(item.total()),
            );
    }
}

fn standard_tables(item_rows: usize, contact_rows: usize) -> Vec<TableSpec> {
    vec![
        TableSpec {
            leading_marker: ITEMS_TABLE_MARKER.to_string(),
            data_rows: item_rows,
            summary_keyword: Some(TOTAL_KEYWORD.to_string()),
        },
        TableSpec {
            leading_marker: CONTACTS_TABLE_MARKER.to_string(),
            data_rows: contact_rows,
            summary_keyword: None,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::RichKind;
    use pretty_assertions::assert_eq;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn proposal() -> ProposalPayload {
        ProposalPayload {
            company: "  Acme SpA ".to_string(),
            date: date(2026, 10, 18),
            items: vec![
                LineItem {
                    name: "Sitio web".to_string(),
                    quantity: 1.0,
                    unit_price: 1_500_000.0,
                    dev_hours: Some(40.0),
                },
                LineItem {
                    name: "Mantención".to_string(),
                    quantity: 12.0,
                    unit_price: 80_000.0,
                    dev_hours: Some(2.5),
                },
            ],
            tax_rate: 0.19,
            conditions: "Pago a 30 días".to_string(),
            contacts: vec![vec!["Ana".to_string(), "Ventas".to_string()]],
            links: vec![RichLinkSlot {
                marker: "agenda".to_string(),
                kind: RichKind::Calendar,
                url: Some("https://cal.example.com/acme".to_string()),
                label: "Agendar reunión".to_string(),
            }],
        }
    }

    #[test]
    fn test_proposal_resolution() {
        let plan = proposal().resolve(&FormatPolicy::default()).unwrap();
        let ctx = &plan.context;

        assert_eq!(ctx.get("<-empresa->"), Some("Acme SpA"));
        assert_eq!(ctx.get("<-fecha->"), Some("18 de octubre de 2026"));
        assert_eq!(ctx.get("<-subtotal->"), Some("$2.460.000"));
        assert_eq!(ctx.get("<-impuesto->"), Some("$467.400"));
        assert_eq!(ctx.get("<-total->"), Some("$2.927.400"));
        assert_eq!(ctx.get("<-horas->"), Some("42,5"));
        assert_eq!(ctx.get("<item2>"), Some("Mantención"));
        assert_eq!(ctx.get("<cantidad2>"), Some("12"));
        assert_eq!(ctx.get("<precio2>"), Some("$80.000"));
        assert_eq!(ctx.get("<total2>"), Some("$960.000"));
        assert_eq!(ctx.get("<item3>"), None);
        assert_eq!(ctx.get("<w1c2>"), Some("Ventas"));
        assert_eq!(ctx.rich_slots().len(), 1);

        assert_eq!(plan.tables.len(), 2);
        assert_eq!(plan.tables[0].data_rows, 2);
        assert_eq!(plan.tables[0].summary_keyword.as_deref(), Some("TOTAL"));
        assert_eq!(plan.tables[1].data_rows, 1);
        assert_eq!(plan.tables[1].summary_keyword, None);
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let policy = FormatPolicy::default();
        let a = proposal().resolve(&policy).unwrap();
        let b = proposal().resolve(&policy).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_missing_company_is_rejected() {
        let mut payload = proposal();
        payload.company = "   ".to_string();
        assert_eq!(
            payload.resolve(&FormatPolicy::default()).unwrap_err(),
            ResolutionError::MissingField("company")
        );
    }

    #[test]
    fn test_link_marker_cannot_replace_company() {
        let mut payload = proposal();
        payload.links[0].marker = "empresa".to_string();
        assert_eq!(
            payload.resolve(&FormatPolicy::default()).unwrap_err(),
            ResolutionError::MarkerCollision {
                first: "<-empresa->".to_string(),
                second: "<-empresa->".to_string(),
            }
        );
    }

    #[test]
    fn test_negative_price_is_rejected() {
        let mut payload = proposal();
        payload.items[1].unit_price = -1.0;
        assert!(matches!(
            payload.resolve(&FormatPolicy::default()),
            Err(ResolutionError::InvalidAmount { .. })
        ));
    }

    #[test]
    fn test_report_resolution() {
        let report = ReportPayload {
            company: "Acme".to_string(),
            period_start: date(2026, 9, 1),
            period_end: date(2026, 9, 30),
            date: date(2026, 10, 2),
            channels: vec![LineItem {
                name: "Google Ads".to_string(),
                quantity: 1000.0,
                unit_price: 350.0,
                dev_hours: None,
            }],
            notes: String::new(),
            contacts: vec![],
            links: vec![],
        };

        let plan = report.resolve(&FormatPolicy::default()).unwrap();
        assert_eq!(
            plan.context.get("<-periodo->"),
            Some("1 de septiembre de 2026 al 30 de septiembre de 2026")
        );
        assert_eq!(plan.context.get("<-inversion->"), Some("$350.000"));
        assert_eq!(plan.context.get("<cantidad1>"), Some("1.000"));
        assert_eq!(plan.tables[1].data_rows, 0);
    }

    #[test]
    fn test_report_period_must_be_ordered() {
        let report = ReportPayload {
            company: "Acme".to_string(),
            period_start: date(2026, 9, 30),
            period_end: date(2026, 9, 1),
            date: date(2026, 10, 2),
            channels: vec![],
            notes: String::new(),
            contacts: vec![],
            links: vec![],
        };
        assert_eq!(
            report.resolve(&FormatPolicy::default()).unwrap_err(),
            ResolutionError::InvalidPeriod
        );
    }
}
