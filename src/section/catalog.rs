//! Built-in business plan catalog.

use crate::section::{FieldType, RecordShape, SectionRegistry, SectionSpec};
use FieldType::{Float, Int};

/// Reporting years a tabular section covers by default.
pub const DEFAULT_REPORTING_YEARS: usize = 3;

fn yearly(fields: &[&str]) -> RecordShape {
    fields
        .iter()
        .fold(RecordShape::new().field("year", Int), |shape, name| {
            shape.field(name, Float)
        })
}

fn narratives() -> Vec<SectionSpec> {
    vec![
        SectionSpec::narrative(
            "executive_summary",
            200,
            "Summarize the overall business opportunity: the core product or service, the \
             market need it addresses, key team strengths, business traction (if any), and the \
             long-term vision. Highlight why this business matters now.",
        ),
        SectionSpec::narrative(
            "business_overview",
            250,
            "Describe the company's mission, vision, and founding story. Include when and why \
             it was started, what goals it seeks to achieve, where it is currently based, and \
             what motivates the team behind it.",
        ),
        SectionSpec::narrative(
            "market_analysis",
            500,
            "Analyze the market: total addressable market (TAM), serviceable available market \
             (SAM), and obtainable market (SOM). Identify competitors, customer segments, market \
             trends, and why the timing is right for this solution.",
        ),
        SectionSpec::narrative(
            "business_model",
            500,
            "Explain how the business makes money. Describe primary and secondary revenue \
             streams, customer acquisition strategy, pricing model, cost structure, margins, and \
             how the model scales over time.",
        ),
        SectionSpec::narrative(
            "marketing_and_sales_strategy",
            500,
            "Describe how the business plans to go to market. Include positioning, target \
             customers, sales channels (online/offline), customer acquisition cost strategies, \
             conversion funnels, and how growth will be driven operationally.",
        ),
        SectionSpec::narrative(
            "sector_strategy",
            500,
            "Outline how the company will operate within its industry sector: current sector \
             trends, competitive landscape, regulatory environment, key success factors, and how \
             the business will position itself to gain a competitive advantage over time.",
        ),
        SectionSpec::narrative(
            "funding_sources",
            500,
            "Explain all current and future funding sources, including equity investment, loans, \
             grants, crowdfunding, or internal cash flow. Specify amounts, stages of funding, \
             potential investors or lenders, and how the funds will be allocated.",
        ),
        SectionSpec::narrative(
            "operations_plan",
            500,
            "Describe the company's operations plan and strategic moves: how the business will \
             execute its strategy, strategic partnerships, collaborations or acquisitions, how it \
             will manage risks and opportunities, and how it will adapt to changing markets.",
        ),
    ]
}

fn tables(years: usize) -> Vec<SectionSpec> {
    vec![
        SectionSpec::tabular(
            "financial_highlights",
            yearly(&["revenue", "net_income", "capex", "debt_repayment"]),
            years,
            "Headline financial figures per year.",
        ),
        SectionSpec::tabular(
            "cash_flow_analysis",
            yearly(&["operating", "investing", "financing", "net_cash"]),
            years,
            "Cash flows per year; net_cash is the sum of operating, investing and financing.",
        ),
        SectionSpec::tabular(
            "profit_and_loss_projection",
            RecordShape::new()
                .field("year", Int)
                .field("revenue", Float)
                .field("cogs", Float)
                .field("gross_profit", Float)
                .field("operating_expenses", Float)
                .optional("ebitda", Float)
                .optional("depreciation_amortization", Float)
                .optional("ebit", Float)
                .optional("interest", Float)
                .optional("taxes", Float)
                .field("net_income", Float),
            years,
            "Projected profit and loss statement per year.",
        ),
        SectionSpec::tabular(
            "balance_sheet",
            RecordShape::new()
                .field("year", Int)
                .field("assets", Float)
                .optional("current_assets", Float)
                .optional("non_current_assets", Float)
                .field("liabilities", Float)
                .optional("current_liabilities", Float)
                .optional("non_current_liabilities", Float)
                .field("equity", Float),
            years,
            "Balance sheet per year; assets equal liabilities plus equity.",
        ),
        SectionSpec::tabular(
            "net_financial_position",
            yearly(&["net_position"]),
            years,
            "Net financial position per year.",
        ),
        SectionSpec::tabular(
            "debt_structure",
            RecordShape::new()
                .field("year", Int)
                .field("repayment", Float)
                .optional("interest_rate", Float)
                .optional("outstanding_debt", Float),
            years,
            "Debt repayment schedule per year.",
        ),
        SectionSpec::tabular(
            "key_ratios",
            RecordShape::new()
                .field("year", Int)
                .field("roi", Float)
                .field("roe", Float)
                .field("debt_to_equity", Float)
                .optional("gross_margin", Float)
                .optional("ebitda_margin", Float)
                .optional("net_margin", Float)
                .optional("current_ratio", Float)
                .optional("quick_ratio", Float)
                .optional("asset_turnover", Float),
            years,
            "Key financial ratios per year.",
        ),
        SectionSpec::tabular(
            "operating_cost_breakdown",
            yearly(&[
                "revenue",
                "cogs",
                "employee_costs",
                "marketing",
                "rent",
                "administration",
                "amortization",
                "other_expenses",
                "interest_expenses",
                "tax",
            ]),
            years,
            "Operating cost breakdown per year.",
        ),
        SectionSpec::tabular(
            "financial_analysis",
            yearly(&[
                "gross_operating_cash_flow",
                "working_capital_change",
                "current_management_cash_flow",
                "operating_cash_flow",
                "debt_service_cash_flow",
                "shareholders_cash_flow",
                "net_cash_flow",
                "sales_revenue",
                "production_value",
                "gross_operating_margin",
                "ebit",
                "ebt",
                "net_income",
                "dividends",
                "net_tangible_assets",
                "net_intangible_assets",
                "financial_assets",
                "trade_assets",
                "inventory",
                "deferred_liquidity",
                "immediate_liquidity",
                "equity",
                "long_term_debt",
                "short_term_debt",
                "net_financial_position",
                "mortgage_loans",
                "other_financial_debts",
                "cash_and_banks",
            ]),
            years,
            "Detailed cash flow, income and balance figures per year.",
        ),
        SectionSpec::tabular(
            "ratios_analysis",
            yearly(&[
                "roi",
                "roe",
                "ros",
                "ebit_margin",
                "net_debt_to_ebitda",
                "net_debt_to_equity",
                "net_debt_to_revenue",
                "current_ratio",
                "quick_ratio",
                "debt_to_equity",
                "treasury_margin",
                "structural_margin",
                "net_working_capital",
                "altman_z_score",
            ]),
            years,
            "Profitability, leverage and liquidity ratios per year.",
        ),
        SectionSpec::tabular(
            "production_sales_forecast",
            RecordShape::new()
                .field("year", Int)
                .field("sales_revenue", Float)
                .field("revenue_growth", Float)
                .field("units_sold", Int)
                .field("average_price", Float)
                .field("unit_production_cost", Float)
                .field("unit_margin", Float),
            years,
            "Production and sales forecast per year.",
        ),
    ]
}

/// Every business plan section, narratives first.
pub fn business_plan_sections(years: usize) -> Vec<SectionSpec> {
    let years = years.max(1);
    let mut sections = narratives();
    sections.extend(tables(years));
    sections
}

impl SectionRegistry {
    /// Registry for the built-in business plan with the given number of reporting years.
    pub fn business_plan(years: usize) -> Self {
        let sections = business_plan_sections(years);
        let index = sections
            .iter()
            .enumerate()
            .map(|(position, spec)| (spec.key.clone(), position))
            .collect();
        Self::from_parts(sections, index)
    }
}
