//! Price estimation. The narrative path asks an LLM to render a fixed
//! three-section block per cart item and parses it back; the heuristic path
//! is the deterministic fallback and also backs any single item whose block
//! fails to parse.

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use rust_decimal::Decimal;

use homequote_core::domain::cart::{CartItem, PriceRange};
use homequote_core::domain::estimate::{EstimateLineItem, EstimateResult, EstimateSource};
use homequote_core::pricing;

use crate::llm::LlmClient;

pub const DISCLAIMER: &str = "Estimates are preliminary ranges based on the details provided, \
                              not a final price. A firm quote follows an on-site assessment.";

const HEURISTIC_EXPLANATION: &str = "Prices reflect typical rates for each service, adjusted \
                                     for the details you shared.";

#[async_trait]
pub trait Estimator: Send + Sync {
    async fn estimate(&self, items: &[CartItem], context: Option<&str>)
        -> Result<EstimateResult>;
}

#[derive(Clone, Debug, Default)]
pub struct HeuristicEstimator;

impl HeuristicEstimator {
    pub fn line_item(item: &CartItem) -> EstimateLineItem {
        let price = pricing::adjusted_price(&item.service_name, &item.collected_details);
        EstimateLineItem {
            service_id: item.service_id.clone(),
            service_name: item.service_name.clone(),
            price: pricing::heuristic_range(price),
            note: format!("Typical range for {}.", item.service_name),
            source: EstimateSource::Heuristic,
        }
    }

    pub fn estimate_items(items: &[CartItem]) -> EstimateResult {
        let breakdown: Vec<EstimateLineItem> = items.iter().map(Self::line_item).collect();
        let total = EstimateResult::total_of(&breakdown);
        EstimateResult {
            breakdown,
            total,
            explanation: HEURISTIC_EXPLANATION.to_string(),
            disclaimer: DISCLAIMER.to_string(),
        }
    }
}

#[async_trait]
impl Estimator for HeuristicEstimator {
    async fn estimate(
        &self,
        items: &[CartItem],
        _context: Option<&str>,
    ) -> Result<EstimateResult> {
        Ok(Self::estimate_items(items))
    }
}

/// LLM-rendered estimate. Expects one block per item:
///
/// ```text
/// SERVICE: <name>
/// ESTIMATE: $<low> - $<high>
/// NOTES: <one or two sentences>
/// ```
pub struct NarrativeEstimator {
    llm: Arc<dyn LlmClient>,
}

impl NarrativeEstimator {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl Estimator for NarrativeEstimator {
    async fn estimate(&self, items: &[CartItem], context: Option<&str>)
        -> Result<EstimateResult> {
        let prompt = build_prompt(items, context);
        let response = self.llm.complete(&prompt).await.context("estimate completion failed")?;

        let breakdown: Vec<EstimateLineItem> =
            items.iter().map(|item| parse_item_block(&response, item)).collect();
        let total = EstimateResult::total_of(&breakdown);
        let explanation = breakdown
            .iter()
            .find(|line| line.source == EstimateSource::Narrative)
            .map(|line| line.note.clone())
            .unwrap_or_else(|| HEURISTIC_EXPLANATION.to_string());

        Ok(EstimateResult {
            breakdown,
            total,
            explanation,
            disclaimer: DISCLAIMER.to_string(),
        })
    }
}

fn build_prompt(items: &[CartItem], context: Option<&str>) -> String {
    let mut prompt = String::from(
        "You are pricing home services. For each service below, reply with exactly three \
         lines per service:\nSERVICE: <name>\nESTIMATE: $<low> - $<high>\nNOTES: <short \
         reasoning>\n\n",
    );
    for item in items {
        prompt.push_str(&format!("Service: {}\n", item.service_name));
        for (key, detail) in &item.collected_details {
            prompt.push_str(&format!("  {}: {}\n", key, detail.value));
        }
    }
    if let Some(context) = context {
        prompt.push_str(&format!("\nAdditional context: {context}\n"));
    }
    prompt
}

/// Finds this item's block in the narrative and parses its estimate line. A
/// malformed or missing block falls back to the item's heuristic price only;
/// other items are unaffected.
fn parse_item_block(response: &str, item: &CartItem) -> EstimateLineItem {
    let Some(block) = find_block(response, &item.service_name) else {
        return HeuristicEstimator::line_item(item);
    };
    let Some(price) = block.estimate else {
        return HeuristicEstimator::line_item(item);
    };
    if price.low > price.high || price.low < Decimal::ZERO {
        return HeuristicEstimator::line_item(item);
    }

    EstimateLineItem {
        service_id: item.service_id.clone(),
        service_name: item.service_name.clone(),
        price,
        note: block.notes.unwrap_or_else(|| format!("Estimated range for {}.", item.service_name)),
        source: EstimateSource::Narrative,
    }
}

struct NarrativeBlock {
    estimate: Option<PriceRange>,
    notes: Option<String>,
}

fn find_block(response: &str, service_name: &str) -> Option<NarrativeBlock> {
    let wanted = service_name.to_ascii_lowercase();
    let mut lines = response.lines().peekable();

    while let Some(line) = lines.next() {
        let Some(name) = line.trim().strip_prefix("SERVICE:") else {
            continue;
        };
        if !name.trim().to_ascii_lowercase().contains(&wanted)
            && !wanted.contains(&name.trim().to_ascii_lowercase())
        {
            continue;
        }

        let mut estimate = None;
        let mut notes = None;
        while let Some(next) = lines.peek() {
            let trimmed = next.trim();
            if trimmed.starts_with("SERVICE:") {
                break;
            }
            if let Some(raw) = trimmed.strip_prefix("ESTIMATE:") {
                estimate = parse_estimate_line(raw);
            } else if let Some(raw) = trimmed.strip_prefix("NOTES:") {
                let text = raw.trim();
                if !text.is_empty() {
                    notes = Some(text.to_string());
                }
            }
            lines.next();
        }
        return Some(NarrativeBlock { estimate, notes });
    }
    None
}

fn parse_estimate_line(raw: &str) -> Option<PriceRange> {
    let (low_raw, high_raw) = raw.split_once('-')?;
    let low = parse_money(low_raw)?;
    let high = parse_money(high_raw)?;
    Some(PriceRange { low, high })
}

fn parse_money(raw: &str) -> Option<Decimal> {
    let cleaned: String = raw
        .trim()
        .trim_start_matches('$')
        .chars()
        .filter(|ch| ch.is_ascii_digit() || *ch == '.')
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse().ok()
}
