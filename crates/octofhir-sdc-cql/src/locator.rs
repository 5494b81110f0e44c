//! Expression discovery over questionnaire items

use crate::questionnaire::{Item, ItemExpression};
use serde::{Deserialize, Serialize};

/// Which items are scanned for expression extensions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Traversal {
    /// Only the questionnaire's top-level `item` array
    #[default]
    TopLevel,
    /// Every item, depth-first pre-order through child `item` arrays
    Nested,
}

/// Items that carry calculatable expressions, split by kind
///
/// An item carrying both kinds appears in both lists.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocatedItems<'a> {
    pub reference_items: Vec<&'a Item>,
    pub inline_items: Vec<&'a Item>,
}

impl LocatedItems<'_> {
    /// No calculatable expression was found at all
    pub fn is_empty(&self) -> bool {
        self.reference_items.is_empty() && self.inline_items.is_empty()
    }
}

/// Split `items` into reference-carrying and inline-carrying items
pub fn locate(items: &[Item], traversal: Traversal) -> LocatedItems<'_> {
    let mut located = LocatedItems::default();
    for item in walk(items, traversal) {
        let expressions = item.expressions();
        if expressions
            .iter()
            .any(|e| matches!(e, ItemExpression::Reference { .. }))
        {
            located.reference_items.push(item);
        }
        if expressions
            .iter()
            .any(|e| matches!(e, ItemExpression::Inline { .. }))
        {
            located.inline_items.push(item);
        }
    }
    located
}

fn walk(items: &[Item], traversal: Traversal) -> Vec<&Item> {
    match traversal {
        Traversal::TopLevel => items.iter().collect(),
        Traversal::Nested => {
            let mut out = Vec::new();
            let mut stack: Vec<&Item> = items.iter().rev().collect();
            while let Some(item) = stack.pop() {
                out.push(item);
                stack.extend(item.item.iter().rev());
            }
            out
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::questionnaire::Questionnaire;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    const CALCULATED: &str =
        "http://hl7.org/fhir/uv/sdc/StructureDefinition/sdc-questionnaire-calculatedExpression";
    const INITIAL: &str =
        "http://hl7.org/fhir/uv/sdc/StructureDefinition/sdc-questionnaire-initialExpression";

    fn questionnaire() -> Questionnaire {
        Questionnaire::from_value(&json!({
            "item": [
                {
                    "linkId": "score",
                    "extension": [{ "url": CALCULATED, "valueExpression": { "reference": "\"MyLib\".\"Score\"" } }],
                    "item": [{
                        "linkId": "score.child",
                        "extension": [{ "url": INITIAL, "valueExpression": { "expression": "1 + 1" } }]
                    }]
                },
                {
                    "linkId": "both",
                    "extension": [
                        { "url": CALCULATED, "valueExpression": { "expression": "2*3" } },
                        { "url": INITIAL, "valueExpression": { "reference": "\"MyLib\".\"Other\"" } }
                    ]
                },
                { "linkId": "plain", "text": "No expressions" }
            ]
        }))
        .unwrap()
    }

    fn link_ids(items: &[&Item]) -> Vec<String> {
        items.iter().filter_map(|i| i.link_id.clone()).collect()
    }

    #[test]
    fn test_top_level_scan_skips_children() {
        let q = questionnaire();
        let located = locate(&q.item, Traversal::TopLevel);
        assert_eq!(link_ids(&located.reference_items), vec!["score", "both"]);
        assert_eq!(link_ids(&located.inline_items), vec!["both"]);
    }

    #[test]
    fn test_nested_scan_is_pre_order() {
        let q = questionnaire();
        let located = locate(&q.item, Traversal::Nested);
        assert_eq!(link_ids(&located.inline_items), vec!["score.child", "both"]);
    }

    #[test]
    fn test_nothing_located() {
        let located = locate(&[], Traversal::TopLevel);
        assert!(located.is_empty());
        assert!(located.reference_items.is_empty());
    }
}
