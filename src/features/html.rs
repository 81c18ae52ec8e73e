//! HTML-structure block: dictionary-vectorised tag census counts.

use std::collections::{BTreeMap, HashMap};

use crate::features::{FeatureBlock, SparseRow};
use crate::model::MessageRecord;

/// Flattens each record's HTML census into synthetic count features and
/// vectorises them over the key set seen during fit.
///
/// Key formats: `tag_<name>_count`, `<tag>_attr_<attr>_count`,
/// `<tag>_attr_<attr>_value_<value>_count`.
#[derive(Default)]
pub struct HtmlCensusBlock {
    index: BTreeMap<String, usize>,
}

/// Flatten one record's census into a key → count mapping.
fn flatten(record: &MessageRecord) -> HashMap<String, f64> {
    let mut features = HashMap::new();
    for tag in &record.html_tags {
        features.insert(format!("tag_{}_count", tag.tag), f64::from(tag.count));
        for attribute in &tag.attributes {
            features.insert(
                format!("{}_attr_{}_count", tag.tag, attribute.attribute),
                f64::from(attribute.count),
            );
            for value in &attribute.values {
                features.insert(
                    format!(
                        "{}_attr_{}_value_{}_count",
                        tag.tag, attribute.attribute, value.value
                    ),
                    f64::from(value.count),
                );
            }
        }
    }
    features
}

impl FeatureBlock for HtmlCensusBlock {
    fn fit(&mut self, records: &[&MessageRecord]) {
        let mut keys: Vec<String> = Vec::new();
        for record in records {
            keys.extend(flatten(record).into_keys());
        }
        keys.sort_unstable();
        keys.dedup();
        self.index = keys.into_iter().zip(0..).collect();
    }

    fn transform(&self, records: &[&MessageRecord]) -> Vec<SparseRow> {
        records
            .iter()
            .map(|record| {
                let mut row: SparseRow = flatten(record)
                    .into_iter()
                    // Keys unseen during fit are silently ignored.
                    .filter_map(|(key, count)| self.index.get(&key).map(|&col| (col, count)))
                    .collect();
                row.sort_unstable_by_key(|&(column, _)| column);
                row
            })
            .collect()
    }

    fn feature_names(&self) -> Vec<String> {
        self.index.keys().cloned().collect()
    }
}
