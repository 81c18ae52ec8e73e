//! Metadata block: standardized numeric counts plus raw boolean flags.

use crate::features::{FeatureBlock, SparseRow};
use crate::model::MessageRecord;

const NUMERIC_NAMES: [&str; 3] = ["link_count", "duplicate_link_count", "recipient_count"];
const BOOLEAN_NAMES: [&str; 2] = ["has_attachment", "auth_failed"];

/// `link_count`, `duplicate_link_count` and `recipient_count`
/// standardized to zero mean / unit variance with fit-time statistics;
/// `has_attachment` and `auth_failed` appended unscaled as 0/1.
#[derive(Default)]
pub struct MetadataBlock {
    means: [f64; 3],
    scales: [f64; 3],
}

fn numeric_values(record: &MessageRecord) -> [f64; 3] {
    [
        f64::from(record.link_count),
        f64::from(record.duplicate_link_count),
        f64::from(record.recipient_count),
    ]
}

impl FeatureBlock for MetadataBlock {
    fn fit(&mut self, records: &[&MessageRecord]) {
        let n = records.len() as f64;
        if n == 0.0 {
            self.means = [0.0; 3];
            self.scales = [1.0; 3];
            return;
        }

        let mut sums = [0.0; 3];
        for record in records {
            let values = numeric_values(record);
            for (sum, value) in sums.iter_mut().zip(values) {
                *sum += value;
            }
        }
        for (mean, sum) in self.means.iter_mut().zip(sums) {
            *mean = sum / n;
        }

        let mut squares = [0.0; 3];
        for record in records {
            let values = numeric_values(record);
            for ((square, value), mean) in squares.iter_mut().zip(values).zip(self.means) {
                *square += (value - mean) * (value - mean);
            }
        }
        for (scale, square) in self.scales.iter_mut().zip(squares) {
            let variance = square / n;
            // Constant columns pass through unscaled.
            *scale = if variance > 0.0 { variance.sqrt() } else { 1.0 };
        }
    }

    fn transform(&self, records: &[&MessageRecord]) -> Vec<SparseRow> {
        records
            .iter()
            .map(|record| {
                let mut row: SparseRow = Vec::with_capacity(5);
                let values = numeric_values(record);
                for (i, value) in values.into_iter().enumerate() {
                    let standardized = (value - self.means[i]) / self.scales[i];
                    if standardized != 0.0 {
                        row.push((i, standardized));
                    }
                }
                if record.has_attachment {
                    row.push((3, 1.0));
                }
                if record.auth_failed {
                    row.push((4, 1.0));
                }
                row
            })
            .collect()
    }

    fn feature_names(&self) -> Vec<String> {
        NUMERIC_NAMES
            .iter()
            .chain(BOOLEAN_NAMES.iter())
            .map(|s| s.to_string())
            .collect()
    }
}
