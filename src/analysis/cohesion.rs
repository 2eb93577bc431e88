//! Lack of cohesion of methods (LCOM).
//!
//! For a class with `n >= 2` methods, LCOM is the share of the `n(n-1)/2`
//! method pairs that touch no common field of the class itself. 0 means every
//! pair shares state; 1 means no method shares a field with any other.

use crate::analysis::class_name;
use crate::model::ClassDescriptor;
use std::collections::BTreeSet;

pub fn class_lcom(class: &ClassDescriptor) -> f64 {
    let own = class.name.trim();
    let accessed: Vec<BTreeSet<&str>> = class
        .methods
        .iter()
        .map(|method| {
            method
                .field_accesses
                .iter()
                .filter(|access| class_name(&access.owner).as_deref() == Some(own))
                .map(|access| access.name.trim())
                .collect()
        })
        .collect();

    let n = accessed.len();
    if n < 2 {
        return 0.0;
    }

    let mut disjoint = 0usize;
    for (i, left) in accessed.iter().enumerate() {
        for right in &accessed[i + 1..] {
            if left.is_disjoint(right) {
                disjoint += 1;
            }
        }
    }

    let pairs = n * (n - 1) / 2;
    disjoint as f64 / pairs as f64
}

/// Simple average of the classes' LCOM; 0 for an empty package.
pub fn package_lcom<'a>(classes: impl IntoIterator<Item = &'a ClassDescriptor>) -> f64 {
    let (sum, count) = classes
        .into_iter()
        .fold((0.0, 0usize), |(sum, count), class| {
            (sum + class_lcom(class), count + 1)
        });
    if count == 0 { 0.0 } else { sum / count as f64 }
}
