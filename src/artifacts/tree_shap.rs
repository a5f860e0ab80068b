//! Path-dependent TreeSHAP
//!
//! Exact Shapley values for one tree in polynomial time (Lundberg et al.,
//! "Consistent Individualized Feature Attribution for Tree Ensembles",
//! Algorithm 2). Expectations over absent features are taken with the training
//! cover of each branch, so the values of one tree sum to
//! `leaf_value(row) - expected_value()`.

use super::booster::Tree;

#[derive(Debug, Clone, Copy)]
struct PathElement {
    /// `None` only for the root sentinel at index 0
    feature: Option<usize>,
    zero_fraction: f64,
    one_fraction: f64,
    pweight: f64,
}

/// Add this tree's contributions for `row` into `phi` (one slot per feature)
pub fn tree_shap(tree: &Tree, row: &[f32], phi: &mut [f64]) {
    recurse(tree, row, phi, 0, &[], 1.0, 1.0, None);
}

#[allow(clippy::too_many_arguments)]
fn recurse(
    tree: &Tree,
    row: &[f32],
    phi: &mut [f64],
    index: usize,
    parent_path: &[PathElement],
    zero_fraction: f64,
    one_fraction: f64,
    feature: Option<usize>,
) {
    let mut path = parent_path.to_vec();
    extend(&mut path, zero_fraction, one_fraction, feature);

    let node = tree.node(index);
    let Some((left, right)) = node.children else {
        for i in 1..path.len() {
            let weight = unwound_sum(&path, i);
            let el = path[i];
            if let Some(f) = el.feature {
                phi[f] += weight * (el.one_fraction - el.zero_fraction) * node.value;
            }
        }
        return;
    };

    let hot = match tree.next(index, row) {
        Some(child) => child,
        None => return,
    };
    let cold = if hot == left { right } else { left };

    let hot_zero = tree.node(hot).cover / node.cover;
    let cold_zero = tree.node(cold).cover / node.cover;

    // a feature already on the path is undone before being split on again
    let mut incoming_zero = 1.0;
    let mut incoming_one = 1.0;
    if let Some(k) = path.iter().position(|el| el.feature == Some(node.feature)) {
        incoming_zero = path[k].zero_fraction;
        incoming_one = path[k].one_fraction;
        unwind(&mut path, k);
    }

    recurse(tree, row, phi, hot, &path, hot_zero * incoming_zero, incoming_one, Some(node.feature));
    recurse(tree, row, phi, cold, &path, cold_zero * incoming_zero, 0.0, Some(node.feature));
}

fn extend(path: &mut Vec<PathElement>, zero_fraction: f64, one_fraction: f64, feature: Option<usize>) {
    let depth = path.len();
    path.push(PathElement {
        feature,
        zero_fraction,
        one_fraction,
        pweight: if depth == 0 { 1.0 } else { 0.0 },
    });

    let d = depth as f64;
    for i in (0..depth).rev() {
        let fi = i as f64;
        path[i + 1].pweight += one_fraction * path[i].pweight * (fi + 1.0) / (d + 1.0);
        path[i].pweight = zero_fraction * path[i].pweight * (d - fi) / (d + 1.0);
    }
}

fn unwind(path: &mut Vec<PathElement>, index: usize) {
    let depth = path.len() - 1;
    let d = depth as f64;
    let one_fraction = path[index].one_fraction;
    let zero_fraction = path[index].zero_fraction;
    let mut next_one_portion = path[depth].pweight;

    for i in (0..depth).rev() {
        let fi = i as f64;
        if one_fraction != 0.0 {
            let tmp = path[i].pweight;
            path[i].pweight = next_one_portion * (d + 1.0) / ((fi + 1.0) * one_fraction);
            next_one_portion = tmp - path[i].pweight * zero_fraction * (d - fi) / (d + 1.0);
        } else {
            path[i].pweight = path[i].pweight * (d + 1.0) / (zero_fraction * (d - fi));
        }
    }

    for i in index..depth {
        path[i].feature = path[i + 1].feature;
        path[i].zero_fraction = path[i + 1].zero_fraction;
        path[i].one_fraction = path[i + 1].one_fraction;
    }
    path.pop();
}

/// Total permutation weight of the path with element `index` removed
fn unwound_sum(path: &[PathElement], index: usize) -> f64 {
    let depth = path.len() - 1;
    let d = depth as f64;
    let one_fraction = path[index].one_fraction;
    let zero_fraction = path[index].zero_fraction;
    let mut next_one_portion = path[depth].pweight;
    let mut total = 0.0;

    for i in (0..depth).rev() {
        let fi = i as f64;
        if one_fraction != 0.0 {
            let tmp = next_one_portion * (d + 1.0) / ((fi + 1.0) * one_fraction);
            total += tmp;
            next_one_portion = path[i].pweight - tmp * zero_fraction * ((d - fi) / (d + 1.0));
        } else if zero_fraction != 0.0 {
            total += (path[i].pweight / zero_fraction) / ((d - fi) / (d + 1.0));
        }
    }

    total
}
