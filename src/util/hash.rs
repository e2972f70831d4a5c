//! Cheap change-detection fingerprints for layer data.

use std::hash::{Hash, Hasher};

use glam::Vec3;
use rustc_hash::FxHasher;

/// Hash a single [`Vec3`] by converting each component to bits.
pub fn hash_vec3(v: &Vec3, hasher: &mut impl Hasher) {
    v.x.to_bits().hash(hasher);
    v.y.to_bits().hash(hasher);
    v.z.to_bits().hash(hasher);
}

/// Hash a slice of [`Vec3`] by sampling first, middle, and last points.
///
/// Provides good change detection without hashing every element.
pub fn hash_vec3_slice_summary(slice: &[Vec3], hasher: &mut impl Hasher) {
    slice.len().hash(hasher);
    if let Some(first) = slice.first() {
        hash_vec3(first, hasher);
    }
    if slice.len() > 2 {
        hash_vec3(&slice[slice.len() / 2], hasher);
    }
    if let Some(last) = slice.last() {
        hash_vec3(last, hasher);
    }
}

/// Fingerprint of `(id, path, scalars)` items. The scalars carry whatever
/// per-item values besides the path feed the layer (opacity, width).
pub fn fingerprint_paths<'a, const N: usize>(
    items: impl IntoIterator<Item = (&'a str, &'a [Vec3], [f32; N])>,
) -> u64 {
    let mut hasher = FxHasher::default();
    let mut count = 0usize;
    for (id, path, scalars) in items {
        id.hash(&mut hasher);
        hash_vec3_slice_summary(path, &mut hasher);
        hash_scalars(&scalars, &mut hasher);
        count += 1;
    }
    count.hash(&mut hasher);
    hasher.finish()
}

/// Fingerprint of `(id, position, scalars)` items.
pub fn fingerprint_points<'a, const N: usize>(
    items: impl IntoIterator<Item = (&'a str, Vec3, [f32; N])>,
) -> u64 {
    let mut hasher = FxHasher::default();
    let mut count = 0usize;
    for (id, position, scalars) in items {
        id.hash(&mut hasher);
        hash_vec3(&position, &mut hasher);
        hash_scalars(&scalars, &mut hasher);
        count += 1;
    }
    count.hash(&mut hasher);
    hasher.finish()
}

fn hash_scalars(scalars: &[f32], hasher: &mut impl Hasher) {
    for s in scalars {
        s.to_bits().hash(hasher);
    }
}
