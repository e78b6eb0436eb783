//! Stride-windowed sampling of an expanded address list.
//!
//! Bounds the probe volume of a big block while keeping coverage spread over
//! the whole range, instead of biasing toward the low addresses.

use std::net::IpAddr;

use rand::Rng;

/// Reduces `addrs` to roughly `target` entries.
///
/// Lists at or under the target are returned unchanged. Larger lists are cut
/// into consecutive windows of `len / target` addresses, and one address is
/// drawn uniformly from each window; output order follows the windows. The
/// last window may be short, so the result can exceed `target` by at most
/// one sample per leftover window.
pub fn stride_sample<R: Rng>(addrs: &[IpAddr], target: usize, rng: &mut R) -> Vec<IpAddr> {
    if target == 0 {
        return Vec::new();
    }
    if addrs.len() <= target {
        return addrs.to_vec();
    }

    let stride = addrs.len() / target;
    let mut sampled = Vec::with_capacity(target + 1);

    let mut start = 0;
    while start < addrs.len() {
        let end = (start + stride).min(addrs.len());
        sampled.push(addrs[rng.random_range(start..end)]);
        start += stride;
    }
    sampled
}
