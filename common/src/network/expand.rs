//! Turns one input token into a concrete list of candidate addresses.
//!
//! A token is either a bare IP literal or a CIDR block. Small blocks are
//! enumerated in full (minus the network and broadcast addresses); IPv6
//! blocks with more than 8 host bits are far too large for that, so a fixed
//! number of pseudo-random in-prefix addresses is drawn instead.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use rand::Rng;

use crate::error::ExpandError;

/// Sample count drawn from an IPv6 block too large to enumerate.
const LARGE_V6_SAMPLES: usize = 512;

/// Smallest IPv6 prefix that still gets enumerated exhaustively.
const V6_ENUMERABLE_PREFIX: u8 = 120;

/// Expands a single token into addresses.
///
/// All randomness flows through `rng` so callers can seed it.
pub fn expand_token<R: Rng>(token: &str, rng: &mut R) -> Result<Vec<IpAddr>, ExpandError> {
    let Some((base, prefix)) = token.split_once('/') else {
        return token
            .parse::<IpAddr>()
            .map(|addr| vec![addr])
            .map_err(|_| ExpandError::InvalidAddressFormat(token.to_string()));
    };

    let invalid = || ExpandError::InvalidCidr(token.to_string());
    let base: IpAddr = base.parse().map_err(|_| invalid())?;
    let prefix: u8 = prefix.parse().map_err(|_| invalid())?;

    match base {
        IpAddr::V4(v4) => {
            if prefix > 32 {
                return Err(invalid());
            }
            Ok(enumerate(v4.octets(), prefix, |o| IpAddr::V4(Ipv4Addr::from(o))))
        }
        IpAddr::V6(v6) => {
            if prefix > 128 {
                return Err(invalid());
            }
            if prefix >= V6_ENUMERABLE_PREFIX {
                Ok(enumerate(v6.octets(), prefix, |o| IpAddr::V6(Ipv6Addr::from(o))))
            } else {
                Ok(random_hosts(v6.octets(), prefix, rng))
            }
        }
    }
}

/// Walks the whole block in ascending order, starting from the network
/// address. The network and broadcast addresses are excluded whenever the
/// block is big enough to have dedicated ones.
fn enumerate<const N: usize>(base: [u8; N], prefix: u8, make: fn([u8; N]) -> IpAddr) -> Vec<IpAddr> {
    let mask = prefix_mask::<N>(prefix);
    let mut current = base;
    for (byte, m) in current.iter_mut().zip(mask) {
        *byte &= m;
    }

    let host_bits = N as u32 * 8 - u32::from(prefix);
    let count = 1u128 << host_bits;

    let mut addrs = Vec::new();
    for _ in 0..count {
        addrs.push(make(current));
        increment(&mut current);
    }

    if addrs.len() > 2 {
        addrs.pop();
        addrs.remove(0);
    }
    addrs
}

/// Draws `LARGE_V6_SAMPLES` addresses inside the prefix: network bits are
/// kept from the base address, host bits are randomized per byte.
/// Duplicates among the samples are allowed.
fn random_hosts<R: Rng>(base: [u8; 16], prefix: u8, rng: &mut R) -> Vec<IpAddr> {
    let mask = prefix_mask::<16>(prefix);

    (0..LARGE_V6_SAMPLES)
        .map(|_| {
            let mut octets = [0u8; 16];
            for (i, byte) in octets.iter_mut().enumerate() {
                *byte = (base[i] & mask[i]) | (rng.random::<u8>() & !mask[i]);
            }
            IpAddr::V6(Ipv6Addr::from(octets))
        })
        .collect()
}

/// Byte mask with the first `prefix` bits set.
fn prefix_mask<const N: usize>(prefix: u8) -> [u8; N] {
    let mut mask = [0u8; N];
    let mut remaining = usize::from(prefix);
    for byte in mask.iter_mut() {
        let bits = remaining.min(8);
        if bits > 0 {
            *byte = 0xff << (8 - bits);
        }
        remaining -= bits;
    }
    mask
}

/// Increments the lowest-order byte, carrying into higher bytes on overflow.
fn increment(octets: &mut [u8]) {
    for byte in octets.iter_mut().rev() {
        *byte = byte.wrapping_add(1);
        if *byte != 0 {
            break;
        }
    }
}
