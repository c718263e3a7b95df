//! Arithmetic in Z_T for plaintext moduli below 2^62.
//!
//! Products are widened to u128 before reduction, so every helper is exact
//! for any modulus accepted by [`Parameters`](crate::params::Parameters).

#[inline]
pub fn reduce(x: u64, t: u64) -> u64 {
    x % t
}

#[inline]
pub fn add(a: u64, b: u64, t: u64) -> u64 {
    let s = a + b;
    if s >= t {
        s - t
    } else {
        s
    }
}

#[inline]
pub fn sub(a: u64, b: u64, t: u64) -> u64 {
    if a >= b {
        a - b
    } else {
        a + t - b
    }
}

#[inline]
pub fn neg(a: u64, t: u64) -> u64 {
    if a == 0 {
        0
    } else {
        t - a
    }
}

#[inline]
pub fn mul(a: u64, b: u64, t: u64) -> u64 {
    ((a as u128 * b as u128) % t as u128) as u64
}

pub fn pow(mut base: u64, mut exp: u64, t: u64) -> u64 {
    let mut acc = 1 % t;
    base %= t;
    while exp > 0 {
        if exp & 1 == 1 {
            acc = mul(acc, base, t);
        }
        base = mul(base, base, t);
        exp >>= 1;
    }
    acc
}

/// Inverse of `a` modulo a prime `t` (Fermat). Returns `None` for zero.
pub fn inv(a: u64, t: u64) -> Option<u64> {
    let a = a % t;
    if a == 0 {
        return None;
    }
    Some(pow(a, t - 2, t))
}

/// Horner evaluation of `coeffs[0] + coeffs[1]·x + … ` in Z_t.
pub fn horner(coeffs: &[u64], x: u64, t: u64) -> u64 {
    coeffs
        .iter()
        .rev()
        .fold(0, |acc, &c| add(mul(acc, x, t), c % t, t))
}

/// Map a residue to the centered signed representative in (-t/2, t/2].
pub fn to_signed(value: u64, t: u64) -> i64 {
    if value > t / 2 {
        -((t - value) as i64)
    } else {
        value as i64
    }
}

/// Map a signed integer to its residue in [0, t).
pub fn from_signed(value: i64, t: u64) -> u64 {
    let r = (value as i128).rem_euclid(t as i128);
    r as u64
}

/// Deterministic Miller-Rabin, exact for every u64.
pub fn is_prime(n: u64) -> bool {
    const BASES: [u64; 12] = [2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37];
    if n < 2 {
        return false;
    }
    for &p in &BASES {
        if n % p == 0 {
            return n == p;
        }
    }
    let mut d = n - 1;
    let mut r = 0;
    while d % 2 == 0 {
        d /= 2;
        r += 1;
    }
    'witness: for &a in &BASES {
        let mut x = pow(a, d, n);
        if x == 1 || x == n - 1 {
            continue;
        }
        for _ in 1..r {
            x = mul(x, x, n);
            if x == n - 1 {
                continue 'witness;
            }
        }
        return false;
    }
    true
}

// Slotwise helpers over whole vectors.

pub fn add_slots(a: &[u64], b: &[u64], t: u64) -> Vec<u64> {
    a.iter().zip(b).map(|(&x, &y)| add(x, y, t)).collect()
}

pub fn mul_slots(a: &[u64], b: &[u64], t: u64) -> Vec<u64> {
    a.iter().zip(b).map(|(&x, &y)| mul(x, y, t)).collect()
}

pub fn neg_slots(a: &[u64], t: u64) -> Vec<u64> {
    a.iter().map(|&x| neg(x, t)).collect()
}

pub fn scale_slots(a: &[u64], scalar: u64, t: u64) -> Vec<u64> {
    a.iter().map(|&x| mul(x, scalar, t)).collect()
}
