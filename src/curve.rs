//! Ed25519 point-decompression check over the prime field 2^255 - 19.
//!
//! Program-derived addresses are only safe if no private key can ever sign
//! for them, so address derivation must reject any candidate that decodes to
//! a valid curve point. The check here runs the standard decompression
//! procedure (RFC 8032, section 5.1.3) with arbitrary-precision modular
//! arithmetic and reports whether it succeeds. All residues are kept in
//! canonical form, in the range [0, q).

use {
    num_bigint::BigUint,
    num_traits::{One, Zero},
};

struct Field {
    /// The field prime, 2^255 - 19.
    q: BigUint,
    /// The twisted Edwards curve constant, -121665/121666 mod q.
    d: BigUint,
    /// A square root of -1 mod q, used to correct candidate roots.
    sqrt_m1: BigUint,
    /// Exponent (q + 3) / 8 for the candidate square root.
    sqrt_exp: BigUint,
}

impl Field {
    fn new() -> Self {
        let q = (BigUint::one() << 255u32) - BigUint::from(19u32);
        let one = BigUint::one();

        // d = -121665 * inverse(121666), computed with Fermat inversion.
        let inv_121666 =
            BigUint::from(121666u32).modpow(&(&q - BigUint::from(2u32)), &q);
        let d = (&q - BigUint::from(121665u32)) * inv_121666 % &q;

        // 2 is a non-residue, so 2^((q-1)/4) is a square root of -1.
        let sqrt_m1 = BigUint::from(2u32).modpow(&((&q - &one) >> 2u32), &q);

        let sqrt_exp = (&q + BigUint::from(3u32)) >> 3u32;

        Self {
            q,
            d,
            sqrt_m1,
            sqrt_exp,
        }
    }

    fn add(&self, a: &BigUint, b: &BigUint) -> BigUint {
        (a + b) % &self.q
    }

    /// Subtraction stays non-negative by lifting `a` above `b` first.
    fn sub(&self, a: &BigUint, b: &BigUint) -> BigUint {
        (a + &self.q - b) % &self.q
    }

    fn mul(&self, a: &BigUint, b: &BigUint) -> BigUint {
        a * b % &self.q
    }

    fn invert(&self, a: &BigUint) -> BigUint {
        a.modpow(&(&self.q - BigUint::from(2u32)), &self.q)
    }
}

/// Check whether a 32-byte compressed encoding decodes to a point on the
/// ed25519 curve.
///
/// The encoding stores the y coordinate little-endian with the sign of x in
/// the top bit. Decompression recovers x² = (y² - 1) / (d·y² + 1), takes the
/// candidate root x = (x²)^((q+3)/8), corrects it by sqrt(-1) when needed,
/// and accepts only if the curve equation holds for the recovered pair.
pub fn bytes_are_curve_point<T: AsRef<[u8]>>(bytes: T) -> bool {
    let bytes = bytes.as_ref();
    if bytes.len() != 32 {
        return false;
    }

    let field = Field::new();
    let one = BigUint::one();

    let x_sign = (bytes[31] >> 7) & 1;
    let mut y_bytes = [0u8; 32];
    y_bytes.copy_from_slice(bytes);
    y_bytes[31] &= 0x7f;
    let y = BigUint::from_bytes_le(&y_bytes) % &field.q;

    // x² = (y² - 1) / (d·y² + 1). The denominator is never zero because
    // -1/d is a non-residue.
    let yy = field.mul(&y, &y);
    let u = field.sub(&yy, &one);
    let v = field.add(&field.mul(&field.d, &yy), &one);
    let xx = field.mul(&u, &field.invert(&v));

    let mut x = xx.modpow(&field.sqrt_exp, &field.q);
    if field.sub(&field.mul(&x, &x), &xx) != BigUint::zero() {
        x = field.mul(&x, &field.sqrt_m1);
    }
    if field.sub(&field.mul(&x, &x), &xx) != BigUint::zero() {
        return false;
    }

    // x = 0 with the sign bit set encodes no point.
    if x.is_zero() && x_sign == 1 {
        return false;
    }
    if (x.bit(0) as u8) != x_sign {
        x = field.sub(&BigUint::zero(), &x);
    }

    // y² - x² - d·x²·y² - 1 == 0
    let x2 = field.mul(&x, &x);
    let lhs = field.sub(
        &field.sub(&field.sub(&yy, &x2), &field.mul(&field.mul(&field.d, &x2), &yy)),
        &one,
    );
    lhs.is_zero()
}
