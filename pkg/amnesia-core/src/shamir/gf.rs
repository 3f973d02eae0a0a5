/*
 * amnesia: seal a secret behind a set of security questions
 * Copyright (C) 2018-2022 Aleksa Sarai <cyphar@cyphar.com>
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with this program.  If not, see <https://www.gnu.org/licenses/>.
 */

use std::ops::{Add, AddAssign, Mul, MulAssign, Neg, Sub, SubAssign};

use rand::{CryptoRng, RngCore};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("interpolation needs at least one point")]
    NoPoints,

    #[error("[critical security issue] all points must have an invertible (non-zero) x value")]
    NonInvertiblePoint,

    #[error("all points must have distinct x values")]
    DuplicatePoint,
}

/// Primitive uint type for GfElems.
pub type GfElemPrimitive = u8;

/// A field element of `GF(2^8)`, with characteristic polynomial
/// `x^8 + x^4 + x^3 + x^1 + 1`.
///
/// This is the same field (and reduction polynomial) used by AES, which means
/// that each byte of a secret maps to exactly one field element.
// NOTE: PartialEq is not timing-safe.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct GfElem(GfElemPrimitive);

/// (x, y) in GF.
pub type GfPoint = (GfElem, GfElem);

impl GfElem {
    // x^8 + x^4 + x^3 + x^1 + 1, but with the top-most bit unset (the carry out
    // of the shift takes care of it).
    const TRUNC_POLYNOMIAL: GfElemPrimitive = 0b0001_1011;

    /// Additive identity.
    pub const ZERO: GfElem = GfElem(0);

    /// Multiplicative identity.
    pub const ONE: GfElem = GfElem(1);

    pub(crate) fn inner(&self) -> GfElemPrimitive {
        self.0
    }

    pub(crate) fn from_inner(v: GfElemPrimitive) -> Self {
        Self(v)
    }

    pub fn pow(self, mut n: usize) -> Self {
        let mut mult = self;
        let mut result = Self::ONE;
        while n != 0 {
            if n & 1 == 1 {
                result *= mult;
            }
            mult *= mult;
            n >>= 1;
        }
        result
    }

    pub fn inverse(self) -> Option<Self> {
        match self {
            Self::ZERO => None,
            // The multiplicative group has order 2^8-1, so a^-1 = a^(2^8-2).
            _ => Some(self.pow(GfElemPrimitive::MAX as usize - 1)),
        }
    }
}

#[cfg(test)]
impl quickcheck::Arbitrary for GfElem {
    fn arbitrary(g: &mut quickcheck::Gen) -> Self {
        Self(GfElemPrimitive::arbitrary(g))
    }

    fn shrink(&self) -> Box<dyn Iterator<Item = Self>> {
        Box::new(self.0.shrink().map(Self))
    }
}

impl Add for GfElem {
    type Output = Self;
    fn add(mut self, rhs: Self) -> Self::Output {
        self += rhs;
        self
    }
}

impl AddAssign for GfElem {
    fn add_assign(&mut self, rhs: Self) {
        // Addition in GF(2^n) is actually XOR.
        #![allow(clippy::suspicious_op_assign_impl)]
        self.0 ^= rhs.0
    }
}

impl Sub for GfElem {
    type Output = Self;
    fn sub(mut self, rhs: Self) -> Self::Output {
        self -= rhs;
        self
    }
}

impl SubAssign for GfElem {
    fn sub_assign(&mut self, rhs: Self) {
        // Subtraction in GF(2^n) is identical to addition.
        #![allow(clippy::suspicious_op_assign_impl)]
        *self += rhs
    }
}

impl Neg for GfElem {
    type Output = Self;
    fn neg(self) -> Self::Output {
        self
    }
}

impl Mul for GfElem {
    type Output = Self;
    fn mul(mut self, rhs: Self) -> Self::Output {
        self *= rhs;
        self
    }
}

impl MulAssign for GfElem {
    fn mul_assign(&mut self, rhs: Self) {
        // Russian Peasant Multiplication using masks rather than branches.
        //   <https://en.wikipedia.org/wiki/Finite_field_arithmetic#D_programming_example>
        let mut a = self.0;
        let mut b = rhs.0;
        let mut p: GfElemPrimitive = 0;
        for _ in 0..8 {
            p ^= a & (b & 1).wrapping_neg();
            let mask = (a >> 7).wrapping_neg();
            a = (a << 1) ^ (Self::TRUNC_POLYNOMIAL & mask);
            b >>= 1;
        }

        self.0 = p;
    }
}

/// A polynomial in `GF(2^8)`.
// The coefficients are in *increasing* degree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GfPolynomial(Vec<GfElem>);

impl GfPolynomial {
    /// Generate a random polynomial of degree (at most) `n`.
    pub fn new_rand<R: CryptoRng + RngCore + ?Sized>(n: usize, r: &mut R) -> Self {
        let mut coeffs = vec![0u8; n + 1];
        r.fill_bytes(&mut coeffs);
        Self(coeffs.into_iter().map(GfElem).collect())
    }

    /// Yield a mutable reference to the constant term of the polynomial.
    ///
    /// This invalidates all previously computed `GfPolynomial::evaluate`
    /// results.
    pub fn constant_mut(&mut self) -> &mut GfElem {
        if self.0.is_empty() {
            self.0.push(GfElem::ZERO);
        }
        &mut self.0[0]
    }

    /// Evaluate the polynomial at a given `x` value (using Horner's method).
    pub fn evaluate(&self, x: GfElem) -> GfElem {
        self.0
            .iter()
            .rev()
            .fold(GfElem::ZERO, |acc, coeff| *coeff + x * acc)
    }

    /// Interpolate the constant term of the lowest-degree polynomial passing
    /// through every one of `points`, using [Lagrange interpolation][lagrange].
    ///
    /// If the points came from a polynomial of degree `n` and at least `n+1`
    /// of them are supplied, the result is that polynomial's constant term.
    /// With fewer points the result is unrelated to it.
    ///
    /// [lagrange]: https://en.wikipedia.org/wiki/Lagrange_polynomial
    pub fn lagrange_constant<P: AsRef<[GfPoint]>>(points: P) -> Result<GfElem, Error> {
        let points = points.as_ref();
        if points.is_empty() {
            return Err(Error::NoPoints);
        }
        let k = points.len();
        let (xs, ys): (Vec<_>, Vec<_>) = points.iter().copied().unzip();

        // Pre-invert all x values to avoid recalculating it k times.
        let xs_inv = xs
            .iter()
            .map(|x| x.inverse().ok_or(Error::NonInvertiblePoint))
            .collect::<Result<Vec<_>, _>>()?;

        // Substituting x=0 into the Lagrange basis polynomials gives
        //
        //     L(0) = \sum_{j=0}^{k} y_j l_j(0)
        //   l_j(0) = \prod_{m=0,m!=j}^{k} \frac{x_m}{x_m-x_j}
        //
        // which can be re-arranged so that only a single inversion is needed
        // per term
        //
        //   L(0) = \sum_{j=0}^{k} \frac{y_j}
        //                              {\prod_{m=0,m!=j}^{k}
        //                                    (1-\frac{x_j}{x_m})}
        //
        // The denominator is zero exactly when x_j == x_m for some m != j.
        (0..k).try_fold(GfElem::ZERO, |acc, j| {
            let denominator = (0..k)
                .filter(|m| *m != j)
                .fold(GfElem::ONE, |acc, m| acc * (GfElem::ONE - xs[j] * xs_inv[m]));
            let denominator_inv = denominator.inverse().ok_or(Error::DuplicatePoint)?;
            Ok(acc + ys[j] * denominator_inv)
        })
    }
}

#[cfg(test)]
impl quickcheck::Arbitrary for GfPolynomial {
    fn arbitrary(g: &mut quickcheck::Gen) -> Self {
        GfPolynomial(
            (0..g.size().max(1))
                .map(|_| GfElem::arbitrary(g))
                .collect::<Vec<_>>(),
        )
    }

    fn shrink(&self) -> Box<dyn Iterator<Item = Self>> {
        Box::new(self.0.shrink().filter(|p| !p.is_empty()).map(Self))
    }
}
